//! The flammable frontier: cells that can change in the next generation.
//!
//! The frontier holds every burning cell plus every tree with a burning von
//! Neumann neighbor. It is stored as a set of field positions, so the hot
//! path never hashes coordinates.
//!
//! It is allowed to over-approximate (a member may turn out unchanged after
//! the rule runs) but never to miss a cell that could change: a missing
//! tree next to a fire would silently stall the spread.

use std::collections::BTreeSet;

use wildfire_types::{Cell, CellState};

use crate::field::Field;

/// Set of field positions evaluated by the next generation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlammableFrontier {
    members: BTreeSet<usize>,
}

impl FlammableFrontier {
    /// An empty frontier.
    pub const fn new() -> Self {
        Self {
            members: BTreeSet::new(),
        }
    }

    /// Number of positions in the frontier.
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Whether nothing can change any more.
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Whether `position` is in the frontier.
    pub fn contains(&self, position: usize) -> bool {
        self.members.contains(&position)
    }

    /// Positions in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.members.iter().copied()
    }

    /// Add `position`. Returns `true` if it was not already present.
    pub fn insert(&mut self, position: usize) -> bool {
        self.members.insert(position)
    }
}

impl FromIterator<usize> for FlammableFrontier {
    fn from_iter<I: IntoIterator<Item = usize>>(iter: I) -> Self {
        Self {
            members: iter.into_iter().collect(),
        }
    }
}

/// Compute the frontier of a freshly built field with one full scan.
pub fn initial_frontier(field: &Field) -> FlammableFrontier {
    field
        .cells()
        .iter()
        .enumerate()
        .filter(|&(position, cell)| match cell.state {
            CellState::Burning => true,
            CellState::Tree => field.has_burning_neighbor(position),
            CellState::Empty => false,
        })
        .map(|(position, _)| position)
        .collect()
}

/// Update the frontier after a generation has been applied to `field`.
///
/// `changed` lists the positions whose cell changed this generation; every
/// one of them was a member of `previous`. Work is proportional to the
/// previous frontier and the neighborhoods of newly ignited cells, never
/// to the size of the field.
///
/// - burning cells stay;
/// - trees and empty cells stay only while they touch a burning cell;
/// - every tree next to a newly ignited cell joins.
pub fn next_frontier(
    previous: &FlammableFrontier,
    changed: impl IntoIterator<Item = usize>,
    field: &Field,
) -> FlammableFrontier {
    let mut next: FlammableFrontier = previous
        .iter()
        .filter(|&position| {
            field.cell(position).is_some_and(|cell| {
                cell.is_burning() || field.has_burning_neighbor(position)
            })
        })
        .collect();

    for position in changed {
        let newly_ignited = field
            .cell(position)
            .is_some_and(|cell| cell.is_burning() && cell.burn_time == 0);
        if !newly_ignited {
            continue;
        }
        next.insert(position);
        for neighbor in field.neighbors(position) {
            if field.cell(neighbor).is_some_and(Cell::is_tree) {
                next.insert(neighbor);
            }
        }
    }

    next
}
