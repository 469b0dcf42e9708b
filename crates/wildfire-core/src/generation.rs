//! The per-generation transition rule.
//!
//! [`advance_generation`] evaluates only the cells in the current frontier.
//! Every cell is judged against the field as it was at the start of the
//! generation, and the changes are written back afterwards, so fire moves at
//! most one cell per generation regardless of iteration order.
//!
//! | From    | To      | When |
//! |---------|---------|------|
//! | Burning | Empty   | `burn_time + 1 >= burn_duration` |
//! | Burning | Burning | otherwise (`burn_time` incremented) |
//! | Tree    | Burning | next to fire, with `ignition_probability`; or by lightning |
//! | Empty   | Tree    | with `growth_probability` |

use std::collections::BTreeMap;

use rand::Rng;
use tracing::trace;
use wildfire_types::{Cell, CellState, DeltaPayload, SimulationParameters};
use wildfire_world::{Field, FlammableFrontier, next_frontier};

/// Errors raised inside a running generation.
///
/// These indicate a broken invariant, not bad input. They end the affected
/// session and nothing else.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    /// The frontier referenced a position the field does not have.
    #[error("frontier position {position} is outside a field of {len} cells")]
    FrontierIndexOutOfRange {
        /// The offending position.
        position: usize,
        /// Number of cells in the field.
        len: usize,
    },
}

/// Result of one generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationOutcome {
    /// Cells whose state or burn time changed, keyed by field position.
    pub updated_cells: BTreeMap<usize, Cell>,
    /// Cells to evaluate next generation.
    pub next_frontier: FlammableFrontier,
}

impl GenerationOutcome {
    /// The delta in its wire form, keyed by `"x,y"`.
    pub fn delta_payload(&self) -> DeltaPayload {
        DeltaPayload {
            updated_cells_map: self
                .updated_cells
                .values()
                .map(|cell| (cell.coord().key(), *cell))
                .collect(),
        }
    }

    /// Whether the fire has burned out.
    pub fn is_terminal(&self) -> bool {
        self.next_frontier.is_empty()
    }
}

/// Advance `field` by one generation.
///
/// Only positions in `frontier` are evaluated. On success the changes have
/// been applied to `field`; on error `field` is unchanged.
pub fn advance_generation<R: Rng + ?Sized>(
    field: &mut Field,
    params: &SimulationParameters,
    frontier: &FlammableFrontier,
    rng: &mut R,
) -> Result<GenerationOutcome, EngineError> {
    let mut updated_cells = BTreeMap::new();

    for position in frontier.iter() {
        let cell = *field
            .cell(position)
            .ok_or(EngineError::FrontierIndexOutOfRange {
                position,
                len: field.len(),
            })?;
        let near_fire = cell.is_tree() && field.has_burning_neighbor(position);
        let next = transition(cell, near_fire, params, rng);
        if next != cell {
            updated_cells.insert(position, next);
        }
    }

    for (&position, &cell) in &updated_cells {
        if let Some(slot) = field.cell_mut(position) {
            *slot = cell;
        }
    }

    let next_frontier = next_frontier(frontier, updated_cells.keys().copied(), field);

    trace!(
        evaluated = frontier.len(),
        changed = updated_cells.len(),
        next_frontier = next_frontier.len(),
        "Generation advanced"
    );

    Ok(GenerationOutcome {
        updated_cells,
        next_frontier,
    })
}

/// Next value of a single cell.
fn transition<R: Rng + ?Sized>(
    cell: Cell,
    near_fire: bool,
    params: &SimulationParameters,
    rng: &mut R,
) -> Cell {
    match cell.state {
        CellState::Burning => {
            let burn_time = cell.burn_time.saturating_add(1);
            if burn_time >= params.burn_duration {
                Cell {
                    state: CellState::Empty,
                    burn_time: 0,
                    ..cell
                }
            } else {
                Cell { burn_time, ..cell }
            }
        }
        CellState::Tree => {
            let ignites = (near_fire && roll(rng, params.ignition_probability))
                || roll(rng, params.lightning_probability);
            if ignites {
                Cell {
                    state: CellState::Burning,
                    burn_time: 0,
                    ..cell
                }
            } else {
                cell
            }
        }
        CellState::Empty => {
            if roll(rng, params.growth_probability) {
                Cell {
                    state: CellState::Tree,
                    burn_time: 0,
                    ..cell
                }
            } else {
                cell
            }
        }
    }
}

/// One Bernoulli trial. Probabilities at or beyond the ends of `[0, 1]`
/// are decided without consuming randomness.
fn roll<R: Rng + ?Sized>(rng: &mut R, probability: f64) -> bool {
    if probability <= 0.0 {
        false
    } else if probability >= 1.0 {
        true
    } else {
        rng.random_bool(probability)
    }
}
