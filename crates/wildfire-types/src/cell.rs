//! Grid coordinates, cell states, and cells.
//!
//! A [`Cell`] is identified by its [`Coord`]. On the wire, coordinates are
//! written as the string key `"x,y"` (see [`Coord::key`]), which is how the
//! browser client addresses cells in delta maps and coordinate indexes.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// A position on the grid. The grid is centered on the origin, so both
/// components may be negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Coord {
    /// Horizontal component.
    pub x: i32,
    /// Vertical component.
    pub y: i32,
}

impl Coord {
    /// Create a coordinate.
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// The canonical `"x,y"` string key for this coordinate.
    pub fn key(self) -> String {
        self.to_string()
    }

    /// Parse a canonical `"x,y"` key.
    pub fn parse_key(key: &str) -> Result<Self, CoordParseError> {
        key.parse()
    }

    /// The four von Neumann neighbors (north, south, east, west).
    ///
    /// Neighbors that would overflow `i32` are omitted; they can never be
    /// inside a grid anyway.
    pub fn von_neumann(self) -> impl Iterator<Item = Self> {
        let Self { x, y } = self;
        [
            y.checked_sub(1).map(|ny| Self::new(x, ny)),
            y.checked_add(1).map(|ny| Self::new(x, ny)),
            x.checked_add(1).map(|nx| Self::new(nx, y)),
            x.checked_sub(1).map(|nx| Self::new(nx, y)),
        ]
        .into_iter()
        .flatten()
    }
}

impl fmt::Display for Coord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.x, self.y)
    }
}

/// A coordinate key that is not of the form `"x,y"`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("malformed coordinate key: {0:?}")]
pub struct CoordParseError(pub String);

impl FromStr for Coord {
    type Err = CoordParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || CoordParseError(s.to_owned());
        let (x, y) = s.split_once(',').ok_or_else(malformed)?;
        let x = x.parse::<i32>().map_err(|_e| malformed())?;
        let y = y.parse::<i32>().map_err(|_e| malformed())?;
        Ok(Self::new(x, y))
    }
}

/// The three states a cell can be in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum CellState {
    /// Flammable vegetation.
    #[default]
    Tree,
    /// On fire. Spreads to neighboring trees.
    Burning,
    /// Burnt out or bare ground.
    Empty,
}

/// A single grid cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct Cell {
    /// Horizontal coordinate.
    pub x: i32,
    /// Vertical coordinate.
    pub y: i32,
    /// Current state.
    pub state: CellState,
    /// Generations elapsed since ignition. Zero for non-burning cells.
    #[serde(default)]
    pub burn_time: u32,
}

impl Cell {
    /// Create a cell at `coord` in `state` with a zero burn time.
    pub const fn new(coord: Coord, state: CellState) -> Self {
        Self {
            x: coord.x,
            y: coord.y,
            state,
            burn_time: 0,
        }
    }

    /// The cell's coordinate.
    pub const fn coord(&self) -> Coord {
        Coord::new(self.x, self.y)
    }

    /// Whether the cell is currently burning.
    pub const fn is_burning(&self) -> bool {
        matches!(self.state, CellState::Burning)
    }

    /// Whether the cell is an unburnt tree.
    pub const fn is_tree(&self) -> bool {
        matches!(self.state, CellState::Tree)
    }
}
