//! The dense field: an index-addressed array of cells plus a coordinate index.
//!
//! Cells live in a flat `Vec` in row-major order. Every other structure in
//! the simulation (frontier, deltas) addresses cells by their position in
//! that vector; the [`Coord`] to position map is only consulted for
//! neighbor lookups and client-facing keys.
//!
//! # Bounding box
//!
//! A field of `width x height` covers
//! `[-(width/2), width - width/2) x [-(height/2), height - height/2)`, so the
//! grid is centered on the origin.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;
use wildfire_types::{Cell, CellState, Coord, SparseField};

use crate::error::GridError;

/// Policy applied when turning a sparse field into a dense one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconstructionConfig {
    /// State of every cell the sparse description does not mention.
    #[serde(default)]
    pub default_state: CellState,

    /// Upper limit on `width * height`. `None` means unlimited.
    #[serde(default)]
    pub max_cells: Option<usize>,
}

impl Default for ReconstructionConfig {
    fn default() -> Self {
        Self {
            default_state: CellState::Tree,
            max_cells: None,
        }
    }
}

/// Half-open rectangle of valid coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bounds {
    /// Smallest valid x.
    pub min_x: i32,
    /// One past the largest valid x.
    pub max_x: i32,
    /// Smallest valid y.
    pub min_y: i32,
    /// One past the largest valid y.
    pub max_y: i32,
}

impl Bounds {
    /// The centered box for a grid of the given size.
    pub const fn centered(width: i32, height: i32) -> Self {
        let half_w = width / 2;
        let half_h = height / 2;
        Self {
            min_x: 0_i32.saturating_sub(half_w),
            max_x: width.saturating_sub(half_w),
            min_y: 0_i32.saturating_sub(half_h),
            max_y: height.saturating_sub(half_h),
        }
    }

    /// Whether `coord` lies inside the box.
    pub const fn contains(&self, coord: Coord) -> bool {
        coord.x >= self.min_x
            && coord.x < self.max_x
            && coord.y >= self.min_y
            && coord.y < self.max_y
    }

    /// Every coordinate in the box, row by row.
    pub fn coords(self) -> impl Iterator<Item = Coord> {
        (self.min_y..self.max_y)
            .flat_map(move |y| (self.min_x..self.max_x).map(move |x| Coord::new(x, y)))
    }
}

/// A fully populated grid.
#[derive(Debug, Clone)]
pub struct Field {
    width: i32,
    height: i32,
    bounds: Bounds,
    cells: Vec<Cell>,
    index: HashMap<Coord, usize>,
}

/// Build the coordinate to position index for `cells`.
///
/// Fails with [`GridError::DuplicateCoordinate`] if two cells share a
/// coordinate.
pub fn build_coordinate_index(cells: &[Cell]) -> Result<HashMap<Coord, usize>, GridError> {
    let mut index = HashMap::with_capacity(cells.len());
    for (position, cell) in cells.iter().enumerate() {
        if index.insert(cell.coord(), position).is_some() {
            return Err(GridError::DuplicateCoordinate(cell.coord()));
        }
    }
    Ok(index)
}

/// Reconstruct a dense field from a sparse description.
///
/// Every coordinate in the bounding box starts as a default cell; supplied
/// cells are then written over it in the order given, so a later cell with
/// the same coordinate wins.
pub fn reconstruct_dense_field(
    sparse: &SparseField,
    config: &ReconstructionConfig,
) -> Result<Field, GridError> {
    let (width, height) = (sparse.width, sparse.height);
    if width <= 0 || height <= 0 {
        return Err(GridError::InvalidDimensions { width, height });
    }

    let cell_count = usize::try_from(width)
        .ok()
        .zip(usize::try_from(height).ok())
        .and_then(|(w, h)| w.checked_mul(h));
    let too_large = |max_cells| GridError::TooLarge {
        width,
        height,
        max_cells,
    };
    let cell_count = match (cell_count, config.max_cells) {
        (Some(count), Some(max)) if count > max => return Err(too_large(max)),
        (Some(count), _) => count,
        (None, max) => return Err(too_large(max.unwrap_or(usize::MAX))),
    };

    let bounds = Bounds::centered(width, height);
    let mut cells = Vec::with_capacity(cell_count);
    cells.extend(bounds.coords().map(|coord| Cell::new(coord, config.default_state)));
    let index = build_coordinate_index(&cells)?;

    for supplied in &sparse.cells {
        let coord = supplied.coord();
        let slot = index
            .get(&coord)
            .and_then(|&position| cells.get_mut(position))
            .ok_or(GridError::OutOfBounds(coord))?;
        *slot = *supplied;
    }

    debug!(
        width,
        height,
        overrides = sparse.cells.len(),
        "Dense field reconstructed"
    );

    Ok(Field {
        width,
        height,
        bounds,
        cells,
        index,
    })
}

impl Field {
    /// Grid width in cells.
    pub const fn width(&self) -> i32 {
        self.width
    }

    /// Grid height in cells.
    pub const fn height(&self) -> i32 {
        self.height
    }

    /// The coordinate rectangle this field covers.
    pub const fn bounds(&self) -> Bounds {
        self.bounds
    }

    /// Number of cells (`width * height`).
    pub const fn len(&self) -> usize {
        self.cells.len()
    }

    /// Whether the field holds no cells. Never true for a reconstructed field.
    pub const fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// All cells in row-major order.
    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    /// The cell at `position`.
    pub fn cell(&self, position: usize) -> Option<&Cell> {
        self.cells.get(position)
    }

    /// Mutable access to the cell at `position`.
    pub fn cell_mut(&mut self, position: usize) -> Option<&mut Cell> {
        self.cells.get_mut(position)
    }

    /// Position of the cell at `coord`, if it is inside the field.
    pub fn index_of(&self, coord: Coord) -> Option<usize> {
        self.index.get(&coord).copied()
    }

    /// The cell at `coord`, if it is inside the field.
    pub fn cell_at(&self, coord: Coord) -> Option<&Cell> {
        self.index_of(coord).and_then(|position| self.cell(position))
    }

    /// Positions of the in-grid von Neumann neighbors of the cell at
    /// `position`. Empty if `position` is out of range.
    pub fn neighbors(&self, position: usize) -> impl Iterator<Item = usize> + '_ {
        self.cell(position)
            .map(Cell::coord)
            .into_iter()
            .flat_map(Coord::von_neumann)
            .filter_map(|coord| self.index_of(coord))
    }

    /// Whether any neighbor of the cell at `position` is burning.
    pub fn has_burning_neighbor(&self, position: usize) -> bool {
        self.neighbors(position)
            .filter_map(|n| self.cell(n))
            .any(Cell::is_burning)
    }

    /// Cells whose state differs from `default_state`, in field order.
    pub fn non_default_cells(&self, default_state: CellState) -> Vec<Cell> {
        self.cells
            .iter()
            .filter(|cell| cell.state != default_state)
            .copied()
            .collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn sparse(width: i32, height: i32, cells: Vec<Cell>) -> SparseField {
        SparseField {
            width,
            height,
            cells,
        }
    }

    fn dense(width: i32, height: i32, cells: Vec<Cell>) -> Field {
        reconstruct_dense_field(&sparse(width, height, cells), &ReconstructionConfig::default())
            .unwrap()
    }

    fn burning(x: i32, y: i32) -> Cell {
        Cell::new(Coord::new(x, y), CellState::Burning)
    }

    fn empty(x: i32, y: i32) -> Cell {
        Cell::new(Coord::new(x, y), CellState::Empty)
    }

    #[test]
    fn bounds_are_centered_with_extra_unit_positive() {
        let odd = Bounds::centered(5, 3);
        assert_eq!((odd.min_x, odd.max_x), (-2, 3));
        assert_eq!((odd.min_y, odd.max_y), (-1, 2));

        let even = Bounds::centered(4, 2);
        assert_eq!((even.min_x, even.max_x), (-2, 2));
        assert_eq!((even.min_y, even.max_y), (-1, 1));
        assert!(even.contains(Coord::new(-2, -1)));
        assert!(!even.contains(Coord::new(2, 0)));
    }

    #[test]
    fn dense_field_covers_every_coordinate_once() {
        let field = dense(4, 3, Vec::new());
        assert_eq!(field.len(), 12);
        let index = build_coordinate_index(field.cells()).unwrap();
        assert_eq!(index.len(), 12);
        for coord in field.bounds().coords() {
            let position = field.index_of(coord).unwrap();
            assert_eq!(field.cell(position).unwrap().coord(), coord);
        }
    }

    #[test]
    fn unspecified_cells_default_to_tree() {
        let field = dense(3, 3, vec![burning(0, 0)]);
        assert_eq!(field.cell_at(Coord::new(0, 0)).unwrap().state, CellState::Burning);
        assert_eq!(field.cell_at(Coord::new(1, 1)).unwrap().state, CellState::Tree);
        assert_eq!(field.cell_at(Coord::new(1, 1)).unwrap().burn_time, 0);
    }

    #[test]
    fn default_state_is_configurable() {
        let config = ReconstructionConfig {
            default_state: CellState::Empty,
            max_cells: None,
        };
        let field = reconstruct_dense_field(&sparse(2, 2, Vec::new()), &config).unwrap();
        assert!(field.cells().iter().all(|c| c.state == CellState::Empty));
    }

    #[test]
    fn last_supplied_cell_wins() {
        let field = reconstruct_dense_field(
            &sparse(3, 3, vec![burning(1, 0), empty(1, 0)]),
            &ReconstructionConfig::default(),
        )
        .unwrap();
        assert_eq!(field.cell_at(Coord::new(1, 0)).unwrap().state, CellState::Empty);
    }

    #[test]
    fn rejects_non_positive_dimensions() {
        let config = ReconstructionConfig::default();
        assert_eq!(
            reconstruct_dense_field(&sparse(0, 3, Vec::new()), &config).unwrap_err(),
            GridError::InvalidDimensions { width: 0, height: 3 }
        );
        assert!(matches!(
            reconstruct_dense_field(&sparse(3, -1, Vec::new()), &config),
            Err(GridError::InvalidDimensions { .. })
        ));
    }

    #[test]
    fn rejects_out_of_bounds_cells() {
        // A 4-wide grid spans x in [-2, 2).
        let err = reconstruct_dense_field(
            &sparse(4, 4, vec![burning(2, 0)]),
            &ReconstructionConfig::default(),
        )
        .unwrap_err();
        assert_eq!(err, GridError::OutOfBounds(Coord::new(2, 0)));
    }

    #[test]
    fn rejects_fields_over_the_cell_limit() {
        let config = ReconstructionConfig {
            default_state: CellState::Tree,
            max_cells: Some(10),
        };
        assert!(matches!(
            reconstruct_dense_field(&sparse(4, 3, Vec::new()), &config),
            Err(GridError::TooLarge { max_cells: 10, .. })
        ));
    }

    #[test]
    fn coordinate_index_rejects_duplicates() {
        let cells = vec![burning(0, 0), empty(1, 0), empty(0, 0)];
        assert_eq!(
            build_coordinate_index(&cells).unwrap_err(),
            GridError::DuplicateCoordinate(Coord::new(0, 0))
        );
    }

    #[test]
    fn reconstruction_roundtrips_overrides() {
        let overrides = vec![burning(-1, -1), empty(0, 1), burning(1, 0)];
        let field = dense(3, 3, overrides.clone());
        assert_eq!(field.len(), 9);

        let mut extracted = field.non_default_cells(CellState::Tree);
        let mut expected = overrides;
        extracted.sort_by_key(Cell::coord);
        expected.sort_by_key(Cell::coord);
        assert_eq!(extracted, expected);
    }

    #[test]
    fn corner_cells_have_two_neighbors() {
        let field = dense(3, 3, Vec::new());
        let corner = field.index_of(Coord::new(-1, -1)).unwrap();
        let center = field.index_of(Coord::new(0, 0)).unwrap();
        assert_eq!(field.neighbors(corner).count(), 2);
        assert_eq!(field.neighbors(center).count(), 4);
        assert_eq!(field.neighbors(usize::MAX).count(), 0);
    }

    #[test]
    fn burning_neighbor_detection() {
        let field = dense(3, 3, vec![burning(0, 0)]);
        assert!(field.has_burning_neighbor(field.index_of(Coord::new(1, 0)).unwrap()));
        assert!(!field.has_burning_neighbor(field.index_of(Coord::new(1, 1)).unwrap()));
    }
}
