//! Error types for the `wildfire-world` crate.
//!
//! All fallible operations in this crate return [`GridError`].

use wildfire_types::Coord;

/// Errors that can occur while building a dense field.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GridError {
    /// Width or height is not positive.
    #[error("invalid dimensions {width}x{height}: both must be > 0")]
    InvalidDimensions {
        /// Requested width.
        width: i32,
        /// Requested height.
        height: i32,
    },

    /// The grid would hold more cells than allowed.
    #[error("field of {width}x{height} exceeds the limit of {max_cells} cells")]
    TooLarge {
        /// Requested width.
        width: i32,
        /// Requested height.
        height: i32,
        /// Configured cell limit.
        max_cells: usize,
    },

    /// A supplied cell lies outside the grid's bounding box.
    #[error("cell {0} lies outside the field")]
    OutOfBounds(Coord),

    /// Two cells share a coordinate where uniqueness is required.
    #[error("duplicate coordinate {0}")]
    DuplicateCoordinate(Coord),
}
