//! Grid model and frontier bookkeeping for the Wildfire simulation.
//!
//! This crate models the physical grid: a dense, index-addressed array of
//! cells reconstructed from a sparse client description, and the set of
//! cells that can change in the next generation.
//!
//! # Modules
//!
//! - [`error`] -- Error types for grid reconstruction.
//! - [`field`] -- The dense [`Field`], its coordinate index, and
//!   reconstruction from a [`SparseField`].
//! - [`frontier`] -- The [`FlammableFrontier`] and its incremental update.
//!
//! [`SparseField`]: wildfire_types::SparseField

pub mod error;
pub mod field;
pub mod frontier;

// Re-export primary types at crate root.
pub use error::GridError;
pub use field::{
    Bounds, Field, ReconstructionConfig, build_coordinate_index, reconstruct_dense_field,
};
pub use frontier::{FlammableFrontier, initial_frontier, next_frontier};
