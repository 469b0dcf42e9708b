//! Shared type definitions for the Wildfire simulation service.
//!
//! This crate is the single source of truth for every type that crosses the
//! wire between the browser client and the simulation service. Types flow
//! downstream to `TypeScript` via `ts-rs`.
//!
//! # Modules
//!
//! - [`ids`] -- Type-safe UUID wrappers for session identifiers
//! - [`cell`] -- Grid coordinates, cell states, and cells
//! - [`params`] -- Simulation parameters and their validation
//! - [`wire`] -- Request and event payloads exchanged with clients

pub mod cell;
pub mod ids;
pub mod params;
pub mod wire;

// Re-export all public types at crate root for convenience.
pub use cell::{Cell, CellState, Coord, CoordParseError};
pub use ids::SessionId;
pub use params::{ParamsError, SimulationParameters};
pub use wire::{
    CancelOutcome, CancelResponse, CreateSessionRequest, CreateSessionResponse, DeltaPayload,
    SparseField,
};
