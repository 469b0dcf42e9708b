//! Generation engine, session lifecycle, and delta streaming for the
//! Wildfire simulation.
//!
//! # Modules
//!
//! - [`cancel`] -- [`CancelSignal`], the interruptible stop flag each
//!   session's loop waits on.
//! - [`config`] -- Configuration loading from `wildfire-config.yaml` into
//!   strongly-typed structs.
//! - [`generation`] -- The transition rule, applied to the frontier once
//!   per generation.
//! - [`session`] -- [`Session`] and the [`SessionManager`] registry.
//! - [`stream`] -- The timed per-session loop and the [`DeltaStream`] its
//!   consumer reads.
//!
//! [`CancelSignal`]: cancel::CancelSignal
//! [`Session`]: session::Session
//! [`SessionManager`]: session::SessionManager
//! [`DeltaStream`]: stream::DeltaStream

pub mod cancel;
pub mod config;
pub mod generation;
pub mod session;
pub mod stream;
