//! Room mirror library: keeps a live copy of a music room's shared document and
//! follows each song from start to archived tally.

/// Runtime configuration.
pub mod config;
/// Wire and notice data shapes.
pub mod dto;
/// Error types.
pub mod error;
/// Handlers and collaborators.
pub mod services;
/// Room session state.
pub mod state;
