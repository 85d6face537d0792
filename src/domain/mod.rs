//! Domain layer for the goal lifecycle orchestrator.
//!
//! Contains the entities (`models`), the collaborator contracts (`ports`)
//! and the error types (`errors`) the services module operates on.

pub mod errors;
pub mod models;
pub mod ports;

pub use errors::{GoalEngineError, GoalResult};
