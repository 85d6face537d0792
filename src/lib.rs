//! Goalkeeper — an autonomous goal lifecycle orchestrator.
//!
//! A goal moves through a fixed eight-state lifecycle (PROPOSED →
//! VALIDATING → QUEUED → ACTIVE ⇄ REVIEWING → {COMPLETED, PAUSED,
//! ARCHIVED}), scheduled by priority/decay/selection arithmetic,
//! decomposed into a sub-goal tree by an injected LLM, and executed through
//! an injected tool surface. See `domain::models::goal` for the state
//! machine and `services::orchestrator` for the cycle that drives it.

pub mod adapters;
pub mod domain;
pub mod infrastructure;
pub mod services;

pub use domain::errors::{GoalEngineError, GoalResult};
pub use domain::models::{Goal, GoalOrigin, GoalState, GoalType};
pub use services::orchestrator::{CycleReport, GoalOrchestrator, OrchestratorConfig};
