//! Domain errors for the goal lifecycle orchestrator.
//!
//! Error kinds mirror spec.md §7: `InvalidTransition` and `ValidationRejection`
//! are outcomes returned to the caller without mutation; `CollaboratorFailure`
//! and `StorageFailure` wrap external failures the orchestrator logs and
//! degrades past rather than panicking on; `Cancelled` surfaces a context
//! cancellation.

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum GoalEngineError {
    #[error("goal not found: {0}")]
    GoalNotFound(Uuid),

    #[error("sub-goal not found: {0} in goal {1}")]
    SubGoalNotFound(String, Uuid),

    #[error("skill not found: {0}")]
    SkillNotFound(Uuid),

    #[error("invalid transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    #[error("collaborator failure during {operation}: {source}")]
    CollaboratorFailure {
        operation: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("storage failure: {0}")]
    StorageFailure(String),

    #[error("cancelled")]
    Cancelled,

    #[error("configuration error: {0}")]
    Configuration(String),
}

pub type GoalResult<T> = Result<T, GoalEngineError>;

impl From<serde_json::Error> for GoalEngineError {
    fn from(err: serde_json::Error) -> Self {
        GoalEngineError::CollaboratorFailure {
            operation: "parse_plan".to_string(),
            source: err.into(),
        }
    }
}
