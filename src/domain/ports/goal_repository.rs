//! Goal repository port (spec.md §6).

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::errors::GoalResult;
use crate::domain::models::{Goal, GoalState};

/// Repository interface for [`Goal`] persistence.
///
/// Per spec.md §1 Non-goals, only the contract is specified here; this crate
/// ships an in-memory reference implementation (`crate::adapters`) and
/// treats a real durable store as out of scope.
#[async_trait]
pub trait GoalRepository: Send + Sync {
    async fn store(&self, goal: &Goal) -> GoalResult<()>;

    async fn get(&self, id: Uuid) -> GoalResult<Option<Goal>>;

    async fn get_by_state(&self, state: GoalState) -> GoalResult<Vec<Goal>>;

    /// Returns goals ordered by descending cosine similarity to `vector`.
    /// Implementations that cannot embed return an empty vector rather than
    /// an error — callers treat an empty result the same as "no embedder".
    async fn search_similar(&self, vector: &[f32], limit: usize) -> GoalResult<Vec<(Goal, f32)>>;

    async fn delete(&self, id: Uuid) -> GoalResult<()>;
}
