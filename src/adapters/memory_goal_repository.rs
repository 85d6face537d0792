//! In-memory `GoalRepository` reference implementation.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::errors::GoalResult;
use crate::domain::models::{Goal, GoalState};
use crate::domain::ports::GoalRepository;

/// Holds goals in a process-local map. This adapter does not index
/// embeddings, so `search_similar` always returns an empty vector —
/// `ValidationEngine` treats that identically to "no embedder configured"
/// and falls back to its exact-match path (see `domain::ports::GoalRepository`).
#[derive(Default)]
pub struct InMemoryGoalRepository {
    goals: RwLock<HashMap<Uuid, Goal>>,
}

impl InMemoryGoalRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl GoalRepository for InMemoryGoalRepository {
    async fn store(&self, goal: &Goal) -> GoalResult<()> {
        self.goals.write().await.insert(goal.id, goal.clone());
        Ok(())
    }

    async fn get(&self, id: Uuid) -> GoalResult<Option<Goal>> {
        Ok(self.goals.read().await.get(&id).cloned())
    }

    async fn get_by_state(&self, state: GoalState) -> GoalResult<Vec<Goal>> {
        Ok(self
            .goals
            .read()
            .await
            .values()
            .filter(|g| g.lifecycle.state == state)
            .cloned()
            .collect())
    }

    async fn search_similar(&self, _vector: &[f32], _limit: usize) -> GoalResult<Vec<(Goal, f32)>> {
        Ok(Vec::new())
    }

    async fn delete(&self, id: Uuid) -> GoalResult<()> {
        self.goals.write().await.remove(&id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{Classification, GoalOrigin, GoalType};

    fn goal() -> Goal {
        Goal::new("t", "d", GoalOrigin::User, Classification::new(GoalType::Achievable, 5.0, vec![]))
    }

    #[tokio::test]
    async fn store_then_get_round_trips() {
        let repo = InMemoryGoalRepository::new();
        let g = goal();
        repo.store(&g).await.unwrap();
        let fetched = repo.get(g.id).await.unwrap().unwrap();
        assert_eq!(fetched.id, g.id);
    }

    #[tokio::test]
    async fn get_by_state_filters() {
        let repo = InMemoryGoalRepository::new();
        let mut active = goal();
        active.lifecycle.state = GoalState::Active;
        let proposed = goal();
        repo.store(&active).await.unwrap();
        repo.store(&proposed).await.unwrap();

        let result = repo.get_by_state(GoalState::Active).await.unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].id, active.id);
    }

    #[tokio::test]
    async fn delete_removes_goal() {
        let repo = InMemoryGoalRepository::new();
        let g = goal();
        repo.store(&g).await.unwrap();
        repo.delete(g.id).await.unwrap();
        assert!(repo.get(g.id).await.unwrap().is_none());
    }
}
