//! Skill repository port (spec.md §6).

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::errors::GoalResult;
use crate::domain::models::Skill;

#[async_trait]
pub trait SkillRepository: Send + Sync {
    async fn store(&self, skill: &Skill) -> GoalResult<()>;

    async fn get_all(&self) -> GoalResult<Vec<Skill>>;

    async fn get(&self, id: Uuid) -> GoalResult<Option<Skill>>;
}
