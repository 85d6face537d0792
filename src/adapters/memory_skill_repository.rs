//! In-memory `SkillRepository` reference implementation.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::errors::GoalResult;
use crate::domain::models::Skill;
use crate::domain::ports::SkillRepository;

#[derive(Default)]
pub struct InMemorySkillRepository {
    skills: RwLock<HashMap<Uuid, Skill>>,
}

impl InMemorySkillRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SkillRepository for InMemorySkillRepository {
    async fn store(&self, skill: &Skill) -> GoalResult<()> {
        self.skills.write().await.insert(skill.id, skill.clone());
        Ok(())
    }

    async fn get_all(&self) -> GoalResult<Vec<Skill>> {
        Ok(self.skills.read().await.values().cloned().collect())
    }

    async fn get(&self, id: Uuid) -> GoalResult<Option<Skill>> {
        Ok(self.skills.read().await.get(&id).cloned())
    }
}
