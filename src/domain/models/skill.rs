//! Skill domain model — a capability the orchestrator tracks as it works
//! CAPABILITY_BUILDING goals.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Proficiency {
    Developing,
    Competent,
    Proficient,
    Expert,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DomainApplicability {
    General,
    DomainSpecific,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Skill {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub acquisition_context: Uuid,
    pub proficiency: Proficiency,
    pub domain_applicability: DomainApplicability,
    pub transferability: u8,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub freshness_score: u32,
    pub use_count: u32,
    pub related_skills: Vec<Uuid>,
}

impl Skill {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        acquisition_context: Uuid,
        domain_applicability: DomainApplicability,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            description: description.into(),
            acquisition_context,
            proficiency: Proficiency::Developing,
            domain_applicability,
            transferability: 50,
            created_at: now,
            updated_at: now,
            freshness_score: 100,
            use_count: 0,
            related_skills: Vec::new(),
        }
    }

    /// Decay freshness by one point, floored at zero (spec.md §4.8 step 7).
    pub fn decay_freshness(&mut self) {
        self.freshness_score = self.freshness_score.saturating_sub(1);
    }
}
