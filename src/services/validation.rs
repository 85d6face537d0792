//! Validation engine: viability, semantic duplicate, and sub/super-set
//! relationship decisions for a freshly PROPOSED goal (spec.md §4.3).

use std::sync::Arc;

use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::errors::GoalResult;
use crate::domain::models::goal::{ArchiveReason, ConstraintType, GoalConstraint};
use crate::domain::models::Goal;
use crate::domain::ports::{cosine_similarity, Embedder, GoalRepository};

/// Cosine-similarity threshold above which a proposal is considered a
/// semantic duplicate of an existing goal.
const DUPLICATE_SIMILARITY_THRESHOLD: f32 = 0.90;

/// The action the orchestrator must take in response to a validation
/// outcome (spec.md §4.3, consumed actions).
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationAction {
    /// Promote the proposal directly to QUEUED.
    Queue,
    /// Strengthen `target`, archive the proposal as DUPLICATE, and revive
    /// `target` first if it was archived.
    Merge { target: Uuid },
    /// Append the proposal as a sub-goal of `target`; archive the proposal
    /// as DUPLICATE.
    Subsume { target: Uuid },
    /// Queue the proposal; demote `target` into the proposal's sub-goals and
    /// archive `target` as DUPLICATE.
    ParentDemotion { target: Uuid },
    /// Archive the proposal outright.
    Archive { reason: ArchiveReason },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValidationOutcome {
    pub valid: bool,
    pub action: ValidationAction,
}

impl ValidationOutcome {
    fn invalid(action: ValidationAction) -> Self {
        Self { valid: false, action }
    }

    fn valid(action: ValidationAction) -> Self {
        Self { valid: true, action }
    }
}

pub struct ValidationEngine<R: GoalRepository> {
    repository: Arc<R>,
    embedder: RwLock<Option<Arc<dyn Embedder>>>,
}

impl<R: GoalRepository> ValidationEngine<R> {
    pub fn new(repository: Arc<R>, embedder: Option<Arc<dyn Embedder>>) -> Self {
        Self { repository, embedder: RwLock::new(embedder) }
    }

    /// Swap the embedder at runtime (spec.md §6 `SetEmbedder`). Passing
    /// `None` reverts duplicate detection to the exact-match fallback.
    pub async fn set_embedder(&self, embedder: Option<Arc<dyn Embedder>>) {
        *self.embedder.write().await = embedder;
    }

    /// Run the full pipeline: viability, then (if viable) duplicate
    /// detection, then sub-goal relationship.
    pub async fn validate(
        &self,
        proposal: &Goal,
        available_tools: &[String],
        existing: &[Goal],
    ) -> GoalResult<ValidationOutcome> {
        if let Some(outcome) = self.check_viability(proposal, available_tools) {
            return Ok(outcome);
        }

        if let Some(outcome) = self.check_constraints(proposal, existing) {
            return Ok(outcome);
        }

        if let Some(outcome) = self.check_duplicate(proposal).await? {
            return Ok(outcome);
        }

        if let Some(outcome) = self.check_sub_goal_relationship(proposal, existing) {
            return Ok(outcome);
        }

        Ok(ValidationOutcome::valid(ValidationAction::Queue))
    }

    /// Step 1: every `required_capability` (lower-cased) must appear in the
    /// lower-cased tool set. Empty requirements pass trivially.
    fn check_viability(&self, proposal: &Goal, available_tools: &[String]) -> Option<ValidationOutcome> {
        if proposal.classification.required_capabilities.is_empty() {
            return None;
        }
        let lowered: Vec<String> = available_tools.iter().map(|t| t.to_lowercase()).collect();
        let missing = proposal
            .classification
            .required_capabilities
            .iter()
            .any(|cap| !lowered.contains(&cap.to_lowercase()));
        if missing {
            return Some(ValidationOutcome::invalid(ValidationAction::Archive {
                reason: ArchiveReason::MissingTools,
            }));
        }
        None
    }

    /// Supplemented check (SPEC_FULL.md §11): a proposal that names a parent
    /// whose inherited constraints include an `Invariant` the description
    /// explicitly contradicts is rejected as `VALIDATION_FAILED`.
    fn check_constraints(&self, proposal: &Goal, existing: &[Goal]) -> Option<ValidationOutcome> {
        let Some(parent_id) = proposal.parent_id else {
            return None;
        };
        let Some(parent) = existing.iter().find(|g| g.id == parent_id) else {
            return None;
        };
        let violated = parent
            .constraints
            .iter()
            .filter(|c| c.constraint_type == ConstraintType::Invariant)
            .any(|c| contradicts_invariant(&proposal.description, c));
        if violated {
            return Some(ValidationOutcome::invalid(ValidationAction::Archive {
                reason: ArchiveReason::ValidationFailed,
            }));
        }
        None
    }

    /// Step 2: semantic duplicate via embedding + top-1 vector search,
    /// falling back to exact (trimmed, case-insensitive) description match
    /// when no embedder is configured. Self-matches (the proposal retrieving
    /// its own already-indexed record) are ignored.
    async fn check_duplicate(&self, proposal: &Goal) -> GoalResult<Option<ValidationOutcome>> {
        let Some(embedder) = self.embedder.read().await.clone() else {
            return Ok(self.check_duplicate_exact(proposal).await?);
        };

        let vector = embedder.embed(&proposal.description).await?;
        if vector.is_empty() {
            return Ok(self.check_duplicate_exact(proposal).await?);
        }

        let matches = self.repository.search_similar(&vector, 5).await?;
        for (candidate, _score) in matches {
            if candidate.id == proposal.id {
                continue; // self-match anomaly (spec.md §9)
            }
            let candidate_vector = embedder.embed(&candidate.description).await?;
            let similarity = cosine_similarity(&vector, &candidate_vector);
            if similarity >= DUPLICATE_SIMILARITY_THRESHOLD {
                return Ok(Some(ValidationOutcome::invalid(ValidationAction::Merge {
                    target: candidate.id,
                })));
            }
        }
        Ok(None)
    }

    async fn check_duplicate_exact(&self, proposal: &Goal) -> GoalResult<Option<ValidationOutcome>> {
        let needle = normalize(&proposal.description);
        let all = self
            .repository
            .get_by_state(crate::domain::models::GoalState::Queued)
            .await?;
        for candidate in all {
            if candidate.id == proposal.id {
                continue;
            }
            if normalize(&candidate.description) == needle {
                return Ok(Some(ValidationOutcome::invalid(ValidationAction::Merge {
                    target: candidate.id,
                })));
            }
        }
        Ok(None)
    }

    /// Step 3: case-insensitive substring test for sub/super-set
    /// relationships between the proposal and existing non-archived goals.
    fn check_sub_goal_relationship(&self, proposal: &Goal, existing: &[Goal]) -> Option<ValidationOutcome> {
        let proposal_desc = normalize(&proposal.description);
        for candidate in existing {
            if candidate.id == proposal.id {
                continue;
            }
            let candidate_desc = normalize(&candidate.description);
            if candidate_desc == proposal_desc {
                continue; // handled by duplicate detection
            }
            if candidate_desc.contains(&proposal_desc) && proposal_desc.len() < candidate_desc.len() {
                return Some(ValidationOutcome::invalid(ValidationAction::Subsume {
                    target: candidate.id,
                }));
            }
            if proposal_desc.contains(&candidate_desc) && candidate_desc.len() < proposal_desc.len() {
                return Some(ValidationOutcome::valid(ValidationAction::ParentDemotion {
                    target: candidate.id,
                }));
            }
        }
        None
    }
}

fn normalize(s: &str) -> String {
    s.trim().to_lowercase()
}

fn contradicts_invariant(description: &str, constraint: &GoalConstraint) -> bool {
    let lowered = description.to_lowercase();
    let name = constraint.name.to_lowercase();
    ["not ", "no ", "ignore ", "skip ", "bypass ", "violate "]
        .iter()
        .any(|neg| lowered.contains(&format!("{neg}{name}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{Classification, Goal, GoalOrigin, GoalType};
    use async_trait::async_trait;
    use std::sync::Mutex as StdMutex;

    #[derive(Default)]
    struct InMemoryRepo {
        goals: StdMutex<Vec<Goal>>,
    }

    #[async_trait]
    impl GoalRepository for InMemoryRepo {
        async fn store(&self, goal: &Goal) -> GoalResult<()> {
            self.goals.lock().unwrap().push(goal.clone());
            Ok(())
        }
        async fn get(&self, id: Uuid) -> GoalResult<Option<Goal>> {
            Ok(self.goals.lock().unwrap().iter().find(|g| g.id == id).cloned())
        }
        async fn get_by_state(&self, state: crate::domain::models::GoalState) -> GoalResult<Vec<Goal>> {
            Ok(self
                .goals
                .lock()
                .unwrap()
                .iter()
                .filter(|g| g.lifecycle.state == state)
                .cloned()
                .collect())
        }
        async fn search_similar(&self, _vector: &[f32], _limit: usize) -> GoalResult<Vec<(Goal, f32)>> {
            Ok(Vec::new())
        }
        async fn delete(&self, id: Uuid) -> GoalResult<()> {
            self.goals.lock().unwrap().retain(|g| g.id != id);
            Ok(())
        }
    }

    fn goal(desc: &str) -> Goal {
        Goal::new("t", desc, GoalOrigin::User, Classification::new(GoalType::Achievable, 5.0, vec![]))
    }

    #[tokio::test]
    async fn missing_capability_is_archived() {
        let repo = Arc::new(InMemoryRepo::default());
        let engine = ValidationEngine::new(repo, None);
        let mut proposal = goal("x");
        proposal.classification.required_capabilities = vec!["web_parse".to_string()];
        let outcome = engine.validate(&proposal, &[], &[]).await.unwrap();
        assert_eq!(
            outcome.action,
            ValidationAction::Archive { reason: ArchiveReason::MissingTools }
        );
    }

    #[tokio::test]
    async fn proposal_contradicting_inherited_invariant_is_rejected() {
        let repo = Arc::new(InMemoryRepo::default());
        let mut parent = goal("parent goal");
        parent.constraints.push(GoalConstraint::invariant("budget", "never exceed the monthly budget"));

        let mut proposal = goal("ignore budget and spend freely");
        proposal.parent_id = Some(parent.id);

        let engine = ValidationEngine::new(repo, None);
        let outcome = engine.validate(&proposal, &[], &[parent]).await.unwrap();
        assert_eq!(outcome.action, ValidationAction::Archive { reason: ArchiveReason::ValidationFailed });
        assert!(!outcome.valid);
    }

    #[tokio::test]
    async fn identical_description_yields_merge() {
        let repo = Arc::new(InMemoryRepo::default());
        let mut existing = goal("Improve French teaching skills");
        existing.lifecycle.state = crate::domain::models::GoalState::Queued;
        repo.store(&existing).await.unwrap();

        let engine = ValidationEngine::new(repo, None);
        let proposal = goal("improve french teaching skills");
        let outcome = engine.validate(&proposal, &[], &[existing.clone()]).await.unwrap();
        assert_eq!(outcome.action, ValidationAction::Merge { target: existing.id });
    }

    #[tokio::test]
    async fn strict_substring_yields_subsume() {
        let repo = Arc::new(InMemoryRepo::default());
        let engine = ValidationEngine::new(repo, None);
        let existing = goal("learn japanese kanji radicals and vocabulary");
        let proposal = goal("learn japanese kanji radicals");
        let outcome = engine.validate(&proposal, &[], &[existing.clone()]).await.unwrap();
        assert_eq!(outcome.action, ValidationAction::Subsume { target: existing.id });
    }

    #[tokio::test]
    async fn strict_superset_yields_parent_demotion() {
        let repo = Arc::new(InMemoryRepo::default());
        let engine = ValidationEngine::new(repo, None);
        let existing = goal("learn kanji radicals");
        let proposal = goal("learn kanji radicals and stroke order");
        let outcome = engine.validate(&proposal, &[], &[existing.clone()]).await.unwrap();
        assert_eq!(outcome.action, ValidationAction::ParentDemotion { target: existing.id });
        assert!(outcome.valid);
    }

    #[tokio::test]
    async fn self_match_is_ignored_in_vector_path() {
        struct EchoEmbedder;
        #[async_trait]
        impl Embedder for EchoEmbedder {
            async fn embed(&self, text: &str) -> GoalResult<Vec<f32>> {
                Ok(vec![text.len() as f32, 1.0])
            }
        }

        struct SelfMatchingRepo {
            proposal_id: std::sync::OnceLock<Uuid>,
        }
        #[async_trait]
        impl GoalRepository for SelfMatchingRepo {
            async fn store(&self, _goal: &Goal) -> GoalResult<()> {
                Ok(())
            }
            async fn get(&self, _id: Uuid) -> GoalResult<Option<Goal>> {
                Ok(None)
            }
            async fn get_by_state(&self, _state: crate::domain::models::GoalState) -> GoalResult<Vec<Goal>> {
                Ok(Vec::new())
            }
            async fn search_similar(&self, _vector: &[f32], _limit: usize) -> GoalResult<Vec<(Goal, f32)>> {
                let mut g = goal("self");
                g.id = *self.proposal_id.get().unwrap();
                Ok(vec![(g, 1.0)])
            }
            async fn delete(&self, _id: Uuid) -> GoalResult<()> {
                Ok(())
            }
        }

        let proposal = goal("a goal that embeds to itself");
        let repo = Arc::new(SelfMatchingRepo {
            proposal_id: std::sync::OnceLock::new(),
        });
        repo.proposal_id.set(proposal.id).unwrap();
        let engine = ValidationEngine::new(repo, Some(Arc::new(EchoEmbedder) as Arc<dyn Embedder>));
        let outcome = engine.validate(&proposal, &[], &[]).await.unwrap();
        // the only candidate was a self-match, so it falls through to QUEUE
        assert_eq!(outcome.action, ValidationAction::Queue);
    }
}
