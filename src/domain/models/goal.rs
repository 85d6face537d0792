//! Goal domain model and its fixed state machine.
//!
//! A [`Goal`] is the unit the orchestrator schedules. It carries identity,
//! classification, priority, lifecycle, metrics, strategy, a sub-goal tree,
//! acquisition bookkeeping and (when applicable) archive metadata — see
//! the data model in SPEC_FULL.md §1-3.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::sub_goal::SubGoal;

/// Where a goal's proposal originated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoalOrigin {
    /// Proposed directly by a human user.
    User,
    /// Proposed autonomously by the derivation engine.
    Ai,
}

impl GoalOrigin {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Ai => "ai",
        }
    }
}

/// Classification of what kind of objective a goal represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoalType {
    /// Has a concrete, checkable completion condition.
    Achievable,
    /// Never terminates by completion; capped at 99% progress (see
    /// [`Lifecycle::clamp_perpetual`]).
    Ongoing,
    /// Exists to build a capability (skill/knowledge) rather than to finish.
    CapabilityBuilding,
}

/// Lifecycle state. See spec.md §4.1 for the full transition table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoalState {
    Proposed,
    Validating,
    Queued,
    Active,
    Reviewing,
    Paused,
    Completed,
    Archived,
}

impl GoalState {
    /// Exhaustive list of states, for iteration/reporting.
    pub const ALL: [GoalState; 8] = [
        Self::Proposed,
        Self::Validating,
        Self::Queued,
        Self::Active,
        Self::Reviewing,
        Self::Paused,
        Self::Completed,
        Self::Archived,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Proposed => "proposed",
            Self::Validating => "validating",
            Self::Queued => "queued",
            Self::Active => "active",
            Self::Reviewing => "reviewing",
            Self::Paused => "paused",
            Self::Completed => "completed",
            Self::Archived => "archived",
        }
    }

    /// Whether `self -> to` is one of the allowed transitions in spec.md §4.1.
    ///
    /// `ARCHIVED -> QUEUED` is the revival path; it is listed as a transition
    /// here even though revival is driven by the archive manager rather than
    /// by a direct caller request.
    pub fn can_transition_to(self, to: GoalState) -> bool {
        use GoalState::*;
        matches!(
            (self, to),
            (Proposed, Validating)
                | (Validating, Queued)
                | (Validating, Archived)
                | (Queued, Active)
                | (Queued, Archived)
                | (Active, Reviewing)
                | (Active, Paused)
                | (Active, Completed)
                | (Active, Archived)
                | (Reviewing, Active)
                | (Reviewing, Queued)
                | (Reviewing, Completed)
                | (Reviewing, Archived)
                | (Paused, Queued)
                | (Archived, Queued)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed)
    }
}

/// Reasons a goal can end up archived. Exhaustive per spec.md §6.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArchiveReason {
    MissingTools,
    Impossible,
    UserCancelled,
    PriorityDecay,
    Duplicate,
    ValidationFailed,
}

impl ArchiveReason {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::MissingTools => "missing_tools",
            Self::Impossible => "impossible",
            Self::UserCancelled => "user_cancelled",
            Self::PriorityDecay => "priority_decay",
            Self::Duplicate => "duplicate",
            Self::ValidationFailed => "validation_failed",
        }
    }
}

/// A constraint inherited from an ancestor goal or declared directly.
///
/// Grounded on the teacher's `GoalConstraint`/`ConstraintType` (see
/// SPEC_FULL.md §11): invariants are hard boundaries the validation engine
/// enforces, preferences and boundaries are advisory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConstraintType {
    Invariant,
    Preference,
    Boundary,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoalConstraint {
    pub name: String,
    pub description: String,
    pub constraint_type: ConstraintType,
}

impl GoalConstraint {
    pub fn invariant(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            constraint_type: ConstraintType::Invariant,
        }
    }
}

/// Identity + classification fields (spec.md §3 "identity"/"classification").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Classification {
    pub goal_type: GoalType,
    pub complexity_score: f64,
    pub time_score: f64,
    pub initial_time_score: f64,
    pub required_capabilities: Vec<String>,
}

impl Classification {
    pub fn new(goal_type: GoalType, time_score: f64, required_capabilities: Vec<String>) -> Self {
        Self {
            goal_type,
            complexity_score: 0.0,
            time_score,
            initial_time_score: time_score,
            required_capabilities,
        }
    }
}

/// Priority bookkeeping (spec.md §3 "priority", §4.2).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Priority {
    pub base: f64,
    pub current: f64,
    pub cap: f64,
    pub last_calculation: DateTime<Utc>,
    pub proposal_count: u32,
    pub last_proposed: DateTime<Utc>,
}

impl Priority {
    pub fn new(base: f64, cap: f64) -> Self {
        let now = Utc::now();
        Self {
            base,
            current: base,
            cap,
            last_calculation: now,
            proposal_count: 1,
            last_proposed: now,
        }
    }
}

/// Lifecycle bookkeeping (spec.md §3 "lifecycle", §4.5).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lifecycle {
    pub state: GoalState,
    pub progress_percentage: f64,
    pub time_invested: f64,
    pub time_remaining: f64,
    pub last_progress_timestamp: DateTime<Utc>,
    pub stagnation_counter: u32,
    pub cycles_without_progress: u32,
}

impl Lifecycle {
    pub fn new(time_remaining: f64) -> Self {
        Self {
            state: GoalState::Proposed,
            progress_percentage: 0.0,
            time_invested: 0.0,
            time_remaining,
            last_progress_timestamp: Utc::now(),
            stagnation_counter: 0,
            cycles_without_progress: 0,
        }
    }

    /// ONGOING goals never reach 100% — clamp at 99 (spec.md §4.5, Open
    /// Question resolved in DESIGN.md: they terminate only via
    /// `USER_CANCELLED` or `PRIORITY_DECAY`).
    pub fn clamp_perpetual(&mut self, goal_type: GoalType) {
        if goal_type == GoalType::Ongoing && self.progress_percentage > 99.0 {
            self.progress_percentage = 99.0;
        }
    }
}

/// A single recorded measurement of a success criterion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricSample {
    pub value: f64,
    pub recorded_at: DateTime<Utc>,
}

/// Success criteria and measurement (spec.md §3 "metrics").
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Metrics {
    pub success_criteria: Vec<String>,
    pub measurement_method: String,
    pub current_values: std::collections::HashMap<String, f64>,
    pub completion_threshold: f64,
    pub history: Vec<MetricSample>,
}

/// The active plan and its history (spec.md §3 "strategy").
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Strategy {
    pub current_plan: Vec<String>,
    pub plan_version: u32,
    pub plan_history: Vec<Vec<String>>,
    pub attempted_approaches: Vec<String>,
    pub failed_approaches: Vec<String>,
    pub lessons_learned: Vec<String>,
}

impl Strategy {
    /// Record the current plan into history and replace it, bumping version.
    pub fn adopt_plan(&mut self, plan: Vec<String>) {
        if !self.current_plan.is_empty() {
            self.plan_history.push(std::mem::take(&mut self.current_plan));
        }
        self.current_plan = plan;
        self.plan_version += 1;
    }
}

/// Skill/knowledge acquisition bookkeeping (spec.md §3 "acquisition").
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Acquisition {
    pub skill_ids: Vec<Uuid>,
    pub knowledge_ids: Vec<Uuid>,
    pub practice_count: u32,
    pub simulation_count: u32,
}

/// Archive metadata, populated only while `state == Archived`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Archive {
    pub reason: Option<ArchiveReason>,
    pub missing_capabilities: Vec<String>,
    pub revival_conditions: Vec<String>,
    pub timestamp: Option<DateTime<Utc>>,
}

/// A convergent objective the orchestrator schedules, decomposes and reviews.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Goal {
    // identity
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub origin: GoalOrigin,
    pub created_at: DateTime<Utc>,
    pub source_context_id: Option<Uuid>,

    pub classification: Classification,
    pub priority: Priority,
    pub lifecycle: Lifecycle,
    pub metrics: Metrics,
    pub strategy: Strategy,

    // sub-goal tree
    pub sub_goals: Vec<SubGoal>,
    pub active_sub_goal_id: Option<String>,
    pub tree_depth: u32,

    pub acquisition: Acquisition,
    pub archive: Archive,

    pub constraints: Vec<GoalConstraint>,
    pub parent_id: Option<Uuid>,
}

impl Goal {
    pub fn new(
        title: impl Into<String>,
        description: impl Into<String>,
        origin: GoalOrigin,
        classification: Classification,
    ) -> Self {
        let time_remaining = classification.time_score;
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            description: description.into(),
            origin,
            created_at: Utc::now(),
            source_context_id: None,
            classification,
            priority: Priority::new(0.0, 100.0),
            lifecycle: Lifecycle::new(time_remaining),
            metrics: Metrics::default(),
            strategy: Strategy::default(),
            sub_goals: Vec::new(),
            active_sub_goal_id: None,
            tree_depth: 0,
            acquisition: Acquisition::default(),
            archive: Archive::default(),
            constraints: Vec::new(),
            parent_id: None,
        }
    }

    pub fn state(&self) -> GoalState {
        self.lifecycle.state
    }

    /// Recompute `progress_percentage` from the sub-goal tree (spec.md §3
    /// invariant: `100 * completed / total` when the tree is non-empty).
    /// When the tree is empty the caller-supplied value is left untouched.
    pub fn recalculate_progress(&mut self) {
        if self.sub_goals.is_empty() {
            return;
        }
        let total = self.sub_goals.len() as f64;
        let completed = self
            .sub_goals
            .iter()
            .filter(|s| s.status == super::sub_goal::SubGoalStatus::Completed)
            .count() as f64;
        self.lifecycle.progress_percentage = 100.0 * completed / total;
        self.lifecycle.clamp_perpetual(self.classification.goal_type);
    }

    /// Depth of the sub-goal tree, derived from the deepest hierarchical id's
    /// dot count (spec.md §4.7).
    pub fn recalculate_tree_depth(&mut self) {
        self.tree_depth = self
            .sub_goals
            .iter()
            .map(|s| s.id.matches('.').count() as u32 + 1)
            .max()
            .unwrap_or(0);
    }
}
