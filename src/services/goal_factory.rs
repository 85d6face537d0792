//! Goal factory: canonical construction of user/AI/sub goals with base
//! priorities sampled by the priority calculator (spec.md §2 "Goal factory").

use uuid::Uuid;

use crate::domain::models::{Classification, Goal, GoalOrigin, GoalType};

use super::priority_calculator::PriorityCalculator;

/// Heuristic base unit substituted for a zero `time_score` when a goal
/// enters QUEUED (spec.md §3, §4.8 step 3's fallback path); this crate has
/// no dedicated LLM-enhanced time estimator, so the fallback is the whole
/// implementation.
pub const FALLBACK_TIME_SCORE: f64 = 1.0;

#[derive(Debug, Clone)]
pub struct GoalFactory {
    calculator: PriorityCalculator,
}

impl GoalFactory {
    pub fn new(calculator: PriorityCalculator) -> Self {
        Self { calculator }
    }

    /// Construct a goal proposed directly by a user.
    pub fn create_user_goal(
        &self,
        title: impl Into<String>,
        description: impl Into<String>,
        goal_type: GoalType,
        time_score: f64,
        required_capabilities: Vec<String>,
    ) -> Goal {
        self.build(
            title,
            description,
            GoalOrigin::User,
            goal_type,
            time_score,
            required_capabilities,
            None,
        )
    }

    /// Construct a goal proposed autonomously by the derivation engine.
    pub fn create_ai_goal(
        &self,
        title: impl Into<String>,
        description: impl Into<String>,
        goal_type: GoalType,
        time_score: f64,
        required_capabilities: Vec<String>,
    ) -> Goal {
        self.build(
            title,
            description,
            GoalOrigin::Ai,
            goal_type,
            time_score,
            required_capabilities,
            None,
        )
    }

    /// Construct a goal that originates as a sub-goal promoted out of a
    /// parent's tree (e.g. by `PARENT_DEMOTION`'s inverse, or manual
    /// escalation); inherits the parent's origin.
    pub fn create_sub_goal(
        &self,
        parent: &Goal,
        title: impl Into<String>,
        description: impl Into<String>,
        goal_type: GoalType,
        time_score: f64,
    ) -> Goal {
        self.build(
            title,
            description,
            parent.origin,
            goal_type,
            time_score,
            Vec::new(),
            Some(parent.id),
        )
    }

    fn build(
        &self,
        title: impl Into<String>,
        description: impl Into<String>,
        origin: GoalOrigin,
        goal_type: GoalType,
        time_score: f64,
        required_capabilities: Vec<String>,
        parent_id: Option<Uuid>,
    ) -> Goal {
        // Only clamp non-negative here; the >= 1 floor for QUEUED goals is
        // enforced at the QUEUE transition itself (orchestrator's
        // `apply_validation_outcome`), via `FALLBACK_TIME_SCORE`.
        let classification = Classification::new(goal_type, time_score.max(0.0), required_capabilities);
        let mut goal = Goal::new(title, description, origin, classification);
        let base = self.calculator.sample_base_priority(origin);
        goal.priority.base = base;
        goal.priority.current = base;
        goal.parent_id = parent_id;
        goal
    }
}
