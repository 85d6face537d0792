//! Edge-case handler: strategy-loop detection, sub-goal failure
//! classification, and unknown-unknowns gap injection (spec.md §4.5).

use crate::domain::models::sub_goal::ActionType;
use crate::domain::models::{EstimatedEffort, Goal, SubGoal, SubGoalStatus};

/// Outcome of classifying a failed sub-goal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClassification {
    /// The failure is severe enough to force the parent goal into review.
    CriticalFailure,
    /// A lighter-weight replan of just the failed branch suffices.
    ReplanBranch,
}

/// True if `description` repeats an approach already attempted (case-
/// sensitive exact match, matching "strategy loop" per spec.md §4.5).
pub fn check_for_loop(goal: &Goal, description: &str) -> bool {
    goal.strategy.attempted_approaches.iter().any(|a| a == description)
}

/// Reject a candidate sub-goal description if it repeats a prior approach;
/// otherwise record it as attempted and return it unchanged.
pub fn handle_strategy_loop(goal: &mut Goal, description: String) -> Result<String, String> {
    if check_for_loop(goal, &description) {
        return Err(format!("approach already attempted: {description}"));
    }
    goal.strategy.attempted_approaches.push(description.clone());
    Ok(description)
}

/// Classify a sub-goal failure by its estimated effort: COMPLEX failures
/// force the parent into review, anything lighter only needs a branch
/// replan.
pub fn handle_sub_goal_failure(sub_goal: &SubGoal) -> FailureClassification {
    match sub_goal.estimated_effort {
        EstimatedEffort::Complex => FailureClassification::CriticalFailure,
        EstimatedEffort::Simple | EstimatedEffort::Medium => FailureClassification::ReplanBranch,
    }
}

/// Prepend a fresh discovery sub-goal to the plan when execution reports a
/// knowledge gap ("unknown unknowns"). The new node gets id `"0"` so it sorts
/// before the existing top-level plan and is dependency-free.
pub fn handle_unknown_unknowns(goal: &mut Goal, gap_description: impl Into<String>) {
    let discovery = SubGoal::new("0", format!("Investigate: {}", gap_description.into()), ActionType::Research);
    goal.sub_goals.insert(0, discovery);
    goal.recalculate_tree_depth();
}

/// ONGOING goals are capped at 99% and can only terminate via
/// `USER_CANCELLED` or `PRIORITY_DECAY` (spec.md §4.5, §9 Open Question).
pub fn handle_perpetual_goal(goal: &mut Goal) {
    goal.lifecycle.clamp_perpetual(goal.classification.goal_type);
}
