//! Review processor: the periodic judgement applied to ACTIVE/REVIEWING
//! goals, producing one of CONTINUE/REPLAN/DEMOTE/COMPLETE/ARCHIVE
//! (spec.md §4.4).

use crate::domain::models::goal::ArchiveReason;
use crate::domain::models::{Goal, GoalType, SubGoalStatus};

use super::edge_cases::{handle_sub_goal_failure, FailureClassification};
use super::priority_calculator::PriorityCalculator;
use super::progress_monitor::ProgressMonitor;

#[derive(Debug, Clone, PartialEq)]
pub enum ReviewDecision {
    /// Keep the goal ACTIVE, no structural change.
    Continue,
    /// Rebuild the plan for `failed_sub_goal_id` (or the whole tree when
    /// `None`); goal stays ACTIVE once replanned.
    Replan { failed_sub_goal_id: Option<String> },
    /// Send the goal back to QUEUED — it needs to cede the active slot but
    /// is not abandoned.
    Demote,
    /// All success criteria are met; transition to COMPLETED.
    Complete,
    /// The goal can no longer proceed; transition to ARCHIVED with reason.
    Archive { reason: ArchiveReason },
}

pub struct ReviewProcessor {
    progress_monitor: ProgressMonitor,
    calculator: PriorityCalculator,
}

impl ReviewProcessor {
    pub fn new(progress_monitor: ProgressMonitor, calculator: PriorityCalculator) -> Self {
        Self { progress_monitor, calculator }
    }

    /// Decide the outcome for `goal`. `best_queued_score` is the highest
    /// `SelectionScore` among the currently QUEUED goals, if any (spec.md
    /// §4.4's `CompareForReview`); order of checks matters: completion and
    /// critical failure are judged first, so a goal that finished on its
    /// last cycle is never mistakenly archived or demoted, and a stronger
    /// queued challenger only cedes the slot once those are ruled out.
    pub fn review(&self, goal: &Goal, best_queued_score: Option<f64>) -> ReviewDecision {
        if self.is_complete(goal) {
            return ReviewDecision::Complete;
        }

        if let Some(failed_id) = self.critical_failure(goal) {
            return ReviewDecision::Archive { reason: ArchiveReason::Impossible }
                .demote_unless_terminal(failed_id);
        }

        // Spec.md §4.4 step (d): a better-scoring queued challenger demotes
        // the active goal back to QUEUED, with no switch-margin — unlike
        // `PriorityCalculator::should_switch_goal`, which only gates the
        // *initial* promotion into ACTIVE.
        if let Some(best_score) = best_queued_score {
            if best_score > self.calculator.progress_bonus(goal) {
                return ReviewDecision::Demote;
            }
        }

        if goal.priority.current <= self.calculator.archive_floor() {
            return ReviewDecision::Archive { reason: ArchiveReason::PriorityDecay };
        }

        if self.progress_monitor.is_stagnant(goal) {
            let failed_sub_goal_id = goal
                .sub_goals
                .iter()
                .find(|s| s.status == SubGoalStatus::Failed)
                .map(|s| s.id.clone());
            return ReviewDecision::Replan { failed_sub_goal_id };
        }

        ReviewDecision::Continue
    }

    fn is_complete(&self, goal: &Goal) -> bool {
        if goal.classification.goal_type == GoalType::Ongoing {
            return false; // perpetual goals never self-complete (spec.md §4.5)
        }
        if goal.metrics.completion_threshold > 0.0 {
            let satisfied = goal
                .metrics
                .current_values
                .values()
                .all(|v| *v >= goal.metrics.completion_threshold);
            if satisfied && !goal.metrics.current_values.is_empty() {
                return true;
            }
        }
        !goal.sub_goals.is_empty() && goal.sub_goals.iter().all(|s| s.status == SubGoalStatus::Completed)
    }

    /// Returns the id of a failed sub-goal whose effort classifies the
    /// failure as critical, if one exists.
    fn critical_failure(&self, goal: &Goal) -> Option<String> {
        goal.sub_goals
            .iter()
            .filter(|s| s.status == SubGoalStatus::Failed)
            .find(|s| handle_sub_goal_failure(s) == FailureClassification::CriticalFailure)
            .map(|s| s.id.clone())
    }
}

impl ReviewDecision {
    /// A critical sub-goal failure in a goal with an otherwise-recoverable
    /// tree structure demotes rather than archives; genuinely dead goals
    /// archive. The distinction mirrors spec.md §4.5: only a top-level
    /// (depth-1) critical failure forces archival, a deep critical failure
    /// only forces the parent back down the queue for replanning later.
    fn demote_unless_terminal(self, failed_sub_goal_id: String) -> Self {
        if failed_sub_goal_id.contains('.') {
            Self::Demote
        } else {
            self
        }
    }
}
