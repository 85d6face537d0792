//! Priority calculator: decay, strengthening, selection score and the
//! switching-margin safeguard against thrashing (spec.md §4.2).

use rand::Rng;

use crate::domain::models::{Goal, GoalOrigin, GoalState};

/// Tunable weights, defaulting to the values spec.md §4.2 lists.
#[derive(Debug, Clone)]
pub struct PriorityConfig {
    pub user_base_range: (f64, f64),
    pub ai_base_range: (f64, f64),
    pub active_decay_rate: f64,
    pub queued_decay_rate: f64,
    pub strengthening_range: (f64, f64),
    pub selection_exponent: f64,
    pub progress_bonus_factor: f64,
    pub archive_floor: f64,
    pub decay_floor: f64,
}

impl Default for PriorityConfig {
    fn default() -> Self {
        Self {
            user_base_range: (80.0, 100.0),
            ai_base_range: (40.0, 60.0),
            active_decay_rate: 1.0,
            queued_decay_rate: 5.0,
            strengthening_range: (5.0, 15.0),
            selection_exponent: 0.7,
            progress_bonus_factor: 0.5,
            archive_floor: 10.0,
            decay_floor: 10.0,
        }
    }
}

/// Margin added to the active goal's progress-bonus score before a proposed
/// goal is allowed to preempt it. Asymmetric: AI-originated proposals face a
/// much larger margin so autonomous derivation cannot cause churn against a
/// human-directed effort in progress.
const USER_SWITCH_MARGIN: f64 = 10.0;
const AI_SWITCH_MARGIN: f64 = 30.0;

/// Progress percentage at or above which `ShouldSwitchGoal` always refuses
/// (completion protection).
const COMPLETION_PROTECTION_THRESHOLD: f64 = 80.0;

#[derive(Debug, Clone)]
pub struct PriorityCalculator {
    config: PriorityConfig,
}

impl Default for PriorityCalculator {
    fn default() -> Self {
        Self::new(PriorityConfig::default())
    }
}

impl PriorityCalculator {
    pub fn new(config: PriorityConfig) -> Self {
        Self { config }
    }

    /// Sample a base priority for a freshly proposed goal, per its origin.
    pub fn sample_base_priority(&self, origin: GoalOrigin) -> f64 {
        let (lo, hi) = match origin {
            GoalOrigin::User => self.config.user_base_range,
            GoalOrigin::Ai => self.config.ai_base_range,
        };
        rand::thread_rng().gen_range(lo..=hi)
    }

    /// Apply `n` cycles of decay. No-op outside ACTIVE/QUEUED. The floor at
    /// `decay_floor` (10 by default) is the pre-archival buffer; the
    /// orchestrator is responsible for archiving once priority drops below
    /// that floor on its own initiative (spec.md §4.2).
    pub fn apply_decay(&self, goal: &mut Goal, n: u32) {
        let rate = match goal.lifecycle.state {
            GoalState::Active => self.config.active_decay_rate,
            GoalState::Queued => self.config.queued_decay_rate,
            _ => return,
        };
        goal.priority.current = (goal.priority.current - rate * f64::from(n)).max(self.config.decay_floor);
        goal.priority.last_calculation = chrono::Utc::now();
    }

    /// Bump priority in response to a duplicate re-proposal.
    pub fn apply_strengthening(&self, goal: &mut Goal) {
        let (lo, hi) = self.config.strengthening_range;
        let bump = rand::thread_rng().gen_range(lo..=hi);
        goal.priority.current = (goal.priority.current + bump).min(goal.priority.cap);
        goal.priority.proposal_count += 1;
        goal.priority.last_proposed = chrono::Utc::now();
    }

    /// `current_priority / max(1, time_score)^alpha`.
    pub fn selection_score(&self, goal: &Goal) -> f64 {
        let time_score = goal.classification.time_score.max(1.0);
        goal.priority.current / time_score.powf(self.config.selection_exponent)
    }

    /// Selection score inflated by progress, used only when comparing
    /// against the currently active goal.
    pub fn progress_bonus(&self, goal: &Goal) -> f64 {
        self.selection_score(goal) * (1.0 + goal.lifecycle.progress_percentage / 100.0 * self.config.progress_bonus_factor)
    }

    /// Whether `proposed` should preempt `active`. False once `active` is at
    /// or past the completion-protection threshold, regardless of scores.
    pub fn should_switch_goal(&self, active: &Goal, proposed: &Goal) -> bool {
        if active.lifecycle.progress_percentage >= COMPLETION_PROTECTION_THRESHOLD {
            return false;
        }
        let margin = match proposed.origin {
            GoalOrigin::User => USER_SWITCH_MARGIN,
            GoalOrigin::Ai => AI_SWITCH_MARGIN,
        };
        self.selection_score(proposed) > self.progress_bonus(active) + margin
    }

    pub fn archive_floor(&self) -> f64 {
        self.config.archive_floor
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{Classification, Goal, GoalOrigin, GoalState, GoalType};

    fn goal_with(origin: GoalOrigin, priority: f64, time_score: f64, progress: f64, state: GoalState) -> Goal {
        let mut g = Goal::new("t", "d", origin, Classification::new(GoalType::Achievable, time_score, vec![]));
        g.priority.current = priority;
        g.lifecycle.progress_percentage = progress;
        g.lifecycle.state = state;
        g
    }

    #[test]
    fn decay_floors_at_ten_for_active_and_queued() {
        let calc = PriorityCalculator::default();
        let mut active = goal_with(GoalOrigin::Ai, 12.0, 5.0, 0.0, GoalState::Active);
        calc.apply_decay(&mut active, 5);
        assert!(active.priority.current >= 10.0);

        let mut queued = goal_with(GoalOrigin::Ai, 12.0, 5.0, 0.0, GoalState::Queued);
        calc.apply_decay(&mut queued, 5);
        assert!(queued.priority.current >= 10.0);
    }

    #[test]
    fn decay_is_noop_outside_active_queued() {
        let calc = PriorityCalculator::default();
        let mut paused = goal_with(GoalOrigin::Ai, 50.0, 5.0, 0.0, GoalState::Paused);
        calc.apply_decay(&mut paused, 10);
        assert_eq!(paused.priority.current, 50.0);
    }

    #[test]
    fn strengthening_respects_cap_and_increments_count() {
        let calc = PriorityCalculator::default();
        let mut g = goal_with(GoalOrigin::Ai, 95.0, 5.0, 0.0, GoalState::Queued);
        let before_count = g.priority.proposal_count;
        calc.apply_strengthening(&mut g);
        assert!(g.priority.current <= g.priority.cap);
        assert_eq!(g.priority.proposal_count, before_count + 1);
    }

    #[test]
    fn switch_refused_near_completion() {
        let calc = PriorityCalculator::default();
        let active = goal_with(GoalOrigin::Ai, 50.0, 10.0, 85.0, GoalState::Active);
        let proposed = goal_with(GoalOrigin::Ai, 100.0, 10.0, 0.0, GoalState::Proposed);
        assert!(!calc.should_switch_goal(&active, &proposed));
    }

    #[test]
    fn ai_proposal_faces_larger_margin_than_user() {
        let calc = PriorityCalculator::default();
        let active = goal_with(GoalOrigin::Ai, 50.0, 10.0, 10.0, GoalState::Active);
        let ai_proposed = goal_with(GoalOrigin::Ai, 70.0, 10.0, 0.0, GoalState::Proposed);
        let user_proposed = goal_with(GoalOrigin::User, 70.0, 10.0, 0.0, GoalState::Proposed);
        // Same raw score, but user's smaller margin may tip it over while AI's doesn't.
        let active_bonus = calc.progress_bonus(&active);
        let score = calc.selection_score(&ai_proposed);
        let would_pass_user_margin = score > active_bonus + 10.0;
        let would_pass_ai_margin = score > active_bonus + 30.0;
        assert_eq!(calc.should_switch_goal(&active, &user_proposed), would_pass_user_margin);
        assert_eq!(calc.should_switch_goal(&active, &ai_proposed), would_pass_ai_margin);
    }
}
