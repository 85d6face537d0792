//! Selector: picks the next goal to activate and orders goals for the
//! review loop (spec.md §4.4 "SelectNextGoal", "CompareForReview").

use std::cmp::Ordering;

use uuid::Uuid;

use crate::domain::models::Goal;

use super::priority_calculator::PriorityCalculator;

pub struct Selector {
    calculator: PriorityCalculator,
}

impl Selector {
    pub fn new(calculator: PriorityCalculator) -> Self {
        Self { calculator }
    }

    /// Choose the id of the QUEUED goal that should become ACTIVE, if any.
    ///
    /// With no goal currently active, the highest-`selection_score` queued
    /// goal wins outright. With a goal active, a queued challenger only wins
    /// if `should_switch_goal` clears its margin — otherwise `None`, meaning
    /// "keep the current goal active".
    pub fn select_next_goal(&self, queued: &[Goal], active: Option<&Goal>) -> Option<Uuid> {
        let best = queued
            .iter()
            .max_by(|a, b| self.compare_by_score(a, b))?;

        match active {
            None => Some(best.id),
            Some(current) => self.calculator.should_switch_goal(current, best).then_some(best.id),
        }
    }

    /// Ordering used by the review loop to decide which ACTIVE/REVIEWING
    /// goal to process first: descending selection score. This is purely an
    /// iteration-order helper, distinct from spec.md §4.4's
    /// `CompareForReview` (see `best_queued_score`).
    pub fn order_for_review(&self, a: &Goal, b: &Goal) -> Ordering {
        self.compare_by_score(b, a)
    }

    /// The `score(bestQueued)` term of spec.md §4.4's `CompareForReview`:
    /// the highest `SelectionScore` among `queued`, fed into
    /// `ReviewProcessor::review` so it can demote an active goal that a
    /// queued challenger now outscores.
    pub fn best_queued_score(&self, queued: &[Goal]) -> Option<f64> {
        queued
            .iter()
            .map(|g| self.calculator.selection_score(g))
            .fold(None, |best: Option<f64>, score| Some(best.map_or(score, |b| b.max(score))))
    }

    fn compare_by_score(&self, a: &Goal, b: &Goal) -> Ordering {
        self.calculator
            .selection_score(a)
            .partial_cmp(&self.calculator.selection_score(b))
            .unwrap_or(Ordering::Equal)
    }
}
