//! Archive manager: `ArchiveGoal` and `CheckAndRevive` (spec.md §4.6).

use crate::domain::errors::GoalResult;
use crate::domain::models::goal::{Archive, ArchiveReason};
use crate::domain::models::{Goal, GoalState};

use super::state_machine::{StateMachine, TransitionEvent};

pub struct ArchiveManager<'a> {
    state_machine: &'a StateMachine,
}

impl<'a> ArchiveManager<'a> {
    pub fn new(state_machine: &'a StateMachine) -> Self {
        Self { state_machine }
    }

    /// Transition `goal` into ARCHIVED, recording `reason` and, for
    /// `MissingTools`, the specific capabilities that were absent so
    /// `check_and_revive` can later tell whether they've since appeared.
    pub fn archive_goal(
        &self,
        goal: &mut Goal,
        reason: ArchiveReason,
        missing_capabilities: Vec<String>,
    ) -> GoalResult<TransitionEvent> {
        let event = self.state_machine.transition(goal, GoalState::Archived)?;
        goal.archive.reason = Some(reason);
        goal.archive.missing_capabilities = missing_capabilities;
        Ok(event)
    }

    /// Whether an archived goal's revival condition is currently satisfied.
    /// Only `MissingTools` archives are revivable automatically; all other
    /// reasons require an explicit user action (spec.md §4.6).
    pub fn should_revive(&self, goal: &Goal, available_tools: &[String]) -> bool {
        if goal.lifecycle.state != GoalState::Archived {
            return false;
        }
        match goal.archive.reason {
            Some(ArchiveReason::MissingTools) => {
                let lowered: Vec<String> = available_tools.iter().map(|t| t.to_lowercase()).collect();
                !goal.archive.missing_capabilities.is_empty()
                    && goal
                        .archive
                        .missing_capabilities
                        .iter()
                        .all(|cap| lowered.contains(&cap.to_lowercase()))
            }
            _ => false,
        }
    }

    /// Revive `goal` back to QUEUED, clearing archive metadata. Callers are
    /// expected to have already checked `should_revive` (or to be acting on
    /// an explicit user request, which bypasses the automatic condition).
    pub fn revive(&self, goal: &mut Goal) -> GoalResult<TransitionEvent> {
        let event = self.state_machine.transition(goal, GoalState::Queued)?;
        goal.archive = Archive::default();
        Ok(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{Classification, Goal, GoalOrigin, GoalType};

    fn queued_goal() -> Goal {
        let mut g = Goal::new("t", "d", GoalOrigin::User, Classification::new(GoalType::Achievable, 5.0, vec![]));
        g.lifecycle.state = GoalState::Queued;
        g
    }

    #[test]
    fn archiving_records_missing_capabilities() {
        let sm = StateMachine::default();
        let manager = ArchiveManager::new(&sm);
        let mut goal = queued_goal();
        manager
            .archive_goal(&mut goal, ArchiveReason::MissingTools, vec!["image_gen".to_string()])
            .unwrap();
        assert_eq!(goal.lifecycle.state, GoalState::Archived);
        assert_eq!(goal.archive.reason, Some(ArchiveReason::MissingTools));
    }

    #[test]
    fn revives_once_all_missing_tools_present() {
        let sm = StateMachine::default();
        let manager = ArchiveManager::new(&sm);
        let mut goal = queued_goal();
        manager
            .archive_goal(&mut goal, ArchiveReason::MissingTools, vec!["image_gen".to_string()])
            .unwrap();

        assert!(!manager.should_revive(&goal, &[]));
        assert!(manager.should_revive(&goal, &["image_gen".to_string()]));

        manager.revive(&mut goal).unwrap();
        assert_eq!(goal.lifecycle.state, GoalState::Queued);
        assert!(goal.archive.reason.is_none());
    }

    #[test]
    fn user_cancelled_never_auto_revives() {
        let sm = StateMachine::default();
        let manager = ArchiveManager::new(&sm);
        let mut goal = queued_goal();
        manager.archive_goal(&mut goal, ArchiveReason::UserCancelled, vec![]).unwrap();
        assert!(!manager.should_revive(&goal, &["anything".to_string()]));
    }
}
