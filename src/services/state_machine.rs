//! Goal state machine: the single place allowed to mutate `Goal::lifecycle.state`.
//!
//! Listener fan-out is a bounded `tokio::sync::broadcast` channel rather than
//! an unbounded spawn per listener (spec.md §9: "Listener callbacks should be
//! delivered through a bounded queue rather than unbounded asynchronous
//! dispatch"). `broadcast` drops the oldest unread event for a lagging
//! receiver instead of growing without bound or blocking the sender, which is
//! exactly the "must not block the transition" requirement of spec.md §4.1.

use chrono::{DateTime, Utc};
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::domain::errors::{GoalEngineError, GoalResult};
use crate::domain::models::{Goal, GoalState};

/// A single goal transition, as delivered to listeners.
#[derive(Debug, Clone)]
pub struct TransitionEvent {
    pub goal_id: Uuid,
    pub from: GoalState,
    pub to: GoalState,
    pub at: DateTime<Utc>,
}

/// Default bound for the listener fan-out channel. Configurable via
/// [`crate::infrastructure::config::EngineConfig::listener_queue_capacity`].
pub const DEFAULT_LISTENER_CAPACITY: usize = 256;

/// Owns the transition listener channel and performs the actual mutation.
pub struct StateMachine {
    tx: broadcast::Sender<TransitionEvent>,
}

impl StateMachine {
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Subscribe to transition events. Listeners that fall behind lose the
    /// oldest unread events rather than stalling the orchestrator.
    pub fn subscribe(&self) -> broadcast::Receiver<TransitionEvent> {
        self.tx.subscribe()
    }

    /// Attempt `goal.lifecycle.state -> to`. On success the goal is mutated
    /// in place, the side-effect timestamps of spec.md §4.1 are recorded, and
    /// the event is published (fire-and-forget; fan-out failures are not
    /// reported to the caller). On failure the goal is left bit-identical.
    pub fn transition(&self, goal: &mut Goal, to: GoalState) -> GoalResult<TransitionEvent> {
        let from = goal.lifecycle.state;
        if !from.can_transition_to(to) {
            return Err(GoalEngineError::InvalidTransition {
                from: from.as_str().to_string(),
                to: to.as_str().to_string(),
            });
        }

        let now = Utc::now();
        goal.lifecycle.state = to;

        match to {
            GoalState::Active => goal.lifecycle.last_progress_timestamp = now,
            GoalState::Archived => goal.archive.timestamp = Some(now),
            _ => {}
        }

        let event = TransitionEvent {
            goal_id: goal.id,
            from,
            to,
            at: now,
        };

        // A broadcast channel with no receivers returns an error; that is not
        // a transition failure, just an unobserved event.
        let _ = self.tx.send(event.clone());

        Ok(event)
    }
}

impl Default for StateMachine {
    fn default() -> Self {
        Self::new(DEFAULT_LISTENER_CAPACITY)
    }
}
