//! Business logic of the goal lifecycle orchestrator. Each module operates
//! on the domain models through the collaborator ports; none of them know
//! about persistence details or transport.

pub mod archive_manager;
pub mod derivation;
pub mod edge_cases;
pub mod goal_factory;
pub mod orchestrator;
pub mod priority_calculator;
pub mod progress_monitor;
pub mod review;
pub mod selector;
pub mod state_machine;
pub mod tree_builder;
pub mod validation;

pub use archive_manager::ArchiveManager;
pub use derivation::DerivationEngine;
pub use goal_factory::GoalFactory;
pub use orchestrator::{GoalOrchestrator, OrchestratorConfig};
pub use priority_calculator::{PriorityCalculator, PriorityConfig};
pub use progress_monitor::ProgressMonitor;
pub use review::{ReviewDecision, ReviewProcessor};
pub use selector::Selector;
pub use state_machine::{StateMachine, TransitionEvent};
pub use tree_builder::TreeBuilder;
pub use validation::{ValidationAction, ValidationEngine, ValidationOutcome};
