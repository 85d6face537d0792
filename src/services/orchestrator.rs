//! Orchestrator: the single cycle loop (derive → validate → decay →
//! select → execute → maintain, spec.md §4.8) and the user-interaction
//! surface (spec.md §6). Exactly one cycle runs at a time — `run_cycle`
//! holds an internal `tokio::sync::Mutex` for its whole body, which is the
//! "single exclusive lock per cycle" concurrency model of spec.md §5.

use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::domain::errors::{GoalEngineError, GoalResult};
use crate::domain::models::goal::ArchiveReason;
use crate::domain::models::{ActionType, Goal, GoalState, GoalType, SubGoal, SubGoalStatus};
use crate::domain::ports::{ActionExecutor, Embedder, GoalRepository, LlmService, MemorySearcher, SkillRepository};

use super::archive_manager::ArchiveManager;
use super::derivation::DerivationEngine;
use super::edge_cases::handle_unknown_unknowns;
use super::goal_factory::GoalFactory;
use super::priority_calculator::{PriorityCalculator, PriorityConfig};
use super::progress_monitor::ProgressMonitor;
use super::review::{ReviewDecision, ReviewProcessor};
use super::selector::Selector;
use super::state_machine::{StateMachine, DEFAULT_LISTENER_CAPACITY};
use super::tree_builder::TreeBuilder;
use super::validation::{ValidationAction, ValidationEngine, ValidationOutcome};

#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub listener_queue_capacity: usize,
    pub stagnation_threshold: u32,
    pub priority: PriorityConfig,
    /// Derivation runs only on cycles where `cycle_number % derivation_interval == 0`
    /// (spec.md §4.8 step 1, "optionally run derivation every Nth cycle").
    pub derivation_interval: u64,
    /// Skill freshness decays only every Mth cycle (spec.md §4.8 step 7).
    pub freshness_decay_interval: u64,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            listener_queue_capacity: DEFAULT_LISTENER_CAPACITY,
            stagnation_threshold: super::progress_monitor::DEFAULT_STAGNATION_THRESHOLD,
            priority: PriorityConfig::default(),
            derivation_interval: DEFAULT_DERIVATION_INTERVAL,
            freshness_decay_interval: DEFAULT_FRESHNESS_DECAY_INTERVAL,
        }
    }
}

/// Default "Nth cycle" for derivation; spec.md §4.8 leaves N unspecified
/// beyond "optionally", so this mirrors the §2 budget table's framing of
/// derivation as an occasional, not per-tick, pass.
const DEFAULT_DERIVATION_INTERVAL: u64 = 5;

/// Default "Mth cycle" for skill freshness decay, per spec.md §4.8 step 7's
/// own example ("e.g. 10").
const DEFAULT_FRESHNESS_DECAY_INTERVAL: u64 = 10;

/// A summary of one full cycle, returned for logging/introspection.
#[derive(Debug, Clone, Default)]
pub struct CycleReport {
    pub derived: usize,
    pub validated: usize,
    pub decayed: usize,
    pub activated: Option<Uuid>,
    pub reviewed: usize,
    pub archived: usize,
    pub revived: usize,
}

pub struct GoalOrchestrator<R: GoalRepository, S: SkillRepository> {
    repository: Arc<R>,
    skills: Arc<S>,
    state_machine: StateMachine,
    calculator: PriorityCalculator,
    factory: GoalFactory,
    validation: ValidationEngine<R>,
    derivation: DerivationEngine,
    tree_builder: TreeBuilder,
    selector: Selector,
    review: ReviewProcessor,
    progress_monitor: ProgressMonitor,
    executor: RwLock<Arc<dyn ActionExecutor>>,
    available_tools: RwLock<Vec<String>>,
    active_goal_id: RwLock<Option<Uuid>>,
    cycle_lock: Mutex<()>,
    cycle_count: Mutex<u64>,
    derivation_interval: u64,
    freshness_decay_interval: u64,
}

impl<R: GoalRepository, S: SkillRepository> GoalOrchestrator<R, S> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        repository: Arc<R>,
        skills: Arc<S>,
        memory: Arc<dyn MemorySearcher>,
        llm: Arc<dyn LlmService>,
        embedder: Option<Arc<dyn Embedder>>,
        executor: Arc<dyn ActionExecutor>,
        config: OrchestratorConfig,
    ) -> Self {
        let calculator = PriorityCalculator::new(config.priority.clone());
        let factory = GoalFactory::new(calculator.clone());
        let validation = ValidationEngine::new(repository.clone(), embedder);
        let derivation = DerivationEngine::new(memory, llm.clone(), factory.clone());
        let tree_builder = TreeBuilder::new(llm);
        let selector = Selector::new(calculator.clone());
        let progress_monitor = ProgressMonitor::new(config.stagnation_threshold);
        let review = ReviewProcessor::new(ProgressMonitor::new(config.stagnation_threshold), calculator.clone());

        Self {
            repository,
            skills,
            state_machine: StateMachine::new(config.listener_queue_capacity),
            calculator,
            factory,
            validation,
            derivation,
            tree_builder,
            selector,
            review,
            progress_monitor,
            executor: RwLock::new(executor),
            available_tools: RwLock::new(Vec::new()),
            active_goal_id: RwLock::new(None),
            cycle_lock: Mutex::new(()),
            cycle_count: Mutex::new(0),
            derivation_interval: config.derivation_interval.max(1),
            freshness_decay_interval: config.freshness_decay_interval.max(1),
        }
    }

    // ---- user-interaction surface (spec.md §6) ----

    pub async fn get_active_goal(&self) -> GoalResult<Option<Goal>> {
        match *self.active_goal_id.read().await {
            Some(id) => self.repository.get(id).await,
            None => Ok(None),
        }
    }

    pub async fn get_queued_goals(&self) -> GoalResult<Vec<Goal>> {
        self.repository.get_by_state(GoalState::Queued).await
    }

    pub async fn get_goal_details(&self, id: Uuid) -> GoalResult<Goal> {
        self.repository.get(id).await?.ok_or(GoalEngineError::GoalNotFound(id))
    }

    /// Stop a goal outright: archive it as USER_CANCELLED regardless of its
    /// current state (every state reaches ARCHIVED per spec.md §4.1).
    pub async fn stop_goal(&self, id: Uuid) -> GoalResult<()> {
        let mut goal = self.get_goal_details(id).await?;
        if goal.lifecycle.state != GoalState::Archived {
            if goal.lifecycle.state == GoalState::Active {
                self.state_machine.transition(&mut goal, GoalState::Reviewing)?;
            }
            self.state_machine.transition(&mut goal, GoalState::Archived)?;
            goal.archive.reason = Some(ArchiveReason::UserCancelled);
        }
        if self.active_goal_id.read().await.as_ref() == Some(&id) {
            *self.active_goal_id.write().await = None;
        }
        self.repository.store(&goal).await
    }

    /// User-directed priority override; clamped to the goal's cap.
    pub async fn prioritize_goal(&self, id: Uuid, new_priority: f64) -> GoalResult<()> {
        let mut goal = self.get_goal_details(id).await?;
        goal.priority.current = new_priority.clamp(0.0, goal.priority.cap);
        self.repository.store(&goal).await
    }

    pub async fn set_available_tools(&self, tools: Vec<String>) {
        *self.available_tools.write().await = tools;
    }

    pub async fn set_embedder(&self, embedder: Option<Arc<dyn Embedder>>) {
        self.validation.set_embedder(embedder).await;
    }

    pub async fn set_executor(&self, executor: Arc<dyn ActionExecutor>) {
        *self.executor.write().await = executor;
    }

    /// Propose a new user goal directly into PROPOSED, ready for the next
    /// cycle's validation pass.
    pub async fn propose_user_goal(
        &self,
        title: impl Into<String>,
        description: impl Into<String>,
        goal_type: GoalType,
        time_score: f64,
        required_capabilities: Vec<String>,
    ) -> GoalResult<Uuid> {
        let goal = self.factory.create_user_goal(title, description, goal_type, time_score, required_capabilities);
        let id = goal.id;
        info!(%id, "new user goal proposed");
        self.repository.store(&goal).await?;
        Ok(id)
    }

    // ---- the cycle (spec.md §4.8) ----

    /// Run exactly one cycle: derive, validate, decay, select, execute one
    /// step of the active goal, then maintain (stagnation review + archive
    /// revival + skill freshness decay). Only one cycle body executes at a
    /// time per orchestrator instance.
    #[instrument(skip(self, derivation_seed))]
    pub async fn run_cycle(&self, derivation_seed: &str) -> GoalResult<CycleReport> {
        let _guard = self.cycle_lock.lock().await;
        let mut report = CycleReport::default();

        let cycle_number = {
            let mut count = self.cycle_count.lock().await;
            *count += 1;
            *count
        };

        if cycle_number % self.derivation_interval == 0 {
            self.derive(derivation_seed, &mut report).await?;
        }
        self.validate_proposed(&mut report).await?;
        self.decay_priorities(&mut report).await?;
        self.select_and_activate(&mut report).await?;
        self.execute_active_step(&mut report).await?;
        self.maintain(&mut report, cycle_number).await?;

        Ok(report)
    }

    async fn derive(&self, seed: &str, report: &mut CycleReport) -> GoalResult<()> {
        let proposals = self.derivation.derive_goals(seed).await?;
        report.derived = proposals.len();
        for goal in proposals {
            self.repository.store(&goal).await?;
        }
        Ok(())
    }

    async fn validate_proposed(&self, report: &mut CycleReport) -> GoalResult<()> {
        let proposed = self.repository.get_by_state(GoalState::Proposed).await?;
        let queued = self.repository.get_by_state(GoalState::Queued).await?;
        let tools = self.available_tools.read().await.clone();

        for mut goal in proposed {
            self.state_machine.transition(&mut goal, GoalState::Validating)?;
            let outcome = self.validation.validate(&goal, &tools, &queued).await?;
            self.apply_validation_outcome(&mut goal, outcome).await?;
            report.validated += 1;
        }
        Ok(())
    }

    async fn apply_validation_outcome(&self, goal: &mut Goal, outcome: ValidationOutcome) -> GoalResult<()> {
        match outcome.action {
            ValidationAction::Queue => {
                if goal.classification.time_score <= 0.0 {
                    // No LLM-enhanced time estimator is wired into this crate
                    // (spec.md §4.8 step 3); fall straight to the heuristic
                    // base unit it names as the fallback.
                    goal.classification.time_score = super::goal_factory::FALLBACK_TIME_SCORE;
                }
                self.state_machine.transition(goal, GoalState::Queued)?;
                self.repository.store(goal).await?;
            }
            ValidationAction::Archive { reason } => {
                self.state_machine.transition(goal, GoalState::Archived)?;
                goal.archive.reason = Some(reason);
                goal.archive.missing_capabilities = goal.classification.required_capabilities.clone();
                self.repository.store(goal).await?;
            }
            ValidationAction::Merge { target } => {
                self.state_machine.transition(goal, GoalState::Archived)?;
                goal.archive.reason = Some(ArchiveReason::Duplicate);
                self.repository.store(goal).await?;

                if let Some(mut existing) = self.repository.get(target).await? {
                    if existing.lifecycle.state == GoalState::Archived {
                        let manager = ArchiveManager::new(&self.state_machine);
                        manager.revive(&mut existing)?;
                    }
                    self.calculator.apply_strengthening(&mut existing);
                    self.repository.store(&existing).await?;
                }
            }
            ValidationAction::Subsume { target } => {
                self.state_machine.transition(goal, GoalState::Archived)?;
                goal.archive.reason = Some(ArchiveReason::Duplicate);
                self.repository.store(goal).await?;

                if let Some(mut parent) = self.repository.get(target).await? {
                    let next_id = format!("{}", parent.sub_goals.len() + 1);
                    let mut sub = SubGoal::new(next_id, goal.title.clone(), ActionType::Plan);
                    sub.description = goal.description.clone();
                    parent.sub_goals.push(sub);
                    parent.recalculate_tree_depth();
                    self.repository.store(&parent).await?;
                }
            }
            ValidationAction::ParentDemotion { target } => {
                self.state_machine.transition(goal, GoalState::Queued)?;
                if let Some(mut old_parent) = self.repository.get(target).await? {
                    self.state_machine.transition(&mut old_parent, GoalState::Archived)?;
                    old_parent.archive.reason = Some(ArchiveReason::Duplicate);
                    self.repository.store(&old_parent).await?;

                    let next_id = format!("{}", goal.sub_goals.len() + 1);
                    let mut sub = SubGoal::new(next_id, old_parent.title.clone(), ActionType::Plan);
                    sub.description = old_parent.description.clone();
                    goal.sub_goals.push(sub);
                    goal.recalculate_tree_depth();
                }
                self.repository.store(goal).await?;
            }
        }
        Ok(())
    }

    async fn decay_priorities(&self, report: &mut CycleReport) -> GoalResult<()> {
        let mut decayed = 0;

        for mut goal in self.repository.get_by_state(GoalState::Active).await? {
            self.calculator.apply_decay(&mut goal, 1);
            decayed += 1;
            self.repository.store(&goal).await?;
        }

        // QUEUED goals archive directly on reaching the floor (spec.md §4.8
        // step 4); this must not wait for the goal to be promoted and
        // reviewed, since a crowded queue may never promote it at all.
        let manager = ArchiveManager::new(&self.state_machine);
        for mut goal in self.repository.get_by_state(GoalState::Queued).await? {
            self.calculator.apply_decay(&mut goal, 1);
            decayed += 1;
            if goal.priority.current <= self.calculator.archive_floor() {
                manager.archive_goal(&mut goal, ArchiveReason::PriorityDecay, Vec::new())?;
                report.archived += 1;
            }
            self.repository.store(&goal).await?;
        }

        report.decayed = decayed;
        Ok(())
    }

    async fn select_and_activate(&self, report: &mut CycleReport) -> GoalResult<()> {
        let queued = self.repository.get_by_state(GoalState::Queued).await?;
        let active = self.get_active_goal().await?;

        let Some(next_id) = self.selector.select_next_goal(&queued, active.as_ref()) else {
            return Ok(());
        };

        if let Some(mut current) = active {
            self.state_machine.transition(&mut current, GoalState::Paused)?;
            self.state_machine.transition(&mut current, GoalState::Queued)?;
            self.repository.store(&current).await?;
        }

        let mut next = self.repository.get(next_id).await?.ok_or(GoalEngineError::GoalNotFound(next_id))?;
        self.state_machine.transition(&mut next, GoalState::Active)?;
        if next.sub_goals.is_empty() {
            let tools = self.available_tools.read().await.clone();
            self.tree_builder.build_plan(&mut next, &tools).await?;
        }
        self.repository.store(&next).await?;
        *self.active_goal_id.write().await = Some(next_id);
        report.activated = Some(next_id);
        Ok(())
    }

    async fn execute_active_step(&self, _report: &mut CycleReport) -> GoalResult<()> {
        let Some(goal_id) = *self.active_goal_id.read().await else {
            return Ok(());
        };
        let Some(mut goal) = self.repository.get(goal_id).await? else {
            return Ok(());
        };

        let Some(step) = goal.sub_goals.iter().position(|candidate| {
            candidate.status == SubGoalStatus::Pending && dependencies_met(&goal.sub_goals, candidate)
        }) else {
            return Ok(());
        };

        goal.sub_goals[step].status = SubGoalStatus::Active;
        let (tool, params) = {
            let s = &goal.sub_goals[step];
            (s.tool_name.clone().unwrap_or_default(), s.parameters.clone())
        };

        let executor = self.executor.read().await.clone();
        match executor.execute_tool_action(&tool, &params).await {
            Ok(outcome) => {
                // Executors signal an "unknown unknowns" knowledge gap by
                // prefixing the outcome with `GAP:`; the step still counts
                // as completed, but a discovery step is queued ahead of the
                // rest of the plan (spec.md §4.5). Insert the gap node only
                // after recording the completion, since it shifts indices.
                let gap = outcome.strip_prefix("GAP:").map(str::trim).map(str::to_string);
                goal.sub_goals[step].status = SubGoalStatus::Completed;
                goal.sub_goals[step].outcome = Some(outcome);
                if let Some(gap) = gap {
                    handle_unknown_unknowns(&mut goal, gap);
                }
            }
            Err(err) => {
                warn!(%goal_id, error = %err, "sub-goal execution failed");
                goal.sub_goals[step].status = SubGoalStatus::Failed;
                goal.sub_goals[step].failure_reason = Some(err.to_string());
            }
        }

        self.progress_monitor.tick(&mut goal);
        self.repository.store(&goal).await
    }

    async fn maintain(&self, report: &mut CycleReport, cycle_number: u64) -> GoalResult<()> {
        self.review_active_and_reviewing(report).await?;
        self.revive_archived(report).await?;
        if cycle_number % self.freshness_decay_interval == 0 {
            self.decay_skill_freshness().await?;
        }
        Ok(())
    }

    async fn review_active_and_reviewing(&self, report: &mut CycleReport) -> GoalResult<()> {
        let mut candidates = self.repository.get_by_state(GoalState::Active).await?;
        candidates.extend(self.repository.get_by_state(GoalState::Reviewing).await?);
        candidates.sort_by(|a, b| self.selector.order_for_review(a, b));

        let queued = self.repository.get_by_state(GoalState::Queued).await?;
        let best_queued_score = self.selector.best_queued_score(&queued);

        for mut goal in candidates {
            report.reviewed += 1;
            match self.review.review(&goal, best_queued_score) {
                ReviewDecision::Continue => {}
                ReviewDecision::Complete => {
                    self.state_machine.transition(&mut goal, GoalState::Reviewing)?;
                    self.state_machine.transition(&mut goal, GoalState::Completed)?;
                    self.clear_active_if(goal.id).await;
                }
                ReviewDecision::Demote => {
                    self.state_machine.transition(&mut goal, GoalState::Reviewing)?;
                    self.state_machine.transition(&mut goal, GoalState::Queued)?;
                    self.clear_active_if(goal.id).await;
                }
                ReviewDecision::Archive { reason } => {
                    if goal.lifecycle.state == GoalState::Active {
                        self.state_machine.transition(&mut goal, GoalState::Reviewing)?;
                    }
                    let manager = ArchiveManager::new(&self.state_machine);
                    manager.archive_goal(&mut goal, reason, Vec::new())?;
                    report.archived += 1;
                    self.clear_active_if(goal.id).await;
                }
                ReviewDecision::Replan { failed_sub_goal_id } => {
                    if let Some(failed_id) = failed_sub_goal_id {
                        let tools = self.available_tools.read().await.clone();
                        if let Err(err) = self.tree_builder.replan_branch(&mut goal, &failed_id, &tools).await {
                            warn!(%err, %failed_id, "replan failed, leaving branch as-is for the next review");
                        }
                    }
                    goal.lifecycle.stagnation_counter = 0;
                }
            }
            self.repository.store(&goal).await?;
        }
        Ok(())
    }

    async fn clear_active_if(&self, id: Uuid) {
        let mut active = self.active_goal_id.write().await;
        if *active == Some(id) {
            *active = None;
        }
    }

    async fn revive_archived(&self, report: &mut CycleReport) -> GoalResult<()> {
        let tools = self.available_tools.read().await.clone();
        let manager = ArchiveManager::new(&self.state_machine);
        for mut goal in self.repository.get_by_state(GoalState::Archived).await? {
            if manager.should_revive(&goal, &tools) {
                manager.revive(&mut goal)?;
                report.revived += 1;
                self.repository.store(&goal).await?;
            }
        }
        Ok(())
    }

    async fn decay_skill_freshness(&self) -> GoalResult<()> {
        for mut skill in self.skills.get_all().await? {
            skill.decay_freshness();
            self.skills.store(&skill).await?;
        }
        Ok(())
    }
}

/// Whether every id in `candidate.dependencies` maps to a COMPLETED sibling
/// in `sub_goals` — a sub-goal with an unmet dependency is never eligible
/// for execution (spec.md §3, §8).
fn dependencies_met(sub_goals: &[SubGoal], candidate: &SubGoal) -> bool {
    candidate
        .dependencies
        .iter()
        .all(|dep_id| sub_goals.iter().any(|s| &s.id == dep_id && s.status == SubGoalStatus::Completed))
}
