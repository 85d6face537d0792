//! End-to-end lifecycle scenarios (spec.md §8).

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use goalkeeper::adapters::{InMemoryGoalRepository, InMemorySkillRepository};
use goalkeeper::domain::models::goal::ArchiveReason;
use goalkeeper::domain::models::sub_goal::ParamValue;
use goalkeeper::domain::models::{Classification, Goal, GoalOrigin, GoalState, GoalType};
use goalkeeper::domain::ports::{
    ActionExecutor, GoalRepository, LlmService, NullEmbedder, NullLlmService, NullMemorySearcher,
};
use goalkeeper::services::orchestrator::OrchestratorConfig;
use goalkeeper::GoalOrchestrator;

struct OneStepLlm;
#[async_trait]
impl LlmService for OneStepLlm {
    async fn generate_json(&self, _prompt: &str, _target: &str) -> goalkeeper::GoalResult<String> {
        Ok(r#"[{"id":"1","title":"first step","action_type":"research"}]"#.to_string())
    }
    async fn generate_text(&self, _prompt: &str) -> goalkeeper::GoalResult<String> {
        Ok(String::new())
    }
}

struct AlwaysSucceedsExecutor;
#[async_trait]
impl ActionExecutor for AlwaysSucceedsExecutor {
    async fn execute_tool_action(&self, _tool: &str, _params: &HashMap<String, ParamValue>) -> goalkeeper::GoalResult<String> {
        Ok("ok".to_string())
    }
}

type Orchestrator = GoalOrchestrator<InMemoryGoalRepository, InMemorySkillRepository>;

fn setup(llm: Arc<dyn LlmService>, executor: Arc<dyn ActionExecutor>) -> (Orchestrator, Arc<InMemoryGoalRepository>) {
    let repo = Arc::new(InMemoryGoalRepository::new());
    let orch = GoalOrchestrator::new(
        repo.clone(),
        Arc::new(InMemorySkillRepository::new()),
        Arc::new(NullMemorySearcher),
        llm,
        Some(Arc::new(NullEmbedder)),
        executor,
        OrchestratorConfig::default(),
    );
    (orch, repo)
}

#[tokio::test]
async fn user_goal_happy_path() {
    let (orch, _repo) = setup(Arc::new(OneStepLlm), Arc::new(AlwaysSucceedsExecutor));

    let id = orch
        .propose_user_goal("Learn kanji radicals", "Learn kanji radicals", GoalType::Achievable, 5.0, Vec::new())
        .await
        .unwrap();

    orch.run_cycle("happy path").await.unwrap();

    let goal = orch.get_goal_details(id).await.unwrap();
    assert!((80.0..=100.0).contains(&goal.priority.base));
    assert!(!goal.sub_goals.is_empty());
    assert!(goal.sub_goals.iter().any(|s| s.status == goalkeeper::domain::models::sub_goal::SubGoalStatus::Completed));
    // a single-step plan that succeeds completes within the same cycle
    assert_eq!(goal.lifecycle.state, GoalState::Completed);
}

#[tokio::test]
async fn duplicate_proposal_is_archived_and_strengthens_the_survivor() {
    let (orch, repo) = setup(Arc::new(NullLlmService), Arc::new(AlwaysSucceedsExecutor));

    let first = orch
        .propose_user_goal(
            "Improve French teaching skills",
            "Improve French teaching skills",
            GoalType::CapabilityBuilding,
            5.0,
            Vec::new(),
        )
        .await
        .unwrap();
    let second = orch
        .propose_user_goal(
            "Improve French teaching skills",
            "Improve French teaching skills",
            GoalType::CapabilityBuilding,
            5.0,
            Vec::new(),
        )
        .await
        .unwrap();

    orch.run_cycle("duplicate").await.unwrap();

    let a = repo.get(first).await.unwrap().unwrap();
    let b = repo.get(second).await.unwrap().unwrap();
    let goals = [a, b];

    let archived = goals.iter().filter(|g| g.archive.reason == Some(ArchiveReason::Duplicate)).count();
    let survivor = goals.iter().find(|g| g.archive.reason != Some(ArchiveReason::Duplicate)).unwrap();

    assert_eq!(archived, 1);
    assert_eq!(survivor.priority.proposal_count, 2);
    assert!(survivor.priority.current >= survivor.priority.base);
}

#[tokio::test]
async fn missing_tools_archives_then_revives_once_tool_is_available() {
    let (orch, _repo) = setup(Arc::new(NullLlmService), Arc::new(AlwaysSucceedsExecutor));

    let id = orch
        .propose_user_goal(
            "Summarize a web page",
            "Summarize a web page",
            GoalType::Achievable,
            5.0,
            vec!["web_parse".to_string()],
        )
        .await
        .unwrap();

    orch.run_cycle("no tools yet").await.unwrap();
    let archived = orch.get_goal_details(id).await.unwrap();
    assert_eq!(archived.lifecycle.state, GoalState::Archived);
    assert_eq!(archived.archive.reason, Some(ArchiveReason::MissingTools));
    assert_eq!(archived.archive.missing_capabilities, vec!["web_parse".to_string()]);

    orch.set_available_tools(vec!["web_parse".to_string()]).await;
    orch.run_cycle("tool now available").await.unwrap();

    let revived = orch.get_goal_details(id).await.unwrap();
    assert_eq!(revived.lifecycle.state, GoalState::Queued);
    assert!(revived.archive.reason.is_none());
}

#[tokio::test]
async fn low_priority_queued_goal_decays_to_archive() {
    let (orch, repo) = setup(Arc::new(NullLlmService), Arc::new(AlwaysSucceedsExecutor));

    let mut low_priority = Goal::new(
        "stale idea",
        "stale idea",
        GoalOrigin::Ai,
        Classification::new(GoalType::Achievable, 5.0, Vec::new()),
    );
    low_priority.lifecycle.state = GoalState::Queued;
    low_priority.priority.current = 12.0;
    let id = low_priority.id;
    repo.store(&low_priority).await.unwrap();

    for _ in 0..3 {
        orch.run_cycle("decay").await.unwrap();
    }

    let goal = orch.get_goal_details(id).await.unwrap();
    assert_eq!(goal.lifecycle.state, GoalState::Archived);
    assert_eq!(goal.archive.reason, Some(ArchiveReason::PriorityDecay));
}

#[tokio::test]
async fn stagnant_active_goal_is_replanned() {
    let (orch, repo) = setup(Arc::new(NullLlmService), Arc::new(AlwaysSucceedsExecutor));

    let mut goal = Goal::new(
        "long haul project",
        "long haul project",
        GoalOrigin::User,
        Classification::new(GoalType::Achievable, 5.0, Vec::new()),
    );
    goal.lifecycle.state = GoalState::Active;
    goal.lifecycle.stagnation_counter = 5;
    goal.priority.current = 50.0;
    goal.sub_goals.push(goalkeeper::domain::models::SubGoal::new(
        "1",
        "stuck step",
        goalkeeper::domain::models::ActionType::Research,
    ));
    goal.sub_goals[0].status = goalkeeper::domain::models::sub_goal::SubGoalStatus::Failed;
    let id = goal.id;
    repo.store(&goal).await.unwrap();

    orch.run_cycle("stagnation").await.unwrap();

    let reviewed = orch.get_goal_details(id).await.unwrap();
    assert_eq!(reviewed.lifecycle.state, GoalState::Active);
    assert_eq!(reviewed.lifecycle.stagnation_counter, 0);
}
