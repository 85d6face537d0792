//! Tree builder: turns an LLM plan response into a `SubGoal` tree, and
//! replans a failed branch in place (spec.md §4.7 "Tree builder",
//! "ReplanSubTree").

use std::collections::HashMap;
use std::sync::Arc;

use serde::Deserialize;
use tracing::warn;

use crate::domain::errors::{GoalEngineError, GoalResult};
use crate::domain::models::sub_goal::{ActionType, EstimatedEffort, ParamValue};
use crate::domain::models::{Goal, SubGoal, SubGoalStatus};
use crate::domain::ports::LlmService;

use super::edge_cases::handle_strategy_loop;

#[derive(Debug, Deserialize)]
struct StepPayload {
    id: String,
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    dependencies: Vec<String>,
    #[serde(default = "default_effort")]
    estimated_effort: EstimatedEffort,
    action_type: ActionType,
    #[serde(default)]
    tool_name: Option<String>,
    #[serde(default)]
    parameters: HashMap<String, ParamValue>,
    #[serde(default = "default_time_score")]
    time_score_estimate: f64,
}

fn default_effort() -> EstimatedEffort {
    EstimatedEffort::Medium
}

fn default_time_score() -> f64 {
    1.0
}

pub struct TreeBuilder {
    llm: Arc<dyn LlmService>,
}

impl TreeBuilder {
    pub fn new(llm: Arc<dyn LlmService>) -> Self {
        Self { llm }
    }

    /// Ask the LLM for a decomposition of `goal` into sub-goals, adopt it as
    /// the current plan, and populate the sub-goal tree. Any `tool_name` the
    /// LLM names that isn't in `available_tools` falls back to the step's
    /// action-type default (spec.md §4.7).
    pub async fn build_plan(&self, goal: &mut Goal, available_tools: &[String]) -> GoalResult<()> {
        let prompt = format!(
            "Decompose the following goal into an ordered sequence of sub-goal steps:\nTitle: {}\nDescription: {}",
            goal.title, goal.description
        );
        let raw = self
            .llm
            .generate_json(&prompt, "array of plan steps with id, title, action_type, dependencies")
            .await?;

        let steps = parse_plan(&raw, available_tools)?;
        let plan_titles = steps.iter().map(|s| s.title.clone()).collect();
        goal.strategy.adopt_plan(plan_titles);
        goal.sub_goals = steps;
        goal.recalculate_tree_depth();
        Ok(())
    }

    /// Replace the subtree rooted at `failed_id` (that node and all of its
    /// descendants) with `replacement_titles`, reusing `failed_id` as the
    /// new children's hierarchical prefix (spec.md §4.7 "ReplanSubTree").
    pub fn replan_sub_tree(
        &self,
        goal: &mut Goal,
        failed_id: &str,
        replacement: Vec<(String, ActionType)>,
    ) -> GoalResult<()> {
        let anchor = goal
            .sub_goals
            .iter()
            .position(|s| s.id == failed_id)
            .ok_or_else(|| GoalEngineError::SubGoalNotFound(failed_id.to_string(), goal.id))?;

        let prefix = format!("{failed_id}.");
        goal.sub_goals.retain(|s| s.id != failed_id && !s.id.starts_with(&prefix));

        let new_nodes: Vec<SubGoal> = replacement
            .into_iter()
            .enumerate()
            .map(|(i, (title, action_type))| SubGoal::new(format!("{failed_id}.{}", i + 1), title, action_type))
            .collect();

        let insert_at = anchor.min(goal.sub_goals.len());
        for (offset, node) in new_nodes.into_iter().enumerate() {
            goal.sub_goals.insert(insert_at + offset, node);
        }
        goal.recalculate_tree_depth();
        Ok(())
    }

    /// Ask the LLM for a fresh approach to the branch rooted at `failed_id`,
    /// steering it away from `goal.strategy.attempted_approaches`, then
    /// replace that branch. Proposed steps that repeat an attempted
    /// approach are dropped (spec.md §4.5 "strategy loop" detection)
    /// rather than re-queued to retry the same dead end.
    pub async fn replan_branch(&self, goal: &mut Goal, failed_id: &str, available_tools: &[String]) -> GoalResult<()> {
        let attempted = goal.strategy.attempted_approaches.join("; ");
        let prompt = format!(
            "The sub-goal \"{failed_id}\" of goal \"{}\" failed. Propose a new sequence of steps for that branch. \
             Approaches already tried and rejected: [{attempted}]. Do not repeat them.",
            goal.title
        );
        let raw = self
            .llm
            .generate_json(&prompt, "array of plan steps with id, title, action_type, dependencies")
            .await?;

        let steps = parse_plan(&raw, available_tools)?;
        let mut replacement = Vec::with_capacity(steps.len());
        for step in steps {
            match handle_strategy_loop(goal, step.title.clone()) {
                Ok(title) => replacement.push((title, step.action_type)),
                Err(reason) => warn!(%reason, "tree_builder: dropping repeated replan approach"),
            }
        }
        self.replan_sub_tree(goal, failed_id, replacement)
    }
}

/// Parse a plan response that may be a JSON array, a single JSON object, or
/// a minimal S-expression fallback of the form
/// `(step "1" "Title" research)` — one per line. JSON is tried first since
/// it is what every real `LlmService` implementation is expected to return;
/// the S-expression path exists for hand-authored fixtures and degraded
/// models that drop JSON structure under load.
fn parse_plan(raw: &str, available_tools: &[String]) -> GoalResult<Vec<SubGoal>> {
    let candidate = strip_code_fence(raw);

    if let Ok(steps) = serde_json::from_str::<Vec<StepPayload>>(candidate) {
        return Ok(steps.into_iter().map(|s| payload_to_sub_goal(s, available_tools)).collect());
    }
    if let Ok(step) = serde_json::from_str::<StepPayload>(candidate) {
        return Ok(vec![payload_to_sub_goal(step, available_tools)]);
    }
    if let Some(steps) = parse_sexpr_plan(candidate) {
        return Ok(steps);
    }

    warn!("tree_builder: plan response was neither valid JSON nor S-expression, producing empty plan");
    Ok(Vec::new())
}

/// A named tool not present (case-insensitively) in `available_tools` is
/// treated the same as no name at all: fall back to the action type's
/// default (spec.md §4.7).
fn payload_to_sub_goal(payload: StepPayload, available_tools: &[String]) -> SubGoal {
    let tool_name = payload
        .tool_name
        .filter(|name| available_tools.iter().any(|available| available.eq_ignore_ascii_case(name)))
        .or_else(|| payload.action_type.default_tool().map(str::to_string));

    SubGoal {
        id: payload.id,
        title: payload.title,
        description: payload.description,
        status: SubGoalStatus::Pending,
        dependencies: payload.dependencies,
        estimated_effort: payload.estimated_effort,
        outcome: None,
        failure_reason: None,
        llm_call_estimate: 0,
        tool_call_estimate: 0,
        time_score_estimate: payload.time_score_estimate,
        action_type: payload.action_type,
        tool_name,
        parameters: payload.parameters,
    }
}

fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    let rest = rest.trim_start_matches('\n');
    rest.rfind("```").map_or(rest, |idx| &rest[..idx]).trim()
}

/// `(step "<id>" "<title>" <action-type>)` one per non-blank line.
fn parse_sexpr_plan(text: &str) -> Option<Vec<SubGoal>> {
    let mut steps = Vec::new();
    for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
        let inner = line.strip_prefix("(step")?.strip_suffix(')')?.trim();
        let parts = split_quoted(inner);
        if parts.len() < 3 {
            return None;
        }
        let action_type = parse_action_type(&parts[2])?;
        steps.push(SubGoal::new(parts[0].clone(), parts[1].clone(), action_type));
    }
    if steps.is_empty() {
        None
    } else {
        Some(steps)
    }
}

fn split_quoted(s: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '"' {
            let mut buf = String::new();
            for next in chars.by_ref() {
                if next == '"' {
                    break;
                }
                buf.push(next);
            }
            parts.push(buf);
        } else if !c.is_whitespace() {
            let mut buf = String::from(c);
            while let Some(&next) = chars.peek() {
                if next.is_whitespace() {
                    break;
                }
                buf.push(next);
                chars.next();
            }
            parts.push(buf);
        }
    }
    parts
}

fn parse_action_type(s: &str) -> Option<ActionType> {
    match s {
        "research" => Some(ActionType::Research),
        "practice" => Some(ActionType::Practice),
        "learn" => Some(ActionType::Learn),
        "create" => Some(ActionType::Create),
        "reflect" => Some(ActionType::Reflect),
        "plan" => Some(ActionType::Plan),
        "measure" => Some(ActionType::Measure),
        "execute_tool" => Some(ActionType::ExecuteTool),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{Classification, GoalOrigin, GoalType};
    use async_trait::async_trait;

    struct StubLlm {
        response: String,
    }
    #[async_trait]
    impl LlmService for StubLlm {
        async fn generate_json(&self, _prompt: &str, _target: &str) -> GoalResult<String> {
            Ok(self.response.clone())
        }
        async fn generate_text(&self, _prompt: &str) -> GoalResult<String> {
            Ok(String::new())
        }
    }

    fn goal() -> Goal {
        Goal::new("t", "d", GoalOrigin::User, Classification::new(GoalType::Achievable, 5.0, vec![]))
    }

    #[tokio::test]
    async fn builds_plan_from_json_array() {
        let llm = Arc::new(StubLlm {
            response: r#"[{"id":"1","title":"Research topic","action_type":"research"},
                          {"id":"2","title":"Write draft","action_type":"create","dependencies":["1"]}]"#
                .to_string(),
        });
        let builder = TreeBuilder::new(llm);
        let mut g = goal();
        builder.build_plan(&mut g, &[]).await.unwrap();
        assert_eq!(g.sub_goals.len(), 2);
        assert_eq!(g.sub_goals[1].dependencies, vec!["1".to_string()]);
        assert_eq!(g.strategy.plan_version, 1);
    }

    #[tokio::test]
    async fn falls_back_to_sexpr_plan() {
        let llm = Arc::new(StubLlm {
            response: "(step \"1\" \"Research topic\" research)\n(step \"2\" \"Write draft\" create)".to_string(),
        });
        let builder = TreeBuilder::new(llm);
        let mut g = goal();
        builder.build_plan(&mut g, &[]).await.unwrap();
        assert_eq!(g.sub_goals.len(), 2);
        assert_eq!(g.sub_goals[0].action_type, ActionType::Research);
    }

    #[tokio::test]
    async fn known_tool_name_is_kept_case_insensitively() {
        let llm = Arc::new(StubLlm {
            response: r#"[{"id":"1","title":"Look it up","action_type":"execute_tool","tool_name":"Web_Search"}]"#
                .to_string(),
        });
        let builder = TreeBuilder::new(llm);
        let mut g = goal();
        builder.build_plan(&mut g, &["web_search".to_string()]).await.unwrap();
        assert_eq!(g.sub_goals[0].tool_name, Some("Web_Search".to_string()));
    }

    #[tokio::test]
    async fn unknown_tool_name_falls_back_to_action_type_default() {
        let llm = Arc::new(StubLlm {
            response: r#"[{"id":"1","title":"Look it up","action_type":"execute_tool","tool_name":"nonexistent_tool"}]"#
                .to_string(),
        });
        let builder = TreeBuilder::new(llm);
        let mut g = goal();
        builder.build_plan(&mut g, &["web_search".to_string()]).await.unwrap();
        assert_eq!(g.sub_goals[0].tool_name, Some("search".to_string()));
    }

    #[test]
    fn replan_sub_tree_replaces_branch_and_descendants() {
        let mut g = goal();
        g.sub_goals.push(SubGoal::new("1", "root step", ActionType::Plan));
        g.sub_goals.push(SubGoal::new("1.1", "child a", ActionType::Research));
        g.sub_goals.push(SubGoal::new("1.2", "child b", ActionType::Create));
        g.sub_goals.push(SubGoal::new("2", "unrelated", ActionType::Reflect));

        let llm = Arc::new(StubLlm { response: "[]".to_string() });
        let builder = TreeBuilder::new(llm);
        builder
            .replan_sub_tree(&mut g, "1", vec![("new approach".to_string(), ActionType::Research)])
            .unwrap();

        assert_eq!(g.sub_goals.len(), 2);
        assert_eq!(g.sub_goals[0].id, "1.1");
        assert_eq!(g.sub_goals[0].title, "new approach");
        assert_eq!(g.sub_goals[1].id, "2");
    }

    #[test]
    fn replan_unknown_id_errors() {
        let mut g = goal();
        let llm = Arc::new(StubLlm { response: "[]".to_string() });
        let builder = TreeBuilder::new(llm);
        let err = builder.replan_sub_tree(&mut g, "9", vec![]).unwrap_err();
        assert!(matches!(err, GoalEngineError::SubGoalNotFound(_, _)));
    }

    #[tokio::test]
    async fn replan_branch_drops_repeated_approach() {
        let mut g = goal();
        g.sub_goals.push(SubGoal::new("1", "root step", ActionType::Plan));
        g.strategy.attempted_approaches.push("retry the same call".to_string());

        let llm = Arc::new(StubLlm {
            response: r#"[{"id":"x","title":"retry the same call","action_type":"research"},
                          {"id":"y","title":"try a different endpoint","action_type":"research"}]"#
                .to_string(),
        });
        let builder = TreeBuilder::new(llm);
        builder.replan_branch(&mut g, "1", &[]).await.unwrap();

        assert_eq!(g.sub_goals.len(), 1);
        assert_eq!(g.sub_goals[0].title, "try a different endpoint");
        assert!(g.strategy.attempted_approaches.contains(&"try a different endpoint".to_string()));
    }
}
