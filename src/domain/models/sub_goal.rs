//! SubGoal domain model — a node in a goal's hierarchical plan tree.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A scalar parameter value for a tool-executing sub-goal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    String(String),
    Number(f64),
    Bool(bool),
}

/// Status of a sub-goal node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubGoalStatus {
    Pending,
    Active,
    Completed,
    Failed,
    Skipped,
}

/// Rough effort estimate used by the progress monitor to classify failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EstimatedEffort {
    Simple,
    Medium,
    Complex,
}

/// The kind of action a sub-goal performs when executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    Research,
    Practice,
    Learn,
    Create,
    Reflect,
    Plan,
    Measure,
    ExecuteTool,
}

impl ActionType {
    /// Fallback tool name used when a plan names an unknown tool (spec.md
    /// §4.7): research/execute-tool steps default to a generic search.
    pub fn default_tool(self) -> Option<&'static str> {
        match self {
            Self::Research | Self::ExecuteTool => Some("search"),
            _ => None,
        }
    }
}

/// A single node of a goal's decomposition tree.
///
/// `id` is a hierarchical dotted id (e.g. `"1.2.1"`); tree depth is the dot
/// count plus one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubGoal {
    pub id: String,
    pub title: String,
    pub description: String,
    pub status: SubGoalStatus,
    pub dependencies: Vec<String>,
    pub estimated_effort: EstimatedEffort,
    pub outcome: Option<String>,
    pub failure_reason: Option<String>,
    pub llm_call_estimate: u32,
    pub tool_call_estimate: u32,
    pub time_score_estimate: f64,
    pub action_type: ActionType,
    pub tool_name: Option<String>,
    pub parameters: HashMap<String, ParamValue>,
}

impl SubGoal {
    pub fn new(id: impl Into<String>, title: impl Into<String>, action_type: ActionType) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: String::new(),
            status: SubGoalStatus::Pending,
            dependencies: Vec::new(),
            estimated_effort: EstimatedEffort::Medium,
            outcome: None,
            failure_reason: None,
            llm_call_estimate: 0,
            tool_call_estimate: 0,
            time_score_estimate: 1.0,
            action_type,
            tool_name: None,
            parameters: HashMap::new(),
        }
    }

    pub fn depth(&self) -> u32 {
        self.id.matches('.').count() as u32 + 1
    }
}
