//! Derivation engine: mines recent memory for candidate AI-originated goals
//! and asks the LLM service to turn them into structured proposals
//! (spec.md §4.7 "Derivation").

use std::sync::Arc;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::domain::errors::GoalResult;
use crate::domain::models::{Classification, Goal, GoalType};
use crate::domain::ports::{LlmService, MemorySearcher};

use super::goal_factory::GoalFactory;

/// How many memory snippets feed a single derivation pass.
const DEFAULT_MEMORY_SAMPLE_SIZE: usize = 8;

#[derive(Debug, Deserialize)]
struct ProposalPayload {
    title: String,
    description: String,
    #[serde(default = "default_goal_type")]
    goal_type: GoalType,
    #[serde(default = "default_time_score")]
    time_score: f64,
    #[serde(default)]
    required_capabilities: Vec<String>,
}

fn default_goal_type() -> GoalType {
    GoalType::Achievable
}

fn default_time_score() -> f64 {
    5.0
}

pub struct DerivationEngine {
    memory: Arc<dyn MemorySearcher>,
    llm: Arc<dyn LlmService>,
    factory: GoalFactory,
    sample_size: usize,
}

impl DerivationEngine {
    pub fn new(memory: Arc<dyn MemorySearcher>, llm: Arc<dyn LlmService>, factory: GoalFactory) -> Self {
        Self {
            memory,
            llm,
            factory,
            sample_size: DEFAULT_MEMORY_SAMPLE_SIZE,
        }
    }

    /// Pull relevant memory around `seed_context`, ask the LLM to propose
    /// zero or more goals from it, and materialize each as an AI-origin
    /// `Goal`. Malformed proposals are skipped, not fatal — a partially
    /// parseable response still yields the proposals that do parse.
    pub async fn derive_goals(&self, seed_context: &str) -> GoalResult<Vec<Goal>> {
        let snippets = self.memory.search_relevant(seed_context, self.sample_size).await?;
        if snippets.is_empty() {
            debug!("derivation: no relevant memory for seed context, skipping");
            return Ok(Vec::new());
        }

        let prompt = build_prompt(seed_context, &snippets);
        let raw = self
            .llm
            .generate_json(&prompt, "array of goal proposals with title, description, goal_type, time_score, required_capabilities")
            .await?;

        let proposals = parse_proposals(&raw);
        Ok(proposals
            .into_iter()
            .map(|p| {
                let classification = Classification::new(p.goal_type, p.time_score.max(1.0), p.required_capabilities);
                let mut goal = self.factory.create_ai_goal(
                    p.title,
                    p.description,
                    classification.goal_type,
                    classification.time_score,
                    classification.required_capabilities.clone(),
                );
                goal.classification = classification;
                goal
            })
            .collect())
    }
}

fn build_prompt(seed_context: &str, snippets: &[String]) -> String {
    let joined = snippets.join("\n---\n");
    format!(
        "Given the following recent context:\n{seed_context}\n\nAnd these relevant memory snippets:\n{joined}\n\nPropose zero or more new goals worth pursuing autonomously."
    )
}

/// Parse a possibly code-fenced JSON array of proposals. Tolerates a bare
/// object (treated as a single-element array) and trailing prose around the
/// fenced block. Unparseable responses yield an empty list rather than an
/// error — a failed derivation pass is not a failed cycle (spec.md §9).
fn parse_proposals(raw: &str) -> Vec<ProposalPayload> {
    let candidate = strip_code_fence(raw);

    if let Ok(list) = serde_json::from_str::<Vec<ProposalPayload>>(candidate) {
        return list;
    }
    if let Ok(single) = serde_json::from_str::<ProposalPayload>(candidate) {
        return vec![single];
    }
    warn!("derivation: could not parse LLM proposal response, dropping this pass");
    Vec::new()
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
