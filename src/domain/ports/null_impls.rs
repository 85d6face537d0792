//! No-op collaborator implementations, used when an optional capability is
//! absent but the type system requires one.
//!
//! Grounded on the teacher's `NullEmbeddingProvider`/`NullMemoryRepository`
//! (`domain/ports/null_embedding.rs`, `domain/ports/null_memory.rs`).

use async_trait::async_trait;
use std::collections::HashMap;

use crate::domain::errors::GoalResult;
use crate::domain::models::sub_goal::ParamValue;

use super::action_executor::ActionExecutor;
use super::embedder::Embedder;
use super::llm_service::LlmService;
use super::memory_searcher::MemorySearcher;

/// An embedder that is absent: validation and revival fall back to their
/// non-semantic paths when this is configured (spec.md §4.3 step 2
/// "Fallback when embedder unavailable").
#[derive(Debug, Clone, Copy, Default)]
pub struct NullEmbedder;

#[async_trait]
impl Embedder for NullEmbedder {
    async fn embed(&self, _text: &str) -> GoalResult<Vec<f32>> {
        Ok(Vec::new())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NullMemorySearcher;

#[async_trait]
impl MemorySearcher for NullMemorySearcher {
    async fn search_relevant(&self, _text: &str, _limit: usize) -> GoalResult<Vec<String>> {
        Ok(Vec::new())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NullLlmService;

#[async_trait]
impl LlmService for NullLlmService {
    async fn generate_json(&self, _prompt: &str, _target: &str) -> GoalResult<String> {
        Ok("[]".to_string())
    }

    async fn generate_text(&self, _prompt: &str) -> GoalResult<String> {
        Ok(String::new())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NullActionExecutor;

#[async_trait]
impl ActionExecutor for NullActionExecutor {
    async fn execute_tool_action(
        &self,
        _tool: &str,
        _params: &HashMap<String, ParamValue>,
    ) -> GoalResult<String> {
        Ok(String::new())
    }
}
