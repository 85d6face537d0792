//! LLM service port (spec.md §6).
//!
//! Implementations own prompt transport, streaming, and extracting content
//! from code-fenced responses; this core only ever calls the two methods
//! below and treats failures as `CollaboratorFailure`.

use async_trait::async_trait;

use crate::domain::errors::GoalResult;

#[async_trait]
pub trait LlmService: Send + Sync {
    /// Ask the model to produce JSON matching `target` (a human-readable
    /// description of the expected shape, e.g. a schema name) and return the
    /// raw text of its response for the caller to parse.
    async fn generate_json(&self, prompt: &str, target: &str) -> GoalResult<String>;

    async fn generate_text(&self, prompt: &str) -> GoalResult<String>;
}
