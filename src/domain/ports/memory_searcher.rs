//! Memory searcher port (spec.md §6) — a textual-context collaborator the
//! derivation engine samples to propose autonomous-improvement goals.

use async_trait::async_trait;

use crate::domain::errors::GoalResult;

#[async_trait]
pub trait MemorySearcher: Send + Sync {
    /// Returns up to `limit` textual snippets relevant to `text`.
    async fn search_relevant(&self, text: &str, limit: usize) -> GoalResult<Vec<String>>;
}
