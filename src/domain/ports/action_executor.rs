//! Action executor port (spec.md §6) — the opaque tool-executing
//! collaborator driving `EXECUTE_TOOL`/`PRACTICE`/etc. sub-goals.

use async_trait::async_trait;
use std::collections::HashMap;

use crate::domain::errors::GoalResult;
use crate::domain::models::sub_goal::ParamValue;

#[async_trait]
pub trait ActionExecutor: Send + Sync {
    /// Execute one tool action and return its outcome description. An
    /// outcome prefixed with `GAP:` signals a knowledge gap discovered
    /// mid-execution; the orchestrator queues a discovery step ahead of the
    /// remaining plan rather than treating it as a failure (spec.md §4.5
    /// "unknown unknowns").
    async fn execute_tool_action(
        &self,
        tool: &str,
        params: &HashMap<String, ParamValue>,
    ) -> GoalResult<String>;
}
