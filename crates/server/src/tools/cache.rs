//! cache_generations tool implementation.
//!
//! Reports the lifecycle phase, the active generation set and per-generation
//! entry counts and sizes.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use zubid_sw_core::{GenerationSet, GenerationStats, LifecyclePhase, Worker};

use super::json_result;

/// Output from the cache_generations tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheGenerationsOutput {
    pub phase: LifecyclePhase,
    pub active: Option<GenerationSet>,
    pub generations: Vec<GenerationStats>,
}

/// Implementation of the cache_generations tool.
pub async fn generations_impl(worker: &Worker) -> Result<CallToolResult, McpError> {
    let output = CacheGenerationsOutput {
        phase: worker.phase().await,
        active: worker.active_generations().await,
        generations: worker.store().generation_stats().await?,
    };

    json_result(&output)
}
