//! cache_sweep tool implementation.

use peekbox_core::ThumbnailCache;
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::tools::json_result;

/// Output from the cache_sweep tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheSweepOutput {
    /// Number of expired or unreadable entries removed.
    pub evicted: usize,
}

/// Implementation of the cache_sweep tool.
pub async fn sweep_impl(cache: &ThumbnailCache) -> Result<CallToolResult, McpError> {
    let evicted = cache.sweep().await;
    tracing::info!(evicted, "thumbnail cache swept");
    json_result(&CacheSweepOutput { evicted })
}
