//! MCP tool implementations.
//!
//! This module contains all tools exposed by the peekbox server. Each tool
//! takes the shared page session (or the cache) plus its parameters and
//! returns pretty-printed JSON.

pub mod cache;
pub mod lightbox;
pub mod thread;

use std::sync::Arc;

use peekbox_client::PageSession;
use peekbox_core::Error;
use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use serde::Serialize;
use tokio::sync::Mutex;

pub use cache::{CacheGetParams, get_impl, sweep_impl};
pub use lightbox::{LightboxOpenParams, LightboxStepParams, close_impl, jump_impl, open_impl, step_impl};
pub use thread::{GifExpandParams, ThreadProcessParams, gif_expand_impl, process_impl};

/// The page view every tool call operates on.
pub type SharedSession = Arc<Mutex<PageSession>>;

/// Serialize a tool output as the single text content of a result.
pub(crate) fn json_result<T: Serialize>(output: &T) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize output: {e}")))?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::collections::HashMap;
    use std::sync::Arc;

    use peekbox_client::{FetchedBody, Fetcher, HttpImageProbe, PageSession, ResponseMode, Resolver};
    use peekbox_core::{CacheDb, Error, ThumbnailCache, Viewport};
    use rmcp::model::CallToolResult;

    /// Serves fixed bodies by URL.
    #[derive(Default)]
    pub struct StaticFetcher {
        pub bodies: HashMap<String, (String, Vec<u8>)>,
    }

    impl StaticFetcher {
        pub fn with(mut self, url: &str, content_type: &str, body: impl Into<Vec<u8>>) -> Self {
            self.bodies.insert(url.to_string(), (content_type.to_string(), body.into()));
            self
        }
    }

    #[async_trait::async_trait]
    impl Fetcher for StaticFetcher {
        async fn get(&self, url: &str, _mode: ResponseMode) -> Result<FetchedBody, Error> {
            let (content_type, body) =
                self.bodies.get(url).ok_or_else(|| Error::HttpError(format!("status 404 for {url}")))?;
            Ok(FetchedBody { content_type: Some(content_type.clone()), bytes: body.clone().into() })
        }
    }

    pub async fn session_with(fetcher: StaticFetcher) -> (PageSession, Arc<dyn Fetcher>, ThumbnailCache) {
        let db = CacheDb::open_in_memory().await.unwrap();
        let cache = ThumbnailCache::open(Arc::new(db)).await;
        let fetcher: Arc<dyn Fetcher> = Arc::new(fetcher);
        let probe = Arc::new(HttpImageProbe::new(fetcher.clone()));
        let session = PageSession::new(
            Resolver::new(fetcher.clone(), cache.clone()),
            probe,
            Viewport { width: 1280, height: 720 },
        );
        (session, fetcher, cache)
    }

    /// Parse the JSON text a tool returned.
    pub fn output_json(result: &CallToolResult) -> serde_json::Value {
        let text = &result.content[0].as_text().unwrap().text;
        serde_json::from_str(text).unwrap()
    }
}
