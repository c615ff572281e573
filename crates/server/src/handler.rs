//! MCP server handler implementation.
//!
//! This module defines the main server handler that
//! routes tool calls to the appropriate implementations.
use std::sync::Arc;

use crate::tools::{
    CacheGetParams, GifExpandParams, LightboxOpenParams, LightboxStepParams, SharedSession, ThreadProcessParams,
    close_impl, get_impl, gif_expand_impl, jump_impl, open_impl, process_impl, step_impl, sweep_impl,
};

use peekbox_client::{Fetcher, PageSession};
use peekbox_core::ThumbnailCache;
use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::{
        tool::{ToolCallContext, ToolRouter},
        wrapper::Parameters,
    },
    model::{
        CallToolRequestParam, CallToolResult, Implementation, ListToolsResult, PaginatedRequestParam, ProtocolVersion,
        ServerCapabilities, ServerInfo,
    },
    service::{RequestContext, RoleServer},
    tool, tool_router,
};
use tokio::sync::Mutex;

/// The main MCP server handler for peekbox.
#[derive(Clone)]
pub struct PeekboxServer {
    session: SharedSession,
    fetcher: Arc<dyn Fetcher>,
    cache: ThumbnailCache,
    tool_router: ToolRouter<Self>,
}

/// Tool router implementation using the #[tool_router] macro.
///
/// This macro generates the routing logic that maps tool names to handler methods.
#[tool_router]
impl PeekboxServer {
    /// Create a new server handler around one page session.
    pub fn new(session: PageSession, fetcher: Arc<dyn Fetcher>) -> Self {
        let cache = session.resolver().cache().clone();
        Self { session: Arc::new(Mutex::new(session)), fetcher, cache, tool_router: Self::tool_router() }
    }

    /// Process every image link on a thread page.
    ///
    /// Resolves thumbnails, binds viewable images into the registry, and
    /// groups adjacent image links into rows.
    #[tool(
        description = "Process a thread page: classify image links, resolve thumbnails (cached 10 days), number viewable images, and group adjacent links into rows. Fetches the page when html is omitted."
    )]
    async fn thread_process(&self, params: Parameters<ThreadProcessParams>) -> Result<CallToolResult, McpError> {
        let mut session = self.session.lock().await;
        process_impl(&mut session, self.fetcher.as_ref(), params.0).await
    }

    #[tool(description = "Expand an inline animated gif to its still frame and add it to the lightbox sequence.")]
    async fn gif_expand(&self, params: Parameters<GifExpandParams>) -> Result<CallToolResult, McpError> {
        let mut session = self.session.lock().await;
        gif_expand_impl(&mut session, params.0).await
    }

    #[tool(description = "Open the lightbox on a 1-based image index. Returns the image, its post caption and size.")]
    async fn lightbox_open(&self, params: Parameters<LightboxOpenParams>) -> Result<CallToolResult, McpError> {
        let mut session = self.session.lock().await;
        open_impl(&mut session, params.0).await
    }

    #[tool(description = "Move the open lightbox to the next or previous image. Stops at either end.")]
    async fn lightbox_step(&self, params: Parameters<LightboxStepParams>) -> Result<CallToolResult, McpError> {
        let mut session = self.session.lock().await;
        step_impl(&mut session, params.0).await
    }

    #[tool(description = "Close the lightbox.")]
    async fn lightbox_close(&self) -> Result<CallToolResult, McpError> {
        let mut session = self.session.lock().await;
        close_impl(&mut session)
    }

    #[tool(description = "Close the lightbox and return the page address anchored at the shown image's post.")]
    async fn lightbox_jump(&self) -> Result<CallToolResult, McpError> {
        let mut session = self.session.lock().await;
        jump_impl(&mut session)
    }

    /// Retrieve a cached thumbnail by source URL.
    #[tool(description = "Look up the cached thumbnail for a source URL. Imgur links are never cached.")]
    async fn cache_get(&self, params: Parameters<CacheGetParams>) -> Result<CallToolResult, McpError> {
        get_impl(&self.cache, params.0).await
    }

    #[tool(description = "Remove expired and unreadable thumbnail cache entries.")]
    async fn cache_sweep(&self) -> Result<CallToolResult, McpError> {
        sweep_impl(&self.cache).await
    }
}

impl ServerHandler for PeekboxServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "peekbox".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self, _request: Option<PaginatedRequestParam>, _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, rmcp::model::ErrorData> {
        Ok(ListToolsResult { meta: None, tools: self.tool_router.list_all(), next_cursor: None })
    }

    async fn call_tool(
        &self, request: CallToolRequestParam, context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, rmcp::model::ErrorData> {
        self.tool_router
            .call(ToolCallContext::new(self, request, context))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::test_support::{StaticFetcher, session_with};

    #[tokio::test]
    async fn test_registers_every_tool() {
        let (session, fetcher, _) = session_with(StaticFetcher::default()).await;
        let server = PeekboxServer::new(session, fetcher);

        let mut names: Vec<String> = server.tool_router.list_all().into_iter().map(|t| t.name.to_string()).collect();
        names.sort();
        assert_eq!(
            names,
            [
                "cache_get",
                "cache_sweep",
                "gif_expand",
                "lightbox_close",
                "lightbox_jump",
                "lightbox_open",
                "lightbox_step",
                "thread_process"
            ]
        );
        assert_eq!(server.get_info().server_info.name, "peekbox");
    }
}
