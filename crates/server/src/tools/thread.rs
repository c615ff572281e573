//! thread_process and gif_expand tool implementations.
//!
//! `thread_process` runs one processing pass over a thread page. The HTML can
//! be supplied by the client; otherwise the page is fetched.

use peekbox_client::{Fetcher, PageSession, ResponseMode};
use peekbox_core::Error;
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::json_result;

/// Input parameters for thread_process tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ThreadProcessParams {
    /// Address of the thread page. Its fragment is used as a post-number fallback.
    pub page_url: String,

    /// Page HTML. When absent the page is fetched.
    #[serde(default)]
    pub html: Option<String>,

    /// Start a new page view, discarding bound images (default: true).
    #[serde(default = "default_true")]
    pub reset: bool,
}

fn default_true() -> bool {
    true
}

/// Input parameters for gif_expand tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct GifExpandParams {
    /// Href of the inline gif.
    pub href: String,

    /// Post the gif belongs to.
    #[serde(default = "default_post_number")]
    pub post_number: String,
}

fn default_post_number() -> String {
    peekbox_core::post::POST_NUMBER_UNAVAILABLE.to_string()
}

/// Output structure for gif_expand tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct GifExpandOutput {
    /// Registry index of the expanded frame.
    pub index: usize,
    /// Still frame to show.
    pub still_frame_url: String,
}

/// Implementation of the thread_process tool.
pub async fn process_impl(
    session: &mut PageSession, fetcher: &dyn Fetcher, params: ThreadProcessParams,
) -> Result<CallToolResult, McpError> {
    if params.page_url.trim().is_empty() {
        return Err(Error::InvalidInput("page_url cannot be empty".into()).into());
    }

    if params.reset || !session.is_current_page(&params.page_url) {
        session.begin_page(&params.page_url)?;
    }

    let html = match params.html {
        Some(html) => html,
        None => fetcher.get(&params.page_url, ResponseMode::Text).await?.text(),
    };
    if html.trim().is_empty() {
        return Err(Error::InvalidInput("html cannot be empty".into()).into());
    }

    let report = session.process_html(&html).await?;
    json_result(&report)
}

/// Implementation of the gif_expand tool.
pub async fn gif_expand_impl(session: &mut PageSession, params: GifExpandParams) -> Result<CallToolResult, McpError> {
    let (index, still_frame_url) = session.expand_still_frame(&params.href, &params.post_number)?;
    json_result(&GifExpandOutput { index, still_frame_url })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::test_support::{StaticFetcher, output_json, session_with};

    const PAGE: &str = "https://bbs.example/test/read.cgi/board/1/";

    #[tokio::test]
    async fn test_process_supplied_html() {
        let (mut session, fetcher, _) = session_with(StaticFetcher::default()).await;
        let params = ThreadProcessParams {
            page_url: PAGE.into(),
            html: Some(r#"<div class="message"><a href="https://i.imgur.com/x.gif">gif</a></div>"#.into()),
            reset: true,
        };

        let result = process_impl(&mut session, fetcher.as_ref(), params).await.unwrap();
        let json = output_json(&result);
        assert_eq!(json["links"][0]["outcome"]["status"], "animated_gif");
        assert_eq!(json["images"][0]["index"], 1);
        assert_eq!(json["page_url"], PAGE);
    }

    #[tokio::test]
    async fn test_process_fetches_page_when_html_absent() {
        let fetcher =
            StaticFetcher::default().with(PAGE, "text/html", r#"<p><a href="https://i.imgur.com/y.gif">y</a></p>"#);
        let (mut session, fetcher, _) = session_with(fetcher).await;
        let params = ThreadProcessParams { page_url: PAGE.into(), html: None, reset: true };

        process_impl(&mut session, fetcher.as_ref(), params).await.unwrap();
        assert_eq!(session.registry().len(), 1);
    }

    #[tokio::test]
    async fn test_process_without_reset_keeps_registry() {
        let (mut session, fetcher, _) = session_with(StaticFetcher::default()).await;
        let first = r#"<p><a href="https://i.imgur.com/a.gif">a</a></p>"#;
        let second = r#"<p><a href="https://i.imgur.com/b.gif">b</a></p>"#;

        let params = ThreadProcessParams { page_url: PAGE.into(), html: Some(first.into()), reset: true };
        process_impl(&mut session, fetcher.as_ref(), params).await.unwrap();
        let params = ThreadProcessParams { page_url: PAGE.into(), html: Some(second.into()), reset: false };
        process_impl(&mut session, fetcher.as_ref(), params).await.unwrap();

        assert_eq!(session.registry().len(), 2);
        assert_eq!(session.registry().get(2).unwrap().original_url, "https://i.imgur.com/b.gif");
    }

    #[tokio::test]
    async fn test_process_without_reset_matches_unnormalized_url() {
        let (mut session, fetcher, _) = session_with(StaticFetcher::default()).await;
        let page = "https://BBS.example";

        let html = r#"<p><a href="https://i.imgur.com/a.gif">a</a></p>"#;
        let params = ThreadProcessParams { page_url: page.into(), html: Some(html.into()), reset: true };
        process_impl(&mut session, fetcher.as_ref(), params).await.unwrap();

        let html = r#"<p><a href="https://i.imgur.com/b.gif">b</a></p>"#;
        let params = ThreadProcessParams { page_url: page.into(), html: Some(html.into()), reset: false };
        process_impl(&mut session, fetcher.as_ref(), params).await.unwrap();

        assert_eq!(session.registry().len(), 2);
    }

    #[tokio::test]
    async fn test_process_rejects_empty_input() {
        let (mut session, fetcher, _) = session_with(StaticFetcher::default()).await;

        let params = ThreadProcessParams { page_url: " ".into(), html: None, reset: true };
        assert!(process_impl(&mut session, fetcher.as_ref(), params).await.is_err());

        let params = ThreadProcessParams { page_url: PAGE.into(), html: Some("  ".into()), reset: true };
        assert!(process_impl(&mut session, fetcher.as_ref(), params).await.is_err());

        let params = ThreadProcessParams { page_url: PAGE.into(), html: None, reset: true };
        let err = process_impl(&mut session, fetcher.as_ref(), params).await.unwrap_err();
        assert_eq!(err.code.0, -32008);
    }

    #[tokio::test]
    async fn test_gif_expand() {
        let (mut session, _, _) = session_with(StaticFetcher::default()).await;
        session.begin_page(PAGE).unwrap();

        let params = GifExpandParams { href: "https://i.imgur.com/z.gif".into(), post_number: "12".into() };
        let json = output_json(&gif_expand_impl(&mut session, params).await.unwrap());
        assert_eq!(json["index"], 1);
        assert_eq!(json["still_frame_url"], "https://i.imgur.com/zm.gif");

        let params = GifExpandParams { href: "https://i.imgur.com/z.png".into(), post_number: "12".into() };
        assert!(gif_expand_impl(&mut session, params).await.is_err());

        let params = GifExpandParams { href: "éabc".into(), post_number: "12".into() };
        assert!(gif_expand_impl(&mut session, params).await.is_err());
    }
}
