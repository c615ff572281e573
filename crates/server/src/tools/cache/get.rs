//! cache_get tool implementation.
//!
//! Looks up the cached thumbnail for a source URL.

use peekbox_core::cache::hash::compute_cache_key;
use peekbox_core::{CacheLookup, Error, MissReason, Payload, ThumbnailCache};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::tools::json_result;

/// Parameters for the cache_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheGetParams {
    /// Source URL the thumbnail was cached under.
    pub url: String,
}

/// Output from the cache_get tool.
#[derive(Debug, Clone, Serialize)]
pub struct CacheGetOutput {
    pub url: String,
    /// Store key the entry lives under.
    pub key: String,
    pub payload: Payload,
}

/// Implementation of the cache_get tool.
pub async fn get_impl(cache: &ThumbnailCache, params: CacheGetParams) -> Result<CallToolResult, McpError> {
    if params.url.trim().is_empty() {
        return Err(Error::InvalidInput("url cannot be empty".into()).into());
    }

    let payload = match cache.lookup(&params.url).await {
        CacheLookup::Hit(payload) => payload,
        CacheLookup::Miss(reason) => {
            let reason = match reason {
                MissReason::Absent => "no entry",
                MissReason::Expired => "entry expired",
                MissReason::Corrupt => "entry unreadable",
                MissReason::Unavailable => "store unavailable",
            };
            return Err(Error::CacheMiss(format!("{}: {reason}", params.url)).into());
        }
    };

    let key = compute_cache_key(&params.url);
    json_result(&CacheGetOutput { url: params.url, key, payload })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::tools::test_support::output_json;
    use peekbox_core::CacheDb;

    async fn cache() -> ThumbnailCache {
        let db = CacheDb::open_in_memory().await.unwrap();
        ThumbnailCache::open(Arc::new(db)).await
    }

    #[tokio::test]
    async fn test_get_impl_missing() {
        let cache = cache().await;
        let params = CacheGetParams { url: "https://example.com/a.jpg".to_string() };

        let err = get_impl(&cache, params).await.unwrap_err();
        assert_eq!(err.code.0, -32001);
        assert!(err.message.contains("no entry"));
    }

    #[tokio::test]
    async fn test_get_impl_found() {
        let cache = cache().await;
        let url = "https://example.com/a.jpg";
        cache.put(url, &Payload::DataUri("data:image/png;base64,AAAA".into())).await;

        let result = get_impl(&cache, CacheGetParams { url: url.to_string() }).await.unwrap();
        let json = output_json(&result);
        assert_eq!(json["key"], compute_cache_key(url));
        assert_eq!(json["payload"]["kind"], "data_uri");
        assert_eq!(json["payload"]["value"], "data:image/png;base64,AAAA");
    }

    #[tokio::test]
    async fn test_get_impl_imgur_never_cached() {
        let cache = cache().await;
        let url = "https://i.imgur.com/abc.jpg";
        cache.put(url, &Payload::Url(url.into())).await;

        assert!(get_impl(&cache, CacheGetParams { url: url.to_string() }).await.is_err());
    }
}
