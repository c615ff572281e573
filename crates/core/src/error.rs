//! Unified error types for peekbox.
//!
//! Cache corruption never shows up here: the thumbnail cache reports it as a
//! typed miss instead. Everything below is either a caller mistake or a
//! per-link resolution failure.

use rmcp::model::{ErrorCode, ErrorData as McpError};
use tokio_rusqlite::rusqlite;

/// Unified error types for the peekbox pipeline and server.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid input parameters (e.g., lightbox index out of range).
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// Invalid URL.
    #[error("INVALID_URL: {0}")]
    InvalidUrl(String),

    /// The link was classified as something the pipeline does not resolve.
    #[error("NOT_MEDIA: {0}")]
    NotMedia(String),

    /// No usable cache entry for the given URL.
    #[error("CACHE_MISS: {0}")]
    CacheMiss(String),

    /// Database operation failed.
    #[error("CACHE_ERROR: {0}")]
    Database(tokio_rusqlite::Error),

    /// Migration failed to apply.
    #[error("CACHE_ERROR: migration failed: {0}")]
    MigrationFailed(String),

    /// Fetch timed out.
    #[error("FETCH_TIMEOUT: {0}")]
    FetchTimeout(String),

    /// The HTTP client could not be built from the configuration.
    #[error("CLIENT_BUILD: {0}")]
    ClientBuild(String),

    /// Fetch response too large.
    #[error("FETCH_TOO_LARGE: {0}")]
    FetchTooLarge(String),

    /// Network failure or non-success HTTP status.
    #[error("HTTP_ERROR: {0}")]
    HttpError(String),

    /// Gallery page did not carry the expected preview image metadata.
    #[error("SCRAPE_FAILED: {0}")]
    ScrapeFailed(String),

    /// Downloaded bytes could not be turned into a displayable payload.
    #[error("DECODE_FAILED: {0}")]
    DecodeFailed(String),
}

impl Error {
    /// Whether this error should be shown as the per-link failure affordance.
    pub fn is_link_failure(&self) -> bool {
        matches!(
            self,
            Error::HttpError(_)
                | Error::FetchTimeout(_)
                | Error::FetchTooLarge(_)
                | Error::ScrapeFailed(_)
                | Error::DecodeFailed(_)
                | Error::InvalidUrl(_)
        )
    }
}

impl From<tokio_rusqlite::Error<Error>> for Error {
    fn from(err: tokio_rusqlite::Error<Error>) -> Self {
        match err {
            tokio_rusqlite::Error::Error(e) => e,
            tokio_rusqlite::Error::ConnectionClosed => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
            tokio_rusqlite::Error::Close(c) => Error::Database(tokio_rusqlite::Error::Close(c)),
            _ => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
        }
    }
}

impl From<tokio_rusqlite::Error<rusqlite::Error>> for Error {
    fn from(err: tokio_rusqlite::Error<rusqlite::Error>) -> Self {
        Error::Database(err)
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Database(tokio_rusqlite::Error::Error(err))
    }
}

impl From<Error> for McpError {
    fn from(err: Error) -> Self {
        let (code, message) = match &err {
            Error::InvalidInput(msg) => (-32602, msg.clone()),
            Error::NotMedia(msg) => (-32000, msg.clone()),
            Error::CacheMiss(msg) => (-32001, msg.clone()),
            Error::InvalidUrl(msg) => (-32003, msg.clone()),
            Error::FetchTimeout(msg) => (-32006, msg.clone()),
            Error::FetchTooLarge(msg) => (-32007, msg.clone()),
            Error::HttpError(msg) => (-32008, msg.clone()),
            Error::ScrapeFailed(msg) => (-32009, msg.clone()),
            Error::DecodeFailed(msg) => (-32010, msg.clone()),
            Error::ClientBuild(msg) => (-32011, msg.clone()),
            Error::Database(e) => (-32002, e.to_string()),
            Error::MigrationFailed(msg) => (-32002, msg.clone()),
        };

        McpError { code: ErrorCode(code), message: message.into(), data: None }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::CacheMiss("https://ibb.co/abc".to_string());
        assert!(err.to_string().contains("CACHE_MISS"));
        assert!(err.to_string().contains("ibb.co/abc"));
    }

    #[test]
    fn test_error_to_mcp_error() {
        let err = Error::ScrapeFailed("no og:image".to_string());
        let mcp_err: McpError = err.into();
        assert_eq!(mcp_err.code.0, -32009);
    }

    #[test]
    fn test_link_failures() {
        assert!(Error::HttpError("status 404".into()).is_link_failure());
        assert!(Error::ScrapeFailed("x".into()).is_link_failure());
        assert!(!Error::CacheMiss("x".into()).is_link_failure());
        assert!(!Error::InvalidInput("x".into()).is_link_failure());
    }
}
