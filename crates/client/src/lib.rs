//! Client code for peekbox.
//!
//! This crate provides the HTTP fetch pipeline, gallery scraping, payload
//! encoding, the resolution pipeline, and the page session shared by the
//! server.

pub mod encode;
pub mod extract;
pub mod fetch;
pub mod html;
pub mod probe;
pub mod resolve;
pub mod session;

#[cfg(test)]
mod testing;

pub use extract::extract_preview_image;
pub use fetch::{FetchClient, FetchConfig, FetchedBody, Fetcher, ResponseMode};
pub use html::{HtmlPage, PROCESSED_MARKER};
pub use probe::{HttpImageProbe, ImageProbe};
pub use resolve::{LinkTarget, ResolvedMedia, Resolver, Step, first_success};
pub use session::{Direction, LinkOutcome, LinkReport, PageReport, PageSession};
