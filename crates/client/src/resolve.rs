//! Resolution pipeline: from a classified link to displayable media.
//!
//! Network-backed strategies are written as an ordered list of [`Step`]s and
//! run through [`first_success`], which stops at the first step that produces
//! media. Direct images try the cache and then a download. Gallery pages try
//! the cache under the page URL, then scrape the page and download the image
//! it names, caching the result under the page URL again.
//!
//! Inline gifs, videos and already-embedded images never touch the network.

use std::future::Future;
use std::sync::Arc;

use serde::Serialize;
use url::Url;

use peekbox_core::{Classification, Error, Payload, ServiceTag, Strategy, ThumbnailCache};

use crate::encode::to_data_uri;
use crate::extract::extract_preview_image;
use crate::fetch::{Fetcher, ResponseMode, canonicalize};

/// A link ready for resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct LinkTarget {
    pub href: String,
    pub classification: Classification,
    /// Source of the `<img>` already inside the link.
    pub inline_src: Option<String>,
}

impl LinkTarget {
    pub fn new(href: impl Into<String>, classification: Classification) -> Self {
        Self { href: href.into(), classification, inline_src: None }
    }

    pub fn with_inline_src(mut self, src: impl Into<String>) -> Self {
        self.inline_src = Some(src.into());
        self
    }

    pub fn strategy(&self) -> Strategy {
        self.classification.strategy
    }
}

/// What a link resolved to.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResolvedMedia {
    /// A thumbnail built from fetched (or cached) image data.
    Thumbnail { payload: Payload, from_cache: bool },
    /// An image the page already shows inside the link.
    Embedded { image_url: String },
    /// An animated gif shown in place; the still frame loads on demand.
    AnimatedGif { src: String, still_frame_url: String },
    /// A native video player for a short clip.
    Video { src: String, page_url: String },
}

impl ResolvedMedia {
    /// Source bound into the registry, if this media is bound right away.
    pub fn bind_src(&self) -> Option<&str> {
        match self {
            ResolvedMedia::Thumbnail { payload, .. } => Some(payload.as_src()),
            ResolvedMedia::Embedded { image_url } => Some(image_url),
            ResolvedMedia::AnimatedGif { src, .. } => Some(src),
            ResolvedMedia::Video { .. } => None,
        }
    }
}

/// One attempt in a resolution strategy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Serve a cache entry stored under `url`.
    Cached { url: String },
    /// Fetch `image_url` and cache the payload under `cache_url`.
    Download { image_url: String, cache_url: String },
    /// Fetch a gallery page, find its preview image, then download it.
    Scrape { page_url: String },
}

/// Run steps in order and return the first success.
///
/// When every step fails the last error is returned.
pub async fn first_success<S, T, F, Fut>(steps: impl IntoIterator<Item = S>, mut run: F) -> Result<T, Error>
where
    F: FnMut(S) -> Fut,
    Fut: Future<Output = Result<T, Error>>,
{
    let mut last = None;
    for step in steps {
        match run(step).await {
            Ok(value) => return Ok(value),
            Err(e) => {
                tracing::debug!("resolution step failed: {}", e);
                last = Some(e);
            }
        }
    }
    Err(last.unwrap_or_else(|| Error::NotMedia("no resolution steps".to_string())))
}

/// Still frame shown for a collapsed inline gif: `abc.gif` becomes `abcm.gif`.
pub fn still_frame_url(gif_url: &str) -> String {
    match strip_suffix_ignore_case(gif_url, ".gif") {
        Some(stem) => format!("{stem}m.gif"),
        None => gif_url.to_string(),
    }
}

/// Page URL of a short clip: the `.mp4` suffix removed.
pub fn video_page_url(video_url: &str) -> String {
    strip_suffix_ignore_case(video_url, ".mp4").unwrap_or(video_url).to_string()
}

fn strip_suffix_ignore_case<'a>(s: &'a str, suffix: &str) -> Option<&'a str> {
    let stem = s.len().checked_sub(suffix.len())?;
    s.get(stem..)
        .filter(|tail| tail.eq_ignore_ascii_case(suffix))
        .and_then(|_| s.get(..stem))
}

/// Resolves classified links against the network and the thumbnail cache.
#[derive(Clone)]
pub struct Resolver {
    fetcher: Arc<dyn Fetcher>,
    cache: ThumbnailCache,
}

impl std::fmt::Debug for Resolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resolver").field("cache", &self.cache).finish_non_exhaustive()
    }
}

impl Resolver {
    pub fn new(fetcher: Arc<dyn Fetcher>, cache: ThumbnailCache) -> Self {
        Self { fetcher, cache }
    }

    pub fn cache(&self) -> &ThumbnailCache {
        &self.cache
    }

    pub fn fetcher(&self) -> &Arc<dyn Fetcher> {
        &self.fetcher
    }

    /// Media for strategies that need no network access.
    ///
    /// Returns `None` for network-backed strategies.
    pub fn immediate(target: &LinkTarget) -> Option<Result<ResolvedMedia, Error>> {
        let href = target.href.clone();
        match target.strategy() {
            Strategy::AlreadyEmbedded => {
                let image_url = if target.classification.service == ServiceTag::Imgur {
                    href
                } else {
                    target.inline_src.clone().unwrap_or(href)
                };
                Some(Ok(ResolvedMedia::Embedded { image_url }))
            }
            Strategy::InlineGif => {
                let still = still_frame_url(&href);
                Some(Ok(ResolvedMedia::AnimatedGif { src: href, still_frame_url: still }))
            }
            Strategy::InlineVideo => {
                let page_url = video_page_url(&href);
                Some(Ok(ResolvedMedia::Video { src: href, page_url }))
            }
            Strategy::Ignored => Some(Err(Error::NotMedia(href))),
            Strategy::DirectImage | Strategy::GalleryPage => None,
        }
    }

    /// Ordered steps for a network-backed link.
    pub fn plan(target: &LinkTarget, use_cache: bool) -> Vec<Step> {
        let href = target.href.clone();
        let mut steps = Vec::with_capacity(2);
        match target.strategy() {
            Strategy::DirectImage => {
                if use_cache {
                    steps.push(Step::Cached { url: href.clone() });
                }
                steps.push(Step::Download { image_url: href.clone(), cache_url: href });
            }
            Strategy::GalleryPage => {
                if use_cache {
                    steps.push(Step::Cached { url: href.clone() });
                }
                steps.push(Step::Scrape { page_url: href });
            }
            _ => {}
        }
        steps
    }

    /// Cache-only resolution for a network-backed link.
    pub async fn cached(&self, target: &LinkTarget) -> Option<ResolvedMedia> {
        if !matches!(target.strategy(), Strategy::DirectImage | Strategy::GalleryPage) {
            return None;
        }
        self.cache
            .get(&target.href)
            .await
            .map(|payload| ResolvedMedia::Thumbnail { payload, from_cache: true })
    }

    /// Resolve a link with a single attempt per step and no retry.
    pub async fn resolve(&self, target: &LinkTarget) -> Result<ResolvedMedia, Error> {
        self.resolve_with(target, true).await
    }

    /// Resolve a link that is already known to miss the cache.
    pub async fn resolve_uncached(&self, target: &LinkTarget) -> Result<ResolvedMedia, Error> {
        self.resolve_with(target, false).await
    }

    async fn resolve_with(&self, target: &LinkTarget, use_cache: bool) -> Result<ResolvedMedia, Error> {
        if let Some(result) = Self::immediate(target) {
            return result;
        }
        first_success(Self::plan(target, use_cache), |step| self.run_step(step)).await
    }

    async fn run_step(&self, step: Step) -> Result<ResolvedMedia, Error> {
        match step {
            Step::Cached { url } => self
                .cache
                .get(&url)
                .await
                .map(|payload| ResolvedMedia::Thumbnail { payload, from_cache: true })
                .ok_or(Error::CacheMiss(url)),
            Step::Download { image_url, cache_url } => self.download(&image_url, &cache_url).await,
            Step::Scrape { page_url } => {
                let page = canonicalize(&page_url).map_err(|e| Error::InvalidUrl(e.to_string()))?;
                let image_url = self.scrape(&page).await?;
                self.download(image_url.as_str(), &page_url).await
            }
        }
    }

    async fn scrape(&self, page: &Url) -> Result<Url, Error> {
        let body = self.fetcher.get(page.as_str(), ResponseMode::Text).await?;
        let image_url = extract_preview_image(&body.text(), page)?;
        tracing::debug!("gallery {} -> {}", page, image_url);
        Ok(image_url)
    }

    async fn download(&self, image_url: &str, cache_url: &str) -> Result<ResolvedMedia, Error> {
        let body = self.fetcher.get(image_url, ResponseMode::Binary).await?;
        let payload = match to_data_uri(&body) {
            Ok(data_uri) => Payload::DataUri(data_uri),
            Err(e) => {
                let raw = canonicalize(image_url).map_err(|_| e)?;
                tracing::debug!("keeping raw URL for {}", raw);
                Payload::Url(raw.to_string())
            }
        };
        self.cache.put(cache_url, &payload).await;
        Ok(ResolvedMedia::Thumbnail { payload, from_cache: false })
    }
}
