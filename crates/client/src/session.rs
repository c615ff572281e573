//! One page view: registry, lightbox, and the processing pass.
//!
//! `process_html` runs in three phases. Parsing, classification, post-number
//! lookup and row grouping happen synchronously on the parsed document. Then,
//! in document order, media that needs no network and cache hits are bound.
//! Finally the remaining links resolve concurrently on the current task and
//! each is bound as soon as it completes, so registry order is binding order.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use futures_util::StreamExt;
use futures_util::stream::FuturesUnordered;
use scraper::Html;
use serde::{Deserialize, Serialize};
use url::Url;

use peekbox_core::post::resolve_post_number;
use peekbox_core::{
    ClassifiedLink, ContainerKind, Error, ImageRecord, LightboxView, Navigator, PageDom, Registry, ServiceTag,
    Strategy, Viewport, classify, group,
};

use crate::html::HtmlPage;
use crate::probe::ImageProbe;
use crate::resolve::{LinkTarget, ResolvedMedia, Resolver, still_frame_url};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Next,
    Prev,
}

/// What happened to one link during a processing pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum LinkOutcome {
    /// Not media, or already handled.
    Skipped,
    /// Bound into the registry as a still image.
    Bound { index: usize, from_cache: bool },
    /// Bound as an animated gif; the still frame is available on demand.
    AnimatedGif { index: usize, still_frame_url: String },
    /// Shown with a native player; not part of the lightbox.
    Video { src: String, page_url: String },
    /// Resolution failed; shown as an error affordance.
    Failed { error: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LinkReport {
    pub href: String,
    pub strategy: Strategy,
    pub service: ServiceTag,
    pub post_number: String,
    pub outcome: LinkOutcome,
}

/// Result of one processing pass.
#[derive(Debug, Clone, Serialize)]
pub struct PageReport {
    pub page_url: String,
    pub links: Vec<LinkReport>,
    /// Hrefs of each image row.
    pub rows: Vec<Vec<String>>,
    pub images: Vec<ImageRecord>,
}

impl PageReport {
    pub fn bound(&self) -> usize {
        self.links
            .iter()
            .filter(|l| matches!(l.outcome, LinkOutcome::Bound { .. } | LinkOutcome::AnimatedGif { .. }))
            .count()
    }

    pub fn failed(&self) -> usize {
        self.links.iter().filter(|l| matches!(l.outcome, LinkOutcome::Failed { .. })).count()
    }
}

/// Identity of a link across passes over the same page: href, post number,
/// and its position among links sharing both.
type LinkKey = (String, String, usize);

/// A link found on the page, ready to resolve.
struct PlannedLink {
    target: LinkTarget,
    post_number: String,
    key: LinkKey,
}

/// Synchronous part of the pass. The parsed document does not outlive it.
fn plan_page(html: &str, location: &Url) -> (Vec<PlannedLink>, Vec<Vec<String>>) {
    let document = Html::parse_document(html);
    let page = HtmlPage::new(&document, location.clone());

    let mut classified = Vec::new();
    let mut planned = Vec::new();
    let mut seen: HashMap<(String, String), usize> = HashMap::new();
    for element in page.links() {
        let Some(candidate) = page.candidate(element) else {
            continue;
        };
        let classification = classify(&candidate);
        classified.push(ClassifiedLink { element, href: candidate.href.clone(), classification });

        if page.closest_container(element, ContainerKind::Presentation).is_some() {
            continue;
        }
        let mut target = LinkTarget::new(candidate.href, classification);
        target.inline_src = candidate.inline_image.map(|img| img.src);
        let post_number = resolve_post_number(&page, element);
        let occurrence = seen.entry((target.href.clone(), post_number.clone())).or_default();
        let key = (target.href.clone(), post_number.clone(), *occurrence);
        *occurrence += 1;
        planned.push(PlannedLink { target, post_number, key });
    }

    let rows: Vec<Vec<String>> = group(&page, &classified)
        .into_iter()
        .map(|g| g.links.into_iter().map(|l| l.href).collect::<Vec<_>>())
        .collect();

    (planned, rows)
}

fn parse_page_url(url: &str) -> Result<Url, Error> {
    let parsed = Url::parse(url.trim()).map_err(|e| Error::InvalidUrl(format!("{url}: {e}")))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(Error::InvalidUrl(format!("unsupported scheme: {}", parsed.scheme())));
    }
    Ok(parsed)
}

/// State for one page view.
pub struct PageSession {
    resolver: Resolver,
    probe: Arc<dyn ImageProbe>,
    page_url: Option<Url>,
    registry: Registry,
    navigator: Navigator,
    /// Gif href -> index of its expanded still frame.
    expanded: HashMap<String, usize>,
    /// Links already handled by an earlier pass over this page.
    handled: HashSet<LinkKey>,
}

impl PageSession {
    pub fn new(resolver: Resolver, probe: Arc<dyn ImageProbe>, viewport: Viewport) -> Self {
        Self {
            resolver,
            probe,
            page_url: None,
            registry: Registry::new(),
            navigator: Navigator::new(viewport),
            expanded: HashMap::new(),
            handled: HashSet::new(),
        }
    }

    pub fn resolver(&self) -> &Resolver {
        &self.resolver
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn navigator(&self) -> &Navigator {
        &self.navigator
    }

    pub fn page_url(&self) -> Option<&Url> {
        self.page_url.as_ref()
    }

    /// Whether `url` names the page currently being viewed, after normalization.
    pub fn is_current_page(&self, url: &str) -> bool {
        match (&self.page_url, parse_page_url(url)) {
            (Some(current), Ok(candidate)) => *current == candidate,
            _ => false,
        }
    }

    /// Start a new page view, discarding the registry and closing the lightbox.
    pub fn begin_page(&mut self, url: &str) -> Result<(), Error> {
        self.page_url = Some(parse_page_url(url)?);
        self.registry = Registry::new();
        self.navigator = Navigator::new(self.navigator.viewport());
        self.expanded.clear();
        self.handled.clear();
        Ok(())
    }

    /// Run a processing pass over the current page's HTML.
    ///
    /// Running it again on the same page handles only links no earlier pass
    /// has seen; the rest are reported as skipped.
    pub async fn process_html(&mut self, html: &str) -> Result<PageReport, Error> {
        let location = self
            .page_url
            .clone()
            .ok_or_else(|| Error::InvalidInput("no page has been started".to_string()))?;

        let (planned, rows) = plan_page(html, &location);

        let mut reports: Vec<LinkReport> = planned
            .iter()
            .map(|p| LinkReport {
                href: p.target.href.clone(),
                strategy: p.target.classification.strategy,
                service: p.target.classification.service,
                post_number: p.post_number.clone(),
                outcome: LinkOutcome::Skipped,
            })
            .collect();

        let mut pending = Vec::new();
        for (slot, link) in planned.iter().enumerate() {
            if self.handled.contains(&link.key) {
                continue;
            }
            match Resolver::immediate(&link.target) {
                Some(Ok(media)) => reports[slot].outcome = self.bind(&link.target.href, &link.post_number, media),
                Some(Err(_)) => {}
                None => match self.resolver.cached(&link.target).await {
                    Some(media) => reports[slot].outcome = self.bind(&link.target.href, &link.post_number, media),
                    None => pending.push(slot),
                },
            }
        }

        let resolver = self.resolver.clone();
        let mut in_flight: FuturesUnordered<_> = pending
            .into_iter()
            .map(|slot| {
                let resolver = &resolver;
                let target = &planned[slot].target;
                async move { (slot, resolver.resolve_uncached(target).await) }
            })
            .collect();

        while let Some((slot, result)) = in_flight.next().await {
            let link = &planned[slot];
            reports[slot].outcome = match result {
                Ok(media) => self.bind(&link.target.href, &link.post_number, media),
                Err(e) => {
                    if e.is_link_failure() {
                        tracing::warn!("failed to resolve {}: {}", link.target.href, e);
                    } else {
                        tracing::error!("unexpected error resolving {}: {}", link.target.href, e);
                    }
                    LinkOutcome::Failed { error: e.to_string() }
                }
            };
        }

        self.handled.extend(planned.iter().map(|p| p.key.clone()));

        let report = PageReport {
            page_url: location.to_string(),
            links: reports,
            rows,
            images: self.registry.records().to_vec(),
        };
        tracing::info!(
            page = %report.page_url,
            links = report.links.len(),
            bound = report.bound(),
            failed = report.failed(),
            rows = report.rows.len(),
            "processed page"
        );
        Ok(report)
    }

    fn bind(&mut self, href: &str, post_number: &str, media: ResolvedMedia) -> LinkOutcome {
        match media {
            ResolvedMedia::Thumbnail { payload, from_cache } => {
                let index = self.registry.bind(payload.into_src(), href, post_number);
                LinkOutcome::Bound { index, from_cache }
            }
            ResolvedMedia::Embedded { image_url } => {
                let index = self.registry.bind(image_url, href, post_number);
                LinkOutcome::Bound { index, from_cache: false }
            }
            ResolvedMedia::AnimatedGif { src, still_frame_url } => {
                let index = self.registry.bind(src, href, post_number);
                LinkOutcome::AnimatedGif { index, still_frame_url }
            }
            ResolvedMedia::Video { src, page_url } => LinkOutcome::Video { src, page_url },
        }
    }

    /// Show the still frame of an inline gif and bind it.
    ///
    /// The frame is bound once per gif; later calls return the same index.
    pub fn expand_still_frame(&mut self, gif_href: &str, post_number: &str) -> Result<(usize, String), Error> {
        let still = still_frame_url(gif_href);
        if still == gif_href || ServiceTag::from_url(gif_href) != ServiceTag::Imgur {
            return Err(Error::InvalidInput(format!("not an imgur gif: {gif_href}")));
        }
        if let Some(&index) = self.expanded.get(gif_href) {
            return Ok((index, still));
        }
        let index = self.registry.bind(gif_href, gif_href, post_number);
        self.expanded.insert(gif_href.to_string(), index);
        Ok((index, still))
    }

    pub async fn open_lightbox(&mut self, index: usize) -> Result<LightboxView, Error> {
        self.navigator.open(&self.registry, index)?;
        self.load_current().await;
        self.current_view()
    }

    pub async fn step(&mut self, direction: Direction) -> Result<LightboxView, Error> {
        if self.navigator.current().is_none() {
            return Err(Error::InvalidInput("lightbox is closed".to_string()));
        }
        let moved = match direction {
            Direction::Next => self.navigator.next(&self.registry),
            Direction::Prev => self.navigator.prev(),
        };
        if moved {
            self.load_current().await;
        }
        self.current_view()
    }

    pub fn close_lightbox(&mut self) -> bool {
        self.navigator.close()
    }

    /// Close the lightbox and return the address of the shown image's post.
    pub fn jump_to_post(&mut self) -> Result<String, Error> {
        let page_url = self
            .page_url
            .as_ref()
            .ok_or_else(|| Error::InvalidInput("no page has been started".to_string()))?;
        self.navigator
            .jump(&self.registry, page_url.as_str())
            .ok_or_else(|| Error::InvalidInput("lightbox is closed".to_string()))
    }

    pub fn view(&self) -> Option<LightboxView> {
        self.navigator.view(&self.registry)
    }

    fn current_view(&self) -> Result<LightboxView, Error> {
        self.view().ok_or_else(|| Error::InvalidInput("lightbox is closed".to_string()))
    }

    async fn load_current(&mut self) {
        let Some(index) = self.navigator.current() else {
            return;
        };
        let Some(src) = self.registry.get(index).map(|r| r.image_url.clone()) else {
            return;
        };
        let result = self.probe.dimensions(&src).await.map_err(|e| e.to_string());
        self.navigator.complete_load(index, result);
    }
}
