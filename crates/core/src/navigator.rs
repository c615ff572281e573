//! Lightbox navigation state machine.
//!
//! The navigator is either closed or open on one registry index. Opening an
//! index starts a full-resolution load; the caller reports the natural size
//! back with [`Navigator::complete_load`] and the navigator fits it to the
//! viewport. Completions for an index that is no longer shown are dropped.

use serde::{Deserialize, Serialize};

use crate::classify::ServiceTag;
use crate::registry::{ImageRecord, Registry};
use crate::Error;

/// Fraction of each viewport edge an image may fill.
const VIEWPORT_FILL: f64 = 0.9;

/// Height kept free under the image for the caption and detail links.
pub const CAPTION_RESERVE: f64 = 80.0;

const REVERSE_SEARCH_URL: &str = "https://lens.google.com/uploadbyurl?hl=ja&url=";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

/// Fitted on-screen size of the full-resolution image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DisplaySize {
    pub width: u32,
    pub height: u32,
}

/// Scale a natural size down to fit the viewport, never up.
pub fn fit_to_viewport(width: u32, height: u32, viewport: Viewport) -> DisplaySize {
    let max_width = f64::from(viewport.width) * VIEWPORT_FILL;
    let max_height = f64::from(viewport.height) * VIEWPORT_FILL - CAPTION_RESERVE;
    let (w, h) = (f64::from(width), f64::from(height));
    let ratio = (max_width / w).min(max_height / h).min(1.0).max(0.0);
    DisplaySize { width: (w * ratio).round() as u32, height: (h * ratio).round() as u32 }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "lowercase")]
pub enum LoadState {
    Loading,
    Ready(DisplaySize),
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum LightboxState {
    Closed,
    Open { index: usize, load: LoadState },
}

/// A link shown under the open image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DetailLink {
    pub label: String,
    pub href: String,
}

/// Everything needed to render the open lightbox.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LightboxView {
    pub index: usize,
    pub total: usize,
    pub image_url: String,
    pub original_url: String,
    pub post_number: String,
    pub caption: String,
    pub service_label: String,
    pub has_prev: bool,
    pub has_next: bool,
    pub load: LoadState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position_label: Option<String>,
    pub links: Vec<DetailLink>,
}

#[derive(Debug, Clone)]
pub struct Navigator {
    state: LightboxState,
    viewport: Viewport,
}

impl Navigator {
    pub fn new(viewport: Viewport) -> Self {
        Self { state: LightboxState::Closed, viewport }
    }

    pub fn state(&self) -> &LightboxState {
        &self.state
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    /// Index currently shown, if open.
    pub fn current(&self) -> Option<usize> {
        match self.state {
            LightboxState::Open { index, .. } => Some(index),
            LightboxState::Closed => None,
        }
    }

    /// Open (or re-open) the lightbox on a 1-based index.
    pub fn open(&mut self, registry: &Registry, index: usize) -> Result<(), Error> {
        if index == 0 || index > registry.len() {
            return Err(Error::InvalidInput(format!(
                "lightbox index {index} is outside 1..={}",
                registry.len()
            )));
        }
        self.state = LightboxState::Open { index, load: LoadState::Loading };
        tracing::debug!(index, total = registry.len(), "lightbox open");
        Ok(())
    }

    /// Move forward one image. Returns false at the last image or when closed.
    pub fn next(&mut self, registry: &Registry) -> bool {
        match self.current() {
            Some(index) if index < registry.len() => {
                self.state = LightboxState::Open { index: index + 1, load: LoadState::Loading };
                true
            }
            _ => false,
        }
    }

    /// Move back one image. Returns false at the first image or when closed.
    pub fn prev(&mut self) -> bool {
        match self.current() {
            Some(index) if index > 1 => {
                self.state = LightboxState::Open { index: index - 1, load: LoadState::Loading };
                true
            }
            _ => false,
        }
    }

    /// Close the lightbox. Returns whether it was open.
    pub fn close(&mut self) -> bool {
        let was_open = self.current().is_some();
        self.state = LightboxState::Closed;
        was_open
    }

    /// Close and return the address of the shown image's post.
    pub fn jump(&mut self, registry: &Registry, page_url: &str) -> Option<String> {
        let record = self.current().and_then(|index| registry.get(index))?;
        let target = post_anchor_url(page_url, &record.post_number);
        self.close();
        Some(target)
    }

    /// Report the outcome of a full-resolution load.
    ///
    /// Returns false when `index` is no longer the open image.
    pub fn complete_load(&mut self, index: usize, natural: Result<(u32, u32), String>) -> bool {
        if self.current() != Some(index) {
            tracing::debug!(index, "dropping stale image load");
            return false;
        }
        let load = match natural {
            Ok((width, height)) if width > 0 && height > 0 => {
                LoadState::Ready(fit_to_viewport(width, height, self.viewport))
            }
            Ok(_) => LoadState::Failed("image has no dimensions".to_string()),
            Err(reason) => LoadState::Failed(reason),
        };
        self.state = LightboxState::Open { index, load };
        true
    }

    /// Render data for the open image.
    pub fn view(&self, registry: &Registry) -> Option<LightboxView> {
        let LightboxState::Open { index, load } = &self.state else {
            return None;
        };
        let record = registry.get(*index)?;
        Some(build_view(record, registry.len(), load.clone()))
    }
}

fn build_view(record: &ImageRecord, total: usize, load: LoadState) -> LightboxView {
    let service = ServiceTag::from_url(&record.original_url);
    let is_imgur = service == ServiceTag::Imgur;

    let encoded: String = url::form_urlencoded::byte_serialize(record.image_url.as_bytes()).collect();
    let service_page = if is_imgur { strip_image_extension(&record.image_url) } else { record.original_url.clone() };
    let links = vec![
        DetailLink { label: "Image search".to_string(), href: format!("{REVERSE_SEARCH_URL}{encoded}") },
        DetailLink { label: "Direct URL".to_string(), href: record.image_url.clone() },
        DetailLink { label: service.label().to_string(), href: service_page },
    ];

    LightboxView {
        index: record.index,
        total,
        image_url: record.image_url.clone(),
        original_url: record.original_url.clone(),
        post_number: record.post_number.clone(),
        caption: format!(">>{}", record.post_number),
        service_label: service.label().to_string(),
        has_prev: record.index > 1,
        has_next: record.index < total,
        load,
        position_label: is_imgur.then(|| format!("{} / {total}", record.index)),
        links,
    }
}

fn strip_image_extension(url: &str) -> String {
    let lower = url.to_ascii_lowercase();
    for ext in [".jpeg", ".jpg", ".png", ".gif"] {
        if lower.ends_with(ext) {
            return url[..url.len() - ext.len()].to_string();
        }
    }
    url.to_string()
}

/// `<page-url-without-fragment>#<postNumber>`.
pub fn post_anchor_url(page_url: &str, post_number: &str) -> String {
    let base = page_url.split_once('#').map_or(page_url, |(base, _)| base);
    format!("{base}#{post_number}")
}
