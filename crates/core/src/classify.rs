//! Link classification.
//!
//! Maps an anchor on a forum page to the way it should be handled. The rules
//! are host and path patterns for a fixed set of image hosts; the first rule
//! that matches wins. Classification is pure: the same candidate always gets
//! the same answer.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use url::Url;

static VALID_EXTENSION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\.(jpe?g|png|gif|webp)$").expect("valid regex"));
static EMBEDDABLE_EXTENSION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\.(jpe?g|png|gif)$").expect("valid regex"));
static IMGUR_GIF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)i\.imgur\.com/[0-9a-z]+\.gif").expect("valid regex"));
static IMGUR_MP4: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)i\.imgur\.com/[0-9a-z]+\.mp4").expect("valid regex"));
static IMGUR_STILL: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)\.(jpe?g|png)$").expect("valid regex"));
static GALLERY_PAGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^https?://(postimg\.cc/[0-9A-Za-z]+|freeimage\.host/i/[0-9A-Za-z]+|ibb\.co/[0-9A-Za-z]+)")
        .expect("valid regex")
});

/// Hosts whose bare root page is never worth touching.
const ROOT_PAGE_HOSTS: &[&str] = &[
    "ul.h3z.jp",
    "tadaup.jp",
    "ibb.co",
    "i.ibb.co",
    "i.postimg.cc",
    "postimg.cc",
    "freeimage.host",
    "iili.io",
    "funakamome.com",
];

/// Hosts that serve image files directly, but only when the URL names one.
const DIRECT_HOSTS: &[&str] = &["i.ibb.co", "i.postimg.cc", "ul.h3z.jp", "iili.io", "funakamome.com"];

/// How a link is handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    /// The URL is the image file; fetch and thumbnail it.
    DirectImage,
    /// The URL is a host page that points at the image; scrape then fetch.
    GalleryPage,
    /// Animated gif shown in place from its own URL.
    InlineGif,
    /// Short video shown in place with a native player.
    InlineVideo,
    /// The page already renders an image inside the link; bind it only.
    AlreadyEmbedded,
    /// Not handled.
    Ignored,
}

impl Strategy {
    /// Whether the link produces media and can join an image row.
    pub fn is_image(self) -> bool {
        !matches!(self, Strategy::Ignored)
    }
}

/// Image host a link belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceTag {
    Imgur,
    ImgBB,
    Tadaup,
    H3z,
    Postimg,
    Freeimage,
    Funakamome,
    Other,
}

impl ServiceTag {
    /// Identify the service from anywhere in a URL string.
    pub fn from_url(url: &str) -> Self {
        let lower = url.to_ascii_lowercase();
        if lower.contains("imgur") {
            ServiceTag::Imgur
        } else if lower.contains("ibb.co") {
            ServiceTag::ImgBB
        } else if lower.contains("tadaup.jp") {
            ServiceTag::Tadaup
        } else if lower.contains("ul.h3z.jp") {
            ServiceTag::H3z
        } else if lower.contains("postimg.cc") {
            ServiceTag::Postimg
        } else if lower.contains("freeimage.host") || lower.contains("iili.io") {
            ServiceTag::Freeimage
        } else if lower.contains("funakamome.com") {
            ServiceTag::Funakamome
        } else {
            ServiceTag::Other
        }
    }

    /// Human-readable label shown in the lightbox.
    pub fn label(self) -> &'static str {
        match self {
            ServiceTag::Imgur => "imgur",
            ServiceTag::ImgBB => "img.bb",
            ServiceTag::Tadaup => "tadaup",
            ServiceTag::H3z => "h3z.jp",
            ServiceTag::Postimg => "postimg.cc",
            ServiceTag::Freeimage => "freeimage.host",
            ServiceTag::Funakamome => "funakamome.com",
            ServiceTag::Other => "image",
        }
    }
}

/// Result of classifying one link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Classification {
    pub strategy: Strategy,
    pub service: ServiceTag,
}

impl Classification {
    fn new(strategy: Strategy, href: &str) -> Self {
        Self { strategy, service: ServiceTag::from_url(href) }
    }

    fn ignored(href: &str) -> Self {
        Self::new(Strategy::Ignored, href)
    }
}

/// An `<img>` already rendered inside the link.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InlineImage {
    pub src: String,
    pub class: String,
}

/// Everything the classifier looks at for one anchor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkCandidate {
    /// Absolute href.
    pub href: String,
    /// The anchor (or its image) already carries the processed marker.
    pub processed: bool,
    pub inline_image: Option<InlineImage>,
}

impl LinkCandidate {
    pub fn new(href: impl Into<String>) -> Self {
        Self { href: href.into(), processed: false, inline_image: None }
    }

    pub fn with_inline_image(mut self, src: impl Into<String>, class: impl Into<String>) -> Self {
        self.inline_image = Some(InlineImage { src: src.into(), class: class.into() });
        self
    }

    pub fn processed(mut self) -> Self {
        self.processed = true;
        self
    }
}

/// A link together with its classification, in document order.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifiedLink<N> {
    pub element: N,
    pub href: String,
    pub classification: Classification,
}

/// Classify a link candidate.
pub fn classify(candidate: &LinkCandidate) -> Classification {
    let href = candidate.href.as_str();
    if candidate.processed {
        return Classification::ignored(href);
    }

    let Ok(url) = Url::parse(href) else {
        return Classification::ignored(href);
    };
    if !matches!(url.scheme(), "http" | "https") {
        return Classification::ignored(href);
    }
    let host = url.host_str().unwrap_or_default().to_ascii_lowercase();
    if ROOT_PAGE_HOSTS.contains(&host.as_str()) && matches!(url.path(), "" | "/") {
        return Classification::ignored(href);
    }

    let inline = candidate.inline_image.as_ref();

    let imgur_gif_child = inline.is_some_and(|img| img.class.to_ascii_lowercase().contains("imgur"))
        && href.to_ascii_lowercase().contains(".gif");
    if imgur_gif_child || IMGUR_GIF.is_match(href) {
        return Classification::new(Strategy::InlineGif, href);
    }

    if inline.is_none() && IMGUR_MP4.is_match(href) {
        return Classification::new(Strategy::InlineVideo, href);
    }

    if inline.is_some() && href.contains("i.imgur.com/") && IMGUR_STILL.is_match(href) {
        return Classification::new(Strategy::AlreadyEmbedded, href);
    }

    if GALLERY_PAGE.is_match(href) {
        return Classification::new(Strategy::GalleryPage, href);
    }

    if DIRECT_HOSTS.contains(&host.as_str()) {
        return if VALID_EXTENSION.is_match(href) {
            Classification::new(Strategy::DirectImage, href)
        } else {
            Classification::ignored(href)
        };
    }

    let tadaup_child = inline.filter(|img| img.src.contains("tadaup.jp"));
    if host == "tadaup.jp" || tadaup_child.is_some() {
        if !VALID_EXTENSION.is_match(href) {
            return Classification::ignored(href);
        }
        if tadaup_child.is_some_and(|img| EMBEDDABLE_EXTENSION.is_match(&img.src)) {
            return Classification { strategy: Strategy::AlreadyEmbedded, service: ServiceTag::Tadaup };
        }
        if EMBEDDABLE_EXTENSION.is_match(href) {
            return Classification { strategy: Strategy::DirectImage, service: ServiceTag::Tadaup };
        }
        return Classification { strategy: Strategy::Ignored, service: ServiceTag::Tadaup };
    }

    Classification::ignored(href)
}
