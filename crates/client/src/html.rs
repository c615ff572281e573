//! `PageDom` over parsed HTML.
//!
//! A parsed document has no layout, so `bounding_box` always returns `None`
//! and row grouping falls back to sibling and paragraph adjacency.

use std::sync::LazyLock;

use scraper::{ElementRef, Html, Node, Selector};
use url::Url;

use peekbox_core::{BoundingBox, ContainerKind, DescendantKind, InlineImage, LinkCandidate, PageDom};

/// Attribute set on links (or their images) that peekbox already handled.
pub const PROCESSED_MARKER: &str = "data-peekbox-processed";

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("invalid selector")
}

static LINKS: LazyLock<Selector> = LazyLock::new(|| selector("a[href]"));
static IMG: LazyLock<Selector> = LazyLock::new(|| selector("img"));
static POST: LazyLock<Selector> = LazyLock::new(|| {
    selector("article[id], div.post[id], div[data-res-id], dl[val], div.thread-post, .post-container, .message")
});
static PARAGRAPH: LazyLock<Selector> = LazyLock::new(|| selector("p, dd, div.message, .post-content"));
static PRESENTATION: LazyLock<Selector> = LazyLock::new(|| {
    selector(".peekbox-thumb, .peekbox-embed, .peekbox-gif, .peekbox-row, #peekbox-lightbox, #peekbox-overlay")
});
static RESPONSE_BODY: LazyLock<Selector> = LazyLock::new(|| selector("dd[rnum]"));
static RESPONSE_LIST: LazyLock<Selector> = LazyLock::new(|| selector("dl"));
static NUMBER_LABEL: LazyLock<Selector> =
    LazyLock::new(|| selector(".post-number, .res-number, .post-id, a.num, .num b"));
static RESPONSE_HEADER: LazyLock<Selector> = LazyLock::new(|| selector("dt[res]"));

/// A parsed thread page at a known address.
pub struct HtmlPage<'a> {
    document: &'a Html,
    location: Url,
}

impl<'a> HtmlPage<'a> {
    pub fn new(document: &'a Html, location: Url) -> Self {
        Self { document, location }
    }

    pub fn location(&self) -> &Url {
        &self.location
    }

    /// Every anchor with an href, in document order.
    pub fn links(&self) -> impl Iterator<Item = ElementRef<'a>> + 'a {
        self.document.select(&LINKS)
    }

    /// Classifier input for a link, or `None` if its href does not resolve.
    pub fn candidate(&self, link: ElementRef<'a>) -> Option<LinkCandidate> {
        let href = self.href(link)?;
        Some(LinkCandidate { href, processed: self.is_marked(link), inline_image: self.inline_image(link) })
    }

    fn resolve(&self, reference: &str) -> Option<String> {
        self.location.join(reference.trim()).ok().map(|u| u.to_string())
    }

    fn container_selector(kind: ContainerKind) -> &'static Selector {
        match kind {
            ContainerKind::Post => &POST,
            ContainerKind::Paragraph => &PARAGRAPH,
            ContainerKind::Presentation => &PRESENTATION,
            ContainerKind::ResponseBody => &RESPONSE_BODY,
            ContainerKind::ResponseList => &RESPONSE_LIST,
        }
    }
}

impl<'a> PageDom for HtmlPage<'a> {
    type Node = ElementRef<'a>;

    fn href(&self, node: ElementRef<'a>) -> Option<String> {
        node.value().attr("href").and_then(|href| self.resolve(href))
    }

    fn bounding_box(&self, _node: ElementRef<'a>) -> Option<BoundingBox> {
        None
    }

    fn closest_container(&self, node: ElementRef<'a>, kind: ContainerKind) -> Option<ElementRef<'a>> {
        let selector = Self::container_selector(kind);
        std::iter::once(node)
            .chain(node.ancestors().filter_map(ElementRef::wrap))
            .find(|el| selector.matches(el))
    }

    fn only_whitespace_between(&self, first: ElementRef<'a>, second: ElementRef<'a>) -> bool {
        for sibling in first.next_siblings() {
            if sibling.id() == second.id() {
                return true;
            }
            let blank = match sibling.value() {
                Node::Text(text) => text.trim().is_empty(),
                Node::Element(element) if element.name() == "br" => true,
                Node::Element(_) => ElementRef::wrap(sibling).is_some_and(|el| el.text().all(|t| t.trim().is_empty())),
                _ => true,
            };
            if !blank {
                return false;
            }
        }
        false
    }

    fn attr(&self, node: ElementRef<'a>, name: &str) -> Option<String> {
        node.value().attr(name).map(str::to_string)
    }

    fn find_descendant(&self, scope: ElementRef<'a>, kind: DescendantKind) -> Option<ElementRef<'a>> {
        let selector: &Selector = match kind {
            DescendantKind::NumberLabel => &NUMBER_LABEL,
            DescendantKind::ResponseHeader => &RESPONSE_HEADER,
        };
        scope.select(selector).next()
    }

    fn text(&self, node: ElementRef<'a>) -> String {
        node.text().collect()
    }

    fn inline_image(&self, node: ElementRef<'a>) -> Option<InlineImage> {
        let img = node.select(&IMG).next()?;
        let src = img.value().attr("src").and_then(|src| self.resolve(src)).unwrap_or_default();
        let class = img.value().attr("class").unwrap_or_default().to_string();
        Some(InlineImage { src, class })
    }

    fn is_marked(&self, node: ElementRef<'a>) -> bool {
        node.value().attr(PROCESSED_MARKER).is_some()
            || node.select(&IMG).any(|img| img.value().attr(PROCESSED_MARKER).is_some())
    }

    fn location_fragment(&self) -> Option<String> {
        self.location.fragment().map(str::to_string)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use peekbox_core::post::resolve_post_number;

    fn page(html: &str, location: &str) -> (Html, Url) {
        (Html::parse_document(html), Url::parse(location).unwrap())
    }

    #[test]
    fn test_links_resolve_relative_hrefs() {
        let (doc, url) = page(
            r#"<p><a href="/x.png">x</a><a href="//i.ibb.co/y.png">y</a></p>"#,
            "https://bbs.example/test/read.cgi/b/1/",
        );
        let page = HtmlPage::new(&doc, url);
        let hrefs: Vec<String> = page.links().filter_map(|l| page.href(l)).collect();
        assert_eq!(hrefs, vec!["https://bbs.example/x.png", "https://i.ibb.co/y.png"]);
    }

    #[test]
    fn test_candidate_reports_marker_and_inline_image() {
        let (doc, url) = page(
            r#"<a href="https://tadaup.jp/a.png"><img class="thumb" src="https://tadaup.jp/t/a.png"></a>
               <a href="https://i.ibb.co/b.png" data-peekbox-processed="1">b</a>
               <a href="https://i.ibb.co/c.png"><img src="c.png" data-peekbox-processed="1"></a>"#,
            "https://bbs.example/",
        );
        let page = HtmlPage::new(&doc, url);
        let candidates: Vec<LinkCandidate> = page.links().filter_map(|l| page.candidate(l)).collect();

        assert!(!candidates[0].processed);
        assert_eq!(
            candidates[0].inline_image,
            Some(InlineImage { src: "https://tadaup.jp/t/a.png".to_string(), class: "thumb".to_string() })
        );
        assert!(candidates[1].processed);
        assert!(candidates[2].processed);
    }

    #[test]
    fn test_whitespace_between_links() {
        let (doc, url) = page(
            r#"<div><a href="a.png">a</a> <br> <span> </span><a href="b.png">b</a> text <a href="c.png">c</a></div>"#,
            "https://bbs.example/",
        );
        let page = HtmlPage::new(&doc, url);
        let links: Vec<_> = page.links().collect();

        assert!(page.only_whitespace_between(links[0], links[1]));
        assert!(!page.only_whitespace_between(links[1], links[2]));
        assert!(!page.only_whitespace_between(links[1], links[0]));
    }

    #[test]
    fn test_closest_container_kinds() {
        let (doc, url) = page(
            r#"<div class="peekbox-row"><a href="a.png">a</a></div>
               <article id="res-12"><p><a href="b.png">b</a></p></article>"#,
            "https://bbs.example/",
        );
        let page = HtmlPage::new(&doc, url);
        let links: Vec<_> = page.links().collect();

        assert!(page.closest_container(links[0], ContainerKind::Presentation).is_some());
        assert!(page.closest_container(links[1], ContainerKind::Presentation).is_none());
        let post = page.closest_container(links[1], ContainerKind::Post).unwrap();
        assert_eq!(post.value().attr("id"), Some("res-12"));
        assert!(page.closest_container(links[1], ContainerKind::Paragraph).is_some());
        assert!(page.bounding_box(links[1]).is_none());
    }

    #[test]
    fn test_post_numbers_from_markup() {
        let (doc, url) = page(
            r#"<div class="post" id="p5" data-res="41"><a href="a.png">a</a></div>
               <div class="thread-post"><span class="post-number">No. 77</span><a href="b.png">b</a></div>
               <dl><dt res="9">9</dt><dd rnum="9"><a href="c.png">c</a></dd></dl>
               <a href="d.png">d</a>"#,
            "https://bbs.example/read#r300",
        );
        let page = HtmlPage::new(&doc, url);
        let numbers: Vec<String> = page.links().map(|l| resolve_post_number(&page, l)).collect();
        assert_eq!(numbers, vec!["41", "77", "9", "300"]);
    }
}
