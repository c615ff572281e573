//! Narrow view of the rendered page.
//!
//! Post-number resolution and row grouping only need a handful of queries
//! against the document. `PageDom` names exactly those so the logic can run
//! against parsed HTML, a live browser DOM, or a synthetic fixture.

/// Vertical extent of a rendered element, in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub top: f64,
    pub bottom: f64,
}

/// Ancestor containers the pipeline looks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContainerKind {
    /// A single forum post.
    Post,
    /// The paragraph or post body that holds running text.
    Paragraph,
    /// Anything peekbox itself inserted (thumbnails, rows, the lightbox).
    Presentation,
    /// A response body carrying its number in an `rnum` attribute.
    ResponseBody,
    /// A response list whose header carries the number.
    ResponseList,
}

/// Descendants the pipeline looks for inside a container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DescendantKind {
    /// Element whose text is the post number.
    NumberLabel,
    /// Response header carrying its number in a `res` attribute.
    ResponseHeader,
}

/// Read-only capabilities the core needs from a page.
pub trait PageDom {
    type Node: Copy + Eq;

    /// Absolute href of a link element.
    fn href(&self, node: Self::Node) -> Option<String>;

    /// Rendered box, if the page has layout.
    fn bounding_box(&self, node: Self::Node) -> Option<BoundingBox>;

    /// Nearest ancestor-or-self of the given kind.
    fn closest_container(&self, node: Self::Node, kind: ContainerKind) -> Option<Self::Node>;

    /// True when `second` is a later sibling of `first` and every node
    /// between them is whitespace, a line break, or an element with no text.
    fn only_whitespace_between(&self, first: Self::Node, second: Self::Node) -> bool;

    fn attr(&self, node: Self::Node, name: &str) -> Option<String>;

    /// First matching descendant of `scope`.
    fn find_descendant(&self, scope: Self::Node, kind: DescendantKind) -> Option<Self::Node>;

    /// Concatenated text content.
    fn text(&self, node: Self::Node) -> String;

    /// The `<img>` rendered inside a link, if any.
    fn inline_image(&self, node: Self::Node) -> Option<crate::InlineImage>;

    /// Whether the link or its inline image carries the processed marker.
    fn is_marked(&self, node: Self::Node) -> bool;

    /// Fragment of the page's own address, without `#`.
    fn location_fragment(&self) -> Option<String>;
}
