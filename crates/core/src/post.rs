//! Post number resolution for bound media.

use std::sync::LazyLock;

use regex::Regex;

use crate::dom::{ContainerKind, DescendantKind, PageDom};

/// Returned when no probe finds a number.
pub const POST_NUMBER_UNAVAILABLE: &str = "N/A";

/// Data attributes checked on the post container, in order.
const DATA_ATTRIBUTES: &[&str] = &["data-res-id", "data-res", "data-num", "data-id"];

static DIGITS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+").expect("valid regex"));

fn first_digits(text: &str) -> Option<String> {
    DIGITS.find(text).map(|m| m.as_str().to_string())
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// Resolve the post number for a link element.
pub fn resolve_post_number<D: PageDom>(dom: &D, node: D::Node) -> String {
    probe(dom, node).unwrap_or_else(|| POST_NUMBER_UNAVAILABLE.to_string())
}

fn probe<D: PageDom>(dom: &D, node: D::Node) -> Option<String> {
    if let Some(post) = dom.closest_container(node, ContainerKind::Post) {
        for name in DATA_ATTRIBUTES {
            if let Some(value) = non_empty(dom.attr(post, name)) {
                return Some(value);
            }
        }
        if let Some(number) = dom.attr(post, "id").as_deref().and_then(first_digits) {
            return Some(number);
        }
        if let Some(value) = non_empty(dom.attr(post, "val")) {
            return Some(value);
        }
        if let Some(number) = dom
            .find_descendant(post, DescendantKind::NumberLabel)
            .and_then(|label| first_digits(&dom.text(label)))
        {
            return Some(number);
        }
    }

    if let Some(value) = dom
        .closest_container(node, ContainerKind::ResponseBody)
        .and_then(|body| non_empty(dom.attr(body, "rnum")))
    {
        return Some(value);
    }

    if let Some(value) = dom
        .closest_container(node, ContainerKind::ResponseList)
        .and_then(|list| dom.find_descendant(list, DescendantKind::ResponseHeader))
        .and_then(|header| non_empty(dom.attr(header, "res")))
    {
        return Some(value);
    }

    dom.location_fragment().as_deref().and_then(first_digits)
}
