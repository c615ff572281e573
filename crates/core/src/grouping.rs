//! Row grouping of consecutive image links.
//!
//! A single pass over the classified links of a page keeps one open run.
//! Image links that sit next to the run's last member extend it; anything
//! else closes it. Runs of two or more become rows.

use crate::classify::ClassifiedLink;
use crate::dom::{ContainerKind, PageDom};

/// Maximum vertical gap, in pixels, between two links in one row.
pub const VERTICAL_GAP_THRESHOLD: f64 = 100.0;

/// Consecutive image links laid out together.
#[derive(Debug, Clone, PartialEq)]
pub struct Group<N> {
    pub links: Vec<ClassifiedLink<N>>,
}

impl<N> Group<N> {
    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }
}

/// Group links (in document order) into rows.
pub fn group<D: PageDom>(dom: &D, links: &[ClassifiedLink<D::Node>]) -> Vec<Group<D::Node>> {
    let mut groups = Vec::new();
    let mut run: Vec<ClassifiedLink<D::Node>> = Vec::new();

    for link in links {
        let inside_presentation = dom.closest_container(link.element, ContainerKind::Presentation).is_some();
        if inside_presentation || !link.classification.strategy.is_image() {
            close_run(&mut run, &mut groups);
            continue;
        }

        let extends = run.last().is_some_and(|last| adjacent(dom, last.element, link.element));
        if !extends {
            close_run(&mut run, &mut groups);
        }
        run.push(link.clone());
    }
    close_run(&mut run, &mut groups);

    groups
}

fn close_run<N>(run: &mut Vec<ClassifiedLink<N>>, groups: &mut Vec<Group<N>>) {
    let links = std::mem::take(run);
    if links.len() >= 2 {
        groups.push(Group { links });
    }
}

fn adjacent<D: PageDom>(dom: &D, first: D::Node, second: D::Node) -> bool {
    if dom.only_whitespace_between(first, second) {
        return true;
    }

    let gap = dom
        .bounding_box(first)
        .zip(dom.bounding_box(second))
        .map(|(a, b)| (b.top - a.bottom).abs());
    if gap.is_some_and(|gap| gap < VERTICAL_GAP_THRESHOLD) {
        return true;
    }

    matches!(
        (dom.closest_container(first, ContainerKind::Paragraph), dom.closest_container(second, ContainerKind::Paragraph)),
        (Some(a), Some(b)) if a == b
    )
}
