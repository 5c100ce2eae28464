//! In-document anchor resolution.
//!
//! A fragment like `#overview` can legitimately match several headings (the
//! same section title under different chapters). The reader expects the
//! nearest one after the link they clicked, so matches are ranked by distance
//! below the link and only fall back to document order when nothing follows.

use crate::binder::{BoundHeading, BoundHeadings};
use crate::container::{ScrollBehavior, ScrollContainer};
use crate::render::ElementId;

/// The fragment of an in-document link (`#id` -> `id`). Anything else,
/// including a bare `#`, is not handled here.
pub fn fragment(href: &str) -> Option<&str> {
    href.strip_prefix('#').filter(|f| !f.is_empty())
}

fn heading_matches(heading: &BoundHeading, target: &str, target_lower: &str) -> bool {
    heading.id == target
        || heading.id.to_lowercase() == target_lower
        || heading.slug == target
        || heading.slug == target_lower
}

/// Every rendered heading the fragment could mean, in document order.
pub fn matching_headings<'a>(bound: &'a BoundHeadings, target: &str) -> Vec<&'a BoundHeading> {
    let target_lower = target.to_lowercase();
    bound
        .iter()
        .filter(|h| heading_matches(h, target, &target_lower))
        .collect()
}

/// Scroll `container` so `element` sits `margin` below its top edge.
///
/// Returns false (and does nothing) when the element has no measured position.
pub fn scroll_to_element(container: &mut dyn ScrollContainer, element: ElementId, margin: f32) -> bool {
    match container.element_top(element) {
        Some(top) => {
            let offset = (top - margin).max(0.0);
            log::debug!("scrolling to element {} at {top} (offset {offset})", element.0);
            container.scroll_to(offset, ScrollBehavior::Smooth);
            true
        }
        None => {
            log::debug!("element {} has no layout yet, not scrolling", element.0);
            false
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnchorResolver {
    scroll_margin: f32,
}

impl AnchorResolver {
    pub fn new(scroll_margin: f32) -> Self {
        Self { scroll_margin }
    }

    /// Pick the heading a click on `link` pointing at `target` should go to.
    pub fn resolve(
        &self,
        target: &str,
        link: ElementId,
        bound: &BoundHeadings,
        container: &dyn ScrollContainer,
    ) -> Option<ElementId> {
        let matches = matching_headings(bound, target);
        let first = matches.first()?;

        let below = container.element_top(link).and_then(|link_top| {
            matches
                .iter()
                .filter_map(|h| {
                    let top = container.element_top(h.element)?;
                    let distance = top - link_top;
                    (distance > 0.0).then_some((distance, h.element))
                })
                .min_by(|a, b| a.0.total_cmp(&b.0))
                .map(|(_, element)| element)
        });

        Some(below.unwrap_or(first.element))
    }

    /// Resolve and scroll. Returns the heading scrolled to, if any.
    pub fn navigate(
        &self,
        target: &str,
        link: ElementId,
        bound: &BoundHeadings,
        container: &mut dyn ScrollContainer,
    ) -> Option<ElementId> {
        let Some(element) = self.resolve(target, link, bound, container) else {
            log::debug!("anchor #{target} matches no heading");
            return None;
        };
        scroll_to_element(container, element, self.scroll_margin).then_some(element)
    }

    /// Scroll to the first heading `target` matches. Used when there is no
    /// clicked link to measure from, e.g. a fragment carried over from another file.
    pub fn navigate_first(
        &self,
        target: &str,
        bound: &BoundHeadings,
        container: &mut dyn ScrollContainer,
    ) -> Option<ElementId> {
        let Some(element) = matching_headings(bound, target).first().map(|h| h.element) else {
            log::debug!("anchor #{target} matches no heading");
            return None;
        };
        scroll_to_element(container, element, self.scroll_margin).then_some(element)
    }
}
