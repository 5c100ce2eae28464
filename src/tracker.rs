//! Scroll-driven "current heading" detection.

use crate::allocate::Heading;
use crate::binder::BoundHeadings;
use crate::container::ScrollContainer;

/// Tracks which heading the reader is currently in.
#[derive(Debug, Clone, PartialEq)]
pub struct ActiveHeadingTracker {
    active_offset: f32,
    active: Option<String>,
    // Offset of the last evaluation; `None` forces the next one.
    evaluated_at: Option<f32>,
}

impl ActiveHeadingTracker {
    pub fn new(active_offset: f32) -> Self {
        Self {
            active_offset,
            active: None,
            evaluated_at: None,
        }
    }

    pub fn active(&self) -> Option<&str> {
        self.active.as_deref()
    }

    /// Mark `id` active right away, ahead of the scroll it triggers.
    pub fn set_active(&mut self, id: &str) {
        self.active = Some(id.to_string());
    }

    /// Force re-evaluation on the next scroll update (layout or bindings changed).
    pub fn invalidate(&mut self) {
        self.evaluated_at = None;
    }

    pub fn reset(&mut self) {
        self.active = None;
        self.evaluated_at = None;
    }

    /// Re-evaluate after a scroll. Skips the work when the offset has not moved
    /// since the last evaluation. Returns true when the active heading changed.
    pub fn on_scroll(
        &mut self,
        headings: &[Heading],
        bound: &BoundHeadings,
        container: &dyn ScrollContainer,
    ) -> bool {
        let offset = container.scroll_offset();
        if self.evaluated_at == Some(offset) {
            return false;
        }
        self.evaluated_at = Some(offset);

        let current = Self::current_heading(headings, bound, container, offset + self.active_offset);
        if current != self.active.as_deref() {
            log::debug!("active heading: {current:?}");
            self.active = current.map(str::to_string);
            true
        } else {
            false
        }
    }

    // Last heading in document order whose top is at or above `threshold`.
    fn current_heading<'a>(
        headings: &'a [Heading],
        bound: &BoundHeadings,
        container: &dyn ScrollContainer,
        threshold: f32,
    ) -> Option<&'a str> {
        headings.iter().rev().find_map(|heading| {
            let element = bound.by_id(&heading.id)?.element;
            let top = container.element_top(element)?;
            (top <= threshold).then_some(heading.id.as_str())
        })
    }
}
