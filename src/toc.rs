//! Table of contents model: ordered entries plus the highlighted one.

use crate::allocate::Heading;
use crate::binder::BoundHeadings;
use crate::container::ScrollContainer;
use crate::resolver::scroll_to_element;
use crate::tracker::ActiveHeadingTracker;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TocEntry {
    pub id: String,
    pub text: String,
    pub level: u8,
}

impl From<&Heading> for TocEntry {
    fn from(heading: &Heading) -> Self {
        Self {
            id: heading.id.clone(),
            text: heading.text.clone(),
            level: heading.level,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TableOfContents {
    entries: Vec<TocEntry>,
    headings: Vec<Heading>,
    tracker: ActiveHeadingTracker,
}

impl TableOfContents {
    pub fn new(active_offset: f32) -> Self {
        Self {
            entries: Vec::new(),
            headings: Vec::new(),
            tracker: ActiveHeadingTracker::new(active_offset),
        }
    }

    /// Replace the entries for a new content version.
    pub fn rebuild(&mut self, headings: &[Heading]) {
        self.entries = headings.iter().map(TocEntry::from).collect();
        self.headings = headings.to_vec();
        self.tracker.reset();
    }

    pub fn entries(&self) -> &[TocEntry] {
        &self.entries
    }

    pub fn active_id(&self) -> Option<&str> {
        self.tracker.active()
    }

    pub fn is_active(&self, id: &str) -> bool {
        self.active_id() == Some(id)
    }

    /// Bindings or layout changed; re-check on the next scroll update.
    pub fn invalidate(&mut self) {
        self.tracker.invalidate();
    }

    pub fn on_scroll(&mut self, bound: &BoundHeadings, container: &dyn ScrollContainer) -> bool {
        self.tracker.on_scroll(&self.headings, bound, container)
    }

    /// Highlight `id` immediately and scroll its heading into place. The id is
    /// looked up directly; duplicates were already disambiguated at allocation.
    pub fn click(
        &mut self,
        id: &str,
        bound: &BoundHeadings,
        container: &mut dyn ScrollContainer,
        margin: f32,
    ) -> bool {
        self.tracker.set_active(id);
        match bound.by_id(id).or_else(|| bound.lookup(id)) {
            Some(heading) => scroll_to_element(container, heading.element, margin),
            None => {
                log::debug!("table of contents entry {id} has no rendered heading");
                false
            }
        }
    }
}
