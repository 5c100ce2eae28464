//! One document view: the full extract, allocate, bind pipeline plus the
//! navigation state of a single scroll container.
//!
//! The viewer keeps two of these (inline and fullscreen). They share nothing,
//! so a click in one never moves or highlights the other.

use std::time::Instant;

use crate::allocate::{allocate, Heading, HeadingIdentifierMap};
use crate::binder::{bind, BoundHeadings};
use crate::config::NavigationConfig;
use crate::container::ScrollContainer;
use crate::extract::extract_headings;
use crate::pipeline;
use crate::render::{ElementId, RenderedDocument};
use crate::resolver::{fragment, scroll_to_element, AnchorResolver};
use crate::schedule::DeferredQueue;
use crate::toc::TableOfContents;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewTask {
    /// Second bind pass once late content has mounted.
    Rebind,
    /// Anchor click waiting for layout to settle. Without a link, the first
    /// match wins.
    ResolveAnchor {
        fragment: String,
        link: Option<ElementId>,
    },
}

#[derive(Debug, Clone)]
pub struct DocumentView {
    config: NavigationConfig,
    resolver: AnchorResolver,
    map: HeadingIdentifierMap,
    rendered: RenderedDocument,
    bound: BoundHeadings,
    toc: TableOfContents,
    tasks: DeferredQueue<ViewTask>,
    version: u64,
}

impl DocumentView {
    pub fn new(config: NavigationConfig) -> Self {
        let config = config.sanitized();
        Self {
            resolver: AnchorResolver::new(config.scroll_margin),
            toc: TableOfContents::new(config.active_offset),
            config,
            map: HeadingIdentifierMap::default(),
            rendered: RenderedDocument::default(),
            bound: BoundHeadings::default(),
            tasks: DeferredQueue::new(),
            version: 0,
        }
    }

    pub fn config(&self) -> &NavigationConfig {
        &self.config
    }

    /// Apply new tuning without touching the loaded content.
    pub fn set_config(&mut self, config: NavigationConfig) {
        let config = config.sanitized();
        self.resolver = AnchorResolver::new(config.scroll_margin);
        let mut toc = TableOfContents::new(config.active_offset);
        toc.rebuild(self.map.headings());
        self.toc = toc;
        self.config = config;
    }

    /// Load a new content version, rendering it with the markdown pipeline.
    pub fn load(&mut self, source: &str, now: Instant) {
        self.load_rendered(source, pipeline::render(source), now);
    }

    /// Load a new content version whose rendered tree was produced elsewhere.
    ///
    /// Everything derived from the previous version is discarded: pending
    /// timers, bindings and the active heading.
    pub fn load_rendered(&mut self, source: &str, rendered: RenderedDocument, now: Instant) {
        self.tasks.cancel_all();
        self.version += 1;

        self.map = allocate(extract_headings(source));
        self.toc.rebuild(self.map.headings());
        self.rendered = rendered;
        self.bound = bind(&self.map, &self.rendered.headings);

        self.tasks
            .schedule_after(now, self.config.bind_settle(), ViewTask::Rebind);
        log::debug!(
            "content version {}: {} headings, {} bound",
            self.version,
            self.map.len(),
            self.bound.len()
        );
    }

    /// Replace the rendered tree (content mounted late) and bind again.
    pub fn mount(&mut self, rendered: RenderedDocument) {
        self.rendered = rendered;
        self.rebind();
    }

    /// Stop all timers and drop bindings; the next load starts fresh.
    pub fn unmount(&mut self) {
        self.tasks.cancel_all();
        self.bound.clear();
        self.toc.invalidate();
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn headings(&self) -> &[Heading] {
        self.map.headings()
    }

    pub fn rendered(&self) -> &RenderedDocument {
        &self.rendered
    }

    pub fn bound(&self) -> &BoundHeadings {
        &self.bound
    }

    pub fn toc(&self) -> &TableOfContents {
        &self.toc
    }

    pub fn active_id(&self) -> Option<&str> {
        self.toc.active_id()
    }

    /// Text of the first level-1 heading.
    pub fn title(&self) -> Option<&str> {
        self.map
            .headings()
            .iter()
            .find(|h| h.level == 1)
            .map(|h| h.text.as_str())
    }

    /// A link was activated. In-document fragments are taken over (the
    /// caller must not follow them) and resolved once layout has settled.
    /// Returns false for anything else.
    pub fn click_anchor(&mut self, href: &str, link: ElementId, now: Instant) -> bool {
        let Some(target) = fragment(href) else {
            return false;
        };
        self.schedule_anchor(target, Some(link), now);
        true
    }

    /// Go to `target` once the current content has been laid out, e.g. the
    /// fragment of a link that opened this document.
    pub fn jump_to(&mut self, target: &str, now: Instant) {
        self.schedule_anchor(target, None, now);
    }

    fn schedule_anchor(&mut self, target: &str, link: Option<ElementId>, now: Instant) {
        // Only the latest request counts.
        self.tasks
            .cancel_where(|task| matches!(task, ViewTask::ResolveAnchor { .. }));
        self.tasks.schedule_after(
            now,
            self.config.anchor_settle(),
            ViewTask::ResolveAnchor {
                fragment: target.to_string(),
                link,
            },
        );
    }

    pub fn click_toc(&mut self, id: &str, container: &mut dyn ScrollContainer) -> bool {
        self.toc
            .click(id, &self.bound, container, self.config.scroll_margin)
    }

    /// A rendered heading was clicked: bring it to the top margin.
    pub fn click_heading(&mut self, element: ElementId, container: &mut dyn ScrollContainer) -> bool {
        if self.bound.by_element(element).is_none() {
            return false;
        }
        scroll_to_element(container, element, self.config.scroll_margin)
    }

    /// Scroll offset or layout may have changed. Returns true when the active
    /// heading changed.
    pub fn on_scroll(&mut self, container: &dyn ScrollContainer) -> bool {
        self.toc.on_scroll(&self.bound, container)
    }

    /// Run every task due at `now`. Returns true if any ran.
    pub fn tick(&mut self, now: Instant, container: &mut dyn ScrollContainer) -> bool {
        let due = self.tasks.take_due(now);
        let ran = !due.is_empty();
        for task in due {
            match task {
                ViewTask::Rebind => self.rebind(),
                ViewTask::ResolveAnchor {
                    fragment,
                    link: Some(link),
                } => {
                    self.resolver.navigate(&fragment, link, &self.bound, container);
                }
                ViewTask::ResolveAnchor {
                    fragment,
                    link: None,
                } => {
                    self.resolver.navigate_first(&fragment, &self.bound, container);
                }
            }
        }
        ran
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.tasks.next_due()
    }

    pub fn has_pending_tasks(&self) -> bool {
        !self.tasks.is_empty()
    }

    fn rebind(&mut self) {
        self.bound = bind(&self.map, &self.rendered.headings);
        self.toc.invalidate();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::ScrollState;
    use std::time::Duration;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn load_builds_toc_and_bindings() {
        let mut view = DocumentView::new(NavigationConfig::default());
        view.load("# Guide\n\nText\n\n## Setup\n", Instant::now());

        let ids: Vec<_> = view.toc().entries().iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["guide", "setup"]);
        assert_eq!(view.bound().len(), 2);
        assert_eq!(view.title(), Some("Guide"));
        assert_eq!(view.version(), 1);
    }

    #[test]
    fn title_needs_a_level_one_heading() {
        let mut view = DocumentView::new(NavigationConfig::default());
        view.load("## Only a subsection\n", Instant::now());
        assert_eq!(view.title(), None);
    }

    #[test]
    fn anchor_click_waits_for_settle_delay() {
        let start = Instant::now();
        let mut view = DocumentView::new(NavigationConfig::default());
        view.load("# A\n\n[go](#b)\n\n# B\n", start);

        let link = view.rendered().links[0].element;
        let target = view.bound().by_id("b").map(|h| h.element).unwrap();
        let mut state = ScrollState::new();
        state.set_element_top(link, 100.0);
        state.set_element_top(target, 900.0);

        assert!(view.click_anchor("#b", link, start));
        view.tick(start + ms(10), &mut state);
        assert_eq!(state.pending_request(), None);

        view.tick(start + ms(50), &mut state);
        assert_eq!(state.pending_request().map(|r| r.offset), Some(880.0));
    }

    #[test]
    fn jump_to_waits_for_layout_and_takes_first_match() {
        let start = Instant::now();
        let mut view = DocumentView::new(NavigationConfig::default());
        view.load("# A\n\n## Setup\n\n# B\n\n## Setup\n", start);
        view.jump_to("setup", start);

        let mut state = ScrollState::new();
        state.set_element_top(view.bound().by_id("setup").unwrap().element, 240.0);
        state.set_element_top(view.bound().by_id("setup-1").unwrap().element, 900.0);
        view.tick(start + ms(20), &mut state);
        assert_eq!(state.pending_request(), None);

        view.tick(start + ms(50), &mut state);
        assert_eq!(state.pending_request().map(|r| r.offset), Some(220.0));
    }

    #[test]
    fn non_fragment_links_are_not_intercepted() {
        let start = Instant::now();
        let mut view = DocumentView::new(NavigationConfig::default());
        view.load("[x](https://example.com)\n", start);
        assert!(!view.click_anchor("https://example.com", ElementId(0), start));
        assert!(!view.click_anchor("#", ElementId(0), start));
    }

    #[test]
    fn second_click_replaces_the_first() {
        let start = Instant::now();
        let mut view = DocumentView::new(NavigationConfig::default());
        view.load("# A\n\n# B\n", start);
        let a = view.bound().by_id("a").unwrap().element;
        let b = view.bound().by_id("b").unwrap().element;
        let mut state = ScrollState::new();
        state.set_element_top(a, 400.0);
        state.set_element_top(b, 800.0);

        view.click_anchor("#a", ElementId(99), start);
        view.click_anchor("#b", ElementId(99), start + ms(5));
        view.tick(start + ms(100), &mut state);
        assert_eq!(state.pending_request().map(|r| r.offset), Some(780.0));
    }

    #[test]
    fn new_content_cancels_pending_anchor() {
        let start = Instant::now();
        let mut view = DocumentView::new(NavigationConfig::default());
        view.load("# A\n", start);
        let a = view.bound().by_id("a").unwrap().element;
        let mut state = ScrollState::new();
        state.set_element_top(a, 300.0);

        view.click_anchor("#a", ElementId(99), start);
        view.load("# A\n", start + ms(10));
        view.tick(start + ms(60), &mut state);
        assert_eq!(state.pending_request(), None);
        // Only the settle rebind of the new version is left.
        assert_eq!(view.next_deadline(), Some(start + ms(110)));
    }

    #[test]
    fn settle_rebind_picks_up_late_content() {
        let start = Instant::now();
        let mut view = DocumentView::new(NavigationConfig::default());
        let source = "# Late\n";
        view.load_rendered(source, RenderedDocument::default(), start);
        assert!(view.bound().is_empty());

        // The tree shows up after the first pass; the timer binds it.
        view.rendered = pipeline::render(source);
        let mut state = ScrollState::new();
        assert!(view.tick(start + ms(100), &mut state));
        assert_eq!(view.bound().by_id("late").map(|h| h.level), Some(1));
        assert!(!view.has_pending_tasks());
    }

    #[test]
    fn mount_binds_immediately() {
        let start = Instant::now();
        let mut view = DocumentView::new(NavigationConfig::default());
        let source = "## Intro\n\n## Intro\n";
        view.load_rendered(source, RenderedDocument::default(), start);
        view.mount(pipeline::render(source));

        let ids: Vec<_> = view.bound().iter().map(|h| h.id.as_str()).collect();
        assert_eq!(ids, vec!["intro", "intro-1"]);
    }

    #[test]
    fn heading_click_scrolls_to_margin() {
        let mut view = DocumentView::new(NavigationConfig::default());
        view.load("# A\n\n# B\n", Instant::now());
        let b = view.bound().by_id("b").unwrap().element;
        let mut state = ScrollState::new();
        state.set_element_top(b, 640.0);

        assert!(view.click_heading(b, &mut state));
        assert_eq!(state.pending_request().map(|r| r.offset), Some(620.0));
        assert!(!view.click_heading(ElementId(500), &mut state));
    }

    #[test]
    fn unmount_drops_timers_and_bindings() {
        let start = Instant::now();
        let mut view = DocumentView::new(NavigationConfig::default());
        view.load("# A\n", start);
        view.click_anchor("#a", ElementId(9), start);
        view.unmount();
        assert!(!view.has_pending_tasks());
        assert!(view.bound().is_empty());
    }

    #[test]
    fn set_config_keeps_entries() {
        let mut view = DocumentView::new(NavigationConfig::default());
        view.load("# A\n## B\n", Instant::now());
        view.set_config(NavigationConfig {
            scroll_margin: 40.0,
            ..Default::default()
        });
        assert_eq!(view.config().scroll_margin, 40.0);
        assert_eq!(view.toc().entries().len(), 2);
    }
}
