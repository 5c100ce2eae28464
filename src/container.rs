//! Scroll containers.
//!
//! A document can be shown inside a bounded panel or the whole page. The
//! resolver and tracker only see this trait, so the same view logic runs
//! against the inline panel, the fullscreen view or a headless layout.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::render::ElementId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollBehavior {
    Instant,
    Smooth,
}

/// A scroll position change asked of the host.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollRequest {
    pub offset: f32,
    pub behavior: ScrollBehavior,
}

/// Scrollable region against which element positions are measured.
pub trait ScrollContainer {
    /// Current vertical scroll offset of the content.
    fn scroll_offset(&self) -> f32;

    /// Top of `element` measured from the start of the container's content, or
    /// `None` if the element has not been laid out yet.
    fn element_top(&self, element: ElementId) -> Option<f32>;

    fn scroll_to(&mut self, offset: f32, behavior: ScrollBehavior);
}

/// Either a caller-supplied container or the page; never both.
pub enum ScrollTarget<'a> {
    Container(&'a mut dyn ScrollContainer),
    Page(&'a mut dyn ScrollContainer),
}

impl<'a> ScrollTarget<'a> {
    /// Use `container` when one is registered, otherwise fall back to `page`.
    pub fn select(
        container: Option<&'a mut dyn ScrollContainer>,
        page: &'a mut dyn ScrollContainer,
    ) -> Self {
        match container {
            Some(container) => ScrollTarget::Container(container),
            None => ScrollTarget::Page(page),
        }
    }

    pub fn is_page(&self) -> bool {
        matches!(self, ScrollTarget::Page(_))
    }

    fn inner(&self) -> &dyn ScrollContainer {
        match self {
            ScrollTarget::Container(c) | ScrollTarget::Page(c) => &**c,
        }
    }
}

impl ScrollContainer for ScrollTarget<'_> {
    fn scroll_offset(&self) -> f32 {
        self.inner().scroll_offset()
    }

    fn element_top(&self, element: ElementId) -> Option<f32> {
        self.inner().element_top(element)
    }

    fn scroll_to(&mut self, offset: f32, behavior: ScrollBehavior) {
        match self {
            ScrollTarget::Container(c) | ScrollTarget::Page(c) => c.scroll_to(offset, behavior),
        }
    }
}

/// Container state kept outside the GUI toolkit.
///
/// The host writes measured positions and the observed offset after each
/// frame and applies [`take_request`](Self::take_request) before the next one.
#[derive(Debug, Clone, Default)]
pub struct ScrollState {
    offset: f32,
    tops: HashMap<ElementId, f32>,
    request: Option<ScrollRequest>,
}

impl ScrollState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_scroll_offset(&mut self, offset: f32) {
        self.offset = offset;
    }

    pub fn set_element_top(&mut self, element: ElementId, top: f32) {
        self.tops.insert(element, top);
    }

    /// Forget all measured positions (content changed).
    pub fn clear_layout(&mut self) {
        self.tops.clear();
    }

    pub fn pending_request(&self) -> Option<ScrollRequest> {
        self.request
    }

    pub fn take_request(&mut self) -> Option<ScrollRequest> {
        self.request.take()
    }
}

impl ScrollContainer for ScrollState {
    fn scroll_offset(&self) -> f32 {
        self.offset
    }

    fn element_top(&self, element: ElementId) -> Option<f32> {
        self.tops.get(&element).copied()
    }

    fn scroll_to(&mut self, offset: f32, behavior: ScrollBehavior) {
        if behavior == ScrollBehavior::Instant {
            self.offset = offset;
        }
        self.request = Some(ScrollRequest { offset, behavior });
    }
}

/// Eased transition between two scroll offsets.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollAnimation {
    from: f32,
    to: f32,
    started: Instant,
    duration: Duration,
}

impl ScrollAnimation {
    pub fn new(from: f32, to: f32, started: Instant, duration: Duration) -> Self {
        Self {
            from,
            to,
            started,
            duration,
        }
    }

    pub fn target(&self) -> f32 {
        self.to
    }

    /// Offset at `now`, easing out (cubic).
    pub fn sample(&self, now: Instant) -> f32 {
        let t = self.progress(now);
        let eased = 1.0 - (1.0 - t).powi(3);
        self.from + (self.to - self.from) * eased
    }

    pub fn is_finished(&self, now: Instant) -> bool {
        self.progress(now) >= 1.0
    }

    fn progress(&self, now: Instant) -> f32 {
        if self.duration.is_zero() {
            return 1.0;
        }
        let elapsed = now.saturating_duration_since(self.started);
        (elapsed.as_secs_f32() / self.duration.as_secs_f32()).min(1.0)
    }
}
