//! Navigation tuning, persisted with the rest of the viewer state.

use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NavigationConfig {
    /// Gap kept above a heading after scrolling to it, in points.
    pub scroll_margin: f32,
    /// How far below the top edge a heading still counts as current.
    pub active_offset: f32,
    /// Delay between an anchor click and measuring positions.
    pub anchor_settle_ms: u64,
    /// Delay before the second bind pass after a content change.
    pub bind_settle_ms: u64,
    pub smooth_scroll_ms: u64,
}

impl Default for NavigationConfig {
    fn default() -> Self {
        Self {
            scroll_margin: 20.0,
            active_offset: 100.0,
            anchor_settle_ms: 50,
            bind_settle_ms: 100,
            smooth_scroll_ms: 250,
        }
    }
}

impl NavigationConfig {
    /// Replace values that would break navigation (negative or non-finite margins).
    pub fn sanitized(mut self) -> Self {
        let defaults = Self::default();
        if !self.scroll_margin.is_finite() {
            self.scroll_margin = defaults.scroll_margin;
        }
        if !self.active_offset.is_finite() {
            self.active_offset = defaults.active_offset;
        }
        self.scroll_margin = self.scroll_margin.max(0.0);
        self.active_offset = self.active_offset.max(0.0);
        self
    }

    pub fn anchor_settle(&self) -> Duration {
        Duration::from_millis(self.anchor_settle_ms)
    }

    pub fn bind_settle(&self) -> Duration {
        Duration::from_millis(self.bind_settle_ms)
    }

    pub fn smooth_scroll(&self) -> Duration {
        Duration::from_millis(self.smooth_scroll_ms)
    }
}

/// Values given on the command line for this run only.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct NavigationOverrides {
    pub scroll_margin: Option<f32>,
    pub active_offset: Option<f32>,
}

/// Stored settings plus the overrides of the current run. Only the stored
/// half is ever written back.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    stored: NavigationConfig,
    overrides: NavigationOverrides,
}

impl SessionConfig {
    pub fn new(stored: NavigationConfig, overrides: NavigationOverrides) -> Self {
        Self {
            stored: stored.sanitized(),
            overrides,
        }
    }

    /// Settings to navigate with.
    pub fn effective(&self) -> NavigationConfig {
        let mut config = self.stored.clone();
        if let Some(margin) = self.overrides.scroll_margin {
            config.scroll_margin = margin;
        }
        if let Some(offset) = self.overrides.active_offset {
            config.active_offset = offset;
        }
        config.sanitized()
    }

    /// Settings to persist.
    pub fn stored(&self) -> &NavigationConfig {
        &self.stored
    }

    /// The user edited the settings in the viewer. The edit is kept and
    /// replaces any command-line value.
    pub fn set(&mut self, config: NavigationConfig) {
        self.stored = config.sanitized();
        self.overrides = NavigationOverrides::default();
    }
}
