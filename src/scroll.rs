//! Scroll forwarding for modal backdrops.
//!
//! Below the breakpoint a modal's backdrop should scroll its inner container.
//! [`ScrollForwarder`] handles wheel/touch input that lands outside the
//! container; [`BoundaryGuard`] handles input inside it and keeps the page
//! behind from scroll-chaining once the container hits a limit.

use std::cell::RefCell;
use std::rc::Rc;

/// A vertically scrollable element.
pub trait ScrollRegion {
    fn scroll_top(&self) -> f64;
    fn scroll_height(&self) -> f64;
    fn client_height(&self) -> f64;
    fn set_scroll_top(&mut self, top: f64);

    fn metrics(&self) -> ScrollMetrics {
        ScrollMetrics {
            top: self.scroll_top(),
            height: self.scroll_height(),
            client: self.client_height(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollMetrics {
    pub top: f64,
    pub height: f64,
    pub client: f64,
}

impl ScrollMetrics {
    pub fn max_scroll(&self) -> f64 {
        (self.height - self.client).max(0.0)
    }

    pub fn at_top(&self) -> bool {
        self.top <= 0.0
    }

    /// Within one pixel of the end; browsers report fractional offsets.
    pub fn at_bottom(&self) -> bool {
        self.top >= self.max_scroll() - 1.0
    }

    pub fn clamp(&self, top: f64) -> f64 {
        top.clamp(0.0, self.max_scroll())
    }

    /// True when `delta` pushes past the limit the container already sits at.
    pub fn pushes_past_limit(&self, delta: f64) -> bool {
        (self.at_top() && delta < 0.0) || (self.at_bottom() && delta > 0.0)
    }
}

/// Where an input event originated relative to the scrollable container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    Inside,
    Outside,
}

/// Whether the caller must `preventDefault` + `stopPropagation`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    PassThrough,
    Consumed,
}

impl Disposition {
    pub fn is_consumed(self) -> bool {
        self == Self::Consumed
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct TouchAnchor {
    start_y: f64,
    start_top: f64,
}

/// Redirects backdrop input into the container.
#[derive(Debug, Default)]
pub struct ScrollForwarder {
    anchor: Option<TouchAnchor>,
}

impl ScrollForwarder {
    pub fn wheel(&mut self, origin: Origin, delta_y: f64, region: &mut impl ScrollRegion) -> Disposition {
        if origin == Origin::Inside {
            return Disposition::PassThrough;
        }
        let metrics = region.metrics();
        if metrics.pushes_past_limit(delta_y) {
            return Disposition::PassThrough;
        }
        region.set_scroll_top(metrics.clamp(metrics.top + delta_y));
        Disposition::Consumed
    }

    /// Anchors the gesture. Multi-touch gestures are left to the browser.
    pub fn touch_start(&mut self, touches: u32, client_y: f64, region: &impl ScrollRegion) {
        if touches == 1 {
            self.anchor = Some(TouchAnchor {
                start_y: client_y,
                start_top: region.scroll_top(),
            });
        }
    }

    /// Delta is measured from the touch-start anchor, not frame to frame.
    pub fn touch_move(
        &mut self,
        origin: Origin,
        touches: u32,
        client_y: f64,
        region: &mut impl ScrollRegion,
    ) -> Disposition {
        if origin == Origin::Inside || touches != 1 {
            return Disposition::PassThrough;
        }
        let Some(anchor) = self.anchor else {
            return Disposition::PassThrough;
        };
        let metrics = region.metrics();
        let target = anchor.start_top + (anchor.start_y - client_y);
        region.set_scroll_top(metrics.clamp(target));
        Disposition::Consumed
    }

    pub fn reset(&mut self) {
        self.anchor = None;
    }

    pub fn is_tracking(&self) -> bool {
        self.anchor.is_some()
    }
}

/// Stops scroll-chaining out of the container at its limits.
#[derive(Debug, Default)]
pub struct BoundaryGuard {
    touch_start_y: f64,
}

impl BoundaryGuard {
    pub fn wheel(&self, delta_y: f64, metrics: ScrollMetrics) -> Disposition {
        if metrics.pushes_past_limit(delta_y) {
            Disposition::Consumed
        } else {
            Disposition::PassThrough
        }
    }

    pub fn touch_start(&mut self, client_y: f64) {
        self.touch_start_y = client_y;
    }

    pub fn touch_move(&self, client_y: f64, metrics: ScrollMetrics) -> Disposition {
        self.wheel(self.touch_start_y - client_y, metrics)
    }
}

/// Per-modal transient scroll state, shared with bound event handlers.
#[derive(Debug, Default)]
pub struct ScrollState {
    pub forwarder: ScrollForwarder,
    pub guard: BoundaryGuard,
}

pub type SharedScroll = Rc<RefCell<ScrollState>>;
