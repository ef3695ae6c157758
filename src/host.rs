//! The seam between the state machines and the browser.
//!
//! Controllers never touch the DOM, timers or history directly. They call a
//! [`Host`], which the wasm layer implements over `web-sys` and the tests
//! implement with a deterministic fake. Timers, animation frames and event
//! bindings are RAII handles: dropping one cancels or detaches it.

use std::time::Duration;

use crate::content::CaseStudyRecord;
use crate::modal::ModalKind;
use crate::scroll::SharedScroll;

/// Identifies one armed timer, frame or binding. A wake-up whose ticket no
/// longer matches the controller's pending slot is stale and ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Ticket(pub u64);

#[derive(Debug, Default)]
pub struct TicketSource {
    next: u64,
}

impl TicketSource {
    pub fn issue(&mut self) -> Ticket {
        self.next += 1;
        Ticket(self.next)
    }
}

/// A pending handle paired with the ticket it was armed under.
#[derive(Debug)]
pub struct Armed<T> {
    pub ticket: Ticket,
    pub handle: T,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModalTimer {
    EntranceGuard,
    Teardown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TabStep {
    Enter,
    Exit,
}

/// Callback routed back to the site when a timer, frame or animation fires.
#[derive(Debug, Clone, PartialEq)]
pub enum Wake {
    ModalTimer {
        kind: ModalKind,
        timer: ModalTimer,
        ticket: Ticket,
    },
    ModalAnimationEnd {
        kind: ModalKind,
        ticket: Ticket,
        on_target: bool,
        animation: String,
    },
    /// The About modal needs its tab layout measured after it became visible.
    TabLayout { ticket: Ticket },
    TabFrame {
        body: usize,
        step: TabStep,
        ticket: Ticket,
    },
    TabFallback { body: usize, ticket: Ticket },
    TabAnimationEnd {
        body: usize,
        step: TabStep,
        ticket: Ticket,
        on_target: bool,
        animation: String,
    },
}

/// Named handlers a modal may attach while forwarding scroll input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum HandlerSlot {
    DocumentWheel,
    DocumentTouchStart,
    DocumentTouchMove,
    ContainerWheel,
    ContainerTouchStart,
    ContainerTouchMove,
}

impl HandlerSlot {
    pub const ALL: [HandlerSlot; 6] = [
        HandlerSlot::DocumentWheel,
        HandlerSlot::DocumentTouchStart,
        HandlerSlot::DocumentTouchMove,
        HandlerSlot::ContainerWheel,
        HandlerSlot::ContainerTouchStart,
        HandlerSlot::ContainerTouchMove,
    ];

    pub fn event_type(self) -> &'static str {
        match self {
            Self::DocumentWheel | Self::ContainerWheel => "wheel",
            Self::DocumentTouchStart | Self::ContainerTouchStart => "touchstart",
            Self::DocumentTouchMove | Self::ContainerTouchMove => "touchmove",
        }
    }

    /// Touch-start only records an anchor and can stay passive.
    pub fn is_passive(self) -> bool {
        matches!(self, Self::DocumentTouchStart | Self::ContainerTouchStart)
    }

    fn index(self) -> usize {
        self as usize
    }
}

/// Fixed record of a modal's scroll handler registrations.
#[derive(Debug)]
pub struct HandlerRecord<B> {
    slots: [Option<B>; 6],
}

impl<B> Default for HandlerRecord<B> {
    fn default() -> Self {
        Self {
            slots: Default::default(),
        }
    }
}

impl<B> HandlerRecord<B> {
    pub fn is_bound(&self, slot: HandlerSlot) -> bool {
        self.slots[slot.index()].is_some()
    }

    pub fn set(&mut self, slot: HandlerSlot, binding: Option<B>) {
        self.slots[slot.index()] = binding;
    }

    pub fn live(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    /// Drops every binding, detaching the listeners.
    pub fn clear(&mut self) -> usize {
        let mut detached = 0;
        for slot in &mut self.slots {
            if slot.take().is_some() {
                detached += 1;
            }
        }
        detached
    }
}

/// Class projection of a modal root's display state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ModalClasses {
    pub opening: bool,
    pub animation_complete: bool,
    pub closing: bool,
}

impl ModalClasses {
    pub const OPENING: &'static str = "opening";
    pub const ANIMATION_COMPLETE: &'static str = "animation-complete";
    pub const CLOSING: &'static str = "closing";

    pub fn entries(self) -> [(&'static str, bool); 3] {
        [
            (Self::OPENING, self.opening),
            (Self::ANIMATION_COMPLETE, self.animation_complete),
            (Self::CLOSING, self.closing),
        ]
    }
}

/// Class projection of one About tab body.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BodyClasses {
    pub visible: bool,
    pub active: bool,
    pub entering: bool,
    pub leaving: bool,
}

impl BodyClasses {
    pub fn entries(self) -> [(&'static str, bool); 4] {
        [
            ("is-visible", self.visible),
            ("is-active", self.active),
            ("is-entering", self.entering),
            ("is-leaving", self.leaving),
        ]
    }
}

/// What a modal shows when it opens.
#[derive(Debug, Clone, Copy)]
pub enum ModalContent<'a> {
    Static,
    CaseStudy {
        id: &'a str,
        record: &'a CaseStudyRecord,
    },
    Image {
        src: &'a str,
        alt: &'a str,
    },
}

pub trait Host {
    type Timer;
    type Frame;
    type Binding;

    // -- scheduling ---------------------------------------------------------

    fn set_timeout(&mut self, delay: Duration, wake: Wake) -> Self::Timer;
    fn request_frame(&mut self, wake: Wake) -> Self::Frame;

    // -- modal surface ------------------------------------------------------

    fn viewport_width(&self) -> f64;
    fn has_modal(&self, kind: ModalKind) -> bool;
    fn set_modal_visible(&mut self, kind: ModalKind, visible: bool);
    fn set_modal_classes(&mut self, kind: ModalKind, classes: ModalClasses);
    /// Forces layout so a re-added animation class replays.
    fn force_reflow(&mut self, kind: ModalKind);
    fn reset_container_scroll(&mut self, kind: ModalKind);
    /// Page scroll stays locked while any modal holds a lock.
    fn lock_page_scroll(&mut self, kind: ModalKind, locked: bool);
    fn bind_scroll_handler(
        &mut self,
        kind: ModalKind,
        slot: HandlerSlot,
        state: &SharedScroll,
    ) -> Option<Self::Binding>;
    fn bind_modal_animation_end(&mut self, kind: ModalKind, ticket: Ticket) -> Option<Self::Binding>;
    fn render_content(&mut self, kind: ModalKind, content: ModalContent<'_>);

    // -- location -----------------------------------------------------------

    /// Current hash without the leading `#`.
    fn location_hash(&self) -> String;
    /// Rewrites the hash without adding a history entry.
    fn replace_hash(&mut self, hash: &str);
    /// Navigates to `hash`, adding a history entry and firing `hashchange`.
    fn assign_hash(&mut self, hash: &str);

    // -- about tabs ---------------------------------------------------------

    fn set_body_classes(&mut self, body: usize, classes: BodyClasses);
    fn bind_tab_animation_end(&mut self, body: usize, step: TabStep, ticket: Ticket) -> Option<Self::Binding>;
    fn mark_tab_selected(&mut self, body: usize);
    /// Positions the nav slider under `active` and sizes the body stack.
    fn layout_tabs(&mut self, active: usize, animate: bool);
}
