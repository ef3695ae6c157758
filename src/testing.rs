//! Deterministic in-memory [`Host`] for unit tests.
//!
//! Timers run on an explicit clock advanced by the test, frames are drained on
//! demand, and every binding is counted while alive so leaks show up as
//! non-zero counts.

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;
use std::time::Duration;

use crate::host::{
    BodyClasses, HandlerSlot, Host, ModalClasses, ModalContent, TabStep, Ticket, Wake,
};
use crate::modal::ModalKind;
use crate::scroll::SharedScroll;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum BindingTag {
    Scroll(ModalKind, HandlerSlot),
    ModalAnimation(ModalKind),
    TabAnimation(usize, TabStep),
}

type Live = Rc<RefCell<BTreeMap<BindingTag, Ticket>>>;

#[derive(Debug)]
struct Scheduled {
    seq: u64,
    due: Duration,
    wake: Wake,
    cancelled: Rc<Cell<bool>>,
}

#[derive(Debug)]
pub struct FakeHandle {
    cancelled: Rc<Cell<bool>>,
}

impl Drop for FakeHandle {
    fn drop(&mut self) {
        self.cancelled.set(true);
    }
}

#[derive(Debug)]
pub struct FakeBinding {
    tag: BindingTag,
    live: Live,
}

impl Drop for FakeBinding {
    fn drop(&mut self) {
        self.live.borrow_mut().remove(&self.tag);
    }
}

#[derive(Debug, Default)]
pub struct FakeHost {
    pub width: f64,
    pub present: BTreeSet<ModalKind>,
    pub visible: BTreeSet<ModalKind>,
    pub hides: BTreeMap<ModalKind, usize>,
    pub classes: BTreeMap<ModalKind, ModalClasses>,
    pub reflows: BTreeMap<ModalKind, usize>,
    pub scroll_resets: BTreeMap<ModalKind, usize>,
    pub page_locks: BTreeSet<ModalKind>,
    pub rendered: Vec<(ModalKind, String)>,
    pub hash: String,
    pub replaced_hashes: Vec<String>,
    pub assigned_hashes: Vec<String>,
    pub bodies: Vec<BodyClasses>,
    pub body_writes: Vec<usize>,
    pub selected_tab: Option<usize>,
    pub layouts: Vec<(usize, bool)>,
    now: Duration,
    seq: u64,
    timers: Vec<Scheduled>,
    frames: Vec<Scheduled>,
    live: Live,
}

impl FakeHost {
    pub fn new(width: f64) -> Self {
        Self {
            width,
            present: ModalKind::ALL.into_iter().collect(),
            ..Self::default()
        }
    }

    pub fn with_tabs(mut self, count: usize) -> Self {
        self.bodies = vec![BodyClasses::default(); count];
        self.body_writes = vec![0; count];
        self
    }

    pub fn without(mut self, kind: ModalKind) -> Self {
        self.present.remove(&kind);
        self
    }

    pub fn now(&self) -> Duration {
        self.now
    }

    fn schedule(&mut self, delay: Duration, wake: Wake, frame: bool) -> FakeHandle {
        self.seq += 1;
        let cancelled = Rc::new(Cell::new(false));
        let entry = Scheduled {
            seq: self.seq,
            due: self.now + delay,
            wake,
            cancelled: Rc::clone(&cancelled),
        };
        if frame {
            self.frames.push(entry);
        } else {
            self.timers.push(entry);
        }
        FakeHandle { cancelled }
    }

    /// Advances the clock and returns the wakes of timers that came due.
    pub fn advance(&mut self, dt: Duration) -> Vec<Wake> {
        self.now += dt;
        let now = self.now;
        let (mut due, rest): (Vec<_>, Vec<_>) = std::mem::take(&mut self.timers)
            .into_iter()
            .filter(|t| !t.cancelled.get())
            .partition(|t| t.due <= now);
        self.timers = rest;
        due.sort_by_key(|t| (t.due, t.seq));
        due.into_iter().map(|t| t.wake).collect()
    }

    pub fn take_frames(&mut self) -> Vec<Wake> {
        std::mem::take(&mut self.frames)
            .into_iter()
            .filter(|f| !f.cancelled.get())
            .map(|f| f.wake)
            .collect()
    }

    pub fn pending_timers(&self) -> usize {
        self.timers.iter().filter(|t| !t.cancelled.get()).count()
    }

    pub fn pending_frames(&self) -> usize {
        self.frames.iter().filter(|t| !t.cancelled.get()).count()
    }

    pub fn scroll_bindings(&self, kind: ModalKind) -> usize {
        self.live
            .borrow()
            .keys()
            .filter(|tag| matches!(tag, BindingTag::Scroll(k, _) if *k == kind))
            .count()
    }

    pub fn live_bindings(&self) -> usize {
        self.live.borrow().len()
    }

    pub fn is_bound(&self, tag: BindingTag) -> bool {
        self.live.borrow().contains_key(&tag)
    }

    /// Builds the wake a live `animationend` binding would deliver.
    pub fn animation_end(&self, tag: BindingTag, animation: &str, on_target: bool) -> Option<Wake> {
        let ticket = *self.live.borrow().get(&tag)?;
        Some(self.animation_wake(tag, ticket, animation, on_target))
    }

    /// Same as [`animation_end`](Self::animation_end) but for a binding that
    /// may already have been dropped (a late-arriving browser event).
    pub fn animation_wake(&self, tag: BindingTag, ticket: Ticket, animation: &str, on_target: bool) -> Wake {
        let animation = animation.to_owned();
        match tag {
            BindingTag::ModalAnimation(kind) => Wake::ModalAnimationEnd {
                kind,
                ticket,
                on_target,
                animation,
            },
            BindingTag::TabAnimation(body, step) => Wake::TabAnimationEnd {
                body,
                step,
                ticket,
                on_target,
                animation,
            },
            BindingTag::Scroll(..) => unreachable!("scroll bindings do not wake"),
        }
    }

    pub fn ticket_of(&self, tag: BindingTag) -> Option<Ticket> {
        self.live.borrow().get(&tag).copied()
    }

    fn bind(&mut self, tag: BindingTag, ticket: Ticket) -> FakeBinding {
        let previous = self.live.borrow_mut().insert(tag, ticket);
        assert!(previous.is_none(), "duplicate binding {tag:?}");
        FakeBinding {
            tag,
            live: Rc::clone(&self.live),
        }
    }
}

impl Host for FakeHost {
    type Timer = FakeHandle;
    type Frame = FakeHandle;
    type Binding = FakeBinding;

    fn set_timeout(&mut self, delay: Duration, wake: Wake) -> FakeHandle {
        self.schedule(delay, wake, false)
    }

    fn request_frame(&mut self, wake: Wake) -> FakeHandle {
        self.schedule(Duration::ZERO, wake, true)
    }

    fn viewport_width(&self) -> f64 {
        self.width
    }

    fn has_modal(&self, kind: ModalKind) -> bool {
        self.present.contains(&kind)
    }

    fn set_modal_visible(&mut self, kind: ModalKind, visible: bool) {
        if visible {
            self.visible.insert(kind);
        } else {
            self.visible.remove(&kind);
            *self.hides.entry(kind).or_default() += 1;
        }
    }

    fn set_modal_classes(&mut self, kind: ModalKind, classes: ModalClasses) {
        self.classes.insert(kind, classes);
    }

    fn force_reflow(&mut self, kind: ModalKind) {
        *self.reflows.entry(kind).or_default() += 1;
    }

    fn reset_container_scroll(&mut self, kind: ModalKind) {
        *self.scroll_resets.entry(kind).or_default() += 1;
    }

    fn lock_page_scroll(&mut self, kind: ModalKind, locked: bool) {
        if locked {
            self.page_locks.insert(kind);
        } else {
            self.page_locks.remove(&kind);
        }
    }

    fn bind_scroll_handler(
        &mut self,
        kind: ModalKind,
        slot: HandlerSlot,
        _state: &SharedScroll,
    ) -> Option<FakeBinding> {
        Some(self.bind(BindingTag::Scroll(kind, slot), Ticket(0)))
    }

    fn bind_modal_animation_end(&mut self, kind: ModalKind, ticket: Ticket) -> Option<FakeBinding> {
        Some(self.bind(BindingTag::ModalAnimation(kind), ticket))
    }

    fn render_content(&mut self, kind: ModalKind, content: ModalContent<'_>) {
        let label = match content {
            ModalContent::Static => String::new(),
            ModalContent::CaseStudy { id, .. } => id.to_owned(),
            ModalContent::Image { src, .. } => src.to_owned(),
        };
        self.rendered.push((kind, label));
    }

    fn location_hash(&self) -> String {
        self.hash.clone()
    }

    fn replace_hash(&mut self, hash: &str) {
        self.hash = hash.to_owned();
        self.replaced_hashes.push(hash.to_owned());
    }

    fn assign_hash(&mut self, hash: &str) {
        self.hash = hash.to_owned();
        self.assigned_hashes.push(hash.to_owned());
    }

    fn set_body_classes(&mut self, body: usize, classes: BodyClasses) {
        if let Some(slot) = self.bodies.get_mut(body) {
            *slot = classes;
            self.body_writes[body] += 1;
        }
    }

    fn bind_tab_animation_end(&mut self, body: usize, step: TabStep, ticket: Ticket) -> Option<FakeBinding> {
        Some(self.bind(BindingTag::TabAnimation(body, step), ticket))
    }

    fn mark_tab_selected(&mut self, body: usize) {
        self.selected_tab = Some(body);
    }

    fn layout_tabs(&mut self, active: usize, animate: bool) {
        self.layouts.push((active, animate));
    }
}
