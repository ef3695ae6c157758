//! Modal lifecycle controller.
//!
//! One [`ModalController`] exists per overlay. It owns the modal's display
//! state, its entrance/teardown timers and its scroll handler record, and it
//! holds the renderer's pause control by reference. CSS classes are only a
//! projection of [`DisplayState`]; tests assert on the state directly.
//!
//! # Ordering
//!
//! - `open` pauses the renderer before anything becomes visible.
//! - `close` resumes the renderer before the closing animation starts.
//! - Teardown runs exactly once per cycle. The guard timer and the entrance
//!   `animationend` binding cancel each other, and a reopen while closing
//!   cancels the pending teardown timer and tears down synchronously first.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use crate::config::{SiteConfig, ViewportClass};
use crate::host::{
    Armed, HandlerRecord, HandlerSlot, Host, ModalClasses, ModalContent, ModalTimer, Ticket,
    TicketSource, Wake,
};
use crate::pause::PauseControl;
use crate::scroll::{ScrollState, SharedScroll};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ModalKind {
    About,
    CaseStudy,
    ImagePopup,
}

impl ModalKind {
    pub const ALL: [ModalKind; 3] = [ModalKind::About, ModalKind::CaseStudy, ModalKind::ImagePopup];

    /// Renderer pause token, stable per kind.
    pub fn pause_token(self) -> &'static str {
        match self {
            Self::About => "aboutModal",
            Self::CaseStudy => "caseStudyModal",
            Self::ImagePopup => "imagePopup",
        }
    }

    pub fn root_id(self) -> &'static str {
        match self {
            Self::About => "about-modal",
            Self::CaseStudy => "case-study-modal",
            Self::ImagePopup => "image-popup-modal",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DisplayState {
    #[default]
    Closed,
    Opening,
    Open,
    Closing,
}

impl DisplayState {
    pub fn is_visible(self) -> bool {
        !matches!(self, Self::Closed)
    }
}

/// When the close animation plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClosePolicy {
    /// Only at or above the breakpoint; mobile tears down immediately.
    DesktopOnly,
    Always,
}

/// How a modal maps onto the URL hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashBinding {
    None,
    Fixed(&'static str),
    /// The case-study id the modal was opened with.
    ContentId,
}

/// Per-kind configuration of the single modal implementation.
#[derive(Debug, Clone, PartialEq)]
pub struct ModalSpec {
    pub kind: ModalKind,
    pub breakpoint: f64,
    pub close_delay: Duration,
    pub close_policy: ClosePolicy,
    /// `None` disables the desktop entrance animation.
    pub entrance_guard: Option<Duration>,
    pub entrance_animation: String,
    pub forwards_scroll: bool,
    pub hash: HashBinding,
}

impl ModalSpec {
    pub fn for_kind(kind: ModalKind, config: &SiteConfig) -> Self {
        let base = Self {
            kind,
            breakpoint: config.breakpoint_px,
            close_delay: config.close_animation(),
            close_policy: ClosePolicy::DesktopOnly,
            entrance_guard: Some(config.entrance_guard()),
            entrance_animation: config.entrance_animation.clone(),
            forwards_scroll: true,
            hash: HashBinding::None,
        };
        match kind {
            ModalKind::About => Self {
                hash: HashBinding::Fixed("about"),
                ..base
            },
            ModalKind::CaseStudy => Self {
                hash: HashBinding::ContentId,
                ..base
            },
            ModalKind::ImagePopup => Self {
                close_delay: config.popup_close(),
                close_policy: ClosePolicy::Always,
                entrance_guard: None,
                forwards_scroll: false,
                ..base
            },
        }
    }

    fn classify(&self, width: f64) -> ViewportClass {
        ViewportClass::classify(width, self.breakpoint)
    }
}

fn is_armed<T>(slot: &Option<Armed<T>>, ticket: Ticket) -> bool {
    slot.as_ref().is_some_and(|armed| armed.ticket == ticket)
}

pub struct ModalController<H: Host> {
    spec: ModalSpec,
    present: bool,
    state: DisplayState,
    classes: ModalClasses,
    pause: Rc<dyn PauseControl>,
    scroll: SharedScroll,
    handlers: HandlerRecord<H::Binding>,
    guard: Option<Armed<H::Timer>>,
    entrance_end: Option<Armed<H::Binding>>,
    teardown: Option<Armed<H::Timer>>,
    hash_key: Option<String>,
    tickets: TicketSource,
}

impl<H: Host> ModalController<H> {
    /// A controller whose root element is absent treats every call as a no-op.
    pub fn new(spec: ModalSpec, pause: Rc<dyn PauseControl>, host: &H) -> Self {
        let present = host.has_modal(spec.kind);
        if !present {
            log::warn!("#{} not found; {:?} modal disabled", spec.kind.root_id(), spec.kind);
        }
        Self {
            spec,
            present,
            state: DisplayState::Closed,
            classes: ModalClasses::default(),
            pause,
            scroll: Rc::new(RefCell::new(ScrollState::default())),
            handlers: HandlerRecord::default(),
            guard: None,
            entrance_end: None,
            teardown: None,
            hash_key: None,
            tickets: TicketSource::default(),
        }
    }

    pub fn kind(&self) -> ModalKind {
        self.spec.kind
    }

    pub fn state(&self) -> DisplayState {
        self.state
    }

    pub fn classes(&self) -> ModalClasses {
        self.classes
    }

    /// Open or opening; a closing modal no longer counts.
    pub fn is_open(&self) -> bool {
        matches!(self.state, DisplayState::Opening | DisplayState::Open)
    }

    /// Hash this modal currently answers to, without `#`.
    pub fn hash_key(&self) -> Option<&str> {
        self.hash_key.as_deref()
    }

    pub fn live_handlers(&self) -> usize {
        self.handlers.live()
    }

    pub fn entrance_pending(&self) -> bool {
        self.guard.is_some()
    }

    pub fn open(&mut self, host: &mut H, content: ModalContent<'_>) {
        if !self.present {
            return;
        }
        let kind = self.spec.kind;
        match self.state {
            DisplayState::Opening | DisplayState::Open => {
                log::debug!("{kind:?} already open");
                return;
            }
            DisplayState::Closing => {
                log::debug!("{kind:?} reopened while closing");
                self.finish_teardown(host);
            }
            DisplayState::Closed => {}
        }

        self.pause.pause(kind.pause_token());
        host.render_content(kind, content);
        self.hash_key = match (self.spec.hash, content) {
            (HashBinding::Fixed(hash), _) => Some(hash.to_owned()),
            (HashBinding::ContentId, ModalContent::CaseStudy { id, .. }) => Some(id.to_owned()),
            _ => None,
        };

        self.state = DisplayState::Opening;
        host.reset_container_scroll(kind);
        host.set_modal_visible(kind, true);
        host.lock_page_scroll(kind, true);

        let viewport = self.spec.classify(host.viewport_width());
        if viewport.is_mobile() && self.spec.forwards_scroll {
            self.attach_forwarding(host);
        }

        match (viewport, self.spec.entrance_guard) {
            (ViewportClass::Desktop, Some(guard)) => {
                self.classes = ModalClasses::default();
                self.project(host);
                host.force_reflow(kind);
                self.classes.opening = true;
                self.project(host);

                let ticket = self.tickets.issue();
                let handle = host.set_timeout(
                    guard,
                    Wake::ModalTimer {
                        kind,
                        timer: ModalTimer::EntranceGuard,
                        ticket,
                    },
                );
                self.guard = Some(Armed { ticket, handle });
                self.entrance_end = host
                    .bind_modal_animation_end(kind, ticket)
                    .map(|handle| Armed { ticket, handle });
            }
            (ViewportClass::Mobile, Some(_)) => {
                // No blur phase on mobile.
                self.classes = ModalClasses {
                    animation_complete: true,
                    ..ModalClasses::default()
                };
                self.project(host);
            }
            (_, None) => {
                self.classes = ModalClasses::default();
                self.project(host);
            }
        }

        self.state = DisplayState::Open;
        log::debug!("{kind:?} open ({viewport:?}, {} handlers)", self.handlers.live());
    }

    pub fn close(&mut self, host: &mut H) {
        if !self.present || matches!(self.state, DisplayState::Closed | DisplayState::Closing) {
            return;
        }
        let kind = self.spec.kind;

        self.pause.resume(kind.pause_token());

        if let Some(key) = self.hash_key.as_deref() {
            if host.location_hash() == key {
                host.replace_hash("");
            }
        }

        self.guard = None;
        self.entrance_end = None;

        let animate = match self.spec.close_policy {
            ClosePolicy::Always => true,
            ClosePolicy::DesktopOnly => !self.spec.classify(host.viewport_width()).is_mobile(),
        };
        if !animate || self.spec.close_delay.is_zero() {
            self.finish_teardown(host);
            return;
        }

        self.state = DisplayState::Closing;
        self.classes.closing = true;
        self.project(host);
        let ticket = self.tickets.issue();
        let handle = host.set_timeout(
            self.spec.close_delay,
            Wake::ModalTimer {
                kind,
                timer: ModalTimer::Teardown,
                ticket,
            },
        );
        self.teardown = Some(Armed { ticket, handle });
        log::debug!("{kind:?} closing");
    }

    /// Re-evaluates scroll forwarding after the viewport crossed the breakpoint.
    pub fn on_viewport_change(&mut self, host: &mut H, viewport: ViewportClass) {
        if !self.spec.forwards_scroll || !self.state.is_visible() {
            return;
        }
        match viewport {
            ViewportClass::Desktop => {
                let detached = self.handlers.clear();
                self.scroll.borrow_mut().forwarder.reset();
                if detached > 0 {
                    log::debug!("{:?} detached {detached} scroll handlers", self.spec.kind);
                }
            }
            ViewportClass::Mobile if self.state == DisplayState::Open => self.attach_forwarding(host),
            ViewportClass::Mobile => {}
        }
    }

    /// Handles a wake addressed to this modal; stale tickets are ignored.
    pub fn on_wake(&mut self, host: &mut H, wake: &Wake) {
        match wake {
            Wake::ModalTimer { kind, timer, ticket } if *kind == self.spec.kind => match timer {
                ModalTimer::EntranceGuard if is_armed(&self.guard, *ticket) => {
                    self.settle_entrance(host);
                }
                ModalTimer::Teardown if is_armed(&self.teardown, *ticket) => {
                    self.finish_teardown(host);
                }
                _ => log::trace!("stale {timer:?} for {kind:?}"),
            },
            Wake::ModalAnimationEnd {
                kind,
                ticket,
                on_target,
                animation,
            } if *kind == self.spec.kind => {
                if *on_target
                    && *animation == self.spec.entrance_animation
                    && is_armed(&self.entrance_end, *ticket)
                {
                    self.settle_entrance(host);
                }
            }
            _ => {}
        }
    }

    fn settle_entrance(&mut self, host: &mut H) {
        self.guard = None;
        self.entrance_end = None;
        if self.classes.opening {
            self.classes.animation_complete = true;
            self.project(host);
        }
    }

    fn finish_teardown(&mut self, host: &mut H) {
        let kind = self.spec.kind;
        self.teardown = None;
        self.guard = None;
        self.entrance_end = None;
        self.classes = ModalClasses::default();
        self.project(host);
        host.set_modal_visible(kind, false);
        host.lock_page_scroll(kind, false);
        let detached = self.handlers.clear();
        self.scroll.borrow_mut().forwarder.reset();
        self.hash_key = None;
        self.state = DisplayState::Closed;
        log::debug!("{kind:?} closed ({detached} scroll handlers detached)");
    }

    fn attach_forwarding(&mut self, host: &mut H) {
        for slot in HandlerSlot::ALL {
            if !self.handlers.is_bound(slot) {
                let binding = host.bind_scroll_handler(self.spec.kind, slot, &self.scroll);
                self.handlers.set(slot, binding);
            }
        }
    }

    fn project(&self, host: &mut H) {
        host.set_modal_classes(self.spec.kind, self.classes);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::CaseStudyCatalog;
    use crate::pause::PauseRegistry;
    use crate::testing::{BindingTag, FakeHost};
    use pretty_assertions::assert_eq;

    const MOBILE: f64 = 400.0;
    const DESKTOP: f64 = 1280.0;

    fn controller(kind: ModalKind, host: &FakeHost) -> (ModalController<FakeHost>, Rc<PauseRegistry>) {
        let registry = PauseRegistry::new();
        let spec = ModalSpec::for_kind(kind, &SiteConfig::default());
        let pause: Rc<dyn PauseControl> = registry.clone();
        (ModalController::new(spec, pause, host), registry)
    }

    fn deliver(host: &mut FakeHost, modal: &mut ModalController<FakeHost>, dt: Duration) {
        for wake in host.advance(dt) {
            modal.on_wake(host, &wake);
        }
    }

    #[test]
    fn double_open_attaches_one_handler_set() {
        let mut host = FakeHost::new(MOBILE);
        let (mut modal, registry) = controller(ModalKind::About, &host);

        modal.open(&mut host, ModalContent::Static);
        modal.open(&mut host, ModalContent::Static);

        assert_eq!(modal.state(), DisplayState::Open);
        assert_eq!(modal.live_handlers(), HandlerSlot::ALL.len());
        assert_eq!(host.scroll_bindings(ModalKind::About), HandlerSlot::ALL.len());
        assert_eq!(registry.held(), vec!["aboutModal".to_owned()]);
        assert_eq!(host.rendered.len(), 1);
    }

    #[test]
    fn desktop_open_never_attaches_forwarding() {
        let mut host = FakeHost::new(DESKTOP);
        let (mut modal, _) = controller(ModalKind::CaseStudy, &host);
        modal.open(&mut host, ModalContent::Static);
        assert_eq!(modal.live_handlers(), 0);
        assert_eq!(host.scroll_bindings(ModalKind::CaseStudy), 0);
    }

    #[test]
    fn double_close_tears_down_once() {
        let mut host = FakeHost::new(DESKTOP);
        let (mut modal, registry) = controller(ModalKind::About, &host);
        modal.open(&mut host, ModalContent::Static);

        modal.close(&mut host);
        modal.close(&mut host);
        assert_eq!(modal.state(), DisplayState::Closing);
        assert!(!registry.is_paused(), "resume happens at close intent");
        assert!(modal.classes().closing);

        deliver(&mut host, &mut modal, Duration::from_millis(599));
        assert_eq!(modal.state(), DisplayState::Closing);
        deliver(&mut host, &mut modal, Duration::from_millis(1));
        assert_eq!(modal.state(), DisplayState::Closed);
        assert_eq!(host.hides.get(&ModalKind::About), Some(&1));
        assert_eq!(host.pending_timers(), 0);

        modal.close(&mut host);
        assert_eq!(host.hides.get(&ModalKind::About), Some(&1));
    }

    #[test]
    fn mobile_close_is_synchronous() {
        let mut host = FakeHost::new(MOBILE);
        let (mut modal, _) = controller(ModalKind::CaseStudy, &host);
        modal.open(&mut host, ModalContent::Static);
        assert!(host.page_locks.contains(&ModalKind::CaseStudy));

        modal.close(&mut host);
        assert_eq!(modal.state(), DisplayState::Closed);
        assert_eq!(host.scroll_bindings(ModalKind::CaseStudy), 0);
        assert!(host.page_locks.is_empty());
        assert!(!host.visible.contains(&ModalKind::CaseStudy));
    }

    #[test]
    fn mobile_entrance_skips_blur_phase() {
        let mut host = FakeHost::new(MOBILE);
        let (mut modal, _) = controller(ModalKind::About, &host);
        modal.open(&mut host, ModalContent::Static);
        assert_eq!(
            host.classes[&ModalKind::About],
            ModalClasses {
                animation_complete: true,
                ..ModalClasses::default()
            }
        );
        assert_eq!(host.pending_timers(), 0);
        assert!(host.reflows.is_empty());
    }

    #[test]
    fn guard_timer_settles_entrance() {
        let mut host = FakeHost::new(DESKTOP);
        let (mut modal, _) = controller(ModalKind::About, &host);
        modal.open(&mut host, ModalContent::Static);
        assert_eq!(host.reflows[&ModalKind::About], 1);
        assert!(modal.classes().opening);
        assert!(!modal.classes().animation_complete);

        deliver(&mut host, &mut modal, Duration::from_millis(1400));
        assert!(modal.classes().animation_complete);
        assert!(!modal.entrance_pending());
        assert!(!host.is_bound(BindingTag::ModalAnimation(ModalKind::About)));
    }

    #[test]
    fn entrance_signal_cancels_guard() {
        let mut host = FakeHost::new(DESKTOP);
        let (mut modal, _) = controller(ModalKind::CaseStudy, &host);
        modal.open(&mut host, ModalContent::Static);

        let tag = BindingTag::ModalAnimation(ModalKind::CaseStudy);
        let unrelated = host.animation_end(tag, "someChildFade", false).unwrap();
        modal.on_wake(&mut host, &unrelated);
        assert!(modal.entrance_pending());

        let wake = host.animation_end(tag, "modalContainerSlideUp", true).unwrap();
        modal.on_wake(&mut host, &wake);
        assert!(modal.classes().animation_complete);
        assert_eq!(host.pending_timers(), 0);
        assert!(!host.is_bound(tag));
    }

    #[test]
    fn close_mid_open_cancels_guard() {
        let mut host = FakeHost::new(DESKTOP);
        let (mut modal, _) = controller(ModalKind::About, &host);
        modal.open(&mut host, ModalContent::Static);
        deliver(&mut host, &mut modal, Duration::from_millis(200));
        modal.close(&mut host);
        // Only the teardown timer remains.
        assert_eq!(host.pending_timers(), 1);
        deliver(&mut host, &mut modal, Duration::from_millis(2000));
        assert_eq!(modal.state(), DisplayState::Closed);
        assert_eq!(modal.classes(), ModalClasses::default());
    }

    #[test]
    fn reopen_mid_close_cancels_teardown_and_replays() {
        let mut host = FakeHost::new(DESKTOP);
        let (mut modal, registry) = controller(ModalKind::About, &host);
        modal.open(&mut host, ModalContent::Static);
        modal.close(&mut host);
        deliver(&mut host, &mut modal, Duration::from_millis(300));

        modal.open(&mut host, ModalContent::Static);
        assert_eq!(modal.state(), DisplayState::Open);
        assert!(registry.is_paused());
        assert_eq!(host.reflows[&ModalKind::About], 2);
        assert!(modal.classes().opening);
        assert!(!modal.classes().closing);
        // Guard is the only timer: the old teardown was cancelled.
        assert_eq!(host.pending_timers(), 1);

        deliver(&mut host, &mut modal, Duration::from_millis(600));
        assert_eq!(modal.state(), DisplayState::Open);
        assert!(host.visible.contains(&ModalKind::About));
    }

    #[test]
    fn every_open_resets_container_scroll() {
        let mut host = FakeHost::new(DESKTOP);
        let (mut modal, _) = controller(ModalKind::About, &host);
        modal.open(&mut host, ModalContent::Static);
        modal.open(&mut host, ModalContent::Static);
        assert_eq!(host.scroll_resets[&ModalKind::About], 1);

        // Reopened while the close animation is still running.
        modal.close(&mut host);
        deliver(&mut host, &mut modal, Duration::from_millis(300));
        modal.open(&mut host, ModalContent::Static);
        assert_eq!(host.scroll_resets[&ModalKind::About], 2);

        modal.close(&mut host);
        deliver(&mut host, &mut modal, Duration::from_millis(600));
        assert_eq!(modal.state(), DisplayState::Closed);
        modal.open(&mut host, ModalContent::Static);
        assert_eq!(host.scroll_resets[&ModalKind::About], 3);
    }

    #[test]
    fn image_popup_animates_close_on_mobile_too() {
        let mut host = FakeHost::new(MOBILE);
        let (mut modal, _) = controller(ModalKind::ImagePopup, &host);
        modal.open(
            &mut host,
            ModalContent::Image {
                src: "a.png",
                alt: "A",
            },
        );
        assert_eq!(modal.live_handlers(), 0);
        modal.close(&mut host);
        assert_eq!(modal.state(), DisplayState::Closing);
        deliver(&mut host, &mut modal, Duration::from_millis(300));
        assert_eq!(modal.state(), DisplayState::Closed);
    }

    #[test]
    fn close_clears_own_hash_only() {
        let mut host = FakeHost::new(MOBILE);
        let catalog = CaseStudyCatalog::builtin("docswell").unwrap();
        let (id, record) = catalog.resolve("rememberly");
        let (mut modal, _) = controller(ModalKind::CaseStudy, &host);

        host.hash = "rememberly".into();
        modal.open(&mut host, ModalContent::CaseStudy { id, record });
        assert_eq!(modal.hash_key(), Some("rememberly"));
        modal.close(&mut host);
        assert_eq!(host.replaced_hashes, vec![String::new()]);
        assert!(host.assigned_hashes.is_empty());

        host.hash = "about".into();
        modal.open(&mut host, ModalContent::CaseStudy { id, record });
        modal.close(&mut host);
        assert_eq!(host.hash, "about");
        assert_eq!(host.replaced_hashes.len(), 1);
    }

    #[test]
    fn missing_root_is_silent() {
        let mut host = FakeHost::new(MOBILE).without(ModalKind::About);
        let (mut modal, registry) = controller(ModalKind::About, &host);
        modal.open(&mut host, ModalContent::Static);
        modal.close(&mut host);
        assert_eq!(modal.state(), DisplayState::Closed);
        assert!(!registry.is_paused());
        assert!(host.rendered.is_empty());
        assert_eq!(host.live_bindings(), 0);
    }

    #[test]
    fn crossing_breakpoint_detaches_and_reattaches() {
        let mut host = FakeHost::new(MOBILE);
        let (mut modal, _) = controller(ModalKind::CaseStudy, &host);
        modal.open(&mut host, ModalContent::Static);
        assert_eq!(host.scroll_bindings(ModalKind::CaseStudy), 6);

        host.width = 1024.0;
        modal.on_viewport_change(&mut host, ViewportClass::Desktop);
        assert_eq!(host.scroll_bindings(ModalKind::CaseStudy), 0);

        host.width = 500.0;
        modal.on_viewport_change(&mut host, ViewportClass::Mobile);
        modal.on_viewport_change(&mut host, ViewportClass::Mobile);
        assert_eq!(host.scroll_bindings(ModalKind::CaseStudy), 6);
    }

    #[test]
    fn stale_teardown_wake_is_ignored() {
        let mut host = FakeHost::new(DESKTOP);
        let (mut modal, _) = controller(ModalKind::About, &host);
        modal.open(&mut host, ModalContent::Static);
        modal.close(&mut host);
        let stale = Wake::ModalTimer {
            kind: ModalKind::About,
            timer: ModalTimer::Teardown,
            ticket: Ticket(999),
        };
        modal.on_wake(&mut host, &stale);
        assert_eq!(modal.state(), DisplayState::Closing);
    }
}
