//! Animated tab bodies inside the About modal.
//!
//! Switching tabs runs an enter transition on the new body and an exit
//! transition on the previous one at the same time. Each body owns at most
//! one pending frame, one `animationend` binding and one fallback timer per
//! step; starting a new transition on a body cancels whatever it had in
//! flight, so a fast double-switch cannot leave competing cleanups behind.

use std::time::Duration;

use crate::config::SiteConfig;
use crate::host::{Armed, BodyClasses, Host, TabStep, Ticket, TicketSource, Wake};

struct Pending<H: Host> {
    frame: Option<Armed<H::Frame>>,
    binding: Option<Armed<H::Binding>>,
    fallback: Option<Armed<H::Timer>>,
}

impl<H: Host> Default for Pending<H> {
    fn default() -> Self {
        Self {
            frame: None,
            binding: None,
            fallback: None,
        }
    }
}

impl<H: Host> Pending<H> {
    fn clear(&mut self) {
        self.frame = None;
        self.binding = None;
        self.fallback = None;
    }
}

struct TabBody<H: Host> {
    key: String,
    classes: BodyClasses,
    enter: Pending<H>,
    exit: Pending<H>,
}

impl<H: Host> TabBody<H> {
    fn pending(&mut self, step: TabStep) -> &mut Pending<H> {
        match step {
            TabStep::Enter => &mut self.enter,
            TabStep::Exit => &mut self.exit,
        }
    }
}

/// Names of the CSS animations that complete each step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TabAnimations {
    pub enter: String,
    pub exit: String,
    pub exit_fallback: Duration,
}

impl TabAnimations {
    pub fn from_config(config: &SiteConfig) -> Self {
        Self {
            enter: config.tab_enter_animation.clone(),
            exit: config.tab_exit_animation.clone(),
            exit_fallback: config.tab_exit_fallback(),
        }
    }

    fn name(&self, step: TabStep) -> &str {
        match step {
            TabStep::Enter => &self.enter,
            TabStep::Exit => &self.exit,
        }
    }
}

pub struct TabPanel<H: Host> {
    bodies: Vec<TabBody<H>>,
    active: Option<usize>,
    previous: Option<usize>,
    animations: TabAnimations,
    layout: Option<Armed<H::Frame>>,
    tickets: TicketSource,
}

impl<H: Host> TabPanel<H> {
    /// `initially_active` is the body already marked `is-active` in the
    /// markup; when none is, the first body is activated without animation.
    pub fn new(keys: Vec<String>, initially_active: Option<usize>, animations: TabAnimations, host: &mut H) -> Self {
        let mut bodies: Vec<TabBody<H>> = keys
            .into_iter()
            .map(|key| TabBody {
                key,
                classes: BodyClasses::default(),
                enter: Pending::default(),
                exit: Pending::default(),
            })
            .collect();
        let active = initially_active
            .filter(|&i| i < bodies.len())
            .or_else(|| (!bodies.is_empty()).then_some(0));
        if let Some(i) = active {
            bodies[i].classes = BodyClasses {
                visible: true,
                active: true,
                ..BodyClasses::default()
            };
            host.set_body_classes(i, bodies[i].classes);
            host.mark_tab_selected(i);
        }
        Self {
            bodies,
            active,
            previous: None,
            animations,
            layout: None,
            tickets: TicketSource::default(),
        }
    }

    pub fn active_key(&self) -> Option<&str> {
        self.active.map(|i| self.bodies[i].key.as_str())
    }

    pub fn previous_key(&self) -> Option<&str> {
        self.previous.map(|i| self.bodies[i].key.as_str())
    }

    pub fn position(&self, key: &str) -> Option<usize> {
        self.bodies.iter().position(|b| b.key == key)
    }

    pub fn classes(&self, key: &str) -> Option<BodyClasses> {
        self.position(key).map(|i| self.bodies[i].classes)
    }

    pub fn len(&self) -> usize {
        self.bodies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bodies.is_empty()
    }

    /// Switches to `key`. No-op when it is already active or unknown.
    pub fn switch_body(&mut self, host: &mut H, key: &str) {
        let Some(next) = self.position(key) else {
            log::debug!("no tab body `{key}`");
            return;
        };
        if self.active == Some(next) {
            return;
        }
        let previous = self.active.replace(next);
        self.previous = previous;
        host.mark_tab_selected(next);
        host.layout_tabs(next, true);
        log::debug!("tab {:?} -> {key}", self.previous_key());
        self.activate(host, next);
        if let Some(prev) = previous {
            self.deactivate(host, prev);
        }
    }

    /// Measures the tab layout on the next frame; used when the modal opens.
    pub fn schedule_layout(&mut self, host: &mut H) {
        if self.bodies.is_empty() {
            return;
        }
        let ticket = self.tickets.issue();
        let handle = host.request_frame(Wake::TabLayout { ticket });
        self.layout = Some(Armed { ticket, handle });
    }

    /// Re-measures immediately, without slider animation.
    pub fn relayout(&self, host: &mut H) {
        if let Some(active) = self.active {
            host.layout_tabs(active, false);
        }
    }

    pub fn on_wake(&mut self, host: &mut H, wake: &Wake) {
        match wake {
            Wake::TabLayout { ticket } => {
                if self.layout.as_ref().is_some_and(|a| a.ticket == *ticket) {
                    self.layout = None;
                    self.relayout(host);
                }
            }
            Wake::TabFrame { body, step, ticket } => {
                if !self.is_pending(*body, *step, *ticket, |p| p.frame.as_ref().map(|a| a.ticket)) {
                    return;
                }
                self.bodies[*body].pending(*step).frame = None;
                match step {
                    TabStep::Enter => self.enter_frame(host, *body),
                    TabStep::Exit => self.exit_frame(host, *body),
                }
            }
            Wake::TabFallback { body, ticket } => {
                if self.is_pending(*body, TabStep::Exit, *ticket, |p| {
                    p.fallback.as_ref().map(|a| a.ticket)
                }) {
                    log::debug!("tab exit fallback fired for body {body}");
                    self.finalize_exit(host, *body);
                }
            }
            Wake::TabAnimationEnd {
                body,
                step,
                ticket,
                on_target,
                animation,
            } => {
                // Descendant animations bubble; only the body's own count.
                if !*on_target || animation != self.animations.name(*step) {
                    return;
                }
                if !self.is_pending(*body, *step, *ticket, |p| p.binding.as_ref().map(|a| a.ticket)) {
                    return;
                }
                match step {
                    TabStep::Enter => {
                        let b = &mut self.bodies[*body];
                        b.enter.clear();
                        b.classes.entering = false;
                        host.set_body_classes(*body, b.classes);
                    }
                    TabStep::Exit => self.finalize_exit(host, *body),
                }
            }
            _ => {}
        }
    }

    fn is_pending(
        &mut self,
        body: usize,
        step: TabStep,
        ticket: Ticket,
        pick: impl Fn(&Pending<H>) -> Option<Ticket>,
    ) -> bool {
        self.bodies
            .get_mut(body)
            .is_some_and(|b| pick(b.pending(step)) == Some(ticket))
    }

    fn activate(&mut self, host: &mut H, i: usize) {
        let ticket = self.tickets.issue();
        let b = &mut self.bodies[i];
        b.exit.clear();
        b.enter.clear();
        b.classes.leaving = false;
        b.classes.visible = true;
        host.set_body_classes(i, b.classes);
        let handle = host.request_frame(Wake::TabFrame {
            body: i,
            step: TabStep::Enter,
            ticket,
        });
        b.enter.frame = Some(Armed { ticket, handle });
    }

    fn enter_frame(&mut self, host: &mut H, i: usize) {
        let ticket = self.tickets.issue();
        let b = &mut self.bodies[i];
        b.classes.active = true;
        b.classes.entering = true;
        host.set_body_classes(i, b.classes);
        b.enter.binding = host
            .bind_tab_animation_end(i, TabStep::Enter, ticket)
            .map(|handle| Armed { ticket, handle });
        host.layout_tabs(i, true);
    }

    fn deactivate(&mut self, host: &mut H, i: usize) {
        let ticket = self.tickets.issue();
        let fallback = self.animations.exit_fallback;
        let b = &mut self.bodies[i];
        b.enter.clear();
        if !b.classes.active {
            // Never finished entering; nothing to animate out.
            b.classes.visible = false;
            b.classes.entering = false;
            host.set_body_classes(i, b.classes);
            return;
        }
        b.exit.clear();
        b.classes.entering = false;
        b.classes.leaving = true;
        host.set_body_classes(i, b.classes);

        b.exit.binding = host
            .bind_tab_animation_end(i, TabStep::Exit, ticket)
            .map(|handle| Armed { ticket, handle });
        b.exit.fallback = Some(Armed {
            ticket,
            handle: host.set_timeout(fallback, Wake::TabFallback { body: i, ticket }),
        });
        b.exit.frame = Some(Armed {
            ticket,
            handle: host.request_frame(Wake::TabFrame {
                body: i,
                step: TabStep::Exit,
                ticket,
            }),
        });
    }

    fn exit_frame(&mut self, host: &mut H, i: usize) {
        let b = &mut self.bodies[i];
        b.classes.active = false;
        host.set_body_classes(i, b.classes);
    }

    /// Completes an exit; idempotent because every caller first checks the
    /// pending ticket, which this clears.
    fn finalize_exit(&mut self, host: &mut H, i: usize) {
        let b = &mut self.bodies[i];
        b.exit.clear();
        b.classes.leaving = false;
        b.classes.visible = false;
        b.classes.active = false;
        host.set_body_classes(i, b.classes);
    }
}
