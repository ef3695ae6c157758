//! [`Host`] over the real DOM.
//!
//! Timers, frames and listeners are gloo handles, so dropping them cancels or
//! detaches exactly like the fake host in the unit tests. Every callback
//! reports back through `dispatch`, which re-enters the site.

use std::collections::BTreeMap;
use std::rc::Rc;
use std::time::Duration;

use gloo::events::{EventListener, EventListenerOptions, EventListenerPhase};
use gloo::render::{request_animation_frame, AnimationFrame};
use gloo::timers::callback::Timeout;
use wasm_bindgen::JsCast;
use web_sys::{
    AnimationEvent, Document, Element, Event, EventTarget, HtmlElement, HtmlImageElement, Node,
    TouchEvent, WheelEvent, Window,
};

use crate::content::{CaseStudyRecord, SectionKind};
use crate::host::{
    BodyClasses, HandlerSlot, Host, ModalClasses, ModalContent, TabStep, Ticket, Wake,
};
use crate::modal::ModalKind;
use crate::pause::{Edge, TokenSet};
use crate::scroll::{Origin, ScrollRegion, SharedScroll};
use crate::site::TabLayout;

pub type Dispatch = Rc<dyn Fn(Wake)>;

/// Selector of the scrollable panel inside each modal root.
fn container_selector(kind: ModalKind) -> &'static str {
    match kind {
        ModalKind::About | ModalKind::CaseStudy => ".case-study-modal-container",
        ModalKind::ImagePopup => ".image-popup-content",
    }
}

/// Close button and backdrop of each modal.
pub fn close_selector(kind: ModalKind) -> &'static str {
    match kind {
        ModalKind::About | ModalKind::CaseStudy => ".case-study-modal-close, .case-study-modal-overlay",
        ModalKind::ImagePopup => ".image-popup-close, .image-popup-overlay",
    }
}

struct ModalDom {
    root: HtmlElement,
    container: Option<HtmlElement>,
}

#[derive(Default)]
struct TabDom {
    nav: Option<HtmlElement>,
    slider: Option<HtmlElement>,
    stack: Option<HtmlElement>,
    bodies: Vec<HtmlElement>,
    /// Nav item for each body, matched on `data-tab`.
    items: Vec<Option<HtmlElement>>,
}

pub struct DomHost {
    window: Window,
    document: Document,
    dispatch: Dispatch,
    modals: BTreeMap<ModalKind, ModalDom>,
    tabs: TabDom,
    page_locks: TokenSet,
}

fn query(scope: &Element, selector: &str) -> Option<HtmlElement> {
    scope
        .query_selector(selector)
        .ok()
        .flatten()
        .and_then(|el| el.dyn_into::<HtmlElement>().ok())
}

fn query_all(scope: &Element, selector: &str) -> Vec<HtmlElement> {
    let Ok(list) = scope.query_selector_all(selector) else {
        return Vec::new();
    };
    (0..list.length())
        .filter_map(|i| list.item(i))
        .filter_map(|node| node.dyn_into::<HtmlElement>().ok())
        .collect()
}

fn set_style(el: &HtmlElement, property: &str, value: &str) {
    if let Err(err) = el.style().set_property(property, value) {
        log::debug!("style {property}={value} rejected: {err:?}");
    }
}

fn apply_classes<const N: usize>(el: &Element, entries: [(&str, bool); N]) {
    let list = el.class_list();
    for (name, on) in entries {
        let _ = list.toggle_with_force(name, on);
    }
}

fn escape_attr(raw: &str) -> String {
    raw.replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn popup_images(urls: &[String], alt: &str) -> String {
    urls.iter()
        .map(|src| {
            let src = escape_attr(src);
            format!(r#"<img src="{src}" alt="{}" data-image-popup="{src}" loading="lazy" />"#, escape_attr(alt))
        })
        .collect()
}

fn first_touch_y(event: &TouchEvent) -> Option<f64> {
    event.touches().get(0).map(|t| f64::from(t.client_y()))
}

fn consume(event: &Event) {
    event.prevent_default();
    event.stop_propagation();
}

fn is_target(event: &Event, el: &HtmlElement) -> bool {
    let el: &EventTarget = el.as_ref();
    event.target().as_ref() == Some(el)
}

/// A modal container seen as a [`ScrollRegion`].
struct Region<'a>(&'a HtmlElement);

impl ScrollRegion for Region<'_> {
    fn scroll_top(&self) -> f64 {
        f64::from(self.0.scroll_top())
    }

    fn scroll_height(&self) -> f64 {
        f64::from(self.0.scroll_height())
    }

    fn client_height(&self) -> f64 {
        f64::from(self.0.client_height())
    }

    fn set_scroll_top(&mut self, top: f64) {
        self.0.set_scroll_top(top.round() as i32);
    }
}

fn origin_of(event: &Event, container: &HtmlElement) -> Origin {
    let node = event.target().and_then(|t| t.dyn_into::<Node>().ok());
    if container.contains(node.as_ref()) {
        Origin::Inside
    } else {
        Origin::Outside
    }
}

fn scroll_callback(
    slot: HandlerSlot,
    container: HtmlElement,
    state: SharedScroll,
) -> Box<dyn FnMut(&Event)> {
    Box::new(move |event: &Event| {
        let Ok(mut state) = state.try_borrow_mut() else {
            return;
        };
        let mut region = Region(&container);
        let disposition = match slot {
            HandlerSlot::DocumentWheel => {
                let Some(wheel) = event.dyn_ref::<WheelEvent>() else {
                    return;
                };
                let origin = origin_of(event, &container);
                state.forwarder.wheel(origin, wheel.delta_y(), &mut region)
            }
            HandlerSlot::DocumentTouchStart => {
                let Some(touch) = event.dyn_ref::<TouchEvent>() else {
                    return;
                };
                if let Some(y) = first_touch_y(touch) {
                    state.forwarder.touch_start(touch.touches().length(), y, &region);
                }
                return;
            }
            HandlerSlot::DocumentTouchMove => {
                let Some(touch) = event.dyn_ref::<TouchEvent>() else {
                    return;
                };
                let Some(y) = first_touch_y(touch) else {
                    return;
                };
                let origin = origin_of(event, &container);
                state
                    .forwarder
                    .touch_move(origin, touch.touches().length(), y, &mut region)
            }
            HandlerSlot::ContainerWheel => {
                let Some(wheel) = event.dyn_ref::<WheelEvent>() else {
                    return;
                };
                state.guard.wheel(wheel.delta_y(), region.metrics())
            }
            HandlerSlot::ContainerTouchStart => {
                if let Some(y) = event.dyn_ref::<TouchEvent>().and_then(first_touch_y) {
                    state.guard.touch_start(y);
                }
                return;
            }
            HandlerSlot::ContainerTouchMove => {
                let Some(y) = event.dyn_ref::<TouchEvent>().and_then(first_touch_y) else {
                    return;
                };
                state.guard.touch_move(y, region.metrics())
            }
        };
        if disposition.is_consumed() {
            consume(event);
        }
    })
}

impl DomHost {
    pub fn new(window: Window, document: Document, dispatch: Dispatch) -> Self {
        let mut modals = BTreeMap::new();
        for kind in ModalKind::ALL {
            let Some(root) = document
                .get_element_by_id(kind.root_id())
                .and_then(|el| el.dyn_into::<HtmlElement>().ok())
            else {
                continue;
            };
            let container = query(&root, container_selector(kind));
            modals.insert(kind, ModalDom { root, container });
        }

        let tabs = modals
            .get(&ModalKind::About)
            .map(|about| TabDom::scan(&about.root))
            .unwrap_or_default();

        Self {
            window,
            document,
            dispatch,
            modals,
            tabs,
            page_locks: TokenSet::default(),
        }
    }

    /// Tab keys in markup order and the one already marked active.
    pub fn tab_layout(&self) -> TabLayout {
        TabLayout {
            keys: self
                .tabs
                .bodies
                .iter()
                .map(|body| body.get_attribute("data-tab").unwrap_or_default())
                .collect(),
            initially_active: self
                .tabs
                .bodies
                .iter()
                .position(|body| body.class_list().contains("is-active")),
        }
    }

    fn root(&self, kind: ModalKind) -> Option<&HtmlElement> {
        self.modals.get(&kind).map(|m| &m.root)
    }

    fn container(&self, kind: ModalKind) -> Option<&HtmlElement> {
        self.modals.get(&kind).and_then(|m| m.container.as_ref())
    }

    fn by_id(&self, id: &str) -> Option<HtmlElement> {
        self.document
            .get_element_by_id(id)
            .and_then(|el| el.dyn_into::<HtmlElement>().ok())
    }

    fn set_html(&self, id: &str, html: &str) {
        if let Some(el) = self.by_id(id) {
            el.set_inner_html(html);
        }
    }

    fn set_text(&self, id: &str, text: &str) {
        if let Some(el) = self.by_id(id) {
            el.set_text_content(Some(text));
        }
    }

    fn show(&self, id: &str, display: Option<&str>) {
        if let Some(el) = self.by_id(id) {
            set_style(&el, "display", display.unwrap_or("none"));
        }
    }

    /// Sets `html` into `id`, hiding the element when there is nothing to show.
    fn fill(&self, id: &str, html: Option<&str>, display: &str) {
        match html.filter(|h| !h.is_empty()) {
            Some(html) => {
                self.set_html(id, html);
                self.show(id, Some(display));
            }
            None => {
                self.set_html(id, "");
                self.show(id, None);
            }
        }
    }

    fn render_case_study(&self, record: &CaseStudyRecord) {
        let logo = record
            .logo
            .as_deref()
            .map(|src| {
                format!(
                    r#"<img src="{}" alt="{} logo" />"#,
                    escape_attr(src),
                    escape_attr(&record.company)
                )
            })
            .unwrap_or_default();
        self.fill("case-study-logo", Some(logo.as_str()), "block");
        self.set_text("case-study-company-name", &record.company);
        self.set_text("case-study-role", &record.role);
        self.set_text("case-study-title", &record.title);
        self.set_text("case-study-subheading", record.subheading.as_deref().unwrap_or(""));

        let featured = record
            .featured_image
            .as_ref()
            .map(|src| popup_images(std::slice::from_ref(src), &format!("{} featured image", record.company)))
            .unwrap_or_default();
        self.set_html("case-study-featured-image", &featured);
        self.set_html("case-study-background-text", record.background.as_deref().unwrap_or(""));
        self.set_html("case-study-role-text", record.role_text.as_deref().unwrap_or(""));

        match record.outcome.as_deref().filter(|o| !o.is_empty()) {
            Some(outcome) => {
                self.set_html("case-study-outcome-text", outcome);
                self.show("case-study-outcome-section", Some("flex"));
            }
            None => self.show("case-study-outcome-section", None),
        }

        for kind in SectionKind::ALL {
            let stem = kind.id_stem();
            let section = record.section(kind);
            let heading_display = (!record.hide_section_headings && section.is_some()).then_some("");
            self.show(&format!("{stem}-heading"), heading_display);

            let Some(section) = section else {
                self.show(&format!("{stem}-section"), None);
                continue;
            };
            self.show(&format!("{stem}-section"), Some("flex"));
            self.fill(&format!("{stem}-text"), section.text.as_deref(), "");
            let images = popup_images(&section.images, &record.company);
            self.fill(&format!("{stem}-images"), Some(images.as_str()), "");
            self.fill(&format!("{stem}-text-after"), section.text_after.as_deref(), "block");
            let after = popup_images(&section.images_after, &record.company);
            self.fill(&format!("{stem}-images-after"), Some(after.as_str()), "block");
        }

        self.fill("case-study-description", record.description.as_deref(), "block");
    }

    fn animation_listener(&self, el: &HtmlElement, wake: impl Fn(bool, String) -> Wake + 'static) -> EventListener {
        let dispatch = Rc::clone(&self.dispatch);
        let target = el.clone();
        EventListener::new(el, "animationend", move |event| {
            let Some(animation) = event.dyn_ref::<AnimationEvent>() else {
                return;
            };
            dispatch(wake(is_target(event, &target), animation.animation_name()));
        })
    }
}

impl TabDom {
    fn scan(about: &HtmlElement) -> Self {
        let bodies = query_all(about, ".about-modal-body[data-tab]");
        let nav = query(about, ".about-modal-nav");
        let nav_items = nav
            .as_ref()
            .map(|nav| query_all(nav, ".about-modal-nav-item"))
            .unwrap_or_default();
        let items = bodies
            .iter()
            .map(|body| {
                let key = body.get_attribute("data-tab");
                nav_items
                    .iter()
                    .find(|item| item.get_attribute("data-tab") == key)
                    .cloned()
            })
            .collect();
        Self {
            slider: nav.as_ref().and_then(|nav| query(nav, ".about-nav-slider")),
            stack: query(about, ".about-modal-body-stack"),
            nav,
            bodies,
            items,
        }
    }
}

pub fn millis(delay: Duration) -> u32 {
    u32::try_from(delay.as_millis()).unwrap_or(u32::MAX)
}

impl Host for DomHost {
    type Timer = Timeout;
    type Frame = AnimationFrame;
    type Binding = EventListener;

    fn set_timeout(&mut self, delay: Duration, wake: Wake) -> Timeout {
        let dispatch = Rc::clone(&self.dispatch);
        Timeout::new(millis(delay), move || dispatch(wake))
    }

    fn request_frame(&mut self, wake: Wake) -> AnimationFrame {
        let dispatch = Rc::clone(&self.dispatch);
        request_animation_frame(move |_| dispatch(wake))
    }

    fn viewport_width(&self) -> f64 {
        self.window
            .inner_width()
            .ok()
            .and_then(|w| w.as_f64())
            .or_else(|| {
                self.document
                    .document_element()
                    .map(|el| f64::from(el.client_width()))
            })
            .unwrap_or(0.0)
    }

    fn has_modal(&self, kind: ModalKind) -> bool {
        self.modals.contains_key(&kind)
    }

    fn set_modal_visible(&mut self, kind: ModalKind, visible: bool) {
        if let Some(root) = self.root(kind) {
            set_style(root, "display", if visible { "flex" } else { "none" });
        }
    }

    fn set_modal_classes(&mut self, kind: ModalKind, classes: ModalClasses) {
        if let Some(root) = self.root(kind) {
            apply_classes(root, classes.entries());
        }
    }

    fn force_reflow(&mut self, kind: ModalKind) {
        if let Some(root) = self.root(kind) {
            let _ = root.offset_width();
        }
    }

    fn reset_container_scroll(&mut self, kind: ModalKind) {
        if let Some(container) = self.container(kind) {
            container.set_scroll_top(0);
        }
    }

    fn lock_page_scroll(&mut self, kind: ModalKind, locked: bool) {
        let token = kind.pause_token();
        let edge = if locked {
            self.page_locks.insert(token)
        } else {
            self.page_locks.remove(token)
        };
        let overflow = match edge {
            Edge::Paused => "hidden",
            Edge::Resumed => "auto",
            Edge::Unchanged => return,
        };
        if let Some(body) = self.document.body() {
            set_style(&body, "overflow", overflow);
        }
        if let Some(html) = self
            .document
            .document_element()
            .and_then(|el| el.dyn_into::<HtmlElement>().ok())
        {
            set_style(&html, "overflow", overflow);
        }
    }

    fn bind_scroll_handler(
        &mut self,
        kind: ModalKind,
        slot: HandlerSlot,
        state: &SharedScroll,
    ) -> Option<EventListener> {
        let container = self.container(kind)?.clone();
        let target: EventTarget = match slot {
            HandlerSlot::DocumentWheel | HandlerSlot::DocumentTouchStart | HandlerSlot::DocumentTouchMove => {
                self.document.clone().into()
            }
            _ => container.clone().into(),
        };
        let options = EventListenerOptions {
            phase: EventListenerPhase::Bubble,
            passive: slot.is_passive(),
        };
        Some(EventListener::new_with_options(
            &target,
            slot.event_type(),
            options,
            scroll_callback(slot, container, Rc::clone(state)),
        ))
    }

    fn bind_modal_animation_end(&mut self, kind: ModalKind, ticket: Ticket) -> Option<EventListener> {
        // The entrance animation runs on the container; fall back to the root.
        let el = self.container(kind).or_else(|| self.root(kind))?.clone();
        Some(self.animation_listener(&el, move |on_target, animation| Wake::ModalAnimationEnd {
            kind,
            ticket,
            on_target,
            animation,
        }))
    }

    fn render_content(&mut self, kind: ModalKind, content: ModalContent<'_>) {
        match content {
            ModalContent::Static => {}
            ModalContent::CaseStudy { id, record } => {
                log::debug!("rendering case study `{id}`");
                self.render_case_study(record);
            }
            ModalContent::Image { src, alt } => {
                match self
                    .by_id("popup-image")
                    .and_then(|el| el.dyn_into::<HtmlImageElement>().ok())
                {
                    Some(img) => {
                        img.set_src(src);
                        img.set_alt(alt);
                    }
                    None => log::warn!("#popup-image missing; {kind:?} shows nothing"),
                }
            }
        }
    }

    fn location_hash(&self) -> String {
        let hash = self.window.location().hash().unwrap_or_default();
        hash.strip_prefix('#').map(str::to_owned).unwrap_or(hash)
    }

    fn replace_hash(&mut self, hash: &str) {
        let location = self.window.location();
        let mut url = format!(
            "{}{}",
            location.pathname().unwrap_or_default(),
            location.search().unwrap_or_default()
        );
        if !hash.is_empty() {
            url.push('#');
            url.push_str(hash);
        }
        let replaced = self
            .window
            .history()
            .and_then(|history| history.replace_state_with_url(&wasm_bindgen::JsValue::NULL, "", Some(&url)));
        if let Err(err) = replaced {
            log::warn!("history.replaceState failed: {err:?}");
        }
    }

    fn assign_hash(&mut self, hash: &str) {
        if let Err(err) = self.window.location().set_hash(hash) {
            log::warn!("setting hash `{hash}` failed: {err:?}");
        }
    }

    fn set_body_classes(&mut self, body: usize, classes: BodyClasses) {
        if let Some(el) = self.tabs.bodies.get(body) {
            apply_classes(el, classes.entries());
        }
    }

    fn bind_tab_animation_end(&mut self, body: usize, step: TabStep, ticket: Ticket) -> Option<EventListener> {
        let el = self.tabs.bodies.get(body)?.clone();
        Some(self.animation_listener(&el, move |on_target, animation| Wake::TabAnimationEnd {
            body,
            step,
            ticket,
            on_target,
            animation,
        }))
    }

    fn mark_tab_selected(&mut self, body: usize) {
        for (i, item) in self.tabs.items.iter().enumerate() {
            let Some(item) = item else { continue };
            let selected = i == body;
            let _ = item.class_list().toggle_with_force("is-active", selected);
            let _ = if selected {
                item.set_attribute("aria-current", "page")
            } else {
                item.remove_attribute("aria-current")
            };
        }
    }

    fn layout_tabs(&mut self, active: usize, animate: bool) {
        let tabs = &self.tabs;
        if let (Some(nav), Some(slider), Some(Some(item))) = (&tabs.nav, &tabs.slider, tabs.items.get(active)) {
            let nav_rect = nav.get_bounding_client_rect();
            let item_rect = item.get_bounding_client_rect();
            // 4px matches the nav's inner padding.
            let offset = item_rect.left() - nav_rect.left() + f64::from(nav.scroll_left()) - 4.0;
            if !animate {
                set_style(slider, "transition", "none");
            }
            set_style(slider, "width", &format!("{}px", item_rect.width()));
            set_style(slider, "transform", &format!("translateX({offset}px)"));
            if !animate {
                let _ = slider.offset_width();
                let _ = slider.style().remove_property("transition");
            }
        }
        if let (Some(stack), Some(body)) = (&tabs.stack, tabs.bodies.get(active)) {
            set_style(stack, "height", &format!("{}px", body.scroll_height()));
        }
    }
}
