#![cfg_attr(target_arch = "wasm32", allow(dead_code))]

//! Modal lifecycle, scroll forwarding and hash routing for the portfolio
//! site, plus the WebGL sky behind it.
//!
//! Everything outside `wasm` is plain Rust driven through [`host::Host`] and
//! is unit-tested on the host target.

pub mod config;
pub mod content;
pub mod error;
pub mod host;
pub mod modal;
pub mod panel;
pub mod pause;
pub mod router;
pub mod scroll;
pub mod site;
pub mod sky;

#[cfg(test)]
mod testing;

// Only compile wasm-specific code when targeting wasm32.

#[cfg(target_arch = "wasm32")]
mod wasm {
    use std::cell::RefCell;
    use std::rc::{Rc, Weak};
    use std::time::Duration;

    use gloo::events::EventListener;
    use gloo::timers::callback::Timeout;
    use wasm_bindgen::prelude::*;
    use web_sys::{Document, Element, Event, KeyboardEvent, Window};

    use crate::config::SiteConfig;
    use crate::content::CaseStudyCatalog;
    use crate::error::SiteError;
    use crate::host::Wake;
    use crate::modal::ModalKind;
    use crate::pause::{PauseControl, PauseRegistry};
    use crate::router::Route;
    use crate::site::Site;

    mod dom;
    mod render;
    #[cfg(test)]
    mod tests;

    use dom::{close_selector, millis, Dispatch, DomHost};

    type SharedSite = Rc<RefCell<Site<DomHost>>>;

    /// Runs `f` against the site unless it is already borrowed further up
    /// the stack, which would mean a callback fired synchronously inside
    /// another one.
    fn with_site(site: &Weak<RefCell<Site<DomHost>>>, f: impl FnOnce(&mut Site<DomHost>)) {
        let Some(site) = site.upgrade() else {
            return;
        };
        match site.try_borrow_mut() {
            Ok(mut site) => f(&mut site),
            Err(_) => log::warn!("re-entrant site callback dropped"),
        }
    }

    fn read_config(document: &Document) -> Result<SiteConfig, SiteError> {
        match document.get_element_by_id("site-config").and_then(|el| el.text_content()) {
            Some(raw) if !raw.trim().is_empty() => SiteConfig::from_json(&raw),
            _ => Ok(SiteConfig::default()),
        }
    }

    fn sky_canvas(document: &Document) -> Result<web_sys::HtmlCanvasElement, SiteError> {
        document
            .get_element_by_id("skyCanvas")
            .and_then(|el| el.dyn_into::<web_sys::HtmlCanvasElement>().ok())
            .ok_or_else(|| SiteError::MissingElement("#skyCanvas".into()))
    }

    fn handle_click(site: &mut Site<DomHost>, target: &Element, event: &Event) {
        let closest = |selector: &str| target.closest(selector).ok().flatten();

        if let Some(image) = closest("[data-image-popup]") {
            let src = image.get_attribute("data-image-popup").unwrap_or_default();
            let alt = image.get_attribute("alt").unwrap_or_default();
            site.open_image(&src, &alt);
            return;
        }
        if let Some(key) = closest(".about-modal-nav-item[data-tab]").and_then(|el| el.get_attribute("data-tab")) {
            site.select_tab(&key);
            return;
        }
        for kind in ModalKind::ALL {
            let root = format!("#{}", kind.root_id());
            if closest(close_selector(kind)).is_some() && closest(&root).is_some() {
                event.prevent_default();
                event.stop_propagation();
                site.close(kind);
                return;
            }
        }
        if let Some(id) = closest(".case-card[data-case-study]").and_then(|el| el.get_attribute("data-case-study")) {
            // Cards are links too; the hash is set through the router instead.
            event.prevent_default();
            let route = Route::CaseStudy(site.catalog().resolve(&id).0.to_owned());
            site.navigate(&route);
            return;
        }
        if closest(r##"a[href="#about"]"##).is_some() {
            event.prevent_default();
            site.navigate(&Route::About);
        }
    }

    /// Builds the site over the live document. Wakes re-enter it through a
    /// weak handle, so dropping the returned `Rc` cancels everything.
    fn build_site(
        window: &Window,
        document: &Document,
        config: SiteConfig,
        catalog: CaseStudyCatalog,
        pause: Rc<dyn PauseControl>,
    ) -> SharedSite {
        Rc::new_cyclic(|weak: &Weak<RefCell<Site<DomHost>>>| {
            let weak = weak.clone();
            let dispatch: Dispatch = Rc::new(move |wake: Wake| with_site(&weak, |site| site.wake(wake)));
            let host = DomHost::new(window.clone(), document.clone(), dispatch);
            let tabs = host.tab_layout();
            RefCell::new(Site::new(host, config, catalog, pause, tabs))
        })
    }

    fn listen(window: &Window, document: &Document, site: &SharedSite, debounce: Duration) {
        let weak = Rc::downgrade(site);
        EventListener::new(window, "hashchange", move |_| with_site(&weak, |site| site.on_hash_change())).forget();

        let weak = Rc::downgrade(site);
        EventListener::new(document, "keydown", move |event| {
            if event.dyn_ref::<KeyboardEvent>().is_some_and(|key| key.key() == "Escape") {
                with_site(&weak, |site| {
                    site.on_escape();
                });
            }
        })
        .forget();

        let weak = Rc::downgrade(site);
        let debounce_ms = millis(debounce);
        let mut pending: Option<Timeout> = None;
        EventListener::new(window, "resize", move |_| {
            let weak = weak.clone();
            // Replacing the timeout cancels the previous one.
            pending = Some(Timeout::new(debounce_ms, move || {
                with_site(&weak, |site| site.on_resize())
            }));
        })
        .forget();

        let weak = Rc::downgrade(site);
        EventListener::new(document, "click", move |event| {
            let Some(target) = event.target().and_then(|t| t.dyn_into::<Element>().ok()) else {
                return;
            };
            with_site(&weak, |site| handle_click(site, &target, event));
        })
        .forget();
    }

    #[wasm_bindgen(start)]
    pub fn main() -> Result<(), JsValue> {
        console_error_panic_hook::set_once();
        let window = web_sys::window().ok_or("no window")?;
        let document = window.document().ok_or("no document")?;

        let config = read_config(&document);
        let level = config.as_ref().map(SiteConfig::level).unwrap_or(log::Level::Info);
        // Fails only if a logger is already installed.
        let _ = console_log::init_with_level(level);
        let config = config.unwrap_or_else(|err| {
            log::warn!("#site-config ignored: {err}");
            SiteConfig::default()
        });

        let catalog = CaseStudyCatalog::for_config(&config)?;
        let registry = PauseRegistry::new();

        if let Err(err) = sky_canvas(&document).and_then(|canvas| render::start(&window, canvas, &config.sky, &registry)) {
            log::warn!("sky disabled: {err}");
        }

        let debounce = config.resize_debounce();
        let pause: Rc<dyn PauseControl> = registry;
        let site = build_site(&window, &document, config, catalog, pause);

        listen(&window, &document, &site, debounce);
        site.borrow_mut().boot();
        log::info!("portfolio booted");

        // Listeners only hold weak references.
        std::mem::forget(site);
        Ok(())
    }
}

// When compiling for non-wasm targets (e.g., `cargo test` on host),
// provide an empty stub so the crate still builds.
#[cfg(not(target_arch = "wasm32"))]
pub fn main() {}
