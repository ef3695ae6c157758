//! Owns the host and every controller, and routes input to them.

use std::rc::Rc;

use crate::config::{SiteConfig, ViewportClass};
use crate::content::CaseStudyCatalog;
use crate::host::{Host, ModalContent, Wake};
use crate::modal::{ModalController, ModalKind, ModalSpec};
use crate::panel::{TabAnimations, TabPanel};
use crate::pause::PauseControl;
use crate::router::{HashRouter, Route};

/// Escape closes the topmost modal first.
const ESCAPE_ORDER: [ModalKind; 3] = [ModalKind::ImagePopup, ModalKind::CaseStudy, ModalKind::About];

/// About tab bodies as found in the markup.
#[derive(Debug, Clone, Default)]
pub struct TabLayout {
    pub keys: Vec<String>,
    pub initially_active: Option<usize>,
}

pub struct Site<H: Host> {
    host: H,
    config: SiteConfig,
    catalog: CaseStudyCatalog,
    about: ModalController<H>,
    case_study: ModalController<H>,
    popup: ModalController<H>,
    tabs: TabPanel<H>,
    router: HashRouter,
    viewport: ViewportClass,
}

impl<H: Host> Site<H> {
    pub fn new(
        mut host: H,
        config: SiteConfig,
        catalog: CaseStudyCatalog,
        pause: Rc<dyn PauseControl>,
        tabs: TabLayout,
    ) -> Self {
        let controller = |kind: ModalKind, host: &H| {
            ModalController::new(ModalSpec::for_kind(kind, &config), Rc::clone(&pause), host)
        };
        let about = controller(ModalKind::About, &host);
        let case_study = controller(ModalKind::CaseStudy, &host);
        let popup = controller(ModalKind::ImagePopup, &host);
        let tabs = TabPanel::new(
            tabs.keys,
            tabs.initially_active,
            TabAnimations::from_config(&config),
            &mut host,
        );
        let viewport = config.classify(host.viewport_width());
        log::info!(
            "site ready: {viewport:?}, {} case studies, {} tabs",
            catalog.len(),
            tabs.len()
        );
        Self {
            host,
            config,
            catalog,
            about,
            case_study,
            popup,
            tabs,
            router: HashRouter,
            viewport,
        }
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn catalog(&self) -> &CaseStudyCatalog {
        &self.catalog
    }

    pub fn tabs(&self) -> &TabPanel<H> {
        &self.tabs
    }

    pub fn viewport(&self) -> ViewportClass {
        self.viewport
    }

    pub fn modal(&self, kind: ModalKind) -> &ModalController<H> {
        match kind {
            ModalKind::About => &self.about,
            ModalKind::CaseStudy => &self.case_study,
            ModalKind::ImagePopup => &self.popup,
        }
    }

    /// Borrows the host alongside one controller.
    fn split(&mut self, kind: ModalKind) -> (&mut H, &mut ModalController<H>) {
        let modal = match kind {
            ModalKind::About => &mut self.about,
            ModalKind::CaseStudy => &mut self.case_study,
            ModalKind::ImagePopup => &mut self.popup,
        };
        (&mut self.host, modal)
    }

    /// Applies the hash present at page load.
    pub fn boot(&mut self) {
        self.sync_to_hash();
    }

    pub fn on_hash_change(&mut self) {
        self.sync_to_hash();
    }

    /// Links set the hash instead of opening directly; the resulting
    /// `hashchange` drives the modals.
    pub fn navigate(&mut self, route: &Route) {
        self.host.assign_hash(route.hash());
    }

    pub fn open_image(&mut self, src: &str, alt: &str) {
        self.popup.open(&mut self.host, ModalContent::Image { src, alt });
    }

    pub fn close(&mut self, kind: ModalKind) {
        let (host, modal) = self.split(kind);
        modal.close(host);
    }

    /// Closes the topmost open modal, if any.
    pub fn on_escape(&mut self) -> Option<ModalKind> {
        let kind = ESCAPE_ORDER.into_iter().find(|&k| self.modal(k).is_open())?;
        self.close(kind);
        Some(kind)
    }

    /// Reclassifies the viewport after a (debounced) resize.
    pub fn on_resize(&mut self) {
        let viewport = self.config.classify(self.host.viewport_width());
        if viewport != self.viewport {
            log::info!("viewport {:?} -> {viewport:?}", self.viewport);
            self.viewport = viewport;
            for kind in ModalKind::ALL {
                let (host, modal) = self.split(kind);
                modal.on_viewport_change(host, viewport);
            }
        }
        if self.about.state().is_visible() {
            self.tabs.relayout(&mut self.host);
        }
    }

    pub fn select_tab(&mut self, key: &str) {
        self.tabs.switch_body(&mut self.host, key);
    }

    /// Entry point for every timer, frame and animation callback.
    pub fn wake(&mut self, wake: Wake) {
        match &wake {
            Wake::ModalTimer { kind, .. } | Wake::ModalAnimationEnd { kind, .. } => {
                let (host, modal) = self.split(*kind);
                modal.on_wake(host, &wake);
            }
            Wake::TabLayout { .. }
            | Wake::TabFrame { .. }
            | Wake::TabFallback { .. }
            | Wake::TabAnimationEnd { .. } => self.tabs.on_wake(&mut self.host, &wake),
        }
    }

    fn open_routes(&self) -> Vec<Route> {
        let mut routes = Vec::new();
        if self.about.is_open() {
            routes.push(Route::About);
        }
        if self.case_study.is_open() {
            if let Some(id) = self.case_study.hash_key() {
                routes.push(Route::CaseStudy(id.to_owned()));
            }
        }
        routes
    }

    fn sync_to_hash(&mut self) {
        let hash = self.host.location_hash();
        let Some(desired) = Route::parse(&hash, &self.catalog) else {
            log::debug!("ignoring hash `{hash}`");
            return;
        };
        let plan = self.router.plan(&self.open_routes(), &desired);
        for kind in plan.close {
            self.close(kind);
        }
        match plan.open {
            Some(Route::About) => {
                self.about.open(&mut self.host, ModalContent::Static);
                if self.about.is_open() {
                    self.tabs.schedule_layout(&mut self.host);
                }
            }
            Some(Route::CaseStudy(id)) => {
                let (id, record) = self.catalog.resolve(&id);
                self.case_study
                    .open(&mut self.host, ModalContent::CaseStudy { id, record });
            }
            Some(Route::Home) | None => {}
        }
    }
}
