//! URL hash to modal mapping.
//!
//! The hash is the single source of truth for the About and Case Study
//! modals. Links only assign the hash; the router turns the resulting
//! `hashchange` into a [`Plan`] of closes and at most one open.

use crate::content::CaseStudyCatalog;
use crate::modal::ModalKind;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Home,
    About,
    CaseStudy(String),
}

impl Route {
    /// Parses a hash with or without the leading `#`. Unrecognized values
    /// yield `None` and must leave modal state untouched.
    pub fn parse(hash: &str, catalog: &CaseStudyCatalog) -> Option<Route> {
        let hash = hash.strip_prefix('#').unwrap_or(hash);
        match hash {
            "" => Some(Route::Home),
            "about" => Some(Route::About),
            id if catalog.contains(id) => Some(Route::CaseStudy(id.to_owned())),
            _ => None,
        }
    }

    pub fn hash(&self) -> &str {
        match self {
            Route::Home => "",
            Route::About => "about",
            Route::CaseStudy(id) => id,
        }
    }

    pub fn kind(&self) -> Option<ModalKind> {
        match self {
            Route::Home => None,
            Route::About => Some(ModalKind::About),
            Route::CaseStudy(_) => Some(ModalKind::CaseStudy),
        }
    }
}

/// What the site must do to make modal state match a route.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Plan {
    pub close: Vec<ModalKind>,
    pub open: Option<Route>,
}

impl Plan {
    pub fn is_empty(&self) -> bool {
        self.close.is_empty() && self.open.is_none()
    }
}

/// Stateless reconciler; the controllers hold the actual state.
#[derive(Debug, Default)]
pub struct HashRouter;

impl HashRouter {
    /// `current` lists the hash-addressable routes whose modals are open.
    pub fn plan(&self, current: &[Route], desired: &Route) -> Plan {
        let mut plan = Plan::default();
        if current.contains(desired) {
            // Already showing; replaying the entrance would flash.
            plan.close = current
                .iter()
                .filter(|route| *route != desired)
                .filter_map(Route::kind)
                .collect();
        } else {
            plan.close = current.iter().filter_map(Route::kind).collect();
            if *desired != Route::Home {
                plan.open = Some(desired.clone());
            }
        }
        log::debug!("route {:?}: {plan:?}", desired.hash());
        plan
    }
}
