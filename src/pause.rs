//! Reference-counted pause control for the background renderer.
//!
//! Each modal pauses the renderer under its own token. The renderer runs iff
//! no token is held, so closing one overlay while another is still open
//! keeps the sky paused.

use std::cell::RefCell;
use std::collections::BTreeSet;
use std::rc::Rc;

/// What the registry exposes to modal controllers.
pub trait PauseControl {
    /// Adds `token`. Adding a held token is a no-op.
    fn pause(&self, token: &str);
    /// Removes `token`. Removing an absent token is a no-op.
    fn resume(&self, token: &str);
    fn is_paused(&self) -> bool;
}

/// Change in the paused/running state caused by a token operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    /// First token added: running -> paused.
    Paused,
    /// Last token removed: paused -> running.
    Resumed,
    Unchanged,
}

/// A set of string tokens that reports empty/non-empty transitions.
#[derive(Debug, Clone, Default)]
pub struct TokenSet {
    tokens: BTreeSet<String>,
}

impl TokenSet {
    pub fn insert(&mut self, token: &str) -> Edge {
        let was_empty = self.tokens.is_empty();
        if !self.tokens.insert(token.to_owned()) {
            return Edge::Unchanged;
        }
        if was_empty {
            Edge::Paused
        } else {
            Edge::Unchanged
        }
    }

    pub fn remove(&mut self, token: &str) -> Edge {
        if !self.tokens.remove(token) {
            return Edge::Unchanged;
        }
        if self.tokens.is_empty() {
            Edge::Resumed
        } else {
            Edge::Unchanged
        }
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.tokens.iter().map(String::as_str)
    }
}

type Sink = Rc<dyn Fn(Edge)>;

/// Process-wide token registry shared by every modal and the renderer.
///
/// Tokens are tracked even before a renderer attaches; a renderer that
/// attaches later reads [`PauseControl::is_paused`] to pick its initial state.
#[derive(Default)]
pub struct PauseRegistry {
    tokens: RefCell<TokenSet>,
    sink: RefCell<Option<Sink>>,
}

impl PauseRegistry {
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    /// Installs the renderer's edge callback, replacing any previous one.
    pub fn attach(&self, sink: impl Fn(Edge) + 'static) {
        *self.sink.borrow_mut() = Some(Rc::new(sink));
    }

    pub fn held(&self) -> Vec<String> {
        self.tokens.borrow().iter().map(str::to_owned).collect()
    }

    fn notify(&self, edge: Edge) {
        if edge == Edge::Unchanged {
            return;
        }
        log::info!("sky renderer {edge:?} ({:?})", self.held());
        // Clone out so the sink may call back into the registry.
        let sink = self.sink.borrow().clone();
        if let Some(sink) = sink {
            sink(edge);
        }
    }
}

impl PauseControl for PauseRegistry {
    fn pause(&self, token: &str) {
        let edge = self.tokens.borrow_mut().insert(token);
        self.notify(edge);
    }

    fn resume(&self, token: &str) {
        let edge = self.tokens.borrow_mut().remove(token);
        self.notify(edge);
    }

    fn is_paused(&self) -> bool {
        !self.tokens.borrow().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::cell::RefCell;

    #[test]
    fn token_set_reports_edges_only_on_transitions() {
        let mut set = TokenSet::default();
        assert_eq!(set.insert("caseStudyModal"), Edge::Paused);
        assert_eq!(set.insert("caseStudyModal"), Edge::Unchanged);
        assert_eq!(set.insert("imagePopup"), Edge::Unchanged);
        assert_eq!(set.remove("imagePopup"), Edge::Unchanged);
        assert_eq!(set.remove("imagePopup"), Edge::Unchanged);
        assert_eq!(set.remove("caseStudyModal"), Edge::Resumed);
        assert!(set.is_empty());
    }

    #[test]
    fn calls_before_renderer_attaches_are_tracked_silently() {
        let registry = PauseRegistry::new();
        registry.pause("aboutModal");
        registry.resume("never-held");
        assert!(registry.is_paused());

        let edges = Rc::new(RefCell::new(Vec::new()));
        let sink_edges = Rc::clone(&edges);
        registry.attach(move |edge| sink_edges.borrow_mut().push(edge));
        registry.resume("aboutModal");
        assert_eq!(*edges.borrow(), vec![Edge::Resumed]);
        assert!(!registry.is_paused());
    }

    #[test]
    fn nested_overlays_keep_renderer_paused() {
        let registry = PauseRegistry::new();
        let edges = Rc::new(RefCell::new(Vec::new()));
        let sink_edges = Rc::clone(&edges);
        registry.attach(move |edge| sink_edges.borrow_mut().push(edge));

        registry.pause("caseStudyModal");
        registry.pause("imagePopup");
        registry.resume("imagePopup");
        assert!(registry.is_paused());
        assert_eq!(registry.held(), vec!["caseStudyModal".to_owned()]);
        registry.resume("caseStudyModal");
        assert!(!registry.is_paused());
        assert_eq!(*edges.borrow(), vec![Edge::Paused, Edge::Resumed]);
    }

    #[test]
    fn sink_may_reenter_registry() {
        let registry = PauseRegistry::new();
        let inner = Rc::clone(&registry);
        registry.attach(move |edge| {
            if edge == Edge::Resumed {
                let _ = inner.is_paused();
            }
        });
        registry.pause("a");
        registry.resume("a");
        assert!(!registry.is_paused());
    }
}
