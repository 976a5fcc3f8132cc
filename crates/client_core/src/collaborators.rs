//! Side-effect collaborators the store calls but never awaits.

use tracing::debug;

use crate::{
    state::{ApplicationState, Location},
    store::Dispatcher,
};

/// Produces output from the current state. Interaction handlers post actions
/// through `dispatcher`; they are applied after the pass completes.
pub trait Renderer {
    fn render(&mut self, state: &ApplicationState, dispatcher: &Dispatcher);
}

pub trait Router: Send {
    fn push(&mut self, url: &str);
    fn replace(&mut self, url: &str);
    fn back(&mut self);
}

/// Full-page navigation away from the application.
pub trait Navigator: Send {
    fn redirect(&mut self, url: &str);
}

pub trait Clipboard: Send {
    fn copy(&mut self, text: &str);
}

pub trait Analytics: Send {
    fn page_view(&mut self, location: &Location);
}

pub struct MissingRouter;

impl Router for MissingRouter {
    fn push(&mut self, url: &str) {
        debug!(url, "router unavailable; push ignored");
    }

    fn replace(&mut self, url: &str) {
        debug!(url, "router unavailable; replace ignored");
    }

    fn back(&mut self) {
        debug!("router unavailable; back ignored");
    }
}

pub struct MissingNavigator;

impl Navigator for MissingNavigator {
    fn redirect(&mut self, url: &str) {
        debug!(url, "navigator unavailable; redirect ignored");
    }
}

pub struct MissingClipboard;

impl Clipboard for MissingClipboard {
    fn copy(&mut self, text: &str) {
        debug!(len = text.len(), "clipboard unavailable; copy ignored");
    }
}

pub struct MissingAnalytics;

impl Analytics for MissingAnalytics {
    fn page_view(&mut self, _location: &Location) {}
}

/// Tracing-backed page views.
pub struct LogAnalytics;

impl Analytics for LogAnalytics {
    fn page_view(&mut self, location: &Location) {
        tracing::info!(
            route = location.name.as_deref().unwrap_or("-"),
            url = %location.url,
            "page view"
        );
    }
}
