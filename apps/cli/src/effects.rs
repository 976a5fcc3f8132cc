//! Side-effect collaborators for the terminal client.

use std::sync::{Arc, Mutex};

use client_core::{Clipboard, Navigator, Router};
use tracing::{debug, warn};

/// Remembers the last in-app navigation so the command loop can follow it.
#[derive(Clone, Default)]
pub struct Navigation {
    target: Arc<Mutex<Option<String>>>,
}

impl Navigation {
    pub fn take(&self) -> Option<String> {
        self.target.lock().ok().and_then(|mut target| target.take())
    }

    fn set(&self, url: &str) {
        if let Ok(mut target) = self.target.lock() {
            *target = Some(url.to_string());
        }
    }
}

impl Router for Navigation {
    fn push(&mut self, url: &str) {
        self.set(url);
    }

    fn replace(&mut self, url: &str) {
        self.set(url);
    }

    fn back(&mut self) {
        debug!("no history in the terminal client");
    }
}

/// A terminal cannot follow a redirect, so the target is shown instead.
pub struct PrintNavigator;

impl Navigator for PrintNavigator {
    fn redirect(&mut self, url: &str) {
        eprintln!("Login required. Open {url}, then run again with --user <name> (or SNIPPETS_USER).");
    }
}

pub struct SystemClipboard;

impl Clipboard for SystemClipboard {
    fn copy(&mut self, text: &str) {
        let copied = arboard::Clipboard::new()
            .and_then(|mut clipboard| clipboard.set_text(text.to_string()));
        match copied {
            Ok(()) => eprintln!("Copied {} bytes to the clipboard.", text.len()),
            Err(error) => warn!(%error, "clipboard unavailable"),
        }
    }
}
