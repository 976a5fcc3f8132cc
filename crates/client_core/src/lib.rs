//! Central application store shared by the server renderer and interactive
//! front ends.

pub mod action;
pub mod api;
pub mod collaborators;
pub mod entities;
pub mod error;
pub mod fetch;
pub mod pending;
pub mod scheduler;
pub mod state;
pub mod store;

pub use action::Action;
pub use api::{HttpSnippetApi, MissingSnippetApi, SnippetApi};
pub use collaborators::{
    Analytics, Clipboard, LogAnalytics, MissingAnalytics, MissingClipboard, MissingNavigator,
    MissingRouter, Navigator, Renderer, Router,
};
pub use entities::{EntityCache, ErrorLog};
pub use error::{KeyValueError, StoreError};
pub use fetch::{FetchCounter, SettledObserver};
pub use pending::{FileKeyValueStore, KeyValueStore, MemoryKeyValueStore, PendingActionBridge};
pub use scheduler::{RenderPhase, RenderScheduler};
pub use state::{AppChrome, ApplicationState, Location, NOT_FOUND_ROUTE};
pub use store::{Collaborators, Dispatcher, Store, StoreBuilder, DEFAULT_LOGIN_URL};

#[cfg(test)]
#[path = "tests/store_tests.rs"]
mod store_tests;

#[cfg(test)]
#[path = "tests/api_tests.rs"]
mod api_tests;
