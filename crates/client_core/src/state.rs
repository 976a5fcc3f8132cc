//! The single mutable application state owned by [`crate::Store`].

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use shared::domain::SnippetId;

use crate::{
    entities::{EntityCache, ErrorLog},
    fetch::FetchCounter,
};

pub const NOT_FOUND_ROUTE: &str = "not-found";

/// A resolved route as reported by the routing collaborator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub name: Option<String>,
    #[serde(default)]
    pub params: BTreeMap<String, String>,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub query: BTreeMap<String, String>,
    #[serde(default)]
    pub path: String,
}

impl Location {
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query.get(key).map(String::as_str)
    }

    pub fn is_not_found(&self) -> bool {
        self.name.as_deref() == Some(NOT_FOUND_ROUTE)
    }
}

/// UI chrome: title, viewport and the fetch lifecycle counter.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppChrome {
    pub title: Option<String>,
    #[serde(default)]
    pub width: u32,
    #[serde(default)]
    pub height: u32,
    #[serde(default)]
    pub fetch_count: FetchCounter,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApplicationState {
    pub location: Location,
    pub app: AppChrome,
    pub fatal_error: Option<String>,
    #[serde(default)]
    pub errors: ErrorLog,
    pub user_name: Option<String>,
    #[serde(default)]
    pub entities: EntityCache,
    pub top_ids: Option<Vec<SnippetId>>,
}

impl ApplicationState {
    pub fn is_authenticated(&self) -> bool {
        self.user_name.is_some()
    }

    pub fn is_settled(&self) -> bool {
        self.app.fetch_count.is_settled()
    }

    /// HTTP status for a server-rendered page of this state.
    pub fn status_code(&self) -> u16 {
        if self.location.is_not_found() {
            404
        } else {
            200
        }
    }
}
