//! Tagged actions accepted by [`crate::Store::dispatch`].
//!
//! Actions serialise as `{"type": TAG, "data": PAYLOAD}`, which is also the
//! format the pending-action bridge persists.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use shared::{
    domain::{Document, Snippet, SnippetDraft, SnippetId},
    error::ApiError,
};

use crate::{error::StoreError, state::Location};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum Action {
    #[serde(rename = "LOCATION_CHANGED")]
    LocationChanged(Location),
    #[serde(rename = "LOCATION_PUSH")]
    LocationPush { url: String },
    #[serde(rename = "LOCATION_REPLACE")]
    LocationReplace { url: String },
    #[serde(rename = "LOCATION_BACK")]
    LocationBack,
    #[serde(rename = "APP_TITLE")]
    AppTitle { title: Option<String> },
    #[serde(rename = "APP_RESIZE")]
    AppResize { width: u32, height: u32 },

    #[serde(rename = "API_DOCUMENT_GET")]
    DocumentGet { name: String },
    #[serde(rename = "API_DOCUMENT_GET_DONE")]
    DocumentGetDone {
        name: String,
        result: Result<Document, ApiError>,
    },
    #[serde(rename = "API_SNIPPET_GET")]
    SnippetGet { id: SnippetId },
    #[serde(rename = "API_SNIPPET_GET_DONE")]
    SnippetGetDone {
        id: SnippetId,
        result: Result<Snippet, ApiError>,
    },
    #[serde(rename = "API_SNIPPET_LIST")]
    SnippetList,
    #[serde(rename = "API_SNIPPET_LIST_DONE")]
    SnippetListDone {
        result: Result<Vec<Snippet>, ApiError>,
    },
    #[serde(rename = "API_SNIPPET_SEARCH")]
    SnippetSearch { query: String },
    #[serde(rename = "API_SNIPPET_SEARCH_DONE")]
    SnippetSearchDone {
        query: String,
        result: Result<Vec<Snippet>, ApiError>,
    },
    #[serde(rename = "API_SNIPPET_VOTE")]
    SnippetVote { id: SnippetId },
    #[serde(rename = "API_SNIPPET_VOTE_DONE")]
    SnippetVoteDone {
        id: SnippetId,
        result: Result<Snippet, ApiError>,
    },
    #[serde(rename = "API_SNIPPET_ADD")]
    SnippetAdd(SnippetDraft),
    #[serde(rename = "API_SNIPPET_ADD_DONE")]
    SnippetAddDone { result: Result<Snippet, ApiError> },

    #[serde(rename = "CLIPBOARD_COPY")]
    ClipboardCopy { text: String },
    #[serde(rename = "PENDING_ACTION_REPLAY")]
    PendingActionReplay,
}

impl Action {
    pub const TAGS: &'static [&'static str] = &[
        "LOCATION_CHANGED",
        "LOCATION_PUSH",
        "LOCATION_REPLACE",
        "LOCATION_BACK",
        "APP_TITLE",
        "APP_RESIZE",
        "API_DOCUMENT_GET",
        "API_DOCUMENT_GET_DONE",
        "API_SNIPPET_GET",
        "API_SNIPPET_GET_DONE",
        "API_SNIPPET_LIST",
        "API_SNIPPET_LIST_DONE",
        "API_SNIPPET_SEARCH",
        "API_SNIPPET_SEARCH_DONE",
        "API_SNIPPET_VOTE",
        "API_SNIPPET_VOTE_DONE",
        "API_SNIPPET_ADD",
        "API_SNIPPET_ADD_DONE",
        "CLIPBOARD_COPY",
        "PENDING_ACTION_REPLAY",
    ];

    pub fn tag(&self) -> &'static str {
        match self {
            Action::LocationChanged(_) => "LOCATION_CHANGED",
            Action::LocationPush { .. } => "LOCATION_PUSH",
            Action::LocationReplace { .. } => "LOCATION_REPLACE",
            Action::LocationBack => "LOCATION_BACK",
            Action::AppTitle { .. } => "APP_TITLE",
            Action::AppResize { .. } => "APP_RESIZE",
            Action::DocumentGet { .. } => "API_DOCUMENT_GET",
            Action::DocumentGetDone { .. } => "API_DOCUMENT_GET_DONE",
            Action::SnippetGet { .. } => "API_SNIPPET_GET",
            Action::SnippetGetDone { .. } => "API_SNIPPET_GET_DONE",
            Action::SnippetList => "API_SNIPPET_LIST",
            Action::SnippetListDone { .. } => "API_SNIPPET_LIST_DONE",
            Action::SnippetSearch { .. } => "API_SNIPPET_SEARCH",
            Action::SnippetSearchDone { .. } => "API_SNIPPET_SEARCH_DONE",
            Action::SnippetVote { .. } => "API_SNIPPET_VOTE",
            Action::SnippetVoteDone { .. } => "API_SNIPPET_VOTE_DONE",
            Action::SnippetAdd(_) => "API_SNIPPET_ADD",
            Action::SnippetAddDone { .. } => "API_SNIPPET_ADD_DONE",
            Action::ClipboardCopy { .. } => "CLIPBOARD_COPY",
            Action::PendingActionReplay => "PENDING_ACTION_REPLAY",
        }
    }

    /// Builds an action from a string tag and a JSON payload. Tags without a
    /// payload take `Value::Null`.
    pub fn from_tagged(tag: &str, payload: Value) -> Result<Self, StoreError> {
        if !Self::TAGS.contains(&tag) {
            return Err(StoreError::UnknownAction(tag.to_string()));
        }

        let mut envelope = Map::new();
        envelope.insert("type".to_string(), Value::String(tag.to_string()));
        if !payload.is_null() {
            envelope.insert("data".to_string(), payload);
        }

        serde_json::from_value(Value::Object(envelope)).map_err(|source| {
            StoreError::InvalidPayload {
                tag: tag.to_string(),
                source,
            }
        })
    }
}
