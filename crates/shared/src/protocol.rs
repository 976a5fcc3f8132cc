use serde::{Deserialize, Serialize};

pub const API_PREFIX: &str = "/api";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddSnippetRequest {
    pub user_name: String,
    #[serde(default)]
    pub title: String,
    pub body: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoteRequest {
    pub user_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
}

pub fn snippet_path(id: &str) -> String {
    format!("/snippets/{}", encode_segment(id))
}

/// Percent-encodes one path segment. Everything outside the unreserved set
/// is escaped, so `/`, `?` and `#` stay inside the segment.
pub fn encode_segment(raw: &str) -> String {
    urlencoding::encode(raw).into_owned()
}

/// Reverses [`encode_segment`]. `None` when the bytes are not UTF-8.
pub fn decode_segment(raw: &str) -> Option<String> {
    urlencoding::decode(raw).ok().map(|decoded| decoded.into_owned())
}

/// `.` and `..` are rewritten away by URL normalisation and can never name
/// a snippet or document.
pub fn is_dot_segment(segment: &str) -> bool {
    matches!(segment, "." | "..")
}
