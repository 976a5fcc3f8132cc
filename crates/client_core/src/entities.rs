use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use shared::{
    domain::{Document, Snippet, SnippetId},
    error::ApiError,
};

/// Append-only record of recoverable failures shown to the user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ErrorLog {
    entries: Vec<ApiError>,
}

impl ErrorLog {
    pub fn push(&mut self, error: ApiError) {
        self.entries.push(error);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn last(&self) -> Option<&ApiError> {
        self.entries.last()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ApiError> {
        self.entries.iter()
    }

    /// Entries appended after the first `seen` ones.
    pub fn since(&self, seen: usize) -> &[ApiError] {
        self.entries.get(seen..).unwrap_or(&[])
    }
}

/// Local copies of fetched entities. Merges are keyed overwrites; nothing is
/// ever evicted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntityCache {
    #[serde(default)]
    pub items: HashMap<SnippetId, Snippet>,
    #[serde(default)]
    pub searches: HashMap<String, Vec<SnippetId>>,
    #[serde(default)]
    pub documents: HashMap<String, Document>,
}

impl EntityCache {
    pub fn item(&self, id: &SnippetId) -> Option<&Snippet> {
        self.items.get(id)
    }

    pub fn merge_item(&mut self, snippet: Snippet) -> SnippetId {
        let id = snippet.id.clone();
        self.items.insert(id.clone(), snippet);
        id
    }

    /// Merges every snippet and returns their ids in the order received.
    pub fn merge_items(&mut self, snippets: Vec<Snippet>) -> Vec<SnippetId> {
        snippets
            .into_iter()
            .map(|snippet| self.merge_item(snippet))
            .collect()
    }

    pub fn merge_search(&mut self, query: impl Into<String>, snippets: Vec<Snippet>) {
        let ids = self.merge_items(snippets);
        self.searches.insert(query.into(), ids);
    }

    pub fn search(&self, query: &str) -> Option<&[SnippetId]> {
        self.searches.get(query).map(Vec::as_slice)
    }

    pub fn merge_document(&mut self, document: Document) {
        self.documents.insert(document.name.clone(), document);
    }

    pub fn document(&self, name: &str) -> Option<&Document> {
        self.documents.get(name)
    }

    /// Resolves ids against the item map, skipping any that are missing.
    pub fn resolve<'a>(&'a self, ids: &'a [SnippetId]) -> impl Iterator<Item = &'a Snippet> + 'a {
        ids.iter().filter_map(|id| self.items.get(id))
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use shared::error::ErrorCode;

    use super::*;

    fn snippet(id: &str, body: &str) -> Snippet {
        Snippet {
            id: SnippetId::new(id),
            title: format!("title {id}"),
            body: body.to_string(),
            author: "alice".to_string(),
            votes: 0,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn merging_same_key_twice_keeps_last_value() {
        let mut cache = EntityCache::default();
        cache.merge_item(snippet("s1", "first"));
        cache.merge_item(snippet("s1", "second"));

        assert_eq!(cache.items.len(), 1);
        assert_eq!(cache.item(&SnippetId::new("s1")).map(|s| s.body.as_str()), Some("second"));
    }

    #[test]
    fn search_results_keep_order_and_share_items() {
        let mut cache = EntityCache::default();
        cache.merge_search("rust", vec![snippet("b", "x"), snippet("a", "y")]);

        let ids = cache.search("rust").expect("search cached");
        assert_eq!(ids, &[SnippetId::new("b"), SnippetId::new("a")]);
        assert_eq!(cache.resolve(ids).count(), 2);
        assert!(cache.search("go").is_none());
    }

    #[test]
    fn error_log_only_grows() {
        let mut log = ErrorLog::default();
        log.push(ApiError::new(ErrorCode::Internal, "one"));
        let seen = log.len();
        log.push(ApiError::new(ErrorCode::NotFound, "two"));

        assert_eq!(log.len(), 2);
        assert_eq!(log.since(seen).len(), 1);
        assert_eq!(log.since(10).len(), 0);
        assert_eq!(log.last().map(|e| e.code), Some(ErrorCode::NotFound));
    }
}
