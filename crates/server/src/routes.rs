//! Route table for server-rendered pages.

use std::collections::BTreeMap;

use client_core::{Location, NOT_FOUND_ROUTE};
use shared::protocol::decode_segment;
use url::Url;

pub const HOME_ROUTE: &str = "home";
pub const SNIPPET_ROUTE: &str = "snippet";
pub const SEARCH_ROUTE: &str = "search";
pub const NEW_ROUTE: &str = "new";
pub const DOCUMENT_ROUTE: &str = "document";

/// Resolves a request target (`/path?query`) into a [`Location`].
pub fn resolve(target: &str) -> Location {
    let target = if target.starts_with('/') {
        target.to_string()
    } else {
        format!("/{target}")
    };

    let Ok(parsed) = Url::parse("http://localhost").and_then(|base| base.join(&target)) else {
        return not_found(target.clone(), target);
    };

    let path = parsed.path().to_string();
    let query: BTreeMap<String, String> = parsed
        .query_pairs()
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    let url = match parsed.query() {
        Some(q) if !q.is_empty() => format!("{path}?{q}"),
        _ => path.clone(),
    };

    let segments: Vec<&str> = path
        .trim_matches('/')
        .split('/')
        .filter(|segment| !segment.is_empty())
        .collect();

    let matched = match segments.as_slice() {
        [] => Some((HOME_ROUTE, BTreeMap::new())),
        ["snippets", id] => single("id", id).map(|params| (SNIPPET_ROUTE, params)),
        ["search"] => Some((SEARCH_ROUTE, BTreeMap::new())),
        ["new"] => Some((NEW_ROUTE, BTreeMap::new())),
        ["docs", name] => single("name", name).map(|params| (DOCUMENT_ROUTE, params)),
        [name @ ("about" | "help")] => single("name", name).map(|params| (DOCUMENT_ROUTE, params)),
        _ => None,
    };
    let Some((name, params)) = matched else {
        return not_found(path, url);
    };

    Location {
        name: Some(name.to_string()),
        params,
        url,
        query,
        path,
    }
}

/// Path params are stored decoded. Undecodable bytes match no route.
fn single(key: &str, raw: &str) -> Option<BTreeMap<String, String>> {
    let value = decode_segment(raw)?;
    Some(BTreeMap::from([(key.to_string(), value)]))
}

fn not_found(path: String, url: String) -> Location {
    Location {
        name: Some(NOT_FOUND_ROUTE.to_string()),
        params: BTreeMap::new(),
        url,
        query: BTreeMap::new(),
        path,
    }
}
