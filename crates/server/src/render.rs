//! HTML page renderer driven by the application store.
//!
//! Each pass rebuilds the page body from state. Data the page needs but the
//! entity cache lacks is requested through the dispatcher, at most once per
//! key, so a failed fetch renders its error instead of looping.

use std::{collections::HashSet, fmt::Write as _};

use client_core::{Action, ApplicationState, Dispatcher, Renderer};
use shared::{
    domain::{Snippet, SnippetId},
    protocol::snippet_path,
};

use crate::routes::{DOCUMENT_ROUTE, HOME_ROUTE, NEW_ROUTE, SEARCH_ROUTE, SNIPPET_ROUTE};

const SITE_NAME: &str = "Snippets";

#[derive(Default)]
pub struct PageRenderer {
    requested: HashSet<String>,
    body: String,
}

impl Renderer for PageRenderer {
    fn render(&mut self, state: &ApplicationState, dispatcher: &Dispatcher) {
        let location = &state.location;
        self.body = match location.name.as_deref() {
            Some(HOME_ROUTE) => self.home(state, dispatcher),
            Some(SNIPPET_ROUTE) => match location.param("id") {
                Some(id) => self.snippet(state, dispatcher, &SnippetId::new(id)),
                None => not_found_body(),
            },
            Some(SEARCH_ROUTE) => {
                let query = location.query_value("q").unwrap_or_default().trim().to_string();
                self.search(state, dispatcher, &query)
            }
            Some(NEW_ROUTE) => new_snippet_body(state),
            Some(DOCUMENT_ROUTE) => match location.param("name") {
                Some(name) => self.document(state, dispatcher, name),
                None => not_found_body(),
            },
            _ => not_found_body(),
        };
    }
}

impl PageRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wraps the last rendered body in a full document with the state
    /// snapshot embedded for client hydration.
    pub fn document_html(&self, state: &ApplicationState, snapshot: &str) -> String {
        let title = state
            .app
            .title
            .as_deref()
            .filter(|t| !t.is_empty())
            .map(|t| format!("{} - {SITE_NAME}", escape_html(t)))
            .unwrap_or_else(|| SITE_NAME.to_string());

        let mut html = String::new();
        let _ = write!(
            html,
            "<!doctype html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n<title>{title}</title>\n</head>\n<body>\n"
        );
        html.push_str(&header_html(state));
        if let Some(fatal) = &state.fatal_error {
            let _ = write!(html, "<p class=\"fatal\">{}</p>\n", escape_html(fatal));
        }
        html.push_str(&errors_html(state));
        let _ = write!(html, "<main>\n{}</main>\n", self.body);
        let _ = write!(
            html,
            "<script id=\"initial-state\" type=\"application/json\">{}</script>\n</body>\n</html>\n",
            escape_script_json(snapshot)
        );
        html
    }

    fn request_once(
        &mut self,
        key: String,
        dispatcher: &Dispatcher,
        action: impl FnOnce() -> Action,
    ) {
        if self.requested.insert(key) {
            dispatcher.dispatch(action());
        }
    }

    fn home(&mut self, state: &ApplicationState, dispatcher: &Dispatcher) -> String {
        let Some(ids) = &state.top_ids else {
            self.request_once("list".to_string(), dispatcher, || Action::SnippetList);
            return "<h1>Top snippets</h1>\n<p>Loading...</p>\n".to_string();
        };

        let mut html = String::from("<h1>Top snippets</h1>\n");
        html.push_str(&snippet_list_html(state.entities.resolve(ids)));
        html
    }

    fn snippet(
        &mut self,
        state: &ApplicationState,
        dispatcher: &Dispatcher,
        id: &SnippetId,
    ) -> String {
        let Some(snippet) = state.entities.item(id) else {
            self.request_once(format!("snippet:{id}"), dispatcher, || Action::SnippetGet {
                id: id.clone(),
            });
            return "<p>Loading...</p>\n".to_string();
        };

        let vote_action = escape_html(&format!("{}/vote", snippet_path(snippet.id.as_str())));
        format!(
            "<article>\n<h1>{}</h1>\n<pre><code>{}</code></pre>\n<p>by {} &middot; {} votes</p>\n\
             <form method=\"post\" action=\"{vote_action}\"><button type=\"submit\">Vote</button></form>\n</article>\n",
            escape_html(display_title(snippet)),
            escape_html(&snippet.body),
            escape_html(&snippet.author),
            snippet.votes,
        )
    }

    fn search(&mut self, state: &ApplicationState, dispatcher: &Dispatcher, query: &str) -> String {
        let mut html = format!(
            "<h1>Search</h1>\n<form method=\"get\" action=\"/search\"><input name=\"q\" value=\"{}\"><button type=\"submit\">Search</button></form>\n",
            escape_html(query)
        );
        if query.is_empty() {
            return html;
        }

        match state.entities.search(query) {
            Some(ids) if ids.is_empty() => html.push_str("<p>No matches.</p>\n"),
            Some(ids) => html.push_str(&snippet_list_html(state.entities.resolve(ids))),
            None => {
                self.request_once(format!("search:{query}"), dispatcher, || {
                    Action::SnippetSearch {
                        query: query.to_string(),
                    }
                });
                html.push_str("<p>Searching...</p>\n");
            }
        }
        html
    }

    fn document(
        &mut self,
        state: &ApplicationState,
        dispatcher: &Dispatcher,
        name: &str,
    ) -> String {
        let Some(document) = state.entities.document(name) else {
            self.request_once(format!("document:{name}"), dispatcher, || Action::DocumentGet {
                name: name.to_string(),
            });
            return "<p>Loading...</p>\n".to_string();
        };

        let mut html = format!("<h1>{}</h1>\n", escape_html(&document.title));
        for paragraph in document.body.split("\n\n").filter(|p| !p.trim().is_empty()) {
            let _ = write!(html, "<p>{}</p>\n", escape_html(paragraph.trim()));
        }
        html
    }
}

fn new_snippet_body(state: &ApplicationState) -> String {
    let mut html = String::from("<h1>New snippet</h1>\n");
    if !state.is_authenticated() {
        html.push_str("<p>You will be asked to log in before the snippet is saved.</p>\n");
    }
    html.push_str(
        "<form method=\"post\" action=\"/new\">\n\
         <input name=\"title\" placeholder=\"Title\">\n\
         <textarea name=\"body\"></textarea>\n\
         <button type=\"submit\">Save</button>\n</form>\n",
    );
    html
}

fn not_found_body() -> String {
    "<h1>Not found</h1>\n<p>There is nothing at this address.</p>\n".to_string()
}

fn header_html(state: &ApplicationState) -> String {
    let account = match &state.user_name {
        Some(user) => format!(
            "{} <a href=\"/auth/logout\">Log out</a>",
            escape_html(user)
        ),
        None => "<a href=\"/auth/login\">Log in</a>".to_string(),
    };
    format!(
        "<header><a href=\"/\">{SITE_NAME}</a> <a href=\"/search\">Search</a> <a href=\"/new\">New</a> <a href=\"/about\">About</a> <span>{account}</span></header>\n"
    )
}

fn errors_html(state: &ApplicationState) -> String {
    if state.errors.is_empty() {
        return String::new();
    }
    let mut html = String::from("<ul class=\"errors\">\n");
    for error in state.errors.iter() {
        let _ = write!(html, "<li>{}</li>\n", escape_html(&error.message));
    }
    html.push_str("</ul>\n");
    html
}

fn snippet_list_html<'a>(snippets: impl Iterator<Item = &'a Snippet>) -> String {
    let mut html = String::from("<ol>\n");
    for snippet in snippets {
        let _ = write!(
            html,
            "<li><a href=\"{}\">{}</a> by {} ({} votes)</li>\n",
            escape_html(&snippet_path(snippet.id.as_str())),
            escape_html(display_title(snippet)),
            escape_html(&snippet.author),
            snippet.votes
        );
    }
    html.push_str("</ol>\n");
    html
}

fn display_title(snippet: &Snippet) -> &str {
    if snippet.title.is_empty() {
        "Untitled"
    } else {
        &snippet.title
    }
}

pub fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

/// JSON is valid inside a script element once `<` can no longer close it.
fn escape_script_json(json: &str) -> String {
    json.replace('<', "\\u003c")
}
