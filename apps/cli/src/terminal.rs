//! Plain-text renderer for the terminal client.

use std::fmt::Write as _;

use client_core::{ApplicationState, Dispatcher, Renderer};
use shared::domain::{Snippet, SnippetId};

pub const HOME_ROUTE: &str = "home";
pub const SNIPPET_ROUTE: &str = "snippet";
pub const SEARCH_ROUTE: &str = "search";
pub const NEW_ROUTE: &str = "new";

/// Renders whatever the state holds for the current location. The commands
/// issue their own fetches, so this renderer never dispatches.
#[derive(Default)]
pub struct TerminalRenderer {
    output: String,
}

impl TerminalRenderer {
    pub fn output(&self) -> &str {
        &self.output
    }
}

impl Renderer for TerminalRenderer {
    fn render(&mut self, state: &ApplicationState, _dispatcher: &Dispatcher) {
        let mut out = String::new();
        if let Some(fatal) = &state.fatal_error {
            let _ = writeln!(out, "!! {fatal}");
        }

        let location = &state.location;
        match location.name.as_deref() {
            Some(HOME_ROUTE) => match &state.top_ids {
                Some(ids) if ids.is_empty() => out.push_str("No snippets yet.\n"),
                Some(ids) => write_list(&mut out, state.entities.resolve(ids)),
                None => {}
            },
            Some(SNIPPET_ROUTE) => {
                let snippet = location
                    .param("id")
                    .and_then(|id| state.entities.item(&SnippetId::new(id)));
                if let Some(snippet) = snippet {
                    write_snippet(&mut out, snippet);
                }
            }
            Some(SEARCH_ROUTE) => {
                let query = location.query_value("q").unwrap_or_default();
                match state.entities.search(query) {
                    Some([]) => {
                        let _ = writeln!(out, "No matches for \"{query}\".");
                    }
                    Some(ids) => {
                        let _ = writeln!(out, "Results for \"{query}\":");
                        write_list(&mut out, state.entities.resolve(ids));
                    }
                    None => {}
                }
            }
            _ => {}
        }
        self.output = out;
    }
}

fn title_of(snippet: &Snippet) -> &str {
    if snippet.title.is_empty() {
        "(untitled)"
    } else {
        &snippet.title
    }
}

fn write_list<'a>(out: &mut String, snippets: impl Iterator<Item = &'a Snippet>) {
    for (rank, snippet) in snippets.enumerate() {
        let _ = writeln!(
            out,
            "{:>3}. {} [{}] by {}, {} votes",
            rank + 1,
            title_of(snippet),
            snippet.id,
            snippet.author,
            snippet.votes
        );
    }
}

fn write_snippet(out: &mut String, snippet: &Snippet) {
    let _ = writeln!(out, "{} [{}]", title_of(snippet), snippet.id);
    let _ = writeln!(out, "by {}, {} votes", snippet.author, snippet.votes);
    out.push('\n');
    out.push_str(&snippet.body);
    if !snippet.body.ends_with('\n') {
        out.push('\n');
    }
}
