use std::{collections::BTreeMap, path::PathBuf, sync::Arc};

use anyhow::Result;
use clap::{Parser, Subcommand};
use client_core::{
    Action, FileKeyValueStore, HttpSnippetApi, Location, LogAnalytics, Renderer, Store,
    StoreBuilder, DEFAULT_LOGIN_URL,
};
use shared::{
    domain::{SnippetDraft, SnippetId},
    error::ApiException,
    protocol::{decode_segment, snippet_path},
};
use tracing::info;

mod effects;
mod terminal;

use effects::{Navigation, PrintNavigator, SystemClipboard};
use terminal::{TerminalRenderer, HOME_ROUTE, NEW_ROUTE, SEARCH_ROUTE, SNIPPET_ROUTE};

/// Redirect chains longer than this are abandoned.
const MAX_FOLLOWED_NAVIGATIONS: usize = 4;

#[derive(Parser, Debug)]
#[command(name = "snippets", about = "Browse, vote on and share code snippets")]
struct Cli {
    #[arg(long, env = "SNIPPETS_SERVER_URL", default_value = "http://127.0.0.1:8080")]
    server_url: String,
    #[arg(long, env = "SNIPPETS_USER")]
    user: Option<String>,
    /// File holding an action deferred until login.
    #[arg(long, env = "SNIPPETS_STATE")]
    state: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
enum Command {
    /// Top snippets by votes.
    List,
    Get {
        id: String,
    },
    Search {
        query: String,
    },
    Vote {
        id: String,
    },
    Add {
        #[arg(long, default_value = "")]
        title: String,
        #[arg(long)]
        body: String,
    },
    /// Copies a snippet body to the system clipboard.
    Copy {
        id: String,
    },
    /// Runs an action that was deferred until login.
    Resume,
}

impl Command {
    fn location(&self) -> Location {
        match self {
            Command::List | Command::Resume => location(HOME_ROUTE, "/", &[]),
            Command::Get { id } | Command::Vote { id } | Command::Copy { id } => {
                snippet_location(id)
            }
            Command::Search { query } => {
                let encoded = url_encode(query);
                let mut location = location(SEARCH_ROUTE, &format!("/search?q={encoded}"), &[]);
                location.path = "/search".to_string();
                location.query.insert("q".to_string(), query.clone());
                location
            }
            Command::Add { .. } => location(NEW_ROUTE, "/new", &[]),
        }
    }

    fn action(&self) -> Option<Action> {
        match self {
            Command::List => Some(Action::SnippetList),
            Command::Get { id } | Command::Copy { id } => Some(Action::SnippetGet {
                id: SnippetId::new(id.as_str()),
            }),
            Command::Search { query } => Some(Action::SnippetSearch {
                query: query.clone(),
            }),
            Command::Vote { id } => Some(Action::SnippetVote {
                id: SnippetId::new(id.as_str()),
            }),
            Command::Add { title, body } => Some(Action::SnippetAdd(SnippetDraft {
                title: title.clone(),
                body: body.clone(),
            })),
            Command::Resume => None,
        }
    }
}

fn location(name: &str, url: &str, params: &[(&str, &str)]) -> Location {
    Location {
        name: Some(name.to_string()),
        params: params
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
        url: url.to_string(),
        query: BTreeMap::new(),
        path: url.to_string(),
    }
}

fn snippet_location(id: &str) -> Location {
    location(SNIPPET_ROUTE, &snippet_path(id), &[("id", id)])
}

/// Maps an in-app navigation target back to a location the terminal can show.
fn location_for_url(url: &str) -> Option<Location> {
    let raw = url.strip_prefix("/snippets/")?;
    if raw.is_empty() || raw.contains('/') {
        return None;
    }
    decode_segment(raw).map(|id| snippet_location(&id))
}

fn url_encode(raw: &str) -> String {
    url::form_urlencoded::byte_serialize(raw.as_bytes()).collect()
}

fn default_state_path() -> PathBuf {
    dirs::data_local_dir()
        .map(|base| base.join("snippets").join("state.json"))
        .unwrap_or_else(|| PathBuf::from(".snippets-state.json"))
}

/// One "page load": replay anything deferred, apply the command, wait for its
/// fetches, then follow in-app navigation it caused.
async fn run<R: Renderer>(store: &mut Store<R>, command: &Command, navigation: &Navigation) {
    store.dispatch(Action::LocationChanged(command.location()));
    if store.state().is_authenticated() {
        store.dispatch(Action::PendingActionReplay);
    } else if store.has_pending_action() {
        info!("a deferred action is waiting for login");
    }
    if let Some(action) = command.action() {
        store.dispatch(action);
    }
    store.run_until_settled().await;

    if let Command::Copy { id } = command {
        let body = store
            .state()
            .entities
            .item(&SnippetId::new(id.as_str()))
            .map(|snippet| snippet.body.clone());
        if let Some(text) = body {
            store.dispatch(Action::ClipboardCopy { text });
        }
    }

    for _ in 0..MAX_FOLLOWED_NAVIGATIONS {
        let Some(location) = navigation.take().and_then(|url| location_for_url(&url)) else {
            break;
        };
        store.dispatch(Action::LocationChanged(location));
        store.run_until_settled().await;
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();
    let cli = Cli::parse();

    let state_path = cli.state.clone().unwrap_or_else(default_state_path);
    let user = cli
        .user
        .as_deref()
        .map(str::trim)
        .filter(|user| !user.is_empty())
        .map(str::to_string);
    let api = HttpSnippetApi::new(cli.server_url.clone());
    let login_url = format!("{}{DEFAULT_LOGIN_URL}", api.server_url().trim_end_matches('/'));
    let navigation = Navigation::default();

    let mut store = StoreBuilder::new(TerminalRenderer::default())
        .api(Arc::new(api))
        .router(navigation.clone())
        .navigator(PrintNavigator)
        .clipboard(SystemClipboard)
        .analytics(LogAnalytics)
        .pending_storage(Box::new(FileKeyValueStore::new(&state_path)))
        .login_url(login_url)
        .user_name(user)
        .build();

    if cli.command == Command::Resume {
        if !store.has_pending_action() {
            println!("Nothing to resume.");
            return Ok(());
        }
        if !store.state().is_authenticated() {
            eprintln!("A deferred action is waiting. Run again with --user <name> to resume it.");
            return Ok(());
        }
    }

    run(&mut store, &cli.command, &navigation).await;

    print!("{}", store.renderer().output());
    let errors = store.state().errors.since(0);
    let Some((last, earlier)) = errors.split_last() else {
        return Ok(());
    };
    for error in earlier {
        eprintln!("error ({:?}): {}", error.code, error.message);
    }
    Err(ApiException::from(last.clone()).into())
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
