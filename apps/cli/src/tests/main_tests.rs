use std::{
    sync::Mutex,
    time::{SystemTime, UNIX_EPOCH},
};

use async_trait::async_trait;
use chrono::Utc;
use client_core::{Navigator, SnippetApi};
use shared::{
    domain::{Document, Snippet},
    error::ApiError,
};

use super::*;

#[derive(Default)]
struct FakeApi {
    added: Mutex<Vec<(String, SnippetDraft)>>,
}

fn snippet(id: &str, author: &str, body: &str) -> Snippet {
    Snippet {
        id: SnippetId::new(id),
        title: format!("title {id}"),
        body: body.to_string(),
        author: author.to_string(),
        votes: 2,
        created_at: Utc::now(),
    }
}

#[async_trait]
impl SnippetApi for FakeApi {
    async fn get_document(&self, name: &str) -> Result<Document, ApiError> {
        Err(ApiError::not_found(format!("no document {name}")))
    }

    async fn get_snippet(&self, id: &SnippetId) -> Result<Snippet, ApiError> {
        Ok(snippet(id.as_str(), "alice", "let answer = 42;"))
    }

    async fn list_snippets(&self) -> Result<Vec<Snippet>, ApiError> {
        Ok(vec![snippet("a", "alice", "1"), snippet("b", "bob", "2")])
    }

    async fn search_snippets(&self, _query: &str) -> Result<Vec<Snippet>, ApiError> {
        Ok(Vec::new())
    }

    async fn vote_snippet(&self, _user_name: &str, id: &SnippetId) -> Result<Snippet, ApiError> {
        Ok(snippet(id.as_str(), "alice", "voted"))
    }

    async fn add_snippet(
        &self,
        user_name: &str,
        draft: &SnippetDraft,
    ) -> Result<Snippet, ApiError> {
        if let Ok(mut added) = self.added.lock() {
            added.push((user_name.to_string(), draft.clone()));
        }
        Ok(snippet("new1", user_name, &draft.body))
    }
}

#[derive(Clone, Default)]
struct RecordingNavigator {
    redirects: Arc<Mutex<Vec<String>>>,
}

impl Navigator for RecordingNavigator {
    fn redirect(&mut self, url: &str) {
        self.redirects.lock().expect("lock").push(url.to_string());
    }
}

fn temp_state_path(tag: &str) -> PathBuf {
    let suffix = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock")
        .as_nanos();
    std::env::temp_dir()
        .join(format!("snippets_cli_{tag}_{suffix}"))
        .join("state.json")
}

fn build(
    api: Arc<FakeApi>,
    state_path: &PathBuf,
    user: Option<&str>,
    navigator: RecordingNavigator,
    navigation: &Navigation,
) -> Store<TerminalRenderer> {
    StoreBuilder::new(TerminalRenderer::default())
        .api(api)
        .router(navigation.clone())
        .navigator(navigator)
        .pending_storage(Box::new(FileKeyValueStore::new(state_path.clone())))
        .login_url("http://server/auth/login")
        .user_name(user.map(str::to_string))
        .build()
}

#[tokio::test]
async fn list_prints_ranked_snippets() {
    let navigation = Navigation::default();
    let path = temp_state_path("list");
    let mut store = build(
        Arc::new(FakeApi::default()),
        &path,
        None,
        RecordingNavigator::default(),
        &navigation,
    );

    run(&mut store, &Command::List, &navigation).await;

    let output = store.renderer().output();
    assert!(output.contains("  1. title a [a] by alice, 2 votes"));
    assert!(output.contains("  2. title b [b] by bob, 2 votes"));
}

#[tokio::test]
async fn add_without_user_is_deferred_and_resumed_on_next_run() {
    let api = Arc::new(FakeApi::default());
    let path = temp_state_path("resume");
    let add = Command::Add {
        title: "later".to_string(),
        body: "println!(\"saved\");".to_string(),
    };

    let navigator = RecordingNavigator::default();
    let navigation = Navigation::default();
    let mut first = build(Arc::clone(&api), &path, None, navigator.clone(), &navigation);
    run(&mut first, &add, &navigation).await;

    assert_eq!(
        navigator.redirects.lock().expect("lock").as_slice(),
        ["http://server/auth/login?next=%2Fnew".to_string()]
    );
    assert!(first.has_pending_action());
    assert!(api.added.lock().expect("lock").is_empty());
    drop(first);

    let navigation = Navigation::default();
    let mut second = build(
        Arc::clone(&api),
        &path,
        Some("carol"),
        RecordingNavigator::default(),
        &navigation,
    );
    run(&mut second, &Command::Resume, &navigation).await;

    let added = api.added.lock().expect("lock").clone();
    assert_eq!(added.len(), 1);
    assert_eq!(added[0].0, "carol");
    assert_eq!(added[0].1.title, "later");
    assert!(!second.has_pending_action());
    assert_eq!(second.state().location.param("id"), Some("new1"));
    assert!(second.renderer().output().contains("println!(\"saved\");"));

    if let Some(dir) = path.parent() {
        let _ = std::fs::remove_dir_all(dir);
    }
}

#[test]
fn commands_map_to_locations() {
    let search = Command::Search {
        query: "async fn".to_string(),
    }
    .location();
    assert_eq!(search.url, "/search?q=async+fn");
    assert_eq!(search.query_value("q"), Some("async fn"));

    let get = Command::Get { id: "abc".to_string() }.location();
    assert_eq!(get.param("id"), Some("abc"));
    let followed = location_for_url("/snippets/xyz").expect("snippet url");
    assert_eq!(followed.param("id"), Some("xyz"));
    assert!(location_for_url("/elsewhere").is_none());

    let odd = Command::Get { id: "x?y".to_string() }.location();
    assert_eq!(odd.url, "/snippets/x%3Fy");
    let followed = location_for_url(&odd.url).expect("encoded snippet url");
    assert_eq!(followed.param("id"), Some("x?y"));
}
