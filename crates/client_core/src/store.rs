//! The central application store.
//!
//! All state mutation goes through [`Store::dispatch`], which runs to
//! completion before returning. Asynchronous API calls run as Tokio tasks and
//! report back by posting their `*_DONE` action to the [`Dispatcher`] queue,
//! which only the store consumes. Renderers post through the same queue, and
//! whatever they post during a pass is applied once the pass has finished.

use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt};
use serde_json::Value;
use shared::{
    error::{ApiError, ErrorCode},
    protocol::snippet_path,
};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::{
    action::Action,
    api::{MissingSnippetApi, SnippetApi},
    collaborators::{
        Analytics, Clipboard, MissingAnalytics, MissingClipboard, MissingNavigator,
        MissingRouter, Navigator, Renderer, Router,
    },
    error::StoreError,
    fetch::FetchCounter,
    pending::{KeyValueStore, PendingActionBridge},
    scheduler::RenderScheduler,
    state::ApplicationState,
};

pub const DEFAULT_LOGIN_URL: &str = "/auth/login";

/// Cloneable handle that queues actions for the store.
#[derive(Clone)]
pub struct Dispatcher {
    tx: mpsc::UnboundedSender<Action>,
}

impl Dispatcher {
    pub fn dispatch(&self, action: Action) {
        let tag = action.tag();
        if self.tx.send(action).is_err() {
            warn!(action = tag, "store dropped; action discarded");
        }
    }
}

pub struct Collaborators {
    pub router: Box<dyn Router>,
    pub navigator: Box<dyn Navigator>,
    pub clipboard: Box<dyn Clipboard>,
    pub analytics: Box<dyn Analytics>,
}

impl Default for Collaborators {
    fn default() -> Self {
        Self {
            router: Box::new(MissingRouter),
            navigator: Box::new(MissingNavigator),
            clipboard: Box::new(MissingClipboard),
            analytics: Box::new(MissingAnalytics),
        }
    }
}

pub struct StoreBuilder<R: Renderer> {
    renderer: R,
    api: Arc<dyn SnippetApi>,
    collaborators: Collaborators,
    bridge: PendingActionBridge,
    login_url: String,
    state: ApplicationState,
}

impl<R: Renderer> StoreBuilder<R> {
    pub fn new(renderer: R) -> Self {
        Self {
            renderer,
            api: Arc::new(MissingSnippetApi),
            collaborators: Collaborators::default(),
            bridge: PendingActionBridge::in_memory(),
            login_url: DEFAULT_LOGIN_URL.to_string(),
            state: ApplicationState::default(),
        }
    }

    pub fn api(mut self, api: Arc<dyn SnippetApi>) -> Self {
        self.api = api;
        self
    }

    pub fn router(mut self, router: impl Router + 'static) -> Self {
        self.collaborators.router = Box::new(router);
        self
    }

    pub fn navigator(mut self, navigator: impl Navigator + 'static) -> Self {
        self.collaborators.navigator = Box::new(navigator);
        self
    }

    pub fn clipboard(mut self, clipboard: impl Clipboard + 'static) -> Self {
        self.collaborators.clipboard = Box::new(clipboard);
        self
    }

    pub fn analytics(mut self, analytics: impl Analytics + 'static) -> Self {
        self.collaborators.analytics = Box::new(analytics);
        self
    }

    pub fn pending_storage(mut self, storage: Box<dyn KeyValueStore>) -> Self {
        self.bridge = PendingActionBridge::new(storage);
        self
    }

    pub fn login_url(mut self, login_url: impl Into<String>) -> Self {
        self.login_url = login_url.into();
        self
    }

    pub fn user_name(mut self, user_name: Option<String>) -> Self {
        self.state.user_name = user_name;
        self
    }

    /// Starts from a server-rendered snapshot. In-flight work does not carry
    /// over, so the fetch counter restarts at zero.
    pub fn hydrate(mut self, mut state: ApplicationState) -> Self {
        state.app.fetch_count = FetchCounter::default();
        self.state = state;
        self
    }

    pub fn build(self) -> Store<R> {
        let (tx, inbox) = mpsc::unbounded_channel();
        Store {
            state: self.state,
            renderer: self.renderer,
            scheduler: RenderScheduler::default(),
            api: self.api,
            collaborators: self.collaborators,
            bridge: self.bridge,
            login_url: self.login_url,
            dispatcher: Dispatcher { tx },
            inbox,
        }
    }
}

pub struct Store<R: Renderer> {
    state: ApplicationState,
    renderer: R,
    scheduler: RenderScheduler,
    api: Arc<dyn SnippetApi>,
    collaborators: Collaborators,
    bridge: PendingActionBridge,
    login_url: String,
    dispatcher: Dispatcher,
    inbox: mpsc::UnboundedReceiver<Action>,
}

impl<R: Renderer> Store<R> {
    pub fn state(&self) -> &ApplicationState {
        &self.state
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn dispatcher(&self) -> Dispatcher {
        self.dispatcher.clone()
    }

    pub fn render_passes(&self) -> u64 {
        self.scheduler.passes()
    }

    pub fn has_pending_action(&self) -> bool {
        self.bridge.is_pending()
    }

    pub fn snapshot_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.state)
    }

    /// Records a condition that prevents the current page from rendering
    /// normally. Cleared by the next location change.
    pub fn set_fatal_error(&mut self, message: impl Into<String>) {
        self.state.fatal_error = Some(message.into());
        self.request_render();
    }

    /// String-tag entry point. Unknown tags and malformed payloads are
    /// returned as errors and leave the state untouched.
    pub fn dispatch_tagged(&mut self, tag: &str, payload: Value) -> Result<(), StoreError> {
        let action = Action::from_tagged(tag, payload)?;
        self.dispatch(action);
        Ok(())
    }

    pub fn dispatch(&mut self, action: Action) {
        debug!(action = action.tag(), "dispatch");
        match action {
            Action::LocationChanged(location) => {
                self.collaborators.analytics.page_view(&location);
                self.state.location = location;
                self.state.fatal_error = None;
                self.request_render();
            }
            Action::LocationPush { url } => self.collaborators.router.push(&url),
            Action::LocationReplace { url } => self.collaborators.router.replace(&url),
            Action::LocationBack => self.collaborators.router.back(),
            Action::AppTitle { title } => {
                self.state.app.title = title;
                self.request_render();
            }
            Action::AppResize { width, height } => {
                self.state.app.width = width;
                self.state.app.height = height;
                self.request_render();
            }

            Action::DocumentGet { name } => {
                let api = Arc::clone(&self.api);
                self.start_fetch(
                    async move {
                        let result = api.get_document(&name).await;
                        Action::DocumentGetDone { name, result }
                    }
                    .boxed(),
                );
            }
            Action::DocumentGetDone { name, result } => {
                if let Some(document) = self.finish_fetch(result) {
                    debug!(document = %name, "document merged");
                    self.state.app.title = Some(document.title.clone());
                    self.state.entities.merge_document(document);
                }
                self.request_render();
            }

            Action::SnippetGet { id } => {
                let api = Arc::clone(&self.api);
                self.start_fetch(
                    async move {
                        let result = api.get_snippet(&id).await;
                        Action::SnippetGetDone { id, result }
                    }
                    .boxed(),
                );
            }
            Action::SnippetGetDone { id, result } => {
                if let Some(snippet) = self.finish_fetch(result) {
                    if self.state.location.param("id") == Some(id.as_str())
                        && !snippet.title.is_empty()
                    {
                        self.state.app.title = Some(snippet.title.clone());
                    }
                    self.state.entities.merge_item(snippet);
                }
                self.request_render();
            }

            Action::SnippetList => {
                let api = Arc::clone(&self.api);
                self.start_fetch(
                    async move {
                        let result = api.list_snippets().await;
                        Action::SnippetListDone { result }
                    }
                    .boxed(),
                );
            }
            Action::SnippetListDone { result } => {
                if let Some(snippets) = self.finish_fetch(result) {
                    let ids = self.state.entities.merge_items(snippets);
                    self.state.top_ids = Some(ids);
                }
                self.request_render();
            }

            Action::SnippetSearch { query } => {
                let api = Arc::clone(&self.api);
                self.start_fetch(
                    async move {
                        let result = api.search_snippets(&query).await;
                        Action::SnippetSearchDone { query, result }
                    }
                    .boxed(),
                );
            }
            Action::SnippetSearchDone { query, result } => {
                if let Some(snippets) = self.finish_fetch(result) {
                    self.state.entities.merge_search(query, snippets);
                }
                self.request_render();
            }

            Action::SnippetVote { id } => {
                let Some(user_name) = self.state.user_name.clone() else {
                    self.defer_until_login(Action::SnippetVote { id }, "vote");
                    return;
                };
                let api = Arc::clone(&self.api);
                self.start_fetch(
                    async move {
                        let result = api.vote_snippet(&user_name, &id).await;
                        Action::SnippetVoteDone { id, result }
                    }
                    .boxed(),
                );
            }
            Action::SnippetVoteDone { id, result } => {
                if let Some(snippet) = self.finish_fetch(result) {
                    debug!(snippet = %id, votes = snippet.votes, "vote recorded");
                    self.state.entities.merge_item(snippet);
                }
                self.request_render();
            }

            Action::SnippetAdd(draft) => {
                let Some(user_name) = self.state.user_name.clone() else {
                    self.defer_until_login(Action::SnippetAdd(draft), "add a snippet");
                    return;
                };
                let api = Arc::clone(&self.api);
                self.start_fetch(
                    async move {
                        let result = api.add_snippet(&user_name, &draft).await;
                        Action::SnippetAddDone { result }
                    }
                    .boxed(),
                );
            }
            Action::SnippetAddDone { result } => {
                if let Some(snippet) = self.finish_fetch(result) {
                    let id = self.state.entities.merge_item(snippet);
                    info!(snippet = %id, "snippet added");
                    self.collaborators.router.push(&snippet_path(id.as_str()));
                }
                self.request_render();
            }

            Action::ClipboardCopy { text } => self.collaborators.clipboard.copy(&text),
            Action::PendingActionReplay => {
                let Some(pending) = self.bridge.take() else {
                    debug!("no pending action to replay");
                    return;
                };
                info!(action = pending.tag(), "replaying pending action");
                self.dispatch(pending);
                self.request_render();
            }
        }
    }

    /// Runs render passes until no pass requests another. Actions queued
    /// while a pass runs are applied before the scheduler goes idle, so any
    /// number of them costs one trailing pass.
    pub fn request_render(&mut self) {
        if !self.scheduler.request() {
            return;
        }
        loop {
            self.renderer.render(&self.state, &self.dispatcher);
            self.apply_queued();
            if !self.scheduler.finish_pass() {
                break;
            }
        }
    }

    /// Waits for one queued action and applies it.
    pub async fn next_event(&mut self) -> Result<(), StoreError> {
        let action = self.inbox.recv().await.ok_or(StoreError::QueueClosed)?;
        self.dispatch(action);
        Ok(())
    }

    /// Applies queued actions until the fetch counter reports settled.
    /// Returns at once when nothing is in flight and nothing is queued.
    pub async fn run_until_settled(&mut self) {
        let mut observer = self.state.app.fetch_count.observe();
        loop {
            tokio::select! {
                biased;
                Some(action) = self.inbox.recv() => self.dispatch(action),
                _ = observer.settled() => return,
            }
        }
    }

    fn apply_queued(&mut self) {
        while let Ok(action) = self.inbox.try_recv() {
            self.dispatch(action);
        }
    }

    fn start_fetch(&mut self, task: BoxFuture<'static, Action>) {
        self.state.app.fetch_count.start();
        let dispatcher = self.dispatcher.clone();
        tokio::spawn(async move {
            dispatcher.dispatch(task.await);
        });
        self.request_render();
    }

    fn finish_fetch<T>(&mut self, result: Result<T, ApiError>) -> Option<T> {
        self.state.app.fetch_count.done();
        match result {
            Ok(value) => Some(value),
            Err(error) => {
                warn!(code = ?error.code, message = %error.message, "api call failed");
                self.state.errors.push(error);
                None
            }
        }
    }

    fn defer_until_login(&mut self, action: Action, purpose: &str) {
        if let Err(error) = self.bridge.save(&action) {
            warn!(%error, action = action.tag(), "failed to persist pending action");
        }

        let login_url = self.login_redirect_url();
        self.state.errors.push(ApiError::new(
            ErrorCode::Unauthorized,
            format!("You need to log in to {purpose}: {login_url}"),
        ));
        info!(action = action.tag(), %login_url, "login required; redirecting");
        self.collaborators.navigator.redirect(&login_url);
        self.request_render();
    }

    fn login_redirect_url(&self) -> String {
        let current = &self.state.location.url;
        if current.is_empty() {
            return self.login_url.clone();
        }
        let next: String = url::form_urlencoded::byte_serialize(current.as_bytes()).collect();
        let separator = if self.login_url.contains('?') { '&' } else { '?' };
        format!("{}{separator}next={next}", self.login_url)
    }
}
