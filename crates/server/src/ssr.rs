//! Server-side rendering through the application store.

use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use async_trait::async_trait;
use axum::http::StatusCode;
use client_core::{
    Action, KeyValueError, KeyValueStore, LogAnalytics, Navigator, Router, SnippetApi,
    StoreBuilder,
};
use server_api::ApiContext;
use shared::{
    domain::{Document, Snippet, SnippetDraft, SnippetId},
    error::ApiError,
};
use tracing::{debug, warn};

use crate::{app_state::AppState, render::PageRenderer, routes};

/// Calls the API operations in-process instead of over HTTP.
pub struct LocalApi {
    ctx: ApiContext,
}

impl LocalApi {
    pub fn new(ctx: ApiContext) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl SnippetApi for LocalApi {
    async fn get_document(&self, name: &str) -> Result<Document, ApiError> {
        server_api::get_document(&self.ctx, name).await
    }

    async fn get_snippet(&self, id: &SnippetId) -> Result<Snippet, ApiError> {
        server_api::get_snippet(&self.ctx, id).await
    }

    async fn list_snippets(&self) -> Result<Vec<Snippet>, ApiError> {
        server_api::list_snippets(&self.ctx).await
    }

    async fn search_snippets(&self, query: &str) -> Result<Vec<Snippet>, ApiError> {
        server_api::search_snippets(&self.ctx, query).await
    }

    async fn vote_snippet(&self, user_name: &str, id: &SnippetId) -> Result<Snippet, ApiError> {
        server_api::vote_snippet(&self.ctx, user_name, id).await
    }

    async fn add_snippet(
        &self,
        user_name: &str,
        draft: &SnippetDraft,
    ) -> Result<Snippet, ApiError> {
        server_api::add_snippet(&self.ctx, user_name, draft).await
    }
}

/// Any navigation requested while rendering becomes an HTTP redirect.
#[derive(Clone, Default)]
struct CapturedNavigation {
    target: Arc<Mutex<Option<String>>>,
}

impl CapturedNavigation {
    fn set(&self, url: &str) {
        if let Ok(mut target) = self.target.lock() {
            *target = Some(url.to_string());
        }
    }

    fn take(&self) -> Option<String> {
        self.target.lock().ok().and_then(|mut target| target.take())
    }
}

impl Router for CapturedNavigation {
    fn push(&mut self, url: &str) {
        self.set(url);
    }

    fn replace(&mut self, url: &str) {
        self.set(url);
    }

    fn back(&mut self) {
        debug!("history back has no meaning during server rendering");
    }
}

impl Navigator for CapturedNavigation {
    fn redirect(&mut self, url: &str) {
        self.set(url);
    }
}

/// Single-slot key/value store backed by the request's pending-action
/// cookie. The final value is read back to build the response cookie.
#[derive(Clone, Default)]
pub struct CookieSlot {
    value: Arc<Mutex<Option<String>>>,
}

impl CookieSlot {
    pub fn new(initial: Option<String>) -> Self {
        Self {
            value: Arc::new(Mutex::new(initial)),
        }
    }

    pub fn current(&self) -> Option<String> {
        self.value.lock().ok().and_then(|value| value.clone())
    }
}

impl KeyValueStore for CookieSlot {
    fn get(&self, _key: &str) -> Result<Option<String>, KeyValueError> {
        Ok(self.current())
    }

    fn set(&mut self, _key: &str, value: String) -> Result<(), KeyValueError> {
        if let Ok(mut slot) = self.value.lock() {
            *slot = Some(value);
        }
        Ok(())
    }

    fn remove(&mut self, _key: &str) -> Result<(), KeyValueError> {
        if let Ok(mut slot) = self.value.lock() {
            *slot = None;
        }
        Ok(())
    }
}

pub(crate) struct PageRequest {
    pub target: String,
    pub user_name: Option<String>,
    pub pending_action: Option<String>,
    /// Action submitted by a form post, applied after the page location.
    pub submitted: Option<Action>,
}

pub(crate) struct RenderedPage {
    pub status: StatusCode,
    pub html: String,
    pub redirect: Option<String>,
    pub errors: usize,
    /// Pending-action slot after rendering; differs from the request's when
    /// an action was deferred or replayed.
    pub pending_action: Option<String>,
}

pub(crate) async fn render_page(state: &AppState, request: PageRequest) -> RenderedPage {
    let api = Arc::new(LocalApi::new(state.api.clone()));
    render_with_api(api, state.render_timeout, &state.login_path, request).await
}

async fn render_with_api(
    api: Arc<dyn SnippetApi>,
    render_timeout: Duration,
    login_path: &str,
    request: PageRequest,
) -> RenderedPage {
    let location = routes::resolve(&request.target);
    let navigation = CapturedNavigation::default();
    let pending = CookieSlot::new(request.pending_action);
    let authenticated = request.user_name.is_some();

    let mut store = StoreBuilder::new(PageRenderer::new())
        .api(api)
        .router(navigation.clone())
        .navigator(navigation.clone())
        .analytics(LogAnalytics)
        .pending_storage(Box::new(pending.clone()))
        .login_url(login_path.to_string())
        .user_name(request.user_name)
        .build();

    store.dispatch(Action::LocationChanged(location));
    if authenticated && store.has_pending_action() {
        store.dispatch(Action::PendingActionReplay);
    }
    if let Some(action) = request.submitted {
        store.dispatch(action);
    }
    store.request_render();

    if tokio::time::timeout(render_timeout, store.run_until_settled())
        .await
        .is_err()
    {
        let in_flight = store.state().app.fetch_count.count();
        warn!(
            url = %store.state().location.url,
            in_flight,
            timeout_ms = render_timeout.as_millis() as u64,
            "page render timed out"
        );
        store.set_fatal_error(format!(
            "The page did not finish loading within {} ms.",
            render_timeout.as_millis()
        ));
    }

    let snapshot = store.snapshot_json().unwrap_or_else(|error| {
        warn!(%error, "failed to serialise state snapshot");
        "null".to_string()
    });
    let html = store.renderer().document_html(store.state(), &snapshot);
    let status =
        StatusCode::from_u16(store.state().status_code()).unwrap_or(StatusCode::OK);

    RenderedPage {
        status,
        html,
        redirect: navigation.take(),
        errors: store.state().errors.len(),
        pending_action: pending.current(),
    }
}
