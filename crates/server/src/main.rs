use std::{net::SocketAddr, sync::Arc, time::Duration};

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, HeaderValue, Method, StatusCode, Uri},
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
    Form, Json, Router,
};
use client_core::Action;
use serde::Deserialize;
use server_api::ApiContext;
use shared::{
    domain::{SnippetDraft, SnippetId},
    error::{ApiError, ErrorCode},
    protocol::{snippet_path, API_PREFIX},
};
use storage::Storage;
use tower_http::limit::RequestBodyLimitLayer;
use tracing::{error, info, warn};

mod api;
mod app_state;
mod config;
mod cookies;
mod render;
mod routes;
mod ssr;

use app_state::AppState;
use config::{load_settings, prepare_database_url};
use cookies::{clear_cookie, read_cookie, set_cookie, PENDING_ACTION_COOKIE, USER_COOKIE};
use render::escape_html;
use ssr::{render_page, PageRequest, RenderedPage};

const MAX_REQUEST_BODY_BYTES: usize = 64 * 1024;

#[derive(Debug, Deserialize)]
struct LoginQuery {
    #[serde(default)]
    user: String,
    #[serde(default)]
    next: String,
}

#[derive(Debug, Deserialize)]
struct NewSnippetForm {
    #[serde(default)]
    title: String,
    #[serde(default)]
    body: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let settings = load_settings();
    let database_url = prepare_database_url(&settings.database_url)?;
    let storage = Storage::new(&database_url).await.map_err(|error| {
        error!(
            %database_url,
            %error,
            "failed to open SQLite database; verify parent directory exists and permissions are correct"
        );
        error
    })?;

    let state = AppState {
        api: ApiContext { storage },
        render_timeout: Duration::from_millis(settings.render_timeout_ms.max(1)),
        login_path: settings.login_url(),
    };
    let app = build_router(Arc::new(state));

    let addr: SocketAddr = settings.server_bind.parse()?;
    info!(
        %addr,
        login_url = %settings.login_url(),
        render_timeout_ms = settings.render_timeout_ms,
        "server listening"
    );
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .nest(API_PREFIX, api::routes())
        .route("/auth/login", get(login))
        .route("/auth/logout", get(logout))
        .route("/new", get(page).post(submit_snippet))
        .route("/snippets/:id/vote", post(submit_vote))
        .fallback(page)
        .layer(RequestBodyLimitLayer::new(MAX_REQUEST_BODY_BYTES))
        .with_state(state)
}

async fn healthz(
    State(state): State<Arc<AppState>>,
) -> Result<&'static str, (StatusCode, Json<ApiError>)> {
    state.api.storage.health_check().await.map_err(|e| {
        error!(error = %e, "health check failed");
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ApiError::new(ErrorCode::Internal, e.to_string())),
        )
    })?;
    Ok("ok")
}

/// Sets the user cookie and sends the browser back to `next`. Without a
/// user name a small form is served instead.
async fn login(Query(q): Query<LoginQuery>) -> Response {
    let next = safe_next(&q.next);
    let user = q.user.trim();
    if user.is_empty() {
        return Html(login_form(next)).into_response();
    }

    info!(user_name = user, "login");
    let mut response = see_other(next);
    if let Some(cookie) = set_cookie(USER_COOKIE, user) {
        response.headers_mut().append(header::SET_COOKIE, cookie);
    }
    response
}

async fn logout() -> Response {
    let mut response = Redirect::to("/").into_response();
    response
        .headers_mut()
        .append(header::SET_COOKIE, clear_cookie(USER_COOKIE));
    response
}

async fn page(
    State(state): State<Arc<AppState>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
) -> Response {
    if method != Method::GET && method != Method::HEAD {
        return StatusCode::METHOD_NOT_ALLOWED.into_response();
    }
    let target = uri
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| "/".to_string());
    render_response(&state, &headers, target, None).await
}

async fn submit_snippet(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Form(form): Form<NewSnippetForm>,
) -> Response {
    let action = Action::SnippetAdd(SnippetDraft {
        title: form.title,
        body: form.body,
    });
    render_response(&state, &headers, "/new".to_string(), Some(action)).await
}

async fn submit_vote(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    let target = snippet_path(&id);
    let action = Action::SnippetVote {
        id: SnippetId::new(id),
    };
    render_response(&state, &headers, target, Some(action)).await
}

async fn render_response(
    state: &AppState,
    headers: &HeaderMap,
    target: String,
    submitted: Option<Action>,
) -> Response {
    let pending_action = read_cookie(headers, PENDING_ACTION_COOKIE);
    let is_submission = submitted.is_some();
    let request = PageRequest {
        target: target.clone(),
        user_name: read_cookie(headers, USER_COOKIE),
        pending_action: pending_action.clone(),
        submitted,
    };
    let mut page = render_page(state, request).await;
    // A successful form post is answered with a redirect so a reload does not
    // repeat it. Failures stay on the page with their errors shown.
    if is_submission && page.redirect.is_none() && page.errors == 0 {
        page.redirect = Some(target);
    }
    page_response(page, pending_action)
}

fn page_response(page: RenderedPage, previous_pending: Option<String>) -> Response {
    let mut response = match &page.redirect {
        Some(location) => see_other(location),
        None => (page.status, Html(page.html)).into_response(),
    };

    if page.pending_action != previous_pending {
        let cookie = match &page.pending_action {
            Some(value) => set_cookie(PENDING_ACTION_COOKIE, value).unwrap_or_else(|| {
                warn!(bytes = value.len(), "pending action too large for a cookie");
                clear_cookie(PENDING_ACTION_COOKIE)
            }),
            None => clear_cookie(PENDING_ACTION_COOKIE),
        };
        response.headers_mut().append(header::SET_COOKIE, cookie);
    }
    response
}

/// Only same-site absolute paths that fit in a `Location` header are
/// accepted as a post-login destination.
fn safe_next(next: &str) -> &str {
    let same_site = next.starts_with('/') && !next.starts_with("//") && !next.starts_with("/\\");
    if same_site && HeaderValue::from_str(next).is_ok() {
        next
    } else {
        "/"
    }
}

/// `Redirect::to` panics on a location that is not a valid header value.
fn see_other(location: &str) -> Response {
    if HeaderValue::from_str(location).is_ok() {
        Redirect::to(location).into_response()
    } else {
        warn!(location, "refusing to redirect to an invalid location");
        Redirect::to("/").into_response()
    }
}

fn login_form(next: &str) -> String {
    format!(
        "<!doctype html>\n<html lang=\"en\">\n<head><meta charset=\"utf-8\"><title>Log in</title></head>\n<body>\n\
         <h1>Log in</h1>\n<form method=\"get\" action=\"/auth/login\">\n\
         <input name=\"user\" placeholder=\"User name\">\n\
         <input type=\"hidden\" name=\"next\" value=\"{}\">\n\
         <button type=\"submit\">Continue</button>\n</form>\n</body>\n</html>\n",
        escape_html(next)
    )
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
