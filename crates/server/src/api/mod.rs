//! JSON API handlers over `server_api`.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use shared::{
    domain::{Document, Snippet, SnippetDraft, SnippetId},
    error::{ApiError, ErrorCode},
    protocol::{AddSnippetRequest, SearchQuery, VoteRequest},
};

use crate::app_state::AppState;

type ApiResult<T> = Result<Json<T>, (StatusCode, Json<ApiError>)>;

pub(crate) fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/documents/:name", get(http_get_document))
        .route("/snippets", get(http_list_snippets).post(http_add_snippet))
        .route("/snippets/:id", get(http_get_snippet))
        .route("/snippets/:id/vote", post(http_vote_snippet))
        .route("/search", get(http_search_snippets))
}

pub(crate) fn status_for(code: ErrorCode) -> StatusCode {
    match code {
        ErrorCode::Unauthorized => StatusCode::UNAUTHORIZED,
        ErrorCode::Forbidden => StatusCode::FORBIDDEN,
        ErrorCode::NotFound => StatusCode::NOT_FOUND,
        ErrorCode::Validation => StatusCode::BAD_REQUEST,
        ErrorCode::RateLimited => StatusCode::TOO_MANY_REQUESTS,
        ErrorCode::Transport => StatusCode::BAD_GATEWAY,
        ErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn reject(error: ApiError) -> (StatusCode, Json<ApiError>) {
    (status_for(error.code), Json(error))
}

async fn http_get_document(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> ApiResult<Document> {
    let document = server_api::get_document(&state.api, &name)
        .await
        .map_err(reject)?;
    Ok(Json(document))
}

async fn http_list_snippets(State(state): State<Arc<AppState>>) -> ApiResult<Vec<Snippet>> {
    let snippets = server_api::list_snippets(&state.api).await.map_err(reject)?;
    Ok(Json(snippets))
}

async fn http_get_snippet(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Snippet> {
    let snippet = server_api::get_snippet(&state.api, &SnippetId::new(id))
        .await
        .map_err(reject)?;
    Ok(Json(snippet))
}

async fn http_search_snippets(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SearchQuery>,
) -> ApiResult<Vec<Snippet>> {
    let snippets = server_api::search_snippets(&state.api, &query.q)
        .await
        .map_err(reject)?;
    Ok(Json(snippets))
}

async fn http_vote_snippet(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<VoteRequest>,
) -> ApiResult<Snippet> {
    let snippet = server_api::vote_snippet(&state.api, &req.user_name, &SnippetId::new(id))
        .await
        .map_err(reject)?;
    Ok(Json(snippet))
}

async fn http_add_snippet(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AddSnippetRequest>,
) -> ApiResult<Snippet> {
    let draft = SnippetDraft {
        title: req.title,
        body: req.body,
    };
    let snippet = server_api::add_snippet(&state.api, &req.user_name, &draft)
        .await
        .map_err(reject)?;
    Ok(Json(snippet))
}

#[cfg(test)]
#[path = "tests/mod_tests.rs"]
mod tests;
