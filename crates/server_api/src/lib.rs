use shared::{
    domain::{Document, Snippet, SnippetDraft, SnippetId},
    error::{ApiError, ErrorCode},
};
use storage::Storage;

pub const MAX_SNIPPET_BODY_BYTES: usize = 16 * 1024;
pub const MAX_SNIPPET_TITLE_CHARS: usize = 120;
pub const TOP_SNIPPETS_LIMIT: u32 = 50;
pub const SEARCH_RESULTS_LIMIT: u32 = 50;

#[derive(Clone)]
pub struct ApiContext {
    pub storage: Storage,
}

pub async fn get_document(ctx: &ApiContext, name: &str) -> Result<Document, ApiError> {
    ctx.storage
        .get_document(name)
        .await
        .map_err(internal)?
        .ok_or_else(|| ApiError::not_found(format!("document '{name}' not found")))
}

pub async fn get_snippet(ctx: &ApiContext, id: &SnippetId) -> Result<Snippet, ApiError> {
    ctx.storage
        .get_snippet(id)
        .await
        .map_err(internal)?
        .ok_or_else(|| snippet_not_found(id))
}

pub async fn list_snippets(ctx: &ApiContext) -> Result<Vec<Snippet>, ApiError> {
    ctx.storage
        .list_top_snippets(TOP_SNIPPETS_LIMIT)
        .await
        .map_err(internal)
}

pub async fn search_snippets(ctx: &ApiContext, query: &str) -> Result<Vec<Snippet>, ApiError> {
    if query.trim().is_empty() {
        return Ok(Vec::new());
    }
    ctx.storage
        .search_snippets(query, SEARCH_RESULTS_LIMIT)
        .await
        .map_err(internal)
}

pub async fn vote_snippet(
    ctx: &ApiContext,
    user_name: &str,
    id: &SnippetId,
) -> Result<Snippet, ApiError> {
    let user_name = require_user(user_name)?;
    let outcome = ctx
        .storage
        .record_vote(id, user_name)
        .await
        .map_err(internal)?
        .ok_or_else(|| snippet_not_found(id))?;
    if !outcome.counted {
        tracing::debug!(snippet_id = %id, user_name, "repeat vote ignored");
    }
    Ok(outcome.snippet)
}

pub async fn add_snippet(
    ctx: &ApiContext,
    user_name: &str,
    draft: &SnippetDraft,
) -> Result<Snippet, ApiError> {
    let user_name = require_user(user_name)?;
    validate_draft(draft)?;
    let snippet = ctx
        .storage
        .insert_snippet(user_name, draft.title.trim(), &draft.body)
        .await
        .map_err(internal)?;
    tracing::info!(snippet_id = %snippet.id, author = user_name, "snippet added");
    Ok(snippet)
}

fn require_user(user_name: &str) -> Result<&str, ApiError> {
    let user_name = user_name.trim();
    if user_name.is_empty() {
        return Err(ApiError::new(ErrorCode::Unauthorized, "login required"));
    }
    Ok(user_name)
}

fn validate_draft(draft: &SnippetDraft) -> Result<(), ApiError> {
    if draft.body.trim().is_empty() {
        return Err(ApiError::validation("snippet body must not be empty"));
    }
    if draft.body.len() > MAX_SNIPPET_BODY_BYTES {
        return Err(ApiError::validation(format!(
            "snippet body exceeds {MAX_SNIPPET_BODY_BYTES} bytes"
        )));
    }
    if draft.title.trim().chars().count() > MAX_SNIPPET_TITLE_CHARS {
        return Err(ApiError::validation(format!(
            "snippet title exceeds {MAX_SNIPPET_TITLE_CHARS} characters"
        )));
    }
    Ok(())
}

fn snippet_not_found(id: &SnippetId) -> ApiError {
    ApiError::not_found(format!("snippet '{id}' not found"))
}

fn internal(err: anyhow::Error) -> ApiError {
    tracing::error!(error = %err, "storage operation failed");
    ApiError::new(ErrorCode::Internal, err.to_string())
}
