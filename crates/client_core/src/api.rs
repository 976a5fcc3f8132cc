//! The asynchronous API collaborator and its HTTP implementation.

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use shared::{
    domain::{Document, Snippet, SnippetDraft, SnippetId},
    error::{ApiError, ErrorCode},
    protocol::{encode_segment, is_dot_segment, AddSnippetRequest, VoteRequest, API_PREFIX},
};

#[async_trait]
pub trait SnippetApi: Send + Sync {
    async fn get_document(&self, name: &str) -> Result<Document, ApiError>;
    async fn get_snippet(&self, id: &SnippetId) -> Result<Snippet, ApiError>;
    async fn list_snippets(&self) -> Result<Vec<Snippet>, ApiError>;
    async fn search_snippets(&self, query: &str) -> Result<Vec<Snippet>, ApiError>;
    async fn vote_snippet(&self, user_name: &str, id: &SnippetId) -> Result<Snippet, ApiError>;
    async fn add_snippet(&self, user_name: &str, draft: &SnippetDraft)
        -> Result<Snippet, ApiError>;
}

pub struct MissingSnippetApi;

impl MissingSnippetApi {
    fn unavailable<T>() -> Result<T, ApiError> {
        Err(ApiError::new(ErrorCode::Transport, "snippet API unavailable"))
    }
}

#[async_trait]
impl SnippetApi for MissingSnippetApi {
    async fn get_document(&self, _name: &str) -> Result<Document, ApiError> {
        Self::unavailable()
    }

    async fn get_snippet(&self, _id: &SnippetId) -> Result<Snippet, ApiError> {
        Self::unavailable()
    }

    async fn list_snippets(&self) -> Result<Vec<Snippet>, ApiError> {
        Self::unavailable()
    }

    async fn search_snippets(&self, _query: &str) -> Result<Vec<Snippet>, ApiError> {
        Self::unavailable()
    }

    async fn vote_snippet(&self, _user_name: &str, _id: &SnippetId) -> Result<Snippet, ApiError> {
        Self::unavailable()
    }

    async fn add_snippet(
        &self,
        _user_name: &str,
        _draft: &SnippetDraft,
    ) -> Result<Snippet, ApiError> {
        Self::unavailable()
    }
}

pub struct HttpSnippetApi {
    http: Client,
    server_url: String,
}

impl HttpSnippetApi {
    pub fn new(server_url: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            server_url: server_url.into(),
        }
    }

    pub fn server_url(&self) -> &str {
        &self.server_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{API_PREFIX}{path}", self.server_url.trim_end_matches('/'))
    }
}

/// Encodes a caller-supplied id or name for use as one path segment.
fn segment(raw: &str) -> Result<String, ApiError> {
    if raw.is_empty() || is_dot_segment(raw) {
        return Err(ApiError::new(ErrorCode::NotFound, format!("no resource named `{raw}`")));
    }
    Ok(encode_segment(raw))
}

fn transport(err: reqwest::Error) -> ApiError {
    ApiError::new(ErrorCode::Transport, err.to_string())
}

fn code_for_status(status: StatusCode) -> ErrorCode {
    match status {
        StatusCode::UNAUTHORIZED => ErrorCode::Unauthorized,
        StatusCode::FORBIDDEN => ErrorCode::Forbidden,
        StatusCode::NOT_FOUND => ErrorCode::NotFound,
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => ErrorCode::Validation,
        StatusCode::TOO_MANY_REQUESTS => ErrorCode::RateLimited,
        _ => ErrorCode::Internal,
    }
}

/// Decodes a success body, or the server's `ApiError` body on failure.
async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
    let status = response.status();
    if status.is_success() {
        return response.json::<T>().await.map_err(transport);
    }

    let body = response.text().await.map_err(transport)?;
    Err(serde_json::from_str::<ApiError>(&body).unwrap_or_else(|_| {
        ApiError::new(
            code_for_status(status),
            format!("request failed with status {status}"),
        )
    }))
}

#[async_trait]
impl SnippetApi for HttpSnippetApi {
    async fn get_document(&self, name: &str) -> Result<Document, ApiError> {
        let response = self
            .http
            .get(self.endpoint(&format!("/documents/{}", segment(name)?)))
            .send()
            .await
            .map_err(transport)?;
        decode(response).await
    }

    async fn get_snippet(&self, id: &SnippetId) -> Result<Snippet, ApiError> {
        let response = self
            .http
            .get(self.endpoint(&format!("/snippets/{}", segment(id.as_str())?)))
            .send()
            .await
            .map_err(transport)?;
        decode(response).await
    }

    async fn list_snippets(&self) -> Result<Vec<Snippet>, ApiError> {
        let response = self
            .http
            .get(self.endpoint("/snippets"))
            .send()
            .await
            .map_err(transport)?;
        decode(response).await
    }

    async fn search_snippets(&self, query: &str) -> Result<Vec<Snippet>, ApiError> {
        let response = self
            .http
            .get(self.endpoint("/search"))
            .query(&[("q", query)])
            .send()
            .await
            .map_err(transport)?;
        decode(response).await
    }

    async fn vote_snippet(&self, user_name: &str, id: &SnippetId) -> Result<Snippet, ApiError> {
        let response = self
            .http
            .post(self.endpoint(&format!("/snippets/{}/vote", segment(id.as_str())?)))
            .json(&VoteRequest {
                user_name: user_name.to_string(),
            })
            .send()
            .await
            .map_err(transport)?;
        decode(response).await
    }

    async fn add_snippet(
        &self,
        user_name: &str,
        draft: &SnippetDraft,
    ) -> Result<Snippet, ApiError> {
        let response = self
            .http
            .post(self.endpoint("/snippets"))
            .json(&AddSnippetRequest {
                user_name: user_name.to_string(),
                title: draft.title.clone(),
                body: draft.body.clone(),
            })
            .send()
            .await
            .map_err(transport)?;
        decode(response).await
    }
}
