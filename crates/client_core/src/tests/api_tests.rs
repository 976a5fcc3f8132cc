use axum::{
    extract::{Path, Query},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use shared::{
    domain::{Snippet, SnippetDraft, SnippetId},
    error::{ApiError, ErrorCode},
    protocol::{AddSnippetRequest, SearchQuery},
};
use tokio::net::TcpListener;

use super::*;

fn sample(id: &str, author: &str) -> Snippet {
    Snippet {
        id: SnippetId::new(id),
        title: "sample".to_string(),
        body: "println!(\"hi\")".to_string(),
        author: author.to_string(),
        votes: 3,
        created_at: Utc::now(),
    }
}

async fn get_snippet(
    Path(id): Path<String>,
) -> Result<Json<Snippet>, (StatusCode, Json<ApiError>)> {
    if id == "s1" || id == "x?y/z" {
        Ok(Json(sample(&id, "alice")))
    } else {
        Err((
            StatusCode::NOT_FOUND,
            Json(ApiError::not_found("snippet not found")),
        ))
    }
}

async fn search(Query(query): Query<SearchQuery>) -> Json<Vec<Snippet>> {
    Json(vec![sample(&format!("hit-{}", query.q), "alice")])
}

async fn add(Json(req): Json<AddSnippetRequest>) -> Json<Snippet> {
    let mut snippet = sample("created", &req.user_name);
    snippet.body = req.body;
    Json(snippet)
}

async fn broken() -> (StatusCode, &'static str) {
    (StatusCode::SERVICE_UNAVAILABLE, "upstream down")
}

async fn spawn_server() -> String {
    let app = Router::new()
        .route("/api/snippets/:id", get(get_snippet))
        .route("/api/snippets", post(add).get(broken))
        .route("/api/search", get(search));
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve");
    });
    format!("http://{addr}")
}

#[tokio::test]
async fn http_api_decodes_success_bodies() {
    let api = HttpSnippetApi::new(spawn_server().await);

    let snippet = api
        .get_snippet(&SnippetId::new("s1"))
        .await
        .expect("snippet");
    assert_eq!(snippet.author, "alice");

    let hits = api.search_snippets("rust").await.expect("search");
    assert_eq!(hits[0].id, SnippetId::new("hit-rust"));

    let created = api
        .add_snippet(
            "bob",
            &SnippetDraft {
                title: String::new(),
                body: "new body".to_string(),
            },
        )
        .await
        .expect("add");
    assert_eq!(created.author, "bob");
    assert_eq!(created.body, "new body");
}

#[tokio::test]
async fn http_api_keeps_reserved_characters_inside_the_id_segment() {
    let api = HttpSnippetApi::new(spawn_server().await);

    let snippet = api
        .get_snippet(&SnippetId::new("x?y/z"))
        .await
        .expect("snippet");
    assert_eq!(snippet.id, SnippetId::new("x?y/z"));

    // `..` would otherwise normalise to the list endpoint, which fails with 503.
    let err = api
        .get_snippet(&SnippetId::new(".."))
        .await
        .expect_err("dot segment");
    assert_eq!(err.code, ErrorCode::NotFound);
}

#[tokio::test]
async fn http_api_surfaces_server_errors_as_api_errors() {
    let api = HttpSnippetApi::new(spawn_server().await);

    let err = api
        .get_snippet(&SnippetId::new("nope"))
        .await
        .expect_err("missing snippet");
    assert_eq!(err.code, ErrorCode::NotFound);
    assert_eq!(err.message, "snippet not found");

    let err = api.list_snippets().await.expect_err("plain text failure");
    assert_eq!(err.code, ErrorCode::Internal);
}

#[tokio::test]
async fn http_api_reports_unreachable_server_as_transport_error() {
    let api = HttpSnippetApi::new("http://127.0.0.1:1");
    let err = api.list_snippets().await.expect_err("unreachable");
    assert_eq!(err.code, ErrorCode::Transport);
}
