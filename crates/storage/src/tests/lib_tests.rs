use super::*;

#[tokio::test]
async fn health_check_succeeds_for_live_pool() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    storage.health_check().await.expect("health check");
}

#[tokio::test]
async fn creates_database_file_when_missing() {
    let suffix = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("clock")
        .as_nanos();
    let temp_root = std::env::temp_dir().join(format!("snippets_storage_test_{suffix}"));
    let db_path = temp_root.join("nested").join("storage.db");
    let database_url = format!("sqlite://{}", db_path.to_string_lossy().replace('\\', "/"));

    let storage = Storage::new(&database_url).await.expect("db");
    drop(storage);

    assert!(
        db_path.exists(),
        "database file should exist: {}",
        db_path.display()
    );

    std::fs::remove_dir_all(temp_root).expect("cleanup");
}

#[tokio::test]
async fn inserted_snippet_round_trips_through_lookup() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    let stored = storage
        .insert_snippet("alice", "hello", "fn main() {}")
        .await
        .expect("insert");
    assert_eq!(stored.votes, 0);

    let loaded = storage
        .get_snippet(&stored.id)
        .await
        .expect("lookup")
        .expect("present");
    assert_eq!(loaded.id, stored.id);
    assert_eq!(loaded.author, "alice");
    assert_eq!(loaded.body, "fn main() {}");

    let missing = storage
        .get_snippet(&SnippetId::new("nope"))
        .await
        .expect("lookup");
    assert!(missing.is_none());
}

#[tokio::test]
async fn votes_are_counted_once_per_user() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    let snippet = storage
        .insert_snippet("alice", "", "let x = 1;")
        .await
        .expect("insert");

    let first = storage
        .record_vote(&snippet.id, "bob")
        .await
        .expect("vote")
        .expect("known snippet");
    assert!(first.counted);
    assert_eq!(first.snippet.votes, 1);

    let repeat = storage
        .record_vote(&snippet.id, "bob")
        .await
        .expect("vote")
        .expect("known snippet");
    assert!(!repeat.counted);
    assert_eq!(repeat.snippet.votes, 1);

    let other = storage
        .record_vote(&snippet.id, "carol")
        .await
        .expect("vote")
        .expect("known snippet");
    assert_eq!(other.snippet.votes, 2);

    let unknown = storage
        .record_vote(&SnippetId::new("missing"), "bob")
        .await
        .expect("vote");
    assert!(unknown.is_none());
}

#[tokio::test]
async fn top_snippets_are_ordered_by_votes_and_limited() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    let low = storage.insert_snippet("a", "low", "1").await.expect("low");
    let high = storage.insert_snippet("b", "high", "2").await.expect("high");
    let mid = storage.insert_snippet("c", "mid", "3").await.expect("mid");

    for user in ["u1", "u2", "u3"] {
        storage.record_vote(&high.id, user).await.expect("vote");
    }
    storage.record_vote(&mid.id, "u1").await.expect("vote");

    let top = storage.list_top_snippets(10).await.expect("list");
    let ids: Vec<_> = top.iter().map(|s| s.id.clone()).collect();
    assert_eq!(ids, vec![high.id.clone(), mid.id.clone(), low.id.clone()]);

    let limited = storage.list_top_snippets(2).await.expect("list");
    assert_eq!(limited.len(), 2);
    assert_eq!(limited[0].id, high.id);
}

#[tokio::test]
async fn search_matches_title_or_body_case_insensitively() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    let by_title = storage
        .insert_snippet("a", "Tokio Select", "loop {}")
        .await
        .expect("insert");
    let by_body = storage
        .insert_snippet("b", "misc", "tokio::spawn(async {})")
        .await
        .expect("insert");
    storage
        .insert_snippet("c", "unrelated", "println!()")
        .await
        .expect("insert");

    let hits = storage.search_snippets("TOKIO", 10).await.expect("search");
    let mut ids: Vec<_> = hits.into_iter().map(|s| s.id).collect();
    ids.sort();
    let mut expected = vec![by_title.id, by_body.id];
    expected.sort();
    assert_eq!(ids, expected);

    let literal = storage.search_snippets("%", 10).await.expect("search");
    assert!(literal.is_empty());

    let blank = storage.search_snippets("   ", 10).await.expect("search");
    assert!(blank.is_empty());
}

#[tokio::test]
async fn documents_are_upserted_by_name() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    assert!(storage.get_document("about").await.expect("get").is_none());

    storage
        .upsert_document("about", "About", "first")
        .await
        .expect("insert");
    storage
        .upsert_document("about", "About us", "second")
        .await
        .expect("update");

    let doc = storage
        .get_document("about")
        .await
        .expect("get")
        .expect("present");
    assert_eq!(doc.title, "About us");
    assert_eq!(doc.body, "second");
}

#[test]
fn sqlite_path_ignores_memory_and_non_sqlite_urls() {
    assert_eq!(sqlite_path("sqlite::memory:"), None);
    assert_eq!(sqlite_path("postgres://localhost/db"), None);
    assert_eq!(
        sqlite_path("sqlite://data/app.db?mode=rwc"),
        Some(PathBuf::from("data/app.db"))
    );
}
