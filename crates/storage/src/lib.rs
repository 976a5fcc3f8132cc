use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow},
    Pool, Row, Sqlite,
};
use std::{
    fs,
    path::{Path, PathBuf},
    str::FromStr,
};

use shared::domain::{Document, Snippet, SnippetId};

#[derive(Clone)]
pub struct Storage {
    pool: Pool<Sqlite>,
}

/// Outcome of a vote attempt against an existing snippet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoteOutcome {
    pub snippet: Snippet,
    /// False when this user had already voted and the tally was left alone.
    pub counted: bool,
}

impl Storage {
    pub async fn new(database_url: &str) -> Result<Self> {
        ensure_sqlite_parent_dir_exists(database_url)?;

        let connect_options = SqliteConnectOptions::from_str(database_url)
            .with_context(|| format!("invalid sqlite database url '{database_url}'"))?
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(connect_options)
            .await
            .with_context(|| format!("failed to connect to sqlite database '{database_url}'"))?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    pub async fn health_check(&self) -> Result<()> {
        sqlx::query_scalar::<_, i64>("SELECT 1")
            .fetch_one(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn insert_snippet(&self, author: &str, title: &str, body: &str) -> Result<Snippet> {
        let snippet = Snippet {
            id: SnippetId::generate(),
            title: title.to_string(),
            body: body.to_string(),
            author: author.to_string(),
            votes: 0,
            created_at: Utc::now(),
        };

        sqlx::query(
            "INSERT INTO snippets (id, title, body, author, votes, created_at) VALUES (?, ?, ?, ?, 0, ?)",
        )
        .bind(snippet.id.as_str())
        .bind(&snippet.title)
        .bind(&snippet.body)
        .bind(&snippet.author)
        .bind(snippet.created_at)
        .execute(&self.pool)
        .await?;

        tracing::debug!(snippet_id = %snippet.id, author, "stored snippet");
        Ok(snippet)
    }

    pub async fn get_snippet(&self, id: &SnippetId) -> Result<Option<Snippet>> {
        let row = sqlx::query(
            "SELECT id, title, body, author, votes, created_at FROM snippets WHERE id = ?",
        )
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(snippet_from_row).transpose()
    }

    /// Highest-voted snippets first, newest first among ties.
    pub async fn list_top_snippets(&self, limit: u32) -> Result<Vec<Snippet>> {
        let rows = sqlx::query(
            "SELECT id, title, body, author, votes, created_at FROM snippets
             ORDER BY votes DESC, created_at DESC LIMIT ?",
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(snippet_from_row).collect()
    }

    /// Case-insensitive substring match over title and body.
    pub async fn search_snippets(&self, query: &str, limit: u32) -> Result<Vec<Snippet>> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return Ok(Vec::new());
        }

        let rows = sqlx::query(
            "SELECT id, title, body, author, votes, created_at FROM snippets
             WHERE instr(lower(title), ?) > 0 OR instr(lower(body), ?) > 0
             ORDER BY votes DESC, created_at DESC LIMIT ?",
        )
        .bind(&needle)
        .bind(&needle)
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(snippet_from_row).collect()
    }

    /// Records one vote per user per snippet. Returns `None` for an unknown snippet.
    pub async fn record_vote(
        &self,
        id: &SnippetId,
        user_name: &str,
    ) -> Result<Option<VoteOutcome>> {
        let mut tx = self.pool.begin().await?;

        let exists = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM snippets WHERE id = ?")
            .bind(id.as_str())
            .fetch_one(&mut *tx)
            .await?;
        if exists == 0 {
            return Ok(None);
        }

        let inserted = sqlx::query(
            "INSERT OR IGNORE INTO snippet_votes (snippet_id, user_name) VALUES (?, ?)",
        )
        .bind(id.as_str())
        .bind(user_name)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        let counted = inserted > 0;
        if counted {
            sqlx::query("UPDATE snippets SET votes = votes + 1 WHERE id = ?")
                .bind(id.as_str())
                .execute(&mut *tx)
                .await?;
        }

        let row = sqlx::query(
            "SELECT id, title, body, author, votes, created_at FROM snippets WHERE id = ?",
        )
        .bind(id.as_str())
        .fetch_one(&mut *tx)
        .await?;
        let snippet = snippet_from_row(&row)?;
        tx.commit().await?;

        Ok(Some(VoteOutcome { snippet, counted }))
    }

    pub async fn upsert_document(&self, name: &str, title: &str, body: &str) -> Result<Document> {
        sqlx::query(
            "INSERT INTO documents (name, title, body, updated_at) VALUES (?, ?, ?, CURRENT_TIMESTAMP)
             ON CONFLICT(name) DO UPDATE SET
                title = excluded.title,
                body = excluded.body,
                updated_at = CURRENT_TIMESTAMP",
        )
        .bind(name)
        .bind(title)
        .bind(body)
        .execute(&self.pool)
        .await?;

        Ok(Document {
            name: name.to_string(),
            title: title.to_string(),
            body: body.to_string(),
        })
    }

    pub async fn get_document(&self, name: &str) -> Result<Option<Document>> {
        let row = sqlx::query("SELECT name, title, body FROM documents WHERE name = ?")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|r| Document {
            name: r.get::<String, _>(0),
            title: r.get::<String, _>(1),
            body: r.get::<String, _>(2),
        }))
    }
}

fn snippet_from_row(row: &SqliteRow) -> Result<Snippet> {
    Ok(Snippet {
        id: SnippetId::new(row.try_get::<String, _>(0)?),
        title: row.try_get::<String, _>(1)?,
        body: row.try_get::<String, _>(2)?,
        author: row.try_get::<String, _>(3)?,
        votes: row.try_get::<i64, _>(4)?,
        created_at: row.try_get::<DateTime<Utc>, _>(5)?,
    })
}

fn ensure_sqlite_parent_dir_exists(database_url: &str) -> Result<()> {
    let Some(path) = sqlite_path(database_url) else {
        return Ok(());
    };

    let Some(parent) = path.parent() else {
        return Ok(());
    };

    fs::create_dir_all(parent).with_context(|| {
        format!(
            "failed to create parent directory '{}' for database url '{database_url}'",
            parent.display()
        )
    })?;

    Ok(())
}

fn sqlite_path(database_url: &str) -> Option<PathBuf> {
    if database_url == "sqlite::memory:" || !database_url.starts_with("sqlite:") {
        return None;
    }

    let path = database_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:")
        .split('?')
        .next()
        .unwrap_or_default();

    if path.is_empty() {
        return None;
    }

    Some(Path::new(path).to_path_buf())
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
