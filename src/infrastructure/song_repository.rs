//! SQLite persistence for imported songs.
//!
//! One table keyed by the song's natural key, the source URL. Schema is
//! applied on startup with idempotent DDL so a fresh database file is
//! usable immediately.

use std::collections::HashSet;
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};
use tracing::info;

use crate::domain::ParsedSong;
use crate::scraping::import::SongStore;

const SCHEMA: &str = r"
CREATE TABLE IF NOT EXISTS songs (
    source_url TEXT PRIMARY KEY,
    title TEXT NOT NULL,
    author TEXT,
    composer TEXT,
    lyrics TEXT NOT NULL,
    is_public_domain INTEGER NOT NULL DEFAULT 1,
    tags TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_songs_title ON songs (title);
";

#[derive(Clone)]
pub struct SongRepository {
    pool: Arc<SqlitePool>,
}

impl SongRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    /// Open (and create if absent) the database file at `path`.
    pub async fn connect(path: &str) -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .with_context(|| format!("failed to open database at {path}"))?;
        info!("connected to song database at {path}");
        Ok(Self::new(pool))
    }

    pub async fn migrate(&self) -> Result<()> {
        sqlx::query(SCHEMA)
            .execute(self.pool.as_ref())
            .await
            .context("failed to apply song schema")?;
        Ok(())
    }

    pub async fn count(&self) -> Result<i64> {
        let row = sqlx::query("SELECT COUNT(*) as cnt FROM songs")
            .fetch_one(self.pool.as_ref())
            .await
            .context("failed to count songs")?;
        Ok(row.get("cnt"))
    }
}

#[async_trait]
impl SongStore for SongRepository {
    async fn existing_source_urls(&self) -> Result<HashSet<String>> {
        let rows = sqlx::query("SELECT source_url FROM songs")
            .fetch_all(self.pool.as_ref())
            .await
            .context("failed to load existing source urls")?;
        Ok(rows.iter().map(|row| row.get("source_url")).collect())
    }

    async fn insert(&self, song: &ParsedSong) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        sqlx::query(
            r"INSERT INTO songs
              (source_url, title, author, composer, lyrics, is_public_domain, tags, created_at, updated_at)
              VALUES (?, ?, ?, ?, ?, ?, NULL, ?, ?)",
        )
        .bind(&song.source_url)
        .bind(&song.title)
        .bind(&song.author)
        .bind(&song.composer)
        .bind(&song.lyrics)
        .bind(song.is_public_domain)
        .bind(&now)
        .bind(&now)
        .execute(self.pool.as_ref())
        .await
        .with_context(|| format!("failed to insert '{}'", song.title))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scraping::import::ImportSink;

    async fn memory_repository() -> SongRepository {
        // A pool larger than one connection would hand each connection its
        // own private in-memory database.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        let repo = SongRepository::new(pool);
        repo.migrate().await.unwrap();
        repo
    }

    fn song(title: &str, url: &str) -> ParsedSong {
        ParsedSong {
            title: title.to_string(),
            author: Some("Fanny Crosby".to_string()),
            composer: None,
            lyrics: format!("title: {title}\n\n# Verse 1\nline\n"),
            source_url: url.to_string(),
            is_public_domain: true,
        }
    }

    #[tokio::test]
    async fn migrate_is_idempotent() {
        let repo = memory_repository().await;
        repo.migrate().await.unwrap();
        assert_eq!(repo.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn inserted_songs_are_visible_in_the_key_set() {
        let repo = memory_repository().await;
        repo.insert(&song("Blessed Assurance", "https://x/1"))
            .await
            .unwrap();
        repo.insert(&song("To God Be the Glory", "https://x/2"))
            .await
            .unwrap();

        let keys = repo.existing_source_urls().await.unwrap();
        assert_eq!(keys.len(), 2);
        assert!(keys.contains("https://x/1"));
        assert_eq!(repo.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn duplicate_natural_key_is_rejected() {
        let repo = memory_repository().await;
        repo.insert(&song("A", "https://x/1")).await.unwrap();
        let err = repo.insert(&song("A again", "https://x/1")).await;
        assert!(err.is_err());
        assert_eq!(repo.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn import_sink_dedups_against_sqlite() {
        let repo = memory_repository().await;
        let sink = ImportSink::new(&repo);
        let batch = vec![song("A", "https://x/1"), song("B", "https://x/2")];

        let first = sink.import(&batch, false).await.unwrap();
        assert_eq!(first.inserted, 2);

        let second = sink.import(&batch, false).await.unwrap();
        assert_eq!(second.inserted, 0);
        assert_eq!(second.skipped, 2);
        assert_eq!(repo.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn dry_run_leaves_the_table_untouched() {
        let repo = memory_repository().await;
        let sink = ImportSink::new(&repo);
        let report = sink
            .import(&[song("A", "https://x/1")], true)
            .await
            .unwrap();
        assert_eq!(report.inserted, 0);
        assert_eq!(repo.count().await.unwrap(), 0);
    }
}
