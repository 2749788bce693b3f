use anyhow::Result;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    SqlitePool,
};
use std::str::FromStr;
use std::time::Duration;

use super::types::DatabaseError;

// ============================================================================
// Database
// ============================================================================

#[derive(Clone)]
pub struct Database {
    pub(crate) pool: SqlitePool,
}

impl Database {
    /// Open a database connection and run migrations
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::InstanceLocked` if another instance of
    /// newswire has the database locked (SQLITE_BUSY, SQLITE_LOCKED,
    /// SQLITE_CANTOPEN). Returns `DatabaseError::Other` for other database
    /// errors.
    pub async fn open(path: &str) -> Result<Self, DatabaseError> {
        let url = format!("sqlite:{}?mode=rwc", path);

        // busy_timeout=5000: SQLite waits up to 5 seconds for locks to
        // release before returning SQLITE_BUSY, which absorbs transient
        // contention between concurrent provider runs. Setting pragmas via
        // the connect options makes every pooled connection inherit them.
        let options = SqliteConnectOptions::from_str(&url)
            .map_err(DatabaseError::from_sqlx)?
            .pragma("busy_timeout", "5000")
            .pragma("foreign_keys", "ON");
        // SQLite is single-writer; 5 connections covers the concurrent
        // provider runs plus read queries. ":memory:" must stay on one
        // connection, since every new connection would open its own empty
        // database.
        let max_connections = if path == ":memory:" { 1 } else { 5 };
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(10))
            .connect_with(options)
            .await
            .map_err(DatabaseError::from_sqlx)?;
        let db = Self { pool };
        db.migrate().await.map_err(|e| {
            // Migration errors can also be lock-related
            let error_string = e.to_string().to_lowercase();
            if error_string.contains("database is locked")
                || error_string.contains("database table is locked")
                || error_string.contains("sqlite_busy")
                || error_string.contains("sqlite_locked")
            {
                DatabaseError::InstanceLocked
            } else {
                DatabaseError::Migration(e.to_string())
            }
        })?;
        Ok(db)
    }

    /// Run database migrations atomically within a transaction.
    ///
    /// All schema statements use `IF NOT EXISTS`, so re-running against an
    /// existing database is a no-op; a failure mid-way rolls the whole
    /// migration back.
    async fn migrate(&self) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        // Dimension tables, one per deduplicated reference entity. Rows are
        // created lazily on first reference and never updated or deleted by
        // the pipeline.
        for table in ["sources", "authors", "categories"] {
            sqlx::query(&format!(
                r#"
                CREATE TABLE IF NOT EXISTS {} (
                    id INTEGER PRIMARY KEY,
                    key TEXT UNIQUE NOT NULL,
                    label TEXT NOT NULL
                )
            "#,
                table
            ))
            .execute(&mut *tx)
            .await?;
        }

        // (provider, provider_id) is the identity pair reconciled on every
        // ingestion run; slug carries its own global uniqueness.
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS articles (
                id INTEGER PRIMARY KEY,
                slug TEXT UNIQUE NOT NULL,
                provider TEXT NOT NULL,
                provider_id TEXT NOT NULL,
                title TEXT NOT NULL,
                description TEXT,
                content TEXT NOT NULL,
                keywords TEXT,
                language TEXT,
                link TEXT NOT NULL,
                image_url TEXT,
                source_id INTEGER REFERENCES sources(id),
                author_id INTEGER REFERENCES authors(id),
                category_id INTEGER REFERENCES categories(id),
                published_at INTEGER NOT NULL,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL,
                UNIQUE(provider, provider_id)
            )
        "#,
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_articles_published ON articles(published_at DESC)",
        )
        .execute(&mut *tx)
        .await?;
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_articles_source ON articles(source_id)")
            .execute(&mut *tx)
            .await?;
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_articles_author ON articles(author_id)")
            .execute(&mut *tx)
            .await?;
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_articles_category ON articles(category_id)")
            .execute(&mut *tx)
            .await?;

        // External-content FTS5 table over the searchable text columns,
        // kept in sync by triggers.
        sqlx::query(
            r#"
            CREATE VIRTUAL TABLE IF NOT EXISTS articles_fts
            USING fts5(title, description, keywords, content, content=articles, content_rowid=id)
        "#,
        )
        .execute(&mut *tx)
        .await?;

        // Backfill the index when it is empty but articles exist (schema
        // upgrades on a populated database).
        let fts_count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM articles_fts")
            .fetch_one(&mut *tx)
            .await?;
        if fts_count.0 == 0 {
            let article_count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM articles")
                .fetch_one(&mut *tx)
                .await?;
            if article_count.0 > 0 {
                sqlx::query(
                    r#"
                    INSERT INTO articles_fts(rowid, title, description, keywords, content)
                    SELECT id, title, description, keywords, content FROM articles
                "#,
                )
                .execute(&mut *tx)
                .await?;
            }
        }

        // Sync triggers
        sqlx::query(
            r#"
            CREATE TRIGGER IF NOT EXISTS articles_fts_insert AFTER INSERT ON articles BEGIN
                INSERT INTO articles_fts(rowid, title, description, keywords, content)
                VALUES (new.id, new.title, new.description, new.keywords, new.content);
            END
        "#,
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            CREATE TRIGGER IF NOT EXISTS articles_fts_delete AFTER DELETE ON articles BEGIN
                INSERT INTO articles_fts(articles_fts, rowid, title, description, keywords, content)
                VALUES ('delete', old.id, old.title, old.description, old.keywords, old.content);
            END
        "#,
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            CREATE TRIGGER IF NOT EXISTS articles_fts_update AFTER UPDATE ON articles BEGIN
                INSERT INTO articles_fts(articles_fts, rowid, title, description, keywords, content)
                VALUES ('delete', old.id, old.title, old.description, old.keywords, old.content);
                INSERT INTO articles_fts(rowid, title, description, keywords, content)
                VALUES (new.id, new.title, new.description, new.keywords, new.content);
            END
        "#,
        )
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(())
    }
}
