use chrono::NaiveDate;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Database-specific errors with user-friendly messages
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Another instance of the application has locked the database
    #[error("Another instance of newswire appears to be running. Please close it and try again.")]
    InstanceLocked,

    /// Migration failed
    #[error("Database migration failed: {0}")]
    Migration(String),

    /// Generic database error
    #[error("Database error: {0}")]
    Other(#[from] sqlx::Error),
}

impl DatabaseError {
    /// Check if a sqlx error indicates database locking
    pub(crate) fn from_sqlx(err: sqlx::Error) -> Self {
        let error_string = err.to_string().to_lowercase();

        // SQLITE_BUSY (5), SQLITE_LOCKED (6), SQLITE_CANTOPEN (14)
        if error_string.contains("database is locked")
            || error_string.contains("database table is locked")
            || error_string.contains("sqlite_busy")
            || error_string.contains("sqlite_locked")
            || error_string.contains("unable to open database file")
        {
            return DatabaseError::InstanceLocked;
        }

        DatabaseError::Other(err)
    }
}

// ============================================================================
// Stored Rows
// ============================================================================

/// Article row as persisted.
///
/// Timestamps (`published_at`, `created_at`, `updated_at`) are unix seconds.
/// `provider_id` holds the second element of the identity key: the upstream
/// external id when the provider supplies one, otherwise the title-derived
/// slug.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct StoredArticle {
    pub id: i64,
    pub slug: String,
    pub provider: String,
    pub provider_id: String,
    pub title: String,
    pub description: Option<String>,
    pub content: String,
    pub keywords: Option<String>,
    pub language: Option<String>,
    pub link: String,
    pub image_url: Option<String>,
    pub source_id: Option<i64>,
    pub author_id: Option<i64>,
    pub category_id: Option<i64>,
    pub published_at: i64,
    pub created_at: i64,
    pub updated_at: i64,
}

/// One row of a dimension table (source, author, or category).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct DimensionEntry {
    pub id: i64,
    pub key: String,
    pub label: String,
}

// ============================================================================
// Pagination Envelope
// ============================================================================

/// One page of results plus its pagination metadata.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub data: Vec<T>,
    pub meta: PageMeta,
}

/// Pagination metadata in the conventional list envelope.
///
/// `from` and `to` are 1-based ordinals of the first and last item on the
/// page within the full filtered result, or `None` when the page is empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageMeta {
    pub current_page: u32,
    pub from: Option<i64>,
    pub last_page: u32,
    pub per_page: u32,
    pub to: Option<i64>,
    pub total: i64,
}

impl PageMeta {
    /// Envelope math for a page holding `rows_on_page` of `total` rows.
    /// `per_page` must already be normalized to at least 1.
    pub(crate) fn compute(page: u32, per_page: u32, total: i64, rows_on_page: usize) -> Self {
        let last_page = ((total + per_page as i64 - 1) / per_page as i64).max(1) as u32;
        let offset = (page as i64 - 1) * per_page as i64;
        let (from, to) = if rows_on_page == 0 {
            (None, None)
        } else {
            (Some(offset + 1), Some(offset + rows_on_page as i64))
        };
        Self {
            current_page: page,
            from,
            last_page,
            per_page,
            to,
            total,
        }
    }
}

// ============================================================================
// Query Filters
// ============================================================================

/// Filter set for article listing queries.
///
/// Empty id vectors and `None` fields mean "no constraint". `page` and
/// `per_page` are normalized when the query runs: zero values fall back to
/// the defaults, and `per_page` is capped.
#[derive(Debug, Clone, Default)]
pub struct ArticleFilter {
    pub category_ids: Vec<i64>,
    pub author_ids: Vec<i64>,
    pub source_ids: Vec<i64>,
    /// Matches the whole calendar day, UTC
    pub publish_date: Option<NaiveDate>,
    /// Full-text prefix search over title, description, keywords, content
    pub search: Option<String>,
    pub page: u32,
    pub per_page: u32,
}
