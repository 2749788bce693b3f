use anyhow::Result;
use chrono::NaiveTime;
use sqlx::QueryBuilder;

use super::schema::Database;
use super::types::{ArticleFilter, Page, PageMeta, StoredArticle};

// ============================================================================
// Paging Limits
// ============================================================================

/// Page size when the caller does not ask for one
pub(crate) const DEFAULT_PER_PAGE: u32 = 50;

/// Hard cap on page size
pub(crate) const MAX_PER_PAGE: u32 = 100;

/// Clamp raw paging inputs: zero page means the first page, zero per_page
/// means the default, and per_page never exceeds the cap.
pub(crate) fn normalize_paging(page: u32, per_page: u32) -> (u32, u32) {
    let page = page.max(1);
    let per_page = if per_page == 0 {
        DEFAULT_PER_PAGE
    } else {
        per_page.min(MAX_PER_PAGE)
    };
    (page, per_page)
}

const ARTICLE_COLUMNS: &str = "id, slug, provider, provider_id, title, description, content, \
                               keywords, language, link, image_url, source_id, author_id, \
                               category_id, published_at, created_at, updated_at";

impl Database {
    // ========================================================================
    // Article Queries
    // ========================================================================

    /// Paginated article listing with the filter set applied, newest first.
    pub async fn list_articles(&self, filter: &ArticleFilter) -> Result<Page<StoredArticle>> {
        let (page, per_page) = normalize_paging(filter.page, filter.per_page);

        let mut count: QueryBuilder<sqlx::Sqlite> =
            QueryBuilder::new("SELECT COUNT(*) FROM articles");
        apply_filters(&mut count, filter);
        let (total,): (i64,) = count.build_query_as().fetch_one(&self.pool).await?;

        let mut select: QueryBuilder<sqlx::Sqlite> =
            QueryBuilder::new(format!("SELECT {} FROM articles", ARTICLE_COLUMNS));
        apply_filters(&mut select, filter);
        select.push(" ORDER BY published_at DESC, id DESC LIMIT ");
        select.push_bind(per_page as i64);
        select.push(" OFFSET ");
        select.push_bind((page as i64 - 1) * per_page as i64);

        let rows: Vec<StoredArticle> = select.build_query_as().fetch_all(&self.pool).await?;

        let meta = PageMeta::compute(page, per_page, total, rows.len());
        Ok(Page { data: rows, meta })
    }

    /// Get a single article by id.
    pub async fn get_article(&self, id: i64) -> Result<Option<StoredArticle>> {
        let row = sqlx::query_as::<_, StoredArticle>(&format!(
            "SELECT {} FROM articles WHERE id = ?",
            ARTICLE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }
}

/// Append the filter's WHERE clauses to a query that already names its
/// FROM. Shared by the count and select queries so both see identical
/// constraints.
fn apply_filters(query: &mut QueryBuilder<sqlx::Sqlite>, filter: &ArticleFilter) {
    query.push(" WHERE 1=1");

    push_id_set(query, "category_id", &filter.category_ids);
    push_id_set(query, "author_id", &filter.author_ids);
    push_id_set(query, "source_id", &filter.source_ids);

    if let Some(date) = filter.publish_date {
        // Whole calendar day in UTC: [midnight, next midnight).
        let start = date.and_time(NaiveTime::MIN).and_utc().timestamp();
        query.push(" AND published_at >= ").push_bind(start);
        query.push(" AND published_at < ").push_bind(start + 86_400);
    }

    if let Some(term) = filter.search.as_deref() {
        let term = term.trim();
        if !term.is_empty() {
            query.push(" AND id IN (SELECT rowid FROM articles_fts WHERE articles_fts MATCH ");
            query.push_bind(fts_prefix_query(term));
            query.push(")");
        }
    }
}

fn push_id_set(query: &mut QueryBuilder<sqlx::Sqlite>, column: &str, ids: &[i64]) {
    if ids.is_empty() {
        return;
    }
    query.push(format!(" AND {} IN (", column));
    let mut separated = query.separated(", ");
    for id in ids {
        separated.push_bind(*id);
    }
    query.push(")");
}

/// Quote the term as an FTS5 phrase with a trailing prefix wildcard.
/// Embedded quotes are doubled so arbitrary input cannot change the query
/// structure.
fn fts_prefix_query(term: &str) -> String {
    format!("\"{}\"*", term.replace('"', "\"\""))
}
