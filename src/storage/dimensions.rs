use anyhow::Result;

use super::schema::Database;
use super::types::{DimensionEntry, Page, PageMeta};

/// The three deduplicated reference entities articles point at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dimension {
    Source,
    Author,
    Category,
}

impl Dimension {
    /// Table name; closed set, safe to interpolate into SQL.
    pub(crate) fn table(&self) -> &'static str {
        match self {
            Dimension::Source => "sources",
            Dimension::Author => "authors",
            Dimension::Category => "categories",
        }
    }
}

impl Database {
    // ========================================================================
    // Dimension Operations
    // ========================================================================

    /// Resolve a dimension row id by natural key, creating the row on first
    /// reference.
    ///
    /// Safe under concurrent provider runs racing on the same key: the
    /// insert either claims the key or silently loses to a concurrent
    /// writer, and the follow-up select reads whichever row won. The label
    /// is fixed at creation; later callers carrying a different label for
    /// the same key get the existing row unchanged.
    pub async fn find_or_create_dimension(
        &self,
        dimension: Dimension,
        key: &str,
        label: &str,
    ) -> Result<i64> {
        let insert = format!(
            "INSERT INTO {} (key, label) VALUES (?, ?) ON CONFLICT(key) DO NOTHING RETURNING id",
            dimension.table()
        );
        if let Some((id,)) = sqlx::query_as::<_, (i64,)>(&insert)
            .bind(key)
            .bind(label)
            .fetch_optional(&self.pool)
            .await?
        {
            return Ok(id);
        }

        let select = format!("SELECT id FROM {} WHERE key = ?", dimension.table());
        let (id,): (i64,) = sqlx::query_as(&select)
            .bind(key)
            .fetch_one(&self.pool)
            .await?;
        Ok(id)
    }

    /// List one dimension table, paginated in id order.
    pub async fn list_dimension(
        &self,
        dimension: Dimension,
        page: u32,
        per_page: u32,
    ) -> Result<Page<DimensionEntry>> {
        let (page, per_page) = super::queries::normalize_paging(page, per_page);

        let (total,): (i64,) =
            sqlx::query_as(&format!("SELECT COUNT(*) FROM {}", dimension.table()))
                .fetch_one(&self.pool)
                .await?;

        let rows: Vec<DimensionEntry> = sqlx::query_as(&format!(
            "SELECT id, key, label FROM {} ORDER BY id LIMIT ? OFFSET ?",
            dimension.table()
        ))
        .bind(per_page as i64)
        .bind((page as i64 - 1) * per_page as i64)
        .fetch_all(&self.pool)
        .await?;

        let meta = PageMeta::compute(page, per_page, total, rows.len());
        Ok(Page { data: rows, meta })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    async fn test_db() -> Database {
        Database::open(":memory:").await.unwrap()
    }

    #[tokio::test]
    async fn test_find_or_create_is_idempotent() {
        let db = test_db().await;

        let first = db
            .find_or_create_dimension(Dimension::Source, "bbc-news", "BBC News")
            .await
            .unwrap();
        let second = db
            .find_or_create_dimension(Dimension::Source, "bbc-news", "BBC News")
            .await
            .unwrap();

        assert_eq!(first, second);
        let page = db.list_dimension(Dimension::Source, 1, 10).await.unwrap();
        assert_eq!(page.meta.total, 1);
    }

    #[tokio::test]
    async fn test_find_or_create_keeps_first_label() {
        let db = test_db().await;

        let id = db
            .find_or_create_dimension(Dimension::Author, "jo-reporter", "Jo Reporter")
            .await
            .unwrap();
        let again = db
            .find_or_create_dimension(Dimension::Author, "jo-reporter", "JO REPORTER")
            .await
            .unwrap();
        assert_eq!(id, again);

        let page = db.list_dimension(Dimension::Author, 1, 10).await.unwrap();
        assert_eq!(page.data[0].label, "Jo Reporter");
    }

    #[tokio::test]
    async fn test_dimensions_are_separate_namespaces() {
        let db = test_db().await;

        db.find_or_create_dimension(Dimension::Source, "times", "Times")
            .await
            .unwrap();
        db.find_or_create_dimension(Dimension::Category, "times", "Times")
            .await
            .unwrap();

        assert_eq!(
            db.list_dimension(Dimension::Source, 1, 10)
                .await
                .unwrap()
                .meta
                .total,
            1
        );
        assert_eq!(
            db.list_dimension(Dimension::Category, 1, 10)
                .await
                .unwrap()
                .meta
                .total,
            1
        );
        assert_eq!(
            db.list_dimension(Dimension::Author, 1, 10)
                .await
                .unwrap()
                .meta
                .total,
            0
        );
    }

    #[tokio::test]
    async fn test_list_dimension_paginates_in_id_order() {
        let db = test_db().await;
        for i in 0..5 {
            db.find_or_create_dimension(
                Dimension::Category,
                &format!("cat-{}", i),
                &format!("Category {}", i),
            )
            .await
            .unwrap();
        }

        let page = db.list_dimension(Dimension::Category, 2, 2).await.unwrap();
        assert_eq!(page.data.len(), 2);
        assert_eq!(page.data[0].key, "cat-2");
        assert_eq!(page.meta.current_page, 2);
        assert_eq!(page.meta.from, Some(3));
        assert_eq!(page.meta.to, Some(4));
        assert_eq!(page.meta.last_page, 3);
        assert_eq!(page.meta.total, 5);
    }
}
