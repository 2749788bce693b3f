use anyhow::Result;
use chrono::Utc;
use sqlx::QueryBuilder;

use super::dimensions::Dimension;
use super::schema::Database;
use crate::provider::record::{Facet, NormalizedArticle};
use crate::util::slugify;

impl Database {
    // ========================================================================
    // Upsert Engine
    // ========================================================================

    /// Reconcile one normalized record against stored state and return the
    /// row id.
    ///
    /// The row is located by the identity pair (provider, external id or
    /// title slug). A hit updates in place: the mandatory core columns are
    /// overwritten unconditionally, optional columns only when the record
    /// carries the facet, and the slug and `created_at` are never touched.
    /// A miss inserts with a provisional title slug, then rewrites it to
    /// `"{id}-{slug}"` once the surrogate id is known, which keeps slugs
    /// globally unique even when titles repeat.
    ///
    /// # Errors
    ///
    /// Returns an error on constraint violations or store failures. Callers
    /// treat this as a per-record failure: log and continue with the next
    /// record.
    pub async fn save_article(&self, record: &NormalizedArticle) -> Result<i64> {
        let identity = record.identity();
        let now = Utc::now().timestamp();

        let source_id = match record.source.value() {
            Some(source) => Some(
                self.find_or_create_dimension(Dimension::Source, &source.key, &source.name)
                    .await?,
            ),
            None => None,
        };
        let author_id = self
            .resolve_labeled_dimension(Dimension::Author, &record.author_name)
            .await?;
        let category_id = self
            .resolve_labeled_dimension(Dimension::Category, &record.category)
            .await?;

        let existing: Option<(i64,)> =
            sqlx::query_as("SELECT id FROM articles WHERE provider = ? AND provider_id = ?")
                .bind(record.provider.as_str())
                .bind(&identity)
                .fetch_optional(&self.pool)
                .await?;

        if let Some((id,)) = existing {
            self.update_article(id, record, source_id, author_id, category_id, now)
                .await?;
            return Ok(id);
        }

        self.insert_article(
            record,
            &identity,
            source_id,
            author_id.flatten(),
            category_id.flatten(),
            now,
        )
        .await
    }

    /// Dimension resolution for a nullable labeled facet.
    ///
    /// Outer `None` means the facet is absent (leave the FK untouched);
    /// `Some(None)` means clear the FK. A label that slugs down to nothing
    /// cannot form a natural key and clears as well.
    async fn resolve_labeled_dimension(
        &self,
        dimension: Dimension,
        facet: &Facet<Option<String>>,
    ) -> Result<Option<Option<i64>>> {
        match facet {
            Facet::Absent => Ok(None),
            Facet::Value(None) => Ok(Some(None)),
            Facet::Value(Some(label)) => {
                let key = slugify(label);
                if key.is_empty() {
                    return Ok(Some(None));
                }
                let id = self.find_or_create_dimension(dimension, &key, label).await?;
                Ok(Some(Some(id)))
            }
        }
    }

    async fn update_article(
        &self,
        id: i64,
        record: &NormalizedArticle,
        source_id: Option<i64>,
        author_id: Option<Option<i64>>,
        category_id: Option<Option<i64>>,
        now: i64,
    ) -> Result<()> {
        let mut qb: QueryBuilder<sqlx::Sqlite> = QueryBuilder::new("UPDATE articles SET ");
        let mut set = qb.separated(", ");
        set.push("title = ").push_bind_unseparated(&record.title);
        set.push("content = ").push_bind_unseparated(&record.content);
        set.push("link = ").push_bind_unseparated(&record.link);
        set.push("published_at = ")
            .push_bind_unseparated(record.published_at.timestamp());
        set.push("updated_at = ").push_bind_unseparated(now);
        if let Facet::Value(description) = &record.description {
            set.push("description = ").push_bind_unseparated(description);
        }
        if let Facet::Value(keywords) = &record.keywords {
            set.push("keywords = ").push_bind_unseparated(keywords);
        }
        if let Facet::Value(language) = &record.language {
            set.push("language = ").push_bind_unseparated(language);
        }
        if let Facet::Value(image_url) = &record.image_url {
            set.push("image_url = ")
                .push_bind_unseparated(image_url.as_deref());
        }
        if let Some(source_id) = source_id {
            set.push("source_id = ").push_bind_unseparated(source_id);
        }
        if let Some(author_id) = author_id {
            set.push("author_id = ").push_bind_unseparated(author_id);
        }
        if let Some(category_id) = category_id {
            set.push("category_id = ").push_bind_unseparated(category_id);
        }
        qb.push(" WHERE id = ").push_bind(id);

        qb.build().execute(&self.pool).await?;
        Ok(())
    }

    async fn insert_article(
        &self,
        record: &NormalizedArticle,
        identity: &str,
        source_id: Option<i64>,
        author_id: Option<i64>,
        category_id: Option<i64>,
        now: i64,
    ) -> Result<i64> {
        let slug = slugify(&record.title);
        let image_url = match &record.image_url {
            Facet::Value(url) => url.as_deref(),
            Facet::Absent => None,
        };

        let (id, stored_slug): (i64, String) = sqlx::query_as(
            r#"
            INSERT INTO articles (slug, provider, provider_id, title, description, content,
                                  keywords, language, link, image_url, source_id, author_id,
                                  category_id, published_at, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING id, slug
        "#,
        )
        .bind(&slug)
        .bind(record.provider.as_str())
        .bind(identity)
        .bind(&record.title)
        .bind(record.description.value().map(String::as_str))
        .bind(&record.content)
        .bind(record.keywords.value().map(String::as_str))
        .bind(record.language.value().map(String::as_str))
        .bind(&record.link)
        .bind(image_url)
        .bind(source_id)
        .bind(author_id)
        .bind(category_id)
        .bind(record.published_at.timestamp())
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        // Second pass of slug assignment: the unique slug had to be chosen
        // before the surrogate id existed. Prefixing with the id makes it
        // globally unique; skipped when the title slug already leads with
        // the id, and never re-run on updates.
        if !stored_slug.starts_with(&id.to_string()) {
            let prefixed = format!("{}-{}", id, stored_slug);
            sqlx::query("UPDATE articles SET slug = ? WHERE id = ?")
                .bind(&prefixed)
                .bind(id)
                .execute(&self.pool)
                .await?;
        }

        Ok(id)
    }
}
