//! Adapter for newsapi.org.
//!
//! Two-phase fetch: one catalog request lists the English sources, then each
//! source gets its own article request. The catalog is load-bearing, so a
//! failure there aborts the run; a failure on an individual source only
//! skips that source.

use async_trait::async_trait;
use serde_json::Value;
use tracing::error;
use url::Url;

use super::connector::Connector;
use super::record::{Facet, MapError, NormalizedArticle, SourceRef};
use super::{store_entries, NewsProvider, ProviderKey, RunSummary};
use crate::storage::Database;
use crate::util::slugify;

const AUTH_PARAM: &str = "apiKey";
const CATALOG_ENDPOINT: &str = "top-headlines/sources";
const ARTICLES_ENDPOINT: &str = "everything";
const LANGUAGE: &str = "en";

pub struct NewsApiOrgProvider {
    connector: Connector,
}

impl NewsApiOrgProvider {
    pub fn new(client: reqwest::Client, base_url: Url, api_token: String) -> Self {
        Self {
            connector: Connector::new(client, base_url, AUTH_PARAM, api_token),
        }
    }

    fn map_entry(entry: &Value) -> Result<NormalizedArticle, MapError> {
        let title = super::str_field(entry, "title")?.to_string();
        let content = super::str_field(entry, "content")?.to_string();
        let link = super::str_field(entry, "url")?.to_string();
        let published_at = super::parse_published(super::str_field(entry, "publishedAt")?)?;

        let mut record = NormalizedArticle::new(
            ProviderKey::NewsApiOrg,
            title,
            content,
            link,
            published_at,
        );

        if let Some(description) = super::opt_str_field(entry, "description") {
            record.description = Facet::Value(description);
        }
        record.author_name = Facet::Value(super::opt_str_field(entry, "author"));
        record.image_url = Facet::Value(super::opt_str_field(entry, "urlToImage"));

        // The source block is usually present with an id; entries that lack
        // one fall back to a slug of the display name, and entries with no
        // name at all land under a shared "unknown" source.
        let source = entry.get("source");
        let name = source
            .and_then(|s| s.get("name"))
            .and_then(Value::as_str)
            .unwrap_or("Unknown");
        let key = source
            .and_then(|s| s.get("id"))
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| slugify(name));
        record.source = Facet::Value(SourceRef {
            key,
            name: name.to_string(),
        });

        Ok(record)
    }
}

#[async_trait]
impl NewsProvider for NewsApiOrgProvider {
    fn key(&self) -> ProviderKey {
        ProviderKey::NewsApiOrg
    }

    async fn run(&self, db: &Database) -> RunSummary {
        let mut summary = RunSummary::new(self.key());

        let catalog = self
            .connector
            .fetch(CATALOG_ENDPOINT, &[("language", LANGUAGE.to_string())])
            .await;
        summary.pages += 1;
        if catalog.failed() {
            error!(
                provider = %self.key(),
                status = catalog.status,
                error = %catalog.error_message(),
                "Source catalog request failed"
            );
            return summary;
        }

        let source_ids: Vec<String> = catalog.payload()["sources"]
            .as_array()
            .map(|sources| {
                sources
                    .iter()
                    .filter_map(|s| s.get("id").and_then(Value::as_str))
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        for source_id in &source_ids {
            let response = self
                .connector
                .fetch(
                    ARTICLES_ENDPOINT,
                    &[
                        ("sources", source_id.clone()),
                        ("language", LANGUAGE.to_string()),
                    ],
                )
                .await;
            summary.pages += 1;
            if response.failed() {
                error!(
                    provider = %self.key(),
                    source = %source_id,
                    status = response.status,
                    error = %response.error_message(),
                    "Article request failed; skipping source"
                );
                continue;
            }

            let entries = response.payload()["articles"]
                .as_array()
                .cloned()
                .unwrap_or_default();
            store_entries(db, &mut summary, &entries, Self::map_entry).await;
        }

        summary
    }
}
