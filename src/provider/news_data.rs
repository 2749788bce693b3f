//! Adapter for newsdata.io.
//!
//! Cursor pagination: each response may carry a `nextPage` token that gets
//! passed back verbatim on the following request. The loop stops when the
//! token disappears, the configured page cap is reached, or a page fails.

use async_trait::async_trait;
use serde_json::Value;
use tracing::error;
use url::Url;

use super::connector::Connector;
use super::record::{Facet, MapError, NormalizedArticle, SourceRef};
use super::{store_entries, NewsProvider, ProviderKey, RunSummary};
use crate::storage::Database;

const AUTH_PARAM: &str = "apikey";
const ARTICLES_ENDPOINT: &str = "latest";
const LANGUAGE: &str = "en";

pub struct NewsDataProvider {
    connector: Connector,
    max_page: u32,
}

impl NewsDataProvider {
    pub fn new(client: reqwest::Client, base_url: Url, api_token: String, max_page: u32) -> Self {
        Self {
            connector: Connector::new(client, base_url, AUTH_PARAM, api_token),
            max_page,
        }
    }

    fn map_entry(entry: &Value) -> Result<NormalizedArticle, MapError> {
        let title = super::str_field(entry, "title")?.to_string();
        let content = super::str_field(entry, "content")?.to_string();
        let link = super::str_field(entry, "link")?.to_string();
        let published_at = super::parse_published(super::str_field(entry, "pubDate")?)?;

        let mut record =
            NormalizedArticle::new(ProviderKey::NewsData, title, content, link, published_at);

        if let Some(description) = super::opt_str_field(entry, "description") {
            record.description = Facet::Value(description);
        }
        if let Some(language) = super::opt_str_field(entry, "language") {
            record.language = Facet::Value(language);
        }
        record.image_url = Facet::Value(super::opt_str_field(entry, "image_url"));
        record.category = Facet::Value(parse_category(entry.get("category")));
        record.provider_id = Facet::Value(super::str_field(entry, "article_id")?.to_string());
        record.source = Facet::Value(SourceRef {
            key: super::str_field(entry, "source_id")?.to_string(),
            name: super::str_field(entry, "source_name")?.to_string(),
        });

        Ok(record)
    }
}

/// The category field arrives either as one string or as a list. Lists are
/// joined with spaces after dropping the catch-all "top" label; a list that
/// held nothing else yields no category at all.
fn parse_category(raw: Option<&Value>) -> Option<String> {
    match raw {
        Some(Value::String(s)) => Some(s.clone()),
        Some(Value::Array(items)) => {
            let joined = items
                .iter()
                .filter_map(Value::as_str)
                .filter(|c| *c != "top")
                .collect::<Vec<_>>()
                .join(" ");
            (!joined.is_empty()).then_some(joined)
        }
        _ => None,
    }
}

#[async_trait]
impl NewsProvider for NewsDataProvider {
    fn key(&self) -> ProviderKey {
        ProviderKey::NewsData
    }

    async fn run(&self, db: &Database) -> RunSummary {
        let mut summary = RunSummary::new(self.key());

        let mut cursor: Option<String> = None;
        let mut page_count: u32 = 0;

        loop {
            page_count += 1;
            if page_count > self.max_page {
                break;
            }

            let mut params = vec![("language", LANGUAGE.to_string())];
            if let Some(token) = &cursor {
                params.push(("page", token.clone()));
            }

            let response = self.connector.fetch(ARTICLES_ENDPOINT, &params).await;
            summary.pages += 1;
            if response.failed() {
                error!(
                    provider = %self.key(),
                    status = response.status,
                    error = %response.error_message(),
                    "Article page request failed; ending run"
                );
                break;
            }

            let entries = response.payload()["results"]
                .as_array()
                .cloned()
                .unwrap_or_default();
            store_entries(db, &mut summary, &entries, Self::map_entry).await;

            cursor = match &response.payload()["nextPage"] {
                Value::String(token) => Some(token.clone()),
                Value::Number(token) => Some(token.to_string()),
                _ => None,
            };
            if cursor.is_none() {
                break;
            }
        }

        summary
    }
}
