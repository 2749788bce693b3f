//! Adapter for the New York Times most-popular API.
//!
//! Single-snapshot fetch: one unparameterized call returns the current
//! most-viewed window. A failure simply yields zero records for the run.

use async_trait::async_trait;
use serde_json::Value;
use tracing::error;
use url::Url;

use super::connector::Connector;
use super::record::{Facet, MapError, NormalizedArticle, SourceRef};
use super::{store_entries, NewsProvider, ProviderKey, RunSummary};
use crate::storage::Database;
use crate::util::slugify;

const AUTH_PARAM: &str = "api-key";
const ARTICLES_ENDPOINT: &str = "viewed/1.json";

pub struct NewYorkTimesProvider {
    connector: Connector,
}

impl NewYorkTimesProvider {
    pub fn new(client: reqwest::Client, base_url: Url, api_token: String) -> Self {
        Self {
            connector: Connector::new(client, base_url, AUTH_PARAM, api_token),
        }
    }

    fn map_entry(entry: &Value) -> Result<NormalizedArticle, MapError> {
        let title = super::str_field(entry, "title")?.to_string();
        let content = super::str_field(entry, "abstract")?.to_string();
        let link = super::str_field(entry, "url")?.to_string();
        let published_at = super::parse_published(super::str_field(entry, "published_date")?)?;

        let mut record =
            NormalizedArticle::new(ProviderKey::NewYorkTimes, title, content, link, published_at);

        // asset_id arrives as a bare number.
        let provider_id = match entry.get("asset_id") {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            _ => return Err(MapError::MissingField("asset_id")),
        };
        record.provider_id = Facet::Value(provider_id);

        if let Some(description) = super::opt_str_field(entry, "description") {
            record.description = Facet::Value(description);
        }
        record.category = Facet::Value(super::opt_str_field(entry, "section"));
        record.image_url = Facet::Value(super::opt_str_field(entry, "image_url"));

        let keywords = entry["des_facet"]
            .as_array()
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .collect::<Vec<_>>()
                    .join(",")
            })
            .unwrap_or_default();
        record.keywords = Facet::Value(keywords);

        let source_name = super::str_field(entry, "source")?;
        record.source = Facet::Value(SourceRef {
            key: slugify(source_name),
            name: source_name.to_string(),
        });

        Ok(record)
    }
}

#[async_trait]
impl NewsProvider for NewYorkTimesProvider {
    fn key(&self) -> ProviderKey {
        ProviderKey::NewYorkTimes
    }

    async fn run(&self, db: &Database) -> RunSummary {
        let mut summary = RunSummary::new(self.key());

        let response = self.connector.fetch(ARTICLES_ENDPOINT, &[]).await;
        summary.pages += 1;
        if response.failed() {
            error!(
                provider = %self.key(),
                status = response.status,
                error = %response.error_message(),
                "Snapshot request failed"
            );
            return summary;
        }

        let entries = response.payload()["results"]
            .as_array()
            .cloned()
            .unwrap_or_default();
        store_entries(db, &mut summary, &entries, Self::map_entry).await;

        summary
    }
}
