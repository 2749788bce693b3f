//! Adapter for newsapi.ai.
//!
//! Numbered-page pagination: requests pages starting at 1 and keeps going
//! while the counter stays below the configured cap and within the
//! server-declared total, whichever ends first. The first failed page ends
//! the run.

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, error};
use url::Url;

use super::connector::Connector;
use super::record::{Facet, MapError, NormalizedArticle, SourceRef};
use super::{store_entries, NewsProvider, ProviderKey, RunSummary};
use crate::storage::Database;

const AUTH_PARAM: &str = "apiKey";
const ARTICLES_ENDPOINT: &str = "article/getArticles";
const LANGUAGE: &str = "eng";

pub struct NewsApiAiProvider {
    connector: Connector,
    max_page: u32,
}

impl NewsApiAiProvider {
    pub fn new(client: reqwest::Client, base_url: Url, api_token: String, max_page: u32) -> Self {
        Self {
            connector: Connector::new(client, base_url, AUTH_PARAM, api_token),
            max_page,
        }
    }

    fn map_entry(entry: &Value) -> Result<NormalizedArticle, MapError> {
        let title = super::str_field(entry, "title")?.to_string();
        let body = super::str_field(entry, "body")?.to_string();
        let link = super::str_field(entry, "url")?.to_string();
        let published_at = super::parse_published(super::str_field(entry, "dateTimePub")?)?;

        let mut record =
            NormalizedArticle::new(ProviderKey::NewsApiAi, title, body.clone(), link, published_at);

        // The feed carries no separate summary; the body doubles as the
        // description.
        record.description = Facet::Value(body);
        if let Some(lang) = super::opt_str_field(entry, "lang") {
            record.language = Facet::Value(lang);
        }
        record.image_url = Facet::Value(super::opt_str_field(entry, "image"));
        record.author_name =
            Facet::Value(entry["authors"][0]["name"].as_str().map(str::to_string));
        record.provider_id = Facet::Value(super::str_field(entry, "uri")?.to_string());

        let source_key = entry["source"]["uri"]
            .as_str()
            .ok_or(MapError::MissingField("source.uri"))?;
        let source_name = entry["source"]["title"]
            .as_str()
            .ok_or(MapError::MissingField("source.title"))?;
        record.source = Facet::Value(SourceRef {
            key: source_key.to_string(),
            name: source_name.to_string(),
        });

        Ok(record)
    }
}

#[async_trait]
impl NewsProvider for NewsApiAiProvider {
    fn key(&self) -> ProviderKey {
        ProviderKey::NewsApiAi
    }

    async fn run(&self, db: &Database) -> RunSummary {
        let mut summary = RunSummary::new(self.key());

        // The server-declared total is unknown until the first response, so
        // it starts at the configured cap and is replaced after every page.
        let max_pages = self.max_page;
        let mut total_pages = max_pages;
        let mut next_page: u32 = 1;

        while next_page < max_pages && next_page <= total_pages {
            let response = self
                .connector
                .fetch(
                    ARTICLES_ENDPOINT,
                    &[
                        ("lang", LANGUAGE.to_string()),
                        ("page", next_page.to_string()),
                    ],
                )
                .await;
            summary.pages += 1;
            if response.failed() {
                error!(
                    provider = %self.key(),
                    page = next_page,
                    status = response.status,
                    error = %response.error_message(),
                    "Article page request failed; ending run"
                );
                break;
            }

            let entries: Vec<Value> = response.payload()["articles"]["results"]
                .as_array()
                .cloned()
                .unwrap_or_default()
                .into_iter()
                .filter(|entry| {
                    // Known-malformed feed entries arrive without a title or
                    // body; they are dropped before mapping.
                    let complete = entry.get("title").and_then(Value::as_str).is_some()
                        && entry.get("body").and_then(Value::as_str).is_some();
                    if !complete {
                        debug!(provider = %self.key(), "Dropping entry with missing title or body");
                    }
                    complete
                })
                .collect();
            store_entries(db, &mut summary, &entries, Self::map_entry).await;

            total_pages = response.payload()["articles"]["pages"].as_u64().unwrap_or(0) as u32;
            next_page += 1;
        }

        summary
    }
}
