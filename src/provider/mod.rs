//! Provider adapters and the shared normalization contract.
//!
//! Each upstream news API gets one adapter implementing [`NewsProvider`].
//! Adapters own their pagination shape and field mapping; everything after
//! normalization (dimension resolution, upsert, identity) is shared and
//! lives in [`crate::storage`].

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde_json::Value;
use thiserror::Error;
use tracing::{error, warn};
use url::Url;

use crate::config::Config;
use crate::storage::Database;

mod connector;
mod new_york_times;
mod news_api_ai;
mod news_api_org;
mod news_data;
pub mod record;

pub use connector::{ApiResponse, Connector};
pub use new_york_times::NewYorkTimesProvider;
pub use news_api_ai::NewsApiAiProvider;
pub use news_api_org::NewsApiOrgProvider;
pub use news_data::NewsDataProvider;
pub use record::{Facet, MapError, NormalizedArticle, SourceRef};

// ============================================================================
// Provider Keys
// ============================================================================

/// Canonical identifier for each supported upstream API.
///
/// The string form is what lands in the `provider` column and what the CLI
/// accepts, so it stays stable even if display labels change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderKey {
    NewsApiOrg,
    NewsApiAi,
    NewsData,
    NewYorkTimes,
}

impl ProviderKey {
    pub const ALL: [ProviderKey; 4] = [
        ProviderKey::NewsApiOrg,
        ProviderKey::NewsApiAi,
        ProviderKey::NewsData,
        ProviderKey::NewYorkTimes,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKey::NewsApiOrg => "news_api_dot_org",
            ProviderKey::NewsApiAi => "news_api_dot_ai",
            ProviderKey::NewsData => "news_data",
            ProviderKey::NewYorkTimes => "new_york_times",
        }
    }

    /// Human-readable label for logs and summaries.
    pub fn label(&self) -> &'static str {
        match self {
            ProviderKey::NewsApiOrg => "News API (newsapi.org)",
            ProviderKey::NewsApiAi => "News API (newsapi.ai)",
            ProviderKey::NewsData => "News Data (newsdata.io)",
            ProviderKey::NewYorkTimes => "New York Times (nytimes.com)",
        }
    }

    /// Production endpoint root, used when the config leaves `base_url`
    /// empty.
    pub fn default_base_url(&self) -> &'static str {
        match self {
            ProviderKey::NewsApiOrg => "https://newsapi.org/v2/",
            ProviderKey::NewsApiAi => "https://newsapi.ai/api/v1/",
            ProviderKey::NewsData => "https://newsdata.io/api/1/",
            ProviderKey::NewYorkTimes => "https://api.nytimes.com/svc/mostpopular/v2/",
        }
    }
}

impl fmt::Display for ProviderKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
#[error(
    "Unknown provider `{0}`; expected one of news_api_dot_org, news_api_dot_ai, \
     news_data, new_york_times"
)]
pub struct UnknownProvider(String);

impl FromStr for ProviderKey {
    type Err = UnknownProvider;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "news_api_dot_org" => Ok(ProviderKey::NewsApiOrg),
            "news_api_dot_ai" => Ok(ProviderKey::NewsApiAi),
            "news_data" => Ok(ProviderKey::NewsData),
            "new_york_times" => Ok(ProviderKey::NewYorkTimes),
            other => Err(UnknownProvider(other.to_string())),
        }
    }
}

// ============================================================================
// Provider Trait
// ============================================================================

/// Per-run counters reported by every provider.
#[derive(Debug, Clone, Copy)]
pub struct RunSummary {
    pub provider: ProviderKey,
    /// Upstream requests issued, including failed ones
    pub pages: u32,
    pub stored: u64,
    pub failed: u64,
}

impl RunSummary {
    pub fn new(provider: ProviderKey) -> Self {
        Self {
            provider,
            pages: 0,
            stored: 0,
            failed: 0,
        }
    }
}

/// One upstream news source.
///
/// `run` performs a full fetch cycle and persists what it can. It never
/// returns an error: upstream and per-record failures are logged and
/// counted, so one misbehaving provider cannot abort a run that covers
/// several.
#[async_trait]
pub trait NewsProvider: Send + Sync {
    fn key(&self) -> ProviderKey;

    async fn run(&self, db: &Database) -> RunSummary;
}

// ============================================================================
// Provider Registry
// ============================================================================

/// The set of providers enabled by the current configuration.
pub struct ProviderRegistry {
    providers: Vec<Box<dyn NewsProvider>>,
}

impl ProviderRegistry {
    /// Builds one adapter per provider that has an API token configured.
    ///
    /// Providers without a token are skipped with a warning rather than
    /// failing the run; a fresh config ships with all tokens empty.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed or a
    /// configured base URL does not parse.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        use anyhow::Context;

        let client = reqwest::Client::builder()
            .timeout(connector::REQUEST_TIMEOUT)
            .user_agent(concat!("newswire/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")?;

        let mut providers: Vec<Box<dyn NewsProvider>> = Vec::new();
        for key in ProviderKey::ALL {
            let settings = config.provider(key);
            if settings.api_token.is_empty() {
                warn!(provider = %key, "No API token configured; provider disabled");
                continue;
            }

            let base_url = Url::parse(&settings.base_url)
                .with_context(|| format!("Invalid base URL for provider `{key}`"))?;
            let token = settings.api_token.clone();

            providers.push(match key {
                ProviderKey::NewsApiOrg => {
                    Box::new(NewsApiOrgProvider::new(client.clone(), base_url, token))
                }
                ProviderKey::NewsApiAi => Box::new(NewsApiAiProvider::new(
                    client.clone(),
                    base_url,
                    token,
                    settings.max_page,
                )),
                ProviderKey::NewsData => Box::new(NewsDataProvider::new(
                    client.clone(),
                    base_url,
                    token,
                    settings.max_page,
                )),
                ProviderKey::NewYorkTimes => {
                    Box::new(NewYorkTimesProvider::new(client.clone(), base_url, token))
                }
            });
        }

        Ok(Self { providers })
    }

    pub fn providers(&self) -> &[Box<dyn NewsProvider>] {
        &self.providers
    }

    pub fn get(&self, key: ProviderKey) -> Option<&dyn NewsProvider> {
        self.providers
            .iter()
            .find(|p| p.key() == key)
            .map(Box::as_ref)
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

// ============================================================================
// Shared Mapping Helpers
// ============================================================================

/// Persists a batch of raw entries through `map`, updating `summary`.
///
/// A mapping failure or a storage failure affects only its own entry.
pub(crate) async fn store_entries<F>(
    db: &Database,
    summary: &mut RunSummary,
    entries: &[Value],
    map: F,
) where
    F: Fn(&Value) -> Result<NormalizedArticle, MapError>,
{
    for entry in entries {
        let record = match map(entry) {
            Ok(record) => record,
            Err(e) => {
                warn!(provider = %summary.provider, error = %e, "Skipping unmappable entry");
                summary.failed += 1;
                continue;
            }
        };

        match db.save_article(&record).await {
            Ok(_) => summary.stored += 1,
            Err(e) => {
                error!(provider = %summary.provider, error = %e, "Failed to save article");
                summary.failed += 1;
            }
        }
    }
}

/// Mandatory string field; null, missing, or non-string all fail the entry.
pub(crate) fn str_field<'a>(entry: &'a Value, key: &'static str) -> Result<&'a str, MapError> {
    entry
        .get(key)
        .and_then(Value::as_str)
        .ok_or(MapError::MissingField(key))
}

/// Optional string field; anything but a string becomes `None`.
pub(crate) fn opt_str_field(entry: &Value, key: &str) -> Option<String> {
    entry.get(key).and_then(Value::as_str).map(str::to_string)
}

/// Parses the publication formats seen across providers: RFC 3339,
/// `YYYY-MM-DD HH:MM:SS` (read as UTC), and bare `YYYY-MM-DD` (midnight
/// UTC).
pub(crate) fn parse_published(raw: &str) -> Result<DateTime<Utc>, MapError> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return Ok(naive.and_utc());
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Ok(date.and_time(NaiveTime::MIN).and_utc());
    }
    Err(MapError::InvalidTimestamp(raw.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_provider_key_round_trips_through_str() {
        for key in ProviderKey::ALL {
            assert_eq!(ProviderKey::from_str(key.as_str()).unwrap(), key);
        }
    }

    #[test]
    fn test_unknown_provider_key_is_rejected() {
        let err = ProviderKey::from_str("reuters").unwrap_err();
        assert!(err.to_string().contains("reuters"));
    }

    #[test]
    fn test_provider_labels() {
        assert_eq!(ProviderKey::NewsApiOrg.label(), "News API (newsapi.org)");
        assert_eq!(ProviderKey::NewsApiAi.label(), "News API (newsapi.ai)");
        assert_eq!(ProviderKey::NewsData.label(), "News Data (newsdata.io)");
        assert_eq!(
            ProviderKey::NewYorkTimes.label(),
            "New York Times (nytimes.com)"
        );
    }

    #[test]
    fn test_parse_published_accepts_rfc3339() {
        let ts = parse_published("2026-03-01T08:30:00Z").unwrap();
        assert_eq!(ts.to_rfc3339(), "2026-03-01T08:30:00+00:00");

        let offset = parse_published("2026-03-01T08:30:00+02:00").unwrap();
        assert_eq!(offset.to_rfc3339(), "2026-03-01T06:30:00+00:00");
    }

    #[test]
    fn test_parse_published_accepts_space_separated() {
        let ts = parse_published("2026-03-01 08:30:00").unwrap();
        assert_eq!(ts.to_rfc3339(), "2026-03-01T08:30:00+00:00");
    }

    #[test]
    fn test_parse_published_accepts_bare_date_as_midnight() {
        let ts = parse_published("2026-03-01").unwrap();
        assert_eq!(ts.to_rfc3339(), "2026-03-01T00:00:00+00:00");
    }

    #[test]
    fn test_parse_published_rejects_garbage() {
        assert!(matches!(
            parse_published("yesterday"),
            Err(MapError::InvalidTimestamp(_))
        ));
    }

    #[test]
    fn test_str_field_requires_a_string() {
        let entry = json!({"title": "ok", "count": 3, "gone": null});
        assert_eq!(str_field(&entry, "title").unwrap(), "ok");
        assert!(matches!(
            str_field(&entry, "count"),
            Err(MapError::MissingField("count"))
        ));
        assert!(matches!(
            str_field(&entry, "gone"),
            Err(MapError::MissingField("gone"))
        ));
        assert!(str_field(&entry, "absent").is_err());
    }

    #[test]
    fn test_opt_str_field_drops_non_strings() {
        let entry = json!({"lang": "en", "page": 2, "none": null});
        assert_eq!(opt_str_field(&entry, "lang"), Some("en".to_string()));
        assert_eq!(opt_str_field(&entry, "page"), None);
        assert_eq!(opt_str_field(&entry, "none"), None);
        assert_eq!(opt_str_field(&entry, "absent"), None);
    }

    #[test]
    fn test_registry_skips_providers_without_tokens() {
        let config = Config::default();
        let registry = ProviderRegistry::from_config(&config).unwrap();
        assert!(registry.is_empty());
    }

    #[test]
    fn test_registry_builds_all_configured_providers() {
        let mut config = Config::default();
        for key in ProviderKey::ALL {
            config.provider_mut(key).api_token = "token".to_string();
        }
        let registry = ProviderRegistry::from_config(&config).unwrap();
        assert_eq!(registry.providers().len(), 4);
        for key in ProviderKey::ALL {
            assert!(registry.get(key).is_some());
        }
    }
}
