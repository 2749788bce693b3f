//! Configuration file parser for newswire.toml.
//!
//! The config file is optional; a missing file yields `Config::default()`.
//! Unknown keys are silently ignored by serde (with `deny_unknown_fields`
//! off), though we log a warning when the file contains potential typos.
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

use crate::provider::ProviderKey;

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),

    /// Config file exceeds maximum allowed size.
    #[error("Config file too large: {0}")]
    TooLarge(String),
}

// ============================================================================
// Configuration Structs
// ============================================================================

/// Top-level application configuration.
///
/// All fields use `#[serde(default)]` so any subset of keys can be
/// specified; provider sections are named by provider key. A provider with
/// no API token is treated as disabled.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Path to the SQLite database file.
    pub database_path: String,

    pub news_api_dot_org: ProviderConfig,
    pub news_api_dot_ai: ProviderConfig,
    pub news_data: ProviderConfig,
    pub new_york_times: ProviderConfig,
}

/// Per-provider connection settings.
///
/// Custom Debug impl masks `api_token` to prevent secret leakage in logs,
/// error messages, and debug output.
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// API token; empty disables the provider.
    pub api_token: String,

    /// Endpoint root override. Empty means the provider's production URL.
    pub base_url: String,

    /// Page cap for the page-bounded providers.
    pub max_page: u32,
}

impl ProviderConfig {
    const DEFAULT_MAX_PAGE: u32 = 5;
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_token: String::new(),
            base_url: String::new(),
            max_page: Self::DEFAULT_MAX_PAGE,
        }
    }
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field(
                "api_token",
                &if self.api_token.is_empty() {
                    ""
                } else {
                    "[REDACTED]"
                },
            )
            .field("base_url", &self.base_url)
            .field("max_page", &self.max_page)
            .finish()
    }
}

impl Default for Config {
    fn default() -> Self {
        let mut config = Self {
            database_path: "newswire.db".to_string(),
            news_api_dot_org: ProviderConfig::default(),
            news_api_dot_ai: ProviderConfig::default(),
            news_data: ProviderConfig::default(),
            new_york_times: ProviderConfig::default(),
        };
        config.fill_base_urls();
        config
    }
}

impl Config {
    /// Maximum config file size (1 MB).
    const MAX_FILE_SIZE: u64 = 1_048_576;

    pub fn provider(&self, key: ProviderKey) -> &ProviderConfig {
        match key {
            ProviderKey::NewsApiOrg => &self.news_api_dot_org,
            ProviderKey::NewsApiAi => &self.news_api_dot_ai,
            ProviderKey::NewsData => &self.news_data,
            ProviderKey::NewYorkTimes => &self.new_york_times,
        }
    }

    pub fn provider_mut(&mut self, key: ProviderKey) -> &mut ProviderConfig {
        match key {
            ProviderKey::NewsApiOrg => &mut self.news_api_dot_org,
            ProviderKey::NewsApiAi => &mut self.news_api_dot_ai,
            ProviderKey::NewsData => &mut self.news_data,
            ProviderKey::NewYorkTimes => &mut self.new_york_times,
        }
    }

    /// Replace empty base URLs with each provider's production endpoint.
    fn fill_base_urls(&mut self) {
        for key in ProviderKey::ALL {
            let section = self.provider_mut(key);
            if section.base_url.is_empty() {
                section.base_url = key.default_base_url().to_string();
            }
        }
    }

    /// Load configuration from a TOML file.
    ///
    /// - Missing file → `Ok(Config::default())`
    /// - Empty file → `Ok(Config::default())`
    /// - Invalid TOML → `Err(ConfigError::Parse)` with line number info
    /// - Unknown keys → silently accepted (serde default behavior), logged
    ///   as warning
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        // Check file size before reading to prevent memory exhaustion from
        // a maliciously large or corrupted config file.
        match std::fs::metadata(path) {
            Ok(meta) if meta.len() > Self::MAX_FILE_SIZE => {
                return Err(ConfigError::TooLarge(format!(
                    "Config file is {} bytes (max {} bytes)",
                    meta.len(),
                    Self::MAX_FILE_SIZE
                )));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No config file found, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
            Ok(_) => {}
        }

        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                // Race: file deleted between metadata and read
                tracing::debug!(path = %path.display(), "Config file disappeared, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
        };

        if content.trim().is_empty() {
            tracing::debug!(path = %path.display(), "Config file is empty, using defaults");
            return Ok(Self::default());
        }

        // Parse the TOML content first as a raw table to detect unknown keys
        if let Ok(raw) = content.parse::<toml::Table>() {
            let known_keys = [
                "database_path",
                "news_api_dot_org",
                "news_api_dot_ai",
                "news_data",
                "new_york_times",
            ];
            for key in raw.keys() {
                if !known_keys.contains(&key.as_str()) {
                    tracing::warn!(key = %key, "Unknown key in config file, ignoring");
                }
            }
        }

        let mut config: Config = toml::from_str(&content)?;
        config.fill_base_urls();
        tracing::info!(
            path = %path.display(),
            database = %config.database_path,
            "Loaded configuration"
        );
        Ok(config)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.database_path, "newswire.db");
        for key in ProviderKey::ALL {
            let section = config.provider(key);
            assert!(section.api_token.is_empty());
            assert_eq!(section.base_url, key.default_base_url());
            assert_eq!(section.max_page, 5);
        }
    }

    #[test]
    fn test_missing_file_returns_default() {
        let path = Path::new("/tmp/newswire_test_nonexistent_config.toml");
        let config = Config::load(path).unwrap();
        assert_eq!(config.database_path, "newswire.db");
    }

    #[test]
    fn test_empty_file_returns_default() {
        let dir = std::env::temp_dir().join("newswire_config_test_empty");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        std::fs::write(&path, "").unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.database_path, "newswire.db");

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_partial_config_uses_defaults_for_missing() {
        let dir = std::env::temp_dir().join("newswire_config_test_partial");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        std::fs::write(
            &path,
            "[news_data]\napi_token = \"nd-token\"\nmax_page = 3\n",
        )
        .unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.news_data.api_token, "nd-token");
        assert_eq!(config.news_data.max_page, 3);
        // Untouched sections and fields keep their defaults.
        assert_eq!(config.news_data.base_url, "https://newsdata.io/api/1/");
        assert!(config.new_york_times.api_token.is_empty());
        assert_eq!(config.news_api_dot_ai.max_page, 5);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_full_config() {
        let dir = std::env::temp_dir().join("newswire_config_test_full");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");

        let content = r#"
database_path = "/var/lib/newswire/articles.db"

[news_api_dot_org]
api_token = "org-token"

[news_api_dot_ai]
api_token = "ai-token"
max_page = 10

[news_data]
api_token = "nd-token"
base_url = "http://localhost:8080/api/1/"

[new_york_times]
api_token = "nyt-token"
"#;
        std::fs::write(&path, content).unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.database_path, "/var/lib/newswire/articles.db");
        assert_eq!(config.news_api_dot_org.api_token, "org-token");
        assert_eq!(config.news_api_dot_ai.max_page, 10);
        assert_eq!(config.news_data.base_url, "http://localhost:8080/api/1/");
        assert_eq!(config.new_york_times.api_token, "nyt-token");

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_invalid_toml_returns_error() {
        let dir = std::env::temp_dir().join("newswire_config_test_invalid");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        std::fs::write(&path, "this is not [valid toml").unwrap();

        let result = Config::load(&path);
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
        assert!(err.to_string().contains("Invalid TOML"));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_unknown_keys_accepted() {
        let dir = std::env::temp_dir().join("newswire_config_test_unknown");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");

        let content = r#"
database_path = "news.db"
totally_fake_key = "should not fail"
"#;
        std::fs::write(&path, content).unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.database_path, "news.db");

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_wrong_type_returns_error() {
        let dir = std::env::temp_dir().join("newswire_config_test_wrongtype");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        // max_page should be an integer, not a string
        std::fs::write(&path, "[news_data]\nmax_page = \"lots\"\n").unwrap();

        let result = Config::load(&path);
        assert!(result.is_err());

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_too_large_file_rejected() {
        let dir = std::env::temp_dir().join("newswire_config_test_too_large");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");

        let content = "a".repeat(1_048_577);
        std::fs::write(&path, content).unwrap();

        let result = Config::load(&path);
        assert!(result.is_err());
        assert!(matches!(result.unwrap_err(), ConfigError::TooLarge(_)));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_debug_masks_api_token() {
        let mut config = Config::default();
        config.news_data.api_token = "super-secret-token".to_string();

        let debug_output = format!("{:?}", config);
        assert!(
            !debug_output.contains("super-secret-token"),
            "Debug output should not contain the API token"
        );
        assert!(
            debug_output.contains("[REDACTED]"),
            "Debug output should show [REDACTED] for the set token"
        );
    }
}
