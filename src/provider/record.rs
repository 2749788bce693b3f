use chrono::{DateTime, Utc};
use thiserror::Error;

use super::ProviderKey;
use crate::util::slugify;

// ============================================================================
// Error Types
// ============================================================================

/// Errors raised while normalizing one raw payload entry.
///
/// A mapping error only fails that entry; the surrounding batch continues.
#[derive(Debug, Error)]
pub enum MapError {
    /// A mandatory field is missing or has the wrong JSON type
    #[error("Missing or invalid field `{0}`")]
    MissingField(&'static str),
    /// A publication timestamp that none of the accepted formats parse
    #[error("Unparseable publication time `{0}`")]
    InvalidTimestamp(String),
}

// ============================================================================
// Capability Facets
// ============================================================================

/// An optional capability on a normalized record.
///
/// Providers disagree on which fields exist at all, so every optional field
/// is wrapped in a `Facet`: `Absent` means the provider does not implement
/// the capability and the stored column must be left untouched, while
/// `Value(v)` means the provider is authoritative for the column on this run.
/// The two are deliberately distinct from `Option`: `Facet<Option<T>>`
/// carries an explicit null that overwrites, whereas `Absent` never writes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Facet<T> {
    /// Capability not implemented by this record's provider
    #[default]
    Absent,
    /// Capability implemented; the value overwrites the stored column
    Value(T),
}

impl<T> Facet<T> {
    /// The carried value, or `None` when the capability is absent.
    pub fn value(&self) -> Option<&T> {
        match self {
            Facet::Absent => None,
            Facet::Value(v) => Some(v),
        }
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, Facet::Absent)
    }
}

/// Source reference carried by records whose provider reports one.
///
/// `key` is the natural dedup key for the sources dimension table and
/// `name` its display label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceRef {
    pub key: String,
    pub name: String,
}

// ============================================================================
// Normalized Record
// ============================================================================

/// One provider payload entry normalized into the canonical record shape.
///
/// The first five fields are the mandatory core every provider supplies;
/// everything else is an independent capability facet.
#[derive(Debug, Clone)]
pub struct NormalizedArticle {
    pub provider: ProviderKey,
    pub title: String,
    pub content: String,
    pub link: String,
    pub published_at: DateTime<Utc>,

    pub description: Facet<String>,
    pub keywords: Facet<String>,
    pub language: Facet<String>,
    pub author_name: Facet<Option<String>>,
    pub category: Facet<Option<String>>,
    pub image_url: Facet<Option<String>>,
    pub provider_id: Facet<String>,
    pub source: Facet<SourceRef>,
}

impl NormalizedArticle {
    /// Builds a record carrying only the mandatory core; all facets start
    /// absent.
    pub fn new(
        provider: ProviderKey,
        title: String,
        content: String,
        link: String,
        published_at: DateTime<Utc>,
    ) -> Self {
        Self {
            provider,
            title,
            content,
            link,
            published_at,
            description: Facet::Absent,
            keywords: Facet::Absent,
            language: Facet::Absent,
            author_name: Facet::Absent,
            category: Facet::Absent,
            image_url: Facet::Absent,
            provider_id: Facet::Absent,
            source: Facet::Absent,
        }
    }

    /// The second element of the record's identity key.
    ///
    /// The stable external id when the provider supplies one, otherwise a
    /// slug derived deterministically from the title. The derived form has
    /// no collision protection: two distinct articles with identical titles
    /// under the same provider merge into one row.
    pub fn identity(&self) -> String {
        match &self.provider_id {
            Facet::Value(id) => id.clone(),
            Facet::Absent => slugify(&self.title),
        }
    }
}
