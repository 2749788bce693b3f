//! Multi-provider news ingestion pipeline.
//!
//! Fetches articles from several external news APIs with incompatible
//! schemas and pagination contracts, normalizes each raw payload entry into
//! one canonical record shape, and upserts the result into SQLite so that
//! repeated runs converge instead of duplicating rows.
//!
//! The moving parts, bottom up:
//!
//! - [`provider::Connector`] issues the HTTP calls and folds every failure
//!   mode into one uniform response value.
//! - [`provider::NormalizedArticle`] is the capability contract: a mandatory
//!   core plus optional facets, so providers only write the columns they
//!   actually know about.
//! - One adapter module per provider implements its pagination strategy and
//!   payload mapping.
//! - [`storage::Database`] owns the schema, the identity-keyed upsert with
//!   its two-pass slug fixup, dimension dedup, and the read-side queries.
//! - [`ingest`] runs one independent task per provider.

pub mod config;
pub mod ingest;
pub mod provider;
pub mod storage;
pub mod util;
