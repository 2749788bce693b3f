//! Run coordination: one independent ingestion run per configured provider.
//!
//! Runs execute concurrently and never affect each other; inside a run every
//! network call and storage write is sequential.

use futures::stream::{self, StreamExt};
use tracing::info;

use crate::provider::{NewsProvider, ProviderKey, ProviderRegistry, RunSummary};
use crate::storage::Database;

/// Upper bound on providers fetching at once.
const CONCURRENT_RUNS: usize = 4;

/// Run every configured provider and collect the per-run summaries.
pub async fn run_all(registry: &ProviderRegistry, db: &Database) -> Vec<RunSummary> {
    stream::iter(registry.providers())
        .map(|provider| run_one(provider.as_ref(), db))
        .buffer_unordered(CONCURRENT_RUNS)
        .collect()
        .await
}

/// Run a single provider by key.
///
/// Returns `None` when the key has no configured adapter, which means its
/// API token is missing from the configuration.
pub async fn run_provider(
    registry: &ProviderRegistry,
    db: &Database,
    key: ProviderKey,
) -> Option<RunSummary> {
    let provider = registry.get(key)?;
    Some(run_one(provider, db).await)
}

async fn run_one(provider: &dyn NewsProvider, db: &Database) -> RunSummary {
    let key = provider.key();
    info!(provider = %key, label = key.label(), "Starting ingestion run");
    let summary = provider.run(db).await;
    info!(
        provider = %key,
        pages = summary.pages,
        stored = summary.stored,
        failed = summary.failed,
        "Ingestion run finished"
    );
    summary
}
