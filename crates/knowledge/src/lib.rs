//! Organizational knowledge for StemChat.
//!
//! Aggregates the website's records and the static fact sheet into one
//! [`KnowledgeSnapshot`], keeps it in a single-slot TTL cache and filters
//! placeholder content out of database-sourced records.

pub mod aggregator;
pub mod cache;
pub mod clock;
pub mod facts;
pub mod in_memory;
pub mod placeholder;
pub mod snapshot;
pub mod source;

#[cfg(feature = "sqlite")]
pub mod sqlite;

#[cfg(test)]
mod test_helpers;

pub use aggregator::{FeedLimits, KnowledgeAggregator};
pub use cache::KnowledgeCache;
pub use clock::{Clock, ManualClock, SystemClock};
pub use facts::{ImpactStat, Office, ProgramFact, ProgramKind, StaticFacts};
pub use in_memory::InMemorySource;
pub use placeholder::{is_placeholder, prune, scrub, scrub_all};
pub use snapshot::{
    ContactInfo, EventEntry, FeedItem, FieldStatus, KnowledgeSnapshot, OrganizationProfile,
    ProgramCategory, ProgramCollections, ProgramEntry, QueryReport, SourceReport,
};
pub use source::{KnowledgeSource, ProgramFeed};

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteSource;

use std::sync::Arc;
use tracing::{info, warn};

/// Open the knowledge source for `database_url`.
///
/// Without a URL, or when the database cannot be opened, an empty in-memory
/// source is returned and the assistant runs on static facts alone.
pub async fn open_source(database_url: Option<&str>) -> Arc<dyn KnowledgeSource> {
    let Some(url) = database_url.map(str::trim).filter(|u| !u.is_empty()) else {
        info!("No database configured, answering from static facts only");
        return Arc::new(InMemorySource::new());
    };

    #[cfg(feature = "sqlite")]
    {
        match SqliteSource::connect(url).await {
            Ok(source) => Arc::new(source),
            Err(e) => {
                warn!(error = %e, "Knowledge database unavailable, using static facts only");
                Arc::new(InMemorySource::new())
            }
        }
    }

    #[cfg(not(feature = "sqlite"))]
    {
        warn!(url, "Built without SQLite support, using static facts only");
        Arc::new(InMemorySource::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn no_database_means_empty_in_memory_source() {
        let source = open_source(None).await;
        assert_eq!(source.name(), "in_memory");
        let source = open_source(Some("  ")).await;
        assert_eq!(source.name(), "in_memory");
    }

    #[tokio::test]
    async fn unreachable_database_degrades_to_static_facts() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}", dir.path().join("absent.db").display());
        let source = open_source(Some(&url)).await;
        assert_eq!(source.name(), "in_memory");
    }
}
