//! Scripted sources for aggregator and cache tests.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use stemchat_core::error::SourceError;

use crate::snapshot::{
    ContactInfo, EventEntry, FeedItem, OrganizationProfile, ProgramCategory, ProgramEntry,
};
use crate::source::{KnowledgeSource, ProgramFeed, query};

/// Every query fails.
pub struct FailingSource;

#[async_trait]
impl KnowledgeSource for FailingSource {
    fn name(&self) -> &str {
        "failing"
    }

    async fn organization_profile(&self) -> Result<Option<OrganizationProfile>, SourceError> {
        Err(SourceError::Unavailable("database is down".into()))
    }

    async fn programs(
        &self,
        _category: ProgramCategory,
        _feed: ProgramFeed,
    ) -> Result<Vec<ProgramEntry>, SourceError> {
        Err(SourceError::Unavailable("database is down".into()))
    }

    async fn events(&self, _limit: usize) -> Result<Vec<EventEntry>, SourceError> {
        Err(SourceError::Unavailable("database is down".into()))
    }

    async fn announcements(&self, _limit: usize) -> Result<Vec<FeedItem>, SourceError> {
        Err(SourceError::Unavailable("database is down".into()))
    }

    async fn news(&self, _limit: usize) -> Result<Vec<FeedItem>, SourceError> {
        Err(SourceError::Unavailable("database is down".into()))
    }

    async fn contact(&self) -> Result<Option<ContactInfo>, SourceError> {
        Err(SourceError::Unavailable("database is down".into()))
    }
}

/// Answers every query after `delay`, except the `stalled` one which never
/// answers. Counts aggregations through the profile query.
pub struct StallingSource {
    stalled: Option<&'static str>,
    delay: Duration,
    profile_calls: AtomicUsize,
}

impl StallingSource {
    /// Stall only the named query.
    pub fn new(stalled: &'static str) -> Self {
        Self {
            stalled: Some(stalled),
            delay: Duration::ZERO,
            profile_calls: AtomicUsize::new(0),
        }
    }

    /// Answer everything, each query after `delay`.
    pub fn slow(delay: Duration) -> Self {
        Self {
            stalled: None,
            delay,
            profile_calls: AtomicUsize::new(0),
        }
    }

    pub fn aggregations(&self) -> usize {
        self.profile_calls.load(Ordering::SeqCst)
    }

    async fn wait(&self, name: &str) {
        if self.stalled == Some(name) {
            std::future::pending::<()>().await;
        }
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
    }
}

#[async_trait]
impl KnowledgeSource for StallingSource {
    fn name(&self) -> &str {
        "stalling"
    }

    async fn organization_profile(&self) -> Result<Option<OrganizationProfile>, SourceError> {
        self.profile_calls.fetch_add(1, Ordering::SeqCst);
        self.wait(query::ORGANIZATION_PROFILE).await;
        Ok(Some(OrganizationProfile {
            title: Some("About STEMpower".into()),
            ..Default::default()
        }))
    }

    async fn programs(
        &self,
        _category: ProgramCategory,
        _feed: ProgramFeed,
    ) -> Result<Vec<ProgramEntry>, SourceError> {
        self.wait("programs").await;
        Ok(Vec::new())
    }

    async fn events(&self, _limit: usize) -> Result<Vec<EventEntry>, SourceError> {
        self.wait(query::EVENTS).await;
        Ok(Vec::new())
    }

    async fn announcements(&self, _limit: usize) -> Result<Vec<FeedItem>, SourceError> {
        self.wait(query::ANNOUNCEMENTS).await;
        Ok(Vec::new())
    }

    async fn news(&self, _limit: usize) -> Result<Vec<FeedItem>, SourceError> {
        self.wait(query::NEWS).await;
        Ok(Vec::new())
    }

    async fn contact(&self) -> Result<Option<ContactInfo>, SourceError> {
        self.wait(query::CONTACT).await;
        Ok(Some(ContactInfo {
            address: Some("Bole Road, Addis Ababa".into()),
            ..Default::default()
        }))
    }
}
