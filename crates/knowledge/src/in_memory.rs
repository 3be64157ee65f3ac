//! In-memory source: useful for tests, demos and running without a database.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use stemchat_core::error::SourceError;
use tokio::sync::RwLock;

use crate::snapshot::{
    ContactInfo, EventEntry, FeedItem, OrganizationProfile, ProgramCategory, ProgramEntry,
};
use crate::source::{KnowledgeSource, ProgramFeed, program_query_name, query};

#[derive(Debug, Default)]
struct Records {
    profile: Option<OrganizationProfile>,
    programs: HashMap<(ProgramCategory, ProgramFeed), Vec<ProgramEntry>>,
    events: Vec<EventEntry>,
    announcements: Vec<FeedItem>,
    news: Vec<FeedItem>,
    contact: Option<ContactInfo>,
}

/// A source holding its records in memory.
///
/// Individual queries can be made to fail with [`InMemorySource::fail_query`]
/// to exercise degraded aggregation.
#[derive(Clone, Default)]
pub struct InMemorySource {
    records: Arc<RwLock<Records>>,
    failing: Arc<RwLock<HashSet<String>>>,
    calls: Arc<AtomicUsize>,
}

impl InMemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set_profile(&self, profile: OrganizationProfile) {
        self.records.write().await.profile = Some(profile);
    }

    pub async fn push_program(
        &self,
        category: ProgramCategory,
        feed: ProgramFeed,
        entry: ProgramEntry,
    ) {
        self.records
            .write()
            .await
            .programs
            .entry((category, feed))
            .or_default()
            .push(entry);
    }

    pub async fn push_event(&self, event: EventEntry) {
        self.records.write().await.events.push(event);
    }

    pub async fn push_announcement(&self, item: FeedItem) {
        self.records.write().await.announcements.push(item);
    }

    pub async fn push_news(&self, item: FeedItem) {
        self.records.write().await.news.push(item);
    }

    pub async fn set_contact(&self, contact: ContactInfo) {
        self.records.write().await.contact = Some(contact);
    }

    /// Make the named query fail until [`InMemorySource::restore_query`].
    pub async fn fail_query(&self, name: impl Into<String>) {
        self.failing.write().await.insert(name.into());
    }

    pub async fn restore_query(&self, name: &str) {
        self.failing.write().await.remove(name);
    }

    /// Total number of queries answered (or failed) so far.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    async fn enter(&self, name: &str) -> Result<(), SourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.read().await.contains(name) {
            return Err(SourceError::QueryFailed {
                query: name.to_string(),
                reason: "simulated failure".into(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl KnowledgeSource for InMemorySource {
    fn name(&self) -> &str {
        "in_memory"
    }

    async fn organization_profile(&self) -> Result<Option<OrganizationProfile>, SourceError> {
        self.enter(query::ORGANIZATION_PROFILE).await?;
        Ok(self.records.read().await.profile.clone())
    }

    async fn programs(
        &self,
        category: ProgramCategory,
        feed: ProgramFeed,
    ) -> Result<Vec<ProgramEntry>, SourceError> {
        self.enter(&program_query_name(category, feed)).await?;
        Ok(self
            .records
            .read()
            .await
            .programs
            .get(&(category, feed))
            .cloned()
            .unwrap_or_default())
    }

    async fn events(&self, limit: usize) -> Result<Vec<EventEntry>, SourceError> {
        self.enter(query::EVENTS).await?;
        let mut events = self.records.read().await.events.clone();
        // Most recent first; undated events go last.
        events.sort_by(|a, b| b.start_date.cmp(&a.start_date));
        events.truncate(limit);
        Ok(events)
    }

    async fn announcements(&self, limit: usize) -> Result<Vec<FeedItem>, SourceError> {
        self.enter(query::ANNOUNCEMENTS).await?;
        let announcements = self.records.read().await.announcements.clone();
        Ok(announcements.into_iter().take(limit).collect())
    }

    async fn news(&self, limit: usize) -> Result<Vec<FeedItem>, SourceError> {
        self.enter(query::NEWS).await?;
        // Pushed oldest first, served newest first.
        let news = self.records.read().await.news.clone();
        Ok(news.into_iter().rev().take(limit).collect())
    }

    async fn contact(&self) -> Result<Option<ContactInfo>, SourceError> {
        self.enter(query::CONTACT).await?;
        Ok(self.records.read().await.contact.clone())
    }
}
