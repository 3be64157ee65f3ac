//! The data collaborator seam.
//!
//! Every kind of organizational record is read through one method of
//! [`KnowledgeSource`]. The aggregator treats each call as an independent,
//! possibly failing read: a failure affects only the field it feeds.

use async_trait::async_trait;
use stemchat_core::error::SourceError;

use crate::snapshot::{
    ContactInfo, EventEntry, FeedItem, OrganizationProfile, ProgramCategory, ProgramEntry,
};

/// The two feeds each program category is assembled from.
///
/// `Programs` are the courses and activities run under a category; the
/// `Facilities` feed lists the places and services behind it (STEM centers,
/// FabLab services, incubation spaces). The aggregator concatenates them,
/// programs first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProgramFeed {
    Programs,
    Facilities,
}

impl ProgramFeed {
    pub const ALL: [ProgramFeed; 2] = [ProgramFeed::Programs, ProgramFeed::Facilities];

    pub fn key(&self) -> &'static str {
        match self {
            ProgramFeed::Programs => "programs",
            ProgramFeed::Facilities => "facilities",
        }
    }
}

/// Names of the non-program queries as they appear in a `SourceReport`.
pub mod query {
    pub const ORGANIZATION_PROFILE: &str = "organization_profile";
    pub const EVENTS: &str = "events";
    pub const ANNOUNCEMENTS: &str = "announcements";
    pub const NEWS: &str = "news";
    pub const CONTACT: &str = "contact";
}

/// Name of a program query as it appears in a `SourceReport`,
/// e.g. `fabrication/facilities`.
pub fn program_query_name(category: ProgramCategory, feed: ProgramFeed) -> String {
    format!("{}/{}", category.key(), feed.key())
}

/// A read-only provider of organizational records.
///
/// Implementations return active records only, already ordered the way they
/// should be shown (most recent first for dated feeds). `limit` is an upper
/// bound; returning fewer rows is fine.
#[async_trait]
pub trait KnowledgeSource: Send + Sync {
    /// Short identifier used in logs.
    fn name(&self) -> &str;

    async fn organization_profile(&self) -> Result<Option<OrganizationProfile>, SourceError>;

    async fn programs(
        &self,
        category: ProgramCategory,
        feed: ProgramFeed,
    ) -> Result<Vec<ProgramEntry>, SourceError>;

    async fn events(&self, limit: usize) -> Result<Vec<EventEntry>, SourceError>;

    async fn announcements(&self, limit: usize) -> Result<Vec<FeedItem>, SourceError>;

    async fn news(&self, limit: usize) -> Result<Vec<FeedItem>, SourceError>;

    async fn contact(&self) -> Result<Option<ContactInfo>, SourceError>;
}
