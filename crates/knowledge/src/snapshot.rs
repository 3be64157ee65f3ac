//! The Knowledge Snapshot: one merged, point-in-time view of everything the
//! assistant may say about the organization.
//!
//! Database-sourced records keep every field optional: rows written through
//! the admin pages are frequently half-filled, and the placeholder filter may
//! strip any field. Static facts are the one part that is always there.

use crate::facts::StaticFacts;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// The "about us" record maintained through the admin pages.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrganizationProfile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mission: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vision: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub values: Vec<String>,
}

/// A program record from one of the program collaborators.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProgramEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Which feed produced the entry (e.g. "STEM Center", "FabLab")
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<DateTime<Utc>>,
}

/// An announcement or news item.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeedItem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContactInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

/// The three program families the organization runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgramCategory {
    Center,
    Fabrication,
    Entrepreneurship,
}

impl ProgramCategory {
    pub const ALL: [ProgramCategory; 3] = [
        ProgramCategory::Center,
        ProgramCategory::Fabrication,
        ProgramCategory::Entrepreneurship,
    ];

    /// Stable identifier used in query names and the database `category` column.
    pub fn key(&self) -> &'static str {
        match self {
            ProgramCategory::Center => "center",
            ProgramCategory::Fabrication => "fabrication",
            ProgramCategory::Entrepreneurship => "entrepreneurship",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ProgramCategory::Center => "STEM center programs",
            ProgramCategory::Fabrication => "fabrication programs",
            ProgramCategory::Entrepreneurship => "entrepreneurship programs",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProgramCollections {
    pub center_programs: Vec<ProgramEntry>,
    pub fabrication_programs: Vec<ProgramEntry>,
    pub entrepreneurship_programs: Vec<ProgramEntry>,
}

impl ProgramCollections {
    pub fn get(&self, category: ProgramCategory) -> &[ProgramEntry] {
        match category {
            ProgramCategory::Center => &self.center_programs,
            ProgramCategory::Fabrication => &self.fabrication_programs,
            ProgramCategory::Entrepreneurship => &self.entrepreneurship_programs,
        }
    }

    pub fn get_mut(&mut self, category: ProgramCategory) -> &mut Vec<ProgramEntry> {
        match category {
            ProgramCategory::Center => &mut self.center_programs,
            ProgramCategory::Fabrication => &mut self.fabrication_programs,
            ProgramCategory::Entrepreneurship => &mut self.entrepreneurship_programs,
        }
    }

    pub fn total(&self) -> usize {
        self.center_programs.len()
            + self.fabrication_programs.len()
            + self.entrepreneurship_programs.len()
    }
}

/// Outcome of one collaborator query during aggregation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FieldStatus {
    Loaded { count: usize },
    Empty,
    Degraded { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryReport {
    pub query: String,
    #[serde(flatten)]
    pub status: FieldStatus,
}

/// Per-query provenance of a snapshot, so degraded fields are traceable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceReport {
    pub queries: Vec<QueryReport>,
}

impl SourceReport {
    pub fn push(&mut self, query: impl Into<String>, status: FieldStatus) {
        self.queries.push(QueryReport {
            query: query.into(),
            status,
        });
    }

    pub fn status_of(&self, query: &str) -> Option<&FieldStatus> {
        self.queries
            .iter()
            .find(|q| q.query == query)
            .map(|q| &q.status)
    }

    pub fn degraded(&self) -> impl Iterator<Item = &QueryReport> {
        self.queries
            .iter()
            .filter(|q| matches!(q.status, FieldStatus::Degraded { .. }))
    }

    pub fn degraded_count(&self) -> usize {
        self.degraded().count()
    }
}

/// The merged knowledge view. Immutable once built; the cache hands it out
/// behind an `Arc`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeSnapshot {
    pub organization_profile: Option<OrganizationProfile>,
    pub programs: ProgramCollections,
    pub events: Vec<EventEntry>,
    pub announcements: Vec<FeedItem>,
    pub news: Vec<FeedItem>,
    pub contact: Option<ContactInfo>,
    pub static_facts: Arc<StaticFacts>,
    #[serde(default)]
    pub report: SourceReport,
}

impl KnowledgeSnapshot {
    /// A snapshot carrying nothing but the static fact sheet.
    pub fn static_only(static_facts: Arc<StaticFacts>) -> Self {
        Self {
            organization_profile: None,
            programs: ProgramCollections::default(),
            events: Vec::new(),
            announcements: Vec::new(),
            news: Vec::new(),
            contact: None,
            static_facts,
            report: SourceReport::default(),
        }
    }

    /// Whether any database-sourced field carries data.
    pub fn has_dynamic_content(&self) -> bool {
        self.organization_profile.is_some()
            || self.programs.total() > 0
            || !self.events.is_empty()
            || !self.announcements.is_empty()
            || !self.news.is_empty()
            || self.contact.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn static_only_snapshot_has_no_dynamic_content() {
        let snapshot = KnowledgeSnapshot::static_only(Arc::new(StaticFacts::default()));
        assert!(!snapshot.has_dynamic_content());
        assert!(!snapshot.static_facts.mission.is_empty());
    }

    #[test]
    fn program_collections_by_category() {
        let mut programs = ProgramCollections::default();
        programs
            .get_mut(ProgramCategory::Fabrication)
            .push(ProgramEntry {
                title: Some("Digital fabrication bootcamp".into()),
                ..Default::default()
            });
        assert_eq!(programs.get(ProgramCategory::Fabrication).len(), 1);
        assert!(programs.get(ProgramCategory::Center).is_empty());
        assert_eq!(programs.total(), 1);
    }

    #[test]
    fn program_entry_type_field_uses_wire_name() {
        let entry = ProgramEntry {
            title: Some("Robotics club".into()),
            description: None,
            kind: Some("STEM Center".into()),
        };
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["type"], "STEM Center");
        assert!(json.get("description").is_none());
    }

    #[test]
    fn report_tracks_degraded_queries() {
        let mut report = SourceReport::default();
        report.push("events", FieldStatus::Loaded { count: 3 });
        report.push(
            "news",
            FieldStatus::Degraded {
                reason: "no such table: news".into(),
            },
        );
        report.push("contact", FieldStatus::Empty);

        assert_eq!(report.degraded_count(), 1);
        assert_eq!(
            report.status_of("events"),
            Some(&FieldStatus::Loaded { count: 3 })
        );
        assert_eq!(report.degraded().next().unwrap().query, "news");
    }

    #[test]
    fn query_report_serializes_flat() {
        let report = QueryReport {
            query: "events".into(),
            status: FieldStatus::Loaded { count: 2 },
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["query"], "events");
        assert_eq!(json["status"], "loaded");
        assert_eq!(json["count"], 2);
    }
}
