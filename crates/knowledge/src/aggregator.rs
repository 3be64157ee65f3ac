//! Knowledge aggregation.
//!
//! One aggregation issues every collaborator query concurrently, bounds each
//! by its own timeout and folds the outcomes into a [`KnowledgeSnapshot`].
//! A failing or slow query degrades only its own field; the snapshot always
//! carries the static facts.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use stemchat_core::error::SourceError;
use tracing::{debug, info, warn};

use crate::facts::StaticFacts;
use crate::snapshot::{FieldStatus, KnowledgeSnapshot, ProgramCategory, SourceReport};
use crate::source::{KnowledgeSource, ProgramFeed, program_query_name, query};

/// Upper bounds for the dated feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeedLimits {
    pub events: usize,
    pub announcements: usize,
    pub news: usize,
}

impl Default for FeedLimits {
    fn default() -> Self {
        Self {
            events: 5,
            announcements: 5,
            news: 5,
        }
    }
}

pub struct KnowledgeAggregator {
    source: Arc<dyn KnowledgeSource>,
    static_facts: Arc<StaticFacts>,
    limits: FeedLimits,
    query_timeout: Duration,
}

impl KnowledgeAggregator {
    pub fn new(source: Arc<dyn KnowledgeSource>, static_facts: Arc<StaticFacts>) -> Self {
        Self {
            source,
            static_facts,
            limits: FeedLimits::default(),
            query_timeout: Duration::from_secs(10),
        }
    }

    pub fn with_limits(mut self, limits: FeedLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn with_query_timeout(mut self, timeout: Duration) -> Self {
        self.query_timeout = timeout;
        self
    }

    pub fn static_facts(&self) -> Arc<StaticFacts> {
        Arc::clone(&self.static_facts)
    }

    pub fn source_name(&self) -> &str {
        self.source.name()
    }

    /// Run every query and merge the results. Never fails.
    pub async fn aggregate(&self) -> KnowledgeSnapshot {
        let started = Instant::now();
        let source = self.source.as_ref();
        let limits = self.limits;

        let program = |category: ProgramCategory, feed: ProgramFeed| {
            let name = program_query_name(category, feed);
            async move {
                let result = self.bounded(&name, source.programs(category, feed)).await;
                (name, result)
            }
        };

        let (
            profile,
            center_programs,
            center_facilities,
            fabrication_programs,
            fabrication_facilities,
            entrepreneurship_programs,
            entrepreneurship_facilities,
            events,
            announcements,
            news,
            contact,
        ) = tokio::join!(
            self.bounded(query::ORGANIZATION_PROFILE, source.organization_profile()),
            program(ProgramCategory::Center, ProgramFeed::Programs),
            program(ProgramCategory::Center, ProgramFeed::Facilities),
            program(ProgramCategory::Fabrication, ProgramFeed::Programs),
            program(ProgramCategory::Fabrication, ProgramFeed::Facilities),
            program(ProgramCategory::Entrepreneurship, ProgramFeed::Programs),
            program(ProgramCategory::Entrepreneurship, ProgramFeed::Facilities),
            self.bounded(query::EVENTS, source.events(limits.events)),
            self.bounded(query::ANNOUNCEMENTS, source.announcements(limits.announcements)),
            self.bounded(query::NEWS, source.news(limits.news)),
            self.bounded(query::CONTACT, source.contact()),
        );

        let mut snapshot = KnowledgeSnapshot::static_only(self.static_facts());
        let mut report = SourceReport::default();

        snapshot.organization_profile =
            settle_optional(&mut report, query::ORGANIZATION_PROFILE, profile);

        let program_results = [
            (ProgramCategory::Center, center_programs),
            (ProgramCategory::Center, center_facilities),
            (ProgramCategory::Fabrication, fabrication_programs),
            (ProgramCategory::Fabrication, fabrication_facilities),
            (ProgramCategory::Entrepreneurship, entrepreneurship_programs),
            (ProgramCategory::Entrepreneurship, entrepreneurship_facilities),
        ];
        for (category, (name, result)) in program_results {
            let entries = settle_list(&mut report, &name, result);
            snapshot.programs.get_mut(category).extend(entries);
        }

        snapshot.events = settle_list(&mut report, query::EVENTS, events);
        snapshot.events.truncate(limits.events);
        snapshot.announcements = settle_list(&mut report, query::ANNOUNCEMENTS, announcements);
        snapshot.announcements.truncate(limits.announcements);
        snapshot.news = settle_list(&mut report, query::NEWS, news);
        snapshot.news.truncate(limits.news);
        snapshot.contact = settle_optional(&mut report, query::CONTACT, contact);

        info!(
            source = self.source.name(),
            programs = snapshot.programs.total(),
            events = snapshot.events.len(),
            degraded = report.degraded_count(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Knowledge aggregated"
        );

        snapshot.report = report;
        snapshot
    }

    /// Bound one query by the per-query timeout.
    async fn bounded<T, F>(&self, name: &str, fut: F) -> Result<T, SourceError>
    where
        F: Future<Output = Result<T, SourceError>>,
    {
        match tokio::time::timeout(self.query_timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(SourceError::Timeout {
                query: name.to_string(),
                timeout: self.query_timeout,
            }),
        }
    }
}

fn settle_list<T>(
    report: &mut SourceReport,
    name: &str,
    result: Result<Vec<T>, SourceError>,
) -> Vec<T> {
    match result {
        Ok(items) if items.is_empty() => {
            report.push(name, FieldStatus::Empty);
            items
        }
        Ok(items) => {
            debug!(query = name, count = items.len(), "Query loaded");
            report.push(name, FieldStatus::Loaded { count: items.len() });
            items
        }
        Err(e) => {
            warn!(query = name, error = %e, "Knowledge query degraded");
            report.push(
                name,
                FieldStatus::Degraded {
                    reason: e.to_string(),
                },
            );
            Vec::new()
        }
    }
}

fn settle_optional<T>(
    report: &mut SourceReport,
    name: &str,
    result: Result<Option<T>, SourceError>,
) -> Option<T> {
    match result {
        Ok(Some(value)) => {
            report.push(name, FieldStatus::Loaded { count: 1 });
            Some(value)
        }
        Ok(None) => {
            report.push(name, FieldStatus::Empty);
            None
        }
        Err(e) => {
            warn!(query = name, error = %e, "Knowledge query degraded");
            report.push(
                name,
                FieldStatus::Degraded {
                    reason: e.to_string(),
                },
            );
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::in_memory::InMemorySource;
    use crate::snapshot::{
        ContactInfo, EventEntry, FeedItem, OrganizationProfile, ProgramEntry,
    };
    use crate::test_helpers::{FailingSource, StallingSource};

    fn entry(title: &str) -> ProgramEntry {
        ProgramEntry {
            title: Some(title.into()),
            description: Some(format!("{title} for secondary school students")),
            kind: None,
        }
    }

    #[tokio::test]
    async fn merges_every_field() {
        let source = InMemorySource::new();
        source
            .set_profile(OrganizationProfile {
                title: Some("About STEMpower".into()),
                ..Default::default()
            })
            .await;
        source
            .push_program(
                ProgramCategory::Center,
                ProgramFeed::Programs,
                entry("Robotics club"),
            )
            .await;
        source
            .push_program(
                ProgramCategory::Center,
                ProgramFeed::Facilities,
                entry("Hawassa University center"),
            )
            .await;
        source
            .push_event(EventEntry {
                title: Some("National science fair".into()),
                ..Default::default()
            })
            .await;
        source
            .push_announcement(FeedItem {
                title: Some("Applications open".into()),
                description: None,
            })
            .await;
        source
            .set_contact(ContactInfo {
                email: Some("info@stempower.org".into()),
                ..Default::default()
            })
            .await;

        let aggregator =
            KnowledgeAggregator::new(Arc::new(source), Arc::new(StaticFacts::default()));
        let snapshot = aggregator.aggregate().await;

        assert!(snapshot.organization_profile.is_some());
        // Programs feed first, then facilities.
        let center = snapshot.programs.get(ProgramCategory::Center);
        assert_eq!(center.len(), 2);
        assert_eq!(center[0].title.as_deref(), Some("Robotics club"));
        assert_eq!(center[1].title.as_deref(), Some("Hawassa University center"));
        assert_eq!(snapshot.events.len(), 1);
        assert_eq!(snapshot.announcements.len(), 1);
        assert!(snapshot.news.is_empty());
        assert!(snapshot.contact.is_some());

        assert_eq!(snapshot.report.queries.len(), 11);
        assert_eq!(snapshot.report.degraded_count(), 0);
        assert_eq!(
            snapshot.report.status_of("center/programs"),
            Some(&FieldStatus::Loaded { count: 1 })
        );
        assert_eq!(
            snapshot.report.status_of(query::NEWS),
            Some(&FieldStatus::Empty)
        );
    }

    #[tokio::test]
    async fn every_query_failing_still_yields_static_facts() {
        let facts = Arc::new(StaticFacts::default());
        let aggregator = KnowledgeAggregator::new(Arc::new(FailingSource), Arc::clone(&facts));

        let snapshot = aggregator.aggregate().await;

        assert_eq!(*snapshot.static_facts, *facts);
        assert!(snapshot.static_facts.has_content());
        assert!(!snapshot.has_dynamic_content());
        assert_eq!(snapshot.report.degraded_count(), 11);
    }

    #[tokio::test]
    async fn one_failure_is_isolated_to_its_field() {
        let source = InMemorySource::new();
        source
            .push_news(FeedItem {
                title: Some("New center opens in Bahir Dar".into()),
                description: None,
            })
            .await;
        source
            .push_event(EventEntry {
                title: Some("Maker week".into()),
                ..Default::default()
            })
            .await;
        source.fail_query(query::EVENTS).await;

        let aggregator =
            KnowledgeAggregator::new(Arc::new(source), Arc::new(StaticFacts::default()));
        let snapshot = aggregator.aggregate().await;

        assert!(snapshot.events.is_empty());
        assert_eq!(snapshot.news.len(), 1);
        assert_eq!(snapshot.report.degraded_count(), 1);
        assert!(matches!(
            snapshot.report.status_of(query::EVENTS),
            Some(FieldStatus::Degraded { .. })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn slow_query_times_out_without_holding_back_others() {
        let source = StallingSource::new(query::CONTACT);
        let aggregator = KnowledgeAggregator::new(
            Arc::new(source),
            Arc::new(StaticFacts::default()),
        )
        .with_query_timeout(Duration::from_secs(2));

        let snapshot = aggregator.aggregate().await;

        assert!(snapshot.contact.is_none());
        match snapshot.report.status_of(query::CONTACT) {
            Some(FieldStatus::Degraded { reason }) => assert!(reason.contains("timed out")),
            other => panic!("expected a timeout, got {other:?}"),
        }
        assert_eq!(
            snapshot.report.status_of(query::ORGANIZATION_PROFILE),
            Some(&FieldStatus::Loaded { count: 1 })
        );
    }

    #[tokio::test(start_paused = true)]
    async fn sub_second_timeout_is_reported_exactly() {
        let aggregator = KnowledgeAggregator::new(
            Arc::new(StallingSource::new(query::NEWS)),
            Arc::new(StaticFacts::default()),
        )
        .with_query_timeout(Duration::from_millis(250));

        let snapshot = aggregator.aggregate().await;

        match snapshot.report.status_of(query::NEWS) {
            Some(FieldStatus::Degraded { reason }) => assert!(reason.contains("250ms"), "{reason}"),
            other => panic!("expected a timeout, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn feeds_are_truncated_to_limits() {
        let source = InMemorySource::new();
        for i in 0..8 {
            source
                .push_announcement(FeedItem {
                    title: Some(format!("Announcement number {i}")),
                    description: None,
                })
                .await;
        }
        let aggregator =
            KnowledgeAggregator::new(Arc::new(source), Arc::new(StaticFacts::default()))
                .with_limits(FeedLimits {
                    events: 5,
                    announcements: 3,
                    news: 5,
                });

        let snapshot = aggregator.aggregate().await;
        assert_eq!(snapshot.announcements.len(), 3);
    }
}
