//! SQLite source reading the website's content tables.
//!
//! The CRUD side of the site owns these tables; this source only reads them:
//! - `about`: the organization profile (`core_values` holds a JSON array)
//! - `programs` / `facilities`: the two program feeds, keyed by `category`
//! - `events`, `announcements`, `news`: dated feeds
//! - `contact_info`: the public contact block
//!
//! Only rows with `is_active = 1` are returned. A missing table or column
//! fails just the query that needs it.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};
use std::str::FromStr;
use stemchat_core::error::SourceError;
use tracing::{debug, info, warn};

use crate::snapshot::{
    ContactInfo, EventEntry, FeedItem, OrganizationProfile, ProgramCategory, ProgramEntry,
};
use crate::source::{KnowledgeSource, ProgramFeed, program_query_name, query};

/// A read-only view over the website database.
pub struct SqliteSource {
    pool: SqlitePool,
}

impl SqliteSource {
    /// Open the database at `url` (e.g. `sqlite://data/site.db`).
    ///
    /// The file must already exist; this source never creates the schema of
    /// a production database.
    pub async fn connect(url: &str) -> Result<Self, SourceError> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(|e| SourceError::Unavailable(format!("Invalid SQLite URL: {e}")))?
            .create_if_missing(false)
            .read_only(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await
            .map_err(|e| SourceError::Unavailable(format!("Failed to open SQLite: {e}")))?;

        info!("SQLite knowledge source opened at {url}");
        Ok(Self { pool })
    }

    /// Wrap an existing pool (useful for testing).
    pub fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create the content tables if they do not exist.
    ///
    /// Meant for fresh development databases and tests.
    pub async fn ensure_schema(&self) -> Result<(), SourceError> {
        const TABLES: &[(&str, &str)] = &[
            (
                "about",
                r#"
                CREATE TABLE IF NOT EXISTS about (
                    id          INTEGER PRIMARY KEY AUTOINCREMENT,
                    title       TEXT,
                    description TEXT,
                    mission     TEXT,
                    vision      TEXT,
                    core_values TEXT,
                    is_active   INTEGER NOT NULL DEFAULT 1,
                    updated_at  TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
                )
                "#,
            ),
            (
                "programs",
                r#"
                CREATE TABLE IF NOT EXISTS programs (
                    id          INTEGER PRIMARY KEY AUTOINCREMENT,
                    title       TEXT,
                    description TEXT,
                    category    TEXT NOT NULL,
                    type        TEXT,
                    sort_order  INTEGER NOT NULL DEFAULT 0,
                    is_active   INTEGER NOT NULL DEFAULT 1
                )
                "#,
            ),
            (
                "facilities",
                r#"
                CREATE TABLE IF NOT EXISTS facilities (
                    id          INTEGER PRIMARY KEY AUTOINCREMENT,
                    name        TEXT,
                    description TEXT,
                    category    TEXT NOT NULL,
                    type        TEXT,
                    sort_order  INTEGER NOT NULL DEFAULT 0,
                    is_active   INTEGER NOT NULL DEFAULT 1
                )
                "#,
            ),
            (
                "events",
                r#"
                CREATE TABLE IF NOT EXISTS events (
                    id          INTEGER PRIMARY KEY AUTOINCREMENT,
                    title       TEXT,
                    description TEXT,
                    start_date  TEXT,
                    is_active   INTEGER NOT NULL DEFAULT 1
                )
                "#,
            ),
            (
                "announcements",
                r#"
                CREATE TABLE IF NOT EXISTS announcements (
                    id          INTEGER PRIMARY KEY AUTOINCREMENT,
                    title       TEXT,
                    description TEXT,
                    is_active   INTEGER NOT NULL DEFAULT 1,
                    created_at  TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
                )
                "#,
            ),
            (
                "news",
                r#"
                CREATE TABLE IF NOT EXISTS news (
                    id           INTEGER PRIMARY KEY AUTOINCREMENT,
                    title        TEXT,
                    summary      TEXT,
                    published_at TEXT,
                    is_active    INTEGER NOT NULL DEFAULT 1
                )
                "#,
            ),
            (
                "contact_info",
                r#"
                CREATE TABLE IF NOT EXISTS contact_info (
                    id      INTEGER PRIMARY KEY AUTOINCREMENT,
                    address TEXT,
                    email   TEXT,
                    phone   TEXT
                )
                "#,
            ),
        ];

        for &(table, ddl) in TABLES {
            sqlx::query(ddl)
                .execute(&self.pool)
                .await
                .map_err(|e| SourceError::QueryFailed {
                    query: format!("create {table}"),
                    reason: e.to_string(),
                })?;
        }

        debug!("SQLite content schema ensured");
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn fetch_all(
        &self,
        name: &str,
        sql: &str,
        bind: Option<&str>,
        limit: Option<usize>,
    ) -> Result<Vec<SqliteRow>, SourceError> {
        let mut q = sqlx::query(sql);
        if let Some(value) = bind {
            q = q.bind(value.to_string());
        }
        if let Some(limit) = limit {
            q = q.bind(i64::try_from(limit).unwrap_or(i64::MAX));
        }
        q.fetch_all(&self.pool)
            .await
            .map_err(|e| SourceError::QueryFailed {
                query: name.to_string(),
                reason: e.to_string(),
            })
    }
}

/// Read an optional text column, treating NULL as absent.
fn text(row: &SqliteRow, column: &str, query: &str) -> Result<Option<String>, SourceError> {
    row.try_get::<Option<String>, _>(column)
        .map_err(|e| SourceError::Malformed {
            query: query.to_string(),
            reason: format!("{column} column: {e}"),
        })
}

/// Decode the JSON-encoded `core_values` column. Anything unparsable
/// degrades to an empty list.
fn parse_values(raw: Option<&str>) -> Vec<String> {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return Vec::new();
    };
    match serde_json::from_str::<Vec<String>>(raw) {
        Ok(values) => values,
        Err(e) => {
            warn!(error = %e, "Ignoring malformed about.core_values");
            Vec::new()
        }
    }
}

/// Parse the date formats the admin pages have written over time.
pub(crate) fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

#[async_trait]
impl KnowledgeSource for SqliteSource {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn organization_profile(&self) -> Result<Option<OrganizationProfile>, SourceError> {
        let name = query::ORGANIZATION_PROFILE;
        let rows = self
            .fetch_all(
                name,
                "SELECT title, description, mission, vision, core_values FROM about \
                 WHERE is_active = 1 ORDER BY updated_at DESC, id DESC LIMIT 1",
                None,
                None,
            )
            .await?;

        let Some(row) = rows.first() else {
            return Ok(None);
        };

        Ok(Some(OrganizationProfile {
            title: text(row, "title", name)?,
            description: text(row, "description", name)?,
            mission: text(row, "mission", name)?,
            vision: text(row, "vision", name)?,
            values: parse_values(text(row, "core_values", name)?.as_deref()),
        }))
    }

    async fn programs(
        &self,
        category: ProgramCategory,
        feed: ProgramFeed,
    ) -> Result<Vec<ProgramEntry>, SourceError> {
        let name = program_query_name(category, feed);
        let sql = match feed {
            ProgramFeed::Programs => {
                "SELECT title, description, type FROM programs \
                 WHERE is_active = 1 AND category = ? ORDER BY sort_order, id"
            }
            ProgramFeed::Facilities => {
                "SELECT name AS title, description, type FROM facilities \
                 WHERE is_active = 1 AND category = ? ORDER BY sort_order, id"
            }
        };

        let rows = self.fetch_all(&name, sql, Some(category.key()), None).await?;
        rows.iter()
            .map(|row| {
                Ok(ProgramEntry {
                    title: text(row, "title", &name)?,
                    description: text(row, "description", &name)?,
                    kind: text(row, "type", &name)?,
                })
            })
            .collect()
    }

    async fn events(&self, limit: usize) -> Result<Vec<EventEntry>, SourceError> {
        let name = query::EVENTS;
        let rows = self
            .fetch_all(
                name,
                "SELECT title, description, start_date FROM events \
                 WHERE is_active = 1 ORDER BY start_date DESC, id DESC LIMIT ?",
                None,
                Some(limit),
            )
            .await?;

        rows.iter()
            .map(|row| {
                Ok(EventEntry {
                    title: text(row, "title", name)?,
                    description: text(row, "description", name)?,
                    start_date: text(row, "start_date", name)?
                        .as_deref()
                        .and_then(parse_date),
                })
            })
            .collect()
    }

    async fn announcements(&self, limit: usize) -> Result<Vec<FeedItem>, SourceError> {
        let name = query::ANNOUNCEMENTS;
        let rows = self
            .fetch_all(
                name,
                "SELECT title, description FROM announcements \
                 WHERE is_active = 1 ORDER BY created_at DESC, id DESC LIMIT ?",
                None,
                Some(limit),
            )
            .await?;

        rows.iter()
            .map(|row| {
                Ok(FeedItem {
                    title: text(row, "title", name)?,
                    description: text(row, "description", name)?,
                })
            })
            .collect()
    }

    async fn news(&self, limit: usize) -> Result<Vec<FeedItem>, SourceError> {
        let name = query::NEWS;
        let rows = self
            .fetch_all(
                name,
                "SELECT title, summary AS description FROM news \
                 WHERE is_active = 1 ORDER BY published_at DESC, id DESC LIMIT ?",
                None,
                Some(limit),
            )
            .await?;

        rows.iter()
            .map(|row| {
                Ok(FeedItem {
                    title: text(row, "title", name)?,
                    description: text(row, "description", name)?,
                })
            })
            .collect()
    }

    async fn contact(&self) -> Result<Option<ContactInfo>, SourceError> {
        let name = query::CONTACT;
        let rows = self
            .fetch_all(
                name,
                "SELECT address, email, phone FROM contact_info ORDER BY id DESC LIMIT 1",
                None,
                None,
            )
            .await?;

        let Some(row) = rows.first() else {
            return Ok(None);
        };

        Ok(Some(ContactInfo {
            address: text(row, "address", name)?,
            email: text(row, "email", name)?,
            phone: text(row, "phone", name)?,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    async fn test_pool() -> SqlitePool {
        // A single connection keeps every query on the same in-memory database.
        SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap()
    }

    async fn seeded_source() -> SqliteSource {
        let source = SqliteSource::from_pool(test_pool().await);
        source.ensure_schema().await.unwrap();
        source
    }

    async fn exec(source: &SqliteSource, sql: &str) {
        sqlx::query(sql).execute(source.pool()).await.unwrap();
    }

    #[tokio::test]
    async fn empty_tables_yield_nothing() {
        let source = seeded_source().await;
        assert!(source.organization_profile().await.unwrap().is_none());
        assert!(source.events(5).await.unwrap().is_empty());
        assert!(source.contact().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn profile_decodes_core_values() {
        let source = seeded_source().await;
        exec(
            &source,
            r#"INSERT INTO about (title, description, mission, core_values)
               VALUES ('About us', 'We run STEM centers', 'Hands-on science for all',
                       '["Curiosity", "Integrity in everything"]')"#,
        )
        .await;

        let profile = source.organization_profile().await.unwrap().unwrap();
        assert_eq!(profile.title.as_deref(), Some("About us"));
        assert_eq!(profile.vision, None);
        assert_eq!(profile.values, vec!["Curiosity", "Integrity in everything"]);
    }

    #[tokio::test]
    async fn malformed_core_values_degrade_to_empty() {
        let source = seeded_source().await;
        exec(
            &source,
            "INSERT INTO about (title, core_values) VALUES ('About us', '{not json')",
        )
        .await;

        let profile = source.organization_profile().await.unwrap().unwrap();
        assert!(profile.values.is_empty());
    }

    #[tokio::test]
    async fn inactive_rows_are_skipped() {
        let source = seeded_source().await;
        exec(
            &source,
            "INSERT INTO programs (title, category, is_active) VALUES
                ('Robotics club', 'center', 1),
                ('Retired course', 'center', 0),
                ('3D printing basics', 'fabrication', 1)",
        )
        .await;

        let center = source
            .programs(ProgramCategory::Center, ProgramFeed::Programs)
            .await
            .unwrap();
        assert_eq!(center.len(), 1);
        assert_eq!(center[0].title.as_deref(), Some("Robotics club"));
    }

    #[tokio::test]
    async fn facilities_feed_maps_name_to_title() {
        let source = seeded_source().await;
        exec(
            &source,
            "INSERT INTO facilities (name, description, category, type)
             VALUES ('Addis Ababa University STEM Center', 'Our first center', 'center', 'STEM Center')",
        )
        .await;

        let facilities = source
            .programs(ProgramCategory::Center, ProgramFeed::Facilities)
            .await
            .unwrap();
        assert_eq!(
            facilities[0].title.as_deref(),
            Some("Addis Ababa University STEM Center")
        );
        assert_eq!(facilities[0].kind.as_deref(), Some("STEM Center"));
    }

    #[tokio::test]
    async fn events_are_newest_first_and_limited() {
        let source = seeded_source().await;
        exec(
            &source,
            "INSERT INTO events (title, start_date) VALUES
                ('Science fair', '2026-03-03'),
                ('Robotics day', '2026-05-20 10:00:00'),
                ('Open lab', '2026-04-11T09:30:00Z')",
        )
        .await;

        let events = source.events(2).await.unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].title.as_deref(), Some("Robotics day"));
        assert_eq!(events[1].title.as_deref(), Some("Open lab"));
        let date = events[0].start_date.unwrap();
        assert_eq!((date.month(), date.day(), date.hour()), (5, 20, 10));
    }

    #[tokio::test]
    async fn news_reads_summary_as_description() {
        let source = seeded_source().await;
        exec(
            &source,
            "INSERT INTO news (title, summary, published_at)
             VALUES ('New FabLab opens', 'A makerspace opened in Hawassa', '2026-01-10')",
        )
        .await;

        let news = source.news(5).await.unwrap();
        assert_eq!(
            news[0].description.as_deref(),
            Some("A makerspace opened in Hawassa")
        );
    }

    #[tokio::test]
    async fn missing_table_fails_only_its_query() {
        let source = SqliteSource::from_pool(test_pool().await);
        exec(
            &source,
            "CREATE TABLE contact_info (id INTEGER PRIMARY KEY, address TEXT, email TEXT, phone TEXT)",
        )
        .await;
        exec(
            &source,
            "INSERT INTO contact_info (address, email) VALUES ('Bole, Addis Ababa', 'info@stempower.org')",
        )
        .await;

        assert!(matches!(
            source.events(5).await,
            Err(SourceError::QueryFailed { .. })
        ));
        let contact = source.contact().await.unwrap().unwrap();
        assert_eq!(contact.email.as_deref(), Some("info@stempower.org"));
        assert_eq!(contact.phone, None);
    }

    #[tokio::test]
    async fn connect_to_missing_file_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}", dir.path().join("missing.db").display());
        assert!(matches!(
            SqliteSource::connect(&url).await,
            Err(SourceError::Unavailable(_))
        ));
    }

    #[test]
    fn parses_known_date_formats() {
        assert!(parse_date("2026-03-03").is_some());
        assert!(parse_date("2026-03-03 14:00:00").is_some());
        assert!(parse_date("2026-03-03T14:00:00").is_some());
        assert!(parse_date("2026-03-03T14:00:00+03:00").is_some());
        assert!(parse_date("next tuesday").is_none());
    }
}
