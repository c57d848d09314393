//! SQLite persistence for events.
//!
//! Events are keyed by provider event id and written first-write-wins: an
//! upsert of a known id is a no-op. Reads accept an optional region filter and
//! a sort restricted to a fixed set of columns and a row limit capped at
//! [`PAGE_SIZE`]. Sort names match exactly; anything else falls back to the
//! defaults.

use std::str::FromStr;

use chrono::DateTime;
use serde::Serialize;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{FromRow, Row, SqlitePool};
use tracing::debug;

use crate::errors::QuakeError;
use crate::models::{Event, UNKNOWN_PLACE};

/// Maximum rows returned by [`Store::query`].
pub const PAGE_SIZE: u32 = 50;

const EVENT_COLUMNS: &str =
    "event_id, occurred_at, epicenter_name, magnitude, latitude, longitude, city, region";

/// Result of an idempotent insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum UpsertOutcome {
    Inserted,
    AlreadyPresent,
}

/// Columns a query may sort on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortColumn {
    #[default]
    OccurredAt,
    EpicenterName,
    Magnitude,
    City,
    Region,
}

impl SortColumn {
    /// SQL column name. Only these strings ever reach `ORDER BY`.
    #[must_use]
    pub const fn column(self) -> &'static str {
        match self {
            Self::OccurredAt => "occurred_at",
            Self::EpicenterName => "epicenter_name",
            Self::Magnitude => "magnitude",
            Self::City => "city",
            Self::Region => "region",
        }
    }

    /// Parse a user-supplied column, falling back to `occurred_at`.
    #[must_use]
    pub fn parse_or_default(s: &str) -> Self {
        s.parse().unwrap_or_default()
    }
}

impl FromStr for SortColumn {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "occurred_at" | "time" => Ok(Self::OccurredAt),
            "epicenter_name" => Ok(Self::EpicenterName),
            "magnitude" => Ok(Self::Magnitude),
            "city" => Ok(Self::City),
            "region" | "prefecture" => Ok(Self::Region),
            _ => Err(format!("unknown sort column: {s}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    #[must_use]
    pub const fn keyword(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }

    /// Parse a user-supplied direction, falling back to descending.
    #[must_use]
    pub fn parse_or_default(s: &str) -> Self {
        s.parse().unwrap_or_default()
    }
}

impl FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "asc" => Ok(Self::Asc),
            "desc" => Ok(Self::Desc),
            _ => Err(format!("unknown sort order: {s}")),
        }
    }
}

/// Read parameters for [`Store::query`].
#[derive(Debug, Clone)]
pub struct EventQuery {
    pub region: Option<String>,
    pub sort: SortColumn,
    pub order: SortOrder,
    /// Row limit, clamped to [`PAGE_SIZE`]
    pub limit: u32,
}

impl Default for EventQuery {
    fn default() -> Self {
        Self {
            region: None,
            sort: SortColumn::default(),
            order: SortOrder::default(),
            limit: PAGE_SIZE,
        }
    }
}

impl EventQuery {
    /// Build a query from loosely-typed inputs, coercing anything outside the
    /// allow-lists to the defaults. An empty region or exactly `all` means no
    /// filter.
    #[must_use]
    pub fn from_params(region: Option<&str>, sort_by: &str, order: &str) -> Self {
        let region = region
            .filter(|r| !r.is_empty() && *r != "all")
            .map(str::to_string);

        Self {
            region,
            sort: SortColumn::parse_or_default(sort_by),
            order: SortOrder::parse_or_default(order),
            limit: PAGE_SIZE,
        }
    }

    #[must_use]
    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = limit;
        self
    }

    fn effective_limit(&self) -> u32 {
        self.limit.min(PAGE_SIZE)
    }

    fn sql(&self) -> String {
        let filter = if self.region.is_some() {
            " WHERE region = ?"
        } else {
            ""
        };
        format!(
            "SELECT {EVENT_COLUMNS} FROM events{filter} ORDER BY {} {}, event_id ASC LIMIT ?",
            self.sort.column(),
            self.order.keyword(),
        )
    }
}

impl<'r> FromRow<'r, SqliteRow> for Event {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let occurred_at: String = row.try_get("occurred_at")?;
        let occurred_at =
            DateTime::parse_from_rfc3339(&occurred_at).map_err(|e| sqlx::Error::ColumnDecode {
                index: "occurred_at".to_string(),
                source: Box::new(e),
            })?;

        Ok(Self {
            event_id: row.try_get("event_id")?,
            occurred_at,
            epicenter_name: row.try_get("epicenter_name")?,
            magnitude: row.try_get("magnitude")?,
            latitude: row.try_get("latitude")?,
            longitude: row.try_get("longitude")?,
            city: row.try_get("city")?,
            region: row.try_get("region")?,
        })
    }
}

/// Event store backed by a SQLite pool.
#[derive(Debug, Clone)]
pub struct Store {
    pool: SqlitePool,
}

impl Store {
    /// Open (creating if needed) the database file at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or migrated.
    pub async fn open(path: &str) -> Result<Self, QuakeError> {
        let options = SqliteConnectOptions::from_str(&format!("sqlite:{path}"))?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    /// A private in-memory database.
    ///
    /// # Errors
    ///
    /// Returns an error if the schema cannot be created.
    pub async fn in_memory() -> Result<Self, QuakeError> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;

        // Every in-memory connection is its own database, so keep exactly one.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    async fn migrate(&self) -> Result<(), QuakeError> {
        let migration_sql = include_str!("../migrations/001_events.sql");
        // sqlx runs one statement per call
        for statement in migration_sql.split(';') {
            let trimmed = statement.trim();
            if !trimmed.is_empty() {
                sqlx::query(trimmed).execute(&self.pool).await?;
            }
        }
        Ok(())
    }

    /// Insert an event unless its id is already stored.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    pub async fn upsert(&self, event: &Event) -> Result<UpsertOutcome, QuakeError> {
        let result = sqlx::query(
            "INSERT OR IGNORE INTO events (event_id, occurred_at, epicenter_name, magnitude, latitude, longitude, city, region)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&event.event_id)
        .bind(event.occurred_at.to_rfc3339())
        .bind(&event.epicenter_name)
        .bind(event.magnitude)
        .bind(event.latitude)
        .bind(event.longitude)
        .bind(&event.city)
        .bind(&event.region)
        .execute(&self.pool)
        .await?;

        let outcome = if result.rows_affected() > 0 {
            UpsertOutcome::Inserted
        } else {
            UpsertOutcome::AlreadyPresent
        };
        debug!(event_id = %event.event_id, ?outcome, "upsert");
        Ok(outcome)
    }

    /// Whether an event id is already stored.
    ///
    /// # Errors
    ///
    /// Returns an error if the read fails.
    pub async fn contains(&self, event_id: &str) -> Result<bool, QuakeError> {
        let found: Option<i64> = sqlx::query_scalar("SELECT 1 FROM events WHERE event_id = ?")
            .bind(event_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(found.is_some())
    }

    /// Filtered, sorted page of events.
    ///
    /// # Errors
    ///
    /// Returns an error if the read fails.
    pub async fn query(&self, query: &EventQuery) -> Result<Vec<Event>, QuakeError> {
        let sql = query.sql();
        let mut q = sqlx::query_as::<_, Event>(&sql);
        if let Some(region) = &query.region {
            q = q.bind(region);
        }
        q = q.bind(query.effective_limit());
        Ok(q.fetch_all(&self.pool).await?)
    }

    /// Distinct resolved regions, sorted, excluding the unknown sentinel.
    ///
    /// # Errors
    ///
    /// Returns an error if the read fails.
    pub async fn regions(&self) -> Result<Vec<String>, QuakeError> {
        let regions: Vec<String> = sqlx::query_scalar(
            "SELECT DISTINCT region FROM events WHERE region != ? ORDER BY region",
        )
        .bind(UNKNOWN_PLACE)
        .fetch_all(&self.pool)
        .await?;
        Ok(regions)
    }

    /// Total number of stored events.
    ///
    /// # Errors
    ///
    /// Returns an error if the read fails.
    pub async fn count(&self) -> Result<i64, QuakeError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM events")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}
