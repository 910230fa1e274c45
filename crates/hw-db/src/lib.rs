//! Storage layer for client analytics.
//!
//! Provides persistence for geo events, card transactions, client cities and
//! debt status using `rusqlite`, and implements the query half of event
//! loading.
//!
//! # Thread Safety
//!
//! The [`Database`] type wraps a `rusqlite::Connection`, which is `Send` but not `Sync`.
//! Load event snapshots on one thread, then hand the owned vectors to
//! parallel inference.
//!
//! # Schema
//!
//! ## Timestamp Format
//!
//! Timestamps are stored as TEXT in RFC 3339 UTC with millisecond precision
//! (e.g., `2024-01-15T10:30:00.000Z`), so lexicographic order matches
//! chronological order and range filters can run in SQL.
//!
//! ## Coordinates
//!
//! `latitude` / `longitude` are nullable and stored exactly as exported.
//! Rows with unusable coordinates are kept; they are excluded when loaded.

use std::path::Path;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Value;
use rusqlite::{Connection, Params, params, params_from_iter};
use thiserror::Error;

use hw_core::planner::{MerchantSpend, merchant_shares};
use hw_core::{ClientId, EventFilter, GeoEvent, RawGeoEvent, TimeRange, ValidationError};

/// Merchant label used when a transaction has no merchant name.
pub const UNKNOWN_MERCHANT: &str = "—";

/// Database errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// An error from the underlying database.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// Failed to parse a stored timestamp.
    #[error("invalid timestamp for row {row_id}: {timestamp}")]
    TimestampParse {
        row_id: String,
        timestamp: String,
        #[source]
        source: chrono::ParseError,
    },
    /// A stored client ID failed validation.
    #[error("invalid client id for row {row_id}: {source}")]
    InvalidClientId {
        row_id: String,
        #[source]
        source: ValidationError,
    },
}

/// Database connection wrapper.
///
/// See the [module documentation](self) for thread safety considerations.
pub struct Database {
    conn: Connection,
}

/// A geo event row ready to be stored.
#[derive(Debug, Clone, PartialEq)]
pub struct GeoEventRecord {
    pub id: String,
    pub client_id: ClientId,
    pub action: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub timestamp: DateTime<Utc>,
}

/// A card transaction row ready to be stored.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionRecord {
    pub id: String,
    pub client_id: ClientId,
    pub posted_at: DateTime<Utc>,
    pub merchant_name: Option<String>,
    pub amount: f64,
    /// `out` for spending, `in` for income.
    pub direction: String,
}

/// A client's home city as recorded upstream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientCityRecord {
    pub client_id: ClientId,
    pub city: Option<String>,
}

/// One debt contract of a client.
#[derive(Debug, Clone, PartialEq)]
pub struct DebtRecord {
    pub id: String,
    pub client_id: ClientId,
    /// Total outstanding amount. Clients only count as debtors above zero.
    pub amount: Option<f64>,
    pub overdue_bucket: Option<String>,
    /// Non-performing loan flag.
    pub npl: Option<bool>,
}

/// Selects clients by debt status for portfolio-wide queries.
///
/// A client matches when at least one of its contracts has a positive
/// amount and satisfies every set bound.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DebtFilter {
    pub min_amount: Option<f64>,
    pub max_amount: Option<f64>,
    /// Allowed overdue buckets. Empty admits any bucket.
    pub buckets: Vec<String>,
    pub npl: Option<bool>,
    /// Keep only clients whose latest qualifying event is at or after this
    /// instant, regardless of the query window.
    pub last_event_since: Option<DateTime<Utc>>,
}

/// Event volume per action tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionSummary {
    pub action: String,
    pub events: i64,
    pub clients: i64,
    pub last_event: String,
}

impl Database {
    /// Opens a database at the given path, creating it if necessary.
    ///
    /// The database schema is automatically initialized on first open.
    pub fn open(path: &Path) -> Result<Self, DbError> {
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Opens an in-memory database.
    ///
    /// Useful for testing. The database is destroyed when the connection closes.
    pub fn open_in_memory() -> Result<Self, DbError> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Initializes the database schema.
    ///
    /// This is idempotent - safe to call on an already-initialized database.
    fn init(&self) -> Result<(), DbError> {
        self.conn.execute_batch(
            "
            -- Geo events: login-like signals with optional coordinates
            CREATE TABLE IF NOT EXISTS geo_events (
                id TEXT PRIMARY KEY,
                client_id TEXT NOT NULL,
                action TEXT NOT NULL,
                latitude REAL,
                longitude REAL,
                timestamp TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_geo_events_client_ts ON geo_events(client_id, timestamp);
            CREATE INDEX IF NOT EXISTS idx_geo_events_action ON geo_events(action);

            CREATE TABLE IF NOT EXISTS transactions (
                id TEXT PRIMARY KEY,
                client_id TEXT NOT NULL,
                posted_at TEXT NOT NULL,
                merchant_name TEXT,
                amount REAL NOT NULL,
                direction TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_transactions_client_ts
                ON transactions(client_id, posted_at);

            CREATE TABLE IF NOT EXISTS client_cities (
                client_id TEXT PRIMARY KEY,
                city TEXT
            );

            -- Debt contracts; a client may hold several
            CREATE TABLE IF NOT EXISTS debts (
                id TEXT PRIMARY KEY,
                client_id TEXT NOT NULL,
                amount REAL,
                overdue_bucket TEXT,
                npl INTEGER
            );

            CREATE INDEX IF NOT EXISTS idx_debts_client ON debts(client_id);
            ",
        )?;
        Ok(())
    }

    /// Inserts a batch of geo events, ignoring duplicates by ID.
    pub fn insert_geo_events(&mut self, events: &[GeoEventRecord]) -> Result<usize, DbError> {
        if events.is_empty() {
            return Ok(0);
        }
        let tx = self.conn.transaction()?;
        let mut inserted = 0;
        {
            let mut stmt = tx.prepare(
                "
                INSERT OR IGNORE INTO geo_events
                (id, client_id, action, latitude, longitude, timestamp)
                VALUES (?, ?, ?, ?, ?, ?)
                ",
            )?;
            for event in events {
                inserted += stmt.execute(params![
                    event.id,
                    event.client_id.as_str(),
                    event.action,
                    event.latitude,
                    event.longitude,
                    format_timestamp(event.timestamp),
                ])?;
            }
        }
        tx.commit()?;
        tracing::debug!(inserted, total = events.len(), "stored geo events");
        Ok(inserted)
    }

    /// Inserts a batch of transactions, ignoring duplicates by ID.
    pub fn insert_transactions(&mut self, rows: &[TransactionRecord]) -> Result<usize, DbError> {
        if rows.is_empty() {
            return Ok(0);
        }
        let tx = self.conn.transaction()?;
        let mut inserted = 0;
        {
            let mut stmt = tx.prepare(
                "
                INSERT OR IGNORE INTO transactions
                (id, client_id, posted_at, merchant_name, amount, direction)
                VALUES (?, ?, ?, ?, ?, ?)
                ",
            )?;
            for row in rows {
                inserted += stmt.execute(params![
                    row.id,
                    row.client_id.as_str(),
                    format_timestamp(row.posted_at),
                    row.merchant_name,
                    row.amount,
                    row.direction,
                ])?;
            }
        }
        tx.commit()?;
        tracing::debug!(inserted, total = rows.len(), "stored transactions");
        Ok(inserted)
    }

    /// Inserts or replaces client cities.
    pub fn upsert_client_cities(&mut self, rows: &[ClientCityRecord]) -> Result<usize, DbError> {
        if rows.is_empty() {
            return Ok(0);
        }
        let tx = self.conn.transaction()?;
        let mut written = 0;
        {
            let mut stmt = tx.prepare(
                "
                INSERT INTO client_cities (client_id, city) VALUES (?, ?)
                ON CONFLICT(client_id) DO UPDATE SET city = excluded.city
                ",
            )?;
            for row in rows {
                written += stmt.execute(params![row.client_id.as_str(), row.city])?;
            }
        }
        tx.commit()?;
        Ok(written)
    }

    /// Inserts a batch of debt contracts, ignoring duplicates by ID.
    pub fn insert_debts(&mut self, rows: &[DebtRecord]) -> Result<usize, DbError> {
        if rows.is_empty() {
            return Ok(0);
        }
        let tx = self.conn.transaction()?;
        let mut inserted = 0;
        {
            let mut stmt = tx.prepare(
                "
                INSERT OR IGNORE INTO debts
                (id, client_id, amount, overdue_bucket, npl)
                VALUES (?, ?, ?, ?, ?)
                ",
            )?;
            for row in rows {
                inserted += stmt.execute(params![
                    row.id,
                    row.client_id.as_str(),
                    row.amount,
                    row.overdue_bucket,
                    row.npl,
                ])?;
            }
        }
        tx.commit()?;
        tracing::debug!(inserted, total = rows.len(), "stored debts");
        Ok(inserted)
    }

    /// Loads one client's admitted geo events, most recent first.
    ///
    /// SQL narrows by client, action and time window; coordinate rules are
    /// applied by the [`EventFilter`] itself.
    pub fn load_geo_events(
        &self,
        client_id: &ClientId,
        filter: &EventFilter,
    ) -> Result<Vec<GeoEvent>, DbError> {
        if filter.actions.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders = vec!["?"; filter.actions.len()].join(", ");
        let mut sql = format!(
            "
            SELECT id, client_id, action, latitude, longitude, timestamp
            FROM geo_events
            WHERE client_id = ? AND action IN ({placeholders})
            "
        );
        let mut values: Vec<String> = Vec::with_capacity(filter.actions.len() + 3);
        values.push(client_id.as_str().to_string());
        values.extend(filter.actions.iter().cloned());
        if let Some(from) = filter.range.from {
            sql.push_str(" AND timestamp >= ?");
            values.push(format_timestamp(from));
        }
        if let Some(to) = filter.range.to {
            sql.push_str(" AND timestamp <= ?");
            values.push(format_timestamp(to));
        }
        sql.push_str(" ORDER BY timestamp DESC, id ASC");

        let raw = self.query_geo_rows(&sql, params_from_iter(values.iter()))?;
        let scanned = raw.len();
        let events = filter.load(raw);
        tracing::debug!(
            client = %client_id,
            scanned,
            admitted = events.len(),
            "loaded geo events"
        );
        Ok(events)
    }

    /// Loads admitted geo events of every client matching `debts`, most
    /// recent first.
    pub fn load_portfolio_geo_events(
        &self,
        debts: &DebtFilter,
        filter: &EventFilter,
    ) -> Result<Vec<GeoEvent>, DbError> {
        if filter.actions.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders = vec!["?"; filter.actions.len()].join(", ");
        let actions = filter.actions.iter().cloned().map(Value::Text);
        let mut sql = format!(
            "
            SELECT id, client_id, action, latitude, longitude, timestamp
            FROM geo_events
            WHERE action IN ({placeholders})
            "
        );
        let mut values: Vec<Value> = actions.clone().collect();
        if let Some(from) = filter.range.from {
            sql.push_str(" AND timestamp >= ?");
            values.push(Value::Text(format_timestamp(from)));
        }
        if let Some(to) = filter.range.to {
            sql.push_str(" AND timestamp <= ?");
            values.push(Value::Text(format_timestamp(to)));
        }

        sql.push_str(" AND client_id IN (SELECT client_id FROM debts WHERE amount > 0");
        if let Some(min) = debts.min_amount {
            sql.push_str(" AND amount >= ?");
            values.push(Value::Real(min));
        }
        if let Some(max) = debts.max_amount {
            sql.push_str(" AND amount <= ?");
            values.push(Value::Real(max));
        }
        if !debts.buckets.is_empty() {
            let slots = vec!["?"; debts.buckets.len()].join(", ");
            sql.push_str(&format!(" AND overdue_bucket IN ({slots})"));
            values.extend(debts.buckets.iter().cloned().map(Value::Text));
        }
        if let Some(npl) = debts.npl {
            sql.push_str(" AND npl = ?");
            values.push(Value::Integer(i64::from(npl)));
        }
        sql.push(')');

        if let Some(since) = debts.last_event_since {
            sql.push_str(&format!(
                " AND client_id IN (
                    SELECT client_id FROM geo_events
                    WHERE action IN ({placeholders})
                    GROUP BY client_id
                    HAVING MAX(timestamp) >= ?
                )"
            ));
            values.extend(actions);
            values.push(Value::Text(format_timestamp(since)));
        }
        sql.push_str(" ORDER BY timestamp DESC, id ASC");

        let raw = self.query_geo_rows(&sql, params_from_iter(values.iter()))?;
        let scanned = raw.len();
        let events = filter.load(raw);
        tracing::debug!(?debts, scanned, admitted = events.len(), "loaded portfolio geo events");
        Ok(events)
    }

    fn query_geo_rows<P: Params>(&self, sql: &str, params: P) -> Result<Vec<RawGeoEvent>, DbError> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map(params, |row| {
            Ok(GeoEventRow {
                id: row.get(0)?,
                client_id: row.get(1)?,
                action: row.get(2)?,
                latitude: row.get(3)?,
                longitude: row.get(4)?,
                timestamp: row.get(5)?,
            })
        })?;

        let mut raw = Vec::new();
        for row in rows {
            raw.push(row?.into_raw()?);
        }
        Ok(raw)
    }

    /// Returns the recorded city for a client, if any.
    pub fn client_city(&self, client_id: &ClientId) -> Result<Option<String>, DbError> {
        let mut stmt = self
            .conn
            .prepare("SELECT city FROM client_cities WHERE client_id = ?")?;
        let mut rows = stmt.query([client_id.as_str()])?;
        match rows.next()? {
            Some(row) => Ok(row.get(0)?),
            None => Ok(None),
        }
    }

    /// Top merchants by outgoing spend within `range`.
    ///
    /// Shares are relative to the client's total outgoing spend in the same range.
    pub fn top_merchants(
        &self,
        client_id: &ClientId,
        range: &TimeRange,
        limit: usize,
    ) -> Result<Vec<MerchantSpend>, DbError> {
        let mut conditions = String::from("client_id = ? AND direction = 'out'");
        let mut values: Vec<String> = vec![client_id.as_str().to_string()];
        if let Some(from) = range.from {
            conditions.push_str(" AND posted_at >= ?");
            values.push(format_timestamp(from));
        }
        if let Some(to) = range.to {
            conditions.push_str(" AND posted_at <= ?");
            values.push(format_timestamp(to));
        }

        let total: f64 = self.conn.query_row(
            &format!("SELECT COALESCE(SUM(amount), 0.0) FROM transactions WHERE {conditions}"),
            params_from_iter(values.iter()),
            |row| row.get(0),
        )?;

        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let sql = format!(
            "
            SELECT COALESCE(merchant_name, '{UNKNOWN_MERCHANT}') AS name,
                   SUM(amount) AS spent,
                   COUNT(*) AS ops
            FROM transactions
            WHERE {conditions}
            GROUP BY name
            ORDER BY spent DESC, name ASC
            LIMIT {limit}
            "
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(values.iter()), |row| {
            let name: String = row.get(0)?;
            let amount: f64 = row.get(1)?;
            let ops: i64 = row.get(2)?;
            Ok((name, amount, u64::try_from(ops).unwrap_or(0)))
        })?;
        let mut merchants = Vec::new();
        for row in rows {
            merchants.push(row?);
        }
        Ok(merchant_shares(merchants, total))
    }

    /// Summarises stored geo events per action, busiest first.
    pub fn action_summaries(&self) -> Result<Vec<ActionSummary>, DbError> {
        let mut stmt = self.conn.prepare(
            "
            SELECT action,
                   COUNT(*) AS events,
                   COUNT(DISTINCT client_id) AS clients,
                   MAX(timestamp) AS last_event
            FROM geo_events
            GROUP BY action
            ORDER BY events DESC, action ASC
            ",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(ActionSummary {
                action: row.get(0)?,
                events: row.get(1)?,
                clients: row.get(2)?,
                last_event: row.get(3)?,
            })
        })?;
        let mut summaries = Vec::new();
        for row in rows {
            summaries.push(row?);
        }
        Ok(summaries)
    }
}

#[derive(Debug)]
struct GeoEventRow {
    id: String,
    client_id: String,
    action: String,
    latitude: Option<f64>,
    longitude: Option<f64>,
    timestamp: String,
}

impl GeoEventRow {
    fn into_raw(self) -> Result<RawGeoEvent, DbError> {
        let timestamp = parse_timestamp(&self.timestamp, &self.id)?;
        let client_id = ClientId::new(self.client_id).map_err(|source| DbError::InvalidClientId {
            row_id: self.id.clone(),
            source,
        })?;
        Ok(RawGeoEvent {
            client_id,
            action: self.action,
            latitude: self.latitude,
            longitude: self.longitude,
            timestamp,
        })
    }
}

fn parse_timestamp(timestamp: &str, row_id: &str) -> Result<DateTime<Utc>, DbError> {
    DateTime::parse_from_rfc3339(timestamp)
        .map(|parsed| parsed.with_timezone(&Utc))
        .map_err(|source| DbError::TimestampParse {
            row_id: row_id.to_string(),
            timestamp: timestamp.to_string(),
            source,
        })
}

fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
}
