//! Import command for loading exported rows into the local `SQLite` store.
//!
//! Input is JSONL on stdin. Column names from the upstream exports
//! (`ac_client_hash`, `eventaction`, `geolatitude`, ...) are accepted as
//! aliases. Naive timestamps are read in the project timezone.

use std::io::BufRead;

use anyhow::{Context, Result, bail};
use chrono::{DateTime, SecondsFormat, Utc};
use chrono_tz::Tz;
use hw_core::ClientId;
use hw_core::period::parse_local_datetime;
use hw_db::{ClientCityRecord, Database, DebtRecord, GeoEventRecord, TransactionRecord};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use uuid::Uuid;

use crate::Config;
use crate::cli::ImportKind;

/// Imports JSONL rows of the given kind and returns how many were written.
pub fn run<R: BufRead>(
    reader: R,
    db: &mut Database,
    config: &Config,
    kind: ImportKind,
) -> Result<usize> {
    let tz = config.inference.timezone;
    let inserted = match kind {
        ImportKind::Geo => {
            let rows = parse_lines(reader, |row: GeoRow| row.into_record(tz))?;
            db.insert_geo_events(&rows)?
        }
        ImportKind::Transactions => {
            let rows = parse_lines(reader, |row: TransactionRow| row.into_record(tz))?;
            db.insert_transactions(&rows)?
        }
        ImportKind::Cities => {
            let rows = parse_lines(reader, CityRow::into_record)?;
            db.upsert_client_cities(&rows)?
        }
        ImportKind::Debts => {
            let rows = parse_lines(reader, DebtRow::into_record)?;
            db.insert_debts(&rows)?
        }
    };
    tracing::info!(?kind, inserted, "import finished");
    Ok(inserted)
}

fn parse_lines<R, T, O, F>(reader: R, mut convert: F) -> Result<Vec<O>>
where
    R: BufRead,
    T: DeserializeOwned,
    F: FnMut(T) -> Result<O>,
{
    let mut records = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line.with_context(|| format!("failed to read line {}", idx + 1))?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let parsed: T = serde_json::from_str(trimmed)
            .with_context(|| format!("invalid JSON on line {}", idx + 1))?;
        let record = convert(parsed).with_context(|| format!("invalid row on line {}", idx + 1))?;
        records.push(record);
    }
    Ok(records)
}

#[derive(Debug, Deserialize)]
struct GeoRow {
    #[serde(default)]
    id: Option<String>,
    #[serde(alias = "ac_client_hash")]
    client_id: Value,
    #[serde(alias = "eventaction")]
    action: String,
    #[serde(default, alias = "geolatitude")]
    latitude: Option<f64>,
    #[serde(default, alias = "geolongitude")]
    longitude: Option<f64>,
    #[serde(alias = "dt")]
    timestamp: String,
}

impl GeoRow {
    fn into_record(self, tz: Tz) -> Result<GeoEventRecord> {
        let client_id = client_from_value(&self.client_id)?;
        let timestamp = parse_timestamp(&self.timestamp, tz)?;
        let id = self.id.filter(|id| !id.trim().is_empty()).unwrap_or_else(|| {
            content_id(&format!(
                "geo|{client_id}|{}|{}|{:?}|{:?}",
                self.action,
                timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
                self.latitude,
                self.longitude,
            ))
        });
        Ok(GeoEventRecord {
            id,
            client_id,
            action: self.action,
            latitude: self.latitude,
            longitude: self.longitude,
            timestamp,
        })
    }
}

#[derive(Debug, Deserialize)]
struct TransactionRow {
    #[serde(default)]
    id: Option<String>,
    #[serde(alias = "ac_client_hash")]
    client_id: Value,
    #[serde(alias = "c_txn_dt")]
    posted_at: String,
    #[serde(default, alias = "t_merchant_name")]
    merchant_name: Option<String>,
    #[serde(alias = "c_txn_rub_amt")]
    amount: f64,
    #[serde(default)]
    direction: Option<String>,
}

impl TransactionRow {
    fn into_record(self, tz: Tz) -> Result<TransactionRecord> {
        let client_id = client_from_value(&self.client_id)?;
        let posted_at = parse_timestamp(&self.posted_at, tz)?;
        let direction = self
            .direction
            .map(|d| d.trim().to_lowercase())
            .filter(|d| !d.is_empty())
            .unwrap_or_else(|| "out".to_string());
        if direction != "out" && direction != "in" {
            bail!("direction must be \"in\" or \"out\", got {direction:?}");
        }
        let id = self.id.filter(|id| !id.trim().is_empty()).unwrap_or_else(|| {
            content_id(&format!(
                "txn|{client_id}|{}|{:?}|{}|{direction}",
                posted_at.to_rfc3339_opts(SecondsFormat::Millis, true),
                self.merchant_name,
                self.amount,
            ))
        });
        Ok(TransactionRecord {
            id,
            client_id,
            posted_at,
            merchant_name: self.merchant_name.filter(|name| !name.trim().is_empty()),
            amount: self.amount,
            direction,
        })
    }
}

#[derive(Debug, Deserialize)]
struct CityRow {
    #[serde(alias = "ac_client_hash")]
    client_id: Value,
    #[serde(default)]
    city: Option<String>,
}

impl CityRow {
    fn into_record(self) -> Result<ClientCityRecord> {
        Ok(ClientCityRecord {
            client_id: client_from_value(&self.client_id)?,
            city: self.city.filter(|city| !city.trim().is_empty()),
        })
    }
}

#[derive(Debug, Deserialize)]
struct DebtRow {
    #[serde(default)]
    id: Option<String>,
    #[serde(alias = "ac_client_hash")]
    client_id: Value,
    #[serde(default, alias = "debt_tot_os_rub_amt")]
    amount: Option<f64>,
    #[serde(default, alias = "overdue_bucket_name")]
    overdue_bucket: Option<String>,
    #[serde(default, alias = "npl_nflag")]
    npl: Value,
}

impl DebtRow {
    fn into_record(self) -> Result<DebtRecord> {
        let client_id = client_from_value(&self.client_id)?;
        let npl = match &self.npl {
            Value::Null => None,
            Value::Bool(flag) => Some(*flag),
            Value::Number(n) if n.as_u64() == Some(0) => Some(false),
            Value::Number(n) if n.as_u64() == Some(1) => Some(true),
            other => bail!("npl flag must be a boolean, 0 or 1, got {other}"),
        };
        let overdue_bucket = self.overdue_bucket.filter(|b| !b.trim().is_empty());
        let id = self.id.filter(|id| !id.trim().is_empty()).unwrap_or_else(|| {
            content_id(&format!(
                "debt|{client_id}|{:?}|{overdue_bucket:?}|{npl:?}",
                self.amount
            ))
        });
        Ok(DebtRecord {
            id,
            client_id,
            amount: self.amount,
            overdue_bucket,
            npl,
        })
    }
}

/// Exports carry client ids as either strings or bare integers.
fn client_from_value(value: &Value) -> Result<ClientId> {
    let raw = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        other => bail!("client id must be a string or number, got {other}"),
    };
    Ok(ClientId::new(raw)?)
}

fn parse_timestamp(value: &str, tz: Tz) -> Result<DateTime<Utc>> {
    parse_local_datetime(value, tz).with_context(|| format!("unparseable timestamp {value:?}"))
}

fn content_id(content: &str) -> String {
    Uuid::new_v5(&Uuid::NAMESPACE_OID, content.as_bytes()).to_string()
}
