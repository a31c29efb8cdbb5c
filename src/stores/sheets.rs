//! Google Sheets backend over the v4 REST API.
//!
//! The roster range is read whole on every call and the first row is treated
//! as a header. Check-ins are appended to the log range as
//! `[participant id, timestamp, recorded by]`. Sheets has no uniqueness
//! constraint, so two processes scanning the same id at the same moment can
//! still both append; in-process scans are serialized by the attendance
//! service.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Url;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::warn;

use super::{LogStore, RosterStore, StoreError};
use crate::config::{RosterColumns, SheetsConfig};
use crate::models::{normalize_id, AttendanceRecord, Participant};

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

pub struct SheetsClient {
    http: reqwest::Client,
    base_url: Url,
    spreadsheet_id: String,
    access_token: String,
}

impl SheetsClient {
    pub fn new(config: &SheetsConfig) -> Result<Self, StoreError> {
        let base_url = Url::parse(&config.api_url)
            .map_err(|e| StoreError::Malformed(format!("SHEETS_API_URL: {e}")))?;
        Ok(Self {
            http: reqwest::Client::new(),
            base_url,
            spreadsheet_id: config.spreadsheet_id.clone(),
            access_token: config.access_token.clone(),
        })
    }

    fn values_url(&self, range_segment: &str) -> Result<Url, StoreError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| StoreError::Malformed("SHEETS_API_URL cannot be a base".to_string()))?
            .pop_if_empty()
            .extend(["v4", "spreadsheets", self.spreadsheet_id.as_str(), "values", range_segment]);
        Ok(url)
    }

    pub async fn get_values(&self, range: &str) -> Result<Vec<Vec<String>>, StoreError> {
        let url = self.values_url(range)?;
        let resp = self
            .http
            .get(url.clone())
            .bearer_auth(&self.access_token)
            .send()
            .await
            .map_err(|e| StoreError::Upstream(format!("GET {url}: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            warn!(%status, range, body = %body, "sheets values.get failed");
            return Err(StoreError::Upstream(format!("values.get {range} returned {status}")));
        }

        let body: ValueRange = resp
            .json()
            .await
            .map_err(|e| StoreError::Malformed(format!("values.get {range}: {e}")))?;
        Ok(body
            .values
            .into_iter()
            .map(|row| row.into_iter().map(cell_text).collect())
            .collect())
    }

    pub async fn append_values(
        &self,
        range: &str,
        rows: Vec<Vec<String>>,
    ) -> Result<(), StoreError> {
        let mut url = self.values_url(&format!("{range}:append"))?;
        url.query_pairs_mut()
            .append_pair("valueInputOption", "RAW")
            .append_pair("insertDataOption", "INSERT_ROWS");

        let resp = self
            .http
            .post(url.clone())
            .bearer_auth(&self.access_token)
            .json(&json!({ "values": rows }))
            .send()
            .await
            .map_err(|e| StoreError::Upstream(format!("POST {url}: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            warn!(%status, range, body = %body, "sheets values.append failed");
            return Err(StoreError::Upstream(format!("values.append {range} returned {status}")));
        }
        Ok(())
    }
}

fn cell_text(value: Value) -> String {
    match value {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn cell(row: &[String], index: usize) -> &str {
    row.get(index).map(|s| s.trim()).unwrap_or("")
}

/// Projects data rows (header skipped) onto participants. Rows without an id
/// are dropped.
pub fn parse_roster_rows(rows: &[Vec<String>], columns: &RosterColumns) -> Vec<Participant> {
    rows.iter()
        .skip(1)
        .filter(|row| !cell(row, columns.id).is_empty())
        .map(|row| {
            let organization_name = cell(row, columns.organization_name).to_string();
            let organization = match cell(row, columns.organization) {
                "" => organization_name.clone(),
                org => org.to_string(),
            };
            Participant {
                id: cell(row, columns.id).to_string(),
                name: cell(row, columns.name).to_string(),
                organization,
                organization_name,
                gender: cell(row, columns.gender).to_string(),
            }
        })
        .collect()
}

/// Every row below the header counts, blank ids included.
pub fn data_row_count(rows: &[Vec<String>]) -> usize {
    rows.len().saturating_sub(1)
}

pub fn parse_log_rows(rows: &[Vec<String>]) -> Vec<AttendanceRecord> {
    rows.iter()
        .skip(1)
        .filter(|row| !cell(row, 0).is_empty())
        .map(|row| AttendanceRecord {
            participant_id: cell(row, 0).to_string(),
            timestamp: cell(row, 1).to_string(),
            recorded_by: cell(row, 2).to_string(),
        })
        .collect()
}

pub struct SheetsRoster {
    client: Arc<SheetsClient>,
    range: String,
    columns: RosterColumns,
}

impl SheetsRoster {
    pub fn new(client: Arc<SheetsClient>, range: String, columns: RosterColumns) -> Self {
        Self {
            client,
            range,
            columns,
        }
    }
}

#[async_trait]
impl RosterStore for SheetsRoster {
    fn backend_tag(&self) -> &'static str {
        "sheets"
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Participant>, StoreError> {
        let key = normalize_id(id);
        Ok(self
            .list_all()
            .await?
            .into_iter()
            .find(|p| p.key() == key))
    }

    async fn list_all(&self) -> Result<Vec<Participant>, StoreError> {
        let rows = self.client.get_values(&self.range).await?;
        Ok(parse_roster_rows(&rows, &self.columns))
    }

    async fn count_rows(&self) -> Result<usize, StoreError> {
        let rows = self.client.get_values(&self.range).await?;
        Ok(data_row_count(&rows))
    }
}

pub struct SheetsLog {
    client: Arc<SheetsClient>,
    range: String,
}

impl SheetsLog {
    pub fn new(client: Arc<SheetsClient>, range: String) -> Self {
        Self { client, range }
    }
}

#[async_trait]
impl LogStore for SheetsLog {
    fn backend_tag(&self) -> &'static str {
        "sheets"
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<AttendanceRecord>, StoreError> {
        let key = normalize_id(id);
        Ok(self
            .list_all()
            .await?
            .into_iter()
            .find(|r| normalize_id(&r.participant_id) == key))
    }

    async fn append_record(&self, record: &AttendanceRecord) -> Result<(), StoreError> {
        self.client
            .append_values(
                &self.range,
                vec![vec![
                    record.participant_id.clone(),
                    record.timestamp.clone(),
                    record.recorded_by.clone(),
                ]],
            )
            .await
    }

    async fn list_all(&self) -> Result<Vec<AttendanceRecord>, StoreError> {
        let rows = self.client.get_values(&self.range).await?;
        Ok(parse_log_rows(&rows))
    }

    async fn count_rows(&self) -> Result<usize, StoreError> {
        let rows = self.client.get_values(&self.range).await?;
        Ok(data_row_count(&rows))
    }
}
