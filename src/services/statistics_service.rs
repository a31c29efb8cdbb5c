use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::warn;

use crate::models::AttendanceRecord;
use crate::stores::{LogStore, RosterStore, StoreError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IntervalCount {
    pub interval: String,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Statistics {
    pub total_participants: usize,
    pub attended: usize,
    pub not_attended: usize,
    pub attendance_rate: f64,
    pub last_updated: String,
    pub attendance_by_interval: Vec<IntervalCount>,
}

pub async fn load_statistics(
    roster: &dyn RosterStore,
    log: &dyn LogStore,
) -> Result<Statistics, StoreError> {
    let total = roster.count_rows().await?;
    let records = log.list_all().await?;
    Ok(compute_statistics(total, &records, Utc::now()))
}

pub fn compute_statistics(
    total: usize,
    records: &[AttendanceRecord],
    now: DateTime<Utc>,
) -> Statistics {
    let attended = records.len();

    let mut buckets: BTreeMap<String, usize> = BTreeMap::new();
    for record in records {
        match interval_key(&record.timestamp) {
            Some(key) => *buckets.entry(key).or_insert(0) += 1,
            None => warn!(timestamp = %record.timestamp, "unparseable attendance timestamp"),
        }
    }

    Statistics {
        total_participants: total,
        attended,
        not_attended: total.saturating_sub(attended),
        attendance_rate: attendance_rate(attended, total),
        last_updated: now.to_rfc3339_opts(SecondsFormat::Millis, true),
        attendance_by_interval: buckets
            .into_iter()
            .map(|(interval, count)| IntervalCount { interval, count })
            .collect(),
    }
}

/// Percentage with two decimals; zero when the roster is empty.
pub fn attendance_rate(attended: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let rate = attended as f64 / total as f64 * 100.0;
    (rate * 100.0).round() / 100.0
}

/// `"30/08/2025, 14.37.25"` falls in the `"14:30"` bucket. Colon separated
/// times are accepted too.
pub fn interval_key(timestamp: &str) -> Option<String> {
    let time = match timestamp.split_once(',') {
        Some((_, time)) => time,
        None => timestamp.split_whitespace().last()?,
    };
    let mut parts = time.trim().split(['.', ':']);
    let hour: u32 = parts.next()?.trim().parse().ok()?;
    let minute: u32 = parts.next()?.trim().parse().ok()?;
    if hour > 23 || minute > 59 {
        return None;
    }
    Some(format!("{:02}:{:02}", hour, minute / 10 * 10))
}
