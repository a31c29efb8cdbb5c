use serde::{Deserialize, Serialize};

/// A single check-in. Written once, never updated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceRecord {
    pub participant_id: String,
    pub timestamp: String,
    pub recorded_by: String,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AttendanceRow {
    pub participant_id: String,
    pub recorded_at: String,
    pub recorded_by: Option<String>,
}

impl From<AttendanceRow> for AttendanceRecord {
    fn from(row: AttendanceRow) -> Self {
        AttendanceRecord {
            participant_id: row.participant_id,
            timestamp: row.recorded_at,
            recorded_by: row.recorded_by.unwrap_or_default(),
        }
    }
}
