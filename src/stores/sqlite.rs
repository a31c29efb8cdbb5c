use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::collections::HashSet;
use std::str::FromStr;

use super::{LogStore, RosterStore, StoreError};
use crate::database::{attendance_repo, participants_repo, schema};
use crate::models::{normalize_id, AttendanceRecord, Participant};

/// Opens (creating if needed) the database and makes sure the tables exist.
pub async fn connect(database_url: &str) -> Result<SqlitePool, StoreError> {
    let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
    let pool = SqlitePoolOptions::new().connect_with(options).await?;
    schema::ensure_schema(&pool).await?;
    Ok(pool)
}

pub struct SqliteRoster {
    pool: SqlitePool,
}

impl SqliteRoster {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RosterStore for SqliteRoster {
    fn backend_tag(&self) -> &'static str {
        "sqlite"
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Participant>, StoreError> {
        let row = participants_repo::find_participant(&self.pool, &normalize_id(id)).await?;
        Ok(row.map(Participant::from))
    }

    async fn list_all(&self) -> Result<Vec<Participant>, StoreError> {
        let rows = participants_repo::list_participants(&self.pool).await?;
        Ok(rows.into_iter().map(Participant::from).collect())
    }

    async fn count_rows(&self) -> Result<usize, StoreError> {
        let count = participants_repo::count_participants(&self.pool).await?;
        Ok(count.max(0) as usize)
    }
}

pub struct SqliteLog {
    pool: SqlitePool,
}

impl SqliteLog {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LogStore for SqliteLog {
    fn backend_tag(&self) -> &'static str {
        "sqlite"
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<AttendanceRecord>, StoreError> {
        let row = attendance_repo::find_attendance(&self.pool, &normalize_id(id)).await?;
        Ok(row.map(AttendanceRecord::from))
    }

    async fn append_record(&self, record: &AttendanceRecord) -> Result<(), StoreError> {
        let key = normalize_id(&record.participant_id);
        let res = attendance_repo::insert_attendance(
            &self.pool,
            attendance_repo::NewAttendance {
                participant_key: &key,
                participant_id: &record.participant_id,
                recorded_at: &record.timestamp,
                recorded_by: &record.recorded_by,
            },
        )
        .await;

        match res {
            Ok(()) => Ok(()),
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => Err(StoreError::Conflict),
            Err(e) => Err(e.into()),
        }
    }

    async fn list_all(&self) -> Result<Vec<AttendanceRecord>, StoreError> {
        let rows = attendance_repo::list_attendance(&self.pool).await?;
        Ok(rows.into_iter().map(AttendanceRecord::from).collect())
    }

    async fn count_rows(&self) -> Result<usize, StoreError> {
        let count = attendance_repo::count_attendance(&self.pool).await?;
        Ok(count.max(0) as usize)
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ImportReport {
    pub candidates: usize,
    pub inserted: usize,
    pub skipped: usize,
}

/// Loads roster rows into `participants`. Rows with an empty id, or an id
/// already in the table, are skipped.
pub async fn import_roster(
    pool: &SqlitePool,
    participants: &[Participant],
) -> Result<ImportReport, StoreError> {
    let mut report = ImportReport {
        candidates: participants.len(),
        ..Default::default()
    };
    let mut known: HashSet<String> = participants_repo::list_participants(pool)
        .await?
        .into_iter()
        .map(|row| normalize_id(&row.participant_id))
        .collect();

    for p in participants {
        let key = p.key();
        if key.is_empty() || !known.insert(key.clone()) {
            report.skipped += 1;
            continue;
        }
        participants_repo::insert_participant(
            pool,
            participants_repo::NewParticipant {
                participant_id: p.id.trim(),
                participant_key: &key,
                name: &p.name,
                organization: &p.organization,
                organization_name: &p.organization_name,
                gender: &p.gender,
            },
        )
        .await?;
        report.inserted += 1;
    }

    Ok(report)
}
