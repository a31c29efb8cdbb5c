//! Storage seams. Handlers and services only ever see the traits below; the
//! concrete backend is picked once at startup from [`Config::backend`].

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::info;

use crate::config::{Config, StoreBackend};
use crate::models::{AttendanceRecord, Participant, StaffAccount};

pub mod memory;
pub mod sheets;
pub mod sqlite;
pub mod staff_file;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("upstream store unavailable: {0}")]
    Upstream(String),

    #[error("malformed store data: {0}")]
    Malformed(String),

    #[error("record already exists")]
    Conflict,

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Read-only participant roster. Id matching compares the normalized form of
/// both sides (see [`crate::models::normalize_id`]).
#[async_trait]
pub trait RosterStore: Send + Sync {
    fn backend_tag(&self) -> &'static str;

    async fn find_by_id(&self, id: &str) -> Result<Option<Participant>, StoreError>;

    /// Every roster row in storage order, duplicates included.
    async fn list_all(&self) -> Result<Vec<Participant>, StoreError>;

    async fn count_rows(&self) -> Result<usize, StoreError>;
}

/// Append-only attendance log.
#[async_trait]
pub trait LogStore: Send + Sync {
    fn backend_tag(&self) -> &'static str;

    async fn find_by_id(&self, id: &str) -> Result<Option<AttendanceRecord>, StoreError>;

    /// Returns [`StoreError::Conflict`] when the backend itself detects a
    /// second row for the same participant.
    async fn append_record(&self, record: &AttendanceRecord) -> Result<(), StoreError>;

    async fn list_all(&self) -> Result<Vec<AttendanceRecord>, StoreError>;

    async fn count_rows(&self) -> Result<usize, StoreError>;
}

/// Whole-document staff account storage.
#[async_trait]
pub trait StaffStore: Send + Sync {
    fn backend_tag(&self) -> &'static str;

    async fn load(&self) -> Result<Vec<StaffAccount>, StoreError>;

    async fn save(&self, accounts: &[StaffAccount]) -> Result<(), StoreError>;
}

#[derive(Clone)]
pub struct Stores {
    pub roster: Arc<dyn RosterStore>,
    pub log: Arc<dyn LogStore>,
    pub staff: Arc<dyn StaffStore>,
}

pub async fn open_stores(config: &Config) -> Result<Stores, StoreError> {
    let staff: Arc<dyn StaffStore> =
        Arc::new(staff_file::JsonFileStaffStore::new(config.users_file.clone()));

    let (roster, log): (Arc<dyn RosterStore>, Arc<dyn LogStore>) = match config.backend {
        StoreBackend::Demo => (
            Arc::new(memory::MemoryRoster::demo()),
            Arc::new(memory::MemoryLog::default()),
        ),
        StoreBackend::Sqlite => {
            let url = config.database_url.as_deref().ok_or_else(|| {
                StoreError::Malformed("DATABASE_URL missing for sqlite backend".to_string())
            })?;
            let pool = sqlite::connect(url).await?;
            (
                Arc::new(sqlite::SqliteRoster::new(pool.clone())),
                Arc::new(sqlite::SqliteLog::new(pool)),
            )
        }
        StoreBackend::Sheets => {
            let sheets = config.sheets.as_ref().ok_or_else(|| {
                StoreError::Malformed("sheets configuration missing".to_string())
            })?;
            let client = Arc::new(sheets::SheetsClient::new(sheets)?);
            (
                Arc::new(sheets::SheetsRoster::new(
                    client.clone(),
                    sheets.roster_range.clone(),
                    sheets.columns.clone(),
                )),
                Arc::new(sheets::SheetsLog::new(client, sheets.log_range.clone())),
            )
        }
    };

    info!(
        roster = roster.backend_tag(),
        log = log.backend_tag(),
        staff = staff.backend_tag(),
        "stores opened"
    );

    Ok(Stores { roster, log, staff })
}
