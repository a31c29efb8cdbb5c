use async_trait::async_trait;
use tokio::sync::Mutex;

use super::{LogStore, RosterStore, StaffStore, StoreError};
use crate::models::{normalize_id, AttendanceRecord, Participant, StaffAccount};

/// Fixed roster, used by the demo backend and by tests.
#[derive(Debug, Default)]
pub struct MemoryRoster {
    participants: Vec<Participant>,
}

impl MemoryRoster {
    pub fn new(participants: Vec<Participant>) -> Self {
        Self { participants }
    }

    pub fn demo() -> Self {
        let rows = [
            ("1391495B", "John Doe", "PT ABC Indonesia", "Laki-laki"),
            ("2468013C", "Jane Smith", "CV XYZ Solutions", "Perempuan"),
            ("3579024D", "Ahmad Rahman", "UD Maju Bersama", "Laki-laki"),
            ("4680135E", "Siti Nurhaliza", "PT Teknologi Masa Depan", "Perempuan"),
            ("5791246F", "Budi Santoso", "CV Digital Kreatif", "Laki-laki"),
        ];
        Self::new(
            rows.iter()
                .map(|(id, name, org, gender)| Participant {
                    id: id.to_string(),
                    name: name.to_string(),
                    organization: org.to_string(),
                    organization_name: org.to_string(),
                    gender: gender.to_string(),
                })
                .collect(),
        )
    }
}

#[async_trait]
impl RosterStore for MemoryRoster {
    fn backend_tag(&self) -> &'static str {
        "memory"
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Participant>, StoreError> {
        let key = normalize_id(id);
        Ok(self.participants.iter().find(|p| p.key() == key).cloned())
    }

    async fn list_all(&self) -> Result<Vec<Participant>, StoreError> {
        Ok(self.participants.clone())
    }

    async fn count_rows(&self) -> Result<usize, StoreError> {
        Ok(self.participants.len())
    }
}

/// Attendance log kept in process memory. Lost on restart.
#[derive(Debug, Default)]
pub struct MemoryLog {
    records: Mutex<Vec<AttendanceRecord>>,
}

impl MemoryLog {
    pub fn with_records(records: Vec<AttendanceRecord>) -> Self {
        Self {
            records: Mutex::new(records),
        }
    }
}

#[async_trait]
impl LogStore for MemoryLog {
    fn backend_tag(&self) -> &'static str {
        "memory"
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<AttendanceRecord>, StoreError> {
        let key = normalize_id(id);
        Ok(self
            .records
            .lock()
            .await
            .iter()
            .find(|r| normalize_id(&r.participant_id) == key)
            .cloned())
    }

    async fn append_record(&self, record: &AttendanceRecord) -> Result<(), StoreError> {
        self.records.lock().await.push(record.clone());
        Ok(())
    }

    async fn list_all(&self) -> Result<Vec<AttendanceRecord>, StoreError> {
        Ok(self.records.lock().await.clone())
    }

    async fn count_rows(&self) -> Result<usize, StoreError> {
        Ok(self.records.lock().await.len())
    }
}

#[derive(Debug, Default)]
pub struct MemoryStaffStore {
    accounts: Mutex<Vec<StaffAccount>>,
}

impl MemoryStaffStore {
    pub fn new(accounts: Vec<StaffAccount>) -> Self {
        Self {
            accounts: Mutex::new(accounts),
        }
    }
}

#[async_trait]
impl StaffStore for MemoryStaffStore {
    fn backend_tag(&self) -> &'static str {
        "memory"
    }

    async fn load(&self) -> Result<Vec<StaffAccount>, StoreError> {
        Ok(self.accounts.lock().await.clone())
    }

    async fn save(&self, accounts: &[StaffAccount]) -> Result<(), StoreError> {
        *self.accounts.lock().await = accounts.to_vec();
        Ok(())
    }
}
