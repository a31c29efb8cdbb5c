use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, FixedOffset, Utc};
use serde::Serialize;
use tokio::sync::OwnedMutexGuard;
use tracing::{info, warn};

use crate::models::{normalize_id, AttendanceRecord, Participant};
use crate::stores::{LogStore, RosterStore, StoreError};

const TIMESTAMP_FORMAT: &str = "%d/%m/%Y, %H.%M.%S";

/// One async mutex per participant id, so the duplicate check and the append
/// of a single id never interleave within this process.
#[derive(Default)]
pub struct CheckInLocks {
    inner: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl CheckInLocks {
    pub async fn acquire(&self, key: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut map = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
            // Entries only referenced by the map are idle.
            map.retain(|_, l| Arc::strong_count(l) > 1);
            map.entry(key.to_string()).or_default().clone()
        };
        lock.lock_owned().await
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantView {
    #[serde(flatten)]
    pub participant: Participant,
    pub status: String,
    pub attended: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attended_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recorded_by: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CheckInView {
    #[serde(flatten)]
    pub participant: Participant,
    pub status: String,
}

#[derive(Debug, Clone)]
pub enum CheckInOutcome {
    Recorded(CheckInView),
    /// Carries the first record; nothing was written.
    AlreadyRecorded(AttendanceRecord),
    NotFound,
}

pub async fn lookup_participant(
    roster: &dyn RosterStore,
    raw_id: &str,
) -> Result<Option<Participant>, StoreError> {
    let key = normalize_id(raw_id);
    if key.is_empty() {
        return Ok(None);
    }
    roster.find_by_id(&key).await
}

pub async fn lookup_with_status(
    roster: &dyn RosterStore,
    log: &dyn LogStore,
    raw_id: &str,
) -> Result<Option<ParticipantView>, StoreError> {
    let Some(participant) = lookup_participant(roster, raw_id).await? else {
        return Ok(None);
    };
    let record = log.find_by_id(&participant.key()).await?;

    Ok(Some(ParticipantView {
        participant,
        status: presence_label(record.is_some()).to_string(),
        attended: record.is_some(),
        attended_at: record.as_ref().map(|r| r.timestamp.clone()),
        recorded_by: record.map(|r| r.recorded_by),
    }))
}

pub async fn record_attendance(
    roster: &dyn RosterStore,
    log: &dyn LogStore,
    locks: &CheckInLocks,
    raw_id: &str,
    recorded_by: &str,
    offset: FixedOffset,
) -> Result<CheckInOutcome, StoreError> {
    let key = normalize_id(raw_id);
    if key.is_empty() {
        return Ok(CheckInOutcome::NotFound);
    }

    let _guard = locks.acquire(&key).await;

    if let Some(existing) = log.find_by_id(&key).await? {
        info!(participant_id = %key, first_at = %existing.timestamp, "duplicate check-in rejected");
        return Ok(CheckInOutcome::AlreadyRecorded(existing));
    }

    let Some(participant) = roster.find_by_id(&key).await? else {
        return Ok(CheckInOutcome::NotFound);
    };

    let timestamp = format_timestamp(Utc::now(), offset);
    let record = AttendanceRecord {
        participant_id: participant.id.clone(),
        timestamp: timestamp.clone(),
        recorded_by: recorded_by.to_string(),
    };

    match log.append_record(&record).await {
        Ok(()) => {}
        Err(StoreError::Conflict) => {
            warn!(participant_id = %key, "log rejected a concurrent duplicate check-in");
            let existing = log.find_by_id(&key).await?.unwrap_or(record);
            return Ok(CheckInOutcome::AlreadyRecorded(existing));
        }
        Err(e) => return Err(e),
    }

    info!(participant_id = %participant.id, recorded_by, "attendance recorded");

    Ok(CheckInOutcome::Recorded(CheckInView {
        status: format!("Present - {} (by: {})", timestamp, recorded_by),
        participant,
    }))
}

pub fn presence_label(attended: bool) -> &'static str {
    if attended {
        "Present"
    } else {
        "Not present"
    }
}

pub fn format_timestamp(now: DateTime<Utc>, offset: FixedOffset) -> String {
    now.with_timezone(&offset).format(TIMESTAMP_FORMAT).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stores::memory::{MemoryLog, MemoryRoster};
    use async_trait::async_trait;
    use chrono::TimeZone;
    use std::sync::atomic::{AtomicBool, Ordering};

    /// Misses on the first lookup, then rejects the append, as happens when
    /// another process writes the same id between the check and the append.
    struct RacedLog {
        inner: MemoryLog,
        missed: AtomicBool,
    }

    #[async_trait]
    impl LogStore for RacedLog {
        fn backend_tag(&self) -> &'static str {
            "raced"
        }

        async fn find_by_id(&self, id: &str) -> Result<Option<AttendanceRecord>, StoreError> {
            if !self.missed.swap(true, Ordering::SeqCst) {
                return Ok(None);
            }
            self.inner.find_by_id(id).await
        }

        async fn append_record(&self, _record: &AttendanceRecord) -> Result<(), StoreError> {
            Err(StoreError::Conflict)
        }

        async fn list_all(&self) -> Result<Vec<AttendanceRecord>, StoreError> {
            self.inner.list_all().await
        }

        async fn count_rows(&self) -> Result<usize, StoreError> {
            self.inner.count_rows().await
        }
    }

    fn jakarta() -> FixedOffset {
        FixedOffset::east_opt(7 * 3600).unwrap()
    }

    fn roster() -> MemoryRoster {
        MemoryRoster::new(vec![Participant {
            id: "ABC12345".to_string(),
            name: "Rina Wulandari".to_string(),
            organization: "Dinas Kominfo".to_string(),
            organization_name: "Dinas Kominfo".to_string(),
            gender: "Perempuan".to_string(),
        }])
    }

    #[test]
    fn timestamp_uses_event_offset() {
        let now = Utc.with_ymd_and_hms(2025, 8, 30, 7, 30, 25).unwrap();
        assert_eq!(format_timestamp(now, jakarta()), "30/08/2025, 14.30.25");
    }

    #[tokio::test]
    async fn second_check_in_returns_original_record() {
        let roster = roster();
        let log = MemoryLog::default();
        let locks = CheckInLocks::default();

        let first = record_attendance(&roster, &log, &locks, "abc12345", "Desk 1", jakarta())
            .await
            .unwrap();
        let CheckInOutcome::Recorded(view) = first else {
            panic!("expected a new record");
        };
        assert!(view.status.starts_with("Present - "));
        assert!(view.status.ends_with("(by: Desk 1)"));

        let original = log.find_by_id("ABC12345").await.unwrap().unwrap();
        assert_eq!(original.participant_id, "ABC12345");

        let second = record_attendance(&roster, &log, &locks, "ABC12345 ", "Desk 2", jakarta())
            .await
            .unwrap();
        match second {
            CheckInOutcome::AlreadyRecorded(existing) => {
                assert_eq!(existing.timestamp, original.timestamp);
                assert_eq!(existing.recorded_by, "Desk 1");
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(log.count_rows().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn record_from_earlier_session_blocks_check_in() {
        let roster = roster();
        let log = MemoryLog::with_records(vec![AttendanceRecord {
            participant_id: "ABC12345".to_string(),
            timestamp: "29/08/2025, 16.02.11".to_string(),
            recorded_by: "Gate A".to_string(),
        }]);

        let outcome = record_attendance(
            &roster,
            &log,
            &CheckInLocks::default(),
            "abc12345",
            "Gate B",
            jakarta(),
        )
        .await
        .unwrap();
        match outcome {
            CheckInOutcome::AlreadyRecorded(existing) => {
                assert_eq!(existing.timestamp, "29/08/2025, 16.02.11");
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(log.count_rows().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn store_conflict_returns_the_winning_record() {
        let roster = roster();
        let log = RacedLog {
            inner: MemoryLog::with_records(vec![AttendanceRecord {
                participant_id: "ABC12345".to_string(),
                timestamp: "30/08/2025, 09.00.01".to_string(),
                recorded_by: "Gate A".to_string(),
            }]),
            missed: AtomicBool::new(false),
        };

        let outcome = record_attendance(
            &roster,
            &log,
            &CheckInLocks::default(),
            "ABC12345",
            "Gate B",
            jakarta(),
        )
        .await
        .unwrap();
        match outcome {
            CheckInOutcome::AlreadyRecorded(existing) => {
                assert_eq!(existing.timestamp, "30/08/2025, 09.00.01");
                assert_eq!(existing.recorded_by, "Gate A");
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(log.count_rows().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn unknown_id_writes_nothing() {
        let roster = roster();
        let log = MemoryLog::default();
        let locks = CheckInLocks::default();
        let outcome = record_attendance(&roster, &log, &locks, "ZZZ", "Desk", jakarta())
            .await
            .unwrap();
        assert!(matches!(outcome, CheckInOutcome::NotFound));
        assert_eq!(log.count_rows().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn concurrent_scans_of_one_id_write_once() {
        let roster = Arc::new(roster());
        let log = Arc::new(MemoryLog::default());
        let locks = Arc::new(CheckInLocks::default());

        let mut handles = Vec::new();
        for desk in 0..8 {
            let (roster, log, locks) = (roster.clone(), log.clone(), locks.clone());
            handles.push(tokio::spawn(async move {
                record_attendance(
                    roster.as_ref(),
                    log.as_ref(),
                    &locks,
                    "abc12345",
                    &format!("Desk {desk}"),
                    jakarta(),
                )
                .await
                .unwrap()
            }));
        }

        let mut recorded = 0;
        for handle in handles {
            if matches!(handle.await.unwrap(), CheckInOutcome::Recorded(_)) {
                recorded += 1;
            }
        }
        assert_eq!(recorded, 1);
        assert_eq!(log.count_rows().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn lookup_reports_presence() {
        let roster = roster();
        let log = MemoryLog::default();

        let before = lookup_with_status(&roster, &log, "abc12345").await.unwrap().unwrap();
        assert!(!before.attended);
        assert_eq!(before.status, "Not present");

        record_attendance(&roster, &log, &CheckInLocks::default(), "ABC12345", "Desk", jakarta())
            .await
            .unwrap();
        let after = lookup_with_status(&roster, &log, "abc12345").await.unwrap().unwrap();
        assert!(after.attended);
        assert_eq!(after.recorded_by.as_deref(), Some("Desk"));

        assert!(lookup_with_status(&roster, &log, "   ").await.unwrap().is_none());
    }
}
