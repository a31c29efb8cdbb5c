use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::warn;

use crate::models::{normalize_id, AttendanceRecord, Participant};
use crate::services::attendance_service::presence_label;
use crate::stores::{LogStore, RosterStore, StoreError};

pub const DEFAULT_PAGE_SIZE: u32 = 20;
pub const MAX_PAGE_SIZE: u32 = 100;

#[derive(Debug, Deserialize, Default)]
pub struct ParticipantsQuery {
    pub search: Option<String>,
    pub status: Option<String>, // attended|present|hadir, not_attended|absent|belum
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusFilter {
    Attended,
    NotAttended,
}

fn parse_status(input: Option<&str>) -> Option<StatusFilter> {
    match input?.trim().to_lowercase().as_str() {
        "attended" | "present" | "hadir" => Some(StatusFilter::Attended),
        "not_attended" | "absent" | "belum" => Some(StatusFilter::NotAttended),
        _ => None,
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantListItem {
    #[serde(flatten)]
    pub participant: Participant,
    pub status: String,
    pub attended: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attended_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub total: usize,
    pub total_pages: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ParticipantsPage {
    pub items: Vec<ParticipantListItem>,
    pub pagination: Pagination,
}

pub async fn list_participants(
    roster: &dyn RosterStore,
    log: &dyn LogStore,
    query: &ParticipantsQuery,
) -> Result<ParticipantsPage, StoreError> {
    let records = log.list_all().await?;
    let participants = roster.list_all().await?;
    Ok(build_page(participants, records, query))
}

/// Joins roster and log, then filters and slices. Roster rows repeating an id
/// are dropped after the first one.
pub fn build_page(
    participants: Vec<Participant>,
    records: Vec<AttendanceRecord>,
    query: &ParticipantsQuery,
) -> ParticipantsPage {
    let mut attended: HashMap<String, AttendanceRecord> = HashMap::new();
    for record in records {
        attended
            .entry(normalize_id(&record.participant_id))
            .or_insert(record);
    }

    let needle = query
        .search
        .as_deref()
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty());
    let status = parse_status(query.status.as_deref());

    let mut seen: HashSet<String> = HashSet::new();
    let mut matched: Vec<ParticipantListItem> = Vec::new();
    for participant in participants {
        let key = participant.key();
        if !seen.insert(key.clone()) {
            warn!(participant_id = %participant.id, "duplicate roster id, keeping first row");
            continue;
        }

        if let Some(needle) = needle.as_deref() {
            let hit = [
                &participant.id,
                &participant.name,
                &participant.organization,
                &participant.organization_name,
            ]
            .iter()
            .any(|field| field.to_lowercase().contains(needle));
            if !hit {
                continue;
            }
        }

        let record = attended.get(&key);
        match (status, record.is_some()) {
            (Some(StatusFilter::Attended), false) | (Some(StatusFilter::NotAttended), true) => {
                continue
            }
            _ => {}
        }

        matched.push(ParticipantListItem {
            status: presence_label(record.is_some()).to_string(),
            attended: record.is_some(),
            attended_at: record.map(|r| r.timestamp.clone()),
            participant,
        });
    }

    let page = query.page.unwrap_or(1).max(1);
    let limit = query
        .limit
        .unwrap_or(DEFAULT_PAGE_SIZE)
        .clamp(1, MAX_PAGE_SIZE);
    let total = matched.len();
    let total_pages = total.div_ceil(limit as usize);
    let offset = (page as usize - 1).saturating_mul(limit as usize);

    let items = matched
        .into_iter()
        .skip(offset)
        .take(limit as usize)
        .collect();

    ParticipantsPage {
        items,
        pagination: Pagination {
            page,
            limit,
            total,
            total_pages,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn participant(id: &str, name: &str, org: &str) -> Participant {
        Participant {
            id: id.to_string(),
            name: name.to_string(),
            organization: org.to_string(),
            organization_name: org.to_string(),
            gender: String::new(),
        }
    }

    fn record(id: &str) -> AttendanceRecord {
        AttendanceRecord {
            participant_id: id.to_string(),
            timestamp: "01/09/2025, 09.12.00".to_string(),
            recorded_by: "Desk".to_string(),
        }
    }

    fn roster_of(n: usize) -> Vec<Participant> {
        (1..=n)
            .map(|i| participant(&format!("P{i:03}"), &format!("Person {i}"), "PT Satu"))
            .collect()
    }

    #[test]
    fn second_page_holds_items_eleven_to_twenty() {
        let query = ParticipantsQuery {
            page: Some(2),
            limit: Some(10),
            ..Default::default()
        };
        let page = build_page(roster_of(25), vec![], &query);

        let ids: Vec<&str> = page.items.iter().map(|i| i.participant.id.as_str()).collect();
        assert_eq!(ids.first(), Some(&"P011"));
        assert_eq!(ids.last(), Some(&"P020"));
        assert_eq!(page.items.len(), 10);
        assert_eq!(
            page.pagination,
            Pagination {
                page: 2,
                limit: 10,
                total: 25,
                total_pages: 3
            }
        );
    }

    #[test]
    fn search_is_case_insensitive_across_fields() {
        let participants = vec![
            participant("A1", "Rina", "Dinas Kominfo"),
            participant("B2", "Tono", "PT Satu"),
            participant("C3", "kominfo fan", "CV Dua"),
        ];
        let query = ParticipantsQuery {
            search: Some("KOMINFO".to_string()),
            ..Default::default()
        };
        let page = build_page(participants, vec![], &query);
        assert_eq!(page.pagination.total, 2);
    }

    #[test]
    fn status_filter_uses_log() {
        let query = |status: &str| ParticipantsQuery {
            status: Some(status.to_string()),
            ..Default::default()
        };
        let records = vec![record("p002")];

        let present = build_page(roster_of(3), records.clone(), &query("hadir"));
        assert_eq!(present.items.len(), 1);
        assert_eq!(present.items[0].participant.id, "P002");
        assert_eq!(present.items[0].status, "Present");

        let absent = build_page(roster_of(3), records.clone(), &query("not_attended"));
        assert_eq!(absent.items.len(), 2);
        assert!(absent.items.iter().all(|i| !i.attended));

        let all = build_page(roster_of(3), records, &query("whatever"));
        assert_eq!(all.items.len(), 3);
    }

    #[test]
    fn duplicate_roster_ids_keep_first() {
        let participants = vec![
            participant("A1", "First", "X"),
            participant("a1", "Second", "Y"),
        ];
        let page = build_page(participants, vec![], &ParticipantsQuery::default());
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].participant.name, "First");
    }

    #[test]
    fn empty_roster_has_zero_pages() {
        let page = build_page(vec![], vec![], &ParticipantsQuery::default());
        assert_eq!(page.pagination.total_pages, 0);
        assert_eq!(page.pagination.limit, DEFAULT_PAGE_SIZE);
    }

    #[test]
    fn limit_and_page_are_clamped() {
        let query = ParticipantsQuery {
            page: Some(0),
            limit: Some(1000),
            ..Default::default()
        };
        let page = build_page(roster_of(3), vec![], &query);
        assert_eq!(page.pagination.page, 1);
        assert_eq!(page.pagination.limit, MAX_PAGE_SIZE);
    }
}
