use serde::{Deserialize, Serialize};

/// One roster entry, projected from whatever columns the backend stores.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    pub id: String,
    pub name: String,
    pub organization: String,
    #[serde(default)]
    pub organization_name: String,
    #[serde(default)]
    pub gender: String,
}

impl Participant {
    pub fn key(&self) -> String {
        normalize_id(&self.id)
    }
}

/// Canonical form used for every id comparison: trimmed and upper-cased.
pub fn normalize_id(raw: &str) -> String {
    raw.trim().to_uppercase()
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ParticipantsRow {
    pub participant_id: String,
    pub name: Option<String>,
    pub organization: Option<String>,
    pub organization_name: Option<String>,
    pub gender: Option<String>,
}

impl From<ParticipantsRow> for Participant {
    fn from(row: ParticipantsRow) -> Self {
        let organization_name = row.organization_name.unwrap_or_default();
        let organization = row
            .organization
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| organization_name.clone());
        Participant {
            id: row.participant_id,
            name: row.name.unwrap_or_default(),
            organization,
            organization_name,
            gender: row.gender.unwrap_or_default(),
        }
    }
}
