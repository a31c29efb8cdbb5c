use sqlx::SqlitePool;

use crate::models::ParticipantsRow;

const SQL_FIND_PARTICIPANT: &str = r#"
SELECT
    participant_id,
    name,
    organization,
    organization_name,
    gender
FROM participants
WHERE participant_key = ?1
ORDER BY id ASC
LIMIT 1
"#;

const SQL_LIST_PARTICIPANTS: &str = r#"
SELECT
    participant_id,
    name,
    organization,
    organization_name,
    gender
FROM participants
ORDER BY id ASC
"#;

const SQL_COUNT_PARTICIPANTS: &str = r#"
SELECT COUNT(*) FROM participants
"#;

const SQL_INSERT_PARTICIPANT: &str = r#"
INSERT INTO participants (
  participant_id,
  participant_key,
  name,
  organization,
  organization_name,
  gender
) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
"#;

pub struct NewParticipant<'a> {
    pub participant_id: &'a str,
    pub participant_key: &'a str,
    pub name: &'a str,
    pub organization: &'a str,
    pub organization_name: &'a str,
    pub gender: &'a str,
}

pub async fn find_participant(
    pool: &SqlitePool,
    participant_key: &str,
) -> sqlx::Result<Option<ParticipantsRow>> {
    sqlx::query_as::<_, ParticipantsRow>(SQL_FIND_PARTICIPANT)
        .bind(participant_key)
        .fetch_optional(pool)
        .await
}

pub async fn list_participants(pool: &SqlitePool) -> sqlx::Result<Vec<ParticipantsRow>> {
    sqlx::query_as::<_, ParticipantsRow>(SQL_LIST_PARTICIPANTS)
        .fetch_all(pool)
        .await
}

pub async fn count_participants(pool: &SqlitePool) -> sqlx::Result<i64> {
    sqlx::query_scalar::<_, i64>(SQL_COUNT_PARTICIPANTS)
        .fetch_one(pool)
        .await
}

pub async fn insert_participant(pool: &SqlitePool, row: NewParticipant<'_>) -> sqlx::Result<u64> {
    let res = sqlx::query(SQL_INSERT_PARTICIPANT)
        .bind(row.participant_id)
        .bind(row.participant_key)
        .bind(row.name)
        .bind(row.organization)
        .bind(row.organization_name)
        .bind(row.gender)
        .execute(pool)
        .await?;
    Ok(res.rows_affected())
}
