use sqlx::SqlitePool;

use crate::models::AttendanceRow;

const SQL_FIND_ATTENDANCE: &str = r#"
SELECT
    participant_id,
    recorded_at,
    recorded_by
FROM attendance
WHERE participant_key = ?1
LIMIT 1
"#;

const SQL_LIST_ATTENDANCE: &str = r#"
SELECT
    participant_id,
    recorded_at,
    recorded_by
FROM attendance
ORDER BY rowid ASC
"#;

const SQL_COUNT_ATTENDANCE: &str = r#"
SELECT COUNT(*) FROM attendance
"#;

const SQL_INSERT_ATTENDANCE: &str = r#"
INSERT INTO attendance (
  participant_key,
  participant_id,
  recorded_at,
  recorded_by
) VALUES (?1, ?2, ?3, ?4)
"#;

pub struct NewAttendance<'a> {
    pub participant_key: &'a str,
    pub participant_id: &'a str,
    pub recorded_at: &'a str,
    pub recorded_by: &'a str,
}

pub async fn find_attendance(
    pool: &SqlitePool,
    participant_key: &str,
) -> sqlx::Result<Option<AttendanceRow>> {
    sqlx::query_as::<_, AttendanceRow>(SQL_FIND_ATTENDANCE)
        .bind(participant_key)
        .fetch_optional(pool)
        .await
}

pub async fn list_attendance(pool: &SqlitePool) -> sqlx::Result<Vec<AttendanceRow>> {
    sqlx::query_as::<_, AttendanceRow>(SQL_LIST_ATTENDANCE)
        .fetch_all(pool)
        .await
}

pub async fn count_attendance(pool: &SqlitePool) -> sqlx::Result<i64> {
    sqlx::query_scalar::<_, i64>(SQL_COUNT_ATTENDANCE)
        .fetch_one(pool)
        .await
}

pub async fn insert_attendance(pool: &SqlitePool, row: NewAttendance<'_>) -> sqlx::Result<()> {
    sqlx::query(SQL_INSERT_ATTENDANCE)
        .bind(row.participant_key)
        .bind(row.participant_id)
        .bind(row.recorded_at)
        .bind(row.recorded_by)
        .execute(pool)
        .await?;
    Ok(())
}
