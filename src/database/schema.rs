use sqlx::SqlitePool;

const SQL_CREATE_PARTICIPANTS: &str = r#"
CREATE TABLE IF NOT EXISTS participants (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  participant_id TEXT NOT NULL,
  participant_key TEXT NOT NULL,
  name TEXT,
  organization TEXT,
  organization_name TEXT,
  gender TEXT
)
"#;

const SQL_CREATE_PARTICIPANTS_KEY_INDEX: &str = r#"
CREATE INDEX IF NOT EXISTS idx_participants_key ON participants (participant_key)
"#;

// participant_key is the primary key so a second check-in for the same id is
// rejected by the database even if two requests race past the lookup.
const SQL_CREATE_ATTENDANCE: &str = r#"
CREATE TABLE IF NOT EXISTS attendance (
  participant_key TEXT PRIMARY KEY,
  participant_id TEXT NOT NULL,
  recorded_at TEXT NOT NULL,
  recorded_by TEXT
)
"#;

pub async fn ensure_schema(pool: &SqlitePool) -> sqlx::Result<()> {
    for statement in [
        SQL_CREATE_PARTICIPANTS,
        SQL_CREATE_PARTICIPANTS_KEY_INDEX,
        SQL_CREATE_ATTENDANCE,
    ] {
        sqlx::query(statement).execute(pool).await?;
    }
    Ok(())
}
