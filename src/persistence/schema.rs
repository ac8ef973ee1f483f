//! `SQLite` schema bootstrap logic.
//!
//! All table definitions use `CREATE TABLE IF NOT EXISTS`: safe to
//! re-run on every server startup.

use sqlx::SqlitePool;

use crate::Result;

/// Apply all table definitions to the connected `SQLite` database.
///
/// # Errors
///
/// Returns `AppError::Db` if any DDL statement fails.
pub async fn bootstrap_schema(pool: &SqlitePool) -> Result<()> {
    let ddl = r"
CREATE TABLE IF NOT EXISTS conversation (
    id              TEXT PRIMARY KEY NOT NULL,
    owner_user_id   TEXT NOT NULL,
    title           TEXT NOT NULL,
    resume_token    TEXT,
    created_at      TEXT NOT NULL,
    updated_at      TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS message (
    id              TEXT PRIMARY KEY NOT NULL,
    conversation_id TEXT NOT NULL REFERENCES conversation(id) ON DELETE CASCADE,
    role            TEXT NOT NULL CHECK(role IN ('user','assistant')),
    content         TEXT NOT NULL,
    created_at      TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS user_profile (
    user_id         TEXT PRIMARY KEY NOT NULL,
    role            TEXT NOT NULL CHECK(role IN ('teacher','student')),
    standard        INTEGER CHECK(standard IS NULL OR (standard BETWEEN 1 AND 12)),
    updated_at      TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_conversation_owner ON conversation(owner_user_id);
CREATE INDEX IF NOT EXISTS idx_message_conversation ON message(conversation_id);
";

    sqlx::raw_sql(ddl).execute(pool).await?;
    Ok(())
}
