//! Idempotent Postgres schema bootstrap.
//!
//! Registrations reference events by id without a foreign key: deleting an
//! event leaves its registrations in place.

use sqlx::PgPool;
use tracing::info;

use super::{StoreError, StoreResult};

const STATEMENTS: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS events (
        id                       TEXT PRIMARY KEY,
        owner_email              TEXT NOT NULL,
        title                    TEXT NOT NULL,
        start_date               DATE NOT NULL,
        created_at               TIMESTAMPTZ NOT NULL,
        total_registration_count BIGINT NOT NULL DEFAULT 0
            CHECK (total_registration_count >= 0),
        attributes               JSONB NOT NULL DEFAULT '{}'::jsonb
    )
    "#,
    "CREATE INDEX IF NOT EXISTS events_owner_email_idx ON events (lower(owner_email))",
    "CREATE INDEX IF NOT EXISTS events_start_date_idx ON events (start_date)",
    "CREATE INDEX IF NOT EXISTS events_created_at_idx ON events (created_at, id)",
    r#"
    CREATE TABLE IF NOT EXISTS registrations (
        id          TEXT PRIMARY KEY,
        event_id    TEXT NOT NULL,
        user_email  TEXT NOT NULL,
        event_title TEXT NOT NULL,
        created_at  TIMESTAMPTZ NOT NULL,
        attributes  JSONB NOT NULL DEFAULT '{}'::jsonb
    )
    "#,
    "CREATE INDEX IF NOT EXISTS registrations_event_id_idx ON registrations (event_id)",
    "CREATE INDEX IF NOT EXISTS registrations_user_email_idx ON registrations (lower(user_email))",
];

/// Create tables and indexes if they do not exist yet.
pub async fn ensure_schema(pool: &PgPool) -> StoreResult<()> {
    for statement in STATEMENTS {
        sqlx::query(statement)
            .execute(pool)
            .await
            .map_err(|e| StoreError::Backend(format!("schema bootstrap failed: {e}")))?;
    }
    info!(statements = STATEMENTS.len(), "database schema ready");
    Ok(())
}
