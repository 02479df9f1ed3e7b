//! Postgres-backed catalog store.
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Code | StoreError |
//! |------------|-----------------|------------|
//! | Database (unique violation) on insert | `23505` | `Duplicate` |
//! | Row decode failure | N/A | `Corrupt` |
//! | Anything else | Any | `Backend` |
//!
//! ## Thread Safety
//!
//! `PostgresCatalogStore` is `Send + Sync`; the SQLx pool handles connection
//! sharing. Multi-statement operations run inside one transaction.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, Row, Transaction};
use tracing::{debug, info, instrument};

use sprintspace_core::{
    Attributes, DocumentId, Event, EventFilter, EventPatch, PageRequest, Registration, RegistrationFilter,
    RegistrationPatch, SortOrder,
};

use super::schema;
use super::{CatalogStore, StoreError, StoreResult, UpdateOutcome};

const EVENT_COLUMNS: &str = "id, owner_email, title, start_date, created_at, total_registration_count, attributes";
const REGISTRATION_COLUMNS: &str = "id, event_id, user_email, event_title, created_at, attributes";

#[derive(Debug, Clone)]
pub struct PostgresCatalogStore {
    pool: PgPool,
}

impl PostgresCatalogStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Open a pool and make sure the schema exists.
    pub async fn connect(database_url: &str, max_connections: u32) -> StoreResult<Self> {
        info!(max_connections, "connecting to postgres");
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;

        schema::ensure_schema(&pool).await?;
        Ok(Self::new(pool))
    }

    async fn begin(&self) -> StoreResult<Transaction<'static, Postgres>> {
        self.pool.begin().await.map_err(|e| map_sqlx_error("begin", e))
    }
}

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            StoreError::Backend(format!("database error in {}: {}", operation, db_err.message()))
        }
        sqlx::Error::PoolClosed => StoreError::Backend(format!("connection pool closed in {operation}")),
        other @ (sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) | sqlx::Error::ColumnNotFound(_)) => {
            StoreError::Corrupt(format!("{operation}: {other}"))
        }
        other => StoreError::Backend(format!("{operation}: {other}")),
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some("23505"))
}

fn parse_id(raw: &str) -> StoreResult<DocumentId> {
    raw.parse()
        .map_err(|e| StoreError::Corrupt(format!("stored id {raw:?}: {e}")))
}

fn event_from_row(row: &PgRow) -> StoreResult<Event> {
    let get = |e: sqlx::Error| map_sqlx_error("decode event", e);

    let id: String = row.try_get("id").map_err(get)?;
    let count: i64 = row.try_get("total_registration_count").map_err(get)?;
    let Json(attributes): Json<Attributes> = row.try_get("attributes").map_err(get)?;

    Ok(Event {
        id: parse_id(&id)?,
        owner_email: row.try_get("owner_email").map_err(get)?,
        title: row.try_get("title").map_err(get)?,
        start_date: row.try_get::<NaiveDate, _>("start_date").map_err(get)?,
        created_at: row.try_get::<DateTime<Utc>, _>("created_at").map_err(get)?,
        total_registration_count: u64::try_from(count).unwrap_or(0),
        attributes,
    })
}

fn registration_from_row(row: &PgRow) -> StoreResult<Registration> {
    let get = |e: sqlx::Error| map_sqlx_error("decode registration", e);

    let id: String = row.try_get("id").map_err(get)?;
    let event_id: String = row.try_get("event_id").map_err(get)?;
    let Json(attributes): Json<Attributes> = row.try_get("attributes").map_err(get)?;

    Ok(Registration {
        id: parse_id(&id)?,
        event_id: parse_id(&event_id)?,
        user_email: row.try_get("user_email").map_err(get)?,
        event_title: row.try_get("event_title").map_err(get)?,
        created_at: row.try_get::<DateTime<Utc>, _>("created_at").map_err(get)?,
        attributes,
    })
}

fn order_keyword(sort: SortOrder) -> &'static str {
    match sort {
        SortOrder::Asc => "ASC",
        SortOrder::Desc => "DESC",
    }
}

#[async_trait]
impl CatalogStore for PostgresCatalogStore {
    #[instrument(skip(self, event), fields(event_id = %event.id), err)]
    async fn insert_event(&self, event: Event) -> StoreResult<()> {
        let result = sqlx::query(
            r#"
            INSERT INTO events (id, owner_email, title, start_date, created_at, total_registration_count, attributes)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(event.id.to_string())
        .bind(&event.owner_email)
        .bind(&event.title)
        .bind(event.start_date)
        .bind(event.created_at)
        .bind(i64::try_from(event.total_registration_count).unwrap_or(i64::MAX))
        .bind(Json(&event.attributes))
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(e) if is_unique_violation(&e) => Err(StoreError::Duplicate(event.id)),
            Err(e) => Err(map_sqlx_error("insert_event", e)),
        }
    }

    #[instrument(skip(self), fields(event_id = %id), err)]
    async fn find_event(&self, id: DocumentId) -> StoreResult<Option<Event>> {
        let row = sqlx::query(&format!("SELECT {EVENT_COLUMNS} FROM events WHERE id = $1"))
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_event", e))?;

        row.as_ref().map(event_from_row).transpose()
    }

    #[instrument(skip(self), err)]
    async fn list_events(&self, filter: &EventFilter, window: Option<PageRequest>) -> StoreResult<Vec<Event>> {
        let order = order_keyword(filter.sort);
        let sql = format!(
            r#"
            SELECT {EVENT_COLUMNS}
            FROM events
            WHERE ($1::text IS NULL OR lower(owner_email) = lower($1))
            ORDER BY created_at {order}, id {order}
            LIMIT $2 OFFSET $3
            "#
        );

        let limit: Option<i64> = window.map(|w| i64::from(w.limit()));
        let offset: i64 = window.map(|w| i64::try_from(w.offset()).unwrap_or(i64::MAX)).unwrap_or(0);

        let rows = sqlx::query(&sql)
            .bind(filter.owner_email.as_deref())
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_events", e))?;

        debug!(rows = rows.len(), "listed events");
        rows.iter().map(event_from_row).collect()
    }

    #[instrument(skip(self), err)]
    async fn count_events(&self, filter: &EventFilter) -> StoreResult<u64> {
        let row = sqlx::query(
            r#"
            SELECT COUNT(*) AS total
            FROM events
            WHERE ($1::text IS NULL OR lower(owner_email) = lower($1))
            "#,
        )
        .bind(filter.owner_email.as_deref())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("count_events", e))?;

        let total: i64 = row
            .try_get("total")
            .map_err(|e| map_sqlx_error("count_events", e))?;
        Ok(u64::try_from(total).unwrap_or(0))
    }

    #[instrument(skip(self), err)]
    async fn upcoming_events(&self, after: NaiveDate, limit: u32) -> StoreResult<Vec<Event>> {
        let rows = sqlx::query(&format!(
            "SELECT {EVENT_COLUMNS} FROM events WHERE start_date > $1 ORDER BY start_date ASC, id ASC LIMIT $2"
        ))
        .bind(after)
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("upcoming_events", e))?;

        rows.iter().map(event_from_row).collect()
    }

    #[instrument(skip(self, patch), fields(event_id = %id), err)]
    async fn update_event(&self, id: DocumentId, patch: &EventPatch) -> StoreResult<UpdateOutcome> {
        let mut tx = self.begin().await?;

        let row = sqlx::query(&format!("SELECT {EVENT_COLUMNS} FROM events WHERE id = $1 FOR UPDATE"))
            .bind(id.to_string())
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("update_event", e))?;

        let Some(row) = row else {
            return Ok(UpdateOutcome::not_found());
        };
        let mut event = event_from_row(&row)?;
        if !patch.apply(&mut event) {
            return Ok(UpdateOutcome { matched: true, modified: false });
        }

        sqlx::query("UPDATE events SET title = $2, start_date = $3, attributes = $4 WHERE id = $1")
            .bind(id.to_string())
            .bind(&event.title)
            .bind(event.start_date)
            .bind(Json(&event.attributes))
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("update_event", e))?;

        tx.commit().await.map_err(|e| map_sqlx_error("update_event", e))?;
        Ok(UpdateOutcome { matched: true, modified: true })
    }

    #[instrument(skip(self), fields(event_id = %id), err)]
    async fn delete_event(&self, id: DocumentId) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM events WHERE id = $1")
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_event", e))?;
        Ok(result.rows_affected() > 0)
    }

    #[instrument(
        skip(self, registration),
        fields(registration_id = %registration.id, event_id = %registration.event_id),
        err
    )]
    async fn insert_registration(&self, registration: Registration) -> StoreResult<()> {
        let mut tx = self.begin().await?;

        // The row lock taken here serializes concurrent writers on one event.
        let bumped = sqlx::query(
            "UPDATE events SET total_registration_count = total_registration_count + 1 WHERE id = $1",
        )
        .bind(registration.event_id.to_string())
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("insert_registration", e))?;

        if bumped.rows_affected() == 0 {
            return Err(StoreError::EventNotFound(registration.event_id));
        }

        let inserted = sqlx::query(
            r#"
            INSERT INTO registrations (id, event_id, user_email, event_title, created_at, attributes)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(registration.id.to_string())
        .bind(registration.event_id.to_string())
        .bind(&registration.user_email)
        .bind(&registration.event_title)
        .bind(registration.created_at)
        .bind(Json(&registration.attributes))
        .execute(&mut *tx)
        .await;

        match inserted {
            Ok(_) => {}
            Err(e) if is_unique_violation(&e) => return Err(StoreError::Duplicate(registration.id)),
            Err(e) => return Err(map_sqlx_error("insert_registration", e)),
        }

        tx.commit().await.map_err(|e| map_sqlx_error("insert_registration", e))
    }

    #[instrument(skip(self), fields(registration_id = %id), err)]
    async fn find_registration(&self, id: DocumentId) -> StoreResult<Option<Registration>> {
        let row = sqlx::query(&format!("SELECT {REGISTRATION_COLUMNS} FROM registrations WHERE id = $1"))
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_registration", e))?;

        row.as_ref().map(registration_from_row).transpose()
    }

    #[instrument(skip(self), err)]
    async fn list_registrations(&self, filter: &RegistrationFilter) -> StoreResult<Vec<Registration>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {REGISTRATION_COLUMNS}
            FROM registrations
            WHERE ($1::text IS NULL OR lower(user_email) = lower($1))
                AND ($2::text IS NULL OR event_id = $2)
                AND ($3::text IS NULL OR event_title ~* $3)
            ORDER BY created_at ASC, id ASC
            "#
        ))
        .bind(filter.user_email.as_deref())
        .bind(filter.event_id.map(|id| id.to_string()))
        .bind(filter.title.as_ref().map(|t| t.pattern()))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_registrations", e))?;

        rows.iter().map(registration_from_row).collect()
    }

    #[instrument(skip(self, patch), fields(registration_id = %id), err)]
    async fn update_registration(&self, id: DocumentId, patch: &RegistrationPatch) -> StoreResult<UpdateOutcome> {
        let mut tx = self.begin().await?;

        let row = sqlx::query(&format!(
            "SELECT {REGISTRATION_COLUMNS} FROM registrations WHERE id = $1 FOR UPDATE"
        ))
        .bind(id.to_string())
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("update_registration", e))?;

        let Some(row) = row else {
            return Ok(UpdateOutcome::not_found());
        };
        let mut registration = registration_from_row(&row)?;
        if !patch.apply(&mut registration) {
            return Ok(UpdateOutcome { matched: true, modified: false });
        }

        sqlx::query("UPDATE registrations SET user_email = $2, event_title = $3, attributes = $4 WHERE id = $1")
            .bind(id.to_string())
            .bind(&registration.user_email)
            .bind(&registration.event_title)
            .bind(Json(&registration.attributes))
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("update_registration", e))?;

        tx.commit().await.map_err(|e| map_sqlx_error("update_registration", e))?;
        Ok(UpdateOutcome { matched: true, modified: true })
    }

    #[instrument(skip(self), fields(registration_id = %id), err)]
    async fn delete_registration(&self, id: DocumentId) -> StoreResult<Registration> {
        let mut tx = self.begin().await?;

        let row = sqlx::query(&format!(
            "DELETE FROM registrations WHERE id = $1 RETURNING {REGISTRATION_COLUMNS}"
        ))
        .bind(id.to_string())
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("delete_registration", e))?;

        let Some(row) = row else {
            return Err(StoreError::RegistrationNotFound(id));
        };
        let registration = registration_from_row(&row)?;

        let dropped = sqlx::query(
            r#"
            UPDATE events
            SET total_registration_count = GREATEST(total_registration_count - 1, 0)
            WHERE id = $1
            "#,
        )
        .bind(registration.event_id.to_string())
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("delete_registration", e))?;

        if dropped.rows_affected() == 0 {
            // Dropping `tx` rolls the delete back.
            return Err(StoreError::EventNotFound(registration.event_id));
        }

        tx.commit().await.map_err(|e| map_sqlx_error("delete_registration", e))?;
        Ok(registration)
    }

    async fn close(&self) {
        info!("closing postgres pool");
        self.pool.close().await;
    }
}

#[cfg(test)]
mod tests {
    //! These run only when `TEST_DATABASE_URL` points at a scratch database.

    use serde_json::json;

    use sprintspace_core::{EventDraft, RegistrationDraft, TitleSearch};

    use super::*;

    async fn store() -> Option<PostgresCatalogStore> {
        let url = std::env::var("TEST_DATABASE_URL").ok()?;
        Some(PostgresCatalogStore::connect(&url, 2).await.expect("connect to TEST_DATABASE_URL"))
    }

    fn event(title: &str) -> Event {
        EventDraft::from_json(json!({ "title": title, "marathonStartDate": "2031-06-01", "city": "Oslo" }))
            .unwrap()
            .into_event(DocumentId::new(), "pg-owner@example.com", Utc::now())
    }

    #[tokio::test]
    async fn registration_counter_round_trip() {
        let Some(store) = store().await else { return };

        let e = event("Sprint Marathon 2031");
        store.insert_event(e.clone()).await.unwrap();
        let stored = store.find_event(e.id).await.unwrap().unwrap();
        assert_eq!(stored.attributes["city"], "Oslo");

        let r = RegistrationDraft::from_json(json!({ "eventId": e.id.to_string() }))
            .unwrap()
            .into_registration(DocumentId::new(), "runner@example.com", &e.title, Utc::now());
        store.insert_registration(r.clone()).await.unwrap();
        assert_eq!(store.find_event(e.id).await.unwrap().unwrap().total_registration_count, 1);

        let filter = RegistrationFilter {
            event_id: Some(e.id),
            title: TitleSearch::new("sprint marathon").unwrap(),
            ..Default::default()
        };
        assert_eq!(store.list_registrations(&filter).await.unwrap().len(), 1);

        store.delete_registration(r.id).await.unwrap();
        assert_eq!(store.find_event(e.id).await.unwrap().unwrap().total_registration_count, 0);

        assert!(store.delete_event(e.id).await.unwrap());
    }

    #[tokio::test]
    async fn registration_for_missing_event_is_rejected() {
        let Some(store) = store().await else { return };

        let ghost = event("Ghost");
        let r = RegistrationDraft::from_json(json!({ "eventId": ghost.id.to_string() }))
            .unwrap()
            .into_registration(DocumentId::new(), "runner@example.com", &ghost.title, Utc::now());

        assert_eq!(store.insert_registration(r.clone()).await, Err(StoreError::EventNotFound(ghost.id)));
        assert!(store.find_registration(r.id).await.unwrap().is_none());
    }
}
