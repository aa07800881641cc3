//! Record-store access for events
//!
//! `EventStore` is the narrow contract the ledger depends on: insert,
//! window-scoped select, and delete-by-id-set, all scoped to one user.
//! `EventRepository` implements it over PostgreSQL; tests substitute an
//! in-memory store.

use chrono::{DateTime, Utc};
use common::error::{DatabaseError, DatabaseResult};
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::models::{Event, EventType, NewEvent};

/// Store operations the event ledger needs
#[allow(async_fn_in_trait)]
pub trait EventStore {
    /// Insert one event, returning the stored row
    async fn insert(&self, new: &NewEvent) -> DatabaseResult<Event>;

    /// Events for one user with `event_time` in `[start, end)`, ordered
    /// by `event_time` ascending
    async fn events_in_window(
        &self,
        user_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> DatabaseResult<Vec<Event>>;

    /// Ids of events for one user with `event_time` in `[start, end)`
    async fn ids_in_window(
        &self,
        user_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> DatabaseResult<Vec<Uuid>>;

    /// Delete the given ids for one user, returning the ids actually
    /// removed (the store may refuse some rows)
    async fn delete_by_ids(&self, user_id: Uuid, ids: &[Uuid]) -> DatabaseResult<Vec<Uuid>>;
}

/// Event repository over PostgreSQL
#[derive(Clone)]
pub struct EventRepository {
    pool: PgPool,
}

impl EventRepository {
    /// Create a new event repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn event_from_row(row: &sqlx::postgres::PgRow) -> DatabaseResult<Event> {
        let raw_type: String = row.get("event_type");
        let event_type = EventType::from_str(&raw_type).ok_or_else(|| {
            DatabaseError::Query(sqlx::Error::Decode(
                format!("unknown event type: {}", raw_type).into(),
            ))
        })?;

        Ok(Event {
            id: row.get("id"),
            user_id: row.get("user_id"),
            event_type,
            event_time: row.get("event_time"),
            created_at: row.get("created_at"),
        })
    }
}

impl EventStore for EventRepository {
    async fn insert(&self, new: &NewEvent) -> DatabaseResult<Event> {
        let row = sqlx::query(
            r#"
            INSERT INTO events (user_id, event_type, event_time)
            VALUES ($1, $2, $3)
            RETURNING id, user_id, event_type, event_time, created_at
            "#,
        )
        .bind(new.user_id)
        .bind(new.event_type.as_str())
        .bind(new.event_time)
        .fetch_one(&self.pool)
        .await
        .map_err(DatabaseError::Query)?;

        Self::event_from_row(&row)
    }

    async fn events_in_window(
        &self,
        user_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> DatabaseResult<Vec<Event>> {
        let rows = sqlx::query(
            r#"
            SELECT id, user_id, event_type, event_time, created_at
            FROM events
            WHERE user_id = $1 AND event_time >= $2 AND event_time < $3
            ORDER BY event_time ASC
            "#,
        )
        .bind(user_id)
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await
        .map_err(DatabaseError::Query)?;

        rows.iter().map(Self::event_from_row).collect()
    }

    async fn ids_in_window(
        &self,
        user_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> DatabaseResult<Vec<Uuid>> {
        let rows = sqlx::query(
            r#"
            SELECT id
            FROM events
            WHERE user_id = $1 AND event_time >= $2 AND event_time < $3
            "#,
        )
        .bind(user_id)
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await
        .map_err(DatabaseError::Query)?;

        Ok(rows.iter().map(|row| row.get("id")).collect())
    }

    async fn delete_by_ids(&self, user_id: Uuid, ids: &[Uuid]) -> DatabaseResult<Vec<Uuid>> {
        let rows = sqlx::query(
            r#"
            DELETE FROM events
            WHERE user_id = $1 AND id = ANY($2)
            RETURNING id
            "#,
        )
        .bind(user_id)
        .bind(ids)
        .fetch_all(&self.pool)
        .await
        .map_err(DatabaseError::Query)?;

        Ok(rows.iter().map(|row| row.get("id")).collect())
    }
}
