use chrono::NaiveDateTime;
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row, TransactionBehavior, params};
use tracing::debug;

use remindr_types::{Event, EventId, UserId};

use crate::models::{UserRow, join_instant, split_instant};
use crate::{Database, StoreError};

impl Database {
    // -- Users --

    pub fn create_user(&self, username: &str, password_hash: &str) -> Result<UserId, StoreError> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO users (username, password_hash) VALUES (?1, ?2)",
                (username, password_hash),
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<Option<UserRow>, StoreError> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    "SELECT id, username, password_hash FROM users WHERE username = ?1",
                    [username],
                    |row| {
                        Ok(UserRow {
                            id: row.get(0)?,
                            username: row.get(1)?,
                            password_hash: row.get(2)?,
                        })
                    },
                )
                .optional()?;
            Ok(row)
        })
    }

    // -- Events --

    /// Exact match on owner, name and instant.
    pub fn event_exists(
        &self,
        user_id: UserId,
        name: &str,
        occurs_at: NaiveDateTime,
    ) -> Result<bool, StoreError> {
        self.with_conn(|conn| query_event_exists(conn, user_id, name, occurs_at, None))
    }

    /// Check-then-insert under one immediate transaction. A matching row
    /// yields [`StoreError::Duplicate`] and nothing is written.
    pub fn insert_event(
        &self,
        user_id: UserId,
        name: &str,
        occurs_at: NaiveDateTime,
        reminder_requested: bool,
    ) -> Result<EventId, StoreError> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

            if query_event_exists(&tx, user_id, name, occurs_at, None)? {
                debug!("Rejected duplicate event {:?} for user {}", name, user_id);
                return Err(StoreError::Duplicate);
            }

            let (date_ms, time_ms) = split_instant(occurs_at);
            tx.execute(
                "INSERT INTO events (user_id, name, event_date, event_time, reminder_requested)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![user_id, name, date_ms, time_ms, reminder_requested],
            )?;
            let id = tx.last_insert_rowid();
            tx.commit()?;

            debug!("Inserted event {} for user {}", id, user_id);
            Ok(id)
        })
    }

    /// All events owned by `user_id`, earliest first.
    pub fn list_events_by_user(&self, user_id: UserId) -> Result<Vec<Event>, StoreError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, user_id, name, event_date, event_time, reminder_requested
                 FROM events
                 WHERE user_id = ?1
                 ORDER BY event_date ASC, event_time ASC, id ASC",
            )?;

            let events = stmt
                .query_map([user_id], event_from_row)?
                .collect::<Result<Vec<_>, _>>()?;

            Ok(events)
        })
    }

    pub fn get_event(&self, event_id: EventId, user_id: UserId) -> Result<Option<Event>, StoreError> {
        self.with_conn(|conn| {
            let event = conn
                .query_row(
                    "SELECT id, user_id, name, event_date, event_time, reminder_requested
                     FROM events WHERE id = ?1 AND user_id = ?2",
                    [event_id, user_id],
                    event_from_row,
                )
                .optional()?;
            Ok(event)
        })
    }

    /// Owner of `event_id`, or `None` once the row is gone.
    pub fn event_owner(&self, event_id: EventId) -> Result<Option<UserId>, StoreError> {
        self.with_conn(|conn| {
            let owner = conn
                .query_row(
                    "SELECT user_id FROM events WHERE id = ?1",
                    [event_id],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(owner)
        })
    }

    /// Rewrite name and instant of an owned event.
    ///
    /// Returns `Ok(false)` when no `(event_id, user_id)` row exists. Runs the
    /// same uniqueness guard as insert, ignoring the row being updated.
    pub fn update_event(
        &self,
        event_id: EventId,
        user_id: UserId,
        name: &str,
        occurs_at: NaiveDateTime,
    ) -> Result<bool, StoreError> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

            if query_event_exists(&tx, user_id, name, occurs_at, Some(event_id))? {
                debug!("Rejected update of event {}: collides with another row", event_id);
                return Err(StoreError::Duplicate);
            }

            let (date_ms, time_ms) = split_instant(occurs_at);
            let changed = tx.execute(
                "UPDATE events SET name = ?1, event_date = ?2, event_time = ?3
                 WHERE id = ?4 AND user_id = ?5",
                params![name, date_ms, time_ms, event_id, user_id],
            )?;
            tx.commit()?;

            Ok(changed > 0)
        })
    }

    pub fn set_reminder_requested(
        &self,
        event_id: EventId,
        user_id: UserId,
        requested: bool,
    ) -> Result<bool, StoreError> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE events SET reminder_requested = ?1 WHERE id = ?2 AND user_id = ?3",
                params![requested, event_id, user_id],
            )?;
            Ok(changed > 0)
        })
    }

    /// Remove an owned event. Reminder cancellation is the caller's job.
    pub fn delete_event(&self, event_id: EventId, user_id: UserId) -> Result<bool, StoreError> {
        self.with_conn(|conn| {
            let deleted = conn.execute(
                "DELETE FROM events WHERE id = ?1 AND user_id = ?2",
                [event_id, user_id],
            )?;
            debug!("Delete event {} for user {}: {} row(s)", event_id, user_id, deleted);
            Ok(deleted > 0)
        })
    }
}

fn query_event_exists(
    conn: &Connection,
    user_id: UserId,
    name: &str,
    occurs_at: NaiveDateTime,
    excluding: Option<EventId>,
) -> Result<bool, StoreError> {
    let (date_ms, time_ms) = split_instant(occurs_at);
    let found: Option<i64> = conn
        .query_row(
            "SELECT id FROM events
             WHERE user_id = ?1 AND name = ?2 AND event_date = ?3 AND event_time = ?4
               AND (?5 IS NULL OR id != ?5)
             LIMIT 1",
            params![user_id, name, date_ms, time_ms, excluding],
            |row| row.get(0),
        )
        .optional()?;
    Ok(found.is_some())
}

fn event_from_row(row: &Row<'_>) -> rusqlite::Result<Event> {
    let date_ms: i64 = row.get(3)?;
    let time_ms: i64 = row.get(4)?;
    let occurs_at = join_instant(date_ms, time_ms).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            4,
            Type::Integer,
            format!("invalid event instant ({date_ms}, {time_ms})").into(),
        )
    })?;

    Ok(Event {
        id: row.get(0)?,
        user_id: row.get(1)?,
        name: row.get(2)?,
        occurs_at,
        reminder_requested: row.get(5)?,
    })
}
