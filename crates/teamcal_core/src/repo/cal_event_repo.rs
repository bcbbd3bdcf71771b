//! Calendar event repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide CRUD and range queries over `cal_events`.
//! - Append and read the per-event write history.
//!
//! # Invariants
//! - Write paths call `CalEvent::validate()` before SQL mutations.
//! - Range listing is ordered by `start_ms ASC, id ASC`.
//! - History is append-only and ordered by insertion.
//! - `write_with_history` commits the event row and its history entry together.

use crate::model::calendar::TeamCalId;
use crate::model::event::{CalEvent, CalEventId, EventHistoryEntry, EventOperation};
use crate::model::user::UserId;
use crate::repo::{
    bool_to_int, ensure_schema, int_to_bool, map_unique_violation, RepoError, RepoResult,
};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row, Transaction, TransactionBehavior};
use uuid::Uuid;

const CAL_EVENT_SELECT_SQL: &str = "SELECT
    id,
    uid,
    calendar_id,
    subject,
    location,
    note,
    start_ms,
    end_ms,
    all_day,
    is_deleted
FROM cal_events";

const CAL_EVENT_COLUMNS: &[&str] = &[
    "id",
    "uid",
    "calendar_id",
    "subject",
    "location",
    "note",
    "start_ms",
    "end_ms",
    "all_day",
    "is_deleted",
];
const HISTORY_COLUMNS: &[&str] = &[
    "id",
    "event_id",
    "user_id",
    "operation",
    "changed_fields",
    "timestamp_ms",
];

/// Filter and pagination options for listing events.
///
/// Range bounds keep events with `end_ms >= from_ms` and `start_ms < until_ms`.
#[derive(Debug, Clone, Default)]
pub struct CalEventListQuery {
    /// Empty means every calendar.
    pub calendar_ids: Vec<TeamCalId>,
    pub from_ms: Option<i64>,
    pub until_ms: Option<i64>,
    pub include_deleted: bool,
    pub limit: Option<u32>,
    pub offset: u32,
}

/// A single event write together with the history operation it records.
#[derive(Debug, Clone, Copy)]
pub enum EventChange<'a> {
    Insert(&'a CalEvent),
    Update {
        event: &'a CalEvent,
        changed_fields: &'a [String],
    },
    Delete(CalEventId),
    Restore(CalEventId),
}

impl EventChange<'_> {
    pub fn operation(&self) -> EventOperation {
        match self {
            Self::Insert(_) => EventOperation::Insert,
            Self::Update { .. } => EventOperation::Update,
            Self::Delete(_) => EventOperation::Delete,
            Self::Restore(_) => EventOperation::Restore,
        }
    }
}

/// Repository interface for calendar events and their history.
pub trait CalEventRepository {
    fn create_event(&self, event: &CalEvent) -> RepoResult<CalEventId>;
    fn update_event(&self, event: &CalEvent) -> RepoResult<()>;
    fn get_event(&self, id: CalEventId, include_deleted: bool) -> RepoResult<Option<CalEvent>>;
    fn list_events(&self, query: &CalEventListQuery) -> RepoResult<Vec<CalEvent>>;
    fn soft_delete_event(&self, id: CalEventId) -> RepoResult<()>;
    fn restore_event(&self, id: CalEventId) -> RepoResult<()>;
    fn append_history(
        &self,
        event_id: CalEventId,
        user_id: UserId,
        operation: EventOperation,
        changed_fields: &[String],
        timestamp_ms: i64,
    ) -> RepoResult<()>;
    fn list_history(&self, event_id: CalEventId) -> RepoResult<Vec<EventHistoryEntry>>;
    /// Applies `change` and appends its history entry atomically; either
    /// both rows are written or neither is. Returns the event id.
    fn write_with_history(
        &self,
        change: EventChange<'_>,
        user_id: UserId,
        timestamp_ms: i64,
    ) -> RepoResult<CalEventId>;
}

/// SQLite-backed calendar event repository.
pub struct SqliteCalEventRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteCalEventRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_schema(
            conn,
            &[
                ("cal_events", CAL_EVENT_COLUMNS),
                ("cal_event_history", HISTORY_COLUMNS),
            ],
        )?;
        Ok(Self { conn })
    }
}

impl CalEventRepository for SqliteCalEventRepository<'_> {
    fn create_event(&self, event: &CalEvent) -> RepoResult<CalEventId> {
        insert_event(self.conn, event)
    }

    fn update_event(&self, event: &CalEvent) -> RepoResult<()> {
        update_event_row(self.conn, event)
    }

    fn get_event(&self, id: CalEventId, include_deleted: bool) -> RepoResult<Option<CalEvent>> {
        let mut stmt = self.conn.prepare(&format!(
            "{CAL_EVENT_SELECT_SQL}
             WHERE id = ?1
               AND (?2 = 1 OR is_deleted = 0);"
        ))?;
        let mut rows = stmt.query(params![id, bool_to_int(include_deleted)])?;
        match rows.next()? {
            Some(row) => Ok(Some(parse_cal_event_row(row)?)),
            None => Ok(None),
        }
    }

    fn list_events(&self, query: &CalEventListQuery) -> RepoResult<Vec<CalEvent>> {
        let mut sql = format!("{CAL_EVENT_SELECT_SQL} WHERE 1 = 1");
        let mut bind_values: Vec<Value> = Vec::new();

        if !query.include_deleted {
            sql.push_str(" AND is_deleted = 0");
        }

        if !query.calendar_ids.is_empty() {
            let placeholders = vec!["?"; query.calendar_ids.len()].join(", ");
            sql.push_str(&format!(" AND calendar_id IN ({placeholders})"));
            bind_values.extend(query.calendar_ids.iter().map(|id| Value::Integer(*id)));
        }

        if let Some(from_ms) = query.from_ms {
            sql.push_str(" AND end_ms >= ?");
            bind_values.push(Value::Integer(from_ms));
        }

        if let Some(until_ms) = query.until_ms {
            sql.push_str(" AND start_ms < ?");
            bind_values.push(Value::Integer(until_ms));
        }

        sql.push_str(" ORDER BY start_ms ASC, id ASC");

        if let Some(limit) = query.limit {
            sql.push_str(" LIMIT ?");
            bind_values.push(Value::Integer(i64::from(limit)));
            if query.offset > 0 {
                sql.push_str(" OFFSET ?");
                bind_values.push(Value::Integer(i64::from(query.offset)));
            }
        } else if query.offset > 0 {
            sql.push_str(" LIMIT -1 OFFSET ?");
            bind_values.push(Value::Integer(i64::from(query.offset)));
        }

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut events = Vec::new();
        while let Some(row) = rows.next()? {
            events.push(parse_cal_event_row(row)?);
        }
        Ok(events)
    }

    fn soft_delete_event(&self, id: CalEventId) -> RepoResult<()> {
        set_deleted(self.conn, id, true)
    }

    fn restore_event(&self, id: CalEventId) -> RepoResult<()> {
        set_deleted(self.conn, id, false)
    }

    fn append_history(
        &self,
        event_id: CalEventId,
        user_id: UserId,
        operation: EventOperation,
        changed_fields: &[String],
        timestamp_ms: i64,
    ) -> RepoResult<()> {
        insert_history(
            self.conn,
            event_id,
            user_id,
            operation,
            changed_fields,
            timestamp_ms,
        )
    }

    fn list_history(&self, event_id: CalEventId) -> RepoResult<Vec<EventHistoryEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, event_id, user_id, operation, changed_fields, timestamp_ms
             FROM cal_event_history
             WHERE event_id = ?1
             ORDER BY id ASC;",
        )?;
        let mut rows = stmt.query([event_id])?;
        let mut entries = Vec::new();
        while let Some(row) = rows.next()? {
            entries.push(parse_history_row(row)?);
        }
        Ok(entries)
    }

    fn write_with_history(
        &self,
        change: EventChange<'_>,
        user_id: UserId,
        timestamp_ms: i64,
    ) -> RepoResult<CalEventId> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let (event_id, changed_fields) = match change {
            EventChange::Insert(event) => (insert_event(&tx, event)?, &[][..]),
            EventChange::Update {
                event,
                changed_fields,
            } => {
                update_event_row(&tx, event)?;
                (event.id, changed_fields)
            }
            EventChange::Delete(id) => {
                set_deleted(&tx, id, true)?;
                (id, &[][..])
            }
            EventChange::Restore(id) => {
                set_deleted(&tx, id, false)?;
                (id, &[][..])
            }
        };
        insert_history(
            &tx,
            event_id,
            user_id,
            change.operation(),
            changed_fields,
            timestamp_ms,
        )?;
        tx.commit()?;
        Ok(event_id)
    }
}

fn insert_event(conn: &Connection, event: &CalEvent) -> RepoResult<CalEventId> {
    event.validate()?;

    conn.execute(
        "INSERT INTO cal_events (
            uid,
            calendar_id,
            subject,
            location,
            note,
            start_ms,
            end_ms,
            all_day,
            is_deleted
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9);",
        params![
            event.uid.to_string(),
            event.calendar_id,
            event.subject.as_str(),
            event.location.as_deref(),
            event.note.as_deref(),
            event.start_ms,
            event.end_ms,
            bool_to_int(event.all_day),
            bool_to_int(event.is_deleted),
        ],
    )
    .map_err(|err| {
        map_unique_violation(
            err,
            format!(
                "event uid {} already used or calendar {} missing",
                event.uid, event.calendar_id
            ),
        )
    })?;

    Ok(conn.last_insert_rowid())
}

fn update_event_row(conn: &Connection, event: &CalEvent) -> RepoResult<()> {
    event.validate()?;

    let changed = conn.execute(
        "UPDATE cal_events
         SET
            calendar_id = ?1,
            subject = ?2,
            location = ?3,
            note = ?4,
            start_ms = ?5,
            end_ms = ?6,
            all_day = ?7,
            is_deleted = ?8,
            updated_at = (strftime('%s', 'now') * 1000)
         WHERE id = ?9;",
        params![
            event.calendar_id,
            event.subject.as_str(),
            event.location.as_deref(),
            event.note.as_deref(),
            event.start_ms,
            event.end_ms,
            bool_to_int(event.all_day),
            bool_to_int(event.is_deleted),
            event.id,
        ],
    )?;
    if changed == 0 {
        return Err(RepoError::NotFound {
            entity: "event",
            id: event.id,
        });
    }
    Ok(())
}

fn set_deleted(conn: &Connection, id: CalEventId, deleted: bool) -> RepoResult<()> {
    let changed = conn.execute(
        "UPDATE cal_events
         SET
            is_deleted = ?1,
            updated_at = (strftime('%s', 'now') * 1000)
         WHERE id = ?2;",
        params![bool_to_int(deleted), id],
    )?;
    if changed == 0 {
        return Err(RepoError::NotFound { entity: "event", id });
    }
    Ok(())
}

fn insert_history(
    conn: &Connection,
    event_id: CalEventId,
    user_id: UserId,
    operation: EventOperation,
    changed_fields: &[String],
    timestamp_ms: i64,
) -> RepoResult<()> {
    let fields_json = serde_json::to_string(changed_fields)
        .map_err(|err| RepoError::InvalidData(format!("cannot encode changed fields: {err}")))?;
    conn.execute(
        "INSERT INTO cal_event_history (
            event_id,
            user_id,
            operation,
            changed_fields,
            timestamp_ms
        ) VALUES (?1, ?2, ?3, ?4, ?5);",
        params![
            event_id,
            user_id,
            operation.as_str(),
            fields_json,
            timestamp_ms
        ],
    )?;
    Ok(())
}

fn parse_cal_event_row(row: &Row<'_>) -> RepoResult<CalEvent> {
    let uid_text: String = row.get("uid")?;
    let uid = Uuid::parse_str(&uid_text).map_err(|_| {
        RepoError::InvalidData(format!("invalid uid value `{uid_text}` in cal_events.uid"))
    })?;

    let event = CalEvent {
        id: row.get("id")?,
        uid,
        calendar_id: row.get("calendar_id")?,
        subject: row.get("subject")?,
        location: row.get("location")?,
        note: row.get("note")?,
        start_ms: row.get("start_ms")?,
        end_ms: row.get("end_ms")?,
        all_day: int_to_bool(row.get("all_day")?, "cal_events.all_day")?,
        is_deleted: int_to_bool(row.get("is_deleted")?, "cal_events.is_deleted")?,
    };
    event.validate().map_err(|err| {
        RepoError::InvalidData(format!("event {} failed validation: {err}", event.id))
    })?;
    Ok(event)
}

fn parse_history_row(row: &Row<'_>) -> RepoResult<EventHistoryEntry> {
    let operation_text: String = row.get("operation")?;
    let operation = EventOperation::parse(&operation_text).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid operation `{operation_text}` in cal_event_history.operation"
        ))
    })?;

    let fields_text: String = row.get("changed_fields")?;
    let changed_fields: Vec<String> = serde_json::from_str(&fields_text).map_err(|err| {
        RepoError::InvalidData(format!(
            "invalid changed_fields `{fields_text}` in cal_event_history: {err}"
        ))
    })?;

    Ok(EventHistoryEntry {
        id: row.get("id")?,
        event_id: row.get("event_id")?,
        user_id: row.get("user_id")?,
        operation,
        changed_fields,
        timestamp_ms: row.get("timestamp_ms")?,
    })
}
