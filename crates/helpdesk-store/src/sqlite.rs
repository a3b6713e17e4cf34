//! Local SQLite ticket store.
//!
//! rusqlite is blocking, so every statement runs on tokio's blocking pool.
//! The calling future stays cancellable and the adapter's request timeout
//! applies; a statement already running finishes in the background.

use crate::backend::{BackendError, RecordQuery, TicketBackend};
use crate::fields::{self, FieldId, Record};
use async_trait::async_trait;
use helpdesk_core::TicketNumber;
use rusqlite::types::{Value as SqlValue, ValueRef};
use rusqlite::{params, params_from_iter, Connection, ErrorCode, OptionalExtension};
use serde_json::Value;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::debug;

/// How long SQLite itself waits on a locked database file
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const COLUMNS: [(FieldId, &str); 12] = [
    (fields::TICKET_NUMBER, "ticket_number"),
    (fields::SUBJECT, "subject"),
    (fields::DESCRIPTION, "description"),
    (fields::PRIORITY, "priority"),
    (fields::CATEGORY, "category"),
    (fields::STATUS, "status"),
    (fields::SUBMITTED_AT, "submitted_at"),
    (fields::DUE_AT, "due_at"),
    (fields::RESOLVED_AT, "resolved_at"),
    (fields::RESOLUTION, "resolution"),
    (fields::TIME_SPENT, "time_spent"),
    (fields::SUBMITTED_BY, "submitted_by"),
];

fn column_for(field: FieldId) -> Option<&'static str> {
    COLUMNS.iter().find(|(id, _)| *id == field).map(|(_, c)| *c)
}

fn select_list() -> String {
    let cols: Vec<&str> = COLUMNS.iter().map(|(_, c)| *c).collect();
    format!("record_id, {}", cols.join(", "))
}

fn to_sql(value: &Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Bool(b) => SqlValue::Integer(i64::from(*b)),
        Value::Number(n) => n
            .as_i64()
            .map(SqlValue::Integer)
            .or_else(|| n.as_f64().map(SqlValue::Real))
            .unwrap_or(SqlValue::Null),
        Value::String(s) => SqlValue::Text(s.clone()),
        other => SqlValue::Text(other.to_string()),
    }
}

fn from_sql(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::from(i),
        ValueRef::Real(f) => Value::from(f),
        ValueRef::Text(t) | ValueRef::Blob(t) => Value::from(String::from_utf8_lossy(t).into_owned()),
    }
}

fn row_to_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<Record> {
    let mut record = Record::new();
    record.insert(fields::RECORD_ID, Value::from(row.get::<_, i64>(0)?));
    for (i, (field, _)) in COLUMNS.iter().enumerate() {
        let value = from_sql(row.get_ref(i + 1)?);
        if !value.is_null() {
            record.insert(*field, value);
        }
    }
    Ok(record)
}

fn classify(err: rusqlite::Error, number: &str) -> BackendError {
    if let rusqlite::Error::SqliteFailure(e, _) = &err {
        if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
            || e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
        {
            return BackendError::Conflict(number.to_string());
        }
        if matches!(e.code, ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked) {
            return BackendError::NotSent(err.to_string());
        }
    }
    BackendError::Rejected(err.to_string())
}

pub struct SqliteBackend {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteBackend {
    pub fn open(db_path: &Path) -> rusqlite::Result<Self> {
        if let Some(parent) = db_path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        Self::init(Connection::open(db_path)?)
    }

    pub fn in_memory() -> rusqlite::Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> rusqlite::Result<Self> {
        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS tickets (
                record_id INTEGER PRIMARY KEY AUTOINCREMENT,
                prefix TEXT NOT NULL,
                sequence INTEGER NOT NULL,
                ticket_number TEXT NOT NULL UNIQUE,
                subject TEXT,
                description TEXT,
                priority TEXT NOT NULL,
                category TEXT,
                status TEXT NOT NULL,
                submitted_at TEXT NOT NULL,
                due_at TEXT NOT NULL,
                resolved_at TEXT,
                resolution TEXT,
                time_spent REAL,
                submitted_by TEXT
            );
            CREATE INDEX IF NOT EXISTS idx_submitted_by ON tickets(submitted_by);
            CREATE INDEX IF NOT EXISTS idx_sequence ON tickets(prefix, sequence);
            ",
        )?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run `op` against the connection on the blocking pool
    async fn with_conn<T, F>(&self, op: F) -> Result<T, BackendError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T, BackendError> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let guard = conn
                .lock()
                .map_err(|_| BackendError::NotSent("sqlite connection lock poisoned".into()))?;
            op(&guard)
        })
        .await
        .map_err(|e| BackendError::Ambiguous(format!("sqlite task failed: {e}")))?
    }
}

#[async_trait]
impl TicketBackend for SqliteBackend {
    async fn insert_record(&self, mut record: Record) -> Result<Record, BackendError> {
        let raw = record
            .get(&fields::TICKET_NUMBER)
            .and_then(Value::as_str)
            .ok_or_else(|| BackendError::Rejected("ticket number is required".into()))?
            .to_string();
        let number = TicketNumber::parse(&raw)
            .ok_or_else(|| BackendError::Rejected(format!("bad ticket number '{raw}'")))?;
        let prefix = number
            .as_str()
            .split('-')
            .next()
            .unwrap_or_default()
            .to_string();
        let sequence = number.sequence().unwrap_or_default() as i64;
        record.insert(fields::TICKET_NUMBER, Value::from(number.as_str()));

        let names: Vec<&str> = COLUMNS.iter().map(|(_, c)| *c).collect();
        let placeholders: Vec<String> = (3..names.len() + 3).map(|i| format!("?{i}")).collect();
        let sql = format!(
            "INSERT INTO tickets (prefix, sequence, {}) VALUES (?1, ?2, {})",
            names.join(", "),
            placeholders.join(", ")
        );

        let mut values = vec![SqlValue::Text(prefix), SqlValue::Integer(sequence)];
        values.extend(COLUMNS.iter().map(|(field, _)| {
            record.get(field).map(to_sql).unwrap_or(SqlValue::Null)
        }));

        self.with_conn(move |conn| {
            conn.execute(&sql, params_from_iter(values.iter()))
                .map_err(|e| classify(e, number.as_str()))?;
            record.insert(fields::RECORD_ID, Value::from(conn.last_insert_rowid()));
            debug!(number = %number, "inserted ticket record");
            Ok(record)
        })
        .await
    }

    async fn find_record(&self, number: &str) -> Result<Option<Record>, BackendError> {
        let sql = format!(
            "SELECT {} FROM tickets WHERE ticket_number = ?1",
            select_list()
        );
        let number = number.to_string();
        self.with_conn(move |conn| {
            conn.query_row(&sql, params![number], row_to_record)
                .optional()
                .map_err(|e| classify(e, &number))
        })
        .await
    }

    async fn update_record(&self, number: &str, changes: Record) -> Result<(), BackendError> {
        let mut assignments = Vec::new();
        let mut values = Vec::new();
        for (field, value) in &changes {
            let column = column_for(*field)
                .filter(|c| *c != "ticket_number")
                .ok_or_else(|| BackendError::Rejected(format!("field {field} is not writable")))?;
            values.push(to_sql(value));
            assignments.push(format!("{column} = ?{}", values.len()));
        }
        if assignments.is_empty() {
            return Ok(());
        }
        values.push(SqlValue::Text(number.to_string()));
        let sql = format!(
            "UPDATE tickets SET {} WHERE ticket_number = ?{}",
            assignments.join(", "),
            values.len()
        );

        let number = number.to_string();
        self.with_conn(move |conn| {
            let changed = conn
                .execute(&sql, params_from_iter(values.iter()))
                .map_err(|e| classify(e, &number))?;
            if changed == 0 {
                return Err(BackendError::NotFound(number));
            }
            Ok(())
        })
        .await
    }

    async fn max_ticket_number(&self, prefix: &str) -> Result<Option<String>, BackendError> {
        let prefix = prefix.to_uppercase();
        self.with_conn(move |conn| {
            conn.query_row(
                "SELECT ticket_number FROM tickets WHERE prefix = ?1
                 ORDER BY sequence DESC LIMIT 1",
                params![prefix],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| classify(e, &prefix))
        })
        .await
    }

    async fn list_records(&self, query: &RecordQuery) -> Result<Vec<Record>, BackendError> {
        let sql = format!(
            "SELECT {} FROM tickets
             WHERE (?1 IS NULL OR submitted_by = ?1 COLLATE NOCASE)
               AND (?2 = 0 OR status <> 'Closed')
             ORDER BY submitted_at DESC, record_id DESC
             LIMIT ?3",
            select_list()
        );
        let limit = query.limit.map(|l| l as i64).unwrap_or(-1);
        let submitted_by = query.submitted_by.clone();
        let exclude_closed = query.exclude_closed;

        self.with_conn(move |conn| {
            let mut stmt = conn.prepare(&sql).map_err(|e| classify(e, "list"))?;
            let rows = stmt
                .query_map(params![submitted_by, exclude_closed, limit], row_to_record)
                .map_err(|e| classify(e, "list"))?;
            rows.collect::<Result<Vec<_>, _>>()
                .map_err(|e| classify(e, "list"))
        })
        .await
    }
}
