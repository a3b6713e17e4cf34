//! Field-id mapping between tickets and store records.
//!
//! Records are keyed by the store's numeric field ids. Only this module and
//! backends know the ids; the rest of the workspace works with [`Ticket`].

use crate::backend::BackendError;
use chrono::{DateTime, Utc};
use helpdesk_core::{
    Category, Priority, Resolution, Ticket, TicketDraft, TicketNumber, TicketStatus,
};
use serde_json::Value;
use std::collections::BTreeMap;

pub type FieldId = u32;

/// A store record: field id to value
pub type Record = BTreeMap<FieldId, Value>;

pub const RECORD_ID: FieldId = 3;
pub const TICKET_NUMBER: FieldId = 6;
pub const SUBJECT: FieldId = 7;
pub const DESCRIPTION: FieldId = 8;
pub const PRIORITY: FieldId = 9;
pub const CATEGORY: FieldId = 10;
pub const STATUS: FieldId = 11;
pub const SUBMITTED_AT: FieldId = 12;
pub const DUE_AT: FieldId = 13;
pub const RESOLVED_AT: FieldId = 14;
pub const RESOLUTION: FieldId = 15;
pub const TIME_SPENT: FieldId = 16;
pub const SUBMITTED_BY: FieldId = 19;

/// Changes applied to an existing ticket
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TicketPatch {
    pub status: Option<TicketStatus>,
    pub resolution: Option<Resolution>,
}

impl TicketPatch {
    pub fn resolve(resolution: Resolution) -> Self {
        Self {
            status: Some(TicketStatus::Resolved),
            resolution: Some(resolution),
        }
    }

    pub fn close() -> Self {
        Self {
            status: Some(TicketStatus::Closed),
            resolution: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.status.is_none() && self.resolution.is_none()
    }
}

fn timestamp(at: DateTime<Utc>) -> Value {
    Value::String(at.to_rfc3339())
}

/// Record for a new ticket. `number` is `None` when the backend assigns it.
pub fn new_record(
    draft: &TicketDraft,
    number: Option<&TicketNumber>,
    submitted_at: DateTime<Utc>,
    due_at: DateTime<Utc>,
    submitted_by: Option<&str>,
) -> Record {
    let mut record = Record::new();
    if let Some(number) = number {
        record.insert(TICKET_NUMBER, Value::from(number.as_str()));
    }
    record.insert(SUBJECT, Value::from(draft.subject.as_str()));
    record.insert(DESCRIPTION, Value::from(draft.description.as_str()));
    record.insert(PRIORITY, Value::from(draft.priority.as_str()));
    record.insert(CATEGORY, Value::from(draft.category.as_str()));
    record.insert(STATUS, Value::from(TicketStatus::Open.as_str()));
    record.insert(SUBMITTED_AT, timestamp(submitted_at));
    record.insert(DUE_AT, timestamp(due_at));
    if let Some(email) = submitted_by {
        record.insert(SUBMITTED_BY, Value::from(email));
    }
    record
}

/// Field updates for a patch. Resolution text, timestamp and time spent are
/// always written together.
pub fn patch_record(patch: &TicketPatch) -> Record {
    let mut record = Record::new();
    if let Some(status) = patch.status {
        record.insert(STATUS, Value::from(status.as_str()));
    }
    if let Some(resolution) = &patch.resolution {
        record.insert(RESOLUTION, Value::from(resolution.text.as_str()));
        record.insert(RESOLVED_AT, timestamp(resolution.resolved_at));
        record.insert(
            TIME_SPENT,
            resolution
                .time_spent_hours
                .map(Value::from)
                .unwrap_or(Value::Null),
        );
    }
    record
}

fn text<'a>(record: &'a Record, field: FieldId) -> Option<&'a str> {
    record
        .get(&field)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

fn required<'a>(record: &'a Record, field: FieldId, name: &str) -> Result<&'a str, BackendError> {
    text(record, field).ok_or_else(|| BackendError::Decode(format!("missing {name}")))
}

fn parse_time(raw: &str, name: &str) -> Result<DateTime<Utc>, BackendError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| BackendError::Decode(format!("bad {name} '{raw}': {e}")))
}

/// Decode a store record into a ticket
pub fn record_to_ticket(record: &Record) -> Result<Ticket, BackendError> {
    let raw_number = required(record, TICKET_NUMBER, "ticket number")?;
    let number = TicketNumber::parse(raw_number)
        .ok_or_else(|| BackendError::Decode(format!("bad ticket number '{raw_number}'")))?;

    let raw_priority = required(record, PRIORITY, "priority")?;
    let priority = Priority::parse(raw_priority)
        .ok_or_else(|| BackendError::Decode(format!("bad priority '{raw_priority}'")))?;

    let raw_status = required(record, STATUS, "status")?;
    let status = TicketStatus::parse(raw_status)
        .ok_or_else(|| BackendError::Decode(format!("bad status '{raw_status}'")))?;

    let submitted_at = parse_time(required(record, SUBMITTED_AT, "submitted date")?, "submitted date")?;
    let due_at = parse_time(required(record, DUE_AT, "due date")?, "due date")?;

    let resolution = match (text(record, RESOLUTION), text(record, RESOLVED_AT)) {
        (Some(text), Some(at)) => Some(Resolution {
            text: text.to_string(),
            resolved_at: parse_time(at, "resolved date")?,
            time_spent_hours: record.get(&TIME_SPENT).and_then(Value::as_f64),
        }),
        _ => None,
    };

    Ok(Ticket {
        number,
        subject: text(record, SUBJECT).unwrap_or("No Subject").to_string(),
        description: text(record, DESCRIPTION).unwrap_or_default().to_string(),
        priority,
        category: Category::new(text(record, CATEGORY).unwrap_or("General Support")),
        status,
        submitted_at,
        due_at,
        resolution,
        submitted_by: text(record, SUBMITTED_BY).map(str::to_string),
    })
}
