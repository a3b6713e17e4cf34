use crate::fields::Record;
use async_trait::async_trait;
use thiserror::Error;

/// Record-level failures, classified by whether the request may have been
/// applied
#[derive(Debug, Error)]
pub enum BackendError {
    /// The request never reached the store. Safe to retry.
    #[error("request not sent: {0}")]
    NotSent(String),
    /// The request may or may not have been applied.
    #[error("request outcome unknown: {0}")]
    Ambiguous(String),
    /// A record with the same ticket number already exists.
    #[error("ticket number {0} already exists")]
    Conflict(String),
    #[error("ticket {0} not found")]
    NotFound(String),
    #[error("store rejected the request: {0}")]
    Rejected(String),
    #[error("malformed record: {0}")]
    Decode(String),
}

impl BackendError {
    /// Worth retrying for idempotent requests
    pub fn is_transient(&self) -> bool {
        matches!(self, BackendError::NotSent(_) | BackendError::Ambiguous(_))
    }
}

/// Filter for [`TicketBackend::list_records`]. Results are newest first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordQuery {
    pub submitted_by: Option<String>,
    /// Skip closed tickets
    pub exclude_closed: bool,
    pub limit: Option<usize>,
}

impl RecordQuery {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn for_submitter(email: &str, limit: usize) -> Self {
        Self {
            submitted_by: Some(email.to_string()),
            exclude_closed: true,
            limit: Some(limit),
        }
    }
}

/// The ticketing system of record
#[async_trait]
pub trait TicketBackend: Send + Sync {
    /// Whether the store assigns ticket numbers itself on insert
    fn assigns_numbers(&self) -> bool {
        false
    }

    /// Insert a record and return it as stored. Fails with
    /// [`BackendError::Conflict`] when the ticket number is taken.
    async fn insert_record(&self, record: Record) -> Result<Record, BackendError>;

    async fn find_record(&self, number: &str) -> Result<Option<Record>, BackendError>;

    /// Set the given fields on an existing record
    async fn update_record(&self, number: &str, fields: Record) -> Result<(), BackendError>;

    /// Highest ticket number with the given prefix
    async fn max_ticket_number(&self, prefix: &str) -> Result<Option<String>, BackendError>;

    async fn list_records(&self, query: &RecordQuery) -> Result<Vec<Record>, BackendError>;
}
