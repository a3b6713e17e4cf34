use helpdesk_core::TicketNumber;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    /// Nothing was created or changed; the caller may try again later.
    #[error("ticket store unavailable: {0}")]
    Unavailable(String),
    /// A create request may have been applied. Never retried automatically.
    #[error("ticket creation outcome unknown: {reason}")]
    AmbiguousCreate {
        /// Number proposed for the record, when allocated locally
        number: Option<TicketNumber>,
        reason: String,
    },
    #[error("no free ticket number after {0} attempts")]
    AllocationExhausted(u32),
    #[error("ticket {0} not found")]
    NotFound(TicketNumber),
    #[error("invalid ticket record: {0}")]
    InvalidRecord(String),
}
