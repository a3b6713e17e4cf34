//! Ticket store adapter: field mapping, numbering, retries and the local
//! SQLite backend

mod adapter;
mod backend;
mod error;
pub mod fields;
mod retry;
mod sqlite;

pub use adapter::{TicketStats, TicketStoreAdapter, SUBMITTER_TICKET_LIMIT};
pub use backend::{BackendError, RecordQuery, TicketBackend};
pub use error::StoreError;
pub use fields::{Record, TicketPatch};
pub use sqlite::SqliteBackend;
