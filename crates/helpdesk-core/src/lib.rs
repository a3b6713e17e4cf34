//! Routing and ticket-workflow core: knowledge matching, triage heuristics,
//! the ticket state machine and process-wide configuration

mod answer;
mod config;
mod error;
mod flow;
mod knowledge;
mod sla;
pub mod triage;
mod types;

pub use answer::{AnswerResult, AnswerSource};
pub use config::{Config, ModelSettings, NotificationSettings, StoreSettings};
pub use error::{ConfigError, FlowError};
pub use flow::{FieldValue, FlowEvent, TicketField, TicketFields, TicketFlow};
pub use knowledge::{normalize, KnowledgeCatalog, KnowledgeEntry};
pub use sla::DueDateOffsets;
pub use types::{
    Category, CategorySet, Priority, Resolution, Ticket, TicketDraft, TicketNumber, TicketStatus,
};
