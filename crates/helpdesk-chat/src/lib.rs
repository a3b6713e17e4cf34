//! Conversation orchestration: sessions, slash commands and the routing of
//! each inbound message to an answer or a ticket operation

mod commands;
mod message;
mod orchestrator;
mod render;
mod session;

pub use commands::{parse_command, Command, CommandError};
pub use message::{Action, Attachment, InboundMessage, OutboundResponse, Transport, TransportError, UserIdentity};
pub use orchestrator::{Journals, Orchestrator};
pub use session::{Clock, Mode, Session, SessionKey, SessionStore, SystemClock};
