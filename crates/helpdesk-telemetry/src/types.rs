//! Journal record types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// How a single inbound message was routed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Route {
    /// Answered straight from the knowledge catalog
    KnowledgeBase,
    /// Answered by the generative model
    Generated,
    /// Model unavailable, template answer sent
    Fallback,
    /// Consumed as a ticket field
    TicketField,
    /// Slash command dispatch
    Command,
    /// Dropped (duplicate delivery or empty text)
    Ignored,
}

/// One handled message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnRecord {
    pub session_id: String,
    pub user_id: String,
    pub timestamp: DateTime<Utc>,
    pub route: Route,
    #[serde(default)]
    pub knowledge_entry: Option<String>,
    #[serde(default)]
    pub ticket_number: Option<String>,
    #[serde(default)]
    pub latency_ms: u64,
}

/// A ticket create whose outcome is unknown.
///
/// The record may or may not exist in the store; an operator must check
/// before anyone retries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconcileRecord {
    pub timestamp: DateTime<Utc>,
    pub session_id: String,
    pub user_id: String,
    #[serde(default)]
    pub proposed_number: Option<String>,
    pub subject: String,
    pub reason: String,
}
