//! Transport-facing message shapes

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Caller identity as authenticated by the chat platform
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentity {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

impl UserIdentity {
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub name: String,
    #[serde(default)]
    pub content_type: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundMessage {
    /// Conversation (channel) the message arrived in
    pub session_id: String,
    pub user: UserIdentity,
    pub text: String,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    #[serde(default)]
    pub role: Option<String>,
    /// Platform delivery id, used to drop redelivered messages
    #[serde(default)]
    pub delivery_id: Option<String>,
}

impl InboundMessage {
    pub fn new(session_id: &str, user_id: &str, text: &str) -> Self {
        Self {
            session_id: session_id.to_string(),
            user: UserIdentity {
                id: user_id.to_string(),
                name: None,
                email: None,
            },
            text: text.to_string(),
            attachments: Vec::new(),
            role: None,
            delivery_id: None,
        }
    }
}

/// A suggested reply the transport can render as a button
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
    pub label: String,
    /// Text sent back as the user's next message when chosen
    pub value: String,
}

impl Action {
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundResponse {
    pub title: String,
    pub body: String,
    #[serde(default)]
    pub actions: Vec<Action>,
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("transport io: {0}")]
    Io(#[from] std::io::Error),
    #[error("could not encode response: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("transport rejected message: {0}")]
    Rejected(String),
}

/// Outbound side of the chat platform
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send_message(
        &self,
        session_id: &str,
        response: &OutboundResponse,
    ) -> Result<(), TransportError>;
}
