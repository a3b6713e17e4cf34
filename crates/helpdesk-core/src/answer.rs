//! Answer values produced for advisory turns

use crate::types::{Category, Priority};
use serde::{Deserialize, Serialize};

/// Where an answer came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AnswerSource {
    KnowledgeBase,
    Generated,
    Fallback,
}

impl AnswerSource {
    pub fn confidence(&self) -> f64 {
        match self {
            AnswerSource::KnowledgeBase => 0.95,
            AnswerSource::Generated => 0.85,
            AnswerSource::Fallback => 0.0,
        }
    }
}

/// Result of one advisory turn
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerResult {
    pub solution: String,
    pub category: Category,
    pub source: AnswerSource,
    pub needs_ticket: bool,
    pub suggested_subject: String,
    pub suggested_priority: Priority,
    /// Knowledge entry that produced or seeded the answer
    #[serde(default)]
    pub knowledge_entry: Option<String>,
}

impl AnswerResult {
    pub fn confidence(&self) -> f64 {
        self.source.confidence()
    }
}
