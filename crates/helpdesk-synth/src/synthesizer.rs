//! Turns a question (and an optional knowledge match) into an answer.
//! Never fails: every model problem becomes the fallback answer.

use crate::client::{CompletionPrompt, ModelClient};
use crate::error::ModelError;
use crate::prompt::{fallback_answer, user_prompt, SYSTEM_PROMPT};
use helpdesk_core::triage::{generate_subject, requires_ticket, suggest_category, suggest_priority};
use helpdesk_core::{AnswerResult, AnswerSource, Category, CategorySet, Config, KnowledgeEntry};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Replies shorter than this are treated as the model being unavailable
const MIN_REPLY_CHARS: usize = 20;

pub struct ResponseSynthesizer {
    model: Arc<dyn ModelClient>,
    categories: CategorySet,
    max_tokens: u32,
    temperature: f32,
}

impl ResponseSynthesizer {
    pub fn new(model: Arc<dyn ModelClient>, config: &Config) -> Self {
        Self {
            model,
            categories: config.categories.clone(),
            max_tokens: config.model.max_tokens,
            temperature: config.model.temperature,
        }
    }

    pub async fn synthesize(
        &self,
        text: &str,
        matched: Option<&KnowledgeEntry>,
        timeout: Duration,
    ) -> AnswerResult {
        let category = self.category_for(text, matched);
        let suggested_subject = generate_subject(text);
        let suggested_priority = suggest_priority(text);
        let knowledge_entry = matched.map(|e| e.id.clone());

        if let Some(entry) = matched.filter(|e| !e.always_needs_ticket) {
            debug!(entry = %entry.id, "answering from knowledge base");
            return AnswerResult {
                solution: entry.solution.clone(),
                category,
                source: AnswerSource::KnowledgeBase,
                needs_ticket: false,
                suggested_subject,
                suggested_priority,
                knowledge_entry,
            };
        }

        match self.ask_model(text, timeout).await {
            Ok(answer) => {
                let needs_ticket = matched.is_some_and(|e| e.always_needs_ticket)
                    || requires_ticket(text, &answer);
                debug!(needs_ticket, "generated answer");
                AnswerResult {
                    solution: answer,
                    category,
                    source: AnswerSource::Generated,
                    needs_ticket,
                    suggested_subject,
                    suggested_priority,
                    knowledge_entry,
                }
            }
            Err(e) => {
                warn!(error = %e, "model unavailable, using fallback answer");
                AnswerResult {
                    solution: fallback_answer(text),
                    category,
                    source: AnswerSource::Fallback,
                    needs_ticket: true,
                    suggested_subject,
                    suggested_priority,
                    knowledge_entry,
                }
            }
        }
    }

    async fn ask_model(&self, text: &str, timeout: Duration) -> Result<String, ModelError> {
        let prompt = CompletionPrompt {
            system: SYSTEM_PROMPT.to_string(),
            user: user_prompt(text),
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        };

        let reply = tokio::time::timeout(timeout, self.model.complete(&prompt, timeout))
            .await
            .map_err(|_| ModelError::Timeout(timeout))??;

        let reply = reply.trim();
        let len = reply.chars().count();
        if len < MIN_REPLY_CHARS {
            return Err(ModelError::UnusableReply(len));
        }
        Ok(reply.to_string())
    }

    fn category_for(&self, text: &str, matched: Option<&KnowledgeEntry>) -> Category {
        matched
            .and_then(|e| self.categories.resolve(&e.category))
            .unwrap_or_else(|| suggest_category(text, &self.categories))
    }
}
