//! Answer synthesis: canned knowledge-base answers, generative-model answers
//! and the fallback used when the model cannot be reached

mod client;
mod error;
mod prompt;
mod synthesizer;

pub use client::{
    model_from_settings, ChatCompletionsClient, CompletionPrompt, DisabledModel, ModelClient,
};
pub use error::ModelError;
pub use prompt::{fallback_answer, user_prompt, SYSTEM_PROMPT};
pub use synthesizer::ResponseSynthesizer;
