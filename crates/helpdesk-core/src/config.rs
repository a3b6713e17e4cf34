//! Process-wide configuration, loaded once at startup

use crate::error::ConfigError;
use crate::knowledge::KnowledgeCatalog;
use crate::sla::{DueDateOffsets, MAX_DUE_HOURS};
use crate::types::CategorySet;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_COMMANDS: &[&str] = &[
    "/help", "/ticket", "/status", "/submit", "/cancel", "/resolve", "/close", "/stats",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Slash commands the orchestrator recognizes
    pub commands: Vec<String>,
    pub catalog: KnowledgeCatalog,
    pub categories: CategorySet,
    pub due_offsets: DueDateOffsets,
    pub session_timeout_secs: u64,
    /// Roles allowed to resolve, close and view statistics
    pub elevated_roles: Vec<String>,
    pub model: ModelSettings,
    pub store: StoreSettings,
    pub notifications: NotificationSettings,
}

/// Generative model endpoint settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelSettings {
    /// Base URL of an OpenAI-compatible API. No endpoint disables the model.
    pub endpoint: Option<String>,
    pub model: String,
    /// Environment variable holding the API key
    pub api_key_env: String,
    pub timeout_ms: u64,
    pub max_tokens: u32,
    pub temperature: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSettings {
    /// SQLite database path; defaults to `tickets.db` in the helpdesk home
    pub database: Option<PathBuf>,
    pub number_prefix: String,
    pub create_attempts: u32,
    pub allocation_attempts: u32,
    pub request_timeout_ms: u64,
    pub retry_backoff_ms: u64,
}

/// Proactive messages sent outside the current conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationSettings {
    /// Conversation that hears about every new ticket. None disables it.
    pub it_channel: Option<String>,
    /// Tell the submitter, addressed by email, when their ticket is closed
    pub notify_submitter_on_close: bool,
    pub timeout_ms: u64,
}

impl NotificationSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            it_channel: None,
            notify_submitter_on_close: true,
            timeout_ms: 5_000,
        }
    }
}

impl ModelSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn api_key(&self) -> Option<String> {
        std::env::var(&self.api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty())
    }
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            endpoint: None,
            model: "gpt-4o-mini".to_string(),
            api_key_env: "HELPDESK_MODEL_API_KEY".to_string(),
            timeout_ms: 10_000,
            max_tokens: 500,
            temperature: 0.7,
        }
    }
}

impl StoreSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            database: None,
            number_prefix: "IT".to_string(),
            create_attempts: 3,
            allocation_attempts: 5,
            request_timeout_ms: 10_000,
            retry_backoff_ms: 200,
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self {
            commands: DEFAULT_COMMANDS.iter().map(|c| c.to_string()).collect(),
            catalog: KnowledgeCatalog::builtin(),
            categories: CategorySet::default(),
            due_offsets: DueDateOffsets::new(),
            session_timeout_secs: 30 * 60,
            elevated_roles: vec!["it-admin".to_string()],
            model: ModelSettings::default(),
            store: StoreSettings::default(),
            notifications: NotificationSettings::default(),
        }
    }

    /// Parse and validate a JSON document. Absent keys take their defaults.
    pub fn from_json(content: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path`. A missing file yields the defaults; anything else
    /// that goes wrong is fatal.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::new());
        }
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&content)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.commands.is_empty() {
            return Err(ConfigError::Invalid("no commands configured".into()));
        }
        if let Some(bad) = self.commands.iter().find(|c| !c.starts_with('/') || c.len() < 2) {
            return Err(ConfigError::Invalid(format!(
                "command '{bad}' must start with '/'"
            )));
        }
        if self.categories.is_empty() {
            return Err(ConfigError::Invalid("category set is empty".into()));
        }
        self.catalog.validate(&self.categories)?;

        if self.session_timeout_secs == 0 {
            return Err(ConfigError::Invalid("session_timeout_secs must be positive".into()));
        }
        if !self.due_offsets.in_range() {
            return Err(ConfigError::Invalid(format!(
                "due-date offsets must be between 1 and {MAX_DUE_HOURS} hours"
            )));
        }

        if self.model.timeout_ms == 0 {
            return Err(ConfigError::Invalid("model.timeout_ms must be positive".into()));
        }
        if !(0.0..=2.0).contains(&self.model.temperature) {
            return Err(ConfigError::Invalid(
                "model.temperature must be between 0 and 2".into(),
            ));
        }

        let store = &self.store;
        if store.number_prefix.is_empty()
            || store.number_prefix.len() > 8
            || !store.number_prefix.chars().all(|c| c.is_ascii_alphabetic())
        {
            return Err(ConfigError::Invalid(format!(
                "store.number_prefix '{}' must be 1-8 letters",
                store.number_prefix
            )));
        }
        if store.create_attempts == 0 || store.allocation_attempts == 0 {
            return Err(ConfigError::Invalid("store attempts must be at least 1".into()));
        }
        if store.request_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "store.request_timeout_ms must be positive".into(),
            ));
        }

        let notifications = &self.notifications;
        if notifications
            .it_channel
            .as_deref()
            .is_some_and(|c| c.trim().is_empty())
        {
            return Err(ConfigError::Invalid(
                "notifications.it_channel must not be blank".into(),
            ));
        }
        if notifications.timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "notifications.timeout_ms must be positive".into(),
            ));
        }
        Ok(())
    }

    pub fn session_timeout(&self) -> Duration {
        Duration::from_secs(self.session_timeout_secs)
    }

    pub fn is_elevated(&self, role: Option<&str>) -> bool {
        role.is_some_and(|role| {
            self.elevated_roles
                .iter()
                .any(|r| r.eq_ignore_ascii_case(role.trim()))
        })
    }

    pub fn recognizes(&self, command: &str) -> bool {
        self.commands.iter().any(|c| c.eq_ignore_ascii_case(command))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}
