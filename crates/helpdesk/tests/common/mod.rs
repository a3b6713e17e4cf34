#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, TimeZone, Utc};
use helpdesk_chat::{
    Clock, InboundMessage, Orchestrator, OutboundResponse, Transport, TransportError,
};
use helpdesk_core::{Config, TicketDraft, TicketNumber, TicketStatus};
use helpdesk_store::fields::{self, Record};
use helpdesk_store::{BackendError, RecordQuery, TicketBackend, TicketPatch};
use helpdesk_synth::{CompletionPrompt, ModelClient, ModelError};
use serde_json::Value;
use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// In-memory ticket store with scripted insert failures
pub struct MockBackend {
    assigns_numbers: bool,
    records: Mutex<BTreeMap<String, Record>>,
    insert_failures: Mutex<VecDeque<BackendError>>,
    insert_delay: Option<Duration>,
    insert_calls: AtomicUsize,
    next_id: AtomicUsize,
}

impl MockBackend {
    pub fn new() -> Self {
        Self {
            assigns_numbers: false,
            records: Mutex::new(BTreeMap::new()),
            insert_failures: Mutex::new(VecDeque::new()),
            insert_delay: None,
            insert_calls: AtomicUsize::new(0),
            next_id: AtomicUsize::new(1),
        }
    }

    /// A store that numbers tickets itself
    pub fn numbering() -> Self {
        Self {
            assigns_numbers: true,
            ..Self::new()
        }
    }

    pub fn with_insert_delay(mut self, delay: Duration) -> Self {
        self.insert_delay = Some(delay);
        self
    }

    /// Fail the next inserts, in order
    pub fn fail_inserts(&self, errors: Vec<BackendError>) {
        self.insert_failures.lock().unwrap().extend(errors);
    }

    pub fn insert_calls(&self) -> usize {
        self.insert_calls.load(Ordering::SeqCst)
    }

    pub fn ticket_count(&self) -> usize {
        self.records.lock().unwrap().len()
    }

    pub fn record(&self, number: &str) -> Option<Record> {
        self.records.lock().unwrap().get(number).cloned()
    }

    /// Put a ticket straight into the store
    pub fn seed(&self, number: &TicketNumber, draft: &TicketDraft, patch: Option<&TicketPatch>) {
        let submitted = Utc.with_ymd_and_hms(2025, 3, 3, 9, 0, 0).unwrap();
        let mut record = fields::new_record(
            draft,
            Some(number),
            submitted,
            submitted + ChronoDuration::hours(24),
            Some("owner@example.com"),
        );
        if let Some(patch) = patch {
            record.extend(fields::patch_record(patch));
        }
        self.records
            .lock()
            .unwrap()
            .insert(number.to_string(), record);
    }
}

fn text(record: &Record, field: u32) -> Option<&str> {
    record.get(&field).and_then(Value::as_str)
}

#[async_trait]
impl TicketBackend for MockBackend {
    fn assigns_numbers(&self) -> bool {
        self.assigns_numbers
    }

    async fn insert_record(&self, mut record: Record) -> Result<Record, BackendError> {
        self.insert_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.insert_delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(error) = self.insert_failures.lock().unwrap().pop_front() {
            return Err(error);
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        if self.assigns_numbers {
            let number = TicketNumber::from_sequence("IT", 41 + id as u64);
            record.insert(fields::TICKET_NUMBER, Value::from(number.as_str()));
        }
        let number = text(&record, fields::TICKET_NUMBER)
            .ok_or_else(|| BackendError::Rejected("ticket number missing".into()))?
            .to_string();
        record.insert(fields::RECORD_ID, Value::from(id as u64));

        let mut records = self.records.lock().unwrap();
        if records.contains_key(&number) {
            return Err(BackendError::Conflict(number));
        }
        records.insert(number, record.clone());
        Ok(record)
    }

    async fn find_record(&self, number: &str) -> Result<Option<Record>, BackendError> {
        Ok(self.record(number))
    }

    async fn update_record(&self, number: &str, changes: Record) -> Result<(), BackendError> {
        let mut records = self.records.lock().unwrap();
        let record = records
            .get_mut(number)
            .ok_or_else(|| BackendError::NotFound(number.to_string()))?;
        record.extend(changes);
        Ok(())
    }

    async fn max_ticket_number(&self, prefix: &str) -> Result<Option<String>, BackendError> {
        let records = self.records.lock().unwrap();
        Ok(records
            .keys()
            .filter_map(|k| TicketNumber::parse(k))
            .filter(|n| n.as_str().starts_with(&format!("{prefix}-")))
            .max_by_key(|n| n.sequence())
            .map(|n| n.to_string()))
    }

    async fn list_records(&self, query: &RecordQuery) -> Result<Vec<Record>, BackendError> {
        let records = self.records.lock().unwrap();
        let mut matching: Vec<Record> = records
            .values()
            .filter(|r| match &query.submitted_by {
                Some(email) => text(r, fields::SUBMITTED_BY) == Some(email.as_str()),
                None => true,
            })
            .filter(|r| {
                !query.exclude_closed
                    || text(r, fields::STATUS) != Some(TicketStatus::Closed.as_str())
            })
            .cloned()
            .collect();
        matching.reverse();
        if let Some(limit) = query.limit {
            matching.truncate(limit);
        }
        Ok(matching)
    }
}

/// Model that replays canned replies and counts calls
pub struct ScriptedModel {
    replies: Mutex<VecDeque<Result<String, ModelError>>>,
    calls: AtomicUsize,
}

impl ScriptedModel {
    pub fn new(replies: Vec<Result<String, ModelError>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            calls: AtomicUsize::new(0),
        }
    }

    /// Every call fails
    pub fn unavailable() -> Self {
        Self::new(Vec::new())
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ModelClient for ScriptedModel {
    async fn complete(
        &self,
        _prompt: &CompletionPrompt,
        timeout: Duration,
    ) -> Result<String, ModelError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Err(ModelError::Timeout(timeout)))
    }
}

/// Clock the test moves by hand
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            now: Mutex::new(Utc.with_ymd_and_hms(2025, 3, 4, 10, 0, 0).unwrap()),
        }
    }

    pub fn advance(&self, by: ChronoDuration) {
        *self.now.lock().unwrap() += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

/// Transport that keeps everything sent through it
#[derive(Default)]
pub struct RecordingTransport {
    sent: Mutex<Vec<(String, OutboundResponse)>>,
    reject: bool,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records each attempt, then refuses it
    pub fn rejecting() -> Self {
        Self {
            reject: true,
            ..Self::default()
        }
    }

    pub fn sent(&self) -> Vec<(String, OutboundResponse)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn send_message(
        &self,
        session_id: &str,
        response: &OutboundResponse,
    ) -> Result<(), TransportError> {
        self.sent
            .lock()
            .unwrap()
            .push((session_id.to_string(), response.clone()));
        if self.reject {
            return Err(TransportError::Rejected("recipient unreachable".into()));
        }
        Ok(())
    }
}

pub fn test_config() -> Config {
    let mut config = Config::new();
    config.store.retry_backoff_ms = 1;
    config.store.request_timeout_ms = 2_000;
    config
}

pub struct Harness {
    pub orchestrator: Arc<Orchestrator>,
    pub backend: Arc<MockBackend>,
    pub model: Arc<ScriptedModel>,
    pub clock: Arc<ManualClock>,
}

pub fn harness(backend: MockBackend, model: ScriptedModel) -> Harness {
    harness_with(test_config(), backend, model, None)
}

pub fn harness_with(
    config: Config,
    backend: MockBackend,
    model: ScriptedModel,
    notifier: Option<Arc<dyn Transport>>,
) -> Harness {
    let backend = Arc::new(backend);
    let model = Arc::new(model);
    let clock = Arc::new(ManualClock::new());
    let mut orchestrator = Orchestrator::new(Arc::new(config), model.clone(), backend.clone())
        .with_clock(clock.clone());
    if let Some(notifier) = notifier {
        orchestrator = orchestrator.with_notifier(notifier);
    }
    Harness {
        orchestrator: Arc::new(orchestrator),
        backend,
        model,
        clock,
    }
}

pub fn user_msg(text: &str) -> InboundMessage {
    let mut message = InboundMessage::new("channel-1", "user-1", text);
    message.user.name = Some("Sam".to_string());
    message.user.email = Some("sam@example.com".to_string());
    message
}

pub fn admin_msg(text: &str) -> InboundMessage {
    let mut message = InboundMessage::new("channel-1", "admin-1", text);
    message.user.name = Some("Robin".to_string());
    message.role = Some("it-admin".to_string());
    message
}
