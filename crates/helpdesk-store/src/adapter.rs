//! The only component that talks to the ticket store.
//!
//! Every backend call is bounded by the configured request timeout. Creates
//! are retried only when the backend reports the request was never sent;
//! reads and updates are idempotent and retried on any transient failure.

use crate::backend::{BackendError, RecordQuery, TicketBackend};
use crate::error::StoreError;
use crate::fields::{self, Record, TicketPatch};
use crate::retry::next_backoff;
use chrono::{DateTime, Utc};
use helpdesk_core::{
    Config, DueDateOffsets, Priority, StoreSettings, Ticket, TicketDraft, TicketNumber,
    TicketStatus,
};
use serde::Serialize;
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

/// How many of a user's tickets `/status` lists
pub const SUBMITTER_TICKET_LIMIT: usize = 10;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TicketStats {
    pub total_open: usize,
    pub resolved_today: usize,
    pub overdue: usize,
    pub open_by_priority: BTreeMap<Priority, usize>,
    pub open_by_category: BTreeMap<String, usize>,
}

pub struct TicketStoreAdapter {
    backend: Arc<dyn TicketBackend>,
    offsets: DueDateOffsets,
    settings: StoreSettings,
    allocation: Mutex<()>,
}

fn read_error(e: BackendError) -> StoreError {
    match e {
        BackendError::Decode(msg) => StoreError::InvalidRecord(msg),
        other => StoreError::Unavailable(other.to_string()),
    }
}

fn create_error(e: BackendError, number: Option<&TicketNumber>) -> StoreError {
    match e {
        BackendError::Ambiguous(reason) => StoreError::AmbiguousCreate {
            number: number.cloned(),
            reason,
        },
        other => StoreError::Unavailable(other.to_string()),
    }
}

impl TicketStoreAdapter {
    pub fn new(backend: Arc<dyn TicketBackend>, config: &Config) -> Self {
        Self {
            backend,
            offsets: config.due_offsets.clone(),
            settings: config.store.clone(),
            allocation: Mutex::new(()),
        }
    }

    async fn timed<T>(
        &self,
        request: impl Future<Output = Result<T, BackendError>>,
    ) -> Result<T, BackendError> {
        let limit = self.settings.request_timeout();
        tokio::time::timeout(limit, request)
            .await
            .unwrap_or_else(|_| Err(BackendError::Ambiguous(format!("no response within {limit:?}"))))
    }

    async fn retrying<T, F, Fut>(
        &self,
        what: &str,
        retry_if: fn(&BackendError) -> bool,
        mut request: F,
    ) -> Result<T, BackendError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, BackendError>>,
    {
        let attempts = self.settings.create_attempts.max(1);
        let mut attempt = 0;
        loop {
            match self.timed(request()).await {
                Err(e) if retry_if(&e) && attempt + 1 < attempts => {
                    let delay = next_backoff(self.settings.retry_backoff(), attempt);
                    warn!(error = %e, attempt, ?delay, "{what} failed, retrying");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                other => return other,
            }
        }
    }

    async fn insert(&self, record: Record) -> Result<Record, BackendError> {
        self.retrying(
            "ticket insert",
            |e| matches!(e, BackendError::NotSent(_)),
            || self.backend.insert_record(record.clone()),
        )
        .await
    }

    async fn next_number(&self) -> Result<TicketNumber, StoreError> {
        let prefix = self.settings.number_prefix.to_uppercase();
        let current = self
            .retrying("number lookup", BackendError::is_transient, || {
                self.backend.max_ticket_number(&prefix)
            })
            .await
            .map_err(read_error)?;

        let last = match current {
            Some(raw) => TicketNumber::parse(&raw)
                .and_then(|n| n.sequence())
                .ok_or_else(|| StoreError::InvalidRecord(format!("bad ticket number '{raw}'")))?,
            None => 0,
        };
        Ok(TicketNumber::from_sequence(&prefix, last + 1))
    }

    /// Decode a freshly inserted record. `proposed` is the locally allocated
    /// number, if any, and is reported when the stored record is unreadable.
    fn created(&self, stored: &Record, proposed: Option<&TicketNumber>) -> Result<Ticket, StoreError> {
        let ticket = fields::record_to_ticket(stored).map_err(|e| StoreError::AmbiguousCreate {
            number: proposed.cloned(),
            reason: format!("ticket stored but unreadable: {e}"),
        })?;
        info!(number = %ticket.number, priority = %ticket.priority, "ticket created");
        Ok(ticket)
    }

    /// Create a ticket from a complete draft
    pub async fn create_ticket(
        &self,
        draft: &TicketDraft,
        submitted_by: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Ticket, StoreError> {
        let due_at = self.offsets.due_date(draft.priority, now);

        if self.backend.assigns_numbers() {
            let record = fields::new_record(draft, None, now, due_at, submitted_by);
            let stored = self
                .insert(record)
                .await
                .map_err(|e| create_error(e, None))?;
            return self.created(&stored, None);
        }

        let _guard = self.allocation.lock().await;
        let attempts = self.settings.allocation_attempts.max(1);
        for attempt in 0..attempts {
            let number = self.next_number().await?;
            let record = fields::new_record(draft, Some(&number), now, due_at, submitted_by);
            match self.insert(record).await {
                Ok(stored) => return self.created(&stored, Some(&number)),
                Err(BackendError::Conflict(taken)) => {
                    debug!(number = %taken, attempt, "ticket number taken, reallocating");
                }
                Err(e) => return Err(create_error(e, Some(&number))),
            }
        }

        error!(attempts, "ticket number allocation exhausted");
        Err(StoreError::AllocationExhausted(attempts))
    }

    pub async fn get_ticket(&self, number: &TicketNumber) -> Result<Ticket, StoreError> {
        let record = self
            .retrying("ticket lookup", BackendError::is_transient, || {
                self.backend.find_record(number.as_str())
            })
            .await
            .map_err(read_error)?;

        match record {
            Some(record) => fields::record_to_ticket(&record).map_err(read_error),
            None => Err(StoreError::NotFound(number.clone())),
        }
    }

    /// Apply a patch and return the ticket as stored afterwards
    pub async fn update_ticket(
        &self,
        number: &TicketNumber,
        patch: &TicketPatch,
    ) -> Result<Ticket, StoreError> {
        if !patch.is_empty() {
            let changes = fields::patch_record(patch);
            self.retrying("ticket update", BackendError::is_transient, || {
                self.backend.update_record(number.as_str(), changes.clone())
            })
            .await
            .map_err(|e| match e {
                BackendError::NotFound(_) => StoreError::NotFound(number.clone()),
                other => read_error(other),
            })?;
            info!(
                number = %number,
                status = patch.status.map(|s| s.as_str()).unwrap_or("unchanged"),
                "ticket updated"
            );
        }
        self.get_ticket(number).await
    }

    async fn list(&self, query: &RecordQuery) -> Result<Vec<Ticket>, StoreError> {
        let records = self
            .retrying("ticket listing", BackendError::is_transient, || {
                self.backend.list_records(query)
            })
            .await
            .map_err(read_error)?;

        Ok(records
            .iter()
            .filter_map(|record| match fields::record_to_ticket(record) {
                Ok(ticket) => Some(ticket),
                Err(e) => {
                    warn!(error = %e, "skipping unreadable ticket record");
                    None
                }
            })
            .collect())
    }

    /// A user's tickets that are not closed, newest first
    pub async fn tickets_for_submitter(&self, email: &str) -> Result<Vec<Ticket>, StoreError> {
        self.list(&RecordQuery::for_submitter(email, SUBMITTER_TICKET_LIMIT))
            .await
    }

    pub async fn statistics(&self, now: DateTime<Utc>) -> Result<TicketStats, StoreError> {
        let tickets = self.list(&RecordQuery::all()).await?;

        let mut stats = TicketStats {
            open_by_priority: Priority::ALL.iter().map(|p| (*p, 0)).collect(),
            ..TicketStats::default()
        };
        let today = now.date_naive();
        for ticket in &tickets {
            if ticket.status.is_open() {
                stats.total_open += 1;
                *stats.open_by_priority.entry(ticket.priority).or_default() += 1;
                *stats
                    .open_by_category
                    .entry(ticket.category.to_string())
                    .or_default() += 1;
                if ticket.is_overdue(now) {
                    stats.overdue += 1;
                }
            }
            let resolved_today = ticket
                .resolution
                .as_ref()
                .is_some_and(|r| r.resolved_at.date_naive() == today);
            if resolved_today
                && matches!(ticket.status, TicketStatus::Resolved | TicketStatus::Closed)
            {
                stats.resolved_today += 1;
            }
        }
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SqliteBackend;
    use async_trait::async_trait;
    use helpdesk_core::{Category, Resolution};
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn config() -> Config {
        let mut config = Config::new();
        config.store.retry_backoff_ms = 1;
        config.store.request_timeout_ms = 100;
        config
    }

    fn draft(subject: &str, priority: Priority) -> TicketDraft {
        TicketDraft {
            subject: subject.to_string(),
            description: "details".to_string(),
            priority,
            category: Category::new("VPN Access"),
        }
    }

    /// In-memory backend with scripted insert failures
    #[derive(Default)]
    struct ScriptedBackend {
        records: std::sync::Mutex<Vec<Record>>,
        insert_failures: std::sync::Mutex<VecDeque<BackendError>>,
        insert_calls: AtomicUsize,
        find_failures: std::sync::Mutex<VecDeque<BackendError>>,
        stale_max: Option<String>,
        insert_delay: Option<Duration>,
        /// Hand back a stored record the adapter cannot decode
        garble_stored: bool,
    }

    impl ScriptedBackend {
        fn failing_inserts(errors: Vec<BackendError>) -> Self {
            Self {
                insert_failures: std::sync::Mutex::new(errors.into()),
                ..Self::default()
            }
        }

        fn inserts(&self) -> usize {
            self.insert_calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl TicketBackend for ScriptedBackend {
        async fn insert_record(&self, record: Record) -> Result<Record, BackendError> {
            self.insert_calls.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.insert_delay {
                tokio::time::sleep(delay).await;
            }
            if let Some(err) = self.insert_failures.lock().unwrap().pop_front() {
                return Err(err);
            }
            let number = record[&fields::TICKET_NUMBER].clone();
            let mut records = self.records.lock().unwrap();
            if records.iter().any(|r| r[&fields::TICKET_NUMBER] == number) {
                return Err(BackendError::Conflict(number.to_string()));
            }
            records.push(record.clone());
            if self.garble_stored {
                let mut garbled = record;
                garbled.insert(fields::STATUS, serde_json::Value::from("Misplaced"));
                return Ok(garbled);
            }
            Ok(record)
        }

        async fn find_record(&self, number: &str) -> Result<Option<Record>, BackendError> {
            if let Some(err) = self.find_failures.lock().unwrap().pop_front() {
                return Err(err);
            }
            Ok(self
                .records
                .lock()
                .unwrap()
                .iter()
                .find(|r| r[&fields::TICKET_NUMBER] == number)
                .cloned())
        }

        async fn update_record(&self, number: &str, changes: Record) -> Result<(), BackendError> {
            let mut records = self.records.lock().unwrap();
            let record = records
                .iter_mut()
                .find(|r| r[&fields::TICKET_NUMBER] == number)
                .ok_or_else(|| BackendError::NotFound(number.to_string()))?;
            record.extend(changes);
            Ok(())
        }

        async fn max_ticket_number(&self, _prefix: &str) -> Result<Option<String>, BackendError> {
            if let Some(stale) = &self.stale_max {
                return Ok(Some(stale.clone()));
            }
            Ok(self
                .records
                .lock()
                .unwrap()
                .iter()
                .filter_map(|r| r[&fields::TICKET_NUMBER].as_str().map(str::to_string))
                .max())
        }

        async fn list_records(&self, _query: &RecordQuery) -> Result<Vec<Record>, BackendError> {
            Ok(self.records.lock().unwrap().clone())
        }
    }

    #[tokio::test]
    async fn test_sequential_numbers_from_sqlite() {
        let adapter =
            TicketStoreAdapter::new(Arc::new(SqliteBackend::in_memory().unwrap()), &config());
        let now = Utc::now();
        let first = adapter
            .create_ticket(&draft("one", Priority::Low), Some("a@x.com"), now)
            .await
            .unwrap();
        let second = adapter
            .create_ticket(&draft("two", Priority::High), None, now)
            .await
            .unwrap();
        assert_eq!(first.number.as_str(), "IT-0001");
        assert_eq!(second.number.as_str(), "IT-0002");
        assert_eq!(first.status, TicketStatus::Open);
        assert!(first.due_at >= now);
        assert_eq!(first.submitted_by.as_deref(), Some("a@x.com"));
    }

    #[tokio::test]
    async fn test_concurrent_creates_get_distinct_numbers() {
        let adapter = Arc::new(TicketStoreAdapter::new(
            Arc::new(SqliteBackend::in_memory().unwrap()),
            &config(),
        ));
        let mut handles = Vec::new();
        for i in 0..10 {
            let adapter = adapter.clone();
            handles.push(tokio::spawn(async move {
                adapter
                    .create_ticket(&draft(&format!("t{i}"), Priority::Medium), None, Utc::now())
                    .await
                    .map(|t| t.number)
            }));
        }
        let mut numbers = Vec::new();
        for handle in handles {
            numbers.push(handle.await.unwrap().unwrap());
        }
        numbers.sort();
        numbers.dedup();
        assert_eq!(numbers.len(), 10);
    }

    #[tokio::test]
    async fn test_not_sent_insert_is_retried() {
        let backend = Arc::new(ScriptedBackend::failing_inserts(vec![BackendError::NotSent(
            "connection refused".into(),
        )]));
        let adapter = TicketStoreAdapter::new(backend.clone(), &config());
        let ticket = adapter
            .create_ticket(&draft("VPN down", Priority::Urgent), None, Utc::now())
            .await
            .unwrap();
        assert_eq!(ticket.number.as_str(), "IT-0001");
        assert_eq!(backend.inserts(), 2);
    }

    #[tokio::test]
    async fn test_ambiguous_insert_is_not_retried() {
        let backend = Arc::new(ScriptedBackend::failing_inserts(vec![BackendError::Ambiguous(
            "connection reset after send".into(),
        )]));
        let adapter = TicketStoreAdapter::new(backend.clone(), &config());
        let err = adapter
            .create_ticket(&draft("VPN down", Priority::Urgent), None, Utc::now())
            .await
            .unwrap_err();
        match err {
            StoreError::AmbiguousCreate { number, .. } => {
                assert_eq!(number.map(|n| n.to_string()).as_deref(), Some("IT-0001"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(backend.inserts(), 1);
    }

    #[tokio::test]
    async fn test_insert_timeout_is_ambiguous() {
        let backend = Arc::new(ScriptedBackend {
            insert_delay: Some(Duration::from_secs(5)),
            ..ScriptedBackend::default()
        });
        let adapter = TicketStoreAdapter::new(backend.clone(), &config());
        let err = adapter
            .create_ticket(&draft("slow", Priority::Low), None, Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::AmbiguousCreate { .. }));
        assert_eq!(backend.inserts(), 1);
    }

    #[tokio::test]
    async fn test_unreadable_stored_record_keeps_proposed_number() {
        let backend = Arc::new(ScriptedBackend {
            garble_stored: true,
            ..ScriptedBackend::default()
        });
        let adapter = TicketStoreAdapter::new(backend.clone(), &config());
        let err = adapter
            .create_ticket(&draft("VPN down", Priority::High), None, Utc::now())
            .await
            .unwrap_err();
        match err {
            StoreError::AmbiguousCreate { number, .. } => {
                assert_eq!(number.map(|n| n.to_string()).as_deref(), Some("IT-0001"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(backend.inserts(), 1);
    }

    #[tokio::test]
    async fn test_locked_database_respects_request_timeout() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tickets.db");
        let backend = Arc::new(SqliteBackend::open(&path).unwrap());
        let locker = rusqlite::Connection::open(&path).unwrap();
        locker.execute_batch("BEGIN EXCLUSIVE").unwrap();

        let mut impatient = config();
        impatient.store.create_attempts = 1;
        let adapter = TicketStoreAdapter::new(backend.clone(), &impatient);
        let started = std::time::Instant::now();
        let err = adapter
            .create_ticket(&draft("locked", Priority::Low), None, Utc::now())
            .await
            .unwrap_err();
        let elapsed = started.elapsed();
        assert!(elapsed < Duration::from_secs(2), "waited {elapsed:?}");
        assert!(matches!(
            err,
            StoreError::Unavailable(_) | StoreError::AmbiguousCreate { .. }
        ));

        locker.execute_batch("COMMIT").unwrap();
        let mut patient = config();
        patient.store.request_timeout_ms = 10_000;
        let adapter = TicketStoreAdapter::new(backend, &patient);
        let ticket = adapter
            .create_ticket(&draft("unlocked", Priority::Low), None, Utc::now())
            .await
            .unwrap();
        assert_eq!(ticket.number.as_str(), "IT-0001");
    }

    #[tokio::test]
    async fn test_exhausted_not_sent_is_unavailable() {
        let backend = Arc::new(ScriptedBackend::failing_inserts(
            (0..3).map(|_| BackendError::NotSent("down".into())).collect(),
        ));
        let adapter = TicketStoreAdapter::new(backend.clone(), &config());
        let err = adapter
            .create_ticket(&draft("x", Priority::Low), None, Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Unavailable(_)));
        assert_eq!(backend.inserts(), 3);
    }

    #[tokio::test]
    async fn test_allocation_exhaustion() {
        let backend = Arc::new(ScriptedBackend {
            stale_max: Some("IT-0001".to_string()),
            ..ScriptedBackend::default()
        });
        let adapter = TicketStoreAdapter::new(backend.clone(), &config());
        adapter
            .create_ticket(&draft("first", Priority::Low), None, Utc::now())
            .await
            .unwrap();

        let err = adapter
            .create_ticket(&draft("second", Priority::Low), None, Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::AllocationExhausted(5)));
        assert_eq!(backend.inserts(), 6);
    }

    #[tokio::test]
    async fn test_reads_retry_transient_failures() {
        let backend = Arc::new(ScriptedBackend::default());
        let adapter = TicketStoreAdapter::new(backend.clone(), &config());
        let ticket = adapter
            .create_ticket(&draft("x", Priority::Low), None, Utc::now())
            .await
            .unwrap();

        backend
            .find_failures
            .lock()
            .unwrap()
            .push_back(BackendError::Ambiguous("timeout".into()));
        let found = adapter.get_ticket(&ticket.number).await.unwrap();
        assert_eq!(found.number, ticket.number);

        let missing = TicketNumber::from_sequence("IT", 99);
        assert!(matches!(
            adapter.get_ticket(&missing).await,
            Err(StoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_resolve_then_statistics() {
        let adapter =
            TicketStoreAdapter::new(Arc::new(SqliteBackend::in_memory().unwrap()), &config());
        let now = Utc::now();
        let urgent = adapter
            .create_ticket(&draft("down", Priority::Urgent), Some("a@x.com"), now)
            .await
            .unwrap();
        adapter
            .create_ticket(&draft("slow", Priority::Low), Some("a@x.com"), now)
            .await
            .unwrap();

        let resolved = adapter
            .update_ticket(
                &urgent.number,
                &TicketPatch::resolve(Resolution {
                    text: "Restarted the gateway".to_string(),
                    resolved_at: now,
                    time_spent_hours: Some(0.25),
                }),
            )
            .await
            .unwrap();
        assert_eq!(resolved.status, TicketStatus::Resolved);
        assert!(resolved.check_invariants().is_ok());

        let stats = adapter.statistics(now).await.unwrap();
        assert_eq!(stats.total_open, 1);
        assert_eq!(stats.resolved_today, 1);
        assert_eq!(stats.open_by_priority[&Priority::Low], 1);
        assert_eq!(stats.open_by_priority[&Priority::Urgent], 0);
        assert_eq!(stats.open_by_category["VPN Access"], 1);

        let mine = adapter.tickets_for_submitter("a@x.com").await.unwrap();
        assert_eq!(mine.len(), 2);
    }

    #[tokio::test]
    async fn test_update_missing_ticket() {
        let adapter =
            TicketStoreAdapter::new(Arc::new(SqliteBackend::in_memory().unwrap()), &config());
        let number = TicketNumber::from_sequence("IT", 7);
        let err = adapter
            .update_ticket(&number, &TicketPatch::close())
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound(n) if n == number));
    }
}
