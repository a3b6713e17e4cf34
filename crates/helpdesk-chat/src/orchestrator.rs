//! Routes each inbound message to an answer, a ticket-flow step or a command.
//!
//! One message is handled at a time per session: the session's async mutex
//! is held for the whole turn, including model and store calls. Messages for
//! different sessions never wait on each other.

use crate::commands::{parse_command, Command, CommandError};
use crate::message::{InboundMessage, OutboundResponse, Transport, TransportError};
use crate::render;
use crate::session::{Clock, Mode, Session, SessionKey, SessionStore, SystemClock};
use chrono::{DateTime, Utc};
use helpdesk_core::{
    AnswerSource, Config, FieldValue, FlowError, FlowEvent, Resolution, TicketDraft, TicketField,
    TicketFields, TicketFlow, TicketNumber,
};
use helpdesk_store::{StoreError, TicketBackend, TicketPatch, TicketStoreAdapter};
use helpdesk_synth::{ModelClient, ResponseSynthesizer};
use helpdesk_telemetry::{Journal, Paths, ReconcileRecord, Route, TurnRecord};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Where turn telemetry and reconciliation entries are written
pub struct Journals {
    pub turns: Journal,
    pub reconcile: Journal,
}

impl Journals {
    pub fn at(paths: &Paths) -> Self {
        Self {
            turns: Journal::new(paths.turns_file()),
            reconcile: Journal::new(paths.reconcile_file()),
        }
    }
}

/// Outcome of one handled message
struct Turn {
    route: Route,
    response: OutboundResponse,
    knowledge_entry: Option<String>,
    ticket_number: Option<TicketNumber>,
}

impl Turn {
    fn new(route: Route, response: OutboundResponse) -> Self {
        Self {
            route,
            response,
            knowledge_entry: None,
            ticket_number: None,
        }
    }

    fn with_ticket(mut self, number: &TicketNumber) -> Self {
        self.ticket_number = Some(number.clone());
        self
    }
}

/// Message text plus the names of any attachments
fn describe(message: &InboundMessage) -> String {
    let text = message.text.trim();
    if message.attachments.is_empty() {
        return text.to_string();
    }
    let names: Vec<&str> = message.attachments.iter().map(|a| a.name.as_str()).collect();
    format!("{text}\n\nAttachments: {}", names.join(", "))
}

pub struct Orchestrator {
    config: Arc<Config>,
    synthesizer: ResponseSynthesizer,
    store: Arc<TicketStoreAdapter>,
    sessions: SessionStore,
    clock: Arc<dyn Clock>,
    journals: Option<Journals>,
    /// Reaches conversations other than the one being handled
    notifier: Option<Arc<dyn Transport>>,
}

impl Orchestrator {
    pub fn new(
        config: Arc<Config>,
        model: Arc<dyn ModelClient>,
        backend: Arc<dyn TicketBackend>,
    ) -> Self {
        let synthesizer = ResponseSynthesizer::new(model, &config);
        let store = Arc::new(TicketStoreAdapter::new(backend, &config));
        Self {
            config,
            synthesizer,
            store,
            sessions: SessionStore::new(),
            clock: Arc::new(SystemClock),
            journals: None,
            notifier: None,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_journals(mut self, journals: Journals) -> Self {
        self.journals = Some(journals);
        self
    }

    /// Send IT-channel and submitter notifications through `transport`
    pub fn with_notifier(mut self, transport: Arc<dyn Transport>) -> Self {
        self.notifier = Some(transport);
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> &TicketStoreAdapter {
        &self.store
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// Current mode of a session, if it exists
    pub async fn mode(&self, key: &SessionKey) -> Option<Mode> {
        let session = self.sessions.get(key)?;
        let guard = session.lock().await;
        Some(guard.mode.clone())
    }

    /// Handle and send the response. Ignored messages send nothing.
    pub async fn deliver(
        &self,
        message: &InboundMessage,
        transport: &dyn Transport,
    ) -> Result<(), TransportError> {
        let response = self.handle(message).await;
        if response.title.is_empty() && response.body.is_empty() {
            return Ok(());
        }
        transport.send_message(&message.session_id, &response).await
    }

    /// Drop sessions idle for longer than the session timeout
    pub fn prune_expired(&self) -> usize {
        let pruned = self
            .sessions
            .prune(self.clock.now(), self.config.session_timeout());
        if pruned > 0 {
            debug!(pruned, "pruned idle sessions");
        }
        pruned
    }

    pub async fn handle(&self, message: &InboundMessage) -> OutboundResponse {
        let started = Instant::now();
        let key = SessionKey::of(message);
        let entry = self
            .sessions
            .get_or_create(&key, &message.user, self.clock.now());
        let mut session = entry.lock().await;
        let now = self.clock.now();

        let turn = match message.delivery_id.as_deref() {
            Some(id) if session.seen_delivery(id) => {
                debug!(session = %key, delivery = id, "dropping redelivered message");
                Turn::new(Route::Ignored, render::empty_message())
            }
            _ => {
                if !matches!(session.mode, Mode::Idle)
                    && session.is_expired(now, self.config.session_timeout())
                {
                    info!(session = %key, "session timed out, discarding state");
                    session.reset();
                }
                session.user = message.user.clone();
                session.touch(now);
                self.route(&mut session, message, now).await
            }
        };
        drop(session);

        self.record_turn(message, &turn, started.elapsed().as_millis() as u64, now);
        turn.response
    }

    async fn route(
        &self,
        session: &mut Session,
        message: &InboundMessage,
        now: DateTime<Utc>,
    ) -> Turn {
        let text = message.text.trim();
        if text.is_empty() {
            return Turn::new(Route::Ignored, render::empty_message());
        }

        if let Some(parsed) = parse_command(text, &self.config) {
            return match parsed {
                Ok(command) => {
                    debug!(session = %session.key, command = command.name(), "command");
                    self.dispatch(session, message, command, now).await
                }
                Err(CommandError::Unknown(name)) => {
                    Turn::new(Route::Command, render::unknown_command(&name))
                }
                Err(CommandError::Usage(usage)) => Turn::new(Route::Command, render::usage(usage)),
            };
        }

        if matches!(session.mode, Mode::TicketFlow(_)) {
            self.continue_flow(session, message, now).await
        } else {
            self.advise(session, message).await
        }
    }

    async fn advise(&self, session: &mut Session, message: &InboundMessage) -> Turn {
        let text = message.text.trim();
        let matched = self.config.catalog.match_text(text);
        let answer = self
            .synthesizer
            .synthesize(text, matched, self.config.model.timeout())
            .await;

        let route = match answer.source {
            AnswerSource::KnowledgeBase => Route::KnowledgeBase,
            AnswerSource::Generated => Route::Generated,
            AnswerSource::Fallback => Route::Fallback,
        };

        let response = if answer.needs_ticket {
            let seed = TicketFields::new()
                .with(FieldValue::Subject(answer.suggested_subject.clone()))
                .with(FieldValue::Description(describe(message)))
                .with(FieldValue::Category(answer.category.clone()));
            let flow = TicketFlow::begin(seed);
            let next = flow.expected_field();
            session.suggested_priority = Some(answer.suggested_priority);
            session.mode = Mode::TicketFlow(flow);
            debug!(session = %session.key, source = ?answer.source, "answer needs a ticket");
            match next {
                Some(field) => render::answer_with_prompt(
                    &answer,
                    field,
                    session.suggested_priority,
                    &self.config.categories,
                ),
                None => render::answer(&answer),
            }
        } else {
            session.mode = Mode::Answering;
            render::answer(&answer)
        };

        Turn {
            route,
            response,
            knowledge_entry: answer.knowledge_entry,
            ticket_number: None,
        }
    }

    async fn continue_flow(
        &self,
        session: &mut Session,
        message: &InboundMessage,
        now: DateTime<Utc>,
    ) -> Turn {
        let flow = match session.flow() {
            Some(TicketFlow::Collecting(fields)) => TicketFlow::Collecting(fields.clone()),
            Some(TicketFlow::ReadyToSubmit(_)) => {
                return Turn::new(Route::TicketField, render::awaiting_submit())
            }
            _ => {
                session.reset();
                return self.advise(session, message).await;
            }
        };
        let Some(field) = flow.expected_field() else {
            session.reset();
            return self.advise(session, message).await;
        };

        let raw = match field {
            TicketField::Description => describe(message),
            _ => message.text.clone(),
        };
        let clarify = |e: FlowError| {
            debug!(session = %session.key, %field, error = %e, "rejected field value");
            Turn::new(
                Route::TicketField,
                render::clarify(&e, Some(field), session.suggested_priority, &self.config.categories),
            )
        };
        let value = match field.parse(&raw, &self.config.categories) {
            Ok(value) => value,
            Err(e) => return clarify(e),
        };

        match flow.apply(FlowEvent::Provide(value)) {
            Ok(TicketFlow::ReadyToSubmit(draft)) => {
                session.mode = Mode::TicketFlow(TicketFlow::ReadyToSubmit(draft.clone()));
                self.submit(session, message, draft, Route::TicketField, now)
                    .await
            }
            Ok(next) => {
                let field = next.expected_field();
                session.mode = Mode::TicketFlow(next);
                match field {
                    Some(field) => Turn::new(
                        Route::TicketField,
                        render::field_prompt(
                            field,
                            session.suggested_priority,
                            &self.config.categories,
                        ),
                    ),
                    None => Turn::new(Route::TicketField, render::awaiting_submit()),
                }
            }
            Err(e) => clarify(e),
        }
    }

    async fn submit(
        &self,
        session: &mut Session,
        message: &InboundMessage,
        draft: TicketDraft,
        route: Route,
        now: DateTime<Utc>,
    ) -> Turn {
        let submitter = message.user.email.as_deref();
        match self.store.create_ticket(&draft, submitter, now).await {
            Ok(ticket) => {
                let flow = TicketFlow::ReadyToSubmit(draft);
                if let Err(e) = flow.apply(FlowEvent::Submitted(ticket.number.clone())) {
                    warn!(error = %e, "unexpected flow state after submission");
                }
                info!(session = %session.key, number = %ticket.number, "ticket submitted");
                session.reset();
                if let Some(channel) = &self.config.notifications.it_channel {
                    let submitter = match &message.user.email {
                        Some(email) => format!("{} <{email}>", message.user.display_name()),
                        None => message.user.display_name().to_string(),
                    };
                    self.notify(channel, &render::it_new_ticket(&ticket, &submitter))
                        .await;
                }
                Turn::new(route, render::ticket_created(&ticket)).with_ticket(&ticket.number)
            }
            Err(StoreError::AmbiguousCreate { number, reason }) => {
                error!(
                    session = %session.key,
                    number = ?number,
                    %reason,
                    "ticket creation outcome unknown, needs reconciliation"
                );
                self.record_reconcile(message, number.as_ref(), &draft.subject, &reason, now);
                session.reset();
                let turn = Turn::new(route, render::ambiguous_create(number.as_ref()));
                match &number {
                    Some(n) => turn.with_ticket(n),
                    None => turn,
                }
            }
            Err(e) => {
                warn!(session = %session.key, error = %e, "ticket store unavailable, draft kept");
                Turn::new(route, render::store_unavailable())
            }
        }
    }

    async fn dispatch(
        &self,
        session: &mut Session,
        message: &InboundMessage,
        command: Command,
        now: DateTime<Utc>,
    ) -> Turn {
        if command.requires_elevation() && !self.config.is_elevated(message.role.as_deref()) {
            warn!(
                session = %session.key,
                command = command.name(),
                role = ?message.role,
                "command refused for role"
            );
            return Turn::new(Route::Command, render::forbidden(command.name()));
        }

        match command {
            Command::Help => Turn::new(Route::Command, render::help(&self.config.commands)),
            Command::Ticket => {
                session.reset();
                let flow = TicketFlow::begin(TicketFields::new());
                let field = flow.expected_field().unwrap_or(TicketField::Subject);
                session.mode = Mode::TicketFlow(flow);
                Turn::new(
                    Route::Command,
                    render::ticket_started(field, None, &self.config.categories),
                )
            }
            Command::Submit => match session.flow() {
                Some(TicketFlow::ReadyToSubmit(draft)) => {
                    let draft = draft.clone();
                    self.submit(session, message, draft, Route::Command, now)
                        .await
                }
                Some(flow @ TicketFlow::Collecting(_)) => {
                    let field = flow.expected_field().unwrap_or(TicketField::Subject);
                    Turn::new(
                        Route::Command,
                        render::still_collecting(field, &self.config.categories),
                    )
                }
                _ => Turn::new(Route::Command, render::nothing_to_submit()),
            },
            Command::Cancel => match session.flow().cloned().map(|f| f.apply(FlowEvent::Cancel)) {
                Some(Ok(_)) => {
                    info!(session = %session.key, "ticket flow cancelled");
                    session.reset();
                    Turn::new(Route::Command, render::cancelled())
                }
                _ => Turn::new(Route::Command, render::nothing_to_cancel()),
            },
            Command::Status(Some(number)) => match self.store.get_ticket(&number).await {
                Ok(ticket) => Turn::new(Route::Command, render::ticket_status(&ticket))
                    .with_ticket(&ticket.number),
                Err(e) => Turn::new(Route::Command, self.lookup_failed(e)),
            },
            Command::Status(None) => {
                let Some(email) = message.user.email.as_deref() else {
                    return Turn::new(Route::Command, render::no_email());
                };
                match self.store.tickets_for_submitter(email).await {
                    Ok(tickets) => Turn::new(Route::Command, render::ticket_list(&tickets)),
                    Err(e) => Turn::new(Route::Command, self.lookup_failed(e)),
                }
            }
            Command::Resolve {
                number,
                time_spent_hours,
                text,
            } => {
                let resolver = session.user.display_name().to_string();
                let event = FlowEvent::Resolve {
                    resolution: text.clone(),
                    time_spent_hours,
                };
                let patch = TicketPatch::resolve(Resolution {
                    text: format!("{text}\n\nResolved by: {resolver}"),
                    resolved_at: now,
                    time_spent_hours,
                });
                self.transition(&number, event, &patch).await
            }
            Command::Close(number) => {
                self.transition(&number, FlowEvent::Close, &TicketPatch::close())
                    .await
            }
            Command::Stats => match self.store.statistics(now).await {
                Ok(stats) => Turn::new(Route::Command, render::stats(&stats)),
                Err(e) => Turn::new(Route::Command, self.lookup_failed(e)),
            },
        }
    }

    /// Check a stored ticket can take `event`, then write `patch`
    async fn transition(&self, number: &TicketNumber, event: FlowEvent, patch: &TicketPatch) -> Turn {
        let ticket = match self.store.get_ticket(number).await {
            Ok(ticket) => ticket,
            Err(e) => return Turn::new(Route::Command, self.lookup_failed(e)),
        };
        let closing = matches!(event, FlowEvent::Close);
        if let Err(e) = TicketFlow::for_stored(ticket.number.clone(), ticket.status).apply(event) {
            debug!(number = %number, error = %e, "rejected ticket transition");
            return Turn::new(
                Route::Command,
                render::clarify(&e, None, None, &self.config.categories),
            )
            .with_ticket(number);
        }
        match self.store.update_ticket(number, patch).await {
            Ok(updated) => {
                if closing && self.config.notifications.notify_submitter_on_close {
                    match updated.submitted_by.as_deref() {
                        Some(email) => {
                            self.notify(email, &render::ticket_closed_notice(&updated))
                                .await
                        }
                        None => debug!(number = %number, "closed ticket has no submitter to notify"),
                    }
                }
                Turn::new(Route::Command, render::ticket_updated(&updated)).with_ticket(number)
            }
            Err(e) => Turn::new(Route::Command, self.lookup_failed(e)),
        }
    }

    /// Send a message outside the current conversation. Failures are logged
    /// and never affect the turn.
    async fn notify(&self, recipient: &str, response: &OutboundResponse) {
        let Some(notifier) = &self.notifier else {
            return;
        };
        let limit = self.config.notifications.timeout();
        match tokio::time::timeout(limit, notifier.send_message(recipient, response)).await {
            Ok(Ok(())) => debug!(recipient, title = %response.title, "notification sent"),
            Ok(Err(e)) => warn!(recipient, error = %e, "notification failed"),
            Err(_) => warn!(recipient, ?limit, "notification timed out"),
        }
    }

    fn lookup_failed(&self, error: StoreError) -> OutboundResponse {
        match error {
            StoreError::NotFound(number) => render::not_found(&number),
            other => {
                warn!(error = %other, "ticket store request failed");
                render::lookup_unavailable()
            }
        }
    }

    fn record_turn(&self, message: &InboundMessage, turn: &Turn, latency_ms: u64, now: DateTime<Utc>) {
        let Some(journals) = &self.journals else {
            return;
        };
        let record = TurnRecord {
            session_id: message.session_id.clone(),
            user_id: message.user.id.clone(),
            timestamp: now,
            route: turn.route,
            knowledge_entry: turn.knowledge_entry.clone(),
            ticket_number: turn.ticket_number.as_ref().map(|n| n.to_string()),
            latency_ms,
        };
        if let Err(e) = journals.turns.append(&record) {
            warn!(error = %e, path = %journals.turns.path().display(), "failed to write turn record");
        }
    }

    fn record_reconcile(
        &self,
        message: &InboundMessage,
        number: Option<&TicketNumber>,
        subject: &str,
        reason: &str,
        now: DateTime<Utc>,
    ) {
        let Some(journals) = &self.journals else {
            return;
        };
        let record = ReconcileRecord {
            timestamp: now,
            session_id: message.session_id.clone(),
            user_id: message.user.id.clone(),
            proposed_number: number.map(|n| n.to_string()),
            subject: subject.to_string(),
            reason: reason.to_string(),
        };
        if let Err(e) = journals.reconcile.append(&record) {
            error!(error = %e, "failed to write reconcile record");
        }
    }
}
