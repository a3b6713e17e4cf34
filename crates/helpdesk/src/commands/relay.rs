//! Line-delimited JSON bridge for a chat platform.
//!
//! Each stdin line is an `InboundMessage`; each reply is written to stdout as
//! one `{"session_id": .., "response": ..}` line. Notifications use the same
//! shape, addressed to the IT channel or to the submitter's email. Messages
//! are handled concurrently, so replies for different sessions may arrive out
//! of order.

use async_trait::async_trait;
use helpdesk_chat::{InboundMessage, OutboundResponse, Transport, TransportError};
use serde::Serialize;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::Mutex;
use tokio::task::JoinSet;
use tracing::{info, warn};

#[derive(Serialize)]
struct RelayOutput<'a> {
    session_id: &'a str,
    response: &'a OutboundResponse,
}

/// Writes one JSON line per response
struct JsonLinesTransport<W> {
    out: Mutex<W>,
}

impl<W: AsyncWrite + Unpin + Send> JsonLinesTransport<W> {
    fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }
}

#[async_trait]
impl<W: AsyncWrite + Unpin + Send> Transport for JsonLinesTransport<W> {
    async fn send_message(
        &self,
        session_id: &str,
        response: &OutboundResponse,
    ) -> Result<(), TransportError> {
        let mut line = serde_json::to_vec(&RelayOutput {
            session_id,
            response,
        })?;
        line.push(b'\n');

        let mut out = self.out.lock().await;
        out.write_all(&line).await?;
        out.flush().await?;
        Ok(())
    }
}

fn parse_line(line: &str) -> Option<InboundMessage> {
    if line.trim().is_empty() {
        return None;
    }
    match serde_json::from_str(line) {
        Ok(message) => Some(message),
        Err(e) => {
            warn!(error = %e, "skipping malformed relay message");
            None
        }
    }
}

pub async fn run() -> anyhow::Result<()> {
    let transport = Arc::new(JsonLinesTransport::new(tokio::io::stdout()));
    let orchestrator = Arc::new(super::build_orchestrator()?.with_notifier(transport.clone()));
    info!("relay ready");

    let mut tasks = JoinSet::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let Some(message) = parse_line(&line) else {
            continue;
        };
        let task_orchestrator = Arc::clone(&orchestrator);
        let transport = Arc::clone(&transport);
        tasks.spawn(async move {
            if let Err(e) = task_orchestrator.deliver(&message, transport.as_ref()).await {
                warn!(session = %message.session_id, error = %e, "failed to deliver response");
            }
        });
        orchestrator.prune_expired();
    }

    while let Some(joined) = tasks.join_next().await {
        joined?;
    }
    Ok(())
}
