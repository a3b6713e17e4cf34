use async_trait::async_trait;
use helpdesk_chat::{InboundMessage, OutboundResponse, Transport, TransportError, UserIdentity};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

const SESSION_ID: &str = "terminal";

/// Prints responses to the terminal
struct ConsoleTransport;

fn format_response(response: &OutboundResponse) -> String {
    let mut out = format!("== {} ==\n{}", response.title, response.body);
    if !response.actions.is_empty() {
        let choices: Vec<String> = response
            .actions
            .iter()
            .map(|a| {
                if a.label == a.value {
                    format!("[{}]", a.label)
                } else {
                    format!("[{} -> {}]", a.label, a.value)
                }
            })
            .collect();
        out.push('\n');
        out.push_str(&choices.join(" "));
    }
    out
}

#[async_trait]
impl Transport for ConsoleTransport {
    async fn send_message(
        &self,
        session_id: &str,
        response: &OutboundResponse,
    ) -> Result<(), TransportError> {
        if session_id == SESSION_ID {
            println!("{}\n", format_response(response));
        } else {
            println!("[to {session_id}]\n{}\n", format_response(response));
        }
        Ok(())
    }
}

pub async fn run(user: &str, role: Option<&str>, email: Option<&str>) -> anyhow::Result<()> {
    let orchestrator = super::build_orchestrator()?.with_notifier(Arc::new(ConsoleTransport));
    let identity = UserIdentity {
        id: user.to_string(),
        name: None,
        email: email.map(str::to_string),
    };

    println!("helpdesk chat as {user}. Describe your problem, /help for commands, Ctrl-D to quit.\n");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let message = InboundMessage {
            session_id: SESSION_ID.to_string(),
            user: identity.clone(),
            text: line,
            attachments: Vec::new(),
            role: role.map(str::to_string),
            delivery_id: None,
        };
        orchestrator.deliver(&message, &ConsoleTransport).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use helpdesk_chat::Action;

    #[test]
    fn test_format_response_shows_actions() {
        let response = OutboundResponse {
            title: "New ticket".to_string(),
            body: "How urgent is this?".to_string(),
            actions: vec![Action::new("High", "High"), Action::new("Cancel", "/cancel")],
        };
        let text = format_response(&response);
        assert!(text.starts_with("== New ticket =="));
        assert!(text.ends_with("[High] [Cancel -> /cancel]"));
    }
}
