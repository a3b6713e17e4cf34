//! Response builders. Every user-facing string lives here.

use crate::message::{Action, OutboundResponse};
use helpdesk_core::{
    AnswerResult, AnswerSource, CategorySet, FlowError, Priority, Ticket, TicketField,
    TicketNumber,
};
use helpdesk_store::TicketStats;

fn response(title: impl Into<String>, body: impl Into<String>) -> OutboundResponse {
    OutboundResponse {
        title: title.into(),
        body: body.into(),
        actions: Vec::new(),
    }
}

fn with_actions(mut response: OutboundResponse, actions: Vec<Action>) -> OutboundResponse {
    response.actions = actions;
    response
}

fn cancel_action() -> Action {
    Action::new("Cancel", "/cancel")
}

fn answer_title(answer: &AnswerResult) -> &'static str {
    match answer.source {
        AnswerSource::KnowledgeBase => "Here's a known fix",
        AnswerSource::Generated => "Suggested solution",
        AnswerSource::Fallback => "Let's open a ticket",
    }
}

pub fn answer(answer: &AnswerResult) -> OutboundResponse {
    with_actions(
        response(answer_title(answer), answer.solution.clone()),
        vec![Action::new("Still need help", "/ticket")],
    )
}

/// The answer followed by the first ticket question
pub fn answer_with_prompt(
    answer: &AnswerResult,
    field: TicketField,
    suggested: Option<Priority>,
    categories: &CategorySet,
) -> OutboundResponse {
    let prompt = field_prompt(field, suggested, categories);
    with_actions(
        response(
            answer_title(answer),
            format!(
                "{}\n\nI'll open a ticket for this.\n{}",
                answer.solution, prompt.body
            ),
        ),
        prompt.actions,
    )
}

/// Priority choices, the suggested one first
fn priority_actions(suggested: Option<Priority>) -> Vec<Action> {
    let mut actions = Vec::new();
    if let Some(p) = suggested {
        actions.push(Action::new(format!("{p} (suggested)"), p.as_str()));
    }
    actions.extend(
        Priority::ALL
            .into_iter()
            .filter(|p| Some(*p) != suggested)
            .map(|p| Action::new(p.as_str(), p.as_str())),
    );
    actions
}

pub fn field_prompt(
    field: TicketField,
    suggested: Option<Priority>,
    categories: &CategorySet,
) -> OutboundResponse {
    let mut actions = match field {
        TicketField::Priority => priority_actions(suggested),
        TicketField::Category => categories
            .names()
            .iter()
            .map(|name| Action::new(name.as_str(), name.as_str()))
            .collect(),
        TicketField::Subject | TicketField::Description => Vec::new(),
    };
    actions.push(cancel_action());
    with_actions(response("New ticket", field.prompt()), actions)
}

pub fn ticket_started(
    field: TicketField,
    suggested: Option<Priority>,
    categories: &CategorySet,
) -> OutboundResponse {
    let prompt = field_prompt(field, suggested, categories);
    with_actions(
        response(
            "New ticket",
            format!("Let's open a ticket.\n{}", prompt.body),
        ),
        prompt.actions,
    )
}

/// Invalid input during the ticket flow, followed by the same question again
pub fn clarify(
    error: &FlowError,
    field: Option<TicketField>,
    suggested: Option<Priority>,
    categories: &CategorySet,
) -> OutboundResponse {
    match field {
        Some(field) => {
            let prompt = field_prompt(field, suggested, categories);
            with_actions(
                response(
                    "Please check that",
                    format!("Sorry, {error}.\n{}", prompt.body),
                ),
                prompt.actions,
            )
        }
        None => response("Please check that", format!("Sorry, {error}.")),
    }
}

pub fn ticket_created(ticket: &Ticket) -> OutboundResponse {
    response(
        format!("Ticket {} created", ticket.number),
        format!(
            "Subject: {}\nPriority: {}\nCategory: {}\nDue: {}\n\nUse /status {} to check on it.",
            ticket.subject,
            ticket.priority,
            ticket.category,
            ticket.due_at.format("%Y-%m-%d %H:%M UTC"),
            ticket.number
        ),
    )
}

pub fn ticket_status(ticket: &Ticket) -> OutboundResponse {
    let mut body = format!(
        "Subject: {}\nStatus: {}\nPriority: {}\nCategory: {}\nSubmitted: {}\nDue: {}",
        ticket.subject,
        ticket.status,
        ticket.priority,
        ticket.category,
        ticket.submitted_at.format("%Y-%m-%d %H:%M UTC"),
        ticket.due_at.format("%Y-%m-%d %H:%M UTC"),
    );
    if let Some(resolution) = &ticket.resolution {
        body.push_str(&format!("\nResolution: {}", resolution.text));
    }
    response(format!("{} is {}", ticket.number, ticket.status), body)
}

pub fn ticket_list(tickets: &[Ticket]) -> OutboundResponse {
    if tickets.is_empty() {
        return response("Your tickets", "You have no open or recent tickets.");
    }
    let lines: Vec<String> = tickets
        .iter()
        .map(|t| format!("{} [{}] {}", t.number, t.status, t.subject))
        .collect();
    response("Your tickets", lines.join("\n"))
}

pub fn ticket_updated(ticket: &Ticket) -> OutboundResponse {
    response(
        format!("{} is now {}", ticket.number, ticket.status),
        ticket.subject.clone(),
    )
}

/// Posted to the IT channel when a ticket is opened
pub fn it_new_ticket(ticket: &Ticket, submitter: &str) -> OutboundResponse {
    with_actions(
        response(
            format!("New ticket {}", ticket.number),
            format!(
                "Subject: {}\nPriority: {}\nCategory: {}\nSubmitted by: {}\nDue: {}\n\n{}",
                ticket.subject,
                ticket.priority,
                ticket.category,
                submitter,
                ticket.due_at.format("%Y-%m-%d %H:%M UTC"),
                ticket.description
            ),
        ),
        vec![Action::new("Status", format!("/status {}", ticket.number))],
    )
}

/// Sent to the submitter once their ticket is closed
pub fn ticket_closed_notice(ticket: &Ticket) -> OutboundResponse {
    let resolution = ticket
        .resolution
        .as_ref()
        .map(|r| r.text.as_str())
        .unwrap_or("No resolution details provided.");
    with_actions(
        response(
            format!("Ticket {} closed", ticket.number),
            format!(
                "Your ticket has been resolved.\n\nSubject: {}\nCategory: {}\nPriority: {}\nResolution: {}",
                ticket.subject, ticket.category, ticket.priority, resolution
            ),
        ),
        vec![Action::new("Still broken? Open a ticket", "/ticket")],
    )
}

pub fn stats(stats: &TicketStats) -> OutboundResponse {
    let mut body = format!(
        "Open: {}\nResolved today: {}\nOverdue: {}\n\nOpen by priority:",
        stats.total_open, stats.resolved_today, stats.overdue
    );
    for (priority, count) in &stats.open_by_priority {
        body.push_str(&format!("\n  {priority}: {count}"));
    }
    if !stats.open_by_category.is_empty() {
        body.push_str("\n\nOpen by category:");
        for (category, count) in &stats.open_by_category {
            body.push_str(&format!("\n  {category}: {count}"));
        }
    }
    response("Helpdesk statistics", body)
}

pub fn help(commands: &[String]) -> OutboundResponse {
    let describe = |cmd: &str| match cmd {
        "/help" => "show this message",
        "/ticket" => "open a new ticket",
        "/status" => "show a ticket, or list yours",
        "/submit" => "submit the ticket being prepared",
        "/cancel" => "abandon the ticket being prepared",
        "/resolve" => "resolve a ticket (IT staff)",
        "/close" => "close a resolved ticket (IT staff)",
        "/stats" => "ticket statistics (IT staff)",
        _ => "",
    };
    let lines: Vec<String> = commands
        .iter()
        .map(|c| match describe(c.as_str()) {
            "" => c.clone(),
            what => format!("{c} - {what}"),
        })
        .collect();
    response(
        "How I can help",
        format!(
            "Describe your problem and I'll suggest a fix or open a ticket.\n\n{}",
            lines.join("\n")
        ),
    )
}

pub fn store_unavailable() -> OutboundResponse {
    with_actions(
        response(
            "Ticket system unavailable",
            "I couldn't reach the ticket system. Your details are kept; try again with /submit.",
        ),
        vec![Action::new("Try again", "/submit"), cancel_action()],
    )
}

/// Creation may have happened; the user must not resubmit blindly
pub fn ambiguous_create(number: Option<&TicketNumber>) -> OutboundResponse {
    let reference = number
        .map(|n| format!(" (reference {n})"))
        .unwrap_or_default();
    response(
        "Ticket status unknown",
        format!(
            "The ticket system did not confirm your ticket{reference}. It may have been created. \
             IT has been notified and will follow up, so please don't submit it again."
        ),
    )
}

pub fn lookup_unavailable() -> OutboundResponse {
    response(
        "Ticket system unavailable",
        "I couldn't reach the ticket system. Please try again in a moment.",
    )
}

pub fn not_found(number: &TicketNumber) -> OutboundResponse {
    response("Not found", format!("I couldn't find ticket {number}."))
}

pub fn forbidden(command: &str) -> OutboundResponse {
    response(
        "Not allowed",
        format!("{command} is only available to IT staff."),
    )
}

pub fn cancelled() -> OutboundResponse {
    response("Cancelled", "The ticket was discarded.")
}

pub fn nothing_to_submit() -> OutboundResponse {
    with_actions(
        response("Nothing to submit", "There is no ticket in progress."),
        vec![Action::new("New ticket", "/ticket")],
    )
}

pub fn nothing_to_cancel() -> OutboundResponse {
    response("Nothing to cancel", "There is no ticket in progress.")
}

pub fn still_collecting(field: TicketField, categories: &CategorySet) -> OutboundResponse {
    let prompt = field_prompt(field, None, categories);
    with_actions(
        response(
            "Not ready yet",
            format!("The ticket still needs a {field}.\n{}", prompt.body),
        ),
        prompt.actions,
    )
}

pub fn awaiting_submit() -> OutboundResponse {
    with_actions(
        response(
            "Ticket ready",
            "Your ticket has all its details. Send /submit to file it or /cancel to discard it.",
        ),
        vec![Action::new("Submit", "/submit"), cancel_action()],
    )
}

pub fn unknown_command(name: &str) -> OutboundResponse {
    response(
        "Unknown command",
        format!("I don't know {name}. Try /help."),
    )
}

pub fn usage(usage: &str) -> OutboundResponse {
    response("Usage", usage.to_string())
}

pub fn no_email() -> OutboundResponse {
    response(
        "Your tickets",
        "I don't know your email address, so I can't look up your tickets. Try /status <ticket number>.",
    )
}

pub fn empty_message() -> OutboundResponse {
    response("", "")
}
