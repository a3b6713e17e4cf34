//! Ticket lifecycle state machine.
//!
//! Transitions are a pure function of the current state and an event. The
//! machine never talks to the store: the orchestrator performs the create
//! call and feeds the resulting number back in as [`FlowEvent::Submitted`].

use crate::error::FlowError;
use crate::types::{Category, CategorySet, Priority, TicketDraft, TicketNumber, TicketStatus};
use std::fmt;

/// A field collected during ticket creation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TicketField {
    Subject,
    Description,
    Priority,
    Category,
}

impl TicketField {
    /// Order in which missing fields are asked for
    pub const ORDER: [TicketField; 4] = [
        TicketField::Subject,
        TicketField::Description,
        TicketField::Priority,
        TicketField::Category,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            TicketField::Subject => "subject",
            TicketField::Description => "description",
            TicketField::Priority => "priority",
            TicketField::Category => "category",
        }
    }

    pub fn prompt(&self) -> &'static str {
        match self {
            TicketField::Subject => "What is a short subject for this ticket?",
            TicketField::Description => "Please describe the problem in a bit more detail.",
            TicketField::Priority => "How urgent is this? (Low, Medium, High or Urgent)",
            TicketField::Category => "Which category fits best?",
        }
    }

    /// Parse raw user text as a value for this field
    pub fn parse(&self, raw: &str, categories: &CategorySet) -> Result<FieldValue, FlowError> {
        let value = raw.trim();
        if value.is_empty() {
            return Err(FlowError::InvalidField {
                field: self.label(),
                reason: "value is empty".to_string(),
            });
        }

        match self {
            TicketField::Subject => Ok(FieldValue::Subject(value.to_string())),
            TicketField::Description => Ok(FieldValue::Description(value.to_string())),
            TicketField::Priority => Priority::parse(value).map(FieldValue::Priority).ok_or_else(
                || FlowError::InvalidField {
                    field: self.label(),
                    reason: format!("'{value}' is not one of Low, Medium, High, Urgent"),
                },
            ),
            TicketField::Category => categories
                .resolve(value)
                .map(FieldValue::Category)
                .ok_or_else(|| FlowError::InvalidField {
                    field: self.label(),
                    reason: format!(
                        "'{value}' is not a known category ({})",
                        categories.names().join(", ")
                    ),
                }),
        }
    }
}

impl fmt::Display for TicketField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A parsed field value
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Subject(String),
    Description(String),
    Priority(Priority),
    Category(Category),
}

impl FieldValue {
    pub fn field(&self) -> TicketField {
        match self {
            FieldValue::Subject(_) => TicketField::Subject,
            FieldValue::Description(_) => TicketField::Description,
            FieldValue::Priority(_) => TicketField::Priority,
            FieldValue::Category(_) => TicketField::Category,
        }
    }
}

/// Partially collected ticket fields
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TicketFields {
    pub subject: Option<String>,
    pub description: Option<String>,
    pub priority: Option<Priority>,
    pub category: Option<Category>,
}

impl TicketFields {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a field, replacing any earlier value
    pub fn set(&mut self, value: FieldValue) {
        match value {
            FieldValue::Subject(s) => self.subject = Some(s),
            FieldValue::Description(d) => self.description = Some(d),
            FieldValue::Priority(p) => self.priority = Some(p),
            FieldValue::Category(c) => self.category = Some(c),
        }
    }

    pub fn with(mut self, value: FieldValue) -> Self {
        self.set(value);
        self
    }

    pub fn has(&self, field: TicketField) -> bool {
        match field {
            TicketField::Subject => self.subject.is_some(),
            TicketField::Description => self.description.is_some(),
            TicketField::Priority => self.priority.is_some(),
            TicketField::Category => self.category.is_some(),
        }
    }

    pub fn next_missing(&self) -> Option<TicketField> {
        TicketField::ORDER.into_iter().find(|f| !self.has(*f))
    }

    /// All four fields as a draft, or `None` while anything is missing
    pub fn complete(&self) -> Option<TicketDraft> {
        Some(TicketDraft {
            subject: self.subject.clone()?,
            description: self.description.clone()?,
            priority: self.priority?,
            category: self.category.clone()?,
        })
    }
}

/// Inputs to the state machine
#[derive(Debug, Clone, PartialEq)]
pub enum FlowEvent {
    Provide(FieldValue),
    Submitted(TicketNumber),
    Resolve {
        resolution: String,
        time_spent_hours: Option<f64>,
    },
    Close,
    Cancel,
}

impl FlowEvent {
    fn action(&self) -> &'static str {
        match self {
            FlowEvent::Provide(_) => "edit",
            FlowEvent::Submitted(_) => "submit",
            FlowEvent::Resolve { .. } => "resolve",
            FlowEvent::Close => "close",
            FlowEvent::Cancel => "cancel",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TicketFlow {
    Collecting(TicketFields),
    ReadyToSubmit(TicketDraft),
    Submitted(TicketNumber),
    Resolved(TicketNumber),
    Closed(TicketNumber),
    Cancelled,
}

impl TicketFlow {
    /// Start a flow from seed fields. A complete seed is immediately ready.
    pub fn begin(seed: TicketFields) -> Self {
        match seed.complete() {
            Some(draft) => TicketFlow::ReadyToSubmit(draft),
            None => TicketFlow::Collecting(seed),
        }
    }

    /// Map a ticket already in the store back onto the machine
    pub fn for_stored(number: TicketNumber, status: TicketStatus) -> Self {
        match status {
            TicketStatus::Open | TicketStatus::InProgress => TicketFlow::Submitted(number),
            TicketStatus::Resolved => TicketFlow::Resolved(number),
            TicketStatus::Closed => TicketFlow::Closed(number),
        }
    }

    pub fn apply(self, event: FlowEvent) -> Result<TicketFlow, FlowError> {
        let state = self.name();
        let action = event.action();

        match (self, event) {
            (TicketFlow::Collecting(mut fields), FlowEvent::Provide(value)) => {
                fields.set(value);
                Ok(TicketFlow::begin(fields))
            }
            (TicketFlow::ReadyToSubmit(_), FlowEvent::Submitted(number)) => {
                Ok(TicketFlow::Submitted(number))
            }
            (
                TicketFlow::Submitted(number),
                FlowEvent::Resolve {
                    resolution,
                    time_spent_hours,
                },
            ) => {
                if resolution.trim().is_empty() {
                    return Err(FlowError::InvalidField {
                        field: "resolution",
                        reason: "value is empty".to_string(),
                    });
                }
                if let Some(hours) = time_spent_hours {
                    if !hours.is_finite() || hours < 0.0 {
                        return Err(FlowError::InvalidField {
                            field: "time spent",
                            reason: format!("{hours} is not a valid number of hours"),
                        });
                    }
                }
                Ok(TicketFlow::Resolved(number))
            }
            (TicketFlow::Resolved(number), FlowEvent::Close) => Ok(TicketFlow::Closed(number)),
            (TicketFlow::Collecting(_) | TicketFlow::ReadyToSubmit(_), FlowEvent::Cancel) => {
                Ok(TicketFlow::Cancelled)
            }
            _ => Err(FlowError::InvalidTransition { state, action }),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            TicketFlow::Collecting(_) => "collecting",
            TicketFlow::ReadyToSubmit(_) => "ready to submit",
            TicketFlow::Submitted(_) => "submitted",
            TicketFlow::Resolved(_) => "resolved",
            TicketFlow::Closed(_) => "closed",
            TicketFlow::Cancelled => "cancelled",
        }
    }

    /// Field the next free-text message should fill
    pub fn expected_field(&self) -> Option<TicketField> {
        match self {
            TicketFlow::Collecting(fields) => fields.next_missing(),
            _ => None,
        }
    }
}
