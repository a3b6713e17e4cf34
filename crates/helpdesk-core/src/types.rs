//! Ticket domain types

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

/// Ticket priority, ordered from least to most urgent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Priority {
    Low,
    Medium,
    High,
    Urgent,
}

impl Priority {
    pub const ALL: [Priority; 4] = [
        Priority::Low,
        Priority::Medium,
        Priority::High,
        Priority::Urgent,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "Low",
            Priority::Medium => "Medium",
            Priority::High => "High",
            Priority::Urgent => "Urgent",
        }
    }

    /// Parse user or store input. Accepts names, common aliases and the
    /// store's 1-4 numeric scale.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "low" | "1" | "p4" => Some(Priority::Low),
            "medium" | "normal" | "2" | "p3" => Some(Priority::Medium),
            "high" | "3" | "p2" => Some(Priority::High),
            "urgent" | "critical" | "4" | "p1" => Some(Priority::Urgent),
            _ => None,
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle status as recorded in the ticket store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TicketStatus {
    Open,
    #[serde(rename = "In Progress")]
    InProgress,
    Resolved,
    Closed,
}

impl TicketStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TicketStatus::Open => "Open",
            TicketStatus::InProgress => "In Progress",
            TicketStatus::Resolved => "Resolved",
            TicketStatus::Closed => "Closed",
        }
    }

    /// Parse a store status. The store's workflow vocabulary is folded onto
    /// the four statuses the core tracks.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "open" | "new" => Some(TicketStatus::Open),
            "in progress" | "in_progress" | "awaiting user" | "awaiting it" => {
                Some(TicketStatus::InProgress)
            }
            "resolved" => Some(TicketStatus::Resolved),
            "closed" => Some(TicketStatus::Closed),
            _ => None,
        }
    }

    pub fn is_open(&self) -> bool {
        matches!(self, TicketStatus::Open | TicketStatus::InProgress)
    }
}

impl fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A ticket category name
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Category(String);

impl Category {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The configured, extensible set of categories
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CategorySet {
    names: Vec<String>,
}

const FALLBACK_CATEGORY: &str = "General Support";

impl CategorySet {
    pub fn new(names: Vec<String>) -> Self {
        Self { names }
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|n| n.eq_ignore_ascii_case(name.trim()))
    }

    /// Resolve free text to a category.
    ///
    /// Exact (case-insensitive) names win. Otherwise the input must identify
    /// exactly one category by prefix or by one of its words, so "network"
    /// resolves to "Network Connectivity" but an ambiguous word resolves to
    /// nothing.
    pub fn resolve(&self, raw: &str) -> Option<Category> {
        let wanted = raw.trim().to_lowercase();
        if wanted.is_empty() {
            return None;
        }

        if let Some(exact) = self.names.iter().find(|n| n.to_lowercase() == wanted) {
            return Some(Category::new(exact.clone()));
        }

        let candidates: Vec<&String> = self
            .names
            .iter()
            .filter(|name| {
                let lower = name.to_lowercase();
                lower.starts_with(&wanted)
                    || lower
                        .split(|c: char| !c.is_alphanumeric())
                        .any(|word| word == wanted)
            })
            .collect();

        match candidates.as_slice() {
            [only] => Some(Category::new((*only).clone())),
            _ => None,
        }
    }

    /// Category used when nothing more specific applies
    pub fn fallback(&self) -> Category {
        self.resolve(FALLBACK_CATEGORY)
            .or_else(|| self.names.last().map(|n| Category::new(n.clone())))
            .unwrap_or_else(|| Category::new(FALLBACK_CATEGORY))
    }
}

impl Default for CategorySet {
    fn default() -> Self {
        Self::new(
            [
                "Password Reset",
                "Software Installation",
                "Hardware Issue",
                "Network Connectivity",
                "Email Issues",
                "Teams/Office 365",
                "VPN Access",
                "Printer Problems",
                "File Access",
                "Security Concern",
                "New User Setup",
                "General Support",
                "Other",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        )
    }
}

fn number_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^(?i)([a-z]{1,8})-(\d{1,12})$").expect("ticket number pattern is valid")
    })
}

/// Store-assigned ticket number such as `IT-0042`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TicketNumber(String);

impl TicketNumber {
    /// Parse user input into canonical form: upper-case prefix, sequence
    /// without extra leading zeros, padded to four digits
    pub fn parse(raw: &str) -> Option<Self> {
        let caps = number_pattern().captures(raw.trim())?;
        let sequence: u64 = caps[2].parse().ok()?;
        Some(Self::from_sequence(&caps[1], sequence))
    }

    /// Format a locally allocated number, zero-padded to four digits
    pub fn from_sequence(prefix: &str, sequence: u64) -> Self {
        Self(format!("{}-{:04}", prefix.to_uppercase(), sequence))
    }

    pub fn sequence(&self) -> Option<u64> {
        let caps = number_pattern().captures(&self.0)?;
        caps[2].parse().ok()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TicketNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Resolution details. Text and timestamp only ever exist together.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resolution {
    pub text: String,
    pub resolved_at: DateTime<Utc>,
    #[serde(default)]
    pub time_spent_hours: Option<f64>,
}

/// All fields needed to open a ticket
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TicketDraft {
    pub subject: String,
    pub description: String,
    pub priority: Priority,
    pub category: Category,
}

/// A ticket as held by the store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ticket {
    pub number: TicketNumber,
    pub subject: String,
    pub description: String,
    pub priority: Priority,
    pub category: Category,
    pub status: TicketStatus,
    pub submitted_at: DateTime<Utc>,
    pub due_at: DateTime<Utc>,
    #[serde(default)]
    pub resolution: Option<Resolution>,
    #[serde(default)]
    pub submitted_by: Option<String>,
}

impl Ticket {
    /// Check the record-level invariants
    pub fn check_invariants(&self) -> Result<(), String> {
        if self.due_at < self.submitted_at {
            return Err(format!(
                "{}: due date {} precedes submission {}",
                self.number, self.due_at, self.submitted_at
            ));
        }
        let finished = matches!(self.status, TicketStatus::Resolved | TicketStatus::Closed);
        match (finished, self.resolution.is_some()) {
            (true, false) => Err(format!(
                "{}: status {} without a resolution",
                self.number, self.status
            )),
            (false, true) => Err(format!(
                "{}: resolution recorded on a {} ticket",
                self.number, self.status
            )),
            _ => Ok(()),
        }
    }

    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.status.is_open() && now > self.due_at
    }
}
