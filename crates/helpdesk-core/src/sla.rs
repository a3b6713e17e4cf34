//! Due-date policy per priority

use crate::types::Priority;
use chrono::{DateTime, Datelike, Duration, Utc, Weekday};
use serde::{Deserialize, Serialize};

/// Longest accepted offset: one year
pub const MAX_DUE_HOURS: u32 = 24 * 365;

/// Hours until a ticket is due, per priority
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DueDateOffsets {
    pub low_hours: u32,
    pub medium_hours: u32,
    pub high_hours: u32,
    pub urgent_hours: u32,
}

impl DueDateOffsets {
    pub fn new() -> Self {
        Self {
            low_hours: 48,
            medium_hours: 24,
            high_hours: 8,
            urgent_hours: 4,
        }
    }

    pub fn hours_for(&self, priority: Priority) -> u32 {
        match priority {
            Priority::Low => self.low_hours,
            Priority::Medium => self.medium_hours,
            Priority::High => self.high_hours,
            Priority::Urgent => self.urgent_hours,
        }
    }

    /// Every offset is positive and at most [`MAX_DUE_HOURS`]
    pub fn in_range(&self) -> bool {
        Priority::ALL
            .iter()
            .all(|p| (1..=MAX_DUE_HOURS).contains(&self.hours_for(*p)))
    }

    /// Due date for a ticket submitted at `submitted`. Never earlier than
    /// `submitted`; a deadline landing on a weekend moves to Monday.
    /// Offsets beyond [`MAX_DUE_HOURS`] are clamped.
    pub fn due_date(&self, priority: Priority, submitted: DateTime<Utc>) -> DateTime<Utc> {
        let hours = self.hours_for(priority).min(MAX_DUE_HOURS);
        let mut due = submitted
            .checked_add_signed(Duration::hours(i64::from(hours)))
            .unwrap_or(submitted);
        while matches!(due.weekday(), Weekday::Sat | Weekday::Sun) {
            match due.checked_add_signed(Duration::days(1)) {
                Some(next) => due = next,
                None => break,
            }
        }
        due
    }
}

impl Default for DueDateOffsets {
    fn default() -> Self {
        Self::new()
    }
}
