//! Static knowledge catalog and keyword matcher

use crate::error::ConfigError;
use crate::types::CategorySet;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::debug;

/// A known issue with a canned solution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeEntry {
    pub id: String,
    pub keywords: Vec<String>,
    pub solution: String,
    pub category: String,
    #[serde(default)]
    pub always_needs_ticket: bool,
}

/// Ordered catalog. Declaration order breaks score ties.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KnowledgeCatalog {
    entries: Vec<KnowledgeEntry>,
}

/// Lowercase, turn punctuation into spaces, collapse whitespace.
///
/// Apostrophes are dropped rather than split so "won't" stays one token.
pub fn normalize(text: &str) -> String {
    let cleaned: String = text
        .chars()
        .filter(|c| *c != '\'' && *c != '\u{2019}')
        .map(|c| {
            if c.is_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                ' '
            }
        })
        .collect::<String>()
        .to_lowercase();

    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}

impl KnowledgeCatalog {
    pub fn new(entries: Vec<KnowledgeEntry>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[KnowledgeEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&KnowledgeEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    /// Best-matching entry for free text, or `None` when nothing scores.
    ///
    /// Score is the number of an entry's keywords found in the normalized
    /// text; the first declared entry wins ties.
    pub fn match_text(&self, text: &str) -> Option<&KnowledgeEntry> {
        let normalized = normalize(text);
        if normalized.is_empty() {
            return None;
        }

        let mut best: Option<(&KnowledgeEntry, usize)> = None;
        for entry in &self.entries {
            let score = entry
                .keywords
                .iter()
                .map(|kw| normalize(kw))
                .filter(|kw| !kw.is_empty() && normalized.contains(kw.as_str()))
                .count();
            if score > 0 && best.map_or(true, |(_, top)| score > top) {
                best = Some((entry, score));
            }
        }

        if let Some((entry, score)) = best {
            debug!(entry = %entry.id, score, "knowledge match");
        }
        best.map(|(entry, _)| entry)
    }

    /// Reject catalogs that would make matching meaningless
    pub fn validate(&self, categories: &CategorySet) -> Result<(), ConfigError> {
        if self.entries.is_empty() {
            return Err(ConfigError::Invalid("knowledge catalog is empty".into()));
        }

        let mut seen = HashSet::new();
        for entry in &self.entries {
            if entry.id.trim().is_empty() {
                return Err(ConfigError::Invalid("knowledge entry with empty id".into()));
            }
            if !seen.insert(entry.id.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate knowledge entry id '{}'",
                    entry.id
                )));
            }
            if entry.keywords.iter().all(|kw| normalize(kw).is_empty()) {
                return Err(ConfigError::Invalid(format!(
                    "knowledge entry '{}' has no keywords",
                    entry.id
                )));
            }
            if entry.solution.trim().is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "knowledge entry '{}' has no solution",
                    entry.id
                )));
            }
            if !categories.contains(&entry.category) {
                return Err(ConfigError::Invalid(format!(
                    "knowledge entry '{}' uses unknown category '{}'",
                    entry.id, entry.category
                )));
            }
        }
        Ok(())
    }

    /// Catalog shipped with the binary
    pub fn builtin() -> Self {
        fn entry(
            id: &str,
            keywords: &[&str],
            category: &str,
            always_needs_ticket: bool,
            solution: &str,
        ) -> KnowledgeEntry {
            KnowledgeEntry {
                id: id.to_string(),
                keywords: keywords.iter().map(|k| k.to_string()).collect(),
                solution: solution.to_string(),
                category: category.to_string(),
                always_needs_ticket,
            }
        }

        Self::new(vec![
            entry(
                "password_reset",
                &["password", "reset password", "forgot password", "cant login", "locked out"],
                "Password Reset",
                false,
                "To reset your password:\n\
                 1. Go to the self-service password portal\n\
                 2. Enter your work email address and complete verification\n\
                 3. Choose a new password (12+ characters, mixed case, numbers and symbols, \
                 not one of your last 5)\n\n\
                 Still locked out? I can open a ticket for IT.",
            ),
            entry(
                "vpn_issues",
                &["vpn", "remote access", "work from home", "cant connect", "connection failed"],
                "VPN Access",
                false,
                "To troubleshoot the VPN:\n\
                 1. Confirm your internet connection works without the VPN\n\
                 2. Disconnect and reconnect, then restart the VPN client\n\
                 3. Clear saved credentials and sign in again\n\
                 4. Check whether your VPN credentials have expired\n\n\
                 If it still fails, I can open a ticket for deeper investigation.",
            ),
            entry(
                "teams_issues",
                &["teams", "microsoft teams", "cant join meeting", "no audio", "no video", "teams crashed"],
                "Teams/Office 365",
                false,
                "To fix Microsoft Teams problems:\n\
                 - Audio/video: Settings > Devices, test speaker and microphone, and check the \
                 OS privacy permissions for camera and microphone\n\
                 - Performance: quit Teams, clear its cache folder, start it again\n\
                 - Sign-in: sign out fully, remove stored Teams credentials, sign in with your \
                 full email address\n\n\
                 Need more help? I can open a ticket.",
            ),
            entry(
                "printer_issues",
                &["printer", "cant print", "print queue", "printer offline", "print job stuck"],
                "Printer Problems",
                false,
                "To resolve printer issues:\n\
                 - Offline: open Printers & scanners, open the queue, untick 'Use Printer Offline'\n\
                 - Stuck jobs: cancel them from the queue and restart the print spooler\n\
                 - Drivers: remove the printer and add it again to fetch current drivers\n\n\
                 Still not printing? I can open a ticket for on-site help.",
            ),
            entry(
                "email_issues",
                &["email", "outlook", "sync", "cant send", "cant receive", "mailbox full"],
                "Email Issues",
                false,
                "To troubleshoot email:\n\
                 - Not syncing: check your connection, update Office, restart Outlook\n\
                 - Mailbox full: archive old mail and empty Deleted Items\n\
                 - Cannot send/receive: File > Account Settings > Repair\n\
                 - Profile problems: create a new mail profile and re-add your account\n\n\
                 Need more help? I can open a ticket.",
            ),
            entry(
                "software_installation",
                &["install", "software", "application", "download", "license"],
                "Software Installation",
                true,
                "Company-approved software is available from the self-service software \
                 catalog. Anything outside the catalog, or anything that needs a license, \
                 requires IT approval, so I will open a ticket with the software name, version \
                 and business justification.",
            ),
            entry(
                "slow_computer",
                &["slow", "performance", "freezing", "lagging", "not responding"],
                "Hardware Issue",
                false,
                "To improve performance:\n\
                 1. Restart the computer if it has been running for days\n\
                 2. Install pending system updates\n\
                 3. Close unused programs and browser tabs\n\
                 4. Check CPU, memory and disk usage in the task manager\n\
                 5. Disable unnecessary startup programs\n\n\
                 If it stays slow, I can open a ticket for a hardware assessment.",
            ),
        ])
    }
}

impl Default for KnowledgeCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn catalog(entries: &[(&str, &[&str])]) -> KnowledgeCatalog {
        KnowledgeCatalog::new(
            entries
                .iter()
                .map(|(id, kws)| KnowledgeEntry {
                    id: id.to_string(),
                    keywords: kws.iter().map(|k| k.to_string()).collect(),
                    solution: format!("solution for {id}"),
                    category: "General Support".to_string(),
                    always_needs_ticket: false,
                })
                .collect(),
        )
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize("  My Outlook won't SYNC!!  "), "my outlook wont sync");
        assert_eq!(normalize("VPN/remote-access"), "vpn remote access");
        assert_eq!(normalize("?!"), "");
    }

    #[test]
    fn test_highest_score_wins() {
        let cat = catalog(&[("mail", &["outlook"]), ("sync", &["outlook", "sync"])]);
        let hit = cat.match_text("My Outlook won't sync emails").unwrap();
        assert_eq!(hit.id, "sync");
    }

    #[test]
    fn test_tie_broken_by_declaration_order() {
        let cat = catalog(&[("first", &["printer"]), ("second", &["printer"])]);
        assert_eq!(cat.match_text("printer jammed").unwrap().id, "first");
    }

    #[test]
    fn test_no_match_and_empty_input() {
        let cat = catalog(&[("vpn", &["vpn"])]);
        assert!(cat.match_text("my chair squeaks").is_none());
        assert!(cat.match_text("").is_none());
        assert!(cat.match_text("...").is_none());
    }

    #[test]
    fn test_multi_word_keywords_match_across_punctuation() {
        let cat = catalog(&[("pw", &["forgot password"])]);
        assert!(cat.match_text("I FORGOT, password?").is_some());
        assert!(cat.match_text("forgot my password").is_none());
        assert!(cat.match_text("forgot-password").is_some());
    }

    #[test]
    fn test_builtin_catalog_validates() {
        let cat = KnowledgeCatalog::builtin();
        assert!(cat.validate(&CategorySet::default()).is_ok());
        assert_eq!(
            cat.match_text("My Outlook won't sync emails").unwrap().id,
            "email_issues"
        );
    }

    #[test]
    fn test_validate_rejects_duplicates_and_unknown_categories() {
        let dup = catalog(&[("a", &["x"]), ("a", &["y"])]);
        assert!(dup.validate(&CategorySet::default()).is_err());

        let mut unknown = catalog(&[("a", &["x"])]);
        unknown.entries[0].category = "Spaceships".to_string();
        assert!(unknown.validate(&CategorySet::default()).is_err());

        let empty = KnowledgeCatalog::new(Vec::new());
        assert!(empty.validate(&CategorySet::default()).is_err());
    }

    proptest! {
        #[test]
        fn property_matching_is_deterministic(text in ".{0,120}") {
            let cat = KnowledgeCatalog::builtin();
            let first = cat.match_text(&text).map(|e| e.id.clone());
            let second = cat.match_text(&text).map(|e| e.id.clone());
            prop_assert_eq!(first, second);
        }

        #[test]
        fn property_match_ignores_case(text in "[a-zA-Z ]{0,60}") {
            let cat = KnowledgeCatalog::builtin();
            let lower = cat.match_text(&text.to_lowercase()).map(|e| e.id.clone());
            let upper = cat.match_text(&text.to_uppercase()).map(|e| e.id.clone());
            prop_assert_eq!(lower, upper);
        }
    }
}
