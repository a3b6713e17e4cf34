//! Keyword heuristics used to seed tickets: category, priority, subject and
//! whether an answer still needs human follow-up

use crate::knowledge::normalize;
use crate::types::{Category, CategorySet, Priority};

struct CategoryKeywords {
    category: &'static str,
    keywords: &'static [&'static str],
}

const CATEGORY_KEYWORD_MAP: &[CategoryKeywords] = &[
    CategoryKeywords {
        category: "Password Reset",
        keywords: &["password", "reset", "locked out", "cant login"],
    },
    CategoryKeywords {
        category: "Software Installation",
        keywords: &["install", "software", "application", "license"],
    },
    CategoryKeywords {
        category: "Hardware Issue",
        keywords: &["computer", "laptop", "monitor", "keyboard", "mouse", "slow", "broken"],
    },
    CategoryKeywords {
        category: "Network Connectivity",
        keywords: &["network", "internet", "wifi", "connection", "cant connect"],
    },
    CategoryKeywords {
        category: "Email Issues",
        keywords: &["email", "outlook", "mailbox", "calendar"],
    },
    CategoryKeywords {
        category: "Teams/Office 365",
        keywords: &["teams", "office", "word", "excel", "powerpoint", "onedrive", "sharepoint"],
    },
    CategoryKeywords {
        category: "VPN Access",
        keywords: &["vpn", "remote", "work from home"],
    },
    CategoryKeywords {
        category: "Printer Problems",
        keywords: &["printer", "print", "scanner", "scan"],
    },
    CategoryKeywords {
        category: "File Access",
        keywords: &["file", "folder", "share", "drive", "permission", "access"],
    },
    CategoryKeywords {
        category: "Security Concern",
        keywords: &["security", "virus", "malware", "phishing", "suspicious"],
    },
    CategoryKeywords {
        category: "New User Setup",
        keywords: &["new user", "onboarding", "new employee", "new hire"],
    },
];

const URGENT_WORDS: &[&str] = &[
    "urgent",
    "emergency",
    "critical",
    "asap",
    "down",
    "outage",
    "security incident",
    "data loss",
    "ransomware",
];

const HIGH_WORDS: &[&str] = &[
    "important",
    "deadline",
    "cant work",
    "blocking",
    "multiple users",
    "department",
];

const LOW_WORDS: &[&str] = &["when you can", "not urgent", "nice to have", "question", "how to"];

const TICKET_INDICATORS: &[&str] = &[
    "hardware replacement",
    "admin access",
    "administrative privileges",
    "new equipment",
    "software license",
    "security incident",
    "data loss",
    "data recovery",
    "server",
    "database",
    "network configuration",
    "firewall",
    "cannot be resolved",
    "requires it support",
    "contact it",
    "on site assistance",
    "new user setup",
];

const SUBJECT_STOP_WORDS: &[&str] = &[
    "the", "a", "an", "is", "are", "was", "were", "been", "have", "has", "had", "i", "my", "me",
    "cant", "cannot", "wont", "please", "help", "need",
];

const MAX_SUBJECT_WORDS: usize = 7;
const MAX_SUBJECT_CHARS: usize = 50;
const DEFAULT_SUBJECT: &str = "IT Support Request";

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| haystack.contains(n))
}

/// First configured category whose keywords appear in the text, else the
/// set's fallback category
pub fn suggest_category(text: &str, categories: &CategorySet) -> Category {
    let normalized = normalize(text);
    CATEGORY_KEYWORD_MAP
        .iter()
        .filter(|entry| contains_any(&normalized, entry.keywords))
        .find_map(|entry| categories.resolve(entry.category))
        .unwrap_or_else(|| categories.fallback())
}

pub fn suggest_priority(text: &str) -> Priority {
    let normalized = normalize(text);
    let without_negation = normalized.replace("not urgent", "");
    if contains_any(&without_negation, URGENT_WORDS) {
        Priority::Urgent
    } else if contains_any(&normalized, HIGH_WORDS) {
        Priority::High
    } else if contains_any(&normalized, LOW_WORDS) {
        Priority::Low
    } else {
        Priority::Medium
    }
}

/// Short title-cased subject built from the significant words of a message
pub fn generate_subject(text: &str) -> String {
    let normalized = normalize(text);
    let words: Vec<String> = normalized
        .split(' ')
        .filter(|w| !w.is_empty() && !SUBJECT_STOP_WORDS.contains(w))
        .take(MAX_SUBJECT_WORDS)
        .map(title_case)
        .collect();

    if words.is_empty() {
        return DEFAULT_SUBJECT.to_string();
    }

    let subject = words.join(" ");
    if subject.chars().count() > MAX_SUBJECT_CHARS {
        let cut: String = subject.chars().take(MAX_SUBJECT_CHARS - 3).collect();
        format!("{}...", cut.trim_end())
    } else {
        subject
    }
}

fn title_case(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Whether the question or the generated answer indicates that IT has to act
pub fn requires_ticket(question: &str, answer: &str) -> bool {
    let question = normalize(question);
    let answer = normalize(answer);
    TICKET_INDICATORS
        .iter()
        .any(|indicator| question.contains(indicator) || answer.contains(indicator))
}
