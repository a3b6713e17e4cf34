//! Paths and JSONL journals for routing telemetry and operator reconciliation

mod io;
mod paths;
mod types;

pub use io::{atomic_write, read_jsonl, Journal};
pub use paths::{Paths, HOME_ENV};
pub use types::{ReconcileRecord, Route, TurnRecord};
