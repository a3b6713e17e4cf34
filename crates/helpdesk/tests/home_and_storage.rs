mod common;

use common::{user_msg, ScriptedModel};
use helpdesk_chat::{Journals, Orchestrator};
use helpdesk_core::{Config, ConfigError, TicketNumber, TicketStatus};
use helpdesk_store::{SqliteBackend, TicketStoreAdapter};
use helpdesk_telemetry::{Paths, HOME_ENV};
use serial_test::serial;
use std::sync::Arc;
use tempfile::TempDir;

#[test]
#[serial]
fn test_home_override_locates_config() {
    let temp = TempDir::new().unwrap();
    std::env::set_var(HOME_ENV, temp.path());
    let paths = Paths::new();
    std::env::remove_var(HOME_ENV);

    let paths = paths.unwrap();
    assert_eq!(paths.config_file(), temp.path().join("config.json"));
    assert_eq!(
        paths.turns_file(),
        temp.path().join("journal").join("turns.jsonl")
    );
}

#[test]
#[serial]
fn test_missing_config_means_defaults_but_bad_config_is_fatal() {
    let temp = TempDir::new().unwrap();
    let paths = Paths::at(temp.path());

    let defaults = Config::load(&paths.config_file()).unwrap();
    assert_eq!(defaults, Config::new());

    std::fs::write(paths.config_file(), "{ not json").unwrap();
    assert!(matches!(
        Config::load(&paths.config_file()),
        Err(ConfigError::Parse(_))
    ));

    std::fs::write(paths.config_file(), r#"{"session_timeout_secs": 0}"#).unwrap();
    assert!(matches!(
        Config::load(&paths.config_file()),
        Err(ConfigError::Invalid(_))
    ));
}

#[tokio::test]
async fn test_tickets_persist_in_sqlite_across_restarts() {
    let temp = TempDir::new().unwrap();
    let paths = Paths::at(temp.path());
    let config = Arc::new(common::test_config());

    {
        let backend = Arc::new(SqliteBackend::open(&paths.tickets_db()).unwrap());
        let orchestrator = Orchestrator::new(
            config.clone(),
            Arc::new(ScriptedModel::unavailable()),
            backend,
        )
        .with_journals(Journals::at(&paths));

        for text in ["/ticket", "Shared drive missing", "Finance share gone", "Low", "File"] {
            orchestrator.handle(&user_msg(text)).await;
        }
    }

    let reopened = Arc::new(SqliteBackend::open(&paths.tickets_db()).unwrap());
    let store = TicketStoreAdapter::new(reopened, &config);
    let ticket = store
        .get_ticket(&TicketNumber::from_sequence("IT", 1))
        .await
        .unwrap();
    assert_eq!(ticket.subject, "Shared drive missing");
    assert_eq!(ticket.category.as_str(), "File Access");
    assert_eq!(ticket.status, TicketStatus::Open);
    assert!(ticket.check_invariants().is_ok());

    let mine = store.tickets_for_submitter("sam@example.com").await.unwrap();
    assert_eq!(mine.len(), 1);

    let turns: Vec<helpdesk_telemetry::TurnRecord> =
        helpdesk_telemetry::read_jsonl(&paths.turns_file()).unwrap();
    assert_eq!(turns.len(), 5);
    assert_eq!(turns[4].ticket_number.as_deref(), Some("IT-0001"));
}
