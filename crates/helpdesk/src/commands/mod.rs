pub mod chat;
pub mod check;
pub mod history;
pub mod init;
pub mod match_cmd;
pub mod relay;
pub mod stats;
pub mod status;
pub mod version;

use anyhow::Context;
use helpdesk_chat::{Journals, Orchestrator};
use helpdesk_core::Config;
use helpdesk_store::{SqliteBackend, TicketStoreAdapter};
use helpdesk_synth::model_from_settings;
use helpdesk_telemetry::Paths;
use std::path::PathBuf;
use std::sync::Arc;

/// Config from the helpdesk home. Missing file means defaults.
pub fn load_config(paths: &Paths) -> anyhow::Result<Config> {
    let path = paths.config_file();
    Config::load(&path).with_context(|| format!("loading {}", path.display()))
}

pub fn database_path(paths: &Paths, config: &Config) -> PathBuf {
    config
        .store
        .database
        .clone()
        .unwrap_or_else(|| paths.tickets_db())
}

pub fn open_backend(paths: &Paths, config: &Config) -> anyhow::Result<Arc<SqliteBackend>> {
    let path = database_path(paths, config);
    let backend = SqliteBackend::open(&path)
        .with_context(|| format!("opening ticket database {}", path.display()))?;
    Ok(Arc::new(backend))
}

pub fn open_store(paths: &Paths, config: &Config) -> anyhow::Result<TicketStoreAdapter> {
    Ok(TicketStoreAdapter::new(open_backend(paths, config)?, config))
}

/// Everything a conversation needs, wired from the helpdesk home
pub fn build_orchestrator() -> anyhow::Result<Orchestrator> {
    let paths = Paths::new()?;
    let config = Arc::new(load_config(&paths)?);
    let model = model_from_settings(&config.model)?;
    let backend = open_backend(&paths, &config)?;
    Ok(Orchestrator::new(config, model, backend).with_journals(Journals::at(&paths)))
}
