//! Path resolution for config, journals and the local ticket database

use std::path::PathBuf;

/// Environment variable that relocates the whole helpdesk directory
pub const HOME_ENV: &str = "HELPDESK_HOME";

/// Resolves standard helpdesk paths
#[derive(Debug, Clone)]
pub struct Paths {
    pub home: PathBuf,
}

impl Paths {
    /// Resolve from `HELPDESK_HOME`, falling back to `~/.helpdesk`
    pub fn new() -> std::io::Result<Self> {
        if let Some(dir) = std::env::var_os(HOME_ENV).filter(|v| !v.is_empty()) {
            return Ok(Self {
                home: PathBuf::from(dir),
            });
        }

        let home = dirs::home_dir().ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::NotFound, "home directory not found")
        })?;

        Ok(Self {
            home: home.join(".helpdesk"),
        })
    }

    /// Use an explicit root (tests, packaged deployments)
    pub fn at(home: impl Into<PathBuf>) -> Self {
        Self { home: home.into() }
    }

    pub fn config_file(&self) -> PathBuf {
        self.home.join("config.json")
    }

    pub fn tickets_db(&self) -> PathBuf {
        self.home.join("tickets.db")
    }

    pub fn journal_dir(&self) -> PathBuf {
        self.home.join("journal")
    }

    /// One record per handled message
    pub fn turns_file(&self) -> PathBuf {
        self.journal_dir().join("turns.jsonl")
    }

    /// Ticket creations whose outcome is unknown and need a human
    pub fn reconcile_file(&self) -> PathBuf {
        self.journal_dir().join("reconcile.jsonl")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_env_override() {
        std::env::set_var(HOME_ENV, "/tmp/helpdesk-paths-test");
        let paths = Paths::new().unwrap();
        std::env::remove_var(HOME_ENV);
        assert_eq!(paths.home, PathBuf::from("/tmp/helpdesk-paths-test"));
    }

    #[test]
    #[serial]
    fn test_default_home() {
        std::env::remove_var(HOME_ENV);
        let paths = Paths::new().unwrap();
        assert!(paths.home.ends_with(".helpdesk"));
    }

    #[test]
    fn test_journal_files() {
        let paths = Paths::at("/srv/helpdesk");
        assert!(paths.turns_file().ends_with("journal/turns.jsonl"));
        assert!(paths.reconcile_file().ends_with("journal/reconcile.jsonl"));
        assert!(paths.config_file().ends_with("config.json"));
        assert!(paths.tickets_db().ends_with("tickets.db"));
    }
}
