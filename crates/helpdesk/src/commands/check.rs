use super::{database_path, load_config};
use helpdesk_core::Config;
use helpdesk_telemetry::Paths;

pub fn run() -> anyhow::Result<()> {
    let paths = Paths::new()?;
    let config = load_config(&paths)?;
    let source = if paths.config_file().exists() {
        paths.config_file().display().to_string()
    } else {
        "built-in defaults".to_string()
    };

    println!("Config OK ({source})");
    println!("{}", summary(&config, &paths));
    Ok(())
}

fn summary(config: &Config, paths: &Paths) -> String {
    let model = match &config.model.endpoint {
        Some(endpoint) => {
            let key = if config.model.api_key().is_some() {
                "key set"
            } else {
                "key missing"
            };
            format!("{} at {endpoint} ({} {key})", config.model.model, config.model.api_key_env)
        }
        None => "disabled (fallback answers only)".to_string(),
    };

    let notices = &config.notifications;
    let notifications = format!(
        "IT channel {}, submitter on close {}",
        notices.it_channel.as_deref().unwrap_or("off"),
        if notices.notify_submitter_on_close { "on" } else { "off" }
    );

    let rows = [
        ("Commands", config.commands.join(" ")),
        ("Knowledge", format!("{} entries", config.catalog.len())),
        ("Categories", config.categories.names().len().to_string()),
        ("Session timeout", format!("{}s", config.session_timeout_secs)),
        ("Elevated roles", config.elevated_roles.join(", ")),
        ("Model", model),
        (
            "Ticket store",
            format!(
                "{} (prefix {})",
                database_path(paths, config).display(),
                config.store.number_prefix
            ),
        ),
        ("Notifications", notifications),
    ];
    rows.iter()
        .map(|(label, value)| format!("  {:<16} {value}", format!("{label}:")))
        .collect::<Vec<_>>()
        .join("\n")
}
