use helpdesk_core::Config;
use helpdesk_telemetry::Paths;

pub fn run(force: bool) -> anyhow::Result<()> {
    let paths = Paths::new()?;
    let written = write_default_config(&paths, force)?;
    if written {
        println!("✓ Wrote default config to {}", paths.config_file().display());
        println!("\nSet {} to enable generated answers.", Config::new().model.api_key_env);
    } else {
        println!(
            "Config already exists at {} (use --force to overwrite)",
            paths.config_file().display()
        );
    }
    Ok(())
}

/// Returns `false` when a config exists and `force` is not set
fn write_default_config(paths: &Paths, force: bool) -> anyhow::Result<bool> {
    let path = paths.config_file();
    if path.exists() && !force {
        return Ok(false);
    }
    std::fs::create_dir_all(&paths.home)?;
    let json = serde_json::to_string_pretty(&Config::new())?;
    helpdesk_telemetry::atomic_write(&path, json.as_bytes())?;
    Ok(true)
}
