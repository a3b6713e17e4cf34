use helpdesk_telemetry::Paths;

pub async fn run() -> anyhow::Result<()> {
    let paths = Paths::new()?;
    let config = super::load_config(&paths)?;
    let store = super::open_store(&paths, &config)?;

    let stats = store.statistics(chrono::Utc::now()).await?;
    println!("{}", serde_json::to_string_pretty(&stats)?);
    Ok(())
}
