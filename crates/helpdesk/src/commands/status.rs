use anyhow::anyhow;
use helpdesk_core::TicketNumber;
use helpdesk_telemetry::Paths;

pub async fn run(number: &str) -> anyhow::Result<()> {
    let number =
        TicketNumber::parse(number).ok_or_else(|| anyhow!("'{number}' is not a ticket number"))?;
    let paths = Paths::new()?;
    let config = super::load_config(&paths)?;
    let store = super::open_store(&paths, &config)?;

    let ticket = store.get_ticket(&number).await?;
    println!("{}", serde_json::to_string_pretty(&ticket)?);
    Ok(())
}
