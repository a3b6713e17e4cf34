mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr; stdout carries relay output
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init { force } => commands::init::run(force),
        Commands::Check => commands::check::run(),
        Commands::Chat { user, role, email } => {
            commands::chat::run(&user, role.as_deref(), email.as_deref()).await
        }
        Commands::Relay => commands::relay::run().await,
        Commands::Match { text } => commands::match_cmd::run(&text.join(" ")),
        Commands::Status { number } => commands::status::run(&number).await,
        Commands::Stats => commands::stats::run().await,
        Commands::History { stats } => commands::history::run(stats),
        Commands::Version => commands::version::run(),
    }
}
