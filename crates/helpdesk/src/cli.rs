use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "helpdesk")]
#[command(version)]
#[command(about = "IT helpdesk assistant: answers, triage and ticket workflow")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write the default configuration
    Init {
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },

    /// Load and validate the configuration
    Check,

    /// Talk to the assistant on the terminal
    Chat {
        /// User id the conversation runs as
        #[arg(short, long, default_value = "local")]
        user: String,

        /// Role, e.g. it-admin for /resolve, /close and /stats
        #[arg(short, long)]
        role: Option<String>,

        /// Email used to file and list tickets
        #[arg(short, long)]
        email: Option<String>,
    },

    /// Bridge a chat platform: JSON messages on stdin, JSON responses on stdout
    Relay,

    /// Show which knowledge entry a question matches
    Match {
        #[arg(required = true)]
        text: Vec<String>,
    },

    /// Show a ticket
    Status {
        /// Ticket number, e.g. IT-0042
        number: String,
    },

    /// Ticket statistics
    Stats,

    /// View turn history
    History {
        /// Show statistics summary
        #[arg(long)]
        stats: bool,
    },

    /// Print version information
    Version,
}
