use helpdesk_core::triage::{generate_subject, suggest_category, suggest_priority};
use helpdesk_core::Config;
use helpdesk_telemetry::Paths;

pub fn run(text: &str) -> anyhow::Result<()> {
    let paths = Paths::new()?;
    let config = super::load_config(&paths)?;
    println!("{}", describe_match(&config, text));
    Ok(())
}

fn describe_match(config: &Config, text: &str) -> String {
    let mut out = match config.catalog.match_text(text) {
        Some(entry) => format!(
            "Matched: {} ({}){}\n\n{}",
            entry.id,
            entry.category,
            if entry.always_needs_ticket {
                ", always opens a ticket"
            } else {
                ""
            },
            entry.solution
        ),
        None => "No knowledge entry matches; the model would be asked.".to_string(),
    };
    out.push_str(&format!(
        "\n\nTriage:\n  Subject:  {}\n  Priority: {}\n  Category: {}",
        generate_subject(text),
        suggest_priority(text),
        suggest_category(text, &config.categories),
    ));
    out
}
