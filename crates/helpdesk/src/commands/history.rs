use helpdesk_telemetry::{read_jsonl, Paths, Route, TurnRecord};
use std::collections::BTreeMap;

const RECENT_TURNS: usize = 20;

fn route_label(route: Route) -> &'static str {
    match route {
        Route::KnowledgeBase => "knowledge",
        Route::Generated => "generated",
        Route::Fallback => "fallback",
        Route::TicketField => "ticket-field",
        Route::Command => "command",
        Route::Ignored => "ignored",
    }
}

fn compute_stats(turns: &[TurnRecord]) -> String {
    if turns.is_empty() {
        return "No turns to analyze.".to_string();
    }
    let total = turns.len();
    let avg_latency = turns.iter().map(|t| t.latency_ms).sum::<u64>() as f64 / total as f64;
    let answered = turns
        .iter()
        .filter(|t| matches!(t.route, Route::KnowledgeBase | Route::Generated | Route::Fallback))
        .count();
    let from_knowledge = turns
        .iter()
        .filter(|t| t.route == Route::KnowledgeBase)
        .count();
    let tickets: std::collections::BTreeSet<&str> = turns
        .iter()
        .filter_map(|t| t.ticket_number.as_deref())
        .collect();

    let mut by_route: BTreeMap<&str, usize> = BTreeMap::new();
    for turn in turns {
        *by_route.entry(route_label(turn.route)).or_default() += 1;
    }
    let routes: Vec<String> = by_route
        .iter()
        .map(|(route, count)| format!("{route}:{count}"))
        .collect();

    let deflection = if answered == 0 {
        0.0
    } else {
        from_knowledge as f64 / answered as f64 * 100.0
    };

    format!(
        "Total turns: {}\n\
         Avg latency: {:.0}ms\n\
         Knowledge-base answers: {:.1}% of questions\n\
         Tickets touched: {}\n\
         Routes: {}",
        total,
        avg_latency,
        deflection,
        tickets.len(),
        routes.join(" ")
    )
}

pub fn run(stats: bool) -> anyhow::Result<()> {
    let paths = Paths::new()?;
    let turns: Vec<TurnRecord> = read_jsonl(&paths.turns_file())?;

    if turns.is_empty() {
        println!("No turn history");
        return Ok(());
    }

    if stats {
        println!("{}", compute_stats(&turns));
        return Ok(());
    }

    let recent: Vec<&TurnRecord> = turns.iter().rev().take(RECENT_TURNS).collect();
    println!("Recent Turns (last {})", recent.len());
    println!("======================");
    for turn in &recent {
        println!(
            "  {} | {} | {:<12} {:>5}ms {}",
            turn.timestamp.format("%Y-%m-%d %H:%M"),
            turn.session_id,
            route_label(turn.route),
            turn.latency_ms,
            turn.ticket_number
                .as_deref()
                .or(turn.knowledge_entry.as_deref())
                .unwrap_or(""),
        );
    }
    Ok(())
}
