//! Terminal rendering of status events.

use cirrus_bus::{Phase, StatusEvent};
use colored::Colorize;

pub fn render(event: &StatusEvent) {
    let step = match (event.step, event.total_steps) {
        (Some(step), Some(total)) => format!("[{}/{}] ", step, total),
        (Some(step), None) => format!("[{}] ", step),
        _ => String::new(),
    };

    match event.phase {
        Phase::Started => println!("{} {}", "▶".blue(), event.message),
        Phase::Progress => println!("  {}{}", step.dimmed(), event.message),
        Phase::Completed => println!("{} {}", "✓".green(), event.message.bold()),
        Phase::Failed => println!("{} {}{}", "✗".red(), step.dimmed(), event.message.red()),
    }

    for delta in &event.resource_deltas {
        println!(
            "      {} → {} {}",
            delta.slot.to_string().cyan(),
            delta.status,
            delta.provider_id.as_deref().unwrap_or("").dimmed()
        );
    }
}
