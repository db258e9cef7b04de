//! Terminal output for CLI commands

use anyhow::Result;
use colored::Colorize;

use gatekeep_common::{HealthPhase, HealthStatus};

/// Display the result of a health probe
pub fn display_health(endpoint: &str, status: &HealthStatus) {
    let phase = match status.phase() {
        HealthPhase::Healthy => "healthy".bright_green().bold(),
        HealthPhase::Unhealthy => "unhealthy".bright_red().bold(),
        HealthPhase::Unknown => "unknown".yellow().bold(),
    };
    println!("{} {phase}", endpoint.dimmed());

    if !status.status.is_empty() {
        println!("  status:  {}", status.status);
    }
    if let Some(checked_at) = status.checked_at {
        println!("  checked: {}", checked_at.to_rfc3339());
    }
}

/// Display an anonymous-path decision
pub fn display_decision(method: &str, path: &str, anonymous: bool) {
    let verdict = if anonymous {
        "anonymous".bright_green()
    } else {
        "authenticated".bright_yellow()
    };
    println!("{} {path} {verdict}", method.to_uppercase().bold());
}

/// Pretty-print a JSON body, or a note for an empty response
pub fn display_json(body: Option<&serde_json::Value>) -> Result<()> {
    match body {
        Some(value) => println!("{}", serde_json::to_string_pretty(value)?),
        None => println!("{}", "(no content)".dimmed()),
    }
    Ok(())
}
