//! Output surfaces: stdout text reports, JSON snapshots, HTML dashboards.
//!
//! All emitters consume the already-built summary JSON rather than the
//! intermediate structs, so every surface reports identical numbers.

pub mod html;

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde_json::Value;
use tracing::info;

const RULE_WIDTH: usize = 70;

/// Write a summary document as pretty-printed JSON.
pub fn write_json(summary: &Value, path: &Path) -> Result<()> {
    let content = serde_json::to_string_pretty(summary)?;
    fs::write(path, content).with_context(|| format!("writing {}", path.display()))?;
    info!(path = %path.display(), "summary written");
    Ok(())
}

fn heading(title: &str) {
    println!("\n{}", "=".repeat(RULE_WIDTH));
    println!("{title}");
    println!("{}", "=".repeat(RULE_WIDTH));
}

fn subheading(title: &str) {
    println!("\n{}", "-".repeat(RULE_WIDTH));
    println!("{title}");
    println!("{}", "-".repeat(RULE_WIDTH));
}

fn field_u64(value: &Value, path: &[&str]) -> u64 {
    path.iter()
        .try_fold(value, |v, key| v.get(key))
        .and_then(Value::as_u64)
        .unwrap_or(0)
}

fn field_f64(value: &Value, path: &[&str]) -> f64 {
    path.iter()
        .try_fold(value, |v, key| v.get(key))
        .and_then(Value::as_f64)
        .unwrap_or(0.0)
}

/// Print the conversations-mode report: totals, topics by conversation count,
/// and a short timeline digest.
pub fn print_topic_report(summary: &Value) {
    heading("CONVERSATION TOPIC ANALYSIS");

    println!(
        "\nTotal Conversations: {}",
        field_u64(summary, &["summary", "total_conversations"])
    );
    println!(
        "Total Messages: {}",
        field_u64(summary, &["summary", "total_messages"])
    );
    println!(
        "Estimated Tokens: {}",
        field_u64(summary, &["summary", "total_estimated_tokens"])
    );
    println!(
        "Estimated Cost: ${:.2}",
        field_f64(summary, &["summary", "total_estimated_cost"])
    );
    println!(
        "Estimated Energy: {:.2} Wh ({:.2} phone charges, {:.1} LED bulb hours)",
        field_f64(summary, &["summary", "energy", "total_wh"]),
        field_f64(summary, &["summary", "energy", "equivalent_phone_charges"]),
        field_f64(summary, &["summary", "energy", "equivalent_led_bulb_hours"]),
    );

    subheading("BY TOPIC (sorted by conversation count)");

    let mut topics: Vec<(&String, &Value)> = summary
        .get("by_topic")
        .and_then(Value::as_object)
        .map(|m| m.iter().collect())
        .unwrap_or_default();
    topics.sort_by(|a, b| field_u64(b.1, &["count"]).cmp(&field_u64(a.1, &["count"])));

    for (name, topic) in topics {
        println!("\n{name}:");
        println!(
            "  Conversations: {} ({:.1}%)",
            field_u64(topic, &["count"]),
            field_f64(topic, &["percentage"])
        );
        println!("  Messages: {}", field_u64(topic, &["messages"]));
        println!(
            "  Estimated Tokens: {}",
            field_u64(topic, &["estimated_tokens"])
        );
        println!(
            "  Estimated Cost: ${:.2}",
            field_f64(topic, &["estimated_cost"])
        );
    }

    if let Some(timeline) = summary.get("timeline").and_then(Value::as_array) {
        if !timeline.is_empty() {
            subheading("TIMELINE");
            let first = timeline.first().and_then(|d| d.get("date")).and_then(Value::as_str);
            let last = timeline.last().and_then(|d| d.get("date")).and_then(Value::as_str);
            if let (Some(first), Some(last)) = (first, last) {
                println!("\nActive from {first} to {last} ({} active days)", timeline.len());
            }
            if let Some(busiest) = timeline.iter().max_by_key(|d| field_u64(d, &["total"])) {
                println!(
                    "Busiest day: {} ({} conversations)",
                    busiest.get("date").and_then(Value::as_str).unwrap_or("?"),
                    field_u64(busiest, &["total"])
                );
            }
        }
    }
}

/// Print the projects-mode report: global usage and per-project breakdown
/// sorted by token consumption.
pub fn print_project_report(summary: &Value) {
    heading("CLAUDE CODE USAGE DASHBOARD");

    println!(
        "\nTotal Projects: {}",
        field_u64(summary, &["summary", "total_projects"])
    );
    println!(
        "Total Sessions: {}",
        field_u64(summary, &["summary", "total_conversations"])
    );
    println!(
        "Total Tokens: {}",
        field_u64(summary, &["summary", "tokens", "total"])
    );
    println!(
        "Estimated Energy: {:.2} Wh ({:.2} phone charges)",
        field_f64(summary, &["summary", "energy_wh"]),
        field_f64(summary, &["summary", "phone_charges_equiv"])
    );
    println!(
        "Estimated Cost: ${:.2}",
        field_f64(summary, &["summary", "cost_estimate"])
    );

    subheading("BY PROJECT (sorted by token usage)");

    let mut projects: Vec<(&String, &Value)> = summary
        .get("by_project")
        .and_then(Value::as_object)
        .map(|m| m.iter().collect())
        .unwrap_or_default();
    projects.sort_by(|a, b| {
        field_u64(b.1, &["tokens", "total"]).cmp(&field_u64(a.1, &["tokens", "total"]))
    });

    for (name, proj) in projects {
        println!("\n{name}:");
        println!("  Sessions: {}", field_u64(proj, &["conversation_count"]));
        println!(
            "  Total Tokens: {} ({:.1}%)",
            field_u64(proj, &["tokens", "total"]),
            field_f64(proj, &["percentage"])
        );
        println!("    - Input: {}", field_u64(proj, &["tokens", "input"]));
        println!("    - Output: {}", field_u64(proj, &["tokens", "output"]));
        println!(
            "    - Cache Read: {}",
            field_u64(proj, &["tokens", "cache_read"])
        );
        println!("  Energy: {:.2} Wh", field_f64(proj, &["energy_wh"]));
        println!("  Cost: ${:.2}", field_f64(proj, &["cost_estimate"]));
        if let (Some(first), Some(last)) = (
            proj.get("first_date").and_then(Value::as_str),
            proj.get("last_date").and_then(Value::as_str),
        ) {
            println!("  Date Range: {first} to {last}");
        }
    }
}
