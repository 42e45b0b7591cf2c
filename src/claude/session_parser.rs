//! JSONL session transcript parsing.
//!
//! Each session file under `~/.claude/projects/<dir>/` is one conversation:
//! a line-delimited stream of typed records (`summary`, `user`, `assistant`).
//! Assistant records carry real token usage in `message.usage`, so no byte
//! heuristic is needed here.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::analysis::extract::parse_timestamp;
use crate::energy::{self, ModelTier};

const MAX_TITLE_CHARS: usize = 100;
const MAX_PROMPT_CHARS: usize = 200;
const UNTITLED: &str = "Untitled Session";

/// Real token counts summed across a session's assistant messages.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct TokenTotals {
    pub input: u64,
    pub output: u64,
    pub cache_read: u64,
    pub cache_creation: u64,
}

impl TokenTotals {
    /// Billable total: input plus output. Cache tokens are tracked but not
    /// counted here, matching how the usage figures are reported upstream.
    pub fn total(&self) -> u64 {
        self.input + self.output
    }
}

/// One parsed session with its usage rollup.
#[derive(Debug, Clone, Serialize)]
pub struct ConversationUsage {
    pub session_id: String,
    pub project: String,
    pub title: String,
    pub summary: Option<String>,
    pub first_prompt: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub user_message_count: u64,
    pub assistant_message_count: u64,
    pub models_used: Vec<String>,
    pub primary_model: Option<String>,
    pub model_tier: ModelTier,
    pub tokens: TokenTotals,
    pub energy_wh: f64,
    pub cost_estimate: f64,
    pub is_subagent: bool,
}

impl ConversationUsage {
    /// ISO date of the session start, for timeline keys.
    pub fn date(&self) -> Option<String> {
        self.start_date.map(|d| d.format("%Y-%m-%d").to_string())
    }
}

/// Read a JSONL file into loose JSON values. Lines that fail to parse are
/// skipped; a session file with trailing garbage still yields its good lines.
pub fn read_jsonl(path: &Path) -> Result<Vec<Value>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading session file {}", path.display()))?;

    let mut records = Vec::new();
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match serde_json::from_str::<Value>(line) {
            Ok(value) => records.push(value),
            Err(_) => debug!(file = %path.display(), "skipping malformed line"),
        }
    }
    Ok(records)
}

/// Fold one session's records into a usage summary.
///
/// Token counts come from `message.usage` on assistant records; the title
/// comes from a `summary` record when present, else the first user prompt.
pub fn summarize_conversation(
    records: &[Value],
    session_id: &str,
    project: &str,
) -> ConversationUsage {
    let mut tokens = TokenTotals::default();
    let mut user_message_count = 0u64;
    let mut assistant_message_count = 0u64;
    let mut timestamps: Vec<DateTime<Utc>> = Vec::new();
    let mut models_used: Vec<String> = Vec::new();
    let mut summary: Option<String> = None;
    let mut first_prompt: Option<String> = None;

    for record in records {
        let record_type = record.get("type").and_then(Value::as_str).unwrap_or("");

        if let Some(ts) = record.get("timestamp").and_then(Value::as_str) {
            if let Some(parsed) = parse_timestamp(ts) {
                timestamps.push(parsed);
            }
        }

        match record_type {
            "summary" => {
                if let Some(text) = record.get("summary").and_then(Value::as_str) {
                    summary = Some(text.to_string());
                }
            }
            "user" => {
                let content = record
                    .get("message")
                    .and_then(|m| m.get("content"))
                    .and_then(Value::as_str)
                    .unwrap_or("");
                if !content.trim().is_empty() {
                    user_message_count += 1;
                    if first_prompt.is_none() {
                        first_prompt = Some(truncate_chars(content, MAX_PROMPT_CHARS));
                    }
                }
            }
            "assistant" => {
                let Some(message) = record.get("message") else {
                    continue;
                };

                if let Some(model) = message.get("model").and_then(Value::as_str) {
                    if !model.is_empty() && !models_used.iter().any(|m| m == model) {
                        models_used.push(model.to_string());
                    }
                }

                if let Some(usage) = message.get("usage") {
                    tokens.input += usage_field(usage, "input_tokens");
                    tokens.output += usage_field(usage, "output_tokens");
                    tokens.cache_read += usage_field(usage, "cache_read_input_tokens");
                    tokens.cache_creation += usage_field(usage, "cache_creation_input_tokens");
                }

                if let Some(blocks) = message.get("content").and_then(Value::as_array) {
                    for block in blocks {
                        if block.get("type").and_then(Value::as_str) == Some("text") {
                            assistant_message_count += 1;
                        }
                    }
                }
            }
            _ => {}
        }
    }

    let primary_model = pick_primary_model(&models_used);
    let model_tier = primary_model
        .as_deref()
        .map(ModelTier::from_name)
        .unwrap_or_default();

    let start_date = timestamps.iter().min().copied();
    let end_date = timestamps.iter().max().copied();

    let title = make_title(summary.as_deref(), first_prompt.as_deref());
    let total = tokens.total();

    ConversationUsage {
        session_id: session_id.to_string(),
        project: project.to_string(),
        title,
        summary,
        first_prompt,
        start_date,
        end_date,
        user_message_count,
        assistant_message_count,
        models_used,
        primary_model,
        model_tier,
        tokens,
        energy_wh: energy::estimate_energy(total, model_tier, true).watt_hours,
        cost_estimate: energy::estimate_cost_split(tokens.input, tokens.output, model_tier),
        is_subagent: false,
    }
}

fn usage_field(usage: &Value, field: &str) -> u64 {
    usage.get(field).and_then(Value::as_u64).unwrap_or(0)
}

/// Primary model priority: any opus wins outright, sonnet beats the rest,
/// otherwise the first model seen.
fn pick_primary_model(models: &[String]) -> Option<String> {
    if let Some(opus) = models.iter().find(|m| m.to_lowercase().contains("opus")) {
        return Some(opus.clone());
    }
    if let Some(sonnet) = models.iter().find(|m| m.to_lowercase().contains("sonnet")) {
        return Some(sonnet.clone());
    }
    models.first().cloned()
}

fn make_title(summary: Option<&str>, first_prompt: Option<&str>) -> String {
    // a summary record can carry an empty string; treat it as absent
    let raw = summary
        .filter(|s| !s.trim().is_empty())
        .or(first_prompt)
        .unwrap_or(UNTITLED);
    if raw.chars().count() > MAX_TITLE_CHARS {
        let mut title = truncate_chars(raw, MAX_TITLE_CHARS - 3);
        title.push_str("...");
        title
    } else {
        raw.to_string()
    }
}

fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}
