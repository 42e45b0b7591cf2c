//! Per-project and global usage rollups over scanned sessions.

use std::collections::BTreeMap;

use serde_json::{json, Value};

use super::project_scanner::ScannedProject;
use super::session_parser::{ConversationUsage, TokenTotals};
use crate::analysis::EPOCH_DATE;
use crate::energy::PHONE_CHARGE_WH;

const TOP_CONSUMERS: usize = 20;

/// Rollup for one project.
#[derive(Debug, Clone, Default)]
pub struct ProjectUsage {
    pub conversation_count: u64,
    pub total_turns: u64,
    pub tokens: TokenTotals,
    pub energy_wh: f64,
    pub cost_estimate: f64,
    pub first_date: Option<String>,
    pub last_date: Option<String>,
}

impl ProjectUsage {
    fn add(&mut self, conv: &ConversationUsage) {
        self.conversation_count += 1;
        self.total_turns += conv.user_message_count;
        self.tokens.input += conv.tokens.input;
        self.tokens.output += conv.tokens.output;
        self.tokens.cache_read += conv.tokens.cache_read;
        self.tokens.cache_creation += conv.tokens.cache_creation;
        self.energy_wh += conv.energy_wh;
        self.cost_estimate += conv.cost_estimate;

        if let Some(date) = conv.date() {
            if self.first_date.as_deref().map_or(true, |d| date.as_str() < d) {
                self.first_date = Some(date.clone());
            }
            if self.last_date.as_deref().map_or(true, |d| date.as_str() > d) {
                self.last_date = Some(date);
            }
        }
    }
}

/// Fold scanned projects into per-project rollups, keyed by project name.
pub fn roll_up(projects: &[ScannedProject]) -> BTreeMap<String, ProjectUsage> {
    let mut by_project: BTreeMap<String, ProjectUsage> = BTreeMap::new();
    for project in projects {
        let usage = by_project.entry(project.name.clone()).or_default();
        for conv in &project.conversations {
            usage.add(conv);
        }
    }
    by_project
}

fn tokens_json(tokens: &TokenTotals) -> Value {
    json!({
        "input": tokens.input,
        "output": tokens.output,
        "cache_read": tokens.cache_read,
        "cache_creation": tokens.cache_creation,
        "total": tokens.total(),
    })
}

/// Build the projects-mode summary JSON: global totals, per-project rollups,
/// all conversations newest first, and the heaviest sessions by token count.
pub fn build_summary(projects: &[ScannedProject]) -> Value {
    let by_project = roll_up(projects);

    let mut total_tokens = TokenTotals::default();
    let mut total_energy = 0.0;
    let mut total_cost = 0.0;
    let mut total_turns = 0u64;
    let mut conversation_count = 0u64;
    for usage in by_project.values() {
        total_tokens.input += usage.tokens.input;
        total_tokens.output += usage.tokens.output;
        total_tokens.cache_read += usage.tokens.cache_read;
        total_tokens.cache_creation += usage.tokens.cache_creation;
        total_energy += usage.energy_wh;
        total_cost += usage.cost_estimate;
        total_turns += usage.total_turns;
        conversation_count += usage.conversation_count;
    }
    let grand_total = total_tokens.total();

    let mut by_project_json = serde_json::Map::new();
    for (name, usage) in &by_project {
        let percentage = if grand_total > 0 {
            usage.tokens.total() as f64 / grand_total as f64 * 100.0
        } else {
            0.0
        };
        by_project_json.insert(
            name.clone(),
            json!({
                "conversation_count": usage.conversation_count,
                "total_turns": usage.total_turns,
                "tokens": tokens_json(&usage.tokens),
                "energy_wh": usage.energy_wh,
                "cost_estimate": usage.cost_estimate,
                "percentage": percentage,
                "first_date": usage.first_date,
                "last_date": usage.last_date,
            }),
        );
    }

    let mut all_convs: Vec<&ConversationUsage> = projects
        .iter()
        .flat_map(|p| p.conversations.iter())
        .collect();

    let mut conversations: Vec<Value> = all_convs
        .iter()
        .map(|conv| {
            json!({
                "project": conv.project,
                "title": conv.title,
                "date": conv.date(),
                "turns": conv.user_message_count,
                "model_tier": conv.model_tier.as_str(),
                "primary_model": conv.primary_model,
                "tokens": tokens_json(&conv.tokens),
                "energy_wh": conv.energy_wh,
                "cost_estimate": conv.cost_estimate,
                "is_subagent": conv.is_subagent,
            })
        })
        .collect();
    conversations.sort_by(|a, b| {
        let key = |v: &Value| {
            v.get("date")
                .and_then(Value::as_str)
                .unwrap_or(EPOCH_DATE)
                .to_string()
        };
        key(b).cmp(&key(a))
    });

    all_convs.sort_by(|a, b| b.tokens.total().cmp(&a.tokens.total()));
    let top_consumers: Vec<Value> = all_convs
        .iter()
        .take(TOP_CONSUMERS)
        .map(|conv| {
            json!({
                "project": conv.project,
                "title": conv.title,
                "date": conv.date(),
                "total_tokens": conv.tokens.total(),
                "input_tokens": conv.tokens.input,
                "output_tokens": conv.tokens.output,
                "model_tier": conv.model_tier.as_str(),
                "energy_wh": conv.energy_wh,
                "cost_estimate": conv.cost_estimate,
            })
        })
        .collect();

    json!({
        "summary": {
            "total_projects": by_project.len(),
            "total_conversations": conversation_count,
            "total_turns": total_turns,
            "tokens": tokens_json(&total_tokens),
            "energy_wh": total_energy,
            "energy_kwh": total_energy / 1000.0,
            "phone_charges_equiv": total_energy / PHONE_CHARGE_WH,
            "cost_estimate": total_cost,
        },
        "by_project": by_project_json,
        "conversations": conversations,
        "top_consumers": top_consumers,
    })
}
