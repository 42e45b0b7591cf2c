//! Conversation-archive analysis pipeline.
//!
//! Raw records flow through extraction, normalization, clustering (or the
//! keyword fallback), and a single aggregation fold; `build_summary` then
//! shapes the result into the JSON document the report emitters consume.

pub mod aggregate;
pub mod cluster;
pub mod extract;
pub mod normalize;

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::energy::{self, ModelTier};
pub use aggregate::{fold, Aggregates, TopicBucket};
pub use cluster::UNCATEGORIZED;
pub use extract::ExtractedFeatures;
use normalize::Normalizer;

/// Sort key for records without a date; sorts last under descending order.
pub(crate) const EPOCH_DATE: &str = "1970-01-01";

/// Completed analysis over one record set.
pub struct ConversationAnalysis {
    pub features: Vec<ExtractedFeatures>,
    /// Record index -> topic label; total over all indices.
    pub labels: HashMap<usize, String>,
    pub aggregates: Aggregates,
    /// False when the keyword fallback produced the labels.
    pub clustered: bool,
}

/// Load the conversations archive: either an object whose values are records,
/// or an array of records.
pub fn load_conversations(path: &Path) -> Result<Vec<Value>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading conversations file {}", path.display()))?;
    let doc: Value = serde_json::from_str(&content)
        .with_context(|| format!("parsing {}", path.display()))?;

    match doc {
        Value::Object(map) => Ok(map.into_iter().map(|(_, v)| v).collect()),
        Value::Array(items) => Ok(items),
        other => bail!(
            "expected a JSON object or array of conversations, found {}",
            match other {
                Value::String(_) => "a string",
                Value::Number(_) => "a number",
                Value::Bool(_) => "a boolean",
                Value::Null => "null",
                _ => "an unexpected value",
            }
        ),
    }
}

/// Run the full pipeline. `n_clusters == 0` disables clustering and labels
/// every record by keyword instead.
pub fn analyze(records: &[Value], n_clusters: usize) -> ConversationAnalysis {
    info!(conversations = records.len(), "analyzing conversations");

    let features: Vec<ExtractedFeatures> = records.iter().map(extract::extract).collect();

    let normalizer = Normalizer::new();
    let cleaned: Vec<String> = features.iter().map(|f| normalizer.clean(&f.text)).collect();

    let (labels, clustered) = match cluster::cluster_topics(&cleaned, n_clusters) {
        Some(assignment) => (assignment, true),
        None => {
            if n_clusters > 0 {
                warn!("clustering unavailable for this corpus, using keyword labels");
            }
            (keyword_labels(&cleaned), false)
        }
    };

    let aggregates = fold(&features, &labels);
    info!(topics = aggregates.by_topic.len(), "analysis complete");

    ConversationAnalysis {
        features,
        labels,
        aggregates,
        clustered,
    }
}

fn keyword_labels(cleaned: &[String]) -> HashMap<usize, String> {
    cleaned
        .iter()
        .enumerate()
        .map(|(i, text)| {
            let label = if text.trim().is_empty() {
                UNCATEGORIZED
            } else {
                cluster::classify_keyword(text)
            };
            (i, label.to_string())
        })
        .collect()
}

/// Shape the aggregates into the summary JSON consumed by the report
/// emitters: `summary` totals, `by_topic`, date-ordered `timeline`, and
/// `conversations` sorted most recent first (dateless records last).
pub fn build_summary(analysis: &ConversationAnalysis, tier: ModelTier) -> Value {
    let agg = &analysis.aggregates;
    let total = agg.total_conversations.max(1);

    let total_tokens: u64 = agg
        .by_topic
        .values()
        .map(|b| energy::estimate_tokens(b.byte_total))
        .sum();
    let total_energy = energy::estimate_energy(total_tokens, tier, true);

    let mut by_topic = serde_json::Map::new();
    for (topic, bucket) in &agg.by_topic {
        let tokens = energy::estimate_tokens(bucket.byte_total);
        let topic_energy = energy::estimate_energy(tokens, tier, true);
        by_topic.insert(
            topic.clone(),
            json!({
                "count": bucket.count,
                "messages": bucket.message_total,
                "size": bucket.byte_total,
                "estimated_tokens": tokens,
                "estimated_cost": energy::estimate_cost(tokens, tier),
                "estimated_energy_wh": topic_energy.watt_hours,
                "percentage": bucket.count as f64 / total as f64 * 100.0,
            }),
        );
    }

    let mut conversations: Vec<Value> = Vec::with_capacity(analysis.features.len());
    for (topic, bucket) in &agg.by_topic {
        for &i in &bucket.members {
            let feat = &analysis.features[i];
            let tokens = energy::estimate_tokens(feat.size_bytes);
            let conv_energy = energy::estimate_energy(tokens, tier, true);
            conversations.push(json!({
                "title": feat.title,
                "topic": topic,
                "date": feat.date.map(|d| d.format("%Y-%m-%d").to_string()),
                "messages": feat.message_count,
                "size": feat.size_bytes,
                "estimated_tokens": tokens,
                "estimated_cost": energy::estimate_cost(tokens, tier),
                "estimated_energy_wh": conv_energy.watt_hours,
            }));
        }
    }
    conversations.sort_by(|a, b| {
        let key = |v: &Value| {
            v.get("date")
                .and_then(Value::as_str)
                .unwrap_or(EPOCH_DATE)
                .to_string()
        };
        key(b).cmp(&key(a))
    });

    let timeline: Vec<Value> = agg
        .by_date
        .iter()
        .map(|(date, topics)| {
            json!({
                "date": date,
                "topics": topics,
                "total": topics.values().sum::<u64>(),
            })
        })
        .collect();

    json!({
        "summary": {
            "total_conversations": agg.total_conversations,
            "total_messages": agg.total_messages,
            "total_estimated_tokens": total_tokens,
            "total_estimated_cost": energy::estimate_cost(total_tokens, tier),
            "energy": {
                "total_wh": total_energy.watt_hours,
                "total_kwh": total_energy.kilowatt_hours,
                "equivalent_phone_charges": total_energy.phone_charges,
                "equivalent_led_bulb_hours": total_energy.led_bulb_hours,
                "model_tier": tier.as_str(),
                "pue_applied": true,
            },
        },
        "by_topic": by_topic,
        "timeline": timeline,
        "conversations": conversations,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    #[test]
    fn test_load_conversations_object_and_array() {
        let dir = tempfile::tempdir().unwrap();

        let obj_path = dir.path().join("object.json");
        let mut f = std::fs::File::create(&obj_path).unwrap();
        write!(f, r#"{{"a": {{"title": "one"}}, "b": {{"title": "two"}}}}"#).unwrap();
        assert_eq!(load_conversations(&obj_path).unwrap().len(), 2);

        let arr_path = dir.path().join("array.json");
        let mut f = std::fs::File::create(&arr_path).unwrap();
        write!(f, r#"[{{"title": "one"}}]"#).unwrap();
        assert_eq!(load_conversations(&arr_path).unwrap().len(), 1);
    }

    #[test]
    fn test_load_conversations_missing_file_errors() {
        assert!(load_conversations(Path::new("/nonexistent/conversations.json")).is_err());
    }

    #[test]
    fn test_load_conversations_scalar_root_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scalar.json");
        std::fs::write(&path, "42").unwrap();
        assert!(load_conversations(&path).is_err());
    }

    #[test]
    fn test_single_record_round_trip() {
        // Single record: clustering is degenerate, keyword fallback applies,
        // and the summary carries exactly one bucket of count 1.
        let record = json!({
            "created_at": 1700000000,
            "messages": [{"role": "user", "content": "hello"}]
        });
        let size = serde_json::to_string(&record).unwrap().len() as u64;

        let analysis = analyze(&[record], 15);
        assert!(!analysis.clustered);
        assert_eq!(analysis.aggregates.by_topic.len(), 1);

        let summary = build_summary(&analysis, ModelTier::Default);
        let by_topic = summary["by_topic"].as_object().unwrap();
        assert_eq!(by_topic.len(), 1);
        let bucket = by_topic.values().next().unwrap();
        assert_eq!(bucket["count"], 1);
        assert_eq!(bucket["estimated_tokens"], size / 4);
    }

    #[test]
    fn test_keyword_mode_when_clusters_zero() {
        let records = vec![
            json!({"content": "debug this rust code error please"}),
            json!({"content": "deploy docker to the linux server"}),
        ];
        let analysis = analyze(&records, 0);
        assert!(!analysis.clustered);
        assert_eq!(analysis.labels[&0], "Coding/Development");
        assert_eq!(analysis.labels[&1], "System Administration");
    }

    #[test]
    fn test_empty_record_uncategorized_in_keyword_mode() {
        let analysis = analyze(&[json!({"count": 3})], 0);
        assert_eq!(analysis.labels[&0], UNCATEGORIZED);
    }

    #[test]
    fn test_summary_conversations_sorted_date_desc_missing_last() {
        let records = vec![
            json!({"created_at": "2024-01-05T00:00:00Z", "content": "older"}),
            json!({"content": "dateless"}),
            json!({"created_at": "2024-03-01T00:00:00Z", "content": "newer"}),
        ];
        let analysis = analyze(&records, 0);
        let summary = build_summary(&analysis, ModelTier::Sonnet);
        let convs = summary["conversations"].as_array().unwrap();
        assert_eq!(convs[0]["date"], "2024-03-01");
        assert_eq!(convs[1]["date"], "2024-01-05");
        assert!(convs[2]["date"].is_null());
    }

    #[test]
    fn test_timeline_ordered_with_totals() {
        let records = vec![
            json!({"created_at": "2024-02-01T08:00:00Z", "content": "rust code error"}),
            json!({"created_at": "2024-01-01T08:00:00Z", "content": "rust code error"}),
            json!({"created_at": "2024-02-01T09:00:00Z", "content": "rust code error"}),
        ];
        let analysis = analyze(&records, 0);
        let summary = build_summary(&analysis, ModelTier::Default);
        let timeline = summary["timeline"].as_array().unwrap();
        assert_eq!(timeline.len(), 2);
        assert_eq!(timeline[0]["date"], "2024-01-01");
        assert_eq!(timeline[0]["total"], 1);
        assert_eq!(timeline[1]["date"], "2024-02-01");
        assert_eq!(timeline[1]["total"], 2);
    }
}
