//! Per-topic and per-date rollups over extracted features.
//!
//! A single forward fold; accumulation is commutative and associative, so the
//! record order never affects the final sums. Buckets are created lazily on
//! first assignment.

use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDate;

use super::cluster::UNCATEGORIZED;
use super::extract::ExtractedFeatures;

/// Aggregate for one topic label.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TopicBucket {
    /// Number of records assigned this label.
    pub count: u64,
    pub message_total: u64,
    pub byte_total: u64,
    /// Observed dates, in fold order.
    pub dates: Vec<NaiveDate>,
    /// Indices of member records, in fold order.
    pub members: Vec<usize>,
}

/// Result of folding a record set: topic buckets, date buckets, totals.
#[derive(Debug, Clone, Default)]
pub struct Aggregates {
    pub by_topic: BTreeMap<String, TopicBucket>,
    /// ISO date -> topic label -> record count.
    pub by_date: BTreeMap<String, BTreeMap<String, u64>>,
    pub total_conversations: u64,
    pub total_messages: u64,
}

/// Fold features into aggregates. Records missing from `labels` (which the
/// clusterer never produces, but a caller might) count as uncategorized.
/// Records without a date stay out of `by_date` but are fully counted in
/// topic buckets and totals.
pub fn fold(features: &[ExtractedFeatures], labels: &HashMap<usize, String>) -> Aggregates {
    let mut agg = Aggregates::default();

    for (i, feat) in features.iter().enumerate() {
        let label = labels.get(&i).map(String::as_str).unwrap_or(UNCATEGORIZED);

        let bucket = agg.by_topic.entry(label.to_string()).or_default();
        bucket.count += 1;
        bucket.message_total += feat.message_count;
        bucket.byte_total += feat.size_bytes;
        bucket.members.push(i);

        if let Some(date) = feat.date {
            let day = date.date_naive();
            bucket.dates.push(day);
            *agg.by_date
                .entry(day.format("%Y-%m-%d").to_string())
                .or_default()
                .entry(label.to_string())
                .or_insert(0) += 1;
        }

        agg.total_conversations += 1;
        agg.total_messages += feat.message_count;
    }

    agg
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::extract::extract;
    use serde_json::json;

    fn sample_features() -> Vec<ExtractedFeatures> {
        [
            json!({"created_at": 1700000000, "messages": [{"role": "user", "content": "rust question"}]}),
            json!({"created_at": 1700086400, "messages": ["a", "b", "c"]}),
            json!({"content": "no date on this one"}),
            json!({"count": 1}),
        ]
        .iter()
        .map(extract)
        .collect()
    }

    fn sample_labels() -> HashMap<usize, String> {
        HashMap::from([
            (0, "Rust".to_string()),
            (1, "Rust".to_string()),
            (2, "Other".to_string()),
            (3, UNCATEGORIZED.to_string()),
        ])
    }

    #[test]
    fn test_coverage_invariant() {
        let features = sample_features();
        let agg = fold(&features, &sample_labels());
        let bucket_sum: u64 = agg.by_topic.values().map(|b| b.count).sum();
        assert_eq!(bucket_sum, features.len() as u64);
        assert_eq!(agg.total_conversations, features.len() as u64);
    }

    #[test]
    fn test_bucket_contents() {
        let agg = fold(&sample_features(), &sample_labels());
        let rust = &agg.by_topic["Rust"];
        assert_eq!(rust.count, 2);
        assert_eq!(rust.message_total, 4); // 1 message + 3 messages
        assert_eq!(rust.members, vec![0, 1]);
        assert_eq!(rust.dates.len(), 2);

        // dateless records counted in topics but absent from the timeline
        let other = &agg.by_topic["Other"];
        assert_eq!(other.count, 1);
        assert!(other.dates.is_empty());
        let timeline_total: u64 = agg.by_date.values().flat_map(|t| t.values()).sum();
        assert_eq!(timeline_total, 2);
    }

    #[test]
    fn test_fold_commutative() {
        let features = sample_features();
        let labels = sample_labels();
        let forward = fold(&features, &labels);

        // Reverse the record order, remapping labels to the permuted indices.
        let reversed: Vec<ExtractedFeatures> = features.iter().rev().cloned().collect();
        let n = features.len();
        let remapped: HashMap<usize, String> = labels
            .iter()
            .map(|(&i, label)| (n - 1 - i, label.clone()))
            .collect();
        let backward = fold(&reversed, &remapped);

        assert_eq!(forward.total_conversations, backward.total_conversations);
        assert_eq!(forward.total_messages, backward.total_messages);
        assert_eq!(forward.by_date, backward.by_date);
        for (label, bucket) in &forward.by_topic {
            let other = &backward.by_topic[label];
            assert_eq!(bucket.count, other.count);
            assert_eq!(bucket.message_total, other.message_total);
            assert_eq!(bucket.byte_total, other.byte_total);
            let mut a = bucket.dates.clone();
            let mut b = other.dates.clone();
            a.sort();
            b.sort();
            assert_eq!(a, b);
        }
    }

    #[test]
    fn test_missing_label_counts_as_uncategorized() {
        let features = sample_features();
        let agg = fold(&features, &HashMap::new());
        assert_eq!(agg.by_topic[UNCATEGORIZED].count, features.len() as u64);
    }
}
