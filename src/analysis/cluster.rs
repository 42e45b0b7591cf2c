//! Topic discovery: TF-IDF vectorization plus k-means, with a keyword fallback.
//!
//! The vectorizer and clusterer are deliberately small and dependency-free;
//! the corpus fits in memory and the vocabulary is capped, so dense vectors
//! are fine. Cluster labels are derived from each centroid's strongest terms
//! and are NOT stable identifiers: two runs over different data will not
//! produce comparable label strings.

use std::collections::{HashMap, HashSet};

use regex::Regex;
use tracing::warn;

/// Sentinel label for records whose normalized text is empty. These records
/// never enter the vectorizer.
pub const UNCATEGORIZED: &str = "Uncategorized";

/// Catch-all label for the keyword fallback.
pub const GENERAL_TOPIC: &str = "General Q&A";

/// Conversational filler plus JSON/role-label noise that survives
/// normalization but carries no topical signal.
const EXTRA_STOP_WORDS: &[&str] = &[
    "true", "false", "null", "none", "type", "content", "role", "user", "assistant", "message",
    "text", "id", "name", "value", "like", "just", "actually", "really", "thing", "things",
    "want", "need", "know", "think", "make", "sure", "going", "also", "well",
];

/// Standard English stop-word list.
const ENGLISH_STOP_WORDS: &[&str] = &[
    "a", "about", "above", "across", "after", "afterwards", "again", "against", "all", "almost",
    "alone", "along", "already", "also", "although", "always", "am", "among", "amongst", "amount",
    "an", "and", "another", "any", "anyhow", "anyone", "anything", "anyway", "anywhere", "are",
    "around", "as", "at", "back", "be", "became", "because", "become", "becomes", "becoming",
    "been", "before", "beforehand", "behind", "being", "below", "beside", "besides", "between",
    "beyond", "both", "bottom", "but", "by", "call", "can", "cannot", "could", "did", "do",
    "does", "doing", "done", "down", "due", "during", "each", "either", "eleven", "else",
    "elsewhere", "empty", "enough", "etc", "even", "ever", "every", "everyone", "everything",
    "everywhere", "except", "few", "fifteen", "fifty", "fill", "find", "fire", "first", "five",
    "for", "former", "formerly", "forty", "found", "four", "from", "front", "full", "further",
    "get", "give", "go", "had", "has", "have", "he", "hence", "her", "here", "hereafter",
    "hereby", "herein", "hereupon", "hers", "herself", "him", "himself", "his", "how", "however",
    "hundred", "i", "if", "in", "indeed", "interest", "into", "is", "it", "its", "itself",
    "keep", "last", "latter", "latterly", "least", "less", "ltd", "made", "many", "may", "me",
    "meanwhile", "might", "mine", "more", "moreover", "most", "mostly", "move", "much", "must",
    "my", "myself", "namely", "neither", "never", "nevertheless", "next", "nine", "no", "nobody",
    "nor", "not", "nothing", "now", "nowhere", "of", "off", "often", "on", "once", "one", "only",
    "onto", "or", "other", "others", "otherwise", "our", "ours", "ourselves", "out", "over",
    "own", "part", "per", "perhaps", "please", "put", "rather", "re", "same", "see", "seem",
    "seemed", "seeming", "seems", "serious", "several", "she", "should", "show", "side", "since",
    "six", "sixty", "so", "some", "somehow", "someone", "something", "sometime", "sometimes",
    "somewhere", "still", "such", "take", "ten", "than", "that", "the", "their", "them",
    "themselves", "then", "thence", "there", "thereafter", "thereby", "therefore", "therein",
    "thereupon", "these", "they", "third", "this", "those", "though", "three", "through",
    "throughout", "thru", "thus", "to", "together", "too", "top", "toward", "towards", "twelve",
    "twenty", "two", "under", "until", "up", "upon", "us", "very", "via", "was", "we", "were",
    "what", "whatever", "when", "whence", "whenever", "where", "whereafter", "whereas",
    "whereby", "wherein", "whereupon", "wherever", "whether", "which", "while", "whither", "who",
    "whoever", "whole", "whom", "whose", "why", "will", "with", "within", "without", "would",
    "yet", "you", "your", "yours", "yourself", "yourselves",
];

/// Term-frequency/inverse-document-frequency vectorizer over unigrams and
/// bigrams of alphabetic tokens (3+ letters), with document-frequency filters
/// and a capped vocabulary.
pub struct TfidfVectorizer {
    token_pattern: Regex,
    stop_words: HashSet<&'static str>,
    max_features: usize,
    min_df: usize,
    max_df: f64,
}

/// Dense term-document matrix: one L2-normalized tf-idf row per document.
pub struct TermMatrix {
    pub vocabulary: Vec<String>,
    pub rows: Vec<Vec<f64>>,
}

impl Default for TfidfVectorizer {
    fn default() -> Self {
        Self {
            token_pattern: Regex::new(r"\b[a-zA-Z]{3,}\b").unwrap(),
            stop_words: ENGLISH_STOP_WORDS
                .iter()
                .chain(EXTRA_STOP_WORDS)
                .copied()
                .collect(),
            max_features: 1000,
            min_df: 2,
            max_df: 0.8,
        }
    }
}

impl TfidfVectorizer {
    /// Lowercase, keep alphabetic tokens of 3+ letters, drop stop words, then
    /// add bigrams of adjacent surviving tokens.
    fn tokenize(&self, text: &str) -> Vec<String> {
        let lower = text.to_lowercase();
        let unigrams: Vec<&str> = self
            .token_pattern
            .find_iter(&lower)
            .map(|m| m.as_str())
            .filter(|t| !self.stop_words.contains(t))
            .collect();

        let mut terms: Vec<String> = unigrams.iter().map(|t| t.to_string()).collect();
        for pair in unigrams.windows(2) {
            terms.push(format!("{} {}", pair[0], pair[1]));
        }
        terms
    }

    /// Build the term matrix, or `None` when the post-filter vocabulary is
    /// empty (too little shared vocabulary across documents).
    pub fn fit_transform(&self, documents: &[&str]) -> Option<TermMatrix> {
        if documents.is_empty() {
            return None;
        }
        let tokenized: Vec<Vec<String>> = documents.iter().map(|d| self.tokenize(d)).collect();

        let mut doc_freq: HashMap<&str, usize> = HashMap::new();
        let mut corpus_count: HashMap<&str, usize> = HashMap::new();
        for tokens in &tokenized {
            let unique: HashSet<&str> = tokens.iter().map(String::as_str).collect();
            for term in unique {
                *doc_freq.entry(term).or_insert(0) += 1;
            }
            for term in tokens {
                *corpus_count.entry(term.as_str()).or_insert(0) += 1;
            }
        }

        let n_docs = documents.len();
        let max_doc_count = self.max_df * n_docs as f64;
        let mut candidates: Vec<&str> = doc_freq
            .iter()
            .filter(|(_, &df)| df >= self.min_df && df as f64 <= max_doc_count)
            .map(|(&term, _)| term)
            .collect();
        // Cap the vocabulary at the most frequent terms; alphabetical
        // tie-break keeps the selection deterministic.
        candidates.sort_by(|a, b| corpus_count[b].cmp(&corpus_count[a]).then_with(|| a.cmp(b)));
        candidates.truncate(self.max_features);
        if candidates.is_empty() {
            return None;
        }

        let mut vocabulary: Vec<String> = candidates.iter().map(|t| t.to_string()).collect();
        vocabulary.sort();
        let index: HashMap<&str, usize> = vocabulary
            .iter()
            .enumerate()
            .map(|(i, t)| (t.as_str(), i))
            .collect();

        let idf: Vec<f64> = vocabulary
            .iter()
            .map(|term| {
                let df = doc_freq.get(term.as_str()).copied().unwrap_or(0);
                (((1 + n_docs) as f64) / ((1 + df) as f64)).ln() + 1.0
            })
            .collect();

        let mut rows = Vec::with_capacity(n_docs);
        for tokens in &tokenized {
            let mut row = vec![0.0; vocabulary.len()];
            for term in tokens {
                if let Some(&i) = index.get(term.as_str()) {
                    row[i] += 1.0;
                }
            }
            for (i, value) in row.iter_mut().enumerate() {
                *value *= idf[i];
            }
            let norm = row.iter().map(|v| v * v).sum::<f64>().sqrt();
            if norm > 0.0 {
                for value in row.iter_mut() {
                    *value /= norm;
                }
            }
            rows.push(row);
        }

        Some(TermMatrix { vocabulary, rows })
    }
}

/// Iterative centroid-based clustering with k-means++ seeding, a fixed seed
/// for reproducibility, and multiple restarts keeping the lowest inertia.
pub struct KMeans {
    n_clusters: usize,
    n_init: usize,
    max_iter: usize,
    seed: u64,
}

pub struct KMeansFit {
    pub labels: Vec<usize>,
    pub centroids: Vec<Vec<f64>>,
    pub inertia: f64,
}

impl KMeans {
    pub fn new(n_clusters: usize) -> Self {
        Self {
            n_clusters,
            n_init: 10,
            max_iter: 300,
            seed: 42,
        }
    }

    pub fn fit(&self, rows: &[Vec<f64>]) -> KMeansFit {
        let mut rng = SplitMix64::new(self.seed);
        let mut best = self.run_once(rows, &mut rng);
        for _ in 1..self.n_init {
            let fit = self.run_once(rows, &mut rng);
            if fit.inertia < best.inertia {
                best = fit;
            }
        }
        best
    }

    fn run_once(&self, rows: &[Vec<f64>], rng: &mut SplitMix64) -> KMeansFit {
        let k = self.n_clusters.min(rows.len()).max(1);
        let dim = rows.first().map(|r| r.len()).unwrap_or(0);
        let mut centroids = kmeans_plus_plus_init(rows, k, rng);
        let mut labels = vec![0usize; rows.len()];

        for _ in 0..self.max_iter {
            let mut changed = false;
            for (i, row) in rows.iter().enumerate() {
                let nearest = nearest_centroid(row, &centroids);
                if labels[i] != nearest {
                    labels[i] = nearest;
                    changed = true;
                }
            }

            let mut sums = vec![vec![0.0; dim]; k];
            let mut counts = vec![0usize; k];
            for (i, row) in rows.iter().enumerate() {
                counts[labels[i]] += 1;
                for (d, value) in row.iter().enumerate() {
                    sums[labels[i]][d] += value;
                }
            }
            for c in 0..k {
                if counts[c] == 0 {
                    // Reseed an empty cluster from the point farthest from
                    // its current centroid.
                    let far = farthest_point(rows, &labels, &centroids);
                    sums[c] = rows[far].clone();
                    labels[far] = c;
                    changed = true;
                } else {
                    for d in 0..dim {
                        sums[c][d] /= counts[c] as f64;
                    }
                }
            }
            centroids = sums;

            if !changed {
                break;
            }
        }

        let inertia = rows
            .iter()
            .enumerate()
            .map(|(i, row)| squared_distance(row, &centroids[labels[i]]))
            .sum();
        KMeansFit {
            labels,
            centroids,
            inertia,
        }
    }
}

/// Cluster normalized conversation texts into `n_clusters` topic groups.
///
/// Records with empty text are excluded from vectorization and labeled
/// [`UNCATEGORIZED`] directly. When fewer usable texts exist than requested
/// clusters, the cluster count is reduced to `max(2, usable / 2)`.
///
/// Returns `None` when the corpus is degenerate (fewer than two usable texts,
/// or an empty post-filter vocabulary); callers must fall back to keyword
/// labeling. Every input index appears in the returned assignment.
pub fn cluster_topics(texts: &[String], n_clusters: usize) -> Option<HashMap<usize, String>> {
    if n_clusters == 0 {
        return None;
    }
    let valid: Vec<usize> = texts
        .iter()
        .enumerate()
        .filter(|(_, t)| !t.trim().is_empty())
        .map(|(i, _)| i)
        .collect();
    if valid.len() < 2 {
        return None;
    }

    let mut k = n_clusters;
    if valid.len() < k {
        k = (valid.len() / 2).max(2);
        warn!(
            requested = n_clusters,
            reduced = k,
            usable = valid.len(),
            "not enough conversations for requested cluster count"
        );
    }

    let documents: Vec<&str> = valid.iter().map(|&i| texts[i].as_str()).collect();
    let matrix = TfidfVectorizer::default().fit_transform(&documents)?;
    let fit = KMeans::new(k).fit(&matrix.rows);
    let names = label_clusters(&fit.centroids, &matrix.vocabulary);

    let mut assignment: HashMap<usize, String> = HashMap::with_capacity(texts.len());
    for (slot, &record_idx) in valid.iter().enumerate() {
        assignment.insert(record_idx, names[fit.labels[slot]].clone());
    }
    for i in 0..texts.len() {
        assignment
            .entry(i)
            .or_insert_with(|| UNCATEGORIZED.to_string());
    }
    Some(assignment)
}

/// Name each cluster from its centroid's five highest-weighted terms.
fn label_clusters(centroids: &[Vec<f64>], vocabulary: &[String]) -> Vec<String> {
    centroids
        .iter()
        .map(|centroid| {
            let mut order: Vec<usize> = (0..centroid.len()).collect();
            order.sort_by(|&a, &b| {
                centroid[b]
                    .partial_cmp(&centroid[a])
                    .unwrap_or(std::cmp::Ordering::Equal)
            });
            let terms: Vec<&str> = order
                .iter()
                .take(5)
                .map(|&i| vocabulary[i].as_str())
                .collect();
            title_case(&terms.join(" / "))
        })
        .collect()
}

/// Keyword-based fallback classifier, used when clustering is disabled or
/// unavailable. Scores each category by keyword hits; no hits means
/// [`GENERAL_TOPIC`].
pub fn classify_keyword(text: &str) -> &'static str {
    const KEYWORD_TOPICS: &[(&str, &[&str])] = &[
        (
            "Coding/Development",
            &["code", "function", "error", "debug", "compile", "python", "rust", "javascript", "bug", "api", "git"],
        ),
        (
            "Data Analysis",
            &["data", "analysis", "chart", "dataset", "statistics", "query", "sql", "plot"],
        ),
        (
            "Writing",
            &["write", "writing", "essay", "draft", "edit", "article", "blog", "email"],
        ),
        (
            "Research",
            &["research", "paper", "study", "literature", "source", "evidence"],
        ),
        (
            "Learning",
            &["learn", "explain", "understand", "tutorial", "example", "difference"],
        ),
        (
            "Creative",
            &["story", "poem", "creative", "character", "fiction", "lyrics"],
        ),
        (
            "Business",
            &["business", "market", "strategy", "customer", "product", "revenue"],
        ),
        (
            "Technical Documentation",
            &["readme", "documentation", "docs", "guide", "changelog"],
        ),
        (
            "System Administration",
            &["server", "deploy", "docker", "linux", "install", "config", "shell"],
        ),
    ];

    let lower = text.to_lowercase();
    let mut best = GENERAL_TOPIC;
    let mut best_score = 0usize;
    for (topic, keywords) in KEYWORD_TOPICS {
        let score = keywords.iter().filter(|kw| lower.contains(*kw)).count();
        if score > best_score {
            best_score = score;
            best = topic;
        }
    }
    best
}

/// Capitalize the first letter of every alphabetic run ("rust code / tests"
/// becomes "Rust Code / Tests").
fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev_alpha = false;
    for ch in s.chars() {
        if ch.is_ascii_alphabetic() && !prev_alpha {
            out.push(ch.to_ascii_uppercase());
        } else {
            out.push(ch);
        }
        prev_alpha = ch.is_ascii_alphabetic();
    }
    out
}

fn kmeans_plus_plus_init(rows: &[Vec<f64>], k: usize, rng: &mut SplitMix64) -> Vec<Vec<f64>> {
    let mut centroids: Vec<Vec<f64>> = Vec::with_capacity(k);
    if rows.is_empty() {
        return centroids;
    }
    centroids.push(rows[rng.gen_index(rows.len())].clone());

    let mut dists: Vec<f64> = rows
        .iter()
        .map(|row| squared_distance(row, &centroids[0]))
        .collect();

    while centroids.len() < k {
        let total: f64 = dists.iter().sum();
        let next = if total <= f64::EPSILON {
            rng.gen_index(rows.len())
        } else {
            let mut target = rng.next_f64() * total;
            let mut chosen = rows.len() - 1;
            for (i, d) in dists.iter().enumerate() {
                target -= d;
                if target <= 0.0 {
                    chosen = i;
                    break;
                }
            }
            chosen
        };
        let candidate = rows[next].clone();
        for (i, row) in rows.iter().enumerate() {
            let d = squared_distance(row, &candidate);
            if d < dists[i] {
                dists[i] = d;
            }
        }
        centroids.push(candidate);
    }
    centroids
}

fn nearest_centroid(row: &[f64], centroids: &[Vec<f64>]) -> usize {
    let mut best = 0;
    let mut best_dist = f64::INFINITY;
    for (c, centroid) in centroids.iter().enumerate() {
        let d = squared_distance(row, centroid);
        if d < best_dist {
            best_dist = d;
            best = c;
        }
    }
    best
}

fn farthest_point(rows: &[Vec<f64>], labels: &[usize], centroids: &[Vec<f64>]) -> usize {
    let mut best = 0;
    let mut best_dist = -1.0;
    for (i, row) in rows.iter().enumerate() {
        let d = squared_distance(row, &centroids[labels[i]]);
        if d > best_dist {
            best_dist = d;
            best = i;
        }
    }
    best
}

fn squared_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y) * (x - y)).sum()
}

/// Small deterministic PRNG so clustering is reproducible without pulling in
/// a random-number crate for one seeded shuffle.
struct SplitMix64(u64);

impl SplitMix64 {
    fn new(seed: u64) -> Self {
        Self(seed)
    }

    fn next_u64(&mut self) -> u64 {
        self.0 = self.0.wrapping_add(0x9E37_79B9_7F4A_7C15);
        let mut z = self.0;
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        z ^ (z >> 31)
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    fn gen_index(&mut self, n: usize) -> usize {
        (self.next_u64() % n as u64) as usize
    }
}
