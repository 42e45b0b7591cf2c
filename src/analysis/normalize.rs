//! Text normalization ahead of vectorization.
//!
//! Dates, timestamps, UUIDs, file paths, and bare numbers are high-frequency
//! but semantically empty for topic discovery; left in place they dominate the
//! term weights. Each is replaced with a single space, then whitespace is
//! collapsed. `clean` is idempotent on already-clean input.

use regex::Regex;

pub struct Normalizer {
    iso_datetime: Regex,
    iso_date: Regex,
    unix_timestamp: Regex,
    uuid: Regex,
    file_path: Regex,
    bare_number: Regex,
    whitespace: Regex,
}

impl Normalizer {
    pub fn new() -> Self {
        Self {
            iso_datetime: Regex::new(r"\d{4}-\d{2}-\d{2}[T ]\d{2}:\d{2}:\d{2}[.\d]*Z?").unwrap(),
            iso_date: Regex::new(r"\d{4}-\d{2}-\d{2}").unwrap(),
            // 10+ digit integers are almost always epoch timestamps
            unix_timestamp: Regex::new(r"\b\d{10,}\b").unwrap(),
            uuid: Regex::new(
                r"(?i)[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}",
            )
            .unwrap(),
            file_path: Regex::new(r"(/[a-zA-Z0-9_.-]+)+").unwrap(),
            bare_number: Regex::new(r"\b\d+\b").unwrap(),
            whitespace: Regex::new(r"\s+").unwrap(),
        }
    }

    /// Strip noise tokens and collapse whitespace. Substitution order matters:
    /// full datetimes before bare dates, timestamps and UUIDs before the
    /// catch-all number pass.
    pub fn clean(&self, text: &str) -> String {
        let text = self.iso_datetime.replace_all(text, " ");
        let text = self.iso_date.replace_all(&text, " ");
        let text = self.unix_timestamp.replace_all(&text, " ");
        let text = self.uuid.replace_all(&text, " ");
        let text = self.file_path.replace_all(&text, " ");
        let text = self.bare_number.replace_all(&text, " ");
        let text = self.whitespace.replace_all(&text, " ");
        text.trim().to_string()
    }
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_removes_iso_datetimes_and_dates() {
        let n = Normalizer::new();
        let cleaned = n.clean("done at 2024-05-01T12:30:00.123Z on 2024-05-01 ok");
        assert_eq!(cleaned, "done at on ok");
    }

    #[test]
    fn test_removes_unix_timestamps_and_numbers() {
        let n = Normalizer::new();
        assert_eq!(n.clean("ts 1700000000 count 42 word"), "ts count word");
    }

    #[test]
    fn test_removes_uuids_case_insensitive() {
        let n = Normalizer::new();
        let cleaned = n.clean("id 550E8400-e29b-41d4-A716-446655440000 end");
        assert_eq!(cleaned, "id end");
    }

    #[test]
    fn test_removes_file_paths() {
        let n = Normalizer::new();
        let cleaned = n.clean("open /usr/local/bin/tool please");
        assert_eq!(cleaned, "open please");
    }

    #[test]
    fn test_collapses_whitespace() {
        let n = Normalizer::new();
        assert_eq!(n.clean("  a \t b \n c  "), "a b c");
    }

    #[test]
    fn test_idempotent() {
        let n = Normalizer::new();
        let samples = [
            "fix the rust borrow checker error in /src/main.rs at 2024-01-01",
            "plain text with no noise at all",
            "",
            "   ",
            "uuid 550e8400-e29b-41d4-a716-446655440000 ts 1700000000",
        ];
        for sample in samples {
            let once = n.clean(sample);
            assert_eq!(n.clean(&once), once, "not idempotent for {sample:?}");
        }
    }
}
