use chrono::{DateTime, Local};

use crate::text_util::truncate_chars;

pub const QUERY_MAX_CHARS: usize = 80;
pub const CORPUS_MAX_CHARS: usize = 20;
pub const PATH_MAX_CHARS: usize = 30;

/// Timestamp layout used by every sink.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Column names, in the order produced by [`TelemetryRecord::fields`].
pub const COLUMNS: [&str; 6] =
    ["Timestamp", "Query", "Language", "Corpus", "Confidence", "Path"];

/// One served query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetryRecord {
    pub timestamp: DateTime<Local>,
    pub query: String,
    pub language: String,
    /// Empty for cross-corpus queries.
    pub corpus: String,
    pub confidence: u8,
    pub path: String,
}

impl TelemetryRecord {
    /// Build a record stamped with the current local time. Long fields
    /// are cut to their column limits.
    pub fn new(
        query: &str,
        language: &str,
        corpus: &str,
        confidence: u8,
        path: &str,
    ) -> Self {
        Self::at(Local::now(), query, language, corpus, confidence, path)
    }

    pub fn at(
        timestamp: DateTime<Local>,
        query: &str,
        language: &str,
        corpus: &str,
        confidence: u8,
        path: &str,
    ) -> Self {
        Self {
            timestamp,
            query: truncate_chars(query, QUERY_MAX_CHARS).to_string(),
            language: language.to_string(),
            corpus: truncate_chars(corpus, CORPUS_MAX_CHARS).to_string(),
            confidence,
            path: truncate_chars(path, PATH_MAX_CHARS).to_string(),
        }
    }

    /// The record as a row of text cells, matching [`COLUMNS`].
    pub fn fields(&self) -> [String; 6] {
        [
            self.timestamp.format(TIMESTAMP_FORMAT).to_string(),
            self.query.clone(),
            self.language.clone(),
            self.corpus.clone(),
            self.confidence.to_string(),
            self.path.clone(),
        ]
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn long_fields_are_truncated() {
        let record = TelemetryRecord::new(
            &"q".repeat(200),
            "en",
            "A-very-long-corpus-name-indeed",
            80,
            &"p".repeat(64),
        );
        assert_eq!(record.query.chars().count(), QUERY_MAX_CHARS);
        assert_eq!(record.corpus, "A-very-long-corpus-n");
        assert_eq!(record.path.chars().count(), PATH_MAX_CHARS);
    }

    #[test]
    fn fields_follow_column_order() {
        let ts = Local.with_ymd_and_hms(2024, 3, 9, 14, 5, 0).unwrap();
        let record =
            TelemetryRecord::at(ts, "scope 3", "en", "ESRS", 92, "E1 > Scope 3");
        assert_eq!(
            record.fields(),
            [
                "2024-03-09 14:05:00".to_string(),
                "scope 3".to_string(),
                "en".to_string(),
                "ESRS".to_string(),
                "92".to_string(),
                "E1 > Scope 3".to_string(),
            ]
        );
    }
}
