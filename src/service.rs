//! The query front door: search, then record what was served.

use std::collections::BTreeMap;

use crate::{
    normalize::Normalized,
    search::{RankedResult, SearchEngine},
    telemetry::{TelemetryBuffer, TelemetryStats},
};

/// Wraps a [`SearchEngine`] and records the best hit of every served
/// query. Queries that find nothing are not recorded.
pub struct QueryService {
    engine: SearchEngine,
    telemetry: Option<TelemetryBuffer>,
}

impl QueryService {
    pub fn new(engine: SearchEngine, telemetry: Option<TelemetryBuffer>) -> Self {
        Self { engine, telemetry }
    }

    pub fn engine(&self) -> &SearchEngine {
        &self.engine
    }

    pub fn search(
        &self,
        corpus: &str,
        query: &str,
        limit: usize,
    ) -> Vec<RankedResult> {
        let normalized = self.engine.normalize(query);
        let results =
            self.engine.search_one_normalized(corpus, &normalized, limit);
        if let Some(best) = results.first() {
            self.record(query, &normalized, best);
        }
        results
    }

    /// Search every corpus. One record is kept per corpus that matched.
    pub fn map(
        &self,
        query: &str,
        per_corpus_limit: usize,
    ) -> BTreeMap<String, Vec<RankedResult>> {
        let normalized = self.engine.normalize(query);
        let grouped =
            self.engine.search_all_normalized(&normalized, per_corpus_limit);
        for best in grouped.values().filter_map(|results| results.first()) {
            self.record(query, &normalized, best);
        }
        grouped
    }

    pub fn ask(&self, query: &str) -> Option<RankedResult> {
        let normalized = self.engine.normalize(query);
        let best = self.engine.best_match_normalized(&normalized);
        if let Some(best) = &best {
            self.record(query, &normalized, best);
        }
        best
    }

    pub fn telemetry_stats(&self) -> Option<TelemetryStats> {
        self.telemetry.as_ref().map(TelemetryBuffer::stats)
    }

    /// Drain pending telemetry. Also happens when the service is dropped.
    pub fn shutdown(&self) {
        if let Some(telemetry) = &self.telemetry {
            let outcome = telemetry.shutdown();
            tracing::debug!(?outcome, "telemetry drained");
        }
    }

    fn record(&self, query: &str, normalized: &Normalized, best: &RankedResult) {
        let Some(telemetry) = &self.telemetry else {
            return;
        };
        let language = normalized.language_or(self.engine.target_language());
        telemetry.record_query(
            query.trim(),
            language,
            &best.corpus,
            best.score,
            &best.path,
        );
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use serde_json::json;

    use super::*;
    use crate::{
        corpus::{Corpus, CorpusSet, Node},
        error::Result,
        expand::ConceptTable,
        normalize::Normalizer,
        stats::Diagnostics,
        telemetry::{TelemetryConfig, TelemetryRecord, TelemetrySink},
    };

    #[derive(Clone, Default)]
    struct Recording(Arc<Mutex<Vec<TelemetryRecord>>>);

    impl TelemetrySink for Recording {
        fn name(&self) -> &'static str {
            "recording"
        }

        fn append_batch(&self, records: &[TelemetryRecord]) -> Result<()> {
            self.0.lock().unwrap().extend_from_slice(records);
            Ok(())
        }
    }

    fn service(sink: &Recording) -> QueryService {
        let diag = Arc::new(Diagnostics::new());
        let corpora: CorpusSet = [
            Corpus::new(
                "ESRS",
                Node::from(json!({"Water": {"Withdrawal": "water withdrawal"}})),
            ),
            Corpus::new(
                "GRI",
                Node::from(json!({"Water": "Water and effluents"})),
            ),
        ]
        .into_iter()
        .collect();
        let engine = SearchEngine::new(
            Arc::new(corpora),
            Arc::new(ConceptTable::builtin()),
            Normalizer::monolingual("en", diag.clone()),
            diag.clone(),
        );
        let telemetry = TelemetryBuffer::new(
            TelemetryConfig::default(),
            None,
            Box::new(sink.clone()),
            diag,
        );
        QueryService::new(engine, Some(telemetry))
    }

    #[test]
    fn search_records_best_result() {
        let sink = Recording::default();
        let svc = service(&sink);

        let results = svc.search("ESRS", "  Water ", 3);
        assert!(!results.is_empty());
        svc.shutdown();

        let rows = sink.0.lock().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].query, "Water");
        assert_eq!(rows[0].language, "en");
        assert_eq!(rows[0].corpus, "ESRS");
        assert_eq!(rows[0].confidence, results[0].score);
        assert_eq!(rows[0].path, results[0].path);
    }

    #[test]
    fn map_records_one_row_per_matching_corpus() {
        let sink = Recording::default();
        let svc = service(&sink);

        let grouped = svc.map("water", 2);
        assert_eq!(grouped.len(), 2);
        svc.shutdown();

        let corpora: Vec<String> =
            sink.0.lock().unwrap().iter().map(|r| r.corpus.clone()).collect();
        assert_eq!(corpora, ["ESRS", "GRI"]);
    }

    #[test]
    fn misses_are_not_recorded() {
        let sink = Recording::default();
        let svc = service(&sink);

        assert!(svc.search("ESRS", "zzzz qqqq", 3).is_empty());
        assert!(svc.search("ISO", "water", 3).is_empty());
        assert!(svc.ask("").is_none());
        svc.shutdown();

        assert!(sink.0.lock().unwrap().is_empty());
    }

    #[test]
    fn ask_records_winning_corpus() {
        let sink = Recording::default();
        let svc = service(&sink);

        let best = svc.ask("withdrawal").expect("should match");
        assert_eq!(best.corpus, "ESRS");
        svc.shutdown();

        let rows = sink.0.lock().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].corpus, "ESRS");
    }

    #[test]
    fn works_without_telemetry() {
        let sink = Recording::default();
        let svc = service(&sink);
        let svc = QueryService::new(svc.engine, None);
        assert!(!svc.search("GRI", "water", 1).is_empty());
        assert!(svc.telemetry_stats().is_none());
    }
}
