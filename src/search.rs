use std::{
    collections::{BTreeMap, HashMap},
    sync::Arc,
    time::Instant,
};

use rayon::prelude::*;
use serde::Serialize;

use crate::{
    corpus::{Corpus, CorpusSet},
    error::Result,
    expand::ConceptTable,
    normalize::{Normalized, Normalizer},
    scorer::Scorer,
    stats::{Diagnostics, SEARCH_TIME},
    text_util::{confidence_label, display_path, flatten_payload, truncate_chars},
    traverse::{DEFAULT_MAX_DEPTH, Match, Traversal},
};

/// Default number of results for a single-corpus search.
pub const DEFAULT_LIMIT: usize = 3;

/// Default number of results per corpus for a cross-corpus search.
pub const DEFAULT_PER_CORPUS_LIMIT: usize = 2;

/// Only the leading expansion variants are searched.
pub const SEARCHED_VARIANTS: usize = 2;

/// Raw scores are divided by this (after scaling by 100) to land in
/// `0..=100`. A boosted key match scores at most 120.
pub const SCORE_DIVISOR: u32 = 130;

/// A scored, deduplicated search hit ready for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RankedResult {
    /// Confidence in `0..=100`.
    pub score: u8,
    pub path: String,
    pub content: String,
    pub depth: usize,
    pub corpus: String,
}

/// Map a boosted raw score onto `0..=100`, truncating.
///
/// # Examples
///
/// ```
/// use clausemap::search::normalize_score;
///
/// assert_eq!(normalize_score(90), 69);
/// assert_eq!(normalize_score(120), 92);
/// assert_eq!(normalize_score(500), 100);
/// ```
pub fn normalize_score(raw: u32) -> u8 {
    (raw.saturating_mul(100) / SCORE_DIVISOR).min(100) as u8
}

/// Multi-corpus fuzzy search.
///
/// Every entry point normalizes the query, expands it with the concept
/// table, walks each corpus for the leading variants, then deduplicates
/// by path and ranks by score. Input problems (empty query, unknown
/// corpus) produce empty results rather than errors.
pub struct SearchEngine {
    corpora: Arc<CorpusSet>,
    concepts: Arc<ConceptTable>,
    normalizer: Normalizer,
    scorer: Scorer,
    diagnostics: Arc<Diagnostics>,
    max_depth: usize,
}

impl SearchEngine {
    pub fn new(
        corpora: Arc<CorpusSet>,
        concepts: Arc<ConceptTable>,
        normalizer: Normalizer,
        diagnostics: Arc<Diagnostics>,
    ) -> Self {
        Self {
            corpora,
            concepts,
            normalizer,
            scorer: Scorer::new(diagnostics.clone()),
            diagnostics,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn corpora(&self) -> &CorpusSet {
        &self.corpora
    }

    pub fn concepts(&self) -> &ConceptTable {
        &self.concepts
    }

    pub fn diagnostics(&self) -> &Arc<Diagnostics> {
        &self.diagnostics
    }

    pub fn scorer(&self) -> &Scorer {
        &self.scorer
    }

    pub fn target_language(&self) -> &str {
        self.normalizer.target_language()
    }

    pub fn normalize(&self, raw: &str) -> Normalized {
        self.normalizer.normalize(raw)
    }

    /// Up to `limit` results from one corpus, best first.
    pub fn search_one(
        &self,
        corpus: &str,
        query: &str,
        limit: usize,
    ) -> Vec<RankedResult> {
        self.search_one_normalized(corpus, &self.normalize(query), limit)
    }

    pub fn search_one_normalized(
        &self,
        corpus: &str,
        query: &Normalized,
        limit: usize,
    ) -> Vec<RankedResult> {
        if query.is_empty() {
            return Vec::new();
        }
        let Some(corpus) = self.corpora.get(corpus) else {
            tracing::debug!("unknown corpus '{corpus}'");
            return Vec::new();
        };
        self.rank(corpus, &query.text, limit)
    }

    /// Up to `per_corpus_limit` results from every corpus that has any,
    /// keyed by corpus name. Corpora are searched in parallel.
    pub fn search_all(
        &self,
        query: &str,
        per_corpus_limit: usize,
    ) -> BTreeMap<String, Vec<RankedResult>> {
        self.search_all_normalized(&self.normalize(query), per_corpus_limit)
    }

    pub fn search_all_normalized(
        &self,
        query: &Normalized,
        per_corpus_limit: usize,
    ) -> BTreeMap<String, Vec<RankedResult>> {
        if query.is_empty() {
            return BTreeMap::new();
        }
        self.corpora
            .as_slice()
            .par_iter()
            .map(|corpus| {
                let results = self.rank(corpus, &query.text, per_corpus_limit);
                (corpus.name().to_string(), results)
            })
            .filter(|(_, results)| !results.is_empty())
            .collect()
    }

    /// The single best result across all corpora. An earlier corpus wins
    /// a tie.
    pub fn best_match(&self, query: &str) -> Option<RankedResult> {
        self.best_match_normalized(&self.normalize(query))
    }

    pub fn best_match_normalized(
        &self,
        query: &Normalized,
    ) -> Option<RankedResult> {
        if query.is_empty() {
            return None;
        }
        let tops: Vec<Option<RankedResult>> = self
            .corpora
            .as_slice()
            .par_iter()
            .map(|corpus| self.rank(corpus, &query.text, 1).into_iter().next())
            .collect();

        tops.into_iter().flatten().fold(None, |best, candidate| match best {
            Some(best) if best.score >= candidate.score => Some(best),
            _ => Some(candidate),
        })
    }

    /// Search one corpus with an already normalized, non-empty query.
    fn rank(&self, corpus: &Corpus, query: &str, limit: usize) -> Vec<RankedResult> {
        if limit == 0 || corpus.is_empty() {
            return Vec::new();
        }
        let started = Instant::now();

        let names: Vec<&str> = self.corpora.names().collect();
        let expansion = self.concepts.expand(query, names.as_slice());
        let traversal = Traversal {
            max_depth: self.max_depth,
            ..Traversal::new(&self.scorer)
        };

        let mut ranked: Vec<(u8, Match<'_>)> = Vec::new();
        let mut by_path: HashMap<String, usize> = HashMap::new();
        for variant in expansion.leading(SEARCHED_VARIANTS) {
            for m in traversal.search(corpus.root(), variant) {
                let score = normalize_score(m.raw_score);
                match by_path.get(&m.path) {
                    Some(&i) => {
                        if score > ranked[i].0 {
                            ranked[i] = (score, m);
                        }
                    }
                    None => {
                        by_path.insert(m.path.clone(), ranked.len());
                        ranked.push((score, m));
                    }
                }
            }
        }

        // Stable: equal scores keep discovery order.
        ranked.sort_by(|a, b| b.0.cmp(&a.0));
        ranked.truncate(limit);

        let results: Vec<RankedResult> = ranked
            .into_iter()
            .map(|(score, m)| RankedResult {
                score,
                content: flatten_payload(m.payload),
                path: m.path,
                depth: m.depth,
                corpus: corpus.name().to_string(),
            })
            .collect();

        self.diagnostics.record_timing(SEARCH_TIME, started.elapsed());
        tracing::debug!(
            corpus = corpus.name(),
            query,
            hits = results.len(),
            "searched corpus"
        );
        results
    }
}

// -- Output formatting --

const CONTENT_PREVIEW_CHARS: usize = 160;

/// Format single-corpus results for the terminal.
pub fn format_human(results: &[RankedResult]) {
    if results.is_empty() {
        println!("No results found.");
        return;
    }

    for (i, r) in results.iter().enumerate() {
        print_result(i + 1, r);
    }
    println!("\n{} result(s)", results.len());
}

/// Format cross-corpus results for the terminal, one block per corpus.
pub fn format_grouped_human(groups: &BTreeMap<String, Vec<RankedResult>>) {
    if groups.is_empty() {
        println!("No results found.");
        return;
    }

    for (corpus, results) in groups {
        println!("{corpus}");
        for (i, r) in results.iter().enumerate() {
            print_result(i + 1, r);
        }
        println!();
    }
    println!("{} corpus(es) matched", groups.len());
}

fn print_result(rank: usize, r: &RankedResult) {
    println!(
        "{:>3}. [{:>3} {}] {}: {}",
        rank,
        r.score,
        confidence_label(r.score),
        r.corpus,
        display_path(&r.path, None)
    );
    if !r.content.is_empty() {
        println!("     {}", truncate_chars(&r.content, CONTENT_PREVIEW_CHARS));
    }
}

/// Format any result shape as a single JSON line.
pub fn format_json<T: Serialize>(query: &str, results: &T) -> Result<()> {
    let out = serde_json::json!({
        "query": query,
        "results": results,
    });
    println!("{}", serde_json::to_string(&out)?);
    Ok(())
}
