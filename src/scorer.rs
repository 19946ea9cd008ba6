//! Fuzzy partial-ratio scoring with a memoizing cache.

use std::{collections::HashSet, sync::Arc};

use crate::{cache::BoundedCache, stats::Diagnostics};

/// Default number of memoized `(a, b)` pairs.
pub const DEFAULT_SCORE_CACHE: usize = 5000;

/// Case-insensitive partial similarity of two strings in `0..=100`.
///
/// The shorter string is aligned against every window of the longer one
/// (including windows hanging off either end) and the best Indel
/// similarity `2 * LCS / (len_a + len_b)` is kept. Empty input scores 0.
///
/// # Examples
///
/// ```
/// use clausemap::scorer::partial_ratio;
///
/// assert_eq!(partial_ratio("Scope 3", "scope 3 emissions"), 100);
/// assert_eq!(partial_ratio("", "anything"), 0);
/// assert!(partial_ratio("water", "wastewater discharge") > 90);
/// ```
pub fn partial_ratio(a: &str, b: &str) -> u8 {
    let a: Vec<char> = a.to_lowercase().chars().collect();
    let b: Vec<char> = b.to_lowercase().chars().collect();

    if a.is_empty() || b.is_empty() {
        return 0;
    }

    let best = match a.len().cmp(&b.len()) {
        std::cmp::Ordering::Less => best_alignment(&a, &b),
        std::cmp::Ordering::Greater => best_alignment(&b, &a),
        std::cmp::Ordering::Equal => {
            best_alignment(&a, &b).max(best_alignment(&b, &a))
        }
    };

    (best * 100.0).round().clamp(0.0, 100.0) as u8
}

/// Best similarity of `needle` against any window of `haystack`.
///
/// Requires `needle.len() <= haystack.len()`. Windows whose boundary
/// character does not occur in the needle are skipped; a neighbouring
/// window always scores at least as well.
fn best_alignment(needle: &[char], haystack: &[char]) -> f64 {
    let m = needle.len();
    let n = haystack.len();
    let chars: HashSet<char> = needle.iter().copied().collect();
    let mut best = 0.0_f64;

    // Windows that start before the haystack.
    for end in 1..m {
        if !chars.contains(&haystack[end - 1]) {
            continue;
        }
        best = best.max(indel_similarity(needle, &haystack[..end]));
        if best >= 1.0 {
            return 1.0;
        }
    }

    for start in 0..=(n - m) {
        if !chars.contains(&haystack[start + m - 1]) {
            continue;
        }
        best = best.max(indel_similarity(needle, &haystack[start..start + m]));
        if best >= 1.0 {
            return 1.0;
        }
    }

    // Windows that run past the end of the haystack.
    for start in (n - m + 1)..n {
        if !chars.contains(&haystack[start]) {
            continue;
        }
        best = best.max(indel_similarity(needle, &haystack[start..]));
        if best >= 1.0 {
            return 1.0;
        }
    }

    best
}

fn indel_similarity(a: &[char], b: &[char]) -> f64 {
    let total = a.len() + b.len();
    if total == 0 {
        return 0.0;
    }
    2.0 * lcs_len(a, b) as f64 / total as f64
}

fn lcs_len(a: &[char], b: &[char]) -> usize {
    let mut prev = vec![0usize; b.len() + 1];
    let mut curr = vec![0usize; b.len() + 1];

    for &ca in a {
        for (j, &cb) in b.iter().enumerate() {
            curr[j + 1] = if ca == cb {
                prev[j] + 1
            } else {
                curr[j].max(prev[j + 1])
            };
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}

/// Memoizing wrapper around [`partial_ratio`].
///
/// Keyed by the exact `(a, b)` pair, so `score(a, b)` and `score(b, a)`
/// occupy separate entries.
pub struct Scorer {
    cache: BoundedCache<(String, String), u8>,
    diagnostics: Arc<Diagnostics>,
}

impl Scorer {
    pub fn new(diagnostics: Arc<Diagnostics>) -> Self {
        Self::with_capacity(DEFAULT_SCORE_CACHE, diagnostics)
    }

    pub fn with_capacity(capacity: usize, diagnostics: Arc<Diagnostics>) -> Self {
        Self {
            cache: BoundedCache::new(capacity),
            diagnostics,
        }
    }

    pub fn score(&self, a: &str, b: &str) -> u8 {
        let key = (a.to_string(), b.to_string());
        if let Some(score) = self.cache.get(&key) {
            self.diagnostics.score_cache.hit();
            return score;
        }

        self.diagnostics.score_cache.miss();
        let score = partial_ratio(a, b);
        self.cache.insert(key, score);
        score
    }

    pub fn cached_entries(&self) -> usize {
        self.cache.len()
    }
}
