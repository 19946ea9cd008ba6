//! Process diagnostics: cache hit/miss counters and rolling timing windows.
//!
//! A single [`Diagnostics`] value is created by the caller and shared via
//! `Arc` with every component that reports into it, so tests can observe
//! one engine without cross-talk from another.

use std::{
    collections::{BTreeMap, VecDeque},
    sync::{
        Mutex,
        PoisonError,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use serde::Serialize;

/// Number of samples kept per timing metric.
pub const PERF_WINDOW: usize = 100;

pub const SEARCH_TIME: &str = "search_time";
pub const TRANSLATION_TIME: &str = "translation_time";
pub const SINK_WRITE_TIME: &str = "sink_write_time";

#[derive(Debug, Default)]
pub struct CacheCounters {
    hits: AtomicU64,
    misses: AtomicU64,
}

impl CacheCounters {
    pub fn hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> CacheSnapshot {
        CacheSnapshot {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CacheSnapshot {
    pub hits: u64,
    pub misses: u64,
}

impl CacheSnapshot {
    /// Hit rate in percent, or `None` before the first lookup.
    pub fn hit_rate(&self) -> Option<f64> {
        let total = self.hits + self.misses;
        (total > 0).then(|| self.hits as f64 * 100.0 / total as f64)
    }
}

#[derive(Debug, Default)]
pub struct Diagnostics {
    pub score_cache: CacheCounters,
    pub translation_cache: CacheCounters,
    timings: Mutex<BTreeMap<&'static str, VecDeque<f64>>>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one timing sample in milliseconds, keeping the most recent
    /// [`PERF_WINDOW`] samples per metric.
    pub fn record_timing(&self, metric: &'static str, elapsed: Duration) {
        let mut timings =
            self.timings.lock().unwrap_or_else(PoisonError::into_inner);
        let window = timings.entry(metric).or_default();
        window.push_back(elapsed.as_secs_f64() * 1000.0);
        while window.len() > PERF_WINDOW {
            window.pop_front();
        }
    }

    /// Average of the retained samples for each metric, in milliseconds.
    pub fn timing_averages(&self) -> BTreeMap<&'static str, f64> {
        let timings =
            self.timings.lock().unwrap_or_else(PoisonError::into_inner);
        timings
            .iter()
            .filter(|(_, window)| !window.is_empty())
            .map(|(metric, window)| {
                (*metric, window.iter().sum::<f64>() / window.len() as f64)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hit_rate_none_before_lookups() {
        let counters = CacheCounters::default();
        assert_eq!(counters.snapshot().hit_rate(), None);
    }

    #[test]
    fn hit_rate_percent() {
        let counters = CacheCounters::default();
        counters.hit();
        counters.hit();
        counters.hit();
        counters.miss();
        let snap = counters.snapshot();
        assert_eq!(snap, CacheSnapshot { hits: 3, misses: 1 });
        assert_eq!(snap.hit_rate(), Some(75.0));
    }

    #[test]
    fn timing_window_is_bounded() {
        let diag = Diagnostics::new();
        for _ in 0..PERF_WINDOW {
            diag.record_timing(SEARCH_TIME, Duration::from_millis(100));
        }
        for _ in 0..PERF_WINDOW {
            diag.record_timing(SEARCH_TIME, Duration::from_millis(10));
        }

        let avg = diag.timing_averages()[SEARCH_TIME];
        assert!((avg - 10.0).abs() < 1e-6, "old samples should roll off");
    }

    #[test]
    fn metrics_are_kept_separately() {
        let diag = Diagnostics::new();
        diag.record_timing(SEARCH_TIME, Duration::from_millis(4));
        diag.record_timing(TRANSLATION_TIME, Duration::from_millis(8));

        let averages = diag.timing_averages();
        assert_eq!(averages.len(), 2);
        assert!((averages[TRANSLATION_TIME] - 8.0).abs() < 1e-6);
    }
}
