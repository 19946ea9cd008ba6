//! Bounded in-memory telemetry buffer with a background flusher.
//!
//! Recording never blocks on I/O: records are appended under a short lock
//! and persisted later by the flusher thread, by an explicit
//! [`TelemetryBuffer::flush`], or by the final drain in
//! [`TelemetryBuffer::shutdown`].
//!
//! Writes go to the primary sink until it fails once. From then on every
//! batch, including the one that failed, goes to the fallback sink.

use std::{
    sync::{
        Arc,
        Condvar,
        Mutex,
        MutexGuard,
        PoisonError,
        TryLockError,
        atomic::{AtomicBool, AtomicU64, Ordering},
    },
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

use serde::Serialize;

use super::{record::TelemetryRecord, sink::TelemetrySink};
use crate::{
    error::Result,
    stats::{Diagnostics, SINK_WRITE_TIME},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TelemetryConfig {
    /// Maximum number of pending records.
    pub capacity: usize,
    /// Pending length right after an eviction.
    pub low_watermark: usize,
    /// Pending length at which a flush is scheduled.
    pub flush_trigger: usize,
    /// Minimum time between two scheduled flushes.
    pub min_flush_interval: Duration,
    /// The flusher also runs this often regardless of load.
    pub flush_interval: Duration,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            capacity: 50,
            low_watermark: 25,
            flush_trigger: 5,
            min_flush_interval: Duration::from_secs(5),
            flush_interval: Duration::from_secs(30),
        }
    }
}

/// What a call to [`TelemetryBuffer::flush`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushOutcome {
    /// Nothing was pending.
    Idle,
    /// Another flush was already writing.
    Busy,
    /// The batch of this size went to the primary sink.
    Primary(usize),
    /// The batch of this size went to the fallback sink.
    Fallback(usize),
    /// Both sinks failed; the batch of this size was lost.
    Dropped(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TelemetryStats {
    pub pending: usize,
    pub primary_flushes: u64,
    pub fallback_flushes: u64,
    pub scheduled_flushes: u64,
    pub evicted: u64,
    pub dropped: u64,
    pub primary_active: bool,
}

struct Shared {
    config: TelemetryConfig,
    pending: Mutex<Vec<TelemetryRecord>>,
    last_scheduled: Mutex<Option<Instant>>,
    primary: Option<Box<dyn TelemetrySink>>,
    primary_active: AtomicBool,
    fallback: Box<dyn TelemetrySink>,
    /// Held for the whole write phase of a flush.
    write_gate: Mutex<()>,
    wake: Mutex<bool>,
    wake_signal: Condvar,
    shutdown: AtomicBool,
    diagnostics: Arc<Diagnostics>,
    primary_flushes: AtomicU64,
    fallback_flushes: AtomicU64,
    scheduled_flushes: AtomicU64,
    evicted: AtomicU64,
    dropped: AtomicU64,
}

/// Buffers telemetry records and persists them in batches.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
///
/// use clausemap::{
///     stats::Diagnostics,
///     telemetry::{CsvSink, FlushOutcome, TelemetryBuffer, TelemetryConfig},
/// };
///
/// let dir = tempfile::tempdir().unwrap();
/// let buffer = TelemetryBuffer::new(
///     TelemetryConfig::default(),
///     None,
///     Box::new(CsvSink::new(dir.path().join("queries.csv"))),
///     Arc::new(Diagnostics::new()),
/// );
///
/// buffer.record_query("scope 3", "en", "ESRS", 92, "Emissions > Scope 3");
/// assert_eq!(buffer.flush(), FlushOutcome::Fallback(1));
/// assert_eq!(buffer.flush(), FlushOutcome::Idle);
/// ```
pub struct TelemetryBuffer {
    shared: Arc<Shared>,
    flusher: Mutex<Option<JoinHandle<()>>>,
}

impl TelemetryBuffer {
    /// Without a primary sink every batch goes to `fallback`.
    pub fn new(
        config: TelemetryConfig,
        primary: Option<Box<dyn TelemetrySink>>,
        fallback: Box<dyn TelemetrySink>,
        diagnostics: Arc<Diagnostics>,
    ) -> Self {
        let config = TelemetryConfig {
            capacity: config.capacity.max(1),
            low_watermark: config.low_watermark.clamp(1, config.capacity.max(1)),
            ..config
        };
        let primary_active = primary.is_some();

        Self {
            shared: Arc::new(Shared {
                config,
                pending: Mutex::new(Vec::with_capacity(config.capacity)),
                last_scheduled: Mutex::new(None),
                primary,
                primary_active: AtomicBool::new(primary_active),
                fallback,
                write_gate: Mutex::new(()),
                wake: Mutex::new(false),
                wake_signal: Condvar::new(),
                shutdown: AtomicBool::new(false),
                diagnostics,
                primary_flushes: AtomicU64::new(0),
                fallback_flushes: AtomicU64::new(0),
                scheduled_flushes: AtomicU64::new(0),
                evicted: AtomicU64::new(0),
                dropped: AtomicU64::new(0),
            }),
            flusher: Mutex::new(None),
        }
    }

    /// Start the background flusher thread. Calling it twice is a no-op.
    pub fn start(&self) -> Result<()> {
        let mut flusher = lock(&self.flusher);
        if flusher.is_some() {
            return Ok(());
        }

        let shared = Arc::clone(&self.shared);
        let handle = thread::Builder::new()
            .name("telemetry-flush".to_string())
            .spawn(move || shared.run_flusher())?;
        *flusher = Some(handle);
        Ok(())
    }

    pub fn record(&self, record: TelemetryRecord) {
        self.shared.record(record);
    }

    pub fn record_query(
        &self,
        query: &str,
        language: &str,
        corpus: &str,
        confidence: u8,
        path: &str,
    ) {
        self.record(TelemetryRecord::new(
            query, language, corpus, confidence, path,
        ));
    }

    /// Write everything pending now, on the calling thread.
    pub fn flush(&self) -> FlushOutcome {
        self.shared.flush()
    }

    /// Stop the flusher and drain whatever is still pending.
    pub fn shutdown(&self) -> FlushOutcome {
        if !self.shared.shutdown.swap(true, Ordering::SeqCst) {
            self.shared.wake();
        }

        if let Some(handle) = lock(&self.flusher).take()
            && handle.join().is_err()
        {
            tracing::warn!("telemetry flusher thread panicked");
        }

        self.shared.flush()
    }

    pub fn stats(&self) -> TelemetryStats {
        let s = &self.shared;
        TelemetryStats {
            pending: lock(&s.pending).len(),
            primary_flushes: s.primary_flushes.load(Ordering::Relaxed),
            fallback_flushes: s.fallback_flushes.load(Ordering::Relaxed),
            scheduled_flushes: s.scheduled_flushes.load(Ordering::Relaxed),
            evicted: s.evicted.load(Ordering::Relaxed),
            dropped: s.dropped.load(Ordering::Relaxed),
            primary_active: s.primary_active.load(Ordering::SeqCst),
        }
    }
}

impl Drop for TelemetryBuffer {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl Shared {
    fn record(&self, record: TelemetryRecord) {
        let schedule = {
            let mut pending = lock(&self.pending);
            if pending.len() >= self.config.capacity {
                // Leave room so the length after the push equals the
                // low watermark.
                let excess = pending.len() + 1 - self.config.low_watermark;
                pending.drain(..excess);
                self.evicted.fetch_add(excess as u64, Ordering::Relaxed);
                tracing::debug!(excess, "telemetry buffer full, evicted oldest");
            }
            pending.push(record);
            pending.len() >= self.config.flush_trigger && self.claim_flush_slot()
        };

        if schedule {
            self.scheduled_flushes.fetch_add(1, Ordering::Relaxed);
            self.wake();
        }
    }

    fn claim_flush_slot(&self) -> bool {
        let mut last = lock(&self.last_scheduled);
        let due = match *last {
            Some(at) => at.elapsed() >= self.config.min_flush_interval,
            None => true,
        };
        if due {
            *last = Some(Instant::now());
        }
        due
    }

    fn wake(&self) {
        *lock(&self.wake) = true;
        self.wake_signal.notify_one();
    }

    fn run_flusher(&self) {
        loop {
            let guard = lock(&self.wake);
            let (mut woken, _) = self
                .wake_signal
                .wait_timeout_while(guard, self.config.flush_interval, |w| {
                    !*w
                })
                .unwrap_or_else(PoisonError::into_inner);
            *woken = false;
            drop(woken);

            if self.shutdown.load(Ordering::SeqCst) {
                break;
            }
            self.flush();
        }
    }

    fn flush(&self) -> FlushOutcome {
        let _gate = match self.write_gate.try_lock() {
            Ok(gate) => gate,
            Err(TryLockError::Poisoned(e)) => e.into_inner(),
            Err(TryLockError::WouldBlock) => return FlushOutcome::Busy,
        };

        let batch = std::mem::take(&mut *lock(&self.pending));
        if batch.is_empty() {
            return FlushOutcome::Idle;
        }
        let count = batch.len();

        if let Some(primary) = &self.primary
            && self.primary_active.load(Ordering::SeqCst)
        {
            let started = Instant::now();
            match primary.append_batch(&batch) {
                Ok(()) => {
                    self.diagnostics
                        .record_timing(SINK_WRITE_TIME, started.elapsed());
                    self.primary_flushes.fetch_add(1, Ordering::Relaxed);
                    tracing::debug!(count, sink = primary.name(), "flushed telemetry");
                    return FlushOutcome::Primary(count);
                }
                Err(e) => {
                    self.primary_active.store(false, Ordering::SeqCst);
                    tracing::warn!(
                        sink = primary.name(),
                        "telemetry sink failed, switching to {}: {e}",
                        self.fallback.name()
                    );
                }
            }
        }

        let started = Instant::now();
        match self.fallback.append_batch(&batch) {
            Ok(()) => {
                self.diagnostics
                    .record_timing(SINK_WRITE_TIME, started.elapsed());
                self.fallback_flushes.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(count, sink = self.fallback.name(), "flushed telemetry");
                FlushOutcome::Fallback(count)
            }
            Err(e) => {
                self.dropped.fetch_add(count as u64, Ordering::Relaxed);
                tracing::error!(
                    sink = self.fallback.name(),
                    count,
                    "telemetry fallback failed, records lost: {e}"
                );
                FlushOutcome::Dropped(count)
            }
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
