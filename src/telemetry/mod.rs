//! Query telemetry: records, sinks and the buffer that batches them.

pub mod buffer;
pub mod record;
pub mod sink;

pub use buffer::{FlushOutcome, TelemetryBuffer, TelemetryConfig, TelemetryStats};
pub use record::TelemetryRecord;
pub use sink::{CsvSink, HttpSink, LogSummary, TelemetrySink};
