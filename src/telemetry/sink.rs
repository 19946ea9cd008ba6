//! Durable destinations for telemetry batches.

use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
    sync::{Mutex, PoisonError},
    time::Duration,
};

use chrono::Local;
use serde::Serialize;

use super::record::{COLUMNS, TelemetryRecord};
use crate::{
    error::{Error, Result},
    text_util::truncate_chars,
};

/// Files larger than this are rotated before the next append.
pub const DEFAULT_ROTATE_BYTES: u64 = 5 * 1024 * 1024;

/// Maximum characters per sanitized CSV cell.
pub const FIELD_MAX_CHARS: usize = 100;

const ROTATION_SUFFIX_FORMAT: &str = "%Y%m%d_%H%M%S";

pub trait TelemetrySink: Send + Sync {
    fn name(&self) -> &'static str;

    /// Persist every record of `records`, or fail as a whole.
    fn append_batch(&self, records: &[TelemetryRecord]) -> Result<()>;
}

// -- Local CSV log --

/// What a [`CsvSink`] has persisted so far.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LogSummary {
    pub rows: usize,
    pub files: usize,
}

/// Append-only comma separated log with size-based rotation.
pub struct CsvSink {
    path: PathBuf,
    rotate_bytes: u64,
    write_lock: Mutex<()>,
}

impl CsvSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_rotation(path, DEFAULT_ROTATE_BYTES)
    }

    pub fn with_rotation(path: impl Into<PathBuf>, rotate_bytes: u64) -> Self {
        Self {
            path: path.into(),
            rotate_bytes,
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Count logged rows across the live file and its rotations.
    pub fn summary(&self) -> Result<LogSummary> {
        let header = COLUMNS.join(",");
        let mut summary = LogSummary::default();
        for file in self.log_files()? {
            let content = fs::read_to_string(&file)?;
            summary.files += 1;
            summary.rows += content
                .lines()
                .filter(|line| !line.is_empty() && *line != header)
                .count();
        }
        Ok(summary)
    }

    fn log_files(&self) -> Result<Vec<PathBuf>> {
        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Vec::new());
            }
            Err(e) => return Err(e.into()),
        };

        let stem = self
            .path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let prefix = format!("{stem}_");
        let extension = self.path.extension();
        let live = self.path.file_name();

        let mut files = Vec::new();
        for entry in entries {
            let entry = entry?;
            let path = entry.path();
            let name = entry.file_name();
            let current = Some(name.as_os_str()) == live;
            let rotated = name.to_string_lossy().starts_with(&prefix)
                && path.extension() == extension;
            if (current || rotated) && entry.file_type()?.is_file() {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }

    /// A failed rename is logged and the current file keeps growing.
    fn rotate_if_needed(&self) {
        let size = match fs::metadata(&self.path) {
            Ok(meta) => meta.len(),
            Err(_) => return,
        };
        if size <= self.rotate_bytes {
            return;
        }

        let suffix = Local::now().format(ROTATION_SUFFIX_FORMAT).to_string();
        let rotated = rotated_path(&self.path, &suffix);
        match fs::rename(&self.path, &rotated) {
            Ok(()) => tracing::info!(
                from = %self.path.display(),
                to = %rotated.display(),
                "rotated telemetry log"
            ),
            Err(e) => tracing::warn!(
                path = %self.path.display(),
                "failed to rotate telemetry log, appending in place: {e}"
            ),
        }
    }
}

impl TelemetrySink for CsvSink {
    fn name(&self) -> &'static str {
        "csv"
    }

    fn append_batch(&self, records: &[TelemetryRecord]) -> Result<()> {
        let _guard = self
            .write_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        self.rotate_if_needed();

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        let mut out = String::new();
        if file.metadata()?.len() == 0 {
            out.push_str(&COLUMNS.join(","));
            out.push('\n');
        }
        for record in records {
            let row: Vec<String> =
                record.fields().iter().map(|f| sanitize(f)).collect();
            out.push_str(&row.join(","));
            out.push('\n');
        }

        file.write_all(out.as_bytes())?;
        file.flush()?;
        Ok(())
    }
}

/// Make a value safe for one CSV cell.
pub fn sanitize(field: &str) -> String {
    let cleaned: String = field
        .chars()
        .filter(|&c| c != '\r')
        .map(|c| match c {
            ',' => ';',
            '\n' => ' ',
            c => c,
        })
        .collect();
    truncate_chars(&cleaned, FIELD_MAX_CHARS).to_string()
}

/// `dir/log.csv` -> `dir/log_<suffix>.csv`.
fn rotated_path(path: &Path, suffix: &str) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match path.extension() {
        Some(ext) => format!("{stem}_{suffix}.{}", ext.to_string_lossy()),
        None => format!("{stem}_{suffix}"),
    };
    path.with_file_name(name)
}

// -- Remote tabular store --

#[derive(Serialize)]
struct AppendRequest<'a> {
    batch_id: String,
    columns: &'a [&'a str],
    rows: Vec<[String; 6]>,
}

/// Appends batches to a remote tabular store over HTTP.
///
/// Each batch carries a fresh id so the store can drop a replayed
/// append.
pub struct HttpSink {
    client: reqwest::blocking::Client,
    url: String,
}

impl HttpSink {
    pub fn new(url: &str, timeout: Duration) -> Result<Self> {
        let client =
            reqwest::blocking::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: url.to_string(),
        })
    }
}

impl TelemetrySink for HttpSink {
    fn name(&self) -> &'static str {
        "http"
    }

    fn append_batch(&self, records: &[TelemetryRecord]) -> Result<()> {
        let body = AppendRequest {
            batch_id: uuid::Uuid::new_v4().to_string(),
            columns: &COLUMNS,
            rows: records.iter().map(TelemetryRecord::fields).collect(),
        };

        let resp = self.client.post(&self.url).json(&body).send()?;
        let status = resp.status();
        if !status.is_success() {
            return Err(Error::Sink {
                sink: self.name(),
                message: format!("{} returned {status}", self.url),
            });
        }
        Ok(())
    }
}
