use std::time::Duration;

use crate::{
    error::{Error, Result},
    telemetry::TelemetryConfig,
    traverse::DEFAULT_MAX_DEPTH,
};

/// Runtime settings read from `CLAUSEMAP_*` environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Whether served queries are recorded.
    pub telemetry: bool,
    /// Primary telemetry store. Without it records go to the local log.
    pub sink_url: Option<String>,
    /// LibreTranslate compatible endpoint. Without it queries are never
    /// translated.
    pub translate_url: Option<String>,
    pub translate_api_key: Option<String>,
    pub target_language: String,
    /// Periodic telemetry flush interval.
    pub flush_interval: Duration,
    pub max_depth: usize,
    /// Timeout for every outgoing HTTP request.
    pub http_timeout: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            telemetry: true,
            sink_url: None,
            translate_url: None,
            translate_api_key: None,
            target_language: "en".to_string(),
            flush_interval: TelemetryConfig::default().flush_interval,
            max_depth: DEFAULT_MAX_DEPTH,
            http_timeout: Duration::from_secs(10),
        }
    }
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut settings = Self::default();
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(val) = var("CLAUSEMAP_TELEMETRY") {
            settings.telemetry = parse_flag("CLAUSEMAP_TELEMETRY", &val)?;
        }
        if let Some(url) = var("CLAUSEMAP_SINK_URL") {
            settings.sink_url = Some(url);
        }
        if let Some(url) = var("CLAUSEMAP_TRANSLATE_URL") {
            settings.translate_url = Some(url);
        }
        if let Some(key) = var("CLAUSEMAP_TRANSLATE_API_KEY") {
            settings.translate_api_key = Some(key);
        }
        if let Some(lang) = var("CLAUSEMAP_TARGET_LANGUAGE") {
            settings.target_language = lang.trim().to_lowercase();
        }
        if let Some(val) = var("CLAUSEMAP_FLUSH_INTERVAL_SECS") {
            let secs: u64 = parse_number("CLAUSEMAP_FLUSH_INTERVAL_SECS", &val)?;
            settings.flush_interval = Duration::from_secs(secs.max(1));
        }
        if let Some(val) = var("CLAUSEMAP_MAX_DEPTH") {
            settings.max_depth = parse_number("CLAUSEMAP_MAX_DEPTH", &val)?;
        }
        if let Some(val) = var("CLAUSEMAP_HTTP_TIMEOUT_SECS") {
            let secs: u64 = parse_number("CLAUSEMAP_HTTP_TIMEOUT_SECS", &val)?;
            settings.http_timeout = Duration::from_secs(secs.max(1));
        }

        Ok(settings)
    }

    pub fn telemetry_config(&self) -> TelemetryConfig {
        TelemetryConfig {
            flush_interval: self.flush_interval,
            ..TelemetryConfig::default()
        }
    }
}

fn parse_flag(key: &str, val: &str) -> Result<bool> {
    match val.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(Error::Config(format!("{key}: expected a boolean, got '{val}'"))),
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, val: &str) -> Result<T> {
    val.trim().parse().map_err(|_| {
        Error::Config(format!("{key}: expected a number, got '{val}'"))
    })
}
