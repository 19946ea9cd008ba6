//! Language detection and translation contracts.
//!
//! The normalizer only depends on the two traits below. A LibreTranslate
//! compatible HTTP service implements both; without one configured the
//! engine runs with [`FixedLanguage`] and never translates.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub trait LanguageDetector: Send + Sync {
    /// Return an ISO 639-1 code for `text`.
    fn detect(&self, text: &str) -> Result<String>;
}

pub trait Translator: Send + Sync {
    /// Translate `text` into the `target` language.
    fn translate(&self, text: &str, target: &str) -> Result<String>;
}

/// Detector that reports the same language for every input.
#[derive(Debug, Clone)]
pub struct FixedLanguage(pub String);

impl Default for FixedLanguage {
    fn default() -> Self {
        Self("en".to_string())
    }
}

impl LanguageDetector for FixedLanguage {
    fn detect(&self, _text: &str) -> Result<String> {
        Ok(self.0.clone())
    }
}

/// Translator that returns its input unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct Passthrough;

impl Translator for Passthrough {
    fn translate(&self, text: &str, _target: &str) -> Result<String> {
        Ok(text.to_string())
    }
}

const SERVICE: &str = "translation";

/// Blocking client for a LibreTranslate compatible API.
#[derive(Clone)]
pub struct LibreTranslate {
    client: reqwest::blocking::Client,
    base_url: String,
    api_key: Option<String>,
}

#[derive(Serialize)]
struct DetectRequest<'a> {
    q: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    api_key: Option<&'a str>,
}

#[derive(Deserialize)]
struct Detection {
    language: String,
    #[serde(default)]
    confidence: f64,
}

#[derive(Serialize)]
struct TranslateRequest<'a> {
    q: &'a str,
    source: &'a str,
    target: &'a str,
    format: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    api_key: Option<&'a str>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TranslateResponse {
    translated_text: String,
}

impl LibreTranslate {
    pub fn new(
        base_url: &str,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client =
            reqwest::blocking::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    fn post<B: Serialize, R: for<'de> Deserialize<'de>>(
        &self,
        endpoint: &str,
        body: &B,
    ) -> Result<R> {
        let url = format!("{}/{endpoint}", self.base_url);
        let resp = self.client.post(&url).json(body).send()?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().unwrap_or_default();
            return Err(Error::Service {
                service: SERVICE,
                message: format!("{url} returned {status}: {body}"),
            });
        }

        Ok(resp.json()?)
    }
}

impl LanguageDetector for LibreTranslate {
    fn detect(&self, text: &str) -> Result<String> {
        let detections: Vec<Detection> = self.post(
            "detect",
            &DetectRequest {
                q: text,
                api_key: self.api_key.as_deref(),
            },
        )?;

        best_detection(detections).ok_or_else(|| Error::Service {
            service: SERVICE,
            message: "detector returned no candidates".to_string(),
        })
    }
}

impl Translator for LibreTranslate {
    fn translate(&self, text: &str, target: &str) -> Result<String> {
        let resp: TranslateResponse = self.post(
            "translate",
            &TranslateRequest {
                q: text,
                source: "auto",
                target,
                format: "text",
                api_key: self.api_key.as_deref(),
            },
        )?;
        Ok(resp.translated_text)
    }
}

fn best_detection(detections: Vec<Detection>) -> Option<String> {
    detections
        .into_iter()
        .max_by(|a, b| {
            a.confidence
                .partial_cmp(&b.confidence)
                .unwrap_or(std::cmp::Ordering::Equal)
        })
        .map(|d| d.language)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_language_defaults_to_english() {
        assert_eq!(FixedLanguage::default().detect("hola mundo").unwrap(), "en");
    }

    #[test]
    fn passthrough_returns_input() {
        assert_eq!(Passthrough.translate("agua", "en").unwrap(), "agua");
    }

    #[test]
    fn best_detection_picks_highest_confidence() {
        let detections: Vec<Detection> = serde_json::from_str(
            r#"[{"language":"es","confidence":40.0},
                {"language":"pt","confidence":85.5}]"#,
        )
        .unwrap();
        assert_eq!(best_detection(detections).as_deref(), Some("pt"));
    }

    #[test]
    fn best_detection_empty() {
        assert_eq!(best_detection(Vec::new()), None);
    }

    #[test]
    fn translate_response_field_name() {
        let resp: TranslateResponse =
            serde_json::from_str(r#"{"translatedText":"water management"}"#)
                .unwrap();
        assert_eq!(resp.translated_text, "water management");
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let client = LibreTranslate::new(
            "http://localhost:5000/",
            None,
            Duration::from_secs(2),
        )
        .unwrap();
        assert_eq!(client.base_url, "http://localhost:5000");
    }

    #[test]
    fn unreachable_service_is_an_error() {
        // Port 9 (discard) on localhost is not an HTTP server.
        let client = LibreTranslate::new(
            "http://127.0.0.1:9",
            None,
            Duration::from_millis(500),
        )
        .unwrap();
        assert!(client.detect("bonjour le monde").is_err());
    }
}
