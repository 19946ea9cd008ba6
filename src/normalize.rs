//! Query normalization: trim, detect language, translate, lower-case.
//!
//! Normalization never fails. When the detector or translator errors the
//! lower-cased input is returned and the reason is carried in
//! [`Outcome::Degraded`].

use std::{sync::Arc, time::Instant};

use crate::{
    cache::BoundedCache,
    stats::{Diagnostics, TRANSLATION_TIME},
    translate::{FixedLanguage, LanguageDetector, Passthrough, Translator},
};

/// Default number of memoized translations.
pub const DEFAULT_TRANSLATION_CACHE: usize = 1000;

/// Minimum number of whitespace-separated tokens before translating.
const MIN_TRANSLATION_TOKENS: usize = 2;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Input was empty or whitespace.
    Empty,
    /// Lower-cased input, no translation needed.
    Unchanged,
    /// Input was translated into the target language.
    Translated,
    /// A dependency failed; the lower-cased input was used instead.
    Degraded(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Normalized {
    pub text: String,
    /// Detected language, when detection succeeded.
    pub language: Option<String>,
    pub outcome: Outcome,
}

impl Normalized {
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// The detected language, or `fallback` when detection failed.
    pub fn language_or<'a>(&'a self, fallback: &'a str) -> &'a str {
        self.language.as_deref().unwrap_or(fallback)
    }
}

pub struct Normalizer {
    detector: Box<dyn LanguageDetector>,
    translator: Box<dyn Translator>,
    target_language: String,
    cache: BoundedCache<String, String>,
    diagnostics: Arc<Diagnostics>,
}

impl Normalizer {
    pub fn new(
        detector: Box<dyn LanguageDetector>,
        translator: Box<dyn Translator>,
        target_language: &str,
        diagnostics: Arc<Diagnostics>,
    ) -> Self {
        Self {
            detector,
            translator,
            target_language: target_language.to_string(),
            cache: BoundedCache::new(DEFAULT_TRANSLATION_CACHE),
            diagnostics,
        }
    }

    /// A normalizer that assumes every query is already in `target`.
    pub fn monolingual(target: &str, diagnostics: Arc<Diagnostics>) -> Self {
        Self::new(
            Box::new(FixedLanguage(target.to_string())),
            Box::new(Passthrough),
            target,
            diagnostics,
        )
    }

    pub fn target_language(&self) -> &str {
        &self.target_language
    }

    pub fn normalize(&self, raw: &str) -> Normalized {
        let text = raw.trim();
        if text.is_empty() {
            return Normalized {
                text: String::new(),
                language: None,
                outcome: Outcome::Empty,
            };
        }

        let started = Instant::now();
        let language = match self.detector.detect(text) {
            Ok(language) => language,
            Err(e) => {
                tracing::debug!("language detection failed: {e}");
                return degraded(text, None, format!("detection: {e}"));
            }
        };

        if language == self.target_language
            || text.split_whitespace().count() < MIN_TRANSLATION_TOKENS
        {
            return Normalized {
                text: text.to_lowercase(),
                language: Some(language),
                outcome: Outcome::Unchanged,
            };
        }

        match self.translate_cached(text) {
            Ok(translated) => {
                self.diagnostics
                    .record_timing(TRANSLATION_TIME, started.elapsed());
                Normalized {
                    text: translated.to_lowercase(),
                    language: Some(language),
                    outcome: Outcome::Translated,
                }
            }
            Err(e) => {
                tracing::debug!("translation from {language} failed: {e}");
                degraded(text, Some(language), format!("translation: {e}"))
            }
        }
    }

    fn translate_cached(&self, text: &str) -> crate::Result<String> {
        if let Some(hit) = self.cache.get(text) {
            self.diagnostics.translation_cache.hit();
            return Ok(hit);
        }

        self.diagnostics.translation_cache.miss();
        let translated =
            self.translator.translate(text, &self.target_language)?;
        self.cache.insert(text.to_string(), translated.clone());
        Ok(translated)
    }
}

fn degraded(text: &str, language: Option<String>, reason: String) -> Normalized {
    Normalized {
        text: text.to_lowercase(),
        language,
        outcome: Outcome::Degraded(reason),
    }
}
