//! clausemap - fuzzy search across structured reference documents.
//!
//! A corpus is a named tree (typically a regulatory or reporting
//! standard loaded from JSON). Queries are normalized, optionally
//! translated, expanded with synonyms, and matched against every key and
//! text node with a partial-ratio fuzzy scorer. Results are deduplicated
//! by path and ranked. Served queries can be recorded through a buffered
//! telemetry sink that falls back to a local log when its primary store
//! fails.
//!
//! # Quick start
//!
//! ```
//! use std::sync::Arc;
//!
//! use clausemap::{
//!     Diagnostics,
//!     SearchEngine,
//!     corpus::{Corpus, CorpusSet, Node},
//!     expand::ConceptTable,
//!     normalize::Normalizer,
//! };
//!
//! let doc = serde_json::json!({
//!     "Emissions": {"Scope 3": "Indirect value-chain emissions"}
//! });
//! let corpora: CorpusSet =
//!     [Corpus::new("ESRS", Node::from(doc))].into_iter().collect();
//!
//! let diagnostics = Arc::new(Diagnostics::new());
//! let engine = SearchEngine::new(
//!     Arc::new(corpora),
//!     Arc::new(ConceptTable::builtin()),
//!     Normalizer::monolingual("en", diagnostics.clone()),
//!     diagnostics,
//! );
//!
//! let results = engine.search_one("ESRS", "Scope 3", 3);
//! assert_eq!(results[0].path, "Emissions > Scope 3");
//! assert_eq!(results[0].score, 92);
//! ```

pub mod cache;
pub mod config;
pub mod corpus;
pub mod data_dir;
pub mod error;
pub mod expand;
pub mod loader;
pub mod normalize;
pub mod scorer;
pub mod search;
pub mod service;
pub mod stats;
pub mod telemetry;
pub mod text_util;
pub mod translate;
pub mod traverse;

pub use config::Settings;
pub use corpus::{Corpus, CorpusSet, Node};
pub use data_dir::DataDir;
pub use error::{Error, Result};
pub use search::{RankedResult, SearchEngine};
pub use service::QueryService;
pub use stats::Diagnostics;
pub use telemetry::TelemetryBuffer;
