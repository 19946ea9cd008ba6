//! Loading corpora and the concept table from JSON files.
//!
//! A corpus that cannot be read or parsed is replaced by an empty one so
//! the rest of the set stays searchable.

use std::path::{Path, PathBuf};

use rayon::prelude::*;

use crate::{
    corpus::{Corpus, CorpusSet, Node},
    error::{Error, Result},
    expand::ConceptTable,
};

const CORPUS_EXTENSION: &str = "json";

/// Load one corpus. Missing or malformed files yield an empty corpus and
/// a warning.
pub fn load_corpus(name: &str, path: &Path) -> Corpus {
    match read_json(path) {
        Ok(value) => {
            let corpus = Corpus::new(name, Node::from(value));
            tracing::info!(
                corpus = name,
                nodes = corpus.root().node_count(),
                "loaded corpus"
            );
            corpus
        }
        Err(e) => {
            tracing::warn!(
                corpus = name,
                path = %path.display(),
                "failed to load corpus, using an empty one: {e}"
            );
            Corpus::empty(name)
        }
    }
}

/// Load every `*.json` file in `dir`, named after its file stem.
///
/// Files are parsed in parallel; the resulting set is ordered by name.
pub fn load_corpus_dir(dir: &Path) -> Result<CorpusSet> {
    let files = discover_corpora(dir)?;
    let corpora: Vec<Corpus> = files
        .par_iter()
        .map(|(name, path)| load_corpus(name, path))
        .collect();
    Ok(corpora.into_iter().collect())
}

/// Load the concept table, falling back to the built-in one when the file
/// is absent or invalid.
pub fn load_concepts(path: &Path) -> ConceptTable {
    if !path.exists() {
        tracing::debug!(
            path = %path.display(),
            "no concepts file, using built-in table"
        );
        return ConceptTable::builtin();
    }

    match read_json(path).and_then(ConceptTable::from_json) {
        Ok(table) => {
            tracing::info!(concepts = table.len(), "loaded concept table");
            table
        }
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                "invalid concepts file, using built-in table: {e}"
            );
            ConceptTable::builtin()
        }
    }
}

fn read_json(path: &Path) -> Result<serde_json::Value> {
    let raw = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}

fn discover_corpora(dir: &Path) -> Result<Vec<(String, PathBuf)>> {
    if !dir.is_dir() {
        return Err(Error::NotFound {
            kind: "corpus directory",
            name: dir.display().to_string(),
        });
    }

    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        let name = entry.file_name();

        if name.to_string_lossy().starts_with('.')
            || !entry.file_type()?.is_file()
            || path.extension().and_then(|e| e.to_str()) != Some(CORPUS_EXTENSION)
        {
            continue;
        }
        if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
            files.push((stem.to_string(), path.clone()));
        }
    }
    files.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(files)
}
