//! Synonym-based query expansion.

use std::collections::HashSet;

use serde_json::Value;

use crate::error::{Error, Result};

/// Words that mark a query as a comparison across corpora.
pub const COMPARISON_TRIGGERS: &[&str] = &["standard", "framework", "compare"];

/// Tokens must be longer than this to be added on their own.
const MIN_TOKEN_CHARS: usize = 3;

/// Canonical topic phrase -> ordered synonym list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConceptTable {
    concepts: Vec<(String, Vec<String>)>,
}

impl ConceptTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// The table used when no concepts file is available.
    pub fn builtin() -> Self {
        const DEFAULTS: &[(&str, &[&str])] = &[
            ("scope 3", &["scope 3", "indirect emissions", "value chain"]),
            ("scope 2", &["scope 2", "purchased electricity"]),
            ("scope 1", &["scope 1", "direct emissions"]),
            ("emissions", &["emissions", "ghg", "carbon", "co2"]),
            ("biodiversity", &["biodiversity", "ecosystem", "habitat"]),
            ("water", &["water", "withdrawal", "consumption"]),
            ("waste", &["waste", "recycling", "disposal"]),
            ("human rights", &["human rights", "labor rights"]),
            ("diversity", &["diversity", "inclusion", "equity"]),
            ("governance", &["governance", "board", "ethics"]),
            ("risk", &["risk", "management", "mitigation"]),
            ("supply chain", &["supply chain", "procurement", "vendor"]),
        ];

        let mut table = Self::new();
        for (concept, synonyms) in DEFAULTS {
            table.insert(concept, synonyms.iter().map(|s| s.to_string()));
        }
        table
    }

    /// Parse a JSON object of `"phrase": ["synonym", ...]`.
    pub fn from_json(value: Value) -> Result<Self> {
        let Value::Object(map) = value else {
            return Err(Error::Config(
                "concept table must be a JSON object".to_string(),
            ));
        };

        let mut table = Self::new();
        for (concept, synonyms) in map {
            let Value::Array(items) = synonyms else {
                return Err(Error::Config(format!(
                    "synonyms for concept '{concept}' must be an array"
                )));
            };
            let synonyms = items
                .into_iter()
                .filter_map(|v| match v {
                    Value::String(s) => Some(s),
                    _ => None,
                })
                .collect::<Vec<_>>();
            table.insert(&concept, synonyms);
        }
        Ok(table)
    }

    pub fn insert(
        &mut self,
        concept: &str,
        synonyms: impl IntoIterator<Item = String>,
    ) {
        let concept = concept.to_lowercase();
        let synonyms: Vec<String> =
            synonyms.into_iter().map(|s| s.to_lowercase()).collect();
        match self.concepts.iter_mut().find(|(c, _)| *c == concept) {
            Some((_, existing)) => *existing = synonyms,
            None => self.concepts.push((concept, synonyms)),
        }
    }

    pub fn len(&self) -> usize {
        self.concepts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.concepts.is_empty()
    }

    /// Expand `query` into related variants.
    ///
    /// Variants are ordered: the lower-cased query, synonyms of every
    /// concept it contains, corpus names when it reads as a comparison,
    /// then its individual longer tokens.
    ///
    /// # Examples
    ///
    /// ```
    /// use clausemap::expand::ConceptTable;
    ///
    /// let table = ConceptTable::builtin();
    /// let variants = table.expand("Scope 3 reporting", &["GRI"]);
    /// assert_eq!(variants.first(), Some("scope 3 reporting"));
    /// assert!(variants.contains("value chain"));
    /// assert!(variants.contains("reporting"));
    /// assert!(!variants.contains("gri"));
    /// ```
    pub fn expand<S: AsRef<str>>(
        &self,
        query: &str,
        corpus_names: &[S],
    ) -> Expansion {
        let q = query.to_lowercase();
        let mut out = Expansion::starting_with(q.clone());

        for (concept, synonyms) in &self.concepts {
            if q.contains(concept.as_str()) {
                for synonym in synonyms {
                    out.push(synonym.clone());
                }
            }
        }

        if COMPARISON_TRIGGERS.iter().any(|t| q.contains(t)) {
            for name in corpus_names {
                out.push(name.as_ref().to_lowercase());
            }
        }

        for word in q.split_whitespace() {
            if word.chars().count() > MIN_TOKEN_CHARS {
                out.push(word.to_string());
            }
        }

        out
    }
}

/// An insertion-ordered set of query variants.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Expansion {
    variants: Vec<String>,
    seen: HashSet<String>,
}

impl Expansion {
    /// The query itself is always the first variant, even when empty.
    fn starting_with(query: String) -> Self {
        let mut out = Self::default();
        out.seen.insert(query.clone());
        out.variants.push(query);
        out
    }

    fn push(&mut self, variant: String) {
        if variant.is_empty() || self.seen.contains(&variant) {
            return;
        }
        self.seen.insert(variant.clone());
        self.variants.push(variant);
    }

    pub fn first(&self) -> Option<&str> {
        self.variants.first().map(String::as_str)
    }

    pub fn contains(&self, variant: &str) -> bool {
        self.seen.contains(variant)
    }

    pub fn len(&self) -> usize {
        self.variants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variants.is_empty()
    }

    /// The first `n` variants in order.
    pub fn leading(&self, n: usize) -> impl Iterator<Item = &str> {
        self.variants.iter().take(n).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.variants.iter().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn empty_query_is_still_the_first_variant() {
        let expansion = ConceptTable::builtin().expand("", &["ESRS"]);
        assert_eq!(expansion.first(), Some(""));
        assert!(expansion.contains(""));
        assert_eq!(expansion.len(), 1);
    }

    const CORPORA: &[&str] = &["ESRS", "GRI", "SASB", "ISO"];

    #[test]
    fn always_contains_lowercased_query() {
        let table = ConceptTable::builtin();
        for q in ["Board Diversity", "xyz", "WATER use", "a"] {
            let variants = table.expand(q, CORPORA);
            assert!(variants.contains(&q.to_lowercase()), "missing {q}");
            assert_eq!(variants.first(), Some(q.to_lowercase().as_str()));
        }
    }

    #[test]
    fn concept_synonyms_are_added() {
        let table = ConceptTable::builtin();
        let variants = table.expand("biodiversity loss", CORPORA);
        assert!(variants.contains("ecosystem"));
        assert!(variants.contains("habitat"));
        assert!(variants.contains("biodiversity"));
    }

    #[test]
    fn comparison_queries_add_corpus_names() {
        let table = ConceptTable::builtin();
        let variants = table.expand("compare water rules", CORPORA);
        for name in ["esrs", "gri", "sasb", "iso"] {
            assert!(variants.contains(name), "missing {name}");
        }

        let plain = table.expand("water rules", CORPORA);
        assert!(!plain.contains("gri"));
    }

    #[test]
    fn long_tokens_are_added_short_ones_are_not() {
        let table = ConceptTable::new();
        let variants = table.expand("ghg data for iso", CORPORA);
        assert!(variants.contains("data"));
        assert!(!variants.contains("ghg"));
        assert!(!variants.contains("for"));
        assert!(!variants.contains("iso"));
    }

    #[test]
    fn duplicates_collapse() {
        let table = ConceptTable::builtin();
        let variants = table.expand("water", CORPORA);
        let all: Vec<&str> = variants.iter().collect();
        assert_eq!(all, ["water", "withdrawal", "consumption"]);
    }

    #[test]
    fn order_is_deterministic() {
        let table = ConceptTable::builtin();
        let a = table.expand("scope 3 emissions", CORPORA);
        let b = table.expand("scope 3 emissions", CORPORA);
        assert_eq!(a, b);
        let leading: Vec<&str> = a.leading(2).collect();
        assert_eq!(leading, ["scope 3 emissions", "scope 3"]);
    }

    #[test]
    fn re_expanding_a_member_adds_nothing_new_for_its_concept() {
        let table = ConceptTable::builtin();
        let first = table.expand("scope 3 value chain", CORPORA);
        let member = first
            .iter()
            .find(|v| *v != "scope 3 value chain" && v.contains("scope 3"))
            .unwrap()
            .to_string();

        let second = table.expand(&member, CORPORA);
        for v in second.iter() {
            assert!(first.contains(v), "{v} not in first expansion");
        }
    }

    #[test]
    fn from_json_parses_object() {
        let table = ConceptTable::from_json(json!({
            "Energy": ["energy", "electricity", 5],
            "land use": ["land use"]
        }))
        .unwrap();
        assert_eq!(table.len(), 2);

        let variants = table.expand("energy mix", CORPORA);
        assert!(variants.contains("electricity"));
    }

    #[test]
    fn from_json_rejects_bad_shapes() {
        assert!(ConceptTable::from_json(json!(["a"])).is_err());
        assert!(ConceptTable::from_json(json!({"a": "b"})).is_err());
    }
}
