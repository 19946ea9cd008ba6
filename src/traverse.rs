//! Recursive fuzzy search over one corpus tree.

use crate::{corpus::Node, scorer::Scorer};

/// Default recursion limit for a [`Traversal`].
pub const DEFAULT_MAX_DEPTH: usize = 6;

/// Thresholds and boosts applied while walking a corpus.
///
/// Keys are rarer and more specific than body text, so they get a lower
/// threshold and a larger boost.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TraversalWeights {
    pub key_threshold: u8,
    pub key_boost: u32,
    pub text_threshold: u8,
    pub text_boost: u32,
}

impl Default for TraversalWeights {
    fn default() -> Self {
        Self {
            key_threshold: 70,
            key_boost: 20,
            text_threshold: 75,
            text_boost: 10,
        }
    }
}

/// A raw hit found during traversal, before normalization and dedup.
#[derive(Debug, Clone, PartialEq)]
pub struct Match<'a> {
    pub raw_score: u32,
    /// `" > "`-joined keys with `[i]` suffixes for sequence positions.
    pub path: String,
    pub payload: &'a Node,
    pub depth: usize,
}

/// Per-call traversal parameters.
#[derive(Clone, Copy)]
pub struct Traversal<'s> {
    pub scorer: &'s Scorer,
    pub weights: TraversalWeights,
    pub max_depth: usize,
}

impl<'s> Traversal<'s> {
    pub fn new(scorer: &'s Scorer) -> Self {
        Self {
            scorer,
            weights: TraversalWeights::default(),
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    /// Score every key and text node under `root` against `query`.
    pub fn search<'a>(&self, root: &'a Node, query: &str) -> Vec<Match<'a>> {
        let mut matches = Vec::new();
        self.visit(root, query, "", 0, &mut matches);
        matches
    }

    fn visit<'a>(
        &self,
        node: &'a Node,
        query: &str,
        path: &str,
        depth: usize,
        out: &mut Vec<Match<'a>>,
    ) {
        if depth > self.max_depth {
            return;
        }

        match node {
            Node::Map(entries) => {
                for (key, value) in entries {
                    let new_path = if path.is_empty() {
                        key.clone()
                    } else {
                        format!("{path} > {key}")
                    };

                    let key_score = self.scorer.score(query, key);
                    if key_score > self.weights.key_threshold {
                        out.push(Match {
                            raw_score: u32::from(key_score)
                                + self.weights.key_boost,
                            path: new_path.clone(),
                            payload: value,
                            depth,
                        });
                    }

                    self.visit(value, query, &new_path, depth + 1, out);
                }
            }
            Node::Sequence(items) => {
                for (i, item) in items.iter().enumerate() {
                    let item_path = format!("{path}[{i}]");
                    self.visit(item, query, &item_path, depth, out);
                }
            }
            Node::Scalar(text) => {
                let text_score = self.scorer.score(query, text);
                if text_score > self.weights.text_threshold {
                    out.push(Match {
                        raw_score: u32::from(text_score)
                            + self.weights.text_boost,
                        path: path.to_string(),
                        payload: node,
                        depth,
                    });
                }
            }
            Node::Literal(_) => {}
        }
    }
}
