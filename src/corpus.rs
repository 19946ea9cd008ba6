use serde_json::Value;

/// One node of a corpus document.
///
/// Map entries keep their source order; traversal order decides which of
/// two equally scored matches ranks first.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Map(Vec<(String, Node)>),
    Sequence(Vec<Node>),
    /// Text that is scored against queries.
    Scalar(String),
    /// A non-text leaf (number, boolean, null). Shown, never scored.
    Literal(String),
}

impl Node {
    pub fn empty() -> Self {
        Node::Map(Vec::new())
    }

    /// Number of nodes in this subtree, including itself.
    pub fn node_count(&self) -> usize {
        match self {
            Node::Map(entries) => {
                1 + entries.iter().map(|(_, v)| v.node_count()).sum::<usize>()
            }
            Node::Sequence(items) => {
                1 + items.iter().map(Node::node_count).sum::<usize>()
            }
            Node::Scalar(_) | Node::Literal(_) => 1,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Node::Scalar(text) => Some(text),
            _ => None,
        }
    }
}

impl From<Value> for Node {
    fn from(value: Value) -> Self {
        match value {
            Value::Object(map) => {
                Node::Map(map.into_iter().map(|(k, v)| (k, v.into())).collect())
            }
            Value::Array(items) => {
                Node::Sequence(items.into_iter().map(Node::from).collect())
            }
            Value::String(text) => Node::Scalar(text),
            Value::Null => Node::Literal("null".to_string()),
            other => Node::Literal(other.to_string()),
        }
    }
}

/// A named, immutable reference document.
#[derive(Debug, Clone, PartialEq)]
pub struct Corpus {
    name: String,
    root: Node,
}

impl Corpus {
    pub fn new(name: impl Into<String>, root: Node) -> Self {
        Self {
            name: name.into(),
            root,
        }
    }

    /// Placeholder for a corpus that failed to load. Searching it yields
    /// nothing.
    pub fn empty(name: impl Into<String>) -> Self {
        Self::new(name, Node::empty())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn root(&self) -> &Node {
        &self.root
    }

    pub fn is_empty(&self) -> bool {
        match &self.root {
            Node::Map(entries) => entries.is_empty(),
            Node::Sequence(items) => items.is_empty(),
            Node::Scalar(_) | Node::Literal(_) => false,
        }
    }
}

/// The corpora available to the engine, in load order.
#[derive(Debug, Clone, Default)]
pub struct CorpusSet {
    corpora: Vec<Corpus>,
}

impl CorpusSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a corpus, replacing any existing one with the same name.
    pub fn insert(&mut self, corpus: Corpus) {
        match self
            .corpora
            .iter_mut()
            .find(|c| c.name.eq_ignore_ascii_case(&corpus.name))
        {
            Some(existing) => *existing = corpus,
            None => self.corpora.push(corpus),
        }
    }

    /// Case-insensitive lookup by name.
    pub fn get(&self, name: &str) -> Option<&Corpus> {
        self.corpora
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(name))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.corpora.iter().map(|c| c.name.as_str())
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Corpus> {
        self.corpora.iter()
    }

    pub fn as_slice(&self) -> &[Corpus] {
        &self.corpora
    }

    pub fn len(&self) -> usize {
        self.corpora.len()
    }

    pub fn is_empty(&self) -> bool {
        self.corpora.is_empty()
    }
}

impl FromIterator<Corpus> for CorpusSet {
    fn from_iter<I: IntoIterator<Item = Corpus>>(iter: I) -> Self {
        let mut set = CorpusSet::new();
        for corpus in iter {
            set.insert(corpus);
        }
        set
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn json_conversion_keeps_key_order() {
        let value: Value =
            serde_json::from_str(r#"{"zeta": "z", "alpha": "a", "mid": "m"}"#)
                .unwrap();
        let Node::Map(entries) = Node::from(value) else {
            panic!("expected map");
        };
        let keys: Vec<&str> = entries.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, ["zeta", "alpha", "mid"]);
    }

    #[test]
    fn non_text_leaves_become_literals() {
        let node = Node::from(json!([1, true, null, "text"]));
        assert_eq!(
            node,
            Node::Sequence(vec![
                Node::Literal("1".to_string()),
                Node::Literal("true".to_string()),
                Node::Literal("null".to_string()),
                Node::Scalar("text".to_string()),
            ])
        );
    }

    #[test]
    fn node_count_counts_every_node() {
        let node = Node::from(json!({"a": {"b": "x", "c": ["y", "z"]}}));
        // root, a, b, c, y, z
        assert_eq!(node.node_count(), 6);
    }

    #[test]
    fn empty_corpus_is_empty() {
        assert!(Corpus::empty("GRI").is_empty());
        assert!(!Corpus::new("GRI", Node::Scalar("x".into())).is_empty());
    }

    #[test]
    fn lookup_is_case_insensitive() {
        let set: CorpusSet = [Corpus::empty("ESRS"), Corpus::empty("GRI")]
            .into_iter()
            .collect();
        assert_eq!(set.get("esrs").map(Corpus::name), Some("ESRS"));
        assert!(set.get("SASB").is_none());
        assert_eq!(set.names().collect::<Vec<_>>(), ["ESRS", "GRI"]);
    }

    #[test]
    fn insert_replaces_same_name() {
        let mut set = CorpusSet::new();
        set.insert(Corpus::empty("ISO"));
        set.insert(Corpus::new("iso", Node::Scalar("x".into())));
        assert_eq!(set.len(), 1);
        assert!(!set.get("ISO").unwrap().is_empty());
    }
}
