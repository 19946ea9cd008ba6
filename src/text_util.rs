use crate::corpus::Node;

/// Maximum number of characters produced by [`flatten_payload`].
pub const DISPLAY_MAX_CHARS: usize = 300;

/// Map keys whose text best describes a clause, in preference order.
const DESCRIPTIVE_KEYS: &[&str] =
    &["text", "description", "content", "requirement", "definition"];

const JOIN: &str = " | ";

/// Truncate to at most `max` characters without splitting a code point.
pub fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Turn a matched payload into a single display string.
///
/// Text is returned trimmed. For maps the descriptive keys (`text`,
/// `description`, ...) are preferred, falling back to every text value.
/// For sequences the text elements are joined. Maps and sequences are
/// capped at [`DISPLAY_MAX_CHARS`].
pub fn flatten_payload(node: &Node) -> String {
    match node {
        Node::Scalar(text) => text.trim().to_string(),
        Node::Literal(text) => text.clone(),
        Node::Map(entries) => {
            let mut texts: Vec<&str> = DESCRIPTIVE_KEYS
                .iter()
                .filter_map(|key| {
                    entries
                        .iter()
                        .find(|(k, _)| k == key)
                        .and_then(|(_, v)| v.as_text())
                })
                .map(str::trim)
                .collect();

            if texts.is_empty() {
                texts = entries
                    .iter()
                    .filter_map(|(_, v)| v.as_text())
                    .map(str::trim)
                    .collect();
            }

            truncate_chars(&texts.join(JOIN), DISPLAY_MAX_CHARS).to_string()
        }
        Node::Sequence(items) => {
            let texts: Vec<&str> = items
                .iter()
                .filter_map(Node::as_text)
                .map(str::trim)
                .collect();
            truncate_chars(&texts.join(JOIN), DISPLAY_MAX_CHARS).to_string()
        }
    }
}

/// Render a `" > "`-joined path with arrows, keeping at most `segments`
/// leading segments when given.
pub fn display_path(path: &str, segments: Option<usize>) -> String {
    let parts = path.split('>').map(str::trim).filter(|p| !p.is_empty());
    match segments {
        Some(n) => parts.take(n).collect::<Vec<_>>().join(" → "),
        None => parts.collect::<Vec<_>>().join(" → "),
    }
}

/// Human label for a normalized confidence score.
pub fn confidence_label(score: u8) -> &'static str {
    match score {
        91..=u8::MAX => "Excellent",
        76..=90 => "High",
        61..=75 => "Good",
        _ => "Relevant",
    }
}
