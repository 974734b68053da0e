//! Placeholder injection engine.
//!
//! Produces a deep copy of a JSON document in which every string leaf has its
//! `{{token}}` markers substituted from a flat map, and nothing else changes:
//! key sets, array order and non-string leaves are preserved exactly. The
//! surrounding document is an automation graph that must stay importable by
//! its consumer, so structure is never touched. Substitution is literal text
//! replacement; string content is never evaluated.
//!
//! All mapped tokens are replaced in a single Aho-Corasick pass per string,
//! so a replacement value that itself contains a token form is not
//! re-substituted. Unresolved tokens are left verbatim.

use aho_corasick::AhoCorasick;
use memchr::memmem;
use serde_json::Value;

/// Ordered token name to replacement string pairs.
pub type PlaceholderMap = Vec<(String, String)>;

/// Compiled substitution automaton over the `{{token}}` forms of a map.
pub struct Injector {
    ac: AhoCorasick,
    replacements: Vec<String>,
}

impl Injector {
    pub fn new(map: &PlaceholderMap) -> Self {
        let patterns: Vec<String> = map.iter().map(|(k, _)| format!("{{{{{}}}}}", k)).collect();
        let replacements = map.iter().map(|(_, v)| v.clone()).collect();
        let ac = AhoCorasick::new(&patterns).expect("placeholder patterns compile");
        Self { ac, replacements }
    }

    /// Recursive descent over the document tree.
    pub fn inject(&self, doc: &Value) -> Value {
        match doc {
            Value::Object(map) => Value::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), self.inject(v)))
                    .collect(),
            ),
            Value::Array(items) => Value::Array(items.iter().map(|v| self.inject(v)).collect()),
            Value::String(s) => Value::String(self.rewrite(s)),
            other => other.clone(),
        }
    }

    fn rewrite(&self, s: &str) -> String {
        // Cheap scan first: most leaves carry no marker at all.
        if self.replacements.is_empty() || memmem::find(s.as_bytes(), b"{{").is_none() {
            return s.to_string();
        }
        self.ac.replace_all(s, &self.replacements)
    }
}

/// One-shot convenience over [`Injector`].
pub fn inject(doc: &Value, map: &PlaceholderMap) -> Value {
    Injector::new(map).inject(doc)
}
