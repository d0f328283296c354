use serde_json::{Map, Value};

/// A vector-store document: a loosely-typed record mirroring the AstraDB
/// Data API response shape (`_id`, `$vector`, `text`, `semantic_text`,
/// `entity_type`, plus flat copies of node attributes). Modeled as a JSON
/// map rather than a closed struct — the reasoning layer reads fields by
/// name that no fixed struct could anticipate, mirroring the Python
/// original's free-form dict documents.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document(pub Map<String, Value>);

const CONTAINER_KEYS: [&str; 3] = ["attributes", "metadata", "data"];
const RESERVED_KEYS: [&str; 5] = ["_id", "$vector", "$similarity", "text", "semantic_text"];

impl Document {
    pub fn new(map: Map<String, Value>) -> Self {
        Self(map)
    }

    pub fn id(&self) -> Option<&str> {
        self.0.get("_id").and_then(Value::as_str)
    }

    pub fn text(&self) -> Option<&str> {
        self.0.get("text").and_then(Value::as_str)
    }

    pub fn semantic_text(&self) -> Option<&str> {
        self.0.get("semantic_text").and_then(Value::as_str)
    }

    pub fn entity_type(&self) -> Option<&str> {
        self.0.get("entity_type").and_then(Value::as_str)
    }

    pub fn vector(&self) -> Option<Vec<f32>> {
        self.0.get("$vector").and_then(Value::as_array).map(|arr| {
            arr.iter().filter_map(Value::as_f64).map(|f| f as f32).collect()
        })
    }

    /// Look up a field by name, checking the document root first, then the
    /// `attributes`/`metadata`/`data` sub-objects in that order, skipping
    /// null or empty-string values — mirrors `_extract_field_value`.
    pub fn attribute(&self, field: &str) -> Option<&Value> {
        if let Some(v) = self.0.get(field) {
            if !is_empty(v) {
                return Some(v);
            }
        }
        for container in CONTAINER_KEYS {
            if let Some(Value::Object(inner)) = self.0.get(container) {
                if let Some(v) = inner.get(field) {
                    if !is_empty(v) {
                        return Some(v);
                    }
                }
            }
        }
        None
    }

    pub fn attribute_string(&self, field: &str) -> Option<String> {
        self.attribute(field).map(value_to_display)
    }

    /// The best-effort "rich" text for this document: `semantic_text`, else
    /// `text`, else a debug rendering. Used when projecting documents into
    /// `WorkflowState::retrieved`.
    pub fn best_text(&self) -> String {
        self.semantic_text()
            .or_else(|| self.text())
            .map(str::to_string)
            .unwrap_or_else(|| format!("{:?}", self.0))
    }

    /// Candidate field names across root and nested containers, excluding
    /// store-internal keys — used by seed construction and field extraction.
    /// A `BTreeSet` (rather than the Python original's unordered `set`)
    /// guarantees deterministic iteration order.
    pub fn candidate_fields(&self) -> std::collections::BTreeSet<String> {
        let mut fields = std::collections::BTreeSet::new();
        for key in self.0.keys() {
            if !RESERVED_KEYS.contains(&key.as_str()) && !CONTAINER_KEYS.contains(&key.as_str()) {
                fields.insert(key.clone());
            }
        }
        for container in CONTAINER_KEYS {
            if let Some(Value::Object(inner)) = self.0.get(container) {
                fields.extend(inner.keys().cloned());
            }
        }
        fields
    }

    /// Whether the document's serialized identity contains `needle` —
    /// checks `_id` then falls back to the whole serialized map, matching
    /// the well-id filter's "retain documents whose `_id` or serialized
    /// form contains the normalized id".
    pub fn contains_id_like(&self, needle: &str) -> bool {
        if let Some(id) = self.id() {
            if id.to_lowercase().contains(&needle.to_lowercase()) {
                return true;
            }
        }
        serde_json::to_string(&self.0)
            .map(|s| s.to_lowercase().contains(&needle.to_lowercase()))
            .unwrap_or(false)
    }
}

fn is_empty(v: &Value) -> bool {
    matches!(v, Value::Null) || matches!(v, Value::String(s) if s.is_empty())
}

fn value_to_display(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        Document::new(value.as_object().unwrap().clone())
    }

    #[test]
    fn best_text_prefers_semantic_text() {
        let d = doc(json!({"text": "plain", "semantic_text": "embedding oriented"}));
        assert_eq!(d.best_text(), "embedding oriented");
    }

    #[test]
    fn attribute_falls_back_through_containers() {
        let d = doc(json!({"attributes": {"state": "ND"}}));
        assert_eq!(d.attribute_string("state").unwrap(), "ND");
    }

    #[test]
    fn attribute_skips_empty_root_value_for_container_fallback() {
        let d = doc(json!({"state": "", "metadata": {"state": "ND"}}));
        assert_eq!(d.attribute_string("state").unwrap(), "ND");
    }

    #[test]
    fn candidate_fields_excludes_reserved_keys() {
        let d = doc(json!({"_id": "1", "text": "t", "state": "ND", "attributes": {"county": "Burke"}}));
        let fields = d.candidate_fields();
        assert!(fields.contains("state"));
        assert!(fields.contains("county"));
        assert!(!fields.contains("_id"));
        assert!(!fields.contains("text"));
    }
}
