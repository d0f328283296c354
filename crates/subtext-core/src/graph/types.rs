use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A loosely-typed attribute value. The source graph is assembled from LAS
/// curve headers, USGS field names and EIA column names, none of which agree
/// on a schema, so attribute bags are kept heterogeneous rather than forced
/// into a closed struct.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Number(f64),
    Text(String),
    Bool(bool),
    Null,
}

impl AttributeValue {
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Number(n) => n.as_f64().map(AttributeValue::Number).unwrap_or(AttributeValue::Null),
            Value::String(s) => AttributeValue::Text(s.clone()),
            Value::Bool(b) => AttributeValue::Bool(*b),
            Value::Null => AttributeValue::Null,
            other => AttributeValue::Text(other.to_string()),
        }
    }

    /// Coerce to a displayable string regardless of underlying variant.
    pub fn coerce_string(&self) -> Option<String> {
        match self {
            AttributeValue::Text(s) => Some(s.clone()),
            AttributeValue::Number(n) => Some(format_number(*n)),
            AttributeValue::Bool(b) => Some(b.to_string()),
            AttributeValue::Null => None,
        }
    }

    /// Coerce to a numeric value, parsing text if necessary.
    pub fn coerce_numeric(&self) -> Option<f64> {
        match self {
            AttributeValue::Number(n) => Some(*n),
            AttributeValue::Text(s) => s.trim().parse::<f64>().ok(),
            AttributeValue::Bool(_) | AttributeValue::Null => None,
        }
    }
}

fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

/// A node in the combined knowledge graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub attributes: HashMap<String, AttributeValue>,
}

impl Node {
    pub fn attribute(&self, name: &str) -> Option<&AttributeValue> {
        self.attributes.get(name)
    }

    pub fn mnemonic(&self) -> Option<String> {
        self.attribute("mnemonic").and_then(AttributeValue::coerce_string).map(|s| s.to_uppercase())
    }
}

/// A directed, typed edge between two node ids.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Edge {
    pub source: String,
    pub target: String,
    #[serde(rename = "type", default)]
    pub relation: String,
}

/// The raw, on-disk shape of a combined graph snapshot: a flat node list and
/// a flat edge list. Loaded once at startup and turned into a
/// [`crate::graph::traverser::GraphTraverser`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Graph {
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub edges: Vec<Edge>,
}

/// Which edges to follow during expansion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraversalDirection {
    Outgoing,
    Incoming,
    Both,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attribute_value_coercion() {
        assert_eq!(AttributeValue::Number(12.0).coerce_string().unwrap(), "12");
        assert_eq!(AttributeValue::Text("3.5".into()).coerce_numeric().unwrap(), 3.5);
        assert_eq!(AttributeValue::Null.coerce_string(), None);
    }

    #[test]
    fn from_json_untyped_number_stays_numeric() {
        let v: Value = serde_json::json!(42);
        assert_eq!(AttributeValue::from_json(&v), AttributeValue::Number(42.0));
    }
}
