use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

/// An attribute value stored on a node or an edge.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i64),
    Float(f64),
    Bool(bool),
    Str(String),
}

impl Value {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Compare two values. Ints and floats compare numerically, strings lexicographically.
    /// Booleans only compare for equality, and mixed kinds are incomparable.
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Int(l), Value::Int(r)) => Some(l.cmp(r)),
            (Value::Str(l), Value::Str(r)) => Some(l.cmp(r)),
            (Value::Bool(l), Value::Bool(r)) if l == r => Some(Ordering::Equal),
            (Value::Bool(_), Value::Bool(_)) => None,
            (l, r) => match (l.as_f64(), r.as_f64()) {
                (Some(l), Some(r)) => l.partial_cmp(&r),
                _ => None,
            },
        }
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i as i64)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{}", x),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Str(s) => write!(f, "{:?}", s),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
/// A typed node of the host graph.
pub struct Node {
    #[serde(rename = "type")]
    pub node_type: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, Value>,
}

impl Node {
    pub fn new(node_type: &str) -> Self {
        Self {
            node_type: node_type.to_string(),
            attributes: Default::default(),
        }
    }

    pub fn with_attribute<V: Into<Value>>(mut self, name: &str, value: V) -> Self {
        self.attributes.insert(name.to_string(), value.into());
        self
    }
}

/// A typed, directed edge of the host graph.
#[derive(Clone, Debug, PartialEq)]
pub struct Edge {
    pub edge_type: String,
    pub source: usize,
    pub target: usize,
    pub attributes: BTreeMap<String, Value>,
}

impl Edge {
    pub fn new(edge_type: &str, source: usize, target: usize) -> Self {
        Self {
            edge_type: edge_type.to_string(),
            source,
            target,
            attributes: Default::default(),
        }
    }
}

/// Define a replacement node.
/// For replace, the type is optional and only the listed attributes are overwritten.
/// For add, the type is mandatory.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Default)]
pub struct ToNode {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub node_type: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, Value>,
}

impl ToNode {
    pub fn new(node_type: &str) -> Self {
        Self {
            node_type: Some(node_type.to_string()),
            attributes: Default::default(),
        }
    }

    /// Create a fresh node from this description.
    pub fn build(&self) -> Node {
        Node {
            node_type: self.node_type.clone().unwrap_or_default(),
            attributes: self.attributes.clone(),
        }
    }

    /// Rewrite an existing node in place: retype if a type is given, then overwrite attributes.
    pub fn apply_to(&self, node: &mut Node) {
        if let Some(node_type) = &self.node_type {
            node.node_type = node_type.clone();
        }
        for (name, value) in &self.attributes {
            node.attributes.insert(name.clone(), value.clone());
        }
    }
}
