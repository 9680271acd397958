use crate::grammar::Value;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// The kind of value an attribute holds.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AttrKind {
    Int,
    Float,
    Bool,
    String,
}

impl AttrKind {
    /// Ints are accepted where floats are declared.
    pub fn accepts(self, value: &Value) -> bool {
        match (self, value) {
            (AttrKind::Int, Value::Int(_)) => true,
            (AttrKind::Float, Value::Float(_)) | (AttrKind::Float, Value::Int(_)) => true,
            (AttrKind::Bool, Value::Bool(_)) => true,
            (AttrKind::String, Value::Str(_)) => true,
            _ => false,
        }
    }
}

impl fmt::Display for AttrKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            AttrKind::Int => "int",
            AttrKind::Float => "float",
            AttrKind::Bool => "bool",
            AttrKind::String => "string",
        };
        f.write_str(name)
    }
}

/// A declared node or edge type.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct TypeDecl {
    pub name: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, AttrKind>,
}

impl TypeDecl {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            attributes: Default::default(),
        }
    }
}

/// Node and edge types a grammar may use. An empty list leaves that kind unchecked.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Default)]
pub struct TypeSet {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub nodes: Vec<TypeDecl>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub edges: Vec<TypeDecl>,
}

impl TypeSet {
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty()
    }

    /// `None` when node types are unchecked, otherwise whether the type is declared.
    pub fn node_type(&self, name: &str) -> Option<Option<&TypeDecl>> {
        if self.nodes.is_empty() {
            None
        } else {
            Some(self.nodes.iter().find(|decl| decl.name == name))
        }
    }

    pub fn edge_type(&self, name: &str) -> Option<Option<&TypeDecl>> {
        if self.edges.is_empty() {
            None
        } else {
            Some(self.edges.iter().find(|decl| decl.name == name))
        }
    }
}
