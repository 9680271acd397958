use crate::grammar::procedures::Procedure;
use crate::grammar::{Condition, Node};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Identify a host node to match against
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct PatternNode {
    /// Identify the node in the context of a rule
    pub id: i32,
    /// The node type. Any type matches if left out.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub node_type: Option<String>,
    /// Conditions the node's attributes must fulfil.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, Condition>,
}

impl PatternNode {
    pub fn new(id: i32, node_type: Option<&str>) -> Self {
        Self {
            id,
            node_type: node_type.map(str::to_string),
            attributes: Default::default(),
        }
    }

    pub fn with_condition(mut self, attribute: &str, condition: Condition) -> Self {
        self.attributes.insert(attribute.to_string(), condition);
        self
    }

    /// Check whether the pattern node can match the provided node.
    pub fn match_node(&self, node: &Node) -> bool {
        // If a type is specified, needs to match.
        if let Some(node_type) = self.node_type.as_ref() {
            if *node_type != node.node_type {
                return false;
            }
        }

        // Every condition needs a value to check against.
        self.attributes
            .iter()
            .all(|(name, condition)| match node.attributes.get(name) {
                Some(value) => condition.check(value),
                None => false,
            })
    }
}

/// A directed edge between two pattern nodes.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct PatternEdge {
    pub id: i32,
    pub source: i32,
    pub target: i32,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub edge_type: Option<String>,
}

impl PatternEdge {
    pub fn new(id: i32, source: i32, target: i32, edge_type: Option<&str>) -> Self {
        Self {
            id,
            source,
            target,
            edge_type: edge_type.map(str::to_string),
        }
    }

    pub fn match_type(&self, edge_type: &str) -> bool {
        match &self.edge_type {
            Some(t) => t == edge_type,
            None => true,
        }
    }
}

/// The nodes and edges a rule looks for.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Default)]
pub struct Pattern {
    pub nodes: Vec<PatternNode>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub edges: Vec<PatternEdge>,
}

impl Pattern {
    pub fn node(&self, id: i32) -> Option<&PatternNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn edge(&self, id: i32) -> Option<&PatternEdge> {
        self.edges.iter().find(|e| e.id == id)
    }
}

/// A negative application condition: the rule does not apply where this context exists.
/// Nodes use ids of their own, edges may connect them to the rule's pattern nodes.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Default)]
pub struct Nac {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub nodes: Vec<PatternNode>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub edges: Vec<PatternEdge>,
}

fn enabled_default() -> bool {
    true
}

fn is_true(b: &bool) -> bool {
    *b
}

fn is_zero(layer: &u32) -> bool {
    *layer == 0
}

/// Describes a replacement rule.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct Rule {
    pub name: String,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub layer: u32,
    #[serde(default = "enabled_default", skip_serializing_if = "is_true")]
    pub enabled: bool,
    pub from: Pattern,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub nacs: Vec<Nac>,
    #[serde(default)]
    pub to: Vec<Procedure>,
}

impl Rule {
    pub fn new(name: &str, from: Pattern, to: Vec<Procedure>) -> Self {
        Self {
            name: name.to_string(),
            layer: 0,
            enabled: true,
            from,
            nacs: vec![],
            to,
        }
    }

    pub fn in_layer(mut self, layer: u32) -> Self {
        self.layer = layer;
        self
    }

    pub fn with_nac(mut self, nac: Nac) -> Self {
        self.nacs.push(nac);
        self
    }

    /// Whether applying the rule removes the node bound to the pattern id.
    pub fn deletes(&self, id: i32) -> bool {
        self.to.iter().any(|proc| proc.deletes(id))
    }
}
