use crate::grammar::host_graph::{EdgeId, HostGraph, NodeId};
use crate::grammar::node::Edge;
use crate::grammar::procedures::*;
use crate::grammar::{Condition, Node, Value};
use core::fmt::Formatter;
use serde::de::{Error, SeqAccess, Visitor};
use serde::ser::SerializeSeq;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;

#[derive(Deserialize)]
struct I32(i32);

#[derive(Deserialize)]
struct MyVec(Vec<i32>);

struct ValueVisitor;

impl<'de> Visitor<'de> for ValueVisitor {
    type Value = Value;

    fn expecting(&self, formatter: &mut Formatter) -> std::fmt::Result {
        formatter.write_str("an int, float, bool or string")
    }

    fn visit_bool<E: Error>(self, v: bool) -> Result<Self::Value, E> {
        Ok(Value::Bool(v))
    }

    fn visit_i64<E: Error>(self, v: i64) -> Result<Self::Value, E> {
        Ok(Value::Int(v))
    }

    fn visit_u64<E: Error>(self, v: u64) -> Result<Self::Value, E> {
        if v > i64::MAX as u64 {
            return Err(E::custom(format!("integer {} is out of range", v)));
        }
        Ok(Value::Int(v as i64))
    }

    fn visit_f64<E: Error>(self, v: f64) -> Result<Self::Value, E> {
        Ok(Value::Float(v))
    }

    fn visit_str<E: Error>(self, v: &str) -> Result<Self::Value, E> {
        Ok(Value::Str(v.to_string()))
    }

    fn visit_string<E: Error>(self, v: String) -> Result<Self::Value, E> {
        Ok(Value::Str(v))
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D>(deserializer: D) -> Result<Self, <D as Deserializer<'de>>::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(ValueVisitor)
    }
}

impl Serialize for Value {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Value::Int(i) => serializer.serialize_i64(*i),
            Value::Float(f) => serializer.serialize_f64(*f),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Str(s) => serializer.serialize_str(s),
        }
    }
}

impl<'de> Deserialize<'de> for DeleteProcedure {
    fn deserialize<D>(deserializer: D) -> Result<Self, <D as Deserializer<'de>>::Error>
    where
        D: Deserializer<'de>,
    {
        let i = I32::deserialize(deserializer)?;
        Ok(DeleteProcedure { target: i.0 })
    }
}

impl Serialize for DeleteProcedure {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_i32(self.target)
    }
}

impl<'de> Deserialize<'de> for DisconnectProcedure {
    fn deserialize<D>(deserializer: D) -> Result<Self, <D as Deserializer<'de>>::Error>
    where
        D: Deserializer<'de>,
    {
        let i = I32::deserialize(deserializer)?;
        Ok(DisconnectProcedure { target: i.0 })
    }
}

impl Serialize for DisconnectProcedure {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_i32(self.target)
    }
}

impl<'de> Deserialize<'de> for MergeProcedure {
    fn deserialize<D>(deserializer: D) -> Result<Self, <D as Deserializer<'de>>::Error>
    where
        D: Deserializer<'de>,
    {
        let mut vec = MyVec::deserialize(deserializer)?.0;
        if vec.len() < 2 {
            return Err(Error::invalid_length(vec.len(), &"at least 2"));
        }

        let final_node = vec.remove(0);
        Ok(Self {
            targets: vec,
            final_node,
        })
    }
}

impl Serialize for MergeProcedure {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut seq = serializer.serialize_seq(Some(self.targets.len() + 1))?;
        seq.serialize_element(&self.final_node)?;
        for target in &self.targets {
            seq.serialize_element(target)?;
        }
        seq.end()
    }
}

impl<'de> Deserialize<'de> for Condition {
    fn deserialize<D>(deserializer: D) -> Result<Self, <D as Deserializer<'de>>::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_seq(ConditionVisitor)
    }
}

impl Serialize for Condition {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Condition::Range(low, high) => {
                let mut seq = serializer.serialize_seq(Some(3))?;
                seq.serialize_element(self.designator())?;
                seq.serialize_element(low)?;
                seq.serialize_element(high)?;
                seq.end()
            }
            Condition::Equals(value)
            | Condition::NotEquals(value)
            | Condition::LessThan(value)
            | Condition::GreaterThan(value)
            | Condition::LessThanOrEquals(value)
            | Condition::GreaterThanOrEquals(value) => {
                let mut seq = serializer.serialize_seq(Some(2))?;
                seq.serialize_element(self.designator())?;
                seq.serialize_element(value)?;
                seq.end()
            }
        }
    }
}

struct ConditionVisitor;

impl ConditionVisitor {
    fn parse_condition(designator: &str, value: Value) -> Option<Condition> {
        match designator {
            "eq" => Some(Condition::Equals(value)),
            "ne" => Some(Condition::NotEquals(value)),
            "lt" => Some(Condition::LessThan(value)),
            "gt" => Some(Condition::GreaterThan(value)),
            "lte" => Some(Condition::LessThanOrEquals(value)),
            "gte" => Some(Condition::GreaterThanOrEquals(value)),
            _ => None,
        }
    }
}

impl<'de> Visitor<'de> for ConditionVisitor {
    type Value = Condition;

    fn expecting(&self, formatter: &mut Formatter) -> std::fmt::Result {
        formatter.write_str(
            "a sequence of a string followed by one or two values, representing a Condition",
        )
    }

    fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, <A as SeqAccess<'de>>::Error>
    where
        A: SeqAccess<'de>,
    {
        let designation: String = seq
            .next_element()?
            .ok_or_else(|| <A as SeqAccess<'de>>::Error::custom("Missing designator"))?;
        match designation.as_str() {
            "range" => {
                let range_low: Value = seq.next_element()?.ok_or_else(|| {
                    <A as SeqAccess<'de>>::Error::custom("Missing value for range lower")
                })?;
                let range_high: Value = seq.next_element()?.ok_or_else(|| {
                    <A as SeqAccess<'de>>::Error::custom("Missing value for range upper")
                })?;
                Ok(Condition::Range(range_low, range_high))
            }
            d => {
                let value: Value = seq
                    .next_element()?
                    .ok_or_else(|| <A as SeqAccess<'de>>::Error::custom("Missing value"))?;
                Self::parse_condition(d, value).ok_or_else(|| {
                    <A as SeqAccess<'de>>::Error::custom(format!("Unknown designator {:?}", d))
                })
            }
        }
    }
}

/// Stored form of a host graph node.
#[derive(Deserialize, Serialize)]
struct RawNode {
    id: NodeId,
    #[serde(rename = "type")]
    node_type: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    attributes: BTreeMap<String, Value>,
}

/// Stored form of a host graph edge. Edges without an id get a fresh one on load.
#[derive(Deserialize, Serialize)]
struct RawEdge {
    #[serde(default)]
    id: Option<EdgeId>,
    source: NodeId,
    target: NodeId,
    #[serde(rename = "type")]
    edge_type: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    attributes: BTreeMap<String, Value>,
}

#[derive(Deserialize, Serialize, Default)]
struct RawGraph {
    #[serde(default)]
    nodes: Vec<RawNode>,
    #[serde(default)]
    edges: Vec<RawEdge>,
}

impl<'de> Deserialize<'de> for HostGraph {
    fn deserialize<D>(deserializer: D) -> Result<Self, <D as Deserializer<'de>>::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = RawGraph::deserialize(deserializer)?;
        let mut graph = HostGraph::new();
        for raw_node in raw.nodes {
            let node = Node {
                node_type: raw_node.node_type,
                attributes: raw_node.attributes,
            };
            graph
                .add_node_with(raw_node.id, node)
                .map_err(D::Error::custom)?;
        }
        // Explicit edge ids first, so fresh ids can't collide with them.
        let (with_id, without_id): (Vec<_>, Vec<_>) =
            raw.edges.into_iter().partition(|edge| edge.id.is_some());
        for raw_edge in with_id.into_iter().chain(without_id) {
            let edge = Edge {
                edge_type: raw_edge.edge_type,
                source: raw_edge.source,
                target: raw_edge.target,
                attributes: raw_edge.attributes,
            };
            let added = match raw_edge.id {
                Some(id) => graph.add_edge_with(id, edge),
                None => graph.push_edge(edge).map(|_| ()),
            };
            added.map_err(D::Error::custom)?;
        }
        Ok(graph)
    }
}

impl Serialize for HostGraph {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let raw = RawGraph {
            nodes: self
                .nodes()
                .map(|(id, node)| RawNode {
                    id,
                    node_type: node.node_type.clone(),
                    attributes: node.attributes.clone(),
                })
                .collect(),
            edges: self
                .edges()
                .map(|(id, edge)| RawEdge {
                    id: Some(id),
                    source: edge.source,
                    target: edge.target,
                    edge_type: edge.edge_type.clone(),
                    attributes: edge.attributes.clone(),
                })
                .collect(),
        };
        raw.serialize(serializer)
    }
}
