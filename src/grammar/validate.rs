//! Semantic checks on rules and host graphs.
//!
//! Deserializing only guarantees a document is well-formed. These checks make sure
//! every procedure refers to something the rule has bound at that point, that NACs
//! extend the pattern instead of redefining it, and that declared types are honored.

use std::collections::{BTreeMap, BTreeSet};

use thiserror::Error;

use crate::grammar::host_graph::HostGraph;
use crate::grammar::procedures::Procedure;
use crate::grammar::rule::{PatternEdge, PatternNode, Rule};
use crate::grammar::types::{AttrKind, TypeSet};
use crate::grammar::{ToNode, Value};

#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("rule {rule:?} has an empty pattern")]
    EmptyPattern { rule: String },
    #[error("rule {rule:?} uses id {id} more than once")]
    DuplicateId { rule: String, id: i32 },
    #[error("rule {rule:?} refers to node {id}, which is not bound at that point")]
    UnknownNode { rule: String, id: i32 },
    #[error("rule {rule:?} refers to edge {id}, which is not a pattern edge")]
    UnknownEdge { rule: String, id: i32 },
    #[error("rule {rule:?} has a negative condition with nothing in it")]
    EmptyNac { rule: String },
    #[error("rule {rule:?} adds node {id} without a type")]
    UntypedNode { rule: String, id: i32 },
    #[error("{context}: node type {node_type:?} is not declared")]
    UndeclaredNodeType { context: String, node_type: String },
    #[error("{context}: edge type {edge_type:?} is not declared")]
    UndeclaredEdgeType { context: String, edge_type: String },
    #[error("{context}: attribute {attribute:?} should hold a {expected} value")]
    AttributeKind {
        context: String,
        attribute: String,
        expected: AttrKind,
    },
    #[error("layer {0} is listed more than once in the layer order")]
    DuplicateLayer(u32),
}

/// Check a set of rules against each other's rules and the declared types.
pub fn validate_rules(rules: &[Rule], types: &TypeSet) -> Result<(), ValidationError> {
    for rule in rules {
        validate_rule(rule)?;
        check_rule_types(rule, types)?;
    }
    Ok(())
}

/// Check that a single rule is internally consistent.
pub fn validate_rule(rule: &Rule) -> Result<(), ValidationError> {
    let unknown_node = |id: i32| ValidationError::UnknownNode {
        rule: rule.name.clone(),
        id,
    };
    let duplicate = |id: i32| ValidationError::DuplicateId {
        rule: rule.name.clone(),
        id,
    };

    if rule.from.nodes.is_empty() {
        return Err(ValidationError::EmptyPattern {
            rule: rule.name.clone(),
        });
    }

    // Every id used anywhere in the rule, to keep NAC and added ids apart from pattern ids.
    let mut all_ids = BTreeSet::new();
    for node in &rule.from.nodes {
        if !all_ids.insert(node.id) {
            return Err(duplicate(node.id));
        }
    }
    let pattern_ids = all_ids.clone();

    let mut edge_ids = BTreeSet::new();
    for edge in &rule.from.edges {
        if !edge_ids.insert(edge.id) {
            return Err(duplicate(edge.id));
        }
        check_endpoints(edge, &pattern_ids).map_err(unknown_node)?;
    }

    for nac in &rule.nacs {
        if nac.nodes.is_empty() && nac.edges.is_empty() {
            return Err(ValidationError::EmptyNac {
                rule: rule.name.clone(),
            });
        }
        let mut nac_ids = pattern_ids.clone();
        for node in &nac.nodes {
            if !nac_ids.insert(node.id) {
                return Err(duplicate(node.id));
            }
            all_ids.insert(node.id);
        }
        for edge in &nac.edges {
            check_endpoints(edge, &nac_ids).map_err(unknown_node)?;
        }
    }

    // Walk the procedures in order, tracking which ids are bound at each step.
    let mut bound = pattern_ids;
    let mut bound_edges = edge_ids;
    for proc in &rule.to {
        for id in proc.node_references() {
            if !bound.contains(&id) {
                return Err(unknown_node(id));
            }
        }
        for id in proc.edge_references() {
            if !bound_edges.remove(&id) {
                return Err(ValidationError::UnknownEdge {
                    rule: rule.name.clone(),
                    id,
                });
            }
        }
        if let Procedure::Add(add) = proc {
            if add.new_node.node_type.is_none() {
                return Err(ValidationError::UntypedNode {
                    rule: rule.name.clone(),
                    id: add.id,
                });
            }
        }
        if let Some(id) = proc.binds() {
            if !all_ids.insert(id) {
                return Err(duplicate(id));
            }
            bound.insert(id);
        }
        if let Some(id) = proc.unbinds() {
            bound.remove(&id);
            // Pattern edges go away with either endpoint.
            for edge in &rule.from.edges {
                if edge.source == id || edge.target == id {
                    bound_edges.remove(&edge.id);
                }
            }
        }
    }

    Ok(())
}

fn check_endpoints(edge: &PatternEdge, known: &BTreeSet<i32>) -> Result<(), i32> {
    for id in &[edge.source, edge.target] {
        if !known.contains(id) {
            return Err(*id);
        }
    }
    Ok(())
}

fn check_node_type(
    types: &TypeSet,
    context: &str,
    node_type: &str,
) -> Result<Option<BTreeMap<String, AttrKind>>, ValidationError> {
    match types.node_type(node_type) {
        None => Ok(None),
        Some(Some(decl)) => Ok(Some(decl.attributes.clone())),
        Some(None) => Err(ValidationError::UndeclaredNodeType {
            context: context.to_string(),
            node_type: node_type.to_string(),
        }),
    }
}

fn check_edge_type(types: &TypeSet, context: &str, edge_type: &str) -> Result<(), ValidationError> {
    match types.edge_type(edge_type) {
        Some(None) => Err(ValidationError::UndeclaredEdgeType {
            context: context.to_string(),
            edge_type: edge_type.to_string(),
        }),
        _ => Ok(()),
    }
}

fn check_attributes(
    declared: &BTreeMap<String, AttrKind>,
    context: &str,
    attributes: &BTreeMap<String, Value>,
) -> Result<(), ValidationError> {
    for (name, value) in attributes {
        if let Some(kind) = declared.get(name) {
            if !kind.accepts(value) {
                return Err(ValidationError::AttributeKind {
                    context: context.to_string(),
                    attribute: name.clone(),
                    expected: *kind,
                });
            }
        }
    }
    Ok(())
}

fn check_pattern_types(
    types: &TypeSet,
    context: &str,
    nodes: &[PatternNode],
    edges: &[PatternEdge],
) -> Result<(), ValidationError> {
    for node in nodes {
        if let Some(node_type) = &node.node_type {
            check_node_type(types, context, node_type)?;
        }
    }
    for edge in edges {
        if let Some(edge_type) = &edge.edge_type {
            check_edge_type(types, context, edge_type)?;
        }
    }
    Ok(())
}

fn check_to_node(types: &TypeSet, context: &str, to: &ToNode) -> Result<(), ValidationError> {
    if let Some(node_type) = &to.node_type {
        if let Some(declared) = check_node_type(types, context, node_type)? {
            check_attributes(&declared, context, &to.attributes)?;
        }
    }
    Ok(())
}

fn check_rule_types(rule: &Rule, types: &TypeSet) -> Result<(), ValidationError> {
    if types.is_empty() {
        return Ok(());
    }
    let context = format!("rule {:?}", rule.name);
    check_pattern_types(types, &context, &rule.from.nodes, &rule.from.edges)?;
    for nac in &rule.nacs {
        check_pattern_types(types, &context, &nac.nodes, &nac.edges)?;
    }
    for proc in &rule.to {
        match proc {
            Procedure::Add(add) => check_to_node(types, &context, &add.new_node)?,
            Procedure::Replace(replace) => check_to_node(types, &context, &replace.replacement)?,
            Procedure::Connect(connect) => check_edge_type(types, &context, &connect.edge_type)?,
            _ => {}
        }
    }
    Ok(())
}

/// Check the host graph's nodes and edges against the declared types.
pub fn validate_graph(graph: &HostGraph, types: &TypeSet) -> Result<(), ValidationError> {
    for (id, node) in graph.nodes() {
        let context = format!("host node {}", id);
        if let Some(declared) = check_node_type(types, &context, &node.node_type)? {
            check_attributes(&declared, &context, &node.attributes)?;
        }
    }
    for (id, edge) in graph.edges() {
        let context = format!("host edge {}", id);
        check_edge_type(types, &context, &edge.edge_type)?;
        if let Some(Some(decl)) = types.edge_type(&edge.edge_type) {
            check_attributes(&decl.attributes, &context, &edge.attributes)?;
        }
    }
    Ok(())
}

/// Layers may be listed at most once in an explicit order.
pub fn validate_layer_order(order: &[u32]) -> Result<(), ValidationError> {
    let mut seen = BTreeSet::new();
    for layer in order {
        if !seen.insert(*layer) {
            return Err(ValidationError::DuplicateLayer(*layer));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::procedures::{
        AddProcedure, ConnectProcedure, DeleteProcedure, DisconnectProcedure, ReplaceProcedure,
    };
    use crate::grammar::rule::{Nac, Pattern};
    use crate::grammar::types::TypeDecl;
    use crate::grammar::Node;

    fn single_node_rule(to: Vec<Procedure>) -> Rule {
        let from = Pattern {
            nodes: vec![PatternNode::new(0, Some("tip"))],
            edges: vec![],
        };
        Rule::new("grow", from, to)
    }

    #[test]
    fn test_valid_rule() {
        let rule = single_node_rule(vec![
            Procedure::Add(AddProcedure {
                id: 1,
                new_node: ToNode::new("stem"),
            }),
            Procedure::Connect(ConnectProcedure {
                source: 0,
                target: 1,
                edge_type: "grows".to_string(),
            }),
        ]);
        assert_eq!(validate_rule(&rule), Ok(()));
    }

    #[test]
    fn test_reference_after_delete() {
        let rule = single_node_rule(vec![
            Procedure::Delete(DeleteProcedure { target: 0 }),
            Procedure::Delete(DeleteProcedure { target: 0 }),
        ]);
        assert_eq!(
            validate_rule(&rule),
            Err(ValidationError::UnknownNode {
                rule: "grow".to_string(),
                id: 0
            })
        );
    }

    #[test]
    fn test_disconnect_after_delete() {
        let from = Pattern {
            nodes: vec![PatternNode::new(0, None), PatternNode::new(1, None)],
            edges: vec![PatternEdge::new(5, 0, 1, None)],
        };
        let rule = Rule::new(
            "prune",
            from.clone(),
            vec![
                Procedure::Replace(ReplaceProcedure {
                    target: 1,
                    replacement: ToNode::new("c"),
                }),
                Procedure::Delete(DeleteProcedure { target: 0 }),
                Procedure::Disconnect(DisconnectProcedure { target: 5 }),
            ],
        );
        assert_eq!(
            validate_rule(&rule),
            Err(ValidationError::UnknownEdge {
                rule: "prune".to_string(),
                id: 5
            })
        );

        // Disconnecting first is fine.
        let rule = Rule::new(
            "prune",
            from,
            vec![
                Procedure::Disconnect(DisconnectProcedure { target: 5 }),
                Procedure::Delete(DeleteProcedure { target: 0 }),
            ],
        );
        assert_eq!(validate_rule(&rule), Ok(()));
    }

    #[test]
    fn test_add_cannot_reuse_pattern_id() {
        let rule = single_node_rule(vec![Procedure::Add(AddProcedure {
            id: 0,
            new_node: ToNode::new("stem"),
        })]);
        assert!(matches!(
            validate_rule(&rule),
            Err(ValidationError::DuplicateId { id: 0, .. })
        ));
    }

    #[test]
    fn test_empty_pattern_and_nac() {
        let rule = Rule::new("nothing", Pattern::default(), vec![]);
        assert!(matches!(
            validate_rule(&rule),
            Err(ValidationError::EmptyPattern { .. })
        ));
        let rule = single_node_rule(vec![]).with_nac(Nac::default());
        assert!(matches!(
            validate_rule(&rule),
            Err(ValidationError::EmptyNac { .. })
        ));
    }

    #[test]
    fn test_nac_edges_may_use_pattern_ids() {
        let nac = Nac {
            name: None,
            nodes: vec![PatternNode::new(1, Some("stem"))],
            edges: vec![PatternEdge::new(0, 0, 1, None)],
        };
        assert_eq!(validate_rule(&single_node_rule(vec![]).with_nac(nac)), Ok(()));

        let nac = Nac {
            name: None,
            nodes: vec![],
            edges: vec![PatternEdge::new(0, 0, 9, None)],
        };
        assert!(validate_rule(&single_node_rule(vec![]).with_nac(nac)).is_err());
    }

    #[test]
    fn test_declared_types() {
        let mut tip = TypeDecl::new("tip");
        tip.attributes.insert("marked".to_string(), AttrKind::Bool);
        let types = TypeSet {
            nodes: vec![tip],
            edges: vec![],
        };
        let mut graph = HostGraph::new();
        graph.add_node(Node::new("tip").with_attribute("marked", true)).unwrap();
        assert_eq!(validate_graph(&graph, &types), Ok(()));

        graph.add_node(Node::new("tip").with_attribute("marked", 1)).unwrap();
        assert!(matches!(
            validate_graph(&graph, &types),
            Err(ValidationError::AttributeKind { .. })
        ));

        let rule = single_node_rule(vec![Procedure::Add(AddProcedure {
            id: 1,
            new_node: ToNode::new("stem"),
        })]);
        assert!(matches!(
            validate_rules(&[rule], &types),
            Err(ValidationError::UndeclaredNodeType { .. })
        ));
    }

    #[test]
    fn test_layer_order() {
        assert_eq!(validate_layer_order(&[2, 0, 1]), Ok(()));
        assert_eq!(
            validate_layer_order(&[0, 1, 0]),
            Err(ValidationError::DuplicateLayer(0))
        );
    }
}
