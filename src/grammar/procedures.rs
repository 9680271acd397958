use crate::grammar::host_graph::{EdgeId, GraphError, HostGraph, NodeId};
use crate::grammar::matcher::Match;
use crate::grammar::ToNode;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Rules to follow to go from LHS to RHS.
/// Instead of a right-hand side graph and a morphism, a rule carries a short script of
/// procedures that run in order against the matched nodes.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum Procedure {
    Delete(DeleteProcedure),
    Replace(ReplaceProcedure),
    Add(AddProcedure),
    Connect(ConnectProcedure),
    Disconnect(DisconnectProcedure),
    Merge(MergeProcedure),
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeleteProcedure {
    pub target: i32,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct ReplaceProcedure {
    pub target: i32,
    #[serde(rename = "with")]
    pub replacement: ToNode,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct AddProcedure {
    /// Rule-local id the new node is bound to, for procedures that follow.
    pub id: i32,
    #[serde(rename = "node")]
    pub new_node: ToNode,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct ConnectProcedure {
    pub source: i32,
    pub target: i32,
    #[serde(rename = "type")]
    pub edge_type: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DisconnectProcedure {
    /// Id of a pattern edge.
    pub target: i32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MergeProcedure {
    /// All the nodes to merge into the final node
    pub targets: Vec<i32>,
    /// Which node should remain
    pub final_node: i32,
}

#[derive(Debug, Error, PartialEq)]
pub enum ProcedureError {
    #[error("no node is bound to rule id {0}")]
    UnboundNode(i32),
    #[error("no edge is bound to rule id {0}")]
    UnboundEdge(i32),
    #[error(transparent)]
    Graph(#[from] GraphError),
}

/// Tracks the results of a procedure application.
#[derive(Debug, Clone, PartialEq)]
pub enum ApplyResult {
    Removed(Vec<NodeId>),
    Added(NodeId),
    Modified(NodeId),
    Connected(EdgeId),
    Disconnected(EdgeId),
}

fn bound(bindings: &Match, id: i32) -> Result<NodeId, ProcedureError> {
    bindings
        .nodes
        .get(&id)
        .copied()
        .ok_or(ProcedureError::UnboundNode(id))
}

impl Procedure {
    /// Pattern node ids the procedure needs to be bound before it runs.
    pub fn node_references(&self) -> Vec<i32> {
        match self {
            Procedure::Delete(proc) => vec![proc.target],
            Procedure::Replace(proc) => vec![proc.target],
            Procedure::Add(_) => vec![],
            Procedure::Connect(proc) => vec![proc.source, proc.target],
            Procedure::Disconnect(_) => vec![],
            Procedure::Merge(proc) => {
                let mut refs = vec![proc.final_node];
                refs.extend(proc.targets.iter().copied());
                refs
            }
        }
    }

    /// Pattern edge ids the procedure needs.
    pub fn edge_references(&self) -> Vec<i32> {
        match self {
            Procedure::Disconnect(proc) => vec![proc.target],
            _ => vec![],
        }
    }

    /// The new rule-local id this procedure introduces, if any.
    pub fn binds(&self) -> Option<i32> {
        match self {
            Procedure::Add(proc) => Some(proc.id),
            _ => None,
        }
    }

    /// The id the procedure unbinds by deleting its node, if any.
    pub fn unbinds(&self) -> Option<i32> {
        match self {
            Procedure::Delete(proc) => Some(proc.target),
            _ => None,
        }
    }

    pub fn deletes(&self, id: i32) -> bool {
        self.unbinds() == Some(id)
    }

    /// Apply the contents of the Procedure to a matched graph, updating the bindings
    /// so later procedures see the nodes this one created or removed.
    pub fn apply(
        &self,
        graph: &mut HostGraph,
        bindings: &mut Match,
    ) -> Result<ApplyResult, ProcedureError> {
        match self {
            Procedure::Delete(proc) => {
                let target = bound(bindings, proc.target)?;
                graph
                    .remove_node(target)
                    .ok_or(GraphError::MissingNode(target))?;
                bindings.nodes.remove(&proc.target);
                // Edges that went away with the node can't be disconnected later.
                bindings.edges.retain(|_, edge| graph.edge(*edge).is_some());
                Ok(ApplyResult::Removed(vec![target]))
            }
            Procedure::Replace(proc) => {
                let target = bound(bindings, proc.target)?;
                let node = graph
                    .node_mut(target)
                    .ok_or(GraphError::MissingNode(target))?;
                proc.replacement.apply_to(node);
                Ok(ApplyResult::Modified(target))
            }
            Procedure::Add(proc) => {
                let node_id = graph.add_node(proc.new_node.build())?;
                log::debug!("Bound new node {} to rule id {}", node_id, proc.id);
                bindings.nodes.insert(proc.id, node_id);
                Ok(ApplyResult::Added(node_id))
            }
            Procedure::Connect(proc) => {
                let source = bound(bindings, proc.source)?;
                let target = bound(bindings, proc.target)?;
                let edge = graph.add_edge(source, target, &proc.edge_type)?;
                Ok(ApplyResult::Connected(edge))
            }
            Procedure::Disconnect(proc) => {
                let edge = bindings
                    .edges
                    .remove(&proc.target)
                    .ok_or(ProcedureError::UnboundEdge(proc.target))?;
                match graph.remove_edge(edge) {
                    Some(_) => Ok(ApplyResult::Disconnected(edge)),
                    None => Err(ProcedureError::UnboundEdge(proc.target)),
                }
            }
            Procedure::Merge(proc) => {
                let final_node = bound(bindings, proc.final_node)?;
                // Ensure that all nodes to be merged are bound before touching the graph.
                let targets = proc
                    .targets
                    .iter()
                    .map(|rule_id| bound(bindings, *rule_id).map(|id| (*rule_id, id)))
                    .collect::<Result<Vec<_>, _>>()?;
                let mut removed = Vec::new();
                for (rule_id, node_id) in targets {
                    if node_id == final_node {
                        continue;
                    }
                    graph.redirect_edges(node_id, final_node)?;
                    graph.remove_node(node_id);
                    bindings.nodes.insert(rule_id, final_node);
                    removed.push(node_id);
                }
                Ok(ApplyResult::Removed(removed))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::grammar::{Node, Value};
    use maplit::btreemap;

    /// Gets a triangle graph with all nodes connected, plus its associated bindings
    fn get_simple_graph() -> (HostGraph, Match) {
        let mut graph = HostGraph::new();
        graph.add_node(Node::new("a")).unwrap();
        graph.add_node(Node::new("b")).unwrap();
        graph.add_node(Node::new("c")).unwrap();
        graph.add_edge(0, 1, "next").unwrap();
        graph.add_edge(1, 2, "next").unwrap();
        graph.add_edge(2, 0, "next").unwrap();

        let bindings = Match {
            nodes: btreemap! {
                2 => 0,
                1 => 1,
                0 => 2,
            },
            edges: btreemap! { 10 => 0 },
        };

        (graph, bindings)
    }

    #[test]
    fn test_add_then_connect() {
        let (mut graph, mut bindings) = get_simple_graph();
        let add = Procedure::Add(AddProcedure {
            id: 5,
            new_node: ToNode::new("newnode"),
        });
        let connect = Procedure::Connect(ConnectProcedure {
            source: 5,
            target: 0,
            edge_type: "next".to_string(),
        });
        assert_eq!(add.apply(&mut graph, &mut bindings), Ok(ApplyResult::Added(3)));
        assert_eq!(
            connect.apply(&mut graph, &mut bindings),
            Ok(ApplyResult::Connected(3))
        );
        assert_eq!(graph.node(3).unwrap().node_type, "newnode");
        assert_eq!(graph.edges_between(3, 2).count(), 1);
    }

    #[test]
    fn test_simple_delete() {
        let proc = Procedure::Delete(DeleteProcedure { target: 2 });
        let (mut graph, mut bindings) = get_simple_graph();
        assert_eq!(
            proc.apply(&mut graph, &mut bindings),
            Ok(ApplyResult::Removed(vec![0]))
        );
        assert_eq!(graph.order(), 2);
        assert_eq!(graph.size(), 1);
        // Edge 0 touched node 0, so its binding is gone.
        assert!(bindings.edges.is_empty());
        assert!(!bindings.nodes.contains_key(&2));
    }

    #[test]
    fn test_unbound_target() {
        let proc = Procedure::Delete(DeleteProcedure { target: 7 });
        let (mut graph, mut bindings) = get_simple_graph();
        assert_eq!(
            proc.apply(&mut graph, &mut bindings),
            Err(ProcedureError::UnboundNode(7))
        );
        assert_eq!(graph.order(), 3);
    }

    #[test]
    fn test_replace_keeps_edges() {
        let proc = Procedure::Replace(ReplaceProcedure {
            target: 1,
            replacement: ToNode {
                node_type: Some("stem".to_string()),
                attributes: btreemap! { "len".to_string() => Value::Int(2) },
            },
        });
        let (mut graph, mut bindings) = get_simple_graph();
        assert_eq!(
            proc.apply(&mut graph, &mut bindings),
            Ok(ApplyResult::Modified(1))
        );
        assert_eq!(graph.node(1).unwrap().node_type, "stem");
        assert_eq!(graph.incident_edges(1).len(), 2);
    }

    #[test]
    fn test_disconnect() {
        let proc = Procedure::Disconnect(DisconnectProcedure { target: 10 });
        let (mut graph, mut bindings) = get_simple_graph();
        assert_eq!(
            proc.apply(&mut graph, &mut bindings),
            Ok(ApplyResult::Disconnected(0))
        );
        assert_eq!(graph.size(), 2);
        assert_eq!(
            proc.apply(&mut graph, &mut bindings),
            Err(ProcedureError::UnboundEdge(10))
        );
    }

    #[test]
    fn test_merge() {
        let proc = Procedure::Merge(MergeProcedure {
            final_node: 2,
            targets: vec![1, 0],
        });
        let (mut graph, mut bindings) = get_simple_graph();
        assert_eq!(
            proc.apply(&mut graph, &mut bindings),
            Ok(ApplyResult::Removed(vec![1, 2]))
        );
        assert_eq!(graph.order(), 1);
        // Every edge of the triangle now loops on the remaining node.
        assert_eq!(graph.edges_between(0, 0).count(), 3);
        assert_eq!(bindings.nodes[&0], 0);
    }
}
