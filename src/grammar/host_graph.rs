use crate::grammar::node::{Edge, Node};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

pub type NodeId = usize;
pub type EdgeId = usize;

#[derive(Debug, Error, PartialEq)]
pub enum GraphError {
    #[error("node {0} does not exist")]
    MissingNode(NodeId),
    #[error("node {0} already exists")]
    DuplicateNode(NodeId),
    #[error("edge {0} already exists")]
    DuplicateEdge(EdgeId),
    #[error("id {0} leaves no room for further ids")]
    IdOverflow(usize),
}

#[derive(Debug, Clone, Default)]
/// A directed, typed multigraph that grammar rules rewrite.
/// All storage is ordered, so iterating nodes or edges always visits them by ascending id.
pub struct HostGraph {
    /// Store the nodes that exist, with their type and attributes.
    nodes: BTreeMap<NodeId, Node>,
    /// Store the edges that exist. Parallel edges are allowed.
    edges: BTreeMap<EdgeId, Edge>,
    /// Edges leaving the node that is the key.
    outgoing: BTreeMap<NodeId, BTreeSet<EdgeId>>,
    /// Edges entering the node that is the key.
    incoming: BTreeMap<NodeId, BTreeSet<EdgeId>>,
    /// The node ID for the next node to be generated.
    next_node: NodeId,
    /// The edge ID for the next edge to be generated.
    next_edge: EdgeId,
}

impl PartialEq for HostGraph {
    /// Structural equality: the fresh-id counters are not compared.
    fn eq(&self, other: &Self) -> bool {
        self.nodes == other.nodes && self.edges == other.edges
    }
}

impl HostGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Number of nodes.
    pub fn order(&self) -> usize {
        self.nodes.len()
    }

    /// Number of edges.
    pub fn size(&self) -> usize {
        self.edges.len()
    }

    pub fn has_node(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(&id)
    }

    pub fn edge(&self, id: EdgeId) -> Option<&Edge> {
        self.edges.get(&id)
    }

    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &Node)> + '_ {
        self.nodes.iter().map(|(id, node)| (*id, node))
    }

    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.keys().copied()
    }

    pub fn edges(&self) -> impl Iterator<Item = (EdgeId, &Edge)> + '_ {
        self.edges.iter().map(|(id, edge)| (*id, edge))
    }

    /// All edges going from `source` to `target`, by ascending edge id.
    pub fn edges_between(
        &self,
        source: NodeId,
        target: NodeId,
    ) -> impl Iterator<Item = (EdgeId, &Edge)> + '_ {
        self.outgoing
            .get(&source)
            .into_iter()
            .flat_map(|ids| ids.iter())
            .filter_map(move |id| {
                let edge = &self.edges[id];
                if edge.target == target {
                    Some((*id, edge))
                } else {
                    None
                }
            })
    }

    /// Every edge touching the node, in either direction. Self-loops are listed once.
    pub fn incident_edges(&self, id: NodeId) -> BTreeSet<EdgeId> {
        let mut incident = BTreeSet::new();
        if let Some(out) = self.outgoing.get(&id) {
            incident.extend(out.iter().copied());
        }
        if let Some(inc) = self.incoming.get(&id) {
            incident.extend(inc.iter().copied());
        }
        incident
    }

    pub fn add_node(&mut self, node: Node) -> Result<NodeId, GraphError> {
        let id = self.next_node;
        self.insert_node(id, node)?;
        Ok(id)
    }

    /// Add a node under a caller-chosen id, e.g. when reading a stored graph.
    pub fn add_node_with(&mut self, id: NodeId, node: Node) -> Result<(), GraphError> {
        if self.nodes.contains_key(&id) {
            return Err(GraphError::DuplicateNode(id));
        }
        self.insert_node(id, node)
    }

    fn insert_node(&mut self, id: NodeId, node: Node) -> Result<(), GraphError> {
        let next = id.checked_add(1).ok_or(GraphError::IdOverflow(id))?;
        self.nodes.insert(id, node);
        self.outgoing.insert(id, BTreeSet::new());
        self.incoming.insert(id, BTreeSet::new());
        self.next_node = self.next_node.max(next);
        Ok(())
    }

    pub fn add_edge(
        &mut self,
        source: NodeId,
        target: NodeId,
        edge_type: &str,
    ) -> Result<EdgeId, GraphError> {
        self.push_edge(Edge::new(edge_type, source, target))
    }

    /// Add an edge under a fresh id.
    pub fn push_edge(&mut self, edge: Edge) -> Result<EdgeId, GraphError> {
        let id = self.next_edge;
        self.add_edge_with(id, edge)?;
        Ok(id)
    }

    pub fn add_edge_with(&mut self, id: EdgeId, edge: Edge) -> Result<(), GraphError> {
        if self.edges.contains_key(&id) {
            return Err(GraphError::DuplicateEdge(id));
        }
        let next = id.checked_add(1).ok_or(GraphError::IdOverflow(id))?;
        for endpoint in &[edge.source, edge.target] {
            if !self.nodes.contains_key(endpoint) {
                return Err(GraphError::MissingNode(*endpoint));
            }
        }
        self.outgoing.entry(edge.source).or_default().insert(id);
        self.incoming.entry(edge.target).or_default().insert(id);
        self.edges.insert(id, edge);
        self.next_edge = self.next_edge.max(next);
        Ok(())
    }

    /// Remove a node together with every edge touching it.
    pub fn remove_node(&mut self, id: NodeId) -> Option<Node> {
        let node = self.nodes.remove(&id)?;
        for edge in self.incident_edges(id) {
            self.remove_edge(edge);
        }
        self.outgoing.remove(&id);
        self.incoming.remove(&id);
        Some(node)
    }

    pub fn remove_edge(&mut self, id: EdgeId) -> Option<Edge> {
        let edge = self.edges.remove(&id)?;
        if let Some(out) = self.outgoing.get_mut(&edge.source) {
            out.remove(&id);
        }
        if let Some(inc) = self.incoming.get_mut(&edge.target) {
            inc.remove(&id);
        }
        Some(edge)
    }

    /// Move every edge touching `from` over to `to`, keeping edge ids and directions.
    /// Edges between `from` and `to` become self-loops on `to`.
    pub fn redirect_edges(&mut self, from: NodeId, to: NodeId) -> Result<usize, GraphError> {
        for id in &[from, to] {
            if !self.nodes.contains_key(id) {
                return Err(GraphError::MissingNode(*id));
            }
        }
        let incident = self.incident_edges(from);
        for edge_id in &incident {
            if let Some(mut edge) = self.remove_edge(*edge_id) {
                if edge.source == from {
                    edge.source = to;
                }
                if edge.target == from {
                    edge.target = to;
                }
                self.add_edge_with(*edge_id, edge)?;
            }
        }
        Ok(incident.len())
    }
}
