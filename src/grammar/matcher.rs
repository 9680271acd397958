use crate::grammar::host_graph::{EdgeId, HostGraph, NodeId};
use crate::grammar::rule::{Nac, PatternEdge, Rule};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// One occurrence of a rule's pattern in the host graph.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Match {
    /// Pattern node id -> host node id.
    pub nodes: BTreeMap<i32, NodeId>,
    /// Pattern edge id -> host edge id.
    pub edges: BTreeMap<i32, EdgeId>,
}

impl Rule {
    pub fn matches<'a>(&'a self, graph: &'a HostGraph) -> MatchingState<'a> {
        MatchingState::new(self, graph)
    }

    /// The first match in enumeration order: pattern nodes in declaration order are tried
    /// against host nodes by ascending id, so the result is stable across runs.
    pub fn first_match(&self, graph: &HostGraph, check_dangling: bool) -> Option<Match> {
        self.matches(graph).check_dangling(check_dangling).next()
    }
}

pub enum MatchingDecision {
    NoMatch,
    Continue,
    Mapped,
}

/// Hold state for matching function.
pub struct MatchingState<'a> {
    graph: &'a HostGraph,
    rule: &'a Rule,
    /// Pattern edges, grouped by the pattern index at which both endpoints become known.
    /// Typed edges come before untyped ones so greedy edge assignment stays complete.
    edges_by_level: Vec<Vec<&'a PatternEdge>>,
    /// Position of each pattern node id in the pattern.
    positions: HashMap<i32, usize>,
    /// Indexable copy of the graph nodes
    graph_nodes: Vec<NodeId>,
    /// The current pattern node we are checking against.
    pattern_index: usize,
    /// Store the next candidate to try for a given pattern node.
    progress: Vec<usize>,
    /// Host nodes assigned so far, one per matched pattern node.
    assigned: Vec<NodeId>,
    /// Host edges claimed while assigning each pattern node.
    claimed_edges: Vec<Vec<(i32, EdgeId)>>,
    /// Reject matches that would leave edges dangling from deleted nodes.
    check_dangling: bool,
    exhausted: bool,
}

impl<'a> MatchingState<'a> {
    pub fn new(rule: &'a Rule, graph: &'a HostGraph) -> Self {
        let nodes = &rule.from.nodes;
        let positions: HashMap<i32, usize> = nodes
            .iter()
            .enumerate()
            .map(|(index, node)| (node.id, index))
            .collect();

        let mut exhausted = false;
        if nodes.is_empty() {
            log::warn!("Rule {} has an empty pattern and never matches", rule.name);
            exhausted = true;
        }

        let mut edges_by_level: Vec<Vec<&PatternEdge>> = vec![Vec::new(); nodes.len()];
        for edge in &rule.from.edges {
            match (positions.get(&edge.source), positions.get(&edge.target)) {
                (Some(s), Some(t)) => edges_by_level[*s.max(t)].push(edge),
                _ => {
                    log::warn!(
                        "Edge {} of rule {} references an unknown node; the rule never matches",
                        edge.id,
                        rule.name
                    );
                    exhausted = true;
                }
            }
        }
        for level in edges_by_level.iter_mut() {
            level.sort_by_key(|edge| edge.edge_type.is_none());
        }

        Self {
            graph,
            rule,
            edges_by_level,
            positions,
            graph_nodes: graph.node_ids().collect(),
            pattern_index: 0,
            progress: vec![0; nodes.len()],
            assigned: Vec::with_capacity(nodes.len()),
            claimed_edges: Vec::with_capacity(nodes.len()),
            check_dangling: false,
            exhausted,
        }
    }

    pub fn check_dangling(mut self, check: bool) -> Self {
        self.check_dangling = check;
        self
    }

    /// Find the next tentative assignment for the current pattern node, or backtrack.
    pub fn continue_search(&mut self) -> MatchingDecision {
        if self.exhausted {
            return MatchingDecision::NoMatch;
        }
        let pattern_len = self.rule.from.nodes.len();
        // Exit condition 1: We have found a match that needs to be handled.
        if self.pattern_index >= pattern_len {
            return MatchingDecision::Mapped;
        }

        // Scan graph nodes until we find a match.
        let start = self.progress[self.pattern_index];
        for i in start..self.graph_nodes.len() {
            let candidate = self.graph_nodes[i];
            if let Some(edges) = self.try_assign(candidate) {
                log::trace!(
                    "Tentative match {}->{} for rule {}",
                    self.rule.from.nodes[self.pattern_index].id,
                    candidate,
                    self.rule.name
                );
                // Bookmark progress
                self.progress[self.pattern_index] = i + 1;
                self.assigned.push(candidate);
                self.claimed_edges.push(edges);
                self.pattern_index += 1;
                if self.pattern_index < pattern_len {
                    self.progress[self.pattern_index] = 0;
                }
                return MatchingDecision::Continue;
            }
        }

        // Exit condition 2: the first pattern node ran out of candidates.
        if self.pattern_index == 0 {
            self.exhausted = true;
            return MatchingDecision::NoMatch;
        }

        // Back up to the previous pattern node, which resumes after its bookmark.
        self.pattern_index -= 1;
        self.assigned.pop();
        self.claimed_edges.pop();
        MatchingDecision::Continue
    }

    /// The host node standing in for a pattern node, given a candidate for the current one.
    fn host_for(&self, pattern_id: i32, candidate: NodeId) -> NodeId {
        let position = self.positions[&pattern_id];
        if position == self.pattern_index {
            candidate
        } else {
            self.assigned[position]
        }
    }

    fn edge_claimed(&self, id: EdgeId) -> bool {
        self.claimed_edges
            .iter()
            .flatten()
            .any(|(_, claimed)| *claimed == id)
    }

    /// Check the candidate against the current pattern node and the edges that close on it.
    /// Returns the host edges claimed for those pattern edges.
    fn try_assign(&self, candidate: NodeId) -> Option<Vec<(i32, EdgeId)>> {
        if self.assigned.contains(&candidate) {
            return None;
        }
        let node = self.graph.node(candidate)?;
        if !self.rule.from.nodes[self.pattern_index].match_node(node) {
            return None;
        }

        let mut claimed: Vec<(i32, EdgeId)> = Vec::new();
        for edge in &self.edges_by_level[self.pattern_index] {
            let source = self.host_for(edge.source, candidate);
            let target = self.host_for(edge.target, candidate);
            let found = self
                .graph
                .edges_between(source, target)
                .find(|(id, host_edge)| {
                    edge.match_type(&host_edge.edge_type)
                        && !self.edge_claimed(*id)
                        && !claimed.iter().any(|(_, c)| c == id)
                })
                .map(|(id, _)| id);
            claimed.push((edge.id, found?));
        }
        Some(claimed)
    }

    fn current_match(&self) -> Match {
        Match {
            nodes: self
                .rule
                .from
                .nodes
                .iter()
                .zip(self.assigned.iter())
                .map(|(pattern, host)| (pattern.id, *host))
                .collect(),
            edges: self.claimed_edges.iter().flatten().copied().collect(),
        }
    }

    /// Once we report a match, back up one pattern node so the search can continue.
    pub fn reset_match(&mut self) {
        if self.pattern_index == 0 {
            log::debug!("Tried to reset but there was nothing to reset.");
            return;
        }
        self.pattern_index -= 1;
        self.assigned.pop();
        self.claimed_edges.pop();
    }

    /// Whether deleting the matched nodes would leave edges the pattern doesn't cover.
    fn leaves_dangling(&self, found: &Match) -> bool {
        let matched_edges: BTreeSet<EdgeId> = found.edges.values().copied().collect();
        found.nodes.iter().any(|(pattern_id, host_id)| {
            self.rule.deletes(*pattern_id)
                && self
                    .graph
                    .incident_edges(*host_id)
                    .iter()
                    .any(|edge| !matched_edges.contains(edge))
        })
    }

    fn accepts(&self, found: &Match) -> bool {
        if self.check_dangling && self.leaves_dangling(found) {
            log::debug!("Match {:?} of {} would leave dangling edges", found.nodes, self.rule.name);
            return false;
        }
        for nac in &self.rule.nacs {
            if nac_found(self.graph, nac, found) {
                log::debug!(
                    "Match {:?} of {} forbidden by NAC {}",
                    found.nodes,
                    self.rule.name,
                    nac.name.as_deref().unwrap_or("<unnamed>")
                );
                return false;
            }
        }
        true
    }
}

/// Check whether the negative context of a NAC exists around a match.
/// NAC nodes are matched injectively, also with respect to the matched nodes.
pub fn nac_found(graph: &HostGraph, nac: &Nac, found: &Match) -> bool {
    let mut bindings = found.nodes.clone();
    let mut used: BTreeSet<NodeId> = bindings.values().copied().collect();
    extend_nac(graph, nac, 0, &mut bindings, &mut used)
}

fn extend_nac(
    graph: &HostGraph,
    nac: &Nac,
    index: usize,
    bindings: &mut BTreeMap<i32, NodeId>,
    used: &mut BTreeSet<NodeId>,
) -> bool {
    if index == nac.nodes.len() {
        return nac.edges.iter().all(|edge| {
            match (bindings.get(&edge.source), bindings.get(&edge.target)) {
                (Some(source), Some(target)) => graph
                    .edges_between(*source, *target)
                    .any(|(_, host_edge)| edge.match_type(&host_edge.edge_type)),
                _ => false,
            }
        });
    }

    let pattern = &nac.nodes[index];
    for (candidate, node) in graph.nodes() {
        if used.contains(&candidate) || !pattern.match_node(node) {
            continue;
        }
        bindings.insert(pattern.id, candidate);
        used.insert(candidate);
        if extend_nac(graph, nac, index + 1, bindings, used) {
            return true;
        }
        bindings.remove(&pattern.id);
        used.remove(&candidate);
    }
    false
}

impl Iterator for MatchingState<'_> {
    type Item = Match;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.continue_search() {
                MatchingDecision::NoMatch => return None,
                MatchingDecision::Continue => {}
                MatchingDecision::Mapped => {
                    let found = self.current_match();
                    self.reset_match();
                    if self.accepts(&found) {
                        return Some(found);
                    }
                }
            }
        }
    }
}
