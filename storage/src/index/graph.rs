use meshflow_core::model::{Edge, EdgeKey, NodeId};
use std::collections::{HashMap, HashSet};

/// Adjacency list over node ids.
///
/// Edges keep their `source -> target` direction for traversal, but uniqueness is
/// judged on the unordered pair: once `(a, b)` exists, `(b, a)` is a duplicate.
pub struct AdjacencyGraph {
    outgoing: HashMap<NodeId, Vec<NodeId>>,
    pairs: HashSet<EdgeKey>,
}

impl AdjacencyGraph {
    pub fn new() -> Self {
        Self {
            outgoing: HashMap::new(),
            pairs: HashSet::new(),
        }
    }

    pub fn from_edges<'a>(edges: impl IntoIterator<Item = &'a Edge>) -> Self {
        let mut graph = Self::new();
        for edge in edges {
            graph.add_edge(edge.source, edge.target);
        }
        graph
    }

    /// Returns `false` when the unordered pair is already connected.
    pub fn add_edge(&mut self, source: NodeId, target: NodeId) -> bool {
        if !self.pairs.insert(EdgeKey::new(source, target)) {
            return false;
        }
        self.outgoing.entry(source).or_default().push(target);
        true
    }

    pub fn remove_edge(&mut self, a: NodeId, b: NodeId) -> bool {
        if !self.pairs.remove(&EdgeKey::new(a, b)) {
            return false;
        }
        for (from, to) in [(a, b), (b, a)] {
            if let Some(targets) = self.outgoing.get_mut(&from) {
                targets.retain(|t| *t != to);
            }
        }
        true
    }

    /// Unordered membership test.
    pub fn contains(&self, a: NodeId, b: NodeId) -> bool {
        self.pairs.contains(&EdgeKey::new(a, b))
    }

    /// Directed successors, in insertion order.
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.outgoing.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Directed `(source, target)` pairs.
    pub fn edges(&self) -> Vec<(NodeId, NodeId)> {
        let mut out: Vec<(NodeId, NodeId)> = self
            .outgoing
            .iter()
            .flat_map(|(source, targets)| targets.iter().map(move |target| (*source, *target)))
            .collect();
        out.sort_unstable();
        out
    }
}

impl Default for AdjacencyGraph {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_graph_rejects_reversed_duplicate() {
        let mut graph = AdjacencyGraph::new();
        assert!(graph.add_edge(1, 2));
        assert!(!graph.add_edge(2, 1));
        assert!(!graph.add_edge(1, 2));

        assert!(graph.contains(2, 1));
        assert_eq!(graph.edges(), vec![(1, 2)]);
    }

    #[test]
    fn test_graph_children_are_directed() {
        let mut graph = AdjacencyGraph::new();
        graph.add_edge(1, 2);
        graph.add_edge(1, 3);
        graph.add_edge(4, 1);

        assert_eq!(graph.children(1), &[2, 3]);
        assert!(graph.children(2).is_empty());
        assert_eq!(graph.children(4), &[1]);
    }

    #[test]
    fn test_remove_edge_is_unordered() {
        let mut graph = AdjacencyGraph::new();
        graph.add_edge(5, 6);
        assert!(graph.remove_edge(6, 5));
        assert!(graph.children(5).is_empty());
        assert!(!graph.remove_edge(5, 6));

        // The pair is free again.
        assert!(graph.add_edge(6, 5));
        assert_eq!(graph.children(6), &[5]);
    }
}
