use crate::{position_or, LayoutError, Positions};
use meshflow_core::config::{CanvasConfig, HierarchicalConfig};
use meshflow_core::model::{Edge, Node, NodeId, Position};
use std::collections::{HashMap, HashSet, VecDeque};
use storage::index::AdjacencyGraph;

/// Breadth-first tree from `root`, following edges source -> target.
///
/// Each level sits `level_offset` below its parent. Every subtree gets a band as
/// wide as its leaves need, and children are centered under the parent's x, so
/// cousins never share a slot. Nodes the traversal never reaches keep their
/// position.
pub fn layout(
    nodes: &[Node],
    edges: &[Edge],
    root: NodeId,
    config: &HierarchicalConfig,
    canvas: &CanvasConfig,
) -> Result<Positions, LayoutError> {
    let root_node = nodes
        .iter()
        .find(|node| node.id == root)
        .ok_or(LayoutError::UnknownNode(root))?;

    let (cx, cy) = canvas.center();
    let fallback = Position::new(cx, cy);
    let known: HashSet<NodeId> = nodes.iter().map(|node| node.id).collect();
    let graph = AdjacencyGraph::from_edges(
        edges
            .iter()
            .filter(|edge| known.contains(&edge.source) && known.contains(&edge.target)),
    );

    // BFS tree: each node hangs under whoever reached it first.
    let mut order = vec![root];
    let mut tree: HashMap<NodeId, Vec<NodeId>> = HashMap::new();
    let mut visited: HashSet<NodeId> = HashSet::from([root]);
    let mut queue = VecDeque::from([root]);
    while let Some(parent) = queue.pop_front() {
        let children: Vec<NodeId> = graph
            .children(parent)
            .iter()
            .copied()
            .filter(|child| visited.insert(*child))
            .collect();
        order.extend(&children);
        queue.extend(&children);
        tree.insert(parent, children);
    }

    // Width in sibling slots; children always follow their parent in BFS order.
    let mut width: HashMap<NodeId, f64> = HashMap::new();
    for id in order.iter().rev() {
        let leaves: f64 = tree[id].iter().map(|child| width[child]).sum();
        width.insert(*id, leaves.max(1.0));
    }

    let mut positions = Positions::new();
    positions.insert(root, position_or(root_node, fallback));
    for parent in &order {
        let children = &tree[parent];
        if children.is_empty() {
            continue;
        }
        let anchor = positions[parent];
        let band: f64 = children.iter().map(|child| width[child]).sum();
        let mut left = -band / 2.0;
        for child in children {
            let slots = width[child];
            let x = anchor.x + (left + slots / 2.0) * config.sibling_spacing;
            positions.insert(*child, Position::new(x, anchor.y + config.level_offset));
            left += slots;
        }
    }

    for node in nodes {
        positions
            .entry(node.id)
            .or_insert_with(|| position_or(node, fallback));
    }

    Ok(positions)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain() -> (Vec<Node>, Vec<Edge>) {
        let nodes = vec![
            Node::new(1, 1, "root", "").with_position(200.0, 50.0),
            Node::new(2, 1, "a", ""),
            Node::new(3, 1, "b", ""),
            Node::new(4, 1, "c", ""),
        ];
        let edges = vec![
            Edge::new(1, 1, 1, 2),
            Edge::new(2, 1, 2, 3),
            Edge::new(3, 1, 3, 4),
        ];
        (nodes, edges)
    }

    #[test]
    fn test_chain_levels() {
        let (nodes, edges) = chain();
        let config = HierarchicalConfig::default();

        let positions = layout(&nodes, &edges, 1, &config, &CanvasConfig::default()).unwrap();

        let root_y = positions[&1].y;
        assert!((positions[&3].y - (root_y + 2.0 * config.level_offset)).abs() < 1e-9);
        assert!((positions[&4].y - (root_y + 3.0 * config.level_offset)).abs() < 1e-9);
        assert_eq!(positions[&4].x, 200.0);
    }

    #[test]
    fn test_siblings_centered_under_parent() {
        let nodes: Vec<Node> = (1..=4)
            .map(|id| Node::new(id, 1, "n", "").with_position(0.0, 0.0))
            .collect();
        let edges = vec![
            Edge::new(1, 1, 1, 2),
            Edge::new(2, 1, 1, 3),
            Edge::new(3, 1, 1, 4),
        ];
        let config = HierarchicalConfig {
            level_offset: 100.0,
            sibling_spacing: 50.0,
        };

        let positions = layout(&nodes, &edges, 1, &config, &CanvasConfig::default()).unwrap();

        assert_eq!(positions[&2], Position::new(-50.0, 100.0));
        assert_eq!(positions[&3], Position::new(0.0, 100.0));
        assert_eq!(positions[&4], Position::new(50.0, 100.0));
    }

    #[test]
    fn test_cousins_do_not_overlap() {
        let nodes: Vec<Node> = (1..=7)
            .map(|id| Node::new(id, 1, "n", "").with_position(0.0, 0.0))
            .collect();
        let edges = vec![
            Edge::new(1, 1, 1, 2),
            Edge::new(2, 1, 1, 3),
            Edge::new(3, 1, 2, 4),
            Edge::new(4, 1, 2, 5),
            Edge::new(5, 1, 3, 6),
            Edge::new(6, 1, 3, 7),
        ];
        let config = HierarchicalConfig {
            level_offset: 100.0,
            sibling_spacing: 40.0,
        };

        let positions = layout(&nodes, &edges, 1, &config, &CanvasConfig::default()).unwrap();

        assert_eq!(positions[&2], Position::new(-40.0, 100.0));
        assert_eq!(positions[&3], Position::new(40.0, 100.0));
        let xs: Vec<f64> = (4..=7).map(|id| positions[&id].x).collect();
        assert_eq!(xs, vec![-60.0, -20.0, 20.0, 60.0]);
        assert!((4..=7).all(|id| positions[&id].y == 200.0));
    }

    #[test]
    fn test_edges_are_directed_and_unreachable_nodes_stay() {
        let nodes = vec![
            Node::new(1, 1, "root", "").with_position(0.0, 0.0),
            Node::new(2, 1, "parent of root", "").with_position(7.0, 7.0),
            Node::new(3, 1, "island", "").with_position(-3.0, 9.0),
        ];
        // 2 -> 1 points into the root, so 2 is not below it
        let edges = vec![Edge::new(1, 1, 2, 1)];

        let positions = layout(
            &nodes,
            &edges,
            1,
            &HierarchicalConfig::default(),
            &CanvasConfig::default(),
        )
        .unwrap();

        assert_eq!(positions[&2], Position::new(7.0, 7.0));
        assert_eq!(positions[&3], Position::new(-3.0, 9.0));
    }

    #[test]
    fn test_cycle_terminates() {
        let (nodes, mut edges) = chain();
        edges.push(Edge::new(4, 1, 4, 1));
        let positions = layout(
            &nodes,
            &edges,
            1,
            &HierarchicalConfig::default(),
            &CanvasConfig::default(),
        )
        .unwrap();
        assert_eq!(positions.len(), 4);
        assert_eq!(positions[&1], Position::new(200.0, 50.0));
    }
}
