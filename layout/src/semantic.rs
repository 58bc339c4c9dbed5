use crate::Positions;
use meshflow_core::config::{CanvasConfig, SemanticLayoutConfig};
use meshflow_core::model::{Node, NodeId, Position};
use std::f64::consts::TAU;
use storage::index::cosine_similarity;

/// Greedy leader grouping: a node joins the first group whose leader it is at
/// least `threshold` similar to, otherwise it leads a new group. Nodes without
/// an embedding share one trailing group.
pub fn group_by_similarity(nodes: &[Node], threshold: f32) -> Vec<Vec<NodeId>> {
    let mut leaders: Vec<&[f32]> = Vec::new();
    let mut groups: Vec<Vec<NodeId>> = Vec::new();
    let mut unembedded = Vec::new();

    for node in nodes {
        let Some(embedding) = node.embedding() else {
            unembedded.push(node.id);
            continue;
        };
        match leaders
            .iter()
            .position(|leader| cosine_similarity(leader, embedding) >= threshold)
        {
            Some(group) => groups[group].push(node.id),
            None => {
                leaders.push(embedding);
                groups.push(vec![node.id]);
            }
        }
    }

    if !unembedded.is_empty() {
        groups.push(unembedded);
    }
    groups
}

/// One grid cell per group, the grid centered on the canvas; members sit on a
/// small ring inside their cell.
pub fn layout(nodes: &[Node], config: &SemanticLayoutConfig, canvas: &CanvasConfig) -> Positions {
    let groups = group_by_similarity(nodes, config.group_threshold);
    let mut positions = Positions::new();
    if groups.is_empty() {
        return positions;
    }

    let columns = (groups.len() as f64).sqrt().ceil() as usize;
    let rows = groups.len().div_ceil(columns);
    let (cx, cy) = canvas.center();

    for (index, members) in groups.iter().enumerate() {
        let column = (index % columns) as f64;
        let row = (index / columns) as f64;
        let cell = Position::new(
            cx + (column - (columns - 1) as f64 / 2.0) * config.cell_size,
            cy + (row - (rows - 1) as f64 / 2.0) * config.cell_size,
        );

        if members.len() == 1 {
            positions.insert(members[0], cell);
            continue;
        }
        let count = members.len() as f64;
        for (i, id) in members.iter().enumerate() {
            let angle = i as f64 * TAU / count;
            positions.insert(
                *id,
                Position::new(
                    cell.x + config.ring_radius * angle.cos(),
                    cell.y + config.ring_radius * angle.sin(),
                ),
            );
        }
    }

    positions
}
