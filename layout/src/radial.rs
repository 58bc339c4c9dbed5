use crate::{position_or, LayoutError, Positions};
use meshflow_core::config::{CanvasConfig, RadialConfig};
use meshflow_core::model::{Node, NodeId, Position};
use std::f64::consts::TAU;

/// The center node keeps its position; everyone else goes on one ring around it,
/// in input order, starting at angle zero.
pub fn layout(
    nodes: &[Node],
    center: NodeId,
    config: &RadialConfig,
    canvas: &CanvasConfig,
) -> Result<Positions, LayoutError> {
    let hub = nodes
        .iter()
        .find(|node| node.id == center)
        .ok_or(LayoutError::UnknownNode(center))?;

    let (cx, cy) = canvas.center();
    let origin = position_or(hub, Position::new(cx, cy));

    let mut positions = Positions::new();
    positions.insert(center, origin);

    let ring: Vec<NodeId> = nodes
        .iter()
        .map(|node| node.id)
        .filter(|id| *id != center)
        .collect();
    let count = ring.len() as f64;
    for (i, id) in ring.into_iter().enumerate() {
        let angle = i as f64 * TAU / count;
        positions.insert(
            id,
            Position::new(
                origin.x + config.radius * angle.cos(),
                origin.y + config.radius * angle.sin(),
            ),
        );
    }

    Ok(positions)
}
