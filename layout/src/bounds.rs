use crate::Positions;
use meshflow_core::model::{NodeId, Position};
use std::collections::HashSet;
use tracing::warn;

const GOLDEN_ANGLE: f64 = 2.399_963_229_728_653;

/// Replaces non-finite coordinates with `fallback`.
pub fn sanitize(positions: &mut Positions, fallback: Position) {
    for (id, position) in positions.iter_mut() {
        if !position.is_finite() {
            warn!("Layout produced a non-finite position for node {}, resetting", id);
            *position = fallback;
        }
    }
}

/// Moves nodes that share exact coordinates onto a small spiral around the
/// shared point. The first occupant stays put; the result depends only on input order.
pub fn separate_coincident(points: &mut [(NodeId, Position)], spread: f64) {
    let spread = if spread > 0.0 { spread } else { 1.0 };
    let mut seen: HashSet<(u64, u64)> = HashSet::with_capacity(points.len());
    let mut displaced = 0usize;

    for (_, position) in points.iter_mut() {
        let origin = *position;
        let mut candidate = origin;
        while !seen.insert(bits(&candidate)) {
            displaced += 1;
            let angle = displaced as f64 * GOLDEN_ANGLE;
            let radius = spread * (displaced as f64).sqrt();
            candidate = Position::new(origin.x + radius * angle.cos(), origin.y + radius * angle.sin());
        }
        *position = candidate;
    }
}

fn bits(position: &Position) -> (u64, u64) {
    // -0.0 and 0.0 are the same spot
    ((position.x + 0.0).to_bits(), (position.y + 0.0).to_bits())
}
