pub mod animation;
pub mod bounds;
pub mod force;
pub mod hierarchical;
pub mod radial;
pub mod semantic;

use meshflow_core::config::LayoutConfig;
use meshflow_core::error::{ErrorCode, MeshflowError};
use meshflow_core::model::{Edge, Node, NodeId, Position};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Instant;
use thiserror::Error;
use tracing::debug;

pub use animation::{ease_out_cubic, interpolate, AnimationFrame, AnimationHandle, AnimationOutcome, Animator};

/// Proposed coordinates keyed by node id. Callers decide what to persist.
pub type Positions = BTreeMap<NodeId, Position>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum LayoutStrategy {
    Force,
    Radial { center: NodeId },
    Hierarchical { root: NodeId },
    Semantic,
}

#[derive(Error, Debug, PartialEq)]
pub enum LayoutError {
    #[error("Node {0} is not part of the layout input")]
    UnknownNode(NodeId),
}

impl MeshflowError for LayoutError {
    fn error_code(&self) -> ErrorCode {
        match self {
            LayoutError::UnknownNode(_) => ErrorCode::InvalidArgument,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct LayoutEngine {
    config: LayoutConfig,
}

impl LayoutEngine {
    pub fn new(config: LayoutConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    /// Computes positions for every input node. Edges whose endpoints are not
    /// both in `nodes` are ignored.
    pub fn compute(
        &self,
        strategy: LayoutStrategy,
        nodes: &[Node],
        edges: &[Edge],
    ) -> Result<Positions, LayoutError> {
        if nodes.is_empty() {
            return Ok(Positions::new());
        }

        let started = Instant::now();
        let canvas = &self.config.canvas;
        let mut positions = match strategy {
            LayoutStrategy::Force => force::layout(nodes, edges, &self.config.force, canvas),
            LayoutStrategy::Radial { center } => {
                radial::layout(nodes, center, &self.config.radial, canvas)?
            }
            LayoutStrategy::Hierarchical { root } => {
                hierarchical::layout(nodes, edges, root, &self.config.hierarchical, canvas)?
            }
            LayoutStrategy::Semantic => semantic::layout(nodes, &self.config.semantic, canvas),
        };

        let (cx, cy) = canvas.center();
        bounds::sanitize(&mut positions, Position::new(cx, cy));

        debug!(
            "Computed {:?} layout for {} nodes in {:?}",
            strategy,
            positions.len(),
            started.elapsed()
        );
        Ok(positions)
    }
}

/// Last known positions, skipping nodes that have none.
pub fn current_positions(nodes: &[Node]) -> Positions {
    nodes
        .iter()
        .filter_map(|node| {
            node.position
                .filter(Position::is_finite)
                .map(|position| (node.id, position))
        })
        .collect()
}

/// Existing position, or the canvas center for nodes that were never placed.
pub(crate) fn position_or(node: &Node, fallback: Position) -> Position {
    node.position.filter(Position::is_finite).unwrap_or(fallback)
}
