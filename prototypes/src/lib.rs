//! Synthetic workspaces for benchmarks: nodes drawn around a few topic
//! directions, chained inside each topic.

use meshflow_core::embedding::{deterministic_embedding, l2_normalize};
use meshflow_core::model::{Edge, Node, WorkspaceId};

const MODEL_ID: &str = "synthetic-v1";
const NOISE: f32 = 0.15;

pub struct SyntheticWorkspace {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

/// `node_count` nodes spread round-robin over `topics` topics. Node `i` of a
/// topic is linked to node `i - 1` of the same topic.
pub fn synthetic_workspace(
    workspace_id: WorkspaceId,
    node_count: u64,
    topics: u64,
    dims: usize,
) -> SyntheticWorkspace {
    let topics = topics.max(1);
    let centroids: Vec<Vec<f32>> = (0..topics)
        .map(|t| deterministic_embedding(&format!("topic {t}"), MODEL_ID, dims))
        .collect();

    let mut nodes = Vec::with_capacity(node_count as usize);
    let mut edges = Vec::new();
    for id in 1..=node_count {
        let topic = (id - 1) % topics;
        let title = format!("Topic {topic} note {id}");
        let noise = deterministic_embedding(&title, MODEL_ID, dims);
        let mut embedding: Vec<f32> = centroids[topic as usize]
            .iter()
            .zip(&noise)
            .map(|(c, n)| c + NOISE * n)
            .collect();
        l2_normalize(&mut embedding);

        nodes.push(
            Node::new(id, workspace_id, title, format!("Synthetic body for note {id}"))
                .with_embedding(embedding)
                .with_tags([format!("topic-{topic}")]),
        );

        if id > topics {
            edges.push(Edge::new(edges.len() as u64 + 1, workspace_id, id - topics, id));
        }
    }

    SyntheticWorkspace { nodes, edges }
}
