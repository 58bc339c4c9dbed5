use crate::index::similarity::cosine_distance;
use meshflow_core::config::ClusteringConfig;
use meshflow_core::model::{Node, NodeId};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

/// Transient grouping result; recomputed on demand and never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cluster {
    pub id: usize,
    pub node_ids: Vec<NodeId>,
    pub centroid: Vec<f32>,
    pub label: String,
}

pub trait ClusterLabeler: Send + Sync {
    fn label(&self, cluster_id: usize, members: &[&Node], representative: &Node) -> String;
}

/// Uses the representative member's title.
pub struct RepresentativeTitleLabeler;

impl ClusterLabeler for RepresentativeTitleLabeler {
    fn label(&self, cluster_id: usize, _members: &[&Node], representative: &Node) -> String {
        let title = representative.title.trim();
        if title.is_empty() {
            format!("Cluster {}", cluster_id + 1)
        } else {
            title.to_string()
        }
    }
}

/// `max(2, floor(sqrt(n / 2)))`
pub fn cluster_count(embedded: usize) -> usize {
    let k = ((embedded as f64) / 2.0).sqrt().floor() as usize;
    k.max(2)
}

pub struct ClusterEngine {
    passes: usize,
    seed: Option<u64>,
    labeler: Box<dyn ClusterLabeler>,
}

impl ClusterEngine {
    pub fn new(config: &ClusteringConfig) -> Self {
        Self {
            passes: config.passes.max(1),
            seed: config.seed,
            labeler: Box::new(RepresentativeTitleLabeler),
        }
    }

    pub fn with_labeler(mut self, labeler: Box<dyn ClusterLabeler>) -> Self {
        self.labeler = labeler;
        self
    }

    /// Lloyd iteration for a fixed number of passes over cosine distance.
    ///
    /// Nodes without an embedding land in bucket 0. With fewer than two embedded
    /// nodes the whole input comes back as a single cluster.
    pub fn cluster(&self, nodes: &[Node]) -> Vec<Cluster> {
        if nodes.is_empty() {
            return Vec::new();
        }

        let embedded: Vec<(usize, &[f32])> = nodes
            .iter()
            .enumerate()
            .filter_map(|(idx, node)| node.embedding().map(|embedding| (idx, embedding)))
            .collect();

        if embedded.len() < 2 {
            let centroid = embedded
                .first()
                .map(|(_, embedding)| embedding.to_vec())
                .unwrap_or_default();
            let all: Vec<usize> = (0..nodes.len()).collect();
            return vec![self.build_cluster(0, nodes, &all, centroid)];
        }

        let k = cluster_count(embedded.len());
        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let mut centroids: Vec<Vec<f32>> = rand::seq::index::sample(&mut rng, embedded.len(), k)
            .into_iter()
            .map(|pick| embedded[pick].1.to_vec())
            .collect();

        let mut assignment = vec![0usize; embedded.len()];
        for _ in 0..self.passes {
            for (slot, (_, embedding)) in embedded.iter().enumerate() {
                assignment[slot] = nearest_centroid(embedding, &centroids);
            }

            for (bucket, centroid) in centroids.iter_mut().enumerate() {
                let members: Vec<&[f32]> = embedded
                    .iter()
                    .zip(assignment.iter())
                    .filter(|(_, assigned)| **assigned == bucket)
                    .map(|((_, embedding), _)| *embedding)
                    .collect();

                // An emptied bucket keeps its previous centroid.
                if let Some(mean) = mean_vector(&members) {
                    *centroid = mean;
                }
            }
        }

        let mut buckets: Vec<Vec<usize>> = vec![Vec::new(); k];
        let mut embedded_bucket = vec![None; nodes.len()];
        for ((idx, _), bucket) in embedded.iter().zip(assignment.iter()) {
            embedded_bucket[*idx] = Some(*bucket);
        }
        for (idx, bucket) in embedded_bucket.into_iter().enumerate() {
            buckets[bucket.unwrap_or(0)].push(idx);
        }

        let mut clusters = Vec::new();
        for (bucket, members) in buckets.into_iter().enumerate() {
            if members.is_empty() {
                continue;
            }
            let centroid = centroids[bucket].clone();
            clusters.push(self.build_cluster(clusters.len(), nodes, &members, centroid));
        }

        clusters
    }

    fn build_cluster(&self, id: usize, nodes: &[Node], members: &[usize], centroid: Vec<f32>) -> Cluster {
        let member_nodes: Vec<&Node> = members.iter().map(|idx| &nodes[*idx]).collect();
        let representative = representative(&member_nodes, &centroid);

        Cluster {
            id,
            node_ids: member_nodes.iter().map(|node| node.id).collect(),
            label: self.labeler.label(id, &member_nodes, representative),
            centroid,
        }
    }
}

impl Default for ClusterEngine {
    fn default() -> Self {
        Self::new(&ClusteringConfig::default())
    }
}

fn nearest_centroid(embedding: &[f32], centroids: &[Vec<f32>]) -> usize {
    let mut best = 0;
    let mut best_distance = f32::INFINITY;
    for (idx, centroid) in centroids.iter().enumerate() {
        let distance = cosine_distance(embedding, centroid);
        if distance < best_distance {
            best_distance = distance;
            best = idx;
        }
    }
    best
}

fn mean_vector(members: &[&[f32]]) -> Option<Vec<f32>> {
    let first = members.first()?;
    let mut sum = vec![0.0f32; first.len()];
    for member in members {
        for (acc, value) in sum.iter_mut().zip(member.iter()) {
            *acc += value;
        }
    }
    let count = members.len() as f32;
    for value in sum.iter_mut() {
        *value /= count;
    }
    Some(sum)
}

// Embedded member closest to the centroid; first member when none is embedded.
fn representative<'a>(members: &[&'a Node], centroid: &[f32]) -> &'a Node {
    let mut best = members[0];
    let mut best_distance = f32::INFINITY;
    for member in members {
        if let Some(embedding) = member.embedding() {
            let distance = cosine_distance(embedding, centroid);
            if distance < best_distance {
                best_distance = distance;
                best = member;
            }
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cluster_count_formula() {
        assert_eq!(cluster_count(0), 2);
        assert_eq!(cluster_count(7), 2);
        assert_eq!(cluster_count(18), 3);
        assert_eq!(cluster_count(50), 5);
    }

    #[test]
    fn test_mean_vector_is_elementwise() {
        let a = [1.0, 3.0];
        let b = [3.0, 5.0];
        assert_eq!(mean_vector(&[&a, &b]), Some(vec![2.0, 4.0]));
        assert_eq!(mean_vector(&[]), None);
    }

    #[test]
    fn test_nearest_centroid_uses_cosine_distance() {
        let centroids = vec![vec![1.0, 0.0], vec![0.0, 1.0]];
        assert_eq!(nearest_centroid(&[0.1, 5.0], &centroids), 1);
        assert_eq!(nearest_centroid(&[5.0, 0.1], &centroids), 0);
    }
}
