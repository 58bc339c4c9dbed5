use meshflow_core::model::{Node, NodeId, SimilarityResult};
use std::cmp::Ordering;

/// Scores every embedded candidate, keeps `score >= threshold`, sorts descending
/// (ties keep candidate order) and truncates to `limit`.
pub fn find_similar(
    query: &[f32],
    candidates: &[Node],
    threshold: f32,
    limit: usize,
) -> Vec<SimilarityResult> {
    rank(
        candidates
            .iter()
            .filter_map(|node| node.embedding().map(|embedding| (node.id, embedding))),
        query,
        threshold,
        limit,
    )
}

pub(crate) fn rank<'a>(
    candidates: impl Iterator<Item = (NodeId, &'a [f32])>,
    query: &[f32],
    threshold: f32,
    limit: usize,
) -> Vec<SimilarityResult> {
    if limit == 0 {
        return Vec::new();
    }

    let mut scores: Vec<SimilarityResult> = candidates
        .filter_map(|(node_id, embedding)| {
            comparable_similarity(query, embedding).map(|score| SimilarityResult { node_id, score })
        })
        .filter(|result| result.score >= threshold)
        .collect();

    // sort_by is stable, which gives the tie-break on candidate order.
    scores.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
    scores.truncate(limit);
    scores
}

/// `dot(a, b) / (|a| * |b|)`, or 0 when either side has zero norm.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    comparable_similarity(a, b).unwrap_or(0.0)
}

pub fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    1.0 - cosine_similarity(a, b)
}

// Mismatched dimensions are not comparable; callers skip them instead of failing.
fn comparable_similarity(a: &[f32], b: &[f32]) -> Option<f32> {
    if a.len() != b.len() || a.is_empty() {
        return None;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return Some(0.0);
    }

    Some((dot / (norm_a * norm_b)).clamp(-1.0, 1.0))
}
