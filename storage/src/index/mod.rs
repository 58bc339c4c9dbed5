pub mod graph;
pub mod similarity;

pub use graph::AdjacencyGraph;
pub use similarity::{cosine_distance, cosine_similarity, find_similar};
