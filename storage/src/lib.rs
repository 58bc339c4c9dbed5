pub mod autolink;
pub mod cluster;
pub mod index;
pub mod lock;
pub mod repo;

pub use autolink::{AutoLinkEngine, AutoLinkPlan};
pub use cluster::{Cluster, ClusterEngine};
pub use index::AdjacencyGraph;
pub use repo::{GraphStore, RepoError, Repository};
