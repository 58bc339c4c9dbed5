pub mod embedding;
pub mod extract;
pub mod processor;

pub use embedding::{
    provider_from_config, DeterministicEmbedder, EmbeddingBackend, EmbeddingError,
    EmbeddingProvider, HttpEmbeddingBackend, ResilientEmbedder,
};
pub use processor::{IngestionError, LinkMode, NodePipeline, NodeUpdate};
