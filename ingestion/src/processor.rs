use crate::embedding::{DeterministicEmbedder, EmbeddingProvider};
use crate::extract::embedding_input;
use chrono::Utc;
use jobs::linker::AutoLinker;
use jobs::queue::{Job, JobQueue};
use meshflow_core::error::{ErrorCode, MeshflowError};
use meshflow_core::model::{Node, NodeId, WorkspaceId};
use std::sync::Arc;
use storage::lock::NodeLocks;
use storage::repo::{GraphStore, RepoError};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Error, Debug)]
pub enum IngestionError {
    #[error("Storage error: {0}")]
    Storage(#[from] RepoError),
}

impl MeshflowError for IngestionError {
    fn error_code(&self) -> ErrorCode {
        match self {
            IngestionError::Storage(err) => err.error_code(),
        }
    }
}

/// What happens after a node's embedding is refreshed.
#[derive(Clone)]
pub enum LinkMode {
    /// Hand the node to a background worker.
    Queued(Arc<dyn JobQueue>),
    /// Link before returning; still never fails the mutation.
    Inline(AutoLinker),
    Disabled,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeUpdate {
    pub workspace_id: WorkspaceId,
    pub node_id: NodeId,
    pub embedding_refreshed: bool,
    pub auto_link_triggered: bool,
}

/// Node create/update path: persist first, then embed-and-link best-effort.
pub struct NodePipeline {
    store: Arc<dyn GraphStore>,
    embedder: Arc<dyn EmbeddingProvider>,
    link_mode: LinkMode,
    locks: NodeLocks,
}

impl NodePipeline {
    pub fn new(store: Arc<dyn GraphStore>) -> Self {
        Self {
            store,
            embedder: Arc::new(DeterministicEmbedder::default()),
            link_mode: LinkMode::Disabled,
            locks: NodeLocks::new(),
        }
    }

    pub fn with_components(
        store: Arc<dyn GraphStore>,
        embedder: Arc<dyn EmbeddingProvider>,
        link_mode: LinkMode,
    ) -> Self {
        Self {
            store,
            embedder,
            link_mode,
            locks: NodeLocks::new(),
        }
    }

    pub fn set_link_mode(&mut self, link_mode: LinkMode) {
        self.link_mode = link_mode;
    }

    /// Node writes share this table with the auto-linker.
    pub fn set_locks(&mut self, locks: NodeLocks) {
        self.locks = locks;
    }

    /// Creates or updates a node. The embedding is regenerated when the
    /// embeddable text changed or is missing; only then is auto-linking triggered.
    /// A node without any text is stored unembedded and never linked.
    pub async fn upsert_node(&self, mut node: Node) -> Result<NodeUpdate, IngestionError> {
        let text = embedding_input(&node);
        let workspace_id = node.workspace_id;
        let node_id = node.id;

        let refreshed = {
            let _guard = self.locks.acquire(workspace_id, node_id).await;

            let previous = match self.store.get_node(workspace_id, node_id).await {
                Ok(previous) => Some(previous),
                Err(RepoError::NodeNotFound(_)) => None,
                Err(e) => return Err(e.into()),
            };

            let reusable = previous.as_ref().and_then(|prev| {
                let same_text = embedding_input(prev) == text;
                match (same_text, prev.embedding()) {
                    (true, Some(embedding)) if embedding.len() == self.embedder.dimensions() => {
                        Some(embedding.to_vec())
                    }
                    _ => None,
                }
            });

            if let Some(previous) = &previous {
                node.created_at = previous.created_at;
                if node.position.is_none() {
                    node.position = previous.position;
                }
            }
            node.updated_at = Utc::now();

            let refreshed = match reusable {
                _ if text.is_empty() => {
                    debug!("Node {} has no text; stored without embedding", node_id);
                    node.embedding = None;
                    false
                }
                Some(embedding) => {
                    node.embedding = Some(embedding);
                    false
                }
                None => {
                    node.embedding = Some(self.embedder.embed(&text).await);
                    true
                }
            };

            self.store.put_node(node).await?;
            refreshed
        };

        let auto_link_triggered = refreshed && self.trigger_auto_link(workspace_id, node_id).await;

        Ok(NodeUpdate {
            workspace_id,
            node_id,
            embedding_refreshed: refreshed,
            auto_link_triggered,
        })
    }

    async fn trigger_auto_link(&self, workspace_id: WorkspaceId, node_id: NodeId) -> bool {
        match &self.link_mode {
            LinkMode::Queued(queue) => {
                let job = Job::AutoLink {
                    workspace_id,
                    node_id,
                };
                if let Err(e) = queue.enqueue(job).await {
                    // Best-effort: the node is already stored.
                    warn!("Failed to enqueue auto-link for node {}: {}", node_id, e);
                    return false;
                }
                true
            }
            LinkMode::Inline(linker) => {
                linker.link_node(workspace_id, node_id).await;
                true
            }
            LinkMode::Disabled => {
                debug!("Auto-link disabled; node {} stored without linking", node_id);
                false
            }
        }
    }
}
