//! One handle over the graph-intelligence stack: node upserts with
//! best-effort auto-linking, clustering and layout.

use ingestion::embedding::provider_from_config;
use ingestion::processor::{IngestionError, LinkMode, NodePipeline, NodeUpdate};
use jobs::{AutoLinkReport, AutoLinker, ChannelJobQueue, Worker};
use layout::{AnimationFrame, AnimationHandle, Animator, LayoutEngine, LayoutError, LayoutStrategy, Positions};
use meshflow_core::config::{AppConfig, ConfigError};
use meshflow_core::error::{ErrorCode, MeshflowError};
use meshflow_core::metrics::{LinkMetrics, MetricsSnapshot};
use meshflow_core::model::{EdgeId, Node, NodeId, WorkspaceId};
use std::sync::Arc;
use storage::autolink::AutoLinkEngine;
use storage::cluster::{Cluster, ClusterEngine};
use storage::lock::NodeLocks;
use storage::repo::{GraphStore, RepoError, Repository, WorkspaceSnapshot};
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::info;

pub use layout::current_positions;

const JOB_QUEUE_CAPACITY: usize = 1024;

#[derive(Error, Debug)]
pub enum SdkError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Ingestion(#[from] IngestionError),
    #[error(transparent)]
    Storage(#[from] RepoError),
    #[error(transparent)]
    Layout(#[from] LayoutError),
}

impl MeshflowError for SdkError {
    fn error_code(&self) -> ErrorCode {
        match self {
            SdkError::Config(_) => ErrorCode::InvalidArgument,
            SdkError::Ingestion(e) => e.error_code(),
            SdkError::Storage(e) => e.error_code(),
            SdkError::Layout(e) => e.error_code(),
        }
    }
}

pub struct Meshflow {
    config: AppConfig,
    store: Arc<Repository>,
    pipeline: NodePipeline,
    linker: AutoLinker,
    clusters: ClusterEngine,
    layout: LayoutEngine,
    animator: Animator,
    metrics: LinkMetrics,
    locks: NodeLocks,
    worker: Option<JoinHandle<()>>,
}

impl Meshflow {
    /// Auto-links inline: `upsert_node` returns after linking has run.
    pub fn new(config: AppConfig) -> Result<Self, SdkError> {
        config.validate()?;
        let store = Arc::new(Repository::new());
        let metrics = LinkMetrics::default();
        let locks = NodeLocks::new();

        let linker = AutoLinker::new(store.clone(), AutoLinkEngine::new(config.linking.clone()))
            .with_locks(locks.clone())
            .with_metrics(metrics.clone());
        let embedder = provider_from_config(&config.embedding, Some(metrics.clone()));
        let mut pipeline =
            NodePipeline::with_components(store.clone(), embedder, LinkMode::Inline(linker.clone()));
        pipeline.set_locks(locks.clone());

        Ok(Self {
            clusters: ClusterEngine::new(&config.clustering),
            layout: LayoutEngine::new(config.layout.clone()),
            animator: Animator::new(config.animation.clone()),
            config,
            store,
            pipeline,
            linker,
            metrics,
            locks,
            worker: None,
        })
    }

    /// Loads configuration from `config/` and the environment.
    pub fn from_env() -> Result<Self, SdkError> {
        Self::new(AppConfig::load()?)
    }

    /// Auto-links on a background worker instead. Must be called within a
    /// Tokio runtime.
    pub fn with_background_linking(config: AppConfig) -> Result<Self, SdkError> {
        let mut meshflow = Self::new(config)?;
        let (queue, receiver) = ChannelJobQueue::bounded(JOB_QUEUE_CAPACITY);
        let worker = Worker::new(receiver, meshflow.linker.clone());
        meshflow.worker = Some(tokio::spawn(worker.run()));
        meshflow
            .pipeline
            .set_link_mode(LinkMode::Queued(Arc::new(queue)));
        Ok(meshflow)
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn store(&self) -> Arc<Repository> {
        self.store.clone()
    }

    pub async fn upsert_node(&self, node: Node) -> Result<NodeUpdate, SdkError> {
        Ok(self.pipeline.upsert_node(node).await?)
    }

    pub async fn node(&self, workspace_id: WorkspaceId, node_id: NodeId) -> Result<Node, SdkError> {
        Ok(self.store.get_node(workspace_id, node_id).await?)
    }

    pub async fn snapshot(&self, workspace_id: WorkspaceId) -> Result<WorkspaceSnapshot, SdkError> {
        Ok(self.store.snapshot(workspace_id).await?)
    }

    pub async fn delete_edge(&self, workspace_id: WorkspaceId, edge_id: EdgeId) -> Result<(), SdkError> {
        Ok(self.store.delete_edge(workspace_id, edge_id).await?)
    }

    /// Re-runs auto-linking for one node right away.
    pub async fn link_node(&self, workspace_id: WorkspaceId, node_id: NodeId) -> AutoLinkReport {
        self.linker.link_node(workspace_id, node_id).await
    }

    pub async fn clusters(&self, workspace_id: WorkspaceId) -> Result<Vec<Cluster>, SdkError> {
        let snapshot = self.store.snapshot(workspace_id).await?;
        Ok(self.clusters.cluster(&snapshot.nodes))
    }

    pub async fn layout(
        &self,
        workspace_id: WorkspaceId,
        strategy: LayoutStrategy,
    ) -> Result<Positions, SdkError> {
        let snapshot = self.store.snapshot(workspace_id).await?;
        Ok(self.layout.compute(strategy, &snapshot.nodes, &snapshot.edges)?)
    }

    /// Writes proposed positions back to their nodes. Unknown ids are skipped.
    /// Each write waits for any upsert of the same node in flight.
    pub async fn apply_positions(
        &self,
        workspace_id: WorkspaceId,
        positions: &Positions,
    ) -> Result<usize, SdkError> {
        let mut applied = 0;
        for (id, position) in positions {
            let _guard = self.locks.acquire(workspace_id, *id).await;
            let mut node = match self.store.get_node(workspace_id, *id).await {
                Ok(node) => node,
                Err(RepoError::NodeNotFound(_)) => continue,
                Err(e) => return Err(e.into()),
            };
            node.position = Some(*position);
            self.store.put_node(node).await?;
            applied += 1;
        }
        Ok(applied)
    }

    /// Computes the target layout, then eases every node there from its last
    /// known position. A later call for the same node set cancels this one.
    pub async fn animate_layout<F>(
        &self,
        workspace_id: WorkspaceId,
        strategy: LayoutStrategy,
        on_frame: F,
    ) -> Result<AnimationHandle, SdkError>
    where
        F: FnMut(&AnimationFrame) + Send + 'static,
    {
        let snapshot = self.store.snapshot(workspace_id).await?;
        let target = self.layout.compute(strategy, &snapshot.nodes, &snapshot.edges)?;
        let start = current_positions(&snapshot.nodes);
        Ok(self.animator.animate(start, target, on_frame))
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Drains queued auto-link jobs, then stops the background worker.
    pub async fn shutdown(self) {
        let Meshflow {
            pipeline, worker, ..
        } = self;
        drop(pipeline);
        if let Some(worker) = worker {
            if let Err(e) = worker.await {
                tracing::warn!("Auto-link worker ended abnormally: {}", e);
            }
        }
        info!("Meshflow shut down");
    }
}
