use meshflow_core::metrics::LinkMetrics;
use meshflow_core::model::{Edge, NodeId, SimilarityResult, WorkspaceId};
use std::sync::Arc;
use std::time::Instant;
use storage::autolink::AutoLinkEngine;
use storage::lock::NodeLocks;
use storage::repo::{GraphStore, RepoError};
use tracing::{debug, info, warn};

pub const AUTO_LINK_LABEL: &str = "auto-link";

#[derive(Debug, Clone, Default)]
pub struct AutoLinkReport {
    pub workspace_id: WorkspaceId,
    pub node_id: NodeId,
    pub created: Vec<Edge>,
    pub skipped_existing: usize,
    pub failed: usize,
    pub suggestions: Vec<SimilarityResult>,
}

/// Runs [`AutoLinkEngine`] plans against a store, one node at a time.
///
/// Every failure degrades to fewer edges; nothing is returned as an error.
#[derive(Clone)]
pub struct AutoLinker {
    store: Arc<dyn GraphStore>,
    engine: AutoLinkEngine,
    locks: NodeLocks,
    metrics: LinkMetrics,
}

impl AutoLinker {
    pub fn new(store: Arc<dyn GraphStore>, engine: AutoLinkEngine) -> Self {
        Self {
            store,
            engine,
            locks: NodeLocks::new(),
            metrics: LinkMetrics::default(),
        }
    }

    /// Shares the lock table with other writers of the same nodes.
    pub fn with_locks(mut self, locks: NodeLocks) -> Self {
        self.locks = locks;
        self
    }

    pub fn with_metrics(mut self, metrics: LinkMetrics) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn metrics(&self) -> &LinkMetrics {
        &self.metrics
    }

    pub async fn link_node(&self, workspace_id: WorkspaceId, node_id: NodeId) -> AutoLinkReport {
        let started = Instant::now();
        let mut report = AutoLinkReport {
            workspace_id,
            node_id,
            ..Default::default()
        };

        let _guard = self.locks.acquire(workspace_id, node_id).await;

        let snapshot = match self.store.snapshot(workspace_id).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!("Auto-link skipped for node {}: snapshot failed: {}", node_id, e);
                return report;
            }
        };
        let Some(node) = snapshot.nodes.iter().find(|n| n.id == node_id) else {
            debug!("Auto-link skipped: node {} no longer exists", node_id);
            return report;
        };

        let plan = self.engine.plan(node, &snapshot.nodes, &snapshot.graph());
        report.skipped_existing = plan.skipped_existing;
        report.suggestions = plan.suggestions;

        for directive in plan.directives {
            match self
                .store
                .create_edge(directive, Some(AUTO_LINK_LABEL.to_string()))
                .await
            {
                Ok(edge) => {
                    debug!(
                        "Created auto-link {} -> {} (score: {:.3})",
                        edge.source, edge.target, directive.similarity
                    );
                    report.created.push(edge);
                }
                // A user edge landed between snapshot and write.
                Err(RepoError::DuplicateEdge(_)) => report.skipped_existing += 1,
                Err(e) => {
                    warn!(
                        "Failed to persist auto-link {} -> {}: {}",
                        directive.source, directive.target, e
                    );
                    report.failed += 1;
                }
            }
        }

        self.metrics.record_auto_link(
            started.elapsed().as_micros() as u64,
            report.created.len(),
            report.failed,
            report.suggestions.len(),
        );

        if !report.created.is_empty() || report.failed > 0 {
            info!(
                "Auto-link for node {}: {} created, {} failed, {} suggested",
                node_id,
                report.created.len(),
                report.failed,
                report.suggestions.len()
            );
        }

        report
    }
}
