use crate::index::AdjacencyGraph;
use async_trait::async_trait;
use meshflow_core::error::{ErrorCode, MeshflowError};
use meshflow_core::model::{Edge, EdgeDirective, EdgeId, EdgeKey, Node, NodeId, WorkspaceId};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;

#[derive(Error, Debug)]
pub enum RepoError {
    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),
    #[error("Edge not found: {0}")]
    EdgeNotFound(EdgeId),
    #[error("Edge already exists for pair {0:?}")]
    DuplicateEdge(EdgeKey),
    #[error("Edge id already in use: {0}")]
    DuplicateEdgeId(EdgeId),
    #[error("Invalid edge: {0}")]
    InvalidEdge(String),
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

impl MeshflowError for RepoError {
    fn error_code(&self) -> ErrorCode {
        match self {
            RepoError::NodeNotFound(_) | RepoError::EdgeNotFound(_) => ErrorCode::NotFound,
            RepoError::DuplicateEdge(_) | RepoError::DuplicateEdgeId(_) => ErrorCode::AlreadyExists,
            RepoError::InvalidEdge(_) => ErrorCode::InvalidArgument,
            RepoError::Unavailable(_) => ErrorCode::Unavailable,
        }
    }
}

/// Consistent read of one workspace.
#[derive(Debug, Clone, Default)]
pub struct WorkspaceSnapshot {
    pub workspace_id: WorkspaceId,
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

impl WorkspaceSnapshot {
    pub fn graph(&self) -> AdjacencyGraph {
        AdjacencyGraph::from_edges(&self.edges)
    }
}

/// Persistence seam the core writes through. Implementations own durability.
#[async_trait]
pub trait GraphStore: Send + Sync {
    async fn put_node(&self, node: Node) -> Result<(), RepoError>;

    async fn get_node(&self, workspace_id: WorkspaceId, id: NodeId) -> Result<Node, RepoError>;

    async fn snapshot(&self, workspace_id: WorkspaceId) -> Result<WorkspaceSnapshot, RepoError>;

    /// Creates an edge. Fails with `DuplicateEdge` if the unordered pair is taken.
    async fn create_edge(
        &self,
        directive: EdgeDirective,
        label: Option<String>,
    ) -> Result<Edge, RepoError>;

    async fn delete_edge(&self, workspace_id: WorkspaceId, id: EdgeId) -> Result<(), RepoError>;
}

#[derive(Default)]
struct WorkspaceState {
    nodes: BTreeMap<NodeId, Node>,
    edges: BTreeMap<EdgeId, Edge>,
    graph: AdjacencyGraph,
}

/// In-memory multi-workspace store.
pub struct Repository {
    workspaces: Arc<RwLock<HashMap<WorkspaceId, WorkspaceState>>>,
    next_edge_id: AtomicU64,
}

impl Repository {
    pub fn new() -> Self {
        Self {
            workspaces: Arc::new(RwLock::new(HashMap::new())),
            next_edge_id: AtomicU64::new(1),
        }
    }

    pub async fn node_count(&self, workspace_id: WorkspaceId) -> usize {
        let workspaces = self.workspaces.read().await;
        workspaces
            .get(&workspace_id)
            .map(|ws| ws.nodes.len())
            .unwrap_or(0)
    }

    pub async fn edge_count(&self, workspace_id: WorkspaceId) -> usize {
        let workspaces = self.workspaces.read().await;
        workspaces
            .get(&workspace_id)
            .map(|ws| ws.edges.len())
            .unwrap_or(0)
    }

    /// Inserts a user-authored edge as-is. The id must be unused, both endpoints
    /// must exist and the unordered pair must be free.
    pub async fn put_edge(&self, edge: Edge) -> Result<(), RepoError> {
        if edge.source == edge.target {
            return Err(RepoError::InvalidEdge(format!(
                "self-loop on node {}",
                edge.source
            )));
        }
        let next_id = edge
            .id
            .checked_add(1)
            .ok_or_else(|| RepoError::InvalidEdge(format!("edge id {} out of range", edge.id)))?;

        let mut workspaces = self.workspaces.write().await;
        let ws = workspaces
            .get_mut(&edge.workspace_id)
            .ok_or(RepoError::NodeNotFound(edge.source))?;
        for endpoint in [edge.source, edge.target] {
            if !ws.nodes.contains_key(&endpoint) {
                return Err(RepoError::NodeNotFound(endpoint));
            }
        }
        if ws.edges.contains_key(&edge.id) {
            return Err(RepoError::DuplicateEdgeId(edge.id));
        }
        if !ws.graph.add_edge(edge.source, edge.target) {
            return Err(RepoError::DuplicateEdge(edge.key()));
        }
        self.next_edge_id.fetch_max(next_id, Ordering::SeqCst);
        ws.edges.insert(edge.id, edge);
        Ok(())
    }
}

impl Default for Repository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GraphStore for Repository {
    async fn put_node(&self, node: Node) -> Result<(), RepoError> {
        let mut workspaces = self.workspaces.write().await;
        let ws = workspaces.entry(node.workspace_id).or_default();
        ws.nodes.insert(node.id, node);
        Ok(())
    }

    async fn get_node(&self, workspace_id: WorkspaceId, id: NodeId) -> Result<Node, RepoError> {
        let workspaces = self.workspaces.read().await;
        workspaces
            .get(&workspace_id)
            .and_then(|ws| ws.nodes.get(&id))
            .cloned()
            .ok_or(RepoError::NodeNotFound(id))
    }

    async fn snapshot(&self, workspace_id: WorkspaceId) -> Result<WorkspaceSnapshot, RepoError> {
        let workspaces = self.workspaces.read().await;
        let Some(ws) = workspaces.get(&workspace_id) else {
            return Ok(WorkspaceSnapshot {
                workspace_id,
                ..Default::default()
            });
        };
        Ok(WorkspaceSnapshot {
            workspace_id,
            nodes: ws.nodes.values().cloned().collect(),
            edges: ws.edges.values().cloned().collect(),
        })
    }

    async fn create_edge(
        &self,
        directive: EdgeDirective,
        label: Option<String>,
    ) -> Result<Edge, RepoError> {
        if directive.source == directive.target {
            return Err(RepoError::InvalidEdge(format!(
                "self-loop on node {}",
                directive.source
            )));
        }

        let mut workspaces = self.workspaces.write().await;
        let ws = workspaces
            .get_mut(&directive.workspace_id)
            .ok_or(RepoError::NodeNotFound(directive.source))?;
        for endpoint in [directive.source, directive.target] {
            if !ws.nodes.contains_key(&endpoint) {
                return Err(RepoError::NodeNotFound(endpoint));
            }
        }
        if !ws.graph.add_edge(directive.source, directive.target) {
            return Err(RepoError::DuplicateEdge(directive.key()));
        }

        let id = self.next_edge_id.fetch_add(1, Ordering::SeqCst);
        let mut edge = Edge::new(id, directive.workspace_id, directive.source, directive.target)
            .with_similarity(directive.similarity);
        edge.label = label;
        ws.edges.insert(id, edge.clone());
        Ok(edge)
    }

    async fn delete_edge(&self, workspace_id: WorkspaceId, id: EdgeId) -> Result<(), RepoError> {
        let mut workspaces = self.workspaces.write().await;
        let ws = workspaces
            .get_mut(&workspace_id)
            .ok_or(RepoError::EdgeNotFound(id))?;
        let edge = ws.edges.remove(&id).ok_or(RepoError::EdgeNotFound(id))?;
        ws.graph.remove_edge(edge.source, edge.target);
        Ok(())
    }
}
