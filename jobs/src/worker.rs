use crate::linker::AutoLinker;
use crate::queue::Job;
use tokio::sync::mpsc;
use tracing::info;

pub struct Worker {
    receiver: mpsc::Receiver<Job>,
    linker: AutoLinker,
}

impl Worker {
    pub fn new(receiver: mpsc::Receiver<Job>, linker: AutoLinker) -> Self {
        Self { receiver, linker }
    }

    /// Drains jobs until every queue handle is dropped.
    pub async fn run(mut self) {
        info!("Worker started");
        while let Some(job) = self.receiver.recv().await {
            match job {
                Job::AutoLink {
                    workspace_id,
                    node_id,
                } => {
                    info!("Processing AutoLink for node {} in workspace {}", node_id, workspace_id);
                    self.linker.link_node(workspace_id, node_id).await;
                }
            }
        }
        info!("Worker stopped");
    }
}
