//! Task lookup worker

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

use taskmodel::{StatusRef, TaskEntity};

use crate::loader::{EmptyResponse, LoaderMessage, TaskDataRequest, TaskDataResponse};
use crate::repo::TaskRepo;

use super::pool::{LeastLoaded, Mailbox};

/// One lookup handed to a worker: the sub-request plus the loader mailbox
/// the reply goes back to.
#[derive(Debug, Clone)]
pub struct LookupJob {
    pub request: TaskDataRequest,
    pub reply_to: mpsc::Sender<LoaderMessage>,
}

/// Stateless backend lookup worker.
///
/// An id the backing store does not have is a normal fast-path outcome:
/// the worker answers with [`EmptyResponse`], never an error.
pub struct TaskWorker {
    repo: Arc<TaskRepo>,
    rx: mpsc::Receiver<LookupJob>,
}

impl TaskWorker {
    pub fn new(repo: Arc<TaskRepo>, rx: mpsc::Receiver<LookupJob>) -> Self {
        Self { repo, rx }
    }

    pub async fn run(mut self) {
        while let Some(job) = self.rx.recv().await {
            self.load(job).await;
        }
        debug!("TaskWorker stopped");
    }

    async fn load(&self, job: LookupJob) {
        let request = job.request;
        debug!(trace_id = %request.trace_id, id = request.id, "TaskWorker lookup");

        let reply = if self.repo.contains(request.id) {
            let entity = TaskEntity::new(request.id, format!("Test {}", request.id))
                .with_status(StatusRef::new("DONE", "Done"));
            LoaderMessage::Loaded(TaskDataResponse {
                trace_id: request.trace_id,
                entity,
            })
        } else {
            LoaderMessage::Missing(EmptyResponse {
                trace_id: request.trace_id,
            })
        };

        if job.reply_to.send(reply).await.is_err() {
            debug!("Loader went away before the reply could be delivered");
        }
    }
}

/// Spawn a fixed-size lookup pool over one shared repo. Returns the
/// smallest-mailbox pool handle plus the worker tasks for shutdown joins.
pub fn spawn_lookup_pool(
    size: usize,
    repo: Arc<TaskRepo>,
    mailbox_capacity: usize,
) -> (LeastLoaded<LookupJob>, Vec<JoinHandle<()>>) {
    let mut mailboxes = Vec::with_capacity(size);
    let mut tasks = Vec::with_capacity(size);
    for _ in 0..size {
        let (tx, rx) = mpsc::channel(mailbox_capacity);
        mailboxes.push(Mailbox::new(tx));
        tasks.push(tokio::spawn(TaskWorker::new(Arc::clone(&repo), rx).run()));
    }
    (LeastLoaded::new(mailboxes), tasks)
}
