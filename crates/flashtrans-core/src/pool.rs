use std::sync::Arc;

use flashtrans_types::PipelineEvent;
use kanal::{AsyncReceiver, AsyncSender};
use tokio::task::JoinSet;

use crate::request::Request;
use crate::stages::{StageContext, run_request};

/// Fixed set of workers pulling requests from the shared job queue
pub struct WorkerPool {
    tasks: JoinSet<()>,
    size: usize,
}

impl WorkerPool {
    pub(crate) fn spawn(
        size: usize,
        jobs: AsyncReceiver<Request>,
        events: AsyncSender<PipelineEvent>,
        ctx: Arc<StageContext>,
    ) -> Self {
        let mut tasks = JoinSet::new();
        for index in 0..size {
            tasks.spawn(worker_loop(
                index,
                jobs.clone(),
                events.clone(),
                ctx.clone(),
            ));
        }

        tracing::info!("Worker pool started with {} workers", size);
        Self { tasks, size }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Wait for every worker to exit (the job queue must be closed first)
    pub async fn join(mut self) {
        while let Some(result) = self.tasks.join_next().await {
            if let Err(e) = result {
                tracing::error!("worker task panicked: {e}");
            }
        }
    }
}

async fn worker_loop(
    index: usize,
    jobs: AsyncReceiver<Request>,
    events: AsyncSender<PipelineEvent>,
    ctx: Arc<StageContext>,
) {
    tracing::debug!("[WORKER {index}] waiting for requests");

    while let Ok(request) = jobs.recv().await {
        tracing::debug!(
            "[WORKER {index}] picked {} ({}) after {:?} in queue",
            request.id,
            request.kind,
            request.age()
        );
        run_request(&ctx, request, &events).await;
    }

    tracing::debug!("[WORKER {index}] job queue closed, exiting");
}
