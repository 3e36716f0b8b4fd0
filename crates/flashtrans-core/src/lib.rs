use std::sync::Arc;

use flashtrans_config::Config;
use flashtrans_ocr::{Recognizer, build_recognizer};
use flashtrans_translator::{Translator, build_translator};
use flashtrans_types::{PipelineEvent, TargetLanguage};
use kanal::AsyncReceiver;

pub mod dispatcher;
pub mod language;
pub mod pool;
pub mod preprocess;
pub mod request;
pub mod stages;

pub use dispatcher::{Dispatcher, SubmitError};
pub use pool::WorkerPool;
pub use request::Request;
pub use stages::StageContext;

/// Loaded backend handles, shared read-only by all workers
#[derive(Clone)]
pub struct Backends {
    pub recognizer: Arc<dyn Recognizer>,
    pub translator: Arc<dyn Translator>,
}

impl Backends {
    pub fn new(recognizer: Arc<dyn Recognizer>, translator: Arc<dyn Translator>) -> Self {
        Self {
            recognizer,
            translator,
        }
    }

    /// Load the configured engines; failures become disabled adapters
    pub fn from_config(config: &Config) -> Self {
        Self {
            recognizer: build_recognizer(&config.ocr),
            translator: build_translator(&config.translator),
        }
    }
}

/// A running pipeline: submit through `dispatcher`, read results from `events`
pub struct Pipeline {
    pub dispatcher: Arc<Dispatcher>,
    pub workers: WorkerPool,
    pub events: AsyncReceiver<PipelineEvent>,
}

impl Pipeline {
    /// Close the queue and wait for workers to finish their current request
    pub async fn shutdown(self) {
        self.dispatcher.shutdown();
        self.workers.join().await;
    }
}

/// Start the worker pool; must be called inside a tokio runtime
pub fn build_pipeline(config: &Config, backends: Backends) -> Pipeline {
    let (job_tx, job_rx) = kanal::unbounded();
    let (event_tx, event_rx) = kanal::unbounded_async();

    let ctx = Arc::new(StageContext {
        recognizer: backends.recognizer,
        translator: backends.translator,
        source_language: config.translator.source_language.clone(),
        upscale_below_px: config.ocr.upscale_below_px,
    });

    let target = TargetLanguage::parse(&config.translator.target_language);
    let dispatcher = Arc::new(Dispatcher::new(job_tx, target));
    let workers = WorkerPool::spawn(
        config.pipeline.worker_count(),
        job_rx.to_async(),
        event_tx,
        ctx,
    );

    Pipeline {
        dispatcher,
        workers,
        events: event_rx,
    }
}
