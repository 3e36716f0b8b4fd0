use std::sync::Arc;
use std::time::Duration;

use flashtrans_core::{Dispatcher, build_pipeline};
use flashtrans_ui::{Presenter, UiCommand, UiUpdate, presenter_loop};
use kanal::{AsyncReceiver, AsyncSender};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::io::watcher_io;
use crate::state::AppState;
use crate::ui::ui_loop;

/// Centralized channel management
pub struct ChannelSet {
    pub ui_to_presenter: (AsyncSender<UiCommand>, AsyncReceiver<UiCommand>),
    pub presenter_to_ui: (AsyncSender<UiUpdate>, AsyncReceiver<UiUpdate>),
}

impl ChannelSet {
    pub fn new() -> Self {
        Self {
            ui_to_presenter: kanal::bounded_async(64),  // UI interactions
            presenter_to_ui: kanal::unbounded_async(), // chat fragments arrive in bursts
        }
    }
}

impl Default for ChannelSet {
    fn default() -> Self {
        Self::new()
    }
}

/// Application controller for task spawning and lifecycle
pub struct AppController {
    state: Arc<AppState>,
    cancel_token: CancellationToken,
    dispatcher: Option<Arc<Dispatcher>>,
}

impl AppController {
    pub fn new(state: Arc<AppState>) -> Self {
        Self {
            state,
            cancel_token: CancellationToken::new(),
            dispatcher: None,
        }
    }

    pub fn dispatcher(&self) -> Option<&Arc<Dispatcher>> {
        self.dispatcher.as_ref()
    }

    /// Start the pipeline, the presenter, the renderer and the host watcher
    ///
    /// Every task ends on its own once [`AppController::shutdown`] runs.
    pub fn spawn_tasks(&mut self, lines_rx: AsyncReceiver<String>) -> JoinSet<anyhow::Result<()>> {
        let mut tasks = JoinSet::new();

        let pipeline = build_pipeline(&self.state.config, self.state.backends.clone());
        tracing::info!("Pipeline started with {} worker(s)", pipeline.workers.size());

        let ChannelSet {
            ui_to_presenter: (commands_tx, commands_rx),
            presenter_to_ui: (updates_tx, updates_rx),
        } = ChannelSet::new();

        // Presenter
        let presenter = Presenter::new(pipeline.dispatcher.clone(), &self.state.config.dashboard);
        tasks.spawn(presenter_loop(
            presenter,
            pipeline.events.clone(),
            commands_rx,
            updates_tx,
        ));

        // UI loop
        tasks.spawn(ui_loop(updates_rx, commands_tx.clone()));

        // Watcher IO
        tasks.spawn(watcher_io(
            lines_rx,
            pipeline.dispatcher.clone(),
            commands_tx,
            self.cancel_token.child_token(),
        ));

        // Workers
        let workers = pipeline.workers;
        tasks.spawn(async move {
            workers.join().await;
            tracing::info!("Worker pool stopped");
            Ok(())
        });

        self.dispatcher = Some(pipeline.dispatcher);
        tasks
    }

    /// Stop accepting input and cancel everything in flight
    pub fn shutdown(&self) {
        self.cancel_token.cancel();
        if let Some(dispatcher) = &self.dispatcher {
            dispatcher.shutdown();
        }
    }

    /// Shut down and wait for tasks, aborting whatever outlives `grace`
    pub async fn drain(&self, mut tasks: JoinSet<anyhow::Result<()>>, grace: Duration) {
        self.shutdown();

        let joined = tokio::time::timeout(grace, async {
            while let Some(result) = tasks.join_next().await {
                match result {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => tracing::error!("Task exited with error: {:#}", e),
                    Err(e) => tracing::error!("Task panicked: {}", e),
                }
            }
        })
        .await;

        if joined.is_err() {
            tracing::warn!("Tasks still running after {:?}, aborting", grace);
            tasks.abort_all();
        }
    }
}
