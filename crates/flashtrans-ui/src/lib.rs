use flashtrans_types::PipelineEvent;
use kanal::{AsyncReceiver, AsyncSender};

pub mod bridge;
pub mod dashboard;
pub mod events;
pub mod presenter;
pub mod state;

pub use bridge::{UiBridge, UiBridgeHandle};
pub use dashboard::{DashboardError, DashboardRecord, DashboardStore, EditedFields, UpdateOutcome};
pub use events::{UiCommand, UiUpdate};
pub use presenter::Presenter;
pub use state::{LastContext, PanelState, UiState};

/// Presenter main loop: the only task that touches UI state
///
/// Runs until either input channel closes or the renderer goes away.
pub async fn presenter_loop(
    mut presenter: Presenter,
    events_rx: AsyncReceiver<PipelineEvent>,
    commands_rx: AsyncReceiver<UiCommand>,
    updates_tx: AsyncSender<UiUpdate>,
) -> anyhow::Result<()> {
    tracing::info!("[PRESENTER] Starting presenter loop");

    loop {
        let updates = tokio::select! {
            event = events_rx.recv() => match event {
                Ok(event) => presenter.apply(event),
                Err(_) => break,
            },
            command = commands_rx.recv() => match command {
                Ok(command) => {
                    tracing::debug!("[PRESENTER] command {:?}", command);
                    presenter.handle_command(command)
                }
                Err(_) => break,
            },
        };

        for update in updates {
            updates_tx.send(update).await?;
        }
    }

    tracing::info!("[PRESENTER] Input closed, presenter loop exiting");
    Ok(())
}
