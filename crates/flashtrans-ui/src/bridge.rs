use kanal::{AsyncReceiver, AsyncSender, Receiver, Sender};

use crate::events::{UiCommand, UiUpdate};

/// Bridge between the async presenter and a synchronous UI thread
pub struct UiBridge {
    to_ui_tx: Sender<UiUpdate>,
    from_ui_rx: AsyncReceiver<UiCommand>,
}

/// Ends held by the UI thread
pub struct UiBridgeHandle {
    pub to_ui_rx: Receiver<UiUpdate>,
    pub from_ui_tx: Sender<UiCommand>,
}

impl UiBridge {
    pub fn new() -> (Self, UiBridgeHandle) {
        let (to_ui_tx, to_ui_rx) = kanal::unbounded();
        let (from_ui_tx, from_ui_rx) = kanal::unbounded_async();

        (
            UiBridge {
                to_ui_tx,
                from_ui_rx,
            },
            UiBridgeHandle {
                to_ui_rx,
                from_ui_tx: from_ui_tx.to_sync(),
            },
        )
    }

    pub async fn forward_from_presenter(&self, updates_rx: AsyncReceiver<UiUpdate>) {
        while let Ok(update) = updates_rx.recv().await {
            if self.to_ui_tx.send(update).is_err() {
                break;
            }
        }
    }

    pub async fn forward_to_presenter(&self, commands_tx: AsyncSender<UiCommand>) {
        while let Ok(command) = self.from_ui_rx.recv().await {
            if commands_tx.send(command).await.is_err() {
                break;
            }
        }
    }
}
