use std::io::BufRead;
use std::sync::Arc;

use flashtrans_core::Dispatcher;
use flashtrans_ui::UiCommand;
use kanal::{AsyncReceiver, AsyncSender};
use tokio_util::sync::CancellationToken;

use crate::events::{CommandError, HostCommand, handle_host_command};

/// Read stdin lines on a plain thread
///
/// Blocking stdin reads would otherwise hold the runtime open at shutdown.
pub fn spawn_stdin_reader() -> AsyncReceiver<String> {
    let (lines_tx, lines_rx) = kanal::unbounded();

    let spawned = std::thread::Builder::new()
        .name("flashtrans-stdin".into())
        .spawn(move || {
            let stdin = std::io::stdin();
            for line in stdin.lock().lines() {
                match line {
                    Ok(line) => {
                        if lines_tx.send(line).is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        tracing::error!("Failed to read stdin: {}", e);
                        break;
                    }
                }
            }
            tracing::debug!("stdin reader stopping");
        });

    if let Err(e) = spawned {
        tracing::error!("Failed to spawn stdin reader: {}", e);
    }

    lines_rx.to_async()
}

/// Watch host input until quit, end of input or cancellation
pub async fn watcher_io(
    lines_rx: AsyncReceiver<String>,
    dispatcher: Arc<Dispatcher>,
    commands_tx: AsyncSender<UiCommand>,
    cancel: CancellationToken,
) -> anyhow::Result<()> {
    tracing::info!("Watching host input (sel, type, ocr, chat, stop, edit, dash, clear, quit)");

    loop {
        let line = tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Host watcher stopping");
                break;
            }
            line = lines_rx.recv() => match line {
                Ok(line) => line,
                Err(_) => {
                    tracing::info!("Host input closed");
                    break;
                }
            },
        };

        let command = match line.parse::<HostCommand>() {
            Ok(command) => command,
            Err(CommandError::Empty) => continue,
            Err(e) => {
                tracing::warn!("[HOST] {}", e);
                continue;
            }
        };

        if !handle_host_command(command, &dispatcher, &commands_tx).await? {
            tracing::info!("Quit requested");
            break;
        }
    }

    Ok(())
}
