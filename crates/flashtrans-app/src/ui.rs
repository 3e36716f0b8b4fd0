use flashtrans_ui::{DashboardRecord, UiBridge, UiBridgeHandle, UiCommand, UiUpdate};
use kanal::{AsyncReceiver, AsyncSender};

/// One log line per update
pub fn render(update: &UiUpdate) -> String {
    match update {
        UiUpdate::PanelBusy { kind, request_id } => format!("[{kind}] {request_id} working..."),
        UiUpdate::PanelSource {
            kind,
            request_id,
            text,
        } => format!("[{kind}] {request_id} source: {text}"),
        UiUpdate::PanelResult {
            kind,
            request_id,
            text,
            target,
        } => format!("[{kind}] {request_id} -> {target}: {text}"),
        UiUpdate::PanelError {
            kind,
            request_id,
            message,
        } => format!("[{kind}] {request_id} error: {message}"),
        UiUpdate::Notice(message) => format!("[notice] {message}"),
        UiUpdate::ChatQuestion(question) => format!("[chat] > {question}"),
        UiUpdate::ChatFragment(fragment) => format!("[chat] ... {fragment}"),
        UiUpdate::ChatAnswer(answer) => format!("[chat] < {answer}"),
        UiUpdate::ChatDiscarded => "[chat] answer discarded".to_string(),
        UiUpdate::DashboardAppended { index, record } => format!(
            "[dashboard] +{index} {} => {}",
            record.original_text, record.translated_text
        ),
        UiUpdate::DashboardUpdated { index, record } => format!(
            "[dashboard] ~{index} {} => {}{}",
            record.original_text,
            record.translated_text,
            stale_mark(record)
        ),
        UiUpdate::DashboardCleared => "[dashboard] cleared".to_string(),
        UiUpdate::Snapshot(records) => {
            let mut out = format!("[dashboard] {} record(s)", records.len());
            for (index, record) in records.iter().enumerate() {
                out.push_str(&format!(
                    "\n  {index}. ({}) {} => {}{}",
                    record.kind,
                    record.original_text,
                    record.translated_text,
                    stale_mark(record)
                ));
            }
            out
        }
    }
}

fn stale_mark(record: &DashboardRecord) -> &'static str {
    if record.stale { " (stale)" } else { "" }
}

/// Drive the renderer thread through a bridge until the presenter stops
pub async fn ui_loop(
    updates_rx: AsyncReceiver<UiUpdate>,
    commands_tx: AsyncSender<UiCommand>,
) -> anyhow::Result<()> {
    let (bridge, handle) = UiBridge::new();

    let renderer = std::thread::Builder::new()
        .name("flashtrans-ui".into())
        .spawn(move || render_thread(handle))?;

    tokio::select! {
        _ = bridge.forward_from_presenter(updates_rx) => {
            tracing::debug!("[UI] presenter updates closed");
        }
        _ = bridge.forward_to_presenter(commands_tx) => {
            tracing::debug!("[UI] renderer commands closed");
        }
    }

    // Dropping the bridge closes the renderer's channel
    drop(bridge);
    tokio::task::spawn_blocking(move || {
        if renderer.join().is_err() {
            tracing::error!("[UI] renderer thread panicked");
        }
    })
    .await?;

    Ok(())
}

fn render_thread(handle: UiBridgeHandle) {
    // The terminal renderer never originates commands; `from_ui_tx` only
    // has to outlive the render loop
    let UiBridgeHandle {
        to_ui_rx,
        from_ui_tx: _from_ui_tx,
    } = handle;

    while let Ok(update) = to_ui_rx.recv() {
        tracing::info!("{}", render(&update));
    }
}
