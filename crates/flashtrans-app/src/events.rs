use std::path::PathBuf;
use std::str::FromStr;

use flashtrans_core::Dispatcher;
use flashtrans_types::{Payload, RequestKind};
use flashtrans_ui::{EditedFields, UiCommand};
use kanal::AsyncSender;

/// Host input standing in for hotkeys and window buttons
#[derive(Debug, Clone, PartialEq)]
pub enum HostCommand {
    /// `sel <text>`: selected text to translate
    Selection(String),
    /// `type <text>`: typed text to translate
    Typed(String),
    /// `ocr <png>`: screen region loaded from an image file
    Ocr(PathBuf),
    Chat(String),
    StopChat,
    /// `edit <index> original|translation <text>`
    Edit { index: usize, fields: EditedFields },
    ShowDashboard,
    ClearDashboard,
    Quit,
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum CommandError {
    #[error("Empty command")]
    Empty,

    #[error("Unknown command: {0}")]
    Unknown(String),

    #[error("{0} needs an argument")]
    MissingArgument(&'static str),

    #[error("Invalid record index: {0}")]
    InvalidIndex(String),

    #[error("Unknown record field: {0} (expected original or translation)")]
    UnknownField(String),
}

impl FromStr for HostCommand {
    type Err = CommandError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();
        let (name, rest) = match line.split_once(char::is_whitespace) {
            Some((name, rest)) => (name, rest.trim()),
            None => (line, ""),
        };

        match name {
            "" => Err(CommandError::Empty),
            "sel" => Ok(Self::Selection(rest.to_string())),
            "type" => Ok(Self::Typed(rest.to_string())),
            "ocr" => {
                if rest.is_empty() {
                    return Err(CommandError::MissingArgument("ocr"));
                }
                Ok(Self::Ocr(PathBuf::from(rest)))
            }
            "chat" => Ok(Self::Chat(rest.to_string())),
            "stop" => Ok(Self::StopChat),
            "edit" => parse_edit(rest),
            "dash" => Ok(Self::ShowDashboard),
            "clear" => Ok(Self::ClearDashboard),
            "quit" | "exit" => Ok(Self::Quit),
            other => Err(CommandError::Unknown(other.to_string())),
        }
    }
}

fn parse_edit(args: &str) -> Result<HostCommand, CommandError> {
    let mut parts = args.splitn(3, char::is_whitespace);
    let index = parts
        .next()
        .filter(|s| !s.is_empty())
        .ok_or(CommandError::MissingArgument("edit"))?;
    let index: usize = index
        .parse()
        .map_err(|_| CommandError::InvalidIndex(index.to_string()))?;

    let field = parts.next().ok_or(CommandError::MissingArgument("edit"))?;
    let text = parts.next().unwrap_or("").trim().to_string();

    let fields = match field {
        "original" => EditedFields {
            original_text: Some(text),
            ..Default::default()
        },
        "translation" => EditedFields {
            translated_text: Some(text),
            ..Default::default()
        },
        other => return Err(CommandError::UnknownField(other.to_string())),
    };

    Ok(HostCommand::Edit { index, fields })
}

/// Route one host command; returns `false` once the host asked to quit
pub async fn handle_host_command(
    command: HostCommand,
    dispatcher: &Dispatcher,
    commands_tx: &AsyncSender<UiCommand>,
) -> anyhow::Result<bool> {
    tracing::debug!(">>> [HOST] {:?}", command);

    match command {
        HostCommand::Selection(text) => {
            submit(dispatcher, RequestKind::SelectionTranslate, Payload::Text(text))
        }
        HostCommand::Typed(text) => {
            submit(dispatcher, RequestKind::TypedTranslate, Payload::Text(text))
        }
        HostCommand::Ocr(path) => {
            let loaded =
                tokio::task::spawn_blocking(move || flashtrans_ocr::load_capture(&path)).await?;
            match loaded {
                Ok(image) => {
                    submit(dispatcher, RequestKind::RegionOcrTranslate, Payload::Image(image))
                }
                Err(e) => tracing::warn!("[HOST] capture not loaded: {:#}", e),
            }
        }
        HostCommand::Chat(question) => commands_tx.send(UiCommand::Chat(question)).await?,
        HostCommand::StopChat => commands_tx.send(UiCommand::StopChat).await?,
        HostCommand::Edit { index, fields } => {
            commands_tx.send(UiCommand::EditRecord { index, fields }).await?
        }
        HostCommand::ShowDashboard => commands_tx.send(UiCommand::Snapshot).await?,
        HostCommand::ClearDashboard => commands_tx.send(UiCommand::ClearDashboard).await?,
        HostCommand::Quit => return Ok(false),
    }

    Ok(true)
}

fn submit(dispatcher: &Dispatcher, kind: RequestKind, payload: Payload) {
    let described = payload.describe();
    match dispatcher.submit(kind, payload) {
        Ok(id) => tracing::info!("[HOST] {} submitted as {} ({})", kind, id, described),
        Err(e) => tracing::warn!("[HOST] {} rejected: {}", kind, e),
    }
}
