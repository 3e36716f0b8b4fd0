use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

pub type LanguageCode = String;

/// Monotonic identifier handed out by the dispatcher
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RequestId(pub u64);

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// What a request does. Every kind owns exactly one slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RequestKind {
    SelectionTranslate,
    TypedTranslate,
    RegionOcrTranslate,
    Chat,
    /// Typed translation issued by a dashboard edit
    DashboardRetranslate,
}

impl RequestKind {
    pub const ALL: [RequestKind; 5] = [
        RequestKind::SelectionTranslate,
        RequestKind::TypedTranslate,
        RequestKind::RegionOcrTranslate,
        RequestKind::Chat,
        RequestKind::DashboardRetranslate,
    ];

    pub fn needs_ocr(self) -> bool {
        matches!(self, RequestKind::RegionOcrTranslate)
    }

    pub fn is_chat(self) -> bool {
        matches!(self, RequestKind::Chat)
    }

    /// Kinds whose successful results are appended to the dashboard
    pub fn populates_dashboard(self) -> bool {
        matches!(
            self,
            RequestKind::SelectionTranslate
                | RequestKind::TypedTranslate
                | RequestKind::RegionOcrTranslate
        )
    }

    pub fn label(self) -> &'static str {
        match self {
            RequestKind::SelectionTranslate => "selection",
            RequestKind::TypedTranslate => "typed",
            RequestKind::RegionOcrTranslate => "region",
            RequestKind::Chat => "chat",
            RequestKind::DashboardRetranslate => "dashboard",
        }
    }
}

impl fmt::Display for RequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Decoded RGBA8 screenshot handed over by the capture collaborator
#[derive(Clone, PartialEq)]
pub struct CapturedImage {
    pub width: u32,
    pub height: u32,
    pub pixels: Arc<[u8]>,
}

impl CapturedImage {
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> Self {
        Self {
            width,
            height,
            pixels: pixels.into(),
        }
    }

    /// Non-empty and the buffer matches the dimensions
    pub fn is_valid(&self) -> bool {
        let expected = self.width as usize * self.height as usize * 4;
        self.width > 0 && self.height > 0 && self.pixels.len() == expected
    }
}

impl fmt::Debug for CapturedImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CapturedImage")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bytes", &self.pixels.len())
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChatRole {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: ChatRole,
    pub content: String,
}

impl ChatTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ChatPrompt {
    pub question: String,
    /// Source/translation of the last result, offered to the model as context
    pub context: Option<String>,
    pub history: Vec<ChatTurn>,
}

impl ChatPrompt {
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            ..Default::default()
        }
    }
}

/// Input of a request
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Text(String),
    Image(CapturedImage),
    Chat(ChatPrompt),
}

impl Payload {
    pub fn text(text: impl Into<String>) -> Self {
        Payload::Text(text.into())
    }

    /// Short form for log lines
    pub fn describe(&self) -> String {
        match self {
            Payload::Text(text) => format!("text ({} chars)", text.chars().count()),
            Payload::Image(image) => format!("image {}x{}", image.width, image.height),
            Payload::Chat(prompt) => format!(
                "chat ({} chars, {} turns)",
                prompt.question.chars().count(),
                prompt.history.len()
            ),
        }
    }
}

/// Requested output language; `Auto` is resolved from the text being translated
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TargetLanguage {
    #[default]
    Auto,
    Fixed(LanguageCode),
}

impl TargetLanguage {
    pub fn parse(value: &str) -> Self {
        let value = value.trim().to_lowercase();
        if value.is_empty() || value == "auto" {
            TargetLanguage::Auto
        } else {
            TargetLanguage::Fixed(value)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    InvalidInput,
    OcrUnavailable,
    NoTextFound,
    ModelNotLoaded,
    InferenceError,
    Cancelled,
}

impl ErrorKind {
    /// Message shown to the user for a failed request
    pub fn user_message(self) -> &'static str {
        match self {
            ErrorKind::InvalidInput => "Nothing to translate",
            ErrorKind::OcrUnavailable => "Text recognition is unavailable",
            ErrorKind::NoTextFound => "No text detected",
            ErrorKind::ModelNotLoaded => "Model not loaded",
            ErrorKind::InferenceError => "Translation failed",
            ErrorKind::Cancelled => "Cancelled",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::InvalidInput => "InvalidInput",
            ErrorKind::OcrUnavailable => "OcrUnavailable",
            ErrorKind::NoTextFound => "NoTextFound",
            ErrorKind::ModelNotLoaded => "ModelNotLoaded",
            ErrorKind::InferenceError => "InferenceError",
            ErrorKind::Cancelled => "Cancelled",
        };
        f.write_str(name)
    }
}

/// Progress of one request through the pipeline
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineStage {
    Captured(Payload),
    Recognized { text: String, confidence: f32 },
    /// Incremental chat fragment
    Partial(String),
    Translated { text: String, target: LanguageCode },
    Failed { kind: ErrorKind, message: String },
    Cancelled,
}

impl PipelineStage {
    pub fn failed(kind: ErrorKind, message: impl Into<String>) -> Self {
        PipelineStage::Failed {
            kind,
            message: message.into(),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            PipelineStage::Translated { .. } | PipelineStage::Failed { .. } | PipelineStage::Cancelled
        )
    }

    fn rank(&self) -> u8 {
        match self {
            PipelineStage::Captured(_) => 1,
            PipelineStage::Recognized { .. } => 2,
            PipelineStage::Partial(_) => 3,
            PipelineStage::Translated { .. }
            | PipelineStage::Failed { .. }
            | PipelineStage::Cancelled => 4,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            PipelineStage::Captured(_) => "captured",
            PipelineStage::Recognized { .. } => "recognized",
            PipelineStage::Partial(_) => "partial",
            PipelineStage::Translated { .. } => "translated",
            PipelineStage::Failed { .. } => "failed",
            PipelineStage::Cancelled => "cancelled",
        }
    }
}

/// Tracks the stages seen for one request and rejects regressions
#[derive(Debug, Default, Clone, Copy)]
pub struct StageProgress {
    last_rank: u8,
    finished: bool,
}

impl StageProgress {
    /// Returns false if `stage` may not follow what was already seen
    pub fn advance(&mut self, stage: &PipelineStage) -> bool {
        if self.finished {
            return false;
        }

        let rank = stage.rank();
        let repeated_fragment = rank == self.last_rank && matches!(stage, PipelineStage::Partial(_));
        if rank <= self.last_rank && !repeated_fragment {
            return false;
        }

        self.last_rank = rank;
        self.finished = stage.is_terminal();
        true
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }
}

/// One stage of one request, as delivered to the presenter
#[derive(Debug, Clone)]
pub struct PipelineEvent {
    pub request_id: RequestId,
    pub kind: RequestKind,
    pub stage: PipelineStage,
}
