use std::sync::Mutex;

use flashtrans_types::ErrorKind;
use image::RgbaImage;

#[derive(Debug, Clone, PartialEq)]
pub struct Recognition {
    pub text: String,
    /// 0.0..=1.0, engines without a score report 1.0
    pub confidence: f32,
}

#[derive(Debug, thiserror::Error)]
pub enum OcrError {
    #[error("OCR engine unavailable: {0}")]
    Unavailable(String),

    #[error("No text found")]
    NoTextFound,

    #[error("Invalid capture: {0}")]
    InvalidImage(String),

    #[error("Recognition failed: {0}")]
    Recognition(String),
}

impl OcrError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            OcrError::NoTextFound => ErrorKind::NoTextFound,
            OcrError::Unavailable(_) | OcrError::InvalidImage(_) | OcrError::Recognition(_) => {
                ErrorKind::OcrUnavailable
            }
        }
    }
}

/// Text recognition capability shared by all workers
///
/// Calls are blocking and are made from the blocking thread pool.
pub trait Recognizer: Send + Sync {
    fn recognize(&self, image: &RgbaImage) -> Result<Recognition, OcrError>;

    fn name(&self) -> &str;

    /// False when the engine failed to load
    fn is_ready(&self) -> bool {
        true
    }
}

/// Stand-in for an engine that failed to load; every call fails fast
pub struct DisabledRecognizer {
    reason: String,
}

impl DisabledRecognizer {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }
}

impl Recognizer for DisabledRecognizer {
    fn recognize(&self, _image: &RgbaImage) -> Result<Recognition, OcrError> {
        Err(OcrError::Unavailable(self.reason.clone()))
    }

    fn name(&self) -> &str {
        "disabled"
    }

    fn is_ready(&self) -> bool {
        false
    }
}

/// Engine that must not be entered from two threads at once
pub trait RecognizeEngine: Send {
    fn recognize(&mut self, image: &RgbaImage) -> Result<Recognition, OcrError>;
}

/// Serializes calls to a non thread-safe engine behind one lock per handle
pub struct Serialized<E> {
    name: String,
    engine: Mutex<E>,
}

impl<E: RecognizeEngine> Serialized<E> {
    pub fn new(name: impl Into<String>, engine: E) -> Self {
        Self {
            name: name.into(),
            engine: Mutex::new(engine),
        }
    }
}

impl<E: RecognizeEngine> Recognizer for Serialized<E> {
    fn recognize(&self, image: &RgbaImage) -> Result<Recognition, OcrError> {
        let mut engine = self
            .engine
            .lock()
            .map_err(|_| OcrError::Unavailable(format!("{} engine poisoned", self.name)))?;
        engine.recognize(image)
    }

    fn name(&self) -> &str {
        &self.name
    }
}
