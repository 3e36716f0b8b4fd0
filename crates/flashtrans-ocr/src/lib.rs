use std::sync::Arc;

use flashtrans_config::ocr::{OcrConfig, OcrEngineKind};

mod capture;
#[cfg(windows)]
mod com;
mod dummy;
mod engine;
#[cfg(windows)]
mod ocr;

pub use capture::{capture_from_encoded, encode_png, load_capture, normalize_capture};
pub use dummy::DummyRecognizer;
pub use engine::{
    DisabledRecognizer, OcrError, RecognizeEngine, Recognition, Recognizer, Serialized,
};
pub use image::RgbaImage;
#[cfg(windows)]
pub use ocr::WindowsRecognizer;

/// Build the recognizer selected by configuration
///
/// Load failures produce a [`DisabledRecognizer`] carrying the reason.
pub fn build_recognizer(config: &OcrConfig) -> Arc<dyn Recognizer> {
    match config.engine {
        OcrEngineKind::Dummy => Arc::new(DummyRecognizer),
        OcrEngineKind::Disabled => Arc::new(DisabledRecognizer::new("OCR disabled in configuration")),
        OcrEngineKind::Windows => windows_recognizer(&config.language),
    }
}

#[cfg(windows)]
fn windows_recognizer(language: &str) -> Arc<dyn Recognizer> {
    match WindowsRecognizer::new(language) {
        Ok(engine) => {
            tracing::info!("Windows OCR ready for '{}'", language);
            Arc::new(Serialized::new("windows", engine))
        }
        Err(e) => {
            tracing::error!("failed to initialize OCR engine: {:#}", e);
            Arc::new(DisabledRecognizer::new(format!("{e:#}")))
        }
    }
}

#[cfg(not(windows))]
fn windows_recognizer(_language: &str) -> Arc<dyn Recognizer> {
    tracing::warn!("Windows OCR requested on a non-Windows target");
    Arc::new(DisabledRecognizer::new("Windows OCR is only available on Windows"))
}
