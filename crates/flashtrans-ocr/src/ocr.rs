use anyhow::{Context, Result};
use image::RgbaImage;
use windows::{
    Globalization::Language,
    Graphics::Imaging::BitmapDecoder,
    Media::Ocr::OcrEngine as WinOcrEngine,
    Storage::Streams::{DataWriter, InMemoryRandomAccessStream},
    core::HSTRING,
};

use crate::capture::encode_png;
use crate::com::ComGuard;
use crate::engine::{OcrError, Recognition, RecognizeEngine};

/// Windows.Media.Ocr recognizer
pub struct WindowsRecognizer {
    engine: WinOcrEngine,
}

impl WindowsRecognizer {
    /// Create a new OCR engine for the specified language (e.g., "ja", "en")
    pub fn new(language_code: &str) -> Result<Self> {
        let _com = ComGuard::initialize()?;

        let language = Language::CreateLanguage(&HSTRING::from(language_code))
            .context("Failed to create language")?;

        let engine = WinOcrEngine::TryCreateFromLanguage(&language)
            .context("Failed to create OCR engine for language")?;

        Ok(Self { engine })
    }

    /// Recognize text from PNG image bytes
    fn recognize_png(&self, image_bytes: &[u8]) -> Result<String> {
        let stream = InMemoryRandomAccessStream::new().context("Failed to create stream")?;
        let writer = DataWriter::CreateDataWriter(&stream).context("Failed to create writer")?;

        writer
            .WriteBytes(image_bytes)
            .context("Failed to write image bytes")?;
        writer
            .StoreAsync()
            .context("Failed to store async")?
            .get()
            .context("Failed to store data")?;
        writer.FlushAsync().context("Failed to flush")?.get()?;

        stream.Seek(0).context("Failed to seek")?;

        let decoder = BitmapDecoder::CreateAsync(&stream)
            .context("Failed to create decoder async")?
            .get()
            .context("Failed to get decoder")?;

        let bitmap = decoder
            .GetSoftwareBitmapAsync()
            .context("Failed to get bitmap async")?
            .get()
            .context("Failed to get software bitmap")?;

        let result = self
            .engine
            .RecognizeAsync(&bitmap)
            .context("Failed to recognize async")?
            .get()
            .context("Failed to get OCR result")?;

        Ok(result.Text().context("Failed to get text")?.to_string())
    }
}

impl RecognizeEngine for WindowsRecognizer {
    fn recognize(&mut self, image: &RgbaImage) -> Result<Recognition, OcrError> {
        // Blocking-pool threads are not COM initialized
        let _com = ComGuard::initialize().map_err(|e| OcrError::Unavailable(format!("{e:#}")))?;

        let png = encode_png(image).map_err(|e| OcrError::InvalidImage(format!("{e:#}")))?;
        let text = self
            .recognize_png(&png)
            .map_err(|e| OcrError::Recognition(format!("{e:#}")))?;

        if text.trim().is_empty() {
            return Err(OcrError::NoTextFound);
        }

        // WinRT reports no score
        Ok(Recognition {
            text,
            confidence: 1.0,
        })
    }
}
