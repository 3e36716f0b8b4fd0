use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OcrEngineKind {
    /// Deterministic stand-in used when no engine is installed
    Dummy,
    /// Windows.Media.Ocr, only available on Windows
    Windows,
    Disabled,
}

impl OcrEngineKind {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "dummy" => Some(Self::Dummy),
            "windows" | "winrt" => Some(Self::Windows),
            "disabled" | "none" => Some(Self::Disabled),
            _ => None,
        }
    }
}

fn default_engine() -> OcrEngineKind {
    OcrEngineKind::Dummy
}

fn default_language() -> String {
    "en".to_string()
}

fn default_upscale_below_px() -> u32 {
    900
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct OcrConfig {
    #[serde(default = "default_engine")]
    pub engine: OcrEngineKind,
    /// Recognizer language tag (e.g. "en", "zh-Hans")
    #[serde(default = "default_language")]
    pub language: String,
    /// Captures whose longest side is below this are upscaled 2x; 0 disables
    #[serde(default = "default_upscale_below_px")]
    pub upscale_below_px: u32,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            engine: default_engine(),
            language: default_language(),
            upscale_below_px: default_upscale_below_px(),
        }
    }
}
