use std::env;

use serde::{Deserialize, Serialize};

use self::dashboard::DashboardConfig;
use self::ocr::{OcrConfig, OcrEngineKind};
use self::pipeline::PipelineConfig;
use self::translator::{TranslatorConfig, TranslatorProvider};

pub mod dashboard;
pub mod ocr;
pub mod pipeline;
pub mod translator;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub ocr: OcrConfig,
    pub translator: TranslatorConfig,
    pub pipeline: PipelineConfig,
    pub dashboard: DashboardConfig,
}

impl Config {
    /// Defaults with environment overrides applied
    pub fn new() -> Self {
        let mut config = Self::default();
        config.apply_overrides(|key| env::var(key).ok());
        config
    }

    /// Apply overrides from `lookup` (normally the process environment)
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(workers) = lookup("FLASHTRANS_WORKERS").and_then(|v| v.parse().ok()) {
            self.pipeline.workers = workers;
        }

        if let Some(provider) =
            lookup("FLASHTRANS_TRANSLATOR").and_then(|v| TranslatorProvider::from_name(&v))
        {
            self.translator.provider = provider;
        }

        if let Some(engine) = lookup("FLASHTRANS_OCR_ENGINE").and_then(|v| OcrEngineKind::from_name(&v)) {
            self.ocr.engine = engine;
        }

        if let Some(target) = lookup("FLASHTRANS_TARGET_LANG") {
            self.translator.target_language = target;
        }

        if let Some(key) = lookup("DEEPL_API_KEY") {
            self.translator.deepl.api_key = key;
        }

        if let Some(key) = lookup("LLM_API_KEY") {
            self.translator.api.api_key = key;
        }

        if let Some(url) = lookup("LLM_BASE_URL") {
            self.translator.api.base_url = url;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn test_overrides_replace_defaults() {
        let vars: HashMap<&str, &str> = [
            ("FLASHTRANS_WORKERS", "3"),
            ("FLASHTRANS_TRANSLATOR", "API"),
            ("FLASHTRANS_TARGET_LANG", "en"),
            ("LLM_API_KEY", "sk-test"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config.apply_overrides(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.pipeline.workers, 3);
        assert_eq!(config.translator.provider, TranslatorProvider::Api);
        assert_eq!(config.translator.target_language, "en");
        assert_eq!(config.translator.api.api_key, "sk-test");
        assert_eq!(config.ocr.engine, OcrEngineKind::Dummy);
    }

    #[test]
    fn test_unknown_provider_is_ignored() {
        let mut config = Config::default();
        config.apply_overrides(|key| (key == "FLASHTRANS_TRANSLATOR").then(|| "bogus".to_string()));
        assert_eq!(config.translator.provider, TranslatorProvider::Dummy);
    }
}
