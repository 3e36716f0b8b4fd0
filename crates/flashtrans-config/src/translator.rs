use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TranslatorProvider {
    /// Echoes input, no model required
    Dummy,
    /// DeepL machine translation service
    Deepl,
    /// OpenAI-compatible chat completions endpoint
    Api,
    /// Local generative model served by a local OpenAI-compatible runtime
    Local,
    Disabled,
}

impl TranslatorProvider {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "dummy" => Some(Self::Dummy),
            "deepl" => Some(Self::Deepl),
            "api" | "openai" => Some(Self::Api),
            "local" | "qwen" => Some(Self::Local),
            "disabled" | "none" => Some(Self::Disabled),
            _ => None,
        }
    }
}

fn default_provider() -> TranslatorProvider {
    TranslatorProvider::Dummy
}

fn default_target_language() -> String {
    "auto".to_string()
}

fn default_deepl_api_url() -> String {
    "https://api-free.deepl.com/v2/translate".to_string()
}

fn default_translate_temperature() -> f32 {
    0.1
}

fn default_chat_temperature() -> f32 {
    0.3
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_model_path() -> String {
    "./models/qwen3-1.7b-q4.gguf".to_string()
}

fn default_local_base_url() -> String {
    "http://127.0.0.1:8080".to_string()
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct TranslatorConfig {
    #[serde(default = "default_provider")]
    pub provider: TranslatorProvider,
    /// Source language hint, detected by the backend when absent
    #[serde(default)]
    pub source_language: Option<String>,
    /// "auto" picks en for CJK text and zh otherwise
    #[serde(default = "default_target_language")]
    pub target_language: String,
    /// Artificial per-call latency of the dummy backend
    #[serde(default)]
    pub dummy_delay_ms: u64,
    #[serde(default)]
    pub deepl: DeeplConfig,
    #[serde(default)]
    pub api: LlmApiConfig,
    #[serde(default)]
    pub local: LocalModelConfig,
}

impl Default for TranslatorConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            source_language: None,
            target_language: default_target_language(),
            dummy_delay_ms: 0,
            deepl: DeeplConfig::default(),
            api: LlmApiConfig::default(),
            local: LocalModelConfig::default(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct DeeplConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_deepl_api_url")]
    pub api_url: String,
}

impl Default for DeeplConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_url: default_deepl_api_url(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct LlmApiConfig {
    /// Base URL; `/v1/chat/completions` is appended when missing
    #[serde(default)]
    pub base_url: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub model: String,
    #[serde(default = "default_translate_temperature")]
    pub translate_temperature: f32,
    #[serde(default = "default_chat_temperature")]
    pub chat_temperature: f32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for LlmApiConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            api_key: String::new(),
            model: String::new(),
            translate_temperature: default_translate_temperature(),
            chat_temperature: default_chat_temperature(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct LocalModelConfig {
    /// GGUF model file; the adapter is disabled when it is missing
    #[serde(default = "default_model_path")]
    pub model_path: String,
    /// Local runtime serving the model
    #[serde(default = "default_local_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for LocalModelConfig {
    fn default() -> Self {
        Self {
            model_path: default_model_path(),
            base_url: default_local_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}
