use std::sync::Arc;
use std::time::Duration;

use flashtrans_config::translator::{TranslatorConfig, TranslatorProvider};
use flashtrans_types::{ChatPrompt, ErrorKind, LanguageCode};

mod deepl;
mod dummy;
mod local;
mod openai;
mod prompt;

pub use deepl::DeeplTranslator;
pub use dummy::{DummyTranslator, VecFragments};
pub use local::LocalTranslator;
pub use openai::{ApiTranslator, ChatCompletionsClient, SseDecoder, SseEvent, build_chat_url};
pub use prompt::{ThinkFilter, strip_think};

/// Translation provider interface
#[async_trait::async_trait]
pub trait Translator: Send + Sync {
    /// Translate text into `to`; `from` is detected by the backend when absent
    async fn translate(
        &self,
        text: &str,
        from: Option<LanguageCode>,
        to: LanguageCode,
    ) -> Result<Translation, TranslateError>;

    /// Provider metadata
    fn metadata(&self) -> ProviderMetadata;

    /// False for adapters whose model failed to load
    fn is_ready(&self) -> bool {
        true
    }

    /// Chat capability of generative backends
    fn chat(&self) -> Option<&dyn ChatModel> {
        None
    }
}

/// Generative model that answers incrementally
#[async_trait::async_trait]
pub trait ChatModel: Send + Sync {
    /// Start answering `prompt`. Each call starts a fresh stream.
    async fn infer(&self, prompt: &ChatPrompt) -> Result<ChatStream, TranslateError>;
}

/// Lazy, finite sequence of answer fragments
///
/// Consumers cancel by no longer pulling; dropping the stream releases it.
#[async_trait::async_trait]
pub trait FragmentStream: Send {
    async fn next_fragment(&mut self) -> Option<Result<String, TranslateError>>;
}

pub type ChatStream = Box<dyn FragmentStream>;

#[derive(Debug, Clone)]
pub struct Translation {
    pub text: String,
    pub from: Option<LanguageCode>,
    pub to: LanguageCode,
    pub provider: String,
    pub confidence: Option<f32>,
    pub alternatives: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct ProviderMetadata {
    pub name: String,
    pub requires_api_key: bool,
    /// Runs on this machine
    pub local: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum TranslateError {
    #[error("Model not loaded: {0}")]
    ModelNotLoaded(String),

    #[error("API error: {0}")]
    ApiError(String),

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("Unsupported language pair: {from} -> {to}")]
    UnsupportedLanguagePair { from: String, to: String },

    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    #[error("Authentication error")]
    AuthenticationError,

    #[error("{0} does not support chat")]
    ChatUnsupported(String),
}

impl TranslateError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            TranslateError::ModelNotLoaded(_) | TranslateError::ChatUnsupported(_) => {
                ErrorKind::ModelNotLoaded
            }
            TranslateError::ApiError(_)
            | TranslateError::NetworkError(_)
            | TranslateError::UnsupportedLanguagePair { .. }
            | TranslateError::RateLimitExceeded
            | TranslateError::AuthenticationError => ErrorKind::InferenceError,
        }
    }

    /// Message without the variant prefix
    pub fn detail(&self) -> String {
        match self {
            TranslateError::ModelNotLoaded(reason) => reason.clone(),
            other => other.to_string(),
        }
    }
}

/// Stand-in for a backend that failed to load; every call fails fast
pub struct DisabledTranslator {
    provider: String,
    reason: String,
}

impl DisabledTranslator {
    pub fn new(provider: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            reason: reason.into(),
        }
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }
}

#[async_trait::async_trait]
impl Translator for DisabledTranslator {
    async fn translate(
        &self,
        _text: &str,
        _from: Option<LanguageCode>,
        _to: LanguageCode,
    ) -> Result<Translation, TranslateError> {
        Err(TranslateError::ModelNotLoaded(self.reason.clone()))
    }

    fn metadata(&self) -> ProviderMetadata {
        ProviderMetadata {
            name: self.provider.clone(),
            requires_api_key: false,
            local: true,
        }
    }

    fn is_ready(&self) -> bool {
        false
    }

    fn chat(&self) -> Option<&dyn ChatModel> {
        Some(self)
    }
}

#[async_trait::async_trait]
impl ChatModel for DisabledTranslator {
    async fn infer(&self, _prompt: &ChatPrompt) -> Result<ChatStream, TranslateError> {
        Err(TranslateError::ModelNotLoaded(self.reason.clone()))
    }
}

/// Build the translator selected by configuration
///
/// Construction failures (missing model file, missing key) produce a
/// [`DisabledTranslator`] instead of an error.
pub fn build_translator(config: &TranslatorConfig) -> Arc<dyn Translator> {
    let built: Result<Arc<dyn Translator>, TranslateError> = match config.provider {
        TranslatorProvider::Dummy => Ok(Arc::new(DummyTranslator::new(Duration::from_millis(
            config.dummy_delay_ms,
        )))),
        TranslatorProvider::Deepl => {
            DeeplTranslator::from_config(&config.deepl).map(|t| Arc::new(t) as Arc<dyn Translator>)
        }
        TranslatorProvider::Api => {
            ApiTranslator::from_config(&config.api).map(|t| Arc::new(t) as Arc<dyn Translator>)
        }
        TranslatorProvider::Local => {
            LocalTranslator::from_config(&config.local).map(|t| Arc::new(t) as Arc<dyn Translator>)
        }
        TranslatorProvider::Disabled => Err(TranslateError::ModelNotLoaded(
            "translation disabled in configuration".to_string(),
        )),
    };

    match built {
        Ok(translator) => {
            tracing::info!("Translator ready: {}", translator.metadata().name);
            translator
        }
        Err(e) => {
            tracing::warn!("Translator {:?} unavailable: {}", config.provider, e);
            Arc::new(DisabledTranslator::new(
                format!("{:?}", config.provider).to_lowercase(),
                e.detail(),
            ))
        }
    }
}
