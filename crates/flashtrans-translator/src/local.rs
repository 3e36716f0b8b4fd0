use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use flashtrans_config::translator::LocalModelConfig;
use flashtrans_types::{ChatPrompt, LanguageCode};

use crate::openai::{ApiTranslator, ChatCompletionsClient};
use crate::{ChatModel, ChatStream, ProviderMetadata, TranslateError, Translation, Translator};

const TRANSLATE_TEMPERATURE: f32 = 0.1;
const CHAT_TEMPERATURE: f32 = 0.3;

/// Local generative model (GGUF) served by a runtime on this machine
///
/// The model file must exist at construction; requests go to the runtime's
/// OpenAI-compatible endpoint.
pub struct LocalTranslator {
    model_path: PathBuf,
    inner: ApiTranslator,
}

impl LocalTranslator {
    pub fn from_config(config: &LocalModelConfig) -> Result<Self, TranslateError> {
        let model_path = PathBuf::from(&config.model_path);
        if !model_path.is_file() {
            return Err(TranslateError::ModelNotLoaded(format!(
                "Missing local model file: {}",
                file_name(&model_path)
            )));
        }

        let model = model_path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default();
        let client = ChatCompletionsClient::new(
            &config.base_url,
            "",
            &model,
            Duration::from_secs(config.timeout_secs),
        )?;

        tracing::info!("Local model found at {}", model_path.display());

        Ok(Self {
            model_path,
            inner: ApiTranslator::new("local", client, TRANSLATE_TEMPERATURE, CHAT_TEMPERATURE)
                .local(),
        })
    }

    pub fn model_path(&self) -> &Path {
        &self.model_path
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[async_trait]
impl Translator for LocalTranslator {
    async fn translate(
        &self,
        text: &str,
        from: Option<LanguageCode>,
        to: LanguageCode,
    ) -> Result<Translation, TranslateError> {
        self.inner.translate(text, from, to).await
    }

    fn metadata(&self) -> ProviderMetadata {
        self.inner.metadata()
    }

    fn chat(&self) -> Option<&dyn ChatModel> {
        Some(self)
    }
}

#[async_trait]
impl ChatModel for LocalTranslator {
    async fn infer(&self, prompt: &ChatPrompt) -> Result<ChatStream, TranslateError> {
        self.inner.infer(prompt).await
    }
}
