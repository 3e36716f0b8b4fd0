use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use flashtrans_config::translator::LlmApiConfig;
use flashtrans_types::{ChatPrompt, LanguageCode};
use serde_json::json;

use crate::prompt::{Message, chat_messages, strip_think, translation_messages};
use crate::{
    ChatModel, ChatStream, FragmentStream, ProviderMetadata, TranslateError, Translation,
    Translator,
};

/// Resolve the chat completions endpoint from a base URL
///
/// Accepts a bare host, a `/v1` root, or the full endpoint.
pub fn build_chat_url(base_url: &str) -> Result<String, TranslateError> {
    let base = base_url.trim().trim_end_matches('/');
    if base.is_empty() {
        return Err(TranslateError::ModelNotLoaded(
            "Missing API base URL".to_string(),
        ));
    }

    if base.ends_with("/chat/completions") {
        Ok(base.to_string())
    } else if base.ends_with("/v1") {
        Ok(format!("{}/chat/completions", base))
    } else {
        Ok(format!("{}/v1/chat/completions", base))
    }
}

/// Client for an OpenAI-compatible `/v1/chat/completions` endpoint
#[derive(Clone)]
pub struct ChatCompletionsClient {
    client: reqwest::Client,
    url: String,
    api_key: String,
    model: String,
}

impl ChatCompletionsClient {
    pub fn new(
        base_url: &str,
        api_key: &str,
        model: &str,
        timeout: Duration,
    ) -> Result<Self, TranslateError> {
        let url = build_chat_url(base_url)?;
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        let model = match model.trim() {
            "" => "default".to_string(),
            model => model.to_string(),
        };

        Ok(Self {
            client,
            url,
            api_key: api_key.trim().to_string(),
            model,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn post(
        &self,
        messages: &[Message],
        temperature: f32,
        stream: bool,
    ) -> Result<reqwest::Response, TranslateError> {
        let body = json!({
            "model": self.model,
            "messages": messages,
            "temperature": temperature,
            "stream": stream,
        });

        let mut request = self.client.post(&self.url).json(&body);
        if !self.api_key.is_empty() {
            request = request.bearer_auth(&self.api_key);
        }

        let response = request.send().await?;
        let status = response.status();

        if status == 429 {
            return Err(TranslateError::RateLimitExceeded);
        }
        if status == 401 || status == 403 {
            return Err(TranslateError::AuthenticationError);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TranslateError::ApiError(format!(
                "HTTP {}: {}",
                status.as_u16(),
                body.trim()
            )));
        }

        Ok(response)
    }

    /// Single non-streaming completion
    pub(crate) async fn complete(
        &self,
        messages: &[Message],
        temperature: f32,
    ) -> Result<String, TranslateError> {
        let response = self.post(messages, temperature, false).await?;

        let json: serde_json::Value = response.json().await.map_err(|e| {
            TranslateError::ApiError(format!("Invalid response JSON: {}", e))
        })?;

        json["choices"]
            .get(0)
            .and_then(|choice| choice["message"]["content"].as_str())
            .map(|content| content.trim().to_string())
            .ok_or_else(|| {
                TranslateError::ApiError("Missing choices/message/content in response".to_string())
            })
    }

    /// Streaming completion delivered as server-sent events
    pub(crate) async fn stream(
        &self,
        messages: &[Message],
        temperature: f32,
    ) -> Result<ChatStream, TranslateError> {
        let response = self.post(messages, temperature, true).await?;
        Ok(Box::new(SseFragments {
            response,
            decoder: SseDecoder::default(),
            pending: VecDeque::new(),
            done: false,
        }))
    }
}

/// One decoded `data:` line of a completion stream
#[derive(Debug, Clone, PartialEq)]
pub enum SseEvent {
    Fragment(String),
    Done,
}

/// Incremental decoder for `text/event-stream` bodies
///
/// Chunks may split lines anywhere, including inside a UTF-8 sequence.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
}

impl SseDecoder {
    pub fn feed(&mut self, chunk: &[u8]) -> Result<Vec<SseEvent>, TranslateError> {
        self.buffer.extend_from_slice(chunk);

        let mut events = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&line);
            if let Some(event) = parse_sse_line(line.trim_end_matches(['\r', '\n']))? {
                events.push(event);
            }
        }
        Ok(events)
    }

    /// Flush a final line that had no trailing newline
    pub fn finish(&mut self) -> Result<Vec<SseEvent>, TranslateError> {
        if self.buffer.is_empty() {
            return Ok(Vec::new());
        }
        self.feed(b"\n")
    }
}

fn parse_sse_line(line: &str) -> Result<Option<SseEvent>, TranslateError> {
    let Some(data) = line.strip_prefix("data:") else {
        // Comments, event names and blank separators
        return Ok(None);
    };
    let data = data.trim();

    if data.is_empty() {
        return Ok(None);
    }
    if data == "[DONE]" {
        return Ok(Some(SseEvent::Done));
    }

    let json: serde_json::Value = serde_json::from_str(data)
        .map_err(|e| TranslateError::ApiError(format!("Invalid stream chunk: {}", e)))?;

    if let Some(message) = json["error"]["message"].as_str() {
        return Err(TranslateError::ApiError(message.to_string()));
    }

    match json["choices"]
        .get(0)
        .and_then(|choice| choice["delta"]["content"].as_str())
    {
        Some(content) if !content.is_empty() => Ok(Some(SseEvent::Fragment(content.to_string()))),
        _ => Ok(None),
    }
}

struct SseFragments {
    response: reqwest::Response,
    decoder: SseDecoder,
    pending: VecDeque<String>,
    done: bool,
}

impl SseFragments {
    fn absorb(&mut self, events: Vec<SseEvent>) {
        for event in events {
            match event {
                SseEvent::Fragment(text) => self.pending.push_back(text),
                SseEvent::Done => self.done = true,
            }
        }
    }
}

#[async_trait]
impl FragmentStream for SseFragments {
    async fn next_fragment(&mut self) -> Option<Result<String, TranslateError>> {
        loop {
            if let Some(fragment) = self.pending.pop_front() {
                return Some(Ok(fragment));
            }
            if self.done {
                return None;
            }

            match self.response.chunk().await {
                Ok(Some(bytes)) => match self.decoder.feed(&bytes) {
                    Ok(events) => self.absorb(events),
                    Err(e) => {
                        self.done = true;
                        return Some(Err(e));
                    }
                },
                Ok(None) => {
                    let tail = self.decoder.finish();
                    self.done = true;
                    match tail {
                        Ok(events) => self.absorb(events),
                        Err(e) => return Some(Err(e)),
                    }
                }
                Err(e) => {
                    self.done = true;
                    return Some(Err(e.into()));
                }
            }
        }
    }
}

/// Translator backed by an OpenAI-compatible chat completions API
pub struct ApiTranslator {
    name: String,
    local: bool,
    client: ChatCompletionsClient,
    translate_temperature: f32,
    chat_temperature: f32,
}

impl ApiTranslator {
    pub fn new(
        name: impl Into<String>,
        client: ChatCompletionsClient,
        translate_temperature: f32,
        chat_temperature: f32,
    ) -> Self {
        Self {
            name: name.into(),
            local: false,
            client,
            translate_temperature,
            chat_temperature,
        }
    }

    pub fn from_config(config: &LlmApiConfig) -> Result<Self, TranslateError> {
        if config.base_url.trim().is_empty() {
            return Err(TranslateError::ModelNotLoaded(
                "LLM API not configured".to_string(),
            ));
        }

        let client = ChatCompletionsClient::new(
            &config.base_url,
            &config.api_key,
            &config.model,
            Duration::from_secs(config.timeout_secs),
        )?;

        Ok(Self::new(
            "api",
            client,
            config.translate_temperature,
            config.chat_temperature,
        ))
    }

    /// Mark the endpoint as served from this machine
    pub(crate) fn local(mut self) -> Self {
        self.local = true;
        self
    }
}

#[async_trait]
impl Translator for ApiTranslator {
    async fn translate(
        &self,
        text: &str,
        from: Option<LanguageCode>,
        to: LanguageCode,
    ) -> Result<Translation, TranslateError> {
        tracing::debug!(">>> [LLM] translate {} chars to {} via {}", text.len(), to, self.client.url());

        let messages = translation_messages(text, &to);
        let raw = self
            .client
            .complete(&messages, self.translate_temperature)
            .await?;

        Ok(Translation {
            text: strip_think(&raw),
            from,
            to,
            provider: self.name.clone(),
            confidence: None,
            alternatives: vec![],
        })
    }

    fn metadata(&self) -> ProviderMetadata {
        ProviderMetadata {
            name: self.name.clone(),
            requires_api_key: !self.local,
            local: self.local,
        }
    }

    fn chat(&self) -> Option<&dyn ChatModel> {
        Some(self)
    }
}

#[async_trait]
impl ChatModel for ApiTranslator {
    async fn infer(&self, prompt: &ChatPrompt) -> Result<ChatStream, TranslateError> {
        let messages = chat_messages(prompt);
        tracing::debug!(">>> [LLM] chat with {} messages via {}", messages.len(), self.client.url());
        self.client.stream(&messages, self.chat_temperature).await
    }
}
