use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use flashtrans_types::{ChatPrompt, LanguageCode};

use crate::{
    ChatModel, ChatStream, FragmentStream, ProviderMetadata, TranslateError, Translation,
    Translator,
};

/// No-model backend: annotates input instead of translating it
///
/// Output is deterministic, so repeated requests yield identical text.
#[derive(Debug, Clone, Default)]
pub struct DummyTranslator {
    delay: Duration,
}

impl DummyTranslator {
    /// `delay` is slept before every translation and between chat fragments
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

#[async_trait]
impl Translator for DummyTranslator {
    async fn translate(
        &self,
        text: &str,
        from: Option<LanguageCode>,
        to: LanguageCode,
    ) -> Result<Translation, TranslateError> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        Ok(Translation {
            text: format!("[T]{}", text),
            from,
            to,
            provider: "dummy".to_string(),
            confidence: Some(1.0),
            alternatives: vec![],
        })
    }

    fn metadata(&self) -> ProviderMetadata {
        ProviderMetadata {
            name: "dummy".to_string(),
            requires_api_key: false,
            local: true,
        }
    }

    fn chat(&self) -> Option<&dyn ChatModel> {
        Some(self)
    }
}

#[async_trait]
impl ChatModel for DummyTranslator {
    async fn infer(&self, prompt: &ChatPrompt) -> Result<ChatStream, TranslateError> {
        let answer = format!("[Chat] {}", prompt.question.trim());
        Ok(Box::new(VecFragments::split_words(&answer, self.delay)))
    }
}

/// Fragment stream over a fixed list, optionally paced
pub struct VecFragments {
    fragments: VecDeque<String>,
    delay: Duration,
}

impl VecFragments {
    pub fn new(fragments: impl IntoIterator<Item = String>, delay: Duration) -> Self {
        Self {
            fragments: fragments.into_iter().collect(),
            delay,
        }
    }

    /// One fragment per word, keeping the separating space on the word it follows
    pub fn split_words(text: &str, delay: Duration) -> Self {
        let mut fragments = Vec::new();
        let mut current = String::new();
        for ch in text.chars() {
            current.push(ch);
            if ch == ' ' {
                fragments.push(std::mem::take(&mut current));
            }
        }
        if !current.is_empty() {
            fragments.push(current);
        }
        Self::new(fragments, delay)
    }
}

#[async_trait]
impl FragmentStream for VecFragments {
    async fn next_fragment(&mut self) -> Option<Result<String, TranslateError>> {
        let fragment = self.fragments.pop_front()?;
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        Some(Ok(fragment))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_dummy_translation_is_deterministic() {
        let translator = DummyTranslator::default();
        let a = translator.translate("hello", None, "zh".into()).await.unwrap();
        let b = translator.translate("hello", None, "zh".into()).await.unwrap();
        assert_eq!(a.text, "[T]hello");
        assert_eq!(a.text, b.text);
        assert_eq!(a.to, "zh");
    }

    #[tokio::test]
    async fn test_dummy_chat_streams_words() {
        let translator = DummyTranslator::default();
        let chat = translator.chat().unwrap();
        let mut stream = chat.infer(&ChatPrompt::new("hi there")).await.unwrap();

        let mut fragments = Vec::new();
        while let Some(fragment) = stream.next_fragment().await {
            fragments.push(fragment.unwrap());
        }
        assert_eq!(fragments, vec!["[Chat] ", "hi ", "there"]);
        assert_eq!(fragments.concat(), "[Chat] hi there");
    }

    #[tokio::test]
    async fn test_each_infer_restarts() {
        let translator = DummyTranslator::default();
        let chat = translator.chat().unwrap();
        let prompt = ChatPrompt::new("again");

        let mut first = chat.infer(&prompt).await.unwrap();
        assert!(first.next_fragment().await.is_some());

        let mut second = chat.infer(&prompt).await.unwrap();
        assert_eq!(second.next_fragment().await.unwrap().unwrap(), "[Chat] ");
    }
}
