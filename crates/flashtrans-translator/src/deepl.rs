use async_trait::async_trait;
use flashtrans_config::translator::DeeplConfig;
use flashtrans_types::LanguageCode;

use crate::{ProviderMetadata, TranslateError, Translation, Translator};

/// DeepL machine translation
#[derive(Clone)]
pub struct DeeplTranslator {
    client: reqwest::Client,
    api_key: String,
    api_url: String,
}

impl DeeplTranslator {
    pub fn new(api_key: String, api_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            api_url,
        }
    }

    pub fn from_config(config: &DeeplConfig) -> Result<Self, TranslateError> {
        if config.api_key.trim().is_empty() {
            return Err(TranslateError::ModelNotLoaded(
                "DeepL API key not configured".to_string(),
            ));
        }
        Ok(Self::new(config.api_key.clone(), config.api_url.clone()))
    }
}

/// DeepL expects upper-case codes and a script variant for Chinese
fn deepl_code(code: &str) -> String {
    match code.to_lowercase().as_str() {
        "zh" | "zh-cn" | "zh-hans" => "ZH".to_string(),
        "en" => "EN-US".to_string(),
        other => other.to_uppercase(),
    }
}

#[async_trait]
impl Translator for DeeplTranslator {
    async fn translate(
        &self,
        text: &str,
        from: Option<LanguageCode>,
        to: LanguageCode,
    ) -> Result<Translation, TranslateError> {
        let mut params = vec![
            ("text", text.to_string()),
            ("target_lang", deepl_code(&to)),
        ];
        if let Some(from) = &from {
            // Source codes take no regional variant
            params.push(("source_lang", from.to_uppercase()));
        }

        let response = self
            .client
            .post(&self.api_url)
            .header("Authorization", format!("DeepL-Auth-Key {}", self.api_key))
            .form(&params)
            .send()
            .await?;

        if response.status() == 429 {
            return Err(TranslateError::RateLimitExceeded);
        }

        if response.status() == 403 {
            return Err(TranslateError::AuthenticationError);
        }

        if !response.status().is_success() {
            return Err(TranslateError::ApiError(format!(
                "HTTP {}",
                response.status()
            )));
        }

        let json: serde_json::Value = response.json().await.map_err(|e| {
            TranslateError::ApiError(format!("Failed to parse response: {}", e))
        })?;

        let translation = json["translations"]
            .get(0)
            .ok_or_else(|| TranslateError::ApiError("No translation in response".to_string()))?;

        let translated_text = translation["text"]
            .as_str()
            .ok_or_else(|| TranslateError::ApiError("No translation in response".to_string()))?;

        let detected = translation["detected_source_language"]
            .as_str()
            .map(|code| code.to_lowercase());

        Ok(Translation {
            text: translated_text.to_string(),
            from: from.or(detected),
            to,
            provider: "deepl".to_string(),
            confidence: None,
            alternatives: vec![],
        })
    }

    fn metadata(&self) -> ProviderMetadata {
        ProviderMetadata {
            name: "deepl".to_string(),
            requires_api_key: true,
            local: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deepl_codes() {
        assert_eq!(deepl_code("zh"), "ZH");
        assert_eq!(deepl_code("en"), "EN-US");
        assert_eq!(deepl_code("ja"), "JA");
    }

    #[test]
    fn test_blank_key_is_rejected() {
        let config = DeeplConfig {
            api_key: "  ".into(),
            ..DeeplConfig::default()
        };
        assert!(matches!(
            DeeplTranslator::from_config(&config),
            Err(TranslateError::ModelNotLoaded(_))
        ));
    }
}
