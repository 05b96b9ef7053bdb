use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info};

use crate::error::{Result, SubgenError};
use crate::registry::ModelDescriptor;
use crate::schema::{ConfigSchema, ResolvedConfig, ValueKind};
use crate::subtitle::{SubtitleDocument, SubtitleEvent};

use super::TranslationBackend;

pub const IDENTIFIER: &str = "ollama";

const DEFAULT_ENDPOINT: &str = "http://localhost:11434";
const DEFAULT_MODEL: &str = "llama3.2:3b";

pub fn descriptor() -> ModelDescriptor {
    ModelDescriptor::translation(
        IDENTIFIER,
        "LLM subtitle translation through a local Ollama server",
        config_schema(),
        || {
            OllamaTranslator::construct()
                .map(|backend| Box::new(backend) as Box<dyn TranslationBackend>)
        },
    )
}

fn config_schema() -> ConfigSchema {
    ConfigSchema::new()
        .entry(
            "endpoint",
            ValueKind::String,
            "Ollama endpoint URL",
            None,
            json!(DEFAULT_ENDPOINT),
        )
        .entry(
            "model",
            ValueKind::String,
            "LLM model to use for translation",
            None,
            json!(DEFAULT_MODEL),
        )
        .entry(
            "temperature",
            ValueKind::Number,
            "Sampling temperature for the LLM",
            None,
            json!(0.3),
        )
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct TranslationRequest {
    model: String,
    prompt: String,
    stream: bool,
    format: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<RequestOptions>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RequestOptions {
    temperature: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct TranslationResponse {
    response: String,
    done: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct TranslationResult {
    text: String,
}

/// Subtitle translation through Ollama's generate API, one event per request.
pub struct OllamaTranslator {
    client: Client,
}

impl OllamaTranslator {
    pub fn construct() -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(300))
            .build()
            .map_err(|e| SubgenError::ModelInit(format!("HTTP client creation failed: {}", e)))?;
        Ok(Self { client })
    }

    async fn translate_text(
        &self,
        endpoint: &str,
        model: &str,
        temperature: Option<f64>,
        text: &str,
        source_language: Option<&str>,
        target_language: &str,
    ) -> Result<String> {
        let request = TranslationRequest {
            model: model.to_string(),
            prompt: build_prompt(text, source_language, target_language),
            stream: false,
            format: "json".to_string(),
            options: temperature.map(|temperature| RequestOptions { temperature }),
        };

        let url = format!("{}/api/generate", endpoint);
        debug!("Sending translation request to: {}", url);

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| SubgenError::Translation(format!("HTTP request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(SubgenError::Translation(format!(
                "Ollama API error {}: {}",
                status, error_text
            )));
        }

        let translation_response: TranslationResponse = response
            .json()
            .await
            .map_err(|e| SubgenError::Translation(format!("failed to parse response: {}", e)))?;

        let raw = translation_response.response.trim().to_string();
        if raw.is_empty() {
            return Err(SubgenError::Translation(
                "empty translation received".to_string(),
            ));
        }

        if let Ok(result) = serde_json::from_str::<TranslationResult>(&raw) {
            return Ok(result.text.trim().to_string());
        }

        // Model ignored the JSON format instruction; salvage the raw reply
        Ok(clean_response(&raw))
    }
}

#[async_trait]
impl TranslationBackend for OllamaTranslator {
    async fn translate(
        &self,
        document: SubtitleDocument,
        source_language: Option<&str>,
        target_language: Option<&str>,
        config: &ResolvedConfig,
    ) -> Result<SubtitleDocument> {
        let target_language = target_language.ok_or_else(|| {
            SubgenError::Translation("target language is required".to_string())
        })?;

        let endpoint = config.str_or("endpoint", DEFAULT_ENDPOINT);
        let model = config.str_or("model", DEFAULT_MODEL);
        let temperature = config.f64_opt("temperature");

        info!(
            "Translating {} event(s) to {} using {}",
            document.len(),
            target_language,
            model
        );

        let total = document.len();
        let mut translated = SubtitleDocument::new();
        for (index, event) in document.events().iter().enumerate() {
            debug!("Translating event {}/{}: {}", index + 1, total, event.text);
            let text = self
                .translate_text(
                    &endpoint,
                    &model,
                    temperature,
                    &event.text,
                    source_language,
                    target_language,
                )
                .await?;
            translated.push(SubtitleEvent::new(event.start_ms, event.end_ms, text));
        }
        Ok(translated)
    }
}

fn build_prompt(text: &str, source_language: Option<&str>, target_language: &str) -> String {
    let source_clause = source_language
        .map(|language| format!(" from {}", language))
        .unwrap_or_default();
    format!(
        "You are a professional subtitle translator.\n\
         \n\
         Translate the following subtitle text{} to {}. Keep the meaning and\n\
         tone, and keep it short enough to read as a subtitle.\n\
         \n\
         Return the result in JSON format as {{\"text\":\"translation\"}}.\n\
         \n\
         [Text]\n\
         {}",
        source_clause, target_language, text
    )
}

/// Strip the quoting models tend to wrap around a bare reply.
fn clean_response(raw: &str) -> String {
    let trimmed = raw.trim();
    let trimmed = trimmed
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(trimmed);
    trimmed.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_names_both_languages_when_source_is_known() {
        let prompt = build_prompt("Hei maailma", Some("fi"), "en");
        assert!(prompt.contains("from fi"));
        assert!(prompt.contains("to en"));
        assert!(prompt.contains("Hei maailma"));
    }

    #[test]
    fn prompt_omits_source_clause_when_unknown() {
        let prompt = build_prompt("Hola", None, "en");
        assert!(!prompt.contains("from"));
        assert!(prompt.contains("to en"));
    }

    #[test]
    fn clean_response_strips_wrapping_quotes() {
        assert_eq!(clean_response("\"Hello\""), "Hello");
        assert_eq!(clean_response("  Hello  "), "Hello");
        assert_eq!(clean_response("\"Hello"), "\"Hello");
    }

    #[test]
    fn schema_defaults_point_at_local_ollama() {
        let resolved = config_schema()
            .resolve_all(&serde_json::Map::new())
            .unwrap();
        assert_eq!(resolved.str_opt("endpoint"), Some(DEFAULT_ENDPOINT));
        assert_eq!(resolved.str_opt("model"), Some(DEFAULT_MODEL));
        assert_eq!(resolved.f64_opt("temperature"), Some(0.3));
    }
}
