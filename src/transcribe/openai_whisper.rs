use std::process::Command;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info};

use crate::error::{Result, SubgenError};
use crate::media::MediaReference;
use crate::registry::ModelDescriptor;
use crate::schema::{ConfigSchema, ResolvedConfig, ValueKind};
use crate::subtitle::{SubtitleDocument, SubtitleEvent};

use super::TranscriptionBackend;

pub const IDENTIFIER: &str = "openai-whisper";

const BINARY: &str = "whisper";

pub fn descriptor() -> ModelDescriptor {
    ModelDescriptor::transcription(
        IDENTIFIER,
        "OpenAI Whisper Python command-line transcription",
        config_schema(),
        |config| {
            OpenAiWhisperBackend::construct(config)
                .map(|backend| Box::new(backend) as Box<dyn TranscriptionBackend>)
        },
    )
}

fn config_schema() -> ConfigSchema {
    ConfigSchema::new()
        .entry(
            "model",
            ValueKind::OneOf,
            "Whisper model size",
            Some(vec![
                json!("tiny"),
                json!("base"),
                json!("small"),
                json!("medium"),
                json!("large"),
                json!("turbo"),
            ]),
            json!("base"),
        )
        .entry(
            "language",
            ValueKind::String,
            "Language spoken in the audio; auto-detected when unset",
            None,
            json!(null),
        )
        .entry(
            "task",
            ValueKind::OneOf,
            "Whether to transcribe in the source language or translate to English",
            Some(vec![json!("transcribe"), json!("translate")]),
            json!("transcribe"),
        )
        .entry(
            "temperature",
            ValueKind::Tuple,
            "Temperatures tried in order on decoding failure",
            None,
            json!([0.0, 0.2, 0.4, 0.6, 0.8, 1.0]),
        )
        .entry(
            "best_of",
            ValueKind::Number,
            "Number of candidates when sampling with non-zero temperature",
            None,
            json!(null),
        )
}

/// OpenAI Whisper JSON output format (`--output_format json`)
#[derive(Debug, Clone, Serialize, Deserialize)]
struct OpenAiWhisperOutput {
    text: String,
    segments: Vec<OpenAiWhisperSegment>,
    language: Option<String>,
}

/// Segment times are seconds from media start
#[derive(Debug, Clone, Serialize, Deserialize)]
struct OpenAiWhisperSegment {
    start: f64,
    end: f64,
    text: String,
}

/// Transcription via the OpenAI Whisper Python command-line tool.
///
/// The tool decodes media itself, so input files are handed over unconverted;
/// JSON output lands in a temp directory named after the input's stem.
pub struct OpenAiWhisperBackend {
    model: String,
    language: Option<String>,
    task: String,
    temperature: Vec<f64>,
    best_of: Option<u64>,
}

impl OpenAiWhisperBackend {
    pub fn construct(config: ResolvedConfig) -> Result<Self> {
        check_binary()?;
        Ok(Self {
            model: config.str_or("model", "base"),
            language: config.str_opt("language").map(str::to_string),
            task: config.str_or("task", "transcribe"),
            temperature: config.f64_tuple("temperature"),
            best_of: config.u64_opt("best_of"),
        })
    }
}

#[async_trait]
impl TranscriptionBackend for OpenAiWhisperBackend {
    async fn transcribe(&self, media: &MediaReference) -> Result<SubtitleDocument> {
        info!("Transcribing with OpenAI Whisper: {}", media.path().display());

        let temp_dir = tempfile::tempdir().map_err(|e| {
            SubgenError::Transcription(format!("failed to create temp directory: {}", e))
        })?;
        let output_dir = temp_dir.path();

        let mut cmd = Command::new(BINARY);
        cmd.arg(media.path())
            .arg("--model")
            .arg(&self.model)
            .arg("--task")
            .arg(&self.task)
            .arg("--output_dir")
            .arg(output_dir)
            .arg("--output_format")
            .arg("json")
            .arg("--verbose")
            .arg("False");
        if let Some(language) = &self.language {
            cmd.arg("--language").arg(language);
        }
        // The CLI takes a starting temperature plus a fallback increment
        // rather than the full schedule.
        if let Some(first) = self.temperature.first() {
            cmd.arg("--temperature").arg(first.to_string());
            if self.temperature.len() > 1 {
                let increment = self.temperature[1] - first;
                cmd.arg("--temperature_increment_on_fallback")
                    .arg(increment.to_string());
            }
        }
        if let Some(best_of) = self.best_of {
            cmd.arg("--best_of").arg(best_of.to_string());
        }

        let output = cmd.output().map_err(|e| {
            SubgenError::Transcription(format!("failed to execute whisper: {}", e))
        })?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(SubgenError::Transcription(format!(
                "whisper failed: {}",
                stderr
            )));
        }

        let json_file = output_dir.join(format!("{}.json", media.stem()));
        let content = std::fs::read_to_string(&json_file).map_err(|e| {
            SubgenError::Transcription(format!("failed to read whisper output: {}", e))
        })?;
        let parsed: OpenAiWhisperOutput = serde_json::from_str(&content).map_err(|e| {
            SubgenError::Transcription(format!("failed to parse whisper JSON: {}", e))
        })?;

        if let Some(language) = &parsed.language {
            debug!("Detected language: {}", language);
        }

        let mut document = SubtitleDocument::new();
        for segment in parsed.segments {
            let text = segment.text.trim();
            if text.is_empty() {
                continue;
            }
            document.push(SubtitleEvent::new(
                seconds_to_ms(segment.start),
                seconds_to_ms(segment.end),
                text,
            ));
        }
        Ok(document)
    }
}

fn seconds_to_ms(seconds: f64) -> u64 {
    (seconds.max(0.0) * 1000.0).round() as u64
}

fn check_binary() -> Result<()> {
    let output = Command::new(BINARY)
        .arg("--help")
        .output()
        .map_err(|e| SubgenError::ModelInit(format!("whisper command not found: {}", e)))?;

    if output.status.success() {
        debug!("OpenAI Whisper command-line tool is available");
        Ok(())
    } else {
        let stderr = String::from_utf8_lossy(&output.stderr);
        Err(SubgenError::ModelInit(format!(
            "OpenAI Whisper not usable: {}",
            stderr
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whisper_json_parses_seconds_into_segments() {
        let content = r#"{
            "text": "Hello there. General Kenobi.",
            "segments": [
                {"id": 0, "start": 0.0, "end": 1.234, "text": " Hello there."},
                {"id": 1, "start": 2.4, "end": 4.0, "text": " General Kenobi."}
            ],
            "language": "en"
        }"#;
        let parsed: OpenAiWhisperOutput = serde_json::from_str(content).unwrap();
        assert_eq!(parsed.segments.len(), 2);
        assert_eq!(seconds_to_ms(parsed.segments[0].end), 1234);
    }

    #[test]
    fn seconds_to_ms_rounds_and_clamps() {
        assert_eq!(seconds_to_ms(0.0004), 0);
        assert_eq!(seconds_to_ms(0.0006), 1);
        assert_eq!(seconds_to_ms(-1.0), 0);
    }

    #[test]
    fn schema_default_temperature_is_the_fallback_schedule() {
        let resolved = config_schema()
            .resolve_all(&serde_json::Map::new())
            .unwrap();
        assert_eq!(
            resolved.f64_tuple("temperature"),
            vec![0.0, 0.2, 0.4, 0.6, 0.8, 1.0]
        );
        assert_eq!(resolved.str_opt("task"), Some("transcribe"));
    }

    #[test]
    fn schema_rejects_unknown_task() {
        let mut user = serde_json::Map::new();
        user.insert("task".to_string(), json!("summarize"));
        assert!(config_schema().resolve_all(&user).is_err());
    }
}
