use std::path::{Path, PathBuf};
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

pub const IDENTIFIER: &str = "whisper-cpp";

const DEFAULT_BINARY: &str = "whisper-cli";
const DEFAULT_FFMPEG: &str = "ffmpeg";
const DEFAULT_MODEL_DIR: &str = ".subgen/models";

pub fn descriptor() -> ModelDescriptor {
    ModelDescriptor::transcription(
        IDENTIFIER,
        "whisper.cpp command-line transcription (whisper-cli + ffmpeg)",
        config_schema(),
        |config| {
            WhisperCppBackend::construct(config)
                .map(|backend| Box::new(backend) as Box<dyn TranscriptionBackend>)
        },
    )
}

fn config_schema() -> ConfigSchema {
    ConfigSchema::new()
        .entry(
            "binary_path",
            ValueKind::String,
            "Path to the whisper.cpp command-line binary",
            None,
            json!(DEFAULT_BINARY),
        )
        .entry(
            "ffmpeg_path",
            ValueKind::String,
            "Path to the ffmpeg binary used for audio extraction",
            None,
            json!(DEFAULT_FFMPEG),
        )
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
            ]),
            json!("base"),
        )
        .entry(
            "model_dir",
            ValueKind::String,
            "Directory containing ggml model files; defaults to .subgen/models",
            None,
            json!(null),
        )
        .entry(
            "language",
            ValueKind::String,
            "Source language hint; auto-detected when unset",
            None,
            json!(null),
        )
        .entry(
            "threads",
            ValueKind::Number,
            "Number of worker threads; whisper-cli's default when unset",
            None,
            json!(null),
        )
}

/// whisper.cpp JSON output format (`-oj`)
#[derive(Debug, Clone, Serialize, Deserialize)]
struct WhisperCppOutput {
    result: WhisperCppResult,
    transcription: Vec<WhisperCppSegment>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct WhisperCppResult {
    language: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct WhisperCppSegment {
    offsets: WhisperCppOffsets,
    text: String,
}

/// Segment offsets in milliseconds from media start
#[derive(Debug, Clone, Serialize, Deserialize)]
struct WhisperCppOffsets {
    from: i64,
    to: i64,
}

/// Transcription via the whisper.cpp command-line tool.
///
/// Media is first converted to mono 16 kHz WAV with ffmpeg; whisper-cli then
/// writes its JSON output into a temp directory that is discarded after
/// parsing.
pub struct WhisperCppBackend {
    binary: String,
    ffmpeg: String,
    model_path: PathBuf,
    language: Option<String>,
    threads: Option<u64>,
}

impl WhisperCppBackend {
    /// Construct from a resolved configuration, probing the binary and the
    /// model file so a broken install fails before any file is processed.
    pub fn construct(config: ResolvedConfig) -> Result<Self> {
        let binary = config.str_or("binary_path", DEFAULT_BINARY);
        let ffmpeg = config.str_or("ffmpeg_path", DEFAULT_FFMPEG);
        let model = config.str_or("model", "base");
        let model_dir = PathBuf::from(config.str_or("model_dir", DEFAULT_MODEL_DIR));
        let model_path = model_dir.join(format!("ggml-{}.bin", model));

        check_binary(&binary)?;
        if !model_path.exists() {
            return Err(SubgenError::ModelInit(format!(
                "model file not found: {}",
                model_path.display()
            )));
        }

        Ok(Self {
            binary,
            ffmpeg,
            model_path,
            language: config.str_opt("language").map(str::to_string),
            threads: config.u64_opt("threads"),
        })
    }

    /// Convert the input to the mono 16 kHz WAV whisper.cpp expects.
    fn extract_audio(&self, media_path: &Path, work_dir: &Path) -> Result<PathBuf> {
        let audio_path = work_dir.join("audio.wav");
        debug!("Extracting audio to: {}", audio_path.display());

        let output = Command::new(&self.ffmpeg)
            .args(&[
                "-i",
                &media_path.to_string_lossy(),
                "-vn",
                "-acodec",
                "pcm_s16le",
                "-ar",
                "16000",
                "-ac",
                "1",
                "-y",
                &audio_path.to_string_lossy(),
            ])
            .output()
            .map_err(|e| SubgenError::Transcription(format!("failed to execute ffmpeg: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(SubgenError::Transcription(format!(
                "audio extraction failed: {}",
                stderr
            )));
        }

        Ok(audio_path)
    }
}

#[async_trait]
impl TranscriptionBackend for WhisperCppBackend {
    async fn transcribe(&self, media: &MediaReference) -> Result<SubtitleDocument> {
        info!("Transcribing with whisper.cpp: {}", media.path().display());

        let temp_dir = tempfile::tempdir().map_err(|e| {
            SubgenError::Transcription(format!("failed to create temp directory: {}", e))
        })?;
        let audio_path = self.extract_audio(media.path(), temp_dir.path())?;
        let output_prefix = temp_dir.path().join("transcription");

        let mut cmd = Command::new(&self.binary);
        cmd.arg("-m")
            .arg(&self.model_path)
            .arg("-f")
            .arg(&audio_path)
            .arg("-oj")
            .arg("-of")
            .arg(&output_prefix)
            .arg("-np");
        if let Some(language) = &self.language {
            cmd.arg("-l").arg(language);
        }
        if let Some(threads) = self.threads {
            cmd.arg("-t").arg(threads.to_string());
        }

        let output = cmd.output().map_err(|e| {
            SubgenError::Transcription(format!("failed to execute {}: {}", self.binary, e))
        })?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(SubgenError::Transcription(format!(
                "whisper-cli failed: {}",
                stderr
            )));
        }

        let json_file = output_prefix.with_extension("json");
        let content = std::fs::read_to_string(&json_file).map_err(|e| {
            SubgenError::Transcription(format!("failed to read whisper output: {}", e))
        })?;
        let parsed: WhisperCppOutput = serde_json::from_str(&content).map_err(|e| {
            SubgenError::Transcription(format!("failed to parse whisper JSON: {}", e))
        })?;

        debug!("Detected language: {}", parsed.result.language);

        let mut document = SubtitleDocument::new();
        for segment in parsed.transcription {
            let text = segment.text.trim();
            if text.is_empty() {
                continue;
            }
            document.push(SubtitleEvent::new(
                segment.offsets.from.max(0) as u64,
                segment.offsets.to.max(0) as u64,
                text,
            ));
        }
        Ok(document)
    }
}

fn check_binary(binary: &str) -> Result<()> {
    let output = Command::new(binary)
        .arg("--help")
        .output()
        .map_err(|e| SubgenError::ModelInit(format!("{} not found: {}", binary, e)))?;

    if output.status.success() {
        debug!("{} is available", binary);
        Ok(())
    } else {
        let stderr = String::from_utf8_lossy(&output.stderr);
        Err(SubgenError::ModelInit(format!(
            "{} is not usable: {}",
            binary, stderr
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whisper_cpp_json_parses_into_millisecond_offsets() {
        let content = r#"{
            "result": {"language": "en"},
            "transcription": [
                {"offsets": {"from": 0, "to": 1200}, "text": " Hello there."},
                {"offsets": {"from": 2400, "to": 4000}, "text": " General Kenobi."}
            ]
        }"#;
        let parsed: WhisperCppOutput = serde_json::from_str(content).unwrap();
        assert_eq!(parsed.result.language, "en");
        assert_eq!(parsed.transcription.len(), 2);
        assert_eq!(parsed.transcription[0].offsets.to, 1200);
    }

    #[test]
    fn schema_defaults_cover_every_option() {
        let resolved = config_schema()
            .resolve_all(&serde_json::Map::new())
            .unwrap();
        assert_eq!(resolved.str_opt("binary_path"), Some(DEFAULT_BINARY));
        assert_eq!(resolved.str_opt("model"), Some("base"));
        assert_eq!(resolved.get("model_dir"), Some(&serde_json::Value::Null));
        assert_eq!(resolved.u64_opt("threads"), None);
    }

    #[test]
    fn schema_rejects_unknown_model_size() {
        let mut user = serde_json::Map::new();
        user.insert("model".to_string(), json!("enormous"));
        assert!(config_schema().resolve_all(&user).is_err());
    }
}
