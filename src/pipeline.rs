use std::path::PathBuf;

use indicatif::{ProgressBar, ProgressStyle};
use serde_json::{Map, Value};
use tokio::fs;
use tracing::{info, warn};

use crate::error::{Result, SubgenError};
use crate::media::MediaReference;
use crate::registry::{Capability, ModelRegistry};
use crate::schema::ResolvedConfig;
use crate::subtitle::SubtitleFormat;
use crate::transcribe::TranscriptionBackend;
use crate::translate::TranslationBackend;

/// Where exported subtitles go and in which format.
#[derive(Debug, Clone)]
pub struct OutputSpec {
    destination: Option<PathBuf>,
    format: SubtitleFormat,
}

impl OutputSpec {
    pub fn new(destination: Option<PathBuf>, format: SubtitleFormat) -> Self {
        Self {
            destination,
            format,
        }
    }

    /// `destination/stem.ext` when a destination folder was given,
    /// `media_parent/stem.ext` otherwise.
    pub fn output_path(&self, media: &MediaReference) -> PathBuf {
        let dir = self.destination.as_deref().unwrap_or_else(|| media.parent());
        dir.join(format!("{}.{}", media.stem(), self.format.extension()))
    }
}

/// The translation half of an invocation, as requested on the command line.
#[derive(Debug, Clone)]
pub struct TranslationRequest {
    pub model: String,
    pub config: Map<String, Value>,
    pub source_language: Option<String>,
    pub target_language: Option<String>,
}

/// Validated translation state. The backend slot starts empty and is filled
/// on the first file that needs it, then reused for the rest of the batch.
struct TranslationPlan {
    model: String,
    config: ResolvedConfig,
    source_language: Option<String>,
    target_language: Option<String>,
    backend: Option<Box<dyn TranslationBackend>>,
}

/// Per-run outcome counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub processed: usize,
    pub skipped: usize,
}

/// Drives one invocation: transcribe each resolved file, optionally
/// translate, and export, in resolution order, strictly sequentially.
///
/// A missing input file is the only locally recovered condition; every other
/// failure aborts the remaining batch.
pub struct Pipeline {
    registry: ModelRegistry,
    transcriber: Box<dyn TranscriptionBackend>,
    translation: Option<TranslationPlan>,
    output: OutputSpec,
}

impl Pipeline {
    /// Validate all configuration eagerly, then construct the transcription
    /// backend once. The translation backend is not constructed here even
    /// when requested; construction is deferred to first use.
    pub fn new(
        registry: ModelRegistry,
        model: &str,
        model_config: &Map<String, Value>,
        translation: Option<TranslationRequest>,
        output: OutputSpec,
    ) -> Result<Self> {
        // Reject a bad translation request before paying for transcription
        // backend construction.
        let translation = match translation {
            Some(request) => {
                let config = registry.resolve_config(
                    Capability::Translation,
                    &request.model,
                    &request.config,
                )?;
                Some(TranslationPlan {
                    model: request.model,
                    config,
                    source_language: request.source_language,
                    target_language: request.target_language,
                    backend: None,
                })
            }
            None => None,
        };

        info!("Initializing transcription model: {}", model);
        let transcriber = registry.create_transcriber(model, model_config)?;

        Ok(Self {
            registry,
            transcriber,
            translation,
            output,
        })
    }

    /// Process every file in order. Missing files are warned about and
    /// skipped; the run still counts as a success.
    pub async fn run(&mut self, files: &[MediaReference]) -> Result<BatchSummary> {
        let progress = batch_progress(files.len());
        let mut summary = BatchSummary::default();

        for media in files {
            info!("Processing file: {}", media.path().display());
            progress.set_message(media.stem().to_string());

            if !media.exists() {
                warn!("{} does not exist, skipping", media.path().display());
                summary.skipped += 1;
                progress.inc(1);
                continue;
            }

            let mut document = self.transcriber.transcribe(media).await?;

            if let Some(plan) = self.translation.as_mut() {
                if plan.backend.is_none() {
                    info!("Creating translation model: {}", plan.model);
                    plan.backend = Some(self.registry.create_translator(&plan.model)?);
                }
                if let Some(backend) = plan.backend.as_ref() {
                    info!(
                        "Translating from {} to {}",
                        plan.source_language.as_deref().unwrap_or("auto"),
                        plan.target_language.as_deref().unwrap_or("unset")
                    );
                    document = backend
                        .translate(
                            document,
                            plan.source_language.as_deref(),
                            plan.target_language.as_deref(),
                            &plan.config,
                        )
                        .await?;
                }
            }

            let output_path = self.output.output_path(media);
            if let Some(parent) = output_path.parent() {
                if !parent.exists() {
                    info!("Creating folder: {}", parent.display());
                    fs::create_dir_all(parent).await.map_err(|e| {
                        SubgenError::Export(format!("{}: {}", parent.display(), e))
                    })?;
                }
            }
            document.save(&output_path).await?;

            summary.processed += 1;
            progress.inc(1);
        }

        progress.finish_and_clear();
        Ok(summary)
    }
}

fn batch_progress(total: usize) -> ProgressBar {
    let progress = ProgressBar::new(total as u64);
    let style = ProgressStyle::with_template("[{bar:40}] {pos}/{len} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar());
    progress.set_style(style.progress_chars("█░"));
    progress
}
