use std::path::Path;

use tokio::fs;
use tracing::info;

use crate::error::{Result, SubgenError};

/// Subtitle output formats supported by the exporter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubtitleFormat {
    Srt,
    Vtt,
}

impl SubtitleFormat {
    pub fn all() -> &'static [SubtitleFormat] {
        &[SubtitleFormat::Srt, SubtitleFormat::Vtt]
    }

    /// Resolve a format identifier or file extension (case-insensitive).
    pub fn from_identifier(identifier: &str) -> Result<Self> {
        match identifier.to_lowercase().as_str() {
            "srt" => Ok(Self::Srt),
            "vtt" => Ok(Self::Vtt),
            other => Err(SubgenError::UnsupportedFormat(other.to_string())),
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Srt => "srt",
            Self::Vtt => "vtt",
        }
    }
}

/// A single timed text event.
///
/// Times are millisecond offsets from media start, `start_ms <= end_ms`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubtitleEvent {
    pub start_ms: u64,
    pub end_ms: u64,
    pub text: String,
}

impl SubtitleEvent {
    pub fn new(start_ms: u64, end_ms: u64, text: impl Into<String>) -> Self {
        Self {
            start_ms,
            end_ms,
            text: text.into(),
        }
    }
}

/// Ordered sequence of timed text events.
///
/// The exchange representation between transcription, translation, and
/// export. Insertion order is temporal order by construction; it is not
/// re-validated here.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubtitleDocument {
    events: Vec<SubtitleEvent>,
}

impl SubtitleDocument {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    pub fn push(&mut self, event: SubtitleEvent) {
        self.events.push(event);
    }

    pub fn events(&self) -> &[SubtitleEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Serialize in the given format. Deterministic: the same document and
    /// format always produce identical bytes.
    pub fn render(&self, format: SubtitleFormat) -> String {
        match format {
            SubtitleFormat::Srt => self.render_srt(),
            SubtitleFormat::Vtt => self.render_vtt(),
        }
    }

    fn render_srt(&self) -> String {
        let mut out = String::new();
        for (index, event) in self.events.iter().enumerate() {
            out.push_str(&format!(
                "{}\n{} --> {}\n{}\n\n",
                index + 1,
                format_srt_time(event.start_ms),
                format_srt_time(event.end_ms),
                event.text.trim()
            ));
        }
        out
    }

    fn render_vtt(&self) -> String {
        // WebVTT files begin with a mandatory header line followed by a blank line
        let mut out = String::from("WEBVTT\n\n");
        for event in &self.events {
            out.push_str(&format!(
                "{} --> {}\n{}\n\n",
                format_vtt_time(event.start_ms),
                format_vtt_time(event.end_ms),
                event.text.trim()
            ));
        }
        out
    }

    /// Write the document to `path`, selecting the serializer from the path's
    /// extension.
    pub async fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let format = path
            .extension()
            .and_then(|ext| ext.to_str())
            .ok_or_else(|| {
                SubgenError::UnsupportedFormat(format!(
                    "output path has no extension: {}",
                    path.display()
                ))
            })
            .and_then(SubtitleFormat::from_identifier)?;

        info!("Saving subtitle file: {}", path.display());
        fs::write(path, self.render(format))
            .await
            .map_err(|e| SubgenError::Export(format!("{}: {}", path.display(), e)))?;
        Ok(())
    }
}

/// Format a millisecond offset to SRT time format (HH:MM:SS,mmm)
fn format_srt_time(ms: u64) -> String {
    let hours = ms / 3_600_000;
    let minutes = (ms % 3_600_000) / 60_000;
    let secs = (ms % 60_000) / 1_000;
    let millis = ms % 1_000;

    format!("{:02}:{:02}:{:02},{:03}", hours, minutes, secs, millis)
}

/// Format a millisecond offset to WebVTT time format (HH:MM:SS.mmm)
fn format_vtt_time(ms: u64) -> String {
    let hours = ms / 3_600_000;
    let minutes = (ms % 3_600_000) / 60_000;
    let secs = (ms % 60_000) / 1_000;
    let millis = ms % 1_000;

    format!("{:02}:{:02}:{:02}.{:03}", hours, minutes, secs, millis)
}
