// Pluggable transcription backends.
//
// Every backend is an external collaborator (a command-line tool today)
// consumed through the single-method `TranscriptionBackend` trait. New
// backends plug in by registering a `ModelDescriptor` in the model registry;
// the pipeline never learns backend internals.

pub mod openai_whisper;
pub mod whisper_cpp;

use async_trait::async_trait;

use crate::error::Result;
use crate::media::MediaReference;
use crate::subtitle::SubtitleDocument;

/// Capability contract for transcription backends.
#[async_trait]
pub trait TranscriptionBackend: Send + Sync {
    /// Transcribe one media file into a subtitle document.
    async fn transcribe(&self, media: &MediaReference) -> Result<SubtitleDocument>;
}
