// Pluggable translation backends.
//
// Translation models are constructed without configuration; the resolved
// translation config travels with every `translate` call instead. The
// pipeline defers construction to the first file that needs it and reuses
// the instance for the rest of the batch.

pub mod ollama;

use async_trait::async_trait;

use crate::error::Result;
use crate::schema::ResolvedConfig;
use crate::subtitle::SubtitleDocument;

/// Capability contract for translation backends.
#[async_trait]
pub trait TranslationBackend: Send + Sync {
    /// Translate a document, returning a new document with identical timing.
    async fn translate(
        &self,
        document: SubtitleDocument,
        source_language: Option<&str>,
        target_language: Option<&str>,
        config: &ResolvedConfig,
    ) -> Result<SubtitleDocument>;
}
