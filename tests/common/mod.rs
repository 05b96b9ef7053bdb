// Shared test doubles: deterministic backends registered under the
// "scripted" identifier for both capabilities.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;

use subgen::error::Result;
use subgen::media::MediaReference;
use subgen::registry::{ModelDescriptor, ModelRegistry};
use subgen::schema::{ConfigSchema, ResolvedConfig, ValueKind};
use subgen::subtitle::{SubtitleDocument, SubtitleEvent};
use subgen::transcribe::TranscriptionBackend;
use subgen::translate::TranslationBackend;

/// Transcriber returning the same two-event document for any input.
pub struct ScriptedTranscriber;

#[async_trait]
impl TranscriptionBackend for ScriptedTranscriber {
    async fn transcribe(&self, _media: &MediaReference) -> Result<SubtitleDocument> {
        let mut document = SubtitleDocument::new();
        document.push(SubtitleEvent::new(0, 1_000, "first line"));
        document.push(SubtitleEvent::new(1_000, 2_000, "second line"));
        Ok(document)
    }
}

/// Translator prefixing each event with the target language tag.
pub struct TaggingTranslator;

#[async_trait]
impl TranslationBackend for TaggingTranslator {
    async fn translate(
        &self,
        document: SubtitleDocument,
        _source_language: Option<&str>,
        target_language: Option<&str>,
        _config: &ResolvedConfig,
    ) -> Result<SubtitleDocument> {
        let tag = target_language.unwrap_or("xx");
        let mut translated = SubtitleDocument::new();
        for event in document.events() {
            translated.push(SubtitleEvent::new(
                event.start_ms,
                event.end_ms,
                format!("[{}] {}", tag, event.text),
            ));
        }
        Ok(translated)
    }
}

/// Registry holding the scripted transcriber and a construction-counting
/// scripted translator. The returned counter observes translator
/// constructions, not translate calls.
pub fn scripted_registry() -> (ModelRegistry, Arc<AtomicUsize>) {
    let constructions = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&constructions);

    let mut registry = ModelRegistry::new();
    registry.register(ModelDescriptor::transcription(
        "scripted",
        "fixed transcript for tests",
        ConfigSchema::new().entry(
            "pace",
            ValueKind::Number,
            "events per second",
            None,
            json!(1),
        ),
        |_config| Ok(Box::new(ScriptedTranscriber) as Box<dyn TranscriptionBackend>),
    ));
    registry.register(ModelDescriptor::translation(
        "scripted",
        "tagging translator for tests",
        ConfigSchema::new().entry(
            "register",
            ValueKind::OneOf,
            "tone of the translation",
            Some(vec![json!("formal"), json!("casual")]),
            json!("formal"),
        ),
        move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(TaggingTranslator) as Box<dyn TranslationBackend>)
        },
    ));

    (registry, constructions)
}

/// Create an empty placeholder media file and return its path.
pub fn write_media(dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, b"not really media").expect("write media fixture");
    path
}
