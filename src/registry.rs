use serde_json::{Map, Value};

use crate::error::{Result, SubgenError};
use crate::schema::{ConfigSchema, ResolvedConfig};
use crate::transcribe::{self, TranscriptionBackend};
use crate::translate::{self, TranslationBackend};

/// What a registered model can do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    Transcription,
    Translation,
}

impl Capability {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Transcription => "transcription",
            Self::Translation => "translation",
        }
    }
}

type TranscriptionFactory =
    Box<dyn Fn(ResolvedConfig) -> Result<Box<dyn TranscriptionBackend>> + Send + Sync>;
type TranslationFactory = Box<dyn Fn() -> Result<Box<dyn TranslationBackend>> + Send + Sync>;

enum ModelFactory {
    Transcription(TranscriptionFactory),
    Translation(TranslationFactory),
}

/// A constructible model: identifier, configuration schema, and factory.
///
/// Construction is the point where the external backend is probed and
/// initialized; factory failures surface as `ModelInit` and abort the run.
pub struct ModelDescriptor {
    identifier: &'static str,
    description: &'static str,
    schema: ConfigSchema,
    factory: ModelFactory,
}

impl ModelDescriptor {
    pub fn transcription(
        identifier: &'static str,
        description: &'static str,
        schema: ConfigSchema,
        factory: impl Fn(ResolvedConfig) -> Result<Box<dyn TranscriptionBackend>>
        + Send
        + Sync
        + 'static,
    ) -> Self {
        Self {
            identifier,
            description,
            schema,
            factory: ModelFactory::Transcription(Box::new(factory)),
        }
    }

    pub fn translation(
        identifier: &'static str,
        description: &'static str,
        schema: ConfigSchema,
        factory: impl Fn() -> Result<Box<dyn TranslationBackend>> + Send + Sync + 'static,
    ) -> Self {
        Self {
            identifier,
            description,
            schema,
            factory: ModelFactory::Translation(Box::new(factory)),
        }
    }

    pub fn identifier(&self) -> &'static str {
        self.identifier
    }

    pub fn description(&self) -> &'static str {
        self.description
    }

    pub fn capability(&self) -> Capability {
        match self.factory {
            ModelFactory::Transcription(_) => Capability::Transcription,
            ModelFactory::Translation(_) => Capability::Translation,
        }
    }

    pub fn schema(&self) -> &ConfigSchema {
        &self.schema
    }
}

/// Maps model identifiers to constructible backends.
///
/// Identifiers are unique within a capability; listing follows declaration
/// order. The registry and the pipeline depend only on the two capability
/// traits, never on backend internals.
pub struct ModelRegistry {
    descriptors: Vec<ModelDescriptor>,
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self {
            descriptors: Vec::new(),
        }
    }

    /// The registry with every shipped model.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register(transcribe::whisper_cpp::descriptor());
        registry.register(transcribe::openai_whisper::descriptor());
        registry.register(translate::ollama::descriptor());
        registry
    }

    pub fn register(&mut self, descriptor: ModelDescriptor) {
        debug_assert!(
            !self
                .descriptors
                .iter()
                .any(|d| d.capability() == descriptor.capability()
                    && d.identifier == descriptor.identifier),
            "duplicate {} model '{}'",
            descriptor.capability().as_str(),
            descriptor.identifier
        );
        self.descriptors.push(descriptor);
    }

    /// Identifiers for one capability, in declaration order.
    pub fn available(&self, capability: Capability) -> Vec<&'static str> {
        self.descriptors(capability)
            .map(ModelDescriptor::identifier)
            .collect()
    }

    pub fn descriptors(
        &self,
        capability: Capability,
    ) -> impl Iterator<Item = &ModelDescriptor> {
        self.descriptors
            .iter()
            .filter(move |d| d.capability() == capability)
    }

    pub fn descriptor(
        &self,
        capability: Capability,
        identifier: &str,
    ) -> Result<&ModelDescriptor> {
        self.descriptors(capability)
            .find(|d| d.identifier == identifier)
            .ok_or_else(|| SubgenError::UnknownModel(identifier.to_string()))
    }

    /// Validate a raw user configuration without constructing anything.
    pub fn resolve_config(
        &self,
        capability: Capability,
        identifier: &str,
        raw: &Map<String, Value>,
    ) -> Result<ResolvedConfig> {
        self.descriptor(capability, identifier)?.schema.resolve_all(raw)
    }

    /// Resolve the configuration against the model's schema and construct the
    /// transcription backend.
    pub fn create_transcriber(
        &self,
        identifier: &str,
        raw: &Map<String, Value>,
    ) -> Result<Box<dyn TranscriptionBackend>> {
        let descriptor = self.descriptor(Capability::Transcription, identifier)?;
        let config = descriptor.schema.resolve_all(raw)?;
        match &descriptor.factory {
            ModelFactory::Transcription(build) => build(config),
            ModelFactory::Translation(_) => {
                Err(SubgenError::UnknownModel(identifier.to_string()))
            }
        }
    }

    /// Construct a translation backend. Translation models take no
    /// construction-time configuration; the resolved translation config is
    /// passed to each `translate` call instead.
    pub fn create_translator(&self, identifier: &str) -> Result<Box<dyn TranslationBackend>> {
        let descriptor = self.descriptor(Capability::Translation, identifier)?;
        match &descriptor.factory {
            ModelFactory::Translation(build) => build(),
            ModelFactory::Transcription(_) => {
                Err(SubgenError::UnknownModel(identifier.to_string()))
            }
        }
    }
}

impl Default for ModelRegistry {
    fn default() -> Self {
        Self::new()
    }
}
