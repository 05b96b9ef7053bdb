//! Subgen - Subtitle Generation Pipeline
//!
//! This is the main entry point for the subgen application: it resolves the
//! batch input, selects and configures the requested models through the
//! registry, and runs the transcription / translation / export pipeline.

use anyhow::Result;
use clap::Parser;
use tracing::{info, Level};
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use subgen::cli::{parse_configs_arg, Args};
use subgen::media::resolve_inputs;
use subgen::pipeline::{OutputSpec, Pipeline, TranslationRequest};
use subgen::registry::{Capability, ModelRegistry};
use subgen::subtitle::SubtitleFormat;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    setup_logging(args.verbose)?;

    let registry = ModelRegistry::builtin();

    if args.list_models {
        print_models(&registry);
        return Ok(());
    }
    if let Some(identifier) = &args.describe_model {
        return describe_model(&registry, identifier);
    }

    let format = SubtitleFormat::from_identifier(&args.format)?;
    let files = resolve_inputs(&args.media)?;

    let model = match args.model.clone() {
        Some(model) => model,
        None => registry
            .available(Capability::Transcription)
            .first()
            .map(|identifier| identifier.to_string())
            .ok_or_else(|| anyhow::anyhow!("no transcription models registered"))?,
    };
    let model_configs = parse_configs_arg(&args.model_configs)?;

    info!("Model name: {}", model);
    if model_configs.is_empty() {
        info!("Model configs: defaults");
    } else {
        info!("Model configs: {}", serde_json::to_string(&model_configs)?);
    }

    let translation = match &args.translation_model {
        Some(translation_model) => Some(TranslationRequest {
            model: translation_model.clone(),
            config: parse_configs_arg(&args.translation_configs)?,
            source_language: args.translation_source_lang.clone(),
            target_language: args.translation_target_lang.clone(),
        }),
        None => None,
    };

    let output = OutputSpec::new(args.destination_folder.clone(), format);

    let mut pipeline = Pipeline::new(registry, &model, &model_configs, translation, output)?;
    let summary = pipeline.run(&files).await?;

    info!(
        "Done: {} file(s) exported, {} skipped",
        summary.processed, summary.skipped
    );
    Ok(())
}

/// Setup logging to both console and file
fn setup_logging(verbose: bool) -> Result<()> {
    let log_dir = std::env::current_dir()?.join(".subgen").join("log");
    std::fs::create_dir_all(&log_dir)?;

    // Daily rotation; the guard must outlive the program
    let file_appender = rolling::daily(&log_dir, "subgen.log");
    let (non_blocking_file, guard) = non_blocking(file_appender);
    std::mem::forget(guard);

    let log_level = if verbose { Level::DEBUG } else { Level::INFO };

    let console_layer = fmt::layer().with_target(false);
    let file_layer = fmt::layer()
        .with_writer(non_blocking_file)
        .with_target(false)
        .with_ansi(false);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(log_level.into()))
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    Ok(())
}

fn print_models(registry: &ModelRegistry) {
    println!("\nTranscription models:");
    println!("{:<18} {}", "Name", "Description");
    println!("{}", "-".repeat(70));
    for descriptor in registry.descriptors(Capability::Transcription) {
        println!("{:<18} {}", descriptor.identifier(), descriptor.description());
    }

    println!("\nTranslation models:");
    println!("{:<18} {}", "Name", "Description");
    println!("{}", "-".repeat(70));
    for descriptor in registry.descriptors(Capability::Translation) {
        println!("{:<18} {}", descriptor.identifier(), descriptor.description());
    }

    let formats = SubtitleFormat::all()
        .iter()
        .map(|format| format.extension())
        .collect::<Vec<_>>()
        .join(", ");
    println!("\nSubtitle formats: {}", formats);
}

fn describe_model(registry: &ModelRegistry, identifier: &str) -> Result<()> {
    let mut found = false;
    for capability in [Capability::Transcription, Capability::Translation] {
        let Ok(descriptor) = registry.descriptor(capability, identifier) else {
            continue;
        };
        found = true;

        println!("\n{} ({})", descriptor.identifier(), capability.as_str());
        println!("{}", descriptor.description());
        println!(
            "\n{:<14} {:<18} {:<14} {}",
            "Option", "Kind", "Default", "Allowed values"
        );
        println!("{}", "-".repeat(80));
        for entry in descriptor.schema().entries() {
            let allowed = entry
                .options
                .as_ref()
                .map(|options| {
                    options
                        .iter()
                        .map(|value| value.to_string())
                        .collect::<Vec<_>>()
                        .join(", ")
                })
                .unwrap_or_else(|| "-".to_string());
            println!(
                "{:<14} {:<18} {:<14} {}",
                entry.name,
                entry.kind.as_str(),
                entry.default.to_string(),
                allowed
            );
        }
    }

    if !found {
        anyhow::bail!("unknown model: {}", identifier);
    }
    Ok(())
}
