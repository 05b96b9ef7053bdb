use std::path::PathBuf;

use clap::Parser;
use serde_json::{Map, Value};

use crate::error::{Result, SubgenError};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Media file paths, or .txt batch manifests listing one path per line
    #[arg(required_unless_present_any = ["list_models", "describe_model"])]
    pub media: Vec<String>,

    /// Transcription model identifier; defaults to the first available model
    #[arg(short, long)]
    pub model: Option<String>,

    /// Model configuration: a JSON object literal or a path to a .json file
    #[arg(long, default_value = "{}")]
    pub model_configs: String,

    /// Output subtitles format
    #[arg(short, long, default_value = "srt")]
    pub format: String,

    /// Directory where the subtitles will be stored; defaults to the folder
    /// where each media file is stored
    #[arg(short, long)]
    pub destination_folder: Option<PathBuf>,

    /// Translate subtitles using the given translation model
    #[arg(short, long)]
    pub translation_model: Option<String>,

    /// Translation configuration: a JSON object literal or a path to a .json file
    #[arg(long, default_value = "{}")]
    pub translation_configs: String,

    /// Source language of the subtitles
    #[arg(long)]
    pub translation_source_lang: Option<String>,

    /// Target language of the subtitles
    #[arg(long)]
    pub translation_target_lang: Option<String>,

    /// List available models and subtitle formats
    #[arg(long)]
    pub list_models: bool,

    /// Print the configuration schema of a model
    #[arg(long, value_name = "MODEL")]
    pub describe_model: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

/// Parse a model configuration argument: either a JSON object literal or a
/// path to a .json file containing one.
pub fn parse_configs_arg(arg: &str) -> Result<Map<String, Value>> {
    let text = if arg.ends_with(".json") {
        std::fs::read_to_string(arg).map_err(|e| {
            SubgenError::Config(format!("cannot read configuration file '{}': {}", arg, e))
        })?
    } else {
        arg.to_string()
    };

    let value: Value = serde_json::from_str(&text)
        .map_err(|e| SubgenError::Config(format!("invalid JSON configuration: {}", e)))?;
    match value {
        Value::Object(map) => Ok(map),
        _ => Err(SubgenError::Config(
            "model configuration must be a JSON object".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn configs_arg_accepts_an_object_literal() {
        let map = parse_configs_arg(r#"{"model": "tiny", "threads": 2}"#).unwrap();
        assert_eq!(map.get("model"), Some(&json!("tiny")));
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn configs_arg_accepts_a_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("configs.json");
        std::fs::write(&path, r#"{"language": "en"}"#).unwrap();

        let map = parse_configs_arg(&path.to_string_lossy()).unwrap();
        assert_eq!(map.get("language"), Some(&json!("en")));
    }

    #[test]
    fn configs_arg_rejects_non_objects() {
        assert!(matches!(
            parse_configs_arg("[1, 2]"),
            Err(SubgenError::Config(_))
        ));
        assert!(matches!(
            parse_configs_arg("not json"),
            Err(SubgenError::Config(_))
        ));
    }

    #[test]
    fn media_arguments_are_optional_for_listing() {
        assert!(Args::try_parse_from(["subgen", "--list-models"]).is_ok());
        assert!(Args::try_parse_from(["subgen"]).is_err());
        let args = Args::try_parse_from(["subgen", "a.mp4", "b.txt", "-f", "vtt"]).unwrap();
        assert_eq!(args.media, vec!["a.mp4", "b.txt"]);
        assert_eq!(args.format, "vtt");
    }
}
