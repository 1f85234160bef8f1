use std::path::Path;

use config::{ConfigError, Environment, File};
use redact::Secret;
use redact::serde::redact_secret;
use serde::{Deserialize, Serialize};

use crate::imagery::ImageryMode;

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Config {
    /// Imagery URL template with `{x}`, `{y}` and `{z}` placeholders. May carry
    /// a provider token; redacted in `Debug` and serialized output.
    #[serde(serialize_with = "redact_secret")]
    pub imagery: Secret<String>,
    /// Model server base, e.g. `http://serving:8501/v1/models/default`.
    pub prediction_endpoint: String,
    /// Result store base; batches are posted under `/v1/model/prediction/{id}/tiles`.
    pub mlenabler_endpoint: String,
    pub prediction_id: String,
    /// Classification label names, in the order the model emits scores.
    #[serde(default)]
    pub inferences: Vec<String>,
    #[serde(default)]
    pub supertile: bool,
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

fn default_concurrency() -> usize {
    1
}

impl Config {
    pub fn new(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = config::Config::builder()
            .add_source(File::with_name("./config.toml").required(false))
            .add_source(File::with_name("/etc/download-predict/config.toml").required(false));
        if let Some(path) = path {
            builder = builder.add_source(File::from(path));
        }
        builder
            .add_source(
                Environment::with_prefix("DOWNLOAD_PREDICT")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("inferences"),
            )
            .build()?
            .try_deserialize()
    }

    pub fn imagery_mode(&self) -> ImageryMode {
        if self.supertile {
            ImageryMode::Supertile
        } else {
            ImageryMode::Tile
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_from_file() {
        let path = std::env::temp_dir()
            .join(format!("download-predict-{}.toml", std::process::id()));
        std::fs::write(
            &path,
            r#"
imagery = "https://tiles.example.com/{z}/{x}/{y}.png?access_token=abc"
prediction_endpoint = "http://serving:8501/v1/models/default"
mlenabler_endpoint = "http://store"
prediction_id = "3"
inferences = ["other", "building"]
supertile = true
"#,
        )
        .unwrap();
        let config = Config::new(Some(&path)).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(config.prediction_id, "3");
        assert_eq!(
            config.imagery.expose_secret(),
            "https://tiles.example.com/{z}/{x}/{y}.png?access_token=abc"
        );
        assert_eq!(config.inferences, vec!["other", "building"]);
        assert_eq!(config.concurrency, 1);
        assert_eq!(config.imagery_mode(), ImageryMode::Supertile);
    }

    #[test]
    fn test_imagery_token_is_redacted() {
        let config = Config {
            imagery: Secret::new(
                "https://tiles.example.com/{z}/{x}/{y}.jpg?access_token=pk.s3cr3t".to_string(),
            ),
            prediction_endpoint: "http://serving:8501/v1/models/default".to_string(),
            mlenabler_endpoint: "http://store".to_string(),
            prediction_id: "3".to_string(),
            inferences: vec![],
            supertile: false,
            concurrency: 1,
        };
        assert!(!format!("{config:?}").contains("pk.s3cr3t"));
        let serialized = serde_json::to_string(&config).unwrap();
        assert!(!serialized.contains("pk.s3cr3t"));
    }
}
