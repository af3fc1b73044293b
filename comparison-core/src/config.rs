use std::path::{Path, PathBuf};

use aws_config::Region;
use serde::Deserialize;

use crate::error::{Error, ErrorDetails};
use crate::providers::{InferenceParams, ModelTarget};
use crate::storage::StorageKind;

pub const DEFAULT_PROMPT: &str = "What is a cosmetic guidance?";
pub const DEFAULT_MODELS: [&str; 4] = [
    "anthropic.claude-3-sonnet-20240229-v1:0",
    "anthropic.claude-3-haiku-20240307-v1:0",
    "meta.llama3-70b-instruct-v1:0",
    "mistral.mistral-7b-instruct-v0:2",
];
pub const DEFAULT_KEY_PREFIX: &str = "ai-comparisons";
pub const DEFAULT_SCRATCH_PATH: &str = "/tmp/ai_comparison.csv";

#[derive(Debug, PartialEq)]
pub struct Config {
    pub prompt: String,
    pub models: Vec<ModelTarget>, // in dispatch order
    pub inference: InferenceParams,
    pub aws: AwsConfig,
    pub object_storage: StorageKind,
    pub key_prefix: String,
    pub scratch_path: PathBuf,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct AwsConfig {
    /// Region for the Bedrock runtime client. Falls back to the SDK's default region chain.
    pub region: Option<String>,
}

impl AwsConfig {
    pub fn region(&self) -> Option<Region> {
        self.region.clone().map(Region::new)
    }
}

impl Config {
    /// Loads the config file at `config_path`, or the built-in defaults if no path is given.
    pub fn load(config_path: Option<&Path>) -> Result<Config, Error> {
        match config_path {
            Some(path) => Self::load_from_path(path),
            None => {
                tracing::info!("No config file provided, using the default prompt and models.");
                Self::load_from_toml(toml::Table::new())
            }
        }
    }

    pub fn load_from_path(config_path: &Path) -> Result<Config, Error> {
        let table = UninitializedConfig::read_toml_config(config_path)?.ok_or_else(|| {
            Error::new(ErrorDetails::Config {
                message: format!("Config file not found: {}", config_path.display()),
            })
        })?;
        Self::load_from_toml(table)
    }

    pub fn load_from_toml(table: toml::Table) -> Result<Config, Error> {
        let config = UninitializedConfig::try_from(table)?;

        if config.models.is_empty() {
            return Err(Error::new(ErrorDetails::Config {
                message: "`models` must contain at least one model identifier".to_string(),
            }));
        }
        // Unknown model families are rejected here, before any model is invoked.
        let models = config
            .models
            .into_iter()
            .map(ModelTarget::new)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Config {
            prompt: config.prompt,
            models,
            inference: config.inference,
            aws: config.aws,
            object_storage: config.object_storage,
            key_prefix: config.key_prefix,
            scratch_path: config.scratch_path,
        })
    }
}

/// This struct is used to deserialize the TOML config file.
/// It holds raw model identifiers, which are resolved to model families by `Config::load_from_toml`.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct UninitializedConfig {
    #[serde(default = "default_prompt")]
    prompt: String,
    #[serde(default = "default_models")]
    models: Vec<String>,
    #[serde(default)]
    inference: InferenceParams,
    #[serde(default)]
    aws: AwsConfig,
    #[serde(default)]
    object_storage: StorageKind,
    #[serde(default = "default_key_prefix")]
    key_prefix: String,
    #[serde(default = "default_scratch_path")]
    scratch_path: PathBuf,
}

impl UninitializedConfig {
    /// Read a file from the file system and parse it as TOML
    fn read_toml_config(path: &Path) -> Result<Option<toml::Table>, Error> {
        if !path.exists() {
            return Ok(None);
        }
        Ok(Some(
            std::fs::read_to_string(path)
                .map_err(|e| {
                    Error::new(ErrorDetails::Config {
                        message: format!("Failed to read config file `{}`: {e}", path.display()),
                    })
                })?
                .parse::<toml::Table>()
                .map_err(|e| {
                    Error::new(ErrorDetails::Config {
                        message: format!(
                            "Failed to parse config file `{}` as valid TOML: {e}",
                            path.display()
                        ),
                    })
                })?,
        ))
    }
}

/// Deserialize a TOML table into `UninitializedConfig`
impl TryFrom<toml::Table> for UninitializedConfig {
    type Error = Error;

    fn try_from(table: toml::Table) -> Result<Self, Self::Error> {
        match serde_path_to_error::deserialize(toml::Value::Table(table)) {
            Ok(config) => Ok(config),
            Err(e) => {
                let path = e.path().clone();
                Err(Error::new(ErrorDetails::Config {
                    // Extract the underlying message from the toml error, as
                    // the path-tracking from the toml crate will be incorrect
                    message: format!("{}: {}", path, e.into_inner().message()),
                }))
            }
        }
    }
}

fn default_prompt() -> String {
    DEFAULT_PROMPT.to_string()
}

fn default_models() -> Vec<String> {
    DEFAULT_MODELS.iter().map(ToString::to_string).collect()
}

fn default_key_prefix() -> String {
    DEFAULT_KEY_PREFIX.to_string()
}

fn default_scratch_path() -> PathBuf {
    PathBuf::from(DEFAULT_SCRATCH_PATH)
}
