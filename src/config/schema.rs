//! YAML schema for writer configuration

use serde::{Deserialize, Deserializer, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Result, WriterError};

/// Deserialize a bool from either a YAML boolean (`true`) or a quoted string (`"true"`).
fn deserialize_bool_lenient<'de, D>(deserializer: D) -> std::result::Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum BoolOrString {
        Bool(bool),
        Str(String),
    }

    match BoolOrString::deserialize(deserializer)? {
        BoolOrString::Bool(b) => Ok(b),
        BoolOrString::Str(s) => match s.to_lowercase().as_str() {
            "true" => Ok(true),
            "false" => Ok(false),
            other => Err(serde::de::Error::custom(format!(
                "expected 'true' or 'false', got '{other}'"
            ))),
        },
    }
}

fn default_true() -> bool {
    true
}

fn default_run_dir() -> PathBuf {
    PathBuf::from("runs")
}

fn default_scalars() -> Vec<String> {
    vec!["*".to_string()]
}

fn default_max_to_keep() -> usize {
    10
}

/// Complete writer configuration
///
/// ```yaml
/// run_dir: runs/mnist
/// console:
///   scalars: ["train/*", "val/acc"]
/// tensorboard:
///   enabled: false
/// checkpoint:
///   max_to_keep: 3
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WritersConfig {
    /// Root of all run output
    #[serde(default = "default_run_dir")]
    pub run_dir: PathBuf,

    #[serde(default)]
    pub console: ConsoleSpec,

    #[serde(default)]
    pub tensorboard: TensorBoardSpec,

    #[serde(default)]
    pub json: JsonSpec,

    #[serde(default)]
    pub checkpoint: CheckpointSpec,
}

impl Default for WritersConfig {
    fn default() -> Self {
        Self {
            run_dir: default_run_dir(),
            console: ConsoleSpec::default(),
            tensorboard: TensorBoardSpec::default(),
            json: JsonSpec::default(),
            checkpoint: CheckpointSpec::default(),
        }
    }
}

/// Console summary settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsoleSpec {
    #[serde(default = "default_true", deserialize_with = "deserialize_bool_lenient")]
    pub enabled: bool,

    /// Glob patterns of scalar names to print
    #[serde(default = "default_scalars")]
    pub scalars: Vec<String>,
}

impl Default for ConsoleSpec {
    fn default() -> Self {
        Self { enabled: true, scalars: default_scalars() }
    }
}

/// TensorBoard event file settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TensorBoardSpec {
    #[serde(default = "default_true", deserialize_with = "deserialize_bool_lenient")]
    pub enabled: bool,

    /// Defaults to `<run_dir>/tensorboard`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub save_dir: Option<PathBuf>,
}

impl Default for TensorBoardSpec {
    fn default() -> Self {
        Self { enabled: true, save_dir: None }
    }
}

/// JSON scalar log settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonSpec {
    #[serde(default = "default_true", deserialize_with = "deserialize_bool_lenient")]
    pub enabled: bool,

    /// Defaults to `<run_dir>/summaries`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub save_dir: Option<PathBuf>,
}

impl Default for JsonSpec {
    fn default() -> Self {
        Self { enabled: true, save_dir: None }
    }
}

/// Periodic checkpoint settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckpointSpec {
    #[serde(default, deserialize_with = "deserialize_bool_lenient")]
    pub enabled: bool,

    /// Defaults to `<run_dir>/checkpoints`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,

    #[serde(default = "default_max_to_keep")]
    pub max_to_keep: usize,
}

impl Default for CheckpointSpec {
    fn default() -> Self {
        Self { enabled: false, dir: None, max_to_keep: default_max_to_keep() }
    }
}

impl WritersConfig {
    /// Parse configuration from YAML text
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        Self::parse(yaml, Path::new("<inline>"))
    }

    /// Load configuration from a YAML file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path).map_err(|e| WriterError::Config {
            path: path.to_path_buf(),
            message: format!("Failed to read config file: {e}"),
        })?;
        Self::parse(&yaml, path)
    }

    fn parse(yaml: &str, path: &Path) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(|e| WriterError::Config {
            path: path.to_path_buf(),
            message: format!("Failed to parse YAML config: {e}"),
        })
    }
}
