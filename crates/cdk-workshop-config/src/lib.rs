pub mod error;

pub use error::*;

use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE: &str = "cdk.json";
pub const USER_CONFIG_FILE: &str = ".cdk.json";
pub const DEFAULT_OUTPUT_DIR: &str = "cdk.out";

pub const CONFIG_PATH_ENV: &str = "CDK_JSON_PATH";
pub const ACCOUNT_ENV: &str = "CDK_DEFAULT_ACCOUNT";
pub const REGION_ENV: &str = "CDK_DEFAULT_REGION";

/// Contents of a `cdk.json` file
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigFile {
    /// Command that runs the app (kept for compatibility with the CDK CLI)
    pub app: Option<String>,

    /// Assembly output directory
    pub output: Option<String>,

    #[serde(default)]
    pub context: Map<String, Value>,
}

/// Fully resolved settings for a synth run
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub output_dir: PathBuf,
    pub account: Option<String>,
    pub region: Option<String>,
    pub stack_name: Option<String>,
    pub description: Option<String>,
    pub tags: BTreeMap<String, String>,
    pub termination_protection: bool,

    /// Config file the settings were read from, if any
    pub source: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            account: None,
            region: None,
            stack_name: None,
            description: None,
            tags: BTreeMap::new(),
            termination_protection: false,
            source: None,
        }
    }
}

/// Find the `cdk.json` to use
///
/// Search order:
/// 1. `CDK_JSON_PATH` environment variable (direct path)
/// 2. `cdk.json` in the current directory
/// 3. `~/.cdk.json` (user-wide settings)
///
/// Returns `None` when no file exists; the defaults then apply.
pub fn find_config_file() -> Result<Option<PathBuf>> {
    // 1. explicit path
    if let Ok(config_path) = std::env::var(CONFIG_PATH_ENV) {
        let path = PathBuf::from(config_path);
        if path.exists() {
            return Ok(Some(path));
        }
        tracing::warn!("{} points at missing file {}", CONFIG_PATH_ENV, path.display());
    }

    // 2. current directory
    let path = std::env::current_dir()?.join(CONFIG_FILE);
    if path.exists() {
        return Ok(Some(path));
    }

    // 3. home directory
    if let Some(home) = dirs::home_dir() {
        let path = home.join(USER_CONFIG_FILE);
        if path.exists() {
            return Ok(Some(path));
        }
    }

    Ok(None)
}

/// Read and parse a config file
pub fn load_config_file(path: &Path) -> Result<ConfigFile> {
    let content = std::fs::read_to_string(path)?;
    serde_json::from_str(&content).map_err(|e| ConfigError::InvalidConfigFile {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

fn context_string(context: &Map<String, Value>, key: &str) -> Result<Option<String>> {
    match context.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(ConfigError::InvalidContextValue {
            key: key.to_string(),
            expected: "string",
        }),
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

impl Settings {
    /// Build settings from a parsed config file and the process environment
    ///
    /// Environment variables take precedence over context values.
    pub fn from_config(config: &ConfigFile, source: Option<PathBuf>) -> Result<Self> {
        let context = &config.context;

        let tags = match context.get("tags") {
            None | Some(Value::Null) => BTreeMap::new(),
            Some(Value::Object(map)) => map
                .iter()
                .map(|(k, v)| match v {
                    Value::String(s) => Ok((k.clone(), s.clone())),
                    _ => Err(ConfigError::InvalidContextValue {
                        key: format!("tags.{}", k),
                        expected: "string",
                    }),
                })
                .collect::<Result<_>>()?,
            Some(_) => {
                return Err(ConfigError::InvalidContextValue {
                    key: "tags".to_string(),
                    expected: "object",
                });
            }
        };

        let termination_protection = match context.get("terminationProtection") {
            None | Some(Value::Null) => false,
            Some(Value::Bool(b)) => *b,
            Some(_) => {
                return Err(ConfigError::InvalidContextValue {
                    key: "terminationProtection".to_string(),
                    expected: "bool",
                });
            }
        };

        Ok(Self {
            output_dir: PathBuf::from(config.output.as_deref().unwrap_or(DEFAULT_OUTPUT_DIR)),
            account: env_var(ACCOUNT_ENV).or(context_string(context, "account")?),
            region: env_var(REGION_ENV).or(context_string(context, "region")?),
            stack_name: context_string(context, "stackName")?,
            description: context_string(context, "description")?,
            tags,
            termination_protection,
            source,
        })
    }
}

/// Resolve settings from the discovered config file and the environment
pub fn resolve() -> Result<Settings> {
    match find_config_file()? {
        Some(path) => {
            tracing::debug!("Using config file: {}", path.display());
            let config = load_config_file(&path)?;
            Settings::from_config(&config, Some(path))
        }
        None => {
            tracing::debug!("No {} found, using defaults", CONFIG_FILE);
            Settings::from_config(&ConfigFile::default(), None)
        }
    }
}
