use figment::Figment;
use figment::providers::{Env, Format, Yaml};
use schemars::{JsonSchema, schema_for};
use serde::{Deserialize, Serialize};

use super::gate::{GateConfig, RouteConfig};
use super::logging::LoggingConfig;
use super::session::SessionConfig;

/// Environment variable holding the path of the YAML configuration file.
pub const CONFIG_PATH_ENV: &str = "GRANTEZY_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "./config.yaml";
const ENV_PREFIX: &str = "GRANTEZY_";

/// A top-level enum for versioned configurations.
#[derive(Deserialize, Serialize, JsonSchema)]
#[serde(tag = "version")]
pub enum Config {
    #[serde(rename = "1.0.0")]
    ConfigV1(ConfigV1),
}

/// Main config for v1.0.0.
#[derive(Deserialize, Serialize, Debug, Clone, JsonSchema)]
pub struct ConfigV1 {
    pub bind_address: String,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub routes: RouteConfig,
    #[serde(default)]
    pub gate: GateConfig,
    #[serde(default)]
    pub shell: ShellConfig,
    #[serde(default)]
    pub session: SessionConfig,
}

/// Where the built page shell lives on disk.
#[derive(Deserialize, Serialize, Debug, Clone, JsonSchema)]
pub struct ShellConfig {
    /// Directory served behind the gate. Unknown paths fall back to `index`.
    pub dir: Option<String>,
    #[serde(default = "default_index")]
    pub index: String,
}

impl Default for ShellConfig {
    fn default() -> Self {
        ShellConfig {
            dir: None,
            index: default_index(),
        }
    }
}

fn default_index() -> String {
    "index.html".to_string()
}

impl Config {
    fn into_latest(self) -> ConfigV1 {
        match self {
            Config::ConfigV1(c) => c,
        }
    }
}

/// Builds the figment used to read the configuration: the YAML file first,
/// then `GRANTEZY_*` environment variables on top (`__` separates levels).
pub fn config_figment(path: &str) -> Figment {
    Figment::new()
        .merge(Yaml::file(path))
        .merge(Env::prefixed(ENV_PREFIX).ignore(&["config"]).split("__"))
}

/// Load the configuration from `$GRANTEZY_CONFIG` or `./config.yaml`.
pub fn load_config() -> Result<ConfigV1, figment::Error> {
    let path = std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    load_config_from(&path)
}

pub fn load_config_from(path: &str) -> Result<ConfigV1, figment::Error> {
    config_figment(path).extract::<Config>().map(Config::into_latest)
}

/// Parse a configuration from an in-memory YAML document.
pub fn parse_config(yaml: &str) -> Result<ConfigV1, figment::Error> {
    Figment::new()
        .merge(Yaml::string(yaml))
        .extract::<Config>()
        .map(Config::into_latest)
}

/// Print the JSON schema for the configuration to stdout.
pub fn print_schema() -> Result<(), serde_json::Error> {
    let schema = schema_for!(Config);
    println!("{}", serde_json::to_string_pretty(&schema)?);
    Ok(())
}
