use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Args, Parser, ValueEnum};
use rolegate_handler::{auth::AuthConfig, GatewayConfig};
use serde::Deserialize;
use tracing::instrument;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Json,
}

#[derive(Debug, Default, Deserialize, Parser)]
pub struct Config {
    /// Path of the config file
    #[clap(long, env = "CONFIG_FILE", default_value = "config.toml")]
    #[serde(skip)]
    pub file: PathBuf,

    #[clap(long, env, default_value = "127.0.0.1:8000")]
    #[serde(default = "default_bind")]
    pub bind: String,

    /// Path the GraphQL endpoint is mounted at, empty for the root.
    #[clap(long, env = "GRAPHQL_PATH", default_value = "")]
    #[serde(default)]
    pub path: String,

    #[clap(long, env, value_enum, default_value_t = LogFormat::Compact)]
    #[serde(default)]
    pub log_format: LogFormat,

    #[clap(flatten)]
    #[serde(default)]
    pub gateway: GatewayConfig,

    #[clap(flatten)]
    pub cors: Option<CorsConfig>,

    #[clap(flatten)]
    pub authorization: Option<AuthConfig>,
}

#[derive(Args, Clone, Debug, Deserialize)]
pub struct CorsConfig {
    #[clap(long, env = "CORS_ALLOW_METHODS", value_delimiter = ',')]
    pub allow_methods: Option<Vec<String>>,

    #[clap(long, env = "CORS_ALLOW_CREDENTIALS")]
    pub allow_credentials: Option<bool>,

    #[clap(long, env = "CORS_ALLOW_HEADERS", value_delimiter = ',')]
    pub allow_headers: Option<Vec<String>>,

    #[clap(long, env = "CORS_ALLOW_ORIGINS", value_delimiter = ',')]
    pub allow_origins: Option<Vec<String>>,
}

impl Config {
    /// Parse the config file and environment variables.
    /// If the config file exists, it will be parsed first and ignore
    /// environment variables.
    pub fn try_parse() -> anyhow::Result<Self> {
        Self::load(Config::parse())
    }

    #[instrument(skip_all, fields(file = %env_config.file.display()), level = "debug")]
    fn load(env_config: Config) -> anyhow::Result<Self> {
        if !Path::exists(&env_config.file) {
            return Ok(env_config);
        }

        let file_config = std::fs::read_to_string(&env_config.file)
            .with_context(|| format!("Failed to read config file '{}'.", env_config.file.display()))?;
        let mut file_config: Config = toml::from_str(&file_config)
            .with_context(|| format!("Failed to parse config file '{}'.", env_config.file.display()))?;
        file_config.file = env_config.file;
        Ok(file_config)
    }
}

fn default_bind() -> String {
    "127.0.0.1:8000".to_string()
}
