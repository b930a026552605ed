// common/src/config.rs
use serde::Deserialize;
use std::env;
use std::path::PathBuf;
use config::{Config as ConfigFile, File, Environment};

use crate::init_data::DEFAULT_MAX_AGE_SECONDS;
use crate::secret::SecretString;

/// Central configuration for the Mini App server
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    pub web_server_addr: String,
    /// Bot token shared with the host platform; signs the init data
    pub bot_token: Option<SecretString>,
    /// Freshness window for `auth_date`, in seconds
    pub max_auth_age_seconds: u64,
    /// Reject init data without a parseable `user` record
    pub require_user: bool,
    pub enable_compression: bool,

    // Static file serving configuration
    pub static_files: StaticFilesConfig,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct StaticFilesConfig {
    pub enabled: bool,
    pub path: String,
    pub index: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            web_server_addr: "127.0.0.1:8081".to_string(),
            bot_token: None,
            max_auth_age_seconds: DEFAULT_MAX_AGE_SECONDS,
            require_user: false,
            enable_compression: true,
            static_files: StaticFilesConfig::default(),
        }
    }
}

impl Default for StaticFilesConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: "./static".to_string(),
            index: "index.html".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from file and environment
    pub fn load() -> Result<Self, config::ConfigError> {
        // Get the run mode, defaulting to "development"
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        // Locate the config directory
        let config_dir = env::var("CONFIG_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                // Check if we're in the project root or a subcrate
                let mut path = PathBuf::from("./config");
                if !path.exists() {
                    path = PathBuf::from("../config");
                }
                path
            });

        tracing::info!("Loading configuration from {}", config_dir.display());
        tracing::info!("Using run mode: {}", run_mode);

        let mut config: Config = ConfigFile::builder()
            .add_source(File::from(config_dir.join("default.toml")).required(false))
            .add_source(File::from(config_dir.join(format!("{}.toml", run_mode))).required(false))
            .add_source(File::from(config_dir.join("local.toml")).required(false))
            .add_source(app_environment())
            .build()?
            .try_deserialize()?;

        config.fill_bot_token(|name| env::var(name).ok());

        Ok(config)
    }

    /// Load from files and environment, falling back to plain environment variables
    pub fn from_env() -> Self {
        match Self::load() {
            Ok(config) => {
                tracing::info!("Configuration loaded from files and environment");
                config
            },
            Err(e) => {
                tracing::warn!("Failed to load configuration from files: {}", e);
                tracing::info!("Falling back to environment variables only");

                let defaults = Self::default();
                let static_defaults = StaticFilesConfig::default();

                Self {
                    web_server_addr: env::var("WEB_SERVER_ADDR")
                        .unwrap_or(defaults.web_server_addr),
                    bot_token: bot_token_from(|name| env::var(name).ok()),
                    max_auth_age_seconds: env::var("MAX_AUTH_AGE_SECONDS")
                        .ok()
                        .and_then(|v| v.parse::<u64>().ok())
                        .unwrap_or(defaults.max_auth_age_seconds),
                    require_user: env_flag("REQUIRE_USER").unwrap_or(defaults.require_user),
                    enable_compression: env_flag("ENABLE_COMPRESSION")
                        .unwrap_or(defaults.enable_compression),
                    static_files: StaticFilesConfig {
                        enabled: env_flag("STATIC_FILES_ENABLED")
                            .unwrap_or(static_defaults.enabled),
                        path: env::var("STATIC_FILES_PATH").unwrap_or(static_defaults.path),
                        index: env::var("STATIC_FILES_INDEX").unwrap_or(static_defaults.index),
                    },
                }
            }
        }
    }

    /// The bot token, unless it is missing or blank
    pub fn bot_token(&self) -> Option<&SecretString> {
        self.bot_token.as_ref().filter(|token| !token.is_blank())
    }

    /// Take the bot token from the plain `BOT_TOKEN` variable when no other
    /// source provided a usable one
    fn fill_bot_token(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if self.bot_token().is_none() {
            if let Some(token) = bot_token_from(lookup) {
                self.bot_token = Some(token);
            }
        }
    }
}

// Environment variables with prefix "APP", e.g. APP_BOT_TOKEN, APP_STATIC_FILES__PATH
fn app_environment() -> Environment {
    Environment::with_prefix("APP").prefix_separator("_").separator("__")
}

fn bot_token_from(lookup: impl Fn(&str) -> Option<String>) -> Option<SecretString> {
    lookup("BOT_TOKEN").map(SecretString::from)
}

fn env_flag(name: &str) -> Option<bool> {
    env::var(name).ok().map(|v| v.to_lowercase() == "true")
}
