//! Configuration management.

use crate::paths::DataPaths;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use navgraph_frontend::EditorSettings;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Configuration structure that matches the TOML file format.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct ConfigFile {
    #[serde(default)]
    server: ServerConfig,
    #[serde(default)]
    storage: StorageConfig,
    #[serde(default)]
    logging: LoggingConfig,
    #[serde(default)]
    editor: EditorConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ServerConfig {
    #[serde(default = "default_url")]
    url: String,
    auth_token: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            auth_token: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct StorageConfig {
    data_dir: Option<PathBuf>,
    preview_cache_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct LoggingConfig {
    /// Path to log file (if set, logs are written there as well as to stderr)
    log_file: Option<PathBuf>,
    /// Log level; `RUST_LOG` takes precedence
    log_level: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct EditorConfig {
    #[serde(default = "default_history_limit")]
    history_limit: usize,
    #[serde(default = "default_exploration_poll_ms")]
    exploration_poll_ms: u64,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            history_limit: default_history_limit(),
            exploration_poll_ms: default_exploration_poll_ms(),
        }
    }
}

fn default_url() -> String {
    format!("http://localhost:{}", navgraph_types::DEFAULT_HOST_PORT)
}

fn default_history_limit() -> usize {
    EditorSettings::default().history_limit
}

fn default_exploration_poll_ms() -> u64 {
    EditorSettings::default().exploration_poll.as_millis() as u64
}

/// Values given on the command line; they override every other source.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub server_url: Option<String>,
    pub auth_token: Option<String>,
    pub data_dir: Option<PathBuf>,
    pub log_level: Option<String>,
}

/// Driver configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the host API
    pub server_url: String,
    /// Bearer token sent with every request
    pub auth_token: Option<String>,
    pub paths: DataPaths,
    pub log_file: Option<PathBuf>,
    pub log_level: Option<String>,
    pub history_limit: usize,
    pub exploration_poll: Duration,
}

impl Config {
    /// Load configuration: defaults < user config < `.navgraph.toml` < env vars < CLI args.
    ///
    /// The user config is `config.toml` in the platform config directory
    /// (~/.config/navgraph/ on Linux). Env vars use the `NAVGRAPH_` prefix with `__`
    /// separating sections, e.g. `NAVGRAPH_SERVER__URL`.
    pub fn from_figment(cli: &CliOverrides) -> anyhow::Result<Self> {
        let local_config = std::env::current_dir()
            .ok()
            .map(|d| d.join(".navgraph.toml"));
        let user_config = directories::ProjectDirs::from("", "", "navgraph")
            .map(|dirs| dirs.config_dir().join("config.toml"));

        let mut figment = Figment::new().merge(Serialized::defaults(ConfigFile::default()));

        if let Some(ref path) = user_config {
            if path.exists() {
                figment = figment.merge(Toml::file(path));
            }
        }
        if let Some(ref path) = local_config {
            if path.exists() {
                figment = figment.merge(Toml::file(path));
            }
        }

        figment = figment.merge(Env::prefixed("NAVGRAPH_").split("__"));

        if let Some(ref url) = cli.server_url {
            figment = figment.merge(Serialized::default("server.url", url));
        }
        if let Some(ref token) = cli.auth_token {
            figment = figment.merge(Serialized::default("server.auth_token", token));
        }
        if let Some(ref dir) = cli.data_dir {
            figment = figment.merge(Serialized::default("storage.data_dir", dir));
        }
        if let Some(ref level) = cli.log_level {
            figment = figment.merge(Serialized::default("logging.log_level", level));
        }

        let file: ConfigFile = figment.extract()?;
        let paths = DataPaths::resolve(file.storage.data_dir, file.storage.preview_cache_path)?;

        Ok(Self {
            server_url: file.server.url,
            auth_token: file.server.auth_token,
            paths,
            log_file: file.logging.log_file,
            log_level: file.logging.log_level,
            history_limit: file.editor.history_limit,
            exploration_poll: Duration::from_millis(file.editor.exploration_poll_ms),
        })
    }

    /// Tunables for the editor core.
    pub fn editor_settings(&self) -> EditorSettings {
        EditorSettings {
            history_limit: self.history_limit,
            exploration_poll: self.exploration_poll,
            ..EditorSettings::default()
        }
    }
}
