//! Configuration system for the Graphoni client.
//!
//! Uses `figment` for layered configuration: defaults -> user config file ->
//! explicit config file -> environment -> per-invocation overrides.
//! The user config lives at `~/.config/graphoni/config.toml` (platform
//! equivalent via `directories`).

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{GraphoniError, Result};

/// Server address used when nothing else is configured.
pub const DEFAULT_SERVER_URL: &str = "http://localhost:3001";

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GraphoniConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub defaults: DefaultsConfig,
}

/// Where the server lives and how to authenticate against it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Base URL of the Graphoni server.
    pub url: String,
    /// Bearer credential attached to every request when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Per-request deadline in seconds. Unset means no deadline.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_SERVER_URL.to_string(),
            api_key: None,
            timeout_secs: None,
        }
    }
}

impl ServerConfig {
    /// Base URL without trailing slashes.
    pub fn base_url(&self) -> &str {
        self.url.trim_end_matches('/')
    }
}

/// Default argument values used by the front ends.
///
/// These only fill in arguments the caller left out; the client itself passes
/// whatever it is given through to the server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DefaultsConfig {
    pub search_limit: i64,
    pub node_hops: i64,
    pub node_limit: i64,
    pub path_max_length: i64,
    pub query_limit: i64,
    pub list_limit: i64,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            search_limit: 20,
            node_hops: 1,
            node_limit: 100,
            path_max_length: 6,
            query_limit: 5000,
            list_limit: 50,
        }
    }
}

impl GraphoniConfig {
    /// A copy safe to print: the credential is masked.
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        if let Some(key) = &copy.server.api_key {
            let visible: String = key.chars().take(3).collect();
            copy.server.api_key = Some(format!("{visible}****"));
        }
        copy
    }

    /// Apply explicit per-invocation overrides (command-line flags).
    pub fn apply_overrides(&mut self, url: Option<&str>, api_key: Option<&str>) {
        if let Some(url) = url {
            self.server.url = url.to_string();
        }
        if let Some(key) = api_key {
            self.server.api_key = Some(key.to_string());
        }
    }
}

/// Path of the user-level config file, if the platform has a config directory.
pub fn config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("dev", "graphoni", "graphoni")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}

/// Load configuration from layered sources.
///
/// Priority (highest to lowest):
/// 1. Environment variables: `GRAPHONI_URL` / `GRAPHONI_API_KEY`, and
///    `GRAPHONI_`-prefixed nested keys (`GRAPHONI_SERVER__TIMEOUT_SECS`)
/// 2. The explicit config file, when given
/// 3. User config (`~/.config/graphoni/config.toml`)
/// 4. Built-in defaults
///
/// Command-line overrides are applied afterwards with
/// [`GraphoniConfig::apply_overrides`].
pub fn load_config(explicit: Option<&Path>) -> Result<GraphoniConfig> {
    load_config_from(config_path().as_deref(), explicit)
}

fn load_config_from(user: Option<&Path>, explicit: Option<&Path>) -> Result<GraphoniConfig> {
    let mut figment = Figment::from(Serialized::defaults(GraphoniConfig::default()));

    if let Some(user_config) = user
        && user_config.exists()
    {
        figment = figment.merge(Toml::file(user_config));
    }

    if let Some(path) = explicit {
        if !path.exists() {
            return Err(GraphoniError::Config(Box::new(figment::Error::from(
                format!("config file not found: {}", path.display()),
            ))));
        }
        figment = figment.merge(Toml::file(path));
    }

    figment = figment
        .merge(Env::prefixed("GRAPHONI_").split("__"))
        .merge(Env::raw().filter_map(|key| {
            match key.as_str().to_ascii_uppercase().as_str() {
                "GRAPHONI_URL" => Some("server.url".into()),
                "GRAPHONI_API_KEY" => Some("server.api_key".into()),
                _ => None,
            }
        }));

    figment.extract().map_err(|e| GraphoniError::Config(Box::new(e)))
}

/// Render the default configuration as TOML, for `graphoni config init`.
pub fn default_config_toml() -> Result<String> {
    toml::to_string_pretty(&GraphoniConfig::default())
        .map_err(|e| GraphoniError::Config(Box::new(figment::Error::from(e.to_string()))))
}
