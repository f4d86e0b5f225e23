//! Persistent settings for the Linear MCP server, stored as TOML.
//!
//! Location:
//!
//! - **macOS/Linux**: `~/.config/linear-mcp/config.toml`
//! - **Windows**: `%APPDATA%\linear-mcp\config.toml`
//!
//! # Example
//!
//! ```ignore
//! use linear_core::config::Config;
//!
//! let mut config = Config::load()?;
//! config.set("server.port", "4000")?;
//! config.save()?;
//! ```

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, info};

const CONFIG_FILE_NAME: &str = "config.toml";

const CONFIG_DIR_NAME: &str = "linear-mcp";

/// Default Linear GraphQL endpoint.
pub const DEFAULT_API_URL: &str = "https://api.linear.app/graphql";

/// Environment variable holding the Linear API key.
pub const TOKEN_ENV_VAR: &str = "LINEAR_API_TOKEN";

/// Everything the binary reads at startup.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Linear API access
    #[serde(default)]
    pub linear: LinearConfig,

    /// Protocol server settings
    #[serde(default)]
    pub server: ServerConfig,
}

/// Linear API configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinearConfig {
    /// GraphQL endpoint URL
    #[serde(default = "default_api_url")]
    pub api_url: String,
    /// API key; the flag and environment variable take precedence
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

/// Protocol server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Interface the WebSocket transport binds to
    #[serde(default = "default_host")]
    pub host: String,
    /// Port the WebSocket transport binds to
    #[serde(default = "default_port")]
    pub port: u16,
    /// Deadline for a single tool call
    #[serde(default = "default_call_timeout_secs")]
    pub call_timeout_secs: u64,
    /// How the WebSocket transport addresses outbound messages
    #[serde(default)]
    pub routing: Routing,
}

/// Outbound addressing for multi-client transports.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Routing {
    /// Every outbound message goes to every open connection.
    #[default]
    Broadcast,
    /// Responses go only to the connection that sent the request.
    Requester,
}

impl fmt::Display for Routing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Routing::Broadcast => write!(f, "broadcast"),
            Routing::Requester => write!(f, "requester"),
        }
    }
}

impl FromStr for Routing {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "broadcast" => Ok(Routing::Broadcast),
            "requester" => Ok(Routing::Requester),
            other => Err(Error::Config(format!(
                "Unknown routing mode '{}'. Expected broadcast or requester",
                other
            ))),
        }
    }
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_call_timeout_secs() -> u64 {
    30
}

impl Default for LinearConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            token: None,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            call_timeout_secs: default_call_timeout_secs(),
            routing: Routing::default(),
        }
    }
}

impl Config {
    /// Platform config directory joined with `linear-mcp`.
    pub fn config_dir() -> Result<PathBuf> {
        let base = dirs::config_dir()
            .ok_or_else(|| Error::Config("No platform config directory".to_string()))?;
        Ok(base.join(CONFIG_DIR_NAME))
    }

    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join(CONFIG_FILE_NAME))
    }

    /// Load from [`Config::config_path`]; defaults when no file exists.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load from `path`; defaults when no file exists.
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "No config file, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(config_error("read", path, e)),
        };

        let config = toml::from_str(&contents).map_err(|e| config_error("parse", path, e))?;
        info!(path = %path.display(), "Loaded config");
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    /// Write to `path`, creating parent directories as needed.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        let contents =
            toml::to_string_pretty(self).map_err(|e| config_error("serialize", path, e))?;

        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir).map_err(|e| config_error("create directory for", path, e))?;
        }
        std::fs::write(path, contents).map_err(|e| config_error("write", path, e))?;

        info!(path = %path.display(), "Saved config");
        Ok(())
    }

    /// Resolve the API key: explicit value, then environment, then config file.
    pub fn resolve_token(&self, explicit: Option<String>) -> Option<String> {
        explicit
            .or_else(|| std::env::var(TOKEN_ENV_VAR).ok())
            .or_else(|| self.linear.token.clone())
            .filter(|t| !t.trim().is_empty())
    }

    /// Assign one dotted key such as `server.port`. The value is parsed for
    /// the field's type before anything changes.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let (section, field) = split_key(key)?;

        match (section, field) {
            ("linear", "api_url" | "url") => self.linear.api_url = value.to_string(),
            ("linear", "token") => self.linear.token = Some(value.to_string()),
            ("server", "host") => self.server.host = value.to_string(),
            ("server", "port") => {
                self.server.port = value
                    .parse()
                    .map_err(|_| Error::Config(format!("Invalid port: {}", value)))?;
            }
            ("server", "call_timeout_secs" | "timeout") => {
                self.server.call_timeout_secs = value
                    .parse()
                    .map_err(|_| Error::Config(format!("Invalid timeout: {}", value)))?;
            }
            ("server", "routing") => self.server.routing = value.parse()?,
            ("linear" | "server", _) => {
                return Err(Error::Config(format!(
                    "Unknown {} config field: {}",
                    section, field
                )))
            }
            _ => return Err(Error::Config(format!("Unknown section: {}", section))),
        }

        Ok(())
    }

    /// Read one dotted key. `Ok(None)` means the key exists but is unset.
    pub fn get(&self, key: &str) -> Result<Option<String>> {
        let (section, field) = split_key(key)?;

        match (section, field) {
            ("linear", "api_url" | "url") => Ok(Some(self.linear.api_url.clone())),
            ("linear", "token") => Ok(self.linear.token.clone()),
            ("server", "host") => Ok(Some(self.server.host.clone())),
            ("server", "port") => Ok(Some(self.server.port.to_string())),
            ("server", "call_timeout_secs" | "timeout") => {
                Ok(Some(self.server.call_timeout_secs.to_string()))
            }
            ("server", "routing") => Ok(Some(self.server.routing.to_string())),
            ("linear" | "server", _) => Err(Error::Config(format!(
                "Unknown {} config field: {}",
                section, field
            ))),
            _ => Err(Error::Config(format!("Unknown section: {}", section))),
        }
    }
}

fn split_key(key: &str) -> Result<(&str, &str)> {
    match key.split_once('.') {
        Some((section, field)) if !field.contains('.') => Ok((section, field)),
        _ => Err(Error::Config(format!(
            "Invalid config key '{}'. Expected section.field",
            key
        ))),
    }
}

fn config_error(action: &str, path: &Path, e: impl fmt::Display) -> Error {
    Error::Config(format!("Failed to {} {}: {}", action, path.display(), e))
}

// =============================================================================
// Tests
// =============================================================================
