//! Configuration for the whiteboard relay.
//!
//! The deployment contract is a single `PORT` variable (default `1234`).
//! Everything else is optional and namespaced under `RELAY_*`, with the
//! following priority (highest first):
//! 1. CLI arguments
//! 2. Environment variables (via clap `env` attribute)
//! 3. TOML config file, read only when `--config` / `RELAY_CONFIG` is given
//! 4. Compiled defaults

use std::path::PathBuf;

/// Port used when nothing else is configured.
pub const DEFAULT_PORT: u16 = 1234;

/// Errors that can occur when loading relay configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file {path}: {source}")]
    ReadFile {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Failed to parse the TOML configuration.
    #[error("failed to parse config file: {0}")]
    ParseToml(#[from] toml::de::Error),
}

// ---------------------------------------------------------------------------
// TOML file structs (all fields Option for partial overrides)
// ---------------------------------------------------------------------------

#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct RelayConfigFile {
    server: ServerFileConfig,
}

/// `[server]` section of the relay config file.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct ServerFileConfig {
    host: Option<String>,
    port: Option<u16>,
    max_message_size: Option<usize>,
}

// ---------------------------------------------------------------------------
// CLI arguments
// ---------------------------------------------------------------------------

/// CLI arguments for the relay server.
#[derive(clap::Parser, Debug, Default)]
#[command(version, about = "Room-scoped WebSocket relay for whiteboard sync")]
pub struct RelayCliArgs {
    /// Host or IP address to listen on.
    #[arg(long, env = "RELAY_HOST")]
    pub host: Option<String>,

    /// TCP port to listen on.
    #[arg(short, long, env = "PORT")]
    pub port: Option<u16>,

    /// Path to a TOML config file. No file is read unless this is set.
    #[arg(short, long, env = "RELAY_CONFIG")]
    pub config: Option<PathBuf>,

    /// Drop frames larger than this many bytes instead of forwarding them.
    #[arg(long, env = "RELAY_MAX_MESSAGE_SIZE")]
    pub max_message_size: Option<usize>,

    /// Log level filter (trace, debug, info, warn, error).
    #[arg(long, default_value = "info", env = "RELAY_LOG")]
    pub log_level: String,
}

// ---------------------------------------------------------------------------
// Resolved configuration
// ---------------------------------------------------------------------------

/// Fully resolved relay configuration.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Host to listen on (e.g., `0.0.0.0`).
    pub host: String,
    /// Port to listen on.
    pub port: u16,
    /// Per-frame size limit; `None` relays frames of any size.
    pub max_message_size: Option<usize>,
    /// Log level filter string.
    pub log_level: String,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            max_message_size: None,
            log_level: "info".to_string(),
        }
    }
}

impl RelayConfig {
    /// Load configuration by merging CLI args, env vars, and an optional
    /// TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if `--config` names a file that cannot be read
    /// or parsed.
    pub fn load(cli: &RelayCliArgs) -> Result<Self, ConfigError> {
        let file = load_config_file(cli.config.as_deref())?;
        Ok(Self::resolve(cli, &file))
    }

    /// Priority: CLI/env > file > default.
    fn resolve(cli: &RelayCliArgs, file: &RelayConfigFile) -> Self {
        let defaults = Self::default();

        Self {
            host: cli
                .host
                .clone()
                .or_else(|| file.server.host.clone())
                .unwrap_or(defaults.host),
            port: cli.port.or(file.server.port).unwrap_or(defaults.port),
            max_message_size: cli.max_message_size.or(file.server.max_message_size),
            log_level: cli.log_level.clone(),
        }
    }

    /// Address the listener binds to, as `host:port`.
    #[must_use]
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// URL clients use to join a room, with `<room-name>` as placeholder.
    ///
    /// Takes the port the listener actually bound, which differs from
    /// [`Self::port`] when that is `0`.
    #[must_use]
    pub fn room_url_template(&self, bound_port: u16) -> String {
        format!("ws://{}:{bound_port}/<room-name>", self.host)
    }
}

/// Load and parse the TOML config file, if one was named.
fn load_config_file(path: Option<&std::path::Path>) -> Result<RelayConfigFile, ConfigError> {
    let Some(p) = path else {
        return Ok(RelayConfigFile::default());
    };
    let contents = std::fs::read_to_string(p).map_err(|e| ConfigError::ReadFile {
        path: p.to_path_buf(),
        source: e,
    })?;
    Ok(toml::from_str(&contents)?)
}
