//! Server configuration and the `crimson.toml` file format.

use std::net::{Ipv4Addr, SocketAddr};
use std::path::Path;
use std::time::Duration;

use crimson_session::SessionConfig;
use serde::{Deserialize, Serialize};

use crate::error::{Result, ServerError};

/// Default listening port.
pub const DEFAULT_PORT: u16 = 8080;

/// Default grace period for in-flight requests at shutdown (60 seconds).
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(60);

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind the server to.
    pub bind_address: SocketAddr,

    /// How long in-flight requests may run after a shutdown signal.
    pub shutdown_timeout: Duration,

    /// Enable per-request HTTP tracing.
    pub request_logging: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: SocketAddr::from((Ipv4Addr::LOCALHOST, DEFAULT_PORT)),
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
            request_logging: true,
        }
    }
}

impl ServerConfig {
    /// Create a server config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the bind address.
    pub fn with_bind_address(mut self, addr: SocketAddr) -> Self {
        self.bind_address = addr;
        self
    }

    /// Set the port, keeping the bind host.
    pub fn with_port(mut self, port: u16) -> Self {
        self.bind_address.set_port(port);
        self
    }

    /// Set the shutdown grace period.
    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    /// Enable or disable request logging.
    pub fn with_request_logging(mut self, enabled: bool) -> Self {
        self.request_logging = enabled;
        self
    }
}

/// `[server]` table of `crimson.toml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    /// Listening port.
    pub port: u16,

    /// Shutdown grace period in seconds.
    pub shutdown_timeout: u64,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT.as_secs(),
        }
    }
}

/// Whole `crimson.toml` file. Every table and key is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CrimsonConfig {
    /// HTTP listener settings.
    pub server: ServerSection,

    /// Session manager settings.
    pub session: SessionConfig,
}

impl CrimsonConfig {
    /// Parse and validate TOML contents.
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Self = toml::from_str(contents)
            .map_err(|e| ServerError::Config(format!("failed to parse config: {e}")))?;
        config.session.validate()?;
        Ok(config)
    }

    /// Load `path`, falling back to defaults when the file does not exist.
    ///
    /// Returns the config and whether the file was found.
    pub fn load(path: &Path) -> Result<(Self, bool)> {
        match std::fs::read_to_string(path) {
            Ok(contents) => Ok((Self::from_toml(&contents)?, true)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok((Self::default(), false)),
            Err(e) => Err(ServerError::Config(format!(
                "failed to read config file '{}': {e}",
                path.display()
            ))),
        }
    }

    /// Runtime server settings derived from the `[server]` table.
    pub fn server_config(&self) -> ServerConfig {
        ServerConfig::new()
            .with_port(self.server.port)
            .with_shutdown_timeout(Duration::from_secs(self.server.shutdown_timeout))
    }
}
