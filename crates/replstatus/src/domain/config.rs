//! Startup configuration.
//!
//! [`ServerConfig`] is the validated, immutable configuration the server runs
//! with.  It is assembled from three layers, lowest precedence first:
//!
//! 1. Built-in defaults (port 5400, all interfaces, watch the parent process).
//! 2. An optional TOML file, deserialised into [`ConfigFile`].
//! 3. Command-line flags and environment variables ([`ConfigOverrides`]).
//!
//! ```toml
//! [server]
//! port = 5400
//! bind_address = ""          # empty = all interfaces
//!
//! [replication]
//! status_file = "/run/postgresql/replstatus.json"
//!
//! [supervisor]
//! mode = "parent"            # "parent", "none" or "pid:<n>"
//! ```
//!
//! Fields absent from the file keep their defaults, so an empty file is a
//! valid configuration.

use std::fmt;
use std::net::{Ipv4Addr, SocketAddrV4};
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default TCP port.
pub const DEFAULT_PORT: u16 = 5400;

/// Lowest port the server may bind; privileged ports are refused.
pub const MIN_PORT: u16 = 1025;

/// Error type for configuration loading and validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The port is below [`MIN_PORT`].
    #[error("port {0} is out of range ({}-65535)", MIN_PORT)]
    PortOutOfRange(u16),

    /// The bind address is neither empty nor an IPv4 literal.
    #[error("could not translate IP address '{0}'")]
    InvalidBindAddress(String),

    /// The supervisor mode string is not recognised.
    #[error("invalid supervisor mode '{0}' (expected \"parent\", \"none\" or \"pid:<n>\")")]
    InvalidSupervisorMode(String),

    /// A file system I/O error occurred.
    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// No replication state source is configured and the node was not
    /// explicitly declared a primary.
    #[error(
        "no replication status file configured (set --status-file, \
         REPLSTATUS_STATUS_FILE or [replication] status_file, or pass --assume-primary)"
    )]
    MissingStatusFile,
}

// ── Supervisor mode ───────────────────────────────────────────────────────────

/// How the server detects that the process supervising it has gone away.
///
/// When the supervisor disappears the server exits immediately with a
/// non-zero status and does no cleanup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum SupervisorMode {
    /// The parent process recorded at startup is the supervisor.
    #[default]
    Parent,
    /// A specific process id is the supervisor.
    Pid(u32),
    /// No supervisor; run until asked to shut down.
    None,
}

impl FromStr for SupervisorMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "parent" => Ok(Self::Parent),
            "none" => Ok(Self::None),
            other => other
                .strip_prefix("pid:")
                .and_then(|pid| pid.parse::<u32>().ok())
                .filter(|pid| *pid > 0)
                .map(Self::Pid)
                .ok_or_else(|| ConfigError::InvalidSupervisorMode(s.to_string())),
        }
    }
}

impl fmt::Display for SupervisorMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parent => f.write_str("parent"),
            Self::Pid(pid) => write!(f, "pid:{pid}"),
            Self::None => f.write_str("none"),
        }
    }
}

impl TryFrom<String> for SupervisorMode {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<SupervisorMode> for String {
    fn from(mode: SupervisorMode) -> Self {
        mode.to_string()
    }
}

// ── Validated configuration ───────────────────────────────────────────────────

/// All runtime configuration for the status server.
///
/// Built once at startup and never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// TCP port, within `MIN_PORT..=65535`.
    pub port: u16,

    /// IPv4 address to bind to.  `None` binds all interfaces.
    pub bind_address: Option<Ipv4Addr>,

    /// JSON document describing the node's replication state.
    ///
    /// `None` is only accepted together with `--assume-primary`, in which case
    /// the node is always reported as a primary.
    pub status_file: Option<PathBuf>,

    /// How supervisor loss is detected.
    pub supervisor: SupervisorMode,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            bind_address: None,
            status_file: None,
            supervisor: SupervisorMode::Parent,
        }
    }
}

impl ServerConfig {
    /// The socket address the listener binds to.
    pub fn socket_addr(&self) -> SocketAddrV4 {
        SocketAddrV4::new(self.bind_address.unwrap_or(Ipv4Addr::UNSPECIFIED), self.port)
    }
}

/// Checks that `port` is not a privileged port.
///
/// # Errors
///
/// Returns [`ConfigError::PortOutOfRange`] for ports below [`MIN_PORT`].
pub fn validate_port(port: u16) -> Result<u16, ConfigError> {
    if port < MIN_PORT {
        return Err(ConfigError::PortOutOfRange(port));
    }
    Ok(port)
}

/// Parses the bind address setting.  Empty means all interfaces.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidBindAddress`] if `raw` is not an IPv4 literal.
pub fn parse_bind_address(raw: &str) -> Result<Option<Ipv4Addr>, ConfigError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    raw.parse::<Ipv4Addr>()
        .map(Some)
        .map_err(|_| ConfigError::InvalidBindAddress(raw.to_string()))
}

// ── TOML file schema ──────────────────────────────────────────────────────────

/// On-disk configuration, before validation.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ConfigFile {
    #[serde(default)]
    pub server: ServerSection,
    #[serde(default)]
    pub replication: ReplicationSection,
    #[serde(default)]
    pub supervisor: SupervisorSection,
}

/// `[server]` section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerSection {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub bind_address: String,
}

/// `[replication]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ReplicationSection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_file: Option<PathBuf>,
}

/// `[supervisor]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SupervisorSection {
    #[serde(default)]
    pub mode: SupervisorMode,
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            port: default_port(),
            bind_address: String::new(),
        }
    }
}

/// Values supplied on the command line or through environment variables.
///
/// Every field that is `Some` replaces the corresponding file value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigOverrides {
    pub port: Option<u16>,
    pub bind_address: Option<String>,
    pub status_file: Option<PathBuf>,
    pub supervisor: Option<SupervisorMode>,
}

impl ConfigFile {
    /// Parses TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] if the TOML is malformed or a field has
    /// the wrong type.
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Applies overrides and validates the result.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::PortOutOfRange`] or
    /// [`ConfigError::InvalidBindAddress`] for invalid final values.
    pub fn resolve(self, overrides: ConfigOverrides) -> Result<ServerConfig, ConfigError> {
        let port = validate_port(overrides.port.unwrap_or(self.server.port))?;
        let bind_raw = overrides.bind_address.unwrap_or(self.server.bind_address);
        let bind_address = parse_bind_address(&bind_raw)?;

        Ok(ServerConfig {
            port,
            bind_address,
            status_file: overrides.status_file.or(self.replication.status_file),
            supervisor: overrides.supervisor.unwrap_or(self.supervisor.mode),
        })
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
