//! Domain layer for replstatus.
//!
//! Holds the startup configuration.  Everything here is plain data that is
//! built once before the listener is bound and never changes afterwards;
//! changing the port or address requires a restart.

pub mod config;

pub use config::{ConfigError, ConfigFile, ConfigOverrides, ServerConfig, SupervisorMode};
