//! Loading the optional TOML configuration file.
//!
//! ```toml
//! [server]
//! port = 5400
//! bind_address = "10.0.0.7"
//!
//! [replication]
//! status_file = "/run/db/replication.json"
//!
//! [supervisor]
//! mode = "pid:4242"
//! ```
//!
//! Every key is optional.  Without a file the built-in defaults apply.

use std::path::Path;

use crate::domain::config::{ConfigError, ConfigFile};

/// Reads and parses the configuration file at `path`.
///
/// `None` yields the defaults.  A path that was given explicitly but does not
/// exist is an error; silently falling back would start the server on the
/// wrong port.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] if the file cannot be read or
/// [`ConfigError::Parse`] if it is not valid TOML for the schema.
pub fn load_config_file(path: Option<&Path>) -> Result<ConfigFile, ConfigError> {
    let Some(path) = path else {
        return Ok(ConfigFile::default());
    };
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    ConfigFile::from_toml(&content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::config::{ConfigOverrides, SupervisorMode, DEFAULT_PORT};
    use std::path::PathBuf;

    #[test]
    fn test_no_path_gives_defaults() {
        assert_eq!(load_config_file(None).unwrap(), ConfigFile::default());
    }

    #[test]
    fn test_missing_explicit_file_is_io_error() {
        let path = PathBuf::from("/nonexistent/path/that/cannot/exist/replstatus.toml");
        assert!(matches!(
            load_config_file(Some(&path)),
            Err(ConfigError::Io { .. })
        ));
    }

    #[test]
    fn test_loads_and_resolves_file() {
        // Arrange
        let path = std::env::temp_dir().join(format!("replstatus_cfg_{}.toml", std::process::id()));
        std::fs::write(
            &path,
            "[server]\nport = 6432\n\n[supervisor]\nmode = \"none\"\n",
        )
        .unwrap();

        // Act
        let config = load_config_file(Some(&path))
            .unwrap()
            .resolve(ConfigOverrides::default())
            .unwrap();

        // Assert
        assert_eq!(config.port, 6432);
        assert_ne!(config.port, DEFAULT_PORT);
        assert_eq!(config.supervisor, SupervisorMode::None);

        // Cleanup
        std::fs::remove_file(&path).ok();
    }
}
