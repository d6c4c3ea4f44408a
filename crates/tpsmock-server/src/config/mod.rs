//! Server config loader (strict parsing).

pub mod schema;

use std::fs;
use std::io::ErrorKind;

use tpsmock_core::error::{MockError, Result};

pub use schema::{LogFormat, LoggingSection, ServerConfig, ServerSection};

pub const DEFAULT_CONFIG_PATH: &str = "config.yaml";

/// Where the running config came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    File(String),
    /// No file at the given path; built-in endpoints are used.
    Builtin { missing: String },
}

pub fn load_from_file(path: &str) -> Result<ServerConfig> {
    let s = fs::read_to_string(path)
        .map_err(|e| MockError::Internal(format!("read config failed: {e}")))?;
    load_from_str(&s)
}

pub fn load_from_str(s: &str) -> Result<ServerConfig> {
    let cfg: ServerConfig = serde_yaml::from_str(s)
        .map_err(|e| MockError::InvalidConfig(format!("invalid yaml: {e}")))?;
    cfg.validate()?;
    Ok(cfg)
}

/// Load `path`, or fall back to [`ServerConfig::builtin`] when it does not
/// exist. A file that exists but does not parse is an error.
pub fn load_or_builtin(path: &str) -> Result<(ServerConfig, ConfigSource)> {
    match fs::read_to_string(path) {
        Ok(s) => Ok((load_from_str(&s)?, ConfigSource::File(path.to_string()))),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok((
            ServerConfig::builtin(),
            ConfigSource::Builtin {
                missing: path.to_string(),
            },
        )),
        Err(e) => Err(MockError::Internal(format!("read config failed ({path}): {e}"))),
    }
}
