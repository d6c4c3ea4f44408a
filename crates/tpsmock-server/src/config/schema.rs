use std::collections::HashSet;
use std::str::FromStr;

use serde::Deserialize;
use tracing::level_filters::LevelFilter;

use tpsmock_core::endpoint::{builtin_seeds, EndpointSeed};
use tpsmock_core::error::{MockError, Result};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    #[serde(default)]
    pub server: ServerSection,

    #[serde(default)]
    pub logging: LoggingSection,

    #[serde(default)]
    pub default_webhooks: Vec<EndpointSeed>,
}

impl ServerConfig {
    /// Config used when no file is present: default sections plus the
    /// `default`, `fast` and `slow` endpoints.
    pub fn builtin() -> Self {
        Self {
            server: ServerSection::default(),
            logging: LoggingSection::default(),
            default_webhooks: builtin_seeds(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.server.validate()?;
        self.logging.validate()?;

        let mut ids = HashSet::new();
        for w in &self.default_webhooks {
            if !ids.insert(w.id.as_str()) {
                return Err(MockError::InvalidConfig(format!(
                    "default_webhooks: duplicate id {}",
                    w.id
                )));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerSection {
    /// Host used when printing URLs; the listener binds all interfaces.
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl ServerSection {
    pub fn validate(&self) -> Result<()> {
        if self.port == 0 {
            return Err(MockError::InvalidConfig("server.port must be non-zero".into()));
        }
        if self.host.trim().is_empty() {
            return Err(MockError::InvalidConfig("server.host must not be empty".into()));
        }
        Ok(())
    }

    pub fn listen_addr(&self) -> String {
        format!("0.0.0.0:{}", self.port)
    }

    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}

fn default_host() -> String {
    "localhost".into()
}
fn default_port() -> u16 {
    8080
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingSection {
    /// Appended to alongside stdout. `null` disables the file.
    #[serde(default = "default_log_file")]
    pub log_file: Option<String>,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub log_format: LogFormat,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            log_file: default_log_file(),
            log_level: default_log_level(),
            log_format: LogFormat::default(),
        }
    }
}

impl LoggingSection {
    pub fn validate(&self) -> Result<()> {
        LevelFilter::from_str(&self.log_level).map_err(|_| {
            MockError::InvalidConfig(format!(
                "logging.log_level must be one of off/error/warn/info/debug/trace, got {:?}",
                self.log_level
            ))
        })?;
        if let Some(f) = &self.log_file {
            if f.trim().is_empty() {
                return Err(MockError::InvalidConfig("logging.log_file must not be empty".into()));
            }
        }
        Ok(())
    }
}

fn default_log_file() -> Option<String> {
    Some("webhook.log".into())
}
fn default_log_level() -> String {
    "info".into()
}
