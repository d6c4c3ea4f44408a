//! `tracing` subscriber setup from the `logging` config section.
//!
//! `RUST_LOG` takes precedence over `logging.log_level`. When `log_file` is
//! set, events go to stdout and are appended to the file.

use std::fs::OpenOptions;
use std::sync::Arc;

use tracing_subscriber::fmt::writer::{BoxMakeWriter, MakeWriterExt};
use tracing_subscriber::{fmt, EnvFilter};

use tpsmock_core::error::{MockError, Result};

use crate::config::{LogFormat, LoggingSection};

pub fn init(cfg: &LoggingSection) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&cfg.log_level));

    let writer = match &cfg.log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|e| MockError::Internal(format!("open log file {path}: {e}")))?;
            BoxMakeWriter::new(std::io::stdout.and(Arc::new(file)))
        }
        None => BoxMakeWriter::new(std::io::stdout),
    };

    let builder = fmt()
        .with_env_filter(filter)
        .with_ansi(cfg.log_file.is_none())
        .with_writer(writer);

    let res = match cfg.log_format {
        LogFormat::Text => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    res.map_err(|e| MockError::Internal(format!("logging init failed: {e}")))
}
