use std::fs::{self, OpenOptions};
use std::path::Path;
use std::sync::Mutex;

use tracing_error::ErrorLayer;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use crate::domain::KennelError;

pub const DEFAULT_FILTER: &str = "info";

pub fn build_filter(default_filter: &str) -> Result<EnvFilter, KennelError> {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_filter))
        .map_err(|e| KennelError::Logging(e.to_string()))
}

pub fn init(path: &Path, default_filter: &str) -> Result<(), KennelError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let file = OpenOptions::new().create(true).append(true).open(path)?;

    tracing_subscriber::registry()
        .with(build_filter(default_filter)?)
        .with(
            fmt::layer()
                .with_ansi(false)
                .with_target(true)
                .with_writer(Mutex::new(file)),
        )
        .with(ErrorLayer::default())
        .try_init()
        .map_err(|e| KennelError::Logging(e.to_string()))
}
