use crate::config::config::LoggingConfig;
use crate::utils::app_paths::AppPaths;
use anyhow::{Context, Result};
use chrono::Local;
use std::fs::File;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Build the env filter: `RUST_LOG` wins over the configured level
fn build_filter(config: &LoggingConfig) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level))
}

/// Timestamped log file inside the platform log directory
fn create_log_file() -> Result<(File, PathBuf)> {
    let timestamp = Local::now().format("%Y%m%d_%H%M%S");
    let path = AppPaths::log_dir()?.join(format!("tablekit_{}.log", timestamp));
    let file = File::create(&path).with_context(|| format!("Failed to create {:?}", path))?;
    Ok((file, path))
}

/// Initialize tracing with a compact stderr layer and an optional file layer.
///
/// Returns the log file path when file logging is enabled. Calling this twice
/// is harmless: the second global-subscriber install is ignored.
pub fn init_tracing(config: &LoggingConfig) -> Result<Option<PathBuf>> {
    let (file_layer, log_path) = if config.log_to_file {
        let (file, path) = create_log_file()?;
        let layer = fmt::layer()
            .with_writer(Mutex::new(file))
            .with_target(true)
            .with_ansi(false);
        (Some(layer), Some(path))
    } else {
        (None, None)
    };

    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true)
        .compact();

    let installed = tracing_subscriber::registry()
        .with(build_filter(config))
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .is_ok();

    if installed {
        tracing::debug!("Tracing initialized (level={})", config.level);
    }
    Ok(log_path)
}
