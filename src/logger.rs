//! Tracing subscriber setup.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::{
    config::{LogFormat, Logger},
    Error, Result,
};

const MODULES: &[&str] = &["ontology_vault"];

/// Builds the filter: `RUST_LOG` wins, then the configured override, then
/// the configured level for this crate.
fn filter(config: &Logger) -> Result<EnvFilter> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    let directives = config.override_filter.clone().unwrap_or_else(|| {
        MODULES
            .iter()
            .map(|module| format!("{module}={}", config.level.as_str()))
            .collect::<Vec<_>>()
            .join(",")
    });
    EnvFilter::try_new(directives).map_err(|e| Error::Logger(e.to_string()))
}

/// Installs the global subscriber.
///
/// A disabled logger installs nothing, and a second call after a successful
/// one is a no-op.
///
/// # Errors
///
/// [`Error::Logger`] when the filter directives are invalid.
pub fn init(config: &Logger) -> Result<()> {
    if !config.enable {
        return Ok(());
    }

    let layer = match config.format {
        LogFormat::Compact => fmt::layer().compact().boxed(),
        LogFormat::Pretty => fmt::layer().pretty().boxed(),
        LogFormat::Json => fmt::layer().json().boxed(),
    };

    let installed = tracing_subscriber::registry()
        .with(layer.with_filter(filter(config)?))
        .try_init();
    if let Err(error) = installed {
        tracing::debug!(err.msg = %error, "logger_already_initialized");
    }
    Ok(())
}
