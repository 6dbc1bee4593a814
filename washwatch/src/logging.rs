//! Logging setup: env-filtered stdout output plus an optional daily-rolling
//! log file.

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::Result;

/// Default log filter directive.
pub const DEFAULT_LOG_FILTER: &str = "washwatch=info,rooms_status=info";

/// Initialize the global subscriber.
///
/// Returns the appender guard when file logging is enabled — keep it alive
/// for the process lifetime or buffered lines are lost.
pub fn init_logging(log_dir: Option<&str>) -> Result<Option<WorkerGuard>> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    let registry = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_ansi(true));

    match log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            let file_appender = tracing_appender::rolling::daily(dir, "washwatch.log");
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
            registry
                .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
                .try_init()
                .map_err(|error| {
                    crate::Error::Other(format!("Failed to set global subscriber: {error}"))
                })?;
            Ok(Some(guard))
        }
        None => {
            registry.try_init().map_err(|error| {
                crate::Error::Other(format!("Failed to set global subscriber: {error}"))
            })?;
            Ok(None)
        }
    }
}
