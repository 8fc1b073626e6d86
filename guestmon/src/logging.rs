//! Process-wide `tracing` subscriber.

use crate::config::AgentOptions;
use crate::errors::{GuestmonError, GuestmonResult};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

const LOG_FILE_PREFIX: &str = "guestmon.log";

/// Install the global subscriber.
///
/// Logs go to stderr, and additionally to a daily-rotated file under
/// `options.log_dir` when set. `RUST_LOG` takes precedence over
/// `options.log_level`.
///
/// Keep the returned guard alive for the life of the process; dropping it
/// flushes and stops the file writer.
pub fn init_logging(options: &AgentOptions) -> GuestmonResult<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&options.log_level))
        .map_err(|e| GuestmonError::Config(format!("invalid log filter: {}", e)))?;

    let stderr_layer = fmt::layer().with_writer(std::io::stderr).with_target(true);

    let (file_layer, guard) = match &options.log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir).map_err(|e| {
                GuestmonError::Config(format!("failed to create log dir {}: {}", dir.display(), e))
            })?;
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().with_writer(writer).with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| GuestmonError::Internal(format!("logging already initialized: {}", e)))?;

    Ok(guard)
}
