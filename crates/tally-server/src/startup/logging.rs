//! Logging initialization
//!
//! Console output always; optional daily-rolling file output through a
//! non-blocking appender. The returned guard must be held for the
//! process lifetime or buffered file output is lost.

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt};

/// Logging settings resolved from configuration
#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub console_level: String,
    pub file_level: String,
    pub file_logging: bool,
    pub log_dir: String,
}

/// Keeps the non-blocking writers alive
pub struct LoggingGuard {
    _guards: Vec<WorkerGuard>,
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` overrides the configured console level when set.
pub fn init_logging(config: &LoggingConfig) -> anyhow::Result<LoggingGuard> {
    let mut guards: Vec<WorkerGuard> = Vec::new();
    let mut layers: Vec<Box<dyn Layer<Registry> + Send + Sync>> = Vec::new();

    let console_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.console_level.clone()));
    let console_layer = fmt::layer()
        .with_target(true)
        .with_filter(console_filter);
    layers.push(Box::new(console_layer));

    if config.file_logging {
        std::fs::create_dir_all(&config.log_dir)?;
        let appender = RollingFileAppender::new(Rotation::DAILY, &config.log_dir, "tally.log");
        let (non_blocking, guard) = tracing_appender::non_blocking(appender);
        guards.push(guard);

        let file_layer = fmt::layer()
            .with_ansi(false)
            .with_writer(non_blocking)
            .with_filter(EnvFilter::new(config.file_level.clone()));
        layers.push(Box::new(file_layer));
    }

    tracing_subscriber::registry().with(layers).try_init()?;
    Ok(LoggingGuard { _guards: guards })
}
