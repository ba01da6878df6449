///! Logging configuration
///!
///! Console output goes to stderr so table/JSON output on stdout stays clean.

use std::io;
use std::path::PathBuf;

use tracing_appender::{non_blocking, non_blocking::WorkerGuard, rolling};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: String,
    /// Directory for an additional JSON log file
    pub file_dir: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            file_dir: None,
        }
    }
}

impl LoggingConfig {
    pub fn verbose(mut self, verbose: bool) -> Self {
        if verbose {
            self.level = "debug".to_string();
        }
        self
    }

    /// Initialize the global subscriber.
    ///
    /// `RUST_LOG` overrides the configured level. The returned guard must be
    /// held until exit so buffered file output is flushed.
    pub fn init(&self) -> anyhow::Result<Option<WorkerGuard>> {
        let env_filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&self.level));

        let console_layer = fmt::layer()
            .with_target(true)
            .with_level(true)
            .with_ansi(true)
            .with_writer(io::stderr);

        match &self.file_dir {
            Some(dir) => {
                let (writer, guard) = non_blocking(rolling::never(dir, "dbadmin.log"));
                let file_layer = fmt::layer()
                    .with_target(true)
                    .with_ansi(false)
                    .json()
                    .with_writer(writer);

                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(console_layer)
                    .with(file_layer)
                    .try_init()?;

                Ok(Some(guard))
            }
            None => {
                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(console_layer)
                    .try_init()?;

                Ok(None)
            }
        }
    }
}
