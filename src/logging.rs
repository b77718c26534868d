//! Structured logging configuration
//!
//! Provides:
//! - JSON output for production
//! - Pretty formatting for development
//! - Daily rolling log files
//! - `RUST_LOG` taking precedence over the configured level

use crate::config::{LoggingConfig, PathsConfig};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

const LOG_FILE_NAME: &str = "cost-optimizer.log";

/// Initialize the logging system. Keep the returned guard alive for the lifetime of the
/// process, or buffered file output is lost.
pub fn init_logging(logging: &LoggingConfig, paths: &PathsConfig) -> Option<WorkerGuard> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(logging.level.to_lowercase()));

    match logging.output.as_str() {
        "file" => Some(init_file_logging(env_filter, &logging.format, &paths.log_directory)),
        "both" => Some(init_combined_logging(env_filter, &logging.format, &paths.log_directory)),
        _ => {
            init_console_logging(env_filter, &logging.format);
            None
        }
    }
}

fn init_console_logging(filter: EnvFilter, format: &str) {
    let subscriber = tracing_subscriber::registry().with(filter);

    match format {
        "json" => {
            subscriber
                .with(
                    fmt::layer()
                        .json()
                        .with_writer(std::io::stderr)
                        .with_current_span(true)
                        .with_span_list(true)
                        .with_target(true)
                        .with_file(true)
                        .with_line_number(true),
                )
                .init();
        }
        _ => {
            subscriber
                .with(
                    fmt::layer()
                        .with_writer(std::io::stderr)
                        .with_target(true)
                        .with_ansi(true)
                        .with_span_events(FmtSpan::CLOSE),
                )
                .init();
        }
    }
}

fn init_file_logging(filter: EnvFilter, format: &str, log_dir: &std::path::Path) -> WorkerGuard {
    let file_appender = tracing_appender::rolling::daily(log_dir, LOG_FILE_NAME);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let subscriber = tracing_subscriber::registry().with(filter);

    match format {
        "json" => {
            subscriber
                .with(
                    fmt::layer()
                        .json()
                        .with_writer(non_blocking)
                        .with_current_span(true)
                        .with_span_list(true),
                )
                .init();
        }
        _ => {
            subscriber
                .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
                .init();
        }
    }

    guard
}

fn init_combined_logging(filter: EnvFilter, format: &str, log_dir: &std::path::Path) -> WorkerGuard {
    let file_appender = tracing_appender::rolling::daily(log_dir, LOG_FILE_NAME);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let subscriber = tracing_subscriber::registry().with(filter);

    match format {
        "json" => {
            subscriber
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .with(fmt::layer().json().with_writer(non_blocking))
                .init();
        }
        _ => {
            subscriber
                .with(fmt::layer().with_writer(std::io::stderr))
                .with(fmt::layer().with_ansi(false).with_writer(non_blocking))
                .init();
        }
    }

    guard
}
