/*!
 * Logging Module
 * Subscriber setup and request logging middleware
 */
pub mod config;
pub mod middleware;

use std::io;
use tracing_appender::{non_blocking, non_blocking::WorkerGuard, rolling};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::config::Config;
use config::LogSettings;

/// Initialize the logging system. The returned guards flush the
/// non-blocking writers on drop and must live as long as the process.
pub fn init(app_config: &Config) -> anyhow::Result<Vec<WorkerGuard>> {
    let settings = LogSettings::from_config(app_config);

    std::fs::create_dir_all(&settings.dir)?;

    // File appender for all logs
    let file_appender = rolling::daily(&settings.dir, "app.log");
    let (file_writer, file_guard) = non_blocking(file_appender);

    // File appender for errors only
    let error_appender = rolling::daily(&settings.dir, "error.log");
    let (error_writer, error_guard) = non_blocking(error_appender);

    let (console_writer, console_guard) = non_blocking(io::stdout());

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(settings.filter_directive()));

    let subscriber = tracing_subscriber::registry().with(env_filter);


    if settings.json {
        let file_layer = fmt::layer()
            .json()
            .with_writer(file_writer)
            .with_target(true)
            .with_thread_ids(true)
            .with_thread_names(true)
            .with_file(true)
            .with_line_number(true);

        let console_layer = fmt::layer()
            .json()
            .with_writer(console_writer)
            .with_target(true);

        subscriber
            .with(file_layer)
            .with(error_layer(error_writer))
            .with(console_layer)
            .try_init()?;
    } else {
        let file_layer = fmt::layer()
            .with_writer(file_writer)
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .with_ansi(false);

        let console_layer = fmt::layer()
            .with_writer(console_writer)
            .with_target(true)
            .pretty();

        subscriber
            .with(file_layer)
            .with(error_layer(error_writer))
            .with(console_layer)
            .try_init()?;
    }

    tracing::info!(
        environment = %app_config.environment,
        level = %settings.level,
        dir = %settings.dir,
        "Logging initialized"
    );

    Ok(vec![file_guard, error_guard, console_guard])
}

fn error_layer<S>(error_writer: non_blocking::NonBlocking) -> impl Layer<S>
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
{
    fmt::layer()
        .json()
        .with_writer(error_writer)
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .with_filter(tracing_subscriber::filter::LevelFilter::ERROR)
}
