use std::str::FromStr;

use crate::config::Config;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogLevel::Trace => write!(f, "trace"),
            LogLevel::Debug => write!(f, "debug"),
            LogLevel::Info => write!(f, "info"),
            LogLevel::Warn => write!(f, "warn"),
            LogLevel::Error => write!(f, "error"),
        }
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            other => Err(format!("unknown log level '{other}'")),
        }
    }
}

/// Logging settings derived from [`Config`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSettings {
    pub level: LogLevel,
    pub dir: String,
    /// JSON output in production, pretty text otherwise.
    pub json: bool,
}

impl LogSettings {
    pub fn from_config(config: &Config) -> Self {
        let production = config.is_production();
        let fallback = if production {
            LogLevel::Info
        } else {
            LogLevel::Debug
        };
        let level = config
            .log_level
            .as_deref()
            .and_then(|raw| raw.parse().ok())
            .unwrap_or(fallback);

        Self {
            level,
            dir: config.log_dir.clone(),
            json: production,
        }
    }

    /// Used when `RUST_LOG` is not set.
    pub fn filter_directive(&self) -> String {
        format!("folio_backend={},tower_http=debug,axum=debug", self.level)
    }
}
