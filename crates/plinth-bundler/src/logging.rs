//! Subscriber setup for binaries embedding plinth.
//!
//! Only available with the `logging` feature. The library itself only emits
//! `tracing` events: one span per manifest build and one per compile.

use std::sync::atomic::{AtomicBool, Ordering};

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

static INSTALLED: AtomicBool = AtomicBool::new(false);

/// How much of the pipeline to show.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogLevel {
    Silent,
    Error,
    Warn,
    /// Batch and artifact progress from the plinth crates.
    #[default]
    Info,
    /// Per-compile and per-fetch detail from the plinth crates.
    Debug,
}

impl LogLevel {
    /// `EnvFilter` directives for this level.
    pub fn directives(&self) -> &'static str {
        match self {
            LogLevel::Silent => "off",
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "plinth=info,plinth_bundler=info",
            LogLevel::Debug => "plinth=debug,plinth_bundler=debug",
        }
    }
}

impl std::str::FromStr for LogLevel {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "silent" | "off" => Ok(LogLevel::Silent),
            "error" => Ok(LogLevel::Error),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "info" => Ok(LogLevel::Info),
            "debug" => Ok(LogLevel::Debug),
            other => Err(format!("Invalid log level: {}", other)),
        }
    }
}

/// Subscriber settings.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogConfig {
    /// Fixed level; `None` reads `RUST_LOG` and falls back to [`LogLevel::Info`].
    pub level: Option<LogLevel>,
    /// Colored level names.
    pub ansi: bool,
}

/// Filter for `level`, or for `RUST_LOG` when no level is fixed.
pub fn filter(level: Option<LogLevel>) -> EnvFilter {
    match level {
        Some(level) => EnvFilter::new(level.directives()),
        None => EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(LogLevel::Info.directives())),
    }
}

/// Install the global subscriber.
///
/// Returns `false` when a subscriber was already installed, by this module or
/// by someone else.
pub fn init_with(config: LogConfig) -> bool {
    if INSTALLED.swap(true, Ordering::AcqRel) {
        return false;
    }
    let layer = fmt::layer()
        .compact()
        .with_target(false)
        .with_level(true)
        .with_ansi(config.ansi);
    tracing_subscriber::registry()
        .with(filter(config.level))
        .with(layer)
        .try_init()
        .is_ok()
}

/// Log at `level` with colors.
///
/// ```rust,no_run
/// use plinth_bundler::logging::{init_logging, LogLevel};
///
/// init_logging(LogLevel::Debug);
/// ```
pub fn init_logging(level: LogLevel) {
    init_with(LogConfig {
        level: Some(level),
        ansi: true,
    });
}

/// Log according to `RUST_LOG`, defaulting to [`LogLevel::Info`].
pub fn init_logging_from_env() {
    init_with(LogConfig {
        level: None,
        ansi: true,
    });
}
