//! Bridge from the crate's `tracing`/`log` output to the host app's logger.
//!
//! The core emits `tracing` events; with the `log` feature enabled those fall
//! through to the `log` facade when no subscriber is installed, which is the
//! case inside a mobile app. [`set_logger`] installs a `log::Log` that forwards
//! each record to a foreign [`Logger`].

use std::sync::{Arc, OnceLock};

/// Receiver for log lines, implemented by the host app.
///
/// ## Swift
///
/// ```swift
/// final class GoldKitLogBridge: GoldKit.Logger {
///     func log(level: GoldKit.LogLevel, message: String) {
///         os_log("%{public}@", log: .default, type: level.osLogType, message)
///     }
/// }
///
/// // once, in the app delegate
/// GoldKit.setLogger(logger: GoldKitLogBridge())
/// ```
#[uniffi::export(with_foreign)]
pub trait Logger: Sync + Send {
    /// Records `message` at `level`.
    fn log(&self, level: LogLevel, message: String);
}

/// Severity of a forwarded record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, uniffi::Enum)]
pub enum LogLevel {
    /// Very detailed tracing output.
    Trace,
    /// Debugging information.
    Debug,
    /// Progress of normal operation.
    Info,
    /// Something unexpected that the flow recovered from.
    Warn,
    /// A failed operation.
    Error,
}

impl From<log::Level> for LogLevel {
    fn from(level: log::Level) -> Self {
        match level {
            log::Level::Error => Self::Error,
            log::Level::Warn => Self::Warn,
            log::Level::Info => Self::Info,
            log::Level::Debug => Self::Debug,
            log::Level::Trace => Self::Trace,
        }
    }
}

struct ForeignLogger;

impl ForeignLogger {
    /// Debug and trace noise from dependencies (reqwest, hyper, rustls) is
    /// dropped; everything from this crate passes.
    fn accepts(metadata: &log::Metadata) -> bool {
        let from_goldkit = metadata.target().starts_with("goldkit");
        from_goldkit || metadata.level() <= log::Level::Info
    }
}

impl log::Log for ForeignLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        Self::accepts(metadata)
    }

    fn log(&self, record: &log::Record) {
        if !Self::accepts(record.metadata()) {
            return;
        }

        if let Some(logger) = LOGGER_INSTANCE.get() {
            logger.log(record.level().into(), format!("{}", record.args()));
        } else {
            eprintln!("Logger not set: {}", record.args());
        }
    }

    fn flush(&self) {}
}

static LOGGER_INSTANCE: OnceLock<Arc<dyn Logger>> = OnceLock::new();

/// Installs the host app's logger. Only the first call takes effect.
#[uniffi::export]
pub fn set_logger(logger: Arc<dyn Logger>) {
    if LOGGER_INSTANCE.set(logger).is_err() {
        eprintln!("Logger already set");
        return;
    }

    static LOGGER: ForeignLogger = ForeignLogger;
    if let Err(e) = log::set_logger(&LOGGER) {
        eprintln!("Failed to set logger: {e}");
        return;
    }
    log::set_max_level(log::LevelFilter::Trace);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dependency_debug_records_are_filtered() {
        let own = log::Metadata::builder()
            .target("goldkit_core::gate")
            .level(log::Level::Debug)
            .build();
        let dependency = log::Metadata::builder()
            .target("hyper::proto")
            .level(log::Level::Debug)
            .build();
        let dependency_warn = log::Metadata::builder()
            .target("hyper::proto")
            .level(log::Level::Warn)
            .build();

        assert!(ForeignLogger::accepts(&own));
        assert!(!ForeignLogger::accepts(&dependency));
        assert!(ForeignLogger::accepts(&dependency_warn));
    }

    #[test]
    fn test_level_mapping() {
        assert_eq!(LogLevel::from(log::Level::Warn), LogLevel::Warn);
        assert_eq!(LogLevel::from(log::Level::Trace), LogLevel::Trace);
    }
}
