//! Forwards `log` records to a host-provided [`Logger`].
//!
//! Hosts that embed the client (mobile or desktop shells) install their own
//! sink once with [`set_logger`]. Debug and trace records from other crates
//! (HTTP internals, TLS) are dropped; everything from `expense_core` is
//! forwarded.

use std::sync::{Arc, OnceLock};

/// A sink for the client's log messages.
///
/// ```rust
/// use expense_core::logger::{LogLevel, Logger};
///
/// struct StderrLogger;
///
/// impl Logger for StderrLogger {
///     fn log(&self, level: LogLevel, message: String) {
///         eprintln!("[{level:?}] {message}");
///     }
/// }
/// ```
#[cfg_attr(feature = "ffi", uniffi::export(with_foreign))]
pub trait Logger: Sync + Send {
    /// Records one message.
    fn log(&self, level: LogLevel, message: String);
}

/// Severity of a log message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "ffi", derive(uniffi::Enum))]
pub enum LogLevel {
    /// Very detailed tracing.
    Trace,
    /// Debugging information.
    Debug,
    /// Progress of normal operation.
    Info,
    /// Something unexpected that the client recovered from.
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

/// Whether a record should reach the host sink.
fn is_forwarded(metadata: &log::Metadata<'_>) -> bool {
    let is_own = metadata.target().starts_with("expense");
    let is_verbose = matches!(metadata.level(), log::Level::Debug | log::Level::Trace);
    is_own || !is_verbose
}

impl log::Log for ForeignLogger {
    fn enabled(&self, metadata: &log::Metadata<'_>) -> bool {
        is_forwarded(metadata)
    }

    fn log(&self, record: &log::Record<'_>) {
        if !self.enabled(record.metadata()) {
            return;
        }
        if let Some(logger) = LOGGER_INSTANCE.get() {
            logger.log(record.level().into(), record.args().to_string());
        }
    }

    fn flush(&self) {}
}

static LOGGER_INSTANCE: OnceLock<Arc<dyn Logger>> = OnceLock::new();

/// Installs `logger` as the destination of all client log output.
///
/// Only the first call has an effect. It also fails silently (with a message
/// on stderr) when another `log` implementation was already installed by the
/// host process.
#[cfg_attr(feature = "ffi", uniffi::export)]
pub fn set_logger(logger: Arc<dyn Logger>) {
    if LOGGER_INSTANCE.set(logger).is_err() {
        eprintln!("expense-core logger already set");
        return;
    }

    static LOGGER: ForeignLogger = ForeignLogger;
    match log::set_logger(&LOGGER) {
        Ok(()) => log::set_max_level(log::LevelFilter::Trace),
        Err(e) => eprintln!("failed to install expense-core logger: {e}"),
    }
}
