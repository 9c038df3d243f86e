//! Leveled logging for the `classlink` runtime.
//!
//! A small, dependency-free logger: one process-wide level held in an
//! atomic, macros that capture the calling module path, and colored level
//! tags written to stderr.
//!
//! # Example
//!
//! ```
//! use classlink_log::{Level, debug, warn};
//!
//! classlink_log::set_level(Level::Debug);
//!
//! debug!("registered class {}", "vector");
//! warn!("class {} adds fields but keeps the root clone", "matrix");
//! ```
//!
//! The level can also be taken from the environment:
//!
//! ```
//! // CLASSLINK_LOG=trace enables everything; unset keeps the current level.
//! classlink_log::init_from_env("CLASSLINK_LOG").unwrap();
//! ```

use std::fmt::{self, Arguments};
use std::io::Write;
use std::str::FromStr;
use std::sync::atomic::{AtomicU8, Ordering};

/// Severity of a log record, most severe first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Level {
    /// Broken invariants and failed operations.
    Error = 0,
    /// Suspicious but recoverable situations.
    Warn = 1,
    /// Coarse lifecycle events.
    Info = 2,
    /// Registration and dispatch decisions.
    Debug = 3,
    /// Per-instance events.
    Trace = 4,
}

impl Level {
    const ALL: [Level; 5] = [
        Level::Error,
        Level::Warn,
        Level::Info,
        Level::Debug,
        Level::Trace,
    ];

    /// Upper-case tag used in log lines.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Level::Error => "ERROR",
            Level::Warn => "WARN",
            Level::Info => "INFO",
            Level::Debug => "DEBUG",
            Level::Trace => "TRACE",
        }
    }

    const fn color(self) -> &'static str {
        match self {
            Level::Error => "\x1b[31m",
            Level::Warn => "\x1b[33m",
            Level::Info => "\x1b[32m",
            Level::Debug => "\x1b[36m",
            Level::Trace => "\x1b[35m",
        }
    }

    fn from_u8(raw: u8) -> Level {
        Level::ALL
            .get(usize::from(raw))
            .copied()
            .unwrap_or(Level::Trace)
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a level name cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseLevelError(String);

impl fmt::Display for ParseLevelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown log level `{}`", self.0)
    }
}

impl std::error::Error for ParseLevelError {}

impl FromStr for Level {
    type Err = ParseLevelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Level::ALL
            .into_iter()
            .find(|level| level.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| ParseLevelError(trimmed.to_string()))
    }
}

/// Process-wide level filter.
pub struct Logger {
    level: AtomicU8,
}

impl Logger {
    const fn new(level: Level) -> Self {
        Logger {
            level: AtomicU8::new(level as u8),
        }
    }

    /// Sets the most verbose level that will still be emitted.
    pub fn set_level(&self, level: Level) {
        self.level.store(level as u8, Ordering::Relaxed);
    }

    /// Returns the current level.
    #[must_use]
    pub fn level(&self) -> Level {
        Level::from_u8(self.level.load(Ordering::Relaxed))
    }

    /// Returns `true` if records at `level` pass the filter.
    #[must_use]
    pub fn enabled(&self, level: Level) -> bool {
        level as u8 <= self.level.load(Ordering::Relaxed)
    }
}

static LOGGER: Logger = Logger::new(Level::Warn);

/// Returns the global logger. The default level is [`Level::Warn`].
#[must_use]
pub fn logger() -> &'static Logger {
    &LOGGER
}

/// Sets the global level.
pub fn set_level(level: Level) {
    LOGGER.set_level(level);
}

/// Reads a level name from the environment variable `var`.
///
/// An unset or empty variable leaves the level untouched and returns
/// `Ok(None)`.
///
/// # Errors
///
/// Returns [`ParseLevelError`] if the variable holds an unknown level name.
pub fn init_from_env(var: &str) -> Result<Option<Level>, ParseLevelError> {
    match std::env::var(var) {
        Ok(value) if !value.trim().is_empty() => {
            let level = value.parse::<Level>()?;
            set_level(level);
            Ok(Some(level))
        }
        _ => Ok(None),
    }
}

#[doc(hidden)]
pub fn __emit(level: Level, target: &str, args: Arguments<'_>) {
    const RESET: &str = "\x1b[0m";

    let stderr = std::io::stderr();
    let mut out = stderr.lock();
    // A failed log write has nowhere better to go.
    let _ = writeln!(out, "{}[{level}]{RESET} {target}: {args}", level.color());
}

/// Logs at an explicit level.
///
/// ```
/// use classlink_log::{Level, log};
///
/// log!(level: Level::Info, "{} classes registered", 3);
/// ```
#[macro_export]
macro_rules! log {
    (level: $level:expr, $($arg:tt)*) => {{
        let level = $level;
        if $crate::logger().enabled(level) {
            $crate::__emit(level, module_path!(), format_args!($($arg)*));
        }
    }};
}

/// Logs at [`Level::Error`].
#[macro_export]
macro_rules! error {
    ($($arg:tt)*) => { $crate::log!(level: $crate::Level::Error, $($arg)*) };
}

/// Logs at [`Level::Warn`].
#[macro_export]
macro_rules! warn {
    ($($arg:tt)*) => { $crate::log!(level: $crate::Level::Warn, $($arg)*) };
}

/// Logs at [`Level::Info`].
#[macro_export]
macro_rules! info {
    ($($arg:tt)*) => { $crate::log!(level: $crate::Level::Info, $($arg)*) };
}

/// Logs at [`Level::Debug`].
#[macro_export]
macro_rules! debug {
    ($($arg:tt)*) => { $crate::log!(level: $crate::Level::Debug, $($arg)*) };
}

/// Logs at [`Level::Trace`].
#[macro_export]
macro_rules! trace {
    ($($arg:tt)*) => { $crate::log!(level: $crate::Level::Trace, $($arg)*) };
}
