//! Leveled logging for the cloak runtime.
//!
//! A small, dependency-free logger: a process-wide atomic level, colored
//! output on stderr and macros that capture the calling module path.
//!
//! Hook dispatch is on the hot path of every LOAD/STORE, so the macros check
//! the level before formatting anything.
//!
//! # Example
//!
//! ```
//! use cloak_log::{debug, info, trace, Level};
//!
//! cloak_log::set_level(Level::Debug);
//!
//! info!("module namespace ready");
//! debug!("first bind of {}", "x");
//! trace!("this one is filtered out");
//! ```

use std::fmt::Arguments;
use std::io::Write;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};

/// Severity of a log record. Lower values are more severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Level {
    /// Failures that abort an operation.
    Error = 0,
    /// Suspicious situations, such as a tripped reentrancy guard.
    Warn = 1,
    /// Lifecycle messages.
    Info = 2,
    /// Binding-level events (first binds, raw writes, unbinds).
    Debug = 3,
    /// Every hook dispatch.
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

    const fn color_code(self) -> &'static str {
        match self {
            Level::Error => "\x1b[31m",
            Level::Warn => "\x1b[33m",
            Level::Info => "\x1b[32m",
            Level::Debug => "\x1b[36m",
            Level::Trace => "\x1b[35m",
        }
    }

    /// Upper-case name of the level.
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

    const fn from_u8(raw: u8) -> Level {
        match raw {
            0 => Level::Error,
            1 => Level::Warn,
            3 => Level::Debug,
            4 => Level::Trace,
            _ => Level::Info,
        }
    }
}

impl FromStr for Level {
    type Err = ParseLevelError;

    /// Parses a level name, ignoring ASCII case.
    ///
    /// ```
    /// use cloak_log::Level;
    ///
    /// assert_eq!("trace".parse::<Level>(), Ok(Level::Trace));
    /// assert!("loud".parse::<Level>().is_err());
    /// ```
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Level::ALL
            .into_iter()
            .find(|level| level.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ParseLevelError(s.to_string()))
    }
}

impl std::fmt::Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a string does not name a [`Level`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseLevelError(String);

impl std::fmt::Display for ParseLevelError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "invalid log level '{}' (expected error, warn, info, debug or trace)",
            self.0
        )
    }
}

impl std::error::Error for ParseLevelError {}

/// The process-wide logger.
pub struct Logger {
    level: AtomicU8,
    color: AtomicBool,
}

impl Logger {
    const fn new(level: Level) -> Self {
        Logger {
            level: AtomicU8::new(level as u8),
            color: AtomicBool::new(true),
        }
    }

    /// Sets the most verbose level that is still emitted.
    pub fn set_level(&self, level: Level) {
        self.level.store(level as u8, Ordering::Relaxed);
    }

    /// Current level.
    pub fn level(&self) -> Level {
        Level::from_u8(self.level.load(Ordering::Relaxed))
    }

    /// Whether a record at `level` would be written.
    #[inline]
    pub fn enabled(&self, level: Level) -> bool {
        level as u8 <= self.level.load(Ordering::Relaxed)
    }

    /// Turns ANSI colors on or off.
    pub fn set_color(&self, enabled: bool) {
        self.color.store(enabled, Ordering::Relaxed);
    }
}

static LOGGER: Logger = Logger::new(Level::Warn);

/// The global logger. Defaults to [`Level::Warn`].
#[must_use]
pub fn get_logger() -> &'static Logger {
    &LOGGER
}

/// Sets the global level.
pub fn set_level(level: Level) {
    LOGGER.set_level(level);
}

/// Sets the global level from its name.
///
/// # Errors
///
/// Returns [`ParseLevelError`] when `s` is not a level name; the level is
/// left unchanged.
pub fn set_level_from_str(s: &str) -> Result<(), ParseLevelError> {
    set_level(s.parse()?);
    Ok(())
}

/// Configures the logger from the environment.
///
/// Reads the level from `var` (for example `CLOAK_LOG=debug`) and disables
/// colors when `NO_COLOR` is set. An unset variable keeps the current level.
///
/// # Errors
///
/// Returns [`ParseLevelError`] when the variable holds an unknown level.
pub fn init_from_env(var: &str) -> Result<(), ParseLevelError> {
    if std::env::var_os("NO_COLOR").is_some() {
        LOGGER.set_color(false);
    }
    match std::env::var(var) {
        Ok(value) if !value.trim().is_empty() => set_level_from_str(&value),
        _ => Ok(()),
    }
}

#[doc(hidden)]
pub fn __log_with_target(level: Level, target: &str, args: Arguments<'_>) {
    const RESET: &str = "\x1b[0m";

    if !LOGGER.enabled(level) {
        return;
    }

    let mut stderr = std::io::stderr().lock();
    // A failed write to stderr has nowhere better to go.
    let _ = if LOGGER.color.load(Ordering::Relaxed) {
        writeln!(
            stderr,
            "{}[{}]{RESET} {target}: {args}",
            level.color_code(),
            level.as_str()
        )
    } else {
        writeln!(stderr, "[{}] {target}: {args}", level.as_str())
    };
}

/// Logs at an explicit level.
///
/// ```
/// use cloak_log::{log, Level};
///
/// log!(level: Level::Info, "bound {} names", 3);
/// ```
#[macro_export]
macro_rules! log {
    (level: $level:expr, $($arg:tt)*) => {{
        let level = $level;
        if $crate::get_logger().enabled(level) {
            $crate::__log_with_target(level, module_path!(), format_args!($($arg)*));
        }
    }};
}

/// Logs at [`Level::Error`](crate::Level::Error).
#[macro_export]
macro_rules! error {
    ($($arg:tt)*) => { $crate::log!(level: $crate::Level::Error, $($arg)*) };
}

/// Logs at [`Level::Warn`](crate::Level::Warn).
#[macro_export]
macro_rules! warn {
    ($($arg:tt)*) => { $crate::log!(level: $crate::Level::Warn, $($arg)*) };
}

/// Logs at [`Level::Info`](crate::Level::Info).
#[macro_export]
macro_rules! info {
    ($($arg:tt)*) => { $crate::log!(level: $crate::Level::Info, $($arg)*) };
}

/// Logs at [`Level::Debug`](crate::Level::Debug).
#[macro_export]
macro_rules! debug {
    ($($arg:tt)*) => { $crate::log!(level: $crate::Level::Debug, $($arg)*) };
}

/// Logs at [`Level::Trace`](crate::Level::Trace).
#[macro_export]
macro_rules! trace {
    ($($arg:tt)*) => { $crate::log!(level: $crate::Level::Trace, $($arg)*) };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_ordering() {
        assert!(Level::Error < Level::Warn);
        assert!(Level::Warn < Level::Info);
        assert!(Level::Info < Level::Debug);
        assert!(Level::Debug < Level::Trace);
    }

    #[test]
    fn test_level_parse() {
        assert_eq!("error".parse::<Level>(), Ok(Level::Error));
        assert_eq!("WARN".parse::<Level>(), Ok(Level::Warn));
        assert_eq!(" Info ".parse::<Level>(), Ok(Level::Info));
        assert_eq!("debug".parse::<Level>(), Ok(Level::Debug));
        assert_eq!("TRACE".parse::<Level>(), Ok(Level::Trace));
        assert!("verbose".parse::<Level>().is_err());
    }

    #[test]
    fn test_parse_error_message() {
        let err = "verbose".parse::<Level>().unwrap_err();
        assert!(err.to_string().contains("verbose"));
    }

    #[test]
    fn test_logger_filtering() {
        let logger = Logger::new(Level::Info);
        assert!(logger.enabled(Level::Error));
        assert!(logger.enabled(Level::Info));
        assert!(!logger.enabled(Level::Debug));

        logger.set_level(Level::Trace);
        assert!(logger.enabled(Level::Trace));
        assert_eq!(logger.level(), Level::Trace);
    }

    #[test]
    fn test_level_roundtrip_through_u8() {
        for level in Level::ALL {
            assert_eq!(Level::from_u8(level as u8), level);
        }
    }

    #[test]
    fn test_macros_do_not_panic() {
        let logger = Logger::new(Level::Error);
        logger.set_color(false);
        info!("filtered {}", 1);
        error!("emitted {}", 2);
    }
}
