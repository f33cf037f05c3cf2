//! Runtime configuration.
//!
//! Every namespace carries a [`Config`]. The defaults are what the demos and
//! tests use; [`Config::from_env`] lets a host process override them:
//!
//! | Variable | Field | Values |
//! |---|---|---|
//! | `CLOAK_REENTRANCY_GUARD` | `reentrancy_guard` | `1/0`, `true/false`, `on/off` |
//! | `CLOAK_MAX_HOOK_DEPTH` | `max_hook_depth` | positive integer |
//! | `CLOAK_LOG` | `log_level` | `error` .. `trace` |

use cloak_log::Level;

use crate::error::{Error, Result};

/// Environment variable toggling the reentrancy guard.
pub const ENV_REENTRANCY_GUARD: &str = "CLOAK_REENTRANCY_GUARD";

/// Environment variable holding the hook nesting limit.
pub const ENV_MAX_HOOK_DEPTH: &str = "CLOAK_MAX_HOOK_DEPTH";

/// Environment variable holding the log level.
pub const ENV_LOG: &str = "CLOAK_LOG";

/// Default hook nesting limit.
pub const DEFAULT_MAX_HOOK_DEPTH: u32 = 64;

/// Namespace configuration.
///
/// # Example
///
/// ```rust
/// use cloak::Config;
///
/// let config = Config::default().with_reentrancy_guard(false).with_max_hook_depth(8);
/// assert!(!config.reentrancy_guard);
/// assert_eq!(config.max_hook_depth, 8);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Report a hook that re-enters its own binding instead of recursing.
    pub reentrancy_guard: bool,
    /// Maximum number of hook calls active at once on a thread.
    pub max_hook_depth: u32,
    /// Log level to install, if any.
    pub log_level: Option<Level>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            reentrancy_guard: true,
            max_hook_depth: DEFAULT_MAX_HOOK_DEPTH,
            log_level: None,
        }
    }
}

impl Config {
    /// Enables or disables the reentrancy guard.
    #[must_use]
    pub fn with_reentrancy_guard(mut self, enabled: bool) -> Self {
        self.reentrancy_guard = enabled;
        self
    }

    /// Sets the hook nesting limit.
    #[must_use]
    pub fn with_max_hook_depth(mut self, depth: u32) -> Self {
        self.max_hook_depth = depth;
        self
    }

    /// Sets the log level.
    #[must_use]
    pub fn with_log_level(mut self, level: Level) -> Self {
        self.log_level = Some(level);
        self
    }

    /// Defaults overridden by the `CLOAK_*` environment variables.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidConfig`] when a variable is set to something that does
    /// not parse.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`Config::from_env`], reading variables through `lookup`.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidConfig`] when a value does not parse.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Config::default();

        if let Some(raw) = lookup(ENV_REENTRANCY_GUARD) {
            config.reentrancy_guard = parse_flag(&raw)
                .ok_or_else(|| invalid(ENV_REENTRANCY_GUARD, &raw))?;
        }

        if let Some(raw) = lookup(ENV_MAX_HOOK_DEPTH) {
            config.max_hook_depth = raw
                .trim()
                .parse::<u32>()
                .ok()
                .filter(|depth| *depth > 0)
                .ok_or_else(|| invalid(ENV_MAX_HOOK_DEPTH, &raw))?;
        }

        if let Some(raw) = lookup(ENV_LOG) {
            let level = raw.parse::<Level>().map_err(|_| invalid(ENV_LOG, &raw))?;
            config.log_level = Some(level);
        }

        Ok(config)
    }

    /// Installs `log_level` on the global logger, if set.
    pub fn apply_logging(&self) {
        if let Some(level) = self.log_level {
            cloak_log::set_level(level);
        }
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "on" | "yes" => Some(true),
        "0" | "false" | "off" | "no" => Some(false),
        _ => None,
    }
}

fn invalid(key: &str, value: &str) -> Error {
    Error::InvalidConfig {
        key: key.to_string(),
        value: value.to_string(),
    }
}
