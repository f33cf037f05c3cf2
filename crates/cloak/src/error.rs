//! Error types for the cloak runtime.
//!
//! One enum covers the object runtime (dispatch failures), the namespace
//! protocol (unbound names, reentrancy) and the errors that hook bodies
//! raise. Hook errors travel as [`Error::Raised`] and are never rewrapped on
//! their way back to the LOAD/STORE call site.

use std::fmt;

use crate::cloak::HookKind;

/// An exception raised by user code running inside the runtime.
///
/// `kind` plays the role of an exception class name (`"TypeError"`,
/// `"ValueError"`, ...) and `reason` is the human-readable message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exception {
    /// Exception category.
    pub kind: String,
    /// Message.
    pub reason: String,
}

impl fmt::Display for Exception {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.reason)
    }
}

/// Errors that can occur in the cloak runtime.
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// LOAD, `raw_get` or a capability query on a name with no binding.
    UnboundName {
        /// The name that was looked up.
        name: String,
    },

    /// A symbol or selector was created from an empty string.
    InvalidName,

    /// A class with this name is already registered.
    ClassAlreadyExists {
        /// The duplicate name.
        name: String,
    },

    /// Selector not found in the class or its inheritance chain.
    SelectorNotFound {
        /// Receiver class.
        class: String,
        /// Selector that was sent.
        selector: String,
    },

    /// Argument count does not match the method's type encoding.
    ArgumentCountMismatch {
        /// Arguments declared by the encoding.
        expected: usize,
        /// Arguments supplied.
        got: usize,
    },

    /// A value had the wrong runtime type for the operation.
    TypeMismatch {
        /// Type the operation needed.
        expected: &'static str,
        /// Type that was supplied.
        got: &'static str,
    },

    /// Fast-slot index outside the compiled layout.
    SlotOutOfRange {
        /// Requested index.
        index: usize,
        /// Number of slots in the layout.
        len: usize,
    },

    /// STORE or raw write to a name a fast-slot namespace has no slot for.
    NotInLayout {
        /// The name.
        name: String,
    },

    /// A scope depth that reaches past the bottom of the call stack.
    ScopeDepthOutOfRange {
        /// Requested depth (1 = innermost frame).
        depth: usize,
        /// Number of frames on the stack.
        available: usize,
    },

    /// Attempt to pop the module frame off a call stack.
    ModuleFramePop,

    /// A hook performed a non-raw access to its own binding while running.
    ReentrantHook {
        /// The binding whose hook re-entered.
        name: String,
        /// Which hook was running.
        hook: HookKind,
    },

    /// Hook calls nested deeper than the configured limit.
    HookDepthExceeded {
        /// The limit that was hit.
        depth: u32,
    },

    /// A configuration value could not be parsed.
    InvalidConfig {
        /// Setting name (usually the environment variable).
        key: String,
        /// Offending value.
        value: String,
    },

    /// I/O failure inside a library hook body.
    Io {
        /// Path involved.
        path: String,
        /// Rendered `std::io::Error`.
        message: String,
    },

    /// A value could not be converted to or from JSON.
    Serialization {
        /// Rendered serializer error.
        message: String,
    },

    /// An exception raised by a hook or method body, passed through verbatim.
    Raised(Exception),
}

impl Error {
    /// Builds an [`Error::Raised`] exception.
    ///
    /// ```rust
    /// use cloak::Error;
    ///
    /// let err = Error::raise("TypeError", "nope");
    /// assert_eq!(err.to_string(), "TypeError: nope");
    /// ```
    #[must_use]
    pub fn raise(kind: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::Raised(Exception {
            kind: kind.into(),
            reason: reason.into(),
        })
    }

    /// The exception carried by [`Error::Raised`], if any.
    #[must_use]
    pub fn exception(&self) -> Option<&Exception> {
        match self {
            Error::Raised(exc) => Some(exc),
            _ => None,
        }
    }

    pub(crate) fn unbound(name: impl Into<String>) -> Self {
        Error::UnboundName { name: name.into() }
    }

    pub(crate) fn io(path: &std::path::Path, err: &std::io::Error) -> Self {
        Error::Io {
            path: path.display().to_string(),
            message: err.to_string(),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::UnboundName { name } => {
                write!(f, "name '{name}' is not bound")
            }
            Error::InvalidName => write!(f, "names must not be empty"),
            Error::ClassAlreadyExists { name } => {
                write!(f, "class '{name}' already exists in registry")
            }
            Error::SelectorNotFound { class, selector } => {
                write!(
                    f,
                    "'{class}' does not respond to selector '{selector}'"
                )
            }
            Error::ArgumentCountMismatch { expected, got } => {
                write!(
                    f,
                    "argument count mismatch: expected {expected}, got {got}"
                )
            }
            Error::TypeMismatch { expected, got } => {
                write!(f, "type mismatch: expected {expected}, got {got}")
            }
            Error::SlotOutOfRange { index, len } => {
                write!(f, "slot index {index} out of range for {len} slots")
            }
            Error::NotInLayout { name } => {
                write!(f, "name '{name}' has no slot in this scope")
            }
            Error::ScopeDepthOutOfRange { depth, available } => {
                write!(
                    f,
                    "scope depth {depth} exceeds call stack of {available} frames"
                )
            }
            Error::ModuleFramePop => {
                write!(f, "the module frame cannot be popped")
            }
            Error::ReentrantHook { name, hook } => {
                write!(
                    f,
                    "{hook} hook of '{name}' re-entered its own binding; use raw access inside hooks"
                )
            }
            Error::HookDepthExceeded { depth } => {
                write!(f, "hook calls nested deeper than {depth}")
            }
            Error::InvalidConfig { key, value } => {
                write!(f, "invalid value '{value}' for {key}")
            }
            Error::Io { path, message } => {
                write!(f, "I/O error on '{path}': {message}")
            }
            Error::Serialization { message } => {
                write!(f, "serialization error: {message}")
            }
            Error::Raised(exc) => exc.fmt(f),
        }
    }
}

impl std::error::Error for Error {}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization {
            message: err.to_string(),
        }
    }
}

/// Result type for cloak runtime operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(
            Error::unbound("x").to_string(),
            "name 'x' is not bound"
        );
        assert_eq!(
            Error::SlotOutOfRange { index: 4, len: 2 }.to_string(),
            "slot index 4 out of range for 2 slots"
        );
        assert_eq!(
            Error::ReentrantHook {
                name: "g".into(),
                hook: HookKind::Get
            }
            .to_string(),
            "get hook of 'g' re-entered its own binding; use raw access inside hooks"
        );
    }

    #[test]
    fn test_raised_displays_as_exception() {
        let err = Error::raise("ValueError", "bad");
        assert_eq!(err.to_string(), "ValueError: bad");
        assert_eq!(err.exception().map(|e| e.kind.as_str()), Some("ValueError"));
        assert!(Error::InvalidName.exception().is_none());
    }

    #[test]
    fn test_error_equality() {
        assert_eq!(Error::ModuleFramePop, Error::ModuleFramePop);
        assert_ne!(
            Error::raise("TypeError", "a"),
            Error::raise("TypeError", "b")
        );
    }

    #[test]
    fn test_from_serde_json() {
        let err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        assert!(matches!(Error::from(err), Error::Serialization { .. }));
    }
}
