//! Capability probe: does a value cloak LOAD, STORE, both or neither?
//!
//! Only objects can cloak. For an object the answer is the hook byte of its
//! class, maintained by [`Class::add_method`](crate::runtime::Class::add_method),
//! so a probe is a tag check plus one relaxed atomic load. The unhooked path
//! of every LOAD and STORE pays exactly this.

use std::fmt;

use crate::runtime::{Value, HOOK_GET, HOOK_SET};

/// The hooks a value exposes.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Capabilities {
    bits: u8,
}

impl Capabilities {
    /// No hooks.
    pub const NONE: Capabilities = Capabilities { bits: 0 };

    /// Capabilities of `value`.
    #[inline]
    #[must_use]
    pub fn of(value: &Value) -> Self {
        match value {
            Value::Object(obj) => Capabilities {
                bits: obj.class().hook_flags(),
            },
            _ => Self::NONE,
        }
    }

    /// Whether LOAD is intercepted.
    #[inline]
    #[must_use]
    pub fn get(self) -> bool {
        self.bits & HOOK_GET != 0
    }

    /// Whether STORE is intercepted.
    #[inline]
    #[must_use]
    pub fn set(self) -> bool {
        self.bits & HOOK_SET != 0
    }

    /// Whether either operation is intercepted.
    #[inline]
    #[must_use]
    pub fn is_cloaking(self) -> bool {
        self.bits & (HOOK_GET | HOOK_SET) != 0
    }
}

impl fmt::Debug for Capabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Capabilities")
            .field("get", &self.get())
            .field("set", &self.set())
            .finish()
    }
}

/// Capabilities of `value`.
#[inline]
#[must_use]
pub fn capabilities(value: &Value) -> Capabilities {
    Capabilities::of(value)
}

/// Whether `value` exposes a get-hook.
#[inline]
#[must_use]
pub fn has_get_hook(value: &Value) -> bool {
    Capabilities::of(value).get()
}

/// Whether `value` exposes a set-hook.
#[inline]
#[must_use]
pub fn has_set_hook(value: &Value) -> bool {
    Capabilities::of(value).set()
}

/// Whether `value` exposes either hook.
#[inline]
#[must_use]
pub fn is_cloaking(value: &Value) -> bool {
    Capabilities::of(value).is_cloaking()
}
