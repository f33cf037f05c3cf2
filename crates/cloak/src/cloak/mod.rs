//! The cloaking protocol: LOAD/STORE interception for namespace bindings.
//!
//! A value *cloaks* a name when it implements the get-hook
//! (`cloakedValue`), the set-hook (`setCloakedValue:`), or both. Once bound
//! in a namespace:
//!
//! - LOAD of the name returns the get-hook's result instead of the value
//! - STORE to the name calls the set-hook instead of rebinding it
//!
//! Both hooks are optional and probed independently. The same value inside a
//! [`List`](crate::runtime::List), a [`Dict`](crate::runtime::Dict) or an
//! instance variable is inert; only namespaces consult hooks.
//!
//! # Modules
//!
//! - [`probe`]: constant-time capability check
//! - [`hooks`]: hook invocation
//! - [`namespace`]: the [`NamespaceStore`] trait and the shared dispatch
//! - [`mapped`] / [`slots`]: the two backings
//! - [`guard`]: the reentrancy marker
//! - [`frame`]: call stacks and scope depths
//! - [`raw`]: raw access and capability queries by scope depth

use std::fmt;

pub mod frame;
pub mod guard;
pub mod hooks;
pub mod mapped;
pub mod namespace;
pub mod probe;
pub mod raw;
pub mod slots;

pub use frame::{CallStack, Frame, Scope, MODULE_FRAME};
pub use guard::{HookMark, ReentrancyGuard};
pub use mapped::MappedNamespace;
pub use namespace::{Binding, NamespaceStore, StoreOutcome};
pub use probe::{capabilities, has_get_hook, has_set_hook, is_cloaking, Capabilities};
pub use slots::{SlotLayout, SlotNamespace};

/// Which hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookKind {
    /// The get-hook, run by LOAD.
    Get,
    /// The set-hook, run by STORE.
    Set,
}

impl fmt::Display for HookKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            HookKind::Get => "get",
            HookKind::Set => "set",
        })
    }
}
