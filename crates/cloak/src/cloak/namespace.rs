//! The namespace store and its shared LOAD/STORE dispatch.
//!
//! A namespace maps names to [`Binding`]s. How it does that is up to the
//! backing: [`MappedNamespace`](crate::cloak::MappedNamespace) keys a hash map
//! by symbol, [`SlotNamespace`](crate::cloak::SlotNamespace) resolves names to
//! precompiled indices. A backing implements the storage primitives of
//! [`NamespaceStore`]; every operation with protocol semantics is a provided
//! method that funnels into the generic routines of this module, so both
//! backings behave identically by construction.
//!
//! # LOAD
//!
//! 1. No binding: [`Error::UnboundName`].
//! 2. The bound value has a get-hook: the hook's result (or error).
//! 3. Otherwise the bound value itself.
//!
//! # STORE
//!
//! 1. No binding: bind raw. A first bind never consults a hook.
//! 2. The bound value has a set-hook: call it; the binding is left alone.
//! 3. Otherwise replace the binding.
//!
//! The binding is cloned out and the namespace lock released before any hook
//! runs, so hooks are free to LOAD and STORE other names.

use std::fmt;
use std::hash::Hash;

use cloak_log::{debug, warn};

use crate::cloak::guard::{HookMark, ReentrancyGuard};
use crate::cloak::probe::Capabilities;
use crate::cloak::{hooks, HookKind};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::runtime::{Symbol, Value};

/// The reference a name currently holds.
#[derive(Debug, Clone)]
pub struct Binding {
    /// The bound value.
    pub value: Value,
    /// Number of times the binding has been replaced since it was created.
    ///
    /// STORE through a set-hook leaves this unchanged, which is how callers
    /// can tell the wrapper stayed bound.
    pub generation: u64,
}

impl Binding {
    /// A fresh binding.
    #[must_use]
    pub fn new(value: Value) -> Self {
        Binding {
            value,
            generation: 0,
        }
    }

    /// The binding that replaces `previous`.
    #[must_use]
    pub fn succeed(previous: Option<&Binding>, value: Value) -> Self {
        Binding {
            value,
            generation: previous.map_or(0, |b| b.generation + 1),
        }
    }
}

/// What a STORE did.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreOutcome {
    /// The name had no binding and was bound raw.
    Bound,
    /// The previous value was replaced.
    Rebound {
        /// The value that was replaced.
        previous: Value,
    },
    /// The bound value's set-hook handled the store; the binding is unchanged.
    Intercepted {
        /// What the set-hook returned.
        result: Option<Value>,
    },
}

impl StoreOutcome {
    /// Whether a set-hook ran.
    #[must_use]
    pub fn was_intercepted(&self) -> bool {
        matches!(self, StoreOutcome::Intercepted { .. })
    }
}

/// A namespace: storage primitives plus the protocol operations built on them.
///
/// Implementors provide the primitives; the provided methods must not be
/// overridden.
pub trait NamespaceStore {
    /// How the backing addresses a binding.
    type Key: Copy + Eq + Hash + fmt::Debug;

    /// Resolves a name. `None` means the name can never be bound here.
    fn key_for(&self, name: Symbol) -> Option<Self::Key>;

    /// The name behind a key.
    fn name_of(&self, key: Self::Key) -> Symbol;

    /// A copy of the binding at `key`.
    fn read_binding(&self, key: Self::Key) -> Option<Binding>;

    /// Replaces the binding at `key` with `value`, returning the old binding.
    fn write_binding(&self, key: Self::Key, value: Value) -> Option<Binding>;

    /// Removes the binding at `key`.
    fn remove_binding(&self, key: Self::Key) -> Option<Binding>;

    /// The namespace's configuration.
    fn config(&self) -> &Config;

    /// The namespace's reentrancy marker.
    fn guard(&self) -> &ReentrancyGuard<Self::Key>;

    /// LOAD `name`.
    ///
    /// # Errors
    ///
    /// [`Error::UnboundName`], [`Error::ReentrantHook`],
    /// [`Error::HookDepthExceeded`], or whatever the get-hook raises.
    fn load(&self, name: Symbol) -> Result<Value> {
        load_key(self, bound_key(self, name)?)
    }

    /// STORE `value` to `name`.
    ///
    /// # Errors
    ///
    /// [`Error::NotInLayout`], [`Error::ReentrantHook`],
    /// [`Error::HookDepthExceeded`], or whatever the set-hook raises.
    fn store(&self, name: Symbol, value: Value) -> Result<StoreOutcome> {
        store_key(self, slot_key(self, name)?, value)
    }

    /// Removes `name` without consulting hooks and returns what it held.
    ///
    /// # Errors
    ///
    /// [`Error::UnboundName`].
    fn unbind(&self, name: Symbol) -> Result<Value> {
        unbind_key(self, bound_key(self, name)?)
    }

    /// The literal reference bound to `name`. Never runs a hook.
    ///
    /// # Errors
    ///
    /// [`Error::UnboundName`].
    fn raw_get(&self, name: Symbol) -> Result<Value> {
        raw_get_key(self, bound_key(self, name)?)
    }

    /// Replaces the binding of `name`. Never runs a hook.
    ///
    /// Returns the replaced value, if there was one.
    ///
    /// # Errors
    ///
    /// [`Error::NotInLayout`].
    fn raw_set(&self, name: Symbol, value: Value) -> Result<Option<Value>> {
        Ok(raw_set_key(self, slot_key(self, name)?, value))
    }

    /// A copy of the binding of `name`, if bound.
    fn binding(&self, name: Symbol) -> Option<Binding> {
        self.key_for(name).and_then(|key| self.read_binding(key))
    }

    /// Whether `name` is bound.
    fn is_bound(&self, name: Symbol) -> bool {
        self.binding(name).is_some()
    }

    /// Hooks exposed by the value bound to `name`.
    ///
    /// # Errors
    ///
    /// [`Error::UnboundName`].
    fn capabilities(&self, name: Symbol) -> Result<Capabilities> {
        raw_get_key(self, bound_key(self, name)?).map(|value| Capabilities::of(&value))
    }

    /// Whether the value bound to `name` intercepts LOAD.
    ///
    /// # Errors
    ///
    /// [`Error::UnboundName`].
    fn has_get_capability(&self, name: Symbol) -> Result<bool> {
        self.capabilities(name).map(Capabilities::get)
    }

    /// Whether the value bound to `name` intercepts STORE.
    ///
    /// # Errors
    ///
    /// [`Error::UnboundName`].
    fn has_set_capability(&self, name: Symbol) -> Result<bool> {
        self.capabilities(name).map(Capabilities::set)
    }

    /// Whether the value bound to `name` intercepts LOAD or STORE.
    ///
    /// # Errors
    ///
    /// [`Error::UnboundName`].
    fn is_cloaking(&self, name: Symbol) -> Result<bool> {
        self.capabilities(name).map(Capabilities::is_cloaking)
    }

    /// [`load`](Self::load) by string name.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidName`] for the empty string, otherwise as `load`.
    fn load_name(&self, name: &str) -> Result<Value> {
        self.load(name.parse()?)
    }

    /// [`store`](Self::store) by string name.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidName`] for the empty string, otherwise as `store`.
    fn store_name(&self, name: &str, value: Value) -> Result<StoreOutcome> {
        self.store(name.parse()?, value)
    }

    /// [`unbind`](Self::unbind) by string name.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidName`] for the empty string, otherwise as `unbind`.
    fn unbind_name(&self, name: &str) -> Result<Value> {
        self.unbind(name.parse()?)
    }

    /// [`raw_get`](Self::raw_get) by string name.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidName`] for the empty string, otherwise as `raw_get`.
    fn raw_get_name(&self, name: &str) -> Result<Value> {
        self.raw_get(name.parse()?)
    }

    /// [`raw_set`](Self::raw_set) by string name.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidName`] for the empty string, otherwise as `raw_set`.
    fn raw_set_name(&self, name: &str, value: Value) -> Result<Option<Value>> {
        self.raw_set(name.parse()?, value)
    }
}

fn bound_key<S: NamespaceStore + ?Sized>(ns: &S, name: Symbol) -> Result<S::Key> {
    ns.key_for(name).ok_or_else(|| Error::unbound(name.name()))
}

fn slot_key<S: NamespaceStore + ?Sized>(ns: &S, name: Symbol) -> Result<S::Key> {
    ns.key_for(name).ok_or_else(|| Error::NotInLayout {
        name: name.name().to_string(),
    })
}

fn read_bound<S: NamespaceStore + ?Sized>(ns: &S, key: S::Key) -> Result<Binding> {
    ns.read_binding(key)
        .ok_or_else(|| Error::unbound(ns.name_of(key).name()))
}

/// Marks `kind` on `key` as running, when the guard is enabled.
fn enter_hook<S: NamespaceStore + ?Sized>(
    ns: &S,
    key: S::Key,
    kind: HookKind,
) -> Result<Option<HookMark<'_, S::Key>>> {
    if !ns.config().reentrancy_guard {
        return Ok(None);
    }
    match ns.guard().enter(key, kind) {
        Some(mark) => Ok(Some(mark)),
        None => {
            let name = ns.name_of(key);
            warn!("{kind} hook of '{name}' re-entered its own binding");
            Err(Error::ReentrantHook {
                name: name.name().to_string(),
                hook: kind,
            })
        }
    }
}

/// LOAD by key.
///
/// # Errors
///
/// See [`NamespaceStore::load`].
pub fn load_key<S: NamespaceStore + ?Sized>(ns: &S, key: S::Key) -> Result<Value> {
    let binding = read_bound(ns, key)?;
    match binding.value {
        Value::Object(ref obj) if Capabilities::of(&binding.value).get() => {
            let _mark = enter_hook(ns, key, HookKind::Get)?;
            hooks::call_get_hook(obj, ns.config().max_hook_depth)
        }
        value => Ok(value),
    }
}

/// STORE by key.
///
/// # Errors
///
/// See [`NamespaceStore::store`].
pub fn store_key<S: NamespaceStore + ?Sized>(
    ns: &S,
    key: S::Key,
    value: Value,
) -> Result<StoreOutcome> {
    let Some(binding) = ns.read_binding(key) else {
        ns.write_binding(key, value);
        debug!("bound '{}'", ns.name_of(key));
        return Ok(StoreOutcome::Bound);
    };

    match binding.value {
        Value::Object(ref obj) if Capabilities::of(&binding.value).set() => {
            let _mark = enter_hook(ns, key, HookKind::Set)?;
            let result = hooks::call_set_hook(obj, value, ns.config().max_hook_depth)?;
            Ok(StoreOutcome::Intercepted { result })
        }
        _ => {
            let previous = ns
                .write_binding(key, value)
                .map_or(binding.value, |old| old.value);
            Ok(StoreOutcome::Rebound { previous })
        }
    }
}

/// Raw read by key.
///
/// # Errors
///
/// [`Error::UnboundName`].
pub fn raw_get_key<S: NamespaceStore + ?Sized>(ns: &S, key: S::Key) -> Result<Value> {
    read_bound(ns, key).map(|binding| binding.value)
}

/// Raw write by key. Returns the replaced value.
pub fn raw_set_key<S: NamespaceStore + ?Sized>(ns: &S, key: S::Key, value: Value) -> Option<Value> {
    debug!("raw write to '{}'", ns.name_of(key));
    ns.write_binding(key, value).map(|old| old.value)
}

/// Unbind by key.
///
/// # Errors
///
/// [`Error::UnboundName`].
pub fn unbind_key<S: NamespaceStore + ?Sized>(ns: &S, key: S::Key) -> Result<Value> {
    let removed = ns
        .remove_binding(key)
        .ok_or_else(|| Error::unbound(ns.name_of(key).name()))?;
    debug!("unbound '{}'", ns.name_of(key));
    Ok(removed.value)
}
