//! Name-keyed namespace backing, used for module scope.

use std::sync::{PoisonError, RwLock};

use fxhash::FxHashMap;

use crate::cloak::guard::ReentrancyGuard;
use crate::cloak::namespace::{Binding, NamespaceStore};
use crate::config::Config;
use crate::runtime::{Symbol, Value};

/// A namespace backed by `FxHashMap<Symbol, Binding>`.
///
/// # Example
///
/// ```rust
/// use cloak::cloak::{MappedNamespace, NamespaceStore};
/// use cloak::runtime::Value;
///
/// let ns = MappedNamespace::new();
/// ns.store_name("x", Value::from(1)).unwrap();
/// assert_eq!(ns.load_name("x").unwrap(), Value::from(1));
/// ```
#[derive(Debug, Default)]
pub struct MappedNamespace {
    bindings: RwLock<FxHashMap<Symbol, Binding>>,
    config: Config,
    guard: ReentrancyGuard<Symbol>,
}

impl MappedNamespace {
    /// Empty namespace with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty namespace with `config`.
    #[must_use]
    pub fn with_config(config: Config) -> Self {
        MappedNamespace {
            config,
            ..Self::default()
        }
    }

    /// Number of bound names.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bindings
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether nothing is bound.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Bound names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<Symbol> {
        let mut names: Vec<Symbol> = self
            .bindings
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .copied()
            .collect();
        names.sort_by(|a, b| a.name().cmp(b.name()));
        names
    }
}

impl NamespaceStore for MappedNamespace {
    type Key = Symbol;

    #[inline]
    fn key_for(&self, name: Symbol) -> Option<Symbol> {
        Some(name)
    }

    #[inline]
    fn name_of(&self, key: Symbol) -> Symbol {
        key
    }

    fn read_binding(&self, key: Symbol) -> Option<Binding> {
        self.bindings
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
            .cloned()
    }

    fn write_binding(&self, key: Symbol, value: Value) -> Option<Binding> {
        let mut bindings = self.bindings.write().unwrap_or_else(PoisonError::into_inner);
        let next = Binding::succeed(bindings.get(&key), value);
        bindings.insert(key, next)
    }

    fn remove_binding(&self, key: Symbol) -> Option<Binding> {
        self.bindings
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&key)
    }

    fn config(&self) -> &Config {
        &self.config
    }

    fn guard(&self) -> &ReentrancyGuard<Symbol> {
        &self.guard
    }
}
