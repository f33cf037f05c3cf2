//! Fixed-index namespace backing, used for function locals.
//!
//! A [`SlotLayout`] is the compiled shape of a scope: the local names in
//! index order. A [`SlotNamespace`] is one activation of that layout. Code
//! that already knows an index uses [`SlotNamespace::load_fast`] and
//! [`SlotNamespace::store_fast`]; the name-based operations of
//! [`NamespaceStore`] resolve through the layout and end up in the same
//! dispatch.

use std::sync::{Arc, PoisonError, RwLock};

use fxhash::FxHashMap;

use crate::cloak::guard::ReentrancyGuard;
use crate::cloak::namespace::{self, Binding, NamespaceStore, StoreOutcome};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::runtime::{Symbol, Value};

/// Local names in slot order. Cheap to clone.
#[derive(Debug, Clone)]
pub struct SlotLayout {
    names: Arc<[Symbol]>,
    index: Arc<FxHashMap<Symbol, usize>>,
}

impl SlotLayout {
    /// Compiles a layout. A repeated name keeps its first slot.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidName`] if any name is empty.
    ///
    /// # Example
    ///
    /// ```rust
    /// use cloak::cloak::SlotLayout;
    ///
    /// let layout = SlotLayout::new(["x", "y"]).unwrap();
    /// assert_eq!(layout.index_of("y"), Some(1));
    /// assert_eq!(layout.len(), 2);
    /// ```
    pub fn new<I, S>(names: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut ordered = Vec::new();
        let mut index = FxHashMap::default();
        for name in names {
            let symbol: Symbol = name.as_ref().parse()?;
            if !index.contains_key(&symbol) {
                index.insert(symbol, ordered.len());
                ordered.push(symbol);
            }
        }
        Ok(SlotLayout {
            names: ordered.into(),
            index: Arc::new(index),
        })
    }

    /// Slot of `name`.
    #[must_use]
    pub fn index_of(&self, name: impl Into<Symbol>) -> Option<usize> {
        self.index.get(&name.into()).copied()
    }

    /// Name in slot `index`.
    #[must_use]
    pub fn name_at(&self, index: usize) -> Option<Symbol> {
        self.names.get(index).copied()
    }

    /// Number of slots.
    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Whether the layout has no slots.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Names in slot order.
    #[must_use]
    pub fn names(&self) -> &[Symbol] {
        &self.names
    }
}

/// A namespace backed by a slot array.
#[derive(Debug)]
pub struct SlotNamespace {
    layout: SlotLayout,
    slots: RwLock<Vec<Option<Binding>>>,
    config: Config,
    guard: ReentrancyGuard<usize>,
}

impl SlotNamespace {
    /// All slots unbound, default configuration.
    #[must_use]
    pub fn new(layout: SlotLayout) -> Self {
        Self::with_config(layout, Config::default())
    }

    /// All slots unbound.
    #[must_use]
    pub fn with_config(layout: SlotLayout, config: Config) -> Self {
        let slots = vec![None; layout.len()];
        SlotNamespace {
            layout,
            slots: RwLock::new(slots),
            config,
            guard: ReentrancyGuard::new(),
        }
    }

    /// The compiled layout.
    #[must_use]
    pub fn layout(&self) -> &SlotLayout {
        &self.layout
    }

    fn check(&self, index: usize) -> Result<usize> {
        if index < self.layout.len() {
            Ok(index)
        } else {
            Err(Error::SlotOutOfRange {
                index,
                len: self.layout.len(),
            })
        }
    }

    /// LOAD by slot index.
    ///
    /// # Errors
    ///
    /// [`Error::SlotOutOfRange`], otherwise as [`NamespaceStore::load`].
    pub fn load_fast(&self, index: usize) -> Result<Value> {
        namespace::load_key(self, self.check(index)?)
    }

    /// STORE by slot index.
    ///
    /// # Errors
    ///
    /// [`Error::SlotOutOfRange`], otherwise as [`NamespaceStore::store`].
    pub fn store_fast(&self, index: usize, value: Value) -> Result<StoreOutcome> {
        namespace::store_key(self, self.check(index)?, value)
    }

    /// Raw read by slot index.
    ///
    /// # Errors
    ///
    /// [`Error::SlotOutOfRange`] or [`Error::UnboundName`].
    pub fn raw_get_fast(&self, index: usize) -> Result<Value> {
        namespace::raw_get_key(self, self.check(index)?)
    }

    /// Raw write by slot index.
    ///
    /// # Errors
    ///
    /// [`Error::SlotOutOfRange`].
    pub fn raw_set_fast(&self, index: usize, value: Value) -> Result<Option<Value>> {
        Ok(namespace::raw_set_key(self, self.check(index)?, value))
    }
}

impl NamespaceStore for SlotNamespace {
    type Key = usize;

    #[inline]
    fn key_for(&self, name: Symbol) -> Option<usize> {
        self.layout.index_of(name)
    }

    fn name_of(&self, key: usize) -> Symbol {
        self.layout.names[key]
    }

    fn read_binding(&self, key: usize) -> Option<Binding> {
        self.slots
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
            .flatten()
    }

    fn write_binding(&self, key: usize, value: Value) -> Option<Binding> {
        let mut slots = self.slots.write().unwrap_or_else(PoisonError::into_inner);
        let slot = slots.get_mut(key)?;
        let next = Binding::succeed(slot.as_ref(), value);
        slot.replace(next)
    }

    fn remove_binding(&self, key: usize) -> Option<Binding> {
        self.slots
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .get_mut(key)
            .and_then(Option::take)
    }

    fn config(&self) -> &Config {
        &self.config
    }

    fn guard(&self) -> &ReentrancyGuard<usize> {
        &self.guard
    }
}
