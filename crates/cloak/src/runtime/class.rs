//! Classes, methods and the hook capability slots.
//!
//! This module implements the class system with:
//! - A global registry of uniquely named classes
//! - Single inheritance
//! - Per-class method tables and method caches
//! - Hook flags: one atomic byte per class recording whether instances
//!   respond to the get-hook and set-hook selectors
//!
//! # Hook flags
//!
//! The namespace protocol asks "does this value cloak LOAD / STORE?" on every
//! access, so the answer cannot involve a method lookup. Instead
//! [`Class::add_method`] notices the two hook selectors and sets a bit on the
//! class and on every registered subclass; a new subclass starts from its
//! superclass's bits. Probing is then a single relaxed atomic load.
//!
//! # Thread Safety
//!
//! Method tables, caches and the registry sit behind `RwLock`s. The hook byte
//! is atomic.

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

use fxhash::FxHashMap;

use crate::error::{Error, Result};
use crate::runtime::{Object, Selector, Symbol, Value};

/// Method implementation.
///
/// Receives the receiver, the selector it was invoked under and the
/// arguments. `Ok(None)` is a void return.
pub type Imp = fn(this: &Object, cmd: Selector, args: &[Value]) -> Result<Option<Value>>;

/// Selector of the get-hook: `() -> Value`.
pub const GET_HOOK_SELECTOR: &str = "cloakedValue";

/// Selector of the set-hook: `(Value) -> Value | void`.
pub const SET_HOOK_SELECTOR: &str = "setCloakedValue:";

/// Hook flag: instances respond to [`GET_HOOK_SELECTOR`].
pub const HOOK_GET: u8 = 0b01;

/// Hook flag: instances respond to [`SET_HOOK_SELECTOR`].
pub const HOOK_SET: u8 = 0b10;

pub(crate) fn get_hook_selector() -> Selector {
    static SEL: OnceLock<Selector> = OnceLock::new();
    *SEL.get_or_init(|| Selector::intern(GET_HOOK_SELECTOR))
}

pub(crate) fn set_hook_selector() -> Selector {
    static SEL: OnceLock<Selector> = OnceLock::new();
    *SEL.get_or_init(|| Selector::intern(SET_HOOK_SELECTOR))
}

fn hook_bit(selector: Selector) -> u8 {
    if selector == get_hook_selector() {
        HOOK_GET
    } else if selector == set_hook_selector() {
        HOOK_SET
    } else {
        0
    }
}

/// A method: selector, implementation and type encoding.
///
/// The encoding follows the Objective-C convention: the first character is
/// the return type (`v` for void, `@` for a value), then `@:` for the
/// receiver and selector, then one character per argument. `"v@:@"` is a
/// void method taking one argument.
#[derive(Clone)]
pub struct Method {
    /// Selector the method answers to.
    pub selector: Selector,
    /// Implementation.
    pub imp: Imp,
    /// Type encoding.
    pub types: &'static str,
}

impl Method {
    /// Builds a method.
    pub fn new(selector: impl Into<Selector>, types: &'static str, imp: Imp) -> Self {
        Method {
            selector: selector.into(),
            imp,
            types,
        }
    }

    /// Number of explicit arguments declared by the encoding.
    #[must_use]
    pub fn arg_count(&self) -> usize {
        self.types.get(3..).map_or(0, |args| args.chars().count())
    }

    /// Whether the encoding declares a void return.
    #[must_use]
    pub fn returns_void(&self) -> bool {
        self.types.starts_with('v')
    }
}

impl fmt::Debug for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Method")
            .field("selector", &self.selector)
            .field("imp", &format!("{:p}", self.imp as *const ()))
            .field("types", &self.types)
            .finish()
    }
}

struct ClassInner {
    name: Symbol,
    super_class: Option<Class>,
    methods: RwLock<FxHashMap<Selector, Method>>,
    /// Resolved lookups, including inherited methods.
    cache: RwLock<FxHashMap<Selector, Method>>,
    hooks: AtomicU8,
}

static REGISTRY: OnceLock<RwLock<FxHashMap<Symbol, Class>>> = OnceLock::new();

fn registry() -> &'static RwLock<FxHashMap<Symbol, Class>> {
    REGISTRY.get_or_init(|| RwLock::new(FxHashMap::default()))
}

/// A runtime class.
///
/// # Example
///
/// ```rust
/// use cloak::runtime::Class;
///
/// let root = Class::new_root("DocRoot").unwrap();
/// let child = Class::new("DocChild", &root).unwrap();
///
/// assert!(child.is_subclass_of(&root));
/// assert_eq!(child.super_class().unwrap().name(), "DocRoot");
/// ```
#[derive(Clone)]
pub struct Class {
    inner: Arc<ClassInner>,
}

impl Class {
    /// Creates and registers a root class.
    ///
    /// # Errors
    ///
    /// [`Error::ClassAlreadyExists`] if the name is taken,
    /// [`Error::InvalidName`] if it is empty.
    pub fn new_root(name: &str) -> Result<Self> {
        Self::register(Self::build(name, None)?)
    }

    /// Creates and registers a subclass of `super_class`.
    ///
    /// # Errors
    ///
    /// [`Error::ClassAlreadyExists`] if the name is taken,
    /// [`Error::InvalidName`] if it is empty.
    pub fn new(name: &str, super_class: &Class) -> Result<Self> {
        Self::register(Self::build(name, Some(super_class))?)
    }

    /// Returns the class registered under `name`, creating it first when
    /// missing.
    ///
    /// `init` runs before the class becomes visible in the registry, so
    /// library classes are never observed half-built.
    ///
    /// # Errors
    ///
    /// Whatever `init` returns, or [`Error::InvalidName`].
    pub fn define(
        name: &str,
        super_class: Option<&Class>,
        init: impl FnOnce(&Class) -> Result<()>,
    ) -> Result<Self> {
        if let Some(existing) = class_from_name(name) {
            return Ok(existing);
        }
        let class = Self::build(name, super_class)?;
        init(&class)?;
        match Self::register(class) {
            Err(Error::ClassAlreadyExists { .. }) => {
                class_from_name(name).ok_or_else(|| Error::unbound(name))
            }
            other => other,
        }
    }

    fn build(name: &str, super_class: Option<&Class>) -> Result<Self> {
        let name: Symbol = name.parse()?;
        let hooks = super_class.map_or(0, Class::hook_flags);
        Ok(Class {
            inner: Arc::new(ClassInner {
                name,
                super_class: super_class.cloned(),
                methods: RwLock::new(FxHashMap::default()),
                cache: RwLock::new(FxHashMap::default()),
                hooks: AtomicU8::new(hooks),
            }),
        })
    }

    fn register(class: Class) -> Result<Self> {
        let mut classes = registry().write().unwrap_or_else(PoisonError::into_inner);
        if classes.contains_key(&class.inner.name) {
            return Err(Error::ClassAlreadyExists {
                name: class.name().to_string(),
            });
        }
        classes.insert(class.inner.name, class.clone());
        Ok(class)
    }

    /// Class name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.inner.name.name()
    }

    /// Superclass, if any.
    #[must_use]
    pub fn super_class(&self) -> Option<Class> {
        self.inner.super_class.clone()
    }

    /// Adds or replaces a method.
    ///
    /// Invalidates the method caches of this class and its subclasses. Adding
    /// a hook selector sets the matching hook flag on all of them.
    ///
    /// # Errors
    ///
    /// Currently infallible.
    pub fn add_method(&self, method: Method) -> Result<()> {
        let bit = hook_bit(method.selector);
        self.inner
            .methods
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(method.selector, method);

        for class in self.with_subclasses() {
            class.invalidate_cache();
            if bit != 0 {
                class.inner.hooks.fetch_or(bit, Ordering::Relaxed);
            }
        }
        Ok(())
    }

    /// This class plus every registered class that inherits from it.
    fn with_subclasses(&self) -> Vec<Class> {
        let mut classes = vec![self.clone()];
        let registered = registry().read().unwrap_or_else(PoisonError::into_inner);
        classes.extend(
            registered
                .values()
                .filter(|c| !c.ptr_eq(self) && c.is_subclass_of(self))
                .cloned(),
        );
        classes
    }

    fn invalidate_cache(&self) {
        self.inner
            .cache
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Resolves `selector` along the inheritance chain, caching the result.
    #[must_use]
    pub fn lookup_method(&self, selector: Selector) -> Option<Method> {
        if let Some(method) = self
            .inner
            .cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&selector)
        {
            return Some(method.clone());
        }

        let mut current = Some(self.clone());
        while let Some(class) = current {
            let found = class
                .inner
                .methods
                .read()
                .unwrap_or_else(PoisonError::into_inner)
                .get(&selector)
                .cloned();
            if let Some(method) = found {
                self.inner
                    .cache
                    .write()
                    .unwrap_or_else(PoisonError::into_inner)
                    .insert(selector, method.clone());
                return Some(method);
            }
            current = class.super_class();
        }
        None
    }

    /// Whether instances respond to `selector`.
    #[must_use]
    pub fn responds_to(&self, selector: Selector) -> bool {
        self.lookup_method(selector).is_some()
    }

    /// Hook capability bits ([`HOOK_GET`], [`HOOK_SET`]).
    #[inline]
    #[must_use]
    pub fn hook_flags(&self) -> u8 {
        self.inner.hooks.load(Ordering::Relaxed)
    }

    /// Whether `self` is `class` or inherits from it.
    #[must_use]
    pub fn is_subclass_of(&self, class: &Class) -> bool {
        let mut current = Some(self.clone());
        while let Some(c) = current {
            if c.ptr_eq(class) {
                return true;
            }
            current = c.super_class();
        }
        false
    }

    /// Selectors defined directly on this class, sorted by name.
    #[must_use]
    pub fn method_names(&self) -> Vec<Selector> {
        let mut names: Vec<Selector> = self
            .inner
            .methods
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .copied()
            .collect();
        names.sort_by(|a, b| a.name().cmp(b.name()));
        names
    }

    /// Reference identity.
    #[must_use]
    pub fn ptr_eq(&self, other: &Class) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Allocates an instance.
    #[must_use]
    pub fn instantiate(&self) -> Object {
        Object::new(self)
    }
}

impl fmt::Debug for Class {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Class({})", self.name())
    }
}

/// Looks up a registered class.
#[must_use]
pub fn class_from_name(name: &str) -> Option<Class> {
    registry()
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .get(&Symbol::intern(name))
        .cloned()
}

/// Every registered class, sorted by name.
#[must_use]
pub fn all_classes() -> Vec<Class> {
    let mut classes: Vec<Class> = registry()
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .values()
        .cloned()
        .collect();
    classes.sort_by(|a, b| a.name().cmp(b.name()));
    classes
}
