//! Call stacks: which namespace a scope depth refers to.
//!
//! The management surface addresses scopes by depth, counted from the
//! innermost frame (depth 1). A [`CallStack`] is an explicit value owned by
//! whoever drives execution; nothing here is global. Frame 0 is the module
//! frame and can never be popped.

use std::sync::Arc;

use cloak_log::debug;

use crate::cloak::mapped::MappedNamespace;
use crate::cloak::namespace::{NamespaceStore, StoreOutcome};
use crate::cloak::probe::Capabilities;
use crate::cloak::slots::{SlotLayout, SlotNamespace};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::runtime::{Symbol, Value};

/// Name of the module frame.
pub const MODULE_FRAME: &str = "<module>";

/// The namespace of one frame, in either representation.
#[derive(Debug, Clone)]
pub enum Scope {
    /// Name-keyed.
    Mapped(Arc<MappedNamespace>),
    /// Slot array.
    Slots(Arc<SlotNamespace>),
}

macro_rules! delegate {
    ($self:ident, $ns:ident => $body:expr) => {
        match $self {
            Scope::Mapped($ns) => $body,
            Scope::Slots($ns) => $body,
        }
    };
}

impl Scope {
    /// A fresh name-keyed scope.
    #[must_use]
    pub fn mapped(config: Config) -> Self {
        Scope::Mapped(Arc::new(MappedNamespace::with_config(config)))
    }

    /// A fresh slot scope over `layout`.
    #[must_use]
    pub fn slots(layout: SlotLayout, config: Config) -> Self {
        Scope::Slots(Arc::new(SlotNamespace::with_config(layout, config)))
    }

    /// LOAD.
    ///
    /// # Errors
    ///
    /// See [`NamespaceStore::load`].
    pub fn load(&self, name: Symbol) -> Result<Value> {
        delegate!(self, ns => ns.load(name))
    }

    /// STORE.
    ///
    /// # Errors
    ///
    /// See [`NamespaceStore::store`].
    pub fn store(&self, name: Symbol, value: Value) -> Result<StoreOutcome> {
        delegate!(self, ns => ns.store(name, value))
    }

    /// Raw delete.
    ///
    /// # Errors
    ///
    /// See [`NamespaceStore::unbind`].
    pub fn unbind(&self, name: Symbol) -> Result<Value> {
        delegate!(self, ns => ns.unbind(name))
    }

    /// Raw read.
    ///
    /// # Errors
    ///
    /// See [`NamespaceStore::raw_get`].
    pub fn raw_get(&self, name: Symbol) -> Result<Value> {
        delegate!(self, ns => ns.raw_get(name))
    }

    /// Raw write.
    ///
    /// # Errors
    ///
    /// See [`NamespaceStore::raw_set`].
    pub fn raw_set(&self, name: Symbol, value: Value) -> Result<Option<Value>> {
        delegate!(self, ns => ns.raw_set(name, value))
    }

    /// Hooks of the value bound to `name`.
    ///
    /// # Errors
    ///
    /// See [`NamespaceStore::capabilities`].
    pub fn capabilities(&self, name: Symbol) -> Result<Capabilities> {
        delegate!(self, ns => ns.capabilities(name))
    }

    /// Whether `name` is bound.
    #[must_use]
    pub fn is_bound(&self, name: Symbol) -> bool {
        delegate!(self, ns => ns.is_bound(name))
    }
}

impl From<MappedNamespace> for Scope {
    fn from(ns: MappedNamespace) -> Self {
        Scope::Mapped(Arc::new(ns))
    }
}

impl From<SlotNamespace> for Scope {
    fn from(ns: SlotNamespace) -> Self {
        Scope::Slots(Arc::new(ns))
    }
}

/// One activation record.
#[derive(Debug, Clone)]
pub struct Frame {
    function: Symbol,
    scope: Scope,
}

impl Frame {
    /// Name of the function (or [`MODULE_FRAME`]).
    #[must_use]
    pub fn function(&self) -> Symbol {
        self.function
    }

    /// The frame's namespace.
    #[must_use]
    pub fn scope(&self) -> &Scope {
        &self.scope
    }
}

/// A stack of frames over one module namespace.
///
/// # Example
///
/// ```rust
/// use cloak::cloak::{CallStack, SlotLayout};
/// use cloak::runtime::{Symbol, Value};
///
/// let mut stack = CallStack::new();
/// stack.store_global(Symbol::intern("g"), Value::from(1)).unwrap();
///
/// let scope = stack.slot_scope(SlotLayout::new(["x"]).unwrap());
/// let seen = stack
///     .call("f", scope, |stack| {
///         stack.store_local(Symbol::intern("x"), Value::from(2))?;
///         stack.load_name(Symbol::intern("g"))
///     })
///     .unwrap();
///
/// assert_eq!(seen, Value::from(1));
/// assert_eq!(stack.depth(), 1);
/// ```
#[derive(Debug)]
pub struct CallStack {
    module: Arc<MappedNamespace>,
    root: Frame,
    /// Pushed frames, innermost last.
    frames: Vec<Frame>,
    config: Config,
}

impl Default for CallStack {
    fn default() -> Self {
        Self::new()
    }
}

impl CallStack {
    /// A stack holding only a fresh module frame.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    /// A stack whose module namespace, and scopes made through
    /// [`CallStack::mapped_scope`] / [`CallStack::slot_scope`], use `config`.
    #[must_use]
    pub fn with_config(config: Config) -> Self {
        let module = Arc::new(MappedNamespace::with_config(config.clone()));
        Self::from_module(module, config)
    }

    /// A stack over an existing module namespace.
    #[must_use]
    pub fn from_module(module: Arc<MappedNamespace>, config: Config) -> Self {
        let root = Frame {
            function: Symbol::intern(MODULE_FRAME),
            scope: Scope::Mapped(Arc::clone(&module)),
        };
        CallStack {
            module,
            root,
            frames: Vec::new(),
            config,
        }
    }

    /// The stack's configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// A fresh name-keyed scope using the stack's configuration.
    #[must_use]
    pub fn mapped_scope(&self) -> Scope {
        Scope::mapped(self.config.clone())
    }

    /// A fresh slot scope using the stack's configuration.
    #[must_use]
    pub fn slot_scope(&self, layout: SlotLayout) -> Scope {
        Scope::slots(layout, self.config.clone())
    }

    /// The module namespace.
    #[must_use]
    pub fn globals(&self) -> &Arc<MappedNamespace> {
        &self.module
    }

    /// Number of frames, module frame included.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.frames.len() + 1
    }

    /// Frames from outermost (module) to innermost.
    pub fn frames(&self) -> impl Iterator<Item = &Frame> {
        std::iter::once(&self.root).chain(&self.frames)
    }

    /// Pushes a frame for `function`.
    pub fn push(&mut self, function: impl Into<Symbol>, scope: Scope) {
        let function = function.into();
        debug!("enter {function} at depth {}", self.depth() + 1);
        self.frames.push(Frame { function, scope });
    }

    /// Pops the innermost frame.
    ///
    /// # Errors
    ///
    /// [`Error::ModuleFramePop`] when only the module frame is left.
    pub fn pop(&mut self) -> Result<Frame> {
        self.frames.pop().ok_or(Error::ModuleFramePop)
    }

    /// Runs `body` with a frame for `function` pushed.
    ///
    /// The stack is restored to its previous depth however `body` returns.
    ///
    /// # Errors
    ///
    /// Whatever `body` returns.
    pub fn call<T>(
        &mut self,
        function: impl Into<Symbol>,
        scope: Scope,
        body: impl FnOnce(&mut CallStack) -> Result<T>,
    ) -> Result<T> {
        let pushed = self.frames.len();
        self.push(function, scope);
        let result = body(self);
        self.frames.truncate(pushed);
        result
    }

    /// The frame at `depth` (1 = innermost).
    ///
    /// # Errors
    ///
    /// [`Error::ScopeDepthOutOfRange`] for 0 or a depth past the module frame.
    pub fn frame_at(&self, depth: usize) -> Result<&Frame> {
        let available = self.depth();
        if depth == 0 || depth > available {
            return Err(Error::ScopeDepthOutOfRange { depth, available });
        }
        if depth == available {
            return Ok(&self.root);
        }
        self.frames
            .get(self.frames.len() - depth)
            .ok_or(Error::ScopeDepthOutOfRange { depth, available })
    }

    /// The scope at `depth` (1 = innermost).
    ///
    /// # Errors
    ///
    /// [`Error::ScopeDepthOutOfRange`].
    pub fn scope_at(&self, depth: usize) -> Result<&Scope> {
        self.frame_at(depth).map(Frame::scope)
    }

    /// The innermost scope.
    #[must_use]
    pub fn current(&self) -> &Scope {
        self.frames.last().unwrap_or(&self.root).scope()
    }

    /// LOAD with name resolution: the innermost scope if it binds `name`,
    /// then the module scope.
    ///
    /// # Errors
    ///
    /// [`Error::UnboundName`] when neither binds it, otherwise as LOAD.
    pub fn load_name(&self, name: Symbol) -> Result<Value> {
        let current = self.current();
        if current.is_bound(name) {
            return current.load(name);
        }
        self.module.load(name)
    }

    /// STORE into the innermost scope.
    ///
    /// # Errors
    ///
    /// As STORE.
    pub fn store_local(&self, name: Symbol, value: Value) -> Result<StoreOutcome> {
        self.current().store(name, value)
    }

    /// LOAD from the module scope.
    ///
    /// # Errors
    ///
    /// As LOAD.
    pub fn load_global(&self, name: Symbol) -> Result<Value> {
        self.module.load(name)
    }

    /// STORE into the module scope.
    ///
    /// # Errors
    ///
    /// As STORE.
    pub fn store_global(&self, name: Symbol, value: Value) -> Result<StoreOutcome> {
        self.module.store(name, value)
    }
}
