//! Context variables.
//!
//! A [`ContextVar`] reads and writes a per-[`Context`] dict instead of a
//! value of its own. Variables are declared in a [`ContextRegistry`];
//! [`Context::run`] attaches the context's dict to every variable of its
//! registry for the duration of a body, then restores whatever was attached
//! before, so contexts nest.
//!
//! Outside any context a LOAD yields the variable's default and a STORE
//! raises a `TypeError`.

use std::sync::{Arc, PoisonError, RwLock};

use cloak_log::debug;
use fxhash::FxHashMap;

use crate::error::{Error, Result};
use crate::runtime::{Class, Dict, Method, Object, Selector, Symbol, Value, GET_HOOK_SELECTOR, SET_HOOK_SELECTOR};
use crate::stdlib::{first_arg, object_handle};

/// Runtime class name.
pub const CLASS_NAME: &str = "ContextVar";

/// Message of the exception raised by a STORE outside a context.
pub const OUTSIDE_CONTEXT_MESSAGE: &str = "Can't set Context variable outside context";

const NAME: &str = "name";
const DEFAULT: &str = "default";
const CTX: &str = "ctx";

/// The `ContextVar` class, registering it on first use.
///
/// # Errors
///
/// Only if registration fails.
pub fn class() -> Result<Class> {
    Class::define(CLASS_NAME, None, |class| {
        class.add_method(Method::new(GET_HOOK_SELECTOR, "@@:", get_value))?;
        class.add_method(Method::new(SET_HOOK_SELECTOR, "v@:@", set_value))?;
        class.add_method(Method::new("setContext:", "v@:@", set_context))?;
        class.add_method(Method::new("context", "@@:", context))
    })
}

fn var_key(this: &Object) -> Result<Symbol> {
    this.get_ivar(NAME).as_str()?.parse()
}

fn get_value(this: &Object, _cmd: Selector, _args: &[Value]) -> Result<Option<Value>> {
    let value = match this.get_ivar(CTX) {
        Value::Dict(ctx) => ctx
            .get(var_key(this)?)
            .unwrap_or_else(|| this.get_ivar(DEFAULT)),
        _ => this.get_ivar(DEFAULT),
    };
    Ok(Some(value))
}

fn set_value(this: &Object, _cmd: Selector, args: &[Value]) -> Result<Option<Value>> {
    let value = first_arg(args)?.clone();
    match this.get_ivar(CTX) {
        Value::Dict(ctx) => {
            ctx.insert(var_key(this)?, value);
            Ok(None)
        }
        _ => Err(Error::raise("TypeError", OUTSIDE_CONTEXT_MESSAGE)),
    }
}

fn set_context(this: &Object, _cmd: Selector, args: &[Value]) -> Result<Option<Value>> {
    match first_arg(args)? {
        ctx @ (Value::Dict(_) | Value::Nil) => {
            this.set_ivar(CTX, ctx.clone());
            Ok(None)
        }
        other => Err(Error::TypeMismatch {
            expected: "dict or nil",
            got: other.type_name(),
        }),
    }
}

fn context(this: &Object, _cmd: Selector, _args: &[Value]) -> Result<Option<Value>> {
    Ok(Some(this.get_ivar(CTX)))
}

object_handle!(
    /// Handle to a `ContextVar` instance.
    ContextVar,
    class
);

impl ContextVar {
    /// Declares `name` in `registry` with `default`.
    ///
    /// Declaring a name again replaces the earlier variable in the registry.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidName`] for an empty name.
    pub fn declare(registry: &ContextRegistry, name: &str, default: Value) -> Result<Self> {
        let key: Symbol = name.parse()?;
        let obj = Object::new(&class()?);
        obj.set_ivar(NAME, Value::from(name));
        obj.set_ivar(DEFAULT, default);
        let var = ContextVar { obj };
        registry.insert(key, var.clone());
        debug!("declared context variable '{key}'");
        Ok(var)
    }

    /// The variable's name.
    #[must_use]
    pub fn name(&self) -> String {
        self.obj.get_ivar(NAME).to_string()
    }

    /// The value seen outside any context.
    #[must_use]
    pub fn default_value(&self) -> Value {
        self.obj.get_ivar(DEFAULT)
    }

    /// Whether a context is attached.
    #[must_use]
    pub fn in_context(&self) -> bool {
        matches!(self.obj.get_ivar(CTX), Value::Dict(_))
    }

    fn attach(&self, ctx: Value) -> Result<Value> {
        let previous = self.obj.send("context", &[])?.unwrap_or_default();
        self.obj.send("setContext:", &[ctx])?;
        Ok(previous)
    }
}

/// The set of declared context variables.
///
/// Cloning shares the registry.
#[derive(Debug, Clone, Default)]
pub struct ContextRegistry {
    vars: Arc<RwLock<FxHashMap<Symbol, ContextVar>>>,
}

impl ContextRegistry {
    /// Empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn insert(&self, name: Symbol, var: ContextVar) {
        self.vars
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name, var);
    }

    /// The variable declared as `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<ContextVar> {
        self.vars
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&Symbol::intern(name))
            .cloned()
    }

    /// Number of declared variables.
    #[must_use]
    pub fn len(&self) -> usize {
        self.vars.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Whether nothing is declared.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn snapshot(&self) -> Vec<ContextVar> {
        self.vars
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect()
    }
}

/// A set of values for the variables of one registry.
#[derive(Debug, Clone)]
pub struct Context {
    registry: ContextRegistry,
    values: Dict,
}

impl Context {
    /// An empty context over `registry`.
    #[must_use]
    pub fn new(registry: &ContextRegistry) -> Self {
        Context {
            registry: registry.clone(),
            values: Dict::new(),
        }
    }

    /// The context's values, keyed by variable name.
    #[must_use]
    pub fn values(&self) -> &Dict {
        &self.values
    }

    /// Runs `body` with this context attached to every declared variable.
    ///
    /// The previously attached contexts are restored afterwards, including
    /// when `body` fails.
    ///
    /// # Errors
    ///
    /// Whatever `body` returns, or a failure to attach.
    pub fn run<T>(&self, body: impl FnOnce() -> Result<T>) -> Result<T> {
        let vars = self.registry.snapshot();
        let mut previous = Vec::with_capacity(vars.len());
        for var in &vars {
            match var.attach(Value::from(self.values.clone())) {
                Ok(prev) => previous.push((var, prev)),
                Err(err) => {
                    restore(previous);
                    return Err(err);
                }
            }
        }
        let result = body();
        restore(previous);
        result
    }
}

fn restore(previous: Vec<(&ContextVar, Value)>) {
    for (var, ctx) in previous.into_iter().rev() {
        var.obj.set_ivar(CTX, ctx);
    }
}
