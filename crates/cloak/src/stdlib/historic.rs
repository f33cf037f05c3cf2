//! A variable that remembers what it held.
//!
//! Every STORE pushes the current value onto a history list before replacing
//! it. `rollback:` restores an earlier value and drops everything after it.

use crate::error::{Error, Result};
use crate::runtime::{Class, List, Method, Object, Selector, Value, GET_HOOK_SELECTOR, SET_HOOK_SELECTOR};
use crate::stdlib::{first_arg, object_handle};

/// Runtime class name.
pub const CLASS_NAME: &str = "HistoricVar";

const VALUE: &str = "value";
const HISTORY: &str = "history";

/// The `HistoricVar` class, registering it on first use.
///
/// # Errors
///
/// Only if registration fails.
pub fn class() -> Result<Class> {
    Class::define(CLASS_NAME, None, |class| {
        class.add_method(Method::new(GET_HOOK_SELECTOR, "@@:", get_value))?;
        class.add_method(Method::new(SET_HOOK_SELECTOR, "v@:@", set_value))?;
        class.add_method(Method::new("history", "@@:", history))?;
        class.add_method(Method::new("rollback:", "v@:@", rollback))
    })
}

fn history_list(this: &Object) -> Result<List> {
    this.get_ivar(HISTORY).as_list().cloned()
}

fn get_value(this: &Object, _cmd: Selector, _args: &[Value]) -> Result<Option<Value>> {
    Ok(Some(this.get_ivar(VALUE)))
}

fn set_value(this: &Object, _cmd: Selector, args: &[Value]) -> Result<Option<Value>> {
    let new = first_arg(args)?.clone();
    history_list(this)?.push(this.get_ivar(VALUE));
    this.set_ivar(VALUE, new);
    Ok(None)
}

fn history(this: &Object, _cmd: Selector, _args: &[Value]) -> Result<Option<Value>> {
    Ok(Some(Value::from(history_list(this)?.to_vec())))
}

fn rollback(this: &Object, _cmd: Selector, args: &[Value]) -> Result<Option<Value>> {
    let n = first_arg(args)?.as_int()?;
    if n < 1 {
        return Err(Error::raise("ValueError", "Rollback count must be positive"));
    }
    let list = history_list(this)?;
    let steps = usize::try_from(n).unwrap_or(usize::MAX);
    if steps > list.len() {
        return Err(Error::raise(
            "ValueError",
            "Can't roll back before history started",
        ));
    }
    for _ in 1..steps {
        list.pop();
    }
    if let Some(restored) = list.pop() {
        this.set_ivar(VALUE, restored);
    }
    Ok(None)
}

object_handle!(
    /// Handle to a `HistoricVar` instance.
    ///
    /// ```rust
    /// use cloak::cloak::{MappedNamespace, NamespaceStore};
    /// use cloak::runtime::Value;
    /// use cloak::stdlib::HistoricVar;
    ///
    /// let ns = MappedNamespace::new();
    /// let g = HistoricVar::new(Value::from(2)).unwrap();
    /// ns.store_name("g", g.clone().into()).unwrap();
    /// ns.store_name("g", Value::from(12)).unwrap();
    /// ns.store_name("g", Value::from("hello world")).unwrap();
    ///
    /// g.rollback(2).unwrap();
    /// assert_eq!(ns.load_name("g").unwrap(), Value::from(2));
    /// assert!(g.history().is_empty());
    /// ```
    HistoricVar,
    class
);

impl HistoricVar {
    /// A historic variable holding `start`, with empty history.
    ///
    /// # Errors
    ///
    /// Only if the class cannot be registered.
    pub fn new(start: Value) -> Result<Self> {
        let obj = Object::new(&class()?);
        obj.set_ivar(VALUE, start);
        obj.set_ivar(HISTORY, Value::from(List::new()));
        Ok(HistoricVar { obj })
    }

    /// The current value, without going through a namespace.
    #[must_use]
    pub fn current(&self) -> Value {
        self.obj.get_ivar(VALUE)
    }

    /// Previous values, oldest first.
    #[must_use]
    pub fn history(&self) -> Vec<Value> {
        history_list(&self.obj)
            .map(|list| list.to_vec())
            .unwrap_or_default()
    }

    /// Restores the value `n` stores back, discarding the newer history.
    ///
    /// # Errors
    ///
    /// A `ValueError` exception when `n` is zero or reaches past the start
    /// of the history.
    pub fn rollback(&self, n: usize) -> Result<()> {
        let n = i64::try_from(n).unwrap_or(i64::MAX);
        self.obj.send("rollback:", &[Value::from(n)]).map(|_| ())
    }
}
