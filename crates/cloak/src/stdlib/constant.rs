//! Names that cannot be reassigned.

use crate::error::{Error, Result};
use crate::runtime::{Class, Method, Object, Selector, Value, GET_HOOK_SELECTOR, SET_HOOK_SELECTOR};
use crate::stdlib::object_handle;

/// Runtime class name.
pub const CLASS_NAME: &str = "Constant";

/// Message of the exception raised on reassignment.
pub const REASSIGN_MESSAGE: &str = "Constant variables can't be reassigned";

const WRAPPED: &str = "wrapped";

/// The `Constant` class, registering it on first use.
///
/// # Errors
///
/// Only if registration fails.
pub fn class() -> Result<Class> {
    Class::define(CLASS_NAME, None, |class| {
        class.add_method(Method::new(GET_HOOK_SELECTOR, "@@:", get_wrapped))?;
        class.add_method(Method::new(SET_HOOK_SELECTOR, "v@:@", reject))
    })
}

fn get_wrapped(this: &Object, _cmd: Selector, _args: &[Value]) -> Result<Option<Value>> {
    Ok(Some(this.get_ivar(WRAPPED)))
}

fn reject(_this: &Object, _cmd: Selector, _args: &[Value]) -> Result<Option<Value>> {
    Err(Error::raise("TypeError", REASSIGN_MESSAGE))
}

object_handle!(
    /// Handle to a `Constant` instance.
    Constant,
    class
);

impl Constant {
    /// A constant wrapping `wrapped`.
    ///
    /// # Errors
    ///
    /// Only if the class cannot be registered.
    pub fn new(wrapped: Value) -> Result<Self> {
        let obj = Object::new(&class()?);
        obj.set_ivar(WRAPPED, wrapped);
        Ok(Constant { obj })
    }

    /// The wrapped value.
    #[must_use]
    pub fn wrapped(&self) -> Value {
        self.obj.get_ivar(WRAPPED)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cloak::{MappedNamespace, NamespaceStore};

    #[test]
    fn test_constant_rejects_store() {
        let ns = MappedNamespace::new();
        ns.store_name("CRITICAL_NUMBER", Constant::new(Value::from(100)).unwrap().into())
            .unwrap();

        let err = ns.store_name("CRITICAL_NUMBER", Value::from(105)).unwrap_err();
        assert_eq!(err, Error::raise("TypeError", REASSIGN_MESSAGE));
        assert_eq!(ns.load_name("CRITICAL_NUMBER"), Ok(Value::from(100)));
    }

    #[test]
    fn test_wrapped_accessor() {
        let constant = Constant::new(Value::from("pi")).unwrap();
        assert_eq!(constant.wrapped(), Value::from("pi"));
    }
}
