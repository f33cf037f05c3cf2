//! Object instances.
//!
//! An [`Object`] is a reference-counted pointer to a class and a table of
//! instance variables. Cloning an object clones the reference, so a binding,
//! a list element and a hook's receiver can all name the same instance.

use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use fxhash::FxHashMap;

use crate::error::Result;
use crate::runtime::{dispatch, Class, Selector, Symbol, Value};

struct ObjectInner {
    class: Class,
    ivars: RwLock<FxHashMap<Symbol, Value>>,
}

/// A runtime object.
///
/// # Example
///
/// ```rust
/// use cloak::runtime::{Class, Object, Value};
///
/// let class = Class::new_root("DocPoint").unwrap();
/// let point = Object::new(&class);
/// point.set_ivar("x", Value::from(3));
///
/// assert_eq!(point.get_ivar("x"), Value::from(3));
/// assert_eq!(point.get_ivar("y"), Value::Nil);
/// ```
#[derive(Clone)]
pub struct Object {
    inner: Arc<ObjectInner>,
}

impl Object {
    /// Allocates an instance of `class` with no instance variables.
    #[must_use]
    pub fn new(class: &Class) -> Self {
        Object {
            inner: Arc::new(ObjectInner {
                class: class.clone(),
                ivars: RwLock::new(FxHashMap::default()),
            }),
        }
    }

    /// The object's class.
    #[must_use]
    pub fn class(&self) -> &Class {
        &self.inner.class
    }

    /// Number of live references to this instance.
    #[must_use]
    pub fn refcount(&self) -> usize {
        Arc::strong_count(&self.inner)
    }

    /// Reference identity.
    #[must_use]
    pub fn ptr_eq(&self, other: &Object) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Reads an instance variable. Missing ivars read as `Nil`.
    #[must_use]
    pub fn get_ivar(&self, name: impl Into<Symbol>) -> Value {
        self.inner
            .ivars
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&name.into())
            .cloned()
            .unwrap_or_default()
    }

    /// Writes an instance variable, returning the previous value.
    pub fn set_ivar(&self, name: impl Into<Symbol>, value: Value) -> Option<Value> {
        self.inner
            .ivars
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.into(), value)
    }

    /// Sends a message to this object.
    ///
    /// # Errors
    ///
    /// See [`dispatch::send_message`].
    pub fn send(&self, selector: impl Into<Selector>, args: &[Value]) -> Result<Option<Value>> {
        dispatch::send_message(self, selector.into(), args)
    }

    /// Whether the object's class answers `selector`.
    #[must_use]
    pub fn responds_to(&self, selector: impl Into<Selector>) -> bool {
        self.inner.class.responds_to(selector.into())
    }
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "<{} {:p}>",
            self.inner.class.name(),
            Arc::as_ptr(&self.inner)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_refcount() {
        let class = Class::new_root("ObjectTestRefcount").unwrap();
        let obj = Object::new(&class);
        assert_eq!(obj.refcount(), 1);

        let other = obj.clone();
        assert_eq!(obj.refcount(), 2);
        assert!(obj.ptr_eq(&other));

        drop(other);
        assert_eq!(obj.refcount(), 1);
    }

    #[test]
    fn test_ivars() {
        let class = Class::new_root("ObjectTestIvars").unwrap();
        let obj = Object::new(&class);

        assert_eq!(obj.set_ivar("count", Value::from(1)), None);
        assert_eq!(obj.set_ivar("count", Value::from(2)), Some(Value::from(1)));
        assert_eq!(obj.get_ivar("count"), Value::from(2));
        assert!(obj.get_ivar("missing").is_nil());
    }

    #[test]
    fn test_distinct_instances() {
        let class = Class::new_root("ObjectTestDistinct").unwrap();
        let a = Object::new(&class);
        let b = Object::new(&class);
        assert!(!a.ptr_eq(&b));
        assert!(a.class().ptr_eq(b.class()));
    }
}
