//! Computed and clamped bindings.
//!
//! [`InstanceProperty`] delegates both hooks to native blocks operating on a
//! wrapped value. [`BoundedVar`] keeps a number inside a closed range.

use crate::error::Result;
use crate::runtime::{Block, Class, Method, Object, Selector, Value, GET_HOOK_SELECTOR, SET_HOOK_SELECTOR};
use crate::stdlib::{first_arg, object_handle};

/// Runtime class name of [`InstanceProperty`].
pub const PROPERTY_CLASS_NAME: &str = "InstanceProperty";

/// Runtime class name of [`BoundedVar`].
pub const BOUNDED_CLASS_NAME: &str = "BoundedVar";

const WRAPPED: &str = "wrapped";
const GETTER: &str = "getter";
const SETTER: &str = "setter";
const VALUE: &str = "value";
const LO: &str = "lo";
const HI: &str = "hi";

/// The `InstanceProperty` class, registering it on first use.
///
/// # Errors
///
/// Only if registration fails.
pub fn property_class() -> Result<Class> {
    Class::define(PROPERTY_CLASS_NAME, None, |class| {
        class.add_method(Method::new(GET_HOOK_SELECTOR, "@@:", property_get))?;
        class.add_method(Method::new(SET_HOOK_SELECTOR, "@@:@", property_set))
    })
}

fn property_get(this: &Object, _cmd: Selector, _args: &[Value]) -> Result<Option<Value>> {
    let getter = this.get_ivar(GETTER);
    getter.as_block()?.call(&[this.get_ivar(WRAPPED)]).map(Some)
}

fn property_set(this: &Object, _cmd: Selector, args: &[Value]) -> Result<Option<Value>> {
    let value = first_arg(args)?.clone();
    match this.get_ivar(SETTER) {
        Value::Block(setter) => setter.call(&[this.get_ivar(WRAPPED), value]).map(Some),
        // Read-only property: the store is dropped.
        _ => Ok(None),
    }
}

object_handle!(
    /// Handle to an `InstanceProperty` instance.
    ///
    /// LOAD calls `getter(wrapped)`. STORE calls `setter(wrapped, value)`
    /// when a setter was given and is silently ignored otherwise.
    InstanceProperty,
    property_class
);

impl InstanceProperty {
    /// A property over `wrapped`.
    ///
    /// # Errors
    ///
    /// Only if the class cannot be registered.
    pub fn new(wrapped: Value, getter: Block, setter: Option<Block>) -> Result<Self> {
        let obj = Object::new(&property_class()?);
        obj.set_ivar(WRAPPED, wrapped);
        obj.set_ivar(GETTER, Value::from(getter));
        obj.set_ivar(SETTER, setter.map_or(Value::Nil, Value::from));
        Ok(InstanceProperty { obj })
    }

    /// The wrapped value.
    #[must_use]
    pub fn wrapped(&self) -> Value {
        self.obj.get_ivar(WRAPPED)
    }

    /// Whether stores are forwarded anywhere.
    #[must_use]
    pub fn is_writable(&self) -> bool {
        matches!(self.obj.get_ivar(SETTER), Value::Block(_))
    }
}

/// The `BoundedVar` class, registering it on first use.
///
/// # Errors
///
/// Only if registration fails.
pub fn bounded_class() -> Result<Class> {
    Class::define(BOUNDED_CLASS_NAME, None, |class| {
        class.add_method(Method::new(GET_HOOK_SELECTOR, "@@:", bounded_get))?;
        class.add_method(Method::new(SET_HOOK_SELECTOR, "v@:@", bounded_set))
    })
}

fn bounded_get(this: &Object, _cmd: Selector, _args: &[Value]) -> Result<Option<Value>> {
    Ok(Some(this.get_ivar(VALUE)))
}

fn bounded_set(this: &Object, _cmd: Selector, args: &[Value]) -> Result<Option<Value>> {
    let clamped = first_arg(args)?.clamp_numeric(&this.get_ivar(LO), &this.get_ivar(HI))?;
    this.set_ivar(VALUE, clamped);
    Ok(None)
}

object_handle!(
    /// Handle to a `BoundedVar` instance: a number kept inside `[lo, hi]`.
    ///
    /// ```rust
    /// use cloak::cloak::{MappedNamespace, NamespaceStore};
    /// use cloak::runtime::Value;
    /// use cloak::stdlib::BoundedVar;
    ///
    /// let ns = MappedNamespace::new();
    /// let level = BoundedVar::new(Value::from(0), Value::from(100), Value::from(50)).unwrap();
    /// ns.store_name("level", level.into()).unwrap();
    ///
    /// ns.store_name("level", Value::from(200)).unwrap();
    /// assert_eq!(ns.load_name("level").unwrap(), Value::from(100));
    /// ```
    BoundedVar,
    bounded_class
);

impl BoundedVar {
    /// A bounded number starting at `initial`, clamped.
    ///
    /// # Errors
    ///
    /// [`Error::TypeMismatch`](crate::Error::TypeMismatch) when any operand
    /// is not a number.
    pub fn new(lo: Value, hi: Value, initial: Value) -> Result<Self> {
        let start = initial.clamp_numeric(&lo, &hi)?;
        let obj = Object::new(&bounded_class()?);
        obj.set_ivar(LO, lo);
        obj.set_ivar(HI, hi);
        obj.set_ivar(VALUE, start);
        Ok(BoundedVar { obj })
    }

    /// The current value.
    #[must_use]
    pub fn current(&self) -> Value {
        self.obj.get_ivar(VALUE)
    }

    /// The inclusive bounds.
    #[must_use]
    pub fn bounds(&self) -> (Value, Value) {
        (self.obj.get_ivar(LO), self.obj.get_ivar(HI))
    }
}
