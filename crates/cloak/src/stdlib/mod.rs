//! Cloaking classes.
//!
//! Each type here is a thin handle over an object of a registered runtime
//! class whose hooks implement one behavior:
//!
//! | Type | LOAD | STORE |
//! |---|---|---|
//! | [`HistoricVar`] | current value | records the old value, then replaces it |
//! | [`Constant`] | wrapped value | raises `TypeError` |
//! | [`InstanceProperty`] | `getter(wrapped)` | `setter(wrapped, v)`, or ignored |
//! | [`BoundedVar`] | current value | clamps into `[lo, hi]` |
//! | [`ContextVar`] | value in the active [`Context`], or the default | writes the active context |
//! | [`FileBackedVar`] | current value | replaces it and rewrites the backing file |
//! | [`ArraySum`] | sums its arrays once, then the cached result | (no hook) |
//!
//! Handles convert into [`Value`] for binding, and back with `TryFrom<Value>`
//! when a raw read hands the wrapper out again.

pub mod constant;
pub mod context;
pub mod file_backed;
pub mod historic;
pub mod lazy_array;
pub mod property;

pub use constant::Constant;
pub use context::{Context, ContextRegistry, ContextVar};
pub use file_backed::FileBackedVar;
pub use historic::HistoricVar;
pub use lazy_array::{lazy_add, ArraySum, SimpleArray};
pub use property::{BoundedVar, InstanceProperty};

use crate::error::{Error, Result};
use crate::runtime::{Class, Object, Value};

/// The object in `value`, if it is an instance of `class` or a subclass.
pub(crate) fn instance_of(value: &Value, class: &Class) -> Result<Object> {
    let obj = value.as_object()?;
    if obj.class().is_subclass_of(class) {
        Ok(obj.clone())
    } else {
        Err(Error::TypeMismatch {
            expected: class.name(),
            got: obj.class().name(),
        })
    }
}

/// The single argument of a one-argument method.
pub(crate) fn first_arg(args: &[Value]) -> Result<&Value> {
    args.first().ok_or(Error::ArgumentCountMismatch {
        expected: 1,
        got: 0,
    })
}

/// Declares a handle type over instances of one runtime class.
///
/// `$class` is a function returning `Result<Class>`.
macro_rules! object_handle {
    ($(#[$meta:meta])* $name:ident, $class:path) => {
        $(#[$meta])*
        #[derive(Debug, Clone)]
        pub struct $name {
            obj: $crate::runtime::Object,
        }

        impl $name {
            /// The underlying object.
            #[must_use]
            pub fn object(&self) -> &$crate::runtime::Object {
                &self.obj
            }
        }

        impl From<$name> for $crate::runtime::Value {
            fn from(handle: $name) -> Self {
                $crate::runtime::Value::Object(handle.obj)
            }
        }

        impl TryFrom<$crate::runtime::Value> for $name {
            type Error = $crate::error::Error;

            fn try_from(value: $crate::runtime::Value) -> $crate::error::Result<Self> {
                Self::try_from(&value)
            }
        }

        impl TryFrom<&$crate::runtime::Value> for $name {
            type Error = $crate::error::Error;

            fn try_from(value: &$crate::runtime::Value) -> $crate::error::Result<Self> {
                Ok($name {
                    obj: $crate::stdlib::instance_of(value, &$class()?)?,
                })
            }
        }
    };
}

pub(crate) use object_handle;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instance_of_rejects_other_classes() {
        let constant: Value = Constant::new(Value::from(1)).unwrap().into();
        let err = HistoricVar::try_from(&constant).unwrap_err();
        assert_eq!(
            err,
            Error::TypeMismatch {
                expected: "HistoricVar",
                got: "Constant"
            }
        );
        assert!(HistoricVar::try_from(Value::from(3)).is_err());
    }

    #[test]
    fn test_handle_roundtrip_keeps_identity() {
        let historic = HistoricVar::new(Value::Nil).unwrap();
        let value: Value = historic.clone().into();
        let back = HistoricVar::try_from(&value).unwrap();
        assert!(back.object().ptr_eq(historic.object()));
    }
}
