//! Message dispatch.
//!
//! [`send_message`] resolves a selector through the receiver's class (method
//! cache first, then the inheritance chain), checks the argument count
//! against the method's type encoding and calls the implementation.
//!
//! Whatever the implementation returns is handed back untouched: dispatch
//! never retries, never rewraps an error and never substitutes a value. Hook
//! invocation relies on this.

use cloak_log::trace;

use crate::error::{Error, Result};
use crate::runtime::{Object, Selector, Value};

/// Sends `selector` to `obj` with `args`.
///
/// A method whose encoding declares a `v` return always yields `Ok(None)`,
/// even if its implementation produced a value.
///
/// # Errors
///
/// - [`Error::SelectorNotFound`] if no class in the chain defines `selector`
/// - [`Error::ArgumentCountMismatch`] if `args` does not match the encoding
/// - Any error returned by the implementation, unchanged
///
/// # Example
///
/// ```rust
/// use cloak::runtime::{dispatch::send_message, Class, Method, Object, Selector, Value};
///
/// fn answer(_: &Object, _: Selector, _: &[Value]) -> cloak::Result<Option<Value>> {
///     Ok(Some(Value::from(42)))
/// }
///
/// let class = Class::new_root("DocAnswer").unwrap();
/// class.add_method(Method::new("answer", "@@:", answer)).unwrap();
/// let obj = Object::new(&class);
///
/// let result = send_message(&obj, Selector::intern("answer"), &[]).unwrap();
/// assert_eq!(result, Some(Value::from(42)));
/// ```
pub fn send_message(obj: &Object, selector: Selector, args: &[Value]) -> Result<Option<Value>> {
    let class = obj.class();
    let Some(method) = class.lookup_method(selector) else {
        return Err(Error::SelectorNotFound {
            class: class.name().to_string(),
            selector: selector.name().to_string(),
        });
    };

    let expected = method.arg_count();
    if args.len() != expected {
        return Err(Error::ArgumentCountMismatch {
            expected,
            got: args.len(),
        });
    }

    trace!("-[{} {}]", class.name(), selector);
    let result = (method.imp)(obj, selector, args)?;
    if method.returns_void() {
        Ok(None)
    } else {
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::{Class, Method};

    fn echo(_this: &Object, _cmd: Selector, args: &[Value]) -> Result<Option<Value>> {
        Ok(args.first().cloned())
    }

    fn fail(_this: &Object, _cmd: Selector, _args: &[Value]) -> Result<Option<Value>> {
        Err(Error::raise("ValueError", "boom"))
    }

    fn echo_class(name: &str) -> Class {
        Class::define(name, None, |class| {
            class.add_method(Method::new("echo:", "@@:@", echo))?;
            class.add_method(Method::new("discard:", "v@:@", echo))?;
            class.add_method(Method::new("fail", "@@:", fail))
        })
        .unwrap()
    }

    #[test]
    fn test_send_returns_value() {
        let obj = Object::new(&echo_class("DispatchTestEcho"));
        let result = send_message(&obj, Selector::intern("echo:"), &[Value::from(7)]);
        assert_eq!(result, Ok(Some(Value::from(7))));
    }

    #[test]
    fn test_void_return_discards_value() {
        let obj = Object::new(&echo_class("DispatchTestVoid"));
        let result = send_message(&obj, Selector::intern("discard:"), &[Value::from(7)]);
        assert_eq!(result, Ok(None));
    }

    #[test]
    fn test_selector_not_found() {
        let obj = Object::new(&echo_class("DispatchTestMissing"));
        let err = send_message(&obj, Selector::intern("nothing"), &[]).unwrap_err();
        assert_eq!(
            err,
            Error::SelectorNotFound {
                class: "DispatchTestMissing".into(),
                selector: "nothing".into(),
            }
        );
    }

    #[test]
    fn test_argument_count_checked() {
        let obj = Object::new(&echo_class("DispatchTestArgs"));
        let err = send_message(&obj, Selector::intern("echo:"), &[]).unwrap_err();
        assert_eq!(err, Error::ArgumentCountMismatch { expected: 1, got: 0 });
    }

    #[test]
    fn test_errors_pass_through_unchanged() {
        let obj = Object::new(&echo_class("DispatchTestFail"));
        let err = obj.send("fail", &[]).unwrap_err();
        assert_eq!(err, Error::raise("ValueError", "boom"));
    }

    #[test]
    fn test_inherited_dispatch() {
        let parent = echo_class("DispatchTestParent");
        let child = Class::new("DispatchTestChild", &parent).unwrap();
        let obj = Object::new(&child);
        assert_eq!(obj.send("echo:", &[Value::from("hi")]), Ok(Some(Value::from("hi"))));
    }
}
