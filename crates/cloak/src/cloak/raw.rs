//! The management surface: raw access and capability queries by scope depth.
//!
//! These functions never run a hook. They are how a program gets at the
//! wrapper object behind a cloaked name (to call its own methods, replace it
//! outright, or ask what it intercepts).
//!
//! `scope_depth` counts frames from the innermost one: `1` is the frame of
//! whoever is calling, `2` its caller, and so on. The functions themselves do
//! not occupy a frame.

use crate::cloak::frame::CallStack;
use crate::error::Result;
use crate::runtime::{Symbol, Value};

/// Depth used when a caller has no reason to pick another.
pub const DEFAULT_SCOPE_DEPTH: usize = 1;

/// The literal reference bound to `name` at `scope_depth`.
///
/// # Errors
///
/// [`Error::InvalidName`](crate::Error::InvalidName),
/// [`Error::ScopeDepthOutOfRange`](crate::Error::ScopeDepthOutOfRange) or
/// [`Error::UnboundName`](crate::Error::UnboundName).
///
/// # Example
///
/// ```rust
/// use cloak::cloak::{raw, CallStack};
/// use cloak::stdlib::Constant;
/// use cloak::runtime::{Symbol, Value};
///
/// let stack = CallStack::new();
/// let constant = Constant::new(Value::from(100)).unwrap();
/// stack.store_global(Symbol::intern("LIMIT"), constant.clone().into()).unwrap();
///
/// let wrapper = raw::raw_get(&stack, "LIMIT", raw::DEFAULT_SCOPE_DEPTH).unwrap();
/// assert!(wrapper.is_identical(&constant.into()));
/// ```
pub fn raw_get(stack: &CallStack, name: &str, scope_depth: usize) -> Result<Value> {
    let name: Symbol = name.parse()?;
    stack.scope_at(scope_depth)?.raw_get(name)
}

/// Binds `name` at `scope_depth` to `value`, replacing whatever was there.
/// Returns the replaced value.
///
/// # Errors
///
/// [`Error::InvalidName`](crate::Error::InvalidName),
/// [`Error::ScopeDepthOutOfRange`](crate::Error::ScopeDepthOutOfRange) or
/// [`Error::NotInLayout`](crate::Error::NotInLayout).
pub fn raw_set(stack: &CallStack, name: &str, value: Value, scope_depth: usize) -> Result<Option<Value>> {
    let name: Symbol = name.parse()?;
    stack.scope_at(scope_depth)?.raw_set(name, value)
}

/// Whether the value bound to `name` at `scope_depth` intercepts LOAD.
///
/// # Errors
///
/// As [`raw_get`].
pub fn has_get_hook(stack: &CallStack, name: &str, scope_depth: usize) -> Result<bool> {
    let name: Symbol = name.parse()?;
    Ok(stack.scope_at(scope_depth)?.capabilities(name)?.get())
}

/// Whether the value bound to `name` at `scope_depth` intercepts STORE.
///
/// # Errors
///
/// As [`raw_get`].
pub fn has_set_hook(stack: &CallStack, name: &str, scope_depth: usize) -> Result<bool> {
    let name: Symbol = name.parse()?;
    Ok(stack.scope_at(scope_depth)?.capabilities(name)?.set())
}

/// Whether the value bound to `name` in the innermost scope intercepts LOAD
/// or STORE.
///
/// # Errors
///
/// As [`raw_get`].
pub fn is_cloaking(stack: &CallStack, name: &str) -> Result<bool> {
    Ok(has_set_hook(stack, name, DEFAULT_SCOPE_DEPTH)?
        || has_get_hook(stack, name, DEFAULT_SCOPE_DEPTH)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn test_raw_get_plain_value() {
        let stack = CallStack::new();
        stack.store_global(Symbol::intern("p"), Value::from(3)).unwrap();
        assert_eq!(raw_get(&stack, "p", 1), Ok(Value::from(3)));
        assert_eq!(is_cloaking(&stack, "p"), Ok(false));
    }

    #[test]
    fn test_depth_selects_frame() {
        let mut stack = CallStack::new();
        stack.store_global(Symbol::intern("v"), Value::from("module")).unwrap();
        let scope = stack.mapped_scope();
        stack.push("f", scope);
        raw_set(&stack, "v", Value::from("local"), 1).unwrap();

        assert_eq!(raw_get(&stack, "v", 1), Ok(Value::from("local")));
        assert_eq!(raw_get(&stack, "v", 2), Ok(Value::from("module")));
        assert_eq!(
            raw_get(&stack, "v", 3),
            Err(Error::ScopeDepthOutOfRange { depth: 3, available: 2 })
        );
    }

    #[test]
    fn test_queries_on_unbound_name() {
        let stack = CallStack::new();
        assert!(matches!(has_get_hook(&stack, "nope", 1), Err(Error::UnboundName { .. })));
        assert!(matches!(is_cloaking(&stack, "nope"), Err(Error::UnboundName { .. })));
        assert_eq!(raw_get(&stack, "", 1), Err(Error::InvalidName));
    }
}
