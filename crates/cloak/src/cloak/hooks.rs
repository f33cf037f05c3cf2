//! Hook invocation.
//!
//! Hooks are ordinary methods, so calling one is a plain
//! [`send_message`](crate::runtime::dispatch::send_message) with the hook
//! selector. The result, or the error, goes back to the LOAD/STORE call site
//! exactly as the method produced it.
//!
//! A thread-local counter tracks how many hook calls are active. A hook that
//! keeps loading or storing cloaked names (its own, with the reentrancy guard
//! off, or a cycle between two names) would otherwise overflow the native
//! stack; past `max_hook_depth` the call is refused with
//! [`Error::HookDepthExceeded`].

use std::cell::Cell;

use cloak_log::trace;

use crate::error::{Error, Result};
use crate::runtime::class::{get_hook_selector, set_hook_selector};
use crate::runtime::{dispatch, Object, Value};

thread_local! {
    static HOOK_DEPTH: Cell<u32> = const { Cell::new(0) };
}

/// Decrements the hook depth when dropped, on every exit path.
struct DepthToken;

impl DepthToken {
    fn enter(max_depth: u32) -> Result<Self> {
        HOOK_DEPTH.with(|depth| {
            let current = depth.get();
            if current >= max_depth {
                Err(Error::HookDepthExceeded { depth: max_depth })
            } else {
                depth.set(current + 1);
                Ok(DepthToken)
            }
        })
    }
}

impl Drop for DepthToken {
    fn drop(&mut self) {
        HOOK_DEPTH.with(|depth| depth.set(depth.get().saturating_sub(1)));
    }
}

/// Number of hook calls currently active on this thread.
#[must_use]
pub fn hook_depth() -> u32 {
    HOOK_DEPTH.with(Cell::get)
}

/// Runs the get-hook of `obj`.
///
/// A hook that returns nothing produces [`Value::Nil`].
///
/// # Errors
///
/// [`Error::HookDepthExceeded`] past `max_depth` nested hook calls, otherwise
/// whatever the hook returns.
pub fn call_get_hook(obj: &Object, max_depth: u32) -> Result<Value> {
    let _token = DepthToken::enter(max_depth)?;
    trace!("get hook on <{}>", obj.class().name());
    Ok(dispatch::send_message(obj, get_hook_selector(), &[])?.unwrap_or_default())
}

/// Runs the set-hook of `obj` with `value`.
///
/// # Errors
///
/// [`Error::HookDepthExceeded`] past `max_depth` nested hook calls, otherwise
/// whatever the hook returns.
pub fn call_set_hook(obj: &Object, value: Value, max_depth: u32) -> Result<Option<Value>> {
    let _token = DepthToken::enter(max_depth)?;
    trace!("set hook on <{}>", obj.class().name());
    dispatch::send_message(obj, set_hook_selector(), &[value])
}
