//! The host object runtime.
//!
//! A small Objective-C style runtime: interned symbols, dynamically typed
//! values, classes with single inheritance and cached method lookup, and
//! message dispatch. Cloaking values are ordinary objects of classes that
//! implement the hook selectors.
//!
//! - [`symbol`]: interned names and selectors
//! - [`value`]: runtime values and the ordinary containers
//! - [`class`]: classes, methods and hook flags
//! - [`object`]: reference-counted instances
//! - [`dispatch`]: message sending

pub mod class;
pub mod dispatch;
pub mod object;
pub mod symbol;
pub mod value;

pub use class::{
    all_classes, class_from_name, Class, Imp, Method, GET_HOOK_SELECTOR, HOOK_GET, HOOK_SET,
    SET_HOOK_SELECTOR,
};
pub use object::Object;
pub use symbol::{Selector, Symbol};
pub use value::{Block, Dict, List, Value};
