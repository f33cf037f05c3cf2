//! `cloak`: namespace bindings whose values intercept LOAD and STORE.
//!
//! A *cloaking* value decides what happens when the name it is bound to is
//! read or rebound. Reading a name bound to a value with a get-hook returns
//! the hook's result; assigning to a name bound to a value with a set-hook
//! calls the hook and leaves the binding in place. The same value sitting in
//! an ordinary list or dict is just a value.
//!
//! # Architecture
//!
//! - [`runtime`]: a small Objective-C style object runtime (symbols, values,
//!   classes, objects, message dispatch). Hooks are ordinary methods.
//! - [`cloak`](mod@cloak): the protocol. Capability probe, hook invocation,
//!   the [`NamespaceStore`](cloak::NamespaceStore) trait with name-keyed and
//!   slot-array backings, call stacks and the raw management surface.
//! - [`stdlib`]: cloaking classes built on the protocol: history, constants,
//!   instance properties, bounded values, context variables, file-backed
//!   variables and lazily summed arrays.
//!
//! # Example
//!
//! ```rust
//! use cloak::cloak::{MappedNamespace, NamespaceStore};
//! use cloak::runtime::Value;
//! use cloak::stdlib::HistoricVar;
//!
//! let ns = MappedNamespace::new();
//! ns.store_name("g", HistoricVar::new(Value::from(2)).unwrap().into()).unwrap();
//! ns.store_name("g", Value::from(12)).unwrap();
//!
//! assert_eq!(ns.load_name("g").unwrap(), Value::from(12));
//!
//! let wrapper = HistoricVar::try_from(ns.raw_get_name("g").unwrap()).unwrap();
//! assert_eq!(wrapper.history(), vec![Value::from(2)]);
//! ```

pub mod cloak;
pub mod config;
pub mod error;
pub mod runtime;
pub mod stdlib;

pub use config::Config;
pub use error::{Error, Exception, Result};
pub use runtime::{Class, Method, Object, Selector, Symbol, Value};
