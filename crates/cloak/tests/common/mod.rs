// Common test utilities for the cloak integration tests
//
// Helper classes with counting hooks, scope builders for both namespace
// representations, and a small deterministic number generator for the
// property-style tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};

use cloak::cloak::{Scope, SlotLayout};
use cloak::runtime::{Class, Method, Object, Selector, GET_HOOK_SELECTOR, SET_HOOK_SELECTOR};
use cloak::{Config, Result, Symbol, Value};

static CLASS_ID: AtomicUsize = AtomicUsize::new(0);

/// A class name no other test uses.
pub fn unique_class_name(prefix: &str) -> String {
    format!("{prefix}{}", CLASS_ID.fetch_add(1, Ordering::Relaxed))
}

pub fn sym(name: &str) -> Symbol {
    Symbol::intern(name)
}

/// One scope of each representation, both able to hold `names`.
pub fn both_scopes(names: &[&str], config: &Config) -> Vec<(&'static str, Scope)> {
    let layout = SlotLayout::new(names.iter().copied()).expect("valid layout");
    vec![
        ("mapped", Scope::mapped(config.clone())),
        ("slots", Scope::slots(layout, config.clone())),
    ]
}

fn bump(this: &Object, counter: &str) {
    let next = this.get_ivar(counter).as_int().unwrap_or(0) + 1;
    this.set_ivar(counter, Value::from(next));
}

fn counted_get(this: &Object, _cmd: Selector, _args: &[Value]) -> Result<Option<Value>> {
    bump(this, "gets");
    Ok(Some(this.get_ivar("value")))
}

fn counted_set(this: &Object, _cmd: Selector, args: &[Value]) -> Result<Option<Value>> {
    bump(this, "sets");
    this.set_ivar("value", args[0].clone());
    Ok(None)
}

fn define(name: &str, get: bool, set: bool) -> Class {
    Class::define(name, None, |class| {
        if get {
            class.add_method(Method::new(GET_HOOK_SELECTOR, "@@:", counted_get))?;
        }
        if set {
            class.add_method(Method::new(SET_HOOK_SELECTOR, "v@:@", counted_set))?;
        }
        Ok(())
    })
    .expect("test class registers")
}

/// Counts LOADs and STOREs; both forward to the `value` ivar.
pub fn counting_class() -> Class {
    define("TestCountingVar", true, true)
}

/// Intercepts LOAD only.
pub fn get_only_class() -> Class {
    define("TestGetOnlyVar", true, false)
}

/// Intercepts STORE only.
pub fn set_only_class() -> Class {
    define("TestSetOnlyVar", false, true)
}

/// A fresh instance of `class` whose `value` ivar holds `value`.
pub fn wrapper(class: &Class, value: Value) -> Object {
    let obj = Object::new(class);
    obj.set_ivar("value", value);
    obj
}

pub fn get_count(obj: &Object) -> i64 {
    obj.get_ivar("gets").as_int().unwrap_or(0)
}

pub fn set_count(obj: &Object) -> i64 {
    obj.get_ivar("sets").as_int().unwrap_or(0)
}

/// Deterministic pseudo-random integers (64-bit LCG).
pub struct Lcg(u64);

impl Lcg {
    pub fn new(seed: u64) -> Self {
        Lcg(seed)
    }

    pub fn next_i64(&mut self, lo: i64, hi: i64) -> i64 {
        self.0 = self
            .0
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);
        let span = (hi - lo + 1) as u64;
        lo + ((self.0 >> 33) % span) as i64
    }
}
