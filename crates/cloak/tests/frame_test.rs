//! Call stacks and the depth-addressed management functions.

mod common;

use cloak::cloak::raw::{self, DEFAULT_SCOPE_DEPTH};
use cloak::cloak::{CallStack, NamespaceStore, SlotLayout};
use cloak::stdlib::{BoundedVar, Constant, HistoricVar};
use cloak::{Config, Error, Value};
use common::{counting_class, get_count, get_only_class, set_count, sym, wrapper};

#[test]
fn test_raw_get_reaches_enclosing_frames() {
    let mut stack = CallStack::new();
    let constant = Constant::new(Value::from(100)).unwrap();
    stack
        .store_global(sym("LIMIT"), constant.clone().into())
        .unwrap();

    let scope = stack.slot_scope(SlotLayout::new(["local"]).unwrap());
    stack
        .call("f", scope, |stack| {
            assert!(raw::raw_get(stack, "LIMIT", 2)?.is_identical(&constant.clone().into()));
            assert_eq!(
                raw::raw_get(stack, "LIMIT", DEFAULT_SCOPE_DEPTH),
                Err(Error::UnboundName { name: "LIMIT".to_string() })
            );
            assert_eq!(
                raw::raw_get(stack, "LIMIT", 3),
                Err(Error::ScopeDepthOutOfRange { depth: 3, available: 2 })
            );
            Ok(())
        })
        .unwrap();
}

#[test]
fn test_raw_set_replaces_wrapper_in_caller() {
    let mut stack = CallStack::new();
    let level = BoundedVar::new(Value::from(0), Value::from(10), Value::from(5)).unwrap();
    stack.store_global(sym("level"), level.into()).unwrap();

    let scope = stack.mapped_scope();
    stack
        .call("reset", scope, |stack| {
            let old = raw::raw_set(stack, "level", Value::from(99), 2)?;
            assert!(old.is_some_and(|v| BoundedVar::try_from(v).is_ok()));
            Ok(())
        })
        .unwrap();

    assert_eq!(stack.load_global(sym("level")), Ok(Value::from(99)));
    assert!(!raw::is_cloaking(&stack, "level").unwrap());
}

#[test]
fn test_capability_queries_by_depth() {
    let mut stack = CallStack::new();
    stack
        .store_global(sym("g"), wrapper(&get_only_class(), Value::Nil).into())
        .unwrap();
    stack.store_global(sym("plain"), Value::from(1)).unwrap();

    assert!(raw::has_get_hook(&stack, "g", 1).unwrap());
    assert!(!raw::has_set_hook(&stack, "g", 1).unwrap());
    assert!(raw::is_cloaking(&stack, "g").unwrap());
    assert!(!raw::is_cloaking(&stack, "plain").unwrap());
    assert!(matches!(
        raw::has_get_hook(&stack, "missing", 1),
        Err(Error::UnboundName { .. })
    ));

    let scope = stack.mapped_scope();
    stack.push("inner", scope);
    assert!(raw::has_get_hook(&stack, "g", 2).unwrap());
    assert!(raw::is_cloaking(&stack, "g").is_err());
    assert_eq!(raw::has_get_hook(&stack, "", 1), Err(Error::InvalidName));
    stack.pop().unwrap();
}

#[test]
fn test_local_wrappers_in_slot_frames() {
    let mut stack = CallStack::new();
    let layout = SlotLayout::new(["h", "n"]).unwrap();
    let var = HistoricVar::new(Value::from(1)).unwrap();

    let scope = stack.slot_scope(layout);
    let loaded = stack
        .call("work", scope, |stack| {
            stack.store_local(sym("h"), var.clone().into())?;
            stack.store_local(sym("h"), Value::from(2))?;
            stack.store_local(sym("h"), Value::from(3))?;
            assert!(raw::is_cloaking(stack, "h")?);
            stack.load_name(sym("h"))
        })
        .unwrap();

    assert_eq!(loaded, Value::from(3));
    assert_eq!(var.history(), vec![Value::from(1), Value::from(2)]);
    assert_eq!(stack.depth(), 1);
}

#[test]
fn test_load_name_runs_module_hook() {
    let mut stack = CallStack::new();
    let obj = wrapper(&counting_class(), Value::from(8));
    stack.store_global(sym("shared"), obj.clone().into()).unwrap();

    let scope = stack.mapped_scope();
    let seen = stack
        .call("reader", scope, |stack| stack.load_name(sym("shared")))
        .unwrap();
    assert_eq!(seen, Value::from(8));
    assert_eq!((get_count(&obj), set_count(&obj)), (1, 0));
}

#[test]
fn test_stack_config_reaches_scopes() {
    let config = Config::default().with_reentrancy_guard(false);
    let stack = CallStack::with_config(config.clone());
    assert_eq!(stack.config(), &config);
    assert!(!stack.globals().config().reentrancy_guard);
}
