//! Library wrappers used through a namespace, with property-style checks
//! over generated inputs.

mod common;

use cloak::cloak::{MappedNamespace, NamespaceStore, SlotLayout, SlotNamespace};
use cloak::runtime::{Block, Dict};
use cloak::stdlib::{
    lazy_add, ArraySum, BoundedVar, Constant, Context, ContextRegistry, ContextVar, FileBackedVar,
    HistoricVar, InstanceProperty, SimpleArray,
};
use cloak::{Error, Value};
use common::Lcg;

// ============================================================================
// Scenarios
// ============================================================================

#[test]
fn test_constant_scenario_in_both_representations() {
    let mapped = MappedNamespace::new();
    mapped
        .store_name("CRITICAL_NUMBER", Constant::new(Value::from(100)).unwrap().into())
        .unwrap();
    assert!(matches!(
        mapped.store_name("CRITICAL_NUMBER", Value::from(105)),
        Err(Error::Raised(_))
    ));
    assert_eq!(mapped.load_name("CRITICAL_NUMBER"), Ok(Value::from(100)));

    let slots = SlotNamespace::new(SlotLayout::new(["CRITICAL_NUMBER"]).unwrap());
    slots
        .store_fast(0, Constant::new(Value::from(100)).unwrap().into())
        .unwrap();
    assert!(matches!(
        slots.store_fast(0, Value::from(105)),
        Err(Error::Raised(_))
    ));
    assert_eq!(slots.load_fast(0), Ok(Value::from(100)));
}

#[test]
fn test_machine_state_clamps_fields() {
    let fields = Dict::new();
    fields.insert("temperature", Value::from(20));
    let getter = Block::new(|args| Ok(args[0].as_dict()?.get("temperature").unwrap_or_default()));
    let setter = Block::new(|args| {
        let clamped = args[1].clamp_numeric(&Value::from(0), &Value::from(100))?;
        args[0].as_dict()?.insert("temperature", clamped);
        Ok(Value::Nil)
    });
    let prop = InstanceProperty::new(Value::from(fields.clone()), getter, Some(setter)).unwrap();

    let ns = MappedNamespace::new();
    ns.store_name("temperature", prop.into()).unwrap();
    for (input, expected) in [(-1, 0), (200, 100), (55, 55)] {
        ns.store_name("temperature", Value::from(input)).unwrap();
        assert_eq!(ns.load_name("temperature"), Ok(Value::from(expected)));
    }
    assert_eq!(fields.get("temperature"), Some(Value::from(55)));
}

// ============================================================================
// Properties over generated inputs
// ============================================================================

fn check_history<S: NamespaceStore>(ns: &S, rng: &mut Lcg) {
    let count = rng.next_i64(1, 20) as usize;
    let values: Vec<i64> = (0..count).map(|_| rng.next_i64(-1000, 1000)).collect();

    let var = HistoricVar::new(Value::from(values[0])).unwrap();
    let wrapper: Value = var.clone().into();
    ns.store_name("h", wrapper.clone()).unwrap();
    for v in &values[1..] {
        assert!(ns.store_name("h", Value::from(*v)).unwrap().was_intercepted());
    }

    assert!(ns.raw_get_name("h").unwrap().is_identical(&wrapper));
    assert_eq!(ns.load_name("h"), Ok(Value::from(values[count - 1])));
    let expected: Vec<Value> = values[..count - 1].iter().copied().map(Value::from).collect();
    assert_eq!(var.history(), expected);

    if count > 1 {
        let back = rng.next_i64(1, (count - 1) as i64) as usize;
        var.rollback(back).unwrap();
        assert_eq!(ns.load_name("h"), Ok(Value::from(values[count - 1 - back])));
        assert_eq!(var.history().len(), count - 1 - back);
        assert!(ns.raw_get_name("h").unwrap().is_identical(&wrapper));
    }
    assert!(var.rollback(count).is_err());
}

#[test]
fn test_history_property() {
    let mut rng = Lcg::new(7);
    for _ in 0..50 {
        check_history(&MappedNamespace::new(), &mut rng);
        check_history(&SlotNamespace::new(SlotLayout::new(["h"]).unwrap()), &mut rng);
    }
}

#[test]
fn test_constant_rejection_property() {
    let mut rng = Lcg::new(11);
    let ns = MappedNamespace::new();
    let start = rng.next_i64(i64::from(i32::MIN), i64::from(i32::MAX));
    ns.store_name("c", Constant::new(Value::from(start)).unwrap().into())
        .unwrap();
    for _ in 0..200 {
        let attempt = Value::from(rng.next_i64(-1_000_000, 1_000_000));
        assert!(ns.store_name("c", attempt).is_err());
        assert_eq!(ns.load_name("c"), Ok(Value::from(start)));
    }
}

#[test]
fn test_clamping_property() {
    let mut rng = Lcg::new(23);
    for _ in 0..50 {
        let lo = rng.next_i64(-500, 0);
        let hi = rng.next_i64(1, 500);
        let var = BoundedVar::new(Value::from(lo), Value::from(hi), Value::from(0)).unwrap();
        let ns = MappedNamespace::new();
        ns.store_name("b", var.into()).unwrap();

        for _ in 0..20 {
            let input = rng.next_i64(-1000, 1000);
            ns.store_name("b", Value::from(input)).unwrap();
            assert_eq!(ns.load_name("b"), Ok(Value::from(input.clamp(lo, hi))));
        }
    }
}

// ============================================================================
// Other wrappers
// ============================================================================

#[test]
fn test_context_variable_through_slots() {
    let registry = ContextRegistry::new();
    let var = ContextVar::declare(&registry, "request", Value::from("none")).unwrap();
    let ns = SlotNamespace::new(SlotLayout::new(["request"]).unwrap());
    ns.store_name("request", var.into()).unwrap();

    let ctx = Context::new(&registry);
    ctx.run(|| {
        ns.store_name("request", Value::from("r-1"))?;
        assert_eq!(ns.load_name("request")?, Value::from("r-1"));
        Ok(())
    })
    .unwrap();

    assert_eq!(ns.load_name("request"), Ok(Value::from("none")));
    assert!(ns.store_name("request", Value::from("late")).is_err());
}

#[test]
fn test_file_backed_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state.json");
    let var = FileBackedVar::new(&path, Value::from(vec![Value::from(1)])).unwrap();
    let ns = MappedNamespace::new();
    ns.store_name("state", var.clone().into()).unwrap();

    let dict = Dict::new();
    dict.insert("mode", Value::from("on"));
    ns.store_name("state", Value::from(dict)).unwrap();

    let read = FileBackedVar::read_back(&path).unwrap();
    assert_eq!(read.as_dict().unwrap().get("mode"), Some(Value::from("on")));

    var.close().unwrap();
    ns.store_name("state", Value::from(0)).unwrap();
    assert_eq!(ns.load_name("state"), Ok(Value::from(0)));
    assert!(FileBackedVar::read_back(&path).unwrap().as_dict().is_ok());
}

#[test]
fn test_lazy_sum_evaluates_on_load() {
    let arrays: Vec<Value> = (1..=3)
        .map(|k| {
            SimpleArray::new((0..4).map(|i| Value::from(i * k)).collect())
                .unwrap()
                .into()
        })
        .collect();
    let partial = lazy_add(&arrays[0], &arrays[1]).unwrap();
    let total = lazy_add(&partial, &arrays[2]).unwrap();
    let sum = ArraySum::try_from(&total).unwrap();
    assert_eq!(sum.node_count(), 3);
    assert_eq!(sum.evaluations(), 0);

    let ns = MappedNamespace::new();
    ns.store_name("total", total).unwrap();
    let result = SimpleArray::try_from(ns.load_name("total").unwrap()).unwrap();
    assert_eq!(
        result.values(),
        vec![Value::from(0), Value::from(6), Value::from(12), Value::from(18)]
    );

    ns.load_name("total").unwrap();
    assert_eq!(sum.evaluations(), 1);
}

#[test]
fn test_lazy_sum_rejects_mismatched_lengths() {
    let a: Value = SimpleArray::new(vec![Value::from(1)]).unwrap().into();
    let b: Value = SimpleArray::new(vec![Value::from(1), Value::from(2)]).unwrap().into();
    assert!(matches!(lazy_add(&a, &b), Err(Error::Raised(_))));
    assert!(matches!(lazy_add(&a, &Value::from(1)), Err(Error::Raised(_))));
}
