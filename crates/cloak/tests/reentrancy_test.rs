//! Hooks that reach back into the namespace holding them.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

use cloak::cloak::hooks::hook_depth;
use cloak::cloak::{
    HookKind, MappedNamespace, NamespaceStore, SlotLayout, SlotNamespace, StoreOutcome,
};
use cloak::runtime::Block;
use cloak::stdlib::InstanceProperty;
use cloak::{Config, Error, Result, Value};

fn property(getter: Block, setter: Option<Block>) -> Value {
    InstanceProperty::new(Value::Nil, getter, setter)
        .expect("property registers")
        .into()
}

#[test]
fn test_get_hook_loading_itself_is_refused() {
    let ns = Arc::new(MappedNamespace::new());
    let inner = Arc::clone(&ns);
    let getter = Block::new(move |_| inner.load_name("selfish"));
    ns.store_name("selfish", property(getter, None)).unwrap();

    assert_eq!(
        ns.load_name("selfish"),
        Err(Error::ReentrantHook {
            name: "selfish".to_string(),
            hook: HookKind::Get,
        })
    );
    assert_eq!(ns.guard().active_count(), 0);
    assert_eq!(hook_depth(), 0);
}

#[test]
fn test_set_hook_storing_itself_is_refused() {
    let ns = Arc::new(MappedNamespace::new());
    let inner = Arc::clone(&ns);
    let getter = Block::new(|_| Ok(Value::from(0)));
    let setter = Block::new(move |args| {
        inner.store_name("loop", args[1].clone())?;
        Ok(Value::Nil)
    });
    ns.store_name("loop", property(getter, Some(setter))).unwrap();

    assert_eq!(
        ns.store_name("loop", Value::from(1)),
        Err(Error::ReentrantHook {
            name: "loop".to_string(),
            hook: HookKind::Set,
        })
    );
    assert_eq!(ns.guard().active_count(), 0);
}

#[test]
fn test_set_hook_may_load_its_own_name() {
    let ns = Arc::new(MappedNamespace::new());
    let inner = Arc::clone(&ns);
    let getter = Block::new(|_| Ok(Value::from(41)));
    let setter = Block::new(move |_| Ok(Value::from(inner.load_name("peek")?.as_int()? + 1)));
    ns.store_name("peek", property(getter, Some(setter))).unwrap();

    let outcome = ns.store_name("peek", Value::from(0)).unwrap();
    assert_eq!(
        outcome,
        StoreOutcome::Intercepted {
            result: Some(Value::from(42))
        }
    );
}

#[test]
fn test_hooks_may_touch_other_names() {
    let ns = Arc::new(MappedNamespace::new());
    ns.store_name("counter", Value::from(0)).unwrap();

    let inner = Arc::clone(&ns);
    let getter = Block::new(move |_| {
        let next = inner.load_name("counter")?.as_int()? + 1;
        inner.store_name("counter", Value::from(next))?;
        Ok(Value::from(next))
    });
    ns.store_name("ticker", property(getter, None)).unwrap();

    assert_eq!(ns.load_name("ticker"), Ok(Value::from(1)));
    assert_eq!(ns.load_name("ticker"), Ok(Value::from(2)));
    assert_eq!(ns.raw_get_name("counter"), Ok(Value::from(2)));
}

#[test]
fn test_guard_off_hits_depth_limit() {
    let config = Config::default()
        .with_reentrancy_guard(false)
        .with_max_hook_depth(16);
    let ns = Arc::new(MappedNamespace::with_config(config));
    let inner = Arc::clone(&ns);
    let getter = Block::new(move |_| inner.load_name("recurse"));
    ns.store_name("recurse", property(getter, None)).unwrap();

    assert_eq!(
        ns.load_name("recurse"),
        Err(Error::HookDepthExceeded { depth: 16 })
    );
    assert_eq!(hook_depth(), 0);
}

#[test]
fn test_cycle_between_names_is_refused() {
    let ns = Arc::new(MappedNamespace::with_config(Config::default().with_max_hook_depth(8)));
    let to_b = Arc::clone(&ns);
    let to_a = Arc::clone(&ns);
    ns.store_name("a", property(Block::new(move |_| to_b.load_name("b")), None))
        .unwrap();
    ns.store_name("b", property(Block::new(move |_| to_a.load_name("a")), None))
        .unwrap();

    // Each name's guard mark only covers its own binding, so the cycle
    // reaches "a" again and is refused there.
    assert_eq!(
        ns.load_name("a"),
        Err(Error::ReentrantHook {
            name: "a".to_string(),
            hook: HookKind::Get,
        })
    );
}

#[test]
fn test_slot_namespace_guard() {
    let layout = SlotLayout::new(["me"]).unwrap();
    let ns = Arc::new(SlotNamespace::new(layout));
    let inner = Arc::clone(&ns);
    let getter = Block::new(move |_| inner.load_fast(0));
    ns.store_name("me", property(getter, None)).unwrap();

    assert!(matches!(
        ns.load_name("me"),
        Err(Error::ReentrantHook { hook: HookKind::Get, .. })
    ));
    assert_eq!(ns.guard().active_count(), 0);
}

#[test]
fn test_guard_recovers_after_error() {
    let ns = Arc::new(MappedNamespace::new());
    let inner = Arc::clone(&ns);
    let getter = Block::new(move |_| inner.load_name("flaky"));
    ns.store_name("flaky", property(getter, None)).unwrap();
    assert!(ns.load_name("flaky").is_err());

    ns.raw_set_name("flaky", Value::from(3)).unwrap();
    assert_eq!(ns.load_name("flaky"), Ok(Value::from(3)));
}

#[test]
fn test_refused_reentry_stays_refused() {
    let ns = Arc::new(MappedNamespace::new());
    let runs = Arc::new(AtomicUsize::new(0));
    let inner = Arc::clone(&ns);
    let counter = Arc::clone(&runs);
    let getter = Block::new(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
        match inner.load_name("twice") {
            Err(Error::ReentrantHook { .. }) => inner.load_name("twice"),
            other => other,
        }
    });
    ns.store_name("twice", property(getter, None)).unwrap();

    assert_eq!(
        ns.load_name("twice"),
        Err(Error::ReentrantHook {
            name: "twice".to_string(),
            hook: HookKind::Get,
        })
    );
    assert_eq!(runs.load(Ordering::SeqCst), 1);
    assert_eq!(ns.guard().active_count(), 0);
    assert_eq!(hook_depth(), 0);
}

fn slow_getter() -> Block {
    Block::new(|_| {
        thread::sleep(Duration::from_millis(50));
        Ok(Value::from(1))
    })
}

fn load_from_two_threads<S: NamespaceStore + Sync>(ns: &S, name: &str) -> Vec<Result<Value>> {
    let barrier = &Barrier::new(2);
    thread::scope(|scope| {
        let handles: Vec<_> = (0..2)
            .map(|_| {
                scope.spawn(move || {
                    barrier.wait();
                    ns.load_name(name)
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|handle| handle.join().expect("loader thread"))
            .collect()
    })
}

#[test]
fn test_concurrent_loads_are_not_reentry() {
    let mapped = MappedNamespace::new();
    mapped.store_name("shared", property(slow_getter(), None)).unwrap();
    assert_eq!(
        load_from_two_threads(&mapped, "shared"),
        vec![Ok(Value::from(1)), Ok(Value::from(1))]
    );
    assert_eq!(mapped.guard().active_count(), 0);

    let slots = SlotNamespace::new(SlotLayout::new(["shared"]).unwrap());
    slots.store_name("shared", property(slow_getter(), None)).unwrap();
    assert_eq!(
        load_from_two_threads(&slots, "shared"),
        vec![Ok(Value::from(1)), Ok(Value::from(1))]
    );
    assert_eq!(slots.guard().active_count(), 0);
}

fn getter_reads_itself_raw<S: NamespaceStore + Send + Sync + 'static>(ns: Arc<S>) {
    let inner = Arc::clone(&ns);
    let getter = Block::new(move |_| inner.raw_get_name("me"));
    let wrapper = property(getter, None);
    ns.store_name("me", wrapper.clone()).unwrap();

    let loaded = ns.load_name("me").unwrap();
    assert!(loaded.is_identical(&wrapper));
    assert!(ns.raw_get_name("me").unwrap().is_identical(&wrapper));
}

fn setter_replaces_itself_raw<S: NamespaceStore + Send + Sync + 'static>(ns: Arc<S>) {
    let inner = Arc::clone(&ns);
    let getter = Block::new(|_| Ok(Value::from("wrapped")));
    let setter = Block::new(move |args| {
        inner.raw_set_name("me", args[1].clone())?;
        Ok(Value::Nil)
    });
    ns.store_name("me", property(getter, Some(setter))).unwrap();
    assert_eq!(ns.load_name("me"), Ok(Value::from("wrapped")));

    let outcome = ns.store_name("me", Value::from(5)).unwrap();
    assert_eq!(outcome, StoreOutcome::Intercepted { result: Some(Value::Nil) });
    assert_eq!(ns.raw_get_name("me"), Ok(Value::from(5)));
    assert_eq!(ns.load_name("me"), Ok(Value::from(5)));
    assert_eq!(ns.binding("me".into()).map(|b| b.generation), Some(1));

    assert_eq!(
        ns.store_name("me", Value::from(6)),
        Ok(StoreOutcome::Rebound { previous: Value::from(5) })
    );
}

#[test]
fn test_hooks_use_raw_access_on_their_own_binding() {
    getter_reads_itself_raw(Arc::new(MappedNamespace::new()));
    getter_reads_itself_raw(Arc::new(SlotNamespace::new(SlotLayout::new(["me"]).unwrap())));

    setter_replaces_itself_raw(Arc::new(MappedNamespace::new()));
    setter_replaces_itself_raw(Arc::new(SlotNamespace::new(SlotLayout::new(["me"]).unwrap())));
}
