//! Demo implementations
//!
//! Every demo drives a [`CallStack`] whose module namespace plays the part of
//! a program's globals. Raw reads stand in for fetching the wrapper behind a
//! cloaked name.

use std::path::PathBuf;

use cloak::cloak::raw::{self, DEFAULT_SCOPE_DEPTH};
use cloak::cloak::{CallStack, NamespaceStore, SlotLayout, SlotNamespace};
use cloak::runtime::{Block, Dict};
use cloak::stdlib::{
    lazy_add, ArraySum, Constant, Context, ContextRegistry, ContextVar, FileBackedVar, HistoricVar,
    InstanceProperty, SimpleArray,
};
use cloak::{Config, Error, Result, Symbol, Value};
use cloak_log::info;

fn banner(title: &str) {
    println!("{title}");
    println!();
}

fn footer() {
    println!();
    println!();
}

pub fn history(config: &Config) -> Result<()> {
    banner("Demoing a variable with history:");
    let stack = CallStack::with_config(config.clone());
    let g = Symbol::intern("g");

    stack.store_global(g, HistoricVar::new(Value::from(2))?.into())?;
    stack.store_global(g, Value::from(12))?;
    stack.store_global(g, Value::from("hello world"))?;
    stack.store_global(
        g,
        Value::from(vec![Value::from(1), Value::from(2), Value::from(3)]),
    )?;
    println!("The current value of g is {}", stack.load_global(g)?);

    let var = HistoricVar::try_from(raw::raw_get(&stack, "g", DEFAULT_SCOPE_DEPTH)?)?;
    println!("The history of g is {}", Value::from(var.history()));

    println!("Rolling back the history on g");
    var.rollback(2)?;
    println!("The current value of g is {}", stack.load_global(g)?);
    println!("The history of g is {}", Value::from(var.history()));
    footer();
    Ok(())
}

pub fn file(config: &Config, path: Option<PathBuf>) -> Result<()> {
    banner("Demoing a variable that syncs to disk");
    let path = path.unwrap_or_else(|| std::env::temp_dir().join("exampleFileVar.json"));
    let stack = CallStack::with_config(config.clone());
    let name = Symbol::intern("fileVar");

    println!("Creating a new file backed variable, with value 'hello world'");
    stack.store_global(name, FileBackedVar::new(&path, Value::from("hello world"))?.into())?;
    println!("Reassigning the value to 'Brave new world'");
    stack.store_global(name, Value::from("Brave new world"))?;
    println!("Close the backing file");
    FileBackedVar::try_from(raw::raw_get(&stack, "fileVar", DEFAULT_SCOPE_DEPTH)?)?.close()?;

    println!("Load back in the saved var");
    let value = FileBackedVar::read_back(&path)?;
    println!("The file var stored the value {value}");
    info!("backing file at {}", path.display());
    footer();
    Ok(())
}

pub fn context(config: &Config) -> Result<()> {
    banner("Demoing an implementation of context variables:");
    let registry = ContextRegistry::new();
    let first = Context::new(&registry);
    let second = Context::new(&registry);

    let stack = CallStack::with_config(config.clone());
    let name = Symbol::intern("convar");
    stack.store_global(
        name,
        ContextVar::declare(&registry, "convar", Value::from("hello world"))?.into(),
    )?;

    println!("Setting the context variable in context 1");
    first.run(|| stack.store_global(name, Value::from(1)).map(|_| ()))?;
    println!("Printing the context variable in context 1");
    first.run(|| {
        println!("{}", stack.load_global(name)?);
        Ok(())
    })?;
    println!("Printing the context variable in context 2, it has the default value");
    second.run(|| {
        println!("{}", stack.load_global(name)?);
        Ok(())
    })?;
    footer();
    Ok(())
}

pub fn constant(config: &Config) -> Result<()> {
    banner("Demoing constant variables:");
    let stack = CallStack::with_config(config.clone());
    let name = Symbol::intern("CRITICAL_NUMBER");
    stack.store_global(name, Constant::new(Value::from(100))?.into())?;

    let loaded = stack.load_global(name)?;
    println!("The declared constant is:");
    println!("{loaded}");
    println!("The type of the declared constant is (i.e. the cloaking type):");
    println!("{}", loaded.type_name());
    println!("The real type is:");
    let wrapper = raw::raw_get(&stack, "CRITICAL_NUMBER", DEFAULT_SCOPE_DEPTH)?;
    println!("{}", wrapper.as_object()?.class().name());

    println!("Attempting to reassign throws an error:");
    match stack.store_global(name, Value::from(105)) {
        Err(Error::Raised(exception)) => println!("{}", exception.reason),
        Err(err) => return Err(err),
        Ok(_) => println!("The constant was reassigned"),
    }
    footer();
    Ok(())
}

/// A field of `fields` exposed as a property that keeps it in `[0, 100]`.
fn clamped_field(fields: &Dict, name: &'static str, start: i64) -> Result<InstanceProperty> {
    let getter = Block::new(move |args| Ok(args[0].as_dict()?.get(name).unwrap_or_default()));
    let setter = Block::new(move |args| {
        let clamped = args[1].clamp_numeric(&Value::from(0), &Value::from(100))?;
        args[0].as_dict()?.insert(name, clamped);
        Ok(Value::Nil)
    });
    setter.call(&[Value::from(fields.clone()), Value::from(start)])?;
    InstanceProperty::new(Value::from(fields.clone()), getter, Some(setter))
}

pub fn property(config: &Config) -> Result<()> {
    banner("Demoing instance properties:");
    let names = ["a", "b", "c"];
    let machine = SlotNamespace::with_config(SlotLayout::new(names)?, config.clone());
    let fields = Dict::new();
    for (name, start) in names.into_iter().zip([-1, 0, 1]) {
        machine.store_name(name, clamped_field(&fields, name, start)?.into())?;
    }

    println!("This instance property only allows values between 0 and 100");
    println!("Instantiated with a: -1, b: 0, c: 1");
    for name in names {
        println!("machine.{name} is {}", machine.load_name(name)?);
    }

    println!("Assigning a value of 200 to attribute c");
    machine.store_name("c", Value::from(200))?;
    println!("machine.c is {}", machine.load_name("c")?);
    footer();
    Ok(())
}

pub fn lazy(config: &Config, arrays: usize, length: usize) -> Result<()> {
    println!("Creating {arrays} 'long' arrays with {length} elements");
    let upper = i64::try_from(length).unwrap_or(i64::MAX);
    let operands = (0..arrays)
        .map(|_| SimpleArray::new((0..upper).map(Value::from).collect()).map(Value::from))
        .collect::<Result<Vec<_>>>()?;

    println!("Add them all together with a single loop over the values");
    println!("Will only do the additions once");
    let mut operands = operands.into_iter();
    let Some(mut total) = operands.next() else {
        return Err(Error::raise("ValueError", "Need at least one array"));
    };
    for operand in operands {
        total = lazy_add(&total, &operand)?;
    }

    let stack = CallStack::with_config(config.clone());
    let name = Symbol::intern("arr7");
    stack.store_global(name, total.clone())?;

    let first = SimpleArray::try_from(stack.load_global(name)?)?;
    let second = SimpleArray::try_from(stack.load_global(name)?)?;
    let last = first.values().last().cloned().unwrap_or_default();
    println!("The final array element of the combined array is {last}");
    println!("Both reads returned the same array: {}", first.object().ptr_eq(second.object()));
    if let Ok(sum) = ArraySum::try_from(&total) {
        println!("Additions performed {} time(s)", sum.evaluations());
    }
    footer();
    Ok(())
}
