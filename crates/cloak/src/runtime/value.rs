//! Runtime values.
//!
//! [`Value`] is what a binding holds. Scalars are stored inline; strings,
//! containers, blocks and objects are shared references, so cloning a value
//! never copies the referent and [`Value::is_identical`] can tell two
//! references to the same thing apart from two equal things.
//!
//! [`List`] and [`Dict`] are the *ordinary containers*: a cloaking object
//! stored in one of them is just an element. Only namespaces consult hooks.

use std::cmp::Ordering;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use fxhash::FxHashMap;
use serde::ser::{Error as _, SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};

use crate::error::{Error, Result};
use crate::runtime::{Object, Symbol};

/// Signature of a native closure.
pub type BlockFn = dyn Fn(&[Value]) -> Result<Value> + Send + Sync;

/// A shared native closure, callable from method bodies.
///
/// Blocks let library classes carry behavior in instance variables, for
/// example the getter and setter of an `InstanceProperty`.
#[derive(Clone)]
pub struct Block(Arc<BlockFn>);

impl Block {
    /// Wraps a closure.
    pub fn new(f: impl Fn(&[Value]) -> Result<Value> + Send + Sync + 'static) -> Self {
        Block(Arc::new(f))
    }

    /// Calls the closure. Errors come back unchanged.
    ///
    /// # Errors
    ///
    /// Whatever the closure returns.
    pub fn call(&self, args: &[Value]) -> Result<Value> {
        (self.0)(args)
    }

    /// Reference identity.
    #[must_use]
    pub fn ptr_eq(&self, other: &Block) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<block {:p}>", Arc::as_ptr(&self.0).cast::<()>())
    }
}

/// A shared, mutable sequence.
#[derive(Clone, Default)]
pub struct List(Arc<RwLock<Vec<Value>>>);

impl List {
    /// Empty list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// List owning `items`.
    #[must_use]
    pub fn from_vec(items: Vec<Value>) -> Self {
        List(Arc::new(RwLock::new(items)))
    }

    fn read(&self) -> RwLockReadGuard<'_, Vec<Value>> {
        self.0.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<Value>> {
        self.0.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Appends an element.
    pub fn push(&self, value: Value) {
        self.write().push(value);
    }

    /// Removes and returns the last element.
    pub fn pop(&self) -> Option<Value> {
        self.write().pop()
    }

    /// Element at `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<Value> {
        self.read().get(index).cloned()
    }

    /// Element counted from the end (`-1` is the last one).
    #[must_use]
    pub fn get_signed(&self, index: i64) -> Option<Value> {
        let items = self.read();
        let len = i64::try_from(items.len()).ok()?;
        let resolved = if index < 0 { len + index } else { index };
        usize::try_from(resolved)
            .ok()
            .and_then(|i| items.get(i).cloned())
    }

    /// Replaces the element at `index`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SlotOutOfRange`] when `index` is past the end.
    pub fn set(&self, index: usize, value: Value) -> Result<()> {
        let mut items = self.write();
        let len = items.len();
        let slot = items
            .get_mut(index)
            .ok_or(Error::SlotOutOfRange { index, len })?;
        *slot = value;
        Ok(())
    }

    /// Appends every element of `other`.
    pub fn extend_from(&self, other: &List) {
        if self.ptr_eq(other) {
            let mut items = self.write();
            let copy = items.clone();
            items.extend(copy);
        } else {
            let extra = other.to_vec();
            self.write().extend(extra);
        }
    }

    /// Number of elements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// Whether the list is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Snapshot of the elements.
    #[must_use]
    pub fn to_vec(&self) -> Vec<Value> {
        self.read().clone()
    }

    /// Reference identity.
    #[must_use]
    pub fn ptr_eq(&self, other: &List) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

/// A shared, mutable map keyed by symbols.
#[derive(Clone, Default)]
pub struct Dict(Arc<RwLock<FxHashMap<Symbol, Value>>>);

impl Dict {
    /// Empty dict.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, FxHashMap<Symbol, Value>> {
        self.0.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, FxHashMap<Symbol, Value>> {
        self.0.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Value stored under `key`.
    #[must_use]
    pub fn get(&self, key: impl Into<Symbol>) -> Option<Value> {
        self.read().get(&key.into()).cloned()
    }

    /// Stores `value`, returning the previous one.
    pub fn insert(&self, key: impl Into<Symbol>, value: Value) -> Option<Value> {
        self.write().insert(key.into(), value)
    }

    /// Removes `key`.
    pub fn remove(&self, key: impl Into<Symbol>) -> Option<Value> {
        self.write().remove(&key.into())
    }

    /// Whether `key` is present.
    #[must_use]
    pub fn contains_key(&self, key: impl Into<Symbol>) -> bool {
        self.read().contains_key(&key.into())
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// Whether the dict is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Entries sorted by key name.
    #[must_use]
    pub fn entries(&self) -> Vec<(Symbol, Value)> {
        let mut entries: Vec<_> = self
            .read()
            .iter()
            .map(|(k, v)| (*k, v.clone()))
            .collect();
        entries.sort_by(|a, b| a.0.name().cmp(b.0.name()));
        entries
    }

    /// Reference identity.
    #[must_use]
    pub fn ptr_eq(&self, other: &Dict) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

/// A runtime value.
#[derive(Clone, Default)]
pub enum Value {
    /// Absence of a value; what a void hook produces.
    #[default]
    Nil,
    /// Boolean.
    Bool(bool),
    /// 64-bit integer.
    Int(i64),
    /// 64-bit float.
    Float(f64),
    /// Immutable shared string.
    Str(Arc<str>),
    /// Shared sequence.
    List(List),
    /// Shared symbol-keyed map.
    Dict(Dict),
    /// Native closure.
    Block(Block),
    /// Instance of a runtime class; the only kind of value that can cloak.
    Object(Object),
}

impl Value {
    /// Short name of the runtime type, used in error messages.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Nil => "nil",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "str",
            Value::List(_) => "list",
            Value::Dict(_) => "dict",
            Value::Block(_) => "block",
            Value::Object(_) => "object",
        }
    }

    /// Whether this is [`Value::Nil`].
    #[must_use]
    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    fn mismatch(&self, expected: &'static str) -> Error {
        Error::TypeMismatch {
            expected,
            got: self.type_name(),
        }
    }

    /// Integer payload.
    ///
    /// # Errors
    ///
    /// [`Error::TypeMismatch`] for anything but `Int`.
    pub fn as_int(&self) -> Result<i64> {
        match self {
            Value::Int(i) => Ok(*i),
            other => Err(other.mismatch("int")),
        }
    }

    /// Numeric payload as a float; integers are widened.
    ///
    /// # Errors
    ///
    /// [`Error::TypeMismatch`] for non-numbers.
    #[allow(clippy::cast_precision_loss)]
    pub fn as_float(&self) -> Result<f64> {
        match self {
            Value::Int(i) => Ok(*i as f64),
            Value::Float(f) => Ok(*f),
            other => Err(other.mismatch("number")),
        }
    }

    /// String payload.
    ///
    /// # Errors
    ///
    /// [`Error::TypeMismatch`] for anything but `Str`.
    pub fn as_str(&self) -> Result<&str> {
        match self {
            Value::Str(s) => Ok(s),
            other => Err(other.mismatch("str")),
        }
    }

    /// List payload.
    ///
    /// # Errors
    ///
    /// [`Error::TypeMismatch`] for anything but `List`.
    pub fn as_list(&self) -> Result<&List> {
        match self {
            Value::List(list) => Ok(list),
            other => Err(other.mismatch("list")),
        }
    }

    /// Dict payload.
    ///
    /// # Errors
    ///
    /// [`Error::TypeMismatch`] for anything but `Dict`.
    pub fn as_dict(&self) -> Result<&Dict> {
        match self {
            Value::Dict(dict) => Ok(dict),
            other => Err(other.mismatch("dict")),
        }
    }

    /// Block payload.
    ///
    /// # Errors
    ///
    /// [`Error::TypeMismatch`] for anything but `Block`.
    pub fn as_block(&self) -> Result<&Block> {
        match self {
            Value::Block(block) => Ok(block),
            other => Err(other.mismatch("block")),
        }
    }

    /// Object payload.
    ///
    /// # Errors
    ///
    /// [`Error::TypeMismatch`] for anything but `Object`.
    pub fn as_object(&self) -> Result<&Object> {
        match self {
            Value::Object(obj) => Ok(obj),
            other => Err(other.mismatch("object")),
        }
    }

    /// Identity comparison: same referent for reference types, same value
    /// for scalars.
    #[must_use]
    pub fn is_identical(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a.to_bits() == b.to_bits(),
            (Value::Str(a), Value::Str(b)) => Arc::ptr_eq(a, b),
            (Value::List(a), Value::List(b)) => a.ptr_eq(b),
            (Value::Dict(a), Value::Dict(b)) => a.ptr_eq(b),
            (Value::Block(a), Value::Block(b)) => a.ptr_eq(b),
            (Value::Object(a), Value::Object(b)) => a.ptr_eq(b),
            _ => false,
        }
    }

    /// Numeric ordering between two numbers.
    ///
    /// # Errors
    ///
    /// [`Error::TypeMismatch`] if either side is not a number, or if the
    /// comparison involves NaN.
    pub fn numeric_cmp(&self, other: &Value) -> Result<Ordering> {
        if let (Value::Int(a), Value::Int(b)) = (self, other) {
            return Ok(a.cmp(b));
        }
        let (a, b) = (self.as_float()?, other.as_float()?);
        a.partial_cmp(&b).ok_or(Error::TypeMismatch {
            expected: "comparable number",
            got: "NaN",
        })
    }

    /// Clamps a number into `[lo, hi]`, keeping its own representation when
    /// it is already inside the range.
    ///
    /// # Errors
    ///
    /// [`Error::TypeMismatch`] for non-numeric operands.
    pub fn clamp_numeric(&self, lo: &Value, hi: &Value) -> Result<Value> {
        if self.numeric_cmp(lo)? == Ordering::Less {
            return Ok(lo.clone());
        }
        if self.numeric_cmp(hi)? == Ordering::Greater {
            return Ok(hi.clone());
        }
        Ok(self.clone())
    }

    /// Builds a value from parsed JSON. Integers that fit in `i64` stay
    /// integers, every other number becomes a float.
    #[must_use]
    pub fn from_json(json: serde_json::Value) -> Value {
        match json {
            serde_json::Value::Null => Value::Nil,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => n.as_f64().map_or(Value::Nil, Value::Float),
            },
            serde_json::Value::String(s) => Value::from(s),
            serde_json::Value::Array(items) => Value::List(List::from_vec(
                items.into_iter().map(Value::from_json).collect(),
            )),
            serde_json::Value::Object(map) => {
                let dict = Dict::new();
                for (key, item) in map {
                    dict.insert(Symbol::intern(&key), Value::from_json(item));
                }
                Value::Dict(dict)
            }
        }
    }

    fn write_repr(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Str(s) => write!(f, "{s:?}"),
            other => fmt::Display::fmt(other, f),
        }
    }
}

impl PartialEq for Value {
    #[allow(clippy::cast_precision_loss)]
    fn eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Int(a), Value::Float(b)) | (Value::Float(b), Value::Int(a)) => {
                (*a as f64) == *b
            }
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::List(a), Value::List(b)) => a.ptr_eq(b) || a.to_vec() == b.to_vec(),
            (Value::Dict(a), Value::Dict(b)) => a.ptr_eq(b) || a.entries() == b.entries(),
            (Value::Block(a), Value::Block(b)) => a.ptr_eq(b),
            (Value::Object(a), Value::Object(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => f.write_str("nil"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{x:?}"),
            Value::Str(s) => f.write_str(s),
            Value::List(list) => {
                f.write_str("[")?;
                for (i, item) in list.to_vec().iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    item.write_repr(f)?;
                }
                f.write_str("]")
            }
            Value::Dict(dict) => {
                f.write_str("{")?;
                for (i, (key, item)) in dict.entries().iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{key}: ")?;
                    item.write_repr(f)?;
                }
                f.write_str("}")
            }
            Value::Block(block) => write!(f, "{block:?}"),
            Value::Object(obj) => write!(f, "<{}>", obj.class().name()),
        }
    }
}

impl fmt::Debug for List {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&Value::List(self.clone()), f)
    }
}

impl fmt::Debug for Dict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&Value::Dict(self.clone()), f)
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_repr(f)
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Value::Nil => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Int(i) => serializer.serialize_i64(*i),
            Value::Float(x) => serializer.serialize_f64(*x),
            Value::Str(s) => serializer.serialize_str(s),
            Value::List(list) => {
                let items = list.to_vec();
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in &items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Value::Dict(dict) => {
                let entries = dict.entries();
                let mut map = serializer.serialize_map(Some(entries.len()))?;
                for (key, item) in &entries {
                    map.serialize_entry(key.name(), item)?;
                }
                map.end()
            }
            Value::Block(_) | Value::Object(_) => Err(S::Error::custom(format!(
                "cannot serialize a value of type {}",
                self.type_name()
            ))),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(Arc::from(s))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(Arc::from(s))
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(List::from_vec(items))
    }
}

impl From<List> for Value {
    fn from(list: List) -> Self {
        Value::List(list)
    }
}

impl From<Dict> for Value {
    fn from(dict: Dict) -> Self {
        Value::Dict(dict)
    }
}

impl From<Block> for Value {
    fn from(block: Block) -> Self {
        Value::Block(block)
    }
}

impl From<Object> for Value {
    fn from(obj: Object) -> Self {
        Value::Object(obj)
    }
}
