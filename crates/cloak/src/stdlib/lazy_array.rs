//! Deferred array addition.
//!
//! Adding [`SimpleArray`]s does no arithmetic: it collects the operands into
//! an [`ArraySum`]. Binding the sum to a name and loading it runs every
//! addition in a single pass over the elements and caches the result, so a
//! chain `a + b + c + d` costs one traversal however long it is.

use cloak_log::info;

use crate::error::{Error, Result};
use crate::runtime::{Class, List, Method, Object, Selector, Value, GET_HOOK_SELECTOR};
use crate::stdlib::{first_arg, object_handle};

/// Runtime class name of [`SimpleArray`].
pub const ARRAY_CLASS_NAME: &str = "SimpleArray";

/// Runtime class name of [`ArraySum`].
pub const SUM_CLASS_NAME: &str = "ArraySum";

const VALUES: &str = "values";
const NODES: &str = "nodes";
const LENGTH: &str = "length";
const CACHED: &str = "cached";
const EVALUATIONS: &str = "evaluations";

/// The `SimpleArray` class, registering it on first use.
///
/// # Errors
///
/// Only if registration fails.
pub fn array_class() -> Result<Class> {
    Class::define(ARRAY_CLASS_NAME, None, |class| {
        class.add_method(Method::new("values", "@@:", array_values))?;
        class.add_method(Method::new("add:", "@@:@", add_method))
    })
}

/// The `ArraySum` class, registering it on first use.
///
/// # Errors
///
/// Only if registration fails.
pub fn sum_class() -> Result<Class> {
    Class::define(SUM_CLASS_NAME, None, |class| {
        class.add_method(Method::new(GET_HOOK_SELECTOR, "@@:", evaluate))?;
        class.add_method(Method::new("add:", "@@:@", add_method))
    })
}

fn array_values(this: &Object, _cmd: Selector, _args: &[Value]) -> Result<Option<Value>> {
    Ok(Some(Value::from(this.get_ivar(VALUES).as_list()?.to_vec())))
}

fn add_method(this: &Object, _cmd: Selector, args: &[Value]) -> Result<Option<Value>> {
    lazy_add(&Value::Object(this.clone()), first_arg(args)?).map(Some)
}

/// Adds two numbers. Integer overflow falls back to float.
#[allow(clippy::cast_precision_loss)]
fn add_numbers(a: &Value, b: &Value) -> Result<Value> {
    match (a, b) {
        (Value::Int(x), Value::Int(y)) => Ok(x
            .checked_add(*y)
            .map_or_else(|| Value::Float(*x as f64 + *y as f64), Value::Int)),
        _ => Ok(Value::Float(a.as_float()? + b.as_float()?)),
    }
}

fn evaluate(this: &Object, _cmd: Selector, _args: &[Value]) -> Result<Option<Value>> {
    let cached = this.get_ivar(CACHED);
    if !cached.is_nil() {
        return Ok(Some(cached));
    }

    let nodes = this.get_ivar(NODES).as_list()?.to_vec();
    let length = usize::try_from(this.get_ivar(LENGTH).as_int()?).unwrap_or(0);
    info!("summing {} arrays of length {length}", nodes.len());

    let columns: Vec<Vec<Value>> = nodes
        .iter()
        .map(|node| -> Result<Vec<Value>> {
            Ok(node.as_object()?.get_ivar(VALUES).as_list()?.to_vec())
        })
        .collect::<Result<_>>()?;

    let mut sums = vec![Value::from(0); length];
    for column in &columns {
        for (sum, item) in sums.iter_mut().zip(column) {
            *sum = add_numbers(sum, item)?;
        }
    }

    let result: Value = SimpleArray::new(sums)?.into();
    this.set_ivar(CACHED, result.clone());
    let evaluations = this.get_ivar(EVALUATIONS).as_int().unwrap_or(0);
    this.set_ivar(EVALUATIONS, Value::from(evaluations + 1));
    Ok(Some(result))
}

object_handle!(
    /// Handle to a `SimpleArray` instance: a plain list of numbers.
    SimpleArray,
    array_class
);

impl SimpleArray {
    /// An array holding `values`.
    ///
    /// # Errors
    ///
    /// Only if the class cannot be registered.
    pub fn new(values: Vec<Value>) -> Result<Self> {
        let obj = Object::new(&array_class()?);
        obj.set_ivar(VALUES, Value::from(values));
        Ok(SimpleArray { obj })
    }

    /// The elements.
    #[must_use]
    pub fn values(&self) -> Vec<Value> {
        self.list().map(|list| list.to_vec()).unwrap_or_default()
    }

    /// Number of elements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.list().map_or(0, |list| list.len())
    }

    /// Whether the array is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn list(&self) -> Result<List> {
        self.obj.get_ivar(VALUES).as_list().cloned()
    }
}

object_handle!(
    /// Handle to an `ArraySum` instance: pending additions.
    ///
    /// ```rust
    /// use cloak::cloak::{MappedNamespace, NamespaceStore};
    /// use cloak::runtime::Value;
    /// use cloak::stdlib::{lazy_add, ArraySum, SimpleArray};
    ///
    /// let a: Value = SimpleArray::new(vec![Value::from(1), Value::from(2)]).unwrap().into();
    /// let b: Value = SimpleArray::new(vec![Value::from(10), Value::from(20)]).unwrap().into();
    /// let sum = lazy_add(&a, &b).unwrap();
    ///
    /// let ns = MappedNamespace::new();
    /// ns.store_name("total", sum.clone()).unwrap();
    /// let total = SimpleArray::try_from(ns.load_name("total").unwrap()).unwrap();
    ///
    /// assert_eq!(total.values(), vec![Value::from(11), Value::from(22)]);
    /// assert_eq!(ArraySum::try_from(sum).unwrap().evaluations(), 1);
    /// ```
    ArraySum,
    sum_class
);

impl ArraySum {
    /// Pending sum of `nodes`.
    ///
    /// # Errors
    ///
    /// A `ValueError` exception when `nodes` is empty or the arrays differ
    /// in length.
    pub fn new(nodes: Vec<SimpleArray>) -> Result<Self> {
        let Some(first) = nodes.first() else {
            return Err(Error::raise(
                "ValueError",
                "There must be at least one node at initialization",
            ));
        };
        let length = first.len();
        if nodes.iter().any(|node| node.len() != length) {
            return Err(length_mismatch());
        }
        let obj = Object::new(&sum_class()?);
        obj.set_ivar(
            NODES,
            Value::from(nodes.into_iter().map(Value::from).collect::<Vec<_>>()),
        );
        obj.set_ivar(LENGTH, Value::from(i64::try_from(length).unwrap_or(i64::MAX)));
        obj.set_ivar(EVALUATIONS, Value::from(0));
        Ok(ArraySum { obj })
    }

    /// Number of arrays being summed.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes().map_or(0, |list| list.len())
    }

    /// Length every operand shares.
    #[must_use]
    pub fn length(&self) -> usize {
        self.obj
            .get_ivar(LENGTH)
            .as_int()
            .ok()
            .and_then(|n| usize::try_from(n).ok())
            .unwrap_or(0)
    }

    /// How many times the additions have actually been carried out.
    #[must_use]
    pub fn evaluations(&self) -> i64 {
        self.obj.get_ivar(EVALUATIONS).as_int().unwrap_or(0)
    }

    fn nodes(&self) -> Result<List> {
        self.obj.get_ivar(NODES).as_list().cloned()
    }

    fn append_array(&self, array: &SimpleArray) -> Result<()> {
        if array.len() != self.length() {
            return Err(length_mismatch());
        }
        self.nodes()?.push(array.clone().into());
        self.obj.set_ivar(CACHED, Value::Nil);
        Ok(())
    }

    fn append_sum(&self, other: &ArraySum) -> Result<()> {
        if other.length() != self.length() {
            return Err(length_mismatch());
        }
        self.nodes()?.extend_from(&other.nodes()?);
        self.obj.set_ivar(CACHED, Value::Nil);
        Ok(())
    }
}

fn length_mismatch() -> Error {
    Error::raise("ValueError", "Can only add arrays of the same length")
}

fn type_error() -> Error {
    Error::raise("TypeError", "Can only add SimpleArrays or ArraySums")
}

/// `a + b` for arrays and pending sums.
///
/// - array + array: a new [`ArraySum`] of both
/// - sum + array, array + sum: the array is appended to the sum
/// - sum + sum: the right sum's arrays are appended to the left one
///
/// The sum that receives new operands is returned, and its cached result is
/// dropped.
///
/// # Errors
///
/// A `TypeError` exception when either side is something else, a
/// `ValueError` exception when the lengths differ.
pub fn lazy_add(a: &Value, b: &Value) -> Result<Value> {
    let as_array = |v: &Value| SimpleArray::try_from(v).ok();
    let as_sum = |v: &Value| ArraySum::try_from(v).ok();

    if let Some(left) = as_array(a) {
        if let Some(right) = as_array(b) {
            return ArraySum::new(vec![left, right]).map(Value::from);
        }
        if let Some(right) = as_sum(b) {
            right.append_array(&left)?;
            return Ok(right.into());
        }
        return Err(type_error());
    }
    if let Some(left) = as_sum(a) {
        if let Some(right) = as_array(b) {
            left.append_array(&right)?;
            return Ok(left.into());
        }
        if let Some(right) = as_sum(b) {
            left.append_sum(&right)?;
            return Ok(left.into());
        }
    }
    Err(type_error())
}
