//! A variable mirrored to a file.
//!
//! Every STORE replaces the value and rewrites the backing file with its JSON
//! encoding. After [`FileBackedVar::close`] stores still update the value
//! but no longer touch the file.

use std::fs;
use std::path::{Path, PathBuf};

use cloak_log::debug;

use crate::error::{Error, Result};
use crate::runtime::{Class, Method, Object, Selector, Value, GET_HOOK_SELECTOR, SET_HOOK_SELECTOR};
use crate::stdlib::{first_arg, object_handle};

/// Runtime class name.
pub const CLASS_NAME: &str = "FileBackedVar";

const PATH: &str = "path";
const VALUE: &str = "value";
const OPEN: &str = "open";

/// The `FileBackedVar` class, registering it on first use.
///
/// # Errors
///
/// Only if registration fails.
pub fn class() -> Result<Class> {
    Class::define(CLASS_NAME, None, |class| {
        class.add_method(Method::new(GET_HOOK_SELECTOR, "@@:", get_value))?;
        class.add_method(Method::new(SET_HOOK_SELECTOR, "v@:@", set_value))?;
        class.add_method(Method::new("close", "v@:", close))?;
        class.add_method(Method::new("isOpen", "@@:", is_open))
    })
}

fn get_value(this: &Object, _cmd: Selector, _args: &[Value]) -> Result<Option<Value>> {
    Ok(Some(this.get_ivar(VALUE)))
}

fn set_value(this: &Object, _cmd: Selector, args: &[Value]) -> Result<Option<Value>> {
    let value = first_arg(args)?.clone();
    if matches!(this.get_ivar(OPEN), Value::Bool(true)) {
        let encoded = serde_json::to_vec(&value)?;
        let path = PathBuf::from(this.get_ivar(PATH).as_str()?);
        fs::write(&path, encoded).map_err(|err| Error::io(&path, &err))?;
        debug!("synced {} to {}", value, path.display());
    }
    this.set_ivar(VALUE, value);
    Ok(None)
}

fn close(this: &Object, _cmd: Selector, _args: &[Value]) -> Result<Option<Value>> {
    this.set_ivar(OPEN, Value::from(false));
    Ok(None)
}

fn is_open(this: &Object, _cmd: Selector, _args: &[Value]) -> Result<Option<Value>> {
    Ok(Some(this.get_ivar(OPEN)))
}

object_handle!(
    /// Handle to a `FileBackedVar` instance.
    FileBackedVar,
    class
);

impl FileBackedVar {
    /// A variable holding `start`, written to `path` immediately.
    ///
    /// # Errors
    ///
    /// [`Error::Io`] if the file cannot be written,
    /// [`Error::Serialization`] if `start` has no JSON form.
    pub fn new(path: impl AsRef<Path>, start: Value) -> Result<Self> {
        let path = path.as_ref();
        let obj = Object::new(&class()?);
        obj.set_ivar(PATH, Value::from(path.to_string_lossy().into_owned()));
        obj.set_ivar(OPEN, Value::from(true));
        obj.send(SET_HOOK_SELECTOR, &[start])?;
        Ok(FileBackedVar { obj })
    }

    /// The current value.
    #[must_use]
    pub fn current(&self) -> Value {
        self.obj.get_ivar(VALUE)
    }

    /// The backing file.
    #[must_use]
    pub fn path(&self) -> PathBuf {
        PathBuf::from(self.obj.get_ivar(PATH).to_string())
    }

    /// Stops syncing to the file.
    ///
    /// # Errors
    ///
    /// Only if dispatch fails.
    pub fn close(&self) -> Result<()> {
        self.obj.send("close", &[]).map(|_| ())
    }

    /// Whether stores are still written to the file.
    #[must_use]
    pub fn is_open(&self) -> bool {
        matches!(self.obj.get_ivar(OPEN), Value::Bool(true))
    }

    /// Reads back the value last written to `path`.
    ///
    /// # Errors
    ///
    /// [`Error::Io`] or [`Error::Serialization`].
    pub fn read_back(path: impl AsRef<Path>) -> Result<Value> {
        let path = path.as_ref();
        let bytes = fs::read(path).map_err(|err| Error::io(path, &err))?;
        Ok(Value::from_json(serde_json::from_slice(&bytes)?))
    }
}
