//! Native callbacks exposed to scripts.

use crate::{ScriptError, Stack};
use rquickjs::object::Property;
use rquickjs::{function::Rest, Array, Ctx, Exception, Function, Persistent, Value as JsValue};
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

/// Property that marks a script function as a wrapper around a native one.
pub(crate) const NATIVE_TAG: &str = "__tether_native";

type Callback = dyn for<'js> Fn(&mut Stack<'js>) -> Result<usize, ScriptError>;

/// A native function with a fixed arity.
///
/// The callback finds its arguments on the stack, first argument deepest,
/// pushes its results and returns how many it pushed. Scripts calling it
/// with any other argument count get an error instead of a call.
///
/// ```ignore
/// let add = NativeFunction::new(2, |stack| {
///     let (a, b): (f64, f64) = stack.take()?;
///     stack.push(a + b)?;
///     Ok(1)
/// });
/// ```
#[derive(Clone)]
pub struct NativeFunction {
    arity: usize,
    callback: Rc<Callback>,
}

impl NativeFunction {
    pub fn new<F>(arity: usize, callback: F) -> Self
    where
        F: for<'js> Fn(&mut Stack<'js>) -> Result<usize, ScriptError> + 'static,
    {
        Self {
            arity,
            callback: Rc::new(callback),
        }
    }

    pub fn arity(&self) -> usize {
        self.arity
    }

    /// Run the callback against `stack` directly.
    pub fn call(&self, stack: &mut Stack<'_>) -> Result<usize, ScriptError> {
        (self.callback)(stack)
    }

    /// Whether both values wrap the same callback.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        std::ptr::addr_eq(Rc::as_ptr(&self.callback), Rc::as_ptr(&other.callback))
    }

    fn key(&self) -> usize {
        Rc::as_ptr(&self.callback).cast::<()>() as usize
    }
}

impl PartialEq for NativeFunction {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl fmt::Debug for NativeFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeFunction")
            .field("arity", &self.arity)
            .field("callback", &Rc::as_ptr(&self.callback).cast::<()>())
            .finish()
    }
}

/// Native functions handed to one interpreter, each with the script
/// functions wrapping it, one per label.
///
/// A value read back from script is only treated as native when it is one
/// of those exact wrapper objects; the tag merely says where to look.
/// Entries live as long as the runtime, so natives built per call
/// accumulate until it drops.
#[derive(Clone, Default)]
pub(crate) struct NativeRegistry {
    inner: Rc<RefCell<Interned>>,
}

#[derive(Default)]
struct Interned {
    entries: Vec<Entry>,
    by_callback: HashMap<usize, u32>,
}

struct Entry {
    function: NativeFunction,
    wrappers: Vec<(String, Persistent<Function<'static>>)>,
}

impl NativeRegistry {
    pub(crate) fn intern(&self, function: &NativeFunction) -> u32 {
        let mut inner = self.inner.borrow_mut();
        if let Some(&index) = inner.by_callback.get(&function.key()) {
            return index;
        }
        let index = inner.entries.len() as u32;
        inner.entries.push(Entry {
            function: function.clone(),
            wrappers: Vec::new(),
        });
        inner.by_callback.insert(function.key(), index);
        index
    }

    pub(crate) fn get(&self, index: u32) -> Option<NativeFunction> {
        let inner = self.inner.borrow();
        inner.entries.get(index as usize).map(|e| e.function.clone())
    }

    fn wrappers(&self, index: u32) -> Vec<(String, Persistent<Function<'static>>)> {
        let inner = self.inner.borrow();
        match inner.entries.get(index as usize) {
            Some(entry) => entry.wrappers.clone(),
            None => Vec::new(),
        }
    }

    fn wrapper<'js>(&self, ctx: &Ctx<'js>, index: u32, label: &str) -> Option<Function<'js>> {
        let (_, saved) = self
            .wrappers(index)
            .into_iter()
            .find(|(existing, _)| existing == label)?;
        saved.restore(ctx).ok()
    }

    /// Whether `value` is one of the wrappers made for entry `index`.
    fn wraps<'js>(&self, ctx: &Ctx<'js>, index: u32, value: &JsValue<'js>) -> bool {
        self.wrappers(index)
            .into_iter()
            .filter_map(|(_, saved)| saved.restore(ctx).ok())
            .any(|wrapper| wrapper.as_value() == value)
    }

    fn add_wrapper<'js>(&self, ctx: &Ctx<'js>, index: u32, label: &str, wrapper: Function<'js>) {
        let saved = Persistent::save(ctx, wrapper);
        if let Some(entry) = self.inner.borrow_mut().entries.get_mut(index as usize) {
            entry.wrappers.push((label.to_owned(), saved));
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.inner.borrow().entries.len()
    }

    /// Release every entry. The wrappers hold the registry through their
    /// callbacks, so this must run before the interpreter is torn down.
    pub(crate) fn clear(&self) {
        let released = {
            let mut inner = self.inner.borrow_mut();
            inner.by_callback.clear();
            std::mem::take(&mut inner.entries)
        };
        drop(released);
    }
}

/// The script function for `function`, named `label` in arity and failure
/// messages. Asking again with the same label returns the same object.
pub(crate) fn to_js<'js>(
    stack: &Stack<'js>,
    function: &NativeFunction,
    label: &str,
) -> Result<JsValue<'js>, ScriptError> {
    let index = stack.natives().intern(function);
    if let Some(wrapper) = stack.natives().wrapper(stack.ctx(), index, label) {
        return Ok(wrapper.into_value());
    }

    let natives = stack.natives().clone();
    let native = function.clone();
    let name = label.to_owned();
    let wrapper = stack.js(Function::new(
        stack.ctx().clone(),
        move |ctx: Ctx<'js>, args: Rest<JsValue<'js>>| -> rquickjs::Result<JsValue<'js>> {
            invoke(ctx, &natives, &native, &name, args.0)
        },
    ))?;

    // Read-only, hidden from enumeration.
    stack.js(wrapper.prop(NATIVE_TAG, Property::from(index)))?;
    stack
        .natives()
        .add_wrapper(stack.ctx(), index, label, wrapper.clone());
    Ok(wrapper.into_value())
}

/// The native behind `value`, if `value` is one of this interpreter's
/// wrappers.
pub(crate) fn from_js<'js>(stack: &Stack<'js>, value: &JsValue<'js>) -> Option<NativeFunction> {
    let function = value.as_function()?;
    let index: Option<u32> = function.get(NATIVE_TAG).ok()?;
    let index = index?;
    if !stack.natives().wraps(stack.ctx(), index, value) {
        return None;
    }
    stack.natives().get(index)
}

// Runs on every script-to-native call. Errors leave as script exceptions,
// never as unwinding.
fn invoke<'js>(
    ctx: Ctx<'js>,
    natives: &NativeRegistry,
    native: &NativeFunction,
    label: &str,
    args: Vec<JsValue<'js>>,
) -> rquickjs::Result<JsValue<'js>> {
    if args.len() != native.arity() {
        let message = format!(
            "{label} expects {} argument(s), got {}",
            native.arity(),
            args.len()
        );
        return Err(Exception::throw_message(&ctx, &message));
    }

    let mut stack = Stack::new(ctx.clone(), natives.clone());
    for arg in args {
        stack.push_raw(arg);
    }

    let produced = match native.call(&mut stack) {
        Ok(produced) => produced,
        Err(err) => return Err(Exception::throw_message(&ctx, &format!("{label}: {err}"))),
    };
    assert!(
        produced <= stack.depth(),
        "{label} reported {produced} results with only {} values on the stack",
        stack.depth()
    );

    let mut results = stack.split_top(produced);
    match results.len() {
        0 => Ok(JsValue::new_undefined(ctx)),
        1 => Ok(results.remove(0)),
        _ => {
            let array = Array::new(ctx)?;
            for (index, value) in results.into_iter().enumerate() {
                array.set(index, value)?;
            }
            Ok(array.into_value())
        }
    }
}
