//! The value stack every boundary crossing goes through.

use crate::native::{self, NativeRegistry};
use crate::{ArgPack, Library, NativeFunction, ReturnPack, ScriptError, TypeMap};
use rquickjs::{CatchResultExt, Ctx, Object, Type, Value as JsValue};

/// Script values in flight between native code and the interpreter.
///
/// Type adapters only ever touch the top of the stack: `push` adds one value,
/// `construct` removes one. Argument packs go on left to right, result packs
/// come off right to left.
///
/// A stack only lives inside one interpreter entry (see
/// [`ScriptRuntime::with_stack`](crate::ScriptRuntime::with_stack)); native
/// callbacks receive a fresh one holding exactly their arguments.
pub struct Stack<'js> {
    ctx: Ctx<'js>,
    values: Vec<JsValue<'js>>,
    natives: NativeRegistry,
    // Objects whose table is being built, outermost first.
    tables: Vec<JsValue<'js>>,
}

impl<'js> Stack<'js> {
    pub(crate) fn new(ctx: Ctx<'js>, natives: NativeRegistry) -> Self {
        Self {
            ctx,
            values: Vec::new(),
            natives,
            tables: Vec::new(),
        }
    }

    pub fn ctx(&self) -> &Ctx<'js> {
        &self.ctx
    }

    pub(crate) fn natives(&self) -> &NativeRegistry {
        &self.natives
    }

    pub fn depth(&self) -> usize {
        self.values.len()
    }

    pub fn top(&self) -> Option<&JsValue<'js>> {
        self.values.last()
    }

    pub fn push_raw(&mut self, value: JsValue<'js>) {
        self.values.push(value);
    }

    pub fn pop_raw(&mut self) -> Option<JsValue<'js>> {
        self.values.pop()
    }

    /// Drop everything above `depth`.
    pub fn truncate(&mut self, depth: usize) {
        self.values.truncate(depth);
    }

    pub(crate) fn split_top(&mut self, count: usize) -> Vec<JsValue<'js>> {
        let at = self.values.len() - count;
        self.values.split_off(at)
    }

    pub(crate) fn open_table(&mut self, object: JsValue<'js>) {
        self.tables.push(object);
    }

    pub(crate) fn close_table(&mut self) {
        self.tables.pop();
    }

    pub(crate) fn open_tables(&self) -> usize {
        self.tables.len()
    }

    /// Whether `object` is one of the objects currently being read.
    pub(crate) fn is_open_table(&self, object: &JsValue<'js>) -> bool {
        self.tables.iter().any(|open| open == object)
    }

    /// Map an interpreter result, taking any pending exception with it.
    pub fn js<T>(&self, result: rquickjs::Result<T>) -> Result<T, ScriptError> {
        result
            .catch(&self.ctx)
            .map_err(|err| ScriptError::Engine(err.to_string()))
    }

    /// Script-level type name of the top value, for error messages.
    pub fn describe_top(&self) -> String {
        match self.top() {
            None => "nothing".to_owned(),
            Some(value) => match value.type_of() {
                Type::Int | Type::Float => "number".to_owned(),
                Type::Bool => "boolean".to_owned(),
                Type::BigInt => "bigint".to_owned(),
                other => format!("{other:?}").to_lowercase(),
            },
        }
    }

    pub fn check<T: TypeMap>(&self) -> bool {
        T::check(self)
    }

    pub fn push<T: TypeMap>(&mut self, value: T) -> Result<(), ScriptError> {
        T::push(self, value)
    }

    /// Checked pop: `check` then `construct`. On a mismatch the value is
    /// still popped.
    pub fn pop<T: TypeMap>(&mut self) -> Result<T, ScriptError> {
        if T::check(self) {
            return Ok(T::construct(self));
        }
        let found = self.describe_top();
        self.values.pop();
        Err(ScriptError::TypeMismatch {
            expected: T::NAME,
            found,
        })
    }

    /// Pop a whole pack, e.g. a native function's arguments. On failure every
    /// value of the pack is discarded.
    pub fn take<R: ReturnPack>(&mut self) -> Result<R, ScriptError> {
        let base = self.depth().saturating_sub(R::COUNT);
        let result = R::pop_from(self);
        if result.is_err() {
            self.truncate(base);
        }
        result
    }

    /// Push a whole pack left to right. On failure nothing is left behind.
    pub fn push_all<A: ArgPack>(&mut self, args: A) -> Result<(), ScriptError> {
        let base = self.depth();
        let result = args.push_onto(self);
        if result.is_err() {
            self.truncate(base);
        }
        result
    }

    /// Pop for `construct` implementations.
    ///
    /// # Panics
    /// If the top value does not pass `T::check`: `construct` without a
    /// successful `check` is a bug in the caller.
    pub fn pop_checked<T: TypeMap>(&mut self) -> JsValue<'js> {
        assert!(
            T::check(self),
            "construct::<{}> called on a {} without a successful check",
            T::NAME,
            self.describe_top()
        );
        match self.values.pop() {
            Some(value) => value,
            None => unreachable!("check passed on an empty stack"),
        }
    }

    /// Call the global script function `name`.
    ///
    /// Fails with `NotFunction` if the global is not callable, `FunctionError`
    /// if the script throws, `TypeMismatch` if a result fails its adapter.
    /// The stack depth is the same afterwards whatever happens.
    pub fn call_function<R: ReturnPack, A: ArgPack>(
        &mut self,
        name: &str,
        args: A,
    ) -> Result<R, ScriptError> {
        let base = self.depth();
        let result = self.call_at(base, name, args);
        self.truncate(base);
        debug_assert_eq!(self.depth(), base);
        result
    }

    fn call_at<R: ReturnPack, A: ArgPack>(
        &mut self,
        base: usize,
        name: &str,
        args: A,
    ) -> Result<R, ScriptError> {
        let callee: JsValue<'js> = self.js(self.ctx.globals().get(name))?;
        let Some(function) = callee.as_function().cloned() else {
            return Err(ScriptError::NotFunction {
                name: name.to_owned(),
            });
        };

        self.push_all(args)?;
        let args = self.values.split_off(base);
        let returned: JsValue<'js> = function
            .call((rquickjs::function::Rest(args),))
            .catch(&self.ctx)
            .map_err(|err| ScriptError::FunctionError {
                name: name.to_owned(),
                message: err.to_string(),
            })?;

        self.spread_results(returned, R::COUNT)?;
        R::pop_from(self)
    }

    // Scripts return a single value; packs of two or more come back as an array.
    fn spread_results(&mut self, returned: JsValue<'js>, count: usize) -> Result<(), ScriptError> {
        match count {
            0 => Ok(()),
            1 => {
                self.push_raw(returned);
                Ok(())
            }
            _ => {
                let Some(array) = returned.as_array().filter(|a| a.len() == count) else {
                    self.push_raw(returned);
                    let found = self.describe_top();
                    self.values.pop();
                    return Err(ScriptError::TypeMismatch {
                        expected: "array of results",
                        found,
                    });
                };
                for index in 0..count {
                    let value: JsValue<'js> = self.js(array.get(index))?;
                    self.push_raw(value);
                }
                Ok(())
            }
        }
    }

    /// Read the global `name` as `T`.
    pub fn get_global<T: TypeMap>(&mut self, name: &str) -> Result<T, ScriptError> {
        let value: JsValue<'js> = self.js(self.ctx.globals().get(name))?;
        if value.is_undefined() {
            return Err(ScriptError::VariableDoesntExist {
                name: name.to_owned(),
            });
        }
        self.push_raw(value);
        self.pop::<T>()
    }

    /// Write the global `name`. An existing global must already hold a value
    /// `T` accepts.
    pub fn set_global<T: TypeMap>(&mut self, name: &str, value: T) -> Result<(), ScriptError> {
        let globals = self.ctx.globals();
        let existing: JsValue<'js> = self.js(globals.get(name))?;
        if !existing.is_undefined() {
            self.push_raw(existing);
            let matches = T::check(self);
            let found = self.describe_top();
            self.values.pop();
            if !matches {
                return Err(ScriptError::TypeMismatch {
                    expected: T::NAME,
                    found,
                });
            }
        }

        self.push(value)?;
        let Some(js) = self.values.pop() else {
            unreachable!("push left no value")
        };
        self.js(globals.set(name, js))
    }

    /// Bind `function` as `namespace.name`, creating the namespace object if
    /// needed. Registering the same name again overwrites it.
    pub fn register_function(
        &mut self,
        namespace: &str,
        name: &str,
        function: &NativeFunction,
    ) -> Result<(), ScriptError> {
        let object = self.namespace(namespace)?;
        let js = native::to_js(self, function, &format!("{namespace}.{name}"))?;
        self.js(object.set(name, js))?;
        tracing::trace!(namespace, name, arity = function.arity(), "registered native function");
        Ok(())
    }

    pub fn register_library(&mut self, library: &Library) -> Result<(), ScriptError> {
        for (name, function) in library.functions() {
            self.register_function(library.name(), name, function)?;
        }
        Ok(())
    }

    // Only an unset global becomes a new namespace. Anything else that is
    // not an object, `null` included, belongs to the script.
    fn namespace(&self, namespace: &str) -> Result<Object<'js>, ScriptError> {
        let globals = self.ctx.globals();
        let existing: JsValue<'js> = self.js(globals.get(namespace))?;
        if existing.is_undefined() {
            let object = self.js(Object::new(self.ctx.clone()))?;
            self.js(globals.set(namespace, object.clone()))?;
            return Ok(object);
        }
        match existing.type_of() {
            Type::Object => existing.as_object().cloned().ok_or_else(|| {
                ScriptError::VariableDoesntExist {
                    name: namespace.to_owned(),
                }
            }),
            _ => Err(ScriptError::VariableDoesntExist {
                name: namespace.to_owned(),
            }),
        }
    }
}
