//! Script runtime management
//!
//! One [`ScriptRuntime`] owns one QuickJS runtime and context, loads one
//! script and hosts native namespaces for it.

use crate::native::NativeRegistry;
use crate::{ArgPack, Library, NativeFunction, ReturnPack, ScriptError, Stack, TypeMap};
use rquickjs::{CatchResultExt, Context, Runtime};
use std::path::Path;

/// Script execution context
///
/// Move-only: the interpreter is released exactly once, when the value is
/// dropped. A runtime whose script failed to load reports `good() == false`
/// and must not be used further; doing so panics.
pub struct ScriptRuntime {
    context: Context,
    #[allow(dead_code)] // Kept alive for context lifetime
    runtime: Runtime,
    natives: NativeRegistry,
    name: String,
    good: bool,
}

impl ScriptRuntime {
    /// An interpreter with no script loaded.
    pub fn new() -> Result<Self, ScriptError> {
        Self::named("<inline>")
    }

    fn named(name: &str) -> Result<Self, ScriptError> {
        let runtime = Runtime::new().map_err(|err| ScriptError::Engine(err.to_string()))?;
        let context = Context::full(&runtime).map_err(|err| ScriptError::Engine(err.to_string()))?;
        Ok(Self {
            context,
            runtime,
            natives: NativeRegistry::default(),
            name: name.to_owned(),
            good: true,
        })
    }

    /// Register `libraries`, then run the script at `path` once.
    ///
    /// A script that can't be read, parsed or executed yields a runtime with
    /// `good() == false`. `Err` only means the interpreter itself could not
    /// be created.
    pub fn from_file(path: impl AsRef<Path>, libraries: &[&Library]) -> Result<Self, ScriptError> {
        let path = path.as_ref();
        let name = path.display().to_string();
        match std::fs::read_to_string(path) {
            Ok(source) => Self::from_source(&name, &source, libraries),
            Err(err) => {
                tracing::error!(script = %name, error = %err, "failed to read script");
                let mut runtime = Self::named(&name)?;
                runtime.good = false;
                Ok(runtime)
            }
        }
    }

    /// Same as [`ScriptRuntime::from_file`] with the source given inline.
    pub fn from_source(
        name: &str,
        source: &str,
        libraries: &[&Library],
    ) -> Result<Self, ScriptError> {
        let mut runtime = Self::named(name)?;
        let loaded = libraries
            .iter()
            .try_for_each(|library| runtime.register_library(library))
            .and_then(|()| runtime.execute(source));

        match loaded {
            Ok(()) => tracing::debug!(script = name, libraries = libraries.len(), "script loaded"),
            Err(err) => {
                tracing::error!(script = name, error = %err, "script failed to load");
                runtime.good = false;
            }
        }
        Ok(runtime)
    }

    pub fn good(&self) -> bool {
        self.good
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Evaluate more source in the global scope.
    pub fn execute(&self, source: &str) -> Result<(), ScriptError> {
        self.context.with(|ctx| {
            ctx.eval::<(), _>(source)
                .catch(&ctx)
                .map_err(|err| ScriptError::Load {
                    script: self.name.clone(),
                    message: err.to_string(),
                })
        })
    }

    /// Enter the interpreter and work on a fresh stack.
    ///
    /// Do not call other `ScriptRuntime` methods from inside `f`; use the
    /// stack's own methods instead.
    pub fn with_stack<R, F>(&self, f: F) -> R
    where
        F: for<'js> FnOnce(&mut Stack<'js>) -> R,
    {
        assert!(
            self.good,
            "script runtime '{}' failed to load and cannot be used",
            self.name
        );
        self.context.with(|ctx| {
            let mut stack = Stack::new(ctx, self.natives.clone());
            f(&mut stack)
        })
    }

    /// Bind `function` as `namespace.name`.
    pub fn register_function(
        &self,
        namespace: &str,
        name: &str,
        function: &NativeFunction,
    ) -> Result<(), ScriptError> {
        self.with_stack(|stack| stack.register_function(namespace, name, function))
    }

    pub fn register_library(&self, library: &Library) -> Result<(), ScriptError> {
        self.with_stack(|stack| stack.register_library(library))
    }

    pub fn get_global<T: TypeMap>(&self, name: &str) -> Result<T, ScriptError> {
        self.with_stack(|stack| stack.get_global(name))
    }

    pub fn set_global<T: TypeMap>(&self, name: &str, value: T) -> Result<(), ScriptError> {
        self.with_stack(|stack| stack.set_global(name, value))
    }

    /// Call the global script function `name` with `args`, expecting `R`.
    pub fn run_function<R: ReturnPack, A: ArgPack>(
        &self,
        name: &str,
        args: A,
    ) -> Result<R, ScriptError> {
        self.with_stack(|stack| stack.call_function(name, args))
    }

    /// Call an optional lifecycle hook such as `Start` or `Update`.
    ///
    /// A script without the hook is fine and stays quiet; any other failure
    /// is logged. Returns whether the hook ran to completion.
    pub fn run_hook<A: ArgPack>(&self, hook: &str, args: A) -> bool {
        match self.run_function::<(), A>(hook, args) {
            Ok(()) => true,
            Err(err) if err.is_not_function() => false,
            Err(err) => {
                tracing::error!(script = %self.name, hook, error = %err, "script hook failed");
                false
            }
        }
    }
}

impl Drop for ScriptRuntime {
    fn drop(&mut self) {
        tracing::trace!(script = %self.name, natives = self.natives.len(), "closing script runtime");
        // Native wrappers and the registry refer to each other.
        self.context.with(|_| self.natives.clear());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ErrorKind, Handle, Table};

    const SCRIPT: &str = r#"
        function Add(a, b) { return a + b; }
        function Fail() { throw new Error("bad input"); }
        function Pair() { return [1, "two"]; }
        function Echo(v) { return v; }
        function IsBigInt(v) { return typeof v === "bigint"; }
        function Nested() { return settings.inner.value * 2; }
        var Physics = 5;
    "#;

    fn load() -> ScriptRuntime {
        let rt = ScriptRuntime::from_source("test.js", SCRIPT, &[]).unwrap();
        assert!(rt.good());
        rt
    }

    #[test]
    fn add_returns_sum() {
        let rt = load();
        assert_eq!(rt.run_function::<f64, _>("Add", (2.0, 3.0)), Ok(5.0));
    }

    #[test]
    fn missing_hook_is_not_function() {
        let rt = load();
        let err = rt.run_function::<(), _>("Update", ()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFunction);
        assert!(!rt.run_hook("Update", ()));

        // A global that exists but isn't callable is the same failure.
        let err = rt.run_function::<(), _>("Physics", ()).unwrap_err();
        assert!(err.is_not_function());
    }

    #[test]
    fn script_errors_carry_the_message() {
        let rt = load();
        match rt.run_function::<(), _>("Fail", ()) {
            Err(ScriptError::FunctionError { name, message }) => {
                assert_eq!(name, "Fail");
                assert!(message.contains("bad input"), "{message}");
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(!rt.run_hook("Fail", ()));
    }

    #[test]
    fn results_are_type_checked() {
        let rt = load();
        let err = rt
            .run_function::<String, _>("Add", (1.0, 2.0))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TypeMismatch);
        assert_eq!(
            rt.run_function::<(f64, String), _>("Pair", ()),
            Ok((1.0, String::from("two")))
        );
        assert!(rt.run_function::<(f64, f64), _>("Pair", ()).is_err());
        assert!(rt.run_function::<(f64, String, bool), _>("Pair", ()).is_err());
    }

    #[test]
    fn handles_cross_as_bigint() {
        let rt = load();
        let handle = Handle(u64::MAX - 5);
        assert_eq!(rt.run_function::<Handle, _>("Echo", (handle,)), Ok(handle));
        assert_eq!(rt.run_function::<bool, _>("IsBigInt", (handle,)), Ok(true));
        assert_eq!(rt.run_function::<bool, _>("IsBigInt", (1.0,)), Ok(false));
    }

    #[test]
    fn tables_reach_script() {
        let rt = load();
        let settings = Table::new().with("inner", Table::new().with("value", 21.0));
        rt.set_global("settings", settings.clone()).unwrap();
        assert_eq!(rt.run_function::<f64, _>("Nested", ()), Ok(42.0));
        assert_eq!(rt.get_global::<Table>("settings"), Ok(settings.clone()));
        assert_eq!(rt.run_function::<Table, _>("Echo", (settings.clone(),)), Ok(settings));
    }

    #[test]
    fn globals_are_type_checked() {
        let rt = load();
        assert_eq!(rt.get_global::<f64>("Physics"), Ok(5.0));
        assert_eq!(
            rt.get_global::<String>("Physics").unwrap_err().kind(),
            ErrorKind::TypeMismatch
        );
        assert_eq!(
            rt.set_global("Physics", String::from("x")).unwrap_err().kind(),
            ErrorKind::TypeMismatch
        );
        assert_eq!(
            rt.get_global::<f64>("Nope").unwrap_err().kind(),
            ErrorKind::VariableDoesntExist
        );
        rt.set_global("Fresh", true).unwrap();
        assert_eq!(rt.get_global::<bool>("Fresh"), Ok(true));
    }

    #[test]
    fn register_function_is_idempotent() {
        let rt = load();
        let first = NativeFunction::new(0, |stack| {
            stack.push(1.0)?;
            Ok(1)
        });
        let second = NativeFunction::new(0, |stack| {
            stack.push(2.0)?;
            Ok(1)
        });

        rt.register_function("Game", "value", &first).unwrap();
        rt.register_function("Game", "value", &first).unwrap();
        let ns: Table = rt.get_global("Game").unwrap();
        assert_eq!(ns.len(), 1);
        assert!(ns.get::<NativeFunction>("value").ptr_eq(&first));

        rt.register_function("Game", "value", &second).unwrap();
        let ns: Table = rt.get_global("Game").unwrap();
        assert_eq!(ns.len(), 1);
        assert!(ns.get::<NativeFunction>("value").ptr_eq(&second));

        rt.execute("function Read() { return Game.value(); }").unwrap();
        assert_eq!(rt.run_function::<f64, _>("Read", ()), Ok(2.0));
    }

    #[test]
    fn null_namespace_is_a_collision() {
        let rt = ScriptRuntime::from_source("null.js", "var Nothing = null;", &[]).unwrap();
        let f = NativeFunction::new(0, |_| Ok(0));
        let err = rt.register_function("Nothing", "step", &f).unwrap_err();
        assert_eq!(
            err,
            ScriptError::VariableDoesntExist {
                name: "Nothing".into()
            }
        );
        rt.execute("if (Nothing !== null) throw new Error('replaced');")
            .unwrap();
    }

    #[test]
    fn namespace_collision_is_reported() {
        let rt = load();
        let f = NativeFunction::new(0, |_| Ok(0));
        let err = rt.register_function("Physics", "step", &f).unwrap_err();
        assert_eq!(
            err,
            ScriptError::VariableDoesntExist {
                name: "Physics".into()
            }
        );
    }

    #[test]
    fn arity_is_enforced() {
        let lib = Library::new("Host").with_function(
            "twice",
            NativeFunction::new(1, |stack| {
                let n: f64 = stack.pop()?;
                stack.push(n * 2.0)?;
                Ok(1)
            }),
        );
        let rt = ScriptRuntime::from_source(
            "arity.js",
            r#"
            function Ok() { return Host.twice(4); }
            function TooMany() { return Host.twice(4, 5); }
            function WrongType() { return Host.twice("4"); }
            "#,
            &[&lib],
        )
        .unwrap();
        assert_eq!(rt.run_function::<f64, _>("Ok", ()), Ok(8.0));

        match rt.run_function::<f64, _>("TooMany", ()) {
            Err(ScriptError::FunctionError { message, .. }) => {
                assert!(message.contains("Host.twice expects 1 argument(s), got 2"), "{message}");
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(
            rt.run_function::<f64, _>("WrongType", ()).unwrap_err().kind(),
            ErrorKind::FunctionError
        );
    }

    #[test]
    fn native_code_can_call_back_into_script() {
        let lib = Library::new("Host").with_function(
            "call",
            NativeFunction::new(2, |stack| {
                let (name, arg): (String, f64) = stack.take()?;
                let result: f64 = stack.call_function(&name, (arg,))?;
                stack.push(result + 1.0)?;
                Ok(1)
            }),
        );
        let rt = ScriptRuntime::from_source(
            "nested.js",
            r#"
            function Square(x) { return x * x; }
            function Outer() { return Host.call("Square", 3); }
            "#,
            &[&lib],
        )
        .unwrap();
        assert_eq!(rt.run_function::<f64, _>("Outer", ()), Ok(10.0));
    }

    #[test]
    fn load_failures_clear_good() {
        let rt = ScriptRuntime::from_source("broken.js", "function (", &[]).unwrap();
        assert!(!rt.good());

        let rt = ScriptRuntime::from_source("throws.js", "throw new Error('init');", &[]).unwrap();
        assert!(!rt.good());

        let rt = ScriptRuntime::from_file("/definitely/not/here.js", &[]).unwrap();
        assert!(!rt.good());
        assert_eq!(rt.name(), "/definitely/not/here.js");
    }

    #[test]
    fn top_level_runs_once_at_load() {
        let path = std::env::temp_dir().join(format!("tether_load_{}.js", std::process::id()));
        std::fs::write(&path, "var loads = (typeof loads === 'number' ? loads : 0) + 1;").unwrap();
        let rt = ScriptRuntime::from_file(&path, &[]).unwrap();
        std::fs::remove_file(&path).ok();

        assert!(rt.good());
        assert_eq!(rt.get_global::<f64>("loads"), Ok(1.0));
    }

    #[test]
    #[should_panic(expected = "failed to load and cannot be used")]
    fn failed_runtime_cannot_run() {
        let rt = ScriptRuntime::from_source("broken.js", "}", &[]).unwrap();
        let _ = rt.run_function::<(), _>("Start", ());
    }
}
