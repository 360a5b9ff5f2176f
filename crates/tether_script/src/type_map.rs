//! Type Adapter Registry.
//!
//! One [`TypeMap`] impl per native type that can cross the boundary. Adding
//! a type means adding an impl (see `math.rs` for `glam::Vec2`); nothing
//! here needs to change.

use crate::native;
use crate::{Handle, NativeFunction, ScriptError, Stack, Table, Value};
use rquickjs::object::Property;
use rquickjs::{BigInt, Object, Type, Value as JsValue};

/// Tables read from script nest at most this deep. Deeper objects are left
/// out of their parent, like unsupported values.
pub const MAX_TABLE_DEPTH: usize = 64;

/// Moves a native type across the boundary, relative to the top of a stack.
pub trait TypeMap: Sized {
    /// Script-facing name used in mismatch errors.
    const NAME: &'static str;

    /// Can the top of the stack become a `Self`?
    fn check(stack: &Stack<'_>) -> bool;

    /// Push `value` as a script value.
    fn push(stack: &mut Stack<'_>, value: Self) -> Result<(), ScriptError>;

    /// Pop the top of the stack as a `Self`.
    ///
    /// # Panics
    /// If `check` would return false.
    fn construct(stack: &mut Stack<'_>) -> Self;
}

fn top_is(stack: &Stack<'_>, pred: impl FnOnce(&JsValue<'_>) -> bool) -> bool {
    stack.top().is_some_and(pred)
}

impl TypeMap for f64 {
    const NAME: &'static str = "number";

    fn check(stack: &Stack<'_>) -> bool {
        top_is(stack, |v| v.is_number())
    }

    fn push(stack: &mut Stack<'_>, value: Self) -> Result<(), ScriptError> {
        // new_number would store -0.0 as the integer 0.
        let js = if value == 0.0 && value.is_sign_negative() {
            JsValue::new_float(stack.ctx().clone(), value)
        } else {
            JsValue::new_number(stack.ctx().clone(), value)
        };
        stack.push_raw(js);
        Ok(())
    }

    fn construct(stack: &mut Stack<'_>) -> Self {
        match stack.pop_checked::<Self>().as_number() {
            Some(number) => number,
            None => unreachable!("number passed its check"),
        }
    }
}

macro_rules! impl_type_map_via_f64 {
    ($($ty:ty),+) => {
        $(
            impl TypeMap for $ty {
                const NAME: &'static str = "number";

                fn check(stack: &Stack<'_>) -> bool {
                    f64::check(stack)
                }

                fn push(stack: &mut Stack<'_>, value: Self) -> Result<(), ScriptError> {
                    f64::push(stack, value as f64)
                }

                fn construct(stack: &mut Stack<'_>) -> Self {
                    f64::construct(stack) as $ty
                }
            }
        )+
    };
}

impl_type_map_via_f64!(f32, i32);

impl TypeMap for bool {
    const NAME: &'static str = "boolean";

    fn check(stack: &Stack<'_>) -> bool {
        top_is(stack, |v| v.is_bool())
    }

    fn push(stack: &mut Stack<'_>, value: Self) -> Result<(), ScriptError> {
        let js = JsValue::new_bool(stack.ctx().clone(), value);
        stack.push_raw(js);
        Ok(())
    }

    fn construct(stack: &mut Stack<'_>) -> Self {
        match stack.pop_checked::<Self>().as_bool() {
            Some(flag) => flag,
            None => unreachable!("boolean passed its check"),
        }
    }
}

impl TypeMap for String {
    const NAME: &'static str = "string";

    // A string that cannot be read as UTF-8 fails the check rather than
    // construct.
    fn check(stack: &Stack<'_>) -> bool {
        top_is(stack, |v| v.as_string().is_some_and(|s| s.to_string().is_ok()))
    }

    fn push(stack: &mut Stack<'_>, value: Self) -> Result<(), ScriptError> {
        let js = stack.js(rquickjs::String::from_str(stack.ctx().clone(), &value))?;
        stack.push_raw(js.into_value());
        Ok(())
    }

    fn construct(stack: &mut Stack<'_>) -> Self {
        let value = stack.pop_checked::<Self>();
        match value.as_string().map(|s| s.to_string()) {
            Some(Ok(text)) => text,
            _ => unreachable!("string passed its check"),
        }
    }
}

// Handles travel as BigInt so scripts can't mix them up with numbers.
fn handle_bits(value: &JsValue<'_>) -> Option<u64> {
    if value.type_of() != Type::BigInt {
        return None;
    }
    let bits = value.as_big_int()?.clone().to_i64().ok()?;
    Some(bits as u64)
}

impl TypeMap for Handle {
    const NAME: &'static str = "handle";

    fn check(stack: &Stack<'_>) -> bool {
        top_is(stack, |v| handle_bits(v).is_some())
    }

    fn push(stack: &mut Stack<'_>, value: Self) -> Result<(), ScriptError> {
        let js = stack.js(BigInt::from_i64(stack.ctx().clone(), value.to_bits() as i64))?;
        stack.push_raw(js.into_value());
        Ok(())
    }

    fn construct(stack: &mut Stack<'_>) -> Self {
        match handle_bits(&stack.pop_checked::<Self>()) {
            Some(bits) => Handle::from_bits(bits),
            None => unreachable!("handle passed its check"),
        }
    }
}

fn native_of(stack: &Stack<'_>) -> Option<NativeFunction> {
    native::from_js(stack, stack.top()?)
}

/// Only functions this interpreter got from native code pass the check.
/// Functions defined in script have no native callback to return, even when
/// they carry a copy of the wrapper's tag.
impl TypeMap for NativeFunction {
    const NAME: &'static str = "native function";

    fn check(stack: &Stack<'_>) -> bool {
        native_of(stack).is_some()
    }

    fn push(stack: &mut Stack<'_>, value: Self) -> Result<(), ScriptError> {
        let js = native::to_js(stack, &value, "native function")?;
        stack.push_raw(js);
        Ok(())
    }

    fn construct(stack: &mut Stack<'_>) -> Self {
        let function = native_of(stack);
        stack.pop_checked::<Self>();
        match function {
            Some(function) => function,
            None => unreachable!("native function passed its check"),
        }
    }
}

fn table_to_js<'js>(stack: &mut Stack<'js>, table: &Table) -> Result<JsValue<'js>, ScriptError> {
    let object = stack.js(Object::new(stack.ctx().clone()))?;
    for (key, value) in table {
        push_value(stack, value)?;
        let Some(js) = stack.pop_raw() else {
            unreachable!("push left no value")
        };
        // Defined rather than assigned, so keys like `__proto__` stay data.
        let property = Property::from(js).writable().enumerable().configurable();
        stack.js(object.prop(key.as_str(), property))?;
    }
    Ok(object.into_value())
}

fn push_value(stack: &mut Stack<'_>, value: &Value) -> Result<(), ScriptError> {
    match value {
        Value::Number(n) => f64::push(stack, *n),
        Value::String(s) => <String as TypeMap>::push(stack, s.clone()),
        Value::Boolean(b) => bool::push(stack, *b),
        Value::Function(f) => NativeFunction::push(stack, f.clone()),
        Value::Table(t) => {
            let js = table_to_js(stack, t)?;
            stack.push_raw(js);
            Ok(())
        }
        Value::Opaque(h) => Handle::push(stack, *h),
    }
}

/// Script objects and arrays. Array elements land under their index as key.
///
/// `undefined` and `null` properties are left out. Properties no adapter
/// accepts (symbols, script-defined functions, oversized BigInts) are
/// skipped, as are objects nested past [`MAX_TABLE_DEPTH`] and references
/// back to an object still being read. An object reached twice through
/// different fields is read twice.
impl TypeMap for Table {
    const NAME: &'static str = "table";

    fn check(stack: &Stack<'_>) -> bool {
        top_is(stack, |v| matches!(v.type_of(), Type::Object | Type::Array))
    }

    fn push(stack: &mut Stack<'_>, value: Self) -> Result<(), ScriptError> {
        let js = table_to_js(stack, &value)?;
        stack.push_raw(js);
        Ok(())
    }

    fn construct(stack: &mut Stack<'_>) -> Self {
        let value = stack.pop_checked::<Self>();
        let Some(object) = value.as_object() else {
            unreachable!("table passed its check")
        };

        let mut table = Table::new();
        stack.open_table(value.clone());
        for entry in object.props::<String, JsValue>() {
            let (key, field) = match stack.js(entry) {
                Ok(entry) => entry,
                Err(err) => {
                    tracing::trace!(error = %err, "skipping unreadable property");
                    continue;
                }
            };
            if field.is_undefined() || field.is_null() {
                continue;
            }
            if matches!(field.type_of(), Type::Object | Type::Array) {
                if stack.open_tables() >= MAX_TABLE_DEPTH {
                    tracing::trace!(key, depth = MAX_TABLE_DEPTH, "skipping table nested too deeply");
                    continue;
                }
                if stack.is_open_table(&field) {
                    tracing::trace!(key, "skipping reference to an enclosing table");
                    continue;
                }
            }
            stack.push_raw(field);
            if Value::check(stack) {
                table.set(key, Value::construct(stack));
            } else {
                tracing::trace!(key, found = %stack.describe_top(), "skipping unsupported value");
                stack.pop_raw();
            }
        }
        stack.close_table();
        table
    }
}

/// Any supported kind, picked by the first adapter that accepts the value.
impl TypeMap for Value {
    const NAME: &'static str = "value";

    fn check(stack: &Stack<'_>) -> bool {
        bool::check(stack)
            || f64::check(stack)
            || String::check(stack)
            || Handle::check(stack)
            || NativeFunction::check(stack)
            || Table::check(stack)
    }

    fn push(stack: &mut Stack<'_>, value: Self) -> Result<(), ScriptError> {
        push_value(stack, &value)
    }

    fn construct(stack: &mut Stack<'_>) -> Self {
        if bool::check(stack) {
            Value::Boolean(bool::construct(stack))
        } else if f64::check(stack) {
            Value::Number(f64::construct(stack))
        } else if String::check(stack) {
            Value::String(String::construct(stack))
        } else if Handle::check(stack) {
            Value::Opaque(Handle::construct(stack))
        } else if NativeFunction::check(stack) {
            Value::Function(NativeFunction::construct(stack))
        } else {
            Value::from(Table::construct(stack))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ScriptRuntime;

    fn round_trip<T: TypeMap + Clone>(value: T) -> T {
        let rt = ScriptRuntime::new().unwrap();
        rt.with_stack(|stack| {
            T::push(stack, value.clone()).unwrap();
            assert!(T::check(stack), "{} failed its own check", T::NAME);
            let back = T::construct(stack);
            assert_eq!(stack.depth(), 0);
            back
        })
    }

    #[test]
    fn scalar_adapters_are_consistent() {
        for n in [0.0, -1.5, 1e300, f64::MIN_POSITIVE, 42.0] {
            assert_eq!(round_trip(n), n);
        }
        assert_eq!(round_trip(7i32), 7);
        assert_eq!(round_trip(0.25f32), 0.25);
        assert!(round_trip(true));
        assert!(!round_trip(false));
        assert_eq!(round_trip(String::from("héllo")), "héllo");
        assert_eq!(round_trip(String::new()), "");
    }

    #[test]
    fn handle_adapter_keeps_all_bits() {
        for bits in [0, 1, u64::MAX, 0x8000_0000_0000_0001] {
            assert_eq!(round_trip(Handle(bits)), Handle(bits));
        }
    }

    #[test]
    fn handle_is_not_a_number() {
        let rt = ScriptRuntime::new().unwrap();
        rt.with_stack(|stack| {
            stack.push(Handle(3)).unwrap();
            assert!(!f64::check(stack));
            stack.pop_raw();
            stack.push(3.0).unwrap();
            assert!(!Handle::check(stack));
        });
    }

    #[test]
    fn native_function_adapter_is_consistent() {
        let f = NativeFunction::new(2, |_| Ok(0));
        assert!(round_trip(f.clone()).ptr_eq(&f));
    }

    #[test]
    fn script_functions_are_not_native() {
        let rt = ScriptRuntime::from_source("f.js", "function Local() {}", &[]).unwrap();
        rt.with_stack(|stack| {
            let value: JsValue = stack.ctx().globals().get("Local").unwrap();
            stack.push_raw(value);
            assert!(!NativeFunction::check(stack));
            assert!(!Table::check(stack));
        });
    }

    #[test]
    fn nested_table_round_trip() {
        let f = NativeFunction::new(0, |_| Ok(0));
        let table = Table::new()
            .with("n", 1.0)
            .with("s", "text")
            .with("b", false)
            .with("h", Handle(u64::MAX))
            .with("f", f)
            .with("inner", Table::new().with("deep", Table::new().with("x", -2.0)));
        assert_eq!(round_trip(table.clone()), table);
        assert_eq!(round_trip(Value::from(table.clone())), Value::from(table));
    }

    #[test]
    #[should_panic(expected = "without a successful check")]
    fn construct_without_check_panics() {
        let rt = ScriptRuntime::new().unwrap();
        rt.with_stack(|stack| {
            stack.push(String::from("x")).unwrap();
            f64::construct(stack);
        });
    }

    #[test]
    fn table_from_script_skips_unsupported_values() {
        let rt = ScriptRuntime::from_source(
            "t.js",
            r#"
            var data = {
                n: 3,
                list: [10, 20],
                nothing: null,
                missing: undefined,
                sym: Symbol("s"),
                func: function () {},
            };
            "#,
            &[],
        )
        .unwrap();
        let table: Table = rt.get_global("data").unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(*table.get::<f64>("n"), 3.0);
        let list = table.get::<Table>("list");
        assert_eq!(list.number("0"), Some(10.0));
        assert_eq!(list.number("1"), Some(20.0));
    }

    #[test]
    fn negative_zero_keeps_its_sign() {
        assert_eq!(round_trip(-0.0f64).to_bits(), (-0.0f64).to_bits());
        assert_eq!(round_trip(-0.0f32).to_bits(), (-0.0f32).to_bits());
        assert_eq!(round_trip(0.0f64).to_bits(), 0.0f64.to_bits());
    }

    #[test]
    fn string_values_inside_tables_stay_strings() {
        let table = Table::new().with("name", "Position").with("empty", "");
        let back = round_trip(table.clone());
        assert_eq!(back, table);
        assert_eq!(back.get::<String>("name"), "Position");
    }

    #[test]
    fn proto_keys_are_plain_fields() {
        let table = Table::new()
            .with("__proto__", Table::new().with("x", 1.0))
            .with("y", 2.0);
        let rt = ScriptRuntime::from_source(
            "proto.js",
            r#"
            function Inspect(t) {
                return Object.getPrototypeOf(t) === Object.prototype
                    && Object.keys(t).length === 2
                    && t.x === undefined;
            }
            "#,
            &[],
        )
        .unwrap();
        assert_eq!(rt.run_function::<bool, _>("Inspect", (table.clone(),)), Ok(true));
        assert_eq!(round_trip(table.clone()), table);
    }

    #[test]
    fn deep_script_objects_are_cut_off() {
        let rt = ScriptRuntime::from_source(
            "deep.js",
            r#"
            var deep = { n: 0 };
            for (var i = 1; i < 20000; i++) deep = { n: i, c: deep };
            "#,
            &[],
        )
        .unwrap();
        let mut table: Table = rt.get_global("deep").unwrap();
        let mut links = 0;
        while table.has_value("c") {
            table = table.get::<Table>("c").clone();
            links += 1;
        }
        assert_eq!(links, MAX_TABLE_DEPTH - 1);
        assert_eq!(table.number("n"), Some(f64::from(19999 - links as u32)));
    }

    #[test]
    fn cyclic_script_objects_drop_the_back_reference() {
        let seen = std::rc::Rc::new(std::cell::RefCell::new(Table::new()));
        let store = seen.clone();
        let keep = NativeFunction::new(1, move |stack| {
            *store.borrow_mut() = stack.pop()?;
            Ok(0)
        });
        let host = crate::Library::new("Host").with_function("keep", keep);
        let rt = ScriptRuntime::from_source(
            "cycle.js",
            r#"
            var a = { n: 1, child: { n: 2 } };
            a.me = a;
            a.child.parent = a;
            var shared = { v: 3 };
            var pair = { l: shared, r: shared };
            function Send() { Host.keep(a); }
            "#,
            &[&host],
        )
        .unwrap();

        let a: Table = rt.get_global("a").unwrap();
        assert!(!a.has_value("me"));
        assert_eq!(a.number("n"), Some(1.0));
        let child = a.get::<Table>("child");
        assert!(!child.has_value("parent"));
        assert_eq!(child.number("n"), Some(2.0));

        rt.run_function::<(), _>("Send", ()).unwrap();
        assert_eq!(*seen.borrow(), a);

        let pair: Table = rt.get_global("pair").unwrap();
        assert_eq!(pair.get::<Table>("l").number("v"), Some(3.0));
        assert_eq!(pair.get::<Table>("r").number("v"), Some(3.0));
    }
}
