//! Math types as script values.

use crate::{ScriptError, Stack, Table, TypeMap};
use glam::Vec2;

fn is_number(object: &rquickjs::Object<'_>, key: &str) -> bool {
    object
        .get::<_, rquickjs::Value>(key)
        .is_ok_and(|value| value.is_number())
}

/// `{ x, y }` in script.
impl TypeMap for Vec2 {
    const NAME: &'static str = "vec2";

    fn check(stack: &Stack<'_>) -> bool {
        stack
            .top()
            .and_then(|value| value.as_object())
            .is_some_and(|object| is_number(object, "x") && is_number(object, "y"))
    }

    fn push(stack: &mut Stack<'_>, value: Self) -> Result<(), ScriptError> {
        let table = Table::new().with("x", value.x).with("y", value.y);
        Table::push(stack, table)
    }

    fn construct(stack: &mut Stack<'_>) -> Self {
        assert!(
            Self::check(stack),
            "construct::<vec2> called on a {} without a successful check",
            stack.describe_top()
        );
        let table = Table::construct(stack);
        match (table.number("x"), table.number("y")) {
            (Some(x), Some(y)) => Vec2::new(x as f32, y as f32),
            _ => unreachable!("vec2 passed its check"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ScriptRuntime;

    #[test]
    fn vec2_crosses_as_object() {
        let rt = ScriptRuntime::from_source(
            "vec.js",
            r#"
            function Scale(v, s) { return { x: v.x * s, y: v.y * s }; }
            function Broken() { return { x: 1 }; }
            "#,
            &[],
        )
        .unwrap();
        assert_eq!(
            rt.run_function::<(Vec2,), _>("Scale", (Vec2::new(1.5, -2.0), 2.0)),
            Ok((Vec2::new(3.0, -4.0),))
        );
        assert!(rt.run_function::<(Vec2,), _>("Broken", ()).is_err());
    }
}
