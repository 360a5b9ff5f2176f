//! Argument and result packs.

use crate::{Handle, NativeFunction, ScriptError, Stack, Table, TypeMap, Value};

/// Values pushed left to right as call arguments.
pub trait ArgPack {
    const COUNT: usize;

    fn push_onto(self, stack: &mut Stack<'_>) -> Result<(), ScriptError>;
}

/// Values popped right to left as call results.
pub trait ReturnPack: Sized {
    const COUNT: usize;

    fn pop_from(stack: &mut Stack<'_>) -> Result<Self, ScriptError>;
}

impl ArgPack for () {
    const COUNT: usize = 0;

    fn push_onto(self, _stack: &mut Stack<'_>) -> Result<(), ScriptError> {
        Ok(())
    }
}

impl ReturnPack for () {
    const COUNT: usize = 0;

    fn pop_from(_stack: &mut Stack<'_>) -> Result<Self, ScriptError> {
        Ok(())
    }
}

// Bare adapter types are single-value result packs, so callers can write
// `run_function::<f64, _>` instead of `run_function::<(f64,), _>`.
macro_rules! impl_single_return {
    ($($ty:ty),+) => {
        $(
            impl ReturnPack for $ty {
                const COUNT: usize = 1;

                fn pop_from(stack: &mut Stack<'_>) -> Result<Self, ScriptError> {
                    stack.pop::<$ty>()
                }
            }
        )+
    };
}

impl_single_return!(f64, f32, i32, bool, String, Handle, NativeFunction, Table, Value);

// `$rev` lists the same type parameters in reverse, the order they leave the stack.
macro_rules! impl_packs {
    ($($count:literal: ($($ty:ident),+) rev ($($rev:ident),+);)+) => {
        $(
            impl<$($ty: TypeMap),+> ArgPack for ($($ty,)+) {
                const COUNT: usize = $count;

                #[allow(non_snake_case)]
                fn push_onto(self, stack: &mut Stack<'_>) -> Result<(), ScriptError> {
                    let ($($ty,)+) = self;
                    $( stack.push($ty)?; )+
                    Ok(())
                }
            }

            impl<$($ty: TypeMap),+> ReturnPack for ($($ty,)+) {
                const COUNT: usize = $count;

                #[allow(non_snake_case)]
                fn pop_from(stack: &mut Stack<'_>) -> Result<Self, ScriptError> {
                    $( let $rev = stack.pop::<$rev>()?; )+
                    Ok(($($ty,)+))
                }
            }
        )+
    };
}

impl_packs! {
    1: (A) rev (A);
    2: (A, B) rev (B, A);
    3: (A, B, C) rev (C, B, A);
    4: (A, B, C, D) rev (D, C, B, A);
    5: (A, B, C, D, E) rev (E, D, C, B, A);
    6: (A, B, C, D, E, F) rev (F, E, D, C, B, A);
    7: (A, B, C, D, E, F, G) rev (G, F, E, D, C, B, A);
    8: (A, B, C, D, E, F, G, H) rev (H, G, F, E, D, C, B, A);
}
