//! Tagged values stored in a [`Table`].

use crate::{Handle, NativeFunction, Table};
use std::fmt;
use std::rc::Rc;

/// The kind tag of a [`Value`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Number,
    String,
    Boolean,
    Function,
    Table,
    Opaque,
}

impl Kind {
    pub fn as_str(self) -> &'static str {
        match self {
            Kind::Number => "number",
            Kind::String => "string",
            Kind::Boolean => "boolean",
            Kind::Function => "function",
            Kind::Table => "table",
            Kind::Opaque => "opaque",
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One table entry. Nested tables are shared until written to.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Number(f64),
    String(String),
    Boolean(bool),
    Function(NativeFunction),
    Table(Rc<Table>),
    Opaque(Handle),
}

impl Value {
    pub fn kind(&self) -> Kind {
        match self {
            Value::Number(_) => Kind::Number,
            Value::String(_) => Kind::String,
            Value::Boolean(_) => Kind::Boolean,
            Value::Function(_) => Kind::Function,
            Value::Table(_) => Kind::Table,
            Value::Opaque(_) => Kind::Opaque,
        }
    }
}

macro_rules! impl_from_number {
    ($($ty:ty),+) => {
        $(
            impl From<$ty> for Value {
                fn from(value: $ty) -> Self {
                    Value::Number(value as f64)
                }
            }
        )+
    };
}

impl_from_number!(f64, f32, i32, u32, i16, u16, i8, u8);

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Boolean(value)
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_owned())
    }
}

impl From<NativeFunction> for Value {
    fn from(value: NativeFunction) -> Self {
        Value::Function(value)
    }
}

impl From<Table> for Value {
    fn from(value: Table) -> Self {
        Value::Table(Rc::new(value))
    }
}

impl From<Handle> for Value {
    fn from(value: Handle) -> Self {
        Value::Opaque(value)
    }
}

/// Typed access to the payload of a [`Value`] of one kind.
pub trait FromValue {
    const KIND: Kind;

    fn from_value(value: &Value) -> Option<&Self>;

    fn from_value_mut(value: &mut Value) -> Option<&mut Self>;
}

macro_rules! impl_from_value {
    ($ty:ty, $variant:ident) => {
        impl FromValue for $ty {
            const KIND: Kind = Kind::$variant;

            fn from_value(value: &Value) -> Option<&Self> {
                match value {
                    Value::$variant(inner) => Some(inner),
                    _ => None,
                }
            }

            fn from_value_mut(value: &mut Value) -> Option<&mut Self> {
                match value {
                    Value::$variant(inner) => Some(inner),
                    _ => None,
                }
            }
        }
    };
}

impl_from_value!(f64, Number);
impl_from_value!(String, String);
impl_from_value!(bool, Boolean);
impl_from_value!(NativeFunction, Function);
impl_from_value!(Handle, Opaque);

impl FromValue for Table {
    const KIND: Kind = Kind::Table;

    fn from_value(value: &Value) -> Option<&Self> {
        match value {
            Value::Table(inner) => Some(inner),
            _ => None,
        }
    }

    // Copy on write: other holders of the same nested table keep the old one.
    fn from_value_mut(value: &mut Value) -> Option<&mut Self> {
        match value {
            Value::Table(inner) => Some(Rc::make_mut(inner)),
            _ => None,
        }
    }
}
