//! Dynamic Value: the native mirror of a script object.

use crate::value::{FromValue, Kind, Value};
use std::collections::hash_map::{self, HashMap};

/// String-keyed map of tagged values.
///
/// Cloning is cheap for nested tables (they are reference counted) and
/// mutation never shows through another clone. Iteration order is
/// unspecified; access fields by key.
///
/// Direct access with [`Table::get`] treats a missing key or a kind mismatch
/// as a bug in the caller and panics. Use [`Table::has_value`],
/// [`Table::kind_of`] or [`Table::try_get`] when absence is expected.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    entries: HashMap<String, Value>,
}

impl Table {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`Table::set`].
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(key, value);
        self
    }

    /// Insert or overwrite `key`.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.entries.insert(key.into(), value.into());
    }

    /// Typed access to an entry.
    ///
    /// # Panics
    /// If `key` is absent or holds another kind.
    pub fn get<T: FromValue>(&self, key: &str) -> &T {
        let value = self
            .entries
            .get(key)
            .unwrap_or_else(|| panic!("table has no entry '{key}'"));
        T::from_value(value).unwrap_or_else(|| {
            panic!(
                "table entry '{key}' is a {}, not a {}",
                value.kind(),
                T::KIND
            )
        })
    }

    /// Mutable typed access to an entry.
    ///
    /// # Panics
    /// If `key` is absent or holds another kind.
    pub fn get_mut<T: FromValue>(&mut self, key: &str) -> &mut T {
        let value = self
            .entries
            .get_mut(key)
            .unwrap_or_else(|| panic!("table has no entry '{key}'"));
        let kind = value.kind();
        T::from_value_mut(value)
            .unwrap_or_else(|| panic!("table entry '{key}' is a {kind}, not a {}", T::KIND))
    }

    /// Typed access that returns None on absence or kind mismatch.
    pub fn try_get<T: FromValue>(&self, key: &str) -> Option<&T> {
        self.entries.get(key).and_then(T::from_value)
    }

    /// Numeric entry, if present.
    pub fn number(&self, key: &str) -> Option<f64> {
        self.try_get::<f64>(key).copied()
    }

    pub fn has_value(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn kind_of(&self, key: &str) -> Option<Kind> {
        self.entries.get(key).map(Value::kind)
    }

    pub fn value(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.entries.remove(key)
    }

    /// Merge `other` into `self`; `other` wins on key collisions.
    pub fn superimpose(&mut self, other: &Table) {
        for (key, value) in &other.entries {
            self.entries.insert(key.clone(), value.clone());
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> hash_map::Iter<'_, String, Value> {
        self.entries.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}

impl<'a> IntoIterator for &'a Table {
    type Item = (&'a String, &'a Value);
    type IntoIter = hash_map::Iter<'a, String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Table {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut table = Table::new();
        for (key, value) in iter {
            table.set(key, value);
        }
        table
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Handle;

    #[test]
    fn set_overwrites() {
        let mut table = Table::new();
        table.set("x", 1.0);
        table.set("x", "now a string");
        assert_eq!(table.len(), 1);
        assert_eq!(table.get::<String>("x"), "now a string");
        assert_eq!(table.kind_of("x"), Some(Kind::String));
    }

    #[test]
    fn has_value_never_fails() {
        let table = Table::new().with("x", 1.0);
        assert!(table.has_value("x"));
        assert!(!table.has_value("y"));
        assert_eq!(table.try_get::<String>("x"), None);
        assert_eq!(table.number("x"), Some(1.0));
    }

    #[test]
    #[should_panic(expected = "is a number, not a string")]
    fn get_with_wrong_kind_panics() {
        let table = Table::new().with("x", 1.0);
        table.get::<String>("x");
    }

    #[test]
    #[should_panic(expected = "table has no entry 'missing'")]
    fn get_missing_key_panics() {
        Table::new().get::<f64>("missing");
    }

    #[test]
    fn checking_kind_first_is_safe() {
        let table = Table::new().with("x", 1.0);
        let text = match table.kind_of("x") {
            Some(Kind::String) => table.get::<String>("x").clone(),
            _ => String::from("fallback"),
        };
        assert_eq!(text, "fallback");
    }

    #[test]
    fn superimpose_prefers_other() {
        let mut base = Table::new().with("id", 1.0).with("name", "base");
        let extra = Table::new().with("id", 2.0).with("world", Handle(9));
        base.superimpose(&extra);

        assert_eq!(base.len(), 3);
        assert_eq!(*base.get::<f64>("id"), 2.0);
        assert_eq!(base.get::<String>("name"), "base");
        assert_eq!(*base.get::<Handle>("world"), Handle(9));
    }

    #[test]
    fn nested_tables_are_copies() {
        let inner = Table::new().with("hp", 10.0);
        let mut outer = Table::new().with("stats", inner.clone());
        *outer.get_mut::<Table>("stats").get_mut::<f64>("hp") = 5.0;

        assert_eq!(*inner.get::<f64>("hp"), 10.0);
        assert_eq!(*outer.get::<Table>("stats").get::<f64>("hp"), 5.0);
    }

    #[test]
    fn collect_from_pairs() {
        let table: Table = [("a", 1.0), ("b", 2.0)].into_iter().collect();
        let mut keys: Vec<&str> = table.keys().collect();
        keys.sort_unstable();
        assert_eq!(keys, ["a", "b"]);
    }
}
