//! Component Marshaling Protocol
//!
//! The set of components scripts can see is closed and known at compile
//! time. [`component_kinds!`](crate::component_kinds) turns a list of
//! `Variant => Type` pairs into an enum whose variants each carry a
//! [`KindDescriptor`]: the kind's name, layout and a pair of function
//! pointers converting its raw bytes to and from a [`Table`].
//!
//! Ids are not known until a store hands them out, so a [`Marshaler`] is
//! resolved against a store once and then dispatches by id or by name.

use crate::{ComponentStore, Table};
use std::fmt;
use std::mem::{align_of, size_of};
use tether_core::ecs::{Component, ComponentId, ComponentLayout};

/// A component that can be read and written as a script table.
pub trait ScriptComponent: Component {
    /// The component's fields, keyed by field name.
    fn serialize(&self) -> Table;

    /// Write the fields present in `table` into `into`. Missing or
    /// mistyped fields leave the current value alone.
    fn deserialize(table: &Table, into: &mut Self);
}

/// Name, layout and byte conversions of one component kind.
#[derive(Clone, Copy)]
pub struct KindDescriptor {
    pub name: &'static str,
    pub size: usize,
    pub align: usize,
    to_table: fn(&[u8]) -> Table,
    from_table: fn(&Table, &mut [u8]),
}

fn read_bytes<T: ScriptComponent>(bytes: &[u8]) -> Table {
    let value: T = bytemuck::pod_read_unaligned(bytes);
    value.serialize()
}

fn write_bytes<T: ScriptComponent>(table: &Table, bytes: &mut [u8]) {
    let mut value: T = bytemuck::pod_read_unaligned(bytes);
    T::deserialize(table, &mut value);
    bytes.copy_from_slice(bytemuck::bytes_of(&value));
}

impl KindDescriptor {
    pub fn of<T: ScriptComponent>() -> Self {
        Self {
            name: T::NAME,
            size: size_of::<T>(),
            align: align_of::<T>(),
            to_table: read_bytes::<T>,
            from_table: write_bytes::<T>,
        }
    }

    pub fn layout(&self) -> ComponentLayout {
        ComponentLayout::new(self.name, self.size, self.align)
    }

    /// # Panics
    /// If `bytes` is not exactly one component long.
    pub fn serialize(&self, bytes: &[u8]) -> Table {
        assert_eq!(
            bytes.len(),
            self.size,
            "component '{}' is {} bytes, got {}",
            self.name,
            self.size,
            bytes.len()
        );
        (self.to_table)(bytes)
    }

    /// # Panics
    /// If `dst` is not exactly one component long.
    pub fn deserialize(&self, table: &Table, dst: &mut [u8]) {
        assert_eq!(
            dst.len(),
            self.size,
            "component '{}' is {} bytes, got {}",
            self.name,
            self.size,
            dst.len()
        );
        (self.from_table)(table, dst)
    }
}

impl fmt::Debug for KindDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KindDescriptor")
            .field("name", &self.name)
            .field("size", &self.size)
            .field("align", &self.align)
            .finish()
    }
}

/// A closed enumeration of script visible component kinds.
///
/// Implemented by [`component_kinds!`](crate::component_kinds); `ALL` lists
/// every variant in declaration order.
pub trait ComponentKinds: Copy + Eq + fmt::Debug + 'static {
    const ALL: &'static [Self];

    fn descriptor(self) -> KindDescriptor;

    fn name(self) -> &'static str {
        self.descriptor().name
    }

    fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|kind| kind.name() == name)
    }
}

/// Declare the component kinds scripts can reach.
///
/// # Example
/// ```ignore
/// component_kinds! {
///     pub enum GameKinds {
///         Position => Position,
///         Velocity => Velocity,
///     }
/// }
/// ```
#[macro_export]
macro_rules! component_kinds {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $($variant:ident => $ty:ty),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        $vis enum $name {
            $($variant),+
        }

        impl $crate::ComponentKinds for $name {
            const ALL: &'static [Self] = &[$(Self::$variant),+];

            fn descriptor(self) -> $crate::KindDescriptor {
                match self {
                    $(Self::$variant => $crate::KindDescriptor::of::<$ty>()),+
                }
            }
        }
    };
}

/// Converts component bytes to and from tables for the kinds of `K`.
#[derive(Debug, Clone)]
pub struct Marshaler<K: ComponentKinds> {
    ids: Vec<(K, ComponentId)>,
}

impl<K: ComponentKinds> Marshaler<K> {
    /// Ask `store` for the id of every kind, in `K::ALL` order.
    pub fn resolve<S: ComponentStore + ?Sized>(store: &mut S) -> Self {
        let ids = K::ALL
            .iter()
            .map(|&kind| (kind, store.component_id(&kind.descriptor().layout())))
            .collect();
        Self { ids }
    }

    pub fn id_of(&self, kind: K) -> Option<ComponentId> {
        self.ids.iter().find(|(k, _)| *k == kind).map(|&(_, id)| id)
    }

    // Ids come from the store, which never hands out one id twice. If it
    // did, the first kind in `ALL` would shadow the rest.
    pub fn kind_of_id(&self, id: ComponentId) -> Option<K> {
        self.ids.iter().find(|&&(_, i)| i == id).map(|&(kind, _)| kind)
    }

    pub fn kind_of_name(&self, name: &str) -> Option<K> {
        K::from_name(name)
    }

    pub fn kinds(&self) -> impl Iterator<Item = (K, ComponentId)> + '_ {
        self.ids.iter().copied()
    }

    /// The component in `bytes` as a table, plus `good`, `type` and `name`.
    /// An unknown id yields `{ good: false, what }`.
    pub fn serialize(&self, id: ComponentId, bytes: &[u8]) -> Table {
        match self.kind_of_id(id) {
            Some(kind) => self.serialize_kind(kind, id, bytes),
            None => failure(format!("no component kind with id {id}")),
        }
    }

    pub fn serialize_named(&self, name: &str, bytes: &[u8]) -> Table {
        let found = self
            .kind_of_name(name)
            .and_then(|kind| Some((kind, self.id_of(kind)?)));
        match found {
            Some((kind, id)) => self.serialize_kind(kind, id, bytes),
            None => failure(format!("no component kind named '{name}'")),
        }
    }

    fn serialize_kind(&self, kind: K, id: ComponentId, bytes: &[u8]) -> Table {
        let descriptor = kind.descriptor();
        let mut table = descriptor.serialize(bytes);
        table.set("good", true);
        table.set("type", id);
        table.set("name", descriptor.name);
        table
    }

    /// Write `table` into `dst` as the kind with `id`. Returns false if no
    /// kind has that id.
    ///
    /// # Panics
    /// If `table` has no `good` field, or `dst` is the wrong size for the
    /// kind. Both are bugs in the native caller.
    pub fn deserialize(&self, id: ComponentId, table: &Table, dst: &mut [u8]) -> bool {
        require_good(table);
        match self.kind_of_id(id) {
            Some(kind) => {
                kind.descriptor().deserialize(table, dst);
                true
            }
            None => false,
        }
    }

    pub fn deserialize_named(&self, name: &str, table: &Table, dst: &mut [u8]) -> bool {
        require_good(table);
        match self.kind_of_name(name) {
            Some(kind) => {
                kind.descriptor().deserialize(table, dst);
                true
            }
            None => false,
        }
    }
}

fn require_good(table: &Table) {
    assert!(
        table.has_value("good"),
        "component table passed to deserialize has no 'good' field"
    );
}

/// `{ good: false, what }`, the failure shape scripts receive.
pub fn failure(what: impl Into<String>) -> Table {
    Table::new().with("good", false).with("what", what.into())
}
