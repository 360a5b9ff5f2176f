//! FFI layer between Rust and scripts
//!
//! Handle-based access to engine objects. A [`Handle`] is its own value kind
//! and reaches scripts as a `BigInt`, so it is never confused with a number.

use crate::{Library, Table};
use tether_core::ecs::Entity;

/// Opaque handle for script access
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct Handle(pub u64);

impl Handle {
    pub fn to_bits(self) -> u64 {
        self.0
    }

    pub fn from_bits(bits: u64) -> Self {
        Handle(bits)
    }
}

impl From<Entity> for Handle {
    fn from(entity: Entity) -> Self {
        Handle(entity.to_bits())
    }
}

impl From<Handle> for Entity {
    fn from(handle: Handle) -> Self {
        Entity::from_bits(handle.0)
    }
}

/// A live entity as seen from script: `{ good, entity, world }`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct EntityHandle {
    pub entity: Entity,
    pub world: Handle,
}

impl EntityHandle {
    pub fn new(entity: Entity, world: Handle) -> Self {
        Self { entity, world }
    }

    /// The handle's fields superimposed on top of `base`'s functions, so a
    /// script can call `self.get(...)` on the handle it was given.
    pub fn to_table(&self, base: &Library) -> Table {
        let mut table = base.to_table();
        table.superimpose(&self.fields());
        table
    }

    /// Just `{ good: true, entity, world }`.
    pub fn fields(&self) -> Table {
        Table::new()
            .with("good", true)
            .with("entity", Handle::from(self.entity))
            .with("world", self.world)
    }

    /// Read a handle back from a script table. None if any field is missing,
    /// has the wrong kind, or `good` is false.
    pub fn from_table(table: &Table) -> Option<Self> {
        if table.try_get::<bool>("good") != Some(&true) {
            return None;
        }
        let entity = *table.try_get::<Handle>("entity")?;
        let world = *table.try_get::<Handle>("world")?;
        Some(Self::new(entity.into(), world))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::NativeFunction;

    #[test]
    fn handle_table_round_trip() {
        let entity = Entity::from_bits(0x0000_0003_0000_0009);
        let handle = EntityHandle::new(entity, Handle(1));
        let table = handle.fields();
        assert!(*table.get::<bool>("good"));
        assert_eq!(EntityHandle::from_table(&table), Some(handle));
    }

    #[test]
    fn handle_fields_win_over_base() {
        let base = Library::new("Component")
            .with_function("get", NativeFunction::new(1, |_| Ok(0)))
            .with_function("good", NativeFunction::new(0, |_| Ok(0)));
        let table = EntityHandle::new(Entity::from_bits(1), Handle(0)).to_table(&base);
        assert!(table.try_get::<NativeFunction>("get").is_some());
        assert_eq!(table.try_get::<bool>("good"), Some(&true));
    }

    #[test]
    fn bad_handle_tables_are_rejected() {
        let mut table = EntityHandle::new(Entity::from_bits(1), Handle(0)).fields();
        table.set("good", false);
        assert_eq!(EntityHandle::from_table(&table), None);
        table.set("good", true);
        table.set("entity", 1.0);
        assert_eq!(EntityHandle::from_table(&table), None);
    }
}
