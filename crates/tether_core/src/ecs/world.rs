// world.rs - ECS World with entity management and raw component access

use crate::ecs::{Component, ComponentId, ComponentLayout, ComponentRegistry, Entity, EntityBuilder};
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum WorldError {
    #[error("entity {0:?} is not alive")]
    DeadEntity(Entity),
    #[error("component id {0} is not registered")]
    UnknownComponent(ComponentId),
    #[error("component '{name}' expects {expected} bytes but received {actual} bytes")]
    SizeMismatch {
        name: String,
        expected: usize,
        actual: usize,
    },
}

#[derive(Debug, Clone, Copy)]
struct Slot {
    generation: u32,
    alive: bool,
}

/// The main ECS world containing all entities and components.
///
/// Every component instance is kept as its raw bytes, one column per
/// component id, keyed by entity index.
#[derive(Debug, Default)]
pub struct World {
    registry: ComponentRegistry,
    slots: Vec<Slot>,
    free: Vec<u32>,
    columns: HashMap<ComponentId, HashMap<u32, Box<[u8]>>>,
}

impl World {
    /// Create a new empty world.
    pub fn new() -> Self {
        Self::default()
    }

    /// Component id for a Rust-defined component, allocated on first use.
    pub fn component<T: Component>(&mut self) -> ComponentId {
        self.registry.register(&T::layout())
    }

    /// Component id for an arbitrary layout, allocated on first use.
    pub fn register_component(&mut self, layout: &ComponentLayout) -> ComponentId {
        self.registry.register(layout)
    }

    pub fn registry(&self) -> &ComponentRegistry {
        &self.registry
    }

    /// Spawn an entity from a builder.
    ///
    /// Despawned slots are reused with a bumped generation.
    pub fn spawn(&mut self, builder: EntityBuilder) -> Entity {
        let entity = match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index as usize];
                slot.alive = true;
                Entity::new(index, slot.generation)
            }
            None => {
                let index = self.slots.len() as u32;
                self.slots.push(Slot {
                    generation: 0,
                    alive: true,
                });
                Entity::new(index, 0)
            }
        };

        for component in builder.into_components() {
            let (layout, bytes) = component.into_parts();
            let id = self.registry.register(&layout);
            self.columns
                .entry(id)
                .or_default()
                .insert(entity.index(), bytes);
        }

        entity
    }

    /// Despawn an entity.
    ///
    /// The slot's generation is incremented, which invalidates stale handles.
    pub fn despawn(&mut self, entity: Entity) -> bool {
        if !self.is_alive(entity) {
            return false;
        }
        let slot = &mut self.slots[entity.index() as usize];
        slot.alive = false;
        slot.generation = slot.generation.wrapping_add(1);
        for column in self.columns.values_mut() {
            column.remove(&entity.index());
        }
        self.free.push(entity.index());
        true
    }

    pub fn is_alive(&self, entity: Entity) -> bool {
        self.slots
            .get(entity.index() as usize)
            .is_some_and(|slot| slot.alive && slot.generation == entity.generation())
    }

    /// Number of live entities.
    pub fn entity_count(&self) -> usize {
        self.slots.iter().filter(|slot| slot.alive).count()
    }

    /// Add or replace a typed component on a live entity.
    pub fn insert<T: Component>(&mut self, entity: Entity, value: T) -> Result<(), WorldError> {
        let id = self.component::<T>();
        self.insert_raw(entity, id, bytemuck::bytes_of(&value).to_vec())
    }

    /// Add or replace a component by id and raw bytes.
    pub fn insert_raw(
        &mut self,
        entity: Entity,
        id: ComponentId,
        bytes: Vec<u8>,
    ) -> Result<(), WorldError> {
        if !self.is_alive(entity) {
            return Err(WorldError::DeadEntity(entity));
        }
        let layout = self
            .registry
            .layout_of(id)
            .ok_or(WorldError::UnknownComponent(id))?;
        if bytes.len() != layout.size {
            return Err(WorldError::SizeMismatch {
                name: layout.name.clone(),
                expected: layout.size,
                actual: bytes.len(),
            });
        }
        self.columns
            .entry(id)
            .or_default()
            .insert(entity.index(), bytes.into_boxed_slice());
        Ok(())
    }

    /// Copy a typed component out of the world.
    ///
    /// Returns None if the entity is invalid or doesn't have the component.
    pub fn get<T: Component>(&self, entity: Entity) -> Option<T> {
        let id = self.registry.id_of(T::NAME)?;
        self.component_bytes(entity, id)
            .map(bytemuck::pod_read_unaligned::<T>)
    }

    /// Overwrite an existing typed component. Returns false if it is absent.
    pub fn set<T: Component>(&mut self, entity: Entity, value: T) -> bool {
        let Some(id) = self.registry.id_of(T::NAME) else {
            return false;
        };
        match self.component_bytes_mut(entity, id) {
            Some(bytes) => {
                bytes.copy_from_slice(bytemuck::bytes_of(&value));
                true
            }
            None => false,
        }
    }

    /// Raw bytes of a component, or None if the entity is dead or lacks it.
    pub fn component_bytes(&self, entity: Entity, id: ComponentId) -> Option<&[u8]> {
        if !self.is_alive(entity) {
            return None;
        }
        self.columns.get(&id)?.get(&entity.index()).map(|b| &b[..])
    }

    /// Mutable raw bytes of a component, or None if the entity is dead or lacks it.
    pub fn component_bytes_mut(&mut self, entity: Entity, id: ComponentId) -> Option<&mut [u8]> {
        if !self.is_alive(entity) {
            return None;
        }
        self.columns
            .get_mut(&id)?
            .get_mut(&entity.index())
            .map(|b| &mut b[..])
    }

    /// Entities that currently carry component `id`.
    pub fn entities_with(&self, id: ComponentId) -> Vec<Entity> {
        let Some(column) = self.columns.get(&id) else {
            return Vec::new();
        };
        let mut entities: Vec<Entity> = column
            .keys()
            .map(|&index| Entity::new(index, self.slots[index as usize].generation))
            .collect();
        entities.sort_by_key(|e| e.index());
        entities
    }
}
