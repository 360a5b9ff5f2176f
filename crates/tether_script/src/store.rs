//! What the bridge needs from an entity store.

use crate::Handle;
use std::cell::RefCell;
use std::rc::Rc;
use tether_core::ecs::{ComponentId, ComponentLayout, Entity, World};

/// Component id allocation and raw component access.
pub trait ComponentStore {
    /// Id for `layout`, allocated on first use.
    fn component_id(&mut self, layout: &ComponentLayout) -> ComponentId;

    fn component_bytes(&self, entity: Entity, id: ComponentId) -> Option<&[u8]>;

    fn component_bytes_mut(&mut self, entity: Entity, id: ComponentId) -> Option<&mut [u8]>;
}

impl ComponentStore for World {
    fn component_id(&mut self, layout: &ComponentLayout) -> ComponentId {
        self.register_component(layout)
    }

    fn component_bytes(&self, entity: Entity, id: ComponentId) -> Option<&[u8]> {
        World::component_bytes(self, entity, id)
    }

    fn component_bytes_mut(&mut self, entity: Entity, id: ComponentId) -> Option<&mut [u8]> {
        World::component_bytes_mut(self, entity, id)
    }
}

/// Stores reachable from script, addressed by the `world` handle of an
/// entity handle table.
pub struct WorldRegistry<S> {
    worlds: RefCell<Vec<Rc<RefCell<S>>>>,
}

impl<S> WorldRegistry<S> {
    pub fn new() -> Self {
        Self {
            worlds: RefCell::new(Vec::new()),
        }
    }

    pub fn insert(&self, world: Rc<RefCell<S>>) -> Handle {
        let mut worlds = self.worlds.borrow_mut();
        worlds.push(world);
        Handle((worlds.len() - 1) as u64)
    }

    pub fn get(&self, handle: Handle) -> Option<Rc<RefCell<S>>> {
        let index = usize::try_from(handle.to_bits()).ok()?;
        self.worlds.borrow().get(index).cloned()
    }

    pub fn len(&self) -> usize {
        self.worlds.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.worlds.borrow().is_empty()
    }
}

impl<S> Default for WorldRegistry<S> {
    fn default() -> Self {
        Self::new()
    }
}
