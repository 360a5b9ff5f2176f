use crate::ecs::{Component, ComponentLayout};
use thiserror::Error;

/// Owned byte payload for a single component instance.
#[derive(Debug)]
pub struct ComponentBytes {
    layout: ComponentLayout,
    bytes: Box<[u8]>,
}

impl ComponentBytes {
    #[inline]
    pub fn layout(&self) -> &ComponentLayout {
        &self.layout
    }

    #[inline]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub(crate) fn into_parts(self) -> (ComponentLayout, Box<[u8]>) {
        (self.layout, self.bytes)
    }
}

#[derive(Debug, Error)]
pub enum EntityBuilderError {
    #[error("component '{name}' expects {expected} bytes but received {actual} bytes")]
    SizeMismatch {
        name: String,
        expected: usize,
        actual: usize,
    },
}

/// Builder for collecting an entity's components prior to spawning.
///
/// Ids are resolved by the world at spawn time, so the builder only carries
/// layouts and bytes.
#[derive(Debug, Default)]
pub struct EntityBuilder {
    components: Vec<ComponentBytes>,
}

impl EntityBuilder {
    /// Create a new empty builder.
    pub fn new() -> Self {
        Self {
            components: Vec::new(),
        }
    }

    /// Add a Rust-typed component by value.
    pub fn with<T: Component>(mut self, value: T) -> Self {
        self.push(ComponentBytes {
            layout: T::layout(),
            bytes: bytemuck::bytes_of(&value).into(),
        });
        self
    }

    /// Add a component by raw bytes (scripting, serialization, etc.).
    pub fn with_raw_bytes(
        mut self,
        layout: ComponentLayout,
        bytes: Vec<u8>,
    ) -> Result<Self, EntityBuilderError> {
        if bytes.len() != layout.size {
            return Err(EntityBuilderError::SizeMismatch {
                name: layout.name,
                expected: layout.size,
                actual: bytes.len(),
            });
        }
        self.push(ComponentBytes {
            layout,
            bytes: bytes.into_boxed_slice(),
        });
        Ok(self)
    }

    pub fn components(&self) -> &[ComponentBytes] {
        &self.components
    }

    pub(crate) fn into_components(self) -> Vec<ComponentBytes> {
        self.components
    }

    // A later component with the same name replaces the earlier one.
    fn push(&mut self, component: ComponentBytes) {
        self.components
            .retain(|existing| existing.layout.name != component.layout.name);
        self.components.push(component);
    }
}
