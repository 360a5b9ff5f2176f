// component.rs - Runtime component registration
//
// Components are identified by u32 ids handed out by the world, not by Rust
// TypeIds. The id is looked up by name and layout, so any code that can
// describe a component's layout (a script binding, a loader) gets the same id.

use std::collections::HashMap;
use std::mem::{align_of, size_of};

pub type ComponentId = u32;

/// Name and memory layout of a component type.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ComponentLayout {
    pub name: String,
    pub size: usize,
    pub align: usize,
}

impl ComponentLayout {
    pub fn new(name: impl Into<String>, size: usize, align: usize) -> Self {
        Self {
            name: name.into(),
            size,
            align,
        }
    }

    /// Layout of a Rust-defined component.
    pub fn of<T: Component>() -> Self {
        Self::new(T::NAME, size_of::<T>(), align_of::<T>())
    }
}

/// Trait for Rust-defined POD components.
///
/// `bytemuck::Pod` guarantees the type can be copied to and from raw bytes,
/// which is how the world stores every component.
pub trait Component: bytemuck::Pod + 'static {
    /// Human-readable name, also the registry key.
    const NAME: &'static str;

    fn layout() -> ComponentLayout {
        ComponentLayout::of::<Self>()
    }
}

/// Allocates component ids and remembers their layouts.
#[derive(Debug, Default)]
pub struct ComponentRegistry {
    layouts: Vec<ComponentLayout>,
    by_name: HashMap<String, ComponentId>,
}

impl ComponentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the id registered for `layout`, allocating one on first use.
    ///
    /// # Panics
    /// Re-registering a name with a different size or alignment is a bug in
    /// the caller and panics.
    pub fn register(&mut self, layout: &ComponentLayout) -> ComponentId {
        if let Some(&id) = self.by_name.get(&layout.name) {
            let prev = &self.layouts[id as usize];
            // Sanity check: re-registration must match previous layout
            assert_eq!(
                prev.size, layout.size,
                "Component size mismatch for '{}': was {}, now {}",
                layout.name, prev.size, layout.size
            );
            assert_eq!(
                prev.align, layout.align,
                "Component align mismatch for '{}': was {}, now {}",
                layout.name, prev.align, layout.align
            );
            return id;
        }

        let id = self.layouts.len() as ComponentId;
        tracing::debug!(component = %layout.name, id, size = layout.size, "registered component");
        self.layouts.push(layout.clone());
        self.by_name.insert(layout.name.clone(), id);
        id
    }

    /// Look up an already registered component by name.
    pub fn id_of(&self, name: &str) -> Option<ComponentId> {
        self.by_name.get(name).copied()
    }

    /// Look up component layout by id.
    pub fn layout_of(&self, id: ComponentId) -> Option<&ComponentLayout> {
        self.layouts.get(id as usize)
    }

    pub fn len(&self) -> usize {
        self.layouts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layouts.is_empty()
    }
}

/// Helper macro to implement the `Component` trait.
///
/// # Example
/// ```ignore
/// #[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
/// #[repr(C)]
/// struct Position { x: f32, y: f32 }
///
/// define_component!(Position, "Position");
/// ```
#[macro_export]
macro_rules! define_component {
    ($ty:ty, $name:expr) => {
        impl $crate::ecs::Component for $ty {
            const NAME: &'static str = $name;
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_is_idempotent_per_name() {
        let mut registry = ComponentRegistry::new();
        let position = ComponentLayout::new("Position", 8, 4);
        let velocity = ComponentLayout::new("Velocity", 8, 4);

        let a = registry.register(&position);
        let b = registry.register(&velocity);
        assert_ne!(a, b);
        assert_eq!(registry.register(&position), a);
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.id_of("Velocity"), Some(b));
        assert_eq!(registry.layout_of(a), Some(&position));
        assert_eq!(registry.layout_of(99), None);
    }

    #[test]
    #[should_panic(expected = "Component size mismatch")]
    fn register_rejects_layout_change() {
        let mut registry = ComponentRegistry::new();
        registry.register(&ComponentLayout::new("Position", 8, 4));
        registry.register(&ComponentLayout::new("Position", 12, 4));
    }
}
