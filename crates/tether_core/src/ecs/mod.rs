//! Entity Component System core types.
//!
//! Components are plain-old-data structs. The world hands out component ids
//! at runtime, keyed by the component's name and layout, and stores every
//! component instance as raw bytes so that code which only knows an id (the
//! scripting bridge, save files) can read and write it.

mod builder;
mod component;
mod entity;
mod world;

pub use builder::{ComponentBytes, EntityBuilder, EntityBuilderError};
pub use component::{Component, ComponentId, ComponentLayout, ComponentRegistry};
pub use entity::Entity;
pub use world::{World, WorldError};

/// Convenience macro for spawning entities.
///
/// # Example
/// ```ignore
/// let entity = spawn!(world,
///     Position { x: 1.0, y: 2.0 },
///     Velocity { x: 0.5, y: 0.0 }
/// );
/// ```
#[macro_export]
macro_rules! spawn {
    ($world:expr, $($comp:expr),+ $(,)?) => {{
        let builder = $crate::ecs::EntityBuilder::new()
            $(.with($comp))+;
        $world.spawn(builder)
    }};
}
