//! Tether Core
//!
//! The entity store the scripting bridge talks to:
//! - Generational entity handles
//! - Runtime component id allocation keyed by data layout
//! - Raw per-entity component bytes

pub mod ecs;

pub use bytemuck;

/// Engine version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
