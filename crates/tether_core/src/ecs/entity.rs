//! Entity handle with generational index
//!
//! Entities are lightweight handles (8 bytes) that reference data in the World.
//! The generation counter prevents use-after-free bugs.

/// Entity handle (generation-indexed for safety)
///
/// Format: [32-bit generation | 32-bit index]
/// - Index: Position in the world's entity slot array
/// - Generation: Incremented when the slot is reused
///
/// Example:
/// ```ignore
/// let entity = world.spawn(EntityBuilder::new());
/// world.despawn(entity);
/// // entity handle is now invalid (generation mismatch)
/// ```
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct Entity {
    index: u32,
    generation: u32,
}

impl Entity {
    pub(crate) const fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }

    /// Serialize to 64-bit integer (for scripts/save files)
    pub fn to_bits(&self) -> u64 {
        ((self.generation as u64) << 32) | (self.index as u64)
    }

    /// Deserialize from 64-bit integer
    pub fn from_bits(bits: u64) -> Self {
        Self {
            index: bits as u32,
            generation: (bits >> 32) as u32,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bits_keep_index_and_generation() {
        let entity = Entity::new(7, u32::MAX);
        let back = Entity::from_bits(entity.to_bits());
        assert_eq!(back, entity);
        assert_eq!(back.index(), 7);
        assert_eq!(back.generation(), u32::MAX);
    }
}
