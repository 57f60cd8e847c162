//! Entity identifiers and capability flags.
//!
//! The harvester module never owns world entities; it refers to them by
//! [`EntityId`] and inspects their [`EntityFlags`] through the collaborator
//! traits in [`crate::world`].

use serde::{Deserialize, Serialize};

/// Unique identifier for entities.
pub type EntityId = u64;

/// Owning faction of an entity.
///
/// Storage sites only exchange resources with entities of their own faction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct FactionId(pub u8);

impl FactionId {
    /// Create a new faction ID.
    #[must_use]
    pub const fn new(id: u8) -> Self {
        Self(id)
    }
}

/// Capability flags attached to a world entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct EntityFlags(u32);

impl EntityFlags {
    /// No capabilities.
    pub const NONE: Self = Self(0);
    /// Entity can gather, carry and deliver resources.
    pub const HARVESTER: Self = Self(1 << 0);
    /// Entity is a finite resource node.
    pub const RESOURCE: Self = Self(1 << 1);
    /// Entity stores resources per type.
    pub const STORAGE_SITE: Self = Self(1 << 2);
    /// Entity is logically dead and pending removal.
    pub const ZOMBIE: Self = Self(1 << 3);

    /// Raw bit representation.
    #[must_use]
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Check whether every flag in `other` is set.
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Set the flags in `other`.
    pub fn insert(&mut self, other: Self) {
        self.0 |= other.0;
    }

    /// Clear the flags in `other`.
    pub fn remove(&mut self, other: Self) {
        self.0 &= !other.0;
    }

    /// Check for a live (non-zombie) entity carrying `capability`.
    #[must_use]
    pub const fn is_live(self, capability: Self) -> bool {
        self.contains(capability) && !self.contains(Self::ZOMBIE)
    }
}

impl std::ops::BitOr for EntityFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        Self(self.0 | rhs.0)
    }
}
