//! Error types for the harvester simulation.

use thiserror::Error;

use crate::components::EntityId;
use crate::resources::ResourceTypeId;

/// Result type alias using [`HarvestError`].
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Top-level error type for harvester operations.
///
/// Only contract violations surface here. Transient world failures
/// (a destroyed target, an unreachable site, a full store) are recovered
/// inside the state machine and never reach the caller.
#[derive(Debug, Error)]
pub enum HarvestError {
    /// No harvester state is registered for the entity.
    #[error("Harvester not found: {0}")]
    NotFound(EntityId),

    /// The entity already has harvester state.
    #[error("Harvester already registered: {0}")]
    AlreadyRegistered(EntityId),

    /// The entity does not carry the harvester flag.
    #[error("Entity {0} is not a harvester")]
    NotAHarvester(EntityId),

    /// The target entity does not carry the resource flag.
    #[error("Entity {0} is not a resource")]
    NotAResource(EntityId),

    /// The target entity does not carry the storage site flag.
    #[error("Entity {0} is not a storage site")]
    NotAStorageSite(EntityId),

    /// No prioritized resource type is still desired by the storage site.
    #[error("Storage site {storage} desires none of the harvester's prioritized resources")]
    NoTransportResource {
        /// Destination storage site.
        storage: EntityId,
    },

    /// No other storage site holds the resource to be transported.
    #[error("No transport source for {resource} (destination {storage})")]
    NoTransportSource {
        /// Destination storage site.
        storage: EntityId,
        /// Resource type to be transported.
        resource: ResourceTypeId,
    },

    /// The harvester must drop off its load first but no site accepts it.
    #[error("No storage site accepts the load carried by harvester {harvester}")]
    NoDropOffSite {
        /// The harvester carrying the load.
        harvester: EntityId,
    },

    /// A resource type name is not present in the registry.
    #[error("Unknown resource type: {0}")]
    UnknownResourceType(String),

    /// Amounts stored in the ledger are never negative.
    #[error("Negative amount {amount} for resource {resource}")]
    NegativeAmount {
        /// Resource type name.
        resource: String,
        /// The rejected amount.
        amount: i32,
    },

    /// No harvester profile with this name is configured.
    #[error("Unknown harvester profile: {0}")]
    UnknownProfile(String),

    /// Configuration could not be parsed.
    #[error("Failed to parse harvest config: {0}")]
    ConfigParse(String),

    /// Harvester state could not be (de)serialized.
    #[error("Serialization failed: {0}")]
    Serialization(String),
}
