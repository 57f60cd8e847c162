//! Inbound events, continuations, outbound notifications and effects.
//!
//! The state machine never calls the event bus or the movement system
//! directly. Each transition returns a list of [`Effect`]s which the
//! [`crate::system::HarvestSystem`] runner executes.

use serde::{Deserialize, Serialize};

use crate::components::EntityId;
use crate::resources::ResourceTypeId;

/// Notifications delivered to a harvester by the movement and animation
/// collaborators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventKind {
    /// The entity started moving.
    MotionStart,
    /// The entity stopped moving.
    MotionEnd,
    /// A new movement order was issued by someone other than this module.
    MoveIssued,
    /// The entity's current animation completed one cycle.
    AnimCycleFinished,
}

/// Handlers this module registers with the event bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Continuation {
    /// Arrival next to the targeted resource node.
    ArriveAtResource,
    /// Arrival next to the targeted drop-off site.
    ArriveAtStorage,
    /// Arrival next to the transport source.
    ArriveAtTransportSource,
    /// Arrival next to the transport destination.
    ArriveAtTransportDest,
    /// A foreign movement order pre-empted the current trip.
    TravelPreempted,
    /// The harvester moved away while harvesting.
    HarvestInterrupted,
    /// One harvest animation cycle completed.
    HarvestCycleFinished,
}

impl Continuation {
    /// Every continuation, in declaration order.
    pub const ALL: [Self; 7] = [
        Self::ArriveAtResource,
        Self::ArriveAtStorage,
        Self::ArriveAtTransportSource,
        Self::ArriveAtTransportDest,
        Self::TravelPreempted,
        Self::HarvestInterrupted,
        Self::HarvestCycleFinished,
    ];

    /// The event kind this continuation listens for.
    #[must_use]
    pub const fn trigger(self) -> EventKind {
        match self {
            Self::ArriveAtResource
            | Self::ArriveAtStorage
            | Self::ArriveAtTransportSource
            | Self::ArriveAtTransportDest => EventKind::MotionEnd,
            Self::TravelPreempted => EventKind::MoveIssued,
            Self::HarvestInterrupted => EventKind::MotionStart,
            Self::HarvestCycleFinished => EventKind::AnimCycleFinished,
        }
    }

    /// Continuations waiting for a trip to finish.
    #[must_use]
    pub const fn is_arrival(self) -> bool {
        matches!(self.trigger(), EventKind::MotionEnd)
    }
}

/// Notifications published by the harvester module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HarvestEvent {
    /// A harvester started travelling to a resource node.
    HarvestTargetAcquired {
        /// The harvester.
        harvester: EntityId,
        /// The resource node.
        resource: EntityId,
    },
    /// A harvester started extracting.
    HarvestBegin {
        /// The harvester.
        harvester: EntityId,
    },
    /// A harvester stopped extracting.
    HarvestEnd {
        /// The harvester.
        harvester: EntityId,
    },
    /// A harvester started travelling to a drop-off site.
    StorageTargetAcquired {
        /// The harvester.
        harvester: EntityId,
        /// The storage site.
        storage: EntityId,
    },
    /// A harvester committed to a transport destination.
    TransportTargetAcquired {
        /// The harvester.
        harvester: EntityId,
        /// The destination storage site.
        storage: EntityId,
    },
    /// A storage site accepted (part of) a harvester's load.
    ResourceDroppedOff {
        /// The harvester.
        harvester: EntityId,
        /// The storage site.
        storage: EntityId,
        /// Resource type delivered.
        resource: ResourceTypeId,
        /// Amount accepted.
        amount: i32,
    },
    /// A harvester took stock out of a transport source.
    ResourcePickedUp {
        /// The harvester.
        harvester: EntityId,
        /// The source storage site.
        storage: EntityId,
        /// Resource type taken.
        resource: ResourceTypeId,
        /// Amount taken.
        amount: i32,
    },
    /// A resource node ran out.
    ResourceExhausted {
        /// The exhausted resource node.
        resource: EntityId,
    },
}

impl HarvestEvent {
    /// The entity this notification is published on.
    #[must_use]
    pub const fn entity(&self) -> EntityId {
        match *self {
            Self::HarvestTargetAcquired { harvester, .. }
            | Self::HarvestBegin { harvester }
            | Self::HarvestEnd { harvester }
            | Self::StorageTargetAcquired { harvester, .. }
            | Self::TransportTargetAcquired { harvester, .. }
            | Self::ResourceDroppedOff { harvester, .. }
            | Self::ResourcePickedUp { harvester, .. } => harvester,
            Self::ResourceExhausted { resource } => resource,
        }
    }
}

/// Side effect requested by a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Effect {
    /// Register a continuation for an entity.
    Subscribe(EntityId, Continuation),
    /// Cancel a continuation for an entity.
    Unsubscribe(EntityId, Continuation),
    /// Ask the movement system to bring `entity` next to `target`.
    MoveAdjacent {
        /// Entity to move.
        entity: EntityId,
        /// Entity to surround.
        target: EntityId,
    },
    /// Publish a notification.
    Notify(HarvestEvent),
}
