//! Per-harvester state record.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::components::EntityId;
use crate::events::Continuation;
use crate::math::Vec2Fixed;
use crate::resources::{CarryLedger, ResourceTypeId};

/// What a harvester is currently doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum HarvestState {
    /// Idle, no active task.
    #[default]
    NotHarvesting,
    /// Travelling to a resource node.
    SeekResource,
    /// Extracting from an adjacent resource node.
    Harvesting,
    /// Travelling to a storage site to drop off the load.
    SeekStorage,
    /// Travelling to a transport source to pick up.
    TransportGetting,
    /// Travelling to the transport destination to deliver.
    TransportPutting,
}

impl HarvestState {
    /// States that wait for a movement to complete.
    #[must_use]
    pub const fn is_seeking(self) -> bool {
        matches!(
            self,
            Self::SeekResource | Self::SeekStorage | Self::TransportGetting | Self::TransportPutting
        )
    }
}

/// Policy for choosing the storage site a transport picks up from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TransportStrategy {
    /// Take from the nearest site holding any stock.
    #[default]
    Nearest,
    /// Prefer sites stocked above their desired level, taking only the excess.
    Excess,
}

/// Order deferred until the current drop-off completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum QueuedCommand {
    /// Nothing queued.
    #[default]
    None,
    /// Gather from the resource entity.
    Gather(EntityId),
    /// Transport into the storage site.
    Transport(EntityId),
}

/// State of one harvester entity.
///
/// Every field needed to resume the task is stored here, including the
/// continuations currently registered with the event bus.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct HarvesterState {
    /// Current state.
    pub state: HarvestState,
    /// Transport source selection policy.
    pub strategy: TransportStrategy,
    /// Resource node being sought or harvested.
    pub resource_target: Option<EntityId>,
    /// Storage site being sought for a drop-off.
    pub storage_target: Option<EntityId>,
    /// Storage site a transport picks up from.
    pub transport_source: Option<EntityId>,
    /// Storage site a transport delivers to.
    pub transport_dest: Option<EntityId>,
    /// Last observed position of the resource target.
    pub last_resource_position: Vec2Fixed,
    /// Resource type being gathered or transported.
    pub active_resource: Option<ResourceTypeId>,
    /// Gather speed, capacity and carry per resource type.
    pub ledger: CarryLedger,
    /// Order to run once the current drop-off completes.
    pub queued: QueuedCommand,
    /// The current storage visit is a pure drop-off.
    pub drop_off_only: bool,
    /// Continuations registered with the event bus.
    pub pending: BTreeSet<Continuation>,
}

impl HarvesterState {
    /// Create an idle state record.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Check whether the harvester has no task.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.state == HarvestState::NotHarvesting
    }

    /// Check whether any target field is set.
    #[must_use]
    pub fn has_targets(&self) -> bool {
        self.resource_target.is_some()
            || self.storage_target.is_some()
            || self.transport_source.is_some()
            || self.transport_dest.is_some()
            || self.active_resource.is_some()
    }

    /// Check whether a continuation is registered.
    #[must_use]
    pub fn is_pending(&self, continuation: Continuation) -> bool {
        self.pending.contains(&continuation)
    }

    /// Continuations currently registered with the event bus.
    pub fn pending(&self) -> impl Iterator<Item = Continuation> + '_ {
        self.pending.iter().copied()
    }

    /// Clear every target and return to idle. Carried inventory and
    /// capacities are untouched.
    pub(crate) fn reset(&mut self) {
        self.state = HarvestState::NotHarvesting;
        self.resource_target = None;
        self.storage_target = None;
        self.transport_source = None;
        self.transport_dest = None;
        self.last_resource_position = Vec2Fixed::ZERO;
        self.active_resource = None;
        self.queued = QueuedCommand::None;
        self.drop_off_only = false;
    }
}
