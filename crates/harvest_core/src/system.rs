//! Harvest system runner.
//!
//! Owns the [`HarvesterTable`], feeds commands and bus events through
//! [`machine::transition`](crate::machine::transition) and executes the
//! resulting effects against the event bus and the movement system.

use tracing::{trace, warn};

use crate::components::{EntityFlags, EntityId};
use crate::config::HarvestConfig;
use crate::error::{HarvestError, Result};
use crate::events::{Continuation, Effect, EventKind};
use crate::machine::{transition, Trigger};
use crate::table::HarvesterTable;
use crate::world::{EventBus, HarvestWorld, MovementOrders};

/// Drives every registered harvester.
#[derive(Debug, Clone, Default)]
pub struct HarvestSystem {
    table: HarvesterTable,
}

impl HarvestSystem {
    /// Create a system with no harvesters.
    #[must_use]
    pub fn new(config: HarvestConfig) -> Self {
        Self {
            table: HarvesterTable::new(config),
        }
    }

    /// Wrap an existing (e.g. deserialized) table.
    ///
    /// Call [`Self::restore`] afterwards to re-register its continuations.
    #[must_use]
    pub fn from_table(table: HarvesterTable) -> Self {
        Self { table }
    }

    /// The state table.
    #[must_use]
    pub fn table(&self) -> &HarvesterTable {
        &self.table
    }

    /// Mutable access to the state table's accessors.
    pub fn table_mut(&mut self) -> &mut HarvesterTable {
        &mut self.table
    }

    /// Register a harvester entity.
    pub fn add_entity<W>(&mut self, uid: EntityId, world: &W) -> Result<()>
    where
        W: HarvestWorld + ?Sized,
    {
        if !world
            .flags(uid)
            .is_some_and(|f| f.contains(EntityFlags::HARVESTER))
        {
            warn!(entity = uid, "Entity is not a harvester");
            return Err(HarvestError::NotAHarvester(uid));
        }
        self.table.add_entity(uid)
    }

    /// Stop a harvester and drop its state.
    pub fn remove_entity<W, B>(&mut self, uid: EntityId, world: &mut W, bus: &mut B) -> Result<()>
    where
        W: HarvestWorld + MovementOrders + ?Sized,
        B: EventBus + ?Sized,
    {
        self.stop(uid, world, bus)?;
        self.table.remove_entity(uid)?;
        Ok(())
    }

    /// Order a harvester to gather from a resource node.
    pub fn gather<W, B>(
        &mut self,
        uid: EntityId,
        resource: EntityId,
        world: &mut W,
        bus: &mut B,
    ) -> Result<()>
    where
        W: HarvestWorld + MovementOrders + ?Sized,
        B: EventBus + ?Sized,
    {
        self.run(uid, Trigger::Gather(resource), world, bus)
    }

    /// Order a harvester to drop its load off at a storage site.
    pub fn drop_off<W, B>(
        &mut self,
        uid: EntityId,
        storage: EntityId,
        world: &mut W,
        bus: &mut B,
    ) -> Result<()>
    where
        W: HarvestWorld + MovementOrders + ?Sized,
        B: EventBus + ?Sized,
    {
        self.run(uid, Trigger::DropOff(storage), world, bus)
    }

    /// Order a harvester to keep a storage site supplied.
    pub fn transport<W, B>(
        &mut self,
        uid: EntityId,
        storage: EntityId,
        world: &mut W,
        bus: &mut B,
    ) -> Result<()>
    where
        W: HarvestWorld + MovementOrders + ?Sized,
        B: EventBus + ?Sized,
    {
        self.run(uid, Trigger::Transport(storage), world, bus)
    }

    /// Cancel a harvester's task. Carried resources are kept.
    pub fn stop<W, B>(&mut self, uid: EntityId, world: &mut W, bus: &mut B) -> Result<()>
    where
        W: HarvestWorld + MovementOrders + ?Sized,
        B: EventBus + ?Sized,
    {
        self.run(uid, Trigger::Stop, world, bus)
    }

    /// Deliver a movement or animation event for one entity.
    ///
    /// Every continuation of the entity listening for `kind` runs, in
    /// declaration order. Each is re-checked before it runs since an earlier
    /// one may have cancelled it. Events for unknown entities are ignored.
    pub fn handle_event<W, B>(&mut self, uid: EntityId, kind: EventKind, world: &mut W, bus: &mut B)
    where
        W: HarvestWorld + MovementOrders + ?Sized,
        B: EventBus + ?Sized,
    {
        let Ok(hs) = self.table.state(uid) else {
            return;
        };
        let listening: Vec<Continuation> =
            hs.pending().filter(|c| c.trigger() == kind).collect();

        for continuation in listening {
            if let Err(e) = self.run(uid, Trigger::Fired(continuation), world, bus) {
                warn!(harvester = uid, ?continuation, error = %e, "Continuation failed");
            }
        }
    }

    /// Re-register every pending continuation with a fresh bus.
    pub fn restore<B: EventBus + ?Sized>(&self, bus: &mut B) {
        for (uid, hs) in self.table.iter() {
            for continuation in hs.pending() {
                bus.subscribe(uid, continuation);
            }
        }
    }

    fn run<W, B>(&mut self, uid: EntityId, trigger: Trigger, world: &mut W, bus: &mut B) -> Result<()>
    where
        W: HarvestWorld + MovementOrders + ?Sized,
        B: EventBus + ?Sized,
    {
        let (hs, config) = self.table.entry_mut(uid)?;
        let effects = transition(uid, hs, trigger, world, config).map_err(|e| {
            warn!(harvester = uid, ?trigger, error = %e, "Order rejected");
            e
        })?;
        #[cfg(feature = "debug-validation")]
        validate(uid, hs);
        apply(&effects, world, bus);
        Ok(())
    }
}

#[cfg(feature = "debug-validation")]
fn validate(uid: EntityId, hs: &crate::state::HarvesterState) {
    assert_eq!(
        hs.is_idle(),
        !hs.has_targets(),
        "harvester {uid}: idle/target mismatch in {hs:?}"
    );
    assert!(
        hs.pending().filter(|c| c.is_arrival()).count() <= 1,
        "harvester {uid}: several arrival continuations in {hs:?}"
    );
    assert!(
        hs.ledger.total_carry() >= 0,
        "harvester {uid}: negative carry in {hs:?}"
    );
}

/// Execute a transition's effects in order.
pub fn apply<M, B>(effects: &[Effect], movement: &mut M, bus: &mut B)
where
    M: MovementOrders + ?Sized,
    B: EventBus + ?Sized,
{
    for effect in effects {
        trace!(?effect, "Applying effect");
        match *effect {
            Effect::Subscribe(entity, continuation) => bus.subscribe(entity, continuation),
            Effect::Unsubscribe(entity, continuation) => bus.unsubscribe(entity, continuation),
            Effect::MoveAdjacent { entity, target } => movement.move_adjacent(entity, target),
            Effect::Notify(event) => bus.publish(event),
        }
    }
}
