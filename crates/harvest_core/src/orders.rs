//! Selection-level harvester orders.
//!
//! Turns "the player clicked on X with these units selected" into calls on
//! [`HarvestSystem`]. Input decoding (which button, which entity is under the
//! cursor) stays with the caller; this module only decides what the click
//! means and which selected units take the order.

use tracing::debug;

use crate::components::{EntityFlags, EntityId};
use crate::system::HarvestSystem;
use crate::world::{EventBus, HarvestWorld, MovementOrders};

/// Order implied by hovering an entity with harvesters selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ContextualAction {
    /// No harvester order applies.
    #[default]
    None,
    /// Gather from the hovered resource node.
    Gather,
    /// Drop loads off at the hovered storage site.
    DropOff,
    /// Keep the hovered storage site supplied.
    Transport,
}

/// An order armed from the action pad, waiting for a left click.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TargetMode {
    /// Nothing armed.
    #[default]
    Off,
    /// Next left click gathers.
    Gather,
    /// Next left click drops off.
    DropOff,
    /// Next left click transports.
    Transport,
}

impl TargetMode {
    /// Check whether an order is armed.
    #[must_use]
    pub const fn is_targeting(self) -> bool {
        !matches!(self, Self::Off)
    }

    const fn action(self) -> ContextualAction {
        match self {
            Self::Off => ContextualAction::None,
            Self::Gather => ContextualAction::Gather,
            Self::DropOff => ContextualAction::DropOff,
            Self::Transport => ContextualAction::Transport,
        }
    }
}

/// Mouse button of a click on the world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Click {
    /// Primary button.
    Left,
    /// Secondary button.
    Right,
}

/// Action a right click on `hovered` would issue to the selection.
///
/// Decided by the first selected entity alone. Always
/// [`ContextualAction::None`] while an order is armed.
pub fn contextual_action<W: HarvestWorld + ?Sized>(
    system: &HarvestSystem,
    world: &W,
    selection: &[EntityId],
    hovered: Option<EntityId>,
    mode: TargetMode,
) -> ContextualAction {
    if mode.is_targeting() {
        return ContextualAction::None;
    }
    let (Some(hovered), Some(&first)) = (hovered, selection.first()) else {
        return ContextualAction::None;
    };
    let Some(flags) = world.flags(hovered) else {
        return ContextualAction::None;
    };
    if !world
        .flags(first)
        .is_some_and(|f| f.contains(EntityFlags::HARVESTER))
    {
        return ContextualAction::None;
    }
    let table = system.table();

    if flags.contains(EntityFlags::RESOURCE) {
        let speed = world
            .resource_type(hovered)
            .and_then(|kind| table.gather_speed(first, kind).ok())
            .unwrap_or(0);
        if speed > 0 {
            return ContextualAction::Gather;
        }
    }

    if flags.contains(EntityFlags::STORAGE_SITE) {
        if table.total_carry(first).unwrap_or(0) > 0 {
            return ContextualAction::DropOff;
        }
        return ContextualAction::Transport;
    }

    ContextualAction::None
}

/// Resolve a click into the order it issues, if any.
///
/// With an order armed only a left click fires it; otherwise only a right
/// click fires the contextual action.
pub fn click_action<W: HarvestWorld + ?Sized>(
    system: &HarvestSystem,
    world: &W,
    selection: &[EntityId],
    hovered: Option<EntityId>,
    click: Click,
    mode: TargetMode,
) -> ContextualAction {
    match (click, mode.is_targeting()) {
        (Click::Left, true) => mode.action(),
        (Click::Right, false) => contextual_action(system, world, selection, hovered, mode),
        _ => ContextualAction::None,
    }
}

/// Apply a click to the selection. Returns how many harvesters took the
/// order.
pub fn issue_click<W, B>(
    system: &mut HarvestSystem,
    world: &mut W,
    bus: &mut B,
    selection: &[EntityId],
    hovered: Option<EntityId>,
    click: Click,
    mode: TargetMode,
) -> usize
where
    W: HarvestWorld + MovementOrders + ?Sized,
    B: EventBus + ?Sized,
{
    let Some(target) = hovered else {
        return 0;
    };
    match click_action(system, world, selection, hovered, click, mode) {
        ContextualAction::None => 0,
        ContextualAction::Gather => order_gather(system, world, bus, selection, target),
        ContextualAction::DropOff => order_drop_off(system, world, bus, selection, target),
        ContextualAction::Transport => order_transport(system, world, bus, selection, target),
    }
}

fn harvesters<'a, W: HarvestWorld + ?Sized>(
    system: &'a HarvestSystem,
    world: &'a W,
    selection: &'a [EntityId],
) -> impl Iterator<Item = EntityId> + 'a {
    selection.iter().copied().filter(move |&uid| {
        system.table().contains(uid)
            && world
                .flags(uid)
                .is_some_and(|f| f.contains(EntityFlags::HARVESTER))
    })
}

/// Send every capable harvester in the selection to gather `resource`.
///
/// Harvesters without gather speed or carry capacity for the node's type
/// are skipped.
pub fn order_gather<W, B>(
    system: &mut HarvestSystem,
    world: &mut W,
    bus: &mut B,
    selection: &[EntityId],
    resource: EntityId,
) -> usize
where
    W: HarvestWorld + MovementOrders + ?Sized,
    B: EventBus + ?Sized,
{
    if !world
        .flags(resource)
        .is_some_and(|f| f.contains(EntityFlags::RESOURCE))
    {
        return 0;
    }
    let Some(kind) = world.resource_type(resource) else {
        return 0;
    };

    let capable: Vec<EntityId> = harvesters(system, world, selection)
        .filter(|&uid| {
            let table = system.table();
            table.max_carry(uid, kind).unwrap_or(0) > 0
                && table.gather_speed(uid, kind).unwrap_or(0) > 0
        })
        .collect();

    let issued = capable
        .into_iter()
        .filter(|&uid| system.gather(uid, resource, world, bus).is_ok())
        .count();
    debug!(resource, issued, "Gather order issued");
    issued
}

/// Send every loaded harvester in the selection to drop off at `storage`.
pub fn order_drop_off<W, B>(
    system: &mut HarvestSystem,
    world: &mut W,
    bus: &mut B,
    selection: &[EntityId],
    storage: EntityId,
) -> usize
where
    W: HarvestWorld + MovementOrders + ?Sized,
    B: EventBus + ?Sized,
{
    let loaded: Vec<EntityId> = harvesters(system, world, selection)
        .filter(|&uid| system.table().total_carry(uid).unwrap_or(0) > 0)
        .collect();

    let issued = loaded
        .into_iter()
        .filter(|&uid| system.drop_off(uid, storage, world, bus).is_ok())
        .count();
    debug!(storage, issued, "Drop-off order issued");
    issued
}

/// Put every harvester in the selection on transport duty for `storage`.
pub fn order_transport<W, B>(
    system: &mut HarvestSystem,
    world: &mut W,
    bus: &mut B,
    selection: &[EntityId],
    storage: EntityId,
) -> usize
where
    W: HarvestWorld + MovementOrders + ?Sized,
    B: EventBus + ?Sized,
{
    let all: Vec<EntityId> = harvesters(system, world, selection).collect();

    let issued = all
        .into_iter()
        .filter(|&uid| system.transport(uid, storage, world, bus).is_ok())
        .count();
    debug!(storage, issued, "Transport order issued");
    issued
}
