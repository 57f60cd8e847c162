//! Proptest strategies for harvester tests.
//!
//! Random worlds and random event scripts. Every generated step is something
//! the real collaborators could deliver, so the state machine invariants must
//! hold after each one.

use proptest::prelude::*;

use harvest_core::components::EntityId;
use harvest_core::math::{Fixed, Vec2Fixed};
use harvest_core::resources::ResourceTypeId;

use crate::fixtures::{at, PLAYER, STONE, WOOD};
use crate::harness::Harness;

/// Generate a fixed-point coordinate within a small map.
pub fn arb_coordinate() -> impl Strategy<Value = Fixed> {
    (-60i32..60i32).prop_map(Fixed::from_num)
}

/// Generate a position within a small map.
pub fn arb_position() -> impl Strategy<Value = Vec2Fixed> {
    (arb_coordinate(), arb_coordinate()).prop_map(|(x, y)| Vec2Fixed::new(x, y))
}

/// Generate one of the two standard resource types.
pub fn arb_resource_type() -> impl Strategy<Value = ResourceTypeId> {
    prop_oneof![Just(STONE), Just(WOOD)]
}

/// A resource node to spawn.
#[derive(Debug, Clone)]
pub struct NodeParams {
    /// Position.
    pub position: Vec2Fixed,
    /// Type.
    pub kind: ResourceTypeId,
    /// Units in the node.
    pub amount: i32,
}

/// A storage site to spawn (stock per standard type).
#[derive(Debug, Clone)]
pub struct SiteParams {
    /// Position.
    pub position: Vec2Fixed,
    /// Capacity for both types.
    pub capacity: i32,
    /// `(current, desired)` of stone and wood.
    pub stock: [(i32, i32); 2],
}

/// A random world around one worker harvester at the origin.
#[derive(Debug, Clone)]
pub struct WorldParams {
    /// Resource nodes.
    pub nodes: Vec<NodeParams>,
    /// Storage sites.
    pub sites: Vec<SiteParams>,
}

/// Generate resource node parameters.
pub fn arb_node() -> impl Strategy<Value = NodeParams> {
    (arb_position(), arb_resource_type(), 1i32..30)
        .prop_map(|(position, kind, amount)| NodeParams {
            position,
            kind,
            amount,
        })
}

/// Generate storage site parameters.
pub fn arb_site() -> impl Strategy<Value = SiteParams> {
    (arb_position(), 0i32..40, 0i32..40, 0i32..40, 0i32..40, 0i32..40).prop_map(
        |(position, capacity, s_cur, s_want, w_cur, w_want)| SiteParams {
            position,
            capacity,
            stock: [(s_cur.min(capacity), s_want), (w_cur.min(capacity), w_want)],
        },
    )
}

/// Generate a world.
pub fn arb_world() -> impl Strategy<Value = WorldParams> {
    (
        proptest::collection::vec(arb_node(), 1..5),
        proptest::collection::vec(arb_site(), 1..4),
    )
        .prop_map(|(nodes, sites)| WorldParams { nodes, sites })
}

/// Something that can happen to the harvester.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Order a gather from the n-th node (modulo count).
    Gather(usize),
    /// Order a drop-off at the n-th site.
    DropOff(usize),
    /// Order a transport into the n-th site.
    Transport(usize),
    /// Order a stop.
    Stop,
    /// Finish the current move.
    Arrive,
    /// Complete a harvest animation cycle.
    AnimCycle,
    /// A move order from outside the module.
    ForeignMove,
    /// Remove zombie nodes.
    Reap,
    /// Destroy the n-th site.
    DestroySite(usize),
    /// Make the n-th node unreachable.
    BlockNode(usize),
}

/// Generate one action, weighted toward progress.
pub fn arb_action() -> impl Strategy<Value = Action> {
    prop_oneof![
        2 => (0usize..8).prop_map(Action::Gather),
        1 => (0usize..8).prop_map(Action::DropOff),
        1 => (0usize..8).prop_map(Action::Transport),
        1 => Just(Action::Stop),
        6 => Just(Action::Arrive),
        6 => Just(Action::AnimCycle),
        1 => Just(Action::ForeignMove),
        1 => Just(Action::Reap),
        1 => (0usize..8).prop_map(Action::DestroySite),
        1 => (0usize..8).prop_map(Action::BlockNode),
    ]
}

/// Generate an action script.
pub fn arb_script(max_len: usize) -> impl Strategy<Value = Vec<Action>> {
    proptest::collection::vec(arb_action(), 1..max_len)
}

/// A built random world.
#[derive(Debug)]
pub struct Playground {
    /// The harness.
    pub harness: Harness,
    /// The harvester.
    pub harvester: EntityId,
    /// Spawned nodes.
    pub nodes: Vec<EntityId>,
    /// Spawned sites.
    pub sites: Vec<EntityId>,
}

impl Playground {
    /// Spawn a world into a harness with one worker at the origin.
    #[must_use]
    pub fn build(mut harness: Harness, params: &WorldParams) -> Self {
        let harvester = harness.add_harvester(at(0, 0), PLAYER, Some("worker"));
        let nodes = params
            .nodes
            .iter()
            .map(|n| harness.world.spawn_resource(n.position, n.kind, n.amount))
            .collect();
        let sites = params
            .sites
            .iter()
            .map(|s| {
                let id = harness.world.spawn_storage(s.position, PLAYER);
                let [(s_cur, s_want), (w_cur, w_want)] = s.stock;
                harness.world.set_stock(id, STONE, s.capacity, s_cur, s_want);
                harness.world.set_stock(id, WOOD, s.capacity, w_cur, w_want);
                id
            })
            .collect();
        Self {
            harness,
            harvester,
            nodes,
            sites,
        }
    }

    fn pick(list: &[EntityId], n: usize) -> Option<EntityId> {
        if list.is_empty() {
            None
        } else {
            Some(list[n % list.len()])
        }
    }

    /// Apply one action. Rejected orders are ignored.
    pub fn apply(&mut self, action: Action) {
        let uid = self.harvester;
        let h = &mut self.harness;
        match action {
            Action::Gather(n) => {
                if let Some(node) = Self::pick(&self.nodes, n).filter(|&e| h.world.exists(e)) {
                    let _ = h.gather(uid, node);
                }
            }
            Action::DropOff(n) => {
                if let Some(site) = Self::pick(&self.sites, n).filter(|&e| h.world.exists(e)) {
                    let _ = h.drop_off(uid, site);
                }
            }
            Action::Transport(n) => {
                if let Some(site) = Self::pick(&self.sites, n).filter(|&e| h.world.exists(e)) {
                    let _ = h.transport(uid, site);
                }
            }
            Action::Stop => {
                let _ = h.stop(uid);
            }
            Action::Arrive => {
                if h.world.move_target(uid).is_some() {
                    h.arrive(uid);
                }
            }
            Action::AnimCycle => h.anim_cycle(uid),
            Action::ForeignMove => {
                h.foreign_move(uid);
                h.world.set_moving(uid, false);
            }
            Action::Reap => {
                h.world.reap_zombies();
            }
            Action::DestroySite(n) => {
                if let Some(site) = Self::pick(&self.sites, n) {
                    h.world.despawn(site);
                }
            }
            Action::BlockNode(n) => {
                if let Some(node) = Self::pick(&self.nodes, n) {
                    h.world.set_unreachable(node, true);
                }
            }
        }
    }
}
