//! Headless scenario runner.
//!
//! Builds a [`SandboxWorld`] from a [`Scenario`], registers its harvesters,
//! issues the starting orders and then ticks until everyone is idle or the
//! tick limit is hit. Published notifications are folded into a
//! [`RunSummary`].

use std::collections::{BTreeMap, BTreeSet};
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use harvest_core::components::{EntityId, FactionId};
use harvest_core::events::{Continuation, EventKind, HarvestEvent};
use harvest_core::math::Vec2Fixed;
use harvest_core::resources::{ResourceRegistry, ResourceTypeId};
use harvest_core::state::HarvestState;
use harvest_core::system::HarvestSystem;
use harvest_core::world::EventBus;

use crate::sandbox::SandboxWorld;
use crate::scenario::{OrderSetup, Scenario, ScenarioError};

/// Bus that tracks registrations and buffers notifications.
#[derive(Debug, Clone, Default)]
pub struct SandboxBus {
    subscriptions: BTreeSet<(EntityId, Continuation)>,
    published: Vec<HarvestEvent>,
}

impl SandboxBus {
    /// Check whether anything of `entity` listens for `kind`.
    #[must_use]
    pub fn is_listening(&self, entity: EntityId, kind: EventKind) -> bool {
        self.subscriptions
            .iter()
            .any(|&(e, c)| e == entity && c.trigger() == kind)
    }

    /// Take the notifications published since the last call.
    pub fn drain(&mut self) -> Vec<HarvestEvent> {
        std::mem::take(&mut self.published)
    }
}

impl EventBus for SandboxBus {
    fn subscribe(&mut self, entity: EntityId, continuation: Continuation) {
        self.subscriptions.insert((entity, continuation));
    }

    fn unsubscribe(&mut self, entity: EntityId, continuation: Continuation) {
        self.subscriptions.remove(&(entity, continuation));
    }

    fn publish(&mut self, event: HarvestEvent) {
        self.published.push(event);
    }
}

/// Final state of one harvester.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HarvesterSummary {
    /// Entity id.
    pub id: EntityId,
    /// State at the end of the run.
    pub state: String,
    /// Load still carried, by type name.
    pub carry: BTreeMap<String, i32>,
}

/// Outcome of a headless run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Scenario name.
    pub scenario: String,
    /// Ticks simulated.
    pub ticks: u64,
    /// Whether every harvester went idle before the tick limit.
    pub settled: bool,
    /// Units gathered from nodes, by type name.
    pub gathered: BTreeMap<String, i64>,
    /// Units delivered to storage sites, by type name.
    pub delivered: BTreeMap<String, i64>,
    /// Units picked up from transport sources, by type name.
    pub picked_up: BTreeMap<String, i64>,
    /// Nodes that ran out.
    pub exhausted_nodes: usize,
    /// Starting orders that were rejected.
    pub rejected_orders: usize,
    /// Final per-harvester state.
    pub harvesters: Vec<HarvesterSummary>,
    /// Hash of the final harvester table.
    pub state_hash: u64,
}

impl RunSummary {
    /// Serialize as pretty JSON.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

impl std::fmt::Display for RunSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Scenario: {}", self.scenario)?;
        writeln!(
            f,
            "Ticks: {}{}",
            self.ticks,
            if self.settled { " (settled)" } else { "" }
        )?;
        for (name, amount) in &self.delivered {
            writeln!(f, "  delivered {name}: {amount}")?;
        }
        for (name, amount) in &self.picked_up {
            writeln!(f, "  picked up {name}: {amount}")?;
        }
        writeln!(f, "Exhausted nodes: {}", self.exhausted_nodes)?;
        for h in &self.harvesters {
            writeln!(f, "  harvester {}: {} carrying {:?}", h.id, h.state, h.carry)?;
        }
        Ok(())
    }
}

fn position((x, y): (i32, i32)) -> Vec2Fixed {
    Vec2Fixed::from_ints(x, y)
}

/// Ticks a scenario to completion.
#[derive(Debug)]
pub struct HeadlessRunner {
    name: String,
    max_ticks: u64,
    system: HarvestSystem,
    world: SandboxWorld,
    bus: SandboxBus,
    registry: ResourceRegistry,
    harvesters: Vec<EntityId>,
    /// Type and starting amount of every node.
    nodes: BTreeMap<EntityId, (ResourceTypeId, i32)>,
    tick: u64,
    summary: RunSummary,
}

impl HeadlessRunner {
    /// Build the sandbox and issue the starting orders.
    ///
    /// Rejected orders are logged and counted, not fatal.
    pub fn from_scenario(scenario: &Scenario) -> Result<Self, ScenarioError> {
        scenario.validate()?;
        let registry = scenario.config.registry();
        let mut world = SandboxWorld::new(scenario.move_speed, scenario.anim_cycle_ticks);
        let mut system = HarvestSystem::new(scenario.config.clone());
        let mut bus = SandboxBus::default();

        let mut sites = Vec::with_capacity(scenario.sites.len());
        for setup in &scenario.sites {
            let id = world.spawn_storage(position(setup.position), FactionId::new(setup.faction));
            for stock in &setup.stock {
                let kind = registry.require(&stock.resource)?;
                world.set_stock(id, kind, stock.capacity, stock.current, stock.desired);
            }
            sites.push(id);
        }

        let mut node_ids = Vec::with_capacity(scenario.nodes.len());
        let mut nodes = BTreeMap::new();
        for setup in &scenario.nodes {
            let kind = registry.require(&setup.resource)?;
            let id = world.spawn_resource(position(setup.position), kind, setup.amount);
            node_ids.push(id);
            nodes.insert(id, (kind, setup.amount));
        }

        let mut harvesters = Vec::with_capacity(scenario.harvesters.len());
        for setup in &scenario.harvesters {
            let id =
                world.spawn_harvester(position(setup.position), FactionId::new(setup.faction));
            system.add_entity(id, &world)?;
            if let Some(profile) = &setup.profile {
                system.table_mut().apply_profile(id, profile)?;
            }
            harvesters.push(id);
        }

        let mut rejected_orders = 0;
        for order in &scenario.orders {
            let result = match *order {
                OrderSetup::Gather { harvester, node } => {
                    system.gather(harvesters[harvester], node_ids[node], &mut world, &mut bus)
                }
                OrderSetup::DropOff { harvester, site } => {
                    system.drop_off(harvesters[harvester], sites[site], &mut world, &mut bus)
                }
                OrderSetup::Transport { harvester, site } => {
                    system.transport(harvesters[harvester], sites[site], &mut world, &mut bus)
                }
            };
            if let Err(e) = result {
                warn!(?order, error = %e, "Starting order rejected");
                rejected_orders += 1;
            }
        }

        info!(
            scenario = %scenario.name,
            harvesters = harvesters.len(),
            nodes = nodes.len(),
            sites = sites.len(),
            "Scenario loaded"
        );

        let mut runner = Self {
            name: scenario.name.clone(),
            max_ticks: scenario.max_ticks,
            system,
            world,
            bus,
            registry,
            harvesters,
            nodes,
            tick: 0,
            summary: RunSummary {
                scenario: scenario.name.clone(),
                rejected_orders,
                ..RunSummary::default()
            },
        };
        runner.collect();
        Ok(runner)
    }

    /// Current tick.
    #[must_use]
    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// The harvest system.
    #[must_use]
    pub fn system(&self) -> &HarvestSystem {
        &self.system
    }

    /// The sandbox world.
    #[must_use]
    pub fn world(&self) -> &SandboxWorld {
        &self.world
    }

    /// Check whether every harvester is idle and nothing moves.
    #[must_use]
    pub fn is_settled(&self) -> bool {
        !self.world.is_moving()
            && self.harvesters.iter().all(|&uid| {
                self.system
                    .table()
                    .state(uid)
                    .map_or(true, |hs| hs.is_idle())
            })
    }

    /// Advance one tick.
    pub fn step(&mut self) {
        self.tick += 1;
        let harvesting: Vec<EntityId> = self
            .harvesters
            .iter()
            .copied()
            .filter(|&uid| {
                self.system
                    .table()
                    .state(uid)
                    .is_ok_and(|hs| hs.state == HarvestState::Harvesting)
            })
            .collect();

        for (uid, kind) in self.world.tick(&harvesting) {
            if self.bus.is_listening(uid, kind) {
                self.system
                    .handle_event(uid, kind, &mut self.world, &mut self.bus);
            }
        }

        for reaped in self.world.reap_zombies() {
            debug!(tick = self.tick, node = reaped, "Node removed");
        }
        self.collect();
    }

    /// Tick until settled or `max_ticks` (the scenario limit if `None`).
    pub fn run(&mut self, max_ticks: Option<u64>) -> RunSummary {
        let limit = max_ticks.unwrap_or(self.max_ticks);
        while self.tick < limit && !self.is_settled() {
            self.step();
        }
        info!(scenario = %self.name, ticks = self.tick, "Run finished");
        self.summary()
    }

    /// Summary of everything so far.
    #[must_use]
    pub fn summary(&self) -> RunSummary {
        let table = self.system.table();
        let harvesters = self
            .harvesters
            .iter()
            .filter_map(|&uid| table.state(uid).ok().map(|hs| (uid, hs)))
            .map(|(uid, hs)| HarvesterSummary {
                id: uid,
                state: format!("{:?}", hs.state),
                carry: hs
                    .ledger
                    .slots()
                    .iter()
                    .filter(|s| s.current_carry > 0)
                    .map(|s| (self.registry.display(s.resource), s.current_carry))
                    .collect(),
            })
            .collect();

        let mut gathered = BTreeMap::new();
        for (&node, &(kind, initial)) in &self.nodes {
            let taken = initial - self.world.resource_amount(node);
            *gathered.entry(self.registry.display(kind)).or_default() += i64::from(taken);
        }

        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        if let Ok(bytes) = table.serialize() {
            bytes.hash(&mut hasher);
        }

        RunSummary {
            ticks: self.tick,
            settled: self.is_settled(),
            gathered,
            harvesters,
            state_hash: hasher.finish(),
            ..self.summary.clone()
        }
    }

    fn collect(&mut self) {
        for event in self.bus.drain() {
            let summary = &mut self.summary;
            match event {
                HarvestEvent::ResourceDroppedOff {
                    resource, amount, ..
                } => {
                    *summary
                        .delivered
                        .entry(self.registry.display(resource))
                        .or_default() += i64::from(amount);
                }
                HarvestEvent::ResourcePickedUp {
                    resource, amount, ..
                } => {
                    *summary
                        .picked_up
                        .entry(self.registry.display(resource))
                        .or_default() += i64::from(amount);
                }
                HarvestEvent::ResourceExhausted { resource } => {
                    summary.exhausted_nodes += 1;
                    debug!(tick = self.tick, node = resource, "Node exhausted");
                }
                _ => {}
            }
        }
    }
}
