//! Scenario loading and configuration.
//!
//! Scenarios describe the initial sandbox: the harvest config, storage sites,
//! resource nodes, harvesters and the orders they start with.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use harvest_core::config::{HarvestConfig, HarvesterProfile};
use harvest_core::error::HarvestError;
use harvest_core::state::TransportStrategy;

/// Error type for scenario operations.
#[derive(Error, Debug)]
pub enum ScenarioError {
    /// File not found.
    #[error("Scenario file not found: {0}")]
    FileNotFound(String),
    /// Failed to read file.
    #[error("Failed to read scenario file: {0}")]
    ReadError(#[from] std::io::Error),
    /// Failed to parse RON.
    #[error("Failed to parse scenario: {0}")]
    ParseError(#[from] ron::error::SpannedError),
    /// The harvest config or a harvester setup was rejected.
    #[error("Invalid harvest setup: {0}")]
    Harvest(#[from] HarvestError),
    /// An order refers to an entity index that does not exist.
    #[error("Order {order} refers to missing {kind} #{index}")]
    BadIndex {
        /// Position of the order in the scenario.
        order: usize,
        /// "harvester", "node" or "site".
        kind: &'static str,
        /// The missing index.
        index: usize,
    },
}

/// Stock of one resource type at a storage site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockSetup {
    /// Resource type name.
    pub resource: String,
    /// Capacity.
    pub capacity: i32,
    /// Initial stock.
    #[serde(default)]
    pub current: i32,
    /// Stock the site wants to keep.
    #[serde(default)]
    pub desired: i32,
}

/// A storage site placement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteSetup {
    /// Position in world units.
    pub position: (i32, i32),
    /// Owning faction.
    #[serde(default)]
    pub faction: u8,
    /// Per-type stock.
    pub stock: Vec<StockSetup>,
}

/// A resource node placement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeSetup {
    /// Position in world units.
    pub position: (i32, i32),
    /// Resource type name.
    pub resource: String,
    /// Units in the node.
    pub amount: i32,
}

/// A harvester placement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HarvesterSetup {
    /// Position in world units.
    pub position: (i32, i32),
    /// Owning faction.
    #[serde(default)]
    pub faction: u8,
    /// Profile from the harvest config.
    #[serde(default)]
    pub profile: Option<String>,
}

/// An order issued before the first tick. Indices refer to the scenario's
/// lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderSetup {
    /// Gather from a node.
    Gather {
        /// Harvester index.
        harvester: usize,
        /// Node index.
        node: usize,
    },
    /// Drop off at a site.
    DropOff {
        /// Harvester index.
        harvester: usize,
        /// Site index.
        site: usize,
    },
    /// Keep a site supplied.
    Transport {
        /// Harvester index.
        harvester: usize,
        /// Site index.
        site: usize,
    },
}

/// A complete scenario configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scenario {
    /// Scenario name.
    pub name: String,
    /// Human-readable description.
    #[serde(default)]
    pub description: String,
    /// Harvest configuration.
    pub config: HarvestConfig,
    /// Storage sites.
    #[serde(default)]
    pub sites: Vec<SiteSetup>,
    /// Resource nodes.
    #[serde(default)]
    pub nodes: Vec<NodeSetup>,
    /// Harvesters.
    #[serde(default)]
    pub harvesters: Vec<HarvesterSetup>,
    /// Initial orders.
    #[serde(default)]
    pub orders: Vec<OrderSetup>,
    /// Tick limit.
    #[serde(default = "default_max_ticks")]
    pub max_ticks: u64,
    /// World units moved per tick, per axis.
    #[serde(default = "default_move_speed")]
    pub move_speed: i32,
    /// Ticks per harvest animation cycle.
    #[serde(default = "default_anim_cycle_ticks")]
    pub anim_cycle_ticks: u32,
}

const fn default_max_ticks() -> u64 {
    3600
}

const fn default_move_speed() -> i32 {
    2
}

const fn default_anim_cycle_ticks() -> u32 {
    10
}

impl Scenario {
    /// Load a scenario from a RON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ScenarioError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ScenarioError::FileNotFound(path.display().to_string()));
        }
        let contents = std::fs::read_to_string(path)?;
        Self::from_ron_str(&contents)
    }

    /// Load from a RON string (useful for embedded scenarios).
    pub fn from_ron_str(ron: &str) -> Result<Self, ScenarioError> {
        let scenario: Scenario = ron::from_str(ron)?;
        scenario.validate()?;
        Ok(scenario)
    }

    /// Check the config and every order index.
    pub fn validate(&self) -> Result<(), ScenarioError> {
        self.config.validate()?;

        let registry = self.config.registry();
        for stock in self.sites.iter().flat_map(|s| &s.stock) {
            registry.require(&stock.resource)?;
        }
        for node in &self.nodes {
            registry.require(&node.resource)?;
        }

        for (order, setup) in self.orders.iter().enumerate() {
            let (harvester, target, kind, len) = match *setup {
                OrderSetup::Gather { harvester, node } => {
                    (harvester, node, "node", self.nodes.len())
                }
                OrderSetup::DropOff { harvester, site } | OrderSetup::Transport { harvester, site } => {
                    (harvester, site, "site", self.sites.len())
                }
            };
            if harvester >= self.harvesters.len() {
                return Err(ScenarioError::BadIndex {
                    order,
                    kind: "harvester",
                    index: harvester,
                });
            }
            if target >= len {
                return Err(ScenarioError::BadIndex {
                    order,
                    kind,
                    index: target,
                });
            }
        }
        Ok(())
    }

    /// Built-in demo: a worker gathering wood next to a depot, and a hauler
    /// moving stone from the depot to an outpost.
    #[must_use]
    pub fn demo() -> Self {
        let mut config = HarvestConfig::with_resource_types(["stone", "wood"]);
        config.profiles.insert(
            "worker".to_string(),
            HarvesterProfile {
                gather_speed: [("wood".to_string(), 3), ("stone".to_string(), 2)]
                    .into_iter()
                    .collect(),
                max_carry: [("wood".to_string(), 10), ("stone".to_string(), 10)]
                    .into_iter()
                    .collect(),
                strategy: TransportStrategy::Nearest,
            },
        );
        config.profiles.insert(
            "hauler".to_string(),
            HarvesterProfile {
                gather_speed: Default::default(),
                max_carry: [("stone".to_string(), 15)].into_iter().collect(),
                strategy: TransportStrategy::Excess,
            },
        );

        let stock = |resource: &str, capacity, current, desired| StockSetup {
            resource: resource.to_string(),
            capacity,
            current,
            desired,
        };

        Self {
            name: "Demo".to_string(),
            description: "One worker on wood, one hauler supplying an outpost".to_string(),
            config,
            sites: vec![
                SiteSetup {
                    position: (0, 0),
                    faction: 0,
                    stock: vec![stock("wood", 500, 0, 0), stock("stone", 500, 120, 40)],
                },
                SiteSetup {
                    position: (60, 20),
                    faction: 0,
                    stock: vec![stock("stone", 100, 0, 45)],
                },
            ],
            nodes: vec![
                NodeSetup {
                    position: (20, -10),
                    resource: "wood".to_string(),
                    amount: 25,
                },
                NodeSetup {
                    position: (26, -14),
                    resource: "wood".to_string(),
                    amount: 40,
                },
            ],
            harvesters: vec![
                HarvesterSetup {
                    position: (4, 0),
                    faction: 0,
                    profile: Some("worker".to_string()),
                },
                HarvesterSetup {
                    position: (4, 4),
                    faction: 0,
                    profile: Some("hauler".to_string()),
                },
            ],
            orders: vec![
                OrderSetup::Gather {
                    harvester: 0,
                    node: 0,
                },
                OrderSetup::Transport {
                    harvester: 1,
                    site: 1,
                },
            ],
            max_ticks: default_max_ticks(),
            move_speed: default_move_speed(),
            anim_cycle_ticks: default_anim_cycle_ticks(),
        }
    }
}
