//! Test fixtures and helpers.
//!
//! Pre-built configurations and positions for consistent testing.

use fixed::types::I32F32;
use harvest_core::components::FactionId;
use harvest_core::config::{HarvestConfig, HarvesterProfile};
use harvest_core::math::Vec2Fixed;
use harvest_core::resources::ResourceTypeId;
use harvest_core::state::TransportStrategy;

/// "stone" in [`standard_config`].
pub const STONE: ResourceTypeId = ResourceTypeId(0);

/// "wood" in [`standard_config`].
pub const WOOD: ResourceTypeId = ResourceTypeId(1);

/// The player's faction.
pub const PLAYER: FactionId = FactionId(0);

/// Another faction.
pub const RIVAL: FactionId = FactionId(1);

/// Create a fixed-point number from an integer.
#[must_use]
pub fn fixed(n: i32) -> I32F32 {
    I32F32::from_num(n)
}

/// Create a position from integer coordinates.
#[must_use]
pub fn at(x: i32, y: i32) -> Vec2Fixed {
    Vec2Fixed::from_ints(x, y)
}

/// Two resource types and two profiles.
///
/// - `worker`: gathers wood at 3 and stone at 2 per cycle, carries 10 of each.
/// - `hauler`: carries 10 stone and 10 wood, cannot gather.
#[must_use]
pub fn standard_config() -> HarvestConfig {
    let mut config = HarvestConfig::with_resource_types(["wood", "stone"]);
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
            max_carry: [("stone".to_string(), 10), ("wood".to_string(), 10)]
                .into_iter()
                .collect(),
            strategy: TransportStrategy::Nearest,
        },
    );
    config
}
