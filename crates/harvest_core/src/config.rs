//! Data-driven harvester configuration.
//!
//! Pure data structures deserialized from RON. This module performs no IO;
//! reading files is left to the embedding application.
//!
//! # Example RON
//!
//! ```ron
//! HarvestConfig(
//!     resource_types: ["stone", "wood"],
//!     reacquire_radius: 50,
//!     profiles: {
//!         "worker": HarvesterProfile(
//!             gather_speed: { "wood": 3, "stone": 2 },
//!             max_carry: { "wood": 10, "stone": 10 },
//!         ),
//!     },
//! )
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{HarvestError, Result};
use crate::math::Fixed;
use crate::resources::ResourceRegistry;
use crate::state::TransportStrategy;

/// Default radius used to re-find a lost resource target.
pub const DEFAULT_REACQUIRE_RADIUS: i32 = 50;

/// Per-harvester-type gathering numbers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HarvesterProfile {
    /// Units gathered per harvest cycle, keyed by resource type name.
    #[serde(default)]
    pub gather_speed: BTreeMap<String, i32>,

    /// Carry capacity, keyed by resource type name.
    #[serde(default)]
    pub max_carry: BTreeMap<String, i32>,

    /// Transport source selection policy.
    #[serde(default)]
    pub strategy: TransportStrategy,
}

/// Top-level harvester configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HarvestConfig {
    /// Every resource type name known to the simulation.
    pub resource_types: Vec<String>,

    /// Search radius (world units) for re-finding a lost resource target.
    #[serde(default = "default_reacquire_radius")]
    pub reacquire_radius: i32,

    /// Gather speed reported for a type never configured on a harvester.
    #[serde(default)]
    pub default_gather_speed: i32,

    /// Max carry reported for a type never configured on a harvester.
    #[serde(default)]
    pub default_max_carry: i32,

    /// Named harvester profiles.
    #[serde(default)]
    pub profiles: BTreeMap<String, HarvesterProfile>,
}

const fn default_reacquire_radius() -> i32 {
    DEFAULT_REACQUIRE_RADIUS
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            resource_types: Vec::new(),
            reacquire_radius: DEFAULT_REACQUIRE_RADIUS,
            default_gather_speed: 0,
            default_max_carry: 0,
            profiles: BTreeMap::new(),
        }
    }
}

impl HarvestConfig {
    /// Create a config for the given resource types with default tuning.
    #[must_use]
    pub fn with_resource_types<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            resource_types: names.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Parse and validate a config from a RON string.
    pub fn from_ron_str(ron: &str) -> Result<Self> {
        let config: Self =
            ron::from_str(ron).map_err(|e| HarvestError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Build the resource registry for this config.
    #[must_use]
    pub fn registry(&self) -> ResourceRegistry {
        ResourceRegistry::new(self.resource_types.iter().cloned())
    }

    /// Reacquisition radius as a fixed-point distance.
    #[must_use]
    pub fn reacquire_radius_fixed(&self) -> Fixed {
        Fixed::from_num(self.reacquire_radius.max(0))
    }

    /// Look up a profile by name.
    #[must_use]
    pub fn profile(&self, name: &str) -> Option<&HarvesterProfile> {
        self.profiles.get(name)
    }

    /// Check that profiles only mention known types and non-negative amounts.
    pub fn validate(&self) -> Result<()> {
        if self.reacquire_radius < 0 {
            return Err(HarvestError::ConfigParse(format!(
                "reacquire_radius must be non-negative, got {}",
                self.reacquire_radius
            )));
        }

        let registry = self.registry();
        for profile in self.profiles.values() {
            for (name, &amount) in profile.gather_speed.iter().chain(&profile.max_carry) {
                registry.require(name)?;
                if amount < 0 {
                    return Err(HarvestError::NegativeAmount {
                        resource: name.clone(),
                        amount,
                    });
                }
            }
        }
        Ok(())
    }
}
