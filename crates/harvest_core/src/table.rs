//! Harvester state table.
//!
//! One [`HarvesterState`] per registered harvester, keyed by entity id in an
//! ordered map so iteration (and therefore the simulation) is deterministic.
//! Every accessor fails with [`HarvestError::NotFound`] for an entity that
//! was never registered.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::components::EntityId;
use crate::config::HarvestConfig;
use crate::error::{HarvestError, Result};
use crate::resources::{ResourceRegistry, ResourceTypeId};
use crate::state::{HarvesterState, TransportStrategy};

/// All harvester state records plus the tuning they fall back to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HarvesterTable {
    states: BTreeMap<EntityId, HarvesterState>,
    config: HarvestConfig,
    registry: ResourceRegistry,
}

impl HarvesterTable {
    /// Create an empty table for a configuration.
    #[must_use]
    pub fn new(config: HarvestConfig) -> Self {
        let registry = config.registry();
        Self {
            states: BTreeMap::new(),
            config,
            registry,
        }
    }

    /// Active configuration.
    #[must_use]
    pub fn config(&self) -> &HarvestConfig {
        &self.config
    }

    /// Resource type registry built from the configuration.
    #[must_use]
    pub fn registry(&self) -> &ResourceRegistry {
        &self.registry
    }

    /// Number of registered harvesters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.states.len()
    }

    /// Check if no harvester is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Check whether an entity has harvester state.
    #[must_use]
    pub fn contains(&self, uid: EntityId) -> bool {
        self.states.contains_key(&uid)
    }

    /// Iterate over registered harvesters in id order.
    pub fn iter(&self) -> impl Iterator<Item = (EntityId, &HarvesterState)> {
        self.states.iter().map(|(&uid, hs)| (uid, hs))
    }

    /// Create an idle state record for an entity.
    pub fn add_entity(&mut self, uid: EntityId) -> Result<()> {
        if self.states.contains_key(&uid) {
            warn!(harvester = uid, "Harvester registered twice");
            return Err(HarvestError::AlreadyRegistered(uid));
        }
        self.states.insert(uid, HarvesterState::new());
        debug!(harvester = uid, "Harvester registered");
        Ok(())
    }

    /// Drop an entity's state record, returning it.
    ///
    /// Bus registrations are not touched; use
    /// [`crate::system::HarvestSystem::remove_entity`] to cancel them first.
    pub fn remove_entity(&mut self, uid: EntityId) -> Result<HarvesterState> {
        self.states.remove(&uid).ok_or(HarvestError::NotFound(uid))
    }

    /// State record of a harvester.
    pub fn state(&self, uid: EntityId) -> Result<&HarvesterState> {
        self.states.get(&uid).ok_or(HarvestError::NotFound(uid))
    }

    fn state_mut(&mut self, uid: EntityId) -> Result<&mut HarvesterState> {
        self.states.get_mut(&uid).ok_or(HarvestError::NotFound(uid))
    }

    /// Mutable state record together with the configuration, for running a
    /// transition.
    pub(crate) fn entry_mut(
        &mut self,
        uid: EntityId,
    ) -> Result<(&mut HarvesterState, &HarvestConfig)> {
        let hs = self.states.get_mut(&uid).ok_or(HarvestError::NotFound(uid))?;
        Ok((hs, &self.config))
    }

    fn check_amount(&self, resource: ResourceTypeId, amount: i32) -> Result<()> {
        if amount < 0 {
            warn!(%resource, amount, "Rejected negative amount");
            return Err(HarvestError::NegativeAmount {
                resource: self.registry.display(resource),
                amount,
            });
        }
        Ok(())
    }

    /// Units gathered per cycle.
    pub fn gather_speed(&self, uid: EntityId, resource: ResourceTypeId) -> Result<i32> {
        Ok(self
            .state(uid)?
            .ledger
            .gather_speed(resource)
            .unwrap_or(self.config.default_gather_speed))
    }

    /// Set the units gathered per cycle.
    pub fn set_gather_speed(
        &mut self,
        uid: EntityId,
        resource: ResourceTypeId,
        speed: i32,
    ) -> Result<()> {
        self.check_amount(resource, speed)?;
        self.state_mut(uid)?.ledger.set_gather_speed(resource, speed);
        Ok(())
    }

    /// Carry capacity.
    pub fn max_carry(&self, uid: EntityId, resource: ResourceTypeId) -> Result<i32> {
        Ok(self
            .state(uid)?
            .ledger
            .max_carry(resource)
            .unwrap_or(self.config.default_max_carry))
    }

    /// Set the carry capacity. Zero removes the type from the transport
    /// priority; a positive value adds it in name order if absent.
    pub fn set_max_carry(&mut self, uid: EntityId, resource: ResourceTypeId, max: i32) -> Result<()> {
        self.check_amount(resource, max)?;
        self.state_mut(uid)?.ledger.set_max_carry(resource, max);
        Ok(())
    }

    /// Amount currently carried.
    pub fn current_carry(&self, uid: EntityId, resource: ResourceTypeId) -> Result<i32> {
        Ok(self.state(uid)?.ledger.current_carry(resource))
    }

    /// Overwrite the amount carried.
    pub fn set_current_carry(
        &mut self,
        uid: EntityId,
        resource: ResourceTypeId,
        amount: i32,
    ) -> Result<()> {
        self.check_amount(resource, amount)?;
        self.state_mut(uid)?
            .ledger
            .set_current_carry(resource, amount);
        Ok(())
    }

    /// Transport source selection policy.
    pub fn strategy(&self, uid: EntityId) -> Result<TransportStrategy> {
        Ok(self.state(uid)?.strategy)
    }

    /// Change the transport source selection policy.
    pub fn set_strategy(&mut self, uid: EntityId, strategy: TransportStrategy) -> Result<()> {
        self.state_mut(uid)?.strategy = strategy;
        Ok(())
    }

    /// Move a type one step up the transport priority.
    ///
    /// Returns `Ok(false)` if it is already first or not prioritized.
    pub fn increase_priority(&mut self, uid: EntityId, resource: ResourceTypeId) -> Result<bool> {
        Ok(self.state_mut(uid)?.ledger.increase_priority(resource))
    }

    /// Move a type one step down the transport priority.
    ///
    /// Returns `Ok(false)` if it is already last or not prioritized.
    pub fn decrease_priority(&mut self, uid: EntityId, resource: ResourceTypeId) -> Result<bool> {
        Ok(self.state_mut(uid)?.ledger.decrease_priority(resource))
    }

    /// Copy of the first `max_n` entries of the transport priority.
    pub fn priority_list(&self, uid: EntityId, max_n: usize) -> Result<Vec<ResourceTypeId>> {
        Ok(self.state(uid)?.ledger.priority().take(max_n).collect())
    }

    /// Sum of carried amounts over every resource type.
    pub fn total_carry(&self, uid: EntityId) -> Result<i32> {
        Ok(self.state(uid)?.ledger.total_carry())
    }

    /// Apply a configured profile's speeds, capacities and strategy.
    ///
    /// Nothing is changed if the profile names an unknown resource type.
    pub fn apply_profile(&mut self, uid: EntityId, profile: &str) -> Result<()> {
        let profile = self
            .config
            .profile(profile)
            .ok_or_else(|| HarvestError::UnknownProfile(profile.to_string()))?;

        let speeds = profile
            .gather_speed
            .iter()
            .map(|(name, &v)| Ok((self.registry.require(name)?, v)))
            .collect::<Result<Vec<_>>>()?;
        let capacities = profile
            .max_carry
            .iter()
            .map(|(name, &v)| Ok((self.registry.require(name)?, v)))
            .collect::<Result<Vec<_>>>()?;
        for &(resource, amount) in speeds.iter().chain(&capacities) {
            self.check_amount(resource, amount)?;
        }
        let strategy = profile.strategy;

        let hs = self.state_mut(uid)?;
        for (resource, speed) in speeds {
            hs.ledger.set_gather_speed(resource, speed);
        }
        for (resource, max) in capacities {
            hs.ledger.set_max_carry(resource, max);
        }
        hs.strategy = strategy;
        Ok(())
    }

    /// Serialize the table for save games.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn serialize(&self) -> Result<Vec<u8>> {
        bincode::serialize(self).map_err(|e| {
            HarvestError::Serialization(format!("Failed to serialize harvester table: {e}"))
        })
    }

    /// Deserialize a table from bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if deserialization fails.
    pub fn deserialize(data: &[u8]) -> Result<Self> {
        bincode::deserialize(data).map_err(|e| {
            HarvestError::Serialization(format!("Failed to deserialize harvester table: {e}"))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HarvesterProfile;
    use crate::events::Continuation;

    fn table() -> (HarvesterTable, ResourceTypeId, ResourceTypeId) {
        let mut config = HarvestConfig::with_resource_types(["wood", "stone"]);
        config.profiles.insert(
            "worker".to_string(),
            HarvesterProfile {
                gather_speed: [("wood".to_string(), 3)].into_iter().collect(),
                max_carry: [("wood".to_string(), 10), ("stone".to_string(), 6)]
                    .into_iter()
                    .collect(),
                strategy: TransportStrategy::Excess,
            },
        );
        let table = HarvesterTable::new(config);
        let stone = table.registry().require("stone").unwrap();
        let wood = table.registry().require("wood").unwrap();
        (table, stone, wood)
    }

    #[test]
    fn test_add_and_remove() {
        let (mut table, _, _) = table();
        table.add_entity(1).unwrap();
        assert!(table.contains(1));
        assert!(matches!(
            table.add_entity(1),
            Err(HarvestError::AlreadyRegistered(1))
        ));

        let state = table.remove_entity(1).unwrap();
        assert!(state.is_idle());
        assert!(table.is_empty());
        assert!(matches!(table.remove_entity(1), Err(HarvestError::NotFound(1))));
    }

    #[test]
    fn test_unregistered_entity_is_not_found() {
        let (mut table, stone, _) = table();
        assert!(matches!(table.gather_speed(9, stone), Err(HarvestError::NotFound(9))));
        assert!(matches!(
            table.set_max_carry(9, stone, 3),
            Err(HarvestError::NotFound(9))
        ));
        assert!(matches!(table.total_carry(9), Err(HarvestError::NotFound(9))));
        assert!(matches!(table.strategy(9), Err(HarvestError::NotFound(9))));
    }

    #[test]
    fn test_defaults_for_unconfigured_types() {
        let (mut table, stone, _) = table();
        table.add_entity(1).unwrap();
        assert_eq!(table.gather_speed(1, stone).unwrap(), 0);
        assert_eq!(table.max_carry(1, stone).unwrap(), 0);
        assert_eq!(table.current_carry(1, stone).unwrap(), 0);
    }

    #[test]
    fn test_negative_amounts_rejected() {
        let (mut table, _, wood) = table();
        table.add_entity(1).unwrap();
        let err = table.set_current_carry(1, wood, -2).unwrap_err();
        assert!(
            matches!(err, HarvestError::NegativeAmount { ref resource, amount: -2 } if resource == "wood")
        );
        assert_eq!(table.current_carry(1, wood).unwrap(), 0);
    }

    #[test]
    fn test_priority_list_and_swaps() {
        let (mut table, stone, wood) = table();
        table.add_entity(1).unwrap();
        table.set_max_carry(1, wood, 10).unwrap();
        table.set_max_carry(1, stone, 10).unwrap();

        assert_eq!(table.priority_list(1, 8).unwrap(), vec![stone, wood]);
        assert_eq!(table.priority_list(1, 1).unwrap(), vec![stone]);

        assert!(table.increase_priority(1, wood).unwrap());
        assert!(!table.increase_priority(1, wood).unwrap());
        assert_eq!(table.priority_list(1, 8).unwrap(), vec![wood, stone]);

        table.set_max_carry(1, wood, 0).unwrap();
        assert_eq!(table.priority_list(1, 8).unwrap(), vec![stone]);
        assert!(!table.decrease_priority(1, wood).unwrap());
    }

    #[test]
    fn test_apply_profile() {
        let (mut table, stone, wood) = table();
        table.add_entity(1).unwrap();
        table.apply_profile(1, "worker").unwrap();

        assert_eq!(table.gather_speed(1, wood).unwrap(), 3);
        assert_eq!(table.max_carry(1, stone).unwrap(), 6);
        assert_eq!(table.strategy(1).unwrap(), TransportStrategy::Excess);
        assert_eq!(table.priority_list(1, 8).unwrap(), vec![stone, wood]);

        assert!(matches!(
            table.apply_profile(1, "ghost"),
            Err(HarvestError::UnknownProfile(name)) if name == "ghost"
        ));
    }

    #[test]
    fn test_serialization_round_trip() {
        let (mut table, _, wood) = table();
        table.add_entity(4).unwrap();
        table.apply_profile(4, "worker").unwrap();
        table.set_current_carry(4, wood, 7).unwrap();
        {
            let (hs, _) = table.entry_mut(4).unwrap();
            hs.pending.insert(Continuation::ArriveAtStorage);
        }

        let bytes = table.serialize().unwrap();
        let restored = HarvesterTable::deserialize(&bytes).unwrap();

        assert_eq!(restored, table);
        assert_eq!(restored.total_carry(4).unwrap(), 7);
        assert!(restored
            .state(4)
            .unwrap()
            .is_pending(Continuation::ArriveAtStorage));
    }

    #[test]
    fn test_deserialize_garbage_fails() {
        let err = HarvesterTable::deserialize(&[0xff, 0x01]).unwrap_err();
        assert!(matches!(err, HarvestError::Serialization(_)));
    }
}
