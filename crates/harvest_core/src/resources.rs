//! Resource types and per-harvester carry bookkeeping.
//!
//! Resource types are named in configuration ("wood", "stone", ...) but the
//! simulation only ever handles [`ResourceTypeId`]s. The registry hands out
//! identifiers in lexicographic order of the names, so `Ord` on the id is the
//! same as comparing names.

use serde::{Deserialize, Serialize};

use crate::error::{HarvestError, Result};

/// Identifier of a resource type, assigned at configuration-load time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResourceTypeId(pub u32);

impl ResourceTypeId {
    /// Create a new resource type ID.
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for ResourceTypeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "resource#{}", self.0)
    }
}

/// Maps resource type names to identifiers and back.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceRegistry {
    /// Sorted, deduplicated names; the index is the id.
    names: Vec<String>,
}

impl ResourceRegistry {
    /// Build a registry from a list of names (order and duplicates ignored).
    #[must_use]
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut names: Vec<String> = names.into_iter().map(Into::into).collect();
        names.sort_unstable();
        names.dedup();
        Self { names }
    }

    /// Look up the id of a resource type name.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn id(&self, name: &str) -> Option<ResourceTypeId> {
        self.names
            .binary_search_by(|n| n.as_str().cmp(name))
            .ok()
            .map(|idx| ResourceTypeId(idx as u32))
    }

    /// Look up the id of a name, failing for unknown types.
    pub fn require(&self, name: &str) -> Result<ResourceTypeId> {
        self.id(name)
            .ok_or_else(|| HarvestError::UnknownResourceType(name.to_string()))
    }

    /// Name of a resource type.
    #[must_use]
    pub fn name(&self, id: ResourceTypeId) -> Option<&str> {
        self.names.get(id.0 as usize).map(String::as_str)
    }

    /// Name of a resource type, or its numeric form when unknown.
    #[must_use]
    pub fn display(&self, id: ResourceTypeId) -> String {
        self.name(id).map_or_else(|| id.to_string(), str::to_string)
    }

    /// Number of registered types.
    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Check if no types are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Iterate over `(id, name)` pairs in id order.
    #[allow(clippy::cast_possible_truncation)]
    pub fn iter(&self) -> impl Iterator<Item = (ResourceTypeId, &str)> {
        self.names
            .iter()
            .enumerate()
            .map(|(idx, name)| (ResourceTypeId(idx as u32), name.as_str()))
    }
}

/// Per-resource-type numbers for one harvester.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CarrySlot {
    /// Resource type this slot describes.
    pub resource: ResourceTypeId,
    /// Amount gathered per harvest cycle, if configured.
    pub gather_speed: Option<i32>,
    /// Carry capacity, if configured.
    pub max_carry: Option<i32>,
    /// Amount currently carried.
    pub current_carry: i32,
}

impl CarrySlot {
    const fn empty(resource: ResourceTypeId) -> Self {
        Self {
            resource,
            gather_speed: None,
            max_carry: None,
            current_carry: 0,
        }
    }

    /// Prioritized slots take part in transport.
    #[must_use]
    pub fn is_prioritized(&self) -> bool {
        self.max_carry.is_some_and(|max| max > 0)
    }
}

/// Ordered gather-speed / capacity / carry table of a harvester.
///
/// Slots with a positive max carry form a prefix whose order is the
/// transport priority. The remaining slots follow, sorted by id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CarryLedger {
    slots: Vec<CarrySlot>,
    prioritized: usize,
}

impl CarryLedger {
    /// Create an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All slots in ledger order.
    #[must_use]
    pub fn slots(&self) -> &[CarrySlot] {
        &self.slots
    }

    /// Look up the slot of a resource type.
    #[must_use]
    pub fn slot(&self, resource: ResourceTypeId) -> Option<&CarrySlot> {
        self.slots.iter().find(|s| s.resource == resource)
    }

    fn position(&self, resource: ResourceTypeId) -> Option<usize> {
        self.slots.iter().position(|s| s.resource == resource)
    }

    /// Index of `resource`, inserting an empty slot in the unprioritized
    /// tail if it has none yet.
    fn ensure(&mut self, resource: ResourceTypeId) -> usize {
        if let Some(idx) = self.position(resource) {
            return idx;
        }
        let idx = self.tail_insert_index(resource);
        self.slots.insert(idx, CarrySlot::empty(resource));
        idx
    }

    fn tail_insert_index(&self, resource: ResourceTypeId) -> usize {
        self.slots[self.prioritized..]
            .iter()
            .position(|s| s.resource > resource)
            .map_or(self.slots.len(), |offset| self.prioritized + offset)
    }

    /// Configured gather speed.
    #[must_use]
    pub fn gather_speed(&self, resource: ResourceTypeId) -> Option<i32> {
        self.slot(resource).and_then(|s| s.gather_speed)
    }

    /// Set the gather speed of a resource type.
    pub fn set_gather_speed(&mut self, resource: ResourceTypeId, speed: i32) {
        let idx = self.ensure(resource);
        self.slots[idx].gather_speed = Some(speed);
    }

    /// Configured carry capacity.
    #[must_use]
    pub fn max_carry(&self, resource: ResourceTypeId) -> Option<i32> {
        self.slot(resource).and_then(|s| s.max_carry)
    }

    /// Set the carry capacity of a resource type.
    ///
    /// A positive capacity puts the type into the priority order (at its
    /// lexicographic position, if not already there); zero takes it out.
    pub fn set_max_carry(&mut self, resource: ResourceTypeId, max: i32) {
        let idx = self.ensure(resource);
        let was_prioritized = idx < self.prioritized;
        self.slots[idx].max_carry = Some(max);

        if max > 0 && !was_prioritized {
            let slot = self.slots.remove(idx);
            let at = self.slots[..self.prioritized]
                .iter()
                .position(|s| s.resource > resource)
                .unwrap_or(self.prioritized);
            self.slots.insert(at, slot);
            self.prioritized += 1;
        } else if max <= 0 && was_prioritized {
            let slot = self.slots.remove(idx);
            self.prioritized -= 1;
            let at = self.tail_insert_index(resource);
            self.slots.insert(at, slot);
        }
    }

    /// Amount of a resource type currently carried.
    #[must_use]
    pub fn current_carry(&self, resource: ResourceTypeId) -> i32 {
        self.slot(resource).map_or(0, |s| s.current_carry)
    }

    /// Set the carried amount of a resource type.
    pub fn set_current_carry(&mut self, resource: ResourceTypeId, amount: i32) {
        let idx = self.ensure(resource);
        self.slots[idx].current_carry = amount;
    }

    /// Sum of carried amounts over all types.
    #[must_use]
    pub fn total_carry(&self) -> i32 {
        self.slots.iter().map(|s| s.current_carry).sum()
    }

    /// Sum of configured capacities over all types.
    #[must_use]
    pub fn total_max_carry(&self) -> i32 {
        self.slots.iter().filter_map(|s| s.max_carry).sum()
    }

    /// First resource type (in ledger order) with a positive carry.
    #[must_use]
    pub fn carried_resource(&self) -> Option<ResourceTypeId> {
        self.slots
            .iter()
            .find(|s| s.current_carry > 0)
            .map(|s| s.resource)
    }

    /// Transport priority, highest first.
    pub fn priority(&self) -> impl Iterator<Item = ResourceTypeId> + '_ {
        self.slots[..self.prioritized].iter().map(|s| s.resource)
    }

    /// Number of prioritized types.
    #[must_use]
    pub fn priority_len(&self) -> usize {
        self.prioritized
    }

    /// Swap a type with its higher-priority neighbour.
    ///
    /// Returns `false` for the first entry or an unprioritized type.
    pub fn increase_priority(&mut self, resource: ResourceTypeId) -> bool {
        match self.position(resource) {
            Some(idx) if idx > 0 && idx < self.prioritized => {
                self.slots.swap(idx - 1, idx);
                true
            }
            _ => false,
        }
    }

    /// Swap a type with its lower-priority neighbour.
    ///
    /// Returns `false` for the last entry or an unprioritized type.
    pub fn decrease_priority(&mut self, resource: ResourceTypeId) -> bool {
        match self.position(resource) {
            Some(idx) if idx + 1 < self.prioritized => {
                self.slots.swap(idx, idx + 1);
                true
            }
            _ => false,
        }
    }
}
