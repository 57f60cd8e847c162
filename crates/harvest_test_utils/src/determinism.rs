//! Determinism testing utilities.
//!
//! Harvester behaviour must be reproducible: the same orders against the
//! same world have to produce the same state tables and the same
//! notification stream. Sources of non-determinism guarded against here:
//!
//! - **Floating-point math**: positions and radii are fixed-point
//!   ([`harvest_core::math::Fixed`]).
//! - **Map iteration order**: state tables and fake worlds use ordered maps,
//!   and nearest-entity ties are broken by entity id.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use crate::harness::Harness;

/// Result of a determinism test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeterminismResult {
    /// Whether all runs produced identical results.
    pub is_deterministic: bool,
    /// Hashes from each run.
    pub hashes: Vec<u64>,
    /// Number of steps run.
    pub steps: u64,
}

impl DeterminismResult {
    /// Get all unique hashes (should be 1 for a deterministic run).
    #[must_use]
    pub fn unique_hashes(&self) -> Vec<u64> {
        let mut unique: Vec<u64> = self.hashes.clone();
        unique.sort_unstable();
        unique.dedup();
        unique
    }

    /// Assert that every run matched, with a detailed error message.
    ///
    /// # Panics
    ///
    /// Panics if the runs produced different hashes.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic {
            let unique = self.unique_hashes();
            panic!(
                "Harvest runs are non-deterministic!\n\
                 Runs: {}\n\
                 Steps: {}\n\
                 Unique hashes: {} (expected 1)\n\
                 All hashes: {:?}",
                self.hashes.len(),
                self.steps,
                unique.len(),
                self.hashes
            );
        }
    }
}

/// Run a setup/step pair several times and compare final hashes.
pub fn verify_determinism<S, Setup, Step, HashFn>(
    runs: usize,
    steps: u64,
    setup: Setup,
    step: Step,
    hash: HashFn,
) -> DeterminismResult
where
    Setup: Fn() -> S,
    Step: Fn(&mut S),
    HashFn: Fn(&S) -> u64,
{
    let mut hashes = Vec::with_capacity(runs);

    for _ in 0..runs {
        let mut state = setup();
        for _ in 0..steps {
            step(&mut state);
        }
        hashes.push(hash(&state));
    }

    let is_deterministic = hashes.windows(2).all(|w| w[0] == w[1]);

    DeterminismResult {
        is_deterministic,
        hashes,
        steps,
    }
}

/// Hash of a harness: the serialized state table plus the notification log.
#[must_use]
pub fn harness_hash(harness: &Harness) -> u64 {
    let mut hasher = DefaultHasher::new();
    match harness.system.table().serialize() {
        Ok(bytes) => bytes.hash(&mut hasher),
        Err(e) => e.to_string().hash(&mut hasher),
    }
    format!("{:?}", harness.events()).hash(&mut hasher);
    hasher.finish()
}

/// Check that a serialization round trip of the state table changes
/// nothing.
#[must_use]
pub fn verify_serialization_round_trip(harness: &Harness) -> bool {
    let table = harness.system.table();
    let Ok(bytes) = table.serialize() else {
        return false;
    };
    harvest_core::table::HarvesterTable::deserialize(&bytes).is_ok_and(|restored| &restored == table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{at, standard_config, PLAYER, WOOD};

    fn scenario() -> (Harness, u64) {
        let mut h = Harness::new(standard_config());
        let uid = h.add_harvester(at(0, 0), PLAYER, Some("worker"));
        let node = h.world.spawn_resource(at(10, 0), WOOD, 25);
        let site = h.world.spawn_storage(at(-10, 0), PLAYER);
        h.world.set_stock(site, WOOD, 100, 0, 0);
        h.gather(uid, node).unwrap();
        (h, uid)
    }

    #[test]
    fn test_verify_determinism_simple() {
        let result = verify_determinism(3, 100, || 0u64, |n| *n += 1, |n| *n);

        assert!(result.is_deterministic);
        assert_eq!(result.hashes, vec![100, 100, 100]);
    }

    #[test]
    fn test_harvest_cycle_is_deterministic() {
        let result = verify_determinism(
            3,
            40,
            scenario,
            |(h, uid)| {
                let uid = *uid;
                if h.state(uid).is_idle() {
                    return;
                }
                h.run_until_idle(uid, 1);
            },
            |(h, _)| harness_hash(h),
        );
        result.assert_deterministic();
    }

    #[test]
    fn test_serialization_round_trip_mid_task() {
        let (mut h, uid) = scenario();
        h.arrive(uid);
        h.anim_cycle(uid);
        assert!(verify_serialization_round_trip(&h));
    }
}
