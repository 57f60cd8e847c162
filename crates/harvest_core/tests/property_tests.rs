//! Property-based tests for the harvester state machine.
//!
//! Random worlds are driven by random scripts of orders and collaborator
//! events; the structural invariants must hold after every step.

use harvest_core::machine::{deliver, gather_tick, pickup_amount};
use harvest_core::resources::CarryLedger;
use harvest_core::state::TransportStrategy;
use harvest_test_utils::fixtures::{standard_config, STONE, WOOD};
use harvest_test_utils::proptest::prelude::*;
use harvest_test_utils::strategies::{arb_script, arb_world, Playground};
use harvest_test_utils::Harness;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn prop_invariants_hold_for_any_script(
        world in arb_world(),
        script in arb_script(40),
    ) {
        let mut pg = Playground::build(Harness::new(standard_config()), &world);
        let uid = pg.harvester;

        for action in script {
            pg.apply(action);
            if let Err(msg) = pg.harness.check_invariants(uid) {
                prop_assert!(false, "after {:?}: {}", action, msg);
            }
        }
        prop_assert_eq!(pg.harness.bus.duplicate_subscriptions(), 0);
        prop_assert_eq!(pg.harness.bus.stray_unsubscriptions(), 0);
    }

    #[test]
    fn prop_stop_is_idempotent(
        world in arb_world(),
        script in arb_script(20),
    ) {
        let mut pg = Playground::build(Harness::new(standard_config()), &world);
        let uid = pg.harvester;
        for action in script {
            pg.apply(action);
        }

        pg.harness.stop(uid).unwrap();
        let once = pg.harness.state(uid).clone();
        let events = pg.harness.events().len();

        pg.harness.stop(uid).unwrap();
        prop_assert_eq!(pg.harness.state(uid), &once);
        prop_assert_eq!(pg.harness.events().len(), events);
        prop_assert!(once.is_idle());
        prop_assert_eq!(pg.harness.bus.subscriptions(uid).len(), 0);
    }

    #[test]
    fn prop_carry_never_exceeds_capacity(
        world in arb_world(),
        script in arb_script(60),
    ) {
        let mut pg = Playground::build(Harness::new(standard_config()), &world);
        let uid = pg.harvester;
        for action in script {
            pg.apply(action);
            for kind in [STONE, WOOD] {
                let carry = pg.harness.carry(uid, kind);
                prop_assert!((0..=10).contains(&carry), "carry {} of {}", carry, kind);
            }
        }
    }

    #[test]
    fn prop_deliver_conserves_units(
        carry in 0i32..100,
        capacity in 0i32..100,
        stored in 0i32..150,
    ) {
        let d = deliver(carry, capacity, stored);
        prop_assert_eq!(d.carry + d.stored, carry + stored);
        prop_assert!(d.carry >= 0);
        prop_assert!(d.accepted >= 0 && d.accepted <= carry);
        prop_assert!(d.stored <= capacity.max(stored));
    }

    #[test]
    fn prop_gather_tick_conserves_units(
        speed in 0i32..20,
        carry in 0i32..20,
        max in 0i32..20,
        remaining in 0i32..50,
    ) {
        let t = gather_tick(speed, carry, max, remaining);
        prop_assert!(t.carry >= carry);
        prop_assert!(t.remaining >= 0);
        prop_assert_eq!(t.carry + t.remaining, carry + remaining);
    }

    #[test]
    fn prop_pickup_is_bounded(
        room in -5i32..20,
        stored in 0i32..40,
        desired in 0i32..40,
        excess in any::<bool>(),
    ) {
        let strategy = if excess { TransportStrategy::Excess } else { TransportStrategy::Nearest };
        let take = pickup_amount(strategy, room, stored, desired);
        prop_assert!(take >= 0);
        prop_assert!(take <= room.max(0));
        prop_assert!(take <= stored);
    }
}

#[test]
fn test_max_carry_zero_drops_priority_and_readding_restores_it() {
    let mut ledger = CarryLedger::default();
    ledger.set_max_carry(WOOD, 5);
    ledger.set_max_carry(STONE, 5);
    assert_eq!(ledger.priority().collect::<Vec<_>>(), vec![STONE, WOOD]);

    ledger.set_max_carry(STONE, 0);
    assert_eq!(ledger.priority().collect::<Vec<_>>(), vec![WOOD]);
    assert_eq!(ledger.priority_len(), 1);

    ledger.set_max_carry(STONE, 5);
    assert_eq!(ledger.priority().collect::<Vec<_>>(), vec![STONE, WOOD]);
}

#[test]
fn test_priority_moves_stop_at_boundaries() {
    let mut ledger = CarryLedger::default();
    ledger.set_max_carry(STONE, 5);
    ledger.set_max_carry(WOOD, 5);

    assert!(!ledger.increase_priority(STONE));
    assert!(!ledger.decrease_priority(WOOD));
    assert!(ledger.increase_priority(WOOD));
    assert_eq!(ledger.priority().collect::<Vec<_>>(), vec![WOOD, STONE]);
    assert!(!ledger.increase_priority(WOOD));
}
