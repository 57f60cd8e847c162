//! Gather and drop-off behaviour, driven event by event.

use harvest_core::prelude::*;
use harvest_test_utils::fixtures::{at, standard_config, PLAYER, RIVAL, STONE, WOOD};
use harvest_test_utils::Harness;

fn worker() -> (Harness, EntityId) {
    let mut h = Harness::new(standard_config());
    let uid = h.add_harvester(at(0, 0), PLAYER, Some("worker"));
    (h, uid)
}

fn exhausted(h: &Harness, node: EntityId) -> bool {
    h.events()
        .iter()
        .any(|e| *e == HarvestEvent::ResourceExhausted { resource: node })
}

// =============================================================================
// Gather cycle
// =============================================================================

#[test]
fn test_gather_ticks_until_exhausted_then_retargets() {
    let (mut h, uid) = worker();
    let node = h.world.spawn_resource(at(10, 0), WOOD, 7);
    let other = h.world.spawn_resource(at(30, 0), WOOD, 20);

    h.gather(uid, node).unwrap();
    assert_eq!(h.state(uid).state, HarvestState::SeekResource);
    assert_eq!(h.state(uid).resource_target, Some(node));
    assert!(h.events().contains(&HarvestEvent::HarvestTargetAcquired {
        harvester: uid,
        resource: node
    }));

    h.arrive(uid);
    assert_eq!(h.state(uid).state, HarvestState::Harvesting);
    assert!(h
        .events()
        .contains(&HarvestEvent::HarvestBegin { harvester: uid }));

    h.anim_cycle(uid);
    assert_eq!((h.carry(uid, WOOD), h.world.resource_amount(node)), (3, 4));
    h.anim_cycle(uid);
    assert_eq!((h.carry(uid, WOOD), h.world.resource_amount(node)), (6, 1));
    h.anim_cycle(uid);
    assert_eq!((h.carry(uid, WOOD), h.world.resource_amount(node)), (7, 0));

    assert!(exhausted(&h, node));
    let flags = h.world.flags(node).unwrap();
    assert!(flags.contains(EntityFlags::ZOMBIE));

    // Still under capacity: off to the next wood node.
    assert_eq!(h.state(uid).state, HarvestState::SeekResource);
    assert_eq!(h.state(uid).resource_target, Some(other));
    assert_eq!(h.world.move_target(uid), Some(other));
    h.check_invariants(uid).unwrap();
}

#[test]
fn test_exhausted_without_alternatives_goes_idle_keeping_load() {
    let (mut h, uid) = worker();
    let node = h.world.spawn_resource(at(10, 0), WOOD, 7);
    // Out of the reacquisition radius.
    h.world.spawn_resource(at(200, 0), WOOD, 20);

    h.gather(uid, node).unwrap();
    h.arrive(uid);
    for _ in 0..3 {
        h.anim_cycle(uid);
    }

    assert!(h.state(uid).is_idle());
    assert_eq!(h.carry(uid, WOOD), 7);
    assert!(h.bus.subscriptions(uid).is_empty());
    h.check_invariants(uid).unwrap();
}

#[test]
fn test_exhausted_without_alternatives_drops_off() {
    let (mut h, uid) = worker();
    let node = h.world.spawn_resource(at(10, 0), WOOD, 7);
    let site = h.world.spawn_storage(at(-10, 0), PLAYER);
    h.world.set_stock(site, WOOD, 100, 0, 0);

    h.gather(uid, node).unwrap();
    h.arrive(uid);
    for _ in 0..3 {
        h.anim_cycle(uid);
    }

    assert_eq!(h.state(uid).state, HarvestState::SeekStorage);
    assert_eq!(h.state(uid).storage_target, Some(site));
    h.check_invariants(uid).unwrap();
}

#[test]
fn test_full_load_is_dropped_off_and_gathering_resumes() {
    let (mut h, uid) = worker();
    let node = h.world.spawn_resource(at(10, 0), WOOD, 50);
    let site = h.world.spawn_storage(at(-10, 0), PLAYER);
    h.world.set_stock(site, WOOD, 100, 0, 0);

    h.gather(uid, node).unwrap();
    h.arrive(uid);
    for _ in 0..4 {
        h.anim_cycle(uid);
    }
    assert_eq!(h.carry(uid, WOOD), 10);
    assert_eq!(h.world.resource_amount(node), 40);
    assert_eq!(h.state(uid).state, HarvestState::SeekStorage);
    assert!(h
        .events()
        .contains(&HarvestEvent::HarvestEnd { harvester: uid }));

    h.arrive(uid);
    assert_eq!(h.world.stock(site, WOOD), 10);
    assert_eq!(h.carry(uid, WOOD), 0);
    assert!(h.events().contains(&HarvestEvent::ResourceDroppedOff {
        harvester: uid,
        storage: site,
        resource: WOOD,
        amount: 10
    }));

    assert_eq!(h.state(uid).state, HarvestState::SeekResource);
    assert_eq!(h.state(uid).resource_target, Some(node));
    h.check_invariants(uid).unwrap();
}

#[test]
fn test_arrival_at_capacity_goes_straight_to_storage() {
    let (mut h, uid) = worker();
    let node = h.world.spawn_resource(at(10, 0), WOOD, 50);
    let site = h.world.spawn_storage(at(-10, 0), PLAYER);
    h.world.set_stock(site, WOOD, 100, 0, 0);
    h.system
        .table_mut()
        .set_current_carry(uid, WOOD, 10)
        .unwrap();

    h.gather(uid, node).unwrap();
    h.arrive(uid);

    assert_eq!(h.state(uid).state, HarvestState::SeekStorage);
    assert_eq!(h.world.resource_amount(node), 50);
}

#[test]
fn test_arrival_while_still_moving_keeps_waiting() {
    let (mut h, uid) = worker();
    let node = h.world.spawn_resource(at(10, 0), WOOD, 50);

    h.gather(uid, node).unwrap();
    h.deliver(uid, EventKind::MotionEnd);

    assert_eq!(h.state(uid).state, HarvestState::SeekResource);
    assert!(h.bus.is_subscribed(uid, Continuation::ArriveAtResource));
}

// =============================================================================
// Scenario: partial drop-off
// =============================================================================

#[test]
fn test_partial_drop_off_saturates_site_and_retries() {
    let (mut h, uid) = worker();
    let small = h.world.spawn_storage(at(5, 0), PLAYER);
    h.world.set_stock(small, WOOD, 5, 2, 0);
    let big = h.world.spawn_storage(at(40, 0), PLAYER);
    h.world.set_stock(big, WOOD, 100, 0, 0);
    h.system
        .table_mut()
        .set_current_carry(uid, WOOD, 7)
        .unwrap();

    h.drop_off(uid, small).unwrap();
    h.arrive(uid);

    assert_eq!(h.carry(uid, WOOD), 4);
    assert_eq!(h.world.stock(small, WOOD), 5);
    assert!(h.events().contains(&HarvestEvent::ResourceDroppedOff {
        harvester: uid,
        storage: small,
        resource: WOOD,
        amount: 3
    }));
    assert_eq!(h.state(uid).state, HarvestState::SeekStorage);
    assert_eq!(h.state(uid).storage_target, Some(big));

    h.arrive(uid);
    assert_eq!(h.carry(uid, WOOD), 0);
    assert_eq!(h.world.stock(big, WOOD), 4);
    assert!(h.state(uid).is_idle());
    h.check_invariants(uid).unwrap();
}

#[test]
fn test_full_site_accepts_nothing_and_publishes_nothing() {
    let (mut h, uid) = worker();
    let full = h.world.spawn_storage(at(5, 0), PLAYER);
    h.world.set_stock(full, WOOD, 5, 5, 0);
    h.system
        .table_mut()
        .set_current_carry(uid, WOOD, 3)
        .unwrap();

    h.drop_off(uid, full).unwrap();
    h.arrive(uid);

    assert_eq!(h.carry(uid, WOOD), 3);
    assert_eq!(h.world.stock(full, WOOD), 5);
    assert_eq!(
        h.bus
            .count(|e| matches!(e, HarvestEvent::ResourceDroppedOff { .. })),
        0
    );
    assert!(h.state(uid).is_idle());
}

#[test]
fn test_drop_off_with_empty_hands_is_a_no_op() {
    let (mut h, uid) = worker();
    let site = h.world.spawn_storage(at(5, 0), PLAYER);

    h.drop_off(uid, site).unwrap();

    assert!(h.state(uid).is_idle());
    assert!(h.world.moves().is_empty());
}

#[test]
fn test_rival_sites_are_ignored() {
    let (mut h, uid) = worker();
    let node = h.world.spawn_resource(at(10, 0), WOOD, 3);
    let rival = h.world.spawn_storage(at(12, 0), RIVAL);
    h.world.set_stock(rival, WOOD, 100, 0, 0);
    let own = h.world.spawn_storage(at(-30, 0), PLAYER);
    h.world.set_stock(own, WOOD, 100, 0, 0);

    h.gather(uid, node).unwrap();
    h.arrive(uid);
    h.anim_cycle(uid);

    assert_eq!(h.state(uid).storage_target, Some(own));
}

// =============================================================================
// Scenario: queued gather behind a drop-off
// =============================================================================

#[test]
fn test_gather_of_other_type_queues_behind_drop_off() {
    let (mut h, uid) = worker();
    let site = h.world.spawn_storage(at(-10, 0), PLAYER);
    h.world.set_stock(site, WOOD, 100, 0, 0);
    let stone = h.world.spawn_resource(at(20, 0), STONE, 30);
    h.system
        .table_mut()
        .set_current_carry(uid, WOOD, 4)
        .unwrap();

    h.gather(uid, stone).unwrap();
    let hs = h.state(uid);
    assert_eq!(hs.state, HarvestState::SeekStorage);
    assert_eq!(hs.storage_target, Some(site));
    assert_eq!(hs.queued, QueuedCommand::Gather(stone));
    assert!(hs.drop_off_only);

    h.arrive(uid);
    assert_eq!(h.world.stock(site, WOOD), 4);
    let hs = h.state(uid);
    assert_eq!(hs.state, HarvestState::SeekResource);
    assert_eq!(hs.resource_target, Some(stone));
    assert_eq!(hs.queued, QueuedCommand::None);
    assert_eq!(h.world.move_target(uid), Some(stone));
    h.check_invariants(uid).unwrap();
}

#[test]
fn test_queued_gather_dropped_when_target_vanished() {
    let (mut h, uid) = worker();
    let site = h.world.spawn_storage(at(-10, 0), PLAYER);
    h.world.set_stock(site, WOOD, 100, 0, 0);
    let stone = h.world.spawn_resource(at(20, 0), STONE, 30);
    h.system
        .table_mut()
        .set_current_carry(uid, WOOD, 4)
        .unwrap();

    h.gather(uid, stone).unwrap();
    h.world.despawn(stone);
    h.arrive(uid);

    assert!(h.state(uid).is_idle());
    assert_eq!(h.state(uid).queued, QueuedCommand::None);
}

#[test]
fn test_gather_of_other_type_without_site_is_rejected() {
    let (mut h, uid) = worker();
    let stone = h.world.spawn_resource(at(20, 0), STONE, 30);
    h.system
        .table_mut()
        .set_current_carry(uid, WOOD, 4)
        .unwrap();

    let err = h.gather(uid, stone).unwrap_err();
    assert!(matches!(err, HarvestError::NoDropOffSite { harvester } if harvester == uid));
    assert!(h.state(uid).is_idle());
    assert!(h.bus.subscriptions(uid).is_empty());
}

#[test]
fn test_gather_rejects_non_resource() {
    let (mut h, uid) = worker();
    let site = h.world.spawn_storage(at(5, 0), PLAYER);

    assert!(matches!(
        h.gather(uid, site),
        Err(HarvestError::NotAResource(e)) if e == site
    ));
    assert!(matches!(
        h.drop_off(uid, uid),
        Err(HarvestError::NotAStorageSite(e)) if e == uid
    ));
    assert!(matches!(h.gather(99, site), Err(HarvestError::NotFound(99))));
}

// =============================================================================
// Lost targets
// =============================================================================

#[test]
fn test_unreachable_node_is_skipped() {
    let (mut h, uid) = worker();
    let blocked = h.world.spawn_resource(at(10, 0), WOOD, 30);
    let open = h.world.spawn_resource(at(15, 0), WOOD, 30);
    h.world.set_unreachable(blocked, true);

    h.gather(uid, blocked).unwrap();
    h.arrive(uid);

    assert_eq!(h.state(uid).state, HarvestState::SeekResource);
    assert_eq!(h.state(uid).resource_target, Some(open));

    h.arrive(uid);
    assert_eq!(h.state(uid).state, HarvestState::Harvesting);
}

#[test]
fn test_node_destroyed_mid_harvest_retargets() {
    let (mut h, uid) = worker();
    let node = h.world.spawn_resource(at(10, 0), WOOD, 30);
    let spare = h.world.spawn_resource(at(20, 0), WOOD, 30);

    h.gather(uid, node).unwrap();
    h.arrive(uid);
    h.anim_cycle(uid);
    h.world.despawn(node);
    h.anim_cycle(uid);

    assert_eq!(h.state(uid).resource_target, Some(spare));
    assert_eq!(h.carry(uid, WOOD), 3);
    assert!(h
        .events()
        .contains(&HarvestEvent::HarvestEnd { harvester: uid }));
    h.check_invariants(uid).unwrap();
}

#[test]
fn test_storage_destroyed_en_route_retries_another_site() {
    let (mut h, uid) = worker();
    let first = h.world.spawn_storage(at(5, 0), PLAYER);
    h.world.set_stock(first, WOOD, 100, 0, 0);
    let second = h.world.spawn_storage(at(25, 0), PLAYER);
    h.world.set_stock(second, WOOD, 100, 0, 0);
    h.system
        .table_mut()
        .set_current_carry(uid, WOOD, 5)
        .unwrap();

    h.drop_off(uid, first).unwrap();
    h.world.despawn(first);
    h.arrive(uid);

    assert_eq!(h.state(uid).storage_target, Some(second));
    h.arrive(uid);
    assert_eq!(h.world.stock(second, WOOD), 5);
    assert!(h.state(uid).is_idle());
}

// =============================================================================
// Interruptions
// =============================================================================

#[test]
fn test_foreign_move_cancels_trip_and_keeps_load() {
    let (mut h, uid) = worker();
    let node = h.world.spawn_resource(at(10, 0), WOOD, 30);
    h.system
        .table_mut()
        .set_current_carry(uid, WOOD, 2)
        .unwrap();

    h.gather(uid, node).unwrap();
    h.foreign_move(uid);

    assert!(h.state(uid).is_idle());
    assert_eq!(h.carry(uid, WOOD), 2);
    assert_eq!(h.bus.subscription_count(), 0);

    // A late arrival finds nothing to resume.
    h.arrive(uid);
    assert!(h.state(uid).is_idle());
    h.check_invariants(uid).unwrap();
}

#[test]
fn test_motion_start_interrupts_harvest() {
    let (mut h, uid) = worker();
    let node = h.world.spawn_resource(at(10, 0), WOOD, 30);

    h.gather(uid, node).unwrap();
    h.arrive(uid);
    h.anim_cycle(uid);
    h.foreign_move(uid);

    assert!(h.state(uid).is_idle());
    assert_eq!(h.carry(uid, WOOD), 3);
    assert_eq!(
        h.bus
            .count(|e| *e == HarvestEvent::HarvestEnd { harvester: uid }),
        1
    );
    assert_eq!(h.bus.subscription_count(), 0);
}

#[test]
fn test_stop_is_idempotent() {
    let (mut h, uid) = worker();
    let node = h.world.spawn_resource(at(10, 0), WOOD, 30);
    h.gather(uid, node).unwrap();
    h.arrive(uid);
    h.anim_cycle(uid);

    h.stop(uid).unwrap();
    let once = h.state(uid).clone();
    let events = h.events().len();
    h.stop(uid).unwrap();

    assert_eq!(h.state(uid), &once);
    assert_eq!(h.events().len(), events);
    assert!(once.is_idle());
    assert_eq!(once.ledger.current_carry(WOOD), 3);
    assert_eq!(h.bus.stray_unsubscriptions(), 0);
}

#[test]
fn test_remove_entity_cancels_registrations() {
    let (mut h, uid) = worker();
    let node = h.world.spawn_resource(at(10, 0), WOOD, 30);
    h.gather(uid, node).unwrap();
    assert!(h.bus.subscription_count() > 0);

    h.remove(uid).unwrap();

    assert_eq!(h.bus.subscription_count(), 0);
    assert!(!h.system.table().contains(uid));
    assert!(matches!(h.stop(uid), Err(HarvestError::NotFound(_))));
}

#[test]
fn test_non_harvester_cannot_register() {
    let (mut h, _) = worker();
    let site = h.world.spawn_storage(at(5, 0), PLAYER);
    assert!(matches!(
        h.system.add_entity(site, &h.world),
        Err(HarvestError::NotAHarvester(e)) if e == site
    ));
}
