//! Click resolution and selection orders.

use harvest_core::orders::{
    click_action, contextual_action, issue_click, order_drop_off, order_gather,
};
use harvest_core::prelude::*;
use harvest_test_utils::fixtures::{at, standard_config, PLAYER, STONE, WOOD};
use harvest_test_utils::Harness;

struct Scene {
    h: Harness,
    worker: EntityId,
    hauler: EntityId,
    wood: EntityId,
    depot: EntityId,
}

fn scene() -> Scene {
    let mut h = Harness::new(standard_config());
    let worker = h.add_harvester(at(0, 0), PLAYER, Some("worker"));
    let hauler = h.add_harvester(at(0, 2), PLAYER, Some("hauler"));
    let wood = h.world.spawn_resource(at(10, 0), WOOD, 50);
    let depot = h.world.spawn_storage(at(-10, 0), PLAYER);
    h.world.set_stock(depot, WOOD, 100, 0, 0);
    h.world.set_stock(depot, STONE, 100, 0, 0);
    Scene {
        h,
        worker,
        hauler,
        wood,
        depot,
    }
}

fn contextual(s: &Scene, selection: &[EntityId], hovered: EntityId) -> ContextualAction {
    contextual_action(&s.h.system, &s.h.world, selection, Some(hovered), TargetMode::Off)
}

#[test]
fn test_contextual_action_by_hovered_entity() {
    let mut s = scene();

    assert_eq!(contextual(&s, &[s.worker], s.wood), ContextualAction::Gather);
    assert_eq!(contextual(&s, &[s.hauler], s.wood), ContextualAction::None);
    assert_eq!(contextual(&s, &[s.worker], s.depot), ContextualAction::Transport);

    s.h.system
        .table_mut()
        .set_current_carry(s.worker, WOOD, 4)
        .unwrap();
    assert_eq!(contextual(&s, &[s.worker], s.depot), ContextualAction::DropOff);

    // Another harvester hovered: nothing to do.
    assert_eq!(contextual(&s, &[s.worker], s.hauler), ContextualAction::None);
}

#[test]
fn test_first_selected_decides() {
    let s = scene();
    assert_eq!(
        contextual(&s, &[s.hauler, s.worker], s.wood),
        ContextualAction::None
    );
    assert_eq!(
        contextual(&s, &[s.worker, s.hauler], s.wood),
        ContextualAction::Gather
    );
    assert_eq!(contextual(&s, &[s.depot, s.worker], s.wood), ContextualAction::None);
    assert_eq!(contextual(&s, &[], s.wood), ContextualAction::None);
}

#[test]
fn test_no_contextual_action_while_targeting() {
    let s = scene();
    let action = contextual_action(
        &s.h.system,
        &s.h.world,
        &[s.worker],
        Some(s.wood),
        TargetMode::Transport,
    );
    assert_eq!(action, ContextualAction::None);
}

#[test]
fn test_click_action_buttons() {
    let s = scene();
    let click = |click, mode| {
        click_action(&s.h.system, &s.h.world, &[s.worker], Some(s.wood), click, mode)
    };

    assert_eq!(click(Click::Left, TargetMode::DropOff), ContextualAction::DropOff);
    assert_eq!(click(Click::Right, TargetMode::DropOff), ContextualAction::None);
    assert_eq!(click(Click::Left, TargetMode::Off), ContextualAction::None);
    assert_eq!(click(Click::Right, TargetMode::Off), ContextualAction::Gather);
    assert!(TargetMode::Gather.is_targeting());
    assert!(!TargetMode::Off.is_targeting());
}

#[test]
fn test_right_click_gather_skips_incapable() {
    let mut s = scene();
    let selection = [s.worker, s.hauler];
    let issued = issue_click(
        &mut s.h.system,
        &mut s.h.world,
        &mut s.h.bus,
        &selection,
        Some(s.wood),
        Click::Right,
        TargetMode::Off,
    );

    assert_eq!(issued, 1);
    assert_eq!(s.h.state(s.worker).state, HarvestState::SeekResource);
    assert!(s.h.state(s.hauler).is_idle());
}

#[test]
fn test_click_on_nothing_issues_nothing() {
    let mut s = scene();
    let selection = [s.worker];
    let issued = issue_click(
        &mut s.h.system,
        &mut s.h.world,
        &mut s.h.bus,
        &selection,
        None,
        Click::Left,
        TargetMode::Gather,
    );
    assert_eq!(issued, 0);
    assert!(s.h.events().is_empty());
}

#[test]
fn test_armed_transport_with_left_click() {
    let mut s = scene();
    let wanting = s.h.world.spawn_storage(at(20, 0), PLAYER);
    s.h.world.set_stock(wanting, STONE, 50, 0, 20);
    s.h.world.set_stock(s.depot, STONE, 100, 30, 0);
    let selection = [s.worker, s.hauler, s.depot];

    let issued = issue_click(
        &mut s.h.system,
        &mut s.h.world,
        &mut s.h.bus,
        &selection,
        Some(wanting),
        Click::Left,
        TargetMode::Transport,
    );

    assert_eq!(issued, 2);
    for uid in [s.worker, s.hauler] {
        assert_eq!(s.h.state(uid).state, HarvestState::TransportGetting);
        assert_eq!(s.h.state(uid).transport_source, Some(s.depot));
    }
}

#[test]
fn test_drop_off_only_loaded_harvesters() {
    let mut s = scene();
    s.h.system
        .table_mut()
        .set_current_carry(s.hauler, STONE, 6)
        .unwrap();
    let selection = [s.worker, s.hauler];

    let issued = order_drop_off(
        &mut s.h.system,
        &mut s.h.world,
        &mut s.h.bus,
        &selection,
        s.depot,
    );

    assert_eq!(issued, 1);
    assert!(s.h.state(s.worker).is_idle());
    assert_eq!(s.h.state(s.hauler).storage_target, Some(s.depot));
}

#[test]
fn test_gather_order_ignores_non_resources() {
    let mut s = scene();
    let selection = [s.worker];
    let issued = order_gather(
        &mut s.h.system,
        &mut s.h.world,
        &mut s.h.bus,
        &selection,
        s.depot,
    );
    assert_eq!(issued, 0);
    assert!(s.h.state(s.worker).is_idle());
}
