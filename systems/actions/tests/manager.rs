use std::cell::{Cell, RefCell};
use std::rc::Rc;

use settler_ai_core::{
    BuildingType, Command, Direction, Event, MapExtent, MapPoint, Resource, Specialist,
};
use settler_ai_model::{
    Lifetime, Penalties, QualityScores, RoadConstraints, RouteKind, ScoreTuning, View,
};
use settler_ai_system_actions::{
    Action, ActionManager, ActionTuning, BuildingRequest, DestroyRequest, FlagRequest, GroupAction,
    GroupKind, Status,
};
use settler_ai_world::{query, step, World, WorldBuilder};

fn extent() -> MapExtent {
    MapExtent::new(24, 24)
}

fn hq() -> MapPoint {
    MapPoint::new(12, 12)
}

fn hq_flag() -> MapPoint {
    MapPoint::new(12, 13)
}

fn base() -> WorldBuilder {
    WorldBuilder::new(extent()).territory(hq(), 9).headquarters(hq())
}

fn refreshed(world: &World) -> View {
    let mut view = View::new(extent(), ScoreTuning::default());
    view.update(world, true);
    view
}

fn tick(manager: &mut ActionManager, world: &mut World, view: &mut View) -> Vec<Event> {
    manager.execute(world, view);
    let mut events = Vec::new();
    step(world, &mut events);
    for event in &events {
        manager.handle_event(event);
    }
    view.update(world, false);
    events
}

fn count_submitted(world: &World, wanted: impl Fn(&Command) -> bool) -> usize {
    query::submitted_commands(world)
        .iter()
        .filter(|command| wanted(command))
        .count()
}

#[test]
fn connected_sites_succeed_without_a_road() {
    let site = MapPoint::new(14, 12);
    let mut world = base()
        .road(hq_flag(), &[Direction::East, Direction::East])
        .build();
    let mut view = refreshed(&world);
    assert!(view.is_connected_flag(MapPoint::new(14, 13)));
    let mut manager = ActionManager::default();

    let id = manager.construct_building(&world, None, BuildingRequest::at(BuildingType::Quarry, site));
    let _ = tick(&mut manager, &mut world, &mut view);

    assert_eq!(manager.status(id), Some(Status::Success));
    assert!(manager.children(id).is_empty(), "no road was needed");
    assert_eq!(
        count_submitted(&world, |command| matches!(command, Command::BuildRoad { .. })),
        0
    );
    assert!(query::buildings(&world)
        .iter()
        .any(|(point, building, _)| *point == site && *building == BuildingType::Quarry));
}

#[test]
fn unconnected_sites_wait_for_their_road() {
    let site = MapPoint::new(8, 10);
    let flag = extent().flag_of(site).expect("flag inside the map");
    let mut world = base().build();
    let mut view = refreshed(&world);
    let mut manager = ActionManager::default();

    let id = manager.construct_building(&world, None, BuildingRequest::at(BuildingType::Woodcutter, site));
    view.global_mut()[Resource::Tree] = 5;
    manager.execute(&mut world, &mut view);

    assert_eq!(manager.status(id), Some(Status::Waiting));
    let children = manager.children(id);
    assert_eq!(children.len(), 1);
    match manager.action(children[0]) {
        Some(Action::Road(request)) => {
            assert_eq!(request.from(), flag);
            assert!(request.constraints.exclude_from);
            assert_eq!(request.constraints.lifetime, Lifetime::Permanent);
        }
        other => panic!("expected a road request, got {other:?}"),
    }
    assert_eq!(
        manager.queued().next(),
        Some(children[0]),
        "roads jump the queue"
    );
}

#[test]
fn secondary_roads_without_a_worthwhile_target_retry_then_fail() {
    let flag = MapPoint::new(14, 13);
    let mut world = base()
        .road(hq_flag(), &[Direction::East, Direction::East])
        .build();
    let mut view = refreshed(&world);
    let mut manager = ActionManager::default();

    let constraints = RoadConstraints::new(flag)
        .exclude_from()
        .kind(RouteKind::Secondary);
    let id = manager.construct_road(None, constraints);

    manager.execute(&mut world, &mut view);
    assert_eq!(manager.status(id), Some(Status::Retry));
    manager.execute(&mut world, &mut view);
    assert_eq!(manager.status(id), Some(Status::Failed));

    assert_eq!(
        count_submitted(&world, |command| matches!(command, Command::BuildRoad { .. })),
        0,
        "nothing was built"
    );
}

// Every new road step costs exactly one route segment.
fn flat_tuning() -> ScoreTuning {
    ScoreTuning {
        quality: QualityScores {
            hut: 0,
            house: 0,
            castle: 0,
            mine: 0,
            harbor: 0,
            ..QualityScores::default()
        },
        penalties: Penalties {
            route_missing_flag: 0,
            farm_land_road: 0,
            tree_land: 0,
            stone_on_neighbour: 0,
            tree_on_neighbour: 0,
            border_on_neighbour: 0,
            ..Penalties::default()
        },
        ..ScoreTuning::default()
    }
}

#[test]
fn secondary_roads_duplicating_a_cheap_detour_fail() {
    // A four step detour from the headquarters flag ends two steps east of
    // it, so a straight secondary road would cost half the detour.
    let flag = MapPoint::new(14, 13);
    let mut world = base()
        .road(
            hq_flag(),
            &[
                Direction::SouthEast,
                Direction::East,
                Direction::East,
                Direction::NorthWest,
            ],
        )
        .build();
    let mut view = View::new(extent(), flat_tuning());
    view.update(&world, true);
    let constraints = RoadConstraints::new(flag)
        .exclude_from()
        .kind(RouteKind::Secondary);

    let outcome = view.find_connection_point(&world, &constraints);
    assert_eq!(outcome.target, Some(hq_flag()));
    assert_eq!(outcome.route, vec![Direction::West, Direction::West]);
    assert_eq!(outcome.score.get(), 16);

    let mut manager = ActionManager::default();
    let id = manager.construct_road(None, constraints);
    manager.execute(&mut world, &mut view);
    assert_eq!(manager.status(id), Some(Status::Retry));
    manager.execute(&mut world, &mut view);
    assert_eq!(manager.status(id), Some(Status::Failed));

    assert_eq!(
        count_submitted(&world, |command| matches!(command, Command::BuildRoad { .. })),
        0,
        "the detour already serves the flag"
    );
}

#[test]
fn road_notifications_settle_waiting_requests() {
    let lone = MapPoint::new(8, 16);
    let mut world = base().flag(lone).build();
    let mut view = refreshed(&world);
    let mut manager = ActionManager::default();

    let id = manager.construct_road(None, RoadConstraints::new(lone).exclude_from());
    manager.execute(&mut world, &mut view);
    assert_eq!(manager.status(id), Some(Status::Waiting));

    let route = match manager.action(id) {
        Some(Action::Road(request)) => request.route().to_vec(),
        other => panic!("expected a road request, got {other:?}"),
    };
    assert!(manager.is_awaiting_road(lone, &route));

    manager.handle_event(&Event::RoadConstructed {
        origin: lone,
        route: vec![Direction::West],
    });
    assert_eq!(
        manager.status(id),
        Some(Status::Waiting),
        "unrelated roads are ignored"
    );

    let mut events = Vec::new();
    step(&mut world, &mut events);
    assert!(events.contains(&Event::RoadConstructed {
        origin: lone,
        route: route.clone(),
    }));
    for event in &events {
        manager.handle_event(event);
    }

    assert_eq!(manager.status(id), Some(Status::Success));
    assert!(!manager.is_awaiting_road(lone, &route));
}

#[test]
fn refused_roads_get_another_attempt() {
    let lone = MapPoint::new(8, 16);
    let mut world = base().flag(lone).build();
    let mut view = refreshed(&world);
    let mut manager = ActionManager::default();

    let id = manager.construct_road(None, RoadConstraints::new(lone).exclude_from());
    manager.execute(&mut world, &mut view);
    let route = match manager.action(id) {
        Some(Action::Road(request)) => request.route().to_vec(),
        other => panic!("expected a road request, got {other:?}"),
    };

    manager.handle_event(&Event::RoadConstructionFailed {
        origin: lone,
        route,
    });

    assert_eq!(manager.status(id), Some(Status::Retry));
}

#[test]
fn roads_refused_twice_fail() {
    let lone = MapPoint::new(8, 16);
    let mut world = base().flag(lone).build();
    let mut view = refreshed(&world);
    let mut manager = ActionManager::default();
    let id = manager.construct_road(None, RoadConstraints::new(lone).exclude_from());

    for attempt in 0..2 {
        // Flags planted by the first attempt take their own passes.
        for _ in 0..3 {
            manager.execute(&mut world, &mut view);
            if manager.status(id) == Some(Status::Waiting) {
                break;
            }
        }
        assert_eq!(manager.status(id), Some(Status::Waiting), "attempt {attempt}");
        let route = match manager.action(id) {
            Some(Action::Road(request)) => request.route().to_vec(),
            other => panic!("expected a road request, got {other:?}"),
        };
        manager.handle_event(&Event::RoadConstructionFailed {
            origin: lone,
            route,
        });
    }

    assert_eq!(manager.status(id), Some(Status::Failed));
    manager.execute(&mut world, &mut view);
    assert!(!manager.contains(id), "the failed road is undone and released");
}

#[test]
fn any_groups_stop_at_the_first_success() {
    let outside = MapPoint::new(22, 2);
    let first_site = MapPoint::new(8, 16);
    let second_site = MapPoint::new(16, 8);
    let mut world = base().build();
    let mut view = refreshed(&world);
    let mut manager = ActionManager::default();

    let group = manager.create(None, Action::Group(GroupAction::new(GroupKind::Any)));
    let children: Vec<_> = [outside, first_site, second_site]
        .into_iter()
        .map(|point| {
            manager.create(
                Some(group),
                Action::Flag(FlagRequest::new(point, Lifetime::Permanent)),
            )
        })
        .collect();
    manager.append(group);

    for _ in 0..4 {
        let _ = tick(&mut manager, &mut world, &mut view);
    }

    assert_eq!(manager.status(children[0]), Some(Status::Aborted));
    assert_eq!(manager.status(children[1]), Some(Status::Success));
    assert_eq!(manager.status(children[2]), Some(Status::Aborted));
    assert_eq!(manager.status(group), Some(Status::Success));
    assert!(query::flags(&world).contains(&first_site));
    assert!(!query::flags(&world).contains(&second_site));

    let _ = tick(&mut manager, &mut world, &mut view);
    assert!(!manager.contains(group), "finished roots are released");
    assert_eq!(manager.live_actions(), 0);
    assert!(view.is_flag(first_site));
}

#[test]
fn execute_groups_run_children_in_order() {
    let first = MapPoint::new(8, 16);
    let second = MapPoint::new(16, 8);
    let mut world = base().build();
    let mut view = refreshed(&world);
    let mut manager = ActionManager::default();

    let group = manager.create(None, Action::Group(GroupAction::new(GroupKind::Execute)));
    let a = manager.create(Some(group), Action::Flag(FlagRequest::new(first, Lifetime::Permanent)));
    let b = manager.create(Some(group), Action::Flag(FlagRequest::new(second, Lifetime::Permanent)));
    manager.append(group);

    let _ = tick(&mut manager, &mut world, &mut view);
    assert_eq!(manager.status(a), Some(Status::Waiting));
    assert_eq!(manager.status(b), Some(Status::New), "the second waits its turn");

    for _ in 0..3 {
        let _ = tick(&mut manager, &mut world, &mut view);
    }
    assert_eq!(manager.status(a), Some(Status::Success));
    assert_eq!(manager.status(b), Some(Status::Success));
    assert_eq!(manager.status(group), Some(Status::Success));
}

#[test]
fn undoing_a_placed_building_removes_site_and_flag() {
    let site = MapPoint::new(14, 12);
    let flag = MapPoint::new(14, 13);
    let mut world = base()
        .road(hq_flag(), &[Direction::East, Direction::East])
        .build();
    let mut view = refreshed(&world);
    let mut manager = ActionManager::default();

    let id = manager.construct_building(&world, None, BuildingRequest::at(BuildingType::Quarry, site));
    let _ = tick(&mut manager, &mut world, &mut view);
    assert_eq!(manager.status(id), Some(Status::Success));
    assert_eq!(view.building_at(site), Some(BuildingType::Quarry));

    assert!(manager.undo(id, &mut world, &mut view));

    assert_eq!(manager.status(id), Some(Status::Undone));
    match manager.action(id) {
        Some(Action::Building(request)) => assert!(request.flag_removed()),
        other => panic!("expected a building request, got {other:?}"),
    }
    assert_eq!(view.building_at(site), None);
    assert!(!view.is_flag(flag));

    let mut events = Vec::new();
    step(&mut world, &mut events);
    assert!(events.contains(&Event::BuildingDestroyed {
        point: site,
        building: BuildingType::Quarry,
    }));
    assert!(!query::buildings(&world)
        .iter()
        .any(|(point, _, _)| *point == site));
    assert!(!query::flags(&world).contains(&flag));
    assert!(query::flags(&world).contains(&hq_flag()));
}

#[test]
fn flags_batch_but_other_work_ends_the_pass() {
    let mut world = base()
        .building(MapPoint::new(8, 10), BuildingType::Woodcutter)
        .build();
    let mut view = refreshed(&world);
    let mut manager = ActionManager::default();

    let demolition = manager.destroy_building(MapPoint::new(8, 10));
    let flags: Vec<_> = [MapPoint::new(8, 16), MapPoint::new(16, 8), MapPoint::new(16, 16)]
        .into_iter()
        .map(|point| manager.construct_flag(None, point, Lifetime::Permanent))
        .collect();

    manager.execute(&mut world, &mut view);

    for flag in &flags {
        assert_eq!(manager.status(*flag), Some(Status::Waiting));
    }
    assert_eq!(
        manager.status(demolition),
        Some(Status::New),
        "work behind planted flags waits for the next pass"
    );
    assert_eq!(
        count_submitted(&world, |command| matches!(command, Command::SetFlag { .. })),
        3
    );
}

#[test]
fn one_demolition_per_pass() {
    let mut world = base()
        .building(MapPoint::new(8, 10), BuildingType::Woodcutter)
        .building(MapPoint::new(16, 10), BuildingType::Quarry)
        .build();
    let mut view = refreshed(&world);
    let mut manager = ActionManager::default();

    let first = manager.destroy_building(MapPoint::new(8, 10));
    let second = manager.destroy_building(MapPoint::new(16, 10));
    manager.execute(&mut world, &mut view);

    assert_eq!(manager.status(first), Some(Status::Success));
    assert_eq!(manager.status(second), Some(Status::New));
}

#[test]
fn overflowing_queues_are_cleared() {
    let mut world = base().build();
    let mut view = refreshed(&world);
    let mut manager = ActionManager::new(ActionTuning {
        emergency_queue_cap: 2,
    });
    let finals = Rc::new(RefCell::new(Vec::new()));

    for x in [4, 6, 8] {
        let id = manager.destroy_building(MapPoint::new(x, 4));
        let finals = Rc::clone(&finals);
        manager.on_delete(id, Box::new(move |status, _| finals.borrow_mut().push(status)));
    }
    manager.execute(&mut world, &mut view);

    assert!(manager.is_empty());
    assert_eq!(manager.live_actions(), 0);
    assert_eq!(*finals.borrow(), vec![Status::Aborted; 3]);
    assert!(query::submitted_commands(&world).is_empty());
}

#[test]
fn clearing_fails_started_work() {
    let mut manager = ActionManager::default();
    let idle = manager.destroy_building(MapPoint::new(4, 4));
    let group = manager.create(None, Action::Group(GroupAction::new(GroupKind::Execute)));
    let child = manager.create(
        Some(group),
        Action::Destroy(DestroyRequest::new(MapPoint::new(6, 4))),
    );
    manager.append(group);

    manager.clear();

    assert_eq!(manager.status(idle), Some(Status::Aborted));
    assert_eq!(manager.status(group), Some(Status::Failed));
    assert_eq!(manager.status(child), Some(Status::Failed));
}

#[test]
fn deferred_actions_join_the_queue_when_due() {
    let mut world = base()
        .building(MapPoint::new(8, 10), BuildingType::Woodcutter)
        .building(MapPoint::new(16, 10), BuildingType::Quarry)
        .build();
    let mut view = refreshed(&world);
    let mut manager = ActionManager::default();

    let delayed = manager.create(None, Action::Destroy(DestroyRequest::new(MapPoint::new(8, 10))));
    manager.delay(2, delayed);
    let ready = Rc::new(Cell::new(false));
    let triggered = manager.create(None, Action::Destroy(DestroyRequest::new(MapPoint::new(16, 10))));
    let gate = Rc::clone(&ready);
    manager.trigger(Box::new(move |_, _| gate.get()), triggered);

    manager.execute(&mut world, &mut view);
    assert!(manager.is_empty());
    manager.execute(&mut world, &mut view);
    assert_eq!(manager.status(delayed), Some(Status::Success));
    assert_eq!(manager.status(triggered), Some(Status::New));

    ready.set(true);
    manager.execute(&mut world, &mut view);
    assert_eq!(manager.status(triggered), Some(Status::Success));
}

#[test]
fn deletion_callbacks_see_the_model() {
    let mut world = base().build();
    let mut view = refreshed(&world);
    let mut manager = ActionManager::default();

    let id = manager.destroy_building(MapPoint::new(4, 4));
    manager.on_delete(
        id,
        Box::new(|status, view| {
            if status == Status::Failed {
                view.request_full_update();
            }
        }),
    );

    manager.execute(&mut world, &mut view);
    assert_eq!(manager.status(id), Some(Status::Failed), "nothing to demolish");
    assert!(!view.requires_full_update());

    manager.execute(&mut world, &mut view);
    assert!(!manager.contains(id));
    assert!(view.requires_full_update());
}

#[test]
fn geologists_come_along_a_temporary_road() {
    let point = MapPoint::new(8, 16);
    let mut world = base().build();
    let mut view = refreshed(&world);
    let mut manager = ActionManager::default();

    let id = manager.request_geologists(&view, None, point, 2);
    assert!(matches!(manager.action(id), Some(Action::Group(_))));
    manager.append(id);

    for _ in 0..4 {
        let _ = tick(&mut manager, &mut world, &mut view);
    }

    assert!(!manager.contains(id));
    assert!(query::flags(&world).contains(&point));
    assert_eq!(
        count_submitted(&world, |command| matches!(
            command,
            Command::CallSpecialist {
                flag,
                specialist: Specialist::Geologist,
            } if *flag == point
        )),
        2
    );
}

#[test]
fn connected_flags_call_geologists_directly() {
    let world = base().build();
    let view = refreshed(&world);
    let mut manager = ActionManager::default();

    let id = manager.request_geologists(&view, None, hq_flag(), 3);

    match manager.action(id) {
        Some(Action::Specialist(request)) => {
            assert_eq!(request.flag, hq_flag());
            assert_eq!(request.amount, 3);
        }
        other => panic!("expected a specialist request, got {other:?}"),
    }
    assert!(manager.is_empty(), "requests are queued by the caller");
}

#[test]
fn any_groups_try_alternatives_until_one_fits() {
    let connected = MapPoint::new(14, 12);
    let untried = MapPoint::new(10, 9);
    let mut world = base()
        .road(hq_flag(), &[Direction::East, Direction::East])
        .build();
    let mut view = refreshed(&world);
    let mut manager = ActionManager::default();

    let group = manager.create(None, Action::Group(GroupAction::new(GroupKind::Any)));
    let alternatives: Vec<_> = [MapPoint::new(22, 2), connected, untried]
        .into_iter()
        .map(|point| {
            manager.create(
                Some(group),
                Action::Building(BuildingRequest::at(BuildingType::Quarry, point)),
            )
        })
        .collect();
    manager.append(group);

    let _ = tick(&mut manager, &mut world, &mut view);
    assert_eq!(
        manager.status(alternatives[0]),
        Some(Status::Retry),
        "a refused site gets one more attempt"
    );
    for _ in 0..3 {
        let _ = tick(&mut manager, &mut world, &mut view);
    }

    assert_eq!(manager.status(alternatives[0]), Some(Status::Aborted));
    assert_eq!(manager.status(alternatives[1]), Some(Status::Success));
    assert_eq!(manager.status(alternatives[2]), Some(Status::Aborted));
    assert_eq!(manager.status(group), Some(Status::Success));
    assert_eq!(
        count_submitted(&world, |command| matches!(
            command,
            Command::SetBuildingSite { point, .. } if *point == untried
        )),
        0,
        "aborted alternatives never run"
    );
}
