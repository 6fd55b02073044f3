use settler_ai_core::{BuildingType, Commodity, Direction, Event, MapExtent, MapPoint};
use settler_ai_system_actions::{BuildingRequest, Status};
use settler_ai_system_agent::{Agent, AgentConfig, PlayerTuning};
use settler_ai_world::{query, step, World, WorldBuilder};

fn extent() -> MapExtent {
    MapExtent::new(24, 24)
}

fn hq() -> MapPoint {
    MapPoint::new(12, 12)
}

fn eager() -> AgentConfig {
    AgentConfig {
        player: PlayerTuning {
            minimal_tick: 0,
            act_every: 1,
            ..PlayerTuning::default()
        },
        ..AgentConfig::default()
    }
}

fn settlement() -> World {
    let mut world = WorldBuilder::new(extent())
        .territory(hq(), 9)
        .headquarters(hq())
        .road(MapPoint::new(12, 13), &[Direction::East, Direction::East])
        .building(MapPoint::new(14, 12), BuildingType::Woodcutter)
        .build();
    world.set_construction_ticks(3);
    world
}

// Feeds the agent the events of the previous step, then steps the world.
fn run(agent: &mut Agent, world: &mut World, ticks: std::ops::Range<u64>) {
    let mut events: Vec<Event> = Vec::new();
    for tick in ticks {
        agent.on_tick(world, tick, true, &events);
        events.clear();
        step(world, &mut events);
    }
}

#[test]
fn acts_only_on_eligible_authoritative_ticks() {
    let mut world = settlement();
    let config = AgentConfig {
        player: PlayerTuning {
            minimal_tick: 10,
            act_every: 3,
            ..PlayerTuning::default()
        },
        ..AgentConfig::default()
    };
    let mut agent = Agent::new(extent(), config);

    for tick in 0..20 {
        agent.on_tick(&mut world, tick, false, &[]);
    }
    assert_eq!(agent.acts(), 0, "replayed ticks never act");

    for tick in 0..20 {
        agent.on_tick(&mut world, tick, true, &[]);
    }
    assert_eq!(agent.acts(), 4, "ticks 10, 13, 16 and 19 act");
}

#[test]
fn requested_buildings_get_built_and_connected() {
    let site = MapPoint::new(8, 10);
    let mut world = settlement();
    let mut agent = Agent::new(extent(), eager());
    let id = agent.actions_mut().construct_building(
        &world,
        None,
        BuildingRequest::at(BuildingType::Quarry, site),
    );

    run(&mut agent, &mut world, 0..30);

    assert!(!agent.actions().contains(id), "finished requests are released");
    assert!(agent.actions().is_empty());
    assert!(
        query::buildings(&world).contains(&(site, BuildingType::Quarry, true)),
        "quarry stands: {:?}",
        query::buildings(&world)
    );
    let flag = extent().flag_of(site).expect("site has a flag");
    assert!(agent.view().is_connected_flag(flag));
    assert_eq!(agent.pending_commissionings(), 0);
}

#[test]
fn occupied_military_buildings_refresh_the_model() {
    let site = MapPoint::new(8, 10);
    let mut world = settlement();
    let mut agent = Agent::new(extent(), eager());
    let _ = agent.actions_mut().construct_building(
        &world,
        None,
        BuildingRequest::at(BuildingType::Guardhouse, site),
    );

    let mut events: Vec<Event> = Vec::new();
    let mut waited = false;
    for tick in 0..90 {
        agent.on_tick(&mut world, tick, true, &events);
        if agent.pending_commissionings() == 1 {
            waited = true;
            assert_eq!(agent.view().full_updates(), 1, "no refresh before occupation");
        }
        events.clear();
        step(&mut world, &mut events);
    }

    assert!(waited, "the guardhouse waited for its soldiers");
    assert_eq!(agent.pending_commissionings(), 0);
    assert!(agent.view().full_updates() >= 2, "occupation rebuilt the model");
}

#[test]
fn exhausted_resource_buildings_are_demolished() {
    let mut world = settlement();
    let mut agent = Agent::new(extent(), eager());
    let woodcutter = MapPoint::new(14, 12);

    agent.on_tick(
        &mut world,
        0,
        false,
        &[
            Event::BuildingOutOfResources {
                point: woodcutter,
                building: BuildingType::Woodcutter,
            },
            Event::BuildingOutOfResources {
                point: MapPoint::new(5, 5),
                building: BuildingType::Sawmill,
            },
        ],
    );

    assert_eq!(agent.actions().len(), 1, "only the woodcutter goes");
    run(&mut agent, &mut world, 1..4);
    assert!(
        !query::buildings(&world)
            .iter()
            .any(|(point, _, _)| *point == woodcutter),
        "woodcutter demolished"
    );
}

#[test]
fn failed_requests_reset_their_global_counter() {
    let mut world = settlement();
    world.forbid(BuildingType::Sawmill);
    let mut agent = Agent::new(extent(), eager());
    run(&mut agent, &mut world, 0..1);

    agent.view_mut().global_mut()[Commodity::Boards] = 7;
    let id = agent.request_building(&world, BuildingType::Sawmill);
    assert_eq!(agent.actions().status(id), Some(Status::Failed));
    agent.reset_global_on_failure(id, Commodity::Boards);

    agent.on_tick(&mut world, 1, true, &[]);

    assert!(!agent.actions().contains(id));
    assert_eq!(agent.view().global()[Commodity::Boards], 0);
}

#[test]
fn successful_requests_keep_their_global_counter() {
    let mut world = settlement();
    let mut agent = Agent::new(extent(), eager());
    run(&mut agent, &mut world, 0..1);

    agent.view_mut().global_mut()[Commodity::Boards] = 7;
    let id = agent.actions_mut().destroy_building(MapPoint::new(14, 12));
    agent.reset_global_on_failure(id, Commodity::Boards);

    // The world is not stepped, so no refresh can recount the counter.
    agent.on_tick(&mut world, 1, true, &[]);
    assert_eq!(agent.actions().status(id), Some(Status::Success));
    agent.on_tick(&mut world, 2, true, &[]);

    assert!(!agent.actions().contains(id));
    assert_eq!(agent.view().global()[Commodity::Boards], 7);
}

#[test]
fn lost_land_forces_a_full_refresh() {
    let mut world = settlement();
    let mut agent = Agent::new(extent(), eager());
    run(&mut agent, &mut world, 0..2);
    assert_eq!(agent.view().full_updates(), 1);

    agent.on_tick(
        &mut world,
        2,
        true,
        &[Event::LandLost {
            point: MapPoint::new(20, 20),
        }],
    );

    assert_eq!(agent.view().full_updates(), 2);
}
