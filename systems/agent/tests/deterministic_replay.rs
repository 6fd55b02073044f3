use settler_ai_core::{BuildingType, Command, Direction, Event, MapExtent, MapPoint};
use settler_ai_system_actions::BuildingRequest;
use settler_ai_system_agent::{Agent, AgentConfig, PlayerTuning};
use settler_ai_world::{query, step, World, WorldBuilder};

#[test]
fn deterministic_replay_issues_identical_commands() {
    let first = replay();
    let second = replay();

    assert!(!first.commands.is_empty(), "the agent issued nothing");
    assert_eq!(first, second, "replay diverged between runs");
}

#[derive(Debug, PartialEq)]
struct ReplayOutcome {
    commands: Vec<Command>,
    events: Vec<Event>,
    buildings: Vec<(MapPoint, BuildingType, bool)>,
    acts: u64,
}

fn replay() -> ReplayOutcome {
    let extent = MapExtent::new(24, 24);
    let mut world = WorldBuilder::new(extent)
        .territory(MapPoint::new(12, 12), 9)
        .headquarters(MapPoint::new(12, 12))
        .road(MapPoint::new(12, 13), &[Direction::East, Direction::East])
        .building(MapPoint::new(14, 12), BuildingType::Woodcutter)
        .build();
    world.set_construction_ticks(3);
    world.set_wares(MapPoint::new(12, 13), 6);

    let config = AgentConfig {
        player: PlayerTuning {
            minimal_tick: 0,
            act_every: 1,
            ..PlayerTuning::default()
        },
        ..AgentConfig::default()
    };
    let mut agent = Agent::new(extent, config);
    let _ = agent.actions_mut().construct_building(
        &world,
        None,
        BuildingRequest::at(BuildingType::Quarry, MapPoint::new(8, 10)),
    );
    let _ = agent.request_geologists(MapPoint::new(16, 8), 2);

    let events = run(&mut agent, &mut world, 60);
    ReplayOutcome {
        commands: query::submitted_commands(&world).to_vec(),
        events,
        buildings: query::buildings(&world),
        acts: agent.acts(),
    }
}

fn run(agent: &mut Agent, world: &mut World, ticks: u64) -> Vec<Event> {
    let mut log = Vec::new();
    let mut events: Vec<Event> = Vec::new();
    for tick in 0..ticks {
        agent.on_tick(world, tick, true, &events);
        events.clear();
        step(world, &mut events);
        log.extend(events.iter().cloned());
    }
    log
}
