use std::collections::BTreeSet;

use settler_ai_core::{Direction, MapExtent, MapPoint};
use settler_ai_model::{RoadConstraints, RouteKind, ScoreTuning, View};
use settler_ai_world::{Terrain, World, WorldBuilder};

fn extent() -> MapExtent {
    MapExtent::new(24, 24)
}

fn hq() -> MapPoint {
    MapPoint::new(12, 12)
}

fn hq_flag() -> MapPoint {
    MapPoint::new(12, 13)
}

fn refreshed(world: &World) -> View {
    let mut view = View::new(extent(), ScoreTuning::default());
    view.update(world, true);
    view
}

#[test]
fn route_costs_add_up_to_the_reported_score() {
    let lone = MapPoint::new(8, 16);
    let world = WorldBuilder::new(extent())
        .territory(hq(), 9)
        .headquarters(hq())
        .flag(lone)
        .build();
    let view = refreshed(&world);
    assert!(view.singleton_flags().contains(&lone));

    let outcome = view.find_connection_point(&world, &RoadConstraints::new(lone));

    assert_eq!(outcome.target, Some(hq_flag()), "only the HQ flag is connected");
    assert_eq!(outcome.route.len(), outcome.segment_costs.len());
    assert!(
        outcome.segment_costs.iter().all(|cost| *cost > 0),
        "no step is free: {:?}",
        outcome.segment_costs
    );
    let total: i64 = outcome.segment_costs.iter().sum();
    assert_eq!(Some(total), outcome.score.value());

    let end = extent()
        .route_points(lone, &outcome.route)
        .and_then(|points| points.last().copied());
    assert_eq!(end, Some(hq_flag()), "the route leads to the target");
}

#[test]
fn identical_snapshots_give_identical_routes() {
    let lone = MapPoint::new(16, 8);
    let world = WorldBuilder::new(extent())
        .territory(hq(), 9)
        .headquarters(hq())
        .flag(lone)
        .build();
    let view = refreshed(&world);
    let constraints = RoadConstraints::new(lone);

    let first = view.find_connection_point(&world, &constraints);
    let second = view.find_connection_point(&world, &constraints);
    let fresh = refreshed(&world).find_connection_point(&world, &constraints);

    assert!(first.is_found());
    assert_eq!(first.target, second.target);
    assert_eq!(first.route, second.route);
    assert_eq!(first.route, fresh.route, "a rebuilt model searches the same way");
}

#[test]
fn searches_without_a_way_out_report_not_found() {
    let lone = MapPoint::new(8, 16);
    let world = WorldBuilder::new(extent())
        .territory(hq(), 9)
        .headquarters(hq())
        .terrain(lone, 1, Terrain::Water)
        .terrain(lone, 0, Terrain::Meadow)
        .flag(lone)
        .build();
    let view = refreshed(&world);

    let outcome = view.find_connection_point(&world, &RoadConstraints::new(lone));

    assert!(!outcome.is_found());
    assert!(!outcome.score.is_valid());
    assert!(outcome.route.is_empty());
}

#[test]
fn components_cover_every_flag_once() {
    let lone = MapPoint::new(9, 8);
    let island = MapPoint::new(7, 15);
    let world = WorldBuilder::new(extent())
        .territory(hq(), 9)
        .headquarters(hq())
        .road(hq_flag(), &[Direction::East, Direction::East])
        .road(island, &[Direction::East, Direction::East])
        .flag(lone)
        .build();
    let view = refreshed(&world);

    let result = view.road_components(&world);

    assert_eq!(result.components.len(), 2, "{result:?}");
    assert_eq!(result.singletons, vec![lone]);

    let mut seen = BTreeSet::new();
    for flag in result.components.iter().flatten().chain(&result.singletons) {
        assert!(seen.insert(*flag), "{flag:?} reported twice");
    }
    assert_eq!(&seen, view.flags());

    let with_hq = result
        .components
        .iter()
        .find(|component| component.contains(&hq_flag()))
        .expect("HQ component");
    assert!(with_hq.contains(&MapPoint::new(14, 13)));
    assert!(!with_hq.contains(&island));
}

#[test]
fn road_connections_follow_existing_roads() {
    let far = MapPoint::new(16, 13);
    let world = WorldBuilder::new(extent())
        .territory(hq(), 9)
        .headquarters(hq())
        .road(hq_flag(), &[Direction::East, Direction::East])
        .road(MapPoint::new(14, 13), &[Direction::East, Direction::East])
        .build();
    let view = refreshed(&world);

    let constraints = RoadConstraints::new(far)
        .to(hq_flag())
        .kind(RouteKind::Shortest);
    let outcome = view.find_road_connection(&world, &constraints);

    assert_eq!(outcome.target, Some(hq_flag()));
    assert_eq!(outcome.route, vec![Direction::West; 4]);
    let step = ScoreTuning::default().penalties.route_segment;
    assert_eq!(outcome.score.value(), Some(4 * step));

    let nowhere = view.find_road_connection(&world, &RoadConstraints::new(far));
    assert!(!nowhere.is_found(), "road searches need a destination");
}

#[test]
fn road_connections_respect_the_cost_cap() {
    let far = MapPoint::new(16, 13);
    let world = WorldBuilder::new(extent())
        .territory(hq(), 9)
        .headquarters(hq())
        .road(hq_flag(), &[Direction::East, Direction::East])
        .road(MapPoint::new(14, 13), &[Direction::East, Direction::East])
        .build();
    let view = refreshed(&world);

    let step = ScoreTuning::default().penalties.route_segment;
    let constraints = RoadConstraints::new(far)
        .to(hq_flag())
        .kind(RouteKind::Shortest)
        .maximal_cost(3 * step);

    assert!(!view.find_road_connection(&world, &constraints).is_found());
}

#[test]
fn connection_lengths_cross_foreign_land() {
    let world = WorldBuilder::new(extent())
        .territory(hq(), 4)
        .headquarters(hq())
        .build();
    let mut view = refreshed(&world);

    let from = MapPoint::new(2, 2);
    let to = MapPoint::new(6, 2);
    assert_eq!(view.connection_length(&world, from, to), Some(4));
    assert_eq!(
        view.connection_length(&world, MapPoint::new(3, 2), to),
        Some(3),
        "intermediate nodes are answered from the cache"
    );
    assert_eq!(view.connection_length(&world, to, to), Some(0));
}

#[test]
fn unreachable_pairs_have_no_length() {
    let island = MapPoint::new(18, 18);
    let world = WorldBuilder::new(extent())
        .territory(hq(), 4)
        .headquarters(hq())
        .terrain(island, 2, Terrain::Water)
        .terrain(island, 0, Terrain::Meadow)
        .build();
    let mut view = refreshed(&world);

    assert_eq!(view.connection_length(&world, MapPoint::new(2, 2), island), None);
    assert_eq!(view.connection_length(&world, MapPoint::new(2, 2), island), None);
}

#[test]
fn precomputed_connections_are_symmetric() {
    let world = WorldBuilder::new(extent())
        .territory(hq(), 4)
        .headquarters(hq())
        .build();
    let mut view = refreshed(&world);

    view.precompute_connections(&world, MapPoint::new(2, 2));

    assert_eq!(
        view.connection_length(&world, MapPoint::new(7, 2), MapPoint::new(2, 2)),
        Some(5)
    );
    assert_eq!(
        view.connection_length(&world, MapPoint::new(2, 2), MapPoint::new(7, 2)),
        Some(5)
    );
}
