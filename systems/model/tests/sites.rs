use settler_ai_core::{
    BuildingQuality, BuildingType, Commodity, Engine, MapExtent, MapPoint, NodeObject, Resource, Score,
};
use settler_ai_model::{ScoreTuning, SiteConstraints, View};
use settler_ai_world::{World, WorldBuilder};

fn extent() -> MapExtent {
    MapExtent::new(24, 24)
}

fn hq() -> MapPoint {
    MapPoint::new(12, 12)
}

fn refreshed(world: &World) -> View {
    let mut view = View::new(extent(), ScoreTuning::default());
    view.update(world, true);
    view
}

#[test]
fn neighbouring_resources_add_fixed_penalties() {
    let site = MapPoint::new(8, 12);
    let world = WorldBuilder::new(extent())
        .territory(hq(), 9)
        .headquarters(hq())
        .object(MapPoint::new(7, 12), NodeObject::Tree { produces_wood: true })
        .object(MapPoint::new(9, 12), NodeObject::Granite { size: 3 })
        .build();
    let view = refreshed(&world);
    let penalties = ScoreTuning::default().penalties;

    let penalty = view.close_by_penalty(&world, site, BuildingQuality::Nothing, Some(site));

    assert_eq!(
        penalty,
        penalties.tree_on_neighbour + penalties.stone_on_neighbour,
        "the road node itself is the predecessor and no castle is spoiled"
    );
}

#[test]
fn already_connected_flags_cost_nothing() {
    let world = WorldBuilder::new(extent())
        .territory(hq(), 9)
        .headquarters(hq())
        .build();
    let mut view = refreshed(&world);

    assert_eq!(
        view.connection_penalty(&world, MapPoint::new(12, 13)),
        Score::ZERO
    );
}

#[test]
fn local_sums_read_the_centre_at_radius_zero() {
    let granite = MapPoint::new(9, 12);
    let world = WorldBuilder::new(extent())
        .territory(hq(), 9)
        .headquarters(hq())
        .object(granite, NodeObject::Granite { size: 3 })
        .object(MapPoint::new(9, 14), NodeObject::Granite { size: 2 })
        .build();
    let mut view = refreshed(&world);

    assert_eq!(view.sum_local(&world, granite, 0, Resource::Stone, false), 3);
    assert_eq!(view.sum_local(&world, granite, 2, Resource::Stone, false), 5);
    assert_eq!(view.sum_local(&world, granite, 2, Resource::Stone, true), 5);
}

#[test]
fn military_sites_inside_existing_influence_are_rejected() {
    let world = WorldBuilder::new(extent())
        .territory(hq(), 9)
        .headquarters(hq())
        .build();
    let mut view = refreshed(&world);

    let score = view.location_score(&world, MapPoint::new(12, 15), BuildingType::Guardhouse);
    assert!(!score.is_valid(), "the headquarters already covers this site");
}

#[test]
fn quarries_are_placed_next_to_stone() {
    let granite = MapPoint::new(8, 11);
    let world = WorldBuilder::new(extent())
        .territory(hq(), 9)
        .headquarters(hq())
        .object(granite, NodeObject::Granite { size: 6 })
        .build();
    let mut view = refreshed(&world);

    let (site, score) = view
        .find_building_position(&world, &SiteConstraints::new(BuildingType::Quarry))
        .expect("a quarry site exists");

    assert!(score.is_valid());
    assert!(
        extent().distance(site, granite) <= 5,
        "{site:?} is out of reach of the stone"
    );
    assert!(world
        .building_quality(site)
        .can_use(BuildingType::Quarry.quality()));
    assert_eq!(
        view.building_score(&world, site, BuildingType::Quarry),
        score,
        "scores are cached per site and building"
    );
}

#[test]
fn hopeless_requests_halve_the_local_counters() {
    let world = WorldBuilder::new(extent())
        .territory(hq(), 9)
        .headquarters(hq())
        .build();
    let mut view = refreshed(&world);
    view.global_mut()[Resource::Stone] = 10;

    let found = view.find_building_position(&world, &SiteConstraints::new(BuildingType::Quarry));

    assert!(found.is_none());
    assert_eq!(
        view.global()[Resource::Stone],
        2,
        "each of the two stone consumptions halves the counter"
    );
}

#[test]
fn close_to_limits_the_search_area() {
    let granite = MapPoint::new(8, 11);
    let world = WorldBuilder::new(extent())
        .territory(hq(), 9)
        .headquarters(hq())
        .object(granite, NodeObject::Granite { size: 6 })
        .build();
    let mut view = refreshed(&world);

    let far_away = SiteConstraints::new(BuildingType::Quarry).near(MapPoint::new(17, 16), 2);
    assert!(view.find_building_position(&world, &far_away).is_none());

    let nearby = SiteConstraints::new(BuildingType::Quarry).near(granite, 4);
    let (site, _) = view
        .find_building_position(&world, &nearby)
        .expect("a site close to the stone");
    assert!(extent().distance(site, granite) <= 4);
}

#[test]
fn only_important_commodities_get_slack() {
    let world = WorldBuilder::new(extent())
        .territory(hq(), 9)
        .headquarters(hq())
        .build();
    let mut view = refreshed(&world);

    view.global_mut()[Commodity::Grain] = 0;
    assert!(!view.meets_global_consumption(BuildingType::Mill, 0));
    assert!(view.meets_global_consumption(BuildingType::Mill, 1));

    view.global_mut()[Commodity::Wood] = 1;
    assert!(
        !view.meets_global_consumption(BuildingType::Sawmill, 5),
        "wood is not important"
    );
    view.global_mut()[Commodity::Wood] = 2;
    assert!(view.meets_global_consumption(BuildingType::Sawmill, 0));
}
