#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! World model of the settlement agent.
//!
//! [`View`] mirrors the map as a grid of [`Location`]s, each carrying local
//! counters for resources, commodities and derived concepts, together with
//! player-wide global counters. Registered buildings feed their declared
//! effects from the [`Catalog`] into both. On top of that state the model
//! scores building sites and searches road connections.

mod catalog;
mod location;
mod record;
mod scoring;
mod search;
mod tuning;

use std::collections::{BTreeMap, BTreeSet, HashMap};

use settler_ai_core::{
    BuildingQuality, BuildingType, Concept, DepositKind, Direction, Engine, MapExtent, MapPoint,
    NodeObject, Owner, Resource, Score, Thing, Tracker,
};
use tracing::{debug, warn};

pub use catalog::{BuildingEffect, BuildingInfo, Catalog, EffectKind, Scope, HARD_CONSTRAINT};
pub use location::Location;
pub use record::BuildingRecord;
pub use scoring::SiteConstraints;
pub use search::{Lifetime, RoadComponents, RoadConstraints, RouteKind, SearchOutcome};
pub use tuning::{Penalties, QualityScores, ScoreTuning};

const NEAR_UNOWNED_RADIUS: u32 = 10;
const NEAR_BORDER_RADIUS: u32 = 4;
const FISH_SHORE_RADIUS: u32 = 2;
const FISH_SPREAD_RADIUS: u32 = 6;
const QUARRY_REACH: u32 = 8;
const WOODCUTTER_REACH: u32 = 5;
const MAX_MOUNTAINS: usize = 11;
const MOUNTAIN_SCORE_RADIUS: u32 = 10;
const MOUNTAIN_SPACING: u32 = 30;

/// Bounding box of every node seen so far.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Frame {
    min: (u16, u16),
    max: (u16, u16),
}

impl Frame {
    const fn around(point: MapPoint) -> Self {
        Self {
            min: (point.x(), point.y()),
            max: (point.x(), point.y()),
        }
    }

    fn include(&mut self, point: MapPoint) {
        self.min = (self.min.0.min(point.x()), self.min.1.min(point.y()));
        self.max = (self.max.0.max(point.x()), self.max.1.max(point.y()));
    }

    fn points(&self) -> Vec<MapPoint> {
        (self.min.1..=self.max.1)
            .flat_map(|y| (self.min.0..=self.max.0).map(move |x| MapPoint::new(x, y)))
            .collect()
    }
}

/// The agent's model of the map.
#[derive(Debug)]
pub struct View {
    extent: MapExtent,
    tuning: ScoreTuning,
    locations: Vec<Location>,
    global: Tracker,
    buildings: BTreeMap<BuildingType, BTreeMap<MapPoint, BuildingRecord>>,
    flags: BTreeSet<MapPoint>,
    singleton_flags: BTreeSet<MapPoint>,
    potential_sites: BTreeSet<MapPoint>,
    location_scores: HashMap<(MapPoint, BuildingType), Score>,
    building_scores: HashMap<(MapPoint, BuildingType), Score>,
    connection_scores: HashMap<MapPoint, Score>,
    connection_lengths: HashMap<(MapPoint, MapPoint), Option<u32>>,
    requires_full_update: bool,
    visible_frame: Option<Frame>,
    headquarters: Option<MapPoint>,
    enemy_headquarters: Vec<MapPoint>,
    mountains: Option<Vec<MapPoint>>,
    full_updates: u64,
}

impl View {
    /// Creates an empty model for a map of the given size.
    #[must_use]
    pub fn new(extent: MapExtent, tuning: ScoreTuning) -> Self {
        Self {
            extent,
            tuning,
            locations: vec![Location::default(); extent.node_count()],
            global: Tracker::new(),
            buildings: BTreeMap::new(),
            flags: BTreeSet::new(),
            singleton_flags: BTreeSet::new(),
            potential_sites: BTreeSet::new(),
            location_scores: HashMap::new(),
            building_scores: HashMap::new(),
            connection_scores: HashMap::new(),
            connection_lengths: HashMap::new(),
            requires_full_update: true,
            visible_frame: None,
            headquarters: None,
            enemy_headquarters: Vec::new(),
            mountains: None,
            full_updates: 0,
        }
    }

    /// Bounds of the modelled map.
    #[must_use]
    pub const fn extent(&self) -> MapExtent {
        self.extent
    }

    /// Scoring weights in use.
    #[must_use]
    pub const fn tuning(&self) -> &ScoreTuning {
        &self.tuning
    }

    /// Model state of a node.
    #[must_use]
    pub fn location(&self, point: MapPoint) -> Option<&Location> {
        self.extent
            .index(point)
            .and_then(|index| self.locations.get(index))
    }

    fn location_mut(&mut self, point: MapPoint) -> Option<&mut Location> {
        self.extent
            .index(point)
            .and_then(|index| self.locations.get_mut(index))
    }

    /// Local counter of a thing at a node, zero outside the map.
    #[must_use]
    pub fn local(&self, point: MapPoint, thing: impl Into<Thing>) -> i32 {
        self.location(point)
            .map_or(0, |location| location.value(thing))
    }

    /// Player-wide counters.
    #[must_use]
    pub const fn global(&self) -> &Tracker {
        &self.global
    }

    /// Mutable player-wide counters.
    pub fn global_mut(&mut self) -> &mut Tracker {
        &mut self.global
    }

    /// Every own flag seen by the last refresh or registered since.
    #[must_use]
    pub const fn flags(&self) -> &BTreeSet<MapPoint> {
        &self.flags
    }

    /// Whether the model knows a flag at the point.
    #[must_use]
    pub fn is_flag(&self, point: MapPoint) -> bool {
        self.flags.contains(&point)
    }

    /// Whether the point is a known flag that is part of the road network.
    #[must_use]
    pub fn is_connected_flag(&self, point: MapPoint) -> bool {
        self.flags.contains(&point) && !self.singleton_flags.contains(&point)
    }

    /// Flags with at most one road and nothing worth serving attached.
    #[must_use]
    pub const fn singleton_flags(&self) -> &BTreeSet<MapPoint> {
        &self.singleton_flags
    }

    /// Records a flag confirmed by the engine.
    pub fn insert_flag(&mut self, point: MapPoint) {
        let _ = self.flags.insert(point);
    }

    /// Drops a flag from the model.
    pub fn forget_flag(&mut self, point: MapPoint) {
        let _ = self.flags.remove(&point);
        let _ = self.singleton_flags.remove(&point);
    }

    /// Free nodes that can host at least a hut.
    #[must_use]
    pub const fn potential_sites(&self) -> &BTreeSet<MapPoint> {
        &self.potential_sites
    }

    /// Registered buildings of one type in point order.
    pub fn buildings(
        &self,
        building: BuildingType,
    ) -> impl Iterator<Item = (MapPoint, &BuildingRecord)> + '_ {
        self.buildings
            .get(&building)
            .into_iter()
            .flat_map(|records| records.iter().map(|(point, record)| (*point, record)))
    }

    /// Number of registered buildings of one type.
    #[must_use]
    pub fn building_count(&self, building: BuildingType) -> usize {
        self.buildings.get(&building).map_or(0, BTreeMap::len)
    }

    /// Registered building at a point.
    #[must_use]
    pub fn building_at(&self, point: MapPoint) -> Option<BuildingType> {
        self.buildings
            .iter()
            .find(|(_, records)| records.contains_key(&point))
            .map(|(building, _)| *building)
    }

    fn is_registered(&self, point: MapPoint, building: BuildingType) -> bool {
        self.buildings
            .get(&building)
            .is_some_and(|records| records.contains_key(&point))
    }

    fn any_registered_within(&self, building: BuildingType, point: MapPoint, reach: u32) -> bool {
        self.buildings(building)
            .any(|(other, _)| self.extent.distance(point, other) <= reach)
    }

    pub(crate) fn is_military_at(&self, point: MapPoint) -> bool {
        BuildingType::ALL
            .iter()
            .filter(|building| building.is_military())
            .any(|building| self.is_registered(point, *building))
    }

    /// Flags of every registered warehouse.
    #[must_use]
    pub fn warehouse_flags(&self) -> Vec<MapPoint> {
        self.buildings
            .iter()
            .filter(|(building, _)| building.is_warehouse())
            .flat_map(|(_, records)| records.keys())
            .filter_map(|point| self.extent.flag_of(*point))
            .collect()
    }

    /// Whether a registered warehouse is attached to the flag.
    #[must_use]
    pub fn is_warehouse_flag(&self, flag: MapPoint) -> bool {
        self.extent
            .building_of(flag)
            .and_then(|point| self.building_at(point))
            .is_some_and(BuildingType::is_warehouse)
    }

    /// Own headquarters as of the last refresh.
    #[must_use]
    pub const fn headquarters(&self) -> Option<MapPoint> {
        self.headquarters
    }

    /// Known enemy headquarters as of the last refresh.
    #[must_use]
    pub fn enemy_headquarters(&self) -> &[MapPoint] {
        &self.enemy_headquarters
    }

    /// Centres of the discovered mountain clusters.
    #[must_use]
    pub fn mountains(&self) -> &[MapPoint] {
        self.mountains.as_deref().unwrap_or(&[])
    }

    /// Number of full refreshes performed.
    #[must_use]
    pub const fn full_updates(&self) -> u64 {
        self.full_updates
    }

    /// Whether the next refresh rebuilds the model from scratch.
    #[must_use]
    pub const fn requires_full_update(&self) -> bool {
        self.requires_full_update
    }

    /// Forces the next refresh to rebuild the model from scratch.
    pub fn request_full_update(&mut self) {
        self.requires_full_update = true;
    }

    /// Drops cached scores. A full invalidation also drops location scores.
    pub fn invalidate(&mut self, full: bool) {
        self.connection_scores.clear();
        self.building_scores.clear();
        if full {
            self.location_scores.clear();
        }
    }

    pub(crate) fn add_local(
        &mut self,
        center: MapPoint,
        radius: u32,
        thing: impl Into<Thing>,
        amount: i32,
    ) {
        let thing = thing.into();
        for point in self.extent.points_in_radius(center, radius) {
            if let Some(location) = self.location_mut(point) {
                *location.value_mut(thing) += amount;
            }
        }
    }

    fn set_local(&mut self, center: MapPoint, radius: u32, thing: impl Into<Thing>, value: i32) {
        let thing = thing.into();
        for point in self.extent.points_in_radius(center, radius) {
            if let Some(location) = self.location_mut(point) {
                *location.value_mut(thing) = value;
            }
        }
    }

    /// Rebuilds the model from the engine.
    ///
    /// A partial refresh rescans only the bounding box of nodes seen so far
    /// and keeps global resource counts; a full refresh rescans the whole
    /// map and recounts them. Registered buildings are always dropped and
    /// re-registered from what the scan finds.
    pub fn update(&mut self, engine: &dyn Engine, full: bool) {
        let full = full || self.requires_full_update || self.visible_frame.is_none();
        self.requires_full_update = false;
        if full {
            self.full_updates += 1;
        }

        self.clear_map_info(full);
        self.headquarters = engine.headquarters();
        self.enemy_headquarters = engine.enemy_headquarters();

        let points = match (full, self.visible_frame) {
            (false, Some(frame)) => frame.points(),
            _ => self.extent.points().collect(),
        };

        for location in &mut self.locations {
            location.military_influence = 0;
        }
        for point in &points {
            self.refresh_visibility(engine, *point);
        }
        for point in &points {
            self.update_location(engine, *point, full);
        }

        let registered: Vec<(BuildingType, MapPoint)> = self
            .buildings
            .iter()
            .flat_map(|(building, records)| records.keys().map(|point| (*building, *point)))
            .collect();
        for (building, point) in &registered {
            self.init_building(*point, *building);
            if self.local(*point, Concept::FarmSpace) != 0
                || self.local(*point, Concept::TreeSpace) != 0
            {
                let _ = self.potential_sites.remove(point);
            }
        }
        for (building, point) in registered {
            if building.can_pause_production() && engine.is_production_disabled(point) {
                continue;
            }
            let has_resources = self.check_building(point, building);
            if let Some(record) = self
                .buildings
                .get_mut(&building)
                .and_then(|records| records.get_mut(&point))
            {
                record.set_has_required_resources(has_resources);
            }
        }

        if full && self.mountains.is_none() {
            self.precompute_strategic_points(engine);
        }

        debug!(
            full,
            flags = self.flags.len(),
            singletons = self.singleton_flags.len(),
            sites = self.potential_sites.len(),
            "model refreshed"
        );
    }

    fn clear_map_info(&mut self, full: bool) {
        self.flags.clear();
        self.singleton_flags.clear();
        self.potential_sites.clear();

        let registered: Vec<(BuildingType, MapPoint)> = self
            .buildings
            .iter()
            .flat_map(|(building, records)| records.keys().map(|point| (*building, *point)))
            .collect();
        for (building, point) in registered {
            self.destroy_building(point, building);
        }
        self.buildings.clear();

        if full {
            self.global.clear();
        }
        self.invalidate(full);
    }

    fn refresh_visibility(&mut self, engine: &dyn Engine, point: MapPoint) {
        let visible = engine.is_visible(point);
        let surveyed = engine.object(point) == NodeObject::Sign;
        if let Some(location) = self.location_mut(point) {
            location.visible = visible;
            location.visited_by_scout |= surveyed;
            if visible {
                location.reset();
            }
        }
        if visible {
            match self.visible_frame.as_mut() {
                Some(frame) => frame.include(point),
                None => self.visible_frame = Some(Frame::around(point)),
            }
        }
    }

    fn update_location(&mut self, engine: &dyn Engine, point: MapPoint, globals: bool) {
        let any_quality = engine.building_quality_any_owner(point);
        if any_quality == BuildingQuality::Mine {
            self.set_local(point, 1, Concept::MineSpace, 1);
        }

        let visible = self.location(point).is_some_and(Location::is_visible);
        if !visible {
            if any_quality != BuildingQuality::Nothing && !engine.is_water(point) {
                if let Some(location) = self.location_mut(point) {
                    *location.value_mut(Concept::Hidden) = 1;
                }
                if globals {
                    self.global[Concept::Hidden] += 1;
                }
            }
            return;
        }

        self.update_resources(engine, point, globals);

        if self.local(point, Concept::Owned) == 0 || !engine.has_flag(point) {
            return;
        }
        let _ = self.flags.insert(point);
        if self.is_singleton(engine, point) {
            let _ = self.singleton_flags.insert(point);
        }
    }

    fn is_singleton(&self, engine: &dyn Engine, flag: MapPoint) -> bool {
        let roads = self.connected_roads(engine, flag);
        if roads == 0 {
            return true;
        }
        roads == 1
            && self
                .extent
                .building_of(flag)
                .map(|point| engine.object(point))
                .is_some_and(|object| match object {
                    NodeObject::Site(_) => true,
                    NodeObject::Building(building) => !building.is_warehouse(),
                    _ => false,
                })
    }

    fn update_resources(&mut self, engine: &dyn Engine, point: MapPoint, globals: bool) {
        let _ = self.potential_sites.remove(&point);

        let object = engine.object(point);
        let quality = engine.building_quality(point);
        if !engine.is_on_road(point) {
            match object {
                NodeObject::Nothing | NodeObject::Environment => {
                    if quality > BuildingQuality::Flag {
                        let _ = self.potential_sites.insert(point);
                    }
                    if quality > BuildingQuality::Hut && engine.is_vital(point) {
                        self.set_local(point, 0, Resource::PlantSpace, 1);
                        if globals {
                            self.global[Resource::PlantSpace] += 1;
                        }
                    }
                }
                NodeObject::Fire if globals => self.global[Concept::BurnSite] += 1,
                _ => {}
            }
        }

        let owner = engine.owner(point);
        let own = engine.is_water(point) || owner == Owner::Own;
        self.set_local(point, 0, Concept::Owned, i32::from(own));
        self.set_local(point, 0, Concept::Unowned, i32::from(!own));
        if own {
            if globals {
                self.global[Concept::Owned] += 1;
            }
            if let Some(building) = engine.building_at(point) {
                if !self.is_registered(point, building) {
                    self.register_new_building(point, building);
                }
            }
        } else {
            self.add_local(point, NEAR_UNOWNED_RADIUS, Concept::NearUnowned, 1);
            if owner == Owner::Enemy {
                self.set_local(point, 0, Concept::Enemy, 1);
                if globals {
                    self.global[Concept::Enemy] += 1;
                }
            }
        }

        if engine.has_border_stone(point) {
            self.add_local(point, NEAR_BORDER_RADIUS, Concept::NearBorder, 1);
            self.set_local(point, 0, Resource::BorderLand, 1);
            if globals {
                self.global[Resource::BorderLand] += 1;
            }
        }

        let surveyed = self
            .location(point)
            .is_some_and(Location::visited_by_scout);
        match engine.deposit(point) {
            Some(deposit) if deposit.kind == DepositKind::Fish => {
                self.distribute_fish(engine, point, deposit.amount, globals);
            }
            Some(deposit) if surveyed => {
                let resource = match deposit.kind {
                    DepositKind::Iron => Resource::IronOre,
                    DepositKind::Gold => Resource::Gold,
                    DepositKind::Coal => Resource::Coal,
                    DepositKind::Granite => Resource::Granite,
                    DepositKind::Water | DepositKind::Fish => Resource::Water,
                };
                let amount = i32::from(deposit.amount);
                self.set_local(point, 0, resource, amount);
                if globals {
                    self.global[resource] += amount;
                }
            }
            _ => {}
        }

        match object {
            NodeObject::Granite { size } => {
                self.set_local(point, 0, Resource::Stone, i32::from(size));
                if globals && !self.any_registered_within(BuildingType::Quarry, point, QUARRY_REACH)
                {
                    self.global[Resource::Stone] += 1;
                }
            }
            NodeObject::Tree { produces_wood: true } => {
                self.set_local(point, 0, Resource::Tree, 1);
                if globals
                    && !self.any_registered_within(BuildingType::Woodcutter, point, WOODCUTTER_REACH)
                {
                    self.global[Resource::Tree] += 1;
                }
            }
            _ => {}
        }

        if engine.has_huntable_animal(point) {
            self.set_local(point, 0, Resource::Animal, 1);
            if globals {
                self.global[Resource::Animal] += 2;
            }
        }
    }

    // Spreads twice the fish amount, one unit at a time, over hut-capable
    // nodes near the shore of the fishing ground.
    fn distribute_fish(&mut self, engine: &dyn Engine, point: MapPoint, amount: u8, globals: bool) {
        let shore: Vec<MapPoint> = self
            .extent
            .points_in_radius(point, FISH_SHORE_RADIUS)
            .into_iter()
            .filter(|circle| engine.is_node_reachable(*circle))
            .collect();

        let mut remaining = i32::from(amount) * 2;
        let mut last = remaining + 1;
        while remaining > 0 && last != remaining {
            last = remaining;
            for walkable in &shore {
                for target in self.extent.points_in_radius(*walkable, FISH_SPREAD_RADIUS) {
                    if remaining <= 0 {
                        break;
                    }
                    if !engine
                        .building_quality_any_owner(target)
                        .can_use(BuildingQuality::Hut)
                    {
                        continue;
                    }
                    self.add_local(target, 0, Resource::Fish, 1);
                    remaining -= 1;
                }
            }
        }

        if globals && remaining <= 0 {
            self.global[Resource::Fish] += i32::from(amount);
        }
    }

    fn precompute_strategic_points(&mut self, engine: &dyn Engine) {
        let extent = self.extent;
        let mine_points: Vec<MapPoint> = extent
            .points()
            .filter(|point| engine.building_quality_any_owner(*point) == BuildingQuality::Mine)
            .collect();
        let mut candidates: Vec<(MapPoint, usize)> = mine_points
            .iter()
            .map(|point| {
                let density = mine_points
                    .iter()
                    .filter(|other| extent.distance(*point, **other) <= MOUNTAIN_SCORE_RADIUS)
                    .count();
                (*point, density)
            })
            .collect();

        let mut mountains = Vec::new();
        while mountains.len() < MAX_MOUNTAINS {
            let best = candidates
                .iter()
                .fold(None::<(MapPoint, usize)>, |best, candidate| match best {
                    Some(current) if current.1 >= candidate.1 => Some(current),
                    _ => Some(*candidate),
                });
            let Some((centre, _)) = best else {
                break;
            };
            mountains.push(centre);
            candidates.retain(|(point, _)| extent.distance(centre, *point) > MOUNTAIN_SPACING);
        }

        debug!(count = mountains.len(), "mountain clusters found");
        let sources: Vec<MapPoint> = mountains
            .iter()
            .copied()
            .chain(self.enemy_headquarters.iter().copied())
            .collect();
        self.mountains = Some(mountains);
        for source in sources {
            self.precompute_connections(engine, source);
        }
    }

    /// Registers a building found on own land or confirmed by the engine.
    pub fn register_new_building(&mut self, point: MapPoint, building: BuildingType) {
        debug!(?point, ?building, "building registered");
        let previous = self
            .buildings
            .entry(building)
            .or_default()
            .insert(point, BuildingRecord::new(building));
        debug_assert!(previous.is_none(), "building registered twice");
        let _ = self.potential_sites.remove(&point);
    }

    /// Notes the loss of a building.
    ///
    /// The record is kept until the next refresh, which is forced to be a
    /// full one.
    pub fn register_lost_building(&mut self, point: MapPoint, building: BuildingType) {
        if !self.is_registered(point, building) {
            debug!(?point, ?building, "lost building was not registered");
            return;
        }
        self.requires_full_update = true;
    }

    /// Removes a building record immediately, reversing its global effects.
    pub fn unregister_building(&mut self, point: MapPoint, building: BuildingType) -> bool {
        let removed = self
            .buildings
            .get_mut(&building)
            .and_then(|records| records.remove(&point))
            .is_some();
        if removed {
            self.destroy_building(point, building);
            self.invalidate(false);
        }
        removed
    }

    /// Accounts for a building that exhausted its natural resources.
    ///
    /// Local consumptions are zeroed within their radius and global
    /// consumptions are decremented, so the site and its neighbourhood stop
    /// looking attractive for the same building type.
    pub fn register_out_of_resources(&mut self, point: MapPoint, building: BuildingType) {
        debug!(?point, ?building, "building out of resources");
        for consumption in Catalog::shared().info(building).consumptions() {
            if consumption.is_local() {
                self.set_local(point, consumption.radius(), consumption.thing, 0);
            } else {
                self.global[consumption.thing] -= 1;
            }
        }
        self.invalidate(true);
    }

    /// Number of roads ending at the point, counting a building's door link.
    #[must_use]
    pub fn connected_roads(&self, engine: &dyn Engine, point: MapPoint) -> usize {
        Direction::ALL
            .iter()
            .filter(|direction| {
                self.extent
                    .neighbour(point, **direction)
                    .is_some_and(|next| engine.has_road(next, direction.reverse()))
            })
            .count()
    }

    /// Whether a flag could be placed at the point.
    #[must_use]
    pub fn can_build_flag(&self, engine: &dyn Engine, point: MapPoint) -> bool {
        engine.building_quality(point).can_use(BuildingQuality::Flag)
    }

    /// Demolishes a known flag and every flag its roads lead to that may go
    /// as well.
    ///
    /// The flag is refused when more than `allowed_roads` roads end at it
    /// (one more when `destroy_building` is set), or when a building is
    /// attached and `destroy_building` is not set. `destroy_building` only
    /// covers this flag; reached flags keep their buildings, and those that
    /// refuse have the connecting road removed from their side instead.
    /// Reports whether anything was submitted.
    pub fn destroy_flag(
        &mut self,
        engine: &mut dyn Engine,
        point: MapPoint,
        allowed_roads: usize,
        destroy_building: bool,
        came_from: Option<Direction>,
    ) -> bool {
        if !self.flags.contains(&point) {
            return false;
        }
        if self.connected_roads(&*engine, point) > allowed_roads + usize::from(destroy_building) {
            return false;
        }
        let has_building = self
            .extent
            .building_of(point)
            .is_some_and(|building| engine.building_at(building).is_some());
        if has_building && !destroy_building {
            return false;
        }

        if let Err(rejection) = engine.submit(settler_ai_core::Command::DestroyFlag { point }) {
            warn!(?point, %rejection, "flag demolition refused");
            return false;
        }
        self.forget_flag(point);

        let allowed_roads = allowed_roads + usize::from(came_from.is_none());
        let _ = self.follow_road_and_destroy_flags(engine, point, allowed_roads, came_from);
        true
    }

    fn follow_road_and_destroy_flags(
        &mut self,
        engine: &mut dyn Engine,
        road_point: MapPoint,
        allowed_roads: usize,
        came_from: Option<Direction>,
    ) -> bool {
        let mut changed = false;
        for direction in Direction::ALL {
            if came_from.is_some_and(|from| from.reverse() == direction) {
                continue;
            }
            if !engine.has_road(road_point, direction) {
                continue;
            }
            let Some(next) = self.extent.neighbour(road_point, direction) else {
                continue;
            };
            if engine.has_flag(next) {
                if self.destroy_flag(engine, next, allowed_roads, false, Some(direction)) {
                    changed = true;
                } else {
                    let command = settler_ai_core::Command::DestroyRoad {
                        flag: next,
                        direction: direction.reverse(),
                    };
                    changed |= engine.submit(command).is_ok();
                }
            } else {
                changed |=
                    self.follow_road_and_destroy_flags(engine, next, allowed_roads, Some(direction));
            }
        }
        changed
    }
}
