#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative settlement world used to drive the agent.
//!
//! The world keeps terrain, ownership, objects and roads for a single
//! observing player. Commands arriving through the [`Engine`] trait are
//! validated immediately and queued; [`step`] applies them in submission
//! order, advances construction and reports the outcome as [`Event`]s. This
//! mirrors the asynchronous command/notification cycle of a real game
//! engine while staying fully deterministic.

mod builder;
mod roads;

use std::collections::{BTreeMap, BTreeSet};

use settler_ai_core::{
    BuildingQuality, BuildingType, Command, CommandRejected, Deposit, Direction, Engine, Event,
    MapExtent, MapPoint, NodeObject, Owner, RoadSegment, Specialist,
};

pub use builder::WorldBuilder;

use roads::RoadNetwork;

const DEFAULT_CONSTRUCTION_TICKS: u64 = 20;
const NEWLY_BUILT_TICKS: u64 = 50;
const DEFAULT_PRODUCTIVITY: u32 = 100;
const GEOLOGIST_RADIUS: u32 = 3;
const SCOUT_RADIUS: u32 = 5;

/// Ground type of a node.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Terrain {
    /// Fertile land.
    #[default]
    Meadow,
    /// Buildable land where nothing grows.
    Steppe,
    /// Mountain that only hosts mines.
    Mountain,
    /// Impassable water.
    Water,
}

#[derive(Clone, Copy, Debug, Default)]
struct Node {
    terrain: Terrain,
    owner: Owner,
    border_stone: bool,
    visible: bool,
    object: NodeObject,
    deposit: Option<Deposit>,
    animal: bool,
}

impl Node {
    const fn is_free(&self) -> bool {
        matches!(
            self.object,
            NodeObject::Nothing | NodeObject::Environment | NodeObject::Sign
        )
    }
}

#[derive(Clone, Copy, Debug)]
struct Construction {
    point: MapPoint,
    building: BuildingType,
    ready_at: u64,
}

/// Represents the authoritative settlement state.
#[derive(Clone, Debug)]
pub struct World {
    extent: MapExtent,
    nodes: Vec<Node>,
    roads: RoadNetwork,
    large_flags: BTreeSet<MapPoint>,
    wares: BTreeMap<MapPoint, u32>,
    productivity: BTreeMap<(MapPoint, Direction), u32>,
    unavailable: BTreeSet<BuildingType>,
    paused: BTreeSet<MapPoint>,
    newly_built: BTreeMap<MapPoint, u64>,
    headquarters: Option<MapPoint>,
    enemy_headquarters: Vec<MapPoint>,
    construction: Vec<Construction>,
    pending: Vec<Command>,
    submitted: Vec<Command>,
    idle_specialists: u32,
    construction_ticks: u64,
    tick: u64,
}

impl World {
    /// Creates a world of meadow nobody owns, fully visible.
    #[must_use]
    pub fn new(extent: MapExtent) -> Self {
        let node = Node {
            visible: true,
            ..Node::default()
        };
        Self {
            extent,
            nodes: vec![node; extent.node_count()],
            roads: RoadNetwork::default(),
            large_flags: BTreeSet::new(),
            wares: BTreeMap::new(),
            productivity: BTreeMap::new(),
            unavailable: BTreeSet::new(),
            paused: BTreeSet::new(),
            newly_built: BTreeMap::new(),
            headquarters: None,
            enemy_headquarters: Vec::new(),
            construction: Vec::new(),
            pending: Vec::new(),
            submitted: Vec::new(),
            idle_specialists: 10,
            construction_ticks: DEFAULT_CONSTRUCTION_TICKS,
            tick: 0,
        }
    }

    fn node(&self, point: MapPoint) -> Option<&Node> {
        self.extent
            .index(point)
            .and_then(|index| self.nodes.get(index))
    }

    fn node_mut(&mut self, point: MapPoint) -> Option<&mut Node> {
        let index = self.extent.index(point)?;
        self.nodes.get_mut(index)
    }

    fn object_at(&self, point: MapPoint) -> NodeObject {
        self.node(point).map(|node| node.object).unwrap_or_default()
    }

    fn set_object(&mut self, point: MapPoint, object: NodeObject) {
        if let Some(node) = self.node_mut(point) {
            node.object = object;
        }
    }

    fn is_flag(&self, point: MapPoint) -> bool {
        self.object_at(point) == NodeObject::Flag
    }

    fn is_own(&self, point: MapPoint) -> bool {
        self.node(point).map(|node| node.owner) == Some(Owner::Own)
    }

    fn is_water_node(&self, point: MapPoint) -> bool {
        self.node(point)
            .map_or(true, |node| node.terrain == Terrain::Water)
    }

    fn flag_nearby(&self, point: MapPoint, except: Option<MapPoint>) -> bool {
        Direction::ALL.iter().any(|direction| {
            self.extent
                .neighbour(point, *direction)
                .filter(|next| Some(*next) != except)
                .is_some_and(|next| self.is_flag(next))
        })
    }

    fn flag_placeable(&self, point: MapPoint, own_only: bool) -> bool {
        let Some(node) = self.node(point) else {
            return false;
        };
        node.terrain != Terrain::Water
            && (!own_only || node.owner == Owner::Own)
            && node.is_free()
            && !self.flag_nearby(point, None)
    }

    fn quality_at(&self, point: MapPoint, own_only: bool) -> BuildingQuality {
        let Some(node) = self.node(point) else {
            return BuildingQuality::Nothing;
        };
        if node.terrain == Terrain::Water || (own_only && node.owner != Owner::Own) {
            return BuildingQuality::Nothing;
        }
        if !node.is_free() {
            return BuildingQuality::Nothing;
        }
        let flag_point = self.extent.flag_of(point);
        if self.roads.touches(point) || self.flag_nearby(point, flag_point) {
            return if self.flag_placeable(point, own_only) {
                BuildingQuality::Flag
            } else {
                BuildingQuality::Nothing
            };
        }
        let Some(flag_point) = flag_point else {
            return BuildingQuality::Flag;
        };
        let flag_ok = self.is_flag(flag_point)
            || (self.node(flag_point).is_some_and(|flag| {
                flag.terrain != Terrain::Water
                    && flag.is_free()
                    && (!own_only || flag.owner == Owner::Own)
            }) && !self.flag_nearby(flag_point, Some(point)));
        if !flag_ok {
            return BuildingQuality::Flag;
        }
        if node.terrain == Terrain::Mountain {
            return BuildingQuality::Mine;
        }

        let mut quality = BuildingQuality::Castle;
        for direction in Direction::ALL {
            let Some(next) = self.extent.neighbour(point, direction) else {
                return BuildingQuality::Flag;
            };
            let Some(neighbour) = self.node(next) else {
                continue;
            };
            let cap = match neighbour.object {
                NodeObject::Building(_) | NodeObject::Site(_) => BuildingQuality::Hut,
                NodeObject::Tree { .. } | NodeObject::Granite { .. } => BuildingQuality::Hut,
                _ if matches!(neighbour.terrain, Terrain::Water | Terrain::Mountain) => {
                    BuildingQuality::House
                }
                _ => BuildingQuality::Castle,
            };
            quality = quality.min(cap);
        }
        quality
    }

    fn check_route(
        &self,
        origin: MapPoint,
        route: &[Direction],
    ) -> Result<MapPoint, CommandRejected> {
        if !self.is_flag(origin) {
            return Err(CommandRejected::MissingFlag(origin));
        }
        let points = self
            .extent
            .route_points(origin, route)
            .ok_or(CommandRejected::RouteBlocked(origin))?;
        let Some((&end, intermediate)) = points.split_last() else {
            return Err(CommandRejected::RouteBlocked(origin));
        };
        let mut seen = BTreeSet::from([origin]);
        for &point in &points {
            if !seen.insert(point) || self.is_water_node(point) || !self.is_own(point) {
                return Err(CommandRejected::RouteBlocked(origin));
            }
        }
        for &point in intermediate {
            let free = self.node(point).is_some_and(Node::is_free);
            if !free || self.roads.touches(point) {
                return Err(CommandRejected::RouteBlocked(origin));
            }
        }
        if !self.is_flag(end) && !self.flag_placeable(end, true) {
            return Err(CommandRejected::RouteBlocked(origin));
        }
        Ok(end)
    }

    fn check(&self, command: &Command) -> Result<(), CommandRejected> {
        match command {
            Command::SetBuildingSite { point, building } => {
                if !self.extent.contains(*point) {
                    return Err(CommandRejected::OutOfBounds(*point));
                }
                if self.unavailable.contains(building) {
                    return Err(CommandRejected::Unavailable(*building));
                }
                if !self.quality_at(*point, true).can_use(building.quality()) {
                    return Err(CommandRejected::NotBuildable(*point));
                }
                Ok(())
            }
            Command::DestroyBuilding { point } => match self.object_at(*point) {
                NodeObject::Building(BuildingType::Headquarters) => {
                    Err(CommandRejected::NotBuildable(*point))
                }
                NodeObject::Building(_) | NodeObject::Site(_) => Ok(()),
                _ => Err(CommandRejected::MissingBuilding(*point)),
            },
            Command::SetFlag { point } => {
                if self.flag_placeable(*point, true) {
                    Ok(())
                } else {
                    Err(CommandRejected::NotBuildable(*point))
                }
            }
            Command::DestroyFlag { point } => {
                if !self.is_flag(*point) {
                    return Err(CommandRejected::MissingFlag(*point));
                }
                let hq_flag = self
                    .headquarters
                    .and_then(|hq| self.extent.flag_of(hq));
                if hq_flag == Some(*point) {
                    return Err(CommandRejected::NotBuildable(*point));
                }
                Ok(())
            }
            Command::BuildRoad { origin, route } => self.check_route(*origin, route).map(|_| ()),
            Command::DestroyRoad { flag, direction } | Command::UpgradeRoad { flag, direction } => {
                if self.is_flag(*flag) && self.roads.has(*flag, *direction) {
                    Ok(())
                } else {
                    Err(CommandRejected::MissingRoad(*flag, *direction))
                }
            }
            Command::CallSpecialist { flag, specialist } => {
                if !self.is_flag(*flag) {
                    return Err(CommandRejected::MissingFlag(*flag));
                }
                if self.idle_specialists == 0 {
                    return Err(CommandRejected::NoSpecialist(*specialist));
                }
                Ok(())
            }
        }
    }

    fn segment_from(&self, flag: MapPoint, direction: Direction) -> Option<(MapPoint, Vec<Direction>)> {
        self.roads
            .trace(&self.extent, flag, direction, |point| self.is_flag(point))
    }

    fn remove_building(&mut self, point: MapPoint, out_events: &mut Vec<Event>) {
        let (NodeObject::Building(building) | NodeObject::Site(building)) = self.object_at(point)
        else {
            return;
        };
        self.set_object(point, NodeObject::Nothing);
        self.roads.unlink(&self.extent, point, Direction::SouthEast);
        self.construction.retain(|site| site.point != point);
        let _ = self.newly_built.remove(&point);
        let _ = self.paused.remove(&point);
        out_events.push(Event::BuildingDestroyed { point, building });
    }

    fn remove_flag(&mut self, point: MapPoint, out_events: &mut Vec<Event>) {
        if let Some(building_point) = self.extent.building_of(point) {
            if self.roads.has(point, Direction::NorthWest) {
                self.remove_building(building_point, out_events);
            }
        }
        for direction in Direction::ALL {
            if let Some((_, route)) = self.segment_from(point, direction) {
                self.roads.remove_route(&self.extent, point, &route);
            }
        }
        self.set_object(point, NodeObject::Nothing);
        let _ = self.wares.remove(&point);
        let _ = self.large_flags.remove(&point);
    }

    fn dispatch(&mut self, flag: MapPoint, specialist: Specialist) {
        self.idle_specialists = self.idle_specialists.saturating_sub(1);
        match specialist {
            Specialist::Geologist => {
                for point in self.extent.points_in_radius(flag, GEOLOGIST_RADIUS) {
                    let Some(node) = self.node_mut(point) else {
                        continue;
                    };
                    if node.deposit.is_some() && node.object == NodeObject::Nothing {
                        node.object = NodeObject::Sign;
                    }
                }
            }
            Specialist::Scout => {
                for point in self.extent.points_in_radius(flag, SCOUT_RADIUS) {
                    if let Some(node) = self.node_mut(point) {
                        node.visible = true;
                    }
                }
            }
        }
    }
}

/// Applies the provided command to the world immediately.
///
/// Commands that have become invalid since they were submitted are dropped,
/// except roads, which report [`Event::RoadConstructionFailed`].
pub fn apply(world: &mut World, command: Command, out_events: &mut Vec<Event>) {
    if world.check(&command).is_err() {
        if let Command::BuildRoad { origin, route } = command {
            out_events.push(Event::RoadConstructionFailed { origin, route });
        }
        return;
    }
    match command {
        Command::SetBuildingSite { point, building } => {
            world.set_object(point, NodeObject::Site(building));
            if let Some(flag) = world.extent.flag_of(point) {
                if !world.is_flag(flag) {
                    world.set_object(flag, NodeObject::Flag);
                }
            }
            world.roads.link(&world.extent, point, Direction::SouthEast);
            world.construction.push(Construction {
                point,
                building,
                ready_at: world.tick + world.construction_ticks,
            });
        }
        Command::DestroyBuilding { point } => world.remove_building(point, out_events),
        Command::SetFlag { point } => world.set_object(point, NodeObject::Flag),
        Command::DestroyFlag { point } => world.remove_flag(point, out_events),
        Command::BuildRoad { origin, route } => {
            let extent = world.extent;
            if let Some(points) = extent.route_points(origin, &route) {
                if let Some(end) = points.last() {
                    world.set_object(*end, NodeObject::Flag);
                }
            }
            world.roads.lay(&extent, origin, &route);
            out_events.push(Event::RoadConstructed { origin, route });
        }
        Command::DestroyRoad { flag, direction } => {
            if let Some((_, route)) = world.segment_from(flag, direction) {
                world.roads.remove_route(&world.extent, flag, &route);
            }
        }
        Command::UpgradeRoad { flag, direction } => {
            if let Some((_, route)) = world.segment_from(flag, direction) {
                world.roads.upgrade(&world.extent, flag, &route);
            }
        }
        Command::CallSpecialist { flag, specialist } => world.dispatch(flag, specialist),
    }
}

/// Advances the world by one tick: applies every queued command in
/// submission order and finishes construction that is due.
pub fn step(world: &mut World, out_events: &mut Vec<Event>) {
    world.tick += 1;
    for command in std::mem::take(&mut world.pending) {
        apply(world, command, out_events);
    }

    let tick = world.tick;
    let (ready, waiting): (Vec<_>, Vec<_>) = world
        .construction
        .drain(..)
        .partition(|site| site.ready_at <= tick);
    world.construction = waiting;
    for site in ready {
        world.set_object(site.point, NodeObject::Building(site.building));
        if site.building.is_military() {
            let _ = world.newly_built.insert(site.point, tick + NEWLY_BUILT_TICKS);
        }
        out_events.push(Event::BuildingConstructed {
            point: site.point,
            building: site.building,
        });
    }
    world.newly_built.retain(|_, until| *until > tick);
}

impl World {
    /// Marks a flag as holding `count` wares.
    pub fn set_wares(&mut self, flag: MapPoint, count: u32) {
        let _ = self.wares.insert(flag, count);
    }

    /// Sets the carrier productivity of the road leaving `flag` in `direction`.
    pub fn set_productivity(&mut self, flag: MapPoint, direction: Direction, percent: u32) {
        let _ = self.productivity.insert((flag, direction), percent);
    }

    /// Makes a building type unavailable to the player.
    pub fn forbid(&mut self, building: BuildingType) {
        let _ = self.unavailable.insert(building);
    }

    /// Pauses production at the building on `point`.
    pub fn pause_production(&mut self, point: MapPoint) {
        let _ = self.paused.insert(point);
    }

    /// Marks the flag at `point` as a large flag.
    pub fn enlarge_flag(&mut self, point: MapPoint) {
        let _ = self.large_flags.insert(point);
    }

    /// Sets how many ticks a building site needs to finish.
    pub fn set_construction_ticks(&mut self, ticks: u64) {
        self.construction_ticks = ticks;
    }

    /// Sets the number of idle specialists.
    pub fn set_idle_specialists(&mut self, count: u32) {
        self.idle_specialists = count;
    }

    /// Hides or reveals a node.
    pub fn set_visible(&mut self, point: MapPoint, visible: bool) {
        if let Some(node) = self.node_mut(point) {
            node.visible = visible;
        }
    }
}

impl Engine for World {
    fn extent(&self) -> MapExtent {
        self.extent
    }

    fn building_quality(&self, point: MapPoint) -> BuildingQuality {
        self.quality_at(point, true)
    }

    fn building_quality_any_owner(&self, point: MapPoint) -> BuildingQuality {
        self.quality_at(point, false)
    }

    fn is_visible(&self, point: MapPoint) -> bool {
        self.node(point).is_some_and(|node| node.visible)
    }

    fn is_water(&self, point: MapPoint) -> bool {
        self.is_water_node(point)
    }

    fn is_vital(&self, point: MapPoint) -> bool {
        self.node(point)
            .is_some_and(|node| node.terrain == Terrain::Meadow)
    }

    fn owner(&self, point: MapPoint) -> Owner {
        self.node(point).map(|node| node.owner).unwrap_or_default()
    }

    fn has_border_stone(&self, point: MapPoint) -> bool {
        self.node(point).is_some_and(|node| node.border_stone)
    }

    fn object(&self, point: MapPoint) -> NodeObject {
        self.object_at(point)
    }

    fn deposit(&self, point: MapPoint) -> Option<Deposit> {
        self.node(point).and_then(|node| node.deposit)
    }

    fn has_huntable_animal(&self, point: MapPoint) -> bool {
        self.node(point).is_some_and(|node| node.animal)
    }

    fn has_road(&self, point: MapPoint, direction: Direction) -> bool {
        self.roads.has(point, direction)
    }

    fn is_road_available(&self, point: MapPoint) -> bool {
        self.node(point).is_some_and(|node| {
            node.terrain != Terrain::Water && node.is_free() && !self.roads.touches(point)
        })
    }

    fn is_node_reachable(&self, point: MapPoint) -> bool {
        !self.is_water_node(point)
    }

    fn is_edge_passable(&self, point: MapPoint, direction: Direction) -> bool {
        self.extent
            .neighbour(point, direction)
            .is_some_and(|next| !self.is_water_node(next))
    }

    fn is_player_territory(&self, point: MapPoint) -> bool {
        self.is_own(point)
    }

    fn is_large_flag(&self, point: MapPoint) -> bool {
        self.large_flags.contains(&point)
    }

    fn wares_at_flag(&self, point: MapPoint) -> u32 {
        self.wares.get(&point).copied().unwrap_or(0)
    }

    fn road_segment(&self, flag: MapPoint, direction: Direction) -> Option<RoadSegment> {
        if !self.is_flag(flag) {
            return None;
        }
        let (other_end, route) = self.segment_from(flag, direction)?;
        let productivity = self
            .productivity
            .get(&(flag, direction))
            .or_else(|| {
                route
                    .last()
                    .and_then(|last| self.productivity.get(&(other_end, last.reverse())))
            })
            .copied()
            .unwrap_or(DEFAULT_PRODUCTIVITY);
        Some(RoadSegment {
            other_end,
            route,
            productivity,
        })
    }

    fn can_build(&self, building: BuildingType) -> bool {
        building != BuildingType::Headquarters && !self.unavailable.contains(&building)
    }

    fn headquarters(&self) -> Option<MapPoint> {
        self.headquarters
    }

    fn enemy_headquarters(&self) -> Vec<MapPoint> {
        self.enemy_headquarters.clone()
    }

    fn is_production_disabled(&self, point: MapPoint) -> bool {
        self.paused.contains(&point)
    }

    fn is_newly_built(&self, point: MapPoint) -> bool {
        self.newly_built.contains_key(&point)
    }

    fn submit(&mut self, command: Command) -> Result<(), CommandRejected> {
        self.check(&command)?;
        self.submitted.push(command.clone());
        self.pending.push(command);
        Ok(())
    }
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use settler_ai_core::{BuildingType, Command, DepositKind, MapPoint, NodeObject};

    use super::World;

    /// Current tick number.
    #[must_use]
    pub fn tick(world: &World) -> u64 {
        world.tick
    }

    /// Every command accepted so far, in submission order.
    #[must_use]
    pub fn submitted_commands(world: &World) -> &[Command] {
        &world.submitted
    }

    /// Commands accepted but not yet applied.
    #[must_use]
    pub fn pending_commands(world: &World) -> &[Command] {
        &world.pending
    }

    /// Every flag on the map in point order.
    #[must_use]
    pub fn flags(world: &World) -> Vec<MapPoint> {
        world
            .extent
            .points()
            .filter(|point| world.is_flag(*point))
            .collect()
    }

    /// Every finished building and site on the map in point order.
    #[must_use]
    pub fn buildings(world: &World) -> Vec<(MapPoint, BuildingType, bool)> {
        world
            .extent
            .points()
            .filter_map(|point| match world.object_at(point) {
                NodeObject::Building(building) => Some((point, building, true)),
                NodeObject::Site(building) => Some((point, building, false)),
                _ => None,
            })
            .collect()
    }

    /// Number of road links between neighbouring nodes.
    #[must_use]
    pub fn road_links(world: &World) -> usize {
        world.roads.link_count()
    }

    /// Whether the road leaving `flag` in `direction` is a donkey road.
    #[must_use]
    pub fn is_donkey_road(world: &World, flag: MapPoint, direction: super::Direction) -> bool {
        world.roads.is_donkey_road(flag, direction)
    }

    /// Points where geologists have found the given deposit.
    #[must_use]
    pub fn surveyed(world: &World, kind: DepositKind) -> Vec<MapPoint> {
        world
            .extent
            .points()
            .filter(|point| {
                world.node(*point).is_some_and(|node| {
                    node.object == NodeObject::Sign
                        && node.deposit.is_some_and(|deposit| deposit.kind == kind)
                })
            })
            .collect()
    }
}
