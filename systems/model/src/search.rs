//! Best-first search over map nodes.
//!
//! One engine serves every route question the agent asks. Path walks look
//! for a new road through free land, scoring each step by the building
//! capacity it destroys. Road walks follow existing roads only. Terrain
//! walks measure plain walking distance and feed the connection length
//! cache.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use settler_ai_core::{BuildingQuality, Direction, Engine, MapPoint, Score, Specialist};
use tracing::{debug, trace};

use crate::View;

/// How long a requested road is meant to stay.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Lifetime {
    /// Part of the lasting network.
    #[default]
    Permanent,
    /// Serves one errand and may be torn down afterwards.
    Temporary,
}

/// Cost model of a search.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum RouteKind {
    /// Cheapest new road by lost building capacity.
    #[default]
    Best,
    /// Fewest steps.
    Shortest,
    /// Fewest steps ignoring territory, for distance estimates.
    Terrain,
    /// Redundant road that must beat the existing network by a margin.
    Secondary,
}

/// Parameters of a route search and of the road request built on it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RoadConstraints {
    /// Node the search starts at.
    pub from: MapPoint,
    /// Required destination. Without one, any connected flag will do.
    pub to: Option<MapPoint>,
    /// Forbid the start node as a destination.
    pub exclude_from: bool,
    /// Forbid the building node served by the start flag.
    pub exclude_from_building: bool,
    /// Highest accumulated cost a node may carry.
    pub maximal_cost: i64,
    /// Lifetime of the resulting road.
    pub lifetime: Lifetime,
    /// Nodes the search may not enter.
    pub excluded: BTreeSet<MapPoint>,
    /// Cost model.
    pub kind: RouteKind,
    /// Specialists to call to the start flag once the road stands.
    pub specialist: Option<(Specialist, u32)>,
}

impl RoadConstraints {
    /// Unbounded best-road search from a node.
    #[must_use]
    pub fn new(from: MapPoint) -> Self {
        Self {
            from,
            to: None,
            exclude_from: false,
            exclude_from_building: false,
            maximal_cost: i64::MAX - 1,
            lifetime: Lifetime::Permanent,
            excluded: BTreeSet::new(),
            kind: RouteKind::Best,
            specialist: None,
        }
    }

    /// Requires the route to end at `to`.
    #[must_use]
    pub fn to(mut self, to: MapPoint) -> Self {
        self.to = Some(to);
        self
    }

    /// Sets the cost model.
    #[must_use]
    pub fn kind(mut self, kind: RouteKind) -> Self {
        self.kind = kind;
        self
    }

    /// Sets the lifetime of the resulting road.
    #[must_use]
    pub fn lifetime(mut self, lifetime: Lifetime) -> Self {
        self.lifetime = lifetime;
        self
    }

    /// Forbids the start node as a destination.
    #[must_use]
    pub fn exclude_from(mut self) -> Self {
        self.exclude_from = true;
        self
    }

    /// Forbids the building node served by the start flag.
    #[must_use]
    pub fn exclude_from_building(mut self) -> Self {
        self.exclude_from_building = true;
        self
    }

    /// Caps the accumulated cost.
    #[must_use]
    pub fn maximal_cost(mut self, cost: i64) -> Self {
        self.maximal_cost = cost;
        self
    }

    /// Forbids a set of nodes.
    #[must_use]
    pub fn excluding(mut self, points: impl IntoIterator<Item = MapPoint>) -> Self {
        self.excluded.extend(points);
        self
    }

    /// Calls specialists to the start flag once the road stands.
    #[must_use]
    pub fn specialist(mut self, specialist: Specialist, count: u32) -> Self {
        self.specialist = Some((specialist, count));
        self
    }
}

/// Result of a search. A failed search has no target and an invalid score.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SearchOutcome {
    /// Destination reached.
    pub target: Option<MapPoint>,
    /// Steps from the start to the target.
    pub route: Vec<Direction>,
    /// Accumulated cost of the route.
    pub score: Score,
    /// Cost of each step of the route.
    pub segment_costs: Vec<i64>,
    /// Accumulated cost of every node the search accepted.
    pub reached: BTreeMap<MapPoint, i64>,
}

impl SearchOutcome {
    /// Whether a destination was reached.
    #[must_use]
    pub const fn is_found(&self) -> bool {
        self.target.is_some()
    }
}

/// Road networks split into flag sets joined by existing roads.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RoadComponents {
    /// Flags mutually reachable over roads, one set per component.
    pub components: Vec<Vec<MapPoint>>,
    /// Flags no road leads through.
    pub singletons: Vec<MapPoint>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Walk {
    Path,
    Roads,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Goal {
    ConnectedFlag,
    Point(MapPoint),
    Nowhere,
}

#[derive(Clone, Copy, Debug)]
struct Node {
    g: i64,
    h: i64,
    via: Option<Direction>,
    has_flag: bool,
    step: i64,
}

struct Search<'a> {
    view: &'a View,
    engine: &'a dyn Engine,
    constraints: &'a RoadConstraints,
    walk: Walk,
    goal: Goal,
    invalid: BTreeSet<MapPoint>,
    nodes: HashMap<MapPoint, Node>,
    open: BTreeSet<(i64, MapPoint)>,
    closed: HashSet<MapPoint>,
}

impl<'a> Search<'a> {
    fn new(
        view: &'a View,
        engine: &'a dyn Engine,
        constraints: &'a RoadConstraints,
        walk: Walk,
        flood: bool,
    ) -> Self {
        let goal = match (flood, constraints.to) {
            (true, _) => Goal::Nowhere,
            (false, Some(to)) => Goal::Point(to),
            (false, None) if constraints.kind == RouteKind::Terrain => Goal::Nowhere,
            (false, None) => Goal::ConnectedFlag,
        };
        let mut invalid = constraints.excluded.clone();
        if constraints.exclude_from {
            let _ = invalid.insert(constraints.from);
        }
        if constraints.exclude_from_building {
            if let Some(building) = view.extent().building_of(constraints.from) {
                let _ = invalid.insert(building);
            }
        }
        Self {
            view,
            engine,
            constraints,
            walk,
            goal,
            invalid,
            nodes: HashMap::new(),
            open: BTreeSet::new(),
            closed: HashSet::new(),
        }
    }

    fn is_target(&self, point: MapPoint) -> bool {
        if self.invalid.contains(&point) {
            return false;
        }
        match self.goal {
            Goal::Point(to) => point == to,
            Goal::Nowhere => false,
            Goal::ConnectedFlag => self.view.is_connected_flag(point),
        }
    }

    fn heuristic(&self, point: MapPoint) -> i64 {
        let extent = self.view.extent();
        let towards = match (self.goal, self.walk) {
            (Goal::Point(to), _) => Some(to),
            (Goal::ConnectedFlag, Walk::Path) => self.view.headquarters(),
            _ => None,
        };
        towards.map_or(0, |to| i64::from(extent.distance(point, to)))
    }

    fn is_valid_base(&self, point: MapPoint, cost: i64) -> bool {
        if self.invalid.contains(&point) || cost > self.constraints.maximal_cost {
            return false;
        }
        if !self.engine.is_node_reachable(point) {
            return false;
        }
        self.constraints.kind == RouteKind::Terrain || self.engine.is_player_territory(point)
    }

    fn is_valid(&self, point: MapPoint, cost: i64, direction: Direction) -> bool {
        if !self.is_valid_base(point, cost) {
            return false;
        }
        match self.walk {
            Walk::Roads => {
                self.engine.has_road(point, direction.reverse())
                    && self.engine.building_at(point).is_none()
            }
            Walk::Path => self.is_valid_path_node(point, cost),
        }
    }

    fn is_valid_path_node(&self, point: MapPoint, cost: i64) -> bool {
        if matches!(self.constraints.kind, RouteKind::Shortest | RouteKind::Terrain) {
            return true;
        }
        if !self.is_target(point)
            && (!self.engine.is_road_available(point) || self.engine.is_on_road(point))
        {
            return false;
        }
        if self.constraints.kind == RouteKind::Secondary && self.view.is_connected_flag(point) {
            let factor = self.view.tuning().secondary_road_factor;
            let mut cap = cost.saturating_mul(factor);
            if self.view.is_warehouse_flag(point) {
                cap /= 2;
            }
            if self.engine.is_large_flag(point) {
                cap = cap * 2 / 3;
            }
            let existing = RoadConstraints::new(self.constraints.from)
                .to(point)
                .kind(RouteKind::Shortest)
                .maximal_cost(cap);
            if self.view.find_road_connection(self.engine, &existing).is_found() {
                trace!(?point, cost, cap, "existing road is cheap enough");
                return false;
            }
        }
        true
    }

    // Returns the step cost and whether the entered node is assumed to carry
    // a flag.
    fn movement(&self, point: MapPoint, predecessor: MapPoint, predecessor_has_flag: bool) -> (i64, bool) {
        let penalties = &self.view.tuning().penalties;
        match (self.walk, self.constraints.kind) {
            (Walk::Roads, _) => (penalties.route_segment, false),
            (Walk::Path, RouteKind::Shortest | RouteKind::Terrain) => (1, false),
            (Walk::Path, _) => {
                let assume_flag =
                    !predecessor_has_flag && self.view.can_build_flag(self.engine, point);
                let target = if assume_flag {
                    BuildingQuality::Flag
                } else {
                    BuildingQuality::Nothing
                };
                let penalty = self
                    .view
                    .close_by_penalty(self.engine, point, target, Some(predecessor));
                let missing_flag = if !assume_flag && !predecessor_has_flag {
                    penalties.route_missing_flag
                } else {
                    0
                };
                let cost = (penalties.route_segment + penalty + missing_flag).max(1);
                (cost, assume_flag)
            }
        }
    }

    fn relax(&mut self, point: MapPoint, node: Node) {
        if let Some(existing) = self.nodes.get(&point).copied() {
            let open_key = (existing.g + existing.h, point);
            let mut in_open = self.open.contains(&open_key);
            let mut in_closed = self.closed.contains(&point);
            if in_open && node.g < existing.g {
                let _ = self.open.remove(&open_key);
                in_open = false;
            } else if in_closed && node.g < existing.g {
                let _ = self.closed.remove(&point);
                in_closed = false;
            }
            if in_open || in_closed {
                return;
            }
        }
        let _ = self.nodes.insert(point, node);
        let _ = self.open.insert((node.g + node.h, point));
    }

    fn run(mut self) -> SearchOutcome {
        let from = self.constraints.from;
        let extent = self.view.extent();
        let origin = Node {
            g: 0,
            h: 0,
            via: None,
            has_flag: true,
            step: 0,
        };
        let _ = self.nodes.insert(from, origin);
        let _ = self.open.insert((0, from));

        while let Some((_, current)) = self.open.pop_first() {
            let Some(node) = self.nodes.get(&current).copied() else {
                continue;
            };
            if self.is_target(current) {
                return self.finish(current);
            }
            let _ = self.closed.insert(current);

            if self.constraints.kind == RouteKind::Terrain {
                if let Goal::Point(to) = self.goal {
                    if let Some(Some(length)) = self.view.cached_connection_length(current, to) {
                        return SearchOutcome {
                            target: Some(current),
                            route: Vec::new(),
                            score: Score::new(i64::from(length) + node.g),
                            segment_costs: Vec::new(),
                            reached: self.reached(),
                        };
                    }
                }
            }

            trace!(?current, g = node.g, h = node.h, "expanding");
            for direction in Direction::ALL {
                if node.via == Some(direction.reverse()) {
                    continue;
                }
                if !self.engine.is_edge_passable(current, direction) {
                    continue;
                }
                let Some(next) = extent.neighbour(current, direction) else {
                    continue;
                };
                let (step, has_flag) = self.movement(next, current, node.has_flag);
                let cost = node.g + step;
                if !self.is_valid(next, cost, direction) {
                    continue;
                }
                let h = self.heuristic(next);
                self.relax(
                    next,
                    Node {
                        g: cost,
                        h,
                        via: Some(direction),
                        has_flag,
                        step,
                    },
                );
            }
        }

        SearchOutcome {
            target: None,
            route: Vec::new(),
            score: Score::INVALID,
            segment_costs: Vec::new(),
            reached: self.reached(),
        }
    }

    fn reached(&self) -> BTreeMap<MapPoint, i64> {
        self.nodes
            .iter()
            .map(|(point, node)| (*point, node.g))
            .collect()
    }

    fn finish(&self, target: MapPoint) -> SearchOutcome {
        let extent = self.view.extent();
        let mut route = Vec::new();
        let mut segment_costs = Vec::new();
        let mut current = target;
        while current != self.constraints.from {
            let Some(node) = self.nodes.get(&current) else {
                break;
            };
            let Some(via) = node.via else {
                break;
            };
            route.push(via);
            segment_costs.push(node.step);
            let Some(previous) = extent.neighbour(current, via.reverse()) else {
                break;
            };
            current = previous;
        }
        route.reverse();
        segment_costs.reverse();

        // A node reopened after its successors were settled leaves stale
        // totals behind, so the route is priced by its own steps.
        let g: i64 = segment_costs.iter().sum();
        debug!(
            from = ?self.constraints.from,
            ?target,
            kind = ?self.constraints.kind,
            cost = g,
            steps = route.len(),
            "route found"
        );
        SearchOutcome {
            target: Some(target),
            route,
            score: Score::new(g),
            segment_costs,
            reached: self.reached(),
        }
    }
}

impl View {
    /// Searches a new road from `constraints.from` to a connected flag or to
    /// the requested destination.
    ///
    /// Secondary searches first measure the existing road network and only
    /// accept routes noticeably cheaper than it.
    #[must_use]
    pub fn find_connection_point(
        &self,
        engine: &dyn Engine,
        constraints: &RoadConstraints,
    ) -> SearchOutcome {
        if constraints.kind != RouteKind::Secondary {
            return Search::new(self, engine, constraints, Walk::Path, false).run();
        }

        let mut reference = RoadConstraints::new(constraints.from).kind(RouteKind::Shortest);
        reference.to = self
            .headquarters()
            .and_then(|hq| self.extent().flag_of(hq));
        let measured = Search::new(self, engine, &reference, Walk::Roads, reference.to.is_none())
            .run();
        let cost = measured
            .score
            .value()
            .unwrap_or_else(|| measured.reached.values().copied().max().unwrap_or(0));

        let mut maximal_cost = cost / self.tuning().secondary_road_factor.max(1);
        if self.is_warehouse_flag(constraints.from) {
            maximal_cost *= 2;
        }
        if engine.is_large_flag(constraints.from) {
            maximal_cost = maximal_cost * 3 / 2;
        }
        debug!(from = ?constraints.from, cost, maximal_cost, "secondary road budget");

        let bounded = constraints.clone().maximal_cost(maximal_cost);
        Search::new(self, engine, &bounded, Walk::Path, false).run()
    }

    /// Searches along existing roads from `constraints.from` to
    /// `constraints.to`. Without a destination nothing is found.
    #[must_use]
    pub fn find_road_connection(
        &self,
        engine: &dyn Engine,
        constraints: &RoadConstraints,
    ) -> SearchOutcome {
        if constraints.to.is_none() {
            return SearchOutcome {
                target: None,
                route: Vec::new(),
                score: Score::INVALID,
                segment_costs: Vec::new(),
                reached: BTreeMap::new(),
            };
        }
        Search::new(self, engine, constraints, Walk::Roads, false).run()
    }

    pub(crate) fn cached_connection_length(&self, from: MapPoint, to: MapPoint) -> Option<Option<u32>> {
        self.connection_lengths.get(&(from, to)).copied()
    }

    /// Walking distance between two nodes, ignoring territory.
    ///
    /// Results are cached, including every intermediate node of a found
    /// route with its remaining distance. Unreachable pairs are cached too.
    pub fn connection_length(
        &mut self,
        engine: &dyn Engine,
        from: MapPoint,
        to: MapPoint,
    ) -> Option<u32> {
        if from == to {
            return Some(0);
        }
        if let Some(cached) = self.cached_connection_length(from, to) {
            return cached;
        }

        let constraints = RoadConstraints::new(from).to(to).kind(RouteKind::Terrain);
        let outcome = Search::new(self, engine, &constraints, Walk::Path, false).run();
        let Some(length) = outcome
            .score
            .value()
            .and_then(|value| u32::try_from(value).ok())
        else {
            let _ = self.connection_lengths.insert((from, to), None);
            return None;
        };

        let mut remaining = length;
        let mut current = from;
        for direction in &outcome.route {
            let _ = self.connection_lengths.insert((current, to), Some(remaining));
            remaining = remaining.saturating_sub(1);
            let Some(next) = self.extent().neighbour(current, *direction) else {
                break;
            };
            current = next;
        }
        let _ = self.connection_lengths.insert((from, to), Some(length));
        Some(length)
    }

    /// Floods the map from `from` and caches the walking distance to every
    /// node reached, in both directions.
    pub fn precompute_connections(&mut self, engine: &dyn Engine, from: MapPoint) {
        let constraints = RoadConstraints::new(from).kind(RouteKind::Terrain);
        let outcome = Search::new(self, engine, &constraints, Walk::Path, true).run();
        for (point, g) in outcome.reached {
            let Ok(length) = u32::try_from(g) else {
                continue;
            };
            let _ = self.connection_lengths.insert((from, point), Some(length));
            let _ = self.connection_lengths.insert((point, from), Some(length));
        }
    }

    /// Partitions the known flags into road-connected components.
    ///
    /// Flags without a road beyond their door link are reported as
    /// singletons. Every known flag appears exactly once in the result.
    #[must_use]
    pub fn road_components(&self, engine: &dyn Engine) -> RoadComponents {
        let mut remaining = self.flags().clone();
        let mut result = RoadComponents::default();

        while let Some(flag) = remaining.pop_first() {
            let has_building = self
                .extent()
                .building_of(flag)
                .and_then(|point| engine.building_at(point))
                .is_some();
            if self.connected_roads(engine, flag) <= usize::from(has_building) {
                result.singletons.push(flag);
                continue;
            }

            let constraints = RoadConstraints::new(flag).kind(RouteKind::Shortest);
            let outcome = Search::new(self, engine, &constraints, Walk::Roads, true).run();
            let mut component = vec![flag];
            for point in outcome.reached.keys() {
                if remaining.remove(point) {
                    component.push(*point);
                }
            }
            result.components.push(component);
        }

        debug!(
            components = result.components.len(),
            singletons = result.singletons.len(),
            "road network partitioned"
        );
        result
    }
}
