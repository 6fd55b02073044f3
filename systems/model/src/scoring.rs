//! Site and path scoring.

use std::collections::BTreeSet;

use settler_ai_core::{
    BuildingQuality, BuildingType, Concept, Direction, Engine, MapPoint, NodeObject, Resource,
    Score, Thing,
};
use tracing::debug;

use crate::catalog::{Catalog, EffectKind, HARD_CONSTRAINT};
use crate::search::RoadConstraints;
use crate::View;

const LIGHT_MILITARY_SCAN_RADIUS: u32 = 7;
const EXPANSION_SCAN_RADIUS: u32 = 5;
const MAX_FREE_SITES_NEAR_BORDER: u32 = 3;
const RESERVED_LAND_RADIUS: u32 = 2;
const LIGHT_MILITARY_MINE_PENALTY: i64 = 512;
const LIGHT_MILITARY_NEW_MINES_PENALTY: i64 = 2048;
const WATER_IN_MILITARY_RADIUS_PENALTY: i64 = 32;
const GUARDHOUSE_ENEMY_PENALTY: i64 = 512;
const WATCHTOWER_ENEMY_PENALTY: i64 = 64;
const FORTRESS_ENEMY_BONUS: i64 = 32;
const BARRACKS_ENEMY_BONUS: i64 = 32;
const BARRACKS_ENEMY_LIMIT: i32 = 4;

/// Where a building should go.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SiteConstraints {
    /// Building to place.
    pub building: BuildingType,
    /// Point the site should be close to.
    pub close_to: Option<MapPoint>,
    /// Largest walking distance from `close_to`.
    pub close_to_distance: Option<u32>,
}

impl SiteConstraints {
    /// Anywhere on own land.
    #[must_use]
    pub const fn new(building: BuildingType) -> Self {
        Self {
            building,
            close_to: None,
            close_to_distance: None,
        }
    }

    /// Within `distance` of `point`.
    #[must_use]
    pub const fn near(mut self, point: MapPoint, distance: u32) -> Self {
        self.close_to = Some(point);
        self.close_to_distance = Some(distance);
        self
    }
}

#[derive(Clone, Copy, Debug)]
struct Candidate {
    point: MapPoint,
    score: Score,
    distance: Option<u32>,
}

impl View {
    /// Whether the global counters cover every global consumption of the
    /// building. Important commodities may fall short by `slack`.
    #[must_use]
    pub fn meets_global_consumption(&self, building: BuildingType, slack: i32) -> bool {
        Catalog::shared()
            .info(building)
            .consumptions()
            .filter(|consumption| !consumption.is_local())
            .all(|consumption| {
                let available = self.global()[consumption.thing];
                available >= consumption.amount
                    || (consumption.thing.is_important() && available + slack >= consumption.amount)
            })
    }

    /// Sums a local counter around a point.
    ///
    /// A zero radius reads the centre only. With `reachable` set, nodes the
    /// centre cannot walk to are skipped.
    pub fn sum_local(
        &mut self,
        engine: &dyn Engine,
        center: MapPoint,
        radius: u32,
        thing: impl Into<Thing>,
        reachable: bool,
    ) -> i32 {
        let thing = thing.into();
        if radius == 0 {
            return self.local(center, thing);
        }
        let mut sum = 0;
        for point in self.extent().points_in_radius(center, radius) {
            let value = self.local(point, thing);
            if value == 0 {
                continue;
            }
            if !reachable
                || point == center
                || self.connection_length(engine, center, point).is_some()
            {
                sum += value;
            }
        }
        sum
    }

    /// Scores a site by what a building would find around it.
    ///
    /// Unmet consumptions make the site invalid. Preferences then add or
    /// subtract their weight per unit found in range, or invalidate the site
    /// when they are hard constraints.
    pub fn proximity_score(
        &mut self,
        engine: &dyn Engine,
        point: MapPoint,
        building: BuildingType,
    ) -> Score {
        let info = Catalog::shared().info(building);
        let factor = self.tuning().resource_in_range_factor;
        let slack = self.tuning().important_commodity_site_slack;
        let mut score = Score::ZERO;

        for consumption in info.consumptions() {
            let required = consumption.amount;
            if !consumption.is_local() {
                let available = self.global()[consumption.thing];
                if available < required
                    && !(consumption.thing.is_important() && available + slack >= required)
                {
                    return Score::INVALID;
                }
                continue;
            }
            let reachable = consumption.thing.is_resource()
                && consumption.thing != Thing::Resource(Resource::BorderLand);
            let available =
                self.sum_local(engine, point, consumption.radius(), consumption.thing, reachable);
            if required > available {
                return Score::INVALID;
            }
            score += i64::from(available) * factor;
        }

        for preference in info.preferences() {
            let available =
                self.sum_local(engine, point, preference.radius(), preference.thing, false);
            let aversion = preference.kind == EffectKind::Aversion;
            if preference.amount == HARD_CONSTRAINT {
                if (aversion && available > 0) || (!aversion && available <= 0) {
                    return Score::INVALID;
                }
                continue;
            }
            let sign = if aversion { -1 } else { 1 };
            score += sign * i64::from(preference.amount) * i64::from(available);
        }
        score
    }

    /// Scores a site for a building, without the cost of connecting it.
    pub fn location_score(
        &mut self,
        engine: &dyn Engine,
        point: MapPoint,
        building: BuildingType,
    ) -> Score {
        if !engine
            .building_quality(point)
            .can_use(building.quality())
        {
            return Score::INVALID;
        }
        let influence = self
            .location(point)
            .map_or(0, |location| location.military_influence());
        if building.is_military() && influence != 0 {
            return Score::INVALID;
        }

        let score = self.proximity_score(engine, point, building);
        if !score.is_valid() {
            return Score::INVALID;
        }

        if let Some(radius) = building.military_radius() {
            self.military_location_score(engine, point, building, radius, score)
        } else if !building.is_mine() {
            self.civil_location_score(engine, point, score)
        } else {
            score
        }
    }

    fn is_free_site(&self, engine: &dyn Engine, point: MapPoint, quality: BuildingQuality) -> bool {
        self.location(point)
            .is_some_and(|location| location.military_influence() == 0)
            && engine.building_quality(point).can_use(quality)
            && self.potential_sites().contains(&point)
    }

    fn military_in_progress(&self, engine: &dyn Engine) -> BTreeSet<MapPoint> {
        BuildingType::ALL
            .iter()
            .filter(|building| building.is_military())
            .flat_map(|building| self.buildings(*building))
            .map(|(point, _)| point)
            .filter(|point| {
                matches!(engine.object(*point), NodeObject::Site(_)) || engine.is_newly_built(*point)
            })
            .collect()
    }

    fn military_location_score(
        &mut self,
        engine: &dyn Engine,
        point: MapPoint,
        building: BuildingType,
        radius: u32,
        mut score: Score,
    ) -> Score {
        let extent = self.extent();
        let in_progress = self.military_in_progress(engine);
        let light = building < BuildingType::Watchtower;

        if light {
            let worth_it =
                extent.any_in_radius(point, LIGHT_MILITARY_SCAN_RADIUS, true, |circle, _| {
                    self.is_free_site(engine, circle, BuildingQuality::House)
                        || in_progress.contains(&circle)
                        || self.is_military_at(circle)
                });
            if !worth_it {
                return score;
            }
        }

        let mut enemy = 0;
        let mut new_mines = false;
        for circle in extent.points_in_radius(point, radius) {
            if in_progress.contains(&circle) {
                return Score::INVALID;
            }
            enemy += self.local(circle, Concept::Enemy);
            if self.local(circle, Concept::Owned) == 0 && self.local(circle, Concept::MineSpace) != 0
            {
                if light {
                    score -= LIGHT_MILITARY_MINE_PENALTY;
                }
                score += self.tuning().quality.mine;
                new_mines = true;
            }
            if engine.is_water(circle) {
                score -= WATER_IN_MILITARY_RADIUS_PENALTY;
            }
        }

        let enemy_weight = i64::from(enemy);
        if new_mines && light {
            score -= LIGHT_MILITARY_NEW_MINES_PENALTY;
        }
        match building {
            BuildingType::Guardhouse => score -= GUARDHOUSE_ENEMY_PENALTY * enemy_weight,
            BuildingType::Watchtower => score -= WATCHTOWER_ENEMY_PENALTY * enemy_weight,
            BuildingType::Fortress => score += FORTRESS_ENEMY_BONUS * enemy_weight,
            BuildingType::Barracks if enemy > BARRACKS_ENEMY_LIMIT => {
                return score + Score::new(BARRACKS_ENEMY_BONUS * enemy_weight);
            }
            _ => {}
        }

        let Some(headquarters) = self.headquarters() else {
            return score;
        };
        let tier = building.military_tier().unwrap_or(0);
        let minimal_percent = self.tuning().required_minimal_distance_to_enemy[tier];
        let remaining_percent = self.tuning().required_remaining_distance_to_enemy[tier];
        for enemy_hq in self.enemy_headquarters().to_vec() {
            let hq_distance = self
                .connection_length(engine, headquarters, enemy_hq)
                .unwrap_or_else(|| extent.distance(headquarters, enemy_hq));
            let minimal = minimal_percent * i64::from(hq_distance) / 100;
            let remaining = remaining_percent * i64::from(hq_distance) / 100;
            let distance = self
                .connection_length(engine, point, enemy_hq)
                .map_or(-1, i64::from)
                - i64::from(radius);
            debug!(
                ?point,
                ?building,
                hq_distance,
                distance,
                minimal,
                remaining,
                "enemy headquarters band"
            );
            if new_mines {
                continue;
            }
            if (minimal != 0 && distance > minimal) || (remaining != 0 && distance < remaining) {
                return Score::INVALID;
            }
        }
        score
    }

    fn civil_location_score(&mut self, engine: &dyn Engine, point: MapPoint, mut score: Score) -> Score {
        let extent = self.extent();
        let mut free_sites = 0;
        let mut border = 0;
        let stopped = extent.any_in_radius(point, EXPANSION_SCAN_RADIUS, true, |circle, _| {
            if self.is_free_site(engine, circle, BuildingQuality::Hut) {
                free_sites += 1;
                return free_sites > MAX_FREE_SITES_NEAR_BORDER;
            }
            if self.is_military_at(circle) {
                return true;
            }
            border += self.local(circle, Resource::BorderLand);
            false
        });
        if !stopped && border > 0 && free_sites > 0 {
            return Score::INVALID;
        }

        let penalties = self.tuning().penalties.clone();
        let farm = self.sum_local(engine, point, RESERVED_LAND_RADIUS, Concept::FarmSpace, false);
        let trees = self.sum_local(engine, point, RESERVED_LAND_RADIUS, Concept::TreeSpace, false);
        score -= penalties.farm_land_building * i64::from(farm);
        score -= penalties.tree_land * i64::from(trees);
        score
    }

    /// Building capacity lost around `point` if something of quality
    /// `target` is placed there, plus penalties for resources and border
    /// next to it. `previous` is the node a road arrives from.
    #[must_use]
    pub fn close_by_penalty(
        &self,
        engine: &dyn Engine,
        point: MapPoint,
        target: BuildingQuality,
        previous: Option<MapPoint>,
    ) -> i64 {
        let extent = self.extent();
        let scores = &self.tuning().quality;
        let penalties = &self.tuning().penalties;
        let step = |from: Option<MapPoint>, direction: Direction| {
            from.and_then(|from| extent.neighbour(from, direction))
        };
        let land_is_used = |at: MapPoint| {
            self.local(at, Concept::FarmSpace) + self.local(at, Concept::TreeSpace) > 0
        };
        let reduction = |at: Option<MapPoint>, new: BuildingQuality| -> i64 {
            let Some(at) = at else {
                return 0;
            };
            if target == BuildingQuality::Nothing && (Some(at) == previous || land_is_used(at)) {
                return 0;
            }
            scores.of(engine.building_quality(at)) - scores.of(new)
        };
        let castle_reduction = |at: Option<MapPoint>, new: BuildingQuality| -> i64 {
            match at {
                Some(castle) if engine.building_quality(castle) == BuildingQuality::Castle => {
                    reduction(Some(castle), new)
                }
                _ => 0,
            }
        };

        let here = Some(point);
        let west = step(here, Direction::West);
        let east = step(here, Direction::East);
        let north_east = step(here, Direction::NorthEast);
        let north_west = step(here, Direction::NorthWest);
        let south_west = step(here, Direction::SouthWest);
        let south_east = step(here, Direction::SouthEast);

        let mut penalty = reduction(here, BuildingQuality::Nothing);
        penalty += penalties.farm_land_road * i64::from(self.local(point, Concept::FarmSpace));
        penalty += penalties.tree_land * i64::from(self.local(point, Concept::TreeSpace));

        match target {
            BuildingQuality::Nothing => {
                penalty += castle_reduction(west, BuildingQuality::House);
                penalty += castle_reduction(south_east, BuildingQuality::House);
                penalty += castle_reduction(south_west, BuildingQuality::House);
            }
            BuildingQuality::Flag => {
                penalty += castle_reduction(east, BuildingQuality::House);
                penalty += castle_reduction(south_east, BuildingQuality::House);
                penalty += castle_reduction(south_west, BuildingQuality::House);
                penalty += reduction(west, BuildingQuality::Nothing);
                penalty += reduction(north_east, BuildingQuality::Nothing);
                for direction in [Direction::West, Direction::NorthWest, Direction::NorthEast] {
                    penalty += reduction(step(north_west, direction), BuildingQuality::Flag);
                }
            }
            BuildingQuality::Hut | BuildingQuality::House | BuildingQuality::Castle => {
                if let Some(flag) = extent.flag_of(point) {
                    penalty += self.close_by_penalty(engine, flag, BuildingQuality::Flag, previous);
                }
                let behind = if target == BuildingQuality::Castle {
                    BuildingQuality::Flag
                } else {
                    BuildingQuality::House
                };
                for direction in [Direction::West, Direction::NorthWest, Direction::NorthEast] {
                    penalty += castle_reduction(step(north_west, direction), behind);
                }
                for (from, direction) in [
                    (north_east, Direction::East),
                    (north_east, Direction::NorthEast),
                    (east, Direction::East),
                    (south_west, Direction::West),
                    (south_west, Direction::SouthWest),
                    (west, Direction::West),
                ] {
                    penalty += castle_reduction(step(from, direction), BuildingQuality::House);
                }
            }
            BuildingQuality::Mine => {
                if let Some(flag) = extent.flag_of(point) {
                    penalty += self.close_by_penalty(engine, flag, BuildingQuality::Flag, previous);
                }
            }
            BuildingQuality::Harbor => {}
        }

        for neighbour in [west, east, north_east, north_west, south_west, south_east]
            .into_iter()
            .flatten()
        {
            if self.local(neighbour, Resource::Stone) != 0 {
                penalty += penalties.stone_on_neighbour;
            } else if self.local(neighbour, Resource::Tree) != 0 {
                penalty += penalties.tree_on_neighbour;
            } else if self.local(neighbour, Resource::BorderLand) != 0 {
                penalty += penalties.border_on_neighbour;
            }
        }
        penalty
    }

    /// Cost of connecting a flag to the road network, or invalid when no
    /// connection exists.
    pub fn connection_penalty(&mut self, engine: &dyn Engine, flag: MapPoint) -> Score {
        if let Some(score) = self.connection_scores.get(&flag) {
            return *score;
        }
        let constraints = RoadConstraints::new(flag).exclude_from_building();
        let outcome = self.find_connection_point(engine, &constraints);
        let score = if outcome.is_found() {
            outcome.score
        } else {
            Score::INVALID
        };
        let _ = self.connection_scores.insert(flag, score);
        score
    }

    /// Location score of a site minus the cost of connecting its flag.
    pub fn building_score(
        &mut self,
        engine: &dyn Engine,
        point: MapPoint,
        building: BuildingType,
    ) -> Score {
        if let Some(score) = self.building_scores.get(&(point, building)) {
            return *score;
        }

        let location = match self.location_scores.get(&(point, building)) {
            Some(score) => *score,
            None => {
                let score = self.location_score(engine, point, building).nonzero();
                let _ = self.location_scores.insert((point, building), score);
                score
            }
        };

        let score = match self.extent().flag_of(point) {
            Some(flag) if location.is_valid() => {
                (location - self.connection_penalty(engine, flag)).nonzero()
            }
            _ => Score::INVALID,
        };
        let _ = self.building_scores.insert((point, building), score);
        score
    }

    /// Picks the best site for a building.
    ///
    /// When even the best site is invalid, the global counter of every
    /// locally consumed thing is halved so the building looks less
    /// attractive until the next full refresh.
    pub fn find_building_position(
        &mut self,
        engine: &dyn Engine,
        site: &SiteConstraints,
    ) -> Option<(MapPoint, Score)> {
        if self.potential_sites().is_empty() {
            return None;
        }

        let points: Vec<MapPoint> = match (site.close_to, site.close_to_distance) {
            (Some(close_to), Some(distance)) => self
                .extent()
                .points_in_radius(close_to, distance)
                .into_iter()
                .filter(|point| self.potential_sites().contains(point))
                .collect(),
            _ => self.potential_sites().iter().copied().collect(),
        };

        let mut candidates = Vec::with_capacity(points.len());
        for point in points {
            let score = self.building_score(engine, point, site.building);
            let distance = match site.close_to {
                Some(close_to) => self.connection_length(engine, point, close_to),
                None => None,
            };
            candidates.push(Candidate {
                point,
                score,
                distance,
            });
        }

        let best = candidates
            .iter()
            .copied()
            .reduce(|best, candidate| {
                if self.prefers(site, &candidate, &best) {
                    candidate
                } else {
                    best
                }
            })?;

        if let (Some(close_to), Some(distance)) = (site.close_to, site.close_to_distance) {
            if self.extent().distance(best.point, close_to) > distance {
                return None;
            }
        }

        debug!(
            building = ?site.building,
            point = ?best.point,
            score = best.score.get(),
            candidates = candidates.len(),
            "best building site"
        );
        if best.score.is_valid() {
            return Some((best.point, best.score));
        }

        for consumption in Catalog::shared().info(site.building).consumptions() {
            if consumption.is_local() {
                let halved = self.global()[consumption.thing] / 2;
                self.global_mut()[consumption.thing] = halved;
            }
        }
        None
    }

    fn prefers(&self, site: &SiteConstraints, a: &Candidate, b: &Candidate) -> bool {
        if !a.score.is_valid() {
            return false;
        }
        if !b.score.is_valid() {
            return true;
        }
        let mut score_a = a.score;
        let mut score_b = b.score;
        if site.close_to.is_some() {
            let limit = site.close_to_distance.unwrap_or(u32::MAX);
            let Some(distance_a) = a.distance.filter(|distance| *distance <= limit) else {
                return false;
            };
            let Some(distance_b) = b.distance.filter(|distance| *distance <= limit) else {
                return true;
            };
            let weight = self.tuning().penalties.close_to_point_distance;
            let gap = i64::from(distance_a) - i64::from(distance_b);
            score_a -= weight * gap.max(0);
            score_b -= weight * (-gap).max(0);
        }
        score_a.greater_than(&score_b)
    }
}
