#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Road-network upkeep for the settlement agent.
//!
//! The keeper prunes dead-end flags, removes idle road segments, bridges
//! disconnected parts of the network one road per call and relieves
//! congested flags with donkeys and secondary roads.

use std::collections::{BTreeMap, BTreeSet};

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use settler_ai_core::{Command, Concept, Direction, Engine, MapPoint, Score};
use settler_ai_model::{RoadConstraints, RouteKind, View};
use settler_ai_system_actions::ActionManager;
use tracing::{debug, warn};

/// Cadence and thresholds of road upkeep. Intervals count acting ticks.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoadTuning {
    /// Acting ticks between idle-road sweeps.
    pub destroy_unused_roads_interval: u64,
    /// Acting ticks between reconnection passes when nothing asked for one.
    pub reconnect_flags_interval: u64,
    /// Carrier productivity in percent below which a segment is idle.
    pub min_road_productivity: u32,
    /// Secondary roads requested per warehouse once the network is whole.
    pub secondary_roads_per_warehouse: usize,
    /// Wares waiting at a flag that make it congested.
    pub congested_flag_wares: u32,
    /// Congestion is checked every this many acting ticks per known flag.
    pub congestion_check_interval: u64,
    /// Chance in percent that a congested flag gets a secondary road.
    pub secondary_road_chance: u32,
}

impl Default for RoadTuning {
    fn default() -> Self {
        Self {
            destroy_unused_roads_interval: 3000,
            reconnect_flags_interval: 5000,
            min_road_productivity: 10,
            secondary_roads_per_warehouse: 4,
            congested_flag_wares: 4,
            congestion_check_interval: 10,
            secondary_road_chance: 50,
        }
    }
}

/// Keeps the road network connected and lean.
#[derive(Debug)]
pub struct RoadKeeper {
    tuning: RoadTuning,
    rng: ChaCha8Rng,
    should_reconnect: bool,
    expeditions: BTreeMap<MapPoint, u32>,
}

impl RoadKeeper {
    /// Creates a keeper whose random choices follow `seed`.
    #[must_use]
    pub fn new(tuning: RoadTuning, seed: u64) -> Self {
        Self {
            tuning,
            rng: ChaCha8Rng::seed_from_u64(seed),
            should_reconnect: false,
            expeditions: BTreeMap::new(),
        }
    }

    /// Upkeep thresholds in use.
    #[must_use]
    pub const fn tuning(&self) -> &RoadTuning {
        &self.tuning
    }

    /// Whether the next pass reconnects regardless of its interval.
    #[must_use]
    pub const fn should_reconnect(&self) -> bool {
        self.should_reconnect
    }

    /// Makes the next pass reconnect regardless of its interval.
    pub fn request_reconnect(&mut self) {
        self.should_reconnect = true;
    }

    /// Spares a dead-end flag from pruning for the next `passes`
    /// reconnection passes, e.g. while geologists work around it.
    pub fn keep_flag(&mut self, flag: MapPoint, passes: u32) {
        *self.expeditions.entry(flag).or_insert(0) += passes;
    }

    /// Runs one upkeep pass. Reports whether anything was issued.
    pub fn upkeep(
        &mut self,
        act: u64,
        engine: &mut dyn Engine,
        view: &mut View,
        actions: &mut ActionManager,
    ) -> bool {
        if self.destroy_unused_roads(act, engine, view) {
            self.should_reconnect = true;
        }
        if self.reconnect_flags(act, engine, view, actions) {
            return true;
        }
        self.relieve_congestion(act, engine, view, actions)
    }

    /// Demolishes road segments whose carriers idle. Roads touching farm
    /// land or the border must be fully busy to stay.
    pub fn destroy_unused_roads(&mut self, act: u64, engine: &mut dyn Engine, view: &View) -> bool {
        if act % self.tuning.destroy_unused_roads_interval.max(1) != 0 {
            return false;
        }
        let crowded = |point: MapPoint| {
            view.local(point, Concept::FarmSpace) != 0 || view.local(point, Concept::NearBorder) != 0
        };

        let mut changed = false;
        for flag in view.flags().clone() {
            if !engine.has_flag(flag) {
                continue;
            }
            let has_building = has_attached_building(engine, view, flag);
            for direction in Direction::ALL {
                if has_building && direction == Direction::NorthWest {
                    continue;
                }
                let Some(segment) = engine.road_segment(flag, direction) else {
                    continue;
                };
                let special = crowded(flag) || crowded(segment.other_end);
                let productivity = segment.productivity;
                if productivity >= self.tuning.min_road_productivity
                    && !(special && productivity < 100)
                {
                    continue;
                }
                match engine.submit(Command::DestroyRoad { flag, direction }) {
                    Ok(()) => {
                        debug!(?flag, ?direction, productivity, "idle road removed");
                        changed = true;
                    }
                    Err(rejection) => debug!(?flag, ?direction, %rejection, "road removal refused"),
                }
            }
        }

        self.should_reconnect |= changed;
        changed
    }

    /// Prunes useless flags and bridges the road network back together.
    ///
    /// Dead-end flags without wares go first; if any was removed the pass
    /// ends there. Otherwise the network is split into components. A single
    /// component gets secondary roads from every warehouse. Several get one
    /// bridge, the cheapest connection from any component but the leading
    /// one, which holds a warehouse or else the most flags.
    pub fn reconnect_flags(
        &mut self,
        act: u64,
        engine: &mut dyn Engine,
        view: &mut View,
        actions: &mut ActionManager,
    ) -> bool {
        if !self.should_reconnect && act % self.tuning.reconnect_flags_interval.max(1) != 0 {
            return false;
        }
        self.should_reconnect = true;

        if self.prune_dead_ends(engine, view) {
            return true;
        }

        let partition = view.road_components(&*engine);
        let mut components = partition.components;
        let mut changed = false;
        for flag in partition.singletons {
            if has_attached_building(engine, view, flag) {
                components.push(vec![flag]);
            } else {
                changed |= view.destroy_flag(engine, flag, 0, false, None);
            }
        }

        if components.len() <= 1 {
            let mut issued = changed;
            for flag in view.warehouse_flags() {
                for _ in 0..self.tuning.secondary_roads_per_warehouse {
                    let constraints = RoadConstraints::new(flag)
                        .exclude_from()
                        .kind(RouteKind::Secondary);
                    let _ = actions.construct_road(None, constraints);
                    issued = true;
                }
            }
            self.should_reconnect = false;
            return issued;
        }
        if changed {
            return true;
        }

        let warehouses: BTreeSet<MapPoint> = view.warehouse_flags().into_iter().collect();
        let holds_warehouse =
            |component: &[MapPoint]| component.iter().any(|flag| warehouses.contains(flag));
        components.sort_by(|a, b| {
            holds_warehouse(b)
                .cmp(&holds_warehouse(a))
                .then(b.len().cmp(&a.len()))
        });

        let mut best: Option<(Score, MapPoint, MapPoint)> = None;
        for component in components.iter().skip(1) {
            for &flag in component {
                let constraints = RoadConstraints::new(flag)
                    .exclude_from()
                    .excluding(component.iter().copied());
                let outcome = view.find_connection_point(&*engine, &constraints);
                let Some(target) = outcome.target else {
                    continue;
                };
                if !outcome.score.is_valid() {
                    continue;
                }
                if best
                    .as_ref()
                    .is_some_and(|(score, _, _)| !outcome.score.less_than(score))
                {
                    continue;
                }
                best = Some((outcome.score, flag, target));
            }
        }

        let Some((score, from, to)) = best else {
            warn!(components = components.len(), "road network cannot be reconnected");
            self.should_reconnect = false;
            return false;
        };
        debug!(?from, ?to, score = score.get(), components = components.len(), "bridging road components");
        let _ = actions.construct_road(None, RoadConstraints::new(from).to(to));
        true
    }

    fn prune_dead_ends(&mut self, engine: &mut dyn Engine, view: &mut View) -> bool {
        let mut pruned = false;
        for flag in view.flags().clone() {
            if !engine.has_flag(flag) || view.connected_roads(&*engine, flag) >= 2 {
                continue;
            }
            if let Some(passes) = self.expeditions.get_mut(&flag) {
                *passes = passes.saturating_sub(1);
                if *passes > 0 {
                    continue;
                }
                let _ = self.expeditions.remove(&flag);
            }
            if engine.wares_at_flag(flag) == 0 && view.destroy_flag(engine, flag, 1, false, None) {
                debug!(?flag, "dead-end flag pruned");
                pruned = true;
            }
        }
        pruned
    }

    /// Upgrades the roads of congested flags to donkey roads and, by chance,
    /// adds a secondary road from one of them.
    pub fn relieve_congestion(
        &mut self,
        act: u64,
        engine: &mut dyn Engine,
        view: &View,
        actions: &mut ActionManager,
    ) -> bool {
        let flags = view.flags().len() as u64;
        let every = self.tuning.congestion_check_interval.saturating_mul(flags).max(1);
        if act % every != 0 {
            return false;
        }

        let mut issued = false;
        let mut secondary_requested = false;
        for flag in view.flags().clone() {
            if !engine.has_flag(flag) || engine.wares_at_flag(flag) < self.tuning.congested_flag_wares {
                continue;
            }
            let has_building = has_attached_building(engine, view, flag);
            for direction in Direction::ALL {
                let door = has_building && direction == Direction::NorthWest;
                if door || engine.road_segment(flag, direction).is_none() {
                    continue;
                }
                match engine.submit(Command::UpgradeRoad { flag, direction }) {
                    Ok(()) => issued = true,
                    Err(rejection) => debug!(?flag, ?direction, %rejection, "road upgrade refused"),
                }
            }
            if !secondary_requested && self.rng.gen_range(0..100) < self.tuning.secondary_road_chance {
                secondary_requested = self.create_secondary_road(engine, view, actions, flag);
                issued |= secondary_requested;
            }
        }
        issued
    }

    /// Queues two secondary roads from a flag when a worthwhile route
    /// exists right now.
    pub fn create_secondary_road(
        &mut self,
        engine: &dyn Engine,
        view: &View,
        actions: &mut ActionManager,
        flag: MapPoint,
    ) -> bool {
        if !engine.has_flag(flag) {
            return false;
        }
        let constraints = RoadConstraints::new(flag)
            .exclude_from()
            .kind(RouteKind::Secondary);
        if !view.find_connection_point(engine, &constraints).is_found() {
            return false;
        }
        debug!(?flag, "secondary roads requested");
        let _ = actions.construct_road(None, constraints.clone());
        let _ = actions.construct_road(None, constraints);
        true
    }
}

fn has_attached_building(engine: &dyn Engine, view: &View, flag: MapPoint) -> bool {
    view.extent()
        .building_of(flag)
        .is_some_and(|point| engine.building_at(point).is_some())
}
