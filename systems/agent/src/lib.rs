#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Tick entry point of the settlement agent.
//!
//! [`Agent`] owns the world model, the action scheduler and the road keeper
//! of one player. The engine calls [`Agent::on_tick`] every tick with the
//! events it produced since the last call; the agent routes them, and on
//! acting ticks refreshes its model and advances pending work.

mod commissioning;
mod config;

use settler_ai_core::{BuildingType, Engine, Event, MapExtent, MapPoint, Thing};
use settler_ai_model::{Catalog, SiteConstraints, View};
use settler_ai_system_actions::{ActionId, ActionManager, BuildingRequest, Status};
use settler_ai_system_roads::RoadKeeper;
use tracing::{debug, info};

pub use config::{AgentConfig, ConfigError, PlayerTuning};

use commissioning::Commissioning;

/// Autonomous economic player.
#[derive(Debug)]
pub struct Agent {
    player: PlayerTuning,
    view: View,
    actions: ActionManager,
    roads: RoadKeeper,
    commissioning: Commissioning,
    eligible_ticks: u64,
    acts: u64,
}

impl Agent {
    /// Creates an agent for a map of the given size.
    #[must_use]
    pub fn new(extent: MapExtent, config: AgentConfig) -> Self {
        let AgentConfig {
            score,
            actions,
            roads,
            player,
        } = config;
        Self {
            view: View::new(extent, score),
            actions: ActionManager::new(actions),
            roads: RoadKeeper::new(roads, player.rng_seed),
            player,
            commissioning: Commissioning::default(),
            eligible_ticks: 0,
            acts: 0,
        }
    }

    /// The agent's model of the map.
    #[must_use]
    pub const fn view(&self) -> &View {
        &self.view
    }

    /// Mutable access to the model.
    pub fn view_mut(&mut self) -> &mut View {
        &mut self.view
    }

    /// The action scheduler.
    #[must_use]
    pub const fn actions(&self) -> &ActionManager {
        &self.actions
    }

    /// Mutable access to the action scheduler.
    pub fn actions_mut(&mut self) -> &mut ActionManager {
        &mut self.actions
    }

    /// The road keeper.
    #[must_use]
    pub const fn roads(&self) -> &RoadKeeper {
        &self.roads
    }

    /// Mutable access to the road keeper.
    pub fn roads_mut(&mut self) -> &mut RoadKeeper {
        &mut self.roads
    }

    /// Number of ticks the agent has acted on.
    #[must_use]
    pub const fn acts(&self) -> u64 {
        self.acts
    }

    /// Finished buildings not yet in service.
    #[must_use]
    pub fn pending_commissionings(&self) -> usize {
        self.commissioning.len()
    }

    /// Queues a building on the best site the model finds.
    pub fn request_building(&mut self, engine: &dyn Engine, building: BuildingType) -> ActionId {
        let request = BuildingRequest::new(SiteConstraints::new(building));
        self.actions.construct_building(engine, None, request)
    }

    /// Sends `count` geologists to `point`, laying a temporary flag and
    /// road first when needed.
    pub fn request_geologists(&mut self, point: MapPoint, count: u32) -> ActionId {
        let id = self
            .actions
            .request_geologists(&self.view, None, point, count);
        self.actions.append(id);
        self.roads.keep_flag(point, 2);
        id
    }

    /// Zeroes the global counter of `thing` once `action` leaves the
    /// scheduler without success, so the demand behind it is re-evaluated.
    pub fn reset_global_on_failure(&mut self, action: ActionId, thing: impl Into<Thing>) {
        let thing = thing.into();
        self.actions.on_delete(
            action,
            Box::new(move |status, view| {
                if status != Status::Success {
                    debug!(?thing, ?status, "global counter reset");
                    view.global_mut()[thing] = 0;
                }
            }),
        );
    }

    /// Advances the agent by one engine tick.
    ///
    /// Events are routed on every call. The agent acts only on
    /// authoritative ticks past `minimal_tick`, and then only every
    /// `act_every` of them.
    pub fn on_tick(
        &mut self,
        engine: &mut dyn Engine,
        tick: u64,
        authoritative: bool,
        events: &[Event],
    ) {
        for event in events {
            self.route(event);
        }
        if !authoritative || tick < self.player.minimal_tick {
            return;
        }
        self.eligible_ticks += 1;
        if (self.eligible_ticks - 1) % self.player.act_every.max(1) != 0 {
            return;
        }

        self.acts += 1;
        let full = (self.acts - 1) % self.player.full_update_every.max(1) == 0;
        self.view.invalidate(full);
        self.view.update(&*engine, full);
        self.commissioning.check(&*engine, &mut self.view);

        if !self.actions.is_empty() {
            self.actions.execute(engine, &mut self.view);
            return;
        }
        if self
            .roads
            .upkeep(self.acts, engine, &mut self.view, &mut self.actions)
        {
            debug!(act = self.acts, "road upkeep issued work");
        }
        self.actions.execute(engine, &mut self.view);
    }

    fn route(&mut self, event: &Event) {
        match event {
            Event::RoadConstructed { .. } | Event::RoadConstructionFailed { .. } => {
                self.actions.handle_event(event);
            }
            Event::BuildingConstructed { point, building } => {
                self.commissioning.record(*point, *building);
            }
            Event::BuildingDestroyed { point, building } => {
                self.commissioning.erase(*point);
                self.view.register_lost_building(*point, *building);
            }
            Event::BuildingLost { point, building } => {
                self.commissioning.erase(*point);
                self.view.register_lost_building(*point, *building);
                self.view.request_full_update();
            }
            Event::BuildingCaptured { point, building } => {
                debug!(?point, ?building, "building captured");
                self.view.request_full_update();
            }
            Event::BuildingOutOfResources { point, building } => {
                self.view.register_out_of_resources(*point, *building);
                if Catalog::shared().info(*building).consumes_only_resources() {
                    info!(?point, ?building, "exhausted building demolished");
                    let _ = self.actions.destroy_building(*point);
                }
            }
            Event::LandLost { .. } | Event::VisibilityChanged { .. } => {
                self.view.request_full_update();
            }
        }
    }
}
