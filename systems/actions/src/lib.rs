#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Goal execution for the settlement agent.
//!
//! Requests form trees of [`Action`]s held in an arena and addressed by
//! [`ActionId`]. The [`ActionManager`] drains its queue once per acting
//! tick: finished actions are finalized (failed ones undone first), then
//! pending ones are executed in queue order until one of them issues work.
//! Flag placements are the exception and may batch behind each other.
//! Road completion arrives asynchronously through [`ActionManager::handle_event`].

mod arena;
mod leaves;
mod requests;

use std::collections::{HashMap, VecDeque};
use std::fmt;

use serde::{Deserialize, Serialize};
use settler_ai_core::{Direction, Engine, Event, MapPoint, Specialist};
use settler_ai_model::{Lifetime, RoadConstraints, View};
use tracing::{debug, trace, warn};

pub use arena::{ActionId, DeletionCallback, Status};
pub use requests::{
    Action, BuildingRequest, DestroyRequest, FlagRequest, GroupAction, GroupKind, RoadRequest,
    SpecialistRequest,
};

use arena::Arena;

/// Limits of the action scheduler.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActionTuning {
    /// Queue length past which every pending action is cleared.
    pub emergency_queue_cap: usize,
}

impl Default for ActionTuning {
    fn default() -> Self {
        Self {
            emergency_queue_cap: 2000,
        }
    }
}

/// Decides whether a triggered action is due.
pub type Trigger = Box<dyn FnMut(&View, &dyn Engine) -> bool>;

/// Owns every action of one agent and runs them tick by tick.
pub struct ActionManager {
    tuning: ActionTuning,
    arena: Arena,
    queue: VecDeque<ActionId>,
    pending_roads: HashMap<(MapPoint, Vec<Direction>), ActionId>,
    delayed: Vec<(u64, ActionId)>,
    triggered: Vec<(Trigger, ActionId)>,
}

impl fmt::Debug for ActionManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionManager")
            .field("queue", &self.queue)
            .field("actions", &self.arena.len())
            .field("pending_roads", &self.pending_roads.len())
            .field("delayed", &self.delayed.len())
            .field("triggered", &self.triggered.len())
            .finish()
    }
}

impl Default for ActionManager {
    fn default() -> Self {
        Self::new(ActionTuning::default())
    }
}

impl ActionManager {
    /// Creates an empty manager.
    #[must_use]
    pub fn new(tuning: ActionTuning) -> Self {
        Self {
            tuning,
            arena: Arena::default(),
            queue: VecDeque::new(),
            pending_roads: HashMap::new(),
            delayed: Vec::new(),
            triggered: Vec::new(),
        }
    }

    /// Scheduler limits in use.
    #[must_use]
    pub const fn tuning(&self) -> &ActionTuning {
        &self.tuning
    }

    /// Whether nothing is queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Number of queued actions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Number of actions alive in the arena, queued or not.
    #[must_use]
    pub fn live_actions(&self) -> usize {
        self.arena.len()
    }

    /// Queued actions in execution order.
    pub fn queued(&self) -> impl Iterator<Item = ActionId> + '_ {
        self.queue.iter().copied()
    }

    /// Whether the action is still alive.
    #[must_use]
    pub fn contains(&self, id: ActionId) -> bool {
        self.arena.contains(id)
    }

    /// Status of a live action.
    #[must_use]
    pub fn status(&self, id: ActionId) -> Option<Status> {
        self.arena.status(id)
    }

    /// A live action.
    #[must_use]
    pub fn action(&self, id: ActionId) -> Option<&Action> {
        self.arena.get(id).map(|node| &node.action)
    }

    /// Children of a live action in insertion order.
    #[must_use]
    pub fn children(&self, id: ActionId) -> Vec<ActionId> {
        self.arena.children(id)
    }

    /// Parent of a live action.
    #[must_use]
    pub fn parent(&self, id: ActionId) -> Option<ActionId> {
        self.arena.parent(id)
    }

    /// Whether a submitted road still waits for its notification.
    #[must_use]
    pub fn is_awaiting_road(&self, origin: MapPoint, route: &[Direction]) -> bool {
        self.pending_roads.contains_key(&(origin, route.to_vec()))
    }

    /// Adds an action to the arena without queueing it.
    pub fn create(&mut self, parent: Option<ActionId>, action: Action) -> ActionId {
        let id = self.arena.insert(action, Status::New);
        if let Some(parent) = parent {
            self.arena.add_child(parent, id);
        }
        id
    }

    /// Attaches an unparented action to a parent.
    pub fn add_child(&mut self, parent: ActionId, child: ActionId) {
        self.arena.add_child(parent, child);
    }

    /// Queues an action behind everything already queued.
    pub fn append(&mut self, id: ActionId) {
        self.queue.push_back(id);
    }

    /// Queues a building request behind everything already queued. Types
    /// the engine does not offer fail straight away.
    pub fn construct_building(
        &mut self,
        engine: &dyn Engine,
        parent: Option<ActionId>,
        request: BuildingRequest,
    ) -> ActionId {
        let building = request.building();
        let id = self.create(parent, Action::Building(request));
        self.queue.push_back(id);
        debug!(action = %id, ?building, "building requested");
        if !engine.can_build(building) {
            self.arena.set_status(id, Status::Failed);
        }
        id
    }

    /// Queues a road request ahead of everything already queued.
    pub fn construct_road(
        &mut self,
        parent: Option<ActionId>,
        constraints: RoadConstraints,
    ) -> ActionId {
        let id = self.create(parent, Action::Road(RoadRequest::new(constraints)));
        self.queue.push_front(id);
        id
    }

    /// Queues a flag request ahead of everything already queued.
    pub fn construct_flag(
        &mut self,
        parent: Option<ActionId>,
        point: MapPoint,
        lifetime: Lifetime,
    ) -> ActionId {
        let id = self.create(parent, Action::Flag(FlagRequest::new(point, lifetime)));
        self.queue.push_front(id);
        id
    }

    /// Queues the demolition of a building.
    pub fn destroy_building(&mut self, point: MapPoint) -> ActionId {
        let id = self.create(None, Action::Destroy(DestroyRequest::new(point)));
        self.queue.push_back(id);
        id
    }

    /// Builds, without queueing, the actions that bring geologists to a
    /// point.
    ///
    /// A connected flag only needs the call. Anywhere else a temporary flag
    /// is placed first and connected by a temporary road that calls the
    /// geologists once it stands.
    pub fn request_geologists(
        &mut self,
        view: &View,
        parent: Option<ActionId>,
        point: MapPoint,
        count: u32,
    ) -> ActionId {
        if view.is_connected_flag(point) {
            return self.create(
                parent,
                Action::Specialist(SpecialistRequest {
                    flag: point,
                    specialist: Specialist::Geologist,
                    amount: count,
                }),
            );
        }

        let outer = self.create(parent, Action::Group(GroupAction::new(GroupKind::Execute)));
        let _ = self.create(
            Some(outer),
            Action::Flag(FlagRequest::new(point, Lifetime::Temporary)),
        );
        let constraints = RoadConstraints::new(point)
            .lifetime(Lifetime::Temporary)
            .exclude_from()
            .specialist(Specialist::Geologist, count);
        let _ = self.create(Some(outer), Action::Road(RoadRequest::new(constraints)));
        outer
    }

    /// Queues an action after `ticks` further calls to [`Self::execute`].
    pub fn delay(&mut self, ticks: u64, id: ActionId) {
        self.delayed.push((ticks, id));
    }

    /// Queues an action once `trigger` holds at the start of an execution.
    pub fn trigger(&mut self, trigger: Trigger, id: ActionId) {
        self.triggered.push((trigger, id));
    }

    /// Registers a callback for when the action leaves the arena.
    pub fn on_delete(&mut self, id: ActionId, callback: DeletionCallback) {
        self.arena.on_delete(id, callback);
    }

    /// Matches a road notification against the submitted roads.
    ///
    /// Other events are ignored.
    pub fn handle_event(&mut self, event: &Event) {
        let (origin, route, built) = match event {
            Event::RoadConstructed { origin, route } => (*origin, route, true),
            Event::RoadConstructionFailed { origin, route } => (*origin, route, false),
            _ => return,
        };
        let key = (origin, route.clone());
        let Some(id) = self.pending_roads.get(&key).copied() else {
            debug!(?origin, ?route, "road notification could not be associated");
            return;
        };
        if self.arena.status(id) != Some(Status::Waiting) {
            return;
        }
        let _ = self.pending_roads.remove(&key);
        let status = if built { Status::Success } else { Status::Retry };
        self.arena.set_status(id, status);
    }

    /// Cancels everything queued. Untouched leaves are aborted, everything
    /// else fails and is undone by the following executions.
    pub fn clear(&mut self) {
        warn!(queued = self.queue.len(), "clearing every queued action");
        let queued: Vec<ActionId> = self.queue.iter().copied().collect();
        for id in queued {
            let Some(node) = self.arena.get(id) else {
                continue;
            };
            if node.status.is_finished() {
                continue;
            }
            let status = if node.status == Status::New && node.children.is_empty() {
                Status::Aborted
            } else {
                Status::Failed
            };
            self.arena.set_status(id, status);
        }
    }

    /// Undoes an action and its subtree. Reports whether anything was
    /// rolled back.
    pub fn undo(&mut self, id: ActionId, engine: &mut dyn Engine, view: &mut View) -> bool {
        self.undo_action(id, engine, view)
    }

    /// Runs one scheduling pass.
    pub fn execute(&mut self, engine: &mut dyn Engine, view: &mut View) {
        if self.queue.len() > self.tuning.emergency_queue_cap {
            self.clear();
        }
        self.release_deferred(view, &*engine);
        if self.queue.is_empty() {
            return;
        }
        debug!(queued = self.queue.len(), "executing actions");
        trace!("\n{}", self.describe());

        let mut index = 0;
        while let Some(&id) = self.queue.get(index) {
            match self.arena.status(id) {
                None => {
                    let _ = self.queue.remove(index);
                }
                Some(status) if status.is_finished() => {
                    let undone = status == Status::Failed && self.undo_action(id, engine, view);
                    self.finalize_action(id, engine, view);
                    let _ = self.queue.remove(index);
                    self.release(id, view);
                    if undone {
                        return;
                    }
                }
                Some(_) => index += 1,
            }
        }

        let queued: Vec<ActionId> = self.queue.iter().copied().collect();
        let mut planted_flags = false;
        for id in queued {
            let Some(is_flag) = self.arena.get(id).map(|node| node.action.is_flag()) else {
                continue;
            };
            if planted_flags && !is_flag {
                return;
            }
            if !self.arena.is_finished(id) && self.execute_action(id, engine, view) {
                if !is_flag {
                    return;
                }
                planted_flags = true;
            }
        }
    }

    /// Queued action trees, one line per action.
    #[must_use]
    pub fn describe(&self) -> String {
        let mut lines = Vec::new();
        for id in &self.queue {
            if self.arena.parent(*id).is_none() {
                self.describe_into(*id, &mut lines);
            }
        }
        lines.join("\n")
    }

    fn describe_into(&self, id: ActionId, lines: &mut Vec<String>) {
        let Some(node) = self.arena.get(id) else {
            return;
        };
        let indent = "\t".repeat(self.arena.depth(id));
        lines.push(format!("{indent}{id} [{:?}] {}", node.status, node.action));
        for child in &node.children {
            self.describe_into(*child, lines);
        }
    }

    fn release_deferred(&mut self, view: &View, engine: &dyn Engine) {
        let mut index = 0;
        while let Some(entry) = self.delayed.get_mut(index) {
            entry.0 = entry.0.saturating_sub(1);
            if entry.0 == 0 {
                let (_, id) = self.delayed.swap_remove(index);
                self.queue.push_back(id);
            } else {
                index += 1;
            }
        }

        let mut index = 0;
        while let Some((trigger, _)) = self.triggered.get_mut(index) {
            if trigger(view, engine) {
                let (_, id) = self.triggered.swap_remove(index);
                self.queue.push_back(id);
            } else {
                index += 1;
            }
        }
    }

    // Roots leave the arena together with their subtree once finalized.
    fn release(&mut self, id: ActionId, view: &mut View) {
        if !self.arena.contains(id) || self.arena.parent(id).is_some() {
            return;
        }
        for (status, callback) in self.arena.remove_subtree(id) {
            callback(status, view);
        }
        let arena = &self.arena;
        self.pending_roads.retain(|_, road| arena.contains(*road));
    }
}
