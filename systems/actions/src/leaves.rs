use settler_ai_core::{BuildingQuality, BuildingType, Command, Engine};
use settler_ai_model::{Lifetime, RoadConstraints, RouteKind, View};
use tracing::{debug, warn};

use crate::requests::{
    Action, BuildingRequest, FlagRequest, GroupAction, GroupKind, RoadRequest, SpecialistRequest,
};
use crate::{ActionId, ActionManager, Status};

impl ActionManager {
    fn action_of(&self, id: ActionId) -> Option<Action> {
        self.arena.get(id).map(|node| node.action.clone())
    }

    fn store(&mut self, id: ActionId, action: Action) {
        if let Some(node) = self.arena.get_mut(id) {
            node.action = action;
        }
    }

    // A fresh action gets a second chance, anything else is done for.
    fn fail(&mut self, id: ActionId) -> bool {
        let status = if self.arena.status(id) == Some(Status::New) {
            Status::Retry
        } else {
            Status::Failed
        };
        self.arena.set_status(id, status);
        true
    }

    /// Runs one step of an action. Reports whether work was issued.
    pub(crate) fn execute_action(
        &mut self,
        id: ActionId,
        engine: &mut dyn Engine,
        view: &mut View,
    ) -> bool {
        if self.arena.is_finished(id) {
            return false;
        }
        let Some(action) = self.action_of(id) else {
            return false;
        };
        match action {
            Action::Building(mut request) => {
                let issued = self.place_building(id, &mut request, engine, view);
                self.store(id, Action::Building(request));
                issued
            }
            Action::Road(mut request) => {
                let issued = self.build_road(id, &mut request, engine, view);
                self.store(id, Action::Road(request));
                issued
            }
            Action::Flag(request) => self.plant_flag(id, request, engine),
            Action::Specialist(request) => self.call_specialists(id, request, engine),
            Action::Destroy(request) => {
                match engine.submit(Command::DestroyBuilding {
                    point: request.point,
                }) {
                    Ok(()) => {
                        self.arena.set_status(id, Status::Success);
                        true
                    }
                    Err(rejection) => {
                        debug!(point = ?request.point, %rejection, "demolition refused");
                        self.arena.set_status(id, Status::Failed);
                        false
                    }
                }
            }
            Action::Group(group) => self.drive_group(id, group, engine, view),
        }
    }

    /// Rolls an action back. Reports whether anything was undone.
    pub(crate) fn undo_action(
        &mut self,
        id: ActionId,
        engine: &mut dyn Engine,
        view: &mut View,
    ) -> bool {
        let Some(action) = self.action_of(id) else {
            return false;
        };
        match action {
            Action::Building(mut request) => {
                let undone = self.demolish_building(id, &mut request, engine, view);
                self.store(id, Action::Building(request));
                undone
            }
            Action::Road(mut request) => {
                let undone = self.remove_road(id, &mut request, engine, view);
                self.store(id, Action::Road(request));
                undone
            }
            Action::Flag(request) => {
                if self.arena.status(id) != Some(Status::Success) {
                    return false;
                }
                let _ = self.undo_children(id, engine, view);
                let _ = view.destroy_flag(engine, request.point, 0, false, None);
                true
            }
            Action::Specialist(_) | Action::Destroy(_) | Action::Group(_) => {
                self.undo_children(id, engine, view)
            }
        }
    }

    // Marks the action undone and undoes its children. Every action is
    // undone at most once.
    fn undo_children(&mut self, id: ActionId, engine: &mut dyn Engine, view: &mut View) -> bool {
        let Some(node) = self.arena.get_mut(id) else {
            return false;
        };
        if node.undone {
            return false;
        }
        node.undone = true;
        // A rolled back failure still reports the failure.
        if node.status != Status::Failed {
            self.arena.set_status(id, Status::Undone);
        }
        for child in self.arena.children(id) {
            let _ = self.undo_action(child, engine, view);
        }
        true
    }

    /// Applies the lasting effects of a finished action to the model.
    pub(crate) fn finalize_action(&mut self, id: ActionId, engine: &mut dyn Engine, view: &mut View) {
        let Some(action) = self.action_of(id) else {
            return;
        };
        let succeeded = self.arena.status(id) == Some(Status::Success);
        match &action {
            Action::Group(_) => {
                for child in self.arena.children(id) {
                    let pending = self
                        .arena
                        .get(child)
                        .is_some_and(|node| !node.retired && node.status.is_finished());
                    if pending {
                        self.finalize_action(child, engine, view);
                    }
                }
            }
            Action::Building(request) => {
                if let (true, Some(flag)) = (succeeded, request.flag()) {
                    view.insert_flag(flag);
                }
            }
            Action::Road(request) => {
                self.pending_roads.retain(|_, road| *road != id);
                if let (true, Some((specialist, count))) = (succeeded, request.constraints.specialist)
                {
                    for _ in 0..count {
                        if let Err(rejection) = engine.submit(Command::CallSpecialist {
                            flag: request.from(),
                            specialist,
                        }) {
                            debug!(flag = ?request.from(), ?specialist, %rejection, "specialist call refused");
                        }
                    }
                }
            }
            Action::Flag(request) => {
                if succeeded {
                    if engine.has_flag(request.point) {
                        view.insert_flag(request.point);
                    } else {
                        self.arena.set_status(id, Status::Failed);
                    }
                }
            }
            Action::Specialist(_) | Action::Destroy(_) => {}
        }
        if let Some(node) = self.arena.get_mut(id) {
            node.retired = true;
        }
        debug!(action = %id, status = ?self.arena.status(id), "finalized {action}");
    }

    fn place_building(
        &mut self,
        id: ActionId,
        request: &mut BuildingRequest,
        engine: &mut dyn Engine,
        view: &mut View,
    ) -> bool {
        if !matches!(self.arena.status(id), Some(Status::New | Status::Retry)) {
            return false;
        }
        request.clear_flag();
        let building = request.building();
        if !engine.can_build(building) {
            debug!(action = %id, ?building, "building type unavailable");
            return self.fail(id);
        }
        if !view.meets_global_consumption(building, view.tuning().important_commodity_slack) {
            debug!(action = %id, ?building, "global consumption unmet");
            return self.fail(id);
        }

        let point = match request.requested {
            Some(point) => Some(point),
            None => view
                .find_building_position(&*engine, &request.site)
                .map(|(point, score)| {
                    debug!(action = %id, ?building, ?point, score = score.get(), "site chosen");
                    point
                }),
        };
        let Some(point) = point else {
            debug!(action = %id, ?building, "no site found");
            return self.fail(id);
        };
        let Some(flag) = view.extent().flag_of(point) else {
            return self.fail(id);
        };
        if let Err(rejection) = engine.submit(Command::SetBuildingSite { point, building }) {
            debug!(action = %id, ?point, %rejection, "building site refused");
            view.invalidate(true);
            return self.fail(id);
        }
        request.set_placed(point, Some(flag));

        if engine.has_flag(flag) && view.is_connected_flag(flag) {
            self.arena.set_status(id, Status::Success);
            return true;
        }
        let lifetime = match building {
            BuildingType::Forester | BuildingType::Barracks => Lifetime::Temporary,
            _ => Lifetime::Permanent,
        };
        let _ = self.construct_road(
            Some(id),
            RoadConstraints::new(flag).exclude_from().lifetime(lifetime),
        );
        self.arena.set_status(id, Status::Waiting);
        true
    }

    fn demolish_building(
        &mut self,
        id: ActionId,
        request: &mut BuildingRequest,
        engine: &mut dyn Engine,
        view: &mut View,
    ) -> bool {
        if !self.undo_children(id, engine, view) {
            return false;
        }
        let Some(point) = request.placed() else {
            return false;
        };
        let building = request.building();
        if engine.building_at(point) != Some(building) {
            warn!(?point, ?building, "expected building not found");
            return false;
        }
        if let Err(rejection) = engine.submit(Command::DestroyBuilding { point }) {
            warn!(?point, %rejection, "demolition refused");
            return false;
        }
        let _ = view.unregister_building(point, building);

        let flag = request.flag().or_else(|| view.extent().flag_of(point));
        match flag {
            Some(flag) if engine.has_flag(flag) => {
                request.set_flag_removed(view.destroy_flag(engine, flag, 1, true, None));
            }
            _ => warn!(?point, "expected flag not found"),
        }
        true
    }

    fn build_road(
        &mut self,
        id: ActionId,
        request: &mut RoadRequest,
        engine: &mut dyn Engine,
        view: &mut View,
    ) -> bool {
        match self.arena.status(id) {
            Some(Status::New | Status::Retry) => {}
            Some(Status::Waiting) => {
                debug!(action = %id, "road notification never arrived");
                self.arena.set_status(id, Status::Failed);
                return false;
            }
            _ => return false,
        }
        let from = request.from();
        if !engine.has_flag(from) {
            debug!(action = %id, ?from, "road origin has no flag");
            return self.fail(id);
        }

        let outcome = view.find_connection_point(&*engine, &request.constraints);
        let Some(target) = outcome.target else {
            debug!(action = %id, ?from, "no connection point");
            return self.fail(id);
        };
        request.set_route(target, outcome.route.clone());
        if target == from {
            self.arena.set_status(id, Status::Success);
            return true;
        }
        if outcome.route.len() < 2 {
            return self.fail(id);
        }

        let existing = match request.constraints.kind {
            RouteKind::Best => Some(
                RoadConstraints::new(from)
                    .to(target)
                    .kind(RouteKind::Shortest),
            ),
            RouteKind::Secondary => {
                let cap = outcome
                    .score
                    .get()
                    .saturating_mul(view.tuning().secondary_road_factor);
                Some(
                    RoadConstraints::new(from)
                        .to(target)
                        .kind(RouteKind::Shortest)
                        .maximal_cost(cap),
                )
            }
            RouteKind::Shortest | RouteKind::Terrain => None,
        };
        if let Some(existing) = existing {
            if view.find_road_connection(&*engine, &existing).is_found() {
                debug!(action = %id, ?from, ?target, "already connected by road");
                return self.fail(id);
            }
        }

        let route = outcome.route;
        if let Err(rejection) = engine.submit(Command::BuildRoad {
            origin: from,
            route: route.clone(),
        }) {
            debug!(action = %id, ?from, %rejection, "road refused");
            return self.fail(id);
        }
        self.arena.set_status(id, Status::Waiting);

        let extent = view.extent();
        let mut flags = Vec::new();
        let mut current = from;
        for direction in &route[..route.len() - 1] {
            let Some(next) = extent.neighbour(current, *direction) else {
                break;
            };
            current = next;
            if engine.building_quality(current) > BuildingQuality::Nothing {
                flags.push(current);
            }
        }
        for point in flags.into_iter().rev() {
            let _ = self.construct_flag(None, point, request.constraints.lifetime);
        }
        let _ = self.pending_roads.insert((from, route), id);
        true
    }

    fn remove_road(
        &mut self,
        id: ActionId,
        request: &mut RoadRequest,
        engine: &mut dyn Engine,
        view: &mut View,
    ) -> bool {
        self.pending_roads.retain(|_, road| *road != id);
        if !self.undo_children(id, engine, view) || request.route().is_empty() {
            return false;
        }
        let extent = view.extent();
        let route = request.route().to_vec();
        let mut current = request.from();
        for direction in &route[..route.len() - 1] {
            let Some(next) = extent.neighbour(current, *direction) else {
                break;
            };
            current = next;
            if view.is_flag(current) && !view.destroy_flag(engine, current, 2, false, Some(*direction))
            {
                break;
            }
        }
        request.clear_route();
        true
    }

    fn plant_flag(&mut self, id: ActionId, request: FlagRequest, engine: &mut dyn Engine) -> bool {
        if engine.has_flag(request.point) {
            self.arena.set_status(id, Status::Success);
            return false;
        }
        if self.arena.status(id) == Some(Status::Waiting) {
            self.arena.set_status(id, Status::Failed);
            return false;
        }
        if let Err(rejection) = engine.submit(Command::SetFlag {
            point: request.point,
        }) {
            debug!(action = %id, point = ?request.point, %rejection, "flag refused");
            self.arena.set_status(id, Status::Failed);
            return false;
        }
        self.arena.set_status(id, Status::Waiting);
        true
    }

    fn call_specialists(
        &mut self,
        id: ActionId,
        request: SpecialistRequest,
        engine: &mut dyn Engine,
    ) -> bool {
        let mut called = false;
        for _ in 0..request.amount {
            if let Err(rejection) = engine.submit(Command::CallSpecialist {
                flag: request.flag,
                specialist: request.specialist,
            }) {
                debug!(action = %id, flag = ?request.flag, %rejection, "specialist call refused");
                let status = if called { Status::Success } else { Status::Failed };
                self.arena.set_status(id, status);
                return called;
            }
            called = true;
        }
        self.arena.set_status(id, Status::Success);
        called
    }

    fn drive_group(
        &mut self,
        id: ActionId,
        mut group: GroupAction,
        engine: &mut dyn Engine,
        view: &mut View,
    ) -> bool {
        self.arena.set_status(id, Status::Waiting);
        let children = self.arena.children(id);
        loop {
            let Some(&child) = children.get(group.index()) else {
                self.store(id, Action::Group(group));
                let status = if group.kind == GroupKind::Any {
                    Status::Failed
                } else {
                    Status::Success
                };
                self.arena.set_status(id, status);
                return false;
            };
            let unfinished = !self.arena.is_finished(child);
            match group.kind {
                GroupKind::Execute if unfinished => {
                    self.store(id, Action::Group(group));
                    return self.execute_action(child, engine, view);
                }
                GroupKind::Execute => {}
                GroupKind::Undo => {
                    if self.undo_action(child, engine, view) {
                        self.store(id, Action::Group(group));
                        return true;
                    }
                }
                GroupKind::Any if unfinished => {
                    self.store(id, Action::Group(group));
                    return self.execute_action(child, engine, view);
                }
                GroupKind::Any => {
                    if self.arena.status(child) == Some(Status::Success) {
                        for sibling in &children[group.index()..] {
                            if !self.arena.is_finished(*sibling) {
                                self.arena.set_status(*sibling, Status::Aborted);
                            }
                        }
                        self.store(id, Action::Group(group));
                        self.arena.set_status(id, Status::Success);
                        return false;
                    }
                }
            }
            group.advance();
        }
    }
}
