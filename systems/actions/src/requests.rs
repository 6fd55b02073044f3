use std::fmt;

use settler_ai_core::{BuildingType, Direction, MapPoint, Specialist};
use settler_ai_model::{Lifetime, RoadConstraints, SiteConstraints};

/// Places a building and connects its flag.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BuildingRequest {
    /// Where the building may go.
    pub site: SiteConstraints,
    /// Fixed site that skips the search.
    pub requested: Option<MapPoint>,
    placed: Option<MapPoint>,
    flag: Option<MapPoint>,
    flag_removed: bool,
}

impl BuildingRequest {
    /// Request for the best site matching `site`.
    #[must_use]
    pub const fn new(site: SiteConstraints) -> Self {
        Self {
            site,
            requested: None,
            placed: None,
            flag: None,
            flag_removed: false,
        }
    }

    /// Request for a fixed site.
    #[must_use]
    pub fn at(building: BuildingType, point: MapPoint) -> Self {
        let mut request = Self::new(SiteConstraints::new(building));
        request.requested = Some(point);
        request
    }

    /// Building type requested.
    #[must_use]
    pub const fn building(&self) -> BuildingType {
        self.site.building
    }

    /// Site the building was placed on.
    #[must_use]
    pub const fn placed(&self) -> Option<MapPoint> {
        self.placed
    }

    /// Flag serving the placed building.
    #[must_use]
    pub const fn flag(&self) -> Option<MapPoint> {
        self.flag
    }

    /// Whether undoing the request also removed the flag.
    #[must_use]
    pub const fn flag_removed(&self) -> bool {
        self.flag_removed
    }

    pub(crate) fn set_placed(&mut self, point: MapPoint, flag: Option<MapPoint>) {
        self.placed = Some(point);
        self.flag = flag;
    }

    pub(crate) fn clear_flag(&mut self) {
        self.flag = None;
    }

    pub(crate) fn set_flag_removed(&mut self, removed: bool) {
        self.flag_removed = removed;
    }
}

/// Builds a road from a flag.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RoadRequest {
    /// Search parameters.
    pub constraints: RoadConstraints,
    target: Option<MapPoint>,
    route: Vec<Direction>,
}

impl RoadRequest {
    /// Request with the given search parameters.
    #[must_use]
    pub fn new(constraints: RoadConstraints) -> Self {
        Self {
            constraints,
            target: None,
            route: Vec::new(),
        }
    }

    /// Flag the road starts at.
    #[must_use]
    pub const fn from(&self) -> MapPoint {
        self.constraints.from
    }

    /// Point the road was built to.
    #[must_use]
    pub const fn target(&self) -> Option<MapPoint> {
        self.target
    }

    /// Steps of the submitted road.
    #[must_use]
    pub fn route(&self) -> &[Direction] {
        &self.route
    }

    pub(crate) fn set_route(&mut self, target: MapPoint, route: Vec<Direction>) {
        self.target = Some(target);
        self.route = route;
    }

    pub(crate) fn clear_route(&mut self) {
        self.route.clear();
    }
}

/// Places a flag.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FlagRequest {
    /// Where the flag goes.
    pub point: MapPoint,
    /// How long the flag is meant to stay.
    pub lifetime: Lifetime,
}

impl FlagRequest {
    /// Request for a flag.
    #[must_use]
    pub const fn new(point: MapPoint, lifetime: Lifetime) -> Self {
        Self { point, lifetime }
    }
}

/// Calls specialists to a flag.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SpecialistRequest {
    /// Flag the specialists walk to.
    pub flag: MapPoint,
    /// Profession called.
    pub specialist: Specialist,
    /// How many to call.
    pub amount: u32,
}

/// Demolishes a building.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DestroyRequest {
    /// Building site.
    pub point: MapPoint,
}

impl DestroyRequest {
    /// Request to demolish the building on `point`.
    #[must_use]
    pub const fn new(point: MapPoint) -> Self {
        Self { point }
    }
}

/// How a group drives its children.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GroupKind {
    /// Every child in order. Any failure fails the group.
    Execute,
    /// Undoes the children in order.
    Undo,
    /// Children one at a time until one succeeds.
    Any,
}

/// Combines child actions.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GroupAction {
    /// Combination rule.
    pub kind: GroupKind,
    index: usize,
}

impl GroupAction {
    /// Group starting at its first child.
    #[must_use]
    pub const fn new(kind: GroupKind) -> Self {
        Self { kind, index: 0 }
    }

    /// Child currently driven.
    #[must_use]
    pub const fn index(&self) -> usize {
        self.index
    }

    pub(crate) fn advance(&mut self) {
        self.index += 1;
    }
}

/// Every kind of action the manager runs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Action {
    /// See [`BuildingRequest`].
    Building(BuildingRequest),
    /// See [`RoadRequest`].
    Road(RoadRequest),
    /// See [`FlagRequest`].
    Flag(FlagRequest),
    /// See [`SpecialistRequest`].
    Specialist(SpecialistRequest),
    /// See [`DestroyRequest`].
    Destroy(DestroyRequest),
    /// See [`GroupAction`].
    Group(GroupAction),
}

impl Action {
    /// Whether the action places a flag. Flags may be batched in one pass.
    #[must_use]
    pub const fn is_flag(&self) -> bool {
        matches!(self, Action::Flag(_))
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Building(request) => {
                write!(f, "[Building {:?}]", request.building())?;
                match request.placed {
                    Some(point) => write!(f, "[Origin {point:?}]"),
                    None => write!(f, "[Searching]"),
                }
            }
            Action::Road(request) => {
                write!(
                    f,
                    "[Road from {:?} {:?} {:?}]",
                    request.from(),
                    request.constraints.kind,
                    request.constraints.lifetime
                )?;
                match request.target {
                    Some(target) => write!(f, "[To {target:?} via {:?}]", request.route),
                    None => write!(f, "[Searching]"),
                }
            }
            Action::Flag(request) => write!(f, "[Flag {:?} {:?}]", request.point, request.lifetime),
            Action::Specialist(request) => write!(
                f,
                "[Specialist {}x{:?} to {:?}]",
                request.amount, request.specialist, request.flag
            ),
            Action::Destroy(request) => write!(f, "[Destroy {:?}]", request.point),
            Action::Group(group) => write!(f, "[Group {:?}:{}]", group.kind, group.index),
        }
    }
}
