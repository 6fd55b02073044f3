#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared by the settlement agent.
//!
//! This crate defines the boundary between the simulation engine and the
//! agent. The agent observes the map through the [`Engine`] trait, submits
//! [`Command`] values describing the mutations it wants, and later learns the
//! outcome of asynchronous work from [`Event`] values. Everything the agent
//! computes on top of those observations is expressed with the value types
//! exported here: hex geometry, [`Score`] and [`Tracker`].

mod geometry;
mod score;
mod tracker;

use serde::{Deserialize, Serialize};

pub use geometry::{Direction, MapExtent, MapPoint};
pub use score::Score;
pub use tracker::{Commodity, Concept, Resource, Thing, Tracker, TRACKED_THINGS};

/// Capacity of a node to host structures, from nothing up to a harbor.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum BuildingQuality {
    /// Nothing can be placed.
    #[default]
    Nothing,
    /// Only a flag fits.
    Flag,
    /// Small building.
    Hut,
    /// Medium building.
    House,
    /// Large building.
    Castle,
    /// Mine on a mountain.
    Mine,
    /// Harbor at the coast.
    Harbor,
}

impl BuildingQuality {
    /// Reports whether a node of quality `self` can host something that needs
    /// `required`.
    #[must_use]
    pub fn can_use(self, required: BuildingQuality) -> bool {
        if self == BuildingQuality::Nothing || required == BuildingQuality::Nothing {
            return false;
        }
        if self == required || required == BuildingQuality::Flag {
            return true;
        }
        match (self, required) {
            (BuildingQuality::Mine, _) | (_, BuildingQuality::Mine) => false,
            (_, BuildingQuality::Harbor) => false,
            (BuildingQuality::Harbor, _) => true,
            (have, need) => have >= need,
        }
    }
}

/// Every building the agent knows how to reason about.
///
/// The declaration order matters: military tiers are compared with `<`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[allow(missing_docs)]
pub enum BuildingType {
    Headquarters,
    Barracks,
    Guardhouse,
    Watchtower,
    Fortress,
    GraniteMine,
    CoalMine,
    IronMine,
    GoldMine,
    LookoutTower,
    Catapult,
    Woodcutter,
    Fishery,
    Quarry,
    Forester,
    Slaughterhouse,
    Hunter,
    Brewery,
    Armory,
    Metalworks,
    IronSmelter,
    CharBurner,
    PigFarm,
    Storehouse,
    Mill,
    Bakery,
    Sawmill,
    Mint,
    Well,
    Shipyard,
    Farm,
    DonkeyBreeder,
    Harbor,
}

impl BuildingType {
    /// Every building type in declaration order.
    pub const ALL: [BuildingType; 33] = [
        BuildingType::Headquarters,
        BuildingType::Barracks,
        BuildingType::Guardhouse,
        BuildingType::Watchtower,
        BuildingType::Fortress,
        BuildingType::GraniteMine,
        BuildingType::CoalMine,
        BuildingType::IronMine,
        BuildingType::GoldMine,
        BuildingType::LookoutTower,
        BuildingType::Catapult,
        BuildingType::Woodcutter,
        BuildingType::Fishery,
        BuildingType::Quarry,
        BuildingType::Forester,
        BuildingType::Slaughterhouse,
        BuildingType::Hunter,
        BuildingType::Brewery,
        BuildingType::Armory,
        BuildingType::Metalworks,
        BuildingType::IronSmelter,
        BuildingType::CharBurner,
        BuildingType::PigFarm,
        BuildingType::Storehouse,
        BuildingType::Mill,
        BuildingType::Bakery,
        BuildingType::Sawmill,
        BuildingType::Mint,
        BuildingType::Well,
        BuildingType::Shipyard,
        BuildingType::Farm,
        BuildingType::DonkeyBreeder,
        BuildingType::Harbor,
    ];

    /// Node quality the building occupies.
    #[must_use]
    pub const fn quality(self) -> BuildingQuality {
        match self {
            BuildingType::Barracks
            | BuildingType::Guardhouse
            | BuildingType::LookoutTower
            | BuildingType::Woodcutter
            | BuildingType::Fishery
            | BuildingType::Quarry
            | BuildingType::Forester
            | BuildingType::Hunter
            | BuildingType::Well => BuildingQuality::Hut,
            BuildingType::Headquarters
            | BuildingType::Fortress
            | BuildingType::PigFarm
            | BuildingType::Farm
            | BuildingType::DonkeyBreeder => BuildingQuality::Castle,
            BuildingType::GraniteMine
            | BuildingType::CoalMine
            | BuildingType::IronMine
            | BuildingType::GoldMine => BuildingQuality::Mine,
            BuildingType::Harbor => BuildingQuality::Harbor,
            _ => BuildingQuality::House,
        }
    }

    /// Reports whether the building extends territory.
    #[must_use]
    pub const fn is_military(self) -> bool {
        matches!(
            self,
            BuildingType::Barracks
                | BuildingType::Guardhouse
                | BuildingType::Watchtower
                | BuildingType::Fortress
        )
    }

    /// Reports whether the building is a mine.
    #[must_use]
    pub const fn is_mine(self) -> bool {
        matches!(self.quality(), BuildingQuality::Mine)
    }

    /// Reports whether the building stores wares.
    #[must_use]
    pub const fn is_warehouse(self) -> bool {
        matches!(
            self,
            BuildingType::Headquarters | BuildingType::Storehouse | BuildingType::Harbor
        )
    }

    /// Reports whether the engine lets the owner pause production.
    #[must_use]
    pub const fn can_pause_production(self) -> bool {
        self.is_mine()
            || matches!(
                self,
                BuildingType::Mint | BuildingType::Brewery | BuildingType::Metalworks
            )
    }

    /// Territory radius of a military building.
    #[must_use]
    pub const fn military_radius(self) -> Option<u32> {
        match self {
            BuildingType::Barracks => Some(8),
            BuildingType::Guardhouse => Some(9),
            BuildingType::Watchtower => Some(10),
            BuildingType::Fortress => Some(11),
            _ => None,
        }
    }

    /// Position of a military building within the tier tables, lightest first.
    #[must_use]
    pub const fn military_tier(self) -> Option<usize> {
        match self {
            BuildingType::Barracks => Some(0),
            BuildingType::Guardhouse => Some(1),
            BuildingType::Watchtower => Some(2),
            BuildingType::Fortress => Some(3),
            _ => None,
        }
    }
}

/// Workers that can be dispatched to a flag.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Specialist {
    /// Surveys mountains and ground water.
    Geologist,
    /// Explores hidden land.
    Scout,
}

/// Object occupying a node, as far as the agent cares.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeObject {
    /// Free node.
    #[default]
    Nothing,
    /// Decoration without gameplay effect.
    Environment,
    /// A tree.
    Tree {
        /// Whether woodcutters can fell it.
        produces_wood: bool,
    },
    /// A granite rock.
    Granite {
        /// Remaining stone.
        size: u8,
    },
    /// Burning or burnt remains.
    Fire,
    /// A flag.
    Flag,
    /// A building under construction.
    Site(BuildingType),
    /// A finished building.
    Building(BuildingType),
    /// A sign left behind by a geologist.
    Sign,
}

/// Owner of a node relative to the observing player.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Owner {
    /// Nobody owns the node.
    #[default]
    Nobody,
    /// The observing player.
    Own,
    /// A player the observer may not attack.
    Ally,
    /// A player the observer may attack.
    Enemy,
}

/// Kind of a subsurface deposit revealed by a geologist.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[allow(missing_docs)]
pub enum DepositKind {
    Iron,
    Gold,
    Coal,
    Granite,
    Water,
    Fish,
}

/// Subsurface deposit at a node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Deposit {
    /// What lies underground.
    pub kind: DepositKind,
    /// How much of it.
    pub amount: u8,
}

/// Road between two flags, described from one of its ends.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoadSegment {
    /// Flag at the far end.
    pub other_end: MapPoint,
    /// Steps from the near flag to the far flag.
    pub route: Vec<Direction>,
    /// Carrier productivity in percent.
    pub productivity: u32,
}

/// Mutations the agent can ask the engine for.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Command {
    /// Places a building site.
    SetBuildingSite {
        /// Node receiving the building.
        point: MapPoint,
        /// Building to construct.
        building: BuildingType,
    },
    /// Demolishes a building or site.
    DestroyBuilding {
        /// Node holding the building.
        point: MapPoint,
    },
    /// Places a flag.
    SetFlag {
        /// Node receiving the flag.
        point: MapPoint,
    },
    /// Removes a flag together with its roads.
    DestroyFlag {
        /// Node holding the flag.
        point: MapPoint,
    },
    /// Builds a road starting at a flag.
    BuildRoad {
        /// Flag the road starts at.
        origin: MapPoint,
        /// Steps taken from the origin.
        route: Vec<Direction>,
    },
    /// Removes the road leaving a flag in a direction.
    DestroyRoad {
        /// Flag the road leaves from.
        flag: MapPoint,
        /// Direction of the first step.
        direction: Direction,
    },
    /// Upgrades the road leaving a flag in a direction to a donkey road.
    UpgradeRoad {
        /// Flag the road leaves from.
        flag: MapPoint,
        /// Direction of the first step.
        direction: Direction,
    },
    /// Sends a specialist to a flag.
    CallSpecialist {
        /// Flag the specialist walks to.
        flag: MapPoint,
        /// Kind of specialist.
        specialist: Specialist,
    },
}

/// Notifications the engine pushes to the agent, already filtered to the
/// agent's own player.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    /// A building finished construction.
    BuildingConstructed {
        /// Node of the building.
        point: MapPoint,
        /// Type of the building.
        building: BuildingType,
    },
    /// A building or site was demolished.
    BuildingDestroyed {
        /// Node of the building.
        point: MapPoint,
        /// Type of the building.
        building: BuildingType,
    },
    /// A military building was captured from an enemy.
    BuildingCaptured {
        /// Node of the building.
        point: MapPoint,
        /// Type of the building.
        building: BuildingType,
    },
    /// A military building was lost to an enemy.
    BuildingLost {
        /// Node of the building.
        point: MapPoint,
        /// Type of the building.
        building: BuildingType,
    },
    /// A building ran out of the natural resources it consumes.
    BuildingOutOfResources {
        /// Node of the building.
        point: MapPoint,
        /// Type of the building.
        building: BuildingType,
    },
    /// Territory around a point was lost.
    LandLost {
        /// Node where the loss was observed.
        point: MapPoint,
    },
    /// A road requested through [`Command::BuildRoad`] now exists.
    RoadConstructed {
        /// Flag the road starts at.
        origin: MapPoint,
        /// Steps taken from the origin.
        route: Vec<Direction>,
    },
    /// A road requested through [`Command::BuildRoad`] could not be built.
    RoadConstructionFailed {
        /// Flag the road starts at.
        origin: MapPoint,
        /// Steps taken from the origin.
        route: Vec<Direction>,
    },
    /// Visibility of a node changed.
    VisibilityChanged {
        /// Node whose visibility changed.
        point: MapPoint,
    },
}

/// Reasons for the engine to reject a command outright.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error, Serialize, Deserialize)]
pub enum CommandRejected {
    /// The command refers to a node outside the map.
    #[error("point {0:?} lies outside the map")]
    OutOfBounds(MapPoint),
    /// The node cannot host the requested object.
    #[error("cannot build at {0:?}")]
    NotBuildable(MapPoint),
    /// A flag was expected at the node.
    #[error("no flag at {0:?}")]
    MissingFlag(MapPoint),
    /// A building was expected at the node.
    #[error("no building at {0:?}")]
    MissingBuilding(MapPoint),
    /// A road was expected to leave the node.
    #[error("no road leaving {0:?} towards {1:?}")]
    MissingRoad(MapPoint, Direction),
    /// The route crosses an obstacle or leaves own territory.
    #[error("route from {0:?} is blocked")]
    RouteBlocked(MapPoint),
    /// The building type is not available to the player.
    #[error("building {0:?} is not available")]
    Unavailable(BuildingType),
    /// No specialist of the requested kind is idle.
    #[error("no {0:?} available")]
    NoSpecialist(Specialist),
}

/// Read access to the map and write access through commands.
///
/// Every query describes the state as it is right now. Submitted commands are
/// validated immediately but take effect asynchronously, so queries do not
/// reflect them until the engine has stepped.
pub trait Engine {
    /// Bounds of the map.
    fn extent(&self) -> MapExtent;

    /// Building quality available to the observing player.
    fn building_quality(&self, point: MapPoint) -> BuildingQuality;

    /// Building quality ignoring ownership.
    fn building_quality_any_owner(&self, point: MapPoint) -> BuildingQuality;

    /// Whether the observing player currently sees the node.
    fn is_visible(&self, point: MapPoint) -> bool;

    /// Whether the node is water.
    fn is_water(&self, point: MapPoint) -> bool;

    /// Whether the terrain lets plants grow.
    fn is_vital(&self, point: MapPoint) -> bool;

    /// Owner of the node.
    fn owner(&self, point: MapPoint) -> Owner;

    /// Whether the node carries one of the observing player's border stones.
    fn has_border_stone(&self, point: MapPoint) -> bool;

    /// Object on the node.
    fn object(&self, point: MapPoint) -> NodeObject;

    /// Subsurface deposit, if one exists.
    fn deposit(&self, point: MapPoint) -> Option<Deposit>;

    /// Whether a huntable animal stands on the node.
    fn has_huntable_animal(&self, point: MapPoint) -> bool;

    /// Whether a road leaves the node in `direction`.
    fn has_road(&self, point: MapPoint, direction: Direction) -> bool;

    /// Whether a new road may pass through the node.
    fn is_road_available(&self, point: MapPoint) -> bool;

    /// Whether figures can stand on the node at all.
    fn is_node_reachable(&self, point: MapPoint) -> bool;

    /// Whether figures can walk from the node in `direction`.
    fn is_edge_passable(&self, point: MapPoint, direction: Direction) -> bool;

    /// Whether the node belongs to the observing player's territory.
    fn is_player_territory(&self, point: MapPoint) -> bool;

    /// Whether the flag at the node has large capacity.
    fn is_large_flag(&self, point: MapPoint) -> bool;

    /// Number of wares waiting at the flag.
    fn wares_at_flag(&self, point: MapPoint) -> u32;

    /// Road leaving a flag in `direction`.
    fn road_segment(&self, flag: MapPoint, direction: Direction) -> Option<RoadSegment>;

    /// Whether the player may currently construct the building type.
    fn can_build(&self, building: BuildingType) -> bool;

    /// Position of the player's headquarters.
    fn headquarters(&self) -> Option<MapPoint>;

    /// Positions of known enemy headquarters.
    fn enemy_headquarters(&self) -> Vec<MapPoint>;

    /// Whether production of the building at the node is paused.
    fn is_production_disabled(&self, point: MapPoint) -> bool;

    /// Whether the military building at the node was finished so recently
    /// that its soldiers have not arrived.
    fn is_newly_built(&self, point: MapPoint) -> bool;

    /// Submits a mutation.
    ///
    /// # Errors
    ///
    /// Returns [`CommandRejected`] when the engine refuses the command.
    fn submit(&mut self, command: Command) -> Result<(), CommandRejected>;

    /// Whether any road touches the node.
    fn is_on_road(&self, point: MapPoint) -> bool {
        Direction::ALL
            .iter()
            .any(|direction| self.has_road(point, *direction))
    }

    /// Whether a flag stands on the node.
    fn has_flag(&self, point: MapPoint) -> bool {
        self.object(point) == NodeObject::Flag
    }

    /// Building or site standing on the node.
    fn building_at(&self, point: MapPoint) -> Option<BuildingType> {
        match self.object(point) {
            NodeObject::Site(building) | NodeObject::Building(building) => Some(building),
            _ => None,
        }
    }
}
