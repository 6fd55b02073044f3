//! Identifiers of tracked things and the counter vector indexed by them.

use std::ops::{AddAssign, Index, IndexMut, SubAssign};

use serde::{Deserialize, Serialize};

/// Naturally occurring resources found on the map.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Resource {
    /// Trees that produce wood.
    Tree,
    /// Granite rocks above ground.
    Stone,
    /// Gold ore inside mountains.
    Gold,
    /// Iron ore inside mountains.
    IronOre,
    /// Coal inside mountains.
    Coal,
    /// Granite inside mountains.
    Granite,
    /// Free land that can host plants.
    PlantSpace,
    /// Own land carrying a border stone.
    BorderLand,
    /// Fish in nearby water.
    Fish,
    /// Huntable animals.
    Animal,
    /// Ground water.
    Water,
}

impl Resource {
    /// Every resource in index order.
    pub const ALL: [Resource; 11] = [
        Resource::Tree,
        Resource::Stone,
        Resource::Gold,
        Resource::IronOre,
        Resource::Coal,
        Resource::Granite,
        Resource::PlantSpace,
        Resource::BorderLand,
        Resource::Fish,
        Resource::Animal,
        Resource::Water,
    ];
}

/// Goods produced and consumed by buildings.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[allow(missing_docs)]
pub enum Commodity {
    Wood,
    Boards,
    Stones,
    Coins,
    Coal,
    Gold,
    Sword,
    Shield,
    IronOre,
    Iron,
    Grain,
    /// Fish, meat and bread all count as food.
    Food,
    Pig,
    Flour,
    Water,
    Beer,
    Tongs,
    Axe,
    Saw,
    PickAxe,
    Hammer,
    Shovel,
    Crucible,
    RodAndLine,
    Scythe,
    Cleaver,
    RollingPin,
    Bow,
    Boat,
}

impl Commodity {
    /// Every commodity in index order.
    pub const ALL: [Commodity; 29] = [
        Commodity::Wood,
        Commodity::Boards,
        Commodity::Stones,
        Commodity::Coins,
        Commodity::Coal,
        Commodity::Gold,
        Commodity::Sword,
        Commodity::Shield,
        Commodity::IronOre,
        Commodity::Iron,
        Commodity::Grain,
        Commodity::Food,
        Commodity::Pig,
        Commodity::Flour,
        Commodity::Water,
        Commodity::Beer,
        Commodity::Tongs,
        Commodity::Axe,
        Commodity::Saw,
        Commodity::PickAxe,
        Commodity::Hammer,
        Commodity::Shovel,
        Commodity::Crucible,
        Commodity::RodAndLine,
        Commodity::Scythe,
        Commodity::Cleaver,
        Commodity::RollingPin,
        Commodity::Bow,
        Commodity::Boat,
    ];

    /// Commodities whose global shortage is tolerated by a small slack so that
    /// production chains do not stall on marginal deficits.
    #[must_use]
    pub const fn is_important(self) -> bool {
        matches!(
            self,
            Commodity::Grain
                | Commodity::Food
                | Commodity::Shield
                | Commodity::Sword
                | Commodity::Coal
                | Commodity::Gold
                | Commodity::Beer
        )
    }
}

/// Derived signals computed by the world model.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Concept {
    /// Coverage by a lookout tower.
    LookoutTower,
    /// Presence of the headquarters.
    Headquarters,
    /// Coverage by a fishery.
    Fishery,
    /// Coverage by a forester.
    Forester,
    /// Land reserved for planting trees.
    TreeSpace,
    /// Land reserved for fields.
    FarmSpace,
    /// Land next to a mine-capable node.
    MineSpace,
    /// Coverage by a warehouse.
    Storehouse,
    /// Tool production capacity.
    Metalworks,
    /// Burnt ground.
    BurnSite,
    /// Coverage by military buildings.
    Military,
    /// Coverage by a catapult.
    Catapult,
    /// Buildable land not currently visible.
    Hidden,
    /// Donkey supply.
    Donkey,
    /// Coverage by a hunter.
    Hunter,
    /// Land close to unowned land.
    NearUnowned,
    /// Land close to the border.
    NearBorder,
    /// Land owned by nobody or by another player.
    Unowned,
    /// Land owned by the player.
    Owned,
    /// Land owned by an attackable enemy.
    Enemy,
}

impl Concept {
    /// Every concept in index order.
    pub const ALL: [Concept; 20] = [
        Concept::LookoutTower,
        Concept::Headquarters,
        Concept::Fishery,
        Concept::Forester,
        Concept::TreeSpace,
        Concept::FarmSpace,
        Concept::MineSpace,
        Concept::Storehouse,
        Concept::Metalworks,
        Concept::BurnSite,
        Concept::Military,
        Concept::Catapult,
        Concept::Hidden,
        Concept::Donkey,
        Concept::Hunter,
        Concept::NearUnowned,
        Concept::NearBorder,
        Concept::Unowned,
        Concept::Owned,
        Concept::Enemy,
    ];
}

/// Anything a [`Tracker`] can count.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Thing {
    /// A natural resource.
    Resource(Resource),
    /// A produced good.
    Commodity(Commodity),
    /// A derived signal.
    Concept(Concept),
}

const RESOURCE_COUNT: usize = Resource::ALL.len();
const COMMODITY_COUNT: usize = Commodity::ALL.len();
const CONCEPT_COUNT: usize = Concept::ALL.len();

/// Number of slots in every tracker.
pub const TRACKED_THINGS: usize = RESOURCE_COUNT + COMMODITY_COUNT + CONCEPT_COUNT;

impl Thing {
    /// Position of the thing in the global enumeration.
    #[must_use]
    pub fn index(self) -> usize {
        match self {
            Thing::Resource(resource) => resource as usize,
            Thing::Commodity(commodity) => RESOURCE_COUNT + commodity as usize,
            Thing::Concept(concept) => RESOURCE_COUNT + COMMODITY_COUNT + concept as usize,
        }
    }

    /// Inverse of [`Thing::index`].
    #[must_use]
    pub fn from_index(index: usize) -> Option<Self> {
        if index < RESOURCE_COUNT {
            return Some(Thing::Resource(Resource::ALL[index]));
        }
        let index = index - RESOURCE_COUNT;
        if index < COMMODITY_COUNT {
            return Some(Thing::Commodity(Commodity::ALL[index]));
        }
        Concept::ALL
            .get(index - COMMODITY_COUNT)
            .map(|concept| Thing::Concept(*concept))
    }

    /// Reports whether the thing is a natural resource.
    #[must_use]
    pub const fn is_resource(self) -> bool {
        matches!(self, Thing::Resource(_))
    }

    /// Reports whether a global shortage of the thing may be tolerated.
    #[must_use]
    pub const fn is_important(self) -> bool {
        match self {
            Thing::Commodity(commodity) => commodity.is_important(),
            _ => false,
        }
    }
}

impl From<Resource> for Thing {
    fn from(value: Resource) -> Self {
        Thing::Resource(value)
    }
}

impl From<Commodity> for Thing {
    fn from(value: Commodity) -> Self {
        Thing::Commodity(value)
    }
}

impl From<Concept> for Thing {
    fn from(value: Concept) -> Self {
        Thing::Concept(value)
    }
}

/// Fixed-size vector of signed counters, one per [`Thing`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tracker {
    values: Vec<i32>,
}

impl Default for Tracker {
    fn default() -> Self {
        Self {
            values: vec![0; TRACKED_THINGS],
        }
    }
}

impl Tracker {
    /// Creates a tracker with every counter at zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Counter stored at a raw index, if the index is in range.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<i32> {
        self.values.get(index).copied()
    }

    /// Mutable counter stored at a raw index, if the index is in range.
    pub fn get_mut(&mut self, index: usize) -> Option<&mut i32> {
        self.values.get_mut(index)
    }

    /// Reports whether any counter is non-zero.
    #[must_use]
    pub fn any(&self) -> bool {
        self.values.iter().any(|value| *value != 0)
    }

    /// Resets every counter to zero.
    pub fn clear(&mut self) {
        self.values.iter_mut().for_each(|value| *value = 0);
    }

    /// Iterates the non-zero counters with their things.
    pub fn nonzero(&self) -> impl Iterator<Item = (Thing, i32)> + '_ {
        self.values
            .iter()
            .enumerate()
            .filter(|(_, value)| **value != 0)
            .filter_map(|(index, value)| Thing::from_index(index).map(|thing| (thing, *value)))
    }
}

impl<T: Into<Thing>> Index<T> for Tracker {
    type Output = i32;

    fn index(&self, thing: T) -> &i32 {
        &self.values[thing.into().index()]
    }
}

impl<T: Into<Thing>> IndexMut<T> for Tracker {
    fn index_mut(&mut self, thing: T) -> &mut i32 {
        &mut self.values[thing.into().index()]
    }
}

impl AddAssign<&Tracker> for Tracker {
    fn add_assign(&mut self, rhs: &Tracker) {
        for (value, other) in self.values.iter_mut().zip(&rhs.values) {
            *value += *other;
        }
    }
}

impl SubAssign<&Tracker> for Tracker {
    fn sub_assign(&mut self, rhs: &Tracker) {
        for (value, other) in self.values.iter_mut().zip(&rhs.values) {
            *value -= *other;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_space_is_contiguous() {
        for index in 0..TRACKED_THINGS {
            let thing = Thing::from_index(index).expect("index in range");
            assert_eq!(thing.index(), index);
        }
        assert_eq!(Thing::from_index(TRACKED_THINGS), None);
        assert_eq!(TRACKED_THINGS, 60);
    }

    #[test]
    fn raw_access_is_range_checked() {
        let tracker = Tracker::new();
        assert_eq!(tracker.get(0), Some(0));
        assert_eq!(tracker.get(TRACKED_THINGS), None);
    }

    #[test]
    fn elementwise_arithmetic() {
        let mut a = Tracker::new();
        let mut b = Tracker::new();
        a[Resource::Tree] = 3;
        b[Resource::Tree] = 1;
        b[Concept::Enemy] = 2;
        a += &b;
        assert_eq!(a[Resource::Tree], 4);
        assert_eq!(a[Concept::Enemy], 2);
        a -= &b;
        a -= &b;
        assert_eq!(a[Resource::Tree], 2);
        assert_eq!(a[Concept::Enemy], -2);
        assert!(a.any());
        a.clear();
        assert!(!a.any());
    }

    #[test]
    fn water_resource_and_commodity_are_distinct() {
        let mut tracker = Tracker::new();
        tracker[Resource::Water] = 1;
        assert_eq!(tracker[Commodity::Water], 0);
        assert_eq!(
            tracker.nonzero().collect::<Vec<_>>(),
            vec![(Thing::Resource(Resource::Water), 1)]
        );
    }
}
