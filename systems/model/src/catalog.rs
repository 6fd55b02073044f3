//! Declarative effects of every building type.

use std::sync::OnceLock;

use settler_ai_core::{BuildingType, Commodity, Concept, Resource, Thing};

/// Amount marking a hard constraint on an affection or aversion.
pub const HARD_CONSTRAINT: i32 = -1;

/// What an effect does.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EffectKind {
    /// The building adds the thing.
    Production,
    /// The building needs the thing.
    Consumption,
    /// The building prefers sites with the thing nearby.
    Affection,
    /// The building prefers sites without the thing nearby.
    Aversion,
}

/// Where an effect applies.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Scope {
    /// Every node within the radius of the building.
    Local(u32),
    /// The player's global counters.
    Global,
}

/// One declared effect of a building type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BuildingEffect {
    /// What the effect does.
    pub kind: EffectKind,
    /// Where it applies.
    pub scope: Scope,
    /// Thing affected.
    pub thing: Thing,
    /// Amount, or [`HARD_CONSTRAINT`] for preferences that must hold.
    pub amount: i32,
}

impl BuildingEffect {
    /// Radius of a local effect, zero for global ones.
    #[must_use]
    pub const fn radius(&self) -> u32 {
        match self.scope {
            Scope::Local(radius) => radius,
            Scope::Global => 0,
        }
    }

    /// Whether the effect applies locally.
    #[must_use]
    pub const fn is_local(&self) -> bool {
        matches!(self.scope, Scope::Local(_))
    }
}

/// Ordered effect list of one building type.
#[derive(Clone, Debug)]
pub struct BuildingInfo {
    building: BuildingType,
    effects: Vec<BuildingEffect>,
}

impl BuildingInfo {
    fn new(building: BuildingType) -> Self {
        let mut info = Self {
            building,
            effects: Vec::new(),
        };
        info.declare();
        info
    }

    /// Building type described.
    #[must_use]
    pub const fn building(&self) -> BuildingType {
        self.building
    }

    /// Every effect in declaration order.
    #[must_use]
    pub fn effects(&self) -> &[BuildingEffect] {
        &self.effects
    }

    /// Consumptions in declaration order.
    pub fn consumptions(&self) -> impl Iterator<Item = &BuildingEffect> {
        self.of_kind(EffectKind::Consumption)
    }

    /// Productions in declaration order.
    pub fn productions(&self) -> impl Iterator<Item = &BuildingEffect> {
        self.of_kind(EffectKind::Production)
    }

    /// Affections followed by aversions.
    pub fn preferences(&self) -> impl Iterator<Item = &BuildingEffect> {
        self.of_kind(EffectKind::Affection)
            .chain(self.of_kind(EffectKind::Aversion))
    }

    /// Whether every consumption is a natural resource.
    #[must_use]
    pub fn consumes_only_resources(&self) -> bool {
        let mut consumptions = self.consumptions().peekable();
        consumptions.peek().is_some()
            && consumptions.all(|consumption| consumption.thing.is_resource())
    }

    fn of_kind(&self, kind: EffectKind) -> impl Iterator<Item = &BuildingEffect> {
        self.effects
            .iter()
            .filter(move |effect| effect.kind == kind)
    }

    fn push(&mut self, kind: EffectKind, scope: Scope, thing: impl Into<Thing>, amount: i32) {
        self.effects.push(BuildingEffect {
            kind,
            scope,
            thing: thing.into(),
            amount,
        });
    }

    fn local_production(&mut self, thing: impl Into<Thing>, radius: u32, amount: i32) {
        self.push(EffectKind::Production, Scope::Local(radius), thing, amount);
    }

    fn global_production(&mut self, thing: impl Into<Thing>, amount: i32) {
        self.push(EffectKind::Production, Scope::Global, thing, amount);
    }

    fn local_and_global_production(&mut self, thing: impl Into<Thing> + Copy, radius: u32, amount: i32) {
        self.local_production(thing, radius, amount);
        self.global_production(thing, amount);
    }

    // Every consumption also attracts the building to the consumed thing at
    // halving radii, down to the site itself.
    fn consumption(&mut self, scope: Scope, thing: impl Into<Thing> + Copy, amount: i32) {
        self.push(EffectKind::Consumption, scope, thing, amount);
        let mut radius = match scope {
            Scope::Local(radius) => radius,
            Scope::Global => 0,
        };
        while radius > 0 {
            radius /= 2;
            self.affection(thing, radius, amount);
        }
    }

    fn local_consumption(&mut self, thing: impl Into<Thing> + Copy, radius: u32, amount: i32) {
        self.consumption(Scope::Local(radius), thing, amount);
    }

    fn global_consumption(&mut self, thing: impl Into<Thing> + Copy, amount: i32) {
        self.consumption(Scope::Global, thing, amount);
    }

    fn local_and_global_consumption(&mut self, thing: impl Into<Thing> + Copy, radius: u32, amount: i32) {
        self.local_consumption(thing, radius, amount);
        // The global half shares the radius, so it repeats the affections.
        self.push(EffectKind::Consumption, Scope::Global, thing, amount);
        let mut radius = radius;
        while radius > 0 {
            radius /= 2;
            self.affection(thing, radius, amount);
        }
    }

    fn affection(&mut self, thing: impl Into<Thing>, radius: u32, amount: i32) {
        self.push(EffectKind::Affection, Scope::Local(radius), thing, amount);
    }

    fn aversion(&mut self, thing: impl Into<Thing>, radius: u32, amount: i32) {
        self.push(EffectKind::Aversion, Scope::Local(radius), thing, amount);
    }

    fn declare(&mut self) {
        use BuildingType as B;

        match self.building {
            B::Headquarters => {
                self.local_and_global_production(Concept::Storehouse, 12, 20);
                self.local_and_global_production(Concept::Headquarters, 4, 1);
            }
            B::Barracks | B::Guardhouse | B::Watchtower | B::Fortress => self.declare_military(),
            B::GraniteMine => self.declare_mine(Resource::Granite, 4, Commodity::Stones),
            B::CoalMine => self.declare_mine(Resource::Coal, 4, Commodity::Coal),
            B::IronMine => self.declare_mine(Resource::IronOre, 4, Commodity::IronOre),
            B::GoldMine => self.declare_mine(Resource::Gold, 2, Commodity::Gold),
            B::LookoutTower => {
                self.local_production(Concept::LookoutTower, 10, 1);
                self.local_consumption(Concept::Hidden, 10, 12);
                self.affection(Resource::BorderLand, 4, 1024);
                self.affection(Concept::Hidden, 10, 1024);
                self.affection(Concept::Enemy, 20, 1024);
                self.aversion(Concept::LookoutTower, 0, HARD_CONSTRAINT);
            }
            B::Catapult => {
                self.local_consumption(Concept::Enemy, 8, 1);
                self.local_production(Concept::Catapult, 8, 1);
                self.affection(Resource::BorderLand, 4, 64);
                self.affection(Concept::LookoutTower, 5, 1);
                self.aversion(Concept::Catapult, 0, HARD_CONSTRAINT);
            }
            B::Woodcutter => {
                self.global_consumption(Resource::Tree, 1);
                self.local_consumption(Resource::Tree, 5, 8);
                self.affection(Resource::Tree, 3, 4096);
                self.local_and_global_production(Commodity::Wood, 0, 1);
            }
            B::Fishery => {
                self.local_consumption(Resource::Fish, 0, 2);
                self.global_consumption(Resource::Fish, 1);
                self.local_production(Concept::Fishery, 6, 1);
                self.global_production(Commodity::Food, 1);
                self.affection(Resource::Fish, 4, 4096);
                self.aversion(Resource::BorderLand, 3, 32768);
                self.aversion(Concept::Fishery, 0, HARD_CONSTRAINT);
            }
            B::Quarry => {
                self.local_consumption(Resource::Stone, 5, 2);
                self.local_consumption(Resource::Stone, 8, 2);
                self.affection(Resource::BorderLand, 8, 1024);
                self.global_production(Commodity::Stones, 1);
            }
            B::Forester => {
                self.local_production(Concept::Forester, 4, 1);
                self.local_and_global_production(Resource::Tree, 0, 8);
                self.local_and_global_consumption(Resource::PlantSpace, 2, 4);
                self.local_production(Concept::TreeSpace, 3, 10);
                self.affection(Commodity::Wood, 2, 1024);
                self.affection(Resource::Tree, 3, 128);
                self.aversion(Concept::FarmSpace, 4, HARD_CONSTRAINT);
                self.aversion(Concept::TreeSpace, 4, 64);
                self.aversion(Concept::Storehouse, 4, 64);
                self.aversion(Resource::BorderLand, 2, HARD_CONSTRAINT);
                self.aversion(Concept::Forester, 0, HARD_CONSTRAINT);
            }
            B::Slaughterhouse => {
                self.global_consumption(Commodity::Pig, 1);
                self.global_production(Commodity::Food, 1);
                self.affection(Commodity::Pig, 4, 128);
            }
            B::Hunter => {
                self.local_consumption(Resource::Animal, 12, 5);
                self.aversion(Concept::Hunter, 5, HARD_CONSTRAINT);
                self.global_production(Commodity::Food, 1);
            }
            B::Brewery => {
                self.global_consumption(Commodity::Water, 1);
                self.global_consumption(Commodity::Grain, 1);
                self.global_production(Commodity::Beer, 3);
                self.affection(Concept::Storehouse, 4, 128);
            }
            B::Armory => {
                self.global_consumption(Commodity::Iron, 1);
                self.global_consumption(Commodity::Coal, 1);
                self.global_consumption(Commodity::Beer, 1);
                self.global_production(Commodity::Shield, 1);
                self.global_production(Commodity::Sword, 1);
                self.affection(Commodity::Coal, 7, 128);
                self.affection(Commodity::Iron, 7, 128);
            }
            B::Metalworks => {
                self.global_consumption(Commodity::Iron, 1);
                self.global_consumption(Commodity::Coal, 1);
                self.global_production(Concept::Metalworks, 6);
                self.affection(Commodity::Coal, 7, 128);
                self.affection(Commodity::Iron, 7, 128);
            }
            B::IronSmelter => {
                self.global_consumption(Commodity::Coal, 1);
                self.global_consumption(Commodity::IronOre, 1);
                self.local_and_global_production(Commodity::Iron, 0, 3);
                self.affection(Commodity::Coal, 7, 128);
                self.affection(Commodity::IronOre, 7, 128);
                self.affection(Resource::Coal, 7, 128);
                self.affection(Resource::IronOre, 7, 128);
            }
            B::CharBurner => {
                self.global_consumption(Commodity::Wood, 1);
                self.global_consumption(Commodity::Grain, 1);
                self.local_and_global_production(Commodity::Coal, 0, 1);
                self.affection(Commodity::Coal, 7, 128);
                self.affection(Commodity::IronOre, 7, 128);
                self.local_and_global_consumption(Resource::PlantSpace, 3, 18);
                self.local_production(Concept::FarmSpace, 4, 1);
                self.aversion(Concept::TreeSpace, 1, 256);
                self.aversion(Concept::FarmSpace, 2, 128);
                self.aversion(Concept::Headquarters, 0, HARD_CONSTRAINT);
                self.aversion(Resource::BorderLand, 3, 8);
            }
            B::PigFarm => {
                self.global_consumption(Commodity::Grain, 1);
                self.global_consumption(Commodity::Water, 1);
                self.local_and_global_production(Commodity::Pig, 0, 1);
            }
            B::Storehouse => {
                self.local_and_global_production(Concept::Storehouse, 12, 30);
                self.affection(Concept::Military, 4, 1024);
                self.aversion(Concept::Storehouse, 1, HARD_CONSTRAINT);
                self.aversion(Resource::BorderLand, 2, HARD_CONSTRAINT);
            }
            B::Mill => {
                self.global_consumption(Commodity::Grain, 1);
                self.local_and_global_production(Commodity::Flour, 0, 1);
            }
            B::Bakery => {
                self.global_consumption(Commodity::Water, 1);
                self.global_consumption(Commodity::Flour, 1);
                self.global_production(Commodity::Food, 1);
                self.affection(Commodity::Grain, 5, 128);
            }
            B::Sawmill => {
                self.global_consumption(Commodity::Wood, 2);
                self.global_production(Commodity::Boards, 1);
            }
            B::Mint => {
                self.global_consumption(Commodity::Coal, 1);
                self.global_consumption(Commodity::Gold, 1);
                self.global_production(Commodity::Coins, 1);
            }
            B::Well => {
                self.global_consumption(Resource::Water, 1);
                self.global_production(Commodity::Water, 2);
                self.local_consumption(Resource::Water, 4, 32);
                self.affection(Concept::Storehouse, 4, 128);
            }
            B::Farm => {
                self.local_and_global_consumption(Resource::PlantSpace, 4, 8);
                self.local_production(Concept::FarmSpace, 3, 1);
                self.aversion(Concept::TreeSpace, 4, 2048);
                self.aversion(Concept::FarmSpace, 3, 256);
                self.aversion(Concept::Headquarters, 0, HARD_CONSTRAINT);
                self.aversion(Resource::BorderLand, 4, HARD_CONSTRAINT);
                self.aversion(Concept::MineSpace, 3, -128);
                self.affection(Resource::PlantSpace, 4, 512);
                self.local_and_global_production(Commodity::Grain, 0, 1);
            }
            B::DonkeyBreeder => {
                self.global_consumption(Commodity::Grain, 1);
                self.global_consumption(Commodity::Water, 1);
                self.global_production(Concept::Donkey, 8);
            }
            B::Shipyard | B::Harbor => {}
        }

        if !self.building.is_military()
            && !matches!(self.building, B::Quarry | B::Woodcutter)
        {
            self.aversion(Resource::BorderLand, 3, 128);
        }
    }

    fn declare_military(&mut self) {
        let radius = self.building.military_radius().unwrap_or(0);
        if matches!(self.building, BuildingType::Barracks | BuildingType::Guardhouse) {
            self.aversion(Concept::Enemy, 20, HARD_CONSTRAINT);
            self.aversion(Concept::MineSpace, 6, 1024);
        }
        self.local_and_global_production(Concept::Military, radius / 2, 1);
        self.local_consumption(Concept::NearUnowned, 0, 8);
        self.local_consumption(Concept::Unowned, radius, 8);
        self.aversion(Concept::Military, 0, HARD_CONSTRAINT);
        self.aversion(Concept::Owned, 7, 64);
        self.affection(Concept::Hidden, radius / 2, 64);
        self.affection(Resource::BorderLand, 2, 8192);
        self.affection(Resource::BorderLand, 4, 1024);
        self.affection(Resource::BorderLand, 6, 64);
        self.affection(Concept::Unowned, 5, 1024);
    }

    fn declare_mine(&mut self, ore: Resource, amount: i32, product: Commodity) {
        self.local_and_global_consumption(ore, 2, amount);
        self.global_consumption(Commodity::Food, 1);
        self.local_and_global_production(product, 0, 1);
    }
}

/// Effect lists of every building type, built once.
#[derive(Clone, Debug)]
pub struct Catalog {
    infos: Vec<BuildingInfo>,
}

impl Default for Catalog {
    fn default() -> Self {
        Self::new()
    }
}

impl Catalog {
    /// Declares the effects of every building type.
    #[must_use]
    pub fn new() -> Self {
        Self {
            infos: BuildingType::ALL.iter().map(|b| BuildingInfo::new(*b)).collect(),
        }
    }

    /// Process-wide catalog, declared on first use.
    #[must_use]
    pub fn shared() -> &'static Catalog {
        static CATALOG: OnceLock<Catalog> = OnceLock::new();
        CATALOG.get_or_init(Catalog::new)
    }

    /// Effects of one building type.
    #[must_use]
    pub fn info(&self, building: BuildingType) -> &BuildingInfo {
        &self.infos[building as usize]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn consumption_adds_halving_affections() {
        let catalog = Catalog::new();
        let hunter = catalog.info(BuildingType::Hunter);
        let radii: Vec<u32> = hunter
            .preferences()
            .filter(|effect| {
                effect.kind == EffectKind::Affection
                    && effect.thing == Thing::Resource(Resource::Animal)
            })
            .map(BuildingEffect::radius)
            .collect();
        assert_eq!(radii, vec![6, 3, 1, 0]);
    }

    #[test]
    fn border_aversion_skips_military_quarry_and_woodcutter() {
        let catalog = Catalog::new();
        let has_border_aversion = |building| {
            catalog.info(building).effects().iter().any(|effect| {
                effect.kind == EffectKind::Aversion
                    && effect.thing == Thing::Resource(Resource::BorderLand)
                    && effect.amount == 128
                    && effect.radius() == 3
            })
        };
        assert!(has_border_aversion(BuildingType::Sawmill));
        assert!(has_border_aversion(BuildingType::Harbor));
        assert!(!has_border_aversion(BuildingType::Quarry));
        assert!(!has_border_aversion(BuildingType::Woodcutter));
        assert!(!has_border_aversion(BuildingType::Fortress));
    }

    #[test]
    fn catalog_is_indexed_by_type() {
        let catalog = Catalog::new();
        for building in BuildingType::ALL {
            assert_eq!(catalog.info(building).building(), building);
        }
    }

    #[test]
    fn resource_consumers_are_recognised() {
        let catalog = Catalog::new();
        assert!(catalog.info(BuildingType::Quarry).consumes_only_resources());
        assert!(!catalog.info(BuildingType::CoalMine).consumes_only_resources());
        assert!(!catalog.info(BuildingType::Shipyard).consumes_only_resources());
    }
}
