use settler_ai_core::{
    BuildingType, Deposit, Direction, MapExtent, MapPoint, NodeObject, Owner,
};

use super::{Terrain, World};

/// Declarative construction of a [`World`] for tests and demos.
///
/// Calls apply in order, so territory should be claimed before buildings are
/// placed on it.
#[derive(Debug)]
pub struct WorldBuilder {
    world: World,
}

impl WorldBuilder {
    /// Starts from an unowned, fully visible meadow.
    #[must_use]
    pub fn new(extent: MapExtent) -> Self {
        Self {
            world: World::new(extent),
        }
    }

    fn region(self, center: MapPoint, radius: u32, mut edit: impl FnMut(&mut super::Node)) -> Self {
        let mut builder = self;
        for point in builder.world.extent.points_in_radius(center, radius) {
            if let Some(node) = builder.world.node_mut(point) {
                edit(node);
            }
        }
        builder
    }

    /// Claims every node within `radius` of `center` for the player.
    #[must_use]
    pub fn territory(self, center: MapPoint, radius: u32) -> Self {
        self.region(center, radius, |node| node.owner = Owner::Own)
    }

    /// Hands every node within `radius` of `center` to an enemy.
    #[must_use]
    pub fn enemy_territory(self, center: MapPoint, radius: u32) -> Self {
        self.region(center, radius, |node| node.owner = Owner::Enemy)
    }

    /// Sets the terrain of every node within `radius` of `center`.
    #[must_use]
    pub fn terrain(self, center: MapPoint, radius: u32, terrain: Terrain) -> Self {
        self.region(center, radius, |node| node.terrain = terrain)
    }

    /// Hides every node within `radius` of `center`.
    #[must_use]
    pub fn fog(self, center: MapPoint, radius: u32) -> Self {
        self.region(center, radius, |node| node.visible = false)
    }

    /// Places an object on a node.
    #[must_use]
    pub fn object(mut self, point: MapPoint, object: NodeObject) -> Self {
        self.world.set_object(point, object);
        self
    }

    /// Buries a deposit under a node.
    #[must_use]
    pub fn deposit(mut self, point: MapPoint, deposit: Deposit) -> Self {
        if let Some(node) = self.world.node_mut(point) {
            node.deposit = Some(deposit);
        }
        self
    }

    /// Lets a huntable animal roam on a node.
    #[must_use]
    pub fn animal(mut self, point: MapPoint) -> Self {
        if let Some(node) = self.world.node_mut(point) {
            node.animal = true;
        }
        self
    }

    /// Places a flag.
    #[must_use]
    pub fn flag(mut self, point: MapPoint) -> Self {
        self.world.set_object(point, NodeObject::Flag);
        self
    }

    /// Places a finished building together with its flag.
    #[must_use]
    pub fn building(mut self, point: MapPoint, building: BuildingType) -> Self {
        self.world.set_object(point, NodeObject::Building(building));
        if let Some(flag) = self.world.extent.flag_of(point) {
            self.world.set_object(flag, NodeObject::Flag);
            let extent = self.world.extent;
            self.world.roads.link(&extent, point, Direction::SouthEast);
        }
        self
    }

    /// Places the player's headquarters.
    #[must_use]
    pub fn headquarters(mut self, point: MapPoint) -> Self {
        self.world.headquarters = Some(point);
        self.building(point, BuildingType::Headquarters)
    }

    /// Records an enemy headquarters on enemy land.
    #[must_use]
    pub fn enemy_headquarters(mut self, point: MapPoint) -> Self {
        self.world.enemy_headquarters.push(point);
        self.world
            .set_object(point, NodeObject::Building(BuildingType::Headquarters));
        self
    }

    /// Lays a road from `origin`, placing flags at both ends.
    #[must_use]
    pub fn road(mut self, origin: MapPoint, route: &[Direction]) -> Self {
        let extent = self.world.extent;
        self.world.set_object(origin, NodeObject::Flag);
        if let Some(end) = extent
            .route_points(origin, route)
            .and_then(|points| points.last().copied())
        {
            self.world.set_object(end, NodeObject::Flag);
        }
        self.world.roads.lay(&extent, origin, route);
        self
    }

    /// Finishes the world, setting border stones along the edge of the
    /// player's territory.
    #[must_use]
    pub fn build(mut self) -> World {
        let extent = self.world.extent;
        let border: Vec<MapPoint> = extent
            .points()
            .filter(|point| self.world.is_own(*point))
            .filter(|point| {
                Direction::ALL.iter().any(|direction| {
                    extent
                        .neighbour(*point, *direction)
                        .map_or(true, |next| !self.world.is_own(next))
                })
            })
            .collect();
        for point in border {
            if let Some(node) = self.world.node_mut(point) {
                node.border_stone = true;
            }
        }
        self.world
    }
}
