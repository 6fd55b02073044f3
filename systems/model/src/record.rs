use settler_ai_core::{BuildingType, MapPoint};

use crate::catalog::Catalog;
use crate::View;

const MILITARY_INFLUENCE_RADIUS: u32 = 4;

/// A building the model accounts for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BuildingRecord {
    building: BuildingType,
    has_required_resources: bool,
}

impl BuildingRecord {
    pub(crate) const fn new(building: BuildingType) -> Self {
        Self {
            building,
            has_required_resources: true,
        }
    }

    /// Type of the building.
    #[must_use]
    pub const fn building(&self) -> BuildingType {
        self.building
    }

    /// Whether the last refresh found every local consumption in range.
    #[must_use]
    pub const fn has_required_resources(&self) -> bool {
        self.has_required_resources
    }

    pub(crate) fn set_has_required_resources(&mut self, value: bool) {
        self.has_required_resources = value;
    }
}

impl View {
    /// Applies the constant effects of a registered building.
    pub(crate) fn init_building(&mut self, point: MapPoint, building: BuildingType) {
        if building.is_military()
            || matches!(building, BuildingType::Headquarters | BuildingType::Harbor)
        {
            for circle in self.extent.points_in_radius(point, MILITARY_INFLUENCE_RADIUS) {
                if let Some(location) = self.location_mut(circle) {
                    location.military_influence += 1;
                }
            }
        }
        self.apply_productions(point, building, 1, false);
    }

    /// Claims the consumptions of a registered building and reports whether
    /// every local requirement was met.
    pub(crate) fn check_building(&mut self, point: MapPoint, building: BuildingType) -> bool {
        self.claim_consumptions(point, building, 1, false)
    }

    /// Reverses the global part of [`View::init_building`] and
    /// [`View::check_building`].
    pub(crate) fn destroy_building(&mut self, point: MapPoint, building: BuildingType) {
        let _ = self.claim_consumptions(point, building, -1, true);
        self.apply_productions(point, building, -1, true);
    }

    fn apply_productions(
        &mut self,
        point: MapPoint,
        building: BuildingType,
        factor: i32,
        global_only: bool,
    ) {
        for production in Catalog::shared().info(building).productions() {
            if !production.is_local() {
                self.global[production.thing] += production.amount * factor;
                continue;
            }
            if global_only {
                continue;
            }
            self.add_local(
                point,
                production.radius(),
                production.thing,
                production.amount * factor,
            );
        }
    }

    // Local claims take one unit at a time, round robin, from every node in
    // range that still holds some.
    fn claim_consumptions(
        &mut self,
        point: MapPoint,
        building: BuildingType,
        factor: i32,
        global_only: bool,
    ) -> bool {
        let mut has_resources = true;
        for consumption in Catalog::shared().info(building).consumptions() {
            if !consumption.is_local() {
                self.global[consumption.thing] -= consumption.amount * factor;
                continue;
            }
            if global_only {
                continue;
            }

            let radius = consumption.radius();
            let mut available: Vec<(MapPoint, i32)> = self
                .extent
                .points_in_radius(point, radius)
                .into_iter()
                .filter(|circle| radius == 0 || *circle != point)
                .filter_map(|circle| {
                    let value = self.location(circle)?.value(consumption.thing);
                    (value > 0).then_some((circle, value))
                })
                .collect();

            let mut required = consumption.amount;
            let mut changed = true;
            while changed && required > 0 {
                changed = false;
                for (_, value) in available.iter_mut() {
                    if *value <= 0 {
                        continue;
                    }
                    *value -= 1;
                    changed = true;
                    required -= 1;
                    if required <= 0 {
                        break;
                    }
                }
            }

            if required > 0 {
                tracing::trace!(
                    ?point,
                    ?building,
                    thing = ?consumption.thing,
                    missing = required,
                    "local consumption not met"
                );
            }
            has_resources &= required <= 0;

            for (circle, value) in available {
                if let Some(location) = self.location_mut(circle) {
                    *location.value_mut(consumption.thing) = value;
                }
            }
        }
        has_resources
    }
}
