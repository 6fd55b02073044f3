use std::collections::BTreeMap;

use settler_ai_core::{BuildingType, Engine, MapPoint};
use settler_ai_model::View;
use tracing::debug;

/// Finished buildings waiting to take up service.
#[derive(Debug, Default)]
pub(crate) struct Commissioning {
    finished: BTreeMap<MapPoint, BuildingType>,
}

impl Commissioning {
    pub(crate) fn record(&mut self, point: MapPoint, building: BuildingType) {
        let _ = self.finished.insert(point, building);
    }

    pub(crate) fn erase(&mut self, point: MapPoint) {
        let _ = self.finished.remove(&point);
    }

    pub(crate) fn len(&self) -> usize {
        self.finished.len()
    }

    /// Retires buildings that are in service. Military buildings wait until
    /// they are occupied; they and lookout towers change what the player
    /// sees, so the model is rebuilt after them.
    pub(crate) fn check(&mut self, engine: &dyn Engine, view: &mut View) {
        self.finished.retain(|point, building| {
            if engine.building_at(*point) != Some(*building) {
                debug!(?point, ?building, "finished building vanished");
                return false;
            }
            if building.is_military() {
                if engine.is_newly_built(*point) {
                    return true;
                }
                debug!(?point, ?building, "military building occupied");
                view.request_full_update();
            } else if *building == BuildingType::LookoutTower {
                debug!(?point, "lookout tower commissioned");
                view.request_full_update();
            }
            false
        });
    }
}
