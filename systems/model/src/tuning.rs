//! Scoring constants.

use serde::{Deserialize, Serialize};
use settler_ai_core::BuildingQuality;

/// Weights used by site and path scoring.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreTuning {
    /// Score per unit of a locally consumed thing found in range.
    pub resource_in_range_factor: i64,
    /// Value of each building quality when estimating capacity loss.
    pub quality: QualityScores,
    /// Cost ceiling multiplier used to reject redundant secondary roads.
    pub secondary_road_factor: i64,
    /// Percent of the HQ-to-enemy distance a military site may lie beyond,
    /// lightest tier first. Zero disables the bound.
    pub required_minimal_distance_to_enemy: [i64; 4],
    /// Percent of the HQ-to-enemy distance a military site must keep from the
    /// enemy, lightest tier first. Zero disables the bound.
    pub required_remaining_distance_to_enemy: [i64; 4],
    /// Fixed penalties.
    pub penalties: Penalties,
    /// Tolerated global shortfall for important commodities when a building
    /// is requested.
    pub important_commodity_slack: i32,
    /// Tolerated global shortfall for important commodities when a site is
    /// scored.
    pub important_commodity_site_slack: i32,
}

impl Default for ScoreTuning {
    fn default() -> Self {
        Self {
            resource_in_range_factor: 64,
            quality: QualityScores::default(),
            secondary_road_factor: 2,
            required_minimal_distance_to_enemy: [0, 0, 0, 0],
            required_remaining_distance_to_enemy: [100, 100, 70, 0],
            penalties: Penalties::default(),
            important_commodity_slack: 2,
            important_commodity_site_slack: 1,
        }
    }
}

/// Capacity value of each building quality.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityScores {
    /// Nothing buildable.
    pub nothing: i64,
    /// Flag only.
    pub flag: i64,
    /// Small building.
    pub hut: i64,
    /// Medium building.
    pub house: i64,
    /// Large building.
    pub castle: i64,
    /// Mine.
    pub mine: i64,
    /// Harbor.
    pub harbor: i64,
}

impl Default for QualityScores {
    fn default() -> Self {
        Self {
            nothing: 0,
            flag: 0,
            hut: 10,
            house: 20,
            castle: 30,
            mine: 240,
            harbor: 3840,
        }
    }
}

impl QualityScores {
    /// Value of a quality.
    #[must_use]
    pub fn of(&self, quality: BuildingQuality) -> i64 {
        match quality {
            BuildingQuality::Nothing => self.nothing,
            BuildingQuality::Flag => self.flag,
            BuildingQuality::Hut => self.hut,
            BuildingQuality::House => self.house,
            BuildingQuality::Castle => self.castle,
            BuildingQuality::Mine => self.mine,
            BuildingQuality::Harbor => self.harbor,
        }
    }
}

/// Fixed penalties applied by scoring and path costs.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Penalties {
    /// Cost of every road step.
    pub route_segment: i64,
    /// Extra cost of a step where neither end can hold a flag.
    pub route_missing_flag: i64,
    /// Cost of a road crossing reserved farm land.
    pub farm_land_road: i64,
    /// Penalty per reserved farm node near a building.
    pub farm_land_building: i64,
    /// Penalty per reserved tree node.
    pub tree_land: i64,
    /// Penalty per step a site lies further from the requested point than
    /// its rival.
    pub close_to_point_distance: i64,
    /// Neighbouring stone.
    pub stone_on_neighbour: i64,
    /// Neighbouring tree.
    pub tree_on_neighbour: i64,
    /// Neighbouring border.
    pub border_on_neighbour: i64,
}

impl Default for Penalties {
    fn default() -> Self {
        Self {
            route_segment: 8,
            route_missing_flag: 64,
            farm_land_road: 128,
            farm_land_building: 1024,
            tree_land: 32,
            close_to_point_distance: 4096,
            stone_on_neighbour: 32,
            tree_on_neighbour: 4,
            border_on_neighbour: 8,
        }
    }
}
