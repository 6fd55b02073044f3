//! TOML configuration of the agent.

use std::path::Path;

use serde::{Deserialize, Serialize};
use settler_ai_model::ScoreTuning;
use settler_ai_system_actions::ActionTuning;
use settler_ai_system_roads::RoadTuning;

/// Complete agent configuration. Missing sections and fields keep their
/// defaults, so partial files are fine.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Site and road scoring weights.
    pub score: ScoreTuning,
    /// Scheduler limits.
    pub actions: ActionTuning,
    /// Road upkeep cadence and thresholds.
    pub roads: RoadTuning,
    /// Tick cadence of the agent itself.
    pub player: PlayerTuning,
}

impl AgentConfig {
    /// Loads configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parses configuration from a TOML string.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Renders the configuration as TOML.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }
}

/// When the agent acts.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerTuning {
    /// First tick on which the agent may act.
    pub minimal_tick: u64,
    /// The agent acts on every this many eligible ticks.
    pub act_every: u64,
    /// Every this many acts the model is rebuilt from scratch.
    pub full_update_every: u64,
    /// Seed of every random choice the agent makes.
    pub rng_seed: u64,
}

impl Default for PlayerTuning {
    fn default() -> Self {
        Self {
            minimal_tick: 500,
            act_every: 5,
            full_update_every: 100,
            rng_seed: 0x5e77_1e25,
        }
    }
}

/// Failure to load or render a configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("cannot read config: {0}")]
    Io(#[from] std::io::Error),
    /// The file is not valid TOML for an [`AgentConfig`].
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
    /// The configuration could not be rendered.
    #[error("cannot render config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_yields_defaults() {
        let config = AgentConfig::from_toml_str("").expect("empty config parses");
        assert_eq!(config, AgentConfig::default());
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config = AgentConfig::from_toml_str(
            "[player]\nact_every = 2\n\n[roads]\nmin_road_productivity = 25\n",
        )
        .expect("partial config parses");

        assert_eq!(config.player.act_every, 2);
        assert_eq!(config.player.minimal_tick, 500);
        assert_eq!(config.roads.min_road_productivity, 25);
        assert_eq!(config.roads.reconnect_flags_interval, 5000);
        assert_eq!(config.actions.emergency_queue_cap, 2000);
    }

    #[test]
    fn rendered_config_reads_back() {
        let mut config = AgentConfig::default();
        config.player.rng_seed = 99;
        config.actions.emergency_queue_cap = 10;

        let text = config.to_toml().expect("config renders");
        let parsed = AgentConfig::from_toml_str(&text).expect("rendered config parses");
        assert_eq!(parsed, config);
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        let error = AgentConfig::from_toml_str("[player\nact_every = 2").unwrap_err();
        assert!(matches!(error, ConfigError::Parse(_)), "got {error:?}");
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let error = AgentConfig::from_file(Path::new("/nonexistent/settler-ai.toml")).unwrap_err();
        assert!(matches!(error, ConfigError::Io(_)), "got {error:?}");
    }
}
