use serde::{Deserialize, Serialize};
use anyhow::Result;
use crate::sim_params::{
    SimParams, Visibility, WrapMode, AVOID_GROUPS_DISTANCE, COHESION_DISTANCE, CROWDING_DISTANCE,
    MAX_NEIGHBOR_COUNT,
};
use std::path::Path;

// Configuration for the toroidal world
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct WorldConfig {
    pub width: f32,
    pub height: f32,
    #[serde(default)]
    pub boundary: WrapMode,
}

/// A half-open `[min, max)` sampling range.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq)]
pub struct Range(pub f32, pub f32);

impl Range {
    pub fn min(&self) -> f32 {
        self.0
    }

    pub fn max(&self) -> f32 {
        self.1
    }

    fn validate(&self, name: &str) -> Result<()> {
        if !(self.0 > 0.0 && self.0 < self.1) {
            anyhow::bail!("{} range must satisfy 0 < min < max, got [{}, {}).", name, self.0, self.1);
        }
        Ok(())
    }
}

// Population size and personality ranges, loaded from config.toml
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct PopulationConfig {
    #[serde(default = "default_dot_count")]
    pub dot_count: u32,
    pub seed: u64,
    #[serde(default = "default_max_speed")]
    pub max_speed: Range,
    #[serde(default = "default_love_for_others")]
    pub love_for_others: Range,
    #[serde(default = "default_loathe_for_others")]
    pub loathe_for_others: Range,
    #[serde(default = "default_group_aversion")]
    pub group_aversion: Range,
}

// Neighbour radii and scan behaviour. Every field is optional.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct InteractionConfig {
    #[serde(default = "default_max_neighbor_count")]
    pub max_neighbor_count: u32,
    #[serde(default = "default_crowding_distance")]
    pub crowding_distance: f32,
    #[serde(default = "default_avoid_groups_distance")]
    pub avoid_groups_distance: f32,
    #[serde(default = "default_cohesion_distance")]
    pub cohesion_distance: f32,
    #[serde(default)]
    pub visibility: Visibility,
}

impl Default for InteractionConfig {
    fn default() -> Self {
        InteractionConfig {
            max_neighbor_count: MAX_NEIGHBOR_COUNT,
            crowding_distance: CROWDING_DISTANCE,
            avoid_groups_distance: AVOID_GROUPS_DISTANCE,
            cohesion_distance: COHESION_DISTANCE,
            visibility: Visibility::Sequential,
        }
    }
}

// Configuration for timing
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct TimingConfig {
    pub total_steps: u32,
    pub record_interval_steps: u32,
}

// Configuration for output settings, loaded from config.toml
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct OutputConfig {
    pub base_filename: String,
    pub save_final_positions: bool,
    pub save_stats: bool,
    #[serde(default = "default_save_dots_in_snapshot")]
    pub save_dots_in_snapshot: bool,
    pub format: Option<String>, // Output format: "json", "bincode", "messagepack"
}

// Main simulation configuration structure, loaded from config.toml.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct SimulationConfig {
    pub world: WorldConfig,
    pub population: PopulationConfig,
    #[serde(default)]
    pub interaction: InteractionConfig,
    pub timing: TimingConfig,
    pub output: OutputConfig,
}

impl SimulationConfig {
    /// Loads the simulation configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_ref = path.as_ref();

        let config_str = std::fs::read_to_string(path_ref)
            .map_err(|e| anyhow::anyhow!("Failed to read config file '{}': {}", path_ref.display(), e))?;
        let config = Self::from_toml_str(&config_str)
            .map_err(|e| anyhow::anyhow!("Invalid config '{}': {}", path_ref.display(), e))?;

        Ok(config)
    }

    /// Parses and validates a configuration from TOML text.
    pub fn from_toml_str(config_str: &str) -> Result<Self> {
        let config: SimulationConfig = toml::from_str(config_str)
            .map_err(|e| anyhow::anyhow!("Failed to parse TOML: {}", e))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.world.width <= 0.0 || self.world.height <= 0.0 {
            anyhow::bail!("world width and height must be positive.");
        }
        if self.population.dot_count == 0 {
            anyhow::bail!("dot_count must be greater than 0.");
        }
        self.population.max_speed.validate("max_speed")?;
        self.population.love_for_others.validate("love_for_others")?;
        self.population.loathe_for_others.validate("loathe_for_others")?;
        self.population.group_aversion.validate("group_aversion")?;

        let interaction = &self.interaction;
        if interaction.crowding_distance <= 0.0
            || interaction.avoid_groups_distance <= 0.0
            || interaction.cohesion_distance <= 0.0
        {
            anyhow::bail!("interaction distances must be positive.");
        }
        if self.timing.total_steps == 0 {
            anyhow::bail!("total_steps must be greater than 0.");
        }
        Ok(())
    }

    /// Converts the configuration into simulation parameters used at runtime.
    pub fn get_sim_params(&self) -> SimParams {
        SimParams {
            world_width: self.world.width,
            world_height: self.world.height,
            wrap_mode: self.world.boundary,
            max_neighbor_count: self.interaction.max_neighbor_count,
            crowding_distance: self.interaction.crowding_distance,
            avoid_groups_distance: self.interaction.avoid_groups_distance,
            cohesion_distance: self.interaction.cohesion_distance,
            visibility: self.interaction.visibility,
        }
    }
}

fn default_dot_count() -> u32 {
    2000
}

fn default_max_speed() -> Range {
    Range(1.0, 3.0)
}

fn default_love_for_others() -> Range {
    Range(1.0, 5.0)
}

fn default_loathe_for_others() -> Range {
    Range(1.0, 7.0)
}

fn default_group_aversion() -> Range {
    Range(1.0, 7.0)
}

fn default_max_neighbor_count() -> u32 {
    MAX_NEIGHBOR_COUNT
}

fn default_crowding_distance() -> f32 {
    CROWDING_DISTANCE
}

fn default_avoid_groups_distance() -> f32 {
    AVOID_GROUPS_DISTANCE
}

fn default_cohesion_distance() -> f32 {
    COHESION_DISTANCE
}

fn default_save_dots_in_snapshot() -> bool {
    true
}
