use crate::vecmath::Vec2;
use serde::{Deserialize, Serialize};

/// Early-exit bound on counted crowding neighbours.
pub const MAX_NEIGHBOR_COUNT: u32 = 20;
/// Squared-distance threshold for same-group crowding.
pub const CROWDING_DISTANCE: f32 = 50.0;
/// Squared-distance threshold for cross-group crowding.
pub const AVOID_GROUPS_DISTANCE: f32 = 1000.0;
/// Squared-distance threshold for cohesion and group avoidance sums.
pub const COHESION_DISTANCE: f32 = 5000.0;

/// How neighbour scans see dots that were already moved earlier in the same step.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    /// Dots are committed one at a time, so later dots see earlier dots' new state.
    #[default]
    Sequential,
    /// Every dot reads the pre-step state; dots are updated in parallel.
    Snapshot,
}

/// Boundary policy applied to each axis after integration.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum WrapMode {
    /// One wrap per axis; motion larger than the world stays out of bounds.
    #[default]
    Single,
    /// Euclidean remainder, always lands inside the world.
    Modulo,
}

impl WrapMode {
    /// Wraps one coordinate into `[0, size)`.
    pub fn wrap(self, value: f32, size: f32) -> f32 {
        match self {
            WrapMode::Single => {
                let wrapped = if value < 0.0 {
                    value + size
                } else if value >= size {
                    value - size
                } else {
                    value
                };
                // a tiny negative value can round up to exactly `size`
                if wrapped == size { 0.0 } else { wrapped }
            }
            WrapMode::Modulo => {
                let wrapped = value.rem_euclid(size);
                // rem_euclid can round up to `size` for tiny negative inputs
                if wrapped >= size { 0.0 } else { wrapped }
            }
        }
    }
}

/// Toroidal world bounds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct World {
    pub width: f32,
    pub height: f32,
}

impl World {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    pub fn wrap(&self, pos: Vec2, mode: WrapMode) -> Vec2 {
        Vec2::new(mode.wrap(pos.x, self.width), mode.wrap(pos.y, self.height))
    }

    pub fn contains(&self, pos: Vec2) -> bool {
        pos.x >= 0.0 && pos.x < self.width && pos.y >= 0.0 && pos.y < self.height
    }
}

/// Simulation parameters derived from the configuration, read on every step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimParams {
    // World
    pub world_width: f32,
    pub world_height: f32,
    pub wrap_mode: WrapMode,

    // Interaction radii (squared distances)
    pub max_neighbor_count: u32,
    pub crowding_distance: f32,
    pub avoid_groups_distance: f32,
    pub cohesion_distance: f32,

    pub visibility: Visibility,
}

impl SimParams {
    pub fn world(&self) -> World {
        World::new(self.world_width, self.world_height)
    }
}

impl Default for SimParams {
    fn default() -> Self {
        SimParams {
            world_width: 800.0,
            world_height: 600.0,
            wrap_mode: WrapMode::Single,
            max_neighbor_count: MAX_NEIGHBOR_COUNT,
            crowding_distance: CROWDING_DISTANCE,
            avoid_groups_distance: AVOID_GROUPS_DISTANCE,
            cohesion_distance: COHESION_DISTANCE,
            visibility: Visibility::Sequential,
        }
    }
}
