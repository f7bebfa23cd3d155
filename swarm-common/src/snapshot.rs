use crate::agent::{DotId, Group};
use serde::{Deserialize, Serialize};

/// Render-facing state of one dot at snapshot time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DotFrame {
    pub id: DotId,
    pub group: Group,
    pub x: f32,
    pub y: f32,
    /// Rotation of the dot's shape in radians, as reported by the step.
    pub heading: f32,
}

/// A snapshot of the simulation state and metrics at a specific step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    /// Number of steps completed when the snapshot was taken.
    pub step: u32,
    pub dot_count: u32,
    /// Dots per group, indexed by `Group::index`.
    pub group_counts: [u32; 4],
    pub average_speed: f32,
    /// Length of the mean heading unit vector: 1 when every dot moves the same way, near 0 when disordered.
    pub polarization: f32,
    /// `neighbor_counts_distribution[N]` is the number of dots with exactly N crowding neighbours.
    /// The last bin also collects dots whose scan hit the early-exit bound.
    pub neighbor_counts_distribution: Vec<u32>,
    // Always serialized: bincode streams are not self-describing.
    pub dots: Option<Vec<DotFrame>>,
}
