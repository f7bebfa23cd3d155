pub mod agent;
pub mod config;
pub mod sim_params;
pub mod snapshot;
pub mod vecmath;

// Re-export key types for easier use by dependent crates
pub use agent::{Dot, DotId, DotIdAllocator, Group, Personality};
pub use config::{InteractionConfig, OutputConfig, PopulationConfig, Range, SimulationConfig, TimingConfig, WorldConfig};
pub use sim_params::{SimParams, Visibility, World, WrapMode};
pub use snapshot::{DotFrame, Snapshot};
pub use vecmath::Vec2;
