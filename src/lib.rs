//! Flocking dots in four affinity groups on a toroidal world.
//!
//! [`engine::StepEngine`] is the per-frame step. [`simulation::DotSimulation`]
//! drives it for the `dot-swarm` binary and records snapshots for the visualizer.

pub mod engine;
pub mod output;
pub mod population;
pub mod render;
pub mod simulation;

pub use engine::{Motion, NeighborSums, StepEngine};
pub use render::{RenderRegistry, RenderSink, RenderTransform};
pub use simulation::DotSimulation;
