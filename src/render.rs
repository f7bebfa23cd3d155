use log::trace;
use std::collections::HashMap;
use swarm_common::{DotId, Vec2};

/// Where a dot's shape should be drawn and how it is rotated.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RenderTransform {
    pub position: Vec2,
    pub rotation: f32,
}

/// Receives the per-dot transform the step engine emits after moving a dot.
pub trait RenderSink {
    fn place(&mut self, id: DotId, transform: RenderTransform);
}

/// Discards every update. Useful for headless runs.
impl RenderSink for () {
    fn place(&mut self, _id: DotId, _transform: RenderTransform) {}
}

/// Collects updates in the order they were emitted.
impl RenderSink for Vec<(DotId, RenderTransform)> {
    fn place(&mut self, id: DotId, transform: RenderTransform) {
        self.push((id, transform));
    }
}

/// Id-keyed render state, kept apart from the simulation state so dots stay plain data.
///
/// Only registered ids are tracked. Updates for an id that was never registered
/// are ignored and counted in [`RenderRegistry::misses`].
#[derive(Debug, Default)]
pub struct RenderRegistry {
    transforms: HashMap<DotId, RenderTransform>,
    misses: u64,
}

impl RenderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, id: DotId, initial: RenderTransform) {
        self.transforms.insert(id, initial);
    }

    pub fn unregister(&mut self, id: DotId) -> Option<RenderTransform> {
        self.transforms.remove(&id)
    }

    pub fn get(&self, id: DotId) -> Option<&RenderTransform> {
        self.transforms.get(&id)
    }

    pub fn len(&self) -> usize {
        self.transforms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transforms.is_empty()
    }

    /// Number of updates dropped because their id had no registered visual.
    pub fn misses(&self) -> u64 {
        self.misses
    }
}

impl RenderSink for RenderRegistry {
    fn place(&mut self, id: DotId, transform: RenderTransform) {
        match self.transforms.get_mut(&id) {
            Some(slot) => *slot = transform,
            None => {
                self.misses += 1;
                trace!("No visual registered for {}, skipping render update.", id);
            }
        }
    }
}
