use crate::vecmath::Vec2;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the four fixed affinity classes a dot belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Group {
    A,
    B,
    C,
    D,
}

impl Group {
    pub const ALL: [Group; 4] = [Group::A, Group::B, Group::C, Group::D];

    /// Stable index of the group, usable for per-group tallies.
    pub fn index(self) -> usize {
        match self {
            Group::A => 0,
            Group::B => 1,
            Group::C => 2,
            Group::D => 3,
        }
    }
}

impl fmt::Display for Group {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Group::A => "A",
            Group::B => "B",
            Group::C => "C",
            Group::D => "D",
        };
        f.write_str(name)
    }
}

/// Opaque identifier of a dot, assigned once at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DotId(pub u64);

impl fmt::Display for DotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "dot-{}", self.0)
    }
}

/// Hands out dot ids in increasing order. Ids are never reused.
#[derive(Debug, Default)]
pub struct DotIdAllocator {
    next: u64,
}

impl DotIdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&mut self) -> DotId {
        let id = DotId(self.next);
        self.next += 1;
        id
    }
}

/// Personality weights fixed at creation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Personality {
    /// Personal speed; the velocity magnitude after every step.
    pub max_speed: f32,
    /// Weight on cohesion and heading alignment.
    pub love_for_others: f32,
    /// Weight on crowding avoidance.
    pub loathe_for_others: f32,
    /// Weight on avoidance of other groups.
    pub group_aversion: f32,
}

/// One simulated dot. Only `position` and `velocity` change after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dot {
    pub id: DotId,
    pub group: Group,
    pub position: Vec2,
    pub velocity: Vec2,
    pub personality: Personality,
}

impl Dot {
    pub fn new(id: DotId, group: Group, position: Vec2, velocity: Vec2, personality: Personality) -> Self {
        Self { id, group, position, velocity, personality }
    }

    #[inline]
    pub fn max_speed(&self) -> f32 {
        self.personality.max_speed
    }

    #[inline]
    pub fn same_group(&self, other: &Dot) -> bool {
        self.group == other.group
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocator_never_repeats_ids() {
        let mut ids = DotIdAllocator::new();
        let first = ids.next_id();
        let second = ids.next_id();
        let third = ids.next_id();
        assert!(first < second && second < third);
        assert_eq!(first, DotId(0));
    }

    #[test]
    fn group_indices_are_distinct() {
        let indices: Vec<usize> = Group::ALL.iter().map(|g| g.index()).collect();
        assert_eq!(indices, vec![0, 1, 2, 3]);
        assert_eq!(Group::C.to_string(), "C");
    }
}
