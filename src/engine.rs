//! Per-frame step: neighbour scan, steering blend, integration and wrap.

use crate::render::{RenderSink, RenderTransform};
use log::trace;
use rand::Rng;
use rayon::prelude::*;
use swarm_common::{Dot, SimParams, Vec2, Visibility, World, WrapMode};

/// Accumulators gathered while scanning one dot's neighbours.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NeighborSums {
    /// Positions of same-group dots within the cohesion radius.
    pub cohesion_sum: Vec2,
    pub cohesion_count: u32,
    /// Positions of other-group dots within the cohesion radius.
    pub avoidance_sum: Vec2,
    pub avoidance_count: u32,
    /// Positions of dots that are too close, of either group.
    pub crowding_sum: Vec2,
    pub crowding_count: u32,
    /// Own velocity plus the velocities of the cohesion neighbours.
    pub velocity_alignment: Vec2,
    /// Other dots examined before the scan finished or hit the neighbour bound.
    pub scanned: usize,
}

impl NeighborSums {
    fn seeded(velocity: Vec2) -> Self {
        NeighborSums {
            cohesion_sum: Vec2::zero(),
            cohesion_count: 0,
            avoidance_sum: Vec2::zero(),
            avoidance_count: 0,
            crowding_sum: Vec2::zero(),
            crowding_count: 0,
            velocity_alignment: velocity,
            scanned: 0,
        }
    }

    pub fn cohesion_centroid(&self) -> Option<Vec2> {
        centroid(self.cohesion_sum, self.cohesion_count)
    }

    pub fn avoidance_centroid(&self) -> Option<Vec2> {
        centroid(self.avoidance_sum, self.avoidance_count)
    }

    pub fn crowding_centroid(&self) -> Option<Vec2> {
        centroid(self.crowding_sum, self.crowding_count)
    }
}

#[inline]
fn centroid(sum: Vec2, count: u32) -> Option<Vec2> {
    (count > 0).then(|| sum / count as f32)
}

/// Result of moving one dot, not yet written back.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Motion {
    pub position: Vec2,
    pub velocity: Vec2,
    /// Angle of `old_velocity - new_velocity`, the rotation handed to the renderer.
    pub heading: f32,
}

impl Motion {
    pub fn commit(&self, dot: &mut Dot) {
        dot.position = self.position;
        dot.velocity = self.velocity;
    }

    pub fn transform(&self) -> RenderTransform {
        RenderTransform { position: self.position, rotation: self.heading }
    }
}

/// Scans every other dot once, in index order, and accumulates the neighbour sums
/// for `dots[index]`.
///
/// The scan stops as soon as more than `max_neighbor_count` crowding neighbours have
/// been counted. Cohesion and avoidance sums keep whatever was gathered up to that point.
pub fn scan_neighbors(index: usize, dots: &[Dot], params: &SimParams) -> NeighborSums {
    let dot = &dots[index];
    let mut sums = NeighborSums::seeded(dot.velocity);
    let mut remaining = params.max_neighbor_count as i64;

    for (other_idx, other) in dots.iter().enumerate() {
        if other_idx == index {
            continue;
        }
        if remaining < 0 {
            break;
        }
        sums.scanned += 1;

        let dist_sq = dot.position.distance_squared(other.position);
        let same_group = dot.same_group(other);

        if dist_sq < params.cohesion_distance {
            if same_group {
                sums.cohesion_sum += other.position;
                sums.cohesion_count += 1;
                sums.velocity_alignment += other.velocity;
            } else {
                sums.avoidance_sum += other.position;
                sums.avoidance_count += 1;
            }
        }

        let crowding_limit = if same_group {
            params.crowding_distance
        } else {
            params.avoid_groups_distance
        };
        if dist_sq < crowding_limit {
            sums.crowding_sum += other.position;
            sums.crowding_count += 1;
            remaining -= 1;
        }
    }

    sums
}

/// Blends jitter, cohesion, alignment, crowding and group avoidance into one
/// acceleration. The result is not normalized.
pub fn steering_acceleration(dot: &Dot, sums: &NeighborSums, jitter: Vec2) -> Vec2 {
    let personality = &dot.personality;
    let mut acceleration = jitter;

    if let Some(center) = sums.cohesion_centroid() {
        acceleration += (center - dot.position).normalize_or_zero() * personality.love_for_others;
        acceleration += sums.velocity_alignment.normalize_or_zero() * personality.love_for_others;
    }

    if let Some(center) = sums.crowding_centroid() {
        acceleration -= (center - dot.position).normalize_or_zero() * personality.loathe_for_others;
    }

    if let Some(center) = sums.avoidance_centroid() {
        acceleration -= (center - dot.position).normalize_or_zero() * personality.group_aversion;
    }

    acceleration
}

/// Applies a steering acceleration to a dot: unit acceleration, speed pinned to
/// `max_speed`, position advanced and wrapped.
///
/// If `velocity + acceleration` is exactly zero the new velocity is zero and the
/// dot stays where it is.
pub fn integrate(dot: &Dot, acceleration: Vec2, world: World, wrap: WrapMode) -> Motion {
    let acceleration = acceleration.normalize_or_zero();
    let velocity = (dot.velocity + acceleration).normalize_or_zero() * dot.max_speed();
    let position = world.wrap(dot.position + velocity, wrap);
    let heading = (dot.velocity - velocity).angle();

    Motion { position, velocity, heading }
}

/// Random unit vector from an independent `[-1, 1]` draw per axis.
pub fn random_jitter<R: Rng>(rng: &mut R) -> Vec2 {
    let x = rng.random_range(-1.0f32..=1.0);
    let y = rng.random_range(-1.0f32..=1.0);
    Vec2::new(x, y).normalize_or_zero()
}

/// Draws one jitter vector per dot, in index order.
pub fn draw_jitters<R: Rng>(rng: &mut R, count: usize) -> Vec<Vec2> {
    (0..count).map(|_| random_jitter(rng)).collect()
}

/// Computes the motion of `dots[index]` against the given view of all dots.
pub fn advance_dot(index: usize, dots: &[Dot], jitter: Vec2, params: &SimParams, world: World) -> Motion {
    let sums = scan_neighbors(index, dots, params);
    let acceleration = steering_acceleration(&dots[index], &sums, jitter);
    integrate(&dots[index], acceleration, world, params.wrap_mode)
}

/// Advances a whole population by one frame.
#[derive(Debug, Clone)]
pub struct StepEngine {
    params: SimParams,
}

impl StepEngine {
    pub fn new(params: SimParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &SimParams {
        &self.params
    }

    /// Moves every dot once, drawing its jitter from `rng`, and reports each dot's
    /// new position and heading to `sink`.
    pub fn step<R, S>(&self, dots: &mut [Dot], world: World, rng: &mut R, sink: &mut S)
    where
        R: Rng,
        S: RenderSink + ?Sized,
    {
        let jitters = draw_jitters(rng, dots.len());
        self.apply(dots, world, &jitters, sink);
    }

    /// Same as [`StepEngine::step`] with caller-provided jitter, one vector per dot.
    /// Missing entries count as zero jitter.
    pub fn apply<S>(&self, dots: &mut [Dot], world: World, jitters: &[Vec2], sink: &mut S)
    where
        S: RenderSink + ?Sized,
    {
        let jitter_at = |idx: usize| jitters.get(idx).copied().unwrap_or_default();

        match self.params.visibility {
            Visibility::Sequential => {
                for idx in 0..dots.len() {
                    let motion = advance_dot(idx, dots, jitter_at(idx), &self.params, world);
                    motion.commit(&mut dots[idx]);
                    sink.place(dots[idx].id, motion.transform());
                }
            }
            Visibility::Snapshot => {
                let before: &[Dot] = &*dots;
                let motions: Vec<Motion> = (0..before.len())
                    .into_par_iter()
                    .map(|idx| advance_dot(idx, before, jitter_at(idx), &self.params, world))
                    .collect();

                for (dot, motion) in dots.iter_mut().zip(motions) {
                    motion.commit(dot);
                    sink.place(dot.id, motion.transform());
                }
            }
        }

        trace!("Stepped {} dots ({:?} visibility).", dots.len(), self.params.visibility);
    }
}
