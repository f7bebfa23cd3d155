use anyhow::Result;
use log::debug;
use rand::distr::Uniform;
use rand::prelude::*;
use swarm_common::{Dot, DotIdAllocator, Group, Personality, PopulationConfig, Range, Vec2, World};

/// Creates the initial population: random group, whole-unit position inside the
/// world, velocity drawn per axis from `[-1, 1)` and personality weights drawn
/// from the configured ranges.
pub fn spawn_dots<R: Rng>(
    config: &PopulationConfig,
    world: World,
    ids: &mut DotIdAllocator,
    rng: &mut R,
) -> Result<Vec<Dot>> {
    let unit = Uniform::new(0.0f32, 1.0f32)?;
    let velocity_dist = Uniform::new(-1.0f32, 1.0f32)?;
    let max_speed = range_dist(config.max_speed)?;
    let love = range_dist(config.love_for_others)?;
    let loathe = range_dist(config.loathe_for_others)?;
    let aversion = range_dist(config.group_aversion)?;

    let count = config.dot_count as usize;
    let mut dots = Vec::with_capacity(count);
    for _ in 0..count {
        let group = Group::ALL[rng.random_range(0..Group::ALL.len())];
        let x = (rng.sample(&unit) * world.width).floor() % world.width;
        let y = (rng.sample(&unit) * world.height).floor() % world.height;
        let velocity = Vec2::new(rng.sample(&velocity_dist), rng.sample(&velocity_dist));
        let personality = Personality {
            max_speed: rng.sample(&max_speed),
            love_for_others: rng.sample(&love),
            loathe_for_others: rng.sample(&loathe),
            group_aversion: rng.sample(&aversion),
        };

        dots.push(Dot::new(ids.next_id(), group, Vec2::new(x, y), velocity, personality));
    }

    debug!("Spawned {} dots in a {}x{} world.", dots.len(), world.width, world.height);
    Ok(dots)
}

fn range_dist(range: Range) -> Result<Uniform<f32>> {
    Ok(Uniform::new(range.min(), range.max())?)
}
