use approx::assert_relative_eq;
use dot_swarm::engine::{integrate, scan_neighbors, steering_acceleration};
use dot_swarm::population::spawn_dots;
use dot_swarm::{RenderRegistry, RenderTransform, StepEngine};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rstest::rstest;
use swarm_common::{
    Dot, DotId, DotIdAllocator, Group, Personality, PopulationConfig, Range, SimParams, Vec2, Visibility, World,
    WrapMode,
};

fn personality(max_speed: f32, group_aversion: f32) -> Personality {
    Personality { max_speed, love_for_others: 3.0, loathe_for_others: 4.0, group_aversion }
}

fn dot(id: u64, group: Group, position: (f32, f32), velocity: (f32, f32)) -> Dot {
    Dot::new(
        DotId(id),
        group,
        Vec2::new(position.0, position.1),
        Vec2::new(velocity.0, velocity.1),
        personality(2.0, 5.0),
    )
}

fn crowded_population(seed: u64) -> (World, Vec<Dot>) {
    let world = World::new(240.0, 180.0);
    let config = PopulationConfig {
        dot_count: 400,
        seed,
        max_speed: Range(1.0, 3.0),
        love_for_others: Range(1.0, 5.0),
        loathe_for_others: Range(1.0, 7.0),
        group_aversion: Range(1.0, 7.0),
    };
    let dots = spawn_dots(&config, world, &mut DotIdAllocator::new(), &mut StdRng::seed_from_u64(seed)).expect("spawn");
    (world, dots)
}

#[rstest]
#[case(Visibility::Sequential, WrapMode::Single)]
#[case(Visibility::Snapshot, WrapMode::Single)]
#[case(Visibility::Sequential, WrapMode::Modulo)]
fn speed_and_bounds_hold_after_every_step(#[case] visibility: Visibility, #[case] wrap_mode: WrapMode) {
    let (world, mut dots) = crowded_population(17);
    let engine = StepEngine::new(SimParams { visibility, wrap_mode, ..SimParams::default() });
    let mut rng = StdRng::seed_from_u64(99);

    for _ in 0..10 {
        engine.step(&mut dots, world, &mut rng, &mut ());
        for dot in &dots {
            assert_relative_eq!(dot.velocity.length(), dot.personality.max_speed, epsilon = 1e-4);
            assert!(world.contains(dot.position), "{} left the world at {:?}", dot.id, dot.position);
        }
    }
}

#[test]
fn lone_dot_moves_on_jitter_alone() {
    let world = World::new(400.0, 400.0);
    let start = Vec2::new(200.0, 200.0);
    let mut dots = vec![dot(0, Group::A, (200.0, 200.0), (1.0, 0.0))];
    let engine = StepEngine::new(SimParams::default());

    let sums = scan_neighbors(0, &dots, engine.params());
    assert_eq!((sums.cohesion_count, sums.crowding_count, sums.avoidance_count), (0, 0, 0));

    engine.step(&mut dots, world, &mut StdRng::seed_from_u64(4), &mut ());

    assert_relative_eq!(dots[0].velocity.length(), 2.0, epsilon = 1e-5);
    assert_relative_eq!(dots[0].position.distance_squared(start).sqrt(), 2.0, epsilon = 1e-4);
}

#[test]
fn same_group_neighbour_pulls_the_dot_toward_it() {
    let world = World::new(400.0, 400.0);
    let engine = StepEngine::new(SimParams::default());
    let no_jitter = [Vec2::zero(), Vec2::zero()];

    // 30 units away: inside the cohesion radius, outside the crowding radius.
    let mut together = vec![dot(0, Group::A, (200.0, 200.0), (1.0, 0.0)), dot(1, Group::A, (200.0, 230.0), (1.0, 0.0))];
    let mut apart = vec![dot(0, Group::A, (200.0, 200.0), (1.0, 0.0)), dot(1, Group::A, (200.0, 390.0), (1.0, 0.0))];
    engine.apply(&mut together, world, &no_jitter, &mut ());
    engine.apply(&mut apart, world, &no_jitter, &mut ());

    assert!(together[0].position.y > apart[0].position.y);
    assert!(together[0].position.distance_squared(Vec2::new(200.0, 230.0)) < 30.0 * 30.0);
}

#[rstest]
#[case(1.5)]
#[case(6.0)]
fn other_group_pushes_the_dot_away_scaled_by_aversion(#[case] aversion: f32) {
    // 50 units away: group avoidance only, no crowding.
    let mut me = dot(0, Group::A, (200.0, 200.0), (1.0, 0.5));
    me.personality.group_aversion = aversion;
    let dots = vec![me, dot(1, Group::C, (200.0, 250.0), (0.0, -1.0))];

    let sums = scan_neighbors(0, &dots, &SimParams::default());
    assert_eq!((sums.avoidance_count, sums.crowding_count), (1, 0));

    let steering = steering_acceleration(&dots[0], &sums, Vec2::zero());
    assert_relative_eq!(steering.length(), aversion, epsilon = 1e-5);
    assert!(steering.y < 0.0);

    let motion = integrate(&dots[0], steering, World::new(400.0, 400.0), WrapMode::Single);
    assert!(motion.velocity.normalize_or_zero().y < dots[0].velocity.normalize_or_zero().y);
}

#[rstest]
#[case(0)]
#[case(1)]
#[case(5)]
#[case(40)]
fn neighbours_beyond_the_bound_do_not_change_acceleration(#[case] extra: u64) {
    let params = SimParams::default();
    let mut dots = vec![dot(0, Group::B, (100.0, 100.0), (0.0, 1.0))];
    let bound = params.max_neighbor_count as u64 + 1;
    for k in 1..=bound {
        dots.push(dot(k, Group::B, (100.0 + 0.2 * k as f32, 100.5), (1.0, 0.0)));
    }
    let baseline = steering_acceleration(&dots[0], &scan_neighbors(0, &dots, &params), Vec2::zero());

    for k in 0..extra {
        dots.push(dot(bound + 1 + k, Group::B, (100.0 + 0.2 * (k % bound + 1) as f32, 100.5), (1.0, 0.0)));
    }
    let sums = scan_neighbors(0, &dots, &params);

    assert_eq!(sums.crowding_count as u64, bound);
    assert_eq!(steering_acceleration(&dots[0], &sums, Vec2::zero()), baseline);
}

#[test]
fn crossing_the_right_edge_wraps_to_the_left() {
    let mut fast = dot(0, Group::A, (799.0, 300.0), (1.0, 0.0));
    fast.personality.max_speed = 6.0;

    let motion = integrate(&fast, Vec2::new(1.0, 0.0), World::new(800.0, 600.0), WrapMode::Single);

    assert_relative_eq!(motion.velocity.x, 6.0);
    assert_relative_eq!(motion.position.x, 5.0, epsilon = 1e-4);
    assert_relative_eq!(motion.position.y, 300.0);
}

#[test]
fn reported_heading_is_the_velocity_change_angle() {
    let world = World::new(400.0, 400.0);
    let before = vec![dot(0, Group::A, (200.0, 200.0), (1.0, 0.0))];
    let mut dots = before.clone();
    let mut registry = RenderRegistry::new();
    registry.register(DotId(0), RenderTransform::default());

    StepEngine::new(SimParams::default()).apply(&mut dots, world, &[Vec2::new(0.0, 1.0)], &mut registry);

    let transform = registry.get(DotId(0)).expect("registered");
    let expected = (before[0].velocity - dots[0].velocity).angle();
    assert_relative_eq!(transform.rotation, expected);
    assert_eq!(transform.position, dots[0].position);
}

#[test]
fn same_seed_gives_the_same_step() {
    let (world, start) = crowded_population(5);
    let engine = StepEngine::new(SimParams::default());

    let mut a = start.clone();
    let mut b = start;
    engine.step(&mut a, world, &mut StdRng::seed_from_u64(8), &mut ());
    engine.step(&mut b, world, &mut StdRng::seed_from_u64(8), &mut ());

    assert_eq!(a, b);
}
