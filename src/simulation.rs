use crate::engine::{scan_neighbors, StepEngine};
use crate::population::spawn_dots;
use crate::render::{RenderRegistry, RenderTransform};
use anyhow::Result;
use log::{debug, info};
use rand::prelude::*;
use rayon::prelude::*;
use swarm_common::{Dot, DotFrame, DotIdAllocator, SimParams, SimulationConfig, Snapshot, Vec2};

/// Manages the dots, the step engine and the render registry across steps.
pub struct DotSimulation {
    /// The simulation configuration the run was started with.
    pub config: SimulationConfig,
    params: SimParams,
    /// Every dot, in the fixed order neighbour scans use.
    dots: Vec<Dot>,
    /// Host-side RNG for spawning and per-step jitter.
    pub rng: StdRng,
    engine: StepEngine,
    /// Per-dot render transforms, keyed by id.
    registry: RenderRegistry,
    /// Number of steps completed so far.
    pub current_step: u32,
    /// Stores collected snapshots at record intervals.
    recorded_snapshots: Vec<Snapshot>,
}

impl DotSimulation {
    /// Creates a new `DotSimulation`, spawning the initial population from the config.
    pub fn new(config: SimulationConfig) -> Result<Self> {
        let mut rng = StdRng::seed_from_u64(config.population.seed);
        let params = config.get_sim_params();
        let mut ids = DotIdAllocator::new();
        let dots = spawn_dots(&config.population, params.world(), &mut ids, &mut rng)?;
        Ok(Self::with_rng(config, dots, rng))
    }

    /// Builds a simulation around an existing population.
    pub fn from_dots(config: SimulationConfig, dots: Vec<Dot>) -> Self {
        let rng = StdRng::seed_from_u64(config.population.seed);
        Self::with_rng(config, dots, rng)
    }

    fn with_rng(config: SimulationConfig, dots: Vec<Dot>, rng: StdRng) -> Self {
        let params = config.get_sim_params();
        let mut registry = RenderRegistry::new();
        for dot in &dots {
            registry.register(dot.id, RenderTransform { position: dot.position, rotation: 0.0 });
        }
        info!(
            "Simulation ready: {} dots, {:?} visibility, {:?} boundary.",
            dots.len(),
            params.visibility,
            params.wrap_mode
        );

        Self {
            config,
            engine: StepEngine::new(params.clone()),
            params,
            dots,
            rng,
            registry,
            current_step: 0,
            recorded_snapshots: Vec::new(),
        }
    }

    /// Advances every dot by one frame.
    pub fn step(&mut self) {
        let world = self.params.world();
        self.engine.step(&mut self.dots, world, &mut self.rng, &mut self.registry);
        self.current_step += 1;
    }

    /// Counts each dot's crowding neighbours in parallel, with the same early-exit bound the step uses.
    fn calculate_neighbor_counts_parallel(&self) -> Vec<u32> {
        (0..self.dots.len())
            .into_par_iter()
            .map(|idx| scan_neighbors(idx, &self.dots, &self.params).crowding_count)
            .collect()
    }

    /// Computes the metrics for the current state.
    pub fn build_snapshot(&self) -> Snapshot {
        let dot_count = self.dots.len();

        let mut group_counts = [0u32; 4];
        let mut speed_total = 0.0f32;
        let mut heading_total = Vec2::zero();
        for dot in &self.dots {
            group_counts[dot.group.index()] += 1;
            speed_total += dot.velocity.length();
            heading_total += dot.velocity.normalize_or_zero();
        }
        let (average_speed, polarization) = if dot_count > 0 {
            (speed_total / dot_count as f32, (heading_total / dot_count as f32).length())
        } else {
            (0.0, 0.0)
        };

        let bins = self.params.max_neighbor_count as usize + 2;
        let mut neighbor_counts_distribution = vec![0u32; bins];
        for count in self.calculate_neighbor_counts_parallel() {
            let bin = (count as usize).min(bins - 1);
            neighbor_counts_distribution[bin] += 1;
        }

        let dots = self.config.output.save_dots_in_snapshot.then(|| {
            self.dots
                .iter()
                .map(|dot| {
                    let transform = self.registry.get(dot.id).copied().unwrap_or(RenderTransform {
                        position: dot.position,
                        rotation: 0.0,
                    });
                    DotFrame {
                        id: dot.id,
                        group: dot.group,
                        x: transform.position.x,
                        y: transform.position.y,
                        heading: transform.rotation,
                    }
                })
                .collect::<Vec<_>>()
        });

        Snapshot {
            step: self.current_step,
            dot_count: dot_count as u32,
            group_counts,
            average_speed,
            polarization,
            neighbor_counts_distribution,
            dots,
        }
    }

    /// Records a snapshot of the current state.
    pub fn record_snapshot(&mut self) {
        let snapshot = self.build_snapshot();
        debug!(
            "Snapshot at step {}: avg speed {:.3}, polarization {:.3}, groups {:?}",
            snapshot.step, snapshot.average_speed, snapshot.polarization, snapshot.group_counts
        );
        self.recorded_snapshots.push(snapshot);
    }

    /// Provides access to the recorded snapshots.
    pub fn get_recorded_snapshots(&self) -> &[Snapshot] {
        &self.recorded_snapshots
    }

    /// Current state of every dot.
    pub fn get_results(&self) -> &[Dot] {
        &self.dots
    }

    pub fn current_dot_count(&self) -> usize {
        self.dots.len()
    }

    pub fn params(&self) -> &SimParams {
        &self.params
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn registry(&self) -> &RenderRegistry {
        &self.registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use swarm_common::{DotId, Group, Personality};

    fn config(dot_count: u32) -> SimulationConfig {
        let text = format!(
            r#"
            [world]
            width = 200.0
            height = 150.0

            [population]
            dot_count = {dot_count}
            seed = 21

            [timing]
            total_steps = 5
            record_interval_steps = 1

            [output]
            base_filename = "test"
            save_final_positions = false
            save_stats = false
            "#
        );
        SimulationConfig::from_toml_str(&text).expect("test config")
    }

    #[test]
    fn new_simulation_registers_a_visual_per_dot() {
        let sim = DotSimulation::new(config(120)).expect("sim");
        assert_eq!(sim.current_dot_count(), 120);
        assert_eq!(sim.registry().len(), 120);
    }

    #[test]
    fn stepping_updates_registry_transforms() {
        let mut sim = DotSimulation::new(config(60)).expect("sim");
        sim.step();
        assert_eq!(sim.current_step, 1);
        for dot in sim.get_results() {
            let transform = sim.registry().get(dot.id).expect("registered");
            assert_eq!(transform.position, dot.position);
        }
        assert_eq!(sim.registry().misses(), 0);
    }

    #[test]
    fn snapshot_metrics_cover_every_dot() {
        let mut sim = DotSimulation::new(config(80)).expect("sim");
        sim.step();
        sim.record_snapshot();

        let snapshot = &sim.get_recorded_snapshots()[0];
        assert_eq!(snapshot.step, 1);
        assert_eq!(snapshot.dot_count, 80);
        assert_eq!(snapshot.group_counts.iter().sum::<u32>(), 80);
        assert_eq!(snapshot.neighbor_counts_distribution.iter().sum::<u32>(), 80);
        assert_eq!(snapshot.neighbor_counts_distribution.len(), 22);
        assert!((0.0..=1.0 + 1e-5).contains(&snapshot.polarization));
        assert_eq!(snapshot.dots.as_ref().map(|d| d.len()), Some(80));
    }

    #[test]
    fn aligned_dots_have_full_polarization() {
        let personality = Personality { max_speed: 2.0, love_for_others: 1.0, loathe_for_others: 1.0, group_aversion: 1.0 };
        let dots = (0..3)
            .map(|k| Dot::new(DotId(k), Group::A, Vec2::new(10.0 + 50.0 * k as f32, 10.0), Vec2::new(2.0, 0.0), personality))
            .collect();
        let sim = DotSimulation::from_dots(config(3), dots);
        let snapshot = sim.build_snapshot();

        assert_relative_eq!(snapshot.polarization, 1.0, epsilon = 1e-6);
        assert_relative_eq!(snapshot.average_speed, 2.0, epsilon = 1e-6);
        assert_eq!(snapshot.group_counts, [3, 0, 0, 0]);
        assert_eq!(snapshot.neighbor_counts_distribution[0], 3);
    }
}
