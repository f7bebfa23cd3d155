use anyhow::Result;
use clap::Parser;
use log::{debug, info, trace, warn};
use std::path::PathBuf;
use std::time::Instant;

use dot_swarm::output::{save_final_positions, save_snapshots};
use dot_swarm::DotSimulation;
use swarm_common::SimulationConfig;

/// Runs the dot swarm headless and writes snapshots for the visualizer.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the simulation config
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Override the configured number of steps
    #[arg(long)]
    steps: Option<u32>,
}

fn main() -> Result<()> {
    // Initialize the logger
    env_logger::init();
    let args = Args::parse();

    info!("Starting Dot Swarm...");

    // --- Load Configuration ---
    let mut config = SimulationConfig::load(&args.config)?;
    if let Some(steps) = args.steps {
        config.timing.total_steps = steps;
    }

    info!("Using {} Rayon threads.", rayon::current_num_threads());

    // --- Initialize Simulation ---
    let mut sim = DotSimulation::new(config)?;
    debug!("Simulation Parameters: {:#?}", sim.params());

    // --- Simulation Loop ---
    let total_steps = sim.config().timing.total_steps;
    let mut record_interval_steps = sim.config().timing.record_interval_steps;
    if record_interval_steps == 0 {
        warn!("Record interval is 0 steps. Recording every step.");
        record_interval_steps = 1;
    }
    info!("Recording snapshot every {} steps.", record_interval_steps);
    info!("Starting simulation loop for {} steps...", total_steps);

    let start_time = Instant::now();
    let mut previous_print_time = start_time;

    sim.record_snapshot();

    for step in 0..total_steps {
        let step_start_time = Instant::now();
        sim.step();
        let step_duration = step_start_time.elapsed();

        let current_time = Instant::now();
        let should_print_status = current_time.duration_since(previous_print_time).as_secs_f64() >= 5.0;
        let is_record_step = (step + 1) % record_interval_steps == 0;
        let is_last_step = step == total_steps - 1;

        if is_record_step || is_last_step {
            sim.record_snapshot();
        }

        if should_print_status || is_last_step {
            info!(
                "Step [{}/{}] | Dots: {} | Step Time: {:6.2} ms | Elapsed: {:.2} s",
                step + 1,
                total_steps,
                sim.current_dot_count(),
                step_duration.as_secs_f64() * 1000.0,
                start_time.elapsed().as_secs_f64()
            );
            previous_print_time = current_time;
        } else {
            trace!("Step [{}/{}] completed in {:.2} ms", step + 1, total_steps, step_duration.as_secs_f64() * 1000.0);
        }
    }

    info!("Simulation finished in {:.3} seconds.", start_time.elapsed().as_secs_f64());

    // --- Save Recorded Data ---
    let output = sim.config().output.clone();
    if output.save_stats {
        save_snapshots(sim.get_recorded_snapshots(), &output)?;
    } else {
        info!("Skipping saving snapshots as per config (save_stats is false).");
    }

    if output.save_final_positions {
        save_final_positions(sim.get_results(), &output.base_filename)?;
    } else {
        info!("Skipping saving final positions as per config.");
    }

    info!("Simulation Complete.");
    Ok(())
}
