use anyhow::Result;
use clap::Parser;
use colony_common::{ColonyConfig, RunConfig, Snapshot};
use colony_engine::ColonySimulation;
use log::{debug, error, info, trace, warn};
use std::fs::File;
use std::io::Write;
use std::path::PathBuf;
use std::time::Instant;

#[derive(Parser, Debug)]
#[command(author, version, about = "Runs a bacterial colony lattice simulation", long_about = None)]
struct Args {
    /// Colony parameter file (`key: value` lines)
    #[arg(short, long, default_value = "colony.txt")]
    params: PathBuf,

    /// Run settings (TOML with [timing] and [output] tables)
    #[arg(short, long, default_value = "run.toml")]
    run: PathBuf,

    /// Fixed RNG seed, overriding any seed in the parameter file
    #[arg(short, long)]
    seed: Option<u64>,

    /// Override the number of ticks to simulate
    #[arg(short = 'n', long)]
    steps: Option<u64>,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    info!("Starting colony simulation...");

    // --- Load Configuration ---
    let mut colony_config = match ColonyConfig::load(&args.params) {
        Ok(config) => config,
        Err(e) => {
            warn!("{}. Continuing with default colony parameters.", e);
            ColonyConfig::default()
        }
    };
    if args.seed.is_some() {
        colony_config.seed = args.seed;
    }

    let mut run_config = if args.run.exists() {
        RunConfig::load(&args.run)?
    } else {
        warn!("Run settings '{}' not found. Using defaults.", args.run.display());
        RunConfig::default()
    };
    if let Some(steps) = args.steps {
        run_config.timing.total_steps = steps;
    }

    info!("Using {} Rayon threads.", rayon::current_num_threads());

    // --- Initialize Simulation ---
    let mut sim = ColonySimulation::new(colony_config)?;
    sim.set_save_fields_in_snapshot(run_config.output.save_fields_in_snapshot);
    debug!("Simulation Parameters: {:#?}", sim.params());

    let total_steps = run_config.timing.total_steps;
    let record_interval_steps = run_config.timing.record_interval_steps.max(1);
    info!(
        "Running {} ticks, recording every {} ticks.",
        total_steps, record_interval_steps
    );

    // --- Initial Snapshot (tick 0) ---
    sim.record_snapshot();

    let start_time = Instant::now();
    for step in 1..=total_steps {
        let step_start_time = Instant::now();
        let outcome = sim.step();
        let step_duration = step_start_time.elapsed();

        if step % record_interval_steps == 0 || step == total_steps {
            sim.record_snapshot();
            info!(
                "Tick [{}/{}] | Alive: {} | Births: {} | Deaths: {} | Step Time: {:6.2} ms",
                step,
                total_steps,
                sim.alive_count(),
                outcome.births,
                outcome.deaths,
                step_duration.as_secs_f64() * 1000.0
            );
        } else {
            trace!(
                "Tick [{}/{}] completed in {:.2} ms",
                step,
                total_steps,
                step_duration.as_secs_f64() * 1000.0
            );
        }
    }

    info!(
        "Simulation finished in {:.3} seconds.",
        start_time.elapsed().as_secs_f64()
    );

    // --- Save Recorded Data ---
    let base = &run_config.output.base_filename;
    if run_config.output.save_stats {
        let format = run_config.output.format.as_deref().unwrap_or("json");
        if let Err(e) = save_snapshots(sim.get_recorded_snapshots(), base, format) {
            error!("Error saving snapshots: {:#}", e);
        }
    } else {
        info!("Skipping saving snapshots as per config (save_stats is false).");
    }

    if run_config.output.save_final_lattice {
        let filename = format!("{}_final_lattice.csv", base);
        match save_final_lattice(&sim, &filename) {
            Ok(()) => info!("Final lattice saved to {}", filename),
            Err(e) => error!("Error saving CSV file '{}': {:#}", filename, e),
        }
    } else {
        info!("Skipping saving final lattice as per config.");
    }

    info!("Simulation Complete.");
    Ok(())
}

fn save_snapshots(snapshots: &[Snapshot], base: &str, format: &str) -> Result<()> {
    match format {
        "bincode" => {
            let filename = format!("{}_snapshots.bin", base);
            let file = File::create(&filename)?;
            bincode::serialize_into(file, snapshots)?;
            info!("All snapshots saved to {} (binary format)", filename);
        }
        "messagepack" => {
            let filename = format!("{}_snapshots.msgpack", base);
            let mut file = File::create(&filename)?;
            rmp_serde::encode::write(&mut file, snapshots)?;
            info!("All snapshots saved to {} (MessagePack format)", filename);
        }
        other => {
            if other != "json" {
                error!("Unknown output format: {}. Using JSON instead.", other);
            }
            let filename = format!("{}_snapshots.json", base);
            let json_string = serde_json::to_string(snapshots)?;
            File::create(&filename)?.write_all(json_string.as_bytes())?;
            info!("All snapshots saved to {}", filename);
        }
    }
    Ok(())
}

fn save_final_lattice(sim: &ColonySimulation, filename: &str) -> Result<()> {
    let mut writer = csv::Writer::from_path(filename)?;
    writer.write_record(["x", "y", "state", "nutrient"])?;
    for y in 0..sim.height() {
        for x in 0..sim.width() {
            let index = sim.index_of(x, y);
            writer.write_record(&[
                x.to_string(),
                y.to_string(),
                sim.get_cell(x, y).code().to_string(),
                format!("{:.4}", sim.get_nutrient(index)),
            ])?;
        }
    }
    writer.flush()?;
    Ok(())
}
