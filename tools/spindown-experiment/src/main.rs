use std::error::Error;
use std::fs::File;
use std::io::Write;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use env_logger::Builder;
use log::info;

use dslab_spindown::config::ExperimentConfig;
use dslab_spindown::parallel::{parallel_experiment_default, write_csv, ExperimentResult, ResultRow};
use dslab_spindown::synthetic::{generate_synthetic_workload, SyntheticWorkloadConfig};

#[derive(Parser, Debug)]
#[command(about, long_about = None)]
/// Evaluates spin-down policies of storage devices on workload traces
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Runs every policy on every (device, workload) pair of a YAML experiment config
    Run {
        /// Path to YAML file with experiment configuration
        config: PathBuf,

        /// Number of threads to use (overrides the config)
        #[arg(short, long)]
        workers: Option<usize>,

        /// Path to produced CSV file with experiment results
        #[arg(long)]
        csv: Option<PathBuf>,

        /// Path to produced JSON file with experiment results
        #[arg(long)]
        json: Option<PathBuf>,
    },
    /// Generates a synthetic workload trace and saves it as JSON
    Generate {
        /// Path to produced trace
        output: PathBuf,

        /// Number of idle/busy interval pairs
        #[arg(long, default_value_t = 1000)]
        intervals: usize,

        /// Mean length of a short idle interval, ms
        #[arg(long, default_value_t = 2000.)]
        mean_idle: f64,

        /// Mean length of a long idle interval, ms
        #[arg(long, default_value_t = 60000.)]
        long_idle_mean: f64,

        /// Probability of a long idle interval
        #[arg(long, default_value_t = 0.2)]
        long_idle_prob: f64,

        /// Mean length of a busy interval, ms
        #[arg(long, default_value_t = 500.)]
        mean_busy: f64,

        /// Random seed
        #[arg(long, default_value_t = 123)]
        seed: u64,
    },
}

fn print_table(results: &[ExperimentResult]) {
    println!(
        "{:<12} {:<16} {:<48} {:>12} {:>12} {:>10} {:>10}",
        "device", "workload", "policy", "energy, Wh", "avg wait, s", "shutdowns", "wake-ups"
    );
    for result in results {
        match &result.outcome {
            Ok(stats) => println!(
                "{:<12} {:<16} {:<48} {:>12.4} {:>12} {:>10} {:>10}",
                result.device,
                result.workload,
                result.policy,
                stats.energy_wh(),
                stats
                    .average_wait_seconds()
                    .map_or_else(|| "-".to_string(), |w| format!("{:.4}", w)),
                stats.shutdowns,
                stats.wakeups
            ),
            Err(e) => println!(
                "{:<12} {:<16} {:<48} no result: {}",
                result.device, result.workload, result.policy, e
            ),
        }
    }
}

fn run(
    config_path: PathBuf,
    workers: Option<usize>,
    csv: Option<PathBuf>,
    json: Option<PathBuf>,
) -> Result<(), Box<dyn Error>> {
    let mut config = ExperimentConfig::from_yaml(&config_path)?;
    if workers == Some(0) {
        return Err("workers must be positive".into());
    }
    if workers.is_some() {
        config.workers = workers;
    }
    let base_dir = config_path.parent().map(|p| p.to_path_buf()).unwrap_or_default();
    let results = parallel_experiment_default(&config, &base_dir)?;
    print_table(&results);
    if let Some(path) = csv {
        write_csv(&results, File::create(&path)?)?;
        info!("results saved to {}", path.display());
    }
    if let Some(path) = json {
        let rows: Vec<ResultRow> = results.iter().map(|r| r.row()).collect();
        File::create(&path)?.write_all(serde_json::to_string_pretty(&rows)?.as_bytes())?;
        info!("results saved to {}", path.display());
    }
    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    Builder::from_default_env()
        .format(|buf, record| writeln!(buf, "{}", record.args()))
        .init();

    match Args::parse().command {
        Command::Run {
            config,
            workers,
            csv,
            json,
        } => run(config, workers, csv, json),
        Command::Generate {
            output,
            intervals,
            mean_idle,
            long_idle_mean,
            long_idle_prob,
            mean_busy,
            seed,
        } => {
            let workload = generate_synthetic_workload(&SyntheticWorkloadConfig {
                intervals,
                mean_idle,
                long_idle_mean,
                long_idle_prob,
                mean_busy,
                seed,
            })?;
            workload.save_json(&output)?;
            info!(
                "{} intervals with {} requests saved to {}",
                workload.len(),
                workload.request_count(),
                output.display()
            );
            Ok(())
        }
    }
}
