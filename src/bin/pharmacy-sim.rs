use std::error::Error;
use std::fs::File;
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use pharmacy_des::pharmacy::{
    batch::{self, StockOverride},
    Experiment, PharmacyConfig, ReplicationMetrics, ReplicationTable, DEFAULT_REPLICATIONS, DEFAULT_WARMUP,
};

#[derive(Debug, Parser)]
#[command(author, version, about = "Discrete-event simulation of a pharmacy")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Replicate a single configuration and print each replication and the means.
    Run {
        #[arg(long, default_value_t = 3)]
        counters: usize,
        /// Customers per minute.
        #[arg(long, default_value_t = 1.6)]
        arrival_rate: f64,
        /// Probability a customer buys prescription medicine.
        #[arg(long, default_value_t = 0.6)]
        prescription_p: f64,
        #[arg(long, default_value_t = 42)]
        seed: u64,
        #[command(flatten)]
        run: RunLength,
        /// Also write the replication table to this CSV file.
        #[arg(long, value_name = "FILE")]
        output: Option<PathBuf>,
    },
    /// Run every experiment of a batch file and print the batch summary.
    Batch {
        #[arg(value_name = "FILE")]
        file: PathBuf,
        #[command(flatten)]
        run: RunLength,
        /// Initial and maximum stock for every experiment.
        #[arg(long)]
        stock: Option<u32>,
        /// Restock threshold for every experiment, as a percentage of the maximum stock.
        #[arg(long, value_name = "PERCENT")]
        threshold_pct: Option<f64>,
    },
    /// Write the example batch file to stdout.
    Template,
}

#[derive(Debug, Args)]
struct RunLength {
    #[arg(long, default_value_t = DEFAULT_REPLICATIONS as u64)]
    reps: u64,
    /// Warmup in minutes.
    #[arg(long, default_value_t = DEFAULT_WARMUP)]
    warmup: f64,
    /// Collection period after warmup, in hours.
    #[arg(long, default_value_t = 24.0)]
    hours: f64,
}

impl RunLength {
    fn horizon(&self) -> f64 {
        self.hours * 60.0
    }
}

fn replicate(experiment: &Experiment, run: &RunLength) -> Result<ReplicationTable, Box<dyn Error>> {
    #[cfg(feature = "parallel")]
    let table = experiment.run_replications_parallel(run.reps, run.warmup, run.horizon())?;
    #[cfg(not(feature = "parallel"))]
    let table = experiment.run_replications(run.reps, run.warmup, run.horizon())?;
    Ok(table)
}

fn print_metrics(label: &str, metrics: &ReplicationMetrics) {
    let fields: Vec<String> = ReplicationMetrics::METRICS
        .iter()
        .zip(metrics.values())
        .map(|(info, value)| format!("{}: {value:.2} {}", info.name, info.units))
        .collect();
    println!("{label:>12}  {}", fields.join("  "));
}

fn execute(command: Command) -> Result<(), Box<dyn Error>> {
    match command {
        Command::Run {
            counters,
            arrival_rate,
            prescription_p,
            seed,
            run,
            output,
        } => {
            let config = PharmacyConfig::default()
                .with_seed(seed)
                .with_counters(counters)
                .with_arrival_rate(arrival_rate)
                .with_prescription_probability(prescription_p);
            let experiment = Experiment::new(config)?;
            let table = replicate(&experiment, &run)?;

            for row in table.rows() {
                print_metrics(&format!("rep {}", row.replication), &row.metrics);
            }
            print_metrics("mean", &table.means());
            print_metrics("std dev", &table.std_devs());

            if let Some(path) = output {
                table.write_csv(File::create(&path)?)?;
                info!(path = %path.display(), "replication table written");
            }
        },
        Command::Batch {
            file,
            run,
            stock,
            threshold_pct,
        } => {
            let experiments = batch::read_experiments(File::open(&file)?)?;
            let experiments = batch::override_stock(
                experiments,
                StockOverride {
                    stock,
                    threshold_percent: threshold_pct,
                },
            )?;
            info!(experiments = experiments.len(), file = %file.display(), "batch loaded");
            let tables = batch::run_batch(&experiments, run.reps, run.warmup, run.horizon())?;
            batch::summarize(&tables).write_csv(io::stdout().lock())?;
        },
        Command::Template => batch::write_template(io::stdout().lock())?,
    }
    Ok(())
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    match execute(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err}");
            ExitCode::FAILURE
        },
    }
}
