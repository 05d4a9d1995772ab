use std::path::{Path, PathBuf};
use std::sync::atomic::Ordering;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::{info, warn};

use rawbase::profile::{audit_line, render_pp3};
use rawbase::{init_logging, load_config, BatchScheduler, ParameterSampler};

#[derive(Parser)]
#[command(name = "rawbase")]
#[command(version, about = "Develop RAW collections into a JPEG corpus with recorded settings")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Prepare the output tree and develop every selected RAW file
    Run {
        /// Configuration file (JSON)
        #[arg(short, long)]
        config: PathBuf,

        /// Remove previous outputs and the audit log first
        #[arg(long)]
        clean: bool,

        /// Number of worker threads (defaults to the configured value)
        #[arg(short, long)]
        workers: Option<usize>,
    },
    /// Print the development profile that would be drawn for each image name
    Sample {
        #[arg(short, long)]
        config: PathBuf,

        /// Image base names, e.g. img001 or img001_3
        #[arg(required = true)]
        names: Vec<String>,
    },
    /// Validate a configuration file
    CheckConfig {
        #[arg(short, long)]
        config: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging("rawbase=info");

    match cli.command {
        Commands::Run {
            config,
            clean,
            workers,
        } => run_batch(&config, clean, workers),
        Commands::Sample { config, names } => run_sample(&config, &names),
        Commands::CheckConfig { config } => {
            load_config(&config)
                .with_context(|| format!("invalid configuration {}", config.display()))?;
            println!("{}: ok", config.display());
            Ok(())
        }
    }
}

fn run_batch(path: &Path, clean: bool, workers: Option<usize>) -> anyhow::Result<()> {
    let config =
        load_config(path).with_context(|| format!("invalid configuration {}", path.display()))?;

    let mut scheduler =
        BatchScheduler::from_config(&config, clean).context("failed to prepare the batch")?;
    if let Some(count) = workers {
        scheduler = scheduler.with_worker_count(count);
    }

    let shutdown = scheduler.shutdown_handle();
    ctrlc::set_handler(move || {
        warn!("Interrupt received, finishing running jobs");
        shutdown.store(true, Ordering::Relaxed);
    })
    .context("failed to install the interrupt handler")?;

    info!(
        "Developing {} collection(s) with {} worker(s)",
        config.paths.collections.len(),
        scheduler.worker_count()
    );
    let report = scheduler.run()?;

    println!("{}", report);
    for failure in &report.failures {
        if let rawbase::JobOutcome::Failed { stage, error } = &failure.outcome {
            println!("  {} [{}]: {}", failure.base_name, stage, error);
        }
    }
    Ok(())
}

fn run_sample(path: &Path, names: &[String]) -> anyhow::Result<()> {
    let config =
        load_config(path).with_context(|| format!("invalid configuration {}", path.display()))?;
    let sampler = ParameterSampler::new(&config.development)?;

    for name in names {
        let profile = sampler
            .sample(name)
            .with_context(|| format!("failed to sample {}", name))?;
        println!("# {}", name);
        print!("{}", render_pp3(&profile));
        print!("{}", audit_line(&profile.realize(0.0)));
        println!();
    }
    Ok(())
}
