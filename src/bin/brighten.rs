//! brighten - brightness adjustment and strategy timing harness
//!
//! Loads one image, writes an unmodified copy plus a brightened and a darkened
//! version, then times each execution strategy on a fresh load.

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use parallel_brightness::{EngineConfig, ImageProcessor, Strategy};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "brighten")]
#[command(author, version, about = "Adjust image brightness and compare execution strategies")]
#[command(long_about = "
Adjust image brightness with sequential and multi-threaded strategies.

Examples:
  brighten dog.jpg                        # copy, +70, -70, then time every strategy
  brighten dog.jpg --delta 40 -o out/     # write results to out/
  brighten dog.jpg --strategy pool -j 8   # time only the worker pool, 8 workers
")]
struct Cli {
    /// Input image
    input: PathBuf,

    /// Brightness delta applied to every component
    #[arg(short, long, default_value_t = 70, allow_negative_numbers = true)]
    delta: i32,

    /// Number of worker threads (0 = auto)
    #[arg(short = 'j', long)]
    threads: Option<usize>,

    /// Output directory (defaults to the input's directory)
    #[arg(short, long)]
    out_dir: Option<PathBuf>,

    /// Strategy to time
    #[arg(short, long, value_enum, default_value = "all")]
    strategy: StrategyChoice,

    /// Worker-pool drain timeout in milliseconds
    #[arg(long)]
    pool_timeout_ms: Option<u64>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum StrategyChoice {
    All,
    Sequential,
    Fixed,
    Pool,
    Rayon,
}

impl StrategyChoice {
    fn strategies(self) -> Vec<Strategy> {
        match self {
            StrategyChoice::All => Strategy::ALL.to_vec(),
            StrategyChoice::Sequential => vec![Strategy::Sequential],
            StrategyChoice::Fixed => vec![Strategy::FixedThreads],
            StrategyChoice::Pool => vec![Strategy::WorkerPool],
            StrategyChoice::Rayon => vec![Strategy::WorkStealing],
        }
    }
}

/// `<out_dir>/<stem>_<suffix>.<ext>`, keeping the input's extension.
fn output_path(out_dir: &Path, input: &Path, suffix: &str) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image".to_string());
    let ext = input
        .extension()
        .map(|e| e.to_string_lossy().into_owned())
        .filter(|e| !e.is_empty())
        .unwrap_or_else(|| "png".to_string());
    out_dir.join(format!("{stem}_{suffix}.{ext}"))
}

/// Delta that undoes `delta`; `i32::MIN` has no negation and saturates.
fn darken_delta(delta: i32) -> i32 {
    delta.saturating_neg()
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn save(processor: &ImageProcessor, path: &Path) -> Result<()> {
    processor
        .save_image(path)
        .with_context(|| format!("Failed to write {}", path.display()))
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut config = EngineConfig::from_env();
    if let Some(threads) = cli.threads {
        config = config.with_workers(threads);
    }
    if let Some(ms) = cli.pool_timeout_ms {
        config = config.with_pool_timeout(Duration::from_millis(ms));
    }
    let workers = config.resolved_workers();

    let out_dir = match &cli.out_dir {
        Some(dir) => dir.clone(),
        None => cli
            .input
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(".")),
    };
    std::fs::create_dir_all(&out_dir)
        .with_context(|| format!("Failed to create {}", out_dir.display()))?;

    let mut processor = ImageProcessor::with_config(config);
    let load = |processor: &mut ImageProcessor| -> Result<()> {
        processor
            .read_image(&cli.input)
            .with_context(|| format!("Failed to read {}", cli.input.display()))?;
        Ok(())
    };

    load(&mut processor)?;
    save(&processor, &output_path(&out_dir, &cli.input, "copy"))?;

    processor.adjust_brightness(cli.delta)?;
    save(&processor, &output_path(&out_dir, &cli.input, "brighter"))?;

    processor.adjust_brightness(darken_delta(cli.delta))?;
    save(&processor, &output_path(&out_dir, &cli.input, "darker"))?;

    info!(workers, "timing strategies");
    for strategy in cli.strategy.strategies() {
        load(&mut processor)?;
        let report = processor
            .adjust_brightness_parallel(cli.delta, strategy)
            .with_context(|| format!("{strategy} brightness adjustment failed"))?;
        println!(
            "{:<12} {:>10.3} ms  ({} threads, {} tasks, {} rows)",
            strategy.as_str(),
            report.elapsed_ms(),
            report.workers,
            report.tasks,
            report.rows
        );
        save(&processor, &output_path(&out_dir, &cli.input, strategy.as_str()))?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn darken_delta_negates() {
        assert_eq!(darken_delta(70), -70);
        assert_eq!(darken_delta(-70), 70);
        assert_eq!(darken_delta(0), 0);
    }

    #[test]
    fn darken_delta_saturates_at_min() {
        assert_eq!(darken_delta(i32::MIN), i32::MAX);
        assert_eq!(darken_delta(i32::MAX), -i32::MAX);
    }

    #[test]
    fn output_path_keeps_extension() {
        let path = output_path(Path::new("out"), Path::new("in/dog.jpg"), "darker");
        assert_eq!(path, Path::new("out").join("dog_darker.jpg"));
    }
}
