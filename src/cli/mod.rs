//! Command-line interface for episode-shuffle.

use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use log::{error, info, warn};
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::config::ColorizeConfig;
use crate::processors::colormap::ColorMap;
use crate::processors::interleave::{Interleaver, SourceDataset};
use crate::AppConfig;

#[derive(Parser)]
#[command(name = "episode-shuffle")]
#[command(about = "Merge and shuffle robot-demonstration datasets", version)]
pub struct Cli {
    /// Path to YAML config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Increase verbosity
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Interleave two datasets into one randomly ordered dataset
    Shuffle {
        /// Root of the first dataset
        #[arg(long)]
        source1: PathBuf,
        /// Root of the second dataset
        #[arg(long)]
        source2: PathBuf,
        /// Root of the merged dataset
        #[arg(long)]
        target: PathBuf,
        /// Metadata log (JSON lines) of the first dataset
        #[arg(long)]
        json1: PathBuf,
        /// Metadata log (JSON lines) of the second dataset
        #[arg(long)]
        json2: PathBuf,
        /// Shuffle seed [default: 42, or shuffle.seed from the config]
        #[arg(long)]
        seed: Option<u64>,
        /// Print the episode mapping without writing anything
        #[arg(long)]
        dry_run: bool,
    },

    /// Convert depth images to false-color images
    Colorize {
        /// Input depth PNG, or a directory of them with --batch
        input: PathBuf,
        /// Output PNG or directory
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Process every PNG in the input directory
        #[arg(long)]
        batch: bool,
        /// Lower depth bound in meters
        #[arg(long)]
        min_depth: Option<f32>,
        /// Upper depth bound in meters
        #[arg(long)]
        max_depth: Option<f32>,
        /// Meters per raw depth unit
        #[arg(long)]
        depth_scale: Option<f32>,
        /// Keep the configured bounds instead of per-frame percentiles
        #[arg(long)]
        no_auto_scale: bool,
        /// Percentile clipped from each end when auto scaling
        #[arg(long)]
        clip_percent: Option<f32>,
        /// Palette: jet, rainbow, hot, cool, viridis, plasma
        #[arg(long)]
        color_map: Option<String>,
    },
}

/// Create a spinner for indeterminate operations
fn create_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

/// Print a summary box
fn print_summary(title: &str, items: &[(&str, String)]) {
    println!();
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║ {:<62} ║", title);
    println!("╠══════════════════════════════════════════════════════════════╣");
    for (key, value) in items {
        let display_value = if value.chars().count() > 39 {
            format!("{}...", value.chars().take(36).collect::<String>())
        } else {
            value.clone()
        };
        println!("║ {:<20}: {:<39} ║", key, display_value);
    }
    println!("╚══════════════════════════════════════════════════════════════╝");
    println!();
}

pub fn run() {
    let cli = Cli::parse();

    // Initialize logging based on verbosity (must come first)
    env_logger::Builder::new()
        .filter_level(match cli.verbose {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            _ => log::LevelFilter::Debug,
        })
        .format_timestamp_secs()
        .init();

    // Load config
    let config = match &cli.config {
        Some(path) => match AppConfig::from_yaml(path) {
            Ok(cfg) => {
                info!("Loaded config from: {}", path.display());
                cfg
            }
            Err(e) => {
                warn!(
                    "Failed to load config from {}: {}, using defaults",
                    path.display(),
                    e
                );
                AppConfig::default()
            }
        },
        None => AppConfig::default(),
    };

    // Dispatch to subcommands
    match cli.command {
        Commands::Shuffle {
            source1,
            source2,
            target,
            json1,
            json2,
            seed,
            dry_run,
        } => {
            let mut config = config;
            if let Some(seed) = seed {
                config.shuffle.seed = seed;
            }
            cmd_shuffle(&source1, &source2, &target, &json1, &json2, dry_run, &config);
        }
        Commands::Colorize {
            input,
            output,
            batch,
            min_depth,
            max_depth,
            depth_scale,
            no_auto_scale,
            clip_percent,
            color_map,
        } => {
            let base = &config.colorize;
            let colorize_config = ColorizeConfig {
                min_depth: min_depth.unwrap_or(base.min_depth),
                max_depth: max_depth.unwrap_or(base.max_depth),
                depth_scale: depth_scale.unwrap_or(base.depth_scale),
                auto_scale: base.auto_scale && !no_auto_scale,
                clip_percent: clip_percent.unwrap_or(base.clip_percent),
                color_map: color_map
                    .as_deref()
                    .map(ColorMap::from_name_or_default)
                    .unwrap_or(base.color_map),
                ..base.clone()
            };
            cmd_colorize(&input, output, batch, &colorize_config);
        }
    }
}

fn cmd_shuffle(
    source1: &Path,
    source2: &Path,
    target: &Path,
    json1: &Path,
    json2: &Path,
    dry_run: bool,
    config: &AppConfig,
) {
    let start = Instant::now();
    let shuffle_config = &config.shuffle;

    if dry_run {
        println!("DRY RUN: No files will be written");
    }

    let load = |root: &Path, json: &Path| match SourceDataset::load(root, json, shuffle_config) {
        Ok(dataset) => dataset,
        Err(e) => {
            error!("Cannot load dataset {}: {}", root.display(), e);
            std::process::exit(1);
        }
    };
    let first = load(source1, json1);
    let second = load(source2, json2);

    let interleaver = Interleaver::new(&first, &second, target, shuffle_config);
    let order = interleaver.order();

    println!("Merging {} episodes (seed {})", order.len(), shuffle_config.seed);

    if dry_run {
        for warning in interleaver.alignment_warnings() {
            warn!("{}", warning);
        }
        let plan = interleaver.plan(&order);
        for episode in &plan {
            println!(
                "  episode_{:06} <- {} (index {}..{})",
                episode.new_index,
                episode.origin,
                episode.first_row,
                episode.first_row + episode.rows
            );
        }
        let missing_tables = plan.iter().filter(|p| p.table.is_none()).count();
        let total_rows: u64 = plan.iter().map(|p| p.rows).sum();

        print_summary(
            "Shuffle Plan",
            &[
                ("Target", target.display().to_string()),
                ("Episodes", plan.len().to_string()),
                ("Rows", total_rows.to_string()),
                ("Missing tables", missing_tables.to_string()),
                ("Seed", shuffle_config.seed.to_string()),
                ("Dry run", dry_run.to_string()),
                ("Duration", format!("{:.2?}", start.elapsed())),
            ],
        );
        return;
    }

    let spinner = create_spinner("Copying and reindexing episodes...");

    match interleaver.run_with_order(order) {
        Ok(report) => {
            spinner.finish_and_clear();

            print_summary(
                "Shuffle Complete",
                &[
                    ("Target", target.display().to_string()),
                    ("Episodes", report.episodes.len().to_string()),
                    ("Metadata records", report.metadata_records.to_string()),
                    ("Final row index", report.rows_written.to_string()),
                    ("Failed artifacts", report.failures.len().to_string()),
                    ("Seed", shuffle_config.seed.to_string()),
                    ("Metadata", report.metadata_path.display().to_string()),
                    ("Duration", format!("{:.2?}", start.elapsed())),
                ],
            );

            if !report.is_complete() {
                println!("Failed artifacts:");
                for failure in &report.failures {
                    println!("  - {}", failure);
                }
            }
        }
        Err(e) => {
            spinner.finish_and_clear();
            error!("Shuffle failed: {}", e);
            std::process::exit(1);
        }
    }
}

fn cmd_colorize(input: &Path, output: Option<PathBuf>, batch: bool, config: &ColorizeConfig) {
    use crate::processors::depth;

    let start = Instant::now();

    println!("Colorizing depth images...");
    println!("Input: {}", input.display());
    println!("Depth range: {} - {} m", config.min_depth, config.max_depth);
    println!(
        "Auto scale: {}, clip percent: {}%",
        config.auto_scale, config.clip_percent
    );
    println!("Color map: {}", config.color_map);

    if batch {
        let output_dir = output.unwrap_or_else(|| {
            let name = input
                .file_name()
                .map(|s| s.to_string_lossy().to_string())
                .unwrap_or_else(|| "depth".to_string());
            input.with_file_name(format!("{}_color", name))
        });

        let spinner = create_spinner("Colorizing frames...");
        let summary = depth::colorize_dir(input, &output_dir, config);
        spinner.finish_and_clear();

        print_summary(
            "Batch Colorize Complete",
            &[
                ("Input directory", input.display().to_string()),
                ("Output directory", output_dir.display().to_string()),
                ("Frames written", summary.written.len().to_string()),
                ("Frames failed", summary.failed.len().to_string()),
                ("Duration", format!("{:.2?}", start.elapsed())),
            ],
        );
    } else {
        let output_path = output.unwrap_or_else(|| {
            let stem = input
                .file_stem()
                .map(|s| s.to_string_lossy().to_string())
                .unwrap_or_else(|| "depth".to_string());
            input.with_file_name(format!("{}_color.png", stem))
        });

        match depth::colorize_file(input, &output_path, config) {
            Ok(colorized) => {
                print_summary(
                    "Colorize Complete",
                    &[
                        ("Input file", input.display().to_string()),
                        ("Output file", output_path.display().to_string()),
                        (
                            "Size",
                            format!("{}x{}", colorized.frame.width, colorized.frame.height),
                        ),
                        ("Valid samples", colorized.valid_samples.to_string()),
                        (
                            "Depth bounds",
                            format!("{:.3} - {:.3} m", colorized.bounds.min, colorized.bounds.max),
                        ),
                        ("Duration", format!("{:.2?}", start.elapsed())),
                    ],
                );
            }
            Err(e) => {
                error!("Colorize failed: {:#}", e);
                std::process::exit(1);
            }
        }
    }
}
