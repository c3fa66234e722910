//! Merge and shuffle robot-demonstration datasets.
//!
//! This crate provides tools for:
//! - Interleaving two episode datasets (parquet tables, three camera views and
//!   a JSON-lines metadata log) into one dataset with a seeded random order
//! - Renumbering episodes and the dataset-wide row index of every table
//! - Converting raw depth frames to contrast-enhanced false-color images
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use episode_shuffle::{Interleaver, ShuffleConfig, SourceDataset};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ShuffleConfig::default();
//! let a = SourceDataset::load(Path::new("ds_a"), Path::new("ds_a/episodes.jsonl"), &config)?;
//! let b = SourceDataset::load(Path::new("ds_b"), Path::new("ds_b/episodes.jsonl"), &config)?;
//! let report = Interleaver::new(&a, &b, Path::new("merged"), &config).run()?;
//! println!("{} rows written", report.rows_written);
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod config;
pub mod core;
pub mod processors;

pub use config::{AppConfig, ColorizeConfig, ShuffleConfig};
pub use core::layout::{ArtifactKind, DatasetLayout};
pub use processors::interleave::{InterleaveReport, Interleaver, SourceDataset};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
