//! Configuration types for the shuffle and colorize commands.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::processors::colormap::ColorMap;

/// Configuration for interleaving two datasets.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShuffleConfig {
    /// Seed for the episode permutation
    #[serde(default = "default_seed")]
    pub seed: u64,

    /// Chunk subdirectory holding episodes
    #[serde(default = "default_chunk")]
    pub chunk: String,

    /// Extension of episode tables (including the dot)
    #[serde(default = "default_table_extension")]
    pub table_extension: String,

    /// Extension of episode videos (including the dot)
    #[serde(default = "default_video_extension")]
    pub video_extension: String,

    /// File name of the merged metadata log under `data/{chunk}`
    #[serde(default = "default_metadata_file_name")]
    pub metadata_file_name: String,

    /// Log progress every N episodes (0 disables)
    #[serde(default = "default_progress_interval")]
    pub progress_interval: usize,
}

fn default_seed() -> u64 {
    42
}

fn default_chunk() -> String {
    "chunk-000".to_string()
}

fn default_table_extension() -> String {
    ".parquet".to_string()
}

fn default_video_extension() -> String {
    ".mp4".to_string()
}

fn default_metadata_file_name() -> String {
    "episodes.jsonl".to_string()
}

fn default_progress_interval() -> usize {
    50
}

impl Default for ShuffleConfig {
    fn default() -> Self {
        Self {
            seed: default_seed(),
            chunk: default_chunk(),
            table_extension: default_table_extension(),
            video_extension: default_video_extension(),
            metadata_file_name: default_metadata_file_name(),
            progress_interval: default_progress_interval(),
        }
    }
}

/// Configuration for depth-to-color conversion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColorizeConfig {
    /// Lower depth bound in meters
    #[serde(default)]
    pub min_depth: f32,

    /// Upper depth bound in meters
    #[serde(default = "default_max_depth")]
    pub max_depth: f32,

    /// Meters per raw sample unit (0.001 for millimeter sensors)
    #[serde(default = "default_depth_scale")]
    pub depth_scale: f32,

    /// Tighten the depth bounds to percentiles of each frame
    #[serde(default = "default_auto_scale")]
    pub auto_scale: bool,

    /// Percentile clipped from each end when auto scaling
    #[serde(default = "default_clip_percent")]
    pub clip_percent: f32,

    /// Palette applied to the equalized depth
    #[serde(default)]
    pub color_map: ColorMap,

    /// CLAHE clip limit
    #[serde(default = "default_clahe_clip_limit")]
    pub clahe_clip_limit: f32,

    /// CLAHE tiles per axis
    #[serde(default = "default_clahe_tile_grid")]
    pub clahe_tile_grid: usize,

    /// Samples at or beyond this distance (meters) are invalid
    #[serde(default = "default_max_valid_depth")]
    pub max_valid_depth: f32,
}

fn default_max_depth() -> f32 {
    1.0
}

fn default_depth_scale() -> f32 {
    0.001
}

fn default_auto_scale() -> bool {
    true
}

fn default_clip_percent() -> f32 {
    5.0
}

fn default_clahe_clip_limit() -> f32 {
    2.0
}

fn default_clahe_tile_grid() -> usize {
    8
}

fn default_max_valid_depth() -> f32 {
    1000.0
}

impl Default for ColorizeConfig {
    fn default() -> Self {
        Self {
            min_depth: 0.0,
            max_depth: default_max_depth(),
            depth_scale: default_depth_scale(),
            auto_scale: default_auto_scale(),
            clip_percent: default_clip_percent(),
            color_map: ColorMap::default(),
            clahe_clip_limit: default_clahe_clip_limit(),
            clahe_tile_grid: default_clahe_tile_grid(),
            max_valid_depth: default_max_valid_depth(),
        }
    }
}

/// Top-level configuration combining all sub-configs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub shuffle: ShuffleConfig,

    #[serde(default)]
    pub colorize: ColorizeConfig,
}

impl AppConfig {
    /// Load configuration from a YAML file.
    pub fn from_yaml<P: AsRef<Path>>(path: P) -> Result<Self, Box<dyn std::error::Error>> {
        let content = std::fs::read_to_string(path)?;
        let config: AppConfig = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a YAML file.
    pub fn to_yaml<P: AsRef<Path>>(&self, path: P) -> Result<(), Box<dyn std::error::Error>> {
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
