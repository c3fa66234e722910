//! Depth image to false-color conversion.
//!
//! A raw depth frame (fixed-point samples) is converted to meters, bounded,
//! stretched to 8 bits, contrast-equalized with CLAHE and mapped through a
//! palette. Samples outside the validity window come out black.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context};
use log::{debug, error, info};
use rayon::prelude::*;
use thiserror::Error;

use crate::config::ColorizeConfig;
use crate::core::loaders::list_files;

use super::clahe::clahe;

/// Errors that can occur while colorizing a frame.
#[derive(Debug, Error, PartialEq)]
pub enum ColorizeError {
    #[error("frame has no valid depth samples")]
    NoValidDepth,

    #[error("invalid depth range: min {min} >= max {max}")]
    InvalidRange { min: f32, max: f32 },

    #[error("expected {expected} samples for the frame size, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
}

/// Single-channel raw depth frame, row-major.
#[derive(Debug, Clone)]
pub struct DepthFrame {
    pub width: usize,
    pub height: usize,
    pub samples: Vec<u16>,
}

impl DepthFrame {
    pub fn new(width: usize, height: usize, samples: Vec<u16>) -> Result<Self, ColorizeError> {
        if samples.len() != width * height {
            return Err(ColorizeError::DimensionMismatch {
                expected: width * height,
                actual: samples.len(),
            });
        }
        Ok(Self {
            width,
            height,
            samples,
        })
    }
}

/// RGB frame with the same dimensions as its source depth frame.
#[derive(Debug, Clone)]
pub struct ColorFrame {
    pub width: usize,
    pub height: usize,
    pub pixels: Vec<[u8; 3]>,
}

impl ColorFrame {
    #[inline]
    pub fn pixel(&self, x: usize, y: usize) -> [u8; 3] {
        self.pixels[y * self.width + x]
    }

    /// Interleaved RGB bytes.
    pub fn into_rgb_bytes(self) -> Vec<u8> {
        self.pixels.into_iter().flatten().collect()
    }
}

/// Depth interval (meters) stretched over the 8-bit range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DepthBounds {
    pub min: f32,
    pub max: f32,
}

/// A colorized frame and the bounds used for it.
#[derive(Debug, Clone)]
pub struct Colorized {
    pub frame: ColorFrame,
    pub bounds: DepthBounds,
    pub valid_samples: usize,
}

/// Percentile of sorted values with linear interpolation between ranks.
pub fn percentile(sorted: &[f32], p: f32) -> f32 {
    if sorted.is_empty() {
        return f32::NAN;
    }
    let rank = (p.clamp(0.0, 100.0) / 100.0) * (sorted.len() - 1) as f32;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let w = rank - lower as f32;
    sorted[lower] + (sorted[upper] - sorted[lower]) * w
}

/// Bounds for a frame given its valid samples (meters).
///
/// With auto scaling the configured bounds are tightened to the clip
/// percentiles, never widened. A tightened range that collapses falls back
/// to the configured one.
pub fn depth_bounds(valid: &mut [f32], config: &ColorizeConfig) -> DepthBounds {
    let configured = DepthBounds {
        min: config.min_depth,
        max: config.max_depth,
    };
    if !config.auto_scale || valid.is_empty() {
        return configured;
    }

    valid.par_sort_unstable_by(f32::total_cmp);
    let clip = config.clip_percent.clamp(0.0, 50.0);
    let low = percentile(valid, clip);
    let high = percentile(valid, 100.0 - clip);

    let tightened = DepthBounds {
        min: configured.min.max(low),
        max: configured.max.min(high),
    };
    if tightened.max > tightened.min {
        tightened
    } else {
        configured
    }
}

/// Convert a depth frame to a false-color frame.
///
/// # Errors
///
/// Returns an error if the configured range is empty or the frame has no
/// sample inside the validity window.
pub fn colorize(frame: &DepthFrame, config: &ColorizeConfig) -> Result<Colorized, ColorizeError> {
    if config.max_depth <= config.min_depth {
        return Err(ColorizeError::InvalidRange {
            min: config.min_depth,
            max: config.max_depth,
        });
    }

    let meters: Vec<f32> = frame
        .samples
        .par_iter()
        .map(|&s| s as f32 * config.depth_scale)
        .collect();
    let valid: Vec<bool> = meters
        .par_iter()
        .map(|&m| m > 0.0 && m < config.max_valid_depth)
        .collect();

    let mut valid_depths: Vec<f32> = meters
        .iter()
        .zip(&valid)
        .filter(|(_, ok)| **ok)
        .map(|(&m, _)| m)
        .collect();
    let valid_samples = valid_depths.len();
    if valid_samples == 0 {
        return Err(ColorizeError::NoValidDepth);
    }

    let bounds = depth_bounds(&mut valid_depths, config);
    debug!(
        "Depth bounds {:.3}..{:.3} m over {} valid samples",
        bounds.min, bounds.max, valid_samples
    );

    let span = bounds.max - bounds.min;
    let normalized: Vec<u8> = meters
        .par_iter()
        .zip(valid.par_iter())
        .map(|(&m, &ok)| {
            if ok && m >= bounds.min && m <= bounds.max {
                (255.0 * (m - bounds.min) / span) as u8
            } else {
                0
            }
        })
        .collect();

    let enhanced = clahe(
        &normalized,
        frame.width,
        frame.height,
        config.clahe_clip_limit,
        config.clahe_tile_grid,
    );

    let lut = config.color_map.lut();
    let pixels: Vec<[u8; 3]> = enhanced
        .par_iter()
        .zip(valid.par_iter())
        .map(|(&level, &ok)| if ok { lut[level as usize] } else { [0, 0, 0] })
        .collect();

    Ok(Colorized {
        frame: ColorFrame {
            width: frame.width,
            height: frame.height,
            pixels,
        },
        bounds,
        valid_samples,
    })
}

/// Depth frame from a grayscale image.
///
/// 16-bit samples are taken as-is and 8-bit samples are widened without
/// rescaling, so a stored 200 stays 200 raw units. Color images are rejected.
fn depth_frame(image: image::DynamicImage) -> anyhow::Result<DepthFrame> {
    let (width, height, samples) = match image {
        image::DynamicImage::ImageLuma16(buffer) => {
            let (w, h) = buffer.dimensions();
            (w, h, buffer.into_raw())
        }
        image::DynamicImage::ImageLuma8(buffer) => {
            let (w, h) = buffer.dimensions();
            (w, h, buffer.into_raw().into_iter().map(u16::from).collect())
        }
        other => bail!("expected a grayscale depth image, got {:?}", other.color()),
    };
    Ok(DepthFrame::new(width as usize, height as usize, samples)?)
}

/// Colorize one depth image file (16-bit or 8-bit grayscale) into an RGB image.
pub fn colorize_file(
    input: &Path,
    output: &Path,
    config: &ColorizeConfig,
) -> anyhow::Result<Colorized> {
    let image = image::open(input)
        .with_context(|| format!("Failed to open depth image: {}", input.display()))?;
    let frame = depth_frame(image)
        .with_context(|| format!("Unsupported depth image: {}", input.display()))?;
    let (width, height) = (frame.width as u32, frame.height as u32);

    let colorized = colorize(&frame, config)
        .with_context(|| format!("Failed to colorize {}", input.display()))?;

    if let Some(parent) = output.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
    }
    let rgb = image::RgbImage::from_raw(width, height, colorized.frame.clone().into_rgb_bytes())
        .ok_or_else(|| anyhow!("color buffer does not match {}x{}", width, height))?;
    rgb.save(output)
        .with_context(|| format!("Failed to write {}", output.display()))?;

    Ok(colorized)
}

/// Outcome of colorizing a directory.
#[derive(Debug, Default)]
pub struct BatchSummary {
    pub written: Vec<PathBuf>,
    pub failed: Vec<(PathBuf, String)>,
}

/// Colorize every `.png` in `input_dir` into `output_dir` under the same name.
///
/// Failures are logged and collected; they do not stop the batch.
pub fn colorize_dir(
    input_dir: &Path,
    output_dir: &Path,
    config: &ColorizeConfig,
) -> BatchSummary {
    let mut summary = BatchSummary::default();

    for name in list_files(input_dir, ".png") {
        let input = input_dir.join(&name);
        let output = output_dir.join(&name);
        match colorize_file(&input, &output, config) {
            Ok(c) => {
                info!(
                    "{} -> {} ({:.3}..{:.3} m)",
                    input.display(),
                    output.display(),
                    c.bounds.min,
                    c.bounds.max
                );
                summary.written.push(output);
            }
            Err(e) => {
                error!("Skipping {}: {:#}", input.display(), e);
                summary.failed.push((input, format!("{:#}", e)));
            }
        }
    }

    summary
}
