//! Contrast-limited adaptive histogram equalization (CLAHE).
//!
//! The image is split into a grid of tiles. Each tile gets its own clipped
//! histogram equalization table, and every pixel is mapped by bilinear
//! interpolation between the tables of the four nearest tile centers.

use rayon::prelude::*;

const BINS: usize = 256;

/// Tile geometry for an image dimension.
#[derive(Debug, Clone, Copy)]
struct Tiling {
    size: usize,
    count: usize,
}

impl Tiling {
    fn new(extent: usize, grid: usize) -> Self {
        let size = extent.div_ceil(grid.clamp(1, extent.max(1)));
        let count = extent.div_ceil(size.max(1));
        Self {
            size: size.max(1),
            count: count.max(1),
        }
    }

    /// Neighboring tile indices and the weight of the second one.
    #[inline]
    fn neighbors(&self, pos: usize) -> (usize, usize, f32) {
        let f = pos as f32 / self.size as f32 - 0.5;
        let lower = f.floor();
        let weight = f - lower;
        let last = self.count as isize - 1;
        let t1 = (lower as isize).clamp(0, last) as usize;
        let t2 = (lower as isize + 1).clamp(0, last) as usize;
        (t1, t2, weight)
    }
}

/// Equalization table for one tile with histogram clipping.
fn tile_lut(hist: &mut [usize; BINS], area: usize, clip_limit: f32) -> [u8; BINS] {
    if clip_limit > 0.0 {
        let clip = ((clip_limit * area as f32 / BINS as f32) as usize).max(1);

        let mut excess = 0;
        for h in hist.iter_mut() {
            if *h > clip {
                excess += *h - clip;
                *h = clip;
            }
        }

        let batch = excess / BINS;
        let residual = excess - batch * BINS;
        for h in hist.iter_mut() {
            *h += batch;
        }
        if residual > 0 {
            let step = (BINS / residual).max(1);
            for h in hist.iter_mut().step_by(step).take(residual) {
                *h += 1;
            }
        }
    }

    let scale = (BINS - 1) as f32 / area.max(1) as f32;
    let mut lut = [0u8; BINS];
    let mut sum = 0;
    for (entry, &h) in lut.iter_mut().zip(hist.iter()) {
        sum += h;
        *entry = (sum as f32 * scale).round().min(255.0) as u8;
    }
    lut
}

/// Apply CLAHE to an 8-bit single-channel image stored row-major.
///
/// `grid` is the number of tiles per axis (reduced for images smaller than
/// the grid). A `clip_limit` of zero or less disables clipping.
pub fn clahe(pixels: &[u8], width: usize, height: usize, clip_limit: f32, grid: usize) -> Vec<u8> {
    debug_assert_eq!(pixels.len(), width * height, "pixel buffer must match dimensions");
    if width == 0 || height == 0 {
        return Vec::new();
    }

    let tx = Tiling::new(width, grid);
    let ty = Tiling::new(height, grid);

    let luts: Vec<[u8; BINS]> = (0..ty.count * tx.count)
        .into_par_iter()
        .map(|tile| {
            let (row, col) = (tile / tx.count, tile % tx.count);
            let (y0, y1) = (row * ty.size, ((row + 1) * ty.size).min(height));
            let (x0, x1) = (col * tx.size, ((col + 1) * tx.size).min(width));

            let mut hist = [0usize; BINS];
            for y in y0..y1 {
                for &v in &pixels[y * width + x0..y * width + x1] {
                    hist[v as usize] += 1;
                }
            }
            tile_lut(&mut hist, (y1 - y0) * (x1 - x0), clip_limit)
        })
        .collect();

    let mut out = vec![0u8; width * height];
    out.par_chunks_mut(width).enumerate().for_each(|(y, row)| {
        let (r1, r2, ya) = ty.neighbors(y);
        for (x, out_px) in row.iter_mut().enumerate() {
            let (c1, c2, xa) = tx.neighbors(x);
            let v = pixels[y * width + x] as usize;

            let top = luts[r1 * tx.count + c1][v] as f32 * (1.0 - xa)
                + luts[r1 * tx.count + c2][v] as f32 * xa;
            let bottom = luts[r2 * tx.count + c1][v] as f32 * (1.0 - xa)
                + luts[r2 * tx.count + c2][v] as f32 * xa;
            *out_px = (top * (1.0 - ya) + bottom * ya).round().clamp(0.0, 255.0) as u8;
        }
    });

    out
}
