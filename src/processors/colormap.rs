//! 256-entry color palettes for 8-bit intensity images.

use std::fmt;
use std::str::FromStr;

use log::warn;
use serde::{Deserialize, Serialize};

/// Available palettes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorMap {
    #[default]
    Jet,
    Rainbow,
    Hot,
    Cool,
    Viridis,
    Plasma,
}

/// Control points as (position in [0, 1], RGB).
type Stops = &'static [(f32, [u8; 3])];

const JET: Stops = &[
    (0.0, [0, 0, 128]),
    (0.125, [0, 0, 255]),
    (0.375, [0, 255, 255]),
    (0.625, [255, 255, 0]),
    (0.875, [255, 0, 0]),
    (1.0, [128, 0, 0]),
];

const RAINBOW: Stops = &[
    (0.0, [255, 0, 0]),
    (0.2, [255, 255, 0]),
    (0.4, [0, 255, 0]),
    (0.6, [0, 255, 255]),
    (0.8, [0, 0, 255]),
    (1.0, [128, 0, 255]),
];

const HOT: Stops = &[
    (0.0, [0, 0, 0]),
    (0.375, [255, 0, 0]),
    (0.75, [255, 255, 0]),
    (1.0, [255, 255, 255]),
];

const COOL: Stops = &[(0.0, [0, 255, 255]), (1.0, [255, 0, 255])];

const VIRIDIS: Stops = &[
    (0.0, [68, 1, 84]),
    (0.125, [71, 44, 122]),
    (0.25, [59, 81, 139]),
    (0.375, [44, 113, 142]),
    (0.5, [33, 144, 141]),
    (0.625, [39, 173, 129]),
    (0.75, [92, 200, 99]),
    (0.875, [170, 220, 50]),
    (1.0, [253, 231, 37]),
];

const PLASMA: Stops = &[
    (0.0, [13, 8, 135]),
    (0.125, [76, 2, 161]),
    (0.25, [126, 3, 168]),
    (0.375, [169, 35, 149]),
    (0.5, [204, 71, 120]),
    (0.625, [229, 107, 93]),
    (0.75, [248, 148, 65]),
    (0.875, [253, 195, 40]),
    (1.0, [240, 249, 33]),
];

impl ColorMap {
    pub const ALL: [ColorMap; 6] = [
        ColorMap::Jet,
        ColorMap::Rainbow,
        ColorMap::Hot,
        ColorMap::Cool,
        ColorMap::Viridis,
        ColorMap::Plasma,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ColorMap::Jet => "jet",
            ColorMap::Rainbow => "rainbow",
            ColorMap::Hot => "hot",
            ColorMap::Cool => "cool",
            ColorMap::Viridis => "viridis",
            ColorMap::Plasma => "plasma",
        }
    }

    /// Parse a palette name, falling back to jet for unknown names.
    pub fn from_name_or_default(name: &str) -> Self {
        name.parse().unwrap_or_else(|_| {
            warn!("Unknown color map '{}', using jet", name);
            ColorMap::Jet
        })
    }

    fn stops(self) -> Stops {
        match self {
            ColorMap::Jet => JET,
            ColorMap::Rainbow => RAINBOW,
            ColorMap::Hot => HOT,
            ColorMap::Cool => COOL,
            ColorMap::Viridis => VIRIDIS,
            ColorMap::Plasma => PLASMA,
        }
    }

    /// Build the 256-entry lookup table by linear interpolation between stops.
    pub fn lut(self) -> [[u8; 3]; 256] {
        let stops = self.stops();
        let mut lut = [[0u8; 3]; 256];

        for (level, entry) in lut.iter_mut().enumerate() {
            let t = level as f32 / 255.0;
            let upper = stops
                .iter()
                .position(|&(pos, _)| pos >= t)
                .unwrap_or(stops.len() - 1)
                .max(1);
            let (p0, c0) = stops[upper - 1];
            let (p1, c1) = stops[upper];
            let w = if p1 > p0 { ((t - p0) / (p1 - p0)).clamp(0.0, 1.0) } else { 0.0 };

            for ch in 0..3 {
                let v = c0[ch] as f32 + (c1[ch] as f32 - c0[ch] as f32) * w;
                entry[ch] = v.round().clamp(0.0, 255.0) as u8;
            }
        }

        lut
    }
}

impl fmt::Display for ColorMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ColorMap {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        ColorMap::ALL
            .into_iter()
            .find(|map| map.name() == lower)
            .ok_or_else(|| format!("unknown color map: {}", s))
    }
}
