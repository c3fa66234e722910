//! Data processing modules.

pub mod clahe;
pub mod colormap;
pub mod depth;
pub mod interleave;
pub mod shuffle;

// Re-export key types for convenience
pub use colormap::ColorMap;
pub use depth::{colorize, colorize_dir, colorize_file, ColorFrame, ColorizeError, DepthFrame};
pub use interleave::{
    ArtifactError, ArtifactFailure, ArtifactSlot, InterleaveError, InterleaveReport, Interleaver,
    SourceDataset,
};
pub use shuffle::{resolve_origin, shuffled_order, EpisodeOrigin, SourceId};
