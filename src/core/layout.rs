//! On-disk layout of an episode dataset.
//!
//! A dataset root holds one table per episode under `data/{chunk}` and one
//! video per camera view under `videos/{chunk}/observation.images.{view}`.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::config::ShuffleConfig;

/// The per-episode artifact groups. The set is closed: every episode has
/// exactly one artifact of each kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactKind {
    /// Parquet table with one row per frame
    Data,
    FrontView,
    SideView,
    WristView,
}

impl ArtifactKind {
    /// All kinds, in processing order.
    pub const ALL: [ArtifactKind; 4] = [
        ArtifactKind::Data,
        ArtifactKind::FrontView,
        ArtifactKind::SideView,
        ArtifactKind::WristView,
    ];

    /// Camera view name for video kinds.
    pub fn view_name(self) -> Option<&'static str> {
        match self {
            ArtifactKind::Data => None,
            ArtifactKind::FrontView => Some("front_view"),
            ArtifactKind::SideView => Some("side_view"),
            ArtifactKind::WristView => Some("wrist_view"),
        }
    }

    /// Whether files of this kind are rewritten rather than copied.
    #[inline]
    pub fn is_table(self) -> bool {
        matches!(self, ArtifactKind::Data)
    }

    /// Expected file extension, including the leading dot.
    pub fn extension(self, config: &ShuffleConfig) -> &str {
        if self.is_table() {
            &config.table_extension
        } else {
            &config.video_extension
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ArtifactKind::Data => "data",
            ArtifactKind::FrontView => "front",
            ArtifactKind::SideView => "side",
            ArtifactKind::WristView => "wrist",
        };
        f.write_str(name)
    }
}

/// Resolves artifact folders below a dataset root.
#[derive(Debug, Clone)]
pub struct DatasetLayout {
    root: PathBuf,
    chunk: String,
}

impl DatasetLayout {
    pub fn new(root: impl Into<PathBuf>, chunk: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            chunk: chunk.into(),
        }
    }

    pub fn from_config(root: impl Into<PathBuf>, config: &ShuffleConfig) -> Self {
        Self::new(root, config.chunk.clone())
    }

    #[inline]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Folder holding all artifacts of `kind`.
    pub fn dir(&self, kind: ArtifactKind) -> PathBuf {
        match kind.view_name() {
            None => self.root.join("data").join(&self.chunk),
            Some(view) => self
                .root
                .join("videos")
                .join(&self.chunk)
                .join(format!("observation.images.{}", view)),
        }
    }

    /// Location of the merged metadata log.
    pub fn metadata_path(&self, file_name: &str) -> PathBuf {
        self.dir(ArtifactKind::Data).join(file_name)
    }
}
