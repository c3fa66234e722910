//! Interleave two episode datasets into one shuffled dataset.
//!
//! Both sources are concatenated (first, then second) for every artifact
//! group and for the metadata log. Episodes are then written in the order
//! of a seeded permutation and renumbered `episode_000000, episode_000001, ...`.
//! Table rows get a dataset-wide `index` that runs across episodes in output
//! order.
//!
//! A missing or unreadable artifact never aborts the run. It is logged and
//! recorded in [`InterleaveReport::failures`].

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use log::{error, info, warn};
use serde_json::Value;
use thiserror::Error;

use crate::config::ShuffleConfig;
use crate::core::layout::{ArtifactKind, DatasetLayout};
use crate::core::loaders::{list_files, load_json_lines, LoaderError};
use crate::core::table::{reindex_table, row_count, TableError, EPISODE_INDEX_COLUMN};
use crate::core::writers::{copy_artifact, write_json_lines, WriteError};

use super::shuffle::{
    episode_file_name, file_extension, invert_order, resolve_origin, shuffled_order, EpisodeOrigin,
    SourceId,
};

/// Errors that abort an interleave run.
#[derive(Debug, Error)]
pub enum InterleaveError {
    #[error("dataset root not found: {0}")]
    SourceNotFound(PathBuf),

    #[error("failed to load metadata log: {0}")]
    Metadata(#[source] LoaderError),

    #[error("failed to create target directory '{path}': {source}")]
    TargetDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write merged metadata: {0}")]
    WriteMetadata(#[from] WriteError),

    #[error("order is not a permutation of 0..{expected}")]
    InvalidOrder { expected: usize },
}

/// Result type for interleave operations.
pub type Result<T> = std::result::Result<T, InterleaveError>;

/// Errors for a single artifact of a single episode.
#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("index {index} out of range ({count} available)")]
    OutOfRange { index: usize, count: usize },

    #[error("source file missing: {0}")]
    Missing(PathBuf),

    #[error(transparent)]
    Copy(#[from] WriteError),

    #[error(transparent)]
    Table(#[from] TableError),

    #[error("metadata record is not a JSON object")]
    MalformedRecord,
}

/// Which output of an episode an artifact failure belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactSlot {
    File(ArtifactKind),
    Metadata,
}

impl fmt::Display for ArtifactSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArtifactSlot::File(kind) => write!(f, "{}", kind),
            ArtifactSlot::Metadata => f.write_str("metadata"),
        }
    }
}

/// One artifact that could not be written.
#[derive(Debug)]
pub struct ArtifactFailure {
    /// Output position of the episode
    pub episode: usize,
    /// Index into the concatenated sources
    pub original_index: usize,
    pub artifact: ArtifactSlot,
    pub error: ArtifactError,
}

impl fmt::Display for ArtifactFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "episode {} (original {}), {}: {}",
            self.episode, self.original_index, self.artifact, self.error
        )
    }
}

/// Per-artifact file lists of one dataset, in natural order.
#[derive(Debug, Clone, Default)]
pub struct ArtifactFiles {
    pub data: Vec<String>,
    pub front_view: Vec<String>,
    pub side_view: Vec<String>,
    pub wrist_view: Vec<String>,
}

impl ArtifactFiles {
    /// List every artifact folder of `layout`.
    pub fn load(layout: &DatasetLayout, config: &ShuffleConfig) -> Self {
        let list = |kind: ArtifactKind| list_files(&layout.dir(kind), kind.extension(config));
        Self {
            data: list(ArtifactKind::Data),
            front_view: list(ArtifactKind::FrontView),
            side_view: list(ArtifactKind::SideView),
            wrist_view: list(ArtifactKind::WristView),
        }
    }

    pub fn get(&self, kind: ArtifactKind) -> &[String] {
        match kind {
            ArtifactKind::Data => &self.data,
            ArtifactKind::FrontView => &self.front_view,
            ArtifactKind::SideView => &self.side_view,
            ArtifactKind::WristView => &self.wrist_view,
        }
    }
}

/// One input dataset: its layout, artifact lists and metadata log.
#[derive(Debug, Clone)]
pub struct SourceDataset {
    layout: DatasetLayout,
    files: ArtifactFiles,
    metadata: Vec<Value>,
}

impl SourceDataset {
    /// Load a dataset rooted at `root` with its metadata log.
    ///
    /// # Errors
    ///
    /// Fails if `root` does not exist or the metadata log is missing or
    /// malformed. Missing artifact folders only produce warnings.
    pub fn load(root: &Path, metadata_path: &Path, config: &ShuffleConfig) -> Result<Self> {
        if !root.is_dir() {
            return Err(InterleaveError::SourceNotFound(root.to_path_buf()));
        }
        let metadata = load_json_lines(metadata_path).map_err(InterleaveError::Metadata)?;
        let layout = DatasetLayout::from_config(root, config);
        let files = ArtifactFiles::load(&layout, config);

        info!(
            "Loaded {}: {} tables, {} metadata records",
            root.display(),
            files.data.len(),
            metadata.len()
        );
        Ok(Self {
            layout,
            files,
            metadata,
        })
    }

    #[inline]
    pub fn layout(&self) -> &DatasetLayout {
        &self.layout
    }

    #[inline]
    pub fn files(&self, kind: ArtifactKind) -> &[String] {
        self.files.get(kind)
    }

    #[inline]
    pub fn metadata(&self) -> &[Value] {
        &self.metadata
    }
}

/// Summary of one written episode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EpisodeSummary {
    pub new_index: usize,
    pub original_index: usize,
    /// Origin of the episode's table
    pub origin: EpisodeOrigin,
    /// Value of the row cursor before this episode
    pub first_row: u64,
    pub rows: u64,
}

/// What a run would do for one output episode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EpisodePlan {
    pub new_index: usize,
    pub original_index: usize,
    pub origin: EpisodeOrigin,
    /// Source table, when present
    pub table: Option<PathBuf>,
    /// Row count from the table footer (0 when unreadable)
    pub rows: u64,
    pub first_row: u64,
}

/// Result of a completed run.
#[derive(Debug)]
pub struct InterleaveReport {
    /// `order[j]` is the original combined index of output episode `j`
    pub order: Vec<usize>,
    /// `positions[orig]` is the output position of combined index `orig`
    pub positions: Vec<usize>,
    pub episodes: Vec<EpisodeSummary>,
    /// Final row cursor: total rows over all written tables
    pub rows_written: u64,
    pub failures: Vec<ArtifactFailure>,
    pub metadata_path: PathBuf,
    pub metadata_records: usize,
}

impl InterleaveReport {
    /// Original combined index of output episode `j`.
    pub fn origin_of(&self, j: usize) -> Option<usize> {
        self.order.get(j).copied()
    }

    /// Output position of the episode at combined index `orig`.
    pub fn output_of(&self, orig: usize) -> Option<usize> {
        self.positions.get(orig).copied()
    }

    /// True when every artifact was written.
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

struct EpisodeOutcome {
    metadata: Option<Value>,
    summary: EpisodeSummary,
    failures: Vec<ArtifactFailure>,
}

/// Merges two source datasets into a target dataset.
pub struct Interleaver<'a> {
    first: &'a SourceDataset,
    second: &'a SourceDataset,
    target: DatasetLayout,
    config: &'a ShuffleConfig,
}

impl<'a> Interleaver<'a> {
    pub fn new(
        first: &'a SourceDataset,
        second: &'a SourceDataset,
        target_root: &Path,
        config: &'a ShuffleConfig,
    ) -> Self {
        Self {
            first,
            second,
            target: DatasetLayout::from_config(target_root, config),
            config,
        }
    }

    /// Number of output episodes: all tables of both sources.
    pub fn episode_count(&self) -> usize {
        self.first.files(ArtifactKind::Data).len() + self.second.files(ArtifactKind::Data).len()
    }

    /// Describe artifact groups whose length disagrees with the metadata log.
    pub fn alignment_warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        for (id, dataset) in [(SourceId::First, self.first), (SourceId::Second, self.second)] {
            let records = dataset.metadata().len();
            for kind in ArtifactKind::ALL {
                let count = dataset.files(kind).len();
                if count != records {
                    warnings.push(format!(
                        "{}: {} group has {} files but metadata has {} records",
                        id, kind, count, records
                    ));
                }
            }
        }
        warnings
    }

    /// Seeded output order for this pair of datasets.
    pub fn order(&self) -> Vec<usize> {
        shuffled_order(self.episode_count(), self.config.seed)
    }

    /// Compute what [`run_with_order`](Self::run_with_order) would write.
    pub fn plan(&self, order: &[usize]) -> Vec<EpisodePlan> {
        let first_len = self.first.files(ArtifactKind::Data).len();
        let mut cursor = 0u64;

        order
            .iter()
            .enumerate()
            .map(|(j, &orig)| {
                let table = self.locate(ArtifactKind::Data, orig).ok().map(|(path, _)| path);
                let rows = table
                    .as_deref()
                    .and_then(|path| row_count(path).ok())
                    .unwrap_or(0);
                let plan = EpisodePlan {
                    new_index: j,
                    original_index: orig,
                    origin: resolve_origin(orig, first_len),
                    table,
                    rows,
                    first_row: cursor,
                };
                cursor += rows;
                plan
            })
            .collect()
    }

    /// Run with the seeded order.
    pub fn run(&self) -> Result<InterleaveReport> {
        self.run_with_order(self.order())
    }

    /// Write every episode in `order` and the merged metadata log.
    ///
    /// # Errors
    ///
    /// Fails if `order` is not a permutation of `0..episode_count()`, if the
    /// target folders cannot be created, or if the merged metadata log cannot
    /// be written. Per-artifact problems are reported in the returned report.
    pub fn run_with_order(&self, order: Vec<usize>) -> Result<InterleaveReport> {
        let n = self.episode_count();
        if !is_permutation(&order, n) {
            return Err(InterleaveError::InvalidOrder { expected: n });
        }

        for warning in self.alignment_warnings() {
            warn!("{}", warning);
        }
        self.prepare_target()?;

        let mut cursor = 0u64;
        let mut merged_metadata = Vec::with_capacity(n);
        let mut episodes = Vec::with_capacity(n);
        let mut failures = Vec::new();

        for (j, &orig) in order.iter().enumerate() {
            let (outcome, next_cursor) = self.process_episode(j, orig, cursor);
            cursor = next_cursor;

            merged_metadata.extend(outcome.metadata);
            episodes.push(outcome.summary);
            failures.extend(outcome.failures);

            let interval = self.config.progress_interval;
            if interval > 0 && (j + 1) % interval == 0 {
                info!("Progress: {}/{}", j + 1, n);
            }
        }

        let metadata_path = self.target.metadata_path(&self.config.metadata_file_name);
        write_json_lines(&metadata_path, &merged_metadata)?;
        info!(
            "Wrote {} metadata records to {}",
            merged_metadata.len(),
            metadata_path.display()
        );
        info!("Final row index: {}", cursor);

        Ok(InterleaveReport {
            positions: invert_order(&order),
            order,
            episodes,
            rows_written: cursor,
            failures,
            metadata_path,
            metadata_records: merged_metadata.len(),
        })
    }

    fn prepare_target(&self) -> Result<()> {
        for kind in ArtifactKind::ALL {
            let dir = self.target.dir(kind);
            fs::create_dir_all(&dir).map_err(|e| InterleaveError::TargetDirectory {
                path: dir.clone(),
                source: e,
            })?;
        }
        Ok(())
    }

    /// Find the source file of `kind` at combined index `orig`.
    fn locate(
        &self,
        kind: ArtifactKind,
        orig: usize,
    ) -> std::result::Result<(PathBuf, &str), ArtifactError> {
        let first = self.first.files(kind);
        let second = self.second.files(kind);
        let count = first.len() + second.len();
        if orig >= count {
            return Err(ArtifactError::OutOfRange { index: orig, count });
        }

        let origin = resolve_origin(orig, first.len());
        let (dataset, names) = match origin.source {
            SourceId::First => (self.first, first),
            SourceId::Second => (self.second, second),
        };
        let name = names[origin.local_index].as_str();
        let path = dataset.layout().dir(kind).join(name);
        if !path.is_file() {
            return Err(ArtifactError::Missing(path));
        }
        Ok((path, name))
    }

    /// Metadata record at combined index `orig`, renumbered to `j`.
    fn metadata_record(&self, j: usize, orig: usize) -> std::result::Result<Value, ArtifactError> {
        let first = self.first.metadata();
        let second = self.second.metadata();
        let count = first.len() + second.len();
        if orig >= count {
            return Err(ArtifactError::OutOfRange { index: orig, count });
        }

        let origin = resolve_origin(orig, first.len());
        let mut record = match origin.source {
            SourceId::First => first[origin.local_index].clone(),
            SourceId::Second => second[origin.local_index].clone(),
        };
        let fields = record.as_object_mut().ok_or(ArtifactError::MalformedRecord)?;
        fields.insert(EPISODE_INDEX_COLUMN.to_string(), Value::from(j));
        Ok(record)
    }

    /// Write one artifact, returning the number of table rows written.
    fn write_artifact(
        &self,
        kind: ArtifactKind,
        j: usize,
        orig: usize,
        cursor: u64,
    ) -> std::result::Result<u64, ArtifactError> {
        let (source, name) = self.locate(kind, orig)?;
        let target_name = episode_file_name(j, file_extension(name));
        let target = self.target.dir(kind).join(&target_name);

        if kind.is_table() {
            let rows = reindex_table(&source, &target, j, cursor)?;
            info!(
                "{} {}/{}: {} -> {} (index {}..{})",
                kind,
                j + 1,
                self.episode_count(),
                name,
                target_name,
                cursor,
                cursor + rows
            );
            Ok(rows)
        } else {
            copy_artifact(&source, &target)?;
            info!(
                "{} {}/{}: {} -> {}",
                kind,
                j + 1,
                self.episode_count(),
                name,
                target_name
            );
            Ok(0)
        }
    }

    /// Write all artifacts of output episode `j`.
    ///
    /// Takes the row cursor and returns it advanced by the rows written.
    fn process_episode(&self, j: usize, orig: usize, cursor: u64) -> (EpisodeOutcome, u64) {
        let mut failures = Vec::new();
        let mut record_failure = |artifact: ArtifactSlot, error: ArtifactError| {
            let failure = ArtifactFailure {
                episode: j,
                original_index: orig,
                artifact,
                error,
            };
            error!("{}", failure);
            failures.push(failure);
        };

        let metadata = match self.metadata_record(j, orig) {
            Ok(record) => Some(record),
            Err(e) => {
                record_failure(ArtifactSlot::Metadata, e);
                None
            }
        };

        let mut rows = 0;
        for kind in ArtifactKind::ALL {
            match self.write_artifact(kind, j, orig, cursor) {
                Ok(written) => rows += written,
                Err(e) => record_failure(ArtifactSlot::File(kind), e),
            }
        }

        let first_len = self.first.files(ArtifactKind::Data).len();
        let outcome = EpisodeOutcome {
            metadata,
            summary: EpisodeSummary {
                new_index: j,
                original_index: orig,
                origin: resolve_origin(orig, first_len),
                first_row: cursor,
                rows,
            },
            failures,
        };
        (outcome, cursor + rows)
    }
}

fn is_permutation(order: &[usize], n: usize) -> bool {
    if order.len() != n {
        return false;
    }
    let mut seen = vec![false; n];
    for &i in order {
        if i >= n || seen[i] {
            return false;
        }
        seen[i] = true;
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::table::test_support::{read_int_column, write_episode_table};
    use crate::core::table::INDEX_COLUMN;
    use std::io::Write;
    use tempfile::TempDir;

    const VIEWS: [ArtifactKind; 3] = [
        ArtifactKind::FrontView,
        ArtifactKind::SideView,
        ArtifactKind::WristView,
    ];

    /// Build a dataset under `root` with one episode per entry of `rows`.
    /// Returns the metadata log path.
    fn make_source(root: &Path, tag: &str, rows: &[usize]) -> PathBuf {
        let config = ShuffleConfig::default();
        let layout = DatasetLayout::from_config(root, &config);

        for (i, &n) in rows.iter().enumerate() {
            write_episode_table(
                &layout.dir(ArtifactKind::Data).join(format!("episode_{}.parquet", i)),
                n,
            );
            for kind in VIEWS {
                let dir = layout.dir(kind);
                fs::create_dir_all(&dir).unwrap();
                fs::write(
                    dir.join(format!("episode_{}.mp4", i)),
                    format!("{}-{}-{}", tag, i, kind),
                )
                .unwrap();
            }
        }

        let meta_path = root.join("meta.jsonl");
        let mut file = fs::File::create(&meta_path).unwrap();
        for (i, &n) in rows.iter().enumerate() {
            writeln!(
                file,
                r#"{{"episode_index": {}, "source": "{}", "local": {}, "length": {}}}"#,
                i, tag, i, n
            )
            .unwrap();
        }
        meta_path
    }

    struct Fixture {
        _dir: TempDir,
        first: SourceDataset,
        second: SourceDataset,
        target: PathBuf,
        config: ShuffleConfig,
    }

    fn fixture(first_rows: &[usize], second_rows: &[usize]) -> Fixture {
        let dir = TempDir::new().unwrap();
        let config = ShuffleConfig::default();
        let a = dir.path().join("a");
        let b = dir.path().join("b");
        let meta_a = make_source(&a, "a", first_rows);
        let meta_b = make_source(&b, "b", second_rows);
        let first = SourceDataset::load(&a, &meta_a, &config).unwrap();
        let second = SourceDataset::load(&b, &meta_b, &config).unwrap();
        let target = dir.path().join("merged");
        Fixture {
            _dir: dir,
            first,
            second,
            target,
            config,
        }
    }

    fn video(target: &Path, kind: ArtifactKind, j: usize) -> String {
        let layout = DatasetLayout::new(target, "chunk-000");
        fs::read_to_string(layout.dir(kind).join(episode_file_name(j, ".mp4"))).unwrap()
    }

    fn table(target: &Path, j: usize) -> PathBuf {
        DatasetLayout::new(target, "chunk-000")
            .dir(ArtifactKind::Data)
            .join(episode_file_name(j, ".parquet"))
    }

    #[test]
    fn test_two_plus_one_with_fixed_order() {
        let fx = fixture(&[3, 4], &[5]);
        let interleaver = Interleaver::new(&fx.first, &fx.second, &fx.target, &fx.config);

        let report = interleaver.run_with_order(vec![2, 0, 1]).unwrap();

        assert!(report.is_complete());
        assert_eq!(video(&fx.target, ArtifactKind::FrontView, 0), "b-0-front");
        assert_eq!(video(&fx.target, ArtifactKind::WristView, 1), "a-0-wrist");
        assert_eq!(video(&fx.target, ArtifactKind::SideView, 2), "a-1-side");

        assert_eq!(read_int_column(&table(&fx.target, 0), INDEX_COLUMN), vec![0, 1, 2, 3, 4]);
        assert_eq!(read_int_column(&table(&fx.target, 1), INDEX_COLUMN), vec![5, 6, 7]);
        assert_eq!(read_int_column(&table(&fx.target, 2), INDEX_COLUMN), vec![8, 9, 10, 11]);
        assert_eq!(
            read_int_column(&table(&fx.target, 2), EPISODE_INDEX_COLUMN),
            vec![2, 2, 2, 2]
        );
        assert_eq!(report.rows_written, 12);
        assert_eq!(report.origin_of(0), Some(2));
        assert_eq!(report.output_of(2), Some(0));
        assert_eq!(report.output_of(0), Some(1));
        assert_eq!(report.output_of(3), None);

        let metadata = load_json_lines(&report.metadata_path).unwrap();
        assert_eq!(metadata.len(), 3);
        assert_eq!(metadata[0]["source"], "b");
        assert_eq!(metadata[1]["source"], "a");
        assert_eq!(metadata[2]["local"], 1);
        for (j, record) in metadata.iter().enumerate() {
            assert_eq!(record["episode_index"], j);
        }
    }

    #[test]
    fn test_outputs_recover_original_episode() {
        let fx = fixture(&[2, 3, 1, 2], &[4, 1, 2]);
        let interleaver = Interleaver::new(&fx.first, &fx.second, &fx.target, &fx.config);

        let report = interleaver.run().unwrap();
        let metadata = load_json_lines(&report.metadata_path).unwrap();

        for j in 0..interleaver.episode_count() {
            let origin = resolve_origin(report.origin_of(j).unwrap(), 4);
            let tag = match origin.source {
                SourceId::First => "a",
                SourceId::Second => "b",
            };
            assert_eq!(metadata[j]["source"], tag);
            assert_eq!(metadata[j]["local"], origin.local_index);
            assert_eq!(metadata[j]["episode_index"], j);
            assert_eq!(
                video(&fx.target, ArtifactKind::SideView, j),
                format!("{}-{}-side", tag, origin.local_index)
            );
            let rows = read_int_column(&table(&fx.target, j), INDEX_COLUMN).len();
            assert_eq!(Some(rows as u64), metadata[j]["length"].as_u64());
        }
    }

    #[test]
    fn test_same_seed_reproduces_output() {
        let fx = fixture(&[2, 2, 3], &[1, 4]);
        let other_target = fx.target.with_file_name("merged_again");

        let first_run = Interleaver::new(&fx.first, &fx.second, &fx.target, &fx.config)
            .run()
            .unwrap();
        let second_run = Interleaver::new(&fx.first, &fx.second, &other_target, &fx.config)
            .run()
            .unwrap();

        assert_eq!(first_run.order, second_run.order);
        assert_eq!(
            fs::read(&first_run.metadata_path).unwrap(),
            fs::read(&second_run.metadata_path).unwrap()
        );
        for j in 0..5 {
            assert_eq!(
                read_int_column(&table(&fx.target, j), INDEX_COLUMN),
                read_int_column(&table(&other_target, j), INDEX_COLUMN)
            );
        }
    }

    #[test]
    fn test_missing_video_is_skipped() {
        let fx = fixture(&[2, 2], &[2]);
        let side = fx.first.layout().dir(ArtifactKind::SideView).join("episode_1.mp4");
        fs::remove_file(&side).unwrap();
        let interleaver = Interleaver::new(&fx.first, &fx.second, &fx.target, &fx.config);

        let report = interleaver.run_with_order(vec![1, 2, 0]).unwrap();

        assert_eq!(report.failures.len(), 1);
        let failure = &report.failures[0];
        assert_eq!(failure.episode, 0);
        assert_eq!(failure.artifact, ArtifactSlot::File(ArtifactKind::SideView));
        assert!(matches!(failure.error, ArtifactError::Missing(_)));

        assert_eq!(video(&fx.target, ArtifactKind::FrontView, 0), "a-1-front");
        assert_eq!(video(&fx.target, ArtifactKind::WristView, 0), "a-1-wrist");
        assert!(table(&fx.target, 0).exists());
        assert_eq!(report.metadata_records, 3);
        assert_eq!(report.rows_written, 6);
    }

    #[test]
    fn test_missing_view_folder_reports_out_of_range() {
        let fx = fixture(&[1], &[1]);
        let dir = TempDir::new().unwrap();
        let config = ShuffleConfig::default();
        let root = dir.path().join("c");
        let meta = make_source(&root, "c", &[2, 2]);
        fs::remove_dir_all(DatasetLayout::new(&root, "chunk-000").dir(ArtifactKind::WristView))
            .unwrap();
        let second = SourceDataset::load(&root, &meta, &config).unwrap();
        assert!(second.files(ArtifactKind::WristView).is_empty());

        let interleaver = Interleaver::new(&fx.first, &second, &fx.target, &config);
        assert_eq!(interleaver.alignment_warnings().len(), 1);

        let report = interleaver.run_with_order(vec![0, 1, 2]).unwrap();

        let wrist_failures: Vec<_> = report
            .failures
            .iter()
            .filter(|f| f.artifact == ArtifactSlot::File(ArtifactKind::WristView))
            .collect();
        assert_eq!(wrist_failures.len(), 2);
        assert!(matches!(
            wrist_failures[0].error,
            ArtifactError::OutOfRange { index: 1, count: 1 }
        ));
        assert_eq!(report.rows_written, 5);
    }

    #[test]
    fn test_broken_table_leaves_cursor_unchanged() {
        let fx = fixture(&[3, 4], &[5]);
        let broken = fx.first.layout().dir(ArtifactKind::Data).join("episode_0.parquet");
        fs::write(&broken, b"corrupt").unwrap();
        let interleaver = Interleaver::new(&fx.first, &fx.second, &fx.target, &fx.config);

        let report = interleaver.run_with_order(vec![0, 2, 1]).unwrap();

        assert_eq!(report.failures.len(), 1);
        assert!(matches!(report.failures[0].error, ArtifactError::Table(_)));
        assert!(!table(&fx.target, 0).exists());
        assert_eq!(read_int_column(&table(&fx.target, 1), INDEX_COLUMN), vec![0, 1, 2, 3, 4]);
        assert_eq!(report.rows_written, 9);
        assert_eq!(
            report.rows_written,
            report.episodes.iter().map(|e| e.rows).sum::<u64>()
        );
        // The videos of the broken episode are still copied.
        assert_eq!(video(&fx.target, ArtifactKind::FrontView, 0), "a-0-front");
    }

    #[test]
    fn test_non_object_metadata_record_is_skipped() {
        let dir = TempDir::new().unwrap();
        let config = ShuffleConfig::default();
        let a = dir.path().join("a");
        let b = dir.path().join("b");
        make_source(&a, "a", &[1, 1]);
        let meta_b = make_source(&b, "b", &[1]);
        let meta_a = a.join("meta.jsonl");
        fs::write(&meta_a, "[1, 2]\n{\"source\": \"a\", \"local\": 1}\n").unwrap();
        let first = SourceDataset::load(&a, &meta_a, &config).unwrap();
        let second = SourceDataset::load(&b, &meta_b, &config).unwrap();
        let target = dir.path().join("merged");

        let report = Interleaver::new(&first, &second, &target, &config)
            .run_with_order(vec![2, 0, 1])
            .unwrap();

        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].artifact, ArtifactSlot::Metadata);
        assert!(matches!(report.failures[0].error, ArtifactError::MalformedRecord));
        let metadata = load_json_lines(&report.metadata_path).unwrap();
        assert_eq!(metadata.len(), 2);
        assert_eq!(metadata[1]["local"], 1);
        assert_eq!(metadata[1]["episode_index"], 2);
    }

    #[test]
    fn test_short_metadata_log_reports_out_of_range() {
        let dir = TempDir::new().unwrap();
        let config = ShuffleConfig::default();
        let a = dir.path().join("a");
        let b = dir.path().join("b");
        make_source(&a, "a", &[1, 2]);
        let meta_b = make_source(&b, "b", &[1]);
        let meta_a = a.join("meta.jsonl");
        fs::write(&meta_a, "{\"source\": \"a\", \"local\": 0}\n").unwrap();
        let first = SourceDataset::load(&a, &meta_a, &config).unwrap();
        let second = SourceDataset::load(&b, &meta_b, &config).unwrap();
        let target = dir.path().join("merged");

        let report = Interleaver::new(&first, &second, &target, &config)
            .run_with_order(vec![0, 1, 2])
            .unwrap();

        // Three tables but only two records in total.
        assert_eq!(report.episodes.len(), 3);
        assert_eq!(report.rows_written, 4);
        assert_eq!(report.failures.len(), 1);
        let failure = &report.failures[0];
        assert_eq!(failure.artifact, ArtifactSlot::Metadata);
        assert_eq!(failure.episode, 2);
        assert!(matches!(
            failure.error,
            ArtifactError::OutOfRange { index: 2, count: 2 }
        ));
        assert_eq!(report.metadata_records, 2);
        let metadata = load_json_lines(&report.metadata_path).unwrap();
        assert_eq!(metadata.len(), 2);
        assert_eq!(metadata[0]["source"], "a");
        assert_eq!(metadata[1]["source"], "b");
        assert_eq!(metadata[1]["episode_index"], 1);
    }

    #[test]
    fn test_missing_metadata_is_fatal() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("a");
        make_source(&root, "a", &[1]);

        let result = SourceDataset::load(
            &root,
            &root.join("absent.jsonl"),
            &ShuffleConfig::default(),
        );

        assert!(matches!(
            result,
            Err(InterleaveError::Metadata(LoaderError::NotFound(_)))
        ));
    }

    #[test]
    fn test_missing_root_is_fatal() {
        let dir = TempDir::new().unwrap();
        let result = SourceDataset::load(
            &dir.path().join("nowhere"),
            &dir.path().join("meta.jsonl"),
            &ShuffleConfig::default(),
        );
        assert!(matches!(result, Err(InterleaveError::SourceNotFound(_))));
    }

    #[test]
    fn test_rejects_invalid_order() {
        let fx = fixture(&[1, 1], &[1]);
        let interleaver = Interleaver::new(&fx.first, &fx.second, &fx.target, &fx.config);

        for order in [vec![0, 1], vec![0, 1, 1], vec![0, 1, 3]] {
            assert!(matches!(
                interleaver.run_with_order(order),
                Err(InterleaveError::InvalidOrder { expected: 3 })
            ));
        }
        assert!(!fx.target.exists());
    }

    #[test]
    fn test_plan_matches_run_without_writing() {
        let fx = fixture(&[3, 4], &[5]);
        let interleaver = Interleaver::new(&fx.first, &fx.second, &fx.target, &fx.config);

        let plan = interleaver.plan(&[2, 0, 1]);

        assert!(!fx.target.exists());
        assert_eq!(plan.len(), 3);
        assert_eq!(
            plan[0].origin,
            EpisodeOrigin {
                source: SourceId::Second,
                local_index: 0
            }
        );
        assert_eq!(
            plan.iter().map(|p| (p.first_row, p.rows)).collect::<Vec<_>>(),
            vec![(0, 5), (5, 3), (8, 4)]
        );

        let report = interleaver.run_with_order(vec![2, 0, 1]).unwrap();
        for (planned, written) in plan.iter().zip(&report.episodes) {
            assert_eq!(planned.first_row, written.first_row);
            assert_eq!(planned.rows, written.rows);
        }
    }

    #[test]
    fn test_natural_order_joins_artifacts() {
        // Twelve episodes so that episode_10 and episode_11 would sort
        // before episode_2 lexically.
        let rows: Vec<usize> = (1..=12).collect();
        let fx = fixture(&rows, &[1]);
        let interleaver = Interleaver::new(&fx.first, &fx.second, &fx.target, &fx.config);

        let order: Vec<usize> = (0..13).collect();
        let report = interleaver.run_with_order(order).unwrap();

        assert!(report.is_complete());
        for j in 0..12 {
            assert_eq!(video(&fx.target, ArtifactKind::FrontView, j), format!("a-{}-front", j));
            assert_eq!(report.episodes[j].rows, (j + 1) as u64);
        }
    }
}
