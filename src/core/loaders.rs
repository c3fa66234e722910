//! Loaders for episode collections and JSON-lines metadata logs.
//!
//! This module provides:
//! - Natural ordering of file names (`episode_2` before `episode_10`)
//! - Listing of an artifact folder in that order
//! - A JSON-lines reader for per-episode metadata

use std::cmp::Ordering;
use std::fs::{self, File};
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use log::{info, warn};
use regex::Regex;
use serde_json::Value;
use thiserror::Error;

/// Errors that can occur during loading.
#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("file not found: {0}")]
    NotFound(PathBuf),

    #[error("IO error reading '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON on line {line} of '{path}': {source}")]
    Json {
        path: PathBuf,
        line: usize,
        #[source]
        source: serde_json::Error,
    },
}

/// Result type for loader operations.
pub type Result<T> = std::result::Result<T, LoaderError>;

fn digit_runs() -> &'static Regex {
    static DIGIT_RUNS: OnceLock<Regex> = OnceLock::new();
    DIGIT_RUNS.get_or_init(|| Regex::new(r"[0-9]+").expect("digit run pattern is valid"))
}

/// One run of a file name, as compared by [`natural_cmp`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NaturalToken {
    /// Non-digit run, lowercased.
    Text(String),
    /// Digit run with leading zeros removed.
    Number(String),
}

impl Ord for NaturalToken {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (NaturalToken::Text(a), NaturalToken::Text(b)) => a.cmp(b),
            // Leading zeros are stripped, so more digits means a larger value.
            (NaturalToken::Number(a), NaturalToken::Number(b)) => {
                a.len().cmp(&b.len()).then_with(|| a.cmp(b))
            }
            (NaturalToken::Number(_), NaturalToken::Text(_)) => Ordering::Less,
            (NaturalToken::Text(_), NaturalToken::Number(_)) => Ordering::Greater,
        }
    }
}

impl PartialOrd for NaturalToken {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Split a name into alternating text and number runs.
///
/// The key always starts with a (possibly empty) text run, so keys of two
/// names line up position by position.
pub fn natural_key(name: &str) -> Vec<NaturalToken> {
    let mut key = Vec::new();
    let mut last = 0;

    for run in digit_runs().find_iter(name) {
        key.push(NaturalToken::Text(name[last..run.start()].to_lowercase()));
        let digits = run.as_str().trim_start_matches('0');
        key.push(NaturalToken::Number(digits.to_string()));
        last = run.end();
    }
    key.push(NaturalToken::Text(name[last..].to_lowercase()));

    key
}

/// Compare two names in natural order.
///
/// Names with equal keys (`ep07` and `ep7`) fall back to byte order so the
/// ordering is total.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    natural_key(a).cmp(&natural_key(b)).then_with(|| a.cmp(b))
}

/// Sort names in natural order, in place.
pub fn natural_sort(names: &mut [String]) {
    names.sort_by_cached_key(|name| (natural_key(name), name.clone()));
}

/// List regular files in `folder` whose name ends with `extension`.
///
/// Returns bare file names in natural order. A missing folder is not an
/// error: a warning is logged and the list is empty.
pub fn list_files(folder: &Path, extension: &str) -> Vec<String> {
    if !folder.is_dir() {
        warn!("Folder does not exist: {}", folder.display());
        return Vec::new();
    }

    let mut files: Vec<String> = fs::read_dir(folder)
        .into_iter()
        .flatten()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.path().is_file())
        .filter_map(|entry| entry.file_name().into_string().ok())
        .filter(|name| name.ends_with(extension))
        .collect();

    natural_sort(&mut files);

    info!(
        "Found {} {} files in {}",
        files.len(),
        extension,
        folder.display()
    );
    files
}

/// Load a JSON-lines file, one value per non-blank line.
///
/// # Errors
///
/// Returns an error if the file is missing or unreadable, or if any
/// non-blank line is not valid JSON.
pub fn load_json_lines<P: AsRef<Path>>(path: P) -> Result<Vec<Value>> {
    let path = path.as_ref();
    if !path.is_file() {
        return Err(LoaderError::NotFound(path.to_path_buf()));
    }

    let file = File::open(path).map_err(|e| LoaderError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    let reader = BufReader::new(file);

    let mut records = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line.map_err(|e| LoaderError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        if line.trim().is_empty() {
            continue;
        }
        let value = serde_json::from_str(&line).map_err(|e| LoaderError::Json {
            path: path.to_path_buf(),
            line: idx + 1,
            source: e,
        })?;
        records.push(value);
    }

    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_natural_sort_numbers() {
        let mut files = names(&["episode_2.mp4", "episode_10.mp4", "episode_1.mp4"]);
        natural_sort(&mut files);
        assert_eq!(files, names(&["episode_1.mp4", "episode_2.mp4", "episode_10.mp4"]));
    }

    #[test]
    fn test_natural_sort_case_insensitive_text() {
        let mut files = names(&["b_1.mp4", "A_2.mp4", "a_1.mp4"]);
        natural_sort(&mut files);
        assert_eq!(files, names(&["a_1.mp4", "A_2.mp4", "b_1.mp4"]));
    }

    #[test]
    fn test_natural_cmp_long_digit_runs() {
        // Longer than u64 can hold.
        let small = "ep_99999999999999999999999.parquet";
        let large = "ep_100000000000000000000000.parquet";
        assert_eq!(natural_cmp(small, large), Ordering::Less);
    }

    #[test]
    fn test_natural_cmp_leading_zeros_tie_break() {
        assert_eq!(natural_key("ep007"), natural_key("ep7"));
        assert_ne!(natural_cmp("ep007", "ep7"), Ordering::Equal);
        assert_eq!(natural_cmp("episode_000002", "episode_10"), Ordering::Less);
    }

    #[test]
    fn test_list_files_filters_and_sorts() {
        let temp_dir = TempDir::new().unwrap();
        for name in ["episode_10.mp4", "episode_2.mp4", "notes.txt", "episode_1.mp4"] {
            File::create(temp_dir.path().join(name)).unwrap();
        }
        fs::create_dir(temp_dir.path().join("nested.mp4")).unwrap();

        let files = list_files(temp_dir.path(), ".mp4");
        assert_eq!(files, names(&["episode_1.mp4", "episode_2.mp4", "episode_10.mp4"]));
    }

    #[test]
    fn test_list_files_missing_folder() {
        let temp_dir = TempDir::new().unwrap();
        let files = list_files(&temp_dir.path().join("absent"), ".parquet");
        assert!(files.is_empty());
    }

    #[test]
    fn test_load_json_lines_skips_blank_lines() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("episodes.jsonl");
        let mut file = File::create(&path).unwrap();
        writeln!(file, r#"{{"episode_index": 0, "length": 10}}"#).unwrap();
        writeln!(file).unwrap();
        writeln!(file, "   ").unwrap();
        writeln!(file, r#"{{"episode_index": 1, "length": 12}}"#).unwrap();

        let records = load_json_lines(&path).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1]["length"], 12);
    }

    #[test]
    fn test_load_json_lines_reports_bad_line() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("episodes.jsonl");
        let mut file = File::create(&path).unwrap();
        writeln!(file, r#"{{"episode_index": 0}}"#).unwrap();
        writeln!(file, "{{not json").unwrap();

        match load_json_lines(&path) {
            Err(LoaderError::Json { line, .. }) => assert_eq!(line, 2),
            other => panic!("Expected Json error, got {:?}", other),
        }
    }

    #[test]
    fn test_load_json_lines_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let result = load_json_lines(temp_dir.path().join("missing.jsonl"));
        assert!(matches!(result, Err(LoaderError::NotFound(_))));
    }
}
