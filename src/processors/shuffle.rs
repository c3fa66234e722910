//! Seeded episode permutation and origin bookkeeping.

use std::fmt;

use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;

/// Which of the two input datasets an episode came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceId {
    First,
    Second,
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceId::First => f.write_str("source1"),
            SourceId::Second => f.write_str("source2"),
        }
    }
}

/// Position of an episode within its input dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EpisodeOrigin {
    pub source: SourceId,
    pub local_index: usize,
}

impl fmt::Display for EpisodeOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.source, self.local_index)
    }
}

/// Map an index into the concatenated sequence back to its source.
///
/// `first_len` is the length of the first source's part of that sequence.
#[inline]
pub fn resolve_origin(combined_index: usize, first_len: usize) -> EpisodeOrigin {
    if combined_index < first_len {
        EpisodeOrigin {
            source: SourceId::First,
            local_index: combined_index,
        }
    } else {
        EpisodeOrigin {
            source: SourceId::Second,
            local_index: combined_index - first_len,
        }
    }
}

/// Fisher-Yates permutation of `0..n`, fully determined by `seed`.
///
/// Entry `j` is the combined index of the episode written at position `j`.
pub fn shuffled_order(n: usize, seed: u64) -> Vec<usize> {
    let mut order: Vec<usize> = (0..n).collect();
    let mut rng = ChaCha20Rng::seed_from_u64(seed);
    order.shuffle(&mut rng);
    order
}

/// Inverse of a permutation: `inverse[order[j]] == j`.
pub fn invert_order(order: &[usize]) -> Vec<usize> {
    let mut inverse = vec![0; order.len()];
    for (j, &orig) in order.iter().enumerate() {
        inverse[orig] = j;
    }
    inverse
}

/// Target file name of the episode at position `j`.
///
/// `extension` includes the leading dot, or is empty.
pub fn episode_file_name(j: usize, extension: &str) -> String {
    format!("episode_{:06}{}", j, extension)
}

/// Extension of a file name including the leading dot, or `""`.
///
/// A leading dot alone (`.hidden`) does not count as an extension.
pub fn file_extension(name: &str) -> &str {
    match name.rfind('.') {
        Some(pos) if pos > 0 => &name[pos..],
        _ => "",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shuffled_order_is_permutation() {
        let order = shuffled_order(250, 42);
        let mut sorted = order.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, (0..250).collect::<Vec<_>>());
    }

    #[test]
    fn test_shuffled_order_reproducible() {
        assert_eq!(shuffled_order(100, 7), shuffled_order(100, 7));
        assert_ne!(shuffled_order(100, 7), shuffled_order(100, 8));
    }

    #[test]
    fn test_shuffled_order_small_inputs() {
        assert!(shuffled_order(0, 42).is_empty());
        assert_eq!(shuffled_order(1, 42), vec![0]);
    }

    #[test]
    fn test_resolve_origin_splits_at_first_len() {
        assert_eq!(
            resolve_origin(1, 2),
            EpisodeOrigin {
                source: SourceId::First,
                local_index: 1
            }
        );
        assert_eq!(
            resolve_origin(2, 2),
            EpisodeOrigin {
                source: SourceId::Second,
                local_index: 0
            }
        );
        assert_eq!(resolve_origin(0, 0).source, SourceId::Second);
    }

    #[test]
    fn test_invert_order() {
        let order = vec![2, 0, 1];
        let inverse = invert_order(&order);
        assert_eq!(inverse, vec![1, 2, 0]);
        for (j, &orig) in order.iter().enumerate() {
            assert_eq!(inverse[orig], j);
        }
    }

    #[test]
    fn test_episode_file_name_zero_padded() {
        assert_eq!(episode_file_name(0, ".parquet"), "episode_000000.parquet");
        assert_eq!(episode_file_name(1234, ".mp4"), "episode_001234.mp4");
        assert_eq!(episode_file_name(1_234_567, ""), "episode_1234567");
    }

    #[test]
    fn test_file_extension() {
        assert_eq!(file_extension("episode_3.mp4"), ".mp4");
        assert_eq!(file_extension("archive.tar.gz"), ".gz");
        assert_eq!(file_extension("README"), "");
        assert_eq!(file_extension(".hidden"), "");
    }
}
