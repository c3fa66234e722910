//! Core data types and I/O operations.

pub mod layout;
pub mod loaders;
pub mod table;
pub mod writers;

pub use layout::{ArtifactKind, DatasetLayout};
pub use loaders::{list_files, load_json_lines, natural_cmp, LoaderError};
pub use table::{reindex_table, TableError};
pub use writers::{copy_artifact, write_json_lines, WriteError};
