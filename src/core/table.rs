//! Parquet episode tables.
//!
//! Episode tables carry two bookkeeping columns that must be rewritten when
//! an episode moves: `episode_index` (constant within a table) and `index`
//! (a row counter that runs across the whole dataset).

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use arrow::array::{ArrayRef, Int64Array};
use arrow::datatypes::{DataType, Field, FieldRef, Schema, SchemaRef};
use arrow::error::ArrowError;
use arrow::record_batch::RecordBatch;
use log::debug;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::errors::ParquetError;
use parquet::file::properties::WriterProperties;
use thiserror::Error;

use super::writers::{ensure_parent_dirs, WriteError};

/// Column holding the episode number of every row.
pub const EPISODE_INDEX_COLUMN: &str = "episode_index";

/// Column holding the dataset-wide row number.
pub const INDEX_COLUMN: &str = "index";

/// Errors that can occur while rewriting a table.
#[derive(Error, Debug)]
pub enum TableError {
    #[error("IO error on '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parquet error on '{path}': {source}")]
    Parquet {
        path: PathBuf,
        #[source]
        source: ParquetError,
    },

    #[error("arrow error on '{path}': {source}")]
    Arrow {
        path: PathBuf,
        #[source]
        source: ArrowError,
    },

    #[error(transparent)]
    Write(#[from] WriteError),
}

/// Result type for table operations.
pub type Result<T> = std::result::Result<T, TableError>;

fn io_err(path: &Path) -> impl FnOnce(std::io::Error) -> TableError + '_ {
    move |source| TableError::Io {
        path: path.to_path_buf(),
        source,
    }
}

fn parquet_err(path: &Path) -> impl FnOnce(ParquetError) -> TableError + '_ {
    move |source| TableError::Parquet {
        path: path.to_path_buf(),
        source,
    }
}

fn arrow_err(path: &Path) -> impl FnOnce(ArrowError) -> TableError + '_ {
    move |source| TableError::Arrow {
        path: path.to_path_buf(),
        source,
    }
}

/// Read all record batches of a parquet file.
pub fn read_table(path: &Path) -> Result<(SchemaRef, Vec<RecordBatch>)> {
    let file = File::open(path).map_err(io_err(path))?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file).map_err(parquet_err(path))?;
    let schema = builder.schema().clone();
    let reader = builder.build().map_err(parquet_err(path))?;

    let batches = reader
        .collect::<std::result::Result<Vec<_>, ArrowError>>()
        .map_err(arrow_err(path))?;

    Ok((schema, batches))
}

/// Number of rows recorded in the parquet footer.
pub fn row_count(path: &Path) -> Result<u64> {
    let file = File::open(path).map_err(io_err(path))?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file).map_err(parquet_err(path))?;
    Ok(builder.metadata().file_metadata().num_rows().max(0) as u64)
}

/// Write record batches to a snappy-compressed parquet file.
pub fn write_table(path: &Path, schema: SchemaRef, batches: &[RecordBatch]) -> Result<()> {
    ensure_parent_dirs(path)?;

    let file = File::create(path).map_err(io_err(path))?;
    let props = WriterProperties::builder()
        .set_compression(Compression::SNAPPY)
        .build();
    let mut writer = ArrowWriter::try_new(file, schema, Some(props)).map_err(parquet_err(path))?;

    for batch in batches {
        writer.write(batch).map_err(parquet_err(path))?;
    }
    writer.close().map_err(parquet_err(path))?;

    Ok(())
}

/// Source schema with the bookkeeping columns as `Int64`.
///
/// Existing bookkeeping fields keep their position, nullability and metadata
/// but are widened to `Int64` so a dataset-wide row counter always fits.
/// Absent ones are appended.
fn reindexed_schema(source: &Schema) -> SchemaRef {
    let is_bookkeeping = |name: &str| name == EPISODE_INDEX_COLUMN || name == INDEX_COLUMN;

    let mut fields: Vec<FieldRef> = source
        .fields()
        .iter()
        .map(|field| {
            if is_bookkeeping(field.name()) && field.data_type() != &DataType::Int64 {
                Arc::new(field.as_ref().clone().with_data_type(DataType::Int64))
            } else {
                field.clone()
            }
        })
        .collect();
    for name in [EPISODE_INDEX_COLUMN, INDEX_COLUMN] {
        if source.index_of(name).is_err() {
            fields.push(Arc::new(Field::new(name, DataType::Int64, false)));
        }
    }
    Arc::new(Schema::new_with_metadata(fields, source.metadata().clone()))
}

fn reindex_batch(
    batch: &RecordBatch,
    schema: &SchemaRef,
    episode_index: i64,
    start_index: i64,
) -> std::result::Result<RecordBatch, ArrowError> {
    let rows = batch.num_rows();
    let episode_values: ArrayRef = Arc::new(Int64Array::from(vec![episode_index; rows]));
    let index_values: ArrayRef =
        Arc::new(Int64Array::from_iter_values(start_index..start_index + rows as i64));

    let columns = schema
        .fields()
        .iter()
        .enumerate()
        .map(|(i, field)| match field.name().as_str() {
            EPISODE_INDEX_COLUMN => episode_values.clone(),
            INDEX_COLUMN => index_values.clone(),
            _ => batch.column(i).clone(),
        })
        .collect();

    RecordBatch::try_new(schema.clone(), columns)
}

/// Rewrite an episode table for its new position in the merged dataset.
///
/// Every row gets `episode_index = episode_index`. The `index` column is
/// replaced by `start_index, start_index + 1, ...` across all batches. The
/// source is read completely before the target is created.
///
/// # Returns
///
/// The number of rows written.
pub fn reindex_table(
    source: &Path,
    target: &Path,
    episode_index: usize,
    start_index: u64,
) -> Result<u64> {
    let (source_schema, batches) = read_table(source)?;
    let schema = reindexed_schema(&source_schema);

    let mut next = start_index;
    let mut rewritten = Vec::with_capacity(batches.len());
    for batch in &batches {
        let batch = reindex_batch(batch, &schema, episode_index as i64, next as i64)
            .map_err(arrow_err(source))?;
        next += batch.num_rows() as u64;
        rewritten.push(batch);
    }

    write_table(target, schema, &rewritten)?;

    let rows = next - start_index;
    debug!(
        "Reindexed {} -> {} ({} rows, episode {})",
        source.display(),
        target.display(),
        rows,
        episode_index
    );
    Ok(rows)
}
