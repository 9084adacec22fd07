//! Partitioned columnar writer
//!
//! Routes fact rows into per-partition buffers and flushes each buffer
//! through the batch-writer primitive once it reaches the configured
//! row-group size or at end-of-stream. Each flush completes atomically via
//! a temporary-name-then-rename sequence, so a failed partition never
//! leaves a half-written file visible to the query engine and never
//! touches its siblings. Flushes to one partition are serialized by
//! construction (single writer owns all buffers); I/O failures retry a
//! bounded number of times before escalating.

use crate::starbench::config::CompressionCodec;
use crate::starbench::error::{StarbenchError, StarbenchResult};
use crate::starbench::model::FactRow;
use crate::starbench::partition::layout::{PartitionKey, PartitionStats};
use flate2::write::GzEncoder;
use flate2::Compression;
use log::{debug, info};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

/// Bounded retries for transient partition-write failures
const MAX_WRITE_RETRIES: u32 = 3;

/// Handle to one completed file, returned by the batch-writer primitive
#[derive(Debug, Clone)]
pub struct WrittenFile {
    pub path: PathBuf,
    pub bytes: u64,
}

/// External columnar-file primitive. Implementations must embed a
/// self-describing schema and complete atomically (no partial file is ever
/// visible under the final name).
pub trait BatchWriter: Send + Sync {
    fn write_batch(
        &self,
        rows: &[FactRow],
        partition_dir: &Path,
        codec: CompressionCodec,
    ) -> io::Result<WrittenFile>;
}

/// Bundled JSON Lines implementation of the batch-writer primitive. The
/// first line is a schema header; rows follow one per line. Gzip is the
/// supported lossless codec. Real columnar engines plug in behind the same
/// trait.
#[derive(Debug, Default)]
pub struct JsonLinesBatchWriter;

/// Columns of the fact table, embedded as the self-describing header
pub const FACT_COLUMNS: [&str; 16] = [
    "transaction_id",
    "line_item_id",
    "transaction_date",
    "transaction_timestamp",
    "time_key",
    "geo_key",
    "product_key",
    "customer_key",
    "payment_key",
    "quantity",
    "unit_price_cents",
    "revenue_cents",
    "cost_cents",
    "discount_cents",
    "profit_cents",
    "is_loss_leader",
];

impl BatchWriter for JsonLinesBatchWriter {
    fn write_batch(
        &self,
        rows: &[FactRow],
        partition_dir: &Path,
        codec: CompressionCodec,
    ) -> io::Result<WrittenFile> {
        fs::create_dir_all(partition_dir)?;

        let file_index = fs::read_dir(partition_dir)?
            .filter_map(|e| e.ok())
            .filter(|e| {
                e.path()
                    .file_name()
                    .map(|n| n.to_string_lossy().starts_with("part-"))
                    .unwrap_or(false)
                    && !e.path().to_string_lossy().ends_with(".tmp")
            })
            .count();

        let extension = match codec {
            CompressionCodec::None => "jsonl",
            CompressionCodec::Gzip => "jsonl.gz",
        };
        let final_path = partition_dir.join(format!("part-{:05}.{}", file_index, extension));
        let tmp_path = partition_dir.join(format!("part-{:05}.{}.tmp", file_index, extension));

        let result = write_table_file(&tmp_path, "fact_sales", &FACT_COLUMNS, rows, codec);
        if result.is_err() {
            // Never leave a half-written file behind
            let _ = fs::remove_file(&tmp_path);
            result?;
        }

        fs::rename(&tmp_path, &final_path)?;
        let bytes = fs::metadata(&final_path)?.len();
        Ok(WrittenFile {
            path: final_path,
            bytes,
        })
    }
}

/// Header line plus one JSON object per row
fn write_jsonl<T: Serialize, W: Write>(
    sink: &mut W,
    table: &str,
    columns: &[&str],
    rows: &[T],
) -> io::Result<()> {
    let header = serde_json::json!({ "table": table, "columns": columns });
    writeln!(sink, "{}", header)?;
    for row in rows {
        serde_json::to_writer(&mut *sink, row)?;
        sink.write_all(b"\n")?;
    }
    Ok(())
}

/// Write and fully finalize one file. The gzip trailer must hit the disk
/// before the caller renames the temp file, so the encoder is finished
/// explicitly here rather than on drop (where errors vanish).
fn write_table_file<T: Serialize>(
    path: &Path,
    table: &str,
    columns: &[&str],
    rows: &[T],
    codec: CompressionCodec,
) -> io::Result<()> {
    let file = fs::File::create(path)?;
    match codec {
        CompressionCodec::None => {
            let mut sink = BufWriter::new(file);
            write_jsonl(&mut sink, table, columns, rows)?;
            sink.flush()
        }
        CompressionCodec::Gzip => {
            let mut encoder = GzEncoder::new(BufWriter::new(file), Compression::default());
            write_jsonl(&mut encoder, table, columns, rows)?;
            encoder.finish()?.flush()
        }
    }
}

/// Routes the fact row stream into per-partition row groups
pub struct PartitionedFactWriter<'a> {
    table_root: PathBuf,
    row_group_size: usize,
    codec: CompressionCodec,
    batch_writer: &'a dyn BatchWriter,
    buffers: BTreeMap<PartitionKey, Vec<FactRow>>,
    stats: BTreeMap<PartitionKey, PartitionStats>,
}

impl<'a> PartitionedFactWriter<'a> {
    pub fn new(
        table_root: impl Into<PathBuf>,
        row_group_size: usize,
        codec: CompressionCodec,
        batch_writer: &'a dyn BatchWriter,
    ) -> Self {
        Self {
            table_root: table_root.into(),
            row_group_size,
            codec,
            batch_writer,
            buffers: BTreeMap::new(),
            stats: BTreeMap::new(),
        }
    }

    /// Route one row to its partition buffer, flushing on row-group boundary
    pub fn write(&mut self, row: FactRow) -> StarbenchResult<()> {
        let key = PartitionKey::from_date(row.transaction_date);
        let buffer = self.buffers.entry(key).or_default();
        buffer.push(row);

        if buffer.len() >= self.row_group_size {
            self.flush_partition(key)?;
        }
        Ok(())
    }

    /// Flush remaining buffers and return per-partition statistics
    pub fn finish(mut self) -> StarbenchResult<BTreeMap<PartitionKey, PartitionStats>> {
        let keys: Vec<PartitionKey> = self.buffers.keys().copied().collect();
        for key in keys {
            self.flush_partition(key)?;
        }
        info!(
            "partitioned write complete: {} partitions under {}",
            self.stats.len(),
            self.table_root.display()
        );
        Ok(self.stats)
    }

    fn flush_partition(&mut self, key: PartitionKey) -> StarbenchResult<()> {
        let rows = match self.buffers.remove(&key) {
            Some(rows) if !rows.is_empty() => rows,
            _ => return Ok(()),
        };
        let partition_dir = self.table_root.join(key.hive_path());

        let mut last_error: Option<io::Error> = None;
        for attempt in 0..MAX_WRITE_RETRIES {
            match self
                .batch_writer
                .write_batch(&rows, &partition_dir, self.codec)
            {
                Ok(written) => {
                    let stats = self.stats.entry(key).or_default();
                    stats.rows += rows.len() as u64;
                    stats.bytes += written.bytes;
                    stats.files += 1;
                    debug!(
                        "flushed {} rows ({} bytes) to {}",
                        rows.len(),
                        written.bytes,
                        written.path.display()
                    );
                    return Ok(());
                }
                Err(e) => {
                    debug!(
                        "write attempt {} for {} failed: {}",
                        attempt + 1,
                        key,
                        e
                    );
                    last_error = Some(e);
                }
            }
        }

        Err(StarbenchError::PartitionWrite {
            message: format!("flush failed after {} attempts", MAX_WRITE_RETRIES),
            partition: key.hive_path(),
            source: last_error.map(|e| e.to_string()),
        })
    }
}

/// Write a whole dimension table as a single self-describing file under
/// `root/<table_name>/`, with the same tmp-then-rename completion as the
/// fact partitions.
pub fn write_dimension_table<T: Serialize>(
    root: &Path,
    table_name: &str,
    columns: &[&str],
    rows: &[T],
    codec: CompressionCodec,
) -> StarbenchResult<WrittenFile> {
    let dir = root.join(table_name);
    fs::create_dir_all(&dir).map_err(|e| StarbenchError::io(&dir, e))?;

    let extension = match codec {
        CompressionCodec::None => "jsonl",
        CompressionCodec::Gzip => "jsonl.gz",
    };
    let final_path = dir.join(format!("{}.{}", table_name, extension));
    let tmp_path = dir.join(format!("{}.{}.tmp", table_name, extension));

    if let Err(e) = write_table_file(&tmp_path, table_name, columns, rows, codec) {
        let _ = fs::remove_file(&tmp_path);
        return Err(StarbenchError::io(&tmp_path, e));
    }
    fs::rename(&tmp_path, &final_path).map_err(|e| StarbenchError::io(&final_path, e))?;
    let bytes = fs::metadata(&final_path)
        .map_err(|e| StarbenchError::io(&final_path, e))?
        .len();
    Ok(WrittenFile {
        path: final_path,
        bytes,
    })
}
