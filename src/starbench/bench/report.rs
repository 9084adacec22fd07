//! Benchmark result records and dataset metadata
//!
//! Both records are serialized as JSON. The dataset metadata file is
//! written next to the tables at generation time and checked by the
//! benchmark before any query runs, so a stale or foreign dataset fails
//! fast instead of producing misleading numbers.

use crate::starbench::error::{StarbenchError, StarbenchResult};
use crate::starbench::partition::{list_partitions, PartitionStats};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// File name of the metadata record under the dataset root
pub const METADATA_FILE: &str = "dataset_metadata.json";

/// Outcome of benchmarking one query pattern
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchmarkResult {
    pub pattern_id: String,
    /// Measured rounds, after warmup
    pub rounds: usize,
    /// Wall time per measured round, from the parsed plan trace
    pub measured_ms: Vec<f64>,
    pub p50_ms: f64,
    pub p95_ms: f64,
    pub p99_ms: f64,
    /// Fact rows in the verified dataset the pattern ran against
    pub dataset_rows: u64,
    /// Scan statistics from the last measured round
    pub rows_scanned: u64,
    pub bytes_scanned: u64,
    pub partitions_hit: usize,
    /// Partition count of the whole dataset, the pruning denominator
    pub partitions_total: usize,
    pub sla_ms: f64,
    /// Present when p95 exceeded the SLA
    pub sla_violation: Option<String>,
    /// Present when p95 regressed past the threshold vs baseline
    pub regression: Option<String>,
    pub baseline_p95_ms: Option<f64>,
    /// Whether every round produced identical result rows
    pub deterministic: bool,
    pub result_fingerprint: u64,
    /// No SLA violation and no regression
    pub passed: bool,
    pub completed_at: String,
}

impl BenchmarkResult {
    /// One-line human summary for log output
    pub fn summary_line(&self) -> String {
        let verdict = if self.passed { "PASS" } else { "FAIL" };
        format!(
            "{:<32} p50={:>9.3}ms p95={:>9.3}ms p99={:>9.3}ms sla={:>7.0}ms [{}]",
            self.pattern_id, self.p50_ms, self.p95_ms, self.p99_ms, self.sla_ms, verdict
        )
    }
}

/// Record of what one generation run produced
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetMetadata {
    pub seed: u64,
    pub fact_rows: u64,
    /// Per-dimension row counts, keyed by table name
    pub dimension_rows: BTreeMap<String, u64>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub partition_scheme: String,
    pub compression: String,
    /// Compressed bytes over uncompressed line bytes, when gzip was used
    pub compression_ratio: Option<f64>,
    /// Per-partition statistics keyed by Hive path
    pub partitions: BTreeMap<String, PartitionStats>,
    pub generated_at: String,
}

impl DatasetMetadata {
    pub fn save(&self, dataset_root: &Path) -> StarbenchResult<()> {
        let path = dataset_root.join(METADATA_FILE);
        let json = serde_json::to_string_pretty(self).map_err(|e| StarbenchError::Io {
            message: e.to_string(),
            path: path.display().to_string(),
        })?;
        fs::write(&path, json).map_err(|e| StarbenchError::io(&path, e))
    }

    pub fn load(dataset_root: &Path) -> StarbenchResult<Self> {
        let path = dataset_root.join(METADATA_FILE);
        let content = fs::read_to_string(&path).map_err(|e| StarbenchError::io(&path, e))?;
        serde_json::from_str(&content).map_err(|e| StarbenchError::Io {
            message: format!("malformed metadata: {}", e),
            path: path.display().to_string(),
        })
    }

    /// Reject a dataset generated from a different seed than the caller
    /// expects to benchmark against
    pub fn check_seed(&self, expected: u64) -> StarbenchResult<()> {
        if self.seed != expected {
            return Err(StarbenchError::DatasetMismatch {
                expected: format!("seed {}", expected),
                actual: format!("seed {}", self.seed),
            });
        }
        Ok(())
    }

    /// Check that the partitions on disk are exactly the ones this record
    /// describes. Runs before any benchmark query.
    pub fn verify(&self, dataset_root: &Path) -> StarbenchResult<()> {
        let fact_root = dataset_root.join("fact_sales");
        let on_disk = list_partitions(&fact_root).map_err(|e| StarbenchError::io(&fact_root, e))?;
        let found: Vec<String> = on_disk.iter().map(|k| k.hive_path()).collect();
        let recorded: Vec<String> = self.partitions.keys().cloned().collect();
        if found != recorded {
            return Err(StarbenchError::DatasetMismatch {
                expected: format!("{} partitions [{}]", recorded.len(), recorded.join(", ")),
                actual: format!("{} partitions [{}]", found.len(), found.join(", ")),
            });
        }
        Ok(())
    }
}

/// Build the metadata record from generation outputs
pub fn build_metadata(
    seed: u64,
    dimension_rows: &[(&'static str, u64)],
    start_date: NaiveDate,
    end_date: NaiveDate,
    compression: &str,
    compression_ratio: Option<f64>,
    partitions: BTreeMap<String, PartitionStats>,
) -> DatasetMetadata {
    let fact_rows = partitions.values().map(|s| s.rows).sum();
    DatasetMetadata {
        seed,
        fact_rows,
        dimension_rows: dimension_rows
            .iter()
            .map(|(name, count)| (name.to_string(), *count))
            .collect(),
        start_date,
        end_date,
        partition_scheme: "year/quarter".to_string(),
        compression: compression.to_string(),
        compression_ratio,
        partitions,
        generated_at: Utc::now().to_rfc3339(),
    }
}
