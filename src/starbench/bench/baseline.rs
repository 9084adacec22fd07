//! Baseline storage for regression comparison
//!
//! A flat JSON file keyed by pattern id. Accepting a run's numbers as the
//! new baseline is an explicit operation; the harness itself never writes
//! here.

use crate::starbench::bench::report::BenchmarkResult;
use crate::starbench::error::{StarbenchError, StarbenchResult};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Accepted reference numbers for one pattern
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BaselineEntry {
    pub p95_ms: f64,
    pub rows_scanned: u64,
    pub recorded_at: String,
}

/// All accepted baselines, keyed by pattern id
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BaselineStore {
    pub entries: BTreeMap<String, BaselineEntry>,
}

impl BaselineStore {
    pub fn load(path: &Path) -> StarbenchResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| StarbenchError::io(path, e))?;
        serde_json::from_str(&content).map_err(|e| StarbenchError::Io {
            message: format!("malformed baseline file: {}", e),
            path: path.display().to_string(),
        })
    }

    pub fn save(&self, path: &Path) -> StarbenchResult<()> {
        let json = serde_json::to_string_pretty(self).map_err(|e| StarbenchError::Io {
            message: e.to_string(),
            path: path.display().to_string(),
        })?;
        fs::write(path, json).map_err(|e| StarbenchError::io(path, e))
    }

    pub fn get(&self, pattern_id: &str) -> Option<&BaselineEntry> {
        self.entries.get(pattern_id)
    }

    /// Record a run's numbers as the new reference for its pattern
    pub fn accept(&mut self, result: &BenchmarkResult) {
        self.entries.insert(
            result.pattern_id.clone(),
            BaselineEntry {
                p95_ms: result.p95_ms,
                rows_scanned: result.rows_scanned,
                recorded_at: Utc::now().to_rfc3339(),
            },
        );
    }
}
