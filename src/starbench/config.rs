//! Run configuration for generation and benchmarking
//!
//! Plain validated structs with builder-style setters. Validation happens
//! once, up front; nothing downstream re-checks parameters.

use crate::starbench::error::{StarbenchError, StarbenchResult};
use chrono::NaiveDate;
use std::path::PathBuf;

/// Compression codec passed through to the batch-writer primitive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionCodec {
    None,
    Gzip,
}

impl CompressionCodec {
    pub fn as_str(&self) -> &'static str {
        match self {
            CompressionCodec::None => "none",
            CompressionCodec::Gzip => "gzip",
        }
    }

    pub fn parse(s: &str) -> StarbenchResult<Self> {
        match s {
            "none" => Ok(CompressionCodec::None),
            "gzip" => Ok(CompressionCodec::Gzip),
            other => Err(StarbenchError::invalid_config(
                "compression",
                format!("unknown codec '{}' (expected none|gzip)", other),
            )),
        }
    }
}

/// Configuration for one generation run
#[derive(Debug, Clone)]
pub struct GenerateConfig {
    /// Top-level seed; every sub-stream derives from it
    pub seed: u64,
    /// Exact number of fact rows to produce
    pub fact_rows: usize,
    /// First calendar day of the time dimension
    pub start_date: NaiveDate,
    /// Last calendar day of the time dimension (inclusive)
    pub end_date: NaiveDate,
    /// Distinct product business identities
    pub num_products: usize,
    /// Customer dimension cardinality
    pub num_customers: usize,
    /// Inclusive range for cities sampled under each region
    pub cities_per_region: (u32, u32),
    /// Expected fraction of products receiving versioning events
    pub change_rate: f64,
    /// Upper bound on versioning events per product
    pub max_version_events: u32,
    /// Share of sales mass carried by the top 20% of identities
    pub pareto_factor: f64,
    /// Seasonal multiplier applied to Q4 days when sampling dates
    pub q4_uplift: f64,
    /// Fraction of fact rows flagged as loss-leaders (cost >= revenue tolerated)
    pub loss_leader_rate: f64,
    /// Rows per flushed row group
    pub row_group_size: usize,
    /// Codec handed to the batch writer
    pub compression: CompressionCodec,
    /// Parallel fact-generation workers
    pub workers: usize,
}

impl Default for GenerateConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            fact_rows: 100_000,
            start_date: NaiveDate::from_ymd_opt(2022, 1, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2024, 12, 31).unwrap(),
            num_products: 1_000,
            num_customers: 10_000,
            cities_per_region: (8, 12),
            change_rate: 0.1,
            max_version_events: 3,
            pareto_factor: 0.8,
            q4_uplift: 1.35,
            loss_leader_rate: 0.01,
            row_group_size: 100_000,
            compression: CompressionCodec::Gzip,
            workers: 1,
        }
    }
}

impl GenerateConfig {
    /// Create config with a row target, everything else default
    pub fn with_rows(fact_rows: usize) -> Self {
        Self {
            fact_rows,
            ..Default::default()
        }
    }

    /// Set the top-level seed
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Set the number of fact-generation workers
    pub fn workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// Validate all parameters. Called once at the run boundary; a failure
    /// here never produces partial output.
    pub fn validate(&self) -> StarbenchResult<()> {
        if self.fact_rows == 0 {
            return Err(StarbenchError::invalid_config(
                "fact_rows",
                "must be greater than zero",
            ));
        }
        if self.end_date < self.start_date {
            return Err(StarbenchError::invalid_config(
                "end_date",
                format!(
                    "must not precede start_date ({} < {})",
                    self.end_date, self.start_date
                ),
            ));
        }
        if self.num_products == 0 {
            return Err(StarbenchError::invalid_config(
                "num_products",
                "must be greater than zero",
            ));
        }
        if self.num_customers == 0 {
            return Err(StarbenchError::invalid_config(
                "num_customers",
                "must be greater than zero",
            ));
        }
        if self.cities_per_region.0 == 0 || self.cities_per_region.0 > self.cities_per_region.1 {
            return Err(StarbenchError::invalid_config(
                "cities_per_region",
                "range must be non-empty and ordered",
            ));
        }
        if !(0.0..=1.0).contains(&self.change_rate) {
            return Err(StarbenchError::invalid_config(
                "change_rate",
                "must be within [0, 1]",
            ));
        }
        if !(0.0..1.0).contains(&self.pareto_factor) || self.pareto_factor < 0.5 {
            return Err(StarbenchError::invalid_config(
                "pareto_factor",
                "must be within [0.5, 1.0)",
            ));
        }
        if self.q4_uplift < 1.0 {
            return Err(StarbenchError::invalid_config(
                "q4_uplift",
                "must be at least 1.0",
            ));
        }
        if !(0.0..=0.05).contains(&self.loss_leader_rate) {
            return Err(StarbenchError::invalid_config(
                "loss_leader_rate",
                "must be within [0, 0.05]",
            ));
        }
        if self.row_group_size == 0 {
            return Err(StarbenchError::invalid_config(
                "row_group_size",
                "must be greater than zero",
            ));
        }
        if self.workers == 0 {
            return Err(StarbenchError::invalid_config(
                "workers",
                "must be greater than zero",
            ));
        }
        Ok(())
    }
}

/// Configuration for one benchmark invocation
#[derive(Debug, Clone)]
pub struct BenchmarkConfig {
    /// Warmup executions per pattern, not recorded
    pub warmup_rounds: usize,
    /// Measured executions per pattern
    pub measure_rounds: usize,
    /// Maximum tolerated relative p95 increase vs baseline
    pub regression_threshold: f64,
    /// Deadline around each engine call
    pub engine_timeout_ms: u64,
    /// When set, the dataset metadata must record exactly this seed
    pub expect_seed: Option<u64>,
    /// Optional baseline file for regression comparison
    pub baseline_path: Option<PathBuf>,
}

impl Default for BenchmarkConfig {
    fn default() -> Self {
        Self {
            warmup_rounds: 2,
            measure_rounds: 5,
            regression_threshold: 0.05,
            engine_timeout_ms: 30_000,
            expect_seed: None,
            baseline_path: None,
        }
    }
}

impl BenchmarkConfig {
    /// Set the number of measured rounds
    pub fn rounds(mut self, rounds: usize) -> Self {
        self.measure_rounds = rounds;
        self
    }

    pub fn validate(&self) -> StarbenchResult<()> {
        if self.measure_rounds == 0 {
            return Err(StarbenchError::invalid_config(
                "measure_rounds",
                "must be greater than zero",
            ));
        }
        if !(0.0..=1.0).contains(&self.regression_threshold) {
            return Err(StarbenchError::invalid_config(
                "regression_threshold",
                "must be within [0, 1]",
            ));
        }
        if self.engine_timeout_ms == 0 {
            return Err(StarbenchError::invalid_config(
                "engine_timeout_ms",
                "must be greater than zero",
            ));
        }
        Ok(())
    }
}
