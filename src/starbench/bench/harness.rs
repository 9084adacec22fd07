//! Benchmark harness: warmup, measure, aggregate, compare, report
//!
//! Latency per round is the wall time the engine reports in its plan
//! trace, not host-side timing around the call, so results stay
//! comparable across engines that do work outside the measured query.
//! Rounds run sequentially against one engine. Every engine call sits
//! behind a deadline; a hung engine becomes a `Timeout` error instead of
//! a stalled run.

use crate::starbench::bench::baseline::BaselineStore;
use crate::starbench::bench::report::{BenchmarkResult, DatasetMetadata};
use crate::starbench::config::BenchmarkConfig;
use crate::starbench::engine::{QueryEngine, QueryOutput};
use crate::starbench::error::{StarbenchError, StarbenchResult};
use crate::starbench::metrics::{parse_plan_trace, PlanMetrics};
use crate::starbench::patterns::QueryPattern;
use chrono::Utc;
use log::{info, warn};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::path::Path;
use std::time::Duration;
use tokio::time::timeout;

/// Drives one engine through the pattern set
pub struct BenchmarkHarness<'a> {
    engine: &'a dyn QueryEngine,
    config: BenchmarkConfig,
    metadata: DatasetMetadata,
}

impl std::fmt::Debug for BenchmarkHarness<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BenchmarkHarness")
            .field("config", &self.config)
            .field("metadata", &self.metadata)
            .finish_non_exhaustive()
    }
}

impl<'a> BenchmarkHarness<'a> {
    /// Validate the config and the dataset before any query runs. The
    /// metadata record must match the partitions on disk, and the seed it
    /// records must match `expect_seed` when one is configured.
    pub fn new(
        engine: &'a dyn QueryEngine,
        config: BenchmarkConfig,
        metadata: DatasetMetadata,
        dataset_root: &Path,
    ) -> StarbenchResult<Self> {
        config.validate()?;
        if let Some(expected) = config.expect_seed {
            metadata.check_seed(expected)?;
        }
        metadata.verify(dataset_root)?;
        Ok(Self {
            engine,
            config,
            metadata,
        })
    }

    /// Run every pattern and collect the results. A per-pattern engine
    /// failure aborts the run; partial reports are worse than none.
    pub async fn run_all(
        &self,
        patterns: &[QueryPattern],
        baseline: Option<&BaselineStore>,
    ) -> StarbenchResult<Vec<BenchmarkResult>> {
        let mut results = Vec::with_capacity(patterns.len());
        for pattern in patterns {
            results.push(self.run_pattern(pattern, baseline).await?);
        }
        Ok(results)
    }

    /// Benchmark one pattern through all five phases
    pub async fn run_pattern(
        &self,
        pattern: &QueryPattern,
        baseline: Option<&BaselineStore>,
    ) -> StarbenchResult<BenchmarkResult> {
        let sql = pattern.sql();

        for round in 0..self.config.warmup_rounds {
            info!("warmup {}/{} for {}", round + 1, self.config.warmup_rounds, pattern.id());
            self.execute_with_deadline(pattern, &sql).await?;
        }

        let mut measured_ms = Vec::with_capacity(self.config.measure_rounds);
        let mut fingerprints = Vec::with_capacity(self.config.measure_rounds);
        let mut last_metrics: Option<PlanMetrics> = None;
        for round in 0..self.config.measure_rounds {
            let output = self.execute_with_deadline(pattern, &sql).await?;
            let metrics = parse_plan_trace(&output.plan_trace)?;
            info!(
                "measured {}/{} for {}: {:.3}ms",
                round + 1,
                self.config.measure_rounds,
                pattern.id(),
                metrics.wall_time_ms
            );
            measured_ms.push(metrics.wall_time_ms);
            fingerprints.push(fingerprint(&output));
            last_metrics = Some(metrics);
        }
        let metrics = last_metrics.ok_or_else(|| {
            StarbenchError::invalid_config("measure_rounds", "must be greater than zero")
        })?;

        let mut sorted = measured_ms.clone();
        sorted.sort_unstable_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        let p50_ms = percentile(&sorted, 50.0);
        let p95_ms = percentile(&sorted, 95.0);
        let p99_ms = percentile(&sorted, 99.0);

        let sla_ms = pattern.sla_ms();
        let sla_violation = if p95_ms > sla_ms {
            Some(format!("p95 {:.3}ms exceeds SLA {:.0}ms", p95_ms, sla_ms))
        } else {
            None
        };

        let baseline_entry = baseline.and_then(|b| b.get(pattern.id()));
        let regression = baseline_entry.and_then(|entry| {
            let delta = (p95_ms - entry.p95_ms) / entry.p95_ms;
            if delta > self.config.regression_threshold {
                Some(format!(
                    "p95 {:.3}ms is {:.1}% above baseline {:.3}ms (threshold {:.0}%)",
                    p95_ms,
                    delta * 100.0,
                    entry.p95_ms,
                    self.config.regression_threshold * 100.0
                ))
            } else {
                None
            }
        });

        let deterministic = fingerprints.windows(2).all(|w| w[0] == w[1]);
        if !deterministic {
            warn!("{} returned differing result rows across rounds", pattern.id());
        }

        let passed = sla_violation.is_none() && regression.is_none();
        let result = BenchmarkResult {
            pattern_id: pattern.id().to_string(),
            rounds: self.config.measure_rounds,
            measured_ms,
            p50_ms,
            p95_ms,
            p99_ms,
            dataset_rows: self.metadata.fact_rows,
            rows_scanned: metrics.rows_scanned,
            bytes_scanned: metrics.bytes_scanned,
            partitions_hit: metrics.partitions_hit,
            partitions_total: self.metadata.partitions.len(),
            sla_ms,
            sla_violation,
            regression,
            baseline_p95_ms: baseline_entry.map(|e| e.p95_ms),
            deterministic,
            result_fingerprint: fingerprints.first().copied().unwrap_or(0),
            passed,
            completed_at: Utc::now().to_rfc3339(),
        };
        info!("{}", result.summary_line());
        Ok(result)
    }

    async fn execute_with_deadline(
        &self,
        pattern: &QueryPattern,
        sql: &str,
    ) -> StarbenchResult<QueryOutput> {
        let deadline = Duration::from_millis(self.config.engine_timeout_ms);
        match timeout(deadline, self.engine.execute(sql)).await {
            Ok(result) => result,
            Err(_) => Err(StarbenchError::Timeout {
                operation: format!("execute {}", pattern.id()),
                timeout_ms: self.config.engine_timeout_ms,
            }),
        }
    }
}

/// Nearest-rank percentile over an ascending slice
fn percentile(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let rank = ((p / 100.0) * sorted.len() as f64).ceil() as usize;
    sorted[rank.clamp(1, sorted.len()) - 1]
}

fn fingerprint(output: &QueryOutput) -> u64 {
    let mut hasher = DefaultHasher::new();
    for row in &output.rows {
        for value in row {
            value.hash(&mut hasher);
        }
        0xFFu8.hash(&mut hasher);
    }
    hasher.finish()
}
