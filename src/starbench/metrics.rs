//! Execution-plan trace metrics extraction
//!
//! A pure text-to-record transform over the free-text plan trace returned
//! by the query engine. The recognized grammar is an explicit regex table;
//! operator ordering and optional profiling sections do not matter. A
//! required field that cannot be located is a `MetricsParse` error, never
//! a silent zero: zero metrics would falsely pass an SLA check. Engine
//! format drift is a versioned contract with one test fixture per shape.

use crate::starbench::error::{StarbenchError, StarbenchResult};
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::BTreeSet;

lazy_static! {
    static ref RE_TOTAL_TIME: Regex =
        Regex::new(r"(?i)total\s+time:\s*([0-9]+(?:\.[0-9]+)?)\s*(ms|s)\b").expect("valid regex");
    static ref RE_ROWS_SCANNED: Regex =
        Regex::new(r"(?i)rows\s+scanned:\s*([0-9]+)").expect("valid regex");
    static ref RE_BYTES_SCANNED: Regex =
        Regex::new(r"(?i)bytes\s+scanned:\s*([0-9]+)").expect("valid regex");
    static ref RE_PARTITION_PATH: Regex =
        Regex::new(r"year=\d{4}/quarter=Q[1-4]").expect("valid regex");
    static ref RE_OPERATOR: Regex =
        Regex::new(r"([A-Z][A-Z_]{2,})\s*\(([0-9]+(?:\.[0-9]+)?)\s*(ms|s)\)").expect("valid regex");
}

/// Structured metrics extracted from one plan trace
#[derive(Debug, Clone, PartialEq)]
pub struct PlanMetrics {
    pub wall_time_ms: f64,
    pub rows_scanned: u64,
    pub bytes_scanned: u64,
    /// Distinct partition paths mentioned by scan operators
    pub partitions_hit: usize,
    /// Per-operator timings, when the trace carries a profiling section
    pub operator_timings_ms: Vec<(String, f64)>,
}

/// Parse a plan trace into a metrics record
pub fn parse_plan_trace(trace: &str) -> StarbenchResult<PlanMetrics> {
    let wall_time_ms = {
        let caps = RE_TOTAL_TIME.captures(trace).ok_or_else(|| missing("total_time"))?;
        to_ms(&caps[1], &caps[2]).ok_or_else(|| malformed("total_time", &caps[0]))?
    };

    let rows_scanned = {
        let caps = RE_ROWS_SCANNED
            .captures(trace)
            .ok_or_else(|| missing("rows_scanned"))?;
        caps[1]
            .parse::<u64>()
            .map_err(|_| malformed("rows_scanned", &caps[0]))?
    };

    let bytes_scanned = {
        let caps = RE_BYTES_SCANNED
            .captures(trace)
            .ok_or_else(|| missing("bytes_scanned"))?;
        caps[1]
            .parse::<u64>()
            .map_err(|_| malformed("bytes_scanned", &caps[0]))?
    };

    let partitions: BTreeSet<&str> = RE_PARTITION_PATH
        .find_iter(trace)
        .map(|m| m.as_str())
        .collect();

    let operator_timings_ms = RE_OPERATOR
        .captures_iter(trace)
        .filter_map(|caps| to_ms(&caps[2], &caps[3]).map(|ms| (caps[1].to_string(), ms)))
        .collect();

    Ok(PlanMetrics {
        wall_time_ms,
        rows_scanned,
        bytes_scanned,
        partitions_hit: partitions.len(),
        operator_timings_ms,
    })
}

fn to_ms(value: &str, unit: &str) -> Option<f64> {
    let v = value.parse::<f64>().ok()?;
    if unit.eq_ignore_ascii_case("ms") {
        Some(v)
    } else {
        Some(v * 1000.0)
    }
}

fn missing(field: &str) -> StarbenchError {
    StarbenchError::MetricsParse {
        message: "required field not found in plan trace".to_string(),
        field: field.to_string(),
    }
}

fn malformed(field: &str, text: &str) -> StarbenchError {
    StarbenchError::MetricsParse {
        message: format!("could not parse '{}'", text),
        field: field.to_string(),
    }
}
