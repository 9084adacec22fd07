//! Error types for dataset generation and benchmarking
//!
//! One taxonomy for the whole crate. SLA violations and regressions are
//! deliberately *not* represented here: they are expected outcomes of the
//! benchmark Compare step and travel inside the result record instead.

use std::fmt;
use std::io;

/// Main error type for generation, partitioning, and benchmarking operations
#[derive(Debug, Clone)]
pub enum StarbenchError {
    /// Bad parameters, caught before any output is produced
    InvalidConfiguration { message: String, parameter: String },

    /// A foreign key could not be resolved during fact generation.
    /// Fatal: the run aborts rather than silently dropping rows.
    ReferentialIntegrity { message: String, dimension: String },

    /// I/O failure while writing one partition. Sibling partitions are
    /// unaffected; the failed partition never leaves a visible half-written file.
    PartitionWrite {
        message: String,
        partition: String,
        source: Option<String>,
    },

    /// A required field could not be located in an execution-plan trace.
    /// Never coerced to zero metrics.
    MetricsParse { message: String, field: String },

    /// Query engine reported a failure
    Engine {
        message: String,
        sql: Option<String>,
    },

    /// External-engine call exceeded its deadline
    Timeout { operation: String, timeout_ms: u64 },

    /// Filesystem error outside partition writes
    Io { message: String, path: String },

    /// The dataset on disk does not match what the benchmark expects
    DatasetMismatch { expected: String, actual: String },
}

impl fmt::Display for StarbenchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StarbenchError::InvalidConfiguration { message, parameter } => {
                write!(f, "Invalid configuration for '{}': {}", parameter, message)
            }
            StarbenchError::ReferentialIntegrity { message, dimension } => {
                write!(
                    f,
                    "Referential integrity violation in dimension '{}': {}",
                    dimension, message
                )
            }
            StarbenchError::PartitionWrite {
                message,
                partition,
                source,
            } => {
                if let Some(s) = source {
                    write!(
                        f,
                        "Partition write error for '{}': {} ({})",
                        partition, message, s
                    )
                } else {
                    write!(f, "Partition write error for '{}': {}", partition, message)
                }
            }
            StarbenchError::MetricsParse { message, field } => {
                write!(f, "Plan trace parse error, field '{}': {}", field, message)
            }
            StarbenchError::Engine { message, sql } => {
                if let Some(q) = sql {
                    write!(f, "Query engine error: {} (sql: {})", message, q)
                } else {
                    write!(f, "Query engine error: {}", message)
                }
            }
            StarbenchError::Timeout {
                operation,
                timeout_ms,
            } => {
                write!(f, "Operation '{}' timed out after {}ms", operation, timeout_ms)
            }
            StarbenchError::Io { message, path } => {
                write!(f, "IO error for '{}': {}", path, message)
            }
            StarbenchError::DatasetMismatch { expected, actual } => {
                write!(
                    f,
                    "Dataset mismatch: expected {}, found {}",
                    expected, actual
                )
            }
        }
    }
}

impl std::error::Error for StarbenchError {}

impl StarbenchError {
    /// Convenience constructor for configuration errors
    pub fn invalid_config(parameter: &str, message: impl Into<String>) -> Self {
        StarbenchError::InvalidConfiguration {
            message: message.into(),
            parameter: parameter.to_string(),
        }
    }

    /// Convenience constructor for IO errors with path context
    pub fn io(path: &std::path::Path, err: io::Error) -> Self {
        StarbenchError::Io {
            message: err.to_string(),
            path: path.display().to_string(),
        }
    }
}

/// Result type alias for starbench operations
pub type StarbenchResult<T> = Result<T, StarbenchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = StarbenchError::invalid_config("fact_rows", "must be greater than zero");
        assert_eq!(
            err.to_string(),
            "Invalid configuration for 'fact_rows': must be greater than zero"
        );

        let err = StarbenchError::MetricsParse {
            message: "no match in trace".to_string(),
            field: "rows_scanned".to_string(),
        };
        assert!(err.to_string().contains("rows_scanned"));
    }

    #[test]
    fn test_partition_write_display_with_source() {
        let err = StarbenchError::PartitionWrite {
            message: "flush failed".to_string(),
            partition: "year=2023/quarter=Q1".to_string(),
            source: Some("disk full".to_string()),
        };
        let s = err.to_string();
        assert!(s.contains("year=2023/quarter=Q1"));
        assert!(s.contains("disk full"));
    }
}
