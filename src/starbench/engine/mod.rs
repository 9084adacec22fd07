//! Query engine boundary
//!
//! The benchmark harness talks to engines through this trait only. An
//! engine takes SQL text and returns result rows plus the free-text
//! execution-plan trace that the metrics extractor parses. The bundled
//! [`ScanEngine`](scan::ScanEngine) executes the closed pattern set
//! directly against the partitioned dataset; real engines adapt their own
//! client behind the same trait.

pub mod scan;

use crate::starbench::error::StarbenchResult;
use async_trait::async_trait;

pub use scan::ScanEngine;

/// Result of one query execution: the rows (stringified, for fingerprint
/// comparison across rounds) and the plan trace text.
#[derive(Debug, Clone)]
pub struct QueryOutput {
    pub rows: Vec<Vec<String>>,
    pub plan_trace: String,
}

/// Boundary to the system under test
#[async_trait]
pub trait QueryEngine: Send + Sync {
    /// Execute the query and return rows plus an execution-plan trace
    async fn execute(&self, sql: &str) -> StarbenchResult<QueryOutput>;

    /// Return the plan trace without materializing result rows
    async fn explain_analyze(&self, sql: &str) -> StarbenchResult<String> {
        Ok(self.execute(sql).await?.plan_trace)
    }
}
