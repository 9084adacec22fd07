//! Benchmark harness, baselines, and result reporting

pub mod baseline;
pub mod harness;
pub mod report;

pub use baseline::{BaselineEntry, BaselineStore};
pub use harness::BenchmarkHarness;
pub use report::{build_metadata, BenchmarkResult, DatasetMetadata, METADATA_FILE};
