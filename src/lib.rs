//! # starbench
//!
//! Deterministic star-schema dataset generation and analytical query
//! benchmarking. One seed reproduces the whole dataset byte for byte:
//! five dimension tables (Product versioned as SCD Type 2), a fact table
//! partitioned Hive-style by year and quarter, and a benchmark harness
//! that gates query latencies on per-pattern SLAs and a regression
//! threshold against accepted baselines.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use starbench::config::GenerateConfig;
//! use starbench::datagen;
//! use starbench::rng::StreamManager;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let cfg = GenerateConfig::with_rows(10_000).seed(42);
//!     let streams = StreamManager::new(cfg.seed);
//!     let (schema, facts) = datagen::generate_dataset(&streams, &cfg)?;
//!     println!("{} fact rows, {} products", facts.len(), schema.products.len());
//!     Ok(())
//! }
//! ```

pub mod starbench;

pub use starbench::{
    bench, config, datagen, engine, error, metrics, model, partition, patterns, rng,
};

pub use starbench::bench::{BaselineStore, BenchmarkHarness, BenchmarkResult, DatasetMetadata};
pub use starbench::config::{BenchmarkConfig, CompressionCodec, GenerateConfig};
pub use starbench::engine::{QueryEngine, QueryOutput, ScanEngine};
pub use starbench::error::{StarbenchError, StarbenchResult};
pub use starbench::patterns::QueryPattern;
