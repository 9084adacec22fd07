//! Deterministic star-schema generation and query benchmarking
//!
//! The pipeline has three stages. `datagen` produces the five-dimension
//! star schema and the fact stream from a single top-level seed;
//! `partition` lays the facts out as Hive-partitioned row groups on disk;
//! `bench` drives a query engine over the dataset and gates the results
//! on SLA and regression thresholds, with `metrics` extracting the
//! numbers from the engine's plan traces.

pub mod bench;
pub mod config;
pub mod datagen;
pub mod engine;
pub mod error;
pub mod metrics;
pub mod model;
pub mod partition;
pub mod patterns;
pub mod rng;
