//! starbench command-line interface
//!
//! Three subcommands cover the pipeline end to end: `generate` writes a
//! deterministic partitioned dataset, `benchmark` drives a query engine
//! over it and gates on SLAs and baselines, `analyze` inspects what is on
//! disk.

use clap::{Parser, Subcommand};
use log::{error, info, warn};
use starbench::bench::{build_metadata, BaselineStore, BenchmarkHarness, DatasetMetadata};
use starbench::config::{BenchmarkConfig, CompressionCodec, GenerateConfig};
use starbench::datagen::{self, validate};
use starbench::engine::{QueryEngine, ScanEngine};
use starbench::error::{StarbenchError, StarbenchResult};
use starbench::partition::{write_dimension_table, JsonLinesBatchWriter, PartitionedFactWriter};
use starbench::patterns::QueryPattern;
use starbench::rng::StreamManager;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

const TIME_COLUMNS: [&str; 15] = [
    "time_key", "date", "year", "quarter", "month", "month_name", "week", "day_of_month",
    "day_of_week", "day_name", "is_weekend", "is_holiday", "fiscal_year", "fiscal_quarter",
    "fiscal_period",
];
const GEOGRAPHY_COLUMNS: [&str; 9] = [
    "geo_key", "city", "region", "country", "country_code", "latitude", "longitude",
    "population_segment", "timezone",
];
const PRODUCT_COLUMNS: [&str; 11] = [
    "product_key", "product_id", "product_name", "category", "subcategory", "brand",
    "unit_cost_cents", "unit_price_cents", "effective_date", "expiration_date", "is_current",
];
const CUSTOMER_COLUMNS: [&str; 11] = [
    "customer_key", "customer_id", "first_name", "last_name", "email", "date_of_birth", "gender",
    "income_segment", "customer_segment", "registration_date", "is_active",
];
const PAYMENT_COLUMNS: [&str; 5] = [
    "payment_key", "payment_method", "payment_type", "processing_fee_bps", "is_digital",
];

#[derive(Parser)]
#[command(name = "starbench")]
#[command(about = "Deterministic star-schema dataset generator and query benchmark")]
#[command(version)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a partitioned star-schema dataset
    Generate {
        /// Dataset root directory
        #[arg(short, long, default_value = "./dataset")]
        output: PathBuf,

        /// Top-level seed
        #[arg(long, default_value_t = 42)]
        seed: u64,

        /// Number of fact rows
        #[arg(long, default_value_t = 100_000)]
        rows: usize,

        /// First day of the time dimension (YYYY-MM-DD)
        #[arg(long, default_value = "2022-01-01")]
        start_date: String,

        /// Last day of the time dimension, inclusive (YYYY-MM-DD)
        #[arg(long, default_value = "2024-12-31")]
        end_date: String,

        /// Distinct product business identities
        #[arg(long, default_value_t = 1_000)]
        products: usize,

        /// Customer dimension cardinality
        #[arg(long, default_value_t = 10_000)]
        customers: usize,

        /// Parallel fact-generation workers
        #[arg(long, default_value_t = 1)]
        workers: usize,

        /// Compression codec (none|gzip)
        #[arg(long, default_value = "gzip")]
        compression: String,

        /// Rows per flushed row group
        #[arg(long, default_value_t = 100_000)]
        row_group_size: usize,

        /// Replace an existing dataset at the output path
        #[arg(long)]
        overwrite: bool,
    },

    /// Benchmark the query patterns against a generated dataset
    Benchmark {
        /// Dataset root directory
        #[arg(short, long, default_value = "./dataset")]
        data: PathBuf,

        /// Measured rounds per pattern
        #[arg(long, default_value_t = 5)]
        rounds: usize,

        /// Warmup rounds per pattern, not recorded
        #[arg(long, default_value_t = 2)]
        warmup: usize,

        /// Deadline per engine call in milliseconds
        #[arg(long, default_value_t = 30_000)]
        timeout_ms: u64,

        /// Maximum tolerated relative p95 increase vs baseline
        #[arg(long, default_value_t = 0.05)]
        threshold: f64,

        /// Refuse to run against a dataset generated from a different seed
        #[arg(long)]
        expect_seed: Option<u64>,

        /// Baseline file for regression comparison
        #[arg(long)]
        baseline: Option<PathBuf>,

        /// Record this run's numbers as the new baseline
        #[arg(long)]
        accept_baseline: bool,

        /// Write the full results as JSON to this path
        #[arg(long)]
        report: Option<PathBuf>,
    },

    /// Inspect a generated dataset
    Analyze {
        /// Dataset root directory
        #[arg(short, long, default_value = "./dataset")]
        data: PathBuf,

        /// Also run EXPLAIN ANALYZE for one pattern id
        #[arg(long)]
        pattern: Option<String>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let default_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    match run(cli.command).await {
        Ok(code) => code,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Commands) -> StarbenchResult<ExitCode> {
    match command {
        Commands::Generate {
            output,
            seed,
            rows,
            start_date,
            end_date,
            products,
            customers,
            workers,
            compression,
            row_group_size,
            overwrite,
        } => {
            let mut cfg = GenerateConfig::with_rows(rows).seed(seed).workers(workers);
            cfg.start_date = parse_date("start_date", &start_date)?;
            cfg.end_date = parse_date("end_date", &end_date)?;
            cfg.num_products = products;
            cfg.num_customers = customers;
            cfg.compression = CompressionCodec::parse(&compression)?;
            cfg.row_group_size = row_group_size;
            generate(&output, &cfg, overwrite)?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Benchmark {
            data,
            rounds,
            warmup,
            timeout_ms,
            threshold,
            expect_seed,
            baseline,
            accept_baseline,
            report,
        } => {
            let cfg = BenchmarkConfig {
                warmup_rounds: warmup,
                measure_rounds: rounds,
                regression_threshold: threshold,
                engine_timeout_ms: timeout_ms,
                expect_seed,
                baseline_path: baseline,
            };
            benchmark(&data, cfg, accept_baseline, report.as_deref()).await
        }
        Commands::Analyze { data, pattern } => {
            analyze(&data, pattern.as_deref()).await?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn parse_date(parameter: &str, value: &str) -> StarbenchResult<chrono::NaiveDate> {
    chrono::NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|e| {
        StarbenchError::invalid_config(parameter, format!("'{}' is not YYYY-MM-DD: {}", value, e))
    })
}

fn generate(output: &Path, cfg: &GenerateConfig, overwrite: bool) -> StarbenchResult<()> {
    cfg.validate()?;
    if output.exists() && output.read_dir().map(|mut d| d.next().is_some()).unwrap_or(false) {
        if !overwrite {
            return Err(StarbenchError::invalid_config(
                "output",
                format!("'{}' is not empty (use --overwrite)", output.display()),
            ));
        }
        info!("removing existing dataset at {}", output.display());
        fs::remove_dir_all(output).map_err(|e| StarbenchError::io(output, e))?;
    }
    fs::create_dir_all(output).map_err(|e| StarbenchError::io(output, e))?;

    info!(
        "generating {} fact rows (seed={}, workers={})",
        cfg.fact_rows, cfg.seed, cfg.workers
    );
    let streams = StreamManager::new(cfg.seed);
    let (schema, facts) = datagen::generate_dataset(&streams, cfg)?;

    let integrity = validate::check_referential_integrity(&facts, &schema);
    if !integrity.is_valid() {
        return Err(StarbenchError::ReferentialIntegrity {
            message: format!("post-generation audit failed: {:?}", integrity),
            dimension: "fact_sales".to_string(),
        });
    }
    validate::check_scd2_invariant(&schema)?;
    info!("integrity audit passed for {} fact rows", facts.len());

    write_dimension_table(output, "dim_time", &TIME_COLUMNS, &schema.time, cfg.compression)?;
    write_dimension_table(
        output,
        "dim_geography",
        &GEOGRAPHY_COLUMNS,
        &schema.geography,
        cfg.compression,
    )?;
    write_dimension_table(
        output,
        "dim_product",
        &PRODUCT_COLUMNS,
        &schema.products,
        cfg.compression,
    )?;
    write_dimension_table(
        output,
        "dim_customer",
        &CUSTOMER_COLUMNS,
        &schema.customers,
        cfg.compression,
    )?;
    write_dimension_table(
        output,
        "dim_payment",
        &PAYMENT_COLUMNS,
        &schema.payments,
        cfg.compression,
    )?;

    // Uncompressed line bytes, for the compression ratio in the metadata
    let uncompressed: u64 = match cfg.compression {
        CompressionCodec::None => 0,
        CompressionCodec::Gzip => facts
            .iter()
            .map(|row| {
                serde_json::to_string(row)
                    .map(|s| s.len() as u64 + 1)
                    .unwrap_or(0)
            })
            .sum(),
    };

    let backend = JsonLinesBatchWriter;
    let mut writer = PartitionedFactWriter::new(
        output.join("fact_sales"),
        cfg.row_group_size,
        cfg.compression,
        &backend,
    );
    for row in facts {
        writer.write(row)?;
    }
    let stats = writer.finish()?;

    let compressed: u64 = stats.values().map(|s| s.bytes).sum();
    let compression_ratio = if uncompressed > 0 {
        Some(compressed as f64 / uncompressed as f64)
    } else {
        None
    };
    if let Some(ratio) = compression_ratio {
        info!("fact table compressed to {:.1}% of line size", ratio * 100.0);
    }

    let partitions: BTreeMap<String, _> = stats
        .into_iter()
        .map(|(key, stat)| (key.hive_path(), stat))
        .collect();
    let metadata = build_metadata(
        cfg.seed,
        &schema.row_counts(),
        cfg.start_date,
        cfg.end_date,
        cfg.compression.as_str(),
        compression_ratio,
        partitions,
    );
    metadata.save(output)?;
    info!(
        "dataset complete: {} fact rows in {} partitions under {}",
        metadata.fact_rows,
        metadata.partitions.len(),
        output.display()
    );
    Ok(())
}

async fn benchmark(
    data: &Path,
    cfg: BenchmarkConfig,
    accept_baseline: bool,
    report_path: Option<&Path>,
) -> StarbenchResult<ExitCode> {
    let metadata = DatasetMetadata::load(data)?;
    info!(
        "benchmarking dataset: seed={}, {} fact rows, {} partitions",
        metadata.seed,
        metadata.fact_rows,
        metadata.partitions.len()
    );

    let baseline = match &cfg.baseline_path {
        Some(path) if path.exists() => Some(BaselineStore::load(path)?),
        Some(path) => {
            warn!("baseline file {} not found, skipping comparison", path.display());
            None
        }
        None => None,
    };

    let engine = ScanEngine::new(data);
    let baseline_path = cfg.baseline_path.clone();
    // Seed and layout checks happen inside the harness
    let harness = BenchmarkHarness::new(&engine, cfg, metadata, data)?;
    let results = harness
        .run_all(&QueryPattern::all_default(), baseline.as_ref())
        .await?;

    for result in &results {
        println!("{}", result.summary_line());
        if let Some(reason) = &result.sla_violation {
            println!("    sla: {}", reason);
        }
        if let Some(reason) = &result.regression {
            println!("    regression: {}", reason);
        }
    }

    if let Some(path) = report_path {
        let json = serde_json::to_string_pretty(&results).map_err(|e| StarbenchError::Io {
            message: e.to_string(),
            path: path.display().to_string(),
        })?;
        fs::write(path, json).map_err(|e| StarbenchError::io(path, e))?;
        info!("results written to {}", path.display());
    }

    if accept_baseline {
        let path = baseline_path.ok_or_else(|| {
            StarbenchError::invalid_config("baseline", "--accept-baseline requires --baseline")
        })?;
        let mut store = baseline.unwrap_or_default();
        for result in &results {
            store.accept(result);
        }
        store.save(&path)?;
        info!("baseline updated at {}", path.display());
    }

    let failed = results.iter().filter(|r| !r.passed).count();
    if failed > 0 {
        error!("{} of {} patterns failed", failed, results.len());
        return Ok(ExitCode::FAILURE);
    }
    info!("all {} patterns passed", results.len());
    Ok(ExitCode::SUCCESS)
}

async fn analyze(data: &Path, pattern_id: Option<&str>) -> StarbenchResult<()> {
    let metadata = DatasetMetadata::load(data)?;
    println!("dataset: {}", data.display());
    println!("  seed:        {}", metadata.seed);
    println!("  fact rows:   {}", metadata.fact_rows);
    println!("  date range:  {} .. {}", metadata.start_date, metadata.end_date);
    println!("  scheme:      {}", metadata.partition_scheme);
    println!("  compression: {}", metadata.compression);
    if let Some(ratio) = metadata.compression_ratio {
        println!("  ratio:       {:.3}", ratio);
    }
    println!("  generated:   {}", metadata.generated_at);
    println!("dimensions:");
    for (table, rows) in &metadata.dimension_rows {
        println!("  {:<16} {:>10} rows", table, rows);
    }
    println!("partitions:");
    for (path, stats) in &metadata.partitions {
        println!(
            "  {:<24} {:>10} rows {:>12} bytes {:>3} files",
            path, stats.rows, stats.bytes, stats.files
        );
    }

    if let Some(id) = pattern_id {
        let pattern = QueryPattern::all_default()
            .into_iter()
            .find(|p| p.id() == id)
            .ok_or_else(|| {
                StarbenchError::invalid_config("pattern", format!("unknown pattern '{}'", id))
            })?;
        let engine = ScanEngine::new(data);
        let trace = engine.explain_analyze(&pattern.sql()).await?;
        println!("\nEXPLAIN ANALYZE {}:\n{}", pattern.id(), trace);
    }
    Ok(())
}
