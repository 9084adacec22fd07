//! End-to-end benchmark run over a freshly generated dataset

use starbench::bench::{build_metadata, BaselineStore, BenchmarkHarness, DatasetMetadata};
use starbench::config::{BenchmarkConfig, CompressionCodec, GenerateConfig};
use starbench::datagen;
use starbench::engine::ScanEngine;
use starbench::error::StarbenchError;
use starbench::partition::{write_dimension_table, JsonLinesBatchWriter, PartitionedFactWriter};
use starbench::patterns::QueryPattern;
use starbench::rng::StreamManager;
use std::collections::BTreeMap;
use std::path::Path;
use tempfile::TempDir;

fn build_dataset(root: &Path) -> DatasetMetadata {
    let mut cfg = GenerateConfig::with_rows(2_000);
    cfg.num_products = 40;
    cfg.num_customers = 150;
    cfg.compression = CompressionCodec::None;

    let streams = StreamManager::new(cfg.seed);
    let (schema, facts) = datagen::generate_dataset(&streams, &cfg).unwrap();

    write_dimension_table(root, "dim_time", &["time_key"], &schema.time, cfg.compression).unwrap();
    write_dimension_table(
        root,
        "dim_geography",
        &["geo_key", "country"],
        &schema.geography,
        cfg.compression,
    )
    .unwrap();
    write_dimension_table(
        root,
        "dim_product",
        &["product_key", "category"],
        &schema.products,
        cfg.compression,
    )
    .unwrap();
    write_dimension_table(
        root,
        "dim_customer",
        &["customer_key"],
        &schema.customers,
        cfg.compression,
    )
    .unwrap();
    write_dimension_table(
        root,
        "dim_payment",
        &["payment_key"],
        &schema.payments,
        cfg.compression,
    )
    .unwrap();

    let backend = JsonLinesBatchWriter;
    let mut writer = PartitionedFactWriter::new(
        root.join("fact_sales"),
        cfg.row_group_size,
        cfg.compression,
        &backend,
    );
    for row in facts {
        writer.write(row).unwrap();
    }
    let stats = writer.finish().unwrap();

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
        None,
        partitions,
    );
    metadata.save(root).unwrap();
    metadata
}

fn config() -> BenchmarkConfig {
    BenchmarkConfig {
        warmup_rounds: 1,
        measure_rounds: 3,
        ..Default::default()
    }
}

#[tokio::test]
async fn test_full_run_over_generated_dataset() {
    let tmp = TempDir::new().unwrap();
    let metadata = build_dataset(tmp.path());

    let engine = ScanEngine::new(tmp.path());
    let harness =
        BenchmarkHarness::new(&engine, config(), metadata.clone(), tmp.path()).unwrap();
    let results = harness
        .run_all(&QueryPattern::all_default(), None)
        .await
        .unwrap();

    assert_eq!(results.len(), 6);
    for result in &results {
        assert_eq!(result.rounds, 3);
        assert!(result.p50_ms <= result.p95_ms);
        assert!(result.p95_ms <= result.p99_ms);
        assert!(result.deterministic, "{} not deterministic", result.pattern_id);
        // An in-process scan over 2000 rows sits far under every SLA
        assert!(result.sla_violation.is_none(), "{:?}", result.sla_violation);
        assert!(result.passed);
        // Every record carries the dataset size and the pruning denominator
        assert_eq!(result.dataset_rows, metadata.fact_rows);
        assert_eq!(result.partitions_total, metadata.partitions.len());
    }

    let full_scan = results
        .iter()
        .find(|r| r.pattern_id == "multi_dimensional_aggregation")
        .unwrap();
    assert_eq!(full_scan.rows_scanned, metadata.fact_rows);
    assert_eq!(full_scan.partitions_hit, metadata.partitions.len());

    let pruned = results
        .iter()
        .find(|r| r.pattern_id == "partition_pruning")
        .unwrap();
    assert_eq!(pruned.partitions_hit, 1);
    assert!(pruned.partitions_hit < pruned.partitions_total);
    assert!(pruned.rows_scanned < metadata.fact_rows);
}

#[tokio::test]
async fn test_baseline_roundtrip_through_harness() {
    let tmp = TempDir::new().unwrap();
    let metadata = build_dataset(tmp.path());

    let engine = ScanEngine::new(tmp.path());
    let harness = BenchmarkHarness::new(&engine, config(), metadata, tmp.path()).unwrap();
    let pattern = QueryPattern::PartitionPruning { year: 2023, quarter: 3 };

    let reference = harness.run_pattern(&pattern, None).await.unwrap();
    let mut store = BaselineStore::default();
    store.accept(&reference);

    let baseline_path = tmp.path().join("baseline.json");
    store.save(&baseline_path).unwrap();
    let loaded = BaselineStore::load(&baseline_path).unwrap();

    let compared = harness.run_pattern(&pattern, Some(&loaded)).await.unwrap();
    assert_eq!(compared.baseline_p95_ms, Some(reference.p95_ms));
}

#[tokio::test]
async fn test_stale_metadata_is_rejected_before_any_query() {
    let tmp = TempDir::new().unwrap();
    let metadata = build_dataset(tmp.path());

    // Drop one partition from disk; harness construction must fail
    let victim = metadata.partitions.keys().next().unwrap();
    std::fs::remove_dir_all(tmp.path().join("fact_sales").join(victim)).unwrap();

    let engine = ScanEngine::new(tmp.path());
    let err = BenchmarkHarness::new(&engine, config(), metadata, tmp.path()).unwrap_err();
    assert!(matches!(err, StarbenchError::DatasetMismatch { .. }));
}

#[tokio::test]
async fn test_wrong_seed_is_rejected_before_any_query() {
    let tmp = TempDir::new().unwrap();
    let metadata = build_dataset(tmp.path());

    let cfg = BenchmarkConfig {
        expect_seed: Some(metadata.seed + 1),
        ..config()
    };
    let engine = ScanEngine::new(tmp.path());
    let err = BenchmarkHarness::new(&engine, cfg, metadata, tmp.path()).unwrap_err();
    assert!(matches!(err, StarbenchError::DatasetMismatch { .. }));
}
