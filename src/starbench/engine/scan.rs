//! Bundled scan engine over the partitioned dataset
//!
//! Executes the closed pattern set directly against the JSON Lines
//! partition layout, dispatching on the marker comments the pattern
//! builder embeds in the SQL. Partition pruning happens by directory
//! path before any file is opened. Every execution emits a plan trace
//! in the shape the metrics extractor parses.

use crate::starbench::engine::{QueryEngine, QueryOutput};
use crate::starbench::error::{StarbenchError, StarbenchResult};
use crate::starbench::model::{FactRow, GeographyRow, ProductVersionRow};
use crate::starbench::partition::{list_partitions, PartitionKey};
use crate::starbench::patterns::QueryPattern;
use async_trait::async_trait;
use chrono::Datelike;
use flate2::read::GzDecoder;
use log::debug;
use serde::de::DeserializeOwned;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::time::Instant;

const MONTH_NAMES: [&str; 12] = [
    "January", "February", "March", "April", "May", "June", "July", "August", "September",
    "October", "November", "December",
];

/// Everything one partition scan produced
struct ScanResult {
    rows: Vec<FactRow>,
    bytes_scanned: u64,
    partitions: Vec<PartitionKey>,
}

/// Query engine that scans the generated dataset in-process
pub struct ScanEngine {
    data_root: PathBuf,
}

impl ScanEngine {
    pub fn new(data_root: impl Into<PathBuf>) -> Self {
        Self {
            data_root: data_root.into(),
        }
    }

    fn fact_root(&self) -> PathBuf {
        self.data_root.join("fact_sales")
    }

    /// Recover the pattern from the marker comments in the SQL text
    fn dispatch(&self, sql: &str) -> StarbenchResult<QueryPattern> {
        let mut pattern_id = None;
        let mut params: HashMap<String, String> = HashMap::new();
        for line in sql.lines() {
            if let Some(rest) = line.strip_prefix("-- pattern:") {
                pattern_id = Some(rest.trim().to_string());
            } else if let Some(rest) = line.strip_prefix("-- params:") {
                for pair in rest.split_whitespace() {
                    if let Some((k, v)) = pair.split_once('=') {
                        params.insert(k.to_string(), v.to_string());
                    }
                }
            }
        }
        let id = pattern_id.ok_or_else(|| StarbenchError::Engine {
            message: "no pattern marker in query text".to_string(),
            sql: Some(sql.lines().next().unwrap_or("").to_string()),
        })?;

        let get_i32 = |key: &str| -> Option<i32> { params.get(key).and_then(|v| v.parse().ok()) };
        let get_u32 = |key: &str| -> Option<u32> { params.get(key).and_then(|v| v.parse().ok()) };

        match id.as_str() {
            "multi_dimensional_aggregation" => Ok(QueryPattern::MultiDimensionalAggregation),
            "drill_down_time" => Ok(QueryPattern::DrillDownTime {
                year: get_i32("year").ok_or_else(|| missing_param(&id, "year"))?,
                quarter: get_u32("quarter").map(|q| q as u8),
                month: get_u32("month"),
            }),
            "product_rankings" => Ok(QueryPattern::ProductRankings {
                top_n: get_u32("top_n").unwrap_or(10),
            }),
            "moving_average_revenue" => Ok(QueryPattern::MovingAverageRevenue {
                window: get_u32("window").unwrap_or(3),
            }),
            "yoy_growth" => Ok(QueryPattern::YoyGrowth),
            "partition_pruning" => Ok(QueryPattern::PartitionPruning {
                year: get_i32("year").ok_or_else(|| missing_param(&id, "year"))?,
                quarter: get_u32("quarter").ok_or_else(|| missing_param(&id, "quarter"))? as u8,
            }),
            other => Err(StarbenchError::Engine {
                message: format!("unsupported pattern '{}'", other),
                sql: None,
            }),
        }
    }

    /// Scan fact partitions, pruning by directory path when a filter is given
    fn scan_facts(&self, prune: Option<PartitionKey>) -> StarbenchResult<ScanResult> {
        let root = self.fact_root();
        let all = list_partitions(&root).map_err(|e| StarbenchError::io(&root, e))?;
        if all.is_empty() {
            return Err(StarbenchError::Engine {
                message: format!("no fact partitions under {}", root.display()),
                sql: None,
            });
        }
        let selected: Vec<PartitionKey> = match prune {
            Some(key) => all.into_iter().filter(|k| *k == key).collect(),
            None => all,
        };

        let mut rows = Vec::new();
        let mut bytes_scanned = 0u64;
        for key in &selected {
            let dir = root.join(key.hive_path());
            bytes_scanned += self.read_partition_dir(&dir, &mut rows)?;
        }
        debug!(
            "scanned {} rows from {} partitions",
            rows.len(),
            selected.len()
        );
        Ok(ScanResult {
            rows,
            bytes_scanned,
            partitions: selected,
        })
    }

    fn read_partition_dir(&self, dir: &Path, out: &mut Vec<FactRow>) -> StarbenchResult<u64> {
        let mut bytes = 0u64;
        let mut files: Vec<PathBuf> = fs::read_dir(dir)
            .map_err(|e| StarbenchError::io(dir, e))?
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| {
                p.file_name()
                    .map(|n| n.to_string_lossy().starts_with("part-"))
                    .unwrap_or(false)
            })
            .collect();
        files.sort_unstable();

        for path in files {
            bytes += fs::metadata(&path)
                .map_err(|e| StarbenchError::io(&path, e))?
                .len();
            for row in read_table_file::<FactRow>(&path)? {
                out.push(row);
            }
        }
        Ok(bytes)
    }

    fn load_dimension<T: DeserializeOwned>(&self, table: &str) -> StarbenchResult<Vec<T>> {
        let dir = self.data_root.join(table);
        for extension in ["jsonl", "jsonl.gz"] {
            let path = dir.join(format!("{}.{}", table, extension));
            if path.exists() {
                return read_table_file(&path);
            }
        }
        Err(StarbenchError::Engine {
            message: format!("dimension table '{}' not found under {}", table, dir.display()),
            sql: None,
        })
    }

    fn run_pattern(&self, pattern: &QueryPattern) -> StarbenchResult<QueryOutput> {
        let started = Instant::now();

        let prune = match pattern {
            QueryPattern::PartitionPruning { year, quarter } => Some(PartitionKey {
                year: *year,
                quarter: *quarter,
            }),
            _ => None,
        };
        let scan = self.scan_facts(prune)?;
        let scan_ms = elapsed_ms(started);

        let compute_started = Instant::now();
        let (rows, operators) = match pattern {
            QueryPattern::MultiDimensionalAggregation => self.multi_dimensional(&scan.rows)?,
            QueryPattern::DrillDownTime { year, quarter, month } => {
                drill_down(&scan.rows, *year, *quarter, *month)
            }
            QueryPattern::ProductRankings { top_n } => self.product_rankings(&scan.rows, *top_n)?,
            QueryPattern::MovingAverageRevenue { window } => moving_average(&scan.rows, *window),
            QueryPattern::YoyGrowth => yoy_growth(&scan.rows),
            QueryPattern::PartitionPruning { .. } => pruned_summary(&scan.rows),
        };
        let compute_ms = elapsed_ms(compute_started);

        let plan_trace = render_trace(
            pattern,
            &scan,
            elapsed_ms(started),
            scan_ms,
            compute_ms,
            &operators,
        );
        Ok(QueryOutput { rows, plan_trace })
    }

    fn multi_dimensional(&self, facts: &[FactRow]) -> StarbenchResult<PatternOutput> {
        let countries: HashMap<i64, String> = self
            .load_dimension::<GeographyRow>("dim_geography")?
            .into_iter()
            .map(|g| (g.geo_key, g.country))
            .collect();
        let categories: HashMap<i64, String> = self
            .load_dimension::<ProductVersionRow>("dim_product")?
            .into_iter()
            .map(|p| (p.product_key, p.category))
            .collect();

        let mut groups: BTreeMap<(i32, u8, String, String), (i64, i64, u64)> = BTreeMap::new();
        for f in facts {
            let country = resolve(&countries, f.geo_key, "dim_geography")?;
            let category = resolve(&categories, f.product_key, "dim_product")?;
            let key = PartitionKey::from_date(f.transaction_date);
            let entry = groups
                .entry((key.year, key.quarter, country, category))
                .or_default();
            entry.0 += f.revenue_cents;
            entry.1 += f.profit_cents;
            entry.2 += 1;
        }

        let rows = groups
            .into_iter()
            .map(|((year, quarter, country, category), (revenue, profit, count))| {
                vec![
                    year.to_string(),
                    quarter.to_string(),
                    country,
                    category,
                    revenue.to_string(),
                    profit.to_string(),
                    count.to_string(),
                ]
            })
            .collect();
        Ok((rows, vec!["HASH_JOIN", "HASH_GROUP_BY", "ORDER_BY"]))
    }

    fn product_rankings(&self, facts: &[FactRow], top_n: u32) -> StarbenchResult<PatternOutput> {
        let products: HashMap<i64, (String, String)> = self
            .load_dimension::<ProductVersionRow>("dim_product")?
            .into_iter()
            .map(|p| (p.product_key, (p.category, p.product_name)))
            .collect();

        let mut revenue: BTreeMap<(String, String), i64> = BTreeMap::new();
        for f in facts {
            let (category, name) = resolve(&products, f.product_key, "dim_product")?;
            *revenue.entry((category, name)).or_default() += f.revenue_cents;
        }

        // Rank within each category by revenue, descending
        let mut by_category: BTreeMap<String, Vec<(String, i64)>> = BTreeMap::new();
        for ((category, name), total) in revenue {
            by_category.entry(category).or_default().push((name, total));
        }

        let mut rows = Vec::new();
        for (category, mut entries) in by_category {
            entries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
            for (rank, (name, total)) in entries.into_iter().take(top_n as usize).enumerate() {
                rows.push(vec![
                    category.clone(),
                    name,
                    total.to_string(),
                    (rank + 1).to_string(),
                ]);
            }
        }
        Ok((rows, vec!["HASH_JOIN", "HASH_GROUP_BY", "WINDOW", "ORDER_BY"]))
    }
}

type PatternOutput = (Vec<Vec<String>>, Vec<&'static str>);

fn drill_down(
    facts: &[FactRow],
    year: i32,
    quarter: Option<u8>,
    month: Option<u32>,
) -> PatternOutput {
    let mut groups: BTreeMap<u32, (i64, u64)> = BTreeMap::new();
    for f in facts {
        let date = f.transaction_date;
        if date.year() != year {
            continue;
        }
        if let Some(q) = quarter {
            if PartitionKey::from_date(date).quarter != q {
                continue;
            }
        }
        if let Some(m) = month {
            if date.month() != m {
                continue;
            }
        }
        let entry = groups.entry(date.month()).or_default();
        entry.0 += f.revenue_cents;
        entry.1 += 1;
    }
    let rows = groups
        .into_iter()
        .map(|(m, (revenue, count))| {
            vec![
                m.to_string(),
                MONTH_NAMES[(m - 1) as usize].to_string(),
                revenue.to_string(),
                count.to_string(),
            ]
        })
        .collect();
    (rows, vec!["FILTER", "HASH_GROUP_BY", "ORDER_BY"])
}

fn moving_average(facts: &[FactRow], window: u32) -> PatternOutput {
    let mut monthly: BTreeMap<(i32, u32), i64> = BTreeMap::new();
    for f in facts {
        *monthly
            .entry((f.transaction_date.year(), f.transaction_date.month()))
            .or_default() += f.revenue_cents;
    }

    let series: Vec<((i32, u32), i64)> = monthly.into_iter().collect();
    let window = window.max(1) as usize;
    let rows = series
        .iter()
        .enumerate()
        .map(|(i, ((year, month), revenue))| {
            let start = i.saturating_sub(window - 1);
            let slice = &series[start..=i];
            let avg = slice.iter().map(|(_, r)| r).sum::<i64>() as f64 / slice.len() as f64;
            vec![
                year.to_string(),
                month.to_string(),
                revenue.to_string(),
                format!("{:.2}", avg),
            ]
        })
        .collect();
    (rows, vec!["HASH_GROUP_BY", "WINDOW", "ORDER_BY"])
}

fn yoy_growth(facts: &[FactRow]) -> PatternOutput {
    let mut yearly: BTreeMap<i32, i64> = BTreeMap::new();
    for f in facts {
        *yearly.entry(f.transaction_date.year()).or_default() += f.revenue_cents;
    }

    let mut previous: Option<i64> = None;
    let rows = yearly
        .into_iter()
        .map(|(year, revenue)| {
            // First year has no prior total, so the growth column is empty
            let growth = match previous {
                Some(prev) if prev != 0 => {
                    format!("{:.2}", (revenue - prev) as f64 * 100.0 / prev as f64)
                }
                _ => String::new(),
            };
            previous = Some(revenue);
            vec![year.to_string(), revenue.to_string(), growth]
        })
        .collect();
    (rows, vec!["HASH_GROUP_BY", "WINDOW", "ORDER_BY"])
}

fn pruned_summary(facts: &[FactRow]) -> PatternOutput {
    let revenue: i64 = facts.iter().map(|f| f.revenue_cents).sum();
    let rows = vec![vec![revenue.to_string(), facts.len().to_string()]];
    (rows, vec!["FILTER", "AGGREGATE"])
}

fn resolve<T: Clone>(
    index: &HashMap<i64, T>,
    key: i64,
    dimension: &str,
) -> StarbenchResult<T> {
    index.get(&key).cloned().ok_or_else(|| StarbenchError::ReferentialIntegrity {
        message: format!("fact references unknown key {}", key),
        dimension: dimension.to_string(),
    })
}

fn elapsed_ms(since: Instant) -> f64 {
    since.elapsed().as_secs_f64() * 1000.0
}

fn render_trace(
    pattern: &QueryPattern,
    scan: &ScanResult,
    total_ms: f64,
    scan_ms: f64,
    compute_ms: f64,
    operators: &[&str],
) -> String {
    let partitions: Vec<String> = scan.partitions.iter().map(|k| k.hive_path()).collect();
    let mut trace = format!(
        "QUERY PROFILE: {}\n\
         Total Time: {:.3}ms\n\
         Rows Scanned: {}\n\
         Bytes Scanned: {}\n\
         Partitions: {}\n\
         Operators:\n  PARTITION_SCAN ({:.3}ms)\n",
        pattern.id(),
        total_ms,
        scan.rows.len(),
        scan.bytes_scanned,
        partitions.join(", "),
        scan_ms,
    );
    // Attribute compute time evenly across the logical operators; the
    // extractor only requires names and per-operator times to be present.
    let per_op = compute_ms / operators.len().max(1) as f64;
    for op in operators {
        trace.push_str(&format!("  {} ({:.3}ms)\n", op, per_op));
    }
    trace
}

#[async_trait]
impl QueryEngine for ScanEngine {
    async fn execute(&self, sql: &str) -> StarbenchResult<QueryOutput> {
        let pattern = self.dispatch(sql)?;
        self.run_pattern(&pattern)
    }
}

fn missing_param(pattern: &str, param: &str) -> StarbenchError {
    StarbenchError::Engine {
        message: format!("pattern '{}' requires parameter '{}'", pattern, param),
        sql: None,
    }
}

/// Read one self-describing JSON Lines table file, skipping the schema
/// header line. Gzip is detected by extension.
fn read_table_file<T: DeserializeOwned>(path: &Path) -> StarbenchResult<Vec<T>> {
    let file = fs::File::open(path).map_err(|e| StarbenchError::io(path, e))?;
    let reader: Box<dyn Read> = if path.to_string_lossy().ends_with(".gz") {
        Box::new(GzDecoder::new(file))
    } else {
        Box::new(file)
    };

    let mut rows = Vec::new();
    for (index, line) in BufReader::new(reader).lines().enumerate() {
        let line = line.map_err(|e| StarbenchError::io(path, e))?;
        if index == 0 || line.is_empty() {
            continue;
        }
        let row: T = serde_json::from_str(&line).map_err(|e| StarbenchError::Engine {
            message: format!("bad record at {}:{}: {}", path.display(), index + 1, e),
            sql: None,
        })?;
        rows.push(row);
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::starbench::config::{CompressionCodec, GenerateConfig};
    use crate::starbench::datagen;
    use crate::starbench::metrics::parse_plan_trace;
    use crate::starbench::partition::{
        write_dimension_table, JsonLinesBatchWriter, PartitionedFactWriter,
    };
    use crate::starbench::rng::StreamManager;
    use tempfile::TempDir;

    fn write_small_dataset(root: &Path) -> usize {
        let mut cfg = GenerateConfig::with_rows(2_000);
        cfg.num_products = 30;
        cfg.num_customers = 100;
        cfg.compression = CompressionCodec::None;
        let streams = StreamManager::new(7);
        let (schema, facts) = datagen::generate_dataset(&streams, &cfg).unwrap();
        let total = facts.len();

        write_dimension_table(
            root,
            "dim_geography",
            &["geo_key", "city", "region", "country"],
            &schema.geography,
            cfg.compression,
        )
        .unwrap();
        write_dimension_table(
            root,
            "dim_product",
            &["product_key", "product_id", "category"],
            &schema.products,
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
        writer.finish().unwrap();
        total
    }

    #[tokio::test]
    async fn test_pruned_scan_touches_one_partition() {
        let tmp = TempDir::new().unwrap();
        write_small_dataset(tmp.path());
        let engine = ScanEngine::new(tmp.path());

        let sql = QueryPattern::PartitionPruning { year: 2023, quarter: 2 }.sql();
        let output = engine.execute(&sql).await.unwrap();
        let metrics = parse_plan_trace(&output.plan_trace).unwrap();

        assert_eq!(metrics.partitions_hit, 1);
        assert_eq!(output.rows.len(), 1);
        let counted: u64 = output.rows[0][1].parse().unwrap();
        assert_eq!(metrics.rows_scanned, counted);
    }

    #[tokio::test]
    async fn test_full_scan_reads_every_partition_and_row() {
        let tmp = TempDir::new().unwrap();
        let total = write_small_dataset(tmp.path());
        let engine = ScanEngine::new(tmp.path());

        let sql = QueryPattern::MultiDimensionalAggregation.sql();
        let output = engine.execute(&sql).await.unwrap();
        let metrics = parse_plan_trace(&output.plan_trace).unwrap();

        assert_eq!(metrics.rows_scanned, total as u64);
        // 2022-2024 date range covers 12 quarters
        assert_eq!(metrics.partitions_hit, 12);
        assert!(!output.rows.is_empty());
        assert!(metrics.bytes_scanned > 0);
    }

    #[tokio::test]
    async fn test_rankings_respect_top_n() {
        let tmp = TempDir::new().unwrap();
        write_small_dataset(tmp.path());
        let engine = ScanEngine::new(tmp.path());

        let output = engine
            .execute(&QueryPattern::ProductRankings { top_n: 3 }.sql())
            .await
            .unwrap();
        let mut per_category: HashMap<&str, u32> = HashMap::new();
        for row in &output.rows {
            *per_category.entry(row[0].as_str()).or_default() += 1;
            let rank: u32 = row[3].parse().unwrap();
            assert!(rank >= 1 && rank <= 3);
        }
        assert!(per_category.values().all(|&n| n <= 3));
    }

    #[tokio::test]
    async fn test_repeated_execution_is_deterministic() {
        let tmp = TempDir::new().unwrap();
        write_small_dataset(tmp.path());
        let engine = ScanEngine::new(tmp.path());

        let sql = QueryPattern::MovingAverageRevenue { window: 3 }.sql();
        let first = engine.execute(&sql).await.unwrap();
        let second = engine.execute(&sql).await.unwrap();
        assert_eq!(first.rows, second.rows);
    }

    #[tokio::test]
    async fn test_yoy_growth_reports_one_row_per_year() {
        let tmp = TempDir::new().unwrap();
        write_small_dataset(tmp.path());
        let engine = ScanEngine::new(tmp.path());

        let output = engine.execute(&QueryPattern::YoyGrowth.sql()).await.unwrap();
        assert_eq!(output.rows.len(), 3);
        assert_eq!(output.rows[0][0], "2022");
        assert!(output.rows[0][2].is_empty(), "first year has no prior total");
        for row in &output.rows[1..] {
            let prev_idx = row[0].parse::<usize>().unwrap() - 2022 - 1;
            let prev: f64 = output.rows[prev_idx][1].parse().unwrap();
            let current: f64 = row[1].parse().unwrap();
            let reported: f64 = row[2].parse().unwrap();
            let expected = (current - prev) * 100.0 / prev;
            assert!((reported - expected).abs() < 0.01);
        }
    }

    #[tokio::test]
    async fn test_unmarked_sql_is_rejected() {
        let tmp = TempDir::new().unwrap();
        let engine = ScanEngine::new(tmp.path());
        let err = engine.execute("SELECT 1").await.unwrap_err();
        assert!(matches!(err, StarbenchError::Engine { .. }));
    }
}
