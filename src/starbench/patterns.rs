//! Supported analytical query patterns
//!
//! A closed enumeration: each pattern carries its own parameters, builds
//! its SQL, and declares its SLA constant. Dispatch is exhaustive matching
//! everywhere; there is no string-keyed registry to fall out of sync.
//!
//! The SQL text begins with machine-readable marker comments so engines
//! that execute the closed pattern set directly (the bundled scan engine)
//! can dispatch without a SQL parser; real engines just see comments.

/// One named query pattern with its parameters
#[derive(Debug, Clone, PartialEq)]
pub enum QueryPattern {
    /// Revenue/profit aggregation over year, quarter, country, category
    MultiDimensionalAggregation,
    /// Hierarchical drill-down through the time dimension
    DrillDownTime {
        year: i32,
        quarter: Option<u8>,
        month: Option<u32>,
    },
    /// Top-N products by revenue within each category (window function)
    ProductRankings { top_n: u32 },
    /// Moving average of monthly revenue
    MovingAverageRevenue { window: u32 },
    /// Year-over-year revenue growth via LAG over yearly totals
    YoyGrowth,
    /// Pruned scan restricted to one (year, quarter) partition
    PartitionPruning { year: i32, quarter: u8 },
}

impl QueryPattern {
    /// Stable identifier used for baseline lookup and reporting
    pub fn id(&self) -> &'static str {
        match self {
            QueryPattern::MultiDimensionalAggregation => "multi_dimensional_aggregation",
            QueryPattern::DrillDownTime { .. } => "drill_down_time",
            QueryPattern::ProductRankings { .. } => "product_rankings",
            QueryPattern::MovingAverageRevenue { .. } => "moving_average_revenue",
            QueryPattern::YoyGrowth => "yoy_growth",
            QueryPattern::PartitionPruning { .. } => "partition_pruning",
        }
    }

    /// p95 latency target in milliseconds
    pub fn sla_ms(&self) -> f64 {
        match self {
            QueryPattern::MultiDimensionalAggregation => 5_000.0,
            QueryPattern::DrillDownTime { .. } => 2_000.0,
            QueryPattern::ProductRankings { .. } => 3_000.0,
            QueryPattern::MovingAverageRevenue { .. } => 2_000.0,
            QueryPattern::YoyGrowth => 3_000.0,
            QueryPattern::PartitionPruning { .. } => 1_000.0,
        }
    }

    /// Default instantiation of every supported pattern
    pub fn all_default() -> Vec<QueryPattern> {
        vec![
            QueryPattern::MultiDimensionalAggregation,
            QueryPattern::DrillDownTime {
                year: 2024,
                quarter: None,
                month: None,
            },
            QueryPattern::ProductRankings { top_n: 10 },
            QueryPattern::MovingAverageRevenue { window: 3 },
            QueryPattern::YoyGrowth,
            QueryPattern::PartitionPruning {
                year: 2024,
                quarter: 1,
            },
        ]
    }

    /// Marker comment block prepended to the SQL
    fn marker(&self) -> String {
        let params = match self {
            QueryPattern::MultiDimensionalAggregation => String::new(),
            QueryPattern::DrillDownTime { year, quarter, month } => {
                let mut p = format!("year={}", year);
                if let Some(q) = quarter {
                    p.push_str(&format!(" quarter={}", q));
                }
                if let Some(m) = month {
                    p.push_str(&format!(" month={}", m));
                }
                p
            }
            QueryPattern::ProductRankings { top_n } => format!("top_n={}", top_n),
            QueryPattern::MovingAverageRevenue { window } => format!("window={}", window),
            QueryPattern::YoyGrowth => String::new(),
            QueryPattern::PartitionPruning { year, quarter } => {
                format!("year={} quarter={}", year, quarter)
            }
        };
        if params.is_empty() {
            format!("-- pattern: {}\n", self.id())
        } else {
            format!("-- pattern: {}\n-- params: {}\n", self.id(), params)
        }
    }

    /// Build the SQL for this pattern
    pub fn sql(&self) -> String {
        let body = match self {
            QueryPattern::MultiDimensionalAggregation => "\
SELECT dt.year, dt.quarter, dg.country, dp.category,
       SUM(fs.revenue_cents) AS total_revenue,
       SUM(fs.profit_cents) AS total_profit,
       COUNT(*) AS transaction_count
FROM fact_sales fs
JOIN dim_time dt ON fs.time_key = dt.time_key
JOIN dim_geography dg ON fs.geo_key = dg.geo_key
JOIN dim_product dp ON fs.product_key = dp.product_key
GROUP BY dt.year, dt.quarter, dg.country, dp.category
ORDER BY dt.year, dt.quarter, total_revenue DESC"
                .to_string(),
            QueryPattern::DrillDownTime { year, quarter, month } => {
                let mut filters = format!("WHERE dt.year = {}", year);
                if let Some(q) = quarter {
                    filters.push_str(&format!(" AND dt.quarter = {}", q));
                }
                if let Some(m) = month {
                    filters.push_str(&format!(" AND dt.month = {}", m));
                }
                format!(
                    "\
SELECT dt.month, dt.month_name,
       SUM(fs.revenue_cents) AS monthly_revenue,
       COUNT(*) AS transaction_count
FROM fact_sales fs
JOIN dim_time dt ON fs.time_key = dt.time_key
{}
GROUP BY dt.month, dt.month_name
ORDER BY dt.month",
                    filters
                )
            }
            QueryPattern::ProductRankings { top_n } => format!(
                "\
WITH ranked AS (
    SELECT dp.category, dp.product_name,
           SUM(fs.revenue_cents) AS product_revenue,
           ROW_NUMBER() OVER (
               PARTITION BY dp.category
               ORDER BY SUM(fs.revenue_cents) DESC
           ) AS revenue_rank
    FROM fact_sales fs
    JOIN dim_product dp ON fs.product_key = dp.product_key
    GROUP BY dp.category, dp.product_name
)
SELECT * FROM ranked WHERE revenue_rank <= {}
ORDER BY category, revenue_rank",
                top_n
            ),
            QueryPattern::MovingAverageRevenue { window } => format!(
                "\
SELECT dt.year, dt.month,
       SUM(fs.revenue_cents) AS monthly_revenue,
       AVG(SUM(fs.revenue_cents)) OVER (
           ORDER BY dt.year, dt.month
           ROWS BETWEEN {} PRECEDING AND CURRENT ROW
       ) AS moving_avg
FROM fact_sales fs
JOIN dim_time dt ON fs.time_key = dt.time_key
GROUP BY dt.year, dt.month
ORDER BY dt.year, dt.month",
                window.saturating_sub(1)
            ),
            QueryPattern::YoyGrowth => "\
SELECT dt.year,
       SUM(fs.revenue_cents) AS current_year_revenue,
       LAG(SUM(fs.revenue_cents), 1) OVER (ORDER BY dt.year) AS previous_year_revenue,
       ROUND((SUM(fs.revenue_cents) - LAG(SUM(fs.revenue_cents), 1) OVER (ORDER BY dt.year))
             * 100.0 / LAG(SUM(fs.revenue_cents), 1) OVER (ORDER BY dt.year),
             2) AS yoy_growth_pct
FROM fact_sales fs
JOIN dim_time dt ON fs.time_key = dt.time_key
GROUP BY dt.year
ORDER BY dt.year"
                .to_string(),
            QueryPattern::PartitionPruning { year, quarter } => format!(
                "\
SELECT SUM(revenue_cents) AS total_revenue, COUNT(*) AS row_count
FROM fact_sales
WHERE year = {} AND quarter = 'Q{}'",
                year, quarter
            ),
        };
        format!("{}{}", self.marker(), body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_stable_and_distinct() {
        let ids: Vec<&str> = QueryPattern::all_default().iter().map(|p| p.id()).collect();
        let mut deduped = ids.clone();
        deduped.dedup();
        assert_eq!(ids.len(), 6);
        assert_eq!(ids, deduped);
    }

    #[test]
    fn test_yoy_growth_sql_shape() {
        let sql = QueryPattern::YoyGrowth.sql();
        assert!(sql.starts_with("-- pattern: yoy_growth\n"));
        assert!(!sql.contains("-- params:"));
        assert!(sql.contains("LAG(SUM(fs.revenue_cents), 1) OVER (ORDER BY dt.year)"));
        assert!(sql.contains("AS yoy_growth_pct"));
        assert!(sql.contains("GROUP BY dt.year"));
    }

    #[test]
    fn test_sql_carries_pattern_marker() {
        let pattern = QueryPattern::PartitionPruning { year: 2024, quarter: 1 };
        let sql = pattern.sql();
        assert!(sql.starts_with("-- pattern: partition_pruning\n"));
        assert!(sql.contains("-- params: year=2024 quarter=1"));
        assert!(sql.contains("WHERE year = 2024 AND quarter = 'Q1'"));
    }

    #[test]
    fn test_drill_down_filters_compose() {
        let sql = QueryPattern::DrillDownTime {
            year: 2023,
            quarter: Some(2),
            month: Some(5),
        }
        .sql();
        assert!(sql.contains("dt.year = 2023"));
        assert!(sql.contains("dt.quarter = 2"));
        assert!(sql.contains("dt.month = 5"));
    }

    #[test]
    fn test_every_pattern_declares_a_positive_sla() {
        for pattern in QueryPattern::all_default() {
            assert!(pattern.sla_ms() > 0.0, "{} has no SLA", pattern.id());
        }
    }
}
