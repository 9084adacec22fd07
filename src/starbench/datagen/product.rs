//! Product dimension generator with SCD Type 2 history
//!
//! Builds the initial catalog, then replays a Poisson-like number of
//! versioning events per product over the date range. Every event closes
//! the prior version's half-open interval and opens a new one with a fresh
//! surrogate key; the final open interval is the current version. History
//! is append-only: no version row is ever edited after it is pushed.

use crate::starbench::config::GenerateConfig;
use crate::starbench::model::{ProductVersionRow, SENTINEL_EXPIRATION};
use chrono::{Duration, NaiveDate};
use rand::prelude::*;
use rand::rngs::StdRng;

const CATEGORIES: [(&str, [&str; 4]); 5] = [
    (
        "Electronics",
        ["Smartphones", "Laptops", "Tablets", "Accessories"],
    ),
    ("Clothing", ["Mens", "Womens", "Kids", "Accessories"]),
    ("Home & Garden", ["Furniture", "Decor", "Kitchen", "Outdoor"]),
    ("Sports", ["Equipment", "Apparel", "Footwear", "Accessories"]),
    ("Books", ["Fiction", "Non-Fiction", "Educational", "Comics"]),
];

const BRANDS: [&str; 7] = [
    "BrandA", "BrandB", "BrandC", "BrandD", "BrandE", "BrandF", "BrandG",
];

const COLORS: [&str; 10] = [
    "Teal", "Crimson", "Slate", "Amber", "Ivory", "Onyx", "Coral", "Sage", "Indigo", "Pearl",
];

/// Generate all product version rows, ordered by business identity then
/// effective date. Surrogate keys are dense and never reused.
pub fn generate(rng: &mut StdRng, cfg: &GenerateConfig) -> Vec<ProductVersionRow> {
    let mut rows = Vec::new();
    let mut product_key = 1i64;

    for product_idx in 0..cfg.num_products {
        let product_id = format!("PROD-{:05}", product_idx + 1);
        let (category, subcategories) = CATEGORIES[rng.gen_range(0..CATEGORIES.len())];
        let subcategory = subcategories[rng.gen_range(0..subcategories.len())];
        let brand = BRANDS[rng.gen_range(0..BRANDS.len())];
        let color = COLORS[rng.gen_range(0..COLORS.len())];
        let product_name = format!("{} {} {}", brand, subcategory, color);

        let mut unit_cost_cents = rng.gen_range(500..=20_000);
        let mut unit_price_cents = markup(unit_cost_cents, rng);

        let event_dates = sample_event_dates(rng, cfg);

        let mut effective = cfg.start_date;
        for event_date in &event_dates {
            rows.push(ProductVersionRow {
                product_key,
                product_id: product_id.clone(),
                product_name: product_name.clone(),
                category: category.to_string(),
                subcategory: subcategory.to_string(),
                brand: brand.to_string(),
                unit_cost_cents,
                unit_price_cents,
                effective_date: effective,
                expiration_date: *event_date,
                is_current: false,
            });
            product_key += 1;

            // Reprice +/-20%; cost follows from the new price so the
            // catalog margin stays positive.
            unit_price_cents =
                ((unit_price_cents as f64) * rng.gen_range(0.8..1.2)).round() as i64;
            unit_price_cents = unit_price_cents.max(100);
            unit_cost_cents =
                ((unit_price_cents as f64) / rng.gen_range(1.3..2.5)).round() as i64;
            effective = *event_date;
        }

        rows.push(ProductVersionRow {
            product_key,
            product_id,
            product_name,
            category: category.to_string(),
            subcategory: subcategory.to_string(),
            brand: brand.to_string(),
            unit_cost_cents,
            unit_price_cents,
            effective_date: effective,
            expiration_date: SENTINEL_EXPIRATION,
            is_current: true,
        });
        product_key += 1;
    }

    rows
}

/// Sorted, distinct event dates strictly inside (start, end)
fn sample_event_dates(rng: &mut StdRng, cfg: &GenerateConfig) -> Vec<NaiveDate> {
    let lambda = cfg.change_rate * cfg.max_version_events as f64;
    let count = poisson_truncated(rng, lambda, cfg.max_version_events);

    let span_days = (cfg.end_date - cfg.start_date).num_days();
    if count == 0 || span_days < 2 {
        return Vec::new();
    }
    // The rejection loop below needs `count` distinct offsets to exist;
    // short ranges cap the event count instead of spinning.
    let available = (span_days - 1).min(u32::MAX as i64) as u32;
    let count = count.min(available);

    let mut dates = Vec::with_capacity(count as usize);
    while dates.len() < count as usize {
        let offset = rng.gen_range(1..span_days);
        let date = cfg.start_date + Duration::days(offset);
        if !dates.contains(&date) {
            dates.push(date);
        }
    }
    dates.sort_unstable();
    dates
}

/// Poisson sample by inversion, truncated at `max`
fn poisson_truncated(rng: &mut StdRng, lambda: f64, max: u32) -> u32 {
    if lambda <= 0.0 || max == 0 {
        return 0;
    }
    let u: f64 = rng.gen();
    let mut p = (-lambda).exp();
    let mut cumulative = p;
    let mut k = 0u32;
    while u > cumulative && k < max {
        k += 1;
        p *= lambda / k as f64;
        cumulative += p;
    }
    k
}

fn markup(cost_cents: i64, rng: &mut StdRng) -> i64 {
    ((cost_cents as f64) * rng.gen_range(1.3..2.5)).round() as i64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::starbench::rng::{StreamId, StreamManager};
    use std::collections::HashMap;

    fn gen_rows(cfg: &GenerateConfig) -> Vec<ProductVersionRow> {
        let mut rng = StreamManager::new(cfg.seed).derive(StreamId::Product);
        generate(&mut rng, cfg)
    }

    fn by_identity(rows: &[ProductVersionRow]) -> HashMap<&str, Vec<&ProductVersionRow>> {
        let mut map: HashMap<&str, Vec<&ProductVersionRow>> = HashMap::new();
        for row in rows {
            map.entry(row.product_id.as_str()).or_default().push(row);
        }
        map
    }

    #[test]
    fn test_intervals_tile_the_range() {
        let cfg = GenerateConfig::default();
        let rows = gen_rows(&cfg);

        for (product_id, versions) in by_identity(&rows) {
            assert_eq!(
                versions[0].effective_date, cfg.start_date,
                "{} first version must start at range start",
                product_id
            );
            for pair in versions.windows(2) {
                assert_eq!(
                    pair[0].expiration_date, pair[1].effective_date,
                    "{} intervals must be contiguous",
                    product_id
                );
                assert!(pair[0].effective_date < pair[0].expiration_date);
            }
            let current: Vec<_> = versions.iter().filter(|v| v.is_current).collect();
            assert_eq!(current.len(), 1, "{} must have one current version", product_id);
            assert_eq!(current[0].expiration_date, SENTINEL_EXPIRATION);
        }
    }

    #[test]
    fn test_surrogate_keys_dense_and_unique() {
        let rows = gen_rows(&GenerateConfig::default());
        for (i, row) in rows.iter().enumerate() {
            assert_eq!(row.product_key, i as i64 + 1);
        }
    }

    #[test]
    fn test_two_events_produce_three_versions() {
        // Force exactly two events for each product by driving lambda high
        // enough that the truncated Poisson saturates.
        let mut cfg = GenerateConfig::default();
        cfg.num_products = 20;
        cfg.change_rate = 1.0;
        cfg.max_version_events = 2;

        let mut rng = StreamManager::new(42).derive(StreamId::Product);
        let mut saturated = 0;
        for _ in 0..200 {
            if poisson_truncated(&mut rng, 2.0, 2) == 2 {
                saturated += 1;
            }
        }
        assert!(saturated > 0);

        let rows = gen_rows(&cfg);
        let groups = by_identity(&rows);
        let three_version_products: Vec<_> = groups
            .values()
            .filter(|versions| versions.len() == 3)
            .collect();
        assert!(!three_version_products.is_empty());

        for versions in three_version_products {
            assert_eq!(versions[0].effective_date, cfg.start_date);
            assert_eq!(versions[0].expiration_date, versions[1].effective_date);
            assert_eq!(versions[1].expiration_date, versions[2].effective_date);
            assert_eq!(versions[2].expiration_date, SENTINEL_EXPIRATION);
            assert!(versions[2].is_current);
            assert!(!versions[0].is_current && !versions[1].is_current);
        }
    }

    #[test]
    fn test_short_range_terminates_and_caps_events() {
        // A 2-day span offers exactly one interior event date; the sampled
        // event count must clamp to it instead of looping for more.
        let mut cfg = GenerateConfig::default();
        cfg.num_products = 1_000;
        cfg.start_date = NaiveDate::from_ymd_opt(2022, 1, 1).unwrap();
        cfg.end_date = NaiveDate::from_ymd_opt(2022, 1, 3).unwrap();
        cfg.validate().unwrap();

        let rows = gen_rows(&cfg);
        let groups = by_identity(&rows);
        assert_eq!(groups.len(), 1_000);
        for (product_id, versions) in groups {
            assert!(
                versions.len() <= 2,
                "{} has {} versions in a 2-day span",
                product_id,
                versions.len()
            );
        }
    }

    #[test]
    fn test_one_day_range_yields_single_versions() {
        let mut cfg = GenerateConfig::default();
        cfg.num_products = 50;
        cfg.end_date = cfg.start_date;
        cfg.validate().unwrap();

        let rows = gen_rows(&cfg);
        assert_eq!(rows.len(), 50);
        assert!(rows.iter().all(|r| r.is_current));
    }

    #[test]
    fn test_zero_change_rate_yields_single_versions() {
        let mut cfg = GenerateConfig::default();
        cfg.change_rate = 0.0;
        let rows = gen_rows(&cfg);
        assert_eq!(rows.len(), cfg.num_products);
        assert!(rows.iter().all(|r| r.is_current));
    }

    #[test]
    fn test_catalog_margin_positive() {
        let rows = gen_rows(&GenerateConfig::default());
        for row in &rows {
            assert!(
                row.unit_cost_cents < row.unit_price_cents,
                "{} v{} catalog cost must stay below price",
                row.product_id,
                row.product_key
            );
        }
    }

    #[test]
    fn test_deterministic_per_seed() {
        let cfg = GenerateConfig::default();
        assert_eq!(gen_rows(&cfg), gen_rows(&cfg));
    }
}
