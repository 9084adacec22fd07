//! Sales fact generator
//!
//! Consumes the dimension key pools and synthesizes exactly the requested
//! number of fact rows. Product selection is Pareto-weighted over business
//! identities and resolved to the surrogate key whose SCD-2 validity
//! interval contains the sampled transaction date; a failed resolution is a
//! fatal referential-integrity violation, never a dropped row.
//!
//! Generation shards across workers by pre-computed disjoint row quotas,
//! one derived stream per worker, concatenated in worker-index order so the
//! output is independent of thread scheduling.

use crate::starbench::config::GenerateConfig;
use crate::starbench::datagen::time::time_key_of;
use crate::starbench::datagen::StarSchema;
use crate::starbench::error::{StarbenchError, StarbenchResult};
use crate::starbench::model::{FactRow, ProductVersionRow};
use crate::starbench::rng::{StreamId, StreamManager};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rand::distributions::WeightedIndex;
use rand::prelude::*;
use rand::rngs::StdRng;

/// Attempts to find a non-loss-leader price/quantity combination with
/// positive margin before the run is aborted
const MAX_RESAMPLE_ATTEMPTS: u32 = 8;

/// Line items per transaction, weights 40/30/15/10/5
const LINE_COUNT_WEIGHTS: [u32; 5] = [40, 30, 15, 10, 5];
/// Quantity 1-5, weights 50/30/12/5/3
const QUANTITY_WEIGHTS: [u32; 5] = [50, 30, 12, 5, 3];

/// One product business identity with its version history sorted by
/// effective date
struct ProductIdentity {
    versions: Vec<VersionRef>,
}

struct VersionRef {
    effective: NaiveDate,
    expiration: NaiveDate,
    product_key: i64,
    unit_price_cents: i64,
    unit_cost_cents: i64,
}

/// Version pool indexed by business identity and date
pub struct ProductIndex {
    identities: Vec<ProductIdentity>,
}

impl ProductIndex {
    /// Group version rows by business identity, preserving first-seen order
    pub fn build(rows: &[ProductVersionRow]) -> Self {
        let mut identities: Vec<ProductIdentity> = Vec::new();
        let mut last_id: Option<&str> = None;

        for row in rows {
            let version = VersionRef {
                effective: row.effective_date,
                expiration: row.expiration_date,
                product_key: row.product_key,
                unit_price_cents: row.unit_price_cents,
                unit_cost_cents: row.unit_cost_cents,
            };
            if last_id == Some(row.product_id.as_str()) {
                if let Some(identity) = identities.last_mut() {
                    identity.versions.push(version);
                }
            } else {
                identities.push(ProductIdentity {
                    versions: vec![version],
                });
                last_id = Some(row.product_id.as_str());
            }
        }

        for identity in &mut identities {
            identity.versions.sort_by_key(|v| v.effective);
        }

        Self { identities }
    }

    pub fn len(&self) -> usize {
        self.identities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.identities.is_empty()
    }

    fn resolve(&self, identity_idx: usize, date: NaiveDate) -> Option<&VersionRef> {
        self.identities[identity_idx]
            .versions
            .iter()
            .find(|v| v.effective <= date && date < v.expiration)
    }
}

/// Pareto weights: the top 20% of items carry `factor` of the total mass
pub fn pareto_weights(n: usize, factor: f64) -> Vec<f64> {
    let head = (n as f64 * 0.2).floor().max(1.0) as usize;
    let head = head.min(n);
    (0..n)
        .map(|i| {
            if i < head {
                factor / head as f64
            } else {
                (1.0 - factor) / (n - head) as f64
            }
        })
        .collect()
}

/// Generate exactly `cfg.fact_rows` rows, sharded across `cfg.workers`
pub fn generate(
    streams: &StreamManager,
    cfg: &GenerateConfig,
    schema: &StarSchema,
) -> StarbenchResult<Vec<FactRow>> {
    let pools = SharedPools::prepare(cfg, schema)?;

    let mut quotas = Vec::with_capacity(cfg.workers);
    let base = cfg.fact_rows / cfg.workers;
    let remainder = cfg.fact_rows % cfg.workers;
    for worker in 0..cfg.workers {
        quotas.push(base + usize::from(worker < remainder));
    }

    let results: Vec<StarbenchResult<Vec<FactRow>>> = std::thread::scope(|scope| {
        let handles: Vec<_> = quotas
            .iter()
            .enumerate()
            .map(|(worker, &quota)| {
                let pools = &pools;
                scope.spawn(move || {
                    let mut rng = streams.derive(StreamId::FactWorker(worker as u32));
                    generate_chunk(&mut rng, cfg, pools, worker as u64, quota)
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|h| h.join().expect("fact worker panicked"))
            .collect()
    });

    let mut rows = Vec::with_capacity(cfg.fact_rows);
    for chunk in results {
        rows.extend(chunk?);
    }
    Ok(rows)
}

/// Read-only pools shared across workers for one run
struct SharedPools<'a> {
    schema: &'a StarSchema,
    products: ProductIndex,
    day_dist: WeightedIndex<f64>,
    product_dist: WeightedIndex<f64>,
    customer_dist: WeightedIndex<f64>,
    line_dist: WeightedIndex<u32>,
    quantity_dist: WeightedIndex<u32>,
}

impl<'a> SharedPools<'a> {
    fn prepare(cfg: &GenerateConfig, schema: &'a StarSchema) -> StarbenchResult<Self> {
        for (name, empty) in [
            ("dim_time", schema.time.is_empty()),
            ("dim_geography", schema.geography.is_empty()),
            ("dim_product", schema.products.is_empty()),
            ("dim_customer", schema.customers.is_empty()),
            ("dim_payment", schema.payments.is_empty()),
        ] {
            if empty {
                return Err(StarbenchError::ReferentialIntegrity {
                    message: "dimension key pool is empty".to_string(),
                    dimension: name.to_string(),
                });
            }
        }

        let products = ProductIndex::build(&schema.products);

        // Uniform days with a Q4 seasonal uplift
        let day_weights: Vec<f64> = schema
            .time
            .iter()
            .map(|d| if d.quarter == 4 { cfg.q4_uplift } else { 1.0 })
            .collect();

        let dist = |weights: &[f64], parameter: &str| {
            WeightedIndex::new(weights.iter().copied()).map_err(|e| {
                StarbenchError::invalid_config(parameter, format!("bad weights: {}", e))
            })
        };

        Ok(Self {
            schema,
            day_dist: dist(&day_weights, "q4_uplift")?,
            product_dist: dist(&pareto_weights(products.len(), cfg.pareto_factor), "pareto_factor")?,
            customer_dist: dist(
                &pareto_weights(schema.customers.len(), cfg.pareto_factor),
                "pareto_factor",
            )?,
            products,
            line_dist: WeightedIndex::new(LINE_COUNT_WEIGHTS).expect("constant weights"),
            quantity_dist: WeightedIndex::new(QUANTITY_WEIGHTS).expect("constant weights"),
        })
    }
}

fn generate_chunk(
    rng: &mut StdRng,
    cfg: &GenerateConfig,
    pools: &SharedPools,
    worker: u64,
    quota: usize,
) -> StarbenchResult<Vec<FactRow>> {
    let mut rows = Vec::with_capacity(quota);
    let mut local_tx: u64 = 0;

    while rows.len() < quota {
        local_tx += 1;
        // Worker index in the high bits keeps transaction ids globally
        // unique without cross-worker coordination.
        let transaction_id = (worker << 40) | local_tx;

        let day = &pools.schema.time[pools.day_dist.sample(rng)];
        let timestamp = NaiveDateTime::new(
            day.date,
            NaiveTime::from_hms_opt(
                rng.gen_range(8..=21),
                rng.gen_range(0..60),
                rng.gen_range(0..60),
            )
            .expect("business-hours time components are valid"),
        );

        let geo = &pools.schema.geography[rng.gen_range(0..pools.schema.geography.len())];
        let customer = &pools.schema.customers[pools.customer_dist.sample(rng)];
        let payment = &pools.schema.payments[rng.gen_range(0..pools.schema.payments.len())];

        let line_count = (pools.line_dist.sample(rng) + 1).min(quota - rows.len());

        for line_item_id in 1..=line_count {
            let row = generate_line(
                rng,
                cfg,
                pools,
                transaction_id,
                line_item_id as u32,
                day.date,
                timestamp,
                geo.geo_key,
                customer.customer_key,
                payment.payment_key,
            )?;
            rows.push(row);
        }
    }

    Ok(rows)
}

#[allow(clippy::too_many_arguments)]
fn generate_line(
    rng: &mut StdRng,
    cfg: &GenerateConfig,
    pools: &SharedPools,
    transaction_id: u64,
    line_item_id: u32,
    date: NaiveDate,
    timestamp: NaiveDateTime,
    geo_key: i64,
    customer_key: i64,
    payment_key: i64,
) -> StarbenchResult<FactRow> {
    let identity_idx = pools.product_dist.sample(rng);
    let version = pools.products.resolve(identity_idx, date).ok_or_else(|| {
        StarbenchError::ReferentialIntegrity {
            message: format!(
                "no product version covers {} for identity index {}",
                date, identity_idx
            ),
            dimension: "dim_product".to_string(),
        }
    })?;

    let is_loss_leader = rng.gen::<f64>() < cfg.loss_leader_rate;

    let mut attempt = 0;
    let (quantity, unit_price_cents) = loop {
        let quantity = pools.quantity_dist.sample(rng) as u32 + 1;
        let unit_price_cents = if is_loss_leader {
            // Priced below cost on purpose
            ((version.unit_cost_cents as f64) * rng.gen_range(0.70..0.95)).round() as i64
        } else {
            ((version.unit_price_cents as f64) * rng.gen_range(0.95..1.05)).round() as i64
        }
        .max(1);

        let revenue = quantity as i64 * unit_price_cents;
        let cost = quantity as i64 * version.unit_cost_cents;
        if is_loss_leader || cost < revenue {
            break (quantity, unit_price_cents);
        }

        attempt += 1;
        if attempt >= MAX_RESAMPLE_ATTEMPTS {
            return Err(StarbenchError::ReferentialIntegrity {
                message: format!(
                    "could not sample a positive-margin combination for product_key {} after {} attempts",
                    version.product_key, MAX_RESAMPLE_ATTEMPTS
                ),
                dimension: "dim_product".to_string(),
            });
        }
    };

    let revenue_cents = quantity as i64 * unit_price_cents;
    let cost_cents = quantity as i64 * version.unit_cost_cents;

    // 20% of lines carry a 5-25% discount
    let discount_cents = if rng.gen::<f64>() < 0.2 {
        let pct = rng.gen_range(0.05..0.25);
        ((revenue_cents as f64 * pct).round() as i64).clamp(0, revenue_cents)
    } else {
        0
    };

    let row = FactRow {
        transaction_id,
        line_item_id,
        transaction_date: date,
        transaction_timestamp: timestamp,
        time_key: time_key_of(date),
        geo_key,
        product_key: version.product_key,
        customer_key,
        payment_key,
        quantity,
        unit_price_cents,
        revenue_cents,
        cost_cents,
        discount_cents,
        profit_cents: revenue_cents - cost_cents,
        is_loss_leader,
    };
    row.check_measures()?;
    Ok(row)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::starbench::datagen;
    use chrono::Timelike;

    fn small_config() -> GenerateConfig {
        let mut cfg = GenerateConfig::with_rows(2_000);
        cfg.num_products = 50;
        cfg.num_customers = 200;
        cfg
    }

    fn generate_all(cfg: &GenerateConfig) -> (StarSchema, Vec<FactRow>) {
        let streams = StreamManager::new(cfg.seed);
        let schema = datagen::generate_dimensions(&streams, cfg).unwrap();
        let facts = generate(&streams, cfg, &schema).unwrap();
        (schema, facts)
    }

    #[test]
    fn test_exact_row_count() {
        let cfg = small_config();
        let (_, facts) = generate_all(&cfg);
        assert_eq!(facts.len(), 2_000);
    }

    #[test]
    fn test_measure_invariants_hold() {
        let cfg = small_config();
        let (_, facts) = generate_all(&cfg);
        for row in &facts {
            row.check_measures().unwrap();
        }
    }

    #[test]
    fn test_loss_leader_fraction_bounded() {
        let mut cfg = GenerateConfig::with_rows(20_000);
        cfg.num_products = 100;
        cfg.num_customers = 500;
        let (_, facts) = generate_all(&cfg);

        let flagged = facts.iter().filter(|r| r.is_loss_leader).count() as f64;
        assert!(flagged / facts.len() as f64 <= 0.015);

        let inverted = facts
            .iter()
            .filter(|r| r.cost_cents >= r.revenue_cents)
            .count();
        assert!(inverted as f64 / facts.len() as f64 <= 0.015);
    }

    #[test]
    fn test_deterministic_across_runs() {
        let cfg = small_config();
        let (_, a) = generate_all(&cfg);
        let (_, b) = generate_all(&cfg);
        assert_eq!(a, b);
    }

    #[test]
    fn test_sharded_output_is_scheduler_independent() {
        let mut cfg = small_config();
        cfg.workers = 4;
        let (_, a) = generate_all(&cfg);
        let (_, b) = generate_all(&cfg);
        assert_eq!(a, b);
        assert_eq!(a.len(), cfg.fact_rows);
    }

    #[test]
    fn test_product_resolution_respects_versions() {
        let cfg = small_config();
        let (schema, facts) = generate_all(&cfg);

        for row in &facts {
            let version = schema
                .products
                .iter()
                .find(|p| p.product_key == row.product_key)
                .expect("product key must exist");
            assert!(
                version.contains(row.transaction_date),
                "product_key {} interval [{}, {}) must contain {}",
                row.product_key,
                version.effective_date,
                version.expiration_date,
                row.transaction_date
            );
        }
    }

    #[test]
    fn test_empty_pool_is_fatal() {
        let cfg = small_config();
        let streams = StreamManager::new(cfg.seed);
        let mut schema = datagen::generate_dimensions(&streams, &cfg).unwrap();
        schema.customers.clear();

        let err = generate(&streams, &cfg, &schema).unwrap_err();
        assert!(matches!(
            err,
            StarbenchError::ReferentialIntegrity { ref dimension, .. } if dimension == "dim_customer"
        ));
    }

    #[test]
    fn test_pareto_weights_shape() {
        let weights = pareto_weights(100, 0.8);
        let head: f64 = weights[..20].iter().sum();
        let tail: f64 = weights[20..].iter().sum();
        assert!((head - 0.8).abs() < 1e-9);
        assert!((tail - 0.2).abs() < 1e-9);
    }

    #[test]
    fn test_quantity_proportions_within_tolerance() {
        let mut cfg = GenerateConfig::with_rows(50_000);
        cfg.num_products = 100;
        cfg.num_customers = 500;
        let (_, facts) = generate_all(&cfg);

        let total = facts.len() as f64;
        let share = |q: u32| facts.iter().filter(|r| r.quantity == q).count() as f64 / total;
        assert!((share(1) - 0.50).abs() < 0.02, "qty=1 share {}", share(1));
        assert!((share(2) - 0.30).abs() < 0.02, "qty=2 share {}", share(2));
        assert!((share(5) - 0.03).abs() < 0.01, "qty=5 share {}", share(5));
    }

    #[test]
    fn test_timestamps_in_business_hours() {
        let cfg = small_config();
        let (_, facts) = generate_all(&cfg);
        for row in facts.iter().take(500) {
            let hour = row.transaction_timestamp.time().hour();
            assert!((8..=21).contains(&hour));
        }
    }
}
