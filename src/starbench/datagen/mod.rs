//! Deterministic star-schema data generation
//!
//! The five dimension generators are independent pure functions of their
//! derived streams, so they run as concurrent tasks with no shared mutable
//! state; a join barrier sits before fact generation, which needs every
//! key pool populated. Determinism contract: identical (seed, config)
//! reproduces byte-identical row sequences, including under sharding,
//! because worker outputs concatenate in worker-index order.

pub mod customer;
pub mod fact;
pub mod geography;
pub mod payment;
pub mod product;
pub mod time;
pub mod validate;

use crate::starbench::config::GenerateConfig;
use crate::starbench::error::StarbenchResult;
use crate::starbench::model::{
    CustomerRow, FactRow, GeographyRow, PaymentRow, ProductVersionRow, TimeRow,
};
use crate::starbench::rng::{StreamId, StreamManager};

/// All dimension tables for one run. Produced once, then shared read-only
/// with the fact generator.
#[derive(Debug, Clone)]
pub struct StarSchema {
    pub time: Vec<TimeRow>,
    pub geography: Vec<GeographyRow>,
    pub products: Vec<ProductVersionRow>,
    pub customers: Vec<CustomerRow>,
    pub payments: Vec<PaymentRow>,
}

impl StarSchema {
    /// Row counts per table, keyed by table name
    pub fn row_counts(&self) -> Vec<(&'static str, u64)> {
        vec![
            ("dim_time", self.time.len() as u64),
            ("dim_geography", self.geography.len() as u64),
            ("dim_product", self.products.len() as u64),
            ("dim_customer", self.customers.len() as u64),
            ("dim_payment", self.payments.len() as u64),
        ]
    }
}

/// Run all five dimension generators concurrently and join
pub fn generate_dimensions(
    streams: &StreamManager,
    cfg: &GenerateConfig,
) -> StarbenchResult<StarSchema> {
    cfg.validate()?;

    let schema = std::thread::scope(|scope| {
        let time_task = scope.spawn(|| time::generate(cfg.start_date, cfg.end_date));
        let geo_task = scope.spawn(|| {
            let mut rng = streams.derive(StreamId::Geography);
            geography::generate(&mut rng, cfg)
        });
        let product_task = scope.spawn(|| {
            let mut rng = streams.derive(StreamId::Product);
            product::generate(&mut rng, cfg)
        });
        let customer_task = scope.spawn(|| {
            let mut rng = streams.derive(StreamId::Customer);
            customer::generate(&mut rng, cfg)
        });
        let payment_task = scope.spawn(payment::generate);

        StarSchema {
            time: time_task.join().expect("time generator panicked"),
            geography: geo_task.join().expect("geography generator panicked"),
            products: product_task.join().expect("product generator panicked"),
            customers: customer_task.join().expect("customer generator panicked"),
            payments: payment_task.join().expect("payment generator panicked"),
        }
    });

    Ok(schema)
}

/// Generate the full dataset: dimensions, then facts against their pools
pub fn generate_dataset(
    streams: &StreamManager,
    cfg: &GenerateConfig,
) -> StarbenchResult<(StarSchema, Vec<FactRow>)> {
    let schema = generate_dimensions(streams, cfg)?;
    let facts = fact::generate(streams, cfg, &schema)?;
    Ok((schema, facts))
}
