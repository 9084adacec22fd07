//! Fact row type and construction-time invariants
//!
//! Grain: one row per product sold per transaction line. Money is carried
//! as scaled-integer cents, so the measure identities hold exactly.

use crate::starbench::error::{StarbenchError, StarbenchResult};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// One transaction line item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactRow {
    pub transaction_id: u64,
    pub line_item_id: u32,
    pub transaction_date: NaiveDate,
    pub transaction_timestamp: NaiveDateTime,
    pub time_key: i64,
    pub geo_key: i64,
    /// Surrogate key of the product version current at sale time
    pub product_key: i64,
    pub customer_key: i64,
    pub payment_key: i64,
    pub quantity: u32,
    pub unit_price_cents: i64,
    /// quantity * unit_price_cents, exact
    pub revenue_cents: i64,
    pub cost_cents: i64,
    pub discount_cents: i64,
    /// revenue_cents - cost_cents, exact
    pub profit_cents: i64,
    /// Bounded fraction of rows where cost >= revenue is tolerated
    pub is_loss_leader: bool,
}

impl FactRow {
    /// Check the measure invariants. Construction in the generator goes
    /// through this; tests use it for the full join-back audit.
    pub fn check_measures(&self) -> StarbenchResult<()> {
        let expected_revenue = self.quantity as i64 * self.unit_price_cents;
        if self.revenue_cents != expected_revenue {
            return Err(self.violation(format!(
                "revenue {} != quantity {} * unit_price {}",
                self.revenue_cents, self.quantity, self.unit_price_cents
            )));
        }
        if self.profit_cents != self.revenue_cents - self.cost_cents {
            return Err(self.violation(format!(
                "profit {} != revenue {} - cost {}",
                self.profit_cents, self.revenue_cents, self.cost_cents
            )));
        }
        if self.discount_cents < 0 || self.discount_cents > self.revenue_cents {
            return Err(self.violation(format!(
                "discount {} outside [0, revenue {}]",
                self.discount_cents, self.revenue_cents
            )));
        }
        if !self.is_loss_leader && self.cost_cents >= self.revenue_cents {
            return Err(self.violation(format!(
                "cost {} >= revenue {} on a row not flagged as loss-leader",
                self.cost_cents, self.revenue_cents
            )));
        }
        Ok(())
    }

    fn violation(&self, message: String) -> StarbenchError {
        StarbenchError::ReferentialIntegrity {
            message: format!(
                "transaction {} line {}: {}",
                self.transaction_id, self.line_item_id, message
            ),
            dimension: "fact_sales".to_string(),
        }
    }
}
