//! Dimension row types
//!
//! All rows are immutable value types with dense, generator-assigned
//! surrogate keys. Product is the only versioned dimension (SCD Type 2);
//! its history is an append-only sequence of version rows per business
//! identity, and "current" is derivable from the open-ended interval
//! rather than a mutated flag.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Open-ended expiration sentinel for the current product version
pub const SENTINEL_EXPIRATION: NaiveDate = match NaiveDate::from_ymd_opt(9999, 12, 31) {
    Some(d) => d,
    None => panic!("sentinel date is valid"),
};

/// One calendar day. Cardinality of the dimension is exactly the number
/// of days in the configured range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeRow {
    /// Surrogate key in yyyymmdd form
    pub time_key: i64,
    pub date: NaiveDate,
    pub year: i32,
    /// Calendar quarter 1-4
    pub quarter: u8,
    pub month: u32,
    pub month_name: String,
    /// ISO week number
    pub week: u32,
    pub day_of_month: u32,
    /// 1 = Monday .. 7 = Sunday
    pub day_of_week: u32,
    pub day_name: String,
    pub is_weekend: bool,
    pub is_holiday: bool,
    /// Fiscal year starts in February
    pub fiscal_year: i32,
    pub fiscal_quarter: String,
    pub fiscal_period: String,
}

/// One city in the region -> country -> city hierarchy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeographyRow {
    pub geo_key: i64,
    pub city: String,
    pub region: String,
    pub country: String,
    pub country_code: String,
    pub latitude: f64,
    pub longitude: f64,
    pub population_segment: String,
    pub timezone: String,
}

/// One version of one product business identity (SCD Type 2)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductVersionRow {
    /// Surrogate key, unique per version
    pub product_key: i64,
    /// Stable business identifier shared across versions
    pub product_id: String,
    pub product_name: String,
    pub category: String,
    pub subcategory: String,
    pub brand: String,
    /// Scaled-integer money: cents
    pub unit_cost_cents: i64,
    pub unit_price_cents: i64,
    pub effective_date: NaiveDate,
    /// Exclusive upper bound; SENTINEL_EXPIRATION when open-ended
    pub expiration_date: NaiveDate,
    pub is_current: bool,
}

impl ProductVersionRow {
    /// Whether this version's half-open validity interval contains `date`
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.effective_date <= date && date < self.expiration_date
    }

    pub fn is_open_ended(&self) -> bool {
        self.expiration_date == SENTINEL_EXPIRATION
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerRow {
    pub customer_key: i64,
    pub customer_id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub date_of_birth: NaiveDate,
    pub gender: String,
    pub income_segment: String,
    pub customer_segment: String,
    pub registration_date: NaiveDate,
    pub is_active: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentRow {
    pub payment_key: i64,
    pub payment_method: String,
    pub payment_type: String,
    /// Processing fee in basis points (290 = 2.90%)
    pub processing_fee_bps: u32,
    pub is_digital: bool,
}
