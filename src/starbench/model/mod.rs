//! Row types for the star schema

pub mod dimensions;
pub mod facts;

pub use dimensions::{
    CustomerRow, GeographyRow, PaymentRow, ProductVersionRow, TimeRow, SENTINEL_EXPIRATION,
};
pub use facts::FactRow;
