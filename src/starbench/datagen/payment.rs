//! Payment method dimension
//!
//! Fixed reference data; the only dimension with no sampled attributes.

use crate::starbench::model::PaymentRow;

const METHODS: [(&str, &str, u32, bool); 7] = [
    ("Credit Card", "Card", 290, true),
    ("Debit Card", "Card", 150, true),
    ("PayPal", "Digital Wallet", 350, true),
    ("Apple Pay", "Digital Wallet", 250, true),
    ("Bank Transfer", "Electronic", 50, true),
    ("Cash", "Physical", 0, false),
    ("Check", "Physical", 0, false),
];

pub fn generate() -> Vec<PaymentRow> {
    METHODS
        .iter()
        .enumerate()
        .map(|(idx, (method, kind, fee_bps, digital))| PaymentRow {
            payment_key: idx as i64 + 1,
            payment_method: method.to_string(),
            payment_type: kind.to_string(),
            processing_fee_bps: *fee_bps,
            is_digital: *digital,
        })
        .collect()
}
