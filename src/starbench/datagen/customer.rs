//! Customer dimension generator
//!
//! Independent attribute sampling with declared categorical proportions.
//! Customer segment correlates with income segment; activity probability
//! decays with account age. Names and emails come from fixed part tables
//! so the output stays deterministic per stream.

use crate::starbench::config::GenerateConfig;
use crate::starbench::model::CustomerRow;
use chrono::Duration;
use rand::distributions::WeightedIndex;
use rand::prelude::*;
use rand::rngs::StdRng;

const INCOME_SEGMENTS: [&str; 4] = [
    "Low (<30k)",
    "Medium (30k-75k)",
    "High (75k-150k)",
    "Premium (>150k)",
];
/// Declared proportions: 30/40/20/10
const INCOME_WEIGHTS: [u32; 4] = [30, 40, 20, 10];

const GENDERS: [&str; 3] = ["M", "F", "Other"];

const FIRST_NAMES: [&str; 16] = [
    "Alex", "Jordan", "Casey", "Morgan", "Riley", "Quinn", "Avery", "Rowan", "Elliot", "Sam",
    "Jamie", "Taylor", "Drew", "Reese", "Blake", "Harper",
];
const LAST_NAMES: [&str; 16] = [
    "Smith", "Johnson", "Lee", "Brown", "Garcia", "Martin", "Clark", "Lewis", "Walker", "Hall",
    "Young", "King", "Wright", "Scott", "Green", "Baker",
];

/// Generate the customer dimension with dense surrogate keys
pub fn generate(rng: &mut StdRng, cfg: &GenerateConfig) -> Vec<CustomerRow> {
    let income_dist = WeightedIndex::new(INCOME_WEIGHTS).expect("income weights are non-zero");
    let mut rows = Vec::with_capacity(cfg.num_customers);

    for customer_idx in 0..cfg.num_customers {
        let income_segment = INCOME_SEGMENTS[income_dist.sample(rng)];
        let customer_segment = segment_for_income(income_segment, rng);

        // Registration spread over the 5 years before the range end
        let days_ago = rng.gen_range(0..365 * 5);
        let registration_date = cfg.end_date - Duration::days(days_ago);

        let age_years = rng.gen_range(18..=80);
        let date_of_birth = cfg.end_date - Duration::days(age_years * 365);

        // Older accounts are more likely to be inactive
        let is_active = rng.gen::<f64>() > days_ago as f64 / (365.0 * 5.0 * 2.0);

        let first_name = FIRST_NAMES[rng.gen_range(0..FIRST_NAMES.len())];
        let last_name = LAST_NAMES[rng.gen_range(0..LAST_NAMES.len())];

        rows.push(CustomerRow {
            customer_key: customer_idx as i64 + 1,
            customer_id: format!("CUST-{:06}", customer_idx + 1),
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            email: format!(
                "{}.{}{}@example.com",
                first_name.to_lowercase(),
                last_name.to_lowercase(),
                customer_idx + 1
            ),
            date_of_birth,
            gender: GENDERS[rng.gen_range(0..GENDERS.len())].to_string(),
            income_segment: income_segment.to_string(),
            customer_segment,
            registration_date,
            is_active,
        });
    }

    rows
}

fn segment_for_income(income_segment: &str, rng: &mut StdRng) -> String {
    let choices: [&str; 2] = if income_segment.starts_with("Premium") {
        ["Gold", "Platinum"]
    } else if income_segment.starts_with("High") {
        ["Silver", "Gold"]
    } else {
        ["Bronze", "Silver"]
    };
    choices[rng.gen_range(0..2)].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::starbench::rng::{StreamId, StreamManager};

    fn gen_rows(num_customers: usize) -> Vec<CustomerRow> {
        let mut cfg = GenerateConfig::default();
        cfg.num_customers = num_customers;
        let mut rng = StreamManager::new(42).derive(StreamId::Customer);
        generate(&mut rng, &cfg)
    }

    #[test]
    fn test_cardinality_and_dense_keys() {
        let rows = gen_rows(500);
        assert_eq!(rows.len(), 500);
        assert_eq!(rows[0].customer_key, 1);
        assert_eq!(rows[0].customer_id, "CUST-000001");
        assert_eq!(rows.last().unwrap().customer_key, 500);
    }

    #[test]
    fn test_income_proportions_within_tolerance() {
        let rows = gen_rows(50_000);
        let medium = rows
            .iter()
            .filter(|r| r.income_segment.starts_with("Medium"))
            .count() as f64
            / rows.len() as f64;
        let premium = rows
            .iter()
            .filter(|r| r.income_segment.starts_with("Premium"))
            .count() as f64
            / rows.len() as f64;

        assert!((medium - 0.40).abs() < 0.02, "medium share {}", medium);
        assert!((premium - 0.10).abs() < 0.02, "premium share {}", premium);
    }

    #[test]
    fn test_segment_correlates_with_income() {
        let rows = gen_rows(5_000);
        for row in &rows {
            match row.income_segment.as_str() {
                s if s.starts_with("Premium") => {
                    assert!(matches!(row.customer_segment.as_str(), "Gold" | "Platinum"))
                }
                s if s.starts_with("High") => {
                    assert!(matches!(row.customer_segment.as_str(), "Silver" | "Gold"))
                }
                _ => assert!(matches!(
                    row.customer_segment.as_str(),
                    "Bronze" | "Silver"
                )),
            }
        }
    }

    #[test]
    fn test_deterministic_per_seed() {
        assert_eq!(gen_rows(200), gen_rows(200));
    }
}
