//! Partition key and Hive-style directory layout
//!
//! A fact row's partition is a pure function of its transaction date. The
//! directory naming scheme (`year=2023/quarter=Q1`) is fixed so query
//! engines can eliminate partitions by path alone.

use crate::starbench::datagen::time::quarter_of;
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// (year, quarter) partition key
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PartitionKey {
    pub year: i32,
    /// Calendar quarter 1-4
    pub quarter: u8,
}

impl PartitionKey {
    /// Pure function of the transaction date; never reassigned
    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            quarter: quarter_of(date.month()),
        }
    }

    /// Hive-style relative path: `year=2023/quarter=Q1`
    pub fn hive_path(&self) -> String {
        format!("year={}/quarter=Q{}", self.year, self.quarter)
    }

    /// Parse a Hive-style relative path back into a key
    pub fn parse(path: &str) -> Option<Self> {
        let mut year = None;
        let mut quarter = None;
        for part in path.split('/') {
            let (key, value) = part.split_once('=')?;
            match key {
                "year" => year = value.parse::<i32>().ok(),
                "quarter" => {
                    quarter = value
                        .strip_prefix('Q')
                        .and_then(|q| q.parse::<u8>().ok())
                        .filter(|q| (1..=4).contains(q))
                }
                _ => return None,
            }
        }
        Some(Self {
            year: year?,
            quarter: quarter?,
        })
    }
}

impl fmt::Display for PartitionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.hive_path())
    }
}

/// Per-partition write statistics, reported for compression-ratio analysis
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionStats {
    pub rows: u64,
    pub bytes: u64,
    pub files: u32,
}

/// List partition keys present under a table root by scanning directory
/// names, without reading file contents
pub fn list_partitions(table_root: &Path) -> std::io::Result<Vec<PartitionKey>> {
    let mut keys = Vec::new();
    if !table_root.exists() {
        return Ok(keys);
    }
    for year_entry in std::fs::read_dir(table_root)? {
        let year_dir = year_entry?.path();
        if !year_dir.is_dir() {
            continue;
        }
        for quarter_entry in std::fs::read_dir(&year_dir)? {
            let quarter_dir = quarter_entry?.path();
            if !quarter_dir.is_dir() {
                continue;
            }
            let relative = format!(
                "{}/{}",
                year_dir.file_name().unwrap_or_default().to_string_lossy(),
                quarter_dir.file_name().unwrap_or_default().to_string_lossy()
            );
            if let Some(key) = PartitionKey::parse(&relative) {
                keys.push(key);
            }
        }
    }
    keys.sort_unstable();
    Ok(keys)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_key_is_pure_function_of_date() {
        let date = d(2023, 5, 17);
        assert_eq!(PartitionKey::from_date(date), PartitionKey::from_date(date));
        assert_eq!(
            PartitionKey::from_date(date),
            PartitionKey { year: 2023, quarter: 2 }
        );
    }

    #[test]
    fn test_quarter_boundaries() {
        assert_eq!(PartitionKey::from_date(d(2024, 3, 31)).quarter, 1);
        assert_eq!(PartitionKey::from_date(d(2024, 4, 1)).quarter, 2);
        assert_eq!(PartitionKey::from_date(d(2024, 10, 1)).quarter, 4);
        assert_eq!(PartitionKey::from_date(d(2024, 12, 31)).quarter, 4);
    }

    #[test]
    fn test_hive_path_roundtrip() {
        let key = PartitionKey { year: 2023, quarter: 1 };
        assert_eq!(key.hive_path(), "year=2023/quarter=Q1");
        assert_eq!(PartitionKey::parse("year=2023/quarter=Q1"), Some(key));
    }

    #[test]
    fn test_parse_rejects_malformed_paths() {
        assert_eq!(PartitionKey::parse("year=2023"), None);
        assert_eq!(PartitionKey::parse("year=2023/quarter=Q5"), None);
        assert_eq!(PartitionKey::parse("year=abc/quarter=Q1"), None);
        assert_eq!(PartitionKey::parse("month=1/quarter=Q1"), None);
    }
}
