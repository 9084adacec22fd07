//! Geography dimension generator
//!
//! Builds the three-level region -> country -> city hierarchy. Country and
//! region names come from fixed tables; the number of cities under each
//! region is sampled from the configured range, so every city always has a
//! non-null path up to its region and country.

use crate::starbench::config::GenerateConfig;
use crate::starbench::model::GeographyRow;
use rand::distributions::WeightedIndex;
use rand::prelude::*;
use rand::rngs::StdRng;

struct CountrySpec {
    name: &'static str,
    code: &'static str,
    timezone: &'static str,
    regions: [&'static str; 5],
    lat_range: (f64, f64),
    lon_range: (f64, f64),
}

const COUNTRIES: [CountrySpec; 3] = [
    CountrySpec {
        name: "United States",
        code: "US",
        timezone: "America/New_York",
        regions: ["Northeast", "Southeast", "Midwest", "Southwest", "West"],
        lat_range: (24.5, 49.0),
        lon_range: (-125.0, -66.9),
    },
    CountrySpec {
        name: "United Kingdom",
        code: "GB",
        timezone: "Europe/London",
        regions: [
            "England",
            "Scotland",
            "Wales",
            "Northern Ireland",
            "Greater London",
        ],
        lat_range: (50.0, 58.0),
        lon_range: (-5.0, 2.0),
    },
    CountrySpec {
        name: "Canada",
        code: "CA",
        timezone: "America/Toronto",
        regions: ["Ontario", "Quebec", "British Columbia", "Alberta", "Manitoba"],
        lat_range: (42.0, 60.0),
        lon_range: (-141.0, -52.0),
    },
];

const POPULATION_SEGMENTS: [&str; 4] = [
    "Small (<100k)",
    "Medium (100k-500k)",
    "Large (500k-1M)",
    "Metro (>1M)",
];
const POPULATION_WEIGHTS: [u32; 4] = [40, 30, 20, 10];

const CITY_PREFIXES: [&str; 12] = [
    "North", "South", "East", "West", "New", "Old", "Lake", "Fort", "Port", "Mount", "Glen",
    "Spring",
];
const CITY_STEMS: [&str; 10] = [
    "haven", "bridge", "field", "wood", "brook", "dale", "crest", "view", "ford", "gate",
];
const CITY_SUFFIXES: [&str; 6] = ["ton", "ville", "burg", "port", "side", "land"];

/// Generate the geography dimension with dense surrogate keys
pub fn generate(rng: &mut StdRng, cfg: &GenerateConfig) -> Vec<GeographyRow> {
    // Proportions validated in config; the weights are compile-time constants.
    let segment_dist =
        WeightedIndex::new(POPULATION_WEIGHTS).expect("population weights are non-zero");

    let mut rows = Vec::new();
    let mut geo_key = 1i64;
    let (min_cities, max_cities) = cfg.cities_per_region;

    for country in &COUNTRIES {
        for region in &country.regions {
            let num_cities = rng.gen_range(min_cities..=max_cities);
            for _ in 0..num_cities {
                rows.push(GeographyRow {
                    geo_key,
                    city: city_name(rng),
                    region: region.to_string(),
                    country: country.name.to_string(),
                    country_code: country.code.to_string(),
                    latitude: round6(rng.gen_range(country.lat_range.0..country.lat_range.1)),
                    longitude: round6(rng.gen_range(country.lon_range.0..country.lon_range.1)),
                    population_segment: POPULATION_SEGMENTS[segment_dist.sample(rng)].to_string(),
                    timezone: country.timezone.to_string(),
                });
                geo_key += 1;
            }
        }
    }

    rows
}

fn city_name(rng: &mut StdRng) -> String {
    let prefix = CITY_PREFIXES[rng.gen_range(0..CITY_PREFIXES.len())];
    let stem = CITY_STEMS[rng.gen_range(0..CITY_STEMS.len())];
    let suffix = CITY_SUFFIXES[rng.gen_range(0..CITY_SUFFIXES.len())];
    format!("{} {}{}", prefix, capitalize(stem), suffix)
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) => c.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

fn round6(v: f64) -> f64 {
    (v * 1_000_000.0).round() / 1_000_000.0
}
