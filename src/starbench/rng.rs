//! Seed and stream management
//!
//! Derives one independent pseudo-random stream per generator (and per
//! fact worker) from a single top-level seed. Derivation is a pure
//! function of `(top_seed, stream id)`: no wall clock, no hash-map
//! iteration order, no shared generator being consumed.

use rand::rngs::StdRng;
use rand::SeedableRng;

/// Identifies one derived stream. A closed set so indices cannot collide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamId {
    Time,
    Geography,
    Product,
    Customer,
    Payment,
    /// One stream per parallel fact-generation worker
    FactWorker(u32),
}

impl StreamId {
    fn index(&self) -> u64 {
        match self {
            StreamId::Time => 0,
            StreamId::Geography => 1,
            StreamId::Product => 2,
            StreamId::Customer => 3,
            StreamId::Payment => 4,
            StreamId::FactWorker(w) => 5 + *w as u64,
        }
    }
}

/// Owns the top-level seed for the lifetime of one generation run
#[derive(Debug, Clone, Copy)]
pub struct StreamManager {
    top_seed: u64,
}

impl StreamManager {
    pub fn new(top_seed: u64) -> Self {
        Self { top_seed }
    }

    pub fn top_seed(&self) -> u64 {
        self.top_seed
    }

    /// Derive the stream for `id`. Same `(top_seed, id)` always yields a
    /// byte-identical generator.
    pub fn derive(&self, id: StreamId) -> StdRng {
        let mixed = split_mix64(self.top_seed ^ split_mix64(id.index().wrapping_add(1)));
        StdRng::seed_from_u64(mixed)
    }
}

/// SplitMix64 finalizer. Decorrelates consecutive stream indices so the
/// derived seeds are statistically independent for generation purposes.
fn split_mix64(mut z: u64) -> u64 {
    z = z.wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}
