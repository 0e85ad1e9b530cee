//! Deterministic seed derivation.
//!
//! Each experiment gets its own RNG seed derived from the run seed, so runs are
//! reproducible and experiments can execute in any order (or concurrently)
//! without sharing an RNG stream. Not cryptographic.

/// Seed for experiment `experiment` of a run seeded with `run_seed`.
#[must_use]
pub fn experiment_seed(run_seed: u64, experiment: usize) -> u64 {
    splitmix64(run_seed ^ splitmix64(experiment as u64 ^ 0x4750_5453)) // "GPTS"
}

/// SplitMix64 finalizer.
#[inline]
#[must_use]
pub fn splitmix64(mut x: u64) -> u64 {
    x = x.wrapping_add(0x9E37_79B9_7F4A_7C15);
    let mut z = x;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}
