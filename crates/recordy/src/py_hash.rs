//! Deterministic hash helpers for record values.
//!
//! Every hash goes through one fixed-seed `ahash` state, so a value hashes the
//! same in every process built from the same source. Numbers are normalised
//! before hashing: `true`, `1` and `1.0` compare equal and so share a hash.

use std::hash::Hash;

use ahash::RandomState;

const SEEDS: [u64; 4] = [
    0x7265_636f_7264_7931,
    0x6669_656c_6473_2121,
    0x243f_6a88_85a3_08d3,
    0x1319_8a2e_0370_7344,
];

/// What actually gets fed to the hasher. The variant tag keeps an integer
/// from colliding with a string or a sequence by construction.
#[derive(Hash)]
enum HashKey<'a> {
    Int(i64),
    Float(u64),
    Str(&'a str),
    Lanes(&'a [i64]),
}

fn hash_key(key: &HashKey<'_>) -> i64 {
    let state = RandomState::with_seeds(SEEDS[0], SEEDS[1], SEEDS[2], SEEDS[3]);
    i64::from_ne_bytes(state.hash_one(key).to_ne_bytes())
}

#[must_use]
pub(crate) fn hash_int(value: i64) -> i64 {
    hash_key(&HashKey::Int(value))
}

/// Hashes an `f64`; integral floats hash like the equal integer and every NaN
/// hashes alike.
#[must_use]
#[expect(clippy::cast_possible_truncation, reason = "only integral floats inside the i64 range are converted")]
pub(crate) fn hash_float(value: f64) -> i64 {
    if value.is_nan() {
        return hash_key(&HashKey::Float(f64::NAN.to_bits()));
    }
    // `i64::MAX as f64` rounds up to 2^63, hence the strict upper bound
    if value.fract() == 0.0 && value >= i64::MIN as f64 && value < i64::MAX as f64 {
        return hash_int(value as i64);
    }
    hash_key(&HashKey::Float(value.to_bits()))
}

#[must_use]
pub(crate) fn hash_str(value: &str) -> i64 {
    hash_key(&HashKey::Str(value))
}

/// Combines already-hashed lanes into one sequence hash; lane order matters.
#[must_use]
pub(crate) fn hash_lanes(lanes: &[i64]) -> i64 {
    hash_key(&HashKey::Lanes(lanes))
}
