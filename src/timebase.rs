//! Timebase derivation.
//!
//! The timebase is the coarsest unit every decode and composition timestamp
//! of a track is an exact multiple of. Dividing timestamps by it yields the
//! smallest integers that still preserve their spacing.

use crate::engine::TimestampList;

/// Greatest common divisor. `gcd(a, 0) == a`.
pub fn gcd(mut a: u64, mut b: u64) -> u64 {
    while b != 0 {
        let r = a % b;
        a = b;
        b = r;
    }
    a
}

/// Reduces `seed` against every forward DTS difference in decode order, then
/// against every forward CTS difference in composition order.
///
/// Leaves `timestamps` sorted in composition order. The result is 0 when
/// the seed and every difference are 0.
pub fn reduce(seed: u64, timestamps: &mut TimestampList) -> u64 {
    let mut timebase = seed;
    for pair in timestamps.as_slice().windows(2) {
        timebase = gcd(timebase, pair[1].dts.wrapping_sub(pair[0].dts));
    }
    timestamps.sort_composition_order();
    for pair in timestamps.as_slice().windows(2) {
        timebase = gcd(timebase, pair[1].cts - pair[0].cts);
    }
    timebase
}

/// Like [`reduce`], floored to 1.
pub fn derive(last_sample_delta: u32, timestamps: &mut TimestampList) -> u64 {
    reduce(last_sample_delta as u64, timestamps).max(1)
}
