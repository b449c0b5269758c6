//! Exponential-decay countdown arithmetic.
//!
//! Used to size timers for quantities that halve every fixed interval,
//! such as draining a notification backlog credit.

/// Time for a halving quantity to fall from `initial` to `target`.
///
/// `half_life` and the result share one time unit. Returns 0 when the
/// quantity is already at or below the target, and `u64::MAX` for a
/// zero target, which decay never reaches.
pub fn time_to_reach_target(half_life: u64, initial: u64, target: u64) -> u64 {
    if initial == 0 || target >= initial {
        return 0;
    }
    if target == 0 {
        return u64::MAX;
    }
    let halvings = (initial as f64 / target as f64).log2();
    (half_life as f64 * halvings) as u64
}
