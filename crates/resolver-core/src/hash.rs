//! Stable string hash used for deterministic percentage rollouts.
//!
//! This exact function is part of the external contract: rollout membership
//! is observable by clients, so the algorithm cannot be swapped for "an
//! equally good" hash. It is a DJB2/Java-string-hash variant with 32-bit
//! signed wraparound.

/// Hash a string the way the rollout bucketer expects: start at 0, for each
/// code point `c` compute `h = (h << 5) - h + c` with 32-bit signed
/// wraparound, return the absolute value.
#[must_use]
pub fn stable_hash(input: &str) -> u32 {
    let mut h: i32 = 0;
    for c in input.chars() {
        h = h
            .wrapping_shl(5)
            .wrapping_sub(h)
            .wrapping_add(c as i32);
    }
    h.unsigned_abs()
}

/// Compute the 1-100 rollout bucket for a `(ruleId, userId)` pair.
#[must_use]
pub fn rollout_bucket(rule_id: &str, user_id: &str) -> u8 {
    let h = stable_hash(&format!("{rule_id}:{user_id}"));
    ((h % 100) + 1) as u8
}
