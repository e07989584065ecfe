//! Vote-escrow decay.
//!
//! Voting power is never stored. It is a pure function of the locked amount,
//! the unlock time and the instant it is asked about:
//!
//! ```text
//! power(t) = amount × (unlock − t) / MAX_LOCK_DURATION   for t < unlock
//!          = 0                                         for t ≥ unlock
//! ```

use vedex_core::constants::{MAX_LOCK_DURATION, MIN_LOCK_DURATION, WEEK};
use vedex_core::types::{Balance, Timestamp};

use crate::fixed::U256;

/// Unlock time for a lock requested at `now` for `duration` seconds.
/// The duration is clamped to `[MIN_LOCK_DURATION, MAX_LOCK_DURATION]` and the
/// result rounded down to a week boundary.
pub fn unlock_time(now: Timestamp, duration: Timestamp) -> Timestamp {
    let duration = duration.clamp(MIN_LOCK_DURATION, MAX_LOCK_DURATION);
    (now + duration).div_euclid(WEEK) * WEEK
}

/// Voting power of `amount` locked until `unlock`, evaluated at `now`.
pub fn voting_power(amount: Balance, unlock: Timestamp, now: Timestamp) -> Balance {
    if now >= unlock || amount == 0 {
        return 0;
    }
    let remaining = (unlock - now) as u128;
    // remaining <= MAX_LOCK_DURATION, so the quotient never exceeds amount
    (U256::from(amount) * U256::from(remaining) / U256::from(MAX_LOCK_DURATION as u128)).low_u128()
}
