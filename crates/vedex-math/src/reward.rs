//! Proportional reward accrual shared by gauges and bribes.
//!
//! A stream pays `rate` units per second to everyone holding a balance,
//! pro rata. The running total "reward per unit of balance" lives in a U256
//! scaled by 10^36; each holder remembers the value they last settled at.

use vedex_core::constants::REWARD_WINDOW;
use vedex_core::error::VedexError;
use vedex_core::types::{Balance, Timestamp};

use crate::fixed::{reward_precision, to_balance, U256};

/// Accumulator value at `applicable` (the earlier of now and the end of the
/// window) given the value stored at `last_update`.
pub fn reward_per_token(
    stored: U256,
    rate: Balance,
    last_update: Timestamp,
    applicable: Timestamp,
    total_supply: Balance,
) -> U256 {
    if total_supply == 0 || applicable <= last_update {
        return stored;
    }
    let elapsed = U256::from((applicable - last_update) as u128);
    stored + elapsed * U256::from(rate) * reward_precision() / U256::from(total_supply)
}

/// Settled rewards of a holder: `pending + balance × (rpt − paid)`.
pub fn earned(balance: Balance, rpt: U256, paid: U256, pending: Balance) -> Result<Balance, VedexError> {
    let delta = rpt.saturating_sub(paid);
    let accrued = to_balance(U256::from(balance) * delta / reward_precision())?;
    pending.checked_add(accrued).ok_or(VedexError::Overflow)
}

/// New per-second rate when `amount` is added at `now`. Any undistributed
/// remainder of a running window is folded in and a fresh window starts.
pub fn next_rate(amount: Balance, now: Timestamp, period_finish: Timestamp, rate: Balance) -> Result<Balance, VedexError> {
    let window = REWARD_WINDOW as u128;
    if now >= period_finish {
        return Ok(amount / window);
    }
    let remaining = (period_finish - now) as u128;
    let leftover = remaining.checked_mul(rate).ok_or(VedexError::Overflow)?;
    let total = amount.checked_add(leftover).ok_or(VedexError::Overflow)?;
    Ok(total / window)
}
