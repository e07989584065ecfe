//! Wide-integer helpers. Every product that can exceed u128 goes through U256.

pub use primitive_types::U256;

use vedex_core::constants::{BPS_DENOM, REWARD_PRECISION_DECIMALS, UNIT};
use vedex_core::error::VedexError;
use vedex_core::types::Balance;

/// 10^36, the scale of reward-per-token accumulators.
pub fn reward_precision() -> U256 {
    U256::exp10(REWARD_PRECISION_DECIMALS)
}

pub fn unit() -> U256 {
    U256::from(UNIT)
}

/// Narrow a U256 back to a balance.
pub fn to_balance(v: U256) -> Result<Balance, VedexError> {
    if v > U256::from(u128::MAX) {
        return Err(VedexError::Overflow);
    }
    Ok(v.low_u128())
}

/// `a * b / d` without intermediate overflow, rounding down.
pub fn mul_div(a: Balance, b: Balance, d: Balance) -> Result<Balance, VedexError> {
    if d == 0 {
        return Err(VedexError::Overflow);
    }
    to_balance(U256::from(a) * U256::from(b) / U256::from(d))
}

/// `amount * bps / 10_000`, rounding down.
pub fn bps_of(amount: Balance, bps: u128) -> Result<Balance, VedexError> {
    mul_div(amount, bps, BPS_DENOM)
}

/// Floor of the square root of `a * b`.
pub fn sqrt_product(a: Balance, b: Balance) -> Result<Balance, VedexError> {
    to_balance((U256::from(a) * U256::from(b)).integer_sqrt())
}
