//! Pricing curves.
//!
//! Volatile pairs price on `x * y = k`. Stable pairs price on
//! `x³y + y³x = k`, evaluated on amounts normalised to 18 decimals so that
//! tokens with different precisions meet at parity.
//!
//! Quoting a stable swap needs the inverse of the invariant in `y`. There is
//! no convenient closed form, so [`stable_get_y`] runs Newton's method on
//! `f(x0, y) = x0·y³ + x0³·y` and only ever returns a `y` with
//! `f(x0, y) ≥ k`, which keeps quotes on the safe side of the pool's
//! invariant check.

use vedex_core::constants::{BPS_DENOM, STABLE_FEE_BPS, STABLE_NEWTON_MAX_ITERATIONS, VOLATILE_FEE_BPS};
use vedex_core::error::VedexError;
use vedex_core::types::Balance;

use crate::fixed::{to_balance, unit, U256};

/// Pricing curve of a pool.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Curve {
    Volatile,
    /// `scale0` / `scale1` are 10^decimals of token0 / token1.
    Stable { scale0: u128, scale1: u128 },
}

impl Curve {
    pub fn new(stable: bool, decimals0: u8, decimals1: u8) -> Result<Self, VedexError> {
        if !stable {
            return Ok(Curve::Volatile);
        }
        let scale = |d: u8| 10u128.checked_pow(d.into()).ok_or(VedexError::UnsupportedDecimals(d));
        Ok(Curve::Stable { scale0: scale(decimals0)?, scale1: scale(decimals1)? })
    }

    pub fn is_stable(&self) -> bool {
        matches!(self, Curve::Stable { .. })
    }

    /// Swap fee in basis points, retained in reserves.
    pub fn fee_bps(&self) -> u128 {
        match self {
            Curve::Volatile => VOLATILE_FEE_BPS,
            Curve::Stable { .. } => STABLE_FEE_BPS,
        }
    }

    /// Fee charged on `amount_in`.
    pub fn fee_on(&self, amount_in: Balance) -> Balance {
        // fee_bps < BPS_DENOM, so the product only overflows for inputs
        // beyond any real supply; fall back to the wide path then.
        match amount_in.checked_mul(self.fee_bps()) {
            Some(p) => p / BPS_DENOM,
            None => (U256::from(amount_in) * U256::from(self.fee_bps()) / U256::from(BPS_DENOM)).low_u128(),
        }
    }

    /// Invariant value for reserves `(x, y)`. Stable reserves large enough
    /// to push the quartic past 256 bits are an `Overflow`.
    pub fn k(&self, x: Balance, y: Balance) -> Result<U256, VedexError> {
        match *self {
            Curve::Volatile => Ok(U256::from(x) * U256::from(y)),
            Curve::Stable { scale0, scale1 } => {
                let x = normalise(x, scale0);
                let y = normalise(y, scale1);
                stable_f(x, y)
            }
        }
    }

    /// Output for `amount_in` (fee already removed) when trading token0 for
    /// token1 (`zero_for_one`) or the reverse.
    pub fn amount_out(
        &self,
        amount_in: Balance,
        reserve0: Balance,
        reserve1: Balance,
        zero_for_one: bool,
    ) -> Result<Balance, VedexError> {
        let (reserve_in, reserve_out) = if zero_for_one {
            (reserve0, reserve1)
        } else {
            (reserve1, reserve0)
        };
        if reserve_in == 0 || reserve_out == 0 {
            return Err(VedexError::InsufficientLiquidity);
        }
        match *self {
            Curve::Volatile => {
                let num = U256::from(amount_in) * U256::from(reserve_out);
                let den = U256::from(reserve_in) + U256::from(amount_in);
                to_balance(num / den)
            }
            Curve::Stable { scale0, scale1 } => {
                let xy = self.k(reserve0, reserve1)?;
                let (scale_in, scale_out) = if zero_for_one {
                    (scale0, scale1)
                } else {
                    (scale1, scale0)
                };
                let r_in = normalise(reserve_in, scale_in);
                let r_out = normalise(reserve_out, scale_out);
                let a_in = normalise(amount_in, scale_in);
                let y = stable_get_y(a_in + r_in, xy, r_out)?;
                let out = r_out.saturating_sub(y);
                to_balance(out * U256::from(scale_out) / unit())
            }
        }
    }
}

fn normalise(amount: Balance, scale: u128) -> U256 {
    U256::from(amount) * unit() / U256::from(scale)
}

fn mul(a: U256, b: U256) -> Result<U256, VedexError> {
    a.checked_mul(b).ok_or(VedexError::Overflow)
}

fn add(a: U256, b: U256) -> Result<U256, VedexError> {
    a.checked_add(b).ok_or(VedexError::Overflow)
}

/// `x0·y·(x0² + y²)` at 18-decimal precision.
fn stable_f(x0: U256, y: U256) -> Result<U256, VedexError> {
    let one = unit();
    let a = mul(x0, y)? / one;
    let b = add(mul(x0, x0)? / one, mul(y, y)? / one)?;
    Ok(mul(a, b)? / one)
}

/// ∂f/∂y = `3·x0·y² + x0³` at 18-decimal precision.
fn stable_d(x0: U256, y: U256) -> Result<U256, VedexError> {
    let one = unit();
    let lhs = mul(mul(U256::from(3), x0)?, mul(y, y)? / one)? / one;
    let rhs = mul(mul(x0, x0)? / one, x0)? / one;
    add(lhs, rhs)
}

/// Solve `f(x0, y) = xy` for `y`, starting from `y`. The returned value
/// always satisfies `f(x0, y) >= xy`.
pub fn stable_get_y(x0: U256, xy: U256, mut y: U256) -> Result<U256, VedexError> {
    let one = unit();
    for _ in 0..STABLE_NEWTON_MAX_ITERATIONS {
        let k = stable_f(x0, y)?;
        let d = stable_d(x0, y)?;
        if k < xy {
            let mut dy = if d.is_zero() { U256::zero() } else { mul(xy - k, one)? / d };
            if dy.is_zero() {
                let next = add(y, U256::one())?;
                if stable_f(x0, next)? > xy {
                    return Ok(next);
                }
                dy = U256::one();
            }
            y = add(y, dy)?;
        } else {
            let mut dy = if d.is_zero() { U256::zero() } else { mul(k - xy, one)? / d };
            if dy.is_zero() {
                if k == xy || y.is_zero() || stable_f(x0, y - U256::one())? < xy {
                    return Ok(y);
                }
                dy = U256::one();
            }
            y = y.saturating_sub(dy);
        }
    }
    Err(VedexError::CurveDidNotConverge)
}
