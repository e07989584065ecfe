//! ─── vedex Protocol Constants ───────────────────────────────────────────────
//!
//! Amounts are base units. The governance token uses 18 decimals.

use crate::types::{Balance, Timestamp};

// ── Time ─────────────────────────────────────────────────────────────────────

pub const DAY: Timestamp = 86_400;

/// One epoch. Votes, emissions and rebases are all keyed by week starts.
pub const WEEK: Timestamp = 7 * DAY;

/// Longest lock: four 365-day years.
pub const MAX_LOCK_DURATION: Timestamp = 4 * 365 * DAY;

/// Shortest lock.
pub const MIN_LOCK_DURATION: Timestamp = WEEK;

/// A lock must exist at least this long before it may vote.
pub const MIN_HOLD_PERIOD: Timestamp = DAY;

/// Length of every gauge and bribe distribution window.
pub const REWARD_WINDOW: Timestamp = WEEK;

/// Minimum spacing between two pool price observations.
pub const OBSERVATION_PERIOD: Timestamp = 1_800;

/// Observations kept per pool (one day at the minimum spacing).
pub const MAX_OBSERVATIONS: usize = 48;

// ── Precision ────────────────────────────────────────────────────────────────

pub const BPS_DENOM: u128 = 10_000;

/// 10^18: unit of the governance token and the normalisation base of the
/// stable curve.
pub const UNIT: u128 = 1_000_000_000_000_000_000;

/// Reward-per-token accumulators carry twice the base precision (10^36) so
/// that dust stakes still accrue over short windows.
pub const REWARD_PRECISION_DECIMALS: usize = 36;

/// Tokens with more decimals than the stable curve's normalisation base are
/// refused at registration.
pub const MAX_TOKEN_DECIMALS: u8 = 18;

// ── Pools ────────────────────────────────────────────────────────────────────

/// Liquidity locked to the null account on the first mint.
pub const MINIMUM_LIQUIDITY: Balance = 1_000;

/// Stable pools must start above this invariant value.
pub const MINIMUM_K: u128 = 10_000_000_000;

/// Swap fee retained in reserves (basis points).
pub const STABLE_FEE_BPS: u128 = 5;
pub const VOLATILE_FEE_BPS: u128 = 30;

/// Iteration cap for inverting the stable invariant.
pub const STABLE_NEWTON_MAX_ITERATIONS: usize = 255;

/// Most hops a router swap may take.
pub const MAX_ROUTE_HOPS: usize = 8;

// ── Votes & rewards ──────────────────────────────────────────────────────────

/// Vote weights are percentages and must sum to this.
pub const VOTE_WEIGHT_TOTAL: u32 = 100;

/// Smallest amount a gauge accepts in `notify_reward_amount`. One unit per
/// second of the window, so the per-second rate is never zero.
pub const GAUGE_MIN_REWARD: Balance = REWARD_WINDOW as Balance;

/// Smallest bribe deposit. Blocks padding the token list with dust.
pub const BRIBE_MIN_DEPOSIT: Balance = 1_000_000;

/// Distinct reward tokens a bribe tracks at once.
pub const MAX_BRIBE_TOKENS: usize = 8;

// ── Emission ─────────────────────────────────────────────────────────────────

/// Weekly emission of the first epoch: 15M tokens.
pub const INITIAL_WEEKLY_EMISSION: Balance = 15_000_000 * UNIT;

/// `weekly` is multiplied by this after every epoch (99 %).
pub const WEEKLY_DECAY_BPS: u128 = 9_900;

/// Emission floor as a share of circulating supply (2 %).
pub const TAIL_EMISSION_BPS: u128 = 200;

/// Share of each emission routed to the rebase distributor (30 %).
pub const VE_SHARE_BPS: u128 = 3_000;
