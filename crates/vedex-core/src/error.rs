use thiserror::Error;

use crate::types::Timestamp;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum VedexError {
    // ── Validation ───────────────────────────────────────────────────────────
    #[error("amount must be greater than zero")]
    ZeroAmount,

    #[error("arithmetic overflow")]
    Overflow,

    #[error("insufficient {token} balance: need {need}, have {have}")]
    InsufficientBalance { token: String, need: u128, have: u128 },

    #[error("unknown token: {0}")]
    UnknownToken(String),

    #[error("token already registered: {0}")]
    TokenAlreadyExists(String),

    #[error("token id must not be empty")]
    EmptyTokenId,

    #[error("unsupported token decimals: {0}")]
    UnsupportedDecimals(u8),

    #[error("pool tokens must differ")]
    IdenticalTokens,

    #[error("pool already exists: {token0}/{token1} (stable: {stable})")]
    PoolExists { token0: String, token1: String, stable: bool },

    #[error("pool not found: {0}")]
    PoolNotFound(u64),

    #[error("token {0} is not part of this pool")]
    TokenNotInPool(String),

    #[error("insufficient liquidity minted")]
    InsufficientLiquidityMinted,

    #[error("insufficient liquidity burned")]
    InsufficientLiquidityBurned,

    #[error("insufficient output amount")]
    InsufficientOutputAmount,

    #[error("insufficient input amount")]
    InsufficientInputAmount,

    #[error("insufficient liquidity in reserves")]
    InsufficientLiquidity,

    #[error("swap recipient may not be a pool token")]
    InvalidRecipient,

    #[error("pool invariant would decrease")]
    InvariantViolated,

    #[error("stable pool must start above the minimum invariant")]
    MinimumKNotMet,

    #[error("first deposit into a stable pool must be at parity")]
    StableDepositsNotEqual,

    #[error("no price observation window available yet")]
    NoObservationWindow,

    #[error("slippage: wanted at least {min}, got {got}")]
    SlippageExceeded { min: u128, got: u128 },

    #[error("invalid route: {0}")]
    InvalidRoute(String),

    #[error("stable curve did not converge")]
    CurveDidNotConverge,

    #[error("lock not found: {0}")]
    LockNotFound(u64),

    #[error("lock has expired")]
    LockExpired,

    #[error("lock not yet expired (unlocks at {unlock_time})")]
    LockNotExpired { unlock_time: Timestamp },

    #[error("unlock time can only be extended")]
    LockCanOnlyBeExtended,

    #[error("unlock time exceeds the maximum horizon (latest allowed {max_unlock})")]
    LockDurationTooLong { max_unlock: Timestamp },

    #[error("cannot merge a lock into itself")]
    SameLock,

    #[error("split amount must be between zero and the locked amount")]
    InvalidSplitAmount,

    #[error("lock has active votes; reset first")]
    LockHasActiveVotes,

    #[error("gauge not found: {0}")]
    GaugeNotFound(u64),

    #[error("pool {0} has no gauge")]
    PoolHasNoGauge(u64),

    #[error("gauge {0} is not alive")]
    GaugeNotAlive(u64),

    #[error("gauge {0} is already alive")]
    GaugeAlreadyAlive(u64),

    #[error("pools and weights differ in length")]
    VoteLengthMismatch,

    #[error("vote weights must sum to 100; got {got}")]
    VoteWeightsMismatch { got: u32 },

    #[error("vote weight must be greater than zero")]
    ZeroVoteWeight,

    #[error("pool listed twice in one vote")]
    DuplicateVotePool,

    #[error("lock has no voting power")]
    NoVotingPower,

    #[error("token {0} is not a valid reward for this gauge")]
    InvalidRewardToken(String),

    // ── Authorization ────────────────────────────────────────────────────────
    #[error("caller does not own lock {0}")]
    NotLockOwner(u64),

    #[error("caller is not the protocol admin")]
    NotAdmin,

    #[error("caller is not the minter")]
    NotMinter,

    #[error("caller may not create a gauge for non-whitelisted tokens")]
    NotWhitelisted,

    #[error("caller {0} is a protocol-owned account")]
    ReservedCaller(String),

    // ── Timing ───────────────────────────────────────────────────────────────
    #[error("minimum holding period not met (eligible at {eligible_at})")]
    HoldingPeriodNotMet { eligible_at: Timestamp },

    #[error("lock already voted this epoch")]
    AlreadyVotedThisEpoch,

    #[error("lock was created in this step and cannot vote yet")]
    SameStepCreateAndVote,

    #[error("call timestamp {got} precedes last applied {last}")]
    ClockWentBackwards { last: Timestamp, got: Timestamp },

    #[error("call step {got} precedes last applied {last}")]
    StepWentBackwards { last: u64, got: u64 },

    #[error("minter not started")]
    MinterNotStarted,

    #[error("minter already started")]
    MinterAlreadyStarted,

    // ── Anti-abuse thresholds ────────────────────────────────────────────────
    #[error("reward below minimum ({min} required)")]
    RewardBelowMinimum { min: u128 },

    #[error("bribe deposit below minimum ({min} required)")]
    BribeBelowMinimum { min: u128 },

    #[error("too many reward tokens: maximum {max}")]
    TooManyRewardTokens { max: usize },

    #[error("emission amount too small")]
    EmissionTooSmall,

    // ── Serialization / storage ──────────────────────────────────────────────
    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("genesis already applied")]
    GenesisAlreadyApplied,

    #[error("{0}")]
    Other(String),
}
