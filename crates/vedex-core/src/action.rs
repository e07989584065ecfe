use serde::{Deserialize, Serialize};

use crate::types::{AccountId, Balance, GaugeId, LockId, PoolId, Step, Timestamp, TokenId};

// ── Route ─────────────────────────────────────────────────────────────────────

/// One hop of a router swap.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Route {
    pub from: TokenId,
    pub to: TokenId,
    pub stable: bool,
}

// ── Action ────────────────────────────────────────────────────────────────────

/// Every state-changing operation the engine accepts is one of these.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub enum Action {
    // ── Tokens ───────────────────────────────────────────────────────────────

    /// Move `amount` of `token` from the caller to `to`.
    Transfer {
        token: TokenId,
        to: AccountId,
        amount: Balance,
    },

    // ── Factory / pools ──────────────────────────────────────────────────────

    /// Register a new pool for the pair. Tokens are sorted internally.
    CreatePool {
        token_a: TokenId,
        token_b: TokenId,
        stable: bool,
    },

    /// Deposit up to the desired amounts at the current ratio. `a` and `b`
    /// refer to the pool's sorted token0 / token1.
    AddLiquidity {
        pool: PoolId,
        amount_a_desired: Balance,
        amount_b_desired: Balance,
        amount_a_min: Balance,
        amount_b_min: Balance,
        to: AccountId,
    },

    /// Burn `liquidity` claims from the caller and send both sides to `to`.
    RemoveLiquidity {
        pool: PoolId,
        liquidity: Balance,
        amount_a_min: Balance,
        amount_b_min: Balance,
        to: AccountId,
    },

    /// Low-level swap. Input must already sit in the pool (an earlier
    /// `Transfer` in the same call).
    Swap {
        pool: PoolId,
        amount0_out: Balance,
        amount1_out: Balance,
        to: AccountId,
    },

    /// Router swap along `routes`, exact input.
    SwapExactIn {
        routes: Vec<Route>,
        amount_in: Balance,
        amount_out_min: Balance,
        to: AccountId,
    },

    /// Send balances above reserves to `to`.
    Skim { pool: PoolId, to: AccountId },

    /// Force reserves to match balances.
    Sync { pool: PoolId },

    // ── Lock registry ────────────────────────────────────────────────────────

    /// Lock governance tokens for `duration` seconds. The lock is minted to
    /// `to`, or to the caller when absent.
    CreateLock {
        amount: Balance,
        duration: Timestamp,
        to: Option<AccountId>,
    },

    IncreaseAmount { lock: LockId, amount: Balance },

    /// Top up someone else's lock. Anyone may call.
    DepositFor { lock: LockId, amount: Balance },

    IncreaseUnlockTime { lock: LockId, duration: Timestamp },

    Merge { from: LockId, to: LockId },

    Split { lock: LockId, amount: Balance },

    Withdraw { lock: LockId },

    TransferLock { lock: LockId, to: AccountId },

    // ── Vote router ──────────────────────────────────────────────────────────

    /// `weights` are percentages summing to exactly 100.
    Vote {
        lock: LockId,
        pools: Vec<PoolId>,
        weights: Vec<u32>,
    },

    Reset { lock: LockId },

    /// Re-apply the lock's last percentages at its current voting power.
    Poke { lock: LockId },

    CreateGauge { pool: PoolId },

    KillGauge { gauge: GaugeId },

    ReviveGauge { gauge: GaugeId },

    WhitelistToken { token: TokenId },

    /// Roll the minter if due, then push accrued emissions to `gauges`.
    Distribute { gauges: Vec<GaugeId> },

    ClaimBribes {
        gauges: Vec<GaugeId>,
        lock: LockId,
    },

    // ── Gauge ────────────────────────────────────────────────────────────────

    GaugeDeposit { gauge: GaugeId, amount: Balance },

    GaugeWithdraw { gauge: GaugeId, amount: Balance },

    GaugeGetReward { gauge: GaugeId },

    GaugeNotifyReward {
        gauge: GaugeId,
        token: TokenId,
        amount: Balance,
    },

    // ── Bribe ────────────────────────────────────────────────────────────────

    BribeNotifyReward {
        gauge: GaugeId,
        token: TokenId,
        amount: Balance,
    },

    BribeGetReward {
        gauge: GaugeId,
        lock: LockId,
        tokens: Vec<TokenId>,
    },

    // ── Minter ───────────────────────────────────────────────────────────────

    MinterStart,

    UpdatePeriod,

    // ── Rebase distributor ───────────────────────────────────────────────────

    RebaseNotify { amount: Balance },

    ClaimRebase { lock: LockId },

    ClaimRebaseMany { locks: Vec<LockId> },
}

// ── Call ──────────────────────────────────────────────────────────────────────

/// A unit of execution: one caller, one instant, one or more actions that
/// commit together or not at all.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Call {
    pub caller: AccountId,
    pub timestamp: Timestamp,
    /// Host execution sequence (block height or equivalent).
    pub step: Step,
    pub actions: Vec<Action>,
}

impl Call {
    pub fn new(caller: AccountId, timestamp: Timestamp, step: Step, actions: Vec<Action>) -> Self {
        Self { caller, timestamp, step, actions }
    }

    pub fn single(caller: AccountId, timestamp: Timestamp, step: Step, action: Action) -> Self {
        Self::new(caller, timestamp, step, vec![action])
    }
}

// ── Receipt ───────────────────────────────────────────────────────────────────

/// What a committed action produced, one per action in call order.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum Receipt {
    Done,
    PoolCreated(PoolId),
    LiquidityAdded {
        amount_a: Balance,
        amount_b: Balance,
        liquidity: Balance,
    },
    LiquidityRemoved {
        amount_a: Balance,
        amount_b: Balance,
    },
    Swapped {
        amount_out: Balance,
    },
    LockCreated(LockId),
    Withdrawn(Balance),
    GaugeCreated {
        gauge: GaugeId,
        existing: bool,
    },
    RewardsPaid(Vec<(TokenId, Balance)>),
    /// `None` when the minter was not due.
    Emission(Option<Balance>),
    /// Emissions pushed to gauges by `Distribute`.
    Distributed(Balance),
    Rebase(Balance),
}
