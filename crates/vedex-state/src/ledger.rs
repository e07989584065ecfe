use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use vedex_core::error::VedexError;
use vedex_core::types::{accounts, AccountId, GaugeId, Step, Timestamp, TokenId};

use crate::bribe::Bribe;
use crate::escrow::LockRegistry;
use crate::gauge::Gauge;
use crate::minter::Minter;
use crate::pool::PoolRegistry;
use crate::rebase::RebaseDistributor;
use crate::tokens::TokenLedger;
use crate::voter::VoteRouter;

/// Who is calling, and when. Injected by the host for every call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Env {
    pub caller: AccountId,
    pub now: Timestamp,
    pub step: Step,
}

impl Env {
    pub fn new(caller: AccountId, now: Timestamp, step: Step) -> Self {
        Self { caller, now, step }
    }

    /// Same instant, different caller. Used when a component acts on its own
    /// behalf inside a call (the minter notifying the distributor…).
    pub fn as_component(&self, account: AccountId) -> Self {
        Self { caller: account, now: self.now, step: self.step }
    }
}

/// Last applied instant. Calls may share a timestamp or step but never go
/// back.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Clock {
    pub last_timestamp: Timestamp,
    pub last_step: Step,
    pub calls_applied: u64,
}

impl Clock {
    pub fn advance(&mut self, now: Timestamp, step: Step) -> Result<(), VedexError> {
        if now < self.last_timestamp {
            return Err(VedexError::ClockWentBackwards { last: self.last_timestamp, got: now });
        }
        if step < self.last_step {
            return Err(VedexError::StepWentBackwards { last: self.last_step, got: step });
        }
        self.last_timestamp = now;
        self.last_step = step;
        self.calls_applied += 1;
        Ok(())
    }
}

/// The whole protocol state. Operations are methods on `Ledger` spread over
/// the component modules; the engine applies them to a clone and swaps the
/// clone in on success.
///
/// Maps marked `serde(skip)` are persisted record by record in their own
/// sled trees, everything else goes into a single meta blob.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Ledger {
    pub admin: Option<AccountId>,
    pub governance_token: TokenId,
    pub clock: Clock,
    pub tokens: TokenLedger,
    pub pools: PoolRegistry,
    pub escrow: LockRegistry,
    pub voter: VoteRouter,
    #[serde(skip)]
    pub(crate) gauges: BTreeMap<GaugeId, Gauge>,
    #[serde(skip)]
    pub(crate) bribes: BTreeMap<GaugeId, Bribe>,
    pub minter: Minter,
    pub rebase: RebaseDistributor,
}

impl Ledger {
    pub fn require_admin(&self, caller: &AccountId) -> Result<(), VedexError> {
        match &self.admin {
            Some(a) if a == caller => Ok(()),
            _ => Err(VedexError::NotAdmin),
        }
    }

    /// Caller-initiated token transfer.
    pub fn transfer(&mut self, env: &Env, token: &TokenId, to: &AccountId, amount: u128) -> Result<(), VedexError> {
        if amount == 0 {
            return Err(VedexError::ZeroAmount);
        }
        self.tokens.transfer(token, &env.caller, to, amount)
    }

    pub fn governance_balance(&self, account: &AccountId) -> u128 {
        self.tokens.balance_of(&self.governance_token, account)
    }

    /// Accounts that hold protocol funds: the null sink, the singleton
    /// components, and every pool, gauge and bribe account. These only ever
    /// act through the ledger itself, never as the caller of a call.
    pub fn is_component_account(&self, who: &AccountId) -> bool {
        who.is_null()
            || [accounts::escrow(), accounts::voter(), accounts::minter(), accounts::rebase_distributor()].contains(who)
            || self.pools.iter().any(|p| &p.account() == who)
            || self.gauges.keys().any(|g| &g.account() == who || &g.bribe_account() == who)
    }
}
