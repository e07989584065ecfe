//! Vote-escrow lock registry.
//!
//! Governance tokens locked here mint non-transferable voting power that
//! decays linearly to zero at the unlock time. Every change to a lock is
//! checkpointed so power can be evaluated at past epoch boundaries.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::info;

use vedex_core::constants::MAX_LOCK_DURATION;
use vedex_core::error::VedexError;
use vedex_core::types::{accounts, AccountId, Balance, LockId, Step, Timestamp};
use vedex_math::{unlock_time, voting_power};

use crate::ledger::{Env, Ledger};

/// Lock state as of `ts`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockPoint {
    pub ts: Timestamp,
    pub amount: Balance,
    pub unlock: Timestamp,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Lock {
    pub id: LockId,
    /// `None` once withdrawn or merged away.
    pub owner: Option<AccountId>,
    pub amount: Balance,
    pub unlock: Timestamp,
    pub created_at: Timestamp,
    pub created_step: Step,
    /// Extensions may not push `unlock` past this plus `MAX_LOCK_DURATION`.
    pub horizon_origin: Timestamp,
    pub history: Vec<LockPoint>,
}

impl Lock {
    pub fn is_expired(&self, now: Timestamp) -> bool {
        now >= self.unlock
    }

    pub fn is_burned(&self) -> bool {
        self.owner.is_none()
    }

    pub fn is_owned_by(&self, who: &AccountId) -> bool {
        self.owner.as_ref() == Some(who)
    }

    pub fn voting_power(&self, now: Timestamp) -> Balance {
        voting_power(self.amount, self.unlock, now)
    }

    /// Power at `t` according to the last checkpoint strictly before `t`.
    pub fn voting_power_before(&self, t: Timestamp) -> Balance {
        self.history
            .iter()
            .rev()
            .find(|p| p.ts < t)
            .map(|p| voting_power(p.amount, p.unlock, t))
            .unwrap_or(0)
    }

    pub fn max_unlock(&self) -> Timestamp {
        self.horizon_origin + MAX_LOCK_DURATION
    }

    fn checkpoint(&mut self, now: Timestamp) {
        let point = LockPoint { ts: now, amount: self.amount, unlock: self.unlock };
        match self.history.last_mut() {
            Some(last) if last.ts == now => *last = point,
            _ => self.history.push(point),
        }
    }

    fn burn(&mut self, now: Timestamp) {
        self.owner = None;
        self.amount = 0;
        self.checkpoint(now);
    }
}

/// All locks ever created. Burned locks stay so their history keeps
/// counting towards past epochs.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct LockRegistry {
    #[serde(skip)]
    pub(crate) locks: BTreeMap<LockId, Lock>,
    next_id: LockId,
    /// Total governance tokens held in locks.
    pub supply: Balance,
}

impl LockRegistry {
    /// A live lock.
    pub fn get(&self, id: LockId) -> Result<&Lock, VedexError> {
        match self.locks.get(&id) {
            Some(l) if !l.is_burned() => Ok(l),
            _ => Err(VedexError::LockNotFound(id.0)),
        }
    }

    /// A lock, live or burned.
    pub fn get_any(&self, id: LockId) -> Result<&Lock, VedexError> {
        self.locks.get(&id).ok_or(VedexError::LockNotFound(id.0))
    }

    fn get_mut(&mut self, id: LockId) -> Result<&mut Lock, VedexError> {
        match self.locks.get_mut(&id) {
            Some(l) if !l.is_burned() => Ok(l),
            _ => Err(VedexError::LockNotFound(id.0)),
        }
    }

    /// A live lock owned by `caller`.
    pub fn owned(&self, id: LockId, caller: &AccountId) -> Result<&Lock, VedexError> {
        let lock = self.get(id)?;
        if !lock.is_owned_by(caller) {
            return Err(VedexError::NotLockOwner(id.0));
        }
        Ok(lock)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Lock> {
        self.locks.values()
    }

    pub fn locks_of<'a>(&'a self, owner: &'a AccountId) -> impl Iterator<Item = &'a Lock> + 'a {
        self.locks.values().filter(move |l| l.is_owned_by(owner))
    }

    pub fn voting_power(&self, id: LockId, now: Timestamp) -> Result<Balance, VedexError> {
        Ok(self.get(id)?.voting_power(now))
    }

    pub fn voting_power_at(&self, id: LockId, t: Timestamp) -> Result<Balance, VedexError> {
        Ok(self.get_any(id)?.voting_power_before(t))
    }

    pub fn total_voting_power(&self, now: Timestamp) -> Balance {
        self.locks.values().map(|l| l.voting_power(now)).sum()
    }

    pub fn total_voting_power_at(&self, t: Timestamp) -> Balance {
        self.locks.values().map(|l| l.voting_power_before(t)).sum()
    }

    pub(crate) fn restore(&mut self, lock: Lock) {
        self.locks.insert(lock.id, lock);
    }

    fn insert_new(&mut self, owner: AccountId, amount: Balance, unlock: Timestamp, horizon_origin: Timestamp, env: &Env) -> LockId {
        let id = self.next_id.next();
        self.next_id = id;
        let mut lock = Lock {
            id,
            owner: Some(owner),
            amount,
            unlock,
            created_at: env.now,
            created_step: env.step,
            horizon_origin,
            history: Vec::new(),
        };
        lock.checkpoint(env.now);
        self.locks.insert(id, lock);
        id
    }
}

impl Ledger {
    fn require_no_votes(&self, id: LockId) -> Result<(), VedexError> {
        if self.voter.has_votes(id) {
            return Err(VedexError::LockHasActiveVotes);
        }
        Ok(())
    }

    pub fn create_lock(&mut self, env: &Env, amount: Balance, duration: Timestamp, to: Option<&AccountId>) -> Result<LockId, VedexError> {
        if amount == 0 {
            return Err(VedexError::ZeroAmount);
        }
        let owner = to.cloned().unwrap_or_else(|| env.caller.clone());
        if owner.is_null() {
            return Err(VedexError::InvalidRecipient);
        }
        let unlock = unlock_time(env.now, duration);
        let gov = self.governance_token.clone();
        self.tokens.transfer(&gov, &env.caller, &accounts::escrow(), amount)?;
        self.escrow.supply = self.escrow.supply.checked_add(amount).ok_or(VedexError::Overflow)?;
        let id = self.escrow.insert_new(owner.clone(), amount, unlock, env.now, env);
        info!(lock = %id, owner = %owner, amount, unlock, "lock created");
        Ok(id)
    }

    /// Owner tops up an unexpired lock.
    pub fn increase_amount(&mut self, env: &Env, id: LockId, amount: Balance) -> Result<(), VedexError> {
        self.escrow.owned(id, &env.caller)?;
        self.deposit_for(env, id, amount)
    }

    /// Anyone tops up an unexpired lock with their own tokens.
    pub fn deposit_for(&mut self, env: &Env, id: LockId, amount: Balance) -> Result<(), VedexError> {
        if amount == 0 {
            return Err(VedexError::ZeroAmount);
        }
        if self.escrow.get(id)?.is_expired(env.now) {
            return Err(VedexError::LockExpired);
        }
        let gov = self.governance_token.clone();
        self.tokens.transfer(&gov, &env.caller, &accounts::escrow(), amount)?;
        self.credit_lock(id, amount, env.now)
    }

    /// Add tokens already moved into escrow to a lock.
    pub(crate) fn credit_lock(&mut self, id: LockId, amount: Balance, now: Timestamp) -> Result<(), VedexError> {
        self.escrow.supply = self.escrow.supply.checked_add(amount).ok_or(VedexError::Overflow)?;
        let lock = self.escrow.get_mut(id)?;
        lock.amount = lock.amount.checked_add(amount).ok_or(VedexError::Overflow)?;
        lock.checkpoint(now);
        Ok(())
    }

    pub fn increase_unlock_time(&mut self, env: &Env, id: LockId, duration: Timestamp) -> Result<Timestamp, VedexError> {
        let lock = self.escrow.owned(id, &env.caller)?;
        if lock.is_expired(env.now) {
            return Err(VedexError::LockExpired);
        }
        let unlock = unlock_time(env.now, duration);
        if unlock <= lock.unlock {
            return Err(VedexError::LockCanOnlyBeExtended);
        }
        let max_unlock = lock.max_unlock();
        if unlock > max_unlock {
            return Err(VedexError::LockDurationTooLong { max_unlock });
        }
        let lock = self.escrow.get_mut(id)?;
        lock.unlock = unlock;
        lock.checkpoint(env.now);
        Ok(unlock)
    }

    /// Fold `from` into `to`. `from` may be expired; `to` may not.
    pub fn merge(&mut self, env: &Env, from: LockId, to: LockId) -> Result<(), VedexError> {
        if from == to {
            return Err(VedexError::SameLock);
        }
        let source = self.escrow.owned(from, &env.caller)?;
        let target = self.escrow.owned(to, &env.caller)?;
        if target.is_expired(env.now) {
            return Err(VedexError::LockExpired);
        }
        self.require_no_votes(from)?;
        let (amount, unlock) = (source.amount, source.unlock);

        self.escrow.get_mut(from)?.burn(env.now);
        let target = self.escrow.get_mut(to)?;
        target.amount = target.amount.checked_add(amount).ok_or(VedexError::Overflow)?;
        target.unlock = target.unlock.max(unlock);
        target.checkpoint(env.now);
        info!(from = %from, to = %to, amount, "locks merged");
        Ok(())
    }

    /// Carve `amount` out of a lock into a new one with the same unlock.
    pub fn split(&mut self, env: &Env, id: LockId, amount: Balance) -> Result<LockId, VedexError> {
        let lock = self.escrow.owned(id, &env.caller)?;
        if lock.is_expired(env.now) {
            return Err(VedexError::LockExpired);
        }
        if amount == 0 || amount >= lock.amount {
            return Err(VedexError::InvalidSplitAmount);
        }
        self.require_no_votes(id)?;
        let (owner, unlock, origin) = (env.caller.clone(), lock.unlock, lock.horizon_origin);

        let lock = self.escrow.get_mut(id)?;
        lock.amount -= amount;
        lock.checkpoint(env.now);
        let new_id = self.escrow.insert_new(owner, amount, unlock, origin, env);
        info!(lock = %id, new_lock = %new_id, amount, "lock split");
        Ok(new_id)
    }

    /// Return an expired lock's tokens to its owner and burn it.
    pub fn withdraw(&mut self, env: &Env, id: LockId) -> Result<Balance, VedexError> {
        let lock = self.escrow.owned(id, &env.caller)?;
        if !lock.is_expired(env.now) {
            return Err(VedexError::LockNotExpired { unlock_time: lock.unlock });
        }
        self.require_no_votes(id)?;
        let amount = lock.amount;

        self.escrow.get_mut(id)?.burn(env.now);
        self.escrow.supply -= amount;
        let gov = self.governance_token.clone();
        self.tokens.transfer(&gov, &accounts::escrow(), &env.caller, amount)?;
        info!(lock = %id, amount, "lock withdrawn");
        Ok(amount)
    }

    pub fn transfer_lock(&mut self, env: &Env, id: LockId, to: &AccountId) -> Result<(), VedexError> {
        self.escrow.owned(id, &env.caller)?;
        if to.is_null() {
            return Err(VedexError::InvalidRecipient);
        }
        self.require_no_votes(id)?;
        self.escrow.get_mut(id)?.owner = Some(to.clone());
        info!(lock = %id, to = %to, "lock transferred");
        Ok(())
    }
}
