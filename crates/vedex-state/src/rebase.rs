//! Rebase distributor: the lock holders' share of each emission, split by
//! voting power at the epoch boundary.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info};

use vedex_core::error::VedexError;
use vedex_core::types::{accounts, epoch_start, Balance, LockId, Timestamp};
use vedex_math::fixed::mul_div;

use crate::ledger::{Env, Ledger};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpochRecord {
    pub reward: Balance,
    /// Total voting power at the epoch start, fixed when first notified.
    pub total_power: Balance,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct RebaseDistributor {
    pub epochs: BTreeMap<Timestamp, EpochRecord>,
    claimed: BTreeMap<LockId, BTreeSet<Timestamp>>,
    /// Rewards notified while no lock had power; added to the next epoch.
    pub carried: Balance,
}

impl RebaseDistributor {
    pub fn is_claimed(&self, lock: LockId, epoch: Timestamp) -> bool {
        self.claimed.get(&lock).is_some_and(|s| s.contains(&epoch))
    }
}

impl Ledger {
    /// Minter hands over the rebase share of an emission.
    pub fn rebase_notify(&mut self, env: &Env, amount: Balance) -> Result<(), VedexError> {
        if env.caller != accounts::minter() {
            return Err(VedexError::NotMinter);
        }
        if amount == 0 {
            return Err(VedexError::EmissionTooSmall);
        }
        let gov = self.governance_token.clone();
        self.tokens.transfer(&gov, &env.caller, &accounts::rebase_distributor(), amount)?;

        let epoch = epoch_start(env.now);
        let total_power = match self.rebase.epochs.get(&epoch) {
            Some(rec) => rec.total_power,
            None => self.escrow.total_voting_power_at(epoch),
        };
        let r = &mut self.rebase;
        if total_power == 0 {
            r.carried = r.carried.checked_add(amount).ok_or(VedexError::Overflow)?;
            debug!(epoch, amount, "rebase carried, no voting power");
            return Ok(());
        }
        let reward = amount.checked_add(r.carried).ok_or(VedexError::Overflow)?;
        r.carried = 0;
        let rec = r.epochs.entry(epoch).or_insert(EpochRecord { reward: 0, total_power });
        rec.reward = rec.reward.checked_add(reward).ok_or(VedexError::Overflow)?;
        info!(epoch, reward, total_power, "rebase recorded");
        Ok(())
    }

    /// What `claim_rebase` would pay `lock` at `now`.
    pub fn rebase_claimable(&self, lock: LockId, now: Timestamp) -> Result<Balance, VedexError> {
        let l = self.escrow.get_any(lock)?;
        let mut owed: Balance = 0;
        for (epoch, rec) in self.rebase.epochs.range(..=now) {
            if self.rebase.is_claimed(lock, *epoch) {
                continue;
            }
            let power = l.voting_power_before(*epoch);
            owed += mul_div(rec.reward, power, rec.total_power)?;
        }
        Ok(owed)
    }

    /// Pay every unclaimed epoch's share. Added to the lock while it is
    /// live, sent to the owner once it has expired.
    pub fn claim_rebase(&mut self, env: &Env, lock: LockId) -> Result<Balance, VedexError> {
        let expired = self.escrow.owned(lock, &env.caller)?.is_expired(env.now);
        let owed = self.rebase_claimable(lock, env.now)?;
        let epochs: Vec<Timestamp> = self.rebase.epochs.range(..=env.now).map(|(e, _)| *e).collect();
        self.rebase.claimed.entry(lock).or_default().extend(epochs);
        if owed == 0 {
            return Ok(0);
        }

        let gov = self.governance_token.clone();
        let from = accounts::rebase_distributor();
        if expired {
            self.tokens.transfer(&gov, &from, &env.caller, owed)?;
        } else {
            self.tokens.transfer(&gov, &from, &accounts::escrow(), owed)?;
            self.credit_lock(lock, owed, env.now)?;
        }
        debug!(lock = %lock, owed, into_lock = !expired, "rebase claimed");
        Ok(owed)
    }

    pub fn claim_rebase_many(&mut self, env: &Env, locks: &[LockId]) -> Result<Balance, VedexError> {
        let mut total: Balance = 0;
        for lock in locks {
            total += self.claim_rebase(env, *lock)?;
        }
        Ok(total)
    }
}
