//! Vote router.
//!
//! Locks split their voting power across pools by percentage. The router
//! keeps the resulting per-pool weights, mirrors every allocation into the
//! pool's bribe, and turns weekly emissions into per-gauge claimables with a
//! global index: each notification raises `index` by
//! `amount × 10¹⁸ / total_weight`, and a gauge's share since its last update
//! is `weight × (index − supply_index)`.
//!
//! Guards against flash voting: a lock must be at least `MIN_HOLD_PERIOD`
//! old, may not vote in the step that created it, and votes at most once per
//! epoch.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info};

use vedex_core::constants::{GAUGE_MIN_REWARD, MIN_HOLD_PERIOD, VOTE_WEIGHT_TOTAL};
use vedex_core::error::VedexError;
use vedex_core::types::{accounts, epoch_start, Balance, GaugeId, LockId, PoolId, Timestamp, TokenId};
use vedex_math::fixed::{mul_div, to_balance, unit};
use vedex_math::U256;

use crate::bribe::Bribe;
use crate::gauge::Gauge;
use crate::ledger::{Env, Ledger};

/// Where a lock stands in the voting cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VoteStatus {
    /// Younger than the holding period.
    Created,
    Eligible,
    VotedThisEpoch,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct VoteRouter {
    pub gauge_for_pool: BTreeMap<PoolId, GaugeId>,
    next_gauge: GaugeId,
    pub whitelist: BTreeSet<TokenId>,
    weights: BTreeMap<PoolId, Balance>,
    pub total_weight: Balance,
    votes: BTreeMap<LockId, BTreeMap<PoolId, Balance>>,
    vote_pcts: BTreeMap<LockId, Vec<(PoolId, u32)>>,
    used_weights: BTreeMap<LockId, Balance>,
    /// Epoch start of the lock's last vote or reset.
    last_voted: BTreeMap<LockId, Timestamp>,
    index: U256,
    supply_index: BTreeMap<GaugeId, U256>,
    claimable: BTreeMap<GaugeId, Balance>,
    /// Emission received while nobody could take it.
    pub pending_emission: Balance,
}

impl VoteRouter {
    pub fn has_votes(&self, lock: LockId) -> bool {
        self.votes.contains_key(&lock)
    }

    pub fn gauge_for(&self, pool: PoolId) -> Result<GaugeId, VedexError> {
        self.gauge_for_pool
            .get(&pool)
            .copied()
            .ok_or(VedexError::PoolHasNoGauge(pool.0))
    }

    pub fn weight_of(&self, pool: PoolId) -> Balance {
        self.weights.get(&pool).copied().unwrap_or(0)
    }

    pub fn votes_of(&self, lock: LockId) -> Vec<(PoolId, Balance)> {
        self.votes
            .get(&lock)
            .map(|m| m.iter().map(|(p, w)| (*p, *w)).collect())
            .unwrap_or_default()
    }

    pub fn used_weight(&self, lock: LockId) -> Balance {
        self.used_weights.get(&lock).copied().unwrap_or(0)
    }

    pub fn last_voted(&self, lock: LockId) -> Option<Timestamp> {
        self.last_voted.get(&lock).copied()
    }

    pub fn claimable(&self, gauge: GaugeId) -> Balance {
        self.claimable.get(&gauge).copied().unwrap_or(0)
    }

    pub fn index(&self) -> U256 {
        self.index
    }
}

impl Ledger {
    // ── Voting ───────────────────────────────────────────────────────────────

    pub fn vote(&mut self, env: &Env, lock: LockId, pools: &[PoolId], weights: &[u32]) -> Result<(), VedexError> {
        let l = self.escrow.owned(lock, &env.caller)?;
        if l.created_step == env.step {
            return Err(VedexError::SameStepCreateAndVote);
        }
        let eligible_at = l.created_at + MIN_HOLD_PERIOD;
        if env.now < eligible_at {
            return Err(VedexError::HoldingPeriodNotMet { eligible_at });
        }
        let epoch = epoch_start(env.now);
        if self.voter.last_voted(lock) == Some(epoch) {
            return Err(VedexError::AlreadyVotedThisEpoch);
        }
        let power = l.voting_power(env.now);

        if pools.len() != weights.len() {
            return Err(VedexError::VoteLengthMismatch);
        }
        let mut seen = BTreeSet::new();
        for (pool, weight) in pools.iter().zip(weights) {
            if *weight == 0 {
                return Err(VedexError::ZeroVoteWeight);
            }
            if !seen.insert(*pool) {
                return Err(VedexError::DuplicateVotePool);
            }
        }
        let sum: u64 = weights.iter().map(|w| u64::from(*w)).sum();
        if sum != u64::from(VOTE_WEIGHT_TOTAL) {
            return Err(VedexError::VoteWeightsMismatch { got: u32::try_from(sum).unwrap_or(u32::MAX) });
        }
        for pool in pools {
            let gauge = self.voter.gauge_for(*pool)?;
            if !self.gauge(gauge)?.alive {
                return Err(VedexError::GaugeNotAlive(gauge.0));
            }
        }
        if power == 0 {
            return Err(VedexError::NoVotingPower);
        }

        let pcts: Vec<(PoolId, u32)> = pools.iter().copied().zip(weights.iter().copied()).collect();
        self.reset_votes(lock, env.now)?;
        let used = self.apply_votes(lock, &pcts, power, env.now)?;
        if used == 0 {
            return Err(VedexError::NoVotingPower);
        }
        self.voter.vote_pcts.insert(lock, pcts);
        self.voter.last_voted.insert(lock, epoch);
        info!(lock = %lock, power, used, pools = pools.len(), "voted");
        Ok(())
    }

    /// Drop every allocation of `lock`. Counts as the lock's action for the
    /// epoch.
    pub fn reset(&mut self, env: &Env, lock: LockId) -> Result<(), VedexError> {
        self.escrow.owned(lock, &env.caller)?;
        let epoch = epoch_start(env.now);
        if self.voter.last_voted(lock) == Some(epoch) {
            return Err(VedexError::AlreadyVotedThisEpoch);
        }
        self.reset_votes(lock, env.now)?;
        self.voter.vote_pcts.remove(&lock);
        self.voter.last_voted.insert(lock, epoch);
        info!(lock = %lock, "votes reset");
        Ok(())
    }

    /// Re-apply the lock's percentages at its current power. Pools whose
    /// gauge has been killed are left out.
    pub fn poke(&mut self, env: &Env, lock: LockId) -> Result<(), VedexError> {
        let power = self.escrow.owned(lock, &env.caller)?.voting_power(env.now);
        let pcts = self.voter.vote_pcts.get(&lock).cloned().unwrap_or_default();
        let mut live = Vec::with_capacity(pcts.len());
        for (pool, pct) in pcts {
            if self.gauge(self.voter.gauge_for(pool)?)?.alive {
                live.push((pool, pct));
            }
        }
        self.reset_votes(lock, env.now)?;
        let used = self.apply_votes(lock, &live, power, env.now)?;
        debug!(lock = %lock, power, used, "poked");
        Ok(())
    }

    fn apply_votes(&mut self, lock: LockId, pcts: &[(PoolId, u32)], power: Balance, now: Timestamp) -> Result<Balance, VedexError> {
        let mut alloc = BTreeMap::new();
        let mut used: Balance = 0;
        for (pool, pct) in pcts {
            let weight = mul_div(power, u128::from(*pct), u128::from(VOTE_WEIGHT_TOTAL))?;
            if weight == 0 {
                continue;
            }
            let gauge = self.voter.gauge_for(*pool)?;
            self.update_for(gauge)?;
            *self.voter.weights.entry(*pool).or_insert(0) += weight;
            self.voter.total_weight += weight;
            self.bribe_deposit(gauge, lock, weight, now)?;
            alloc.insert(*pool, weight);
            used += weight;
        }
        if !alloc.is_empty() {
            self.voter.votes.insert(lock, alloc);
            self.voter.used_weights.insert(lock, used);
        }
        Ok(used)
    }

    fn reset_votes(&mut self, lock: LockId, now: Timestamp) -> Result<(), VedexError> {
        let Some(alloc) = self.voter.votes.remove(&lock) else {
            return Ok(());
        };
        for (pool, weight) in alloc {
            let gauge = self.voter.gauge_for(pool)?;
            self.update_for(gauge)?;
            if let Some(w) = self.voter.weights.get_mut(&pool) {
                *w = w.saturating_sub(weight);
            }
            self.voter.total_weight = self.voter.total_weight.saturating_sub(weight);
            self.bribe_withdraw(gauge, lock, weight, now)?;
        }
        self.voter.used_weights.remove(&lock);
        Ok(())
    }

    pub fn vote_status(&self, lock: LockId, now: Timestamp) -> Result<VoteStatus, VedexError> {
        let l = self.escrow.get(lock)?;
        if now < l.created_at + MIN_HOLD_PERIOD {
            return Ok(VoteStatus::Created);
        }
        if self.voter.last_voted(lock) == Some(epoch_start(now)) {
            return Ok(VoteStatus::VotedThisEpoch);
        }
        Ok(VoteStatus::Eligible)
    }

    // ── Gauges ───────────────────────────────────────────────────────────────

    /// Gauge for `pool`, creating it (and its bribe) if needed. Returns
    /// `(gauge, existed)`.
    pub fn create_gauge(&mut self, env: &Env, pool: PoolId) -> Result<(GaugeId, bool), VedexError> {
        if let Some(g) = self.voter.gauge_for_pool.get(&pool) {
            return Ok((*g, true));
        }
        let p = self.pools.get(pool)?;
        if self.require_admin(&env.caller).is_err()
            && !(self.voter.whitelist.contains(&p.token0) && self.voter.whitelist.contains(&p.token1))
        {
            return Err(VedexError::NotWhitelisted);
        }
        let lp = p.liquidity_token.clone();

        let id = self.voter.next_gauge.next();
        self.voter.next_gauge = id;
        self.gauges.insert(id, Gauge::new(id, pool, lp));
        self.bribes.insert(id, Bribe::new(id));
        self.voter.gauge_for_pool.insert(pool, id);
        self.voter.supply_index.insert(id, self.voter.index);
        info!(gauge = %id, pool = %pool, "gauge created");
        Ok((id, false))
    }

    pub fn kill_gauge(&mut self, env: &Env, gauge: GaugeId) -> Result<(), VedexError> {
        self.require_admin(&env.caller)?;
        if !self.gauge(gauge)?.alive {
            return Err(VedexError::GaugeNotAlive(gauge.0));
        }
        self.update_for(gauge)?;
        let unpaid = self.voter.claimable.remove(&gauge).unwrap_or(0);
        self.voter.pending_emission += unpaid;
        self.gauge_mut(gauge)?.alive = false;
        info!(gauge = %gauge, unpaid, "gauge killed");
        Ok(())
    }

    pub fn revive_gauge(&mut self, env: &Env, gauge: GaugeId) -> Result<(), VedexError> {
        self.require_admin(&env.caller)?;
        if self.gauge(gauge)?.alive {
            return Err(VedexError::GaugeAlreadyAlive(gauge.0));
        }
        self.update_for(gauge)?;
        self.gauge_mut(gauge)?.alive = true;
        info!(gauge = %gauge, "gauge revived");
        Ok(())
    }

    pub fn whitelist_token(&mut self, env: &Env, token: &TokenId) -> Result<(), VedexError> {
        self.require_admin(&env.caller)?;
        self.tokens.info(token)?;
        self.voter.whitelist.insert(token.clone());
        Ok(())
    }

    // ── Emissions ────────────────────────────────────────────────────────────

    /// Take in emission already sitting in the router's account.
    pub(crate) fn notify_emission(&mut self, amount: Balance) -> Result<(), VedexError> {
        let v = &mut self.voter;
        if v.total_weight == 0 {
            v.pending_emission = v.pending_emission.checked_add(amount).ok_or(VedexError::Overflow)?;
            debug!(amount, pending = v.pending_emission, "emission held, no votes");
            return Ok(());
        }
        let total = amount.checked_add(v.pending_emission).ok_or(VedexError::Overflow)?;
        let ratio = U256::from(total) * unit() / U256::from(v.total_weight);
        if ratio.is_zero() {
            v.pending_emission = total;
            return Ok(());
        }
        v.pending_emission = 0;
        v.index += ratio;
        info!(amount = total, total_weight = v.total_weight, "emission notified");
        Ok(())
    }

    /// Settle `gauge`'s share of index growth since its last update.
    fn update_for(&mut self, gauge: GaugeId) -> Result<(), VedexError> {
        let g = self.gauge(gauge)?;
        let (pool, alive) = (g.pool, g.alive);
        let v = &mut self.voter;
        let supplied = v.weights.get(&pool).copied().unwrap_or(0);
        let last = v.supply_index.insert(gauge, v.index).unwrap_or(v.index);
        if supplied == 0 || v.index <= last {
            return Ok(());
        }
        let share = to_balance(U256::from(supplied) * (v.index - last) / unit())?;
        if alive {
            let c = v.claimable.entry(gauge).or_insert(0);
            *c = c.checked_add(share).ok_or(VedexError::Overflow)?;
        } else {
            v.pending_emission = v.pending_emission.checked_add(share).ok_or(VedexError::Overflow)?;
        }
        Ok(())
    }

    /// Roll the minter if it is running and due, then stream each listed
    /// gauge's claimable into it. Amounts below `GAUGE_MIN_REWARD` wait.
    pub fn distribute(&mut self, env: &Env, gauges: &[GaugeId]) -> Result<Balance, VedexError> {
        if self.minter.started {
            self.update_period(env)?;
        }
        let router = env.as_component(accounts::voter());
        let gov = self.governance_token.clone();
        let mut total: Balance = 0;
        for gauge in gauges {
            self.update_for(*gauge)?;
            if !self.gauge(*gauge)?.alive {
                continue;
            }
            let amount = self.voter.claimable(*gauge);
            if amount < GAUGE_MIN_REWARD {
                continue;
            }
            self.voter.claimable.remove(gauge);
            self.gauge_notify_reward(&router, *gauge, &gov, amount)?;
            total += amount;
        }
        if total > 0 {
            info!(total, gauges = gauges.len(), "emissions distributed");
        }
        Ok(total)
    }

    /// Claim every bribe token of each listed gauge for `lock`.
    pub fn claim_bribes(&mut self, env: &Env, gauges: &[GaugeId], lock: LockId) -> Result<Vec<(TokenId, Balance)>, VedexError> {
        let mut paid = Vec::new();
        for gauge in gauges {
            let tokens = self.bribe(*gauge)?.rewards.reward_tokens();
            paid.extend(self.bribe_get_reward(env, *gauge, lock, &tokens)?);
        }
        Ok(paid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::testkit::*;
    use vedex_core::constants::{DAY, UNIT, WEEK};

    struct Setup {
        l: Ledger,
        p1: PoolId,
        p2: PoolId,
        g1: GaugeId,
        g2: GaugeId,
        a: LockId,
        b: LockId,
    }

    /// Two gauged pools; alice and bob each lock 1 000 VEX for a year at T0.
    fn setup() -> Setup {
        let mut l = ledger();
        let e = env(&admin(), T0, 1);
        let p1 = l.create_pool(&e, &TokenId::new("DAI"), &TokenId::new("WETH"), false).unwrap();
        let p2 = l.create_pool(&e, &TokenId::new("USDC"), &TokenId::new("DAI"), true).unwrap();
        let (g1, _) = l.create_gauge(&e, p1).unwrap();
        let (g2, _) = l.create_gauge(&e, p2).unwrap();
        let a = l.create_lock(&env(&alice(), T0, 1), 1_000 * UNIT, 52 * WEEK, None).unwrap();
        let b = l.create_lock(&env(&bob(), T0, 1), 1_000 * UNIT, 52 * WEEK, None).unwrap();
        Setup { l, p1, p2, g1, g2, a, b }
    }

    const T1: Timestamp = T0 + DAY;

    #[test]
    fn weights_must_sum_to_one_hundred() {
        let Setup { mut l, p1, p2, a, .. } = setup();
        let e = env(&alice(), T1, 2);
        assert_eq!(l.vote(&e, a, &[p1, p2], &[50, 40]), Err(VedexError::VoteWeightsMismatch { got: 90 }));
        assert_eq!(l.vote(&e, a, &[p1, p2], &[60, 50]), Err(VedexError::VoteWeightsMismatch { got: 110 }));
        assert_eq!(l.vote(&e, a, &[p1, p2], &[100]), Err(VedexError::VoteLengthMismatch));
        assert_eq!(l.vote(&e, a, &[p1, p2], &[100, 0]), Err(VedexError::ZeroVoteWeight));
        assert_eq!(l.vote(&e, a, &[p1, p1], &[50, 50]), Err(VedexError::DuplicateVotePool));
        assert_eq!(l.vote(&e, a, &[], &[]), Err(VedexError::VoteWeightsMismatch { got: 0 }));
        assert_eq!(
            l.vote(&e, a, &[PoolId(99)], &[100]),
            Err(VedexError::PoolHasNoGauge(99))
        );
        l.vote(&e, a, &[p1, p2], &[70, 30]).unwrap();
    }

    #[test]
    fn allocations_conserve_weight() {
        let Setup { mut l, p1, p2, a, b, .. } = setup();
        l.vote(&env(&alice(), T1, 2), a, &[p1, p2], &[33, 67]).unwrap();
        l.vote(&env(&bob(), T1, 2), b, &[p2], &[100]).unwrap();

        let power = l.escrow.voting_power(a, T1).unwrap();
        let used = l.voter.used_weight(a);
        assert!(used <= power && power - used < 2);
        let sum: Balance = l.voter.votes_of(a).iter().map(|(_, w)| w).sum();
        assert_eq!(sum, used);
        assert_eq!(
            l.voter.total_weight,
            l.voter.weight_of(p1) + l.voter.weight_of(p2)
        );
        assert_eq!(l.voter.total_weight, used + l.voter.used_weight(b));
    }

    #[test]
    fn anti_flash_guards() {
        let Setup { mut l, p1, .. } = setup();
        let fresh = l.create_lock(&env(&alice(), T1, 5), 10 * UNIT, 52 * WEEK, None).unwrap();
        assert_eq!(
            l.vote(&env(&alice(), T1 + DAY, 5), fresh, &[p1], &[100]),
            Err(VedexError::SameStepCreateAndVote)
        );
        assert_eq!(
            l.vote(&env(&alice(), T1 + 10, 6), fresh, &[p1], &[100]),
            Err(VedexError::HoldingPeriodNotMet { eligible_at: T1 + DAY })
        );
        assert_eq!(l.vote_status(fresh, T1 + 10).unwrap(), VoteStatus::Created);

        l.vote(&env(&alice(), T1 + DAY, 6), fresh, &[p1], &[100]).unwrap();
        assert_eq!(l.vote_status(fresh, T1 + DAY).unwrap(), VoteStatus::VotedThisEpoch);
        assert_eq!(
            l.vote(&env(&alice(), T1 + 2 * DAY, 7), fresh, &[p1], &[100]),
            Err(VedexError::AlreadyVotedThisEpoch)
        );

        let next_epoch = T0 + WEEK;
        assert_eq!(l.vote_status(fresh, next_epoch).unwrap(), VoteStatus::Eligible);
        l.vote(&env(&alice(), next_epoch, 8), fresh, &[p1], &[100]).unwrap();
    }

    #[test]
    fn expired_lock_cannot_vote() {
        let Setup { mut l, p1, b, .. } = setup();
        l.vote(&env(&bob(), T1, 2), b, &[p1], &[100]).unwrap();
        let before = l.voter.weight_of(p1);
        // Shortest lock: unlocks at the next epoch boundary.
        let short = l.create_lock(&env(&alice(), T0, 1), 10 * UNIT, WEEK, None).unwrap();
        assert_eq!(l.escrow.get(short).unwrap().unlock, T0 + WEEK);

        let at_unlock = T0 + WEEK;
        assert_eq!(l.escrow.voting_power(short, at_unlock).unwrap(), 0);
        assert_eq!(l.vote(&env(&alice(), at_unlock, 3), short, &[p1], &[100]), Err(VedexError::NoVotingPower));
        assert_eq!(
            l.vote(&env(&alice(), at_unlock + 3 * WEEK, 4), short, &[p1], &[100]),
            Err(VedexError::NoVotingPower)
        );
        assert!(!l.voter.has_votes(short));
        assert_eq!(l.voter.last_voted(short), None);
        assert_eq!(l.voter.weight_of(p1), before);
        assert_eq!(l.voter.total_weight, before);
    }

    #[test]
    fn only_owner_votes() {
        let Setup { mut l, p1, a, .. } = setup();
        assert_eq!(l.vote(&env(&bob(), T1, 2), a, &[p1], &[100]), Err(VedexError::NotLockOwner(a.0)));
    }

    #[test]
    fn revote_replaces_allocation() {
        let Setup { mut l, p1, p2, a, .. } = setup();
        l.vote(&env(&alice(), T1, 2), a, &[p1], &[100]).unwrap();
        let t = T0 + WEEK;
        l.vote(&env(&alice(), t, 3), a, &[p2], &[100]).unwrap();
        assert_eq!(l.voter.weight_of(p1), 0);
        assert_eq!(l.voter.weight_of(p2), l.voter.total_weight);
        assert_eq!(l.voter.votes_of(a).len(), 1);
    }

    #[test]
    fn votes_pin_the_lock_until_reset() {
        let Setup { mut l, p1, a, .. } = setup();
        l.vote(&env(&alice(), T1, 2), a, &[p1], &[100]).unwrap();
        let e = env(&alice(), T1 + DAY, 3);
        assert_eq!(l.split(&e, a, UNIT), Err(VedexError::LockHasActiveVotes));
        assert_eq!(l.transfer_lock(&e, a, &bob()), Err(VedexError::LockHasActiveVotes));
        let other = l.create_lock(&e, UNIT, 52 * WEEK, None).unwrap();
        assert_eq!(l.merge(&e, a, other), Err(VedexError::LockHasActiveVotes));

        assert_eq!(l.reset(&e, a), Err(VedexError::AlreadyVotedThisEpoch));
        let next = env(&alice(), T0 + WEEK, 4);
        l.reset(&next, a).unwrap();
        assert!(!l.voter.has_votes(a));
        assert_eq!(l.voter.total_weight, 0);
        l.split(&next, a, UNIT).unwrap();
    }

    #[test]
    fn poke_tracks_decay() {
        let Setup { mut l, p1, p2, a, .. } = setup();
        l.vote(&env(&alice(), T1, 2), a, &[p1, p2], &[50, 50]).unwrap();
        let before = l.voter.used_weight(a);
        let later = T1 + 20 * WEEK;
        l.poke(&env(&alice(), later, 3), a).unwrap();
        let after = l.voter.used_weight(a);
        assert!(after < before);
        let power = l.escrow.voting_power(a, later).unwrap();
        assert!(power - after < 2);
        assert_eq!(l.voter.total_weight, after);
    }

    #[test]
    fn gauge_creation_rules() {
        let mut l = ledger();
        let e = env(&alice(), T0, 1);
        let pool = l.create_pool(&e, &TokenId::new("DAI"), &TokenId::new("WETH"), false).unwrap();
        assert_eq!(l.create_gauge(&e, pool), Err(VedexError::NotWhitelisted));
        assert_eq!(l.whitelist_token(&e, &TokenId::new("DAI")), Err(VedexError::NotAdmin));

        let admin_env = env(&admin(), T0, 1);
        l.whitelist_token(&admin_env, &TokenId::new("DAI")).unwrap();
        assert_eq!(l.create_gauge(&e, pool), Err(VedexError::NotWhitelisted));
        l.whitelist_token(&admin_env, &TokenId::new("WETH")).unwrap();
        let (g, existed) = l.create_gauge(&e, pool).unwrap();
        assert!(!existed);
        assert_eq!(l.create_gauge(&e, pool).unwrap(), (g, true));
        assert!(l.bribe(g).is_ok());
    }

    #[test]
    fn emission_without_votes_is_held_then_released() {
        let Setup { mut l, p1, g1, g2, a, .. } = setup();
        fund(&mut l, &accounts::voter(), "VEX", 1_000 * UNIT);
        l.notify_emission(400 * UNIT).unwrap();
        assert_eq!(l.voter.pending_emission, 400 * UNIT);
        assert!(l.voter.index().is_zero());

        l.vote(&env(&alice(), T1, 2), a, &[p1], &[100]).unwrap();
        l.notify_emission(600 * UNIT).unwrap();
        assert_eq!(l.voter.pending_emission, 0);

        let paid = l.distribute(&env(&bob(), T1, 3), &[g1, g2]).unwrap();
        // Index rounding loses at most one unit per unit of weight.
        assert!(paid <= 1_000 * UNIT && 1_000 * UNIT - paid < 1_000);
        assert_eq!(l.voter.claimable(g1), 0);
        assert!(l.gauge(g1).unwrap().rewards.stream(&gov()).is_some());
        assert!(l.gauge(g2).unwrap().rewards.stream(&gov()).is_none());
    }

    #[test]
    fn small_claimables_wait() {
        let Setup { mut l, p1, g1, a, .. } = setup();
        l.vote(&env(&alice(), T1, 2), a, &[p1], &[100]).unwrap();
        fund(&mut l, &accounts::voter(), "VEX", GAUGE_MIN_REWARD);
        l.notify_emission(GAUGE_MIN_REWARD / 2).unwrap();
        assert_eq!(l.distribute(&env(&bob(), T1, 3), &[g1]).unwrap(), 0);
        assert!(l.voter.claimable(g1) > 0);
    }

    #[test]
    fn killing_a_gauge_returns_its_share_to_pending() {
        let Setup { mut l, p1, p2, g1, a, b, .. } = setup();
        l.vote(&env(&alice(), T1, 2), a, &[p1, p2], &[50, 50]).unwrap();
        l.notify_emission(1_000 * UNIT).unwrap();
        l.kill_gauge(&env(&admin(), T1, 3), g1).unwrap();
        let pending = l.voter.pending_emission;
        assert!(pending > 499 * UNIT && pending <= 500 * UNIT);
        assert_eq!(l.voter.claimable(g1), 0);
        assert_eq!(l.kill_gauge(&env(&admin(), T1, 3), g1), Err(VedexError::GaugeNotAlive(g1.0)));
        assert_eq!(l.vote(&env(&bob(), T1, 3), b, &[p1], &[100]), Err(VedexError::GaugeNotAlive(g1.0)));

        l.revive_gauge(&env(&admin(), T1, 4), g1).unwrap();
        assert_eq!(l.revive_gauge(&env(&admin(), T1, 4), g1), Err(VedexError::GaugeAlreadyAlive(g1.0)));
    }

    #[test]
    fn claim_bribes_across_gauges() {
        let Setup { mut l, p1, p2, g1, g2, a, .. } = setup();
        l.vote(&env(&alice(), T1, 2), a, &[p1, p2], &[50, 50]).unwrap();
        let e = env(&bob(), T1, 2);
        l.bribe_notify_reward(&e, g1, &TokenId::new("DAI"), 100 * UNIT).unwrap();
        l.bribe_notify_reward(&e, g2, &TokenId::new("WETH"), 100 * UNIT).unwrap();
        let paid = l.claim_bribes(&env(&alice(), T1 + WEEK, 3), &[g1, g2], a).unwrap();
        assert_eq!(paid.len(), 2);
        assert_eq!(paid[0].0, TokenId::new("DAI"));
        assert_eq!(paid[1].0, TokenId::new("WETH"));
    }
}
