//! Bribe escrow attached to each gauge.
//!
//! Third parties deposit arbitrary tokens; they stream to the locks voting
//! for the gauge's pool, pro rata to vote weight. The vote router is the
//! only writer of balances.

use serde::{Deserialize, Serialize};
use tracing::debug;

use vedex_core::constants::{BRIBE_MIN_DEPOSIT, MAX_BRIBE_TOKENS};
use vedex_core::error::VedexError;
use vedex_core::types::{Balance, GaugeId, LockId, Timestamp, TokenId};

use crate::ledger::{Env, Ledger};
use crate::rewards::RewardLedger;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Bribe {
    pub gauge: GaugeId,
    pub rewards: RewardLedger<LockId>,
}

impl Bribe {
    pub fn new(gauge: GaugeId) -> Self {
        Self { gauge, rewards: RewardLedger::default() }
    }
}

impl Ledger {
    pub fn bribe(&self, gauge: GaugeId) -> Result<&Bribe, VedexError> {
        self.bribes.get(&gauge).ok_or(VedexError::GaugeNotFound(gauge.0))
    }

    fn bribe_mut(&mut self, gauge: GaugeId) -> Result<&mut Bribe, VedexError> {
        self.bribes.get_mut(&gauge).ok_or(VedexError::GaugeNotFound(gauge.0))
    }

    pub fn bribe_earned(&self, gauge: GaugeId, token: &TokenId, lock: LockId, now: Timestamp) -> Result<Balance, VedexError> {
        self.bribe(gauge)?.rewards.earned(token, &lock, now)
    }

    pub fn bribe_notify_reward(&mut self, env: &Env, gauge: GaugeId, token: &TokenId, amount: Balance) -> Result<(), VedexError> {
        if amount < BRIBE_MIN_DEPOSIT {
            return Err(VedexError::BribeBelowMinimum { min: BRIBE_MIN_DEPOSIT });
        }
        self.tokens.info(token)?;
        self.bribe(gauge)?;
        self.tokens.transfer(token, &env.caller, &gauge.bribe_account(), amount)?;
        self.bribe_mut(gauge)?
            .rewards
            .notify(token, amount, env.now, Some(MAX_BRIBE_TOKENS))?;
        debug!(gauge = %gauge, token = %token, amount, "bribe deposited");
        Ok(())
    }

    /// Pay `lock`'s bribes in `tokens` to its owner.
    pub fn bribe_get_reward(
        &mut self,
        env: &Env,
        gauge: GaugeId,
        lock: LockId,
        tokens: &[TokenId],
    ) -> Result<Vec<(TokenId, Balance)>, VedexError> {
        self.escrow.owned(lock, &env.caller)?;
        let paid = self.bribe_mut(gauge)?.rewards.claim(&lock, tokens, env.now)?;
        for (token, amount) in &paid {
            self.tokens.transfer(token, &gauge.bribe_account(), &env.caller, *amount)?;
        }
        Ok(paid)
    }

    pub(crate) fn bribe_deposit(&mut self, gauge: GaugeId, lock: LockId, weight: Balance, now: Timestamp) -> Result<(), VedexError> {
        self.bribe_mut(gauge)?.rewards.deposit(&lock, weight, now)
    }

    pub(crate) fn bribe_withdraw(&mut self, gauge: GaugeId, lock: LockId, weight: Balance, now: Timestamp) -> Result<(), VedexError> {
        self.bribe_mut(gauge)?.rewards.withdraw(&lock, weight, now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::testkit::*;
    use vedex_core::constants::{DAY, REWARD_WINDOW, UNIT, WEEK};
    use vedex_core::types::PoolId;

    fn dai() -> TokenId {
        TokenId::new("DAI")
    }

    fn with_gauge() -> (Ledger, PoolId, GaugeId) {
        let mut l = ledger();
        let e = env(&admin(), T0, 1);
        let pool = l.create_pool(&e, &dai(), &TokenId::new("WETH"), false).unwrap();
        let (gauge, _) = l.create_gauge(&e, pool).unwrap();
        (l, pool, gauge)
    }

    #[test]
    fn two_equal_voters_share_a_bribe() {
        let (mut l, pool, g) = with_gauge();
        let a = l.create_lock(&env(&alice(), T0, 1), 1_000 * UNIT, 52 * WEEK, None).unwrap();
        let b = l.create_lock(&env(&bob(), T0, 1), 1_000 * UNIT, 52 * WEEK, None).unwrap();
        let t = T0 + DAY;
        l.vote(&env(&alice(), t, 2), a, &[pool], &[100]).unwrap();
        l.vote(&env(&bob(), t, 2), b, &[pool], &[100]).unwrap();

        let bribe = 10_000 * UNIT;
        fund(&mut l, &admin(), "DAI", bribe);
        l.bribe_notify_reward(&env(&admin(), t, 2), g, &dai(), bribe).unwrap();

        let end = t + REWARD_WINDOW;
        let paid_a = l.bribe_get_reward(&env(&alice(), end, 3), g, a, &[dai()]).unwrap();
        let paid_b = l.bribe_get_reward(&env(&bob(), end, 3), g, b, &[dai()]).unwrap();
        let (pa, pb) = (paid_a[0].1, paid_b[0].1);
        assert_eq!(pa, pb);
        assert!(pa <= 5_000 * UNIT && 5_000 * UNIT - pa < REWARD_WINDOW as u128);
    }

    #[test]
    fn dust_bribes_rejected() {
        let (mut l, _, g) = with_gauge();
        let e = env(&alice(), T0, 2);
        assert_eq!(
            l.bribe_notify_reward(&e, g, &dai(), BRIBE_MIN_DEPOSIT - 1),
            Err(VedexError::BribeBelowMinimum { min: BRIBE_MIN_DEPOSIT })
        );
        l.bribe_notify_reward(&e, g, &dai(), BRIBE_MIN_DEPOSIT).unwrap();
    }

    #[test]
    fn distinct_tokens_capped() {
        let (mut l, _, g) = with_gauge();
        for i in 0..MAX_BRIBE_TOKENS {
            let symbol = format!("B{i}");
            l.tokens.register(TokenId::new(&symbol), 18, None).unwrap();
            fund(&mut l, &alice(), &symbol, UNIT);
            l.bribe_notify_reward(&env(&alice(), T0, 2), g, &TokenId::new(&symbol), UNIT).unwrap();
        }
        assert_eq!(
            l.bribe_notify_reward(&env(&alice(), T0, 2), g, &dai(), UNIT),
            Err(VedexError::TooManyRewardTokens { max: MAX_BRIBE_TOKENS })
        );
        // A tracked token can still be topped up.
        fund(&mut l, &alice(), "B0", UNIT);
        l.bribe_notify_reward(&env(&alice(), T0, 2), g, &TokenId::new("B0"), UNIT).unwrap();
    }

    #[test]
    fn only_lock_owner_claims() {
        let (mut l, pool, g) = with_gauge();
        let a = l.create_lock(&env(&alice(), T0, 1), 1_000 * UNIT, 52 * WEEK, None).unwrap();
        l.vote(&env(&alice(), T0 + DAY, 2), a, &[pool], &[100]).unwrap();
        assert_eq!(
            l.bribe_get_reward(&env(&bob(), T0 + DAY, 2), g, a, &[dai()]),
            Err(VedexError::NotLockOwner(a.0))
        );
    }
}
