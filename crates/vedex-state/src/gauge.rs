//! Per-pool gauge: stake liquidity claims, earn governance-token emissions.

use serde::{Deserialize, Serialize};
use tracing::debug;

use vedex_core::constants::GAUGE_MIN_REWARD;
use vedex_core::error::VedexError;
use vedex_core::types::{AccountId, Balance, GaugeId, PoolId, Timestamp, TokenId};

use crate::ledger::{Env, Ledger};
use crate::rewards::RewardLedger;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Gauge {
    pub id: GaugeId,
    pub pool: PoolId,
    pub lp_token: TokenId,
    pub alive: bool,
    pub rewards: RewardLedger<AccountId>,
}

impl Gauge {
    pub fn new(id: GaugeId, pool: PoolId, lp_token: TokenId) -> Self {
        Self { id, pool, lp_token, alive: true, rewards: RewardLedger::default() }
    }

    pub fn account(&self) -> AccountId {
        self.id.account()
    }
}

impl Ledger {
    pub fn gauge(&self, id: GaugeId) -> Result<&Gauge, VedexError> {
        self.gauges.get(&id).ok_or(VedexError::GaugeNotFound(id.0))
    }

    pub(crate) fn gauge_mut(&mut self, id: GaugeId) -> Result<&mut Gauge, VedexError> {
        self.gauges.get_mut(&id).ok_or(VedexError::GaugeNotFound(id.0))
    }

    pub fn gauges(&self) -> impl Iterator<Item = &Gauge> {
        self.gauges.values()
    }

    pub fn gauge_earned(&self, id: GaugeId, account: &AccountId, now: Timestamp) -> Result<Balance, VedexError> {
        let gauge = self.gauge(id)?;
        gauge.rewards.earned(&self.governance_token, account, now)
    }

    pub fn gauge_deposit(&mut self, env: &Env, id: GaugeId, amount: Balance) -> Result<(), VedexError> {
        if amount == 0 {
            return Err(VedexError::ZeroAmount);
        }
        let gauge = self.gauge(id)?;
        if !gauge.alive {
            return Err(VedexError::GaugeNotAlive(id.0));
        }
        let lp = gauge.lp_token.clone();
        self.tokens.transfer(&lp, &env.caller, &id.account(), amount)?;
        self.gauge_mut(id)?.rewards.deposit(&env.caller, amount, env.now)?;
        debug!(gauge = %id, account = %env.caller, amount, "gauge deposit");
        Ok(())
    }

    pub fn gauge_withdraw(&mut self, env: &Env, id: GaugeId, amount: Balance) -> Result<(), VedexError> {
        if amount == 0 {
            return Err(VedexError::ZeroAmount);
        }
        let lp = self.gauge(id)?.lp_token.clone();
        self.gauge_mut(id)?.rewards.withdraw(&env.caller, amount, env.now)?;
        self.tokens.transfer(&lp, &id.account(), &env.caller, amount)?;
        debug!(gauge = %id, account = %env.caller, amount, "gauge withdraw");
        Ok(())
    }

    pub fn gauge_get_reward(&mut self, env: &Env, id: GaugeId) -> Result<Vec<(TokenId, Balance)>, VedexError> {
        let gauge = self.gauge_mut(id)?;
        let tokens = gauge.rewards.reward_tokens();
        let paid = gauge.rewards.claim(&env.caller, &tokens, env.now)?;
        for (token, amount) in &paid {
            self.tokens.transfer(token, &id.account(), &env.caller, *amount)?;
        }
        Ok(paid)
    }

    /// Start or extend the gauge's emission stream with the caller's tokens.
    pub fn gauge_notify_reward(&mut self, env: &Env, id: GaugeId, token: &TokenId, amount: Balance) -> Result<(), VedexError> {
        if token != &self.governance_token {
            return Err(VedexError::InvalidRewardToken(token.to_string()));
        }
        if amount < GAUGE_MIN_REWARD {
            return Err(VedexError::RewardBelowMinimum { min: GAUGE_MIN_REWARD });
        }
        if !self.gauge(id)?.alive {
            return Err(VedexError::GaugeNotAlive(id.0));
        }
        self.tokens.transfer(token, &env.caller, &id.account(), amount)?;
        self.gauge_mut(id)?.rewards.notify(token, amount, env.now, Some(1))?;
        debug!(gauge = %id, amount, "gauge reward notified");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::testkit::*;
    use vedex_core::constants::{REWARD_WINDOW, UNIT};

    /// DAI/WETH pool with a gauge; alice and bob each hold 4 500 claims.
    fn staged() -> (Ledger, GaugeId, TokenId) {
        let mut l = ledger();
        let e = env(&alice(), T0, 1);
        let pool = l.create_pool(&e, &TokenId::new("DAI"), &TokenId::new("WETH"), false).unwrap();
        l.add_liquidity(&e, pool, 10_000, 10_000, 0, 0, &alice()).unwrap();
        let lp = l.pools.get(pool).unwrap().liquidity_token.clone();
        l.tokens.transfer(&lp, &alice(), &bob(), 4_500).unwrap();
        let (gauge, _) = l.create_gauge(&env(&admin(), T0, 1), pool).unwrap();
        (l, gauge, lp)
    }

    #[test]
    fn stakers_split_emissions_by_stake() {
        let (mut l, g, _) = staged();
        l.gauge_deposit(&env(&alice(), T0, 2), g, 3_000).unwrap();
        l.gauge_deposit(&env(&bob(), T0, 2), g, 1_000).unwrap();
        let amount = 7_000 * UNIT;
        l.gauge_notify_reward(&env(&alice(), T0, 2), g, &gov(), amount).unwrap();

        let end = T0 + REWARD_WINDOW;
        let a = l.gauge_earned(g, &alice(), end).unwrap();
        let b = l.gauge_earned(g, &bob(), end).unwrap();
        assert!(a + b <= amount);
        // Only the rate's rounding is lost.
        assert!(amount - (a + b) < REWARD_WINDOW as u128 * 2);
        assert!(a >= 3 * b && a - 3 * b <= 3);

        let before = l.governance_balance(&bob());
        let paid = l.gauge_get_reward(&env(&bob(), end, 3), g).unwrap();
        assert_eq!(paid, vec![(gov(), b)]);
        assert_eq!(l.governance_balance(&bob()), before + b);
        assert!(l.gauge_get_reward(&env(&bob(), end, 3), g).unwrap().is_empty());
    }

    #[test]
    fn withdraw_returns_claims() {
        let (mut l, g, lp) = staged();
        l.gauge_deposit(&env(&bob(), T0, 2), g, 1_000).unwrap();
        assert_eq!(l.tokens.balance_of(&lp, &bob()), 3_500);
        l.gauge_withdraw(&env(&bob(), T0 + 5, 3), g, 1_000).unwrap();
        assert_eq!(l.tokens.balance_of(&lp, &bob()), 4_500);
        assert!(l.gauge_withdraw(&env(&bob(), T0 + 5, 3), g, 1).is_err());
    }

    #[test]
    fn only_governance_token_above_minimum() {
        let (mut l, g, _) = staged();
        let e = env(&alice(), T0, 2);
        assert!(matches!(
            l.gauge_notify_reward(&e, g, &TokenId::new("DAI"), UNIT),
            Err(VedexError::InvalidRewardToken(_))
        ));
        assert_eq!(
            l.gauge_notify_reward(&e, g, &gov(), GAUGE_MIN_REWARD - 1),
            Err(VedexError::RewardBelowMinimum { min: GAUGE_MIN_REWARD })
        );
        l.gauge_notify_reward(&e, g, &gov(), GAUGE_MIN_REWARD).unwrap();
    }

    #[test]
    fn leftover_is_folded_into_a_renewed_window() {
        let (mut l, g, _) = staged();
        l.gauge_deposit(&env(&alice(), T0, 2), g, 1_000).unwrap();
        let amount = 1_000 * UNIT;
        l.gauge_notify_reward(&env(&alice(), T0, 2), g, &gov(), amount).unwrap();
        let half = T0 + REWARD_WINDOW / 2;
        l.gauge_notify_reward(&env(&alice(), half, 3), g, &gov(), amount).unwrap();
        let stream = l.gauge(g).unwrap().rewards.stream(&gov()).unwrap();
        assert_eq!(stream.period_finish, half + REWARD_WINDOW);
        let earned = l.gauge_earned(g, &alice(), half + REWARD_WINDOW).unwrap();
        assert!(earned <= 2 * amount && 2 * amount - earned < 1_000_000);
    }

    #[test]
    fn dead_gauge_refuses_stake_and_rewards() {
        let (mut l, g, _) = staged();
        l.kill_gauge(&env(&admin(), T0, 2), g).unwrap();
        assert_eq!(l.gauge_deposit(&env(&bob(), T0, 2), g, 10), Err(VedexError::GaugeNotAlive(g.0)));
        assert_eq!(
            l.gauge_notify_reward(&env(&alice(), T0, 2), g, &gov(), UNIT),
            Err(VedexError::GaugeNotAlive(g.0))
        );
    }
}
