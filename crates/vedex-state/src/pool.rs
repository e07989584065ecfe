//! Pools, the factory that creates them and the router that walks them.
//!
//! A pool holds two tokens in its own account. Reserves are the pool's view
//! of those balances as of the last `record`; anything above the reserves is
//! input for the next mint or swap, or can be skimmed.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info};

use vedex_core::action::Route;
use vedex_core::constants::{MAX_OBSERVATIONS, MAX_ROUTE_HOPS, MINIMUM_K, MINIMUM_LIQUIDITY, OBSERVATION_PERIOD};
use vedex_core::error::VedexError;
use vedex_core::types::{AccountId, Balance, PoolId, Timestamp, TokenId};
use vedex_math::fixed::{mul_div, sqrt_product, to_balance, unit};
use vedex_math::{Curve, U256};

use crate::ledger::{Env, Ledger};

/// Factory key: sorted token pair plus curve.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PoolKey {
    pub token0: TokenId,
    pub token1: TokenId,
    pub stable: bool,
}

impl PoolKey {
    pub fn new(a: &TokenId, b: &TokenId, stable: bool) -> Self {
        let (token0, token1) = if a < b { (a.clone(), b.clone()) } else { (b.clone(), a.clone()) };
        Self { token0, token1, stable }
    }
}

/// Cumulative reserves sampled at `timestamp`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Observation {
    pub timestamp: Timestamp,
    pub reserve0_cumulative: U256,
    pub reserve1_cumulative: U256,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Pool {
    pub id: PoolId,
    pub token0: TokenId,
    pub token1: TokenId,
    pub stable: bool,
    pub decimals0: u8,
    pub decimals1: u8,
    pub liquidity_token: TokenId,
    pub reserve0: Balance,
    pub reserve1: Balance,
    pub block_timestamp_last: Timestamp,
    pub reserve0_cumulative_last: U256,
    pub reserve1_cumulative_last: U256,
    pub observations: Vec<Observation>,
}

impl Pool {
    pub fn curve(&self) -> Result<Curve, VedexError> {
        Curve::new(self.stable, self.decimals0, self.decimals1)
    }

    pub fn account(&self) -> AccountId {
        self.id.account()
    }

    pub fn key(&self) -> PoolKey {
        PoolKey { token0: self.token0.clone(), token1: self.token1.clone(), stable: self.stable }
    }

    pub fn contains(&self, token: &TokenId) -> bool {
        &self.token0 == token || &self.token1 == token
    }

    /// Invariant at current reserves.
    pub fn invariant(&self) -> Result<U256, VedexError> {
        self.curve()?.k(self.reserve0, self.reserve1)
    }

    fn zero_for_one(&self, token_in: &TokenId) -> Result<bool, VedexError> {
        if token_in == &self.token0 {
            Ok(true)
        } else if token_in == &self.token1 {
            Ok(false)
        } else {
            Err(VedexError::TokenNotInPool(token_in.to_string()))
        }
    }

    /// Output for selling `amount_in` of `token_in` at current reserves.
    pub fn amount_out(&self, amount_in: Balance, token_in: &TokenId) -> Result<Balance, VedexError> {
        let zero_for_one = self.zero_for_one(token_in)?;
        let curve = self.curve()?;
        let after_fee = amount_in - curve.fee_on(amount_in);
        curve.amount_out(after_fee, self.reserve0, self.reserve1, zero_for_one)
    }

    /// Cumulative reserves extrapolated to `now`.
    pub fn current_cumulative(&self, now: Timestamp) -> (U256, U256) {
        let elapsed = now - self.block_timestamp_last;
        if elapsed <= 0 {
            return (self.reserve0_cumulative_last, self.reserve1_cumulative_last);
        }
        let dt = U256::from(elapsed as u64);
        (
            self.reserve0_cumulative_last + U256::from(self.reserve0) * dt,
            self.reserve1_cumulative_last + U256::from(self.reserve1) * dt,
        )
    }

    /// Time-weighted quote against the average reserves since the most
    /// recent observation older than `now`.
    pub fn twap_amount_out(&self, amount_in: Balance, token_in: &TokenId, now: Timestamp) -> Result<Balance, VedexError> {
        let zero_for_one = self.zero_for_one(token_in)?;
        let obs = self
            .observations
            .iter()
            .rev()
            .find(|o| o.timestamp < now)
            .ok_or(VedexError::NoObservationWindow)?;
        let (c0, c1) = self.current_cumulative(now);
        let window = U256::from((now - obs.timestamp) as u64);
        let avg0 = to_balance((c0 - obs.reserve0_cumulative) / window)?;
        let avg1 = to_balance((c1 - obs.reserve1_cumulative) / window)?;
        let curve = self.curve()?;
        curve.amount_out(amount_in - curve.fee_on(amount_in), avg0, avg1, zero_for_one)
    }

    /// Accumulate the old reserves over the elapsed time, maybe take an
    /// observation, then adopt the new balances as reserves.
    fn record(&mut self, balance0: Balance, balance1: Balance, now: Timestamp) {
        let elapsed = now - self.block_timestamp_last;
        if elapsed > 0 && self.reserve0 != 0 && self.reserve1 != 0 {
            let dt = U256::from(elapsed as u64);
            self.reserve0_cumulative_last += U256::from(self.reserve0) * dt;
            self.reserve1_cumulative_last += U256::from(self.reserve1) * dt;
        }
        let due = match self.observations.last() {
            Some(o) => now - o.timestamp > OBSERVATION_PERIOD,
            None => true,
        };
        if due {
            self.observations.push(Observation {
                timestamp: now,
                reserve0_cumulative: self.reserve0_cumulative_last,
                reserve1_cumulative: self.reserve1_cumulative_last,
            });
            if self.observations.len() > MAX_OBSERVATIONS {
                self.observations.remove(0);
            }
        }
        self.reserve0 = balance0;
        self.reserve1 = balance1;
        self.block_timestamp_last = now;
    }
}

/// Every pool ever created, indexed by id and by pair.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct PoolRegistry {
    #[serde(skip)]
    pub(crate) pools: BTreeMap<PoolId, Pool>,
    #[serde(skip)]
    index: BTreeMap<PoolKey, PoolId>,
    next_id: PoolId,
}

impl PoolRegistry {
    pub fn get(&self, id: PoolId) -> Result<&Pool, VedexError> {
        self.pools.get(&id).ok_or(VedexError::PoolNotFound(id.0))
    }

    fn get_mut(&mut self, id: PoolId) -> Result<&mut Pool, VedexError> {
        self.pools.get_mut(&id).ok_or(VedexError::PoolNotFound(id.0))
    }

    pub fn find(&self, a: &TokenId, b: &TokenId, stable: bool) -> Option<PoolId> {
        self.index.get(&PoolKey::new(a, b, stable)).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Pool> {
        self.pools.values()
    }

    pub fn len(&self) -> usize {
        self.pools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pools.is_empty()
    }

    /// Insert a pool loaded from storage and index it.
    pub(crate) fn restore(&mut self, pool: Pool) {
        self.index.insert(pool.key(), pool.id);
        self.pools.insert(pool.id, pool);
    }
}

/// `amount_a` of A priced in B at the reserve ratio.
pub fn quote(amount_a: Balance, reserve_a: Balance, reserve_b: Balance) -> Result<Balance, VedexError> {
    if amount_a == 0 {
        return Err(VedexError::ZeroAmount);
    }
    if reserve_a == 0 || reserve_b == 0 {
        return Err(VedexError::InsufficientLiquidity);
    }
    mul_div(amount_a, reserve_b, reserve_a)
}

impl Ledger {
    // ── Factory ──────────────────────────────────────────────────────────────

    pub fn create_pool(&mut self, env: &Env, token_a: &TokenId, token_b: &TokenId, stable: bool) -> Result<PoolId, VedexError> {
        if token_a.is_empty() || token_b.is_empty() {
            return Err(VedexError::EmptyTokenId);
        }
        if token_a == token_b {
            return Err(VedexError::IdenticalTokens);
        }
        let key = PoolKey::new(token_a, token_b, stable);
        let decimals0 = self.tokens.info(&key.token0)?.decimals;
        let decimals1 = self.tokens.info(&key.token1)?.decimals;
        if self.pools.index.contains_key(&key) {
            return Err(VedexError::PoolExists {
                token0: key.token0.to_string(),
                token1: key.token1.to_string(),
                stable,
            });
        }

        let id = self.pools.next_id.next();
        self.pools.next_id = id;
        let liquidity_token = TokenId::liquidity(id, stable);
        self.tokens.register(liquidity_token.clone(), 18, Some(id.account()))?;

        let pool = Pool {
            id,
            token0: key.token0.clone(),
            token1: key.token1.clone(),
            stable,
            decimals0,
            decimals1,
            liquidity_token,
            reserve0: 0,
            reserve1: 0,
            block_timestamp_last: env.now,
            reserve0_cumulative_last: U256::zero(),
            reserve1_cumulative_last: U256::zero(),
            observations: vec![Observation {
                timestamp: env.now,
                reserve0_cumulative: U256::zero(),
                reserve1_cumulative: U256::zero(),
            }],
        };
        info!(pool = %id, token0 = %key.token0, token1 = %key.token1, stable, "pool created");
        self.pools.restore(pool);
        Ok(id)
    }

    // ── Liquidity ────────────────────────────────────────────────────────────

    /// Deposit up to the desired amounts at the current ratio; returns
    /// `(amount_a, amount_b, liquidity)` with A meaning token0.
    #[allow(clippy::too_many_arguments)]
    pub fn add_liquidity(
        &mut self,
        env: &Env,
        id: PoolId,
        amount_a_desired: Balance,
        amount_b_desired: Balance,
        amount_a_min: Balance,
        amount_b_min: Balance,
        to: &AccountId,
    ) -> Result<(Balance, Balance, Balance), VedexError> {
        let pool = self.pools.get(id)?;
        let (r0, r1) = (pool.reserve0, pool.reserve1);
        let (token0, token1, account) = (pool.token0.clone(), pool.token1.clone(), pool.account());

        let (amount_a, amount_b) = if r0 == 0 && r1 == 0 {
            (amount_a_desired, amount_b_desired)
        } else {
            let b_optimal = quote(amount_a_desired, r0, r1)?;
            if b_optimal <= amount_b_desired {
                (amount_a_desired, b_optimal)
            } else {
                (quote(amount_b_desired, r1, r0)?, amount_b_desired)
            }
        };
        if amount_a < amount_a_min {
            return Err(VedexError::SlippageExceeded { min: amount_a_min, got: amount_a });
        }
        if amount_b < amount_b_min {
            return Err(VedexError::SlippageExceeded { min: amount_b_min, got: amount_b });
        }

        self.tokens.transfer(&token0, &env.caller, &account, amount_a)?;
        self.tokens.transfer(&token1, &env.caller, &account, amount_b)?;
        let liquidity = self.mint_liquidity(id, to, env.now)?;
        Ok((amount_a, amount_b, liquidity))
    }

    /// Mint claims for whatever the pool holds above its reserves.
    pub(crate) fn mint_liquidity(&mut self, id: PoolId, to: &AccountId, now: Timestamp) -> Result<Balance, VedexError> {
        let pool = self.pools.get(id)?;
        let account = pool.account();
        let b0 = self.tokens.balance_of(&pool.token0, &account);
        let b1 = self.tokens.balance_of(&pool.token1, &account);
        let a0 = b0.saturating_sub(pool.reserve0);
        let a1 = b1.saturating_sub(pool.reserve1);
        let lp = pool.liquidity_token.clone();
        let supply = self.tokens.total_supply(&lp);

        let liquidity = if supply == 0 {
            let root = sqrt_product(a0, a1)?;
            if root <= MINIMUM_LIQUIDITY {
                return Err(VedexError::InsufficientLiquidityMinted);
            }
            let curve = pool.curve()?;
            if let Curve::Stable { scale0, scale1 } = curve {
                let n0 = U256::from(a0) * unit() / U256::from(scale0);
                let n1 = U256::from(a1) * unit() / U256::from(scale1);
                if n0 != n1 {
                    return Err(VedexError::StableDepositsNotEqual);
                }
                if curve.k(a0, a1)? <= U256::from(MINIMUM_K) {
                    return Err(VedexError::MinimumKNotMet);
                }
            }
            self.tokens.mint(&lp, &AccountId::null(), MINIMUM_LIQUIDITY)?;
            root - MINIMUM_LIQUIDITY
        } else {
            mul_div(a0, supply, pool.reserve0)?.min(mul_div(a1, supply, pool.reserve1)?)
        };
        if liquidity == 0 {
            return Err(VedexError::InsufficientLiquidityMinted);
        }
        self.tokens.mint(&lp, to, liquidity)?;
        self.pools.get_mut(id)?.record(b0, b1, now);
        debug!(pool = %id, liquidity, "liquidity minted");
        Ok(liquidity)
    }

    pub fn remove_liquidity(
        &mut self,
        env: &Env,
        id: PoolId,
        liquidity: Balance,
        amount_a_min: Balance,
        amount_b_min: Balance,
        to: &AccountId,
    ) -> Result<(Balance, Balance), VedexError> {
        if liquidity == 0 {
            return Err(VedexError::ZeroAmount);
        }
        let pool = self.pools.get(id)?;
        let (lp, account) = (pool.liquidity_token.clone(), pool.account());
        self.tokens.transfer(&lp, &env.caller, &account, liquidity)?;
        let (amount_a, amount_b) = self.burn_liquidity(id, to, env.now)?;
        if amount_a < amount_a_min {
            return Err(VedexError::SlippageExceeded { min: amount_a_min, got: amount_a });
        }
        if amount_b < amount_b_min {
            return Err(VedexError::SlippageExceeded { min: amount_b_min, got: amount_b });
        }
        Ok((amount_a, amount_b))
    }

    /// Burn the claims the pool holds and pay out their share of balances.
    pub(crate) fn burn_liquidity(&mut self, id: PoolId, to: &AccountId, now: Timestamp) -> Result<(Balance, Balance), VedexError> {
        let pool = self.pools.get(id)?;
        let (token0, token1, lp, account) =
            (pool.token0.clone(), pool.token1.clone(), pool.liquidity_token.clone(), pool.account());
        let b0 = self.tokens.balance_of(&token0, &account);
        let b1 = self.tokens.balance_of(&token1, &account);
        let liquidity = self.tokens.balance_of(&lp, &account);
        let supply = self.tokens.total_supply(&lp);

        let amount0 = mul_div(liquidity, b0, supply)?;
        let amount1 = mul_div(liquidity, b1, supply)?;
        if amount0 == 0 || amount1 == 0 {
            return Err(VedexError::InsufficientLiquidityBurned);
        }
        self.tokens.burn(&lp, &account, liquidity)?;
        self.tokens.transfer(&token0, &account, to, amount0)?;
        self.tokens.transfer(&token1, &account, to, amount1)?;
        self.pools.get_mut(id)?.record(b0 - amount0, b1 - amount1, now);
        debug!(pool = %id, liquidity, amount0, amount1, "liquidity burned");
        Ok((amount0, amount1))
    }

    // ── Swaps ────────────────────────────────────────────────────────────────

    /// Low-level swap. Input must already sit in the pool account.
    pub fn swap(&mut self, env: &Env, id: PoolId, amount0_out: Balance, amount1_out: Balance, to: &AccountId) -> Result<Balance, VedexError> {
        if amount0_out == 0 && amount1_out == 0 {
            return Err(VedexError::InsufficientOutputAmount);
        }
        let pool = self.pools.get(id)?;
        let (r0, r1) = (pool.reserve0, pool.reserve1);
        if amount0_out >= r0 || amount1_out >= r1 {
            return Err(VedexError::InsufficientLiquidity);
        }
        let account = pool.account();
        if to == &account {
            return Err(VedexError::InvalidRecipient);
        }
        let (token0, token1, curve) = (pool.token0.clone(), pool.token1.clone(), pool.curve()?);

        self.tokens.transfer(&token0, &account, to, amount0_out)?;
        self.tokens.transfer(&token1, &account, to, amount1_out)?;
        let b0 = self.tokens.balance_of(&token0, &account);
        let b1 = self.tokens.balance_of(&token1, &account);

        let amount0_in = b0.saturating_sub(r0 - amount0_out);
        let amount1_in = b1.saturating_sub(r1 - amount1_out);
        if amount0_in == 0 && amount1_in == 0 {
            return Err(VedexError::InsufficientInputAmount);
        }
        let adjusted0 = b0 - curve.fee_on(amount0_in);
        let adjusted1 = b1 - curve.fee_on(amount1_in);
        if curve.k(adjusted0, adjusted1)? < curve.k(r0, r1)? {
            return Err(VedexError::InvariantViolated);
        }

        self.pools.get_mut(id)?.record(b0, b1, env.now);
        debug!(pool = %id, amount0_in, amount1_in, amount0_out, amount1_out, "swap");
        Ok(amount0_out + amount1_out)
    }

    /// Send the excess of balances over reserves to `to`.
    pub fn skim(&mut self, id: PoolId, to: &AccountId) -> Result<(), VedexError> {
        let pool = self.pools.get(id)?;
        let account = pool.account();
        let (token0, token1) = (pool.token0.clone(), pool.token1.clone());
        let extra0 = self.tokens.balance_of(&token0, &account).saturating_sub(pool.reserve0);
        let extra1 = self.tokens.balance_of(&token1, &account).saturating_sub(pool.reserve1);
        self.tokens.transfer(&token0, &account, to, extra0)?;
        self.tokens.transfer(&token1, &account, to, extra1)
    }

    /// Adopt balances as reserves.
    pub fn sync(&mut self, env: &Env, id: PoolId) -> Result<(), VedexError> {
        let pool = self.pools.get(id)?;
        let account = pool.account();
        let b0 = self.tokens.balance_of(&pool.token0, &account);
        let b1 = self.tokens.balance_of(&pool.token1, &account);
        self.pools.get_mut(id)?.record(b0, b1, env.now);
        Ok(())
    }

    // ── Router ───────────────────────────────────────────────────────────────

    fn resolve_route(&self, routes: &[Route]) -> Result<Vec<PoolId>, VedexError> {
        if routes.is_empty() || routes.len() > MAX_ROUTE_HOPS {
            return Err(VedexError::InvalidRoute(format!("expected 1..={MAX_ROUTE_HOPS} hops, got {}", routes.len())));
        }
        for pair in routes.windows(2) {
            if pair[0].to != pair[1].from {
                return Err(VedexError::InvalidRoute(format!("{} does not continue into {}", pair[0].to, pair[1].from)));
            }
        }
        routes
            .iter()
            .map(|r| {
                self.pools
                    .find(&r.from, &r.to, r.stable)
                    .ok_or_else(|| VedexError::InvalidRoute(format!("no pool for {}/{}", r.from, r.to)))
            })
            .collect()
    }

    /// Output of every hop for `amount_in`, first entry being the input.
    pub fn get_amounts_out(&self, amount_in: Balance, routes: &[Route]) -> Result<Vec<Balance>, VedexError> {
        let ids = self.resolve_route(routes)?;
        let mut amounts = vec![amount_in];
        for (route, id) in routes.iter().zip(&ids) {
            let last = amounts[amounts.len() - 1];
            amounts.push(self.pools.get(*id)?.amount_out(last, &route.from)?);
        }
        Ok(amounts)
    }

    pub fn swap_exact_in(
        &mut self,
        env: &Env,
        routes: &[Route],
        amount_in: Balance,
        amount_out_min: Balance,
        to: &AccountId,
    ) -> Result<Balance, VedexError> {
        if amount_in == 0 {
            return Err(VedexError::ZeroAmount);
        }
        let ids = self.resolve_route(routes)?;
        let amounts = self.get_amounts_out(amount_in, routes)?;
        let out = amounts[amounts.len() - 1];
        if out < amount_out_min {
            return Err(VedexError::SlippageExceeded { min: amount_out_min, got: out });
        }

        let first = self.pools.get(ids[0])?.account();
        self.tokens.transfer(&routes[0].from, &env.caller, &first, amount_in)?;
        for (i, route) in routes.iter().enumerate() {
            let pool = self.pools.get(ids[i])?;
            let hop_out = amounts[i + 1];
            let (out0, out1) = if route.from == pool.token0 { (0, hop_out) } else { (hop_out, 0) };
            let recipient = match ids.get(i + 1) {
                Some(next) => next.account(),
                None => to.clone(),
            };
            self.swap(env, ids[i], out0, out1, &recipient)?;
        }
        Ok(out)
    }
}
