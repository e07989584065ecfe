//! Time-weighted reward streams over a set of balances.
//!
//! Gauges key balances by account (staked liquidity claims); bribes key them
//! by lock (vote weight). Each reward token runs its own stream with a fixed
//! window, see [`vedex_math::reward`].

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use vedex_core::constants::REWARD_WINDOW;
use vedex_core::error::VedexError;
use vedex_core::types::{Balance, Timestamp, TokenId};
use vedex_math::reward::{earned, next_rate, reward_per_token};
use vedex_math::U256;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RewardStream<K: Ord> {
    pub token: TokenId,
    pub reward_rate: Balance,
    pub period_finish: Timestamp,
    pub last_update: Timestamp,
    pub reward_per_token_stored: U256,
    /// Emitted while nothing was staked; folded into the next notify.
    pub unallocated: Balance,
    paid: BTreeMap<K, U256>,
    pending: BTreeMap<K, Balance>,
}

impl<K: Ord + Clone> RewardStream<K> {
    fn new(token: TokenId) -> Self {
        Self {
            token,
            reward_rate: 0,
            period_finish: 0,
            last_update: 0,
            reward_per_token_stored: U256::zero(),
            unallocated: 0,
            paid: BTreeMap::new(),
            pending: BTreeMap::new(),
        }
    }

    fn applicable(&self, now: Timestamp) -> Timestamp {
        now.min(self.period_finish)
    }

    fn reward_per_token(&self, now: Timestamp, total_supply: Balance) -> U256 {
        reward_per_token(
            self.reward_per_token_stored,
            self.reward_rate,
            self.last_update,
            self.applicable(now),
            total_supply,
        )
    }

    fn update_global(&mut self, now: Timestamp, total_supply: Balance) -> Result<(), VedexError> {
        let applicable = self.applicable(now);
        if total_supply == 0 && applicable > self.last_update {
            let idle = ((applicable - self.last_update) as u128)
                .checked_mul(self.reward_rate)
                .ok_or(VedexError::Overflow)?;
            self.unallocated = self.unallocated.checked_add(idle).ok_or(VedexError::Overflow)?;
        }
        self.reward_per_token_stored = self.reward_per_token(now, total_supply);
        self.last_update = applicable.max(self.last_update);
        Ok(())
    }

    fn earned(&self, key: &K, balance: Balance, now: Timestamp, total_supply: Balance) -> Result<Balance, VedexError> {
        earned(
            balance,
            self.reward_per_token(now, total_supply),
            self.paid.get(key).copied().unwrap_or_default(),
            self.pending.get(key).copied().unwrap_or(0),
        )
    }
}

/// Balances plus the reward streams that pay out over them.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RewardLedger<K: Ord> {
    pub total_supply: Balance,
    balances: BTreeMap<K, Balance>,
    streams: Vec<RewardStream<K>>,
}

impl<K: Ord> Default for RewardLedger<K> {
    fn default() -> Self {
        Self {
            total_supply: 0,
            balances: BTreeMap::new(),
            streams: Vec::new(),
        }
    }
}

impl<K: Ord + Clone> RewardLedger<K> {
    pub fn balance_of(&self, key: &K) -> Balance {
        self.balances.get(key).copied().unwrap_or(0)
    }

    pub fn reward_tokens(&self) -> Vec<TokenId> {
        self.streams.iter().map(|s| s.token.clone()).collect()
    }

    pub fn stream(&self, token: &TokenId) -> Option<&RewardStream<K>> {
        self.streams.iter().find(|s| &s.token == token)
    }

    pub fn reward_per_token(&self, token: &TokenId, now: Timestamp) -> U256 {
        self.stream(token)
            .map(|s| s.reward_per_token(now, self.total_supply))
            .unwrap_or_default()
    }

    pub fn earned(&self, token: &TokenId, key: &K, now: Timestamp) -> Result<Balance, VedexError> {
        match self.stream(token) {
            Some(s) => s.earned(key, self.balance_of(key), now, self.total_supply),
            None => Ok(0),
        }
    }

    /// Settle every stream for `key` at `now`. Must run before its balance
    /// changes.
    fn checkpoint(&mut self, key: &K, now: Timestamp) -> Result<(), VedexError> {
        let balance = self.balance_of(key);
        let supply = self.total_supply;
        for s in &mut self.streams {
            s.update_global(now, supply)?;
            let owed = s.earned(key, balance, now, supply)?;
            s.pending.insert(key.clone(), owed);
            s.paid.insert(key.clone(), s.reward_per_token_stored);
        }
        Ok(())
    }

    pub fn deposit(&mut self, key: &K, amount: Balance, now: Timestamp) -> Result<(), VedexError> {
        self.checkpoint(key, now)?;
        let bal = self.balance_of(key).checked_add(amount).ok_or(VedexError::Overflow)?;
        self.total_supply = self.total_supply.checked_add(amount).ok_or(VedexError::Overflow)?;
        self.balances.insert(key.clone(), bal);
        Ok(())
    }

    pub fn withdraw(&mut self, key: &K, amount: Balance, now: Timestamp) -> Result<(), VedexError> {
        let have = self.balance_of(key);
        if have < amount {
            return Err(VedexError::InsufficientBalance {
                token: "stake".into(),
                need: amount,
                have,
            });
        }
        self.checkpoint(key, now)?;
        self.total_supply -= amount;
        if have == amount {
            self.balances.remove(key);
        } else {
            self.balances.insert(key.clone(), have - amount);
        }
        Ok(())
    }

    /// Add `amount` of `token` to its stream, starting the stream when the
    /// token is new. Whatever the stream emitted while the supply was zero
    /// is re-emitted with it. `max_tokens` caps the number of distinct
    /// streams.
    pub fn notify(
        &mut self,
        token: &TokenId,
        amount: Balance,
        now: Timestamp,
        max_tokens: Option<usize>,
    ) -> Result<(), VedexError> {
        let supply = self.total_supply;
        let idx = match self.streams.iter().position(|s| &s.token == token) {
            Some(i) => i,
            None => {
                if let Some(max) = max_tokens {
                    if self.streams.len() >= max {
                        return Err(VedexError::TooManyRewardTokens { max });
                    }
                }
                self.streams.push(RewardStream::new(token.clone()));
                self.streams.len() - 1
            }
        };
        let s = &mut self.streams[idx];
        s.update_global(now, supply)?;
        let total = amount.checked_add(s.unallocated).ok_or(VedexError::Overflow)?;
        s.reward_rate = next_rate(total, now, s.period_finish, s.reward_rate)?;
        s.unallocated = 0;
        s.last_update = now;
        s.period_finish = now + REWARD_WINDOW;
        Ok(())
    }

    /// Settle and zero `key`'s rewards in `tokens`; returns what is owed.
    pub fn claim(&mut self, key: &K, tokens: &[TokenId], now: Timestamp) -> Result<Vec<(TokenId, Balance)>, VedexError> {
        self.checkpoint(key, now)?;
        let mut paid = Vec::new();
        for s in &mut self.streams {
            if !tokens.contains(&s.token) {
                continue;
            }
            if let Some(owed) = s.pending.remove(key) {
                if owed > 0 {
                    paid.push((s.token.clone(), owed));
                }
            }
        }
        Ok(paid)
    }
}
