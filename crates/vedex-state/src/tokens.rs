use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use vedex_core::constants::MAX_TOKEN_DECIMALS;
use vedex_core::error::VedexError;
use vedex_core::types::{AccountId, Balance, TokenId};

/// Metadata of a registered fungible token.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenInfo {
    pub id: TokenId,
    pub decimals: u8,
    pub total_supply: Balance,
    /// Only this account may mint. `None` means fixed supply.
    pub minter: Option<AccountId>,
}

/// Minimal fungible-token bookkeeping: balances, transfer, mint, burn.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct TokenLedger {
    tokens: BTreeMap<TokenId, TokenInfo>,
    balances: BTreeMap<TokenId, BTreeMap<AccountId, Balance>>,
}

impl TokenLedger {
    pub fn register(&mut self, id: TokenId, decimals: u8, minter: Option<AccountId>) -> Result<(), VedexError> {
        if id.is_empty() {
            return Err(VedexError::EmptyTokenId);
        }
        if decimals > MAX_TOKEN_DECIMALS {
            return Err(VedexError::UnsupportedDecimals(decimals));
        }
        if self.tokens.contains_key(&id) {
            return Err(VedexError::TokenAlreadyExists(id.to_string()));
        }
        self.tokens.insert(
            id.clone(),
            TokenInfo { id, decimals, total_supply: 0, minter },
        );
        Ok(())
    }

    pub fn info(&self, id: &TokenId) -> Result<&TokenInfo, VedexError> {
        self.tokens
            .get(id)
            .ok_or_else(|| VedexError::UnknownToken(id.to_string()))
    }

    pub fn exists(&self, id: &TokenId) -> bool {
        self.tokens.contains_key(id)
    }

    pub fn tokens(&self) -> impl Iterator<Item = &TokenInfo> {
        self.tokens.values()
    }

    pub fn total_supply(&self, id: &TokenId) -> Balance {
        self.tokens.get(id).map(|t| t.total_supply).unwrap_or(0)
    }

    pub fn balance_of(&self, id: &TokenId, account: &AccountId) -> Balance {
        self.balances
            .get(id)
            .and_then(|m| m.get(account))
            .copied()
            .unwrap_or(0)
    }

    pub fn transfer(&mut self, id: &TokenId, from: &AccountId, to: &AccountId, amount: Balance) -> Result<(), VedexError> {
        self.info(id)?;
        if amount == 0 || from == to {
            return Ok(());
        }
        self.debit(id, from, amount)?;
        self.credit(id, to, amount)
    }

    /// Mint without an authority check; callers enforce who may mint.
    pub fn mint(&mut self, id: &TokenId, to: &AccountId, amount: Balance) -> Result<(), VedexError> {
        let info = self
            .tokens
            .get_mut(id)
            .ok_or_else(|| VedexError::UnknownToken(id.to_string()))?;
        info.total_supply = info.total_supply.checked_add(amount).ok_or(VedexError::Overflow)?;
        self.credit(id, to, amount)
    }

    pub fn burn(&mut self, id: &TokenId, from: &AccountId, amount: Balance) -> Result<(), VedexError> {
        self.debit(id, from, amount)?;
        let info = self
            .tokens
            .get_mut(id)
            .ok_or_else(|| VedexError::UnknownToken(id.to_string()))?;
        info.total_supply -= amount;
        Ok(())
    }

    fn debit(&mut self, id: &TokenId, from: &AccountId, amount: Balance) -> Result<(), VedexError> {
        let have = self.balance_of(id, from);
        if have < amount {
            return Err(VedexError::InsufficientBalance {
                token: id.to_string(),
                need: amount,
                have,
            });
        }
        let book = self.balances.entry(id.clone()).or_default();
        if have == amount {
            book.remove(from);
        } else {
            book.insert(from.clone(), have - amount);
        }
        Ok(())
    }

    fn credit(&mut self, id: &TokenId, to: &AccountId, amount: Balance) -> Result<(), VedexError> {
        if amount == 0 {
            return Ok(());
        }
        let book = self.balances.entry(id.clone()).or_default();
        let bal = book.entry(to.clone()).or_insert(0);
        *bal = bal.checked_add(amount).ok_or(VedexError::Overflow)?;
        Ok(())
    }
}
