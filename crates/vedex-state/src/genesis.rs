//! Founding state: the admin, the token set, initial balances and the gauge
//! whitelist. Written straight into the ledger, outside the action set; it
//! is the only place non-governance tokens are minted.

use serde::{Deserialize, Serialize};
use tracing::info;

use vedex_core::error::VedexError;
use vedex_core::types::{accounts, AccountId, Balance, TokenId};

use crate::ledger::Ledger;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenSpec {
    pub symbol: String,
    pub decimals: u8,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Allocation {
    pub account: AccountId,
    pub token: String,
    pub amount: Balance,
}

/// Genesis file contents, usually read from JSON.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GenesisParams {
    /// May start the minter, kill and revive gauges, and extend the whitelist.
    pub admin: AccountId,
    /// Minted only by the minter after genesis.
    pub governance_token: TokenSpec,
    #[serde(default)]
    pub tokens: Vec<TokenSpec>,
    #[serde(default)]
    pub allocations: Vec<Allocation>,
    /// Symbols whose pairs anyone may create gauges for.
    #[serde(default)]
    pub whitelist: Vec<String>,
    /// Overrides the first epoch's emission.
    #[serde(default)]
    pub initial_weekly: Option<Balance>,
}

/// Apply `params` to an empty ledger.
pub fn apply_genesis(ledger: &mut Ledger, params: &GenesisParams) -> Result<(), VedexError> {
    if ledger.admin.is_some() {
        return Err(VedexError::GenesisAlreadyApplied);
    }
    info!(admin = %params.admin, "applying genesis");

    let gov = TokenId::new(params.governance_token.symbol.as_str());
    ledger.tokens.register(gov.clone(), params.governance_token.decimals, Some(accounts::minter()))?;
    for spec in &params.tokens {
        ledger.tokens.register(TokenId::new(spec.symbol.as_str()), spec.decimals, None)?;
    }

    let mut allocated: Balance = 0;
    for alloc in &params.allocations {
        if alloc.amount == 0 {
            return Err(VedexError::ZeroAmount);
        }
        ledger.tokens.mint(&TokenId::new(alloc.token.as_str()), &alloc.account, alloc.amount)?;
        allocated = allocated.saturating_add(alloc.amount);
    }

    for symbol in &params.whitelist {
        let token = TokenId::new(symbol.as_str());
        if !ledger.tokens.exists(&token) {
            return Err(VedexError::UnknownToken(symbol.clone()));
        }
        ledger.voter.whitelist.insert(token);
    }

    if let Some(weekly) = params.initial_weekly {
        if weekly == 0 {
            return Err(VedexError::EmissionTooSmall);
        }
        ledger.minter.weekly = weekly;
    }

    ledger.admin = Some(params.admin.clone());
    ledger.governance_token = gov;
    info!(
        tokens = params.tokens.len() + 1,
        allocations = params.allocations.len(),
        allocated,
        whitelisted = params.whitelist.len(),
        "genesis applied"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use vedex_core::constants::{INITIAL_WEEKLY_EMISSION, UNIT};

    fn params() -> GenesisParams {
        GenesisParams {
            admin: AccountId::from_name("admin"),
            governance_token: TokenSpec { symbol: "VEX".into(), decimals: 18 },
            tokens: vec![TokenSpec { symbol: "USDC".into(), decimals: 6 }],
            allocations: vec![
                Allocation { account: AccountId::from_name("alice"), token: "VEX".into(), amount: 5 * UNIT },
                Allocation { account: AccountId::from_name("alice"), token: "USDC".into(), amount: 7_000_000 },
            ],
            whitelist: vec!["VEX".into(), "USDC".into()],
            initial_weekly: None,
        }
    }

    #[test]
    fn genesis_populates_ledger() {
        let mut l = Ledger::default();
        apply_genesis(&mut l, &params()).unwrap();
        let alice = AccountId::from_name("alice");
        assert_eq!(l.admin, Some(AccountId::from_name("admin")));
        assert_eq!(l.governance_token, TokenId::new("VEX"));
        assert_eq!(l.governance_balance(&alice), 5 * UNIT);
        assert_eq!(l.tokens.balance_of(&TokenId::new("USDC"), &alice), 7_000_000);
        assert_eq!(l.tokens.info(&TokenId::new("USDC")).unwrap().decimals, 6);
        assert!(l.voter.whitelist.contains(&TokenId::new("USDC")));
        assert_eq!(l.minter.weekly, INITIAL_WEEKLY_EMISSION);
    }

    #[test]
    fn genesis_applies_once() {
        let mut l = Ledger::default();
        apply_genesis(&mut l, &params()).unwrap();
        assert_eq!(apply_genesis(&mut l, &params()), Err(VedexError::GenesisAlreadyApplied));
    }

    #[test]
    fn unknown_allocation_token_rejected() {
        let mut p = params();
        p.allocations.push(Allocation { account: AccountId::from_name("bob"), token: "DOGE".into(), amount: 1 });
        assert!(matches!(apply_genesis(&mut Ledger::default(), &p), Err(VedexError::UnknownToken(_))));
    }

    #[test]
    fn whitelist_must_name_registered_tokens() {
        let mut p = params();
        p.whitelist.push("WETH".into());
        assert_eq!(
            apply_genesis(&mut Ledger::default(), &p),
            Err(VedexError::UnknownToken("WETH".into()))
        );
    }

    #[test]
    fn token_with_too_many_decimals_rejected() {
        let mut p = params();
        p.tokens.push(TokenSpec { symbol: "WIDE".into(), decimals: 40 });
        assert_eq!(apply_genesis(&mut Ledger::default(), &p), Err(VedexError::UnsupportedDecimals(40)));
    }

    #[test]
    fn params_read_from_json() {
        let json = format!(
            r#"{{
                "admin": "{}",
                "governance_token": {{ "symbol": "VEX", "decimals": 18 }},
                "initial_weekly": 1000
            }}"#,
            AccountId::from_name("admin").to_b58()
        );
        let p: GenesisParams = serde_json::from_str(&json).unwrap();
        assert!(p.tokens.is_empty() && p.allocations.is_empty());
        let mut l = Ledger::default();
        apply_genesis(&mut l, &p).unwrap();
        assert_eq!(l.minter.weekly, 1_000);
    }
}
