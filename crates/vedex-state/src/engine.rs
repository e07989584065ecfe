use std::sync::Arc;

use tracing::info;
use vedex_core::action::{Action, Call, Receipt};
use vedex_core::error::VedexError;

use crate::db::StateDb;
use crate::genesis::{apply_genesis, GenesisParams};
use crate::ledger::{Env, Ledger};

// ── StateEngine ───────────────────────────────────────────────────────────────

/// The state transition engine.
///
/// Each `apply` call is atomic: every action runs against a copy of the
/// ledger, the copy is persisted, and only then does it replace the live
/// ledger. A failing action discards the copy.
pub struct StateEngine {
    ledger: Ledger,
    db: Option<Arc<StateDb>>,
}

impl StateEngine {
    /// In-memory engine over `ledger`.
    pub fn new(ledger: Ledger) -> Self {
        Self { ledger, db: None }
    }

    /// Engine backed by `db`, resuming from its saved ledger if any.
    pub fn open(db: Arc<StateDb>) -> Result<Self, VedexError> {
        let ledger = db.load_ledger()?.unwrap_or_default();
        Ok(Self { ledger, db: Some(db) })
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn db(&self) -> Option<&Arc<StateDb>> {
        self.db.as_ref()
    }

    /// Install the initial state. Only valid on an empty ledger.
    pub fn genesis(&mut self, params: &GenesisParams) -> Result<(), VedexError> {
        let mut staged = self.ledger.clone();
        apply_genesis(&mut staged, params)?;
        self.commit(staged)
    }

    /// Apply every action of `call` or none of them. Protocol-owned accounts
    /// cannot be the caller.
    pub fn apply(&mut self, call: &Call) -> Result<Vec<Receipt>, VedexError> {
        if self.ledger.is_component_account(&call.caller) {
            return Err(VedexError::ReservedCaller(call.caller.to_string()));
        }
        let mut staged = self.ledger.clone();
        staged.clock.advance(call.timestamp, call.step)?;

        let env = Env::new(call.caller.clone(), call.timestamp, call.step);
        let mut receipts = Vec::with_capacity(call.actions.len());
        for action in &call.actions {
            receipts.push(staged.apply_action(&env, action)?);
        }

        if let Some(db) = &self.db {
            db.append_call(staged.clock.calls_applied, call)?;
        }
        self.commit(staged)?;
        info!(
            caller = %call.caller,
            step = call.step,
            actions = call.actions.len(),
            "applied call"
        );
        Ok(receipts)
    }

    fn commit(&mut self, staged: Ledger) -> Result<(), VedexError> {
        if let Some(db) = &self.db {
            db.save_ledger(&staged)?;
        }
        self.ledger = staged;
        Ok(())
    }
}

impl Ledger {
    /// Dispatch one action.
    pub fn apply_action(&mut self, env: &Env, action: &Action) -> Result<Receipt, VedexError> {
        match action {
            // ── Tokens ────────────────────────────────────────────────────────
            Action::Transfer { token, to, amount } => {
                self.transfer(env, token, to, *amount)?;
                Ok(Receipt::Done)
            }

            // ── Factory / pools ───────────────────────────────────────────────
            Action::CreatePool { token_a, token_b, stable } => {
                Ok(Receipt::PoolCreated(self.create_pool(env, token_a, token_b, *stable)?))
            }

            Action::AddLiquidity { pool, amount_a_desired, amount_b_desired, amount_a_min, amount_b_min, to } => {
                let (amount_a, amount_b, liquidity) = self.add_liquidity(
                    env,
                    *pool,
                    *amount_a_desired,
                    *amount_b_desired,
                    *amount_a_min,
                    *amount_b_min,
                    to,
                )?;
                Ok(Receipt::LiquidityAdded { amount_a, amount_b, liquidity })
            }

            Action::RemoveLiquidity { pool, liquidity, amount_a_min, amount_b_min, to } => {
                let (amount_a, amount_b) =
                    self.remove_liquidity(env, *pool, *liquidity, *amount_a_min, *amount_b_min, to)?;
                Ok(Receipt::LiquidityRemoved { amount_a, amount_b })
            }

            Action::Swap { pool, amount0_out, amount1_out, to } => {
                let amount_out = self.swap(env, *pool, *amount0_out, *amount1_out, to)?;
                Ok(Receipt::Swapped { amount_out })
            }

            Action::SwapExactIn { routes, amount_in, amount_out_min, to } => {
                let amount_out = self.swap_exact_in(env, routes, *amount_in, *amount_out_min, to)?;
                Ok(Receipt::Swapped { amount_out })
            }

            Action::Skim { pool, to } => {
                self.skim(*pool, to)?;
                Ok(Receipt::Done)
            }

            Action::Sync { pool } => {
                self.sync(env, *pool)?;
                Ok(Receipt::Done)
            }

            // ── Lock registry ─────────────────────────────────────────────────
            Action::CreateLock { amount, duration, to } => {
                Ok(Receipt::LockCreated(self.create_lock(env, *amount, *duration, to.as_ref())?))
            }

            Action::IncreaseAmount { lock, amount } => {
                self.increase_amount(env, *lock, *amount)?;
                Ok(Receipt::Done)
            }

            Action::DepositFor { lock, amount } => {
                self.deposit_for(env, *lock, *amount)?;
                Ok(Receipt::Done)
            }

            Action::IncreaseUnlockTime { lock, duration } => {
                self.increase_unlock_time(env, *lock, *duration)?;
                Ok(Receipt::Done)
            }

            Action::Merge { from, to } => {
                self.merge(env, *from, *to)?;
                Ok(Receipt::Done)
            }

            Action::Split { lock, amount } => Ok(Receipt::LockCreated(self.split(env, *lock, *amount)?)),

            Action::Withdraw { lock } => Ok(Receipt::Withdrawn(self.withdraw(env, *lock)?)),

            Action::TransferLock { lock, to } => {
                self.transfer_lock(env, *lock, to)?;
                Ok(Receipt::Done)
            }

            // ── Vote router ───────────────────────────────────────────────────
            Action::Vote { lock, pools, weights } => {
                self.vote(env, *lock, pools, weights)?;
                Ok(Receipt::Done)
            }

            Action::Reset { lock } => {
                self.reset(env, *lock)?;
                Ok(Receipt::Done)
            }

            Action::Poke { lock } => {
                self.poke(env, *lock)?;
                Ok(Receipt::Done)
            }

            Action::CreateGauge { pool } => {
                let (gauge, existing) = self.create_gauge(env, *pool)?;
                Ok(Receipt::GaugeCreated { gauge, existing })
            }

            Action::KillGauge { gauge } => {
                self.kill_gauge(env, *gauge)?;
                Ok(Receipt::Done)
            }

            Action::ReviveGauge { gauge } => {
                self.revive_gauge(env, *gauge)?;
                Ok(Receipt::Done)
            }

            Action::WhitelistToken { token } => {
                self.whitelist_token(env, token)?;
                Ok(Receipt::Done)
            }

            Action::Distribute { gauges } => Ok(Receipt::Distributed(self.distribute(env, gauges)?)),

            Action::ClaimBribes { gauges, lock } => {
                Ok(Receipt::RewardsPaid(self.claim_bribes(env, gauges, *lock)?))
            }

            // ── Gauge ─────────────────────────────────────────────────────────
            Action::GaugeDeposit { gauge, amount } => {
                self.gauge_deposit(env, *gauge, *amount)?;
                Ok(Receipt::Done)
            }

            Action::GaugeWithdraw { gauge, amount } => {
                self.gauge_withdraw(env, *gauge, *amount)?;
                Ok(Receipt::Done)
            }

            Action::GaugeGetReward { gauge } => Ok(Receipt::RewardsPaid(self.gauge_get_reward(env, *gauge)?)),

            Action::GaugeNotifyReward { gauge, token, amount } => {
                self.gauge_notify_reward(env, *gauge, token, *amount)?;
                Ok(Receipt::Done)
            }

            // ── Bribe ─────────────────────────────────────────────────────────
            Action::BribeNotifyReward { gauge, token, amount } => {
                self.bribe_notify_reward(env, *gauge, token, *amount)?;
                Ok(Receipt::Done)
            }

            Action::BribeGetReward { gauge, lock, tokens } => {
                Ok(Receipt::RewardsPaid(self.bribe_get_reward(env, *gauge, *lock, tokens)?))
            }

            // ── Minter ────────────────────────────────────────────────────────
            Action::MinterStart => {
                self.minter_start(env)?;
                Ok(Receipt::Done)
            }

            Action::UpdatePeriod => Ok(Receipt::Emission(self.update_period(env)?)),

            // ── Rebase distributor ────────────────────────────────────────────
            Action::RebaseNotify { amount } => {
                self.rebase_notify(env, *amount)?;
                Ok(Receipt::Done)
            }

            Action::ClaimRebase { lock } => Ok(Receipt::Rebase(self.claim_rebase(env, *lock)?)),

            Action::ClaimRebaseMany { locks } => Ok(Receipt::Rebase(self.claim_rebase_many(env, locks)?)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genesis::{Allocation, TokenSpec};
    use vedex_core::action::Route;
    use vedex_core::constants::{DAY, UNIT, WEEK};
    use vedex_core::types::{accounts, AccountId, GaugeId, LockId, PoolId, Timestamp, TokenId};

    const T0: Timestamp = 1_800_000_000 - 1_800_000_000 % WEEK;

    fn temp_db(name: &str) -> Arc<StateDb> {
        let dir = std::env::temp_dir().join(format!("vedex_engine_test_{name}_{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        Arc::new(StateDb::open(&dir).unwrap())
    }

    fn alice() -> AccountId {
        AccountId::from_name("alice")
    }

    fn admin() -> AccountId {
        AccountId::from_name("admin")
    }

    fn params() -> GenesisParams {
        GenesisParams {
            admin: admin(),
            governance_token: TokenSpec { symbol: "VEX".into(), decimals: 18 },
            tokens: vec![
                TokenSpec { symbol: "DAI".into(), decimals: 18 },
                TokenSpec { symbol: "WETH".into(), decimals: 18 },
            ],
            allocations: vec![
                Allocation { account: alice(), token: "VEX".into(), amount: 10_000 * UNIT },
                Allocation { account: alice(), token: "DAI".into(), amount: 10_000 * UNIT },
                Allocation { account: alice(), token: "WETH".into(), amount: 10_000 * UNIT },
            ],
            whitelist: vec!["DAI".into(), "WETH".into()],
            initial_weekly: None,
        }
    }

    fn engine() -> StateEngine {
        let mut e = StateEngine::new(Ledger::default());
        e.genesis(&params()).unwrap();
        e
    }

    fn dai() -> TokenId {
        TokenId::new("DAI")
    }

    fn weth() -> TokenId {
        TokenId::new("WETH")
    }

    fn pool_call(step: u64) -> Call {
        Call::new(
            alice(),
            T0,
            step,
            vec![
                Action::CreatePool { token_a: dai(), token_b: weth(), stable: false },
                Action::AddLiquidity {
                    pool: PoolId(1),
                    amount_a_desired: 1_000 * UNIT,
                    amount_b_desired: 1_000 * UNIT,
                    amount_a_min: 0,
                    amount_b_min: 0,
                    to: alice(),
                },
            ],
        )
    }

    #[test]
    fn multi_action_call_commits_together() {
        let mut e = engine();
        let receipts = e.apply(&pool_call(1)).unwrap();
        assert_eq!(receipts[0], Receipt::PoolCreated(PoolId(1)));
        assert!(matches!(receipts[1], Receipt::LiquidityAdded { .. }));
        assert_eq!(e.ledger().clock.calls_applied, 1);
    }

    #[test]
    fn failing_action_rolls_back_the_whole_call() {
        let mut e = engine();
        let mut call = pool_call(1);
        call.actions.push(Action::SwapExactIn {
            routes: vec![Route { from: dai(), to: weth(), stable: false }],
            amount_in: UNIT,
            amount_out_min: 10 * UNIT,
            to: alice(),
        });
        assert!(matches!(e.apply(&call), Err(VedexError::SlippageExceeded { .. })));
        assert!(e.ledger().pools.is_empty());
        assert_eq!(e.ledger().tokens.balance_of(&dai(), &alice()), 10_000 * UNIT);
        assert_eq!(e.ledger().clock.calls_applied, 0);
    }

    #[test]
    fn time_may_not_go_backwards() {
        let mut e = engine();
        e.apply(&Call::new(alice(), T0 + 10, 5, Vec::new())).unwrap();
        assert_eq!(
            e.apply(&Call::new(alice(), T0 + 9, 5, Vec::new())),
            Err(VedexError::ClockWentBackwards { last: T0 + 10, got: T0 + 9 })
        );
        assert_eq!(
            e.apply(&Call::new(alice(), T0 + 10, 4, Vec::new())),
            Err(VedexError::StepWentBackwards { last: 5, got: 4 })
        );
        e.apply(&Call::new(alice(), T0 + 10, 5, Vec::new())).unwrap();
    }

    #[test]
    fn flash_vote_in_one_call_rejected() {
        let mut e = engine();
        e.apply(&pool_call(1)).unwrap();
        e.apply(&Call::single(alice(), T0, 1, Action::CreateGauge { pool: PoolId(1) })).unwrap();
        let call = Call::new(
            alice(),
            T0 + DAY,
            2,
            vec![
                Action::CreateLock { amount: 100 * UNIT, duration: 52 * WEEK, to: None },
                Action::Vote { lock: LockId(1), pools: vec![PoolId(1)], weights: vec![100] },
            ],
        );
        assert_eq!(e.apply(&call), Err(VedexError::SameStepCreateAndVote));
        assert!(e.ledger().escrow.get(LockId(1)).is_err());
    }

    #[test]
    fn protocol_accounts_cannot_sign_calls() {
        let mut e = engine();
        e.apply(&pool_call(1)).unwrap();
        let setup = Call::new(
            alice(),
            T0,
            2,
            vec![
                Action::CreateGauge { pool: PoolId(1) },
                Action::CreateLock { amount: 1_000 * UNIT, duration: 52 * WEEK, to: None },
            ],
        );
        e.apply(&setup).unwrap();
        let vex = TokenId::new("VEX");
        let mallory = AccountId::from_name("mallory");
        let escrowed = e.ledger().tokens.balance_of(&vex, &accounts::escrow());
        assert_eq!(escrowed, 1_000 * UNIT);

        let reserved = [
            accounts::escrow(),
            accounts::voter(),
            accounts::minter(),
            accounts::rebase_distributor(),
            AccountId::null(),
            PoolId(1).account(),
            GaugeId(1).account(),
            GaugeId(1).bribe_account(),
        ];
        for (i, who) in reserved.into_iter().enumerate() {
            let drain = Call::single(
                who.clone(),
                T0,
                3 + i as u64,
                Action::Transfer { token: vex.clone(), to: mallory.clone(), amount: UNIT },
            );
            assert_eq!(e.apply(&drain), Err(VedexError::ReservedCaller(who.to_string())));
        }
        let pool_drain = Call::single(
            PoolId(1).account(),
            T0,
            20,
            Action::Transfer { token: dai(), to: mallory.clone(), amount: UNIT },
        );
        assert!(matches!(e.apply(&pool_drain), Err(VedexError::ReservedCaller(_))));

        assert_eq!(e.ledger().tokens.balance_of(&vex, &accounts::escrow()), escrowed);
        assert_eq!(e.ledger().tokens.balance_of(&vex, &mallory), 0);
        assert_eq!(e.ledger().pools.get(PoolId(1)).unwrap().reserve0, 1_000 * UNIT);
        assert_eq!(e.ledger().clock.calls_applied, 2);
        // Ordinary accounts are unaffected.
        e.apply(&Call::single(alice(), T0, 21, Action::Transfer { token: vex, to: mallory, amount: UNIT }))
            .unwrap();
    }

    #[test]
    fn persisted_state_reloads() {
        let db = temp_db("reload");
        {
            let mut e = StateEngine::open(Arc::clone(&db)).unwrap();
            e.genesis(&params()).unwrap();
            e.apply(&pool_call(1)).unwrap();
            db.flush().unwrap();
        }
        let e = StateEngine::open(Arc::clone(&db)).unwrap();
        let pool = e.ledger().pools.get(PoolId(1)).unwrap();
        assert_eq!(pool.reserve0, 1_000 * UNIT);
        assert_eq!(e.ledger().admin, Some(admin()));
        assert_eq!(db.call_count(), 1);
    }

    #[test]
    fn rejected_call_leaves_db_untouched() {
        let db = temp_db("untouched");
        let mut e = StateEngine::open(Arc::clone(&db)).unwrap();
        e.genesis(&params()).unwrap();
        let before = db.get_meta("ledger").unwrap();
        let bad = Call::single(alice(), T0, 1, Action::Withdraw { lock: LockId(7) });
        assert_eq!(e.apply(&bad), Err(VedexError::LockNotFound(7)));
        assert_eq!(db.get_meta("ledger").unwrap(), before);
        assert_eq!(db.call_count(), 0);
    }

    #[test]
    fn full_epoch_cycle() {
        let mut e = engine();
        e.apply(&pool_call(1)).unwrap();
        let setup = Call::new(
            alice(),
            T0,
            2,
            vec![
                Action::CreateGauge { pool: PoolId(1) },
                Action::CreateLock { amount: 1_000 * UNIT, duration: 104 * WEEK, to: None },
            ],
        );
        e.apply(&setup).unwrap();
        e.apply(&Call::single(admin(), T0, 3, Action::MinterStart)).unwrap();
        e.apply(&Call::single(
            alice(),
            T0 + DAY,
            4,
            Action::Vote { lock: LockId(1), pools: vec![PoolId(1)], weights: vec![100] },
        ))
        .unwrap();

        let receipts = e
            .apply(&Call::single(alice(), T0 + WEEK, 5, Action::Distribute { gauges: vec![GaugeId(1)] }))
            .unwrap();
        let Receipt::Distributed(paid) = receipts[0] else {
            panic!("unexpected receipt {:?}", receipts[0]);
        };
        let emission = e.ledger().minter.last_emission;
        assert!(paid > 0 && paid <= emission);

        let receipts = e
            .apply(&Call::single(alice(), T0 + WEEK + 1, 6, Action::ClaimRebase { lock: LockId(1) }))
            .unwrap();
        assert!(matches!(receipts[0], Receipt::Rebase(r) if r > 0));
    }
}
