//! Weekly emission of the governance token.

use serde::{Deserialize, Serialize};
use tracing::info;

use vedex_core::constants::{INITIAL_WEEKLY_EMISSION, WEEK};
use vedex_core::error::VedexError;
use vedex_core::types::{accounts, epoch_start, Balance, Timestamp};
use vedex_math::emission::{decay_weekly, split_emission};
use vedex_math::{calculate_emission, emission_schedule, EmissionEpoch};

use crate::ledger::{Env, Ledger};

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Minter {
    /// Emission of the next epoch before the tail floor is applied.
    pub weekly: Balance,
    /// Start of the last epoch that minted.
    pub active_period: Timestamp,
    pub started: bool,
    pub epoch_count: u64,
    pub last_emission: Balance,
}

impl Default for Minter {
    fn default() -> Self {
        Self {
            weekly: INITIAL_WEEKLY_EMISSION,
            active_period: 0,
            started: false,
            epoch_count: 0,
            last_emission: 0,
        }
    }
}

impl Minter {
    pub fn next_period(&self) -> Timestamp {
        self.active_period + WEEK
    }
}

impl Ledger {
    /// Governance supply outside locks.
    pub fn circulating_supply(&self) -> Balance {
        self.tokens
            .total_supply(&self.governance_token)
            .saturating_sub(self.escrow.supply)
    }

    /// What the next `update_period` would mint.
    pub fn calculate_emission(&self) -> Result<Balance, VedexError> {
        calculate_emission(self.minter.weekly, self.circulating_supply())
    }

    /// Projection of the next `epochs` emissions from the current state.
    pub fn emission_schedule(&self, epochs: u32) -> Result<Vec<EmissionEpoch>, VedexError> {
        emission_schedule(self.minter.weekly, self.circulating_supply(), epochs)
    }

    pub fn minter_start(&mut self, env: &Env) -> Result<(), VedexError> {
        self.require_admin(&env.caller)?;
        if self.minter.started {
            return Err(VedexError::MinterAlreadyStarted);
        }
        self.minter.started = true;
        self.minter.active_period = epoch_start(env.now);
        info!(active_period = self.minter.active_period, weekly = self.minter.weekly, "minter started");
        Ok(())
    }

    /// Mint the epoch's emission once a full week has passed since the last
    /// one. Returns `None` when not yet due.
    pub fn update_period(&mut self, env: &Env) -> Result<Option<Balance>, VedexError> {
        if !self.minter.started {
            return Err(VedexError::MinterNotStarted);
        }
        if env.now < self.minter.next_period() {
            return Ok(None);
        }

        let emission = self.calculate_emission()?;
        let m = &mut self.minter;
        m.active_period = epoch_start(env.now);
        m.weekly = decay_weekly(m.weekly)?;
        m.epoch_count += 1;
        m.last_emission = emission;
        let epoch = m.epoch_count;

        let gov = self.governance_token.clone();
        let minter = accounts::minter();
        self.tokens.mint(&gov, &minter, emission)?;
        let (rebase, gauges) = split_emission(emission)?;
        if rebase > 0 {
            self.rebase_notify(&env.as_component(minter.clone()), rebase)?;
        }
        if gauges > 0 {
            self.tokens.transfer(&gov, &minter, &accounts::voter(), gauges)?;
            self.notify_emission(gauges)?;
        }
        info!(epoch, emission, rebase, gauges, "emission minted");
        Ok(Some(emission))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::testkit::*;
    use vedex_core::constants::UNIT;
    use vedex_math::emission::tail_emission;

    #[test]
    fn start_is_admin_only_and_once() {
        let mut l = ledger();
        assert_eq!(l.minter_start(&env(&alice(), T0 + 5, 1)), Err(VedexError::NotAdmin));
        l.minter_start(&env(&admin(), T0 + 5, 1)).unwrap();
        assert_eq!(l.minter.active_period, T0);
        assert_eq!(l.minter_start(&env(&admin(), T0 + 5, 1)), Err(VedexError::MinterAlreadyStarted));
    }

    #[test]
    fn update_before_start_rejected() {
        let mut l = ledger();
        assert_eq!(l.update_period(&env(&alice(), T0, 1)), Err(VedexError::MinterNotStarted));
    }

    #[test]
    fn weekly_gating_and_split() {
        let mut l = ledger();
        l.minter_start(&env(&admin(), T0, 1)).unwrap();
        assert_eq!(l.update_period(&env(&alice(), T0 + WEEK - 1, 2)).unwrap(), None);

        let supply_before = l.tokens.total_supply(&gov());
        let emission = l.calculate_emission().unwrap();
        assert_eq!(emission, INITIAL_WEEKLY_EMISSION);
        assert_eq!(l.update_period(&env(&alice(), T0 + WEEK, 2)).unwrap(), Some(emission));
        assert_eq!(l.tokens.total_supply(&gov()), supply_before + emission);
        assert_eq!(l.minter.weekly, INITIAL_WEEKLY_EMISSION / 100 * 99);
        assert_eq!(l.minter.active_period, T0 + WEEK);

        // 30 % to the distributor, 70 % to the router (held: nobody voted).
        assert_eq!(l.governance_balance(&accounts::rebase_distributor()), emission * 3 / 10);
        assert_eq!(l.governance_balance(&accounts::voter()), emission * 7 / 10);
        assert_eq!(l.voter.pending_emission, emission * 7 / 10);
        assert_eq!(l.governance_balance(&accounts::minter()), 0);

        assert_eq!(l.update_period(&env(&alice(), T0 + WEEK + 10, 3)).unwrap(), None);
    }

    #[test]
    fn tail_floor_takes_over() {
        let mut l = ledger();
        l.minter_start(&env(&admin(), T0, 1)).unwrap();
        l.minter.weekly = UNIT;
        let circulating = l.circulating_supply();
        let floor = tail_emission(circulating).unwrap();
        assert!(floor > UNIT);
        assert_eq!(l.update_period(&env(&alice(), T0 + WEEK, 2)).unwrap(), Some(floor));
    }

    #[test]
    fn locked_supply_is_not_circulating() {
        let mut l = ledger();
        let total = l.tokens.total_supply(&gov());
        l.create_lock(&env(&alice(), T0, 1), 500_000 * UNIT, WEEK * 10, None).unwrap();
        assert_eq!(l.circulating_supply(), total - 500_000 * UNIT);
    }

    #[test]
    fn schedule_starts_from_current_state() {
        let l = ledger();
        let schedule = l.emission_schedule(3).unwrap();
        assert_eq!(schedule.len(), 3);
        assert_eq!(schedule[0].emission, l.calculate_emission().unwrap());
        assert!(schedule[1].emission < schedule[0].emission);
    }
}
