//! Read-only, JSON-friendly views of the ledger. Amounts are rendered as
//! strings (u128 does not survive most JSON consumers), timestamps as
//! RFC 3339 UTC alongside the raw seconds.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use vedex_core::error::VedexError;
use vedex_core::types::{epoch_next, epoch_start, GaugeId, LockId, PoolId, Timestamp};

use crate::ledger::Ledger;
use crate::voter::VoteStatus;

/// `2027-01-07T00:00:00+00:00`, or the raw number if out of chrono's range.
pub fn format_timestamp(ts: Timestamp) -> String {
    DateTime::<Utc>::from_timestamp(ts, 0)
        .map(|dt| dt.to_rfc3339())
        .unwrap_or_else(|| ts.to_string())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolSummary {
    pub id: u64,
    pub token0: String,
    pub token1: String,
    pub stable: bool,
    pub reserve0: String,
    pub reserve1: String,
    pub liquidity_token: String,
    pub total_liquidity: String,
    pub gauge: Option<u64>,
    pub vote_weight: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockSummary {
    pub id: u64,
    /// Base-58 owner; `None` once merged away or withdrawn.
    pub owner: Option<String>,
    pub amount: String,
    pub unlock: Timestamp,
    pub unlock_utc: String,
    pub voting_power: String,
    pub expired: bool,
    pub status: String,
    pub votes: Vec<(u64, String)>,
    pub rebase_claimable: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GaugeSummary {
    pub id: u64,
    pub pool: u64,
    pub alive: bool,
    pub staked: String,
    pub claimable: String,
    pub reward_tokens: Vec<String>,
    pub bribe_tokens: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpochSummary {
    pub epoch_start: Timestamp,
    pub epoch_start_utc: String,
    pub next_epoch_utc: String,
    pub minter_started: bool,
    pub epochs_minted: u64,
    pub last_emission: String,
    pub next_emission: String,
    pub circulating_supply: String,
    pub locked_supply: String,
    pub total_voting_power: String,
    pub total_vote_weight: String,
    pub pending_emission: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerSummary {
    pub calls_applied: u64,
    pub last_timestamp_utc: String,
    pub governance_token: String,
    pub tokens: usize,
    pub pools: Vec<PoolSummary>,
    pub gauges: Vec<GaugeSummary>,
    pub locks: usize,
    pub epoch: EpochSummary,
}

impl Ledger {
    pub fn describe_pool(&self, id: PoolId) -> Result<PoolSummary, VedexError> {
        let p = self.pools.get(id)?;
        Ok(PoolSummary {
            id: p.id.0,
            token0: p.token0.to_string(),
            token1: p.token1.to_string(),
            stable: p.stable,
            reserve0: p.reserve0.to_string(),
            reserve1: p.reserve1.to_string(),
            liquidity_token: p.liquidity_token.to_string(),
            total_liquidity: self.tokens.total_supply(&p.liquidity_token).to_string(),
            gauge: self.voter.gauge_for(id).ok().map(|g| g.0),
            vote_weight: self.voter.weight_of(id).to_string(),
        })
    }

    pub fn describe_lock(&self, id: LockId, now: Timestamp) -> Result<LockSummary, VedexError> {
        let l = self.escrow.get_any(id)?;
        let status = if l.is_burned() {
            "burned".to_string()
        } else {
            match self.vote_status(id, now)? {
                VoteStatus::Created => "created",
                VoteStatus::Eligible => "eligible",
                VoteStatus::VotedThisEpoch => "voted",
            }
            .to_string()
        };
        Ok(LockSummary {
            id: l.id.0,
            owner: l.owner.as_ref().map(|o| o.to_b58()),
            amount: l.amount.to_string(),
            unlock: l.unlock,
            unlock_utc: format_timestamp(l.unlock),
            voting_power: l.voting_power(now).to_string(),
            expired: l.is_expired(now),
            status,
            votes: self
                .voter
                .votes_of(id)
                .into_iter()
                .map(|(pool, w)| (pool.0, w.to_string()))
                .collect(),
            rebase_claimable: self.rebase_claimable(id, now)?.to_string(),
        })
    }

    pub fn describe_gauge(&self, id: GaugeId) -> Result<GaugeSummary, VedexError> {
        let g = self.gauge(id)?;
        let bribe_tokens = self
            .bribe(id)
            .map(|b| b.rewards.reward_tokens())
            .unwrap_or_default();
        Ok(GaugeSummary {
            id: g.id.0,
            pool: g.pool.0,
            alive: g.alive,
            staked: g.rewards.total_supply.to_string(),
            claimable: self.voter.claimable(id).to_string(),
            reward_tokens: g.rewards.reward_tokens().iter().map(|t| t.to_string()).collect(),
            bribe_tokens: bribe_tokens.iter().map(|t| t.to_string()).collect(),
        })
    }

    pub fn describe_epoch(&self, now: Timestamp) -> Result<EpochSummary, VedexError> {
        let start = epoch_start(now);
        Ok(EpochSummary {
            epoch_start: start,
            epoch_start_utc: format_timestamp(start),
            next_epoch_utc: format_timestamp(epoch_next(now)),
            minter_started: self.minter.started,
            epochs_minted: self.minter.epoch_count,
            last_emission: self.minter.last_emission.to_string(),
            next_emission: self.calculate_emission()?.to_string(),
            circulating_supply: self.circulating_supply().to_string(),
            locked_supply: self.escrow.supply.to_string(),
            total_voting_power: self.escrow.total_voting_power(now).to_string(),
            total_vote_weight: self.voter.total_weight.to_string(),
            pending_emission: self.voter.pending_emission.to_string(),
        })
    }

    /// Everything above, at the ledger's own clock.
    pub fn summary(&self) -> Result<LedgerSummary, VedexError> {
        let now = self.clock.last_timestamp;
        let pools = self
            .pools
            .iter()
            .map(|p| self.describe_pool(p.id))
            .collect::<Result<Vec<_>, _>>()?;
        let gauges = self
            .gauges()
            .map(|g| self.describe_gauge(g.id))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(LedgerSummary {
            calls_applied: self.clock.calls_applied,
            last_timestamp_utc: format_timestamp(now),
            governance_token: self.governance_token.to_string(),
            tokens: self.tokens.tokens().count(),
            pools,
            gauges,
            locks: self.escrow.iter().filter(|l| !l.is_burned()).count(),
            epoch: self.describe_epoch(now)?,
        })
    }
}
