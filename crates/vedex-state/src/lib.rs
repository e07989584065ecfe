//! vedex-state
//!
//! The protocol ledger and everything that mutates it: pools, the lock
//! registry, the vote router with its gauges and bribes, the minter and the
//! rebase distributor. `StateEngine` applies calls atomically and persists
//! through `StateDb`.

pub mod bribe;
pub mod db;
pub mod engine;
pub mod escrow;
pub mod gauge;
pub mod genesis;
pub mod ledger;
pub mod minter;
pub mod pool;
pub mod query;
pub mod rebase;
pub mod rewards;
pub mod tokens;
pub mod voter;

pub use db::StateDb;
pub use engine::StateEngine;
pub use escrow::{Lock, LockRegistry};
pub use genesis::{apply_genesis, Allocation, GenesisParams, TokenSpec};
pub use ledger::{Clock, Env, Ledger};
pub use pool::{quote, Pool, PoolRegistry};
pub use query::{format_timestamp, LedgerSummary};
pub use voter::VoteStatus;
