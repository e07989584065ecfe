//! vedex-math
//!
//! Pure arithmetic for the protocol: fixed-point helpers, pricing curves,
//! vote-escrow decay, reward accrual and the emission schedule. Nothing in
//! here touches state; `vedex-state` calls into it.

pub mod curve;
pub mod emission;
pub mod fixed;
pub mod reward;
pub mod voting;

pub use curve::Curve;
pub use emission::{calculate_emission, emission_schedule, EmissionEpoch};
pub use fixed::U256;
pub use voting::{unlock_time, voting_power};
