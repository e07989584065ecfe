//! Weekly emission schedule.
//!
//! Each epoch mints `max(weekly, circulating × 2 %)`. `weekly` then decays by
//! 1 %, so emission falls geometrically until the tail floor takes over and
//! tracks circulating supply from then on.
//!
//! Split of every emission: 30 % rebase to lock holders, 70 % to gauges.

use vedex_core::constants::{TAIL_EMISSION_BPS, VE_SHARE_BPS, WEEKLY_DECAY_BPS};
use vedex_core::error::VedexError;
use vedex_core::types::Balance;

use crate::fixed::bps_of;

/// Emission for an epoch given the current `weekly` and circulating supply.
pub fn calculate_emission(weekly: Balance, circulating: Balance) -> Result<Balance, VedexError> {
    Ok(weekly.max(tail_emission(circulating)?))
}

/// The floor: `circulating × TAIL_EMISSION_BPS`.
pub fn tail_emission(circulating: Balance) -> Result<Balance, VedexError> {
    bps_of(circulating, TAIL_EMISSION_BPS)
}

/// `weekly` for the following epoch.
pub fn decay_weekly(weekly: Balance) -> Result<Balance, VedexError> {
    bps_of(weekly, WEEKLY_DECAY_BPS)
}

/// `(rebase share, gauge share)`. The gauge side absorbs rounding.
pub fn split_emission(emission: Balance) -> Result<(Balance, Balance), VedexError> {
    let rebase = bps_of(emission, VE_SHARE_BPS)?;
    Ok((rebase, emission - rebase))
}

/// One projected epoch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmissionEpoch {
    /// 1-based epoch index counted from the projection start.
    pub index: u32,
    pub emission: Balance,
    pub rebase: Balance,
    pub gauges: Balance,
    /// `true` when the tail floor set this epoch's emission.
    pub tail: bool,
    /// Circulating supply entering the epoch.
    pub circulating: Balance,
}

/// Project `epochs` emissions forward. Assumes the locked supply only grows
/// by the rebase share, so circulating supply gains the gauge share of each
/// epoch.
pub fn emission_schedule(
    mut weekly: Balance,
    mut circulating: Balance,
    epochs: u32,
) -> Result<Vec<EmissionEpoch>, VedexError> {
    let mut schedule = Vec::with_capacity(epochs as usize);
    for index in 1..=epochs {
        let floor = tail_emission(circulating)?;
        let emission = weekly.max(floor);
        let (rebase, gauges) = split_emission(emission)?;
        schedule.push(EmissionEpoch {
            index,
            emission,
            rebase,
            gauges,
            tail: floor > weekly,
            circulating,
        });
        weekly = decay_weekly(weekly)?;
        circulating = circulating.checked_add(gauges).ok_or(VedexError::Overflow)?;
    }
    Ok(schedule)
}
