use std::sync::Arc;

use serde::Serialize;

/// One published (currency pair, rate) sample.
///
/// Every publish builds a fresh instance; nothing mutates one in place.
/// Two samples carrying equal numbers are still distinct events, which is
/// why delivery bookkeeping goes through [`RateUpdate::seq`] and never
/// through value comparison.
#[derive(Debug, Clone, Serialize)]
pub struct PairRate {
    pub ccy_pair: String,
    pub rate: f64,
}

impl PairRate {
    pub fn new(ccy_pair: impl Into<String>, rate: f64) -> Self {
        Self {
            ccy_pair: ccy_pair.into(),
            rate,
        }
    }
}

/// Current state of one rate slot.
///
/// `seq` advances by one per publish into the slot, so a delivery task can
/// tell "a newer publish landed" apart from "the rate happens to repeat",
/// and a subscriber's view of a pair can be shown to never move backwards.
#[derive(Debug, Clone)]
pub struct RateUpdate {
    pub seq: u64,
    pub rate: Arc<PairRate>,
}
