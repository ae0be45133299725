use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use feed::PairRate;

use crate::consumer::PairStats;

/// End-of-run summary. Comparing `published` against each consumer's
/// delivery counts shows how much the slow consumer was conflated;
/// `final_rates` is the distributor's snapshot at shutdown.
#[derive(Debug, Serialize)]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub published: HashMap<String, u64>,
    pub final_rates: Vec<PairRate>,
    pub consumers: Vec<ConsumerReport>,
}

/// Flattens a snapshot into report rows, ordered by pair.
pub fn sorted_rates(snapshot: HashMap<String, Arc<PairRate>>) -> Vec<PairRate> {
    let mut rates: Vec<PairRate> = snapshot
        .into_values()
        .map(|rate| (*rate).clone())
        .collect();
    rates.sort_by(|a, b| a.ccy_pair.cmp(&b.ccy_pair));
    rates
}

#[derive(Debug, Serialize)]
pub struct ConsumerReport {
    pub name: &'static str,
    pub pairs: HashMap<String, PairStats>,
}

impl ConsumerReport {
    /// Deliveries this consumer saw, across all pairs.
    pub fn total_deliveries(&self) -> u64 {
        self.pairs.values().map(|stats| stats.deliveries).sum()
    }
}
