use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::trace;

use crate::processor::PriceProcessor;
use crate::subscription::SubscriptionManager;
use crate::table::RateTable;
use crate::types::PairRate;

/// Conflating price-update distributor.
///
/// Producers push (pair, rate) samples through [`PriceProcessor::on_price`]
/// and never wait on subscriber speed. Each registered subscriber gets one
/// delivery task per currency pair; a subscriber that falls behind skips
/// straight to the pair's latest value. Subscribing mid-stream seeds the
/// newcomer with the latest value of every pair seen so far.
pub struct PriceDistributor {
    table: RateTable,
    subscriptions: SubscriptionManager,
}

impl PriceDistributor {
    pub fn new() -> Self {
        Self {
            table: RateTable::new(),
            subscriptions: SubscriptionManager::new(),
        }
    }

    /// Registers a subscriber. It receives the current value of every
    /// known pair first, then only newer updates. Idempotent by handle
    /// identity: re-subscribing a live handle changes nothing.
    pub async fn subscribe(&self, subscriber: Arc<dyn PriceProcessor>) {
        self.subscriptions.subscribe(subscriber, &self.table).await;
    }

    /// Drops the handle's registration and cancels its delivery tasks.
    /// Unknown handles are ignored.
    pub async fn unsubscribe(&self, subscriber: &Arc<dyn PriceProcessor>) {
        self.subscriptions.unsubscribe(subscriber).await;
    }

    /// Latest value per pair at the time of the call, atomic per pair.
    pub async fn snapshot(&self) -> HashMap<String, Arc<PairRate>> {
        self.table.snapshot().await
    }

    /// Number of live registrations.
    pub async fn subscriber_count(&self) -> usize {
        self.subscriptions.count().await
    }
}

impl Default for PriceDistributor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PriceProcessor for PriceDistributor {
    /// Producer entry point. Subscriber trouble never propagates back:
    /// delivery failures belong to the delivery tasks.
    async fn on_price(&self, ccy_pair: &str, rate: f64) -> anyhow::Result<()> {
        if let Some(seq) = self.table.publish_existing(ccy_pair, rate).await {
            trace!(component = "distributor", %ccy_pair, rate, seq, "published");
            return Ok(());
        }

        // First sighting of this pair, or a lost race with another first
        // publish. Only the call that created the slot fans it out, so
        // subscribers get exactly one task for it.
        let (slot, created) = self.table.create_or_publish(ccy_pair, rate).await;
        if created {
            self.subscriptions.attach_pair(ccy_pair, &slot).await;
        }
        Ok(())
    }
}
