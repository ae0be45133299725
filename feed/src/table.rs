use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{RwLock, watch};
use tracing::debug;

use crate::types::{PairRate, RateUpdate};

/// One currency pair's latest-value holder.
///
/// The watch sender keeps the newest [`RateUpdate`] alive even while no
/// receiver exists, so snapshots and late subscribers always find the last
/// value published. Publishing wakes every delivery task watching the pair.
pub struct RateSlot {
    tx: watch::Sender<RateUpdate>,
}

impl RateSlot {
    pub(crate) fn new(first: PairRate) -> Self {
        let (tx, _rx) = watch::channel(RateUpdate {
            seq: 1,
            rate: Arc::new(first),
        });
        Self { tx }
    }

    /// Installs a fresh sample and advances the slot's sequence counter.
    ///
    /// Both move under the channel's internal lock, so racing publishes
    /// cannot pair a newer seq with an older rate and a concurrent borrow
    /// never sees a torn update.
    pub(crate) fn publish(&self, sample: PairRate) -> u64 {
        let mut seq = 0;
        self.tx.send_modify(|update| {
            update.seq += 1;
            update.rate = Arc::new(sample);
            seq = update.seq;
        });
        seq
    }

    /// The update currently held by this slot.
    pub(crate) fn current(&self) -> RateUpdate {
        self.tx.borrow().clone()
    }

    /// A new receiver for a delivery task. Fresh receivers treat the value
    /// present at creation as already seen; the delivery loop reads it
    /// explicitly before waiting for changes.
    pub(crate) fn watch(&self) -> watch::Receiver<RateUpdate> {
        self.tx.subscribe()
    }
}

/// Pair to slot map with a shared-read publish hot path.
///
/// Slot creation is the only write. Once a pair exists, publishes take the
/// read guard and different pairs proceed without contending. Slots are
/// never removed; the pair universe is small and bounded upstream.
pub struct RateTable {
    slots: RwLock<HashMap<String, Arc<RateSlot>>>,
}

impl RateTable {
    pub fn new() -> Self {
        Self {
            slots: RwLock::new(HashMap::new()),
        }
    }

    /// Publishes into an existing slot. `None` means the pair has no slot
    /// yet and the caller must go through [`Self::create_or_publish`].
    pub(crate) async fn publish_existing(&self, ccy_pair: &str, rate: f64) -> Option<u64> {
        let slots = self.slots.read().await;
        let slot = slots.get(ccy_pair)?;
        Some(slot.publish(PairRate::new(ccy_pair, rate)))
    }

    /// Get-or-create for a pair's slot, publishing `rate` either way.
    ///
    /// Exactly one of several racing first publishes creates the slot; the
    /// rest land in it as ordinary updates. Returns the slot and whether
    /// this call created it, so the caller knows to fan the new pair out
    /// to subscribers exactly once.
    pub(crate) async fn create_or_publish(
        &self,
        ccy_pair: &str,
        rate: f64,
    ) -> (Arc<RateSlot>, bool) {
        let mut slots = self.slots.write().await;
        if let Some(slot) = slots.get(ccy_pair) {
            let slot = Arc::clone(slot);
            drop(slots);
            slot.publish(PairRate::new(ccy_pair, rate));
            return (slot, false);
        }

        let slot = Arc::new(RateSlot::new(PairRate::new(ccy_pair, rate)));
        slots.insert(ccy_pair.to_string(), Arc::clone(&slot));
        debug!(component = "table", %ccy_pair, "first value for pair");
        (slot, true)
    }

    /// Latest value per pair at the time of the call.
    ///
    /// Atomic per pair only: the read guard pins the pair set while each
    /// slot contributes whatever it holds when borrowed.
    pub async fn snapshot(&self) -> HashMap<String, Arc<PairRate>> {
        let slots = self.slots.read().await;
        slots
            .iter()
            .map(|(pair, slot)| (pair.clone(), slot.current().rate))
            .collect()
    }

    /// Every known pair with its slot, for seeding a new subscriber.
    pub(crate) async fn slots(&self) -> Vec<(String, Arc<RateSlot>)> {
        let slots = self.slots.read().await;
        slots
            .iter()
            .map(|(pair, slot)| (pair.clone(), Arc::clone(slot)))
            .collect()
    }
}

impl Default for RateTable {
    fn default() -> Self {
        Self::new()
    }
}
