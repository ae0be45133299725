use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use thiserror::Error;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{trace, warn};

use common::SubId;

use crate::processor::PriceProcessor;
use crate::types::RateUpdate;

/// Why one delivery attempt failed. The task logs the failure and treats
/// the value as consumed; retrying would hand the subscriber stale data.
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("subscriber callback failed: {0:#}")]
    Callback(anyhow::Error),
    #[error("subscriber callback panicked")]
    Panicked,
}

/// Conflated delivery for one (subscriber, pair) registration.
///
/// Exactly one of these runs per registration and pair, which is what
/// serializes callbacks per pair and lets slower subscribers skip
/// intermediate values without holding anyone else up.
pub(crate) struct DeliveryTask {
    pub(crate) ccy_pair: String,
    pub(crate) sub_id: SubId,
    pub(crate) subscriber: Arc<dyn PriceProcessor>,
    pub(crate) cancel: CancellationToken,
}

impl DeliveryTask {
    /// Delivers the slot's current value, then waits for a newer one or
    /// for cancellation. However many publishes land while the subscriber
    /// is busy, the next read observes only the latest.
    pub(crate) async fn run(self, mut rx: watch::Receiver<RateUpdate>) {
        loop {
            // Cancellation may race the wake-up; re-checked here so the
            // cancelled branch wins over an already-pending value.
            if self.cancel.is_cancelled() {
                break;
            }

            let update = rx.borrow_and_update().clone();
            if let Err(err) = self.deliver(&update).await {
                warn!(
                    component = "delivery",
                    ccy_pair = %self.ccy_pair,
                    sub_id = %self.sub_id,
                    seq = update.seq,
                    error = %err,
                    "delivery failed; value treated as consumed"
                );
            }

            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                changed = rx.changed() => {
                    // The sender sits in the rate table; it only closes
                    // when the distributor itself is gone.
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }

        trace!(
            component = "delivery",
            ccy_pair = %self.ccy_pair,
            sub_id = %self.sub_id,
            "delivery task stopped"
        );
    }

    /// One callback invocation, with panics contained so a misbehaving
    /// subscriber cannot take its delivery loop down.
    async fn deliver(&self, update: &RateUpdate) -> Result<(), DeliveryError> {
        let call = self
            .subscriber
            .on_price(&update.rate.ccy_pair, update.rate.rate);

        match AssertUnwindSafe(call).catch_unwind().await {
            Ok(Ok(())) => {
                trace!(
                    component = "delivery",
                    ccy_pair = %self.ccy_pair,
                    sub_id = %self.sub_id,
                    seq = update.seq,
                    rate = update.rate.rate,
                    "delivered"
                );
                Ok(())
            }
            Ok(Err(err)) => Err(DeliveryError::Callback(err)),
            Err(_panic) => Err(DeliveryError::Panicked),
        }
    }
}
