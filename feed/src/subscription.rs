use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{RwLock, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use common::SubId;

use crate::delivery::DeliveryTask;
use crate::processor::PriceProcessor;
use crate::table::{RateSlot, RateTable};
use crate::types::RateUpdate;

/// Registry key: the data-pointer identity of the subscriber's `Arc`.
///
/// Registration works by handle identity, never by value. Two structurally
/// identical subscribers in distinct `Arc`s are distinct registrations,
/// and the address cannot be reused while the registration below holds the
/// `Arc` alive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct SubscriberKey(usize);

impl SubscriberKey {
    fn of(subscriber: &Arc<dyn PriceProcessor>) -> Self {
        Self(Arc::as_ptr(subscriber) as *const () as usize)
    }
}

/// One live subscriber: its handle, its cancellation scope, and the
/// delivery task running for each pair it receives.
///
/// Dropping the registration detaches the join handles; the shared token
/// is what actually stops the tasks.
struct Registration {
    sub_id: SubId,
    subscriber: Arc<dyn PriceProcessor>,
    cancel: CancellationToken,
    tasks: HashMap<String, JoinHandle<()>>,
}

/// Tracks live subscribers and owns every delivery task's lifetime.
///
/// The registry lock is the meeting point of the two racing directions:
/// a new subscriber enumerating existing pairs (here, under the write
/// guard) and a new pair fanning out to existing subscribers
/// ([`Self::attach_pair`], same guard). The per-registration pair check
/// makes both orders converge on one task per (subscriber, pair).
pub struct SubscriptionManager {
    registrations: RwLock<HashMap<SubscriberKey, Registration>>,
}

impl SubscriptionManager {
    pub fn new() -> Self {
        Self {
            registrations: RwLock::new(HashMap::new()),
        }
    }

    /// Registers `subscriber` and seeds one delivery task per known pair,
    /// each of which first delivers that pair's current value. Subscribing
    /// an already-registered handle is a no-op.
    pub(crate) async fn subscribe(&self, subscriber: Arc<dyn PriceProcessor>, table: &RateTable) {
        let key = SubscriberKey::of(&subscriber);
        let mut regs = self.registrations.write().await;
        if regs.contains_key(&key) {
            warn!(
                component = "subscription",
                "subscribe ignored: handle already registered"
            );
            return;
        }

        let sub_id = SubId::new();
        let cancel = CancellationToken::new();
        let mut tasks = HashMap::new();

        // The registry guard is held across the table read so a first
        // publish cannot slip between "enumerate pairs" and "record the
        // registration": it would miss this subscriber while this
        // subscriber missed its pair.
        for (ccy_pair, slot) in table.slots().await {
            let handle = spawn_delivery(&ccy_pair, &sub_id, &subscriber, &cancel, slot.watch());
            tasks.insert(ccy_pair, handle);
        }

        info!(
            component = "subscription",
            sub_id = %sub_id,
            pairs = tasks.len(),
            "subscriber registered"
        );

        regs.insert(
            key,
            Registration {
                sub_id,
                subscriber,
                cancel,
                tasks,
            },
        );
    }

    /// Removes the registration and cancels all of its delivery tasks.
    ///
    /// Cancellation is cooperative: a task mid-callback finishes that one
    /// invocation and stops at its next wait point. Unknown handles are a
    /// no-op.
    pub(crate) async fn unsubscribe(&self, subscriber: &Arc<dyn PriceProcessor>) {
        let key = SubscriberKey::of(subscriber);
        let removed = {
            let mut regs = self.registrations.write().await;
            regs.remove(&key)
        };

        match removed {
            Some(reg) => {
                reg.cancel.cancel();
                info!(
                    component = "subscription",
                    sub_id = %reg.sub_id,
                    pairs = reg.tasks.len(),
                    "subscriber removed, delivery tasks cancelled"
                );
            }
            None => {
                debug!(
                    component = "subscription",
                    "unsubscribe ignored: handle not registered"
                );
            }
        }
    }

    /// Fans a first-seen pair out to every current registration.
    ///
    /// Runs under the registry write guard so it cannot interleave with a
    /// subscribe; the contains check keeps the task unique when the
    /// subscriber already picked this pair up from its own enumeration.
    pub(crate) async fn attach_pair(&self, ccy_pair: &str, slot: &Arc<RateSlot>) {
        let mut regs = self.registrations.write().await;
        for reg in regs.values_mut() {
            if reg.tasks.contains_key(ccy_pair) {
                continue;
            }
            let handle =
                spawn_delivery(ccy_pair, &reg.sub_id, &reg.subscriber, &reg.cancel, slot.watch());
            reg.tasks.insert(ccy_pair.to_string(), handle);
            debug!(
                component = "subscription",
                sub_id = %reg.sub_id,
                %ccy_pair,
                "delivery task attached for new pair"
            );
        }
    }

    /// Number of live registrations.
    pub(crate) async fn count(&self) -> usize {
        self.registrations.read().await.len()
    }
}

impl Default for SubscriptionManager {
    fn default() -> Self {
        Self::new()
    }
}

fn spawn_delivery(
    ccy_pair: &str,
    sub_id: &SubId,
    subscriber: &Arc<dyn PriceProcessor>,
    cancel: &CancellationToken,
    rx: watch::Receiver<RateUpdate>,
) -> JoinHandle<()> {
    let task = DeliveryTask {
        ccy_pair: ccy_pair.to_string(),
        sub_id: sub_id.clone(),
        subscriber: Arc::clone(subscriber),
        cancel: cancel.clone(),
    };
    tokio::spawn(task.run(rx))
}
