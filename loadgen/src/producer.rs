use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::time::{Instant, interval};
use tracing::{debug, error};

use feed::{PriceDistributor, PriceProcessor};

/// Shared per-pair rate ramp.
///
/// All producers for one pair draw from the same counter, so the pair's
/// stream stays strictly increasing even when several producers race, and
/// the counter doubles as the published-update total for the report.
pub struct RateRamp {
    base: f64,
    ticks: AtomicU64,
}

impl RateRamp {
    pub fn new(base: f64) -> Arc<Self> {
        Arc::new(Self {
            base,
            ticks: AtomicU64::new(0),
        })
    }

    fn next(&self) -> f64 {
        let n = self.ticks.fetch_add(1, Ordering::Relaxed) + 1;
        // one pip per tick
        self.base + n as f64 * 0.0001
    }

    pub fn published(&self) -> u64 {
        self.ticks.load(Ordering::Relaxed)
    }
}

/// Publishes one ramp value for `ccy_pair` every `every` until `deadline`.
pub async fn run_producer(
    distributor: Arc<PriceDistributor>,
    ccy_pair: String,
    ramp: Arc<RateRamp>,
    every: Duration,
    deadline: Instant,
) {
    let mut ticker = interval(every);
    loop {
        ticker.tick().await;
        if Instant::now() >= deadline {
            break;
        }

        let rate = ramp.next();
        if let Err(err) = distributor.on_price(&ccy_pair, rate).await {
            error!(error = ?err, %ccy_pair, "publish failed");
        }
    }

    debug!(%ccy_pair, published = ramp.published(), "producer finished");
}
