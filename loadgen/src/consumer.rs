use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::info;

use feed::PriceProcessor;

/// Per-pair delivery tally for one consumer.
#[derive(Debug, Default, Clone, Serialize)]
pub struct PairStats {
    pub deliveries: u64,
    pub last_rate: f64,
}

/// Logs every delivery under its name and keeps per-pair statistics for
/// the end-of-run report. A non-zero processing time turns it into a
/// consumer that cannot keep up, which is where conflation shows.
pub struct LoggingConsumer {
    pub name: &'static str,
    processing_time: Duration,
    stats: Mutex<HashMap<String, PairStats>>,
}

impl LoggingConsumer {
    pub fn new(name: &'static str, processing_time: Duration) -> Arc<Self> {
        Arc::new(Self {
            name,
            processing_time,
            stats: Mutex::new(HashMap::new()),
        })
    }

    pub async fn stats(&self) -> HashMap<String, PairStats> {
        self.stats.lock().await.clone()
    }
}

#[async_trait]
impl PriceProcessor for LoggingConsumer {
    async fn on_price(&self, ccy_pair: &str, rate: f64) -> anyhow::Result<()> {
        info!(consumer = self.name, %ccy_pair, rate, "delivery");

        {
            let mut stats = self.stats.lock().await;
            let entry = stats.entry(ccy_pair.to_string()).or_default();
            entry.deliveries += 1;
            entry.last_rate = rate;
        }

        if !self.processing_time.is_zero() {
            tokio::time::sleep(self.processing_time).await;
        }
        Ok(())
    }
}
