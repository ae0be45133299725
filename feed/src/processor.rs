use async_trait::async_trait;

/// Inbound price handler, implemented by subscribers and by the
/// distributor itself so producers can treat it as just another
/// downstream.
///
/// Implementations must tolerate concurrent calls for *different*
/// currency pairs: each (subscriber, pair) delivery task invokes its
/// subscriber independently. Calls for one pair are always serialized.
#[async_trait]
pub trait PriceProcessor: Send + Sync {
    /// Handle the latest rate for `ccy_pair`, e.g. `("EURUSD", 1.1252)`.
    ///
    /// Pairs and rates are trusted upstream input and are not validated
    /// here. An `Err` marks this one delivery as failed; the delivery task
    /// logs it and moves on to the next value. Failed deliveries are never
    /// retried.
    async fn on_price(&self, ccy_pair: &str, rate: f64) -> anyhow::Result<()>;
}
