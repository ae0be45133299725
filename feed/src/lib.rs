//! Conflating price-update distribution.
//!
//! Producers publish (currency pair, rate) samples into a
//! [`distributor::PriceDistributor`]; every registered subscriber gets one
//! delivery task per pair that always hands it the pair's latest value,
//! skipping whatever the subscriber was too slow to see.

pub mod delivery;
pub mod distributor;
pub mod processor;
pub mod subscription;
pub mod table;
pub mod types;

pub use delivery::DeliveryError;
pub use distributor::PriceDistributor;
pub use processor::PriceProcessor;
pub use types::{PairRate, RateUpdate};
