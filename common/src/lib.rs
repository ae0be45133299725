pub mod logger;

pub use logger::{SubId, init_logger};
