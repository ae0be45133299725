use clap::Parser;

/// Load harness for the price distributor: timer-driven producers on one
/// side, logging consumers of configurable speed on the other.
#[derive(Debug, Parser)]
#[clap(name = "loadgen", version)]
pub struct Cli {
    /// Currency pairs to stream.
    #[clap(long, value_delimiter = ',', default_value = "EURUSD,USDJPY,EURRUB")]
    pub pairs: Vec<String>,

    /// Gap between publishes per producer, in milliseconds.
    #[clap(long, default_value = "25")]
    pub publish_interval_ms: u64,

    /// Producers hammering each pair. More than one exercises racing
    /// publishes for the same pair.
    #[clap(long, default_value = "2")]
    pub producers_per_pair: usize,

    /// Simulated processing time of the slow consumer, in milliseconds.
    #[clap(long, default_value = "400")]
    pub slow_consumer_ms: u64,

    /// Total run time, in seconds.
    #[clap(long, default_value = "10")]
    pub run_secs: u64,

    /// Unsubscribe the slow consumer halfway through and bring it back at
    /// three quarters, to show a returning consumer starts from current
    /// values.
    #[clap(long)]
    pub churn: bool,

    /// Print the end-of-run report as JSON instead of log lines.
    #[clap(long)]
    pub json_report: bool,
}
