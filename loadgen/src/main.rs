mod cli;
mod consumer;
mod producer;
mod report;

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use rand::Rng;
use tokio::time::Instant;
use tracing::info;

use common::init_logger;
use feed::{PriceDistributor, PriceProcessor};

use crate::cli::Cli;
use crate::consumer::LoggingConsumer;
use crate::producer::{RateRamp, run_producer};
use crate::report::{ConsumerReport, RunReport, sorted_rates};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logger("loadgen");
    let cli = Cli::parse();

    let started_at = chrono::Utc::now();
    let distributor = Arc::new(PriceDistributor::new());

    let fast = LoggingConsumer::new("fast", Duration::ZERO);
    let slow = LoggingConsumer::new("slow", Duration::from_millis(cli.slow_consumer_ms));
    let fast_handle: Arc<dyn PriceProcessor> = fast.clone();
    let slow_handle: Arc<dyn PriceProcessor> = slow.clone();

    distributor.subscribe(fast_handle.clone()).await;
    distributor.subscribe(slow_handle.clone()).await;

    let run = Duration::from_secs(cli.run_secs);
    let deadline = Instant::now() + run;
    let every = Duration::from_millis(cli.publish_interval_ms);

    let mut rng = rand::rng();
    let mut ramps: Vec<(String, Arc<RateRamp>)> = Vec::new();
    let mut producers = Vec::new();
    for pair in &cli.pairs {
        let ramp = RateRamp::new(rng.random_range(0.5..150.0));
        ramps.push((pair.clone(), Arc::clone(&ramp)));
        for _ in 0..cli.producers_per_pair {
            producers.push(tokio::spawn(run_producer(
                Arc::clone(&distributor),
                pair.clone(),
                Arc::clone(&ramp),
                every,
                deadline,
            )));
        }
    }

    info!(
        pairs = cli.pairs.len(),
        producers = producers.len(),
        run_secs = cli.run_secs,
        churn = cli.churn,
        "load run started"
    );

    if cli.churn {
        tokio::time::sleep(run / 2).await;
        distributor.unsubscribe(&slow_handle).await;
        info!(consumer = slow.name, "unsubscribed mid-run");

        tokio::time::sleep(run / 4).await;
        distributor.subscribe(slow_handle.clone()).await;
        info!(consumer = slow.name, "resubscribed, resumes from current values");

        tokio::time::sleep(run / 4).await;
    } else {
        tokio::time::sleep(run).await;
    }

    for producer in producers {
        producer.await?;
    }

    let report = RunReport {
        started_at,
        finished_at: chrono::Utc::now(),
        published: ramps
            .iter()
            .map(|(pair, ramp)| (pair.clone(), ramp.published()))
            .collect(),
        final_rates: sorted_rates(distributor.snapshot().await),
        consumers: vec![
            ConsumerReport {
                name: fast.name,
                pairs: fast.stats().await,
            },
            ConsumerReport {
                name: slow.name,
                pairs: slow.stats().await,
            },
        ],
    };

    if cli.json_report {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        for (pair, published) in &report.published {
            info!(%pair, published, "producer totals");
        }
        for last in &report.final_rates {
            info!(ccy_pair = %last.ccy_pair, rate = last.rate, "final snapshot");
        }
        for consumer in &report.consumers {
            for (pair, stats) in &consumer.pairs {
                info!(
                    consumer = consumer.name,
                    %pair,
                    deliveries = stats.deliveries,
                    last_rate = stats.last_rate,
                    "consumer totals"
                );
            }
            info!(
                consumer = consumer.name,
                deliveries = consumer.total_deliveries(),
                "run totals"
            );
        }
    }

    Ok(())
}
