
use std::sync::Arc;
use std::time::Duration;

use feed::{PriceDistributor, PriceProcessor};
use mock_processor::{FlakyProcessor, PanickingProcessor, RecordingProcessor};

fn strictly_increasing(rates: &[f64]) -> bool {
    rates.windows(2).all(|w| w[0] < w[1])
}

#[tokio::test]
async fn snapshot_without_subscribers_returns_latest_rates() {
    let distributor = PriceDistributor::new();

    distributor.on_price("EURUSD", 1.10).await.unwrap();
    distributor.on_price("EURUSD", 1.11).await.unwrap();
    distributor.on_price("EURUSD", 1.12).await.unwrap();
    distributor.on_price("USDJPY", 155.20).await.unwrap();

    let snap = distributor.snapshot().await;
    assert_eq!(snap.len(), 2);
    assert_eq!(snap["EURUSD"].rate, 1.12);
    assert_eq!(snap["EURUSD"].ccy_pair, "EURUSD");
    assert_eq!(snap["USDJPY"].rate, 155.20);
}

#[tokio::test]
async fn late_subscriber_is_seeded_with_current_values_only() {
    let distributor = PriceDistributor::new();

    distributor.on_price("EURUSD", 1.10).await.unwrap();
    distributor.on_price("EURUSD", 1.11).await.unwrap();
    distributor.on_price("USDJPY", 155.20).await.unwrap();

    let recorder = RecordingProcessor::new("late");
    distributor.subscribe(recorder.clone()).await;

    assert_eq!(recorder.wait_for_deliveries("EURUSD", 1).await, vec![1.11]);
    assert_eq!(
        recorder.wait_for_deliveries("USDJPY", 1).await,
        vec![155.20]
    );

    // the overwritten 1.10 must never show up
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(recorder.rates_for("EURUSD").await, vec![1.11]);
}

#[tokio::test]
async fn unsubscribe_stops_deliveries_and_resubscribe_seeds_fresh() {
    let distributor = PriceDistributor::new();
    let recorder = RecordingProcessor::new("returning");
    let handle: Arc<dyn PriceProcessor> = recorder.clone();

    distributor.on_price("EURUSD", 1.10).await.unwrap();
    distributor.on_price("EURUSD", 1.11).await.unwrap();

    distributor.subscribe(handle.clone()).await;
    assert_eq!(recorder.wait_for_rate("EURUSD", 1.11).await, vec![1.11]);

    distributor.on_price("EURUSD", 1.12).await.unwrap();
    assert_eq!(
        recorder.wait_for_rate("EURUSD", 1.12).await,
        vec![1.11, 1.12]
    );

    distributor.unsubscribe(&handle).await;
    assert_eq!(distributor.subscriber_count().await, 0);

    distributor.on_price("EURUSD", 1.13).await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(recorder.rates_for("EURUSD").await, vec![1.11, 1.12]);

    // back in: first delivery is the current value, not the missed one
    distributor.subscribe(handle.clone()).await;
    assert_eq!(
        recorder.wait_for_rate("EURUSD", 1.13).await,
        vec![1.11, 1.12, 1.13]
    );
    assert_eq!(distributor.subscriber_count().await, 1);
}

#[tokio::test]
async fn unsubscribe_of_unknown_handle_is_ignored() {
    let distributor = PriceDistributor::new();
    distributor.on_price("EURUSD", 1.10).await.unwrap();

    let stranger: Arc<dyn PriceProcessor> = RecordingProcessor::new("stranger");
    distributor.unsubscribe(&stranger).await;

    assert_eq!(distributor.subscriber_count().await, 0);
    assert_eq!(distributor.snapshot().await["EURUSD"].rate, 1.10);
}

#[tokio::test]
async fn subscribe_is_idempotent_while_registered() {
    let distributor = PriceDistributor::new();
    let recorder = RecordingProcessor::new("eager");
    let handle: Arc<dyn PriceProcessor> = recorder.clone();

    distributor.subscribe(handle.clone()).await;
    distributor.subscribe(handle.clone()).await;
    assert_eq!(distributor.subscriber_count().await, 1);

    distributor.on_price("EURUSD", 1.10).await.unwrap();
    assert_eq!(recorder.wait_for_deliveries("EURUSD", 1).await, vec![1.10]);

    // a duplicate task would deliver the value a second time
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(recorder.rates_for("EURUSD").await, vec![1.10]);
}

#[tokio::test]
async fn new_pair_reaches_existing_subscribers() {
    let distributor = PriceDistributor::new();
    let recorder = RecordingProcessor::new("early");

    distributor.subscribe(recorder.clone()).await;
    distributor.on_price("GBPUSD", 1.27).await.unwrap();

    assert_eq!(recorder.wait_for_deliveries("GBPUSD", 1).await, vec![1.27]);
}

#[tokio::test]
async fn repeated_rate_is_redelivered_to_a_keeping_up_subscriber() {
    let distributor = PriceDistributor::new();
    let recorder = RecordingProcessor::new("fast");
    distributor.subscribe(recorder.clone()).await;

    distributor.on_price("EURUSD", 1.10).await.unwrap();
    recorder.wait_for_deliveries("EURUSD", 1).await;
    distributor.on_price("EURUSD", 1.10).await.unwrap();

    assert_eq!(
        recorder.wait_for_deliveries("EURUSD", 2).await,
        vec![1.10, 1.10]
    );
}

#[tokio::test]
async fn slow_and_fast_subscribers_do_not_interfere() {
    let distributor = PriceDistributor::new();
    let fast = RecordingProcessor::new("fast");
    let slow = RecordingProcessor::with_processing_time("slow", Duration::from_millis(150));

    distributor.subscribe(fast.clone()).await;
    distributor.subscribe(slow.clone()).await;
    assert_eq!(distributor.subscriber_count().await, 2);

    for i in 1..=10 {
        distributor.on_price("EURUSD", 100.0 + i as f64).await.unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    let fast_rates = fast.wait_for_rate("EURUSD", 110.0).await;
    let slow_rates = slow.wait_for_rate("EURUSD", 110.0).await;

    assert!(strictly_increasing(&fast_rates));
    assert!(strictly_increasing(&slow_rates));
    assert_eq!(fast_rates.last(), Some(&110.0));
    assert_eq!(slow_rates.last(), Some(&110.0));
    assert!(fast_rates.len() >= slow_rates.len());
}

#[tokio::test]
async fn failed_callbacks_skip_the_value_but_keep_the_stream() {
    let distributor = PriceDistributor::new();
    let flaky = FlakyProcessor::new(vec![1.10]);
    let witness = RecordingProcessor::new("witness");

    distributor.subscribe(flaky.clone()).await;
    distributor.subscribe(witness.clone()).await;

    distributor.on_price("EURUSD", 1.10).await.unwrap();
    assert_eq!(flaky.wait_for_attempts(1).await, vec![1.10]);

    distributor.on_price("EURUSD", 1.11).await.unwrap();
    assert_eq!(flaky.wait_for_attempts(2).await, vec![1.10, 1.11]);
    assert_eq!(witness.wait_for_rate("EURUSD", 1.11).await, vec![1.10, 1.11]);
}

#[tokio::test]
async fn panicking_subscriber_keeps_its_stream_and_its_neighbours() {
    let distributor = PriceDistributor::new();
    let volatile = PanickingProcessor::new(vec![2.20]);
    let witness = RecordingProcessor::new("witness");

    distributor.subscribe(volatile.clone()).await;
    distributor.subscribe(witness.clone()).await;

    distributor.on_price("GBPUSD", 2.20).await.unwrap();
    assert_eq!(volatile.wait_for_attempts(1).await, vec![2.20]);

    distributor.on_price("GBPUSD", 2.21).await.unwrap();
    assert_eq!(volatile.wait_for_attempts(2).await, vec![2.20, 2.21]);
    assert_eq!(witness.wait_for_rate("GBPUSD", 2.21).await, vec![2.20, 2.21]);
    assert_eq!(distributor.subscriber_count().await, 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_first_publishes_and_subscribe_attach_one_task_each() {
    for _ in 0..5 {
        let distributor = Arc::new(PriceDistributor::new());
        let recorder = RecordingProcessor::new("racer");
        let handle: Arc<dyn PriceProcessor> = recorder.clone();

        let mut publishers = Vec::new();
        for i in 0..16 {
            let distributor = Arc::clone(&distributor);
            publishers.push(tokio::spawn(async move {
                let pair = format!("PAIR{i:02}");
                distributor.on_price(&pair, 1.0 + i as f64).await.unwrap();
            }));
        }
        let subscriber = {
            let distributor = Arc::clone(&distributor);
            let handle = handle.clone();
            tokio::spawn(async move { distributor.subscribe(handle).await })
        };

        for publisher in publishers {
            publisher.await.unwrap();
        }
        subscriber.await.unwrap();

        for i in 0..16 {
            let pair = format!("PAIR{i:02}");
            let rates = recorder.wait_for_deliveries(&pair, 1).await;
            assert_eq!(rates, vec![1.0 + i as f64], "{pair} delivered once");
        }

        // a duplicate task for any pair would deliver its value again
        tokio::time::sleep(Duration::from_millis(100)).await;
        for i in 0..16 {
            let pair = format!("PAIR{i:02}");
            assert_eq!(recorder.rates_for(&pair).await.len(), 1, "{pair} stayed at one");
        }
    }
}
