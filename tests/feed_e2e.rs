use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, Sender};

use uhi_sync::{FeedConfig, FeedPhase, FeedUpdate, FetchMode, NetworkError, PollingFeed};

const WAIT: Duration = Duration::from_secs(2);

fn scripted(
    script: Vec<Result<Vec<u32>, NetworkError>>,
) -> impl Fn() -> Result<Vec<u32>, NetworkError> + Send + 'static {
    let script = Mutex::new(VecDeque::from(script));
    move || {
        script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(NetworkError::unreachable("script exhausted")))
    }
}

/// Fetch that signals entry and waits for a release before answering.
fn gated(
    value: Vec<u32>,
) -> (
    impl Fn() -> Result<Vec<u32>, NetworkError> + Send + 'static,
    Receiver<()>,
    Sender<()>,
) {
    let (entered_tx, entered_rx) = bounded(8);
    let (release_tx, release_rx) = bounded::<()>(8);
    let fetch = move || {
        let _ = entered_tx.send(());
        release_rx
            .recv_timeout(WAIT)
            .map_err(|_| NetworkError::unreachable("gate never opened"))?;
        Ok(value.clone())
    };
    (fetch, entered_rx, release_tx)
}

fn next(rx: &Receiver<FeedUpdate>) -> FeedUpdate {
    rx.recv_timeout(WAIT).unwrap()
}

#[test]
fn silent_failure_keeps_stale_data() {
    let fetch = scripted(vec![
        Ok(vec![1]),
        Err(NetworkError::unreachable("refused")),
        Ok(vec![3]),
    ]);
    let mut feed = PollingFeed::new(
        "recommendations",
        &FeedConfig::every(Duration::from_millis(30)),
        fetch,
    );
    let rx = feed.subscribe();
    feed.activate().unwrap();

    let first = next(&rx);
    assert_eq!((first.mode, first.phase), (FetchMode::Loud, FeedPhase::Ready));

    let second = next(&rx);
    assert_eq!((second.mode, second.phase), (FetchMode::Silent, FeedPhase::ReadyStale));
    let state = feed.snapshot();
    assert_eq!(state.data, Some(vec![1]));
    assert!(state.error.is_none());
    assert!(!state.loading);
    assert_eq!(state.suppressed_failures, 1);

    let third = next(&rx);
    assert_eq!((third.mode, third.phase), (FetchMode::Silent, FeedPhase::Ready));
    assert_eq!(feed.snapshot().data, Some(vec![3]));

    feed.deactivate();
}

#[test]
fn silent_failure_without_data_surfaces_error() {
    let fetch = scripted(vec![
        Err(NetworkError::status(503, "unavailable")),
        Err(NetworkError::unreachable("refused")),
    ]);
    let mut feed = PollingFeed::new(
        "health precautions",
        &FeedConfig::every(Duration::from_millis(30)),
        fetch,
    )
    .with_base_url("http://analytics.test");
    let rx = feed.subscribe();
    feed.activate().unwrap();

    let first = next(&rx);
    assert_eq!(first.phase, FeedPhase::Failed);
    assert_eq!(
        feed.snapshot().error.unwrap().message,
        "Failed to load health precautions. Please try again later."
    );

    let second = next(&rx);
    assert_eq!((second.mode, second.phase), (FetchMode::Silent, FeedPhase::Failed));
    let message = feed.snapshot().error.unwrap().message;
    assert!(message.starts_with("Backend server is not running"));
    assert!(message.ends_with("http://analytics.test"));

    feed.deactivate();
}

#[test]
fn silent_failure_without_data_can_be_suppressed() {
    let fetch = scripted(vec![Ok(vec![]), Err(NetworkError::unreachable("refused"))]);
    let config = FeedConfig {
        show_error_if_empty: false,
        ..FeedConfig::every(Duration::from_millis(30))
    };
    let mut feed = PollingFeed::new("recommendations", &config, fetch);
    let rx = feed.subscribe();
    feed.activate().unwrap();

    next(&rx);
    let second = next(&rx);
    assert_eq!(second.mode, FetchMode::Silent);
    assert!(feed.snapshot().error.is_none());

    feed.deactivate();
}

#[test]
fn loading_is_only_set_by_loud_fetches() {
    let (fetch, entered, release) = gated(vec![7]);
    let mut feed = PollingFeed::new(
        "recommendations",
        &FeedConfig::every(Duration::from_millis(40)),
        fetch,
    );
    let rx = feed.subscribe();
    feed.activate().unwrap();

    entered.recv_timeout(WAIT).unwrap();
    let state = feed.snapshot();
    assert!(state.loading);
    assert_eq!(state.phase, FeedPhase::Loading);
    release.send(()).unwrap();
    assert_eq!(next(&rx).mode, FetchMode::Loud);

    // First tick: a silent fetch leaves the flag alone.
    entered.recv_timeout(WAIT).unwrap();
    let state = feed.snapshot();
    assert!(!state.loading);
    assert_eq!(state.phase, FeedPhase::Ready);
    release.send(()).unwrap();
    assert_eq!(next(&rx).mode, FetchMode::Silent);

    feed.deactivate();
    // Unblock a tick that may have started before deactivation.
    let _ = release.try_send(());
}

#[test]
fn deactivation_discards_in_flight_response() {
    let (fetch, entered, release) = gated(vec![1, 2, 3]);
    let hook_calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&hook_calls);
    let mut feed =
        PollingFeed::new("heatmap data", &FeedConfig::once(), fetch).on_success(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
    let rx = feed.subscribe();
    feed.activate().unwrap();

    entered.recv_timeout(WAIT).unwrap();
    feed.deactivate();
    assert!(!feed.is_active());
    release.send(()).unwrap();

    assert!(rx.recv_timeout(Duration::from_millis(200)).is_err());
    let state = feed.snapshot();
    assert!(state.data.is_none());
    assert_eq!(state.successes, 0);
    assert_eq!(hook_calls.load(Ordering::SeqCst), 0);
}

#[test]
fn slow_subscriber_does_not_block_polling() {
    let fetches = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&fetches);
    let config = FeedConfig {
        update_capacity: 1,
        ..FeedConfig::every(Duration::from_millis(10))
    };
    let mut feed = PollingFeed::new("recommendations", &config, move || {
        Ok(counter.fetch_add(1, Ordering::SeqCst))
    });
    let _never_read = feed.subscribe();
    feed.activate().unwrap();

    thread::sleep(Duration::from_millis(150));
    feed.deactivate();
    assert!(fetches.load(Ordering::SeqCst) > 2);
}

#[test]
fn dropping_feed_stops_worker() {
    let fetches = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&fetches);
    let mut feed = PollingFeed::new(
        "recommendations",
        &FeedConfig::every(Duration::from_millis(10)),
        move || Ok(counter.fetch_add(1, Ordering::SeqCst)),
    );
    let rx = feed.subscribe();
    feed.activate().unwrap();
    next(&rx);
    drop(feed);

    thread::sleep(Duration::from_millis(50));
    let settled = fetches.load(Ordering::SeqCst);
    thread::sleep(Duration::from_millis(100));
    assert_eq!(fetches.load(Ordering::SeqCst), settled);
}
