use std::time::{Duration, Instant};

const POLL_INTERVAL: Duration = Duration::from_secs(1);

// Mirrors the pacing rule the dashboard uses: a new refresh is requested
// only once the interval has elapsed and no request is in flight.
fn should_request(last_tick: Instant, inflight: bool, now: Instant) -> bool {
    !inflight && now.duration_since(last_tick) >= POLL_INTERVAL
}

#[test]
fn refresh_waits_for_the_full_interval() {
    let start = Instant::now();
    assert!(!should_request(
        start,
        false,
        start + Duration::from_millis(400)
    ));
    assert!(should_request(start, false, start + POLL_INTERVAL));
}

#[test]
fn no_overlapping_refreshes() {
    let start = Instant::now();
    assert!(!should_request(start, true, start + POLL_INTERVAL * 2));
}
