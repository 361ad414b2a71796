use std::time::Duration;

const YEAR_SECONDS: u64 = 365 * 24 * 3600;

pub(crate) fn ensure_timeout_or_panic(timeout: Duration) {
    let max_duration = Duration::from_secs(1_000 * YEAR_SECONDS);
    assert!(!timeout.is_zero(), "timeout must be greater than zero");
    assert!(timeout <= max_duration, "timeout is longer than 1000 years");
}
