use super::*;

#[test]
fn fixed_delay_honors_attempt_budget() {
    let policy = FixedDelay::new(3, Duration::from_millis(250));

    for attempt in 1..=3 {
        assert_eq!(policy.next_delay(attempt), Some(Duration::from_millis(250)));
    }
    assert_eq!(policy.next_delay(4), None);
    assert_eq!(policy.next_delay(100), None);
}

#[test]
fn fixed_delay_defaults_to_five_one_second_attempts() {
    let policy = FixedDelay::default();
    assert_eq!(policy.next_delay(5), Some(Duration::from_secs(1)));
    assert_eq!(policy.next_delay(6), None);
}

#[test]
fn zero_attempts_never_retries() {
    let policy = FixedDelay::new(0, Duration::from_secs(1));
    assert_eq!(policy.next_delay(1), None);
}

#[test]
fn exponential_doubles_and_caps_without_jitter() {
    let policy = ExponentialBackoff {
        initial: Duration::from_secs(1),
        cap: Duration::from_secs(10),
        max_attempts: 8,
        jitter: false,
    };

    assert_eq!(policy.next_delay(1), Some(Duration::from_secs(1)));
    assert_eq!(policy.next_delay(2), Some(Duration::from_secs(2)));
    assert_eq!(policy.next_delay(3), Some(Duration::from_secs(4)));
    assert_eq!(policy.next_delay(4), Some(Duration::from_secs(8)));
    assert_eq!(policy.next_delay(5), Some(Duration::from_secs(10)));
    assert_eq!(policy.next_delay(8), Some(Duration::from_secs(10)));
    assert_eq!(policy.next_delay(9), None);
}

#[test]
fn exponential_jitter_stays_within_half_to_full_base() {
    let policy = ExponentialBackoff {
        initial: Duration::from_secs(2),
        cap: Duration::from_secs(60),
        max_attempts: 4,
        jitter: true,
    };

    for _ in 0..50 {
        let delay = policy.next_delay(2).expect("delay");
        assert!(delay >= Duration::from_secs(2), "delay {delay:?} below half of 4s base");
        assert!(delay <= Duration::from_secs(4), "delay {delay:?} above 4s base");
    }
}

#[test]
fn exponential_rejects_attempt_zero() {
    assert_eq!(ExponentialBackoff::default().next_delay(0), None);
}
