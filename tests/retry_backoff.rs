use booking_engine::service::retry_engine::{
    after_failure, backoff_delay, ApplyError, FailureDisposition,
};
use chrono::Duration;

#[test]
fn delay_doubles_per_attempt() {
    assert_eq!(backoff_delay(1, 30, 3600), Duration::seconds(30));
    assert_eq!(backoff_delay(2, 30, 3600), Duration::seconds(60));
    assert_eq!(backoff_delay(3, 30, 3600), Duration::seconds(120));
    assert_eq!(backoff_delay(4, 30, 3600), Duration::seconds(240));
}

#[test]
fn delay_is_capped() {
    assert_eq!(backoff_delay(10, 30, 3600), Duration::seconds(3600));
    // Large attempt counts must not overflow the shift.
    assert_eq!(backoff_delay(100, 30, 3600), Duration::seconds(3600));
}

#[test]
fn delay_strictly_increases_until_cap() {
    let mut previous = Duration::zero();
    for attempt in 1..=7 {
        let delay = backoff_delay(attempt, 30, 3600);
        assert!(delay > previous, "attempt {attempt} did not increase");
        previous = delay;
    }
}

#[test]
fn transient_failure_below_limit_is_retried() {
    let error = ApplyError::Transient("connection reset".to_string());
    match after_failure(3, 8, &error, 30, 3600) {
        FailureDisposition::Retry(delay) => assert_eq!(delay, Duration::seconds(120)),
        FailureDisposition::DeadLetter => panic!("should retry below the attempt limit"),
    }
}

#[test]
fn transient_failure_at_limit_dead_letters() {
    let error = ApplyError::Transient("connection reset".to_string());
    assert!(matches!(
        after_failure(8, 8, &error, 30, 3600),
        FailureDisposition::DeadLetter
    ));
}

#[test]
fn attempt_count_never_exceeds_max_attempts() {
    let error = ApplyError::Transient("flaky".to_string());
    for attempt in 1..=20 {
        if let FailureDisposition::Retry(_) = after_failure(attempt, 8, &error, 30, 3600) {
            assert!(attempt < 8, "retried at attempt {attempt} with max 8");
        }
    }
}

#[test]
fn permanent_failure_dead_letters_immediately() {
    let error = ApplyError::Permanent("booking no longer exists".to_string());
    assert!(matches!(
        after_failure(1, 8, &error, 30, 3600),
        FailureDisposition::DeadLetter
    ));
}
