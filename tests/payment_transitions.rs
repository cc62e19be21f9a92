use booking_engine::domain::payment::PaymentStatus;

#[test]
fn authorize_only_from_none() {
    assert!(PaymentStatus::None.can_authorize());
    assert!(!PaymentStatus::Authorized.can_authorize());
    assert!(!PaymentStatus::Captured.can_authorize());
    assert!(!PaymentStatus::Voided.can_authorize());
}

#[test]
fn capture_and_void_require_authorized() {
    assert!(PaymentStatus::Authorized.can_capture());
    assert!(PaymentStatus::Authorized.can_void());

    assert!(!PaymentStatus::None.can_capture());
    assert!(!PaymentStatus::None.can_void());
}

#[test]
fn captured_and_voided_are_terminal() {
    assert!(PaymentStatus::Captured.is_terminal());
    assert!(PaymentStatus::Voided.is_terminal());
    assert!(!PaymentStatus::None.is_terminal());
    assert!(!PaymentStatus::Authorized.is_terminal());

    // Terminal states accept nothing further.
    for terminal in [PaymentStatus::Captured, PaymentStatus::Voided] {
        assert!(!terminal.can_authorize());
        assert!(!terminal.can_capture());
        assert!(!terminal.can_void());
    }
}

#[test]
fn status_round_trips_through_storage_form() {
    for status in [
        PaymentStatus::None,
        PaymentStatus::Authorized,
        PaymentStatus::Captured,
        PaymentStatus::Voided,
    ] {
        assert_eq!(PaymentStatus::parse(status.as_str()), Some(status));
    }
    assert_eq!(PaymentStatus::parse("REFUNDED"), None);
}
