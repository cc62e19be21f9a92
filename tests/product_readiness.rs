#[test]
fn internal_api_key_env_name_is_stable() {
    let cfg = booking_engine::config::AppConfig::from_env();
    assert!(!cfg.internal_api_key.is_empty());
}

#[test]
fn retry_tuning_defaults_are_sane() {
    let cfg = booking_engine::config::AppConfig::from_env();
    assert!(cfg.retry_max_attempts >= 1);
    assert!(cfg.retry_base_secs >= 1);
    assert!(cfg.retry_cap_secs >= cfg.retry_base_secs);
    assert!(cfg.stalled_reclaim_secs >= 1);
}

#[test]
fn public_endpoints_exist_in_readme() {
    let readme = std::fs::read_to_string("README.md").unwrap_or_default();
    assert!(readme.contains("/webhooks/payment"));
    assert!(readme.contains("/webhooks/esign"));
    assert!(readme.contains("/webhooks/email"));
    assert!(readme.contains("/admin/webhook-retries/dead-letter"));
    assert!(readme.contains("/ops/readiness"));
}
