use super::*;

#[test]
fn empty_config_gets_defaults() {
    let config: PorticoConfig = toml::from_str("").unwrap();
    assert_eq!(config.server.host, "127.0.0.1");
    assert_eq!(config.server.port, 8080);
    assert_eq!(config.server.max_in_flight, 1024);
    assert_eq!(config.control_plane.bootstrap_path, "/control/bootstrap");
    assert_eq!(config.cache.connect_timeout_ms, 2000);
    assert_eq!(config.cache.read_timeout_ms, 1000);
    assert_eq!(config.upstream.timeout_seconds, 30);
    assert!(config.tenant.enabled);
    assert_eq!(config.rate_limit.ip_requests_per_window, 100);
    assert_eq!(config.rate_limit.ip_window_seconds, 60);
}

#[test]
fn custom_config_overrides() {
    let toml = r#"
        [server]
        host = "0.0.0.0"
        port = 8443
        max_in_flight = 2000

        [control_plane]
        url = "http://control:9090"

        [bus]
        brokers = "kafka:9092"

        [bus.topics]
        collection_changed = "cfg.collections"

        [cache]
        backend = "memory"
        url = "redis://cache:6379"

        [jwt]
        issuer_url = "https://id.example.com/realms/prod"

        [rate_limit]
        requests_per_window = 500
        window_seconds = 30

        [tenant]
        require_prefix = false

        [upstream]
        timeout_seconds = 10
        authorization_header = "preserve"
        response_size_limit = 1048576
    "#;

    let config: PorticoConfig = toml::from_str(toml).unwrap();
    assert_eq!(config.server.host, "0.0.0.0");
    assert_eq!(config.server.port, 8443);
    assert_eq!(config.bus.brokers, "kafka:9092");
    assert_eq!(config.bus.topics.collection_changed, "cfg.collections");
    assert_eq!(config.cache.backend, CacheBackend::Memory);
    assert_eq!(
        config.jwt.effective_jwks_url(),
        "https://id.example.com/realms/prod/protocol/openid-connect/certs"
    );
    assert!(!config.tenant.require_prefix);
    assert_eq!(
        config.upstream.authorization_header,
        AuthorizationHeaderMode::Preserve
    );
    assert_eq!(config.upstream.response_size_limit, 1_048_576);

    let policy = config.rate_limit.default_policy().unwrap();
    assert_eq!(policy.requests_per_window, 500);
    assert_eq!(policy.window_seconds, 30);
}

#[test]
fn disabled_rate_limit_has_no_default_policy() {
    let config: PorticoConfig = toml::from_str("[rate_limit]\nenabled = false").unwrap();
    assert!(config.rate_limit.default_policy().is_none());
}

#[test]
fn explicit_jwks_url_wins() {
    let config: PorticoConfig = toml::from_str(
        r#"
        [jwt]
        issuer_url = "https://id.example.com"
        jwks_url = "https://id.example.com/keys"
        "#,
    )
    .unwrap();
    assert_eq!(config.jwt.effective_jwks_url(), "https://id.example.com/keys");
}

#[test]
fn gateway_config_projection() {
    let config: PorticoConfig = toml::from_str(
        r#"
        [rate_limit]
        requests_per_window = 100
        window_seconds = 60

        [upstream]
        authorization_header = "strip"
        "#,
    )
    .unwrap();

    let gw = config.gateway_config();
    assert_eq!(gw.ip_limit, 100);
    assert_eq!(gw.response_size_limit, 4 << 20);
    assert!(gw.default_rate_limit.is_some());
    assert!(gw.public_paths.contains("/control/bootstrap"));
    assert!(!gw.public_paths.contains("/api/users"));
}
