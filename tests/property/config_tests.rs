//! Property-based tests for configuration handling

use proptest::prelude::*;

use leetcoach_gateway::config::{parse_origin_list, GatewayConfig, SecurityConfig};

proptest! {
    /// Test that valid port numbers pass validation
    #[test]
    fn test_valid_port_passes(port in 1u16..=65535) {
        let mut config = GatewayConfig::default();
        config.server.port = port;

        prop_assert!(config.validate().is_ok(), "Port {} should be valid", port);
    }

    /// Any positive limit and window is accepted
    #[test]
    fn test_positive_rate_limits_pass(
        rpm in 1u32..1_000_000,
        window in 1u64..86_400,
    ) {
        let mut config = GatewayConfig::default();
        config.security.rate_limiting.requests_per_minute = rpm;
        config.security.rate_limiting.window_size_seconds = window;

        prop_assert!(config.validate().is_ok());
    }

    /// Parsing a joined list gives back the trimmed, non-empty entries
    #[test]
    fn test_origin_list_round_trip(
        origins in prop::collection::vec("https://[a-z]{1,12}\\.test", 0..8),
        padding in " {0,3}",
    ) {
        let joined = origins
            .iter()
            .map(|o| format!("{}{}{}", padding, o, padding))
            .collect::<Vec<_>>()
            .join(",");

        prop_assert_eq!(parse_origin_list(&joined), origins);
    }

    /// Exact-match entries admit themselves and reject any extension of the name
    #[test]
    fn test_exact_origin_match(
        host in "[a-z]{1,12}",
        suffix in "[a-z]{1,6}",
    ) {
        let origin = format!("https://{}.test", host);
        let config = SecurityConfig {
            allowed_origins: vec![origin.clone()],
            ..Default::default()
        };

        prop_assert!(config.is_origin_allowed(&origin));
        let extended = format!("{}.{}", origin, suffix);
        prop_assert!(!config.is_origin_allowed(&extended));
    }

    /// Wildcard subdomains require a label boundary
    #[test]
    fn test_wildcard_requires_boundary(
        sub in "[a-z]{1,12}",
        prefix in "[a-z]{1,12}",
    ) {
        let config = SecurityConfig {
            allowed_origins: vec!["*.leetcoach.app".to_string()],
            ..Default::default()
        };

        let subdomain = format!("https://{}.leetcoach.app", sub);
        prop_assert!(config.is_origin_allowed(&subdomain));
        let glued = format!("https://{}leetcoach.app", prefix);
        prop_assert!(!config.is_origin_allowed(&glued));
    }
}

#[cfg(test)]
mod validation_tests {
    use super::*;

    #[test]
    fn test_zero_port_fails() {
        let mut config = GatewayConfig::default();
        config.server.port = 0;

        assert!(config.validate().is_err(), "Port 0 should fail validation");
    }

    #[test]
    fn test_zero_rate_limit_fails() {
        let mut config = GatewayConfig::default();
        config.security.rate_limiting.requests_per_minute = 0;

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_origins_need_debug() {
        let mut config = GatewayConfig::default();
        config.security.allowed_origins.clear();
        assert!(config.validate().is_err());

        config.security.debug = true;
        assert!(config.validate().is_ok());
    }
}
