//! Configuration validation.
//!
//! Serde handles syntax; this module checks value ranges and combinations
//! that only make sense together (TLS needs both a cert and a key).
//! All problems are reported at once rather than stopping at the first.

use thiserror::Error;

use crate::config::schema::{ServiceConfig, MAX_SWEEP_INTERVAL_SECS};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("TLS enabled but cert or key file not specified")]
    IncompleteTls,

    #[error("invalid bind address {0:?}")]
    BindAddress(String),

    #[error("rate_limit.requests_per_second must be positive, got {0}")]
    NonPositiveRate(f64),

    #[error("rate_limit.burst_size must be at least 1")]
    ZeroBurst,

    #[error("{0} must be greater than zero")]
    ZeroDuration(&'static str),

    #[error("{0} must be at most {1}")]
    TooLong(&'static str, u64),
}

/// Check a parsed configuration, returning every problem found.
pub fn validate_config(config: &ServiceConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if let Some(tls) = &config.listener.tls {
        if tls.cert_path.is_empty() || tls.key_path.is_empty() {
            errors.push(ValidationError::IncompleteTls);
        }
    }

    if config
        .listener
        .bind_address
        .parse::<std::net::SocketAddr>()
        .is_err()
    {
        errors.push(ValidationError::BindAddress(
            config.listener.bind_address.clone(),
        ));
    }

    let rate = config.rate_limit.requests_per_second;
    if !rate.is_finite() || rate <= 0.0 {
        errors.push(ValidationError::NonPositiveRate(rate));
    }
    if config.rate_limit.burst_size == 0 {
        errors.push(ValidationError::ZeroBurst);
    }
    if config.rate_limit.sweep_interval_secs == 0 {
        errors.push(ValidationError::ZeroDuration("rate_limit.sweep_interval_secs"));
    }
    if config.rate_limit.sweep_interval_secs > MAX_SWEEP_INTERVAL_SECS {
        errors.push(ValidationError::TooLong(
            "rate_limit.sweep_interval_secs",
            MAX_SWEEP_INTERVAL_SECS,
        ));
    }
    if config.rate_limit.idle_timeout_secs == 0 {
        errors.push(ValidationError::ZeroDuration("rate_limit.idle_timeout_secs"));
    }
    if config.dns.timeout_ms == 0 {
        errors.push(ValidationError::ZeroDuration("dns.timeout_ms"));
    }
    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::ZeroDuration("timeouts.request_secs"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::TlsConfig;

    #[test]
    fn test_defaults_are_valid() {
        assert_eq!(validate_config(&ServiceConfig::default()), Ok(()));
    }

    #[test]
    fn test_tls_without_key_is_rejected() {
        let mut config = ServiceConfig::default();
        config.listener.tls = Some(TlsConfig {
            cert_path: "cert.pem".into(),
            key_path: String::new(),
        });

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors, vec![ValidationError::IncompleteTls]);
    }

    #[test]
    fn test_sweep_interval_upper_bound() {
        let mut config = ServiceConfig::default();
        config.rate_limit.sweep_interval_secs = MAX_SWEEP_INTERVAL_SECS;
        assert_eq!(validate_config(&config), Ok(()));

        config.rate_limit.sweep_interval_secs = u64::MAX / 2;
        assert_eq!(
            validate_config(&config).unwrap_err(),
            vec![ValidationError::TooLong(
                "rate_limit.sweep_interval_secs",
                MAX_SWEEP_INTERVAL_SECS
            )]
        );
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = ServiceConfig::default();
        config.listener.bind_address = ":8080".into();
        config.rate_limit.requests_per_second = 0.0;
        config.rate_limit.burst_size = 0;
        config.dns.timeout_ms = 0;

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 4);
        assert!(errors.contains(&ValidationError::ZeroBurst));
        assert!(errors.contains(&ValidationError::ZeroDuration("dns.timeout_ms")));
    }
}
