//! Configuration validation.
//!
//! Serde handles syntax; this checks value ranges and cross-field rules.
//! All problems are collected, not just the first.

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::{BridgeConfig, PLACEHOLDER_API_KEY};

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("listener.bind_address `{0}` is not a socket address")]
    InvalidBindAddress(String),

    #[error("timeouts.round_trip_secs must be greater than zero")]
    ZeroRoundTrip,

    #[error("timeouts.request_secs ({request}) must exceed timeouts.round_trip_secs ({round_trip})")]
    RequestTimeoutTooShort { request: u64, round_trip: u64 },

    #[error("liveness.interval_secs must be greater than zero")]
    ZeroLivenessInterval,

    #[error("liveness.message must not be empty")]
    EmptyLivenessMessage,

    #[error("security.max_body_size must be greater than zero")]
    ZeroBodyLimit,

    #[error("observability.metrics_address `{0}` is not a socket address")]
    InvalidMetricsAddress(String),

    #[error("admin.api_key must be changed from the placeholder when admin is enabled")]
    PlaceholderApiKey,
}

pub fn validate_config(config: &BridgeConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidBindAddress(
            config.listener.bind_address.clone(),
        ));
    }

    let timeouts = &config.timeouts;
    if timeouts.round_trip_secs == 0 {
        errors.push(ValidationError::ZeroRoundTrip);
    }
    if timeouts.request_secs <= timeouts.round_trip_secs {
        errors.push(ValidationError::RequestTimeoutTooShort {
            request: timeouts.request_secs,
            round_trip: timeouts.round_trip_secs,
        });
    }

    // The broadcaster keeps its timer running while disabled.
    if config.liveness.interval_secs == 0 {
        errors.push(ValidationError::ZeroLivenessInterval);
    }
    if config.liveness.enabled && config.liveness.message.is_empty() {
        errors.push(ValidationError::EmptyLivenessMessage);
    }

    if config.security.max_body_size == 0 {
        errors.push(ValidationError::ZeroBodyLimit);
    }

    let observability = &config.observability;
    if observability.metrics_enabled && observability.metrics_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidMetricsAddress(
            observability.metrics_address.clone(),
        ));
    }

    if config.admin.enabled && config.admin.api_key == PLACEHOLDER_API_KEY {
        errors.push(ValidationError::PlaceholderApiKey);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
