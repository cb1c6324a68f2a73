// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;
use std::time::Duration;

use crate::auth::{JwksManager, OAuthExchanger, SecretStore, TokenValidator};
use crate::config::{ConfigError, GateConfig};
use crate::gate::Gate;

#[derive(Clone)]
pub struct AppState {
    pub gate: Arc<Gate>,
    /// Shared with the validator; the readiness check reads it.
    pub jwks: Arc<JwksManager>,
    pub invocation_timeout: Duration,
}

impl AppState {
    /// Wire the gate from configuration. Every outbound call shares one
    /// HTTP client bounded by `http_timeout`.
    pub fn new(config: GateConfig, secrets: Arc<dyn SecretStore>) -> Result<Self, ConfigError> {
        config.validate()?;

        let http = reqwest::Client::builder()
            .timeout(config.http_timeout)
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))?;

        let jwks = Arc::new(
            JwksManager::for_issuer(&config.issuer, http.clone())
                .with_cache_ttl(config.jwks_cache_ttl),
        );
        let validator = TokenValidator::new(config.issuer.clone(), jwks.clone())
            .with_leeway(config.clock_skew_leeway.as_secs());
        let exchanger = OAuthExchanger::new(&config, secrets, http);
        let invocation_timeout = config.invocation_timeout;

        Ok(Self {
            gate: Arc::new(Gate::new(Arc::new(config), validator, exchanger)),
            jwks,
            invocation_timeout,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::EnvSecretStore;

    #[test]
    fn wires_components_from_config() {
        let config = GateConfig::new("client", "https://issuer.example.com/", "https://auth.example.com")
            .with_invocation_timeout(Duration::from_secs(3));
        let state = AppState::new(config, Arc::new(EnvSecretStore)).unwrap();

        assert_eq!(state.invocation_timeout, Duration::from_secs(3));
        assert_eq!(
            state.jwks.jwks_url(),
            "https://issuer.example.com/.well-known/jwks.json"
        );
        assert_eq!(state.gate.config().client_id, "client");
    }

    #[test]
    fn rejects_invalid_config() {
        let config = GateConfig::new("", "https://issuer.example.com", "https://auth.example.com");
        assert!(AppState::new(config, Arc::new(EnvSecretStore)).is_err());
    }
}
