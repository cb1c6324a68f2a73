// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authorization Code + PKCE exchange against the identity provider's
//! token endpoint.
//!
//! The exchange is never retried: authorization codes are single use, so a
//! failed attempt is reported instead of replayed.

use std::fmt;
use std::sync::Arc;

use serde::Deserialize;
use tracing::{debug, info};

use super::error::AuthError;
use super::secret_store::SecretStore;
use crate::config::GateConfig;

/// Tokens returned by a successful exchange.
#[derive(Clone, PartialEq, Eq)]
pub struct TokenSet {
    pub id_token: String,
    pub access_token: String,
    pub refresh_token: String,
}

impl fmt::Debug for TokenSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenSet")
            .field("id_token", &"[redacted]")
            .field("access_token", &"[redacted]")
            .field("refresh_token", &"[redacted]")
            .finish()
    }
}

/// Token endpoint response body.
#[derive(Debug, Default, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    id_token: Option<String>,
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    refresh_token: Option<String>,
}

/// Client for the token endpoint.
#[derive(Clone)]
pub struct OAuthExchanger {
    token_url: String,
    client_id: String,
    callback_path: String,
    client_secret_param: Option<String>,
    secrets: Arc<dyn SecretStore>,
    http: reqwest::Client,
}

impl OAuthExchanger {
    pub fn new(config: &GateConfig, secrets: Arc<dyn SecretStore>, http: reqwest::Client) -> Self {
        Self {
            token_url: config.token_url(),
            client_id: config.client_id.clone(),
            callback_path: config.callback_path.clone(),
            client_secret_param: config.client_secret_param.clone(),
            secrets,
            http,
        }
    }

    pub fn token_url(&self) -> &str {
        &self.token_url
    }

    /// Exchange an authorization code for tokens.
    ///
    /// `redirect_uri` is the origin the login started from; the callback
    /// path is appended to match the URI registered with the provider.
    pub async fn exchange(
        &self,
        code: &str,
        redirect_uri: &str,
        pkce_verifier: &str,
    ) -> Result<TokenSet, AuthError> {
        if pkce_verifier.is_empty() {
            return Err(AuthError::ExchangeFailure(
                "missing PKCE verifier".to_string(),
            ));
        }

        let callback_uri = format!("{redirect_uri}{}", self.callback_path);
        let form = [
            ("grant_type", "authorization_code"),
            ("client_id", self.client_id.as_str()),
            ("redirect_uri", callback_uri.as_str()),
            ("code", code),
            ("code_verifier", pkce_verifier),
        ];

        let mut request = self.http.post(&self.token_url).form(&form);

        if let Some(param) = &self.client_secret_param {
            let secret = self.secrets.get(param).await.map_err(|e| {
                AuthError::ExchangeFailure(format!("client secret unavailable: {e}"))
            })?;
            request = request.basic_auth(&self.client_id, Some(secret));
        }

        debug!(token_url = %self.token_url, "Exchanging authorization code");

        let response = request
            .send()
            .await
            .map_err(|e| AuthError::ExchangeFailure(format!("token request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AuthError::ExchangeFailure(format!(
                "HTTP {status} from token endpoint"
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| AuthError::ExchangeFailure(format!("failed to read token response: {e}")))?;

        if body.trim().is_empty() {
            return Err(AuthError::ExchangeFailure(
                "empty response from token endpoint".to_string(),
            ));
        }

        let parsed: TokenResponse = serde_json::from_str(&body)
            .map_err(|e| AuthError::ExchangeFailure(format!("invalid token response: {e}")))?;

        let tokens = into_token_set(parsed)?;
        info!("Authorization code exchanged for tokens");
        Ok(tokens)
    }
}

fn into_token_set(response: TokenResponse) -> Result<TokenSet, AuthError> {
    let present = |value: Option<String>| value.filter(|v| !v.is_empty());

    match (
        present(response.id_token),
        present(response.access_token),
        present(response.refresh_token),
    ) {
        (Some(id_token), Some(access_token), Some(refresh_token)) => Ok(TokenSet {
            id_token,
            access_token,
            refresh_token,
        }),
        _ => Err(AuthError::ExchangeFailure(
            "did not receive all expected tokens from token endpoint".to_string(),
        )),
    }
}
