// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! OAuth `state` parameter codec.
//!
//! The state is URL-safe base64 of the UTF-8 JSON document
//! `{"nonce": ..., "requestedUri": ...}`. It carries the login nonce and the
//! page the user asked for through the identity provider and back.

use base64ct::{Base64UrlUnpadded, Encoding};
use serde::{Deserialize, Serialize};

use super::error::AuthError;

/// Decoded `state` parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateToken {
    /// Nonce mirrored in the nonce cookie
    #[serde(default)]
    pub nonce: String,
    /// Final destination after login
    #[serde(default)]
    pub requested_uri: String,
}

impl StateToken {
    pub fn new(nonce: impl Into<String>, requested_uri: impl Into<String>) -> Self {
        Self {
            nonce: nonce.into(),
            requested_uri: requested_uri.into(),
        }
    }

    /// Serialize to the opaque transport string.
    pub fn encode(&self) -> String {
        // Serializing two strings cannot fail.
        let json = serde_json::to_vec(self).unwrap_or_default();
        Base64UrlUnpadded::encode_string(&json)
    }

    /// Parse a transport string. Padding is tolerated.
    pub fn decode(encoded: &str) -> Result<Self, AuthError> {
        let trimmed = encoded.trim().trim_end_matches('=');
        if trimmed.is_empty() {
            return Err(AuthError::MalformedState("empty state".to_string()));
        }

        let json = Base64UrlUnpadded::decode_vec(trimmed)
            .map_err(|e| AuthError::MalformedState(format!("invalid base64: {e}")))?;

        let token: StateToken = serde_json::from_slice(&json)
            .map_err(|e| AuthError::MalformedState(format!("invalid JSON: {e}")))?;

        if token.nonce.is_empty() || token.requested_uri.is_empty() {
            return Err(AuthError::MalformedState(
                "state did not contain expected values".to_string(),
            ));
        }

        Ok(token)
    }
}
