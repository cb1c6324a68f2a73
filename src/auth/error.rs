// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authentication errors.
//!
//! Every variant is handled at the boundary of the flow that produced it and
//! turned into a gate outcome. The message carried by a variant is for
//! operator logs only; clients see a generic deny page.

/// Authentication error type.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    /// The `state` query parameter could not be decoded or is incomplete
    #[error("Malformed state parameter: {0}")]
    MalformedState(String),

    /// Nonce missing from the state or cookie, or the two differ
    #[error("Nonce validation failed: {0}")]
    NonceMismatch(&'static str),

    /// Authorization code exchange failed
    #[error("Token exchange failed: {0}")]
    ExchangeFailure(String),

    /// Token failed signature, issuer, key id or structure checks
    #[error("Token rejected: {0}")]
    TokenRejected(String),

    /// Key set or secret store could not be reached
    #[error("Upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    /// The system random source failed
    #[error("Random source failure")]
    Entropy,
}

impl AuthError {
    /// Get the error code for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::MalformedState(_) => "malformed_state",
            AuthError::NonceMismatch(_) => "nonce_mismatch",
            AuthError::ExchangeFailure(_) => "exchange_failure",
            AuthError::TokenRejected(_) => "token_rejected",
            AuthError::UpstreamUnavailable(_) => "upstream_unavailable",
            AuthError::Entropy => "entropy",
        }
    }
}

impl From<ring::error::Unspecified> for AuthError {
    fn from(_: ring::error::Unspecified) -> Self {
        AuthError::Entropy
    }
}
