// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Identity token validation.
//!
//! ## Steps
//!
//! 1. Decode header and payload without verifying, to read `kid` and `iss`
//! 2. Reject unless `iss` equals the configured issuer
//! 3. Resolve `kid` through the [`KeyLookup`] capability
//! 4. Verify the signature and issuer with the resolved key
//! 5. Compare `exp` against the injected [`Clock`]
//!
//! Expiry is reported separately from rejection: an expired token sends the
//! user back through login while a rejected one is denied outright.

use std::sync::Arc;

use jsonwebtoken::{decode, Validation};
use serde::Deserialize;
use tracing::{debug, warn};

use super::error::AuthError;
use super::jwks::KeyLookup;

/// Default clock skew tolerance. A token is expired as soon as its `exp`
/// is in the past; callers opt into tolerance with
/// [`TokenValidator::with_leeway`].
pub const CLOCK_SKEW_LEEWAY: u64 = 0;

/// Outcome of validating a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Signature, issuer and expiry all check out
    Accepted,
    /// Correctly signed by the issuer but past its expiry
    Expired,
    /// Anything else
    Rejected,
}

/// Source of the current Unix time.
pub trait Clock: Send + Sync {
    fn now(&self) -> i64;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> i64 {
        chrono::Utc::now().timestamp()
    }
}

/// Clock frozen at a fixed Unix timestamp.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub i64);

impl Clock for FixedClock {
    fn now(&self) -> i64 {
        self.0
    }
}

/// Claims read before the signature is checked.
#[derive(Debug, Deserialize)]
struct UnverifiedClaims {
    #[serde(default)]
    iss: Option<String>,
}

/// Claims read after the signature is checked.
#[derive(Debug, Deserialize)]
struct VerifiedClaims {
    exp: i64,
}

/// Validates identity tokens against one issuer.
#[derive(Clone)]
pub struct TokenValidator {
    issuer: String,
    keys: Arc<dyn KeyLookup>,
    clock: Arc<dyn Clock>,
    leeway: u64,
}

impl TokenValidator {
    pub fn new(issuer: impl Into<String>, keys: Arc<dyn KeyLookup>) -> Self {
        Self {
            issuer: issuer.into(),
            keys,
            clock: Arc::new(SystemClock),
            leeway: CLOCK_SKEW_LEEWAY,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_leeway(mut self, leeway: u64) -> Self {
        self.leeway = leeway;
        self
    }

    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    /// Validate a token. Never fails: every problem maps to a verdict.
    pub async fn validate(&self, token: &str) -> Verdict {
        match self.check(token).await {
            Ok(verdict) => verdict,
            Err(e) => {
                warn!(error_code = e.error_code(), error = %e, "Identity token rejected");
                Verdict::Rejected
            }
        }
    }

    async fn check(&self, token: &str) -> Result<Verdict, AuthError> {
        let unverified = jsonwebtoken::dangerous::insecure_decode::<UnverifiedClaims>(token)
            .map_err(|e| AuthError::TokenRejected(format!("not a valid JWT: {e}")))?;

        // Fail if token is not from the configured issuer
        let issuer = unverified.claims.iss.unwrap_or_default();
        if issuer != self.issuer {
            return Err(AuthError::TokenRejected(format!(
                "unexpected issuer {issuer:?}"
            )));
        }

        let kid = unverified
            .header
            .kid
            .ok_or_else(|| AuthError::TokenRejected("token header has no kid".to_string()))?;

        let signing_key = self
            .keys
            .lookup(&kid)
            .await?
            .ok_or_else(|| AuthError::TokenRejected(format!("no public key for kid {kid:?}")))?;

        // Expiry is checked below against the injected clock.
        let mut validation = Validation::new(signing_key.algorithm);
        validation.set_issuer(&[&self.issuer]);
        validation.validate_aud = false;
        validation.validate_exp = false;

        let verified = decode::<VerifiedClaims>(token, &signing_key.key, &validation)
            .map_err(|e| AuthError::TokenRejected(format!("verification failed: {e}")))?;

        let now = self.clock.now();
        if verified.claims.exp.saturating_add(self.leeway as i64) < now {
            debug!(exp = verified.claims.exp, now, "Identity token expired");
            return Ok(Verdict::Expired);
        }

        Ok(Verdict::Accepted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwks::StaticKeySet;
    use jsonwebtoken::{encode, Algorithm, DecodingKey, EncodingKey, Header};
    use serde::Serialize;

    const ISSUER: &str = "https://issuer.example.com/pool";
    const KID: &str = "hmac-key";
    const SECRET: &[u8] = b"test-signing-secret-that-is-long-enough";
    const NOW: i64 = 1_700_000_000;

    #[derive(Serialize)]
    struct Claims<'a> {
        iss: &'a str,
        sub: &'a str,
        exp: i64,
    }

    fn sign(kid: Option<&str>, secret: &[u8], iss: &str, exp: i64) -> String {
        let mut header = Header::new(Algorithm::HS256);
        header.kid = kid.map(str::to_string);
        let claims = Claims {
            iss,
            sub: "user-1",
            exp,
        };
        encode(&header, &claims, &EncodingKey::from_secret(secret)).unwrap()
    }

    fn validator() -> TokenValidator {
        let keys = StaticKeySet::new().with_key(KID, DecodingKey::from_secret(SECRET), Algorithm::HS256);
        TokenValidator::new(ISSUER, Arc::new(keys)).with_clock(Arc::new(FixedClock(NOW)))
    }

    #[tokio::test]
    async fn valid_token_is_accepted() {
        let token = sign(Some(KID), SECRET, ISSUER, NOW + 3600);
        assert_eq!(validator().validate(&token).await, Verdict::Accepted);
    }

    #[tokio::test]
    async fn past_expiry_is_expired_not_rejected() {
        let token = sign(Some(KID), SECRET, ISSUER, NOW - 3600);
        assert_eq!(validator().validate(&token).await, Verdict::Expired);
    }

    #[tokio::test]
    async fn expired_one_second_ago_is_expired() {
        let token = sign(Some(KID), SECRET, ISSUER, NOW - 1);
        assert_eq!(validator().validate(&token).await, Verdict::Expired);

        let at_expiry = sign(Some(KID), SECRET, ISSUER, NOW);
        assert_eq!(validator().validate(&at_expiry).await, Verdict::Accepted);
    }

    #[tokio::test]
    async fn leeway_is_opt_in() {
        let token = sign(Some(KID), SECRET, ISSUER, NOW - 30);
        assert_eq!(validator().validate(&token).await, Verdict::Expired);

        let tolerant = validator().with_leeway(60);
        assert_eq!(tolerant.validate(&token).await, Verdict::Accepted);
    }

    #[tokio::test]
    async fn wrong_issuer_is_rejected() {
        let token = sign(Some(KID), SECRET, "https://evil.example.com", NOW + 3600);
        assert_eq!(validator().validate(&token).await, Verdict::Rejected);
    }

    #[tokio::test]
    async fn unknown_kid_is_rejected() {
        let token = sign(Some("other-key"), SECRET, ISSUER, NOW + 3600);
        assert_eq!(validator().validate(&token).await, Verdict::Rejected);
    }

    #[tokio::test]
    async fn missing_kid_is_rejected() {
        let token = sign(None, SECRET, ISSUER, NOW + 3600);
        assert_eq!(validator().validate(&token).await, Verdict::Rejected);
    }

    #[tokio::test]
    async fn bad_signature_is_rejected_even_when_expired() {
        let forged = sign(Some(KID), b"some-other-secret-entirely-unrelated", ISSUER, NOW - 3600);
        assert_eq!(validator().validate(&forged).await, Verdict::Rejected);
    }

    #[tokio::test]
    async fn garbage_is_rejected() {
        for token in ["", "abc", "a.b.c", "not.a.jwt.at.all"] {
            assert_eq!(validator().validate(token).await, Verdict::Rejected);
        }
    }

    #[tokio::test]
    async fn same_inputs_give_same_verdict() {
        let v = validator();
        let token = sign(Some(KID), SECRET, ISSUER, NOW - 10_000);
        let first = v.validate(&token).await;
        let second = v.validate(&token).await;
        assert_eq!(first, Verdict::Expired);
        assert_eq!(first, second);
    }
}
