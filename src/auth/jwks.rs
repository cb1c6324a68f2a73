// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! JWKS (JSON Web Key Set) fetching and caching.
//!
//! ## Behavior
//!
//! - Keys are fetched from `{issuer}/.well-known/jwks.json`
//! - The set is cached with a configurable TTL (zero disables the cache)
//! - A `kid` missing from a cached set triggers one refetch, so rotated keys
//!   are picked up without waiting for the TTL. At most one such refetch
//!   happens per refetch interval, so unknown key ids cannot turn every
//!   request into a call to the issuer
//! - Fetch failures are never treated as an empty key set
//!
//! The cache is an optimization only. A cold cache resolves every lookup
//! exactly like a warm one.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use jsonwebtoken::jwk::{AlgorithmParameters, Jwk, JwkSet, KeyAlgorithm};
use jsonwebtoken::{Algorithm, DecodingKey};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use super::error::AuthError;

/// Default JWKS cache TTL (5 minutes).
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(300);

/// Minimum age of the cached set before an unknown `kid` forces a refetch.
pub const DEFAULT_REFETCH_INTERVAL: Duration = Duration::from_secs(30);

/// A public key able to verify token signatures.
#[derive(Clone)]
pub struct SigningKey {
    pub key: DecodingKey,
    pub algorithm: Algorithm,
}

/// Resolves a key id to the issuer's public signing key.
#[async_trait]
pub trait KeyLookup: Send + Sync {
    /// `Ok(None)` means the key set was fetched but has no such key.
    async fn lookup(&self, kid: &str) -> Result<Option<SigningKey>, AuthError>;
}

/// JWKS cache entry.
struct CacheEntry {
    jwks: JwkSet,
    fetched_at: Instant,
}

/// JWKS manager with caching.
#[derive(Clone)]
pub struct JwksManager {
    /// JWKS URL
    jwks_url: String,
    /// Cache TTL
    cache_ttl: Duration,
    /// Rate limit for refetches on an unknown kid
    refetch_interval: Duration,
    /// Cached JWKS
    cache: Arc<RwLock<Option<CacheEntry>>>,
    /// HTTP client
    client: reqwest::Client,
}

impl JwksManager {
    /// Create a manager for the issuer's well-known JWKS endpoint.
    pub fn for_issuer(issuer: &str, client: reqwest::Client) -> Self {
        Self::new(
            format!("{}/.well-known/jwks.json", issuer.trim_end_matches('/')),
            client,
        )
    }

    /// Create a new JWKS manager for an explicit URL.
    pub fn new(jwks_url: impl Into<String>, client: reqwest::Client) -> Self {
        Self {
            jwks_url: jwks_url.into(),
            cache_ttl: DEFAULT_CACHE_TTL,
            refetch_interval: DEFAULT_REFETCH_INTERVAL,
            cache: Arc::new(RwLock::new(None)),
            client,
        }
    }

    /// Create with custom cache TTL.
    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    /// Create with a custom minimum interval between refetches triggered by
    /// an unknown kid.
    pub fn with_refetch_interval(mut self, interval: Duration) -> Self {
        self.refetch_interval = interval;
        self
    }

    /// Get the JWKS URL.
    pub fn jwks_url(&self) -> &str {
        &self.jwks_url
    }

    /// Cached JWKS and its age, if still fresh.
    async fn cached_jwks(&self) -> Option<(JwkSet, Duration)> {
        let cache = self.cache.read().await;
        cache
            .as_ref()
            .map(|entry| (entry, entry.fetched_at.elapsed()))
            .filter(|(_, age)| *age < self.cache_ttl)
            .map(|(entry, age)| (entry.jwks.clone(), age))
    }

    /// Fetch JWKS from the endpoint and store it in the cache.
    async fn fetch_and_store(&self) -> Result<JwkSet, AuthError> {
        let jwks = self.fetch_jwks().await?;

        if !self.cache_ttl.is_zero() {
            let mut cache = self.cache.write().await;
            *cache = Some(CacheEntry {
                jwks: jwks.clone(),
                fetched_at: Instant::now(),
            });
        }

        Ok(jwks)
    }

    /// Fetch JWKS from the endpoint.
    async fn fetch_jwks(&self) -> Result<JwkSet, AuthError> {
        debug!(url = %self.jwks_url, "Fetching JWKS");

        let response = self
            .client
            .get(&self.jwks_url)
            .send()
            .await
            .map_err(|e| AuthError::UpstreamUnavailable(format!("JWKS request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(AuthError::UpstreamUnavailable(format!(
                "HTTP {} from JWKS endpoint",
                response.status()
            )));
        }

        response
            .json::<JwkSet>()
            .await
            .map_err(|e| AuthError::UpstreamUnavailable(format!("invalid JWKS body: {e}")))
    }

    /// Force refresh the JWKS cache.
    pub async fn refresh(&self) -> Result<(), AuthError> {
        self.fetch_and_store().await.map(|_| ())
    }

    /// Check if JWKS is currently cached and valid.
    pub async fn is_cached(&self) -> bool {
        self.cached_jwks().await.is_some()
    }
}

#[async_trait]
impl KeyLookup for JwksManager {
    async fn lookup(&self, kid: &str) -> Result<Option<SigningKey>, AuthError> {
        if let Some((jwks, age)) = self.cached_jwks().await {
            if let Some(jwk) = find_key(&jwks, kid) {
                return jwk_to_signing_key(jwk).map(Some);
            }
            if age < self.refetch_interval {
                debug!(kid, age_ms = age.as_millis() as u64, "Key id not in recently fetched JWKS");
                return Ok(None);
            }
            debug!(kid, "Key id not in cached JWKS, refetching");
        }

        let jwks = self.fetch_and_store().await?;
        match find_key(&jwks, kid) {
            Some(jwk) => jwk_to_signing_key(jwk).map(Some),
            None => Ok(None),
        }
    }
}

/// Fixed, in-memory key set.
#[derive(Clone, Default)]
pub struct StaticKeySet {
    keys: HashMap<String, SigningKey>,
}

impl StaticKeySet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a key under the given id.
    pub fn with_key(mut self, kid: impl Into<String>, key: DecodingKey, algorithm: Algorithm) -> Self {
        self.keys.insert(kid.into(), SigningKey { key, algorithm });
        self
    }

    /// Build from a parsed JWKS document. Keys without an id or with an
    /// unsupported type are skipped.
    pub fn from_jwks(jwks: &JwkSet) -> Self {
        let keys = jwks
            .keys
            .iter()
            .filter_map(|jwk| {
                let kid = jwk.common.key_id.clone()?;
                match jwk_to_signing_key(jwk) {
                    Ok(key) => Some((kid, key)),
                    Err(e) => {
                        warn!(kid = %kid, error = %e, "Skipping unusable JWK");
                        None
                    }
                }
            })
            .collect();
        Self { keys }
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

#[async_trait]
impl KeyLookup for StaticKeySet {
    async fn lookup(&self, kid: &str) -> Result<Option<SigningKey>, AuthError> {
        Ok(self.keys.get(kid).cloned())
    }
}

fn find_key<'a>(jwks: &'a JwkSet, kid: &str) -> Option<&'a Jwk> {
    jwks.keys
        .iter()
        .find(|k| k.common.key_id.as_deref() == Some(kid))
}

/// Convert a JWK to a signing key.
fn jwk_to_signing_key(jwk: &Jwk) -> Result<SigningKey, AuthError> {
    match &jwk.algorithm {
        AlgorithmParameters::RSA(rsa) => {
            let key = DecodingKey::from_rsa_components(&rsa.n, &rsa.e)
                .map_err(|e| AuthError::TokenRejected(format!("Failed to create RSA key: {e}")))?;

            // Determine algorithm from JWK
            let algorithm = match jwk.common.key_algorithm {
                Some(KeyAlgorithm::RS384) => Algorithm::RS384,
                Some(KeyAlgorithm::RS512) => Algorithm::RS512,
                _ => Algorithm::RS256,
            };

            Ok(SigningKey { key, algorithm })
        }
        AlgorithmParameters::EllipticCurve(ec) => {
            let key = DecodingKey::from_ec_components(&ec.x, &ec.y)
                .map_err(|e| AuthError::TokenRejected(format!("Failed to create EC key: {e}")))?;

            let algorithm = match jwk.common.key_algorithm {
                Some(KeyAlgorithm::ES384) => Algorithm::ES384,
                _ => Algorithm::ES256,
            };

            Ok(SigningKey { key, algorithm })
        }
        _ => Err(AuthError::TokenRejected(
            "Unsupported key type in JWKS".to_string(),
        )),
    }
}
