// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Nonce and PKCE verifier generation.
//!
//! Both secrets are drawn from the RFC 3986 unreserved alphabet using the
//! system CSPRNG. Raw bytes that would bias the alphabet are rejected and
//! redrawn instead of being reduced modulo the alphabet length.

use base64ct::{Base64UrlUnpadded, Encoding};
use ring::rand::SecureRandom;
use sha2::{Digest, Sha256};

use super::error::AuthError;

/// Characters allowed in nonces and PKCE verifiers.
pub const SECRET_ALPHABET: &[u8] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-._~";

/// Nonce length in characters.
pub const NONCE_LENGTH: usize = 64;

/// PKCE verifier length in characters (RFC 7636 maximum).
pub const PKCE_VERIFIER_LENGTH: usize = 128;

/// PKCE challenge method sent to the identity provider.
pub const PKCE_METHOD: &str = "S256";

/// A PKCE verifier and its S256 challenge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PkcePair {
    /// Secret verifier, kept in a cookie until the code exchange.
    pub verifier: String,
    /// `base64url(SHA-256(verifier))`, sent with the login redirect.
    pub challenge: String,
}

impl PkcePair {
    /// Build the pair for an existing verifier.
    pub fn from_verifier(verifier: impl Into<String>) -> Self {
        let verifier = verifier.into();
        let challenge = pkce_challenge(&verifier);
        Self {
            verifier,
            challenge,
        }
    }
}

/// Generate a 64 character nonce.
pub fn generate_nonce(rng: &dyn SecureRandom) -> Result<String, AuthError> {
    random_secret(rng, NONCE_LENGTH)
}

/// Generate a 128 character PKCE verifier and its challenge.
pub fn generate_pkce(rng: &dyn SecureRandom) -> Result<PkcePair, AuthError> {
    let verifier = random_secret(rng, PKCE_VERIFIER_LENGTH)?;
    Ok(PkcePair::from_verifier(verifier))
}

/// S256 transform: URL-safe base64 (no padding) of the SHA-256 digest.
pub fn pkce_challenge(verifier: &str) -> String {
    let digest = Sha256::digest(verifier.as_bytes());
    Base64UrlUnpadded::encode_string(&digest)
}

fn random_secret(rng: &dyn SecureRandom, length: usize) -> Result<String, AuthError> {
    let alphabet_len = SECRET_ALPHABET.len();
    // Largest multiple of the alphabet length that fits in a byte.
    let limit = (256 / alphabet_len) * alphabet_len;

    let mut secret = String::with_capacity(length);
    let mut buf = [0u8; 64];

    while secret.len() < length {
        rng.fill(&mut buf)?;
        for byte in buf.iter().map(|b| usize::from(*b)) {
            if byte >= limit {
                continue;
            }
            secret.push(char::from(SECRET_ALPHABET[byte % alphabet_len]));
            if secret.len() == length {
                break;
            }
        }
    }

    Ok(secret)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ring::rand::SystemRandom;

    fn in_alphabet(s: &str) -> bool {
        s.bytes().all(|b| SECRET_ALPHABET.contains(&b))
    }

    #[test]
    fn nonce_has_expected_length_and_alphabet() {
        let rng = SystemRandom::new();
        let nonce = generate_nonce(&rng).unwrap();
        assert_eq!(nonce.len(), NONCE_LENGTH);
        assert!(in_alphabet(&nonce));
    }

    #[test]
    fn successive_nonces_differ() {
        let rng = SystemRandom::new();
        let first = generate_nonce(&rng).unwrap();
        let second = generate_nonce(&rng).unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn pkce_verifier_has_expected_length_and_alphabet() {
        let rng = SystemRandom::new();
        let pair = generate_pkce(&rng).unwrap();
        assert_eq!(pair.verifier.len(), PKCE_VERIFIER_LENGTH);
        assert!(in_alphabet(&pair.verifier));
    }

    #[test]
    fn pkce_challenge_is_derived_from_verifier() {
        let rng = SystemRandom::new();
        let pair = generate_pkce(&rng).unwrap();
        assert_eq!(pair.challenge, pkce_challenge(&pair.verifier));
        assert!(!pair.challenge.contains('='));
        assert!(!pair.challenge.contains('+'));
        assert!(!pair.challenge.contains('/'));
    }

    #[test]
    fn pkce_challenge_matches_rfc7636_vector() {
        // RFC 7636 Appendix B
        let challenge = pkce_challenge("dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk");
        assert_eq!(challenge, "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM");
    }

    #[test]
    fn every_alphabet_character_is_reachable() {
        let rng = SystemRandom::new();
        let mut seen = std::collections::HashSet::new();
        for _ in 0..50 {
            seen.extend(generate_pkce(&rng).unwrap().verifier.bytes());
        }
        assert_eq!(seen.len(), SECRET_ALPHABET.len());
    }
}
