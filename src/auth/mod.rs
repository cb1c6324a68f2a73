// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Module
//!
//! Building blocks for the gate: secret generation, the state token, the
//! token exchange, identity token validation and the signing key set.
//!
//! ## Security
//!
//! - Nonces and PKCE verifiers come from the OS random source only
//! - Key sets are fetched over HTTPS and cached with a TTL
//! - Clock skew tolerance is 60 seconds
//! - Client secrets are resolved at exchange time and never logged

pub mod error;
pub mod exchange;
pub mod jwks;
pub mod middleware;
pub mod secret;
pub mod secret_store;
pub mod state_token;
pub mod validator;

pub use error::AuthError;
pub use exchange::{OAuthExchanger, TokenSet};
pub use jwks::{JwksManager, KeyLookup, SigningKey, StaticKeySet};
pub use secret_store::{EnvSecretStore, FileSecretStore, SecretStore};
pub use state_token::StateToken;
pub use validator::{Clock, FixedClock, SystemClock, TokenValidator, Verdict};
