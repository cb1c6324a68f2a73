// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Secret resolution for the token exchange.
//!
//! Secrets are read on every call rather than once at startup, so a rotated
//! client secret is picked up by the next exchange.

use std::path::PathBuf;

use async_trait::async_trait;

use super::error::AuthError;

/// Resolves a named secret to its plaintext value.
#[async_trait]
pub trait SecretStore: Send + Sync {
    async fn get(&self, name: &str) -> Result<String, AuthError>;
}

/// Reads secrets from environment variables named after the secret.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvSecretStore;

#[async_trait]
impl SecretStore for EnvSecretStore {
    async fn get(&self, name: &str) -> Result<String, AuthError> {
        match std::env::var(name) {
            Ok(value) if !value.trim().is_empty() => Ok(value),
            _ => Err(AuthError::UpstreamUnavailable(format!(
                "secret {name} is not set"
            ))),
        }
    }
}

/// Reads secrets from files in a directory (one file per secret), the
/// layout used by mounted container secrets.
#[derive(Debug, Clone)]
pub struct FileSecretStore {
    dir: PathBuf,
}

impl FileSecretStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

#[async_trait]
impl SecretStore for FileSecretStore {
    async fn get(&self, name: &str) -> Result<String, AuthError> {
        // Secret names are plain file names, never paths.
        if name.is_empty() || name.contains(['/', '\\']) || name == "." || name == ".." {
            return Err(AuthError::UpstreamUnavailable(format!(
                "invalid secret name {name:?}"
            )));
        }

        let path = self.dir.join(name);
        let value = tokio::fs::read_to_string(&path).await.map_err(|e| {
            AuthError::UpstreamUnavailable(format!("failed to read secret {name}: {e}"))
        })?;

        let value = value.trim_end();
        if value.is_empty() {
            return Err(AuthError::UpstreamUnavailable(format!(
                "secret {name} is empty"
            )));
        }

        Ok(value.to_string())
    }
}
