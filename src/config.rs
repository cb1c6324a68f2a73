// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Configuration is loaded once at startup and passed explicitly to every
//! component. Nothing below `main` reads the environment, with the single
//! exception of secret resolution.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `GATE_CONFIG_FILE` | JSON user pool config (replaces the `GATE_*` identity variables) | unset |
//! | `GATE_CLIENT_ID` | OAuth client id | Required |
//! | `GATE_ISSUER` | Expected token issuer; JWKS is fetched from it | Required |
//! | `GATE_AUTH_DOMAIN` | Identity provider base URL (login and token endpoints) | Required |
//! | `GATE_SCOPES` | Scopes requested at login | `openid` |
//! | `GATE_CALLBACK_PATH` | Path appended to the origin to form `redirect_uri` | `/handleCode.html` |
//! | `GATE_CLIENT_SECRET_PARAM` | Secret name for HTTP Basic client auth | unset (public client) |
//! | `GATE_ORIGIN_SCHEME` | Scheme of the protected site | `https` |
//! | `GATE_COOKIE_MAX_AGE_SECS` | `Max-Age` of every cookie set | `604800` |
//! | `GATE_HTTP_TIMEOUT_SECS` | Timeout for JWKS and token requests | `10` |
//! | `GATE_INVOCATION_TIMEOUT_SECS` | Budget for one gated request | `5` |
//! | `GATE_JWKS_CACHE_TTL_SECS` | JWKS cache TTL, `0` disables | `300` |
//! | `GATE_CLOCK_SKEW_LEEWAY_SECS` | Tolerance applied to token expiry | `0` |
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `ORIGIN_DIR` | Static content served behind the gate | `./public` |
//! | `TLS_CERT_PATH` / `TLS_KEY_PATH` | PEM certificate chain and key | unset (plain HTTP) |
//! | `SECRETS_DIR` | Directory of secret files | unset (secrets from env) |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;

pub const CONFIG_FILE_ENV: &str = "GATE_CONFIG_FILE";
pub const CLIENT_ID_ENV: &str = "GATE_CLIENT_ID";
pub const ISSUER_ENV: &str = "GATE_ISSUER";
pub const AUTH_DOMAIN_ENV: &str = "GATE_AUTH_DOMAIN";
pub const SCOPES_ENV: &str = "GATE_SCOPES";
pub const CALLBACK_PATH_ENV: &str = "GATE_CALLBACK_PATH";
pub const CLIENT_SECRET_PARAM_ENV: &str = "GATE_CLIENT_SECRET_PARAM";
pub const ORIGIN_SCHEME_ENV: &str = "GATE_ORIGIN_SCHEME";
pub const COOKIE_MAX_AGE_ENV: &str = "GATE_COOKIE_MAX_AGE_SECS";
pub const HTTP_TIMEOUT_ENV: &str = "GATE_HTTP_TIMEOUT_SECS";
pub const INVOCATION_TIMEOUT_ENV: &str = "GATE_INVOCATION_TIMEOUT_SECS";
pub const JWKS_CACHE_TTL_ENV: &str = "GATE_JWKS_CACHE_TTL_SECS";
pub const CLOCK_SKEW_LEEWAY_ENV: &str = "GATE_CLOCK_SKEW_LEEWAY_SECS";

pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";
pub const ORIGIN_DIR_ENV: &str = "ORIGIN_DIR";
pub const TLS_CERT_PATH_ENV: &str = "TLS_CERT_PATH";
pub const TLS_KEY_PATH_ENV: &str = "TLS_KEY_PATH";
pub const SECRETS_DIR_ENV: &str = "SECRETS_DIR";
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

pub const DEFAULT_SCOPES: &str = "openid";
pub const DEFAULT_CALLBACK_PATH: &str = "/handleCode.html";
pub const DEFAULT_ORIGIN_SCHEME: &str = "https";
/// One week.
pub const DEFAULT_COOKIE_MAX_AGE: Duration = Duration::from_secs(604_800);
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_INVOCATION_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_JWKS_CACHE_TTL: Duration = Duration::from_secs(300);
/// No tolerance: a token is expired once `exp` is in the past.
pub const DEFAULT_CLOCK_SKEW_LEEWAY: Duration = Duration::ZERO;

/// Configuration errors surfaced at startup.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required configuration: {0}")]
    Missing(&'static str),

    #[error("invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },

    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("failed to build HTTP client: {0}")]
    HttpClient(String),
}

/// Identity provider and cookie settings for the gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateConfig {
    /// OAuth client id registered with the identity provider
    pub client_id: String,
    /// Space separated scopes requested at login
    pub scopes: String,
    /// Expected `iss` claim; JWKS lives under it
    pub issuer: String,
    /// Base URL of the hosted login and token endpoints
    pub auth_domain: String,
    /// Appended to the origin to form the registered `redirect_uri`
    pub callback_path: String,
    /// When set, the token exchange authenticates with this secret
    pub client_secret_param: Option<String>,
    /// Scheme of the protected site
    pub origin_scheme: String,
    pub cookie_max_age: Duration,
    pub http_timeout: Duration,
    pub invocation_timeout: Duration,
    pub jwks_cache_ttl: Duration,
    /// Tolerance applied to `exp`; zero unless configured
    pub clock_skew_leeway: Duration,
}

/// User pool deployment file.
#[derive(Debug, Deserialize)]
struct UserPoolFile {
    userpool_id: String,
    userpool_region: String,
    ui_subdomain: String,
    client_id: String,
    #[serde(default)]
    client_secret_param_name: Option<String>,
    #[serde(default)]
    scopes: Option<String>,
}

impl GateConfig {
    /// Create a config with defaults for everything but the identity
    /// provider coordinates.
    pub fn new(
        client_id: impl Into<String>,
        issuer: impl Into<String>,
        auth_domain: impl Into<String>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            scopes: DEFAULT_SCOPES.to_string(),
            issuer: trim_base_url(issuer.into()),
            auth_domain: trim_base_url(auth_domain.into()),
            callback_path: DEFAULT_CALLBACK_PATH.to_string(),
            client_secret_param: None,
            origin_scheme: DEFAULT_ORIGIN_SCHEME.to_string(),
            cookie_max_age: DEFAULT_COOKIE_MAX_AGE,
            http_timeout: DEFAULT_HTTP_TIMEOUT,
            invocation_timeout: DEFAULT_INVOCATION_TIMEOUT,
            jwks_cache_ttl: DEFAULT_JWKS_CACHE_TTL,
            clock_skew_leeway: DEFAULT_CLOCK_SKEW_LEEWAY,
        }
    }

    /// Config for a Cognito user pool with a hosted UI subdomain.
    pub fn for_user_pool(
        pool_id: &str,
        region: &str,
        ui_subdomain: &str,
        client_id: impl Into<String>,
    ) -> Self {
        Self::new(
            client_id,
            format!("https://cognito-idp.{region}.amazonaws.com/{pool_id}"),
            format!("https://{ui_subdomain}.auth.{region}.amazoncognito.com"),
        )
    }

    pub fn with_scopes(mut self, scopes: impl Into<String>) -> Self {
        self.scopes = scopes.into();
        self
    }

    pub fn with_callback_path(mut self, path: impl Into<String>) -> Self {
        self.callback_path = path.into();
        self
    }

    pub fn with_client_secret_param(mut self, name: impl Into<String>) -> Self {
        self.client_secret_param = Some(name.into());
        self
    }

    pub fn with_origin_scheme(mut self, scheme: impl Into<String>) -> Self {
        self.origin_scheme = scheme.into();
        self
    }

    pub fn with_jwks_cache_ttl(mut self, ttl: Duration) -> Self {
        self.jwks_cache_ttl = ttl;
        self
    }

    pub fn with_clock_skew_leeway(mut self, leeway: Duration) -> Self {
        self.clock_skew_leeway = leeway;
        self
    }

    pub fn with_invocation_timeout(mut self, timeout: Duration) -> Self {
        self.invocation_timeout = timeout;
        self
    }

    /// Load from `GATE_CONFIG_FILE` when set, otherwise from `GATE_*`
    /// variables. Tuning variables apply in both cases.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = match env_optional(CONFIG_FILE_ENV) {
            Some(path) => Self::from_file(path)?,
            None => {
                let mut config = Self::new(
                    env_required(CLIENT_ID_ENV)?,
                    env_required(ISSUER_ENV)?,
                    env_required(AUTH_DOMAIN_ENV)?,
                );
                if let Some(scopes) = env_optional(SCOPES_ENV) {
                    config.scopes = scopes;
                }
                config.client_secret_param = env_optional(CLIENT_SECRET_PARAM_ENV);
                config
            }
        };

        if let Some(path) = env_optional(CALLBACK_PATH_ENV) {
            config.callback_path = path;
        }
        if let Some(scheme) = env_optional(ORIGIN_SCHEME_ENV) {
            config.origin_scheme = scheme;
        }
        if let Some(secs) = env_parsed::<u64>(COOKIE_MAX_AGE_ENV)? {
            config.cookie_max_age = Duration::from_secs(secs);
        }
        if let Some(secs) = env_parsed::<u64>(HTTP_TIMEOUT_ENV)? {
            config.http_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = env_parsed::<u64>(INVOCATION_TIMEOUT_ENV)? {
            config.invocation_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = env_parsed::<u64>(JWKS_CACHE_TTL_ENV)? {
            config.jwks_cache_ttl = Duration::from_secs(secs);
        }
        if let Some(secs) = env_parsed::<u64>(CLOCK_SKEW_LEEWAY_ENV)? {
            config.clock_skew_leeway = Duration::from_secs(secs);
        }

        config.validate()?;
        Ok(config)
    }

    /// Load a user pool deployment file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let file: UserPoolFile =
            serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;

        let mut config = Self::for_user_pool(
            &file.userpool_id,
            &file.userpool_region,
            &file.ui_subdomain,
            file.client_id,
        );
        if let Some(scopes) = file.scopes {
            config.scopes = scopes;
        }
        config.client_secret_param = file.client_secret_param_name.filter(|s| !s.is_empty());
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the gate cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.client_id.trim().is_empty() {
            return Err(ConfigError::Missing("client_id"));
        }
        for (name, value) in [("issuer", &self.issuer), ("auth_domain", &self.auth_domain)] {
            let url = url::Url::parse(value).map_err(|e| ConfigError::Invalid {
                name,
                reason: e.to_string(),
            })?;
            if !matches!(url.scheme(), "http" | "https") {
                return Err(ConfigError::Invalid {
                    name,
                    reason: format!("unsupported scheme {}", url.scheme()),
                });
            }
        }
        if !self.callback_path.starts_with('/') {
            return Err(ConfigError::Invalid {
                name: "callback_path",
                reason: "must start with '/'".to_string(),
            });
        }
        if self.invocation_timeout.is_zero() {
            return Err(ConfigError::Invalid {
                name: "invocation_timeout",
                reason: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }

    /// Hosted login page.
    pub fn login_url(&self) -> String {
        format!("{}/login", self.auth_domain)
    }

    /// Token endpoint.
    pub fn token_url(&self) -> String {
        format!("{}/oauth2/token", self.auth_domain)
    }

    /// `redirect_uri` registered for an origin.
    pub fn callback_uri(&self, origin: &str) -> String {
        format!("{origin}{}", self.callback_path)
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Listener and origin settings for the binary.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub addr: SocketAddr,
    pub origin_dir: PathBuf,
    /// Certificate chain and private key, both PEM
    pub tls: Option<(PathBuf, PathBuf)>,
    pub secrets_dir: Option<PathBuf>,
    pub log_format: LogFormat,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let host = env_optional(HOST_ENV).unwrap_or_else(|| "0.0.0.0".to_string());
        let port = env_parsed::<u16>(PORT_ENV)?.unwrap_or(8080);
        let addr: SocketAddr = format!("{host}:{port}")
            .parse()
            .map_err(|e: std::net::AddrParseError| ConfigError::Invalid {
                name: HOST_ENV,
                reason: e.to_string(),
            })?;

        let tls = match (env_optional(TLS_CERT_PATH_ENV), env_optional(TLS_KEY_PATH_ENV)) {
            (Some(cert), Some(key)) => Some((PathBuf::from(cert), PathBuf::from(key))),
            (None, None) => None,
            (Some(_), None) => return Err(ConfigError::Missing(TLS_KEY_PATH_ENV)),
            (None, Some(_)) => return Err(ConfigError::Missing(TLS_CERT_PATH_ENV)),
        };

        let log_format = match env_optional(LOG_FORMAT_ENV).as_deref() {
            Some("json") => LogFormat::Json,
            _ => LogFormat::Pretty,
        };

        Ok(Self {
            addr,
            origin_dir: env_optional(ORIGIN_DIR_ENV)
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("./public")),
            tls,
            secrets_dir: env_optional(SECRETS_DIR_ENV).map(PathBuf::from),
            log_format,
        })
    }
}

fn trim_base_url(url: String) -> String {
    url.trim().trim_end_matches('/').to_string()
}

fn env_optional(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_required(name: &'static str) -> Result<String, ConfigError> {
    env_optional(name).ok_or(ConfigError::Missing(name))
}

fn env_parsed<T>(name: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    env_optional(name)
        .map(|raw| {
            raw.parse::<T>().map_err(|e| ConfigError::Invalid {
                name,
                reason: e.to_string(),
            })
        })
        .transpose()
}
