// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Gate
//!
//! Decides, for every inbound request, whether it may reach the origin.
//!
//! ## Decision Order
//!
//! First match wins:
//!
//! 1. Referer carries an authorization `code` → deny. The code belongs to
//!    the original callback request, which is the only one allowed to
//!    redeem it.
//! 2. Query carries `code` and `state` → callback flow.
//! 3. Non-empty identity token cookie → session flow.
//! 4. Otherwise → login flow.
//!
//! Each flow turns its own failures into an [`Outcome`]. The only error
//! leaving [`Gate::decide`] is a random source failure.

mod callback;
mod no_auth;
mod outcome;
mod request;
mod session;

use std::sync::Arc;

use ring::rand::SystemRandom;
use tracing::{info, warn};

use crate::auth::{AuthError, OAuthExchanger, TokenValidator};
use crate::config::GateConfig;

pub use outcome::{CookieName, Deny, Outcome, Redirect, SetCookie};
pub use request::{CallbackParams, RequestContext};

/// Deny page text. Detailed causes only go to the logs.
pub(crate) const DENY_REFERER_CODE: &str = "This authorization code has already been used.";
pub(crate) const DENY_LOGIN_STATE: &str = "Failed to validate login state.";
pub(crate) const DENY_TOKEN_EXCHANGE: &str = "Failed to complete login.";
pub(crate) const DENY_INVALID_TOKEN: &str = "Failed to validate credentials.";

/// The authentication decision engine.
pub struct Gate {
    config: Arc<GateConfig>,
    rng: SystemRandom,
    validator: TokenValidator,
    exchanger: OAuthExchanger,
}

impl Gate {
    pub fn new(config: Arc<GateConfig>, validator: TokenValidator, exchanger: OAuthExchanger) -> Self {
        Self {
            config,
            rng: SystemRandom::new(),
            validator,
            exchanger,
        }
    }

    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    /// Classify a request and run exactly one flow for it.
    pub async fn decide(&self, request: &RequestContext) -> Result<Outcome, AuthError> {
        if let Some(referer) = request.referer_with_code() {
            warn!(
                flow = "referer",
                referer, "Referer carries an authorization code, refusing to redeem it here"
            );
            return Ok(Outcome::deny(DENY_REFERER_CODE));
        }

        let scheme = self.config.origin_scheme.as_str();
        let origin = request.origin(scheme);
        let final_destination = request.final_destination(scheme);
        let cookies = request.cookies();

        if let Some(params) = request.callback_params() {
            return Ok(self.handle_callback(&params, &cookies, &origin).await);
        }

        if let Some(id_token) = cookies
            .get(CookieName::IdToken.as_str())
            .filter(|token| !token.is_empty())
        {
            return self.handle_session(id_token, &origin, &final_destination).await;
        }

        info!(flow = "no_auth", requested_uri = %final_destination, "No credentials present");
        self.handle_no_auth(&origin, &final_destination)
    }

    fn cookie(&self, name: CookieName, value: impl Into<String>) -> SetCookie {
        SetCookie::new(name, value, self.config.cookie_max_age.as_secs())
    }
}
