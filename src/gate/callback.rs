// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Callback flow: the identity provider sent the browser back with an
//! authorization code.
//!
//! The tokens returned by the exchange are stored in cookies without being
//! validated here. They come straight from the token endpoint over the
//! authenticated channel of this same exchange; the session flow validates
//! them on every later request.

use std::collections::HashMap;

use tracing::{info, warn};

use super::{CallbackParams, CookieName, Gate, Outcome};
use super::{DENY_LOGIN_STATE, DENY_TOKEN_EXCHANGE};
use crate::auth::{AuthError, StateToken};

impl Gate {
    pub(crate) async fn handle_callback(
        &self,
        params: &CallbackParams,
        cookies: &HashMap<String, String>,
        origin: &str,
    ) -> Outcome {
        let state = match StateToken::decode(&params.state)
            .and_then(|state| verify_nonce(&state, cookies).map(|()| state))
            .and_then(|state| same_origin(state, origin))
        {
            Ok(state) => state,
            Err(e) => {
                warn!(flow = "callback", error_code = e.error_code(), error = %e, "Login state rejected");
                return Outcome::deny(DENY_LOGIN_STATE);
            }
        };

        let verifier = cookies
            .get(CookieName::Pkce.as_str())
            .map(String::as_str)
            .unwrap_or_default();

        let tokens = match self.exchanger.exchange(&params.code, origin, verifier).await {
            Ok(tokens) => tokens,
            Err(e) => {
                warn!(flow = "callback", error_code = e.error_code(), error = %e, "Token exchange failed");
                return Outcome::deny(DENY_TOKEN_EXCHANGE);
            }
        };

        info!(
            flow = "callback",
            requested_uri = %state.requested_uri,
            "Login complete, storing tokens in cookies"
        );

        Outcome::redirect(
            state.requested_uri,
            vec![
                self.cookie(CookieName::IdToken, tokens.id_token),
                self.cookie(CookieName::AccessToken, tokens.access_token),
                self.cookie(CookieName::RefreshToken, tokens.refresh_token),
            ],
        )
    }
}

/// The nonce in the state must byte-equal the nonce cookie.
pub(crate) fn verify_nonce(
    state: &StateToken,
    cookies: &HashMap<String, String>,
) -> Result<(), AuthError> {
    if state.nonce.is_empty() {
        return Err(AuthError::NonceMismatch("no nonce in state"));
    }

    let cookie = cookies
        .get(CookieName::Nonce.as_str())
        .filter(|c| !c.is_empty())
        .ok_or(AuthError::NonceMismatch("no nonce cookie"))?;

    if cookie.as_bytes() != state.nonce.as_bytes() {
        return Err(AuthError::NonceMismatch("nonces did not match"));
    }

    Ok(())
}

/// Only send the user back to a page on the origin that started the login.
fn same_origin(state: StateToken, origin: &str) -> Result<StateToken, AuthError> {
    let on_origin = state
        .requested_uri
        .strip_prefix(origin)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with(['/', '?']));

    if on_origin {
        Ok(state)
    } else {
        Err(AuthError::MalformedState(format!(
            "requested URI {:?} is not on origin {origin}",
            state.requested_uri
        )))
    }
}
