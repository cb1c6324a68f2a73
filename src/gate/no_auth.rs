// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Login flow: no credentials on the request.

use tracing::info;
use url::form_urlencoded;

use super::{CookieName, Gate, Outcome};
use crate::auth::secret::{generate_nonce, generate_pkce, PKCE_METHOD};
use crate::auth::{AuthError, StateToken};

impl Gate {
    /// Redirect to the hosted login page, setting the nonce and PKCE
    /// verifier cookies the callback will need.
    ///
    /// `redirect_uri` is the origin; the callback path is appended.
    /// Random source failures propagate.
    pub(crate) fn handle_no_auth(
        &self,
        redirect_uri: &str,
        requested_uri: &str,
    ) -> Result<Outcome, AuthError> {
        let nonce = generate_nonce(&self.rng)?;
        let pkce = generate_pkce(&self.rng)?;
        let state = StateToken::new(nonce.as_str(), requested_uri).encode();

        let query = form_urlencoded::Serializer::new(String::new())
            .append_pair("client_id", &self.config.client_id)
            .append_pair("scopes", &self.config.scopes)
            .append_pair("redirect_uri", &self.config.callback_uri(redirect_uri))
            .append_pair("response_type", "code")
            .append_pair("state", &state)
            .append_pair("code_challenge_method", PKCE_METHOD)
            .append_pair("code_challenge", &pkce.challenge)
            .finish();

        info!(
            flow = "no_auth",
            redirect_uri,
            requested_uri,
            "Redirecting to login page"
        );

        Ok(Outcome::redirect(
            format!("{}?{query}", self.config.login_url()),
            vec![
                self.cookie(CookieName::Nonce, nonce),
                self.cookie(CookieName::Pkce, pkce.verifier),
            ],
        ))
    }
}
