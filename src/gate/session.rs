// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Session flow: the request carries an identity token cookie.

use tracing::{info, warn};

use super::{Gate, Outcome, DENY_INVALID_TOKEN};
use crate::auth::{AuthError, Verdict};

impl Gate {
    /// Accepted tokens pass through, expired ones restart the login and
    /// anything else is denied.
    pub(crate) async fn handle_session(
        &self,
        id_token: &str,
        redirect_uri: &str,
        requested_uri: &str,
    ) -> Result<Outcome, AuthError> {
        match self.validator.validate(id_token).await {
            Verdict::Accepted => {
                info!(flow = "session", "Valid identity token in cookie, passing request on");
                Ok(Outcome::PassThrough)
            }
            Verdict::Expired => {
                info!(flow = "session", requested_uri, "Identity token expired, restarting login");
                self.handle_no_auth(redirect_uri, requested_uri)
            }
            Verdict::Rejected => {
                warn!(flow = "session", "Identity token failed validation");
                Ok(Outcome::deny(DENY_INVALID_TOKEN))
            }
        }
    }
}
