// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Gate middleware for Axum.
//!
//! Runs [`Gate::decide`](crate::gate::Gate::decide) for every request that
//! reaches the origin service.
//!
//! ## Usage
//!
//! ```rust,ignore
//! let origin = ServiceBuilder::new()
//!     .layer(axum::middleware::from_fn_with_state(state, gate_middleware))
//!     .service(ServeDir::new("public"));
//! ```

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::{error, warn};

use crate::gate::{Outcome, RequestContext};
use crate::state::AppState;

/// Gate one request.
///
/// The decision runs under the invocation timeout. When it expires nothing
/// is emitted but a bare 504: no cookies and no partial outcome.
pub async fn gate_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let context = RequestContext::from_request(&request);

    let decision = tokio::time::timeout(state.invocation_timeout, state.gate.decide(&context)).await;

    match decision {
        Ok(Ok(Outcome::PassThrough)) => next.run(request).await,
        Ok(Ok(Outcome::Redirect(redirect))) => redirect.into_response(),
        Ok(Ok(Outcome::Deny(deny))) => deny.into_response(),
        Ok(Err(e)) => {
            error!(error_code = e.error_code(), error = %e, "Gate failed to produce an outcome");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
        Err(_) => {
            warn!(
                timeout_ms = state.invocation_timeout.as_millis() as u64,
                path = context.path(),
                "Gate decision timed out"
            );
            StatusCode::GATEWAY_TIMEOUT.into_response()
        }
    }
}
