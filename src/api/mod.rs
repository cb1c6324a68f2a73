// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::path::Path;

use axum::{middleware, routing::get, Router};
use tower::ServiceBuilder;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::auth::middleware::gate_middleware;
use crate::state::AppState;

pub mod health;

/// Health checks plus the gated origin. Everything outside `/health` is
/// served from `origin_dir` once the gate lets it through.
pub fn router(state: AppState, origin_dir: impl AsRef<Path>) -> Router {
    let origin = ServiceBuilder::new()
        .layer(middleware::from_fn_with_state(state.clone(), gate_middleware))
        .service(ServeDir::new(origin_dir.as_ref()));

    Router::new()
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness))
        .fallback_service(origin)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
}
