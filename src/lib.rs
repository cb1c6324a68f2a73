// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Edge Auth Gate - OAuth2 login gate for static sites
//!
//! This crate sits in front of a static origin and lets a request through
//! only when it carries a valid identity token cookie. Everyone else is sent
//! through the identity provider's hosted login page using the
//! Authorization Code flow with PKCE.
//!
//! ## Modules
//!
//! - `gate` - Per-request decision engine and its three flows
//! - `auth` - Secrets, state token, token exchange, token validation
//! - `api` - HTTP router (Axum): health checks and the gated origin
//! - `config` - Gate and server configuration

pub mod api;
pub mod auth;
pub mod config;
pub mod gate;
pub mod state;
