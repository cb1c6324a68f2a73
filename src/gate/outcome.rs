// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! The three things the gate can do with a request.

use axum::http::header::{CONTENT_TYPE, LOCATION, SET_COOKIE};
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum_extra::extract::cookie::Cookie;
use tracing::error;

/// Cookies the gate reads and writes. No other cookie is ever set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CookieName {
    IdToken,
    AccessToken,
    RefreshToken,
    Nonce,
    Pkce,
}

impl CookieName {
    pub const ALL: [CookieName; 5] = [
        CookieName::IdToken,
        CookieName::AccessToken,
        CookieName::RefreshToken,
        CookieName::Nonce,
        CookieName::Pkce,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            CookieName::IdToken => "gate_id_token",
            CookieName::AccessToken => "gate_access_token",
            CookieName::RefreshToken => "gate_refresh_token",
            CookieName::Nonce => "gate_nonce",
            CookieName::Pkce => "gate_pkce",
        }
    }

    /// Only the nonce is hidden from scripts.
    pub fn http_only(self) -> bool {
        matches!(self, CookieName::Nonce)
    }
}

/// A `Set-Cookie` to emit with a redirect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetCookie {
    pub name: CookieName,
    pub value: String,
    pub max_age: u64,
}

impl SetCookie {
    pub fn new(name: CookieName, value: impl Into<String>, max_age: u64) -> Self {
        Self {
            name,
            value: value.into(),
            max_age,
        }
    }

    pub fn to_cookie(&self) -> Cookie<'static> {
        Cookie::build((self.name.as_str(), self.value.clone()))
            .path("/")
            .max_age(time::Duration::seconds(
                i64::try_from(self.max_age).unwrap_or(i64::MAX),
            ))
            .secure(true)
            .http_only(self.name.http_only())
            .build()
    }

    pub fn header_value(&self) -> String {
        self.to_cookie().to_string()
    }
}

/// 302 to `location`, setting `cookies`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirect {
    pub location: String,
    pub cookies: Vec<SetCookie>,
}

impl Redirect {
    pub fn new(location: impl Into<String>, cookies: Vec<SetCookie>) -> Self {
        Self {
            location: location.into(),
            cookies,
        }
    }

    pub fn cookie(&self, name: CookieName) -> Option<&str> {
        self.cookies
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.value.as_str())
    }
}

/// 401 with the deny page. Messages are fixed text owned by the gate,
/// never request data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deny {
    pub message: &'static str,
}

impl Deny {
    pub fn new(message: &'static str) -> Self {
        Self { message }
    }

    pub fn body(&self) -> String {
        format!(
            "<!DOCTYPE html>\n<html>\n<head><title>Unauthorized</title></head>\n<body>\n<h1>401 Unauthorized</h1>\n<p>{}</p>\n</body>\n</html>\n",
            self.message
        )
    }
}

/// Result of running the gate on one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Forward the original request to the origin untouched
    PassThrough,
    Redirect(Redirect),
    Deny(Deny),
}

impl Outcome {
    pub fn redirect(location: impl Into<String>, cookies: Vec<SetCookie>) -> Self {
        Outcome::Redirect(Redirect::new(location, cookies))
    }

    pub fn deny(message: &'static str) -> Self {
        Outcome::Deny(Deny::new(message))
    }
}

impl IntoResponse for Redirect {
    fn into_response(self) -> Response {
        let mut response = StatusCode::FOUND.into_response();
        let headers = response.headers_mut();

        match HeaderValue::from_str(&self.location) {
            Ok(location) => {
                headers.insert(LOCATION, location);
            }
            Err(_) => {
                error!("Redirect location is not a valid header value");
                return StatusCode::INTERNAL_SERVER_ERROR.into_response();
            }
        }

        for cookie in &self.cookies {
            match HeaderValue::from_str(&cookie.header_value()) {
                Ok(value) => {
                    headers.append(SET_COOKIE, value);
                }
                Err(_) => {
                    error!(cookie = cookie.name.as_str(), "Cookie value is not a valid header value");
                    return StatusCode::INTERNAL_SERVER_ERROR.into_response();
                }
            }
        }

        response
    }
}

impl IntoResponse for Deny {
    fn into_response(self) -> Response {
        (
            StatusCode::UNAUTHORIZED,
            [(CONTENT_TYPE, "text/html")],
            self.body(),
        )
            .into_response()
    }
}
