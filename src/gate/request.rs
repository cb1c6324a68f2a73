// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Per-request view of the inbound request.

use std::collections::HashMap;

use axum::http::header::{HOST, REFERER};
use axum::http::{HeaderMap, Request};
use axum_extra::extract::cookie::CookieJar;

/// Immutable snapshot of the parts of a request the gate looks at.
#[derive(Debug, Clone)]
pub struct RequestContext {
    host: String,
    path: String,
    query: Option<String>,
    headers: HeaderMap,
}

/// `code` and `state` from an identity provider callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallbackParams {
    pub code: String,
    pub state: String,
}

impl RequestContext {
    pub fn new(
        host: impl Into<String>,
        path: impl Into<String>,
        query: Option<String>,
        headers: HeaderMap,
    ) -> Self {
        Self {
            host: host.into(),
            path: path.into(),
            query: query.filter(|q| !q.is_empty()),
            headers,
        }
    }

    /// Snapshot an HTTP request. The host comes from the `Host` header,
    /// falling back to the URI authority.
    pub fn from_request<B>(request: &Request<B>) -> Self {
        let uri = request.uri();
        let host = request
            .headers()
            .get(HOST)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .or_else(|| uri.authority().map(|a| a.to_string()))
            .unwrap_or_default();

        Self::new(
            host,
            uri.path(),
            uri.query().map(str::to_string),
            request.headers().clone(),
        )
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn query(&self) -> Option<&str> {
        self.query.as_deref()
    }

    /// `scheme://host`
    pub fn origin(&self, scheme: &str) -> String {
        format!("{scheme}://{}", self.host)
    }

    /// `scheme://host/path?query`, the page the caller asked for.
    pub fn final_destination(&self, scheme: &str) -> String {
        match &self.query {
            Some(query) => format!("{}{}?{query}", self.origin(scheme), self.path),
            None => format!("{}{}", self.origin(scheme), self.path),
        }
    }

    /// The referer, if it is an absolute URL carrying a non-empty `code`
    /// query parameter.
    pub fn referer_with_code(&self) -> Option<&str> {
        let referer = self.headers.get(REFERER)?.to_str().ok()?;
        let url = url::Url::parse(referer).ok()?;
        let has_code = url
            .query_pairs()
            .any(|(name, value)| name == "code" && !value.is_empty());
        has_code.then_some(referer)
    }

    /// `code` and `state` if both are present and non-empty.
    pub fn callback_params(&self) -> Option<CallbackParams> {
        let query = self.query.as_deref()?;
        let code = first_query_value(query, "code")?;
        let state = first_query_value(query, "state")?;
        Some(CallbackParams { code, state })
    }

    /// All cookies across every `Cookie` header. A later occurrence of a
    /// name wins.
    pub fn cookies(&self) -> HashMap<String, String> {
        CookieJar::from_headers(&self.headers)
            .iter()
            .map(|cookie| {
                let value = cookie.value();
                let value = value
                    .strip_prefix('"')
                    .and_then(|v| v.strip_suffix('"'))
                    .unwrap_or(value);
                (cookie.name().to_string(), value.to_string())
            })
            .collect()
    }
}

fn first_query_value(query: &str, name: &str) -> Option<String> {
    url::form_urlencoded::parse(query.as_bytes())
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.into_owned())
        .filter(|value| !value.is_empty())
}
