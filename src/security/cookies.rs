// ABOUTME: Session cookie construction and credential extraction over http::HeaderMap
// ABOUTME: Cookie first, bearer header second; absence is a value, never an error
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

use http::header::{
    HeaderName, ACCESS_CONTROL_ALLOW_CREDENTIALS, ACCESS_CONTROL_EXPOSE_HEADERS, AUTHORIZATION,
    COOKIE, SET_COOKIE,
};
use http::{HeaderMap, HeaderValue};

use crate::constants::session::{AUTH_COOKIE_NAME, BEARER_PREFIX};
use crate::errors::{AppError, AppResult};

/// `Set-Cookie` value carrying the credential
///
/// `SameSite=None` lets the cross-origin front-end send the cookie back;
/// browsers only honour that together with `Secure`, which production sets.
#[must_use]
pub fn session_cookie(token: &str, max_age_secs: i64, secure: bool) -> String {
    let mut cookie = format!(
        "{AUTH_COOKIE_NAME}={token}; HttpOnly; Path=/; SameSite=None; Max-Age={}",
        max_age_secs.max(0)
    );
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

fn append(headers: &mut HeaderMap, name: HeaderName, value: &str) -> AppResult<()> {
    let value = HeaderValue::from_str(value)
        .map_err(|e| AppError::internal(format!("Invalid {name} header value: {e}")))?;
    headers.append(name, value);
    Ok(())
}

fn expose_to_cross_origin(headers: &mut HeaderMap) {
    headers.insert(
        ACCESS_CONTROL_ALLOW_CREDENTIALS,
        HeaderValue::from_static("true"),
    );
    headers.insert(
        ACCESS_CONTROL_EXPOSE_HEADERS,
        HeaderValue::from_static("Set-Cookie"),
    );
}

/// Append the session cookie and the cross-origin credential headers
///
/// # Errors
///
/// Returns an internal error if the token contains bytes invalid in a header
pub fn attach_session_cookie(
    headers: &mut HeaderMap,
    token: &str,
    max_age_secs: i64,
    secure: bool,
) -> AppResult<()> {
    append(headers, SET_COOKIE, &session_cookie(token, max_age_secs, secure))?;
    expose_to_cross_origin(headers);
    Ok(())
}

/// Append an already-expired session cookie so the client drops it
///
/// # Errors
///
/// Returns an internal error if the header cannot be built
pub fn clear_session_cookie(headers: &mut HeaderMap, secure: bool) -> AppResult<()> {
    append(headers, SET_COOKIE, &session_cookie("", 0, secure))?;
    expose_to_cross_origin(headers);
    Ok(())
}

/// Value of cookie `name` across every `Cookie` header
#[must_use]
pub fn extract_cookie<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|raw| raw.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| key.trim() == name)
        .map(|(_, value)| value.trim())
        .filter(|value| !value.is_empty())
}

/// Token from an `Authorization: Bearer` header
#[must_use]
pub fn extract_bearer(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|raw| raw.strip_prefix(BEARER_PREFIX))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Session credential from the request: cookie first, then bearer header
#[must_use]
pub fn extract_credential(headers: &HeaderMap) -> Option<&str> {
    extract_cookie(headers, AUTH_COOKIE_NAME).or_else(|| extract_bearer(headers))
}
