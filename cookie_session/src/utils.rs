use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use headers::HeaderMapExt;
use http::header::{HeaderMap, SET_COOKIE};
use ring::rand::SecureRandom;

pub(crate) fn base64url_encode(input: Vec<u8>) -> Result<String, UtilError> {
    Ok(URL_SAFE_NO_PAD.encode(input))
}

/// Generate an opaque, URL-safe random string from `len` bytes of system randomness.
pub fn gen_random_string(len: usize) -> Result<String, UtilError> {
    if len == 0 {
        return Err(UtilError::Crypto(
            "Random string length must be positive".to_string(),
        ));
    }
    let rng = ring::rand::SystemRandom::new();
    let mut bytes = vec![0u8; len];
    rng.fill(&mut bytes)
        .map_err(|_| UtilError::Crypto("Failed to generate random string".to_string()))?;
    let encoded = base64url_encode(bytes)
        .map_err(|_| UtilError::Crypto("Failed to encode random string".to_string()))?;
    Ok(encoded)
}

pub(crate) fn header_set_cookie(
    headers: &mut HeaderMap,
    name: &str,
    value: &str,
    path: &str,
    max_age: i64,
) -> Result<(), UtilError> {
    let cookie =
        format!("{name}={value}; SameSite=Lax; Secure; HttpOnly; Path={path}; Max-Age={max_age}");
    headers.append(
        SET_COOKIE,
        cookie
            .parse()
            .map_err(|_| UtilError::Cookie("Failed to parse cookie".to_string()))?,
    );
    Ok(())
}

pub(crate) fn header_delete_cookie(
    headers: &mut HeaderMap,
    name: &str,
    path: &str,
) -> Result<(), UtilError> {
    header_set_cookie(headers, name, "", path, 0)
}

/// Read a cookie value from the request headers.
///
/// Values that are empty or not made of base64url characters are reported as
/// absent: every token this crate issues is base64url, so anything else is a
/// malformed cookie rather than a credential.
pub(crate) fn get_cookie_from_headers(headers: &HeaderMap, name: &str) -> Option<String> {
    let Some(cookies) = headers.typed_get::<headers::Cookie>() else {
        tracing::debug!("No cookie header found");
        return None;
    };

    let value = cookies.get(name)?;
    if !is_base64url(value) {
        tracing::debug!("Malformed cookie '{}' ignored", name);
        return None;
    }
    Some(value.to_string())
}

pub(crate) fn is_base64url(value: &str) -> bool {
    !value.is_empty()
        && value
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}

/// Look up a parameter in a raw (undecoded) query or form-urlencoded string.
pub fn get_param(raw: Option<&str>, name: &str) -> Option<String> {
    let raw = raw?;
    url::form_urlencoded::parse(raw.as_bytes())
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.into_owned())
        .filter(|value| !value.is_empty())
}

/// Append `key=value` to a local URI, keeping its existing query.
pub(crate) fn add_param_to_uri(uri: &str, key: &str, value: &str) -> String {
    let (path, fragment) = match uri.split_once('#') {
        Some((path, fragment)) => (path, Some(fragment)),
        None => (uri, None),
    };
    let separator = if path.contains('?') {
        if path.ends_with('?') || path.ends_with('&') {
            ""
        } else {
            "&"
        }
    } else {
        "?"
    };
    let mut out = format!(
        "{path}{separator}{}={}",
        urlencoding::encode(key),
        urlencoding::encode(value)
    );
    if let Some(fragment) = fragment {
        out.push('#');
        out.push_str(fragment);
    }
    out
}

/// Accept only local absolute paths as redirect targets.
pub(crate) fn sanitize_redirect(target: Option<&str>) -> Option<String> {
    let target = target?.trim();
    if !target.starts_with('/') || target.starts_with("//") || target.contains('\\') {
        tracing::debug!("Rejected non-local redirect target: {}", target);
        return None;
    }
    if target.chars().any(|c| c.is_control()) {
        return None;
    }
    Some(target.to_string())
}

use thiserror::Error;

#[derive(Debug, Error, Clone)]
pub enum UtilError {
    #[error("Crypto error: {0}")]
    Crypto(String),

    #[error("Cookie error: {0}")]
    Cookie(String),
}
