//! Configuration for the axum integration

use std::sync::LazyLock;

/// Largest urlencoded body the session guard buffers to find a CSRF field.
/// Default: 65536 bytes
pub static AUTH_FORM_BODY_LIMIT: LazyLock<usize> = LazyLock::new(|| {
    std::env::var("AUTH_FORM_BODY_LIMIT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(64 * 1024)
});
