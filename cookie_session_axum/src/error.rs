use cookie_session::SessionError;
use http::StatusCode;

/// Helper trait for converting errors to a standard response error format
pub trait IntoResponseError<T> {
    fn into_response_error(self) -> Result<T, (StatusCode, String)>;
}

/// Session failures reaching the web layer are server faults: a missing or
/// expired credential never surfaces as an error.
impl<T> IntoResponseError<T> for Result<T, SessionError> {
    fn into_response_error(self) -> Result<T, (StatusCode, String)> {
        self.map_err(|e| {
            tracing::error!("Session error: {}", e);
            let status = match e {
                SessionError::Storage(_)
                | SessionError::Crypto(_)
                | SessionError::Config(_)
                | SessionError::Utils(_) => StatusCode::INTERNAL_SERVER_ERROR,
            };
            (status, "Internal server error".to_string())
        })
    }
}

/// Implementation for http::Error (used by Response::builder())
impl<T> IntoResponseError<T> for http::Result<T> {
    fn into_response_error(self) -> Result<T, (StatusCode, String)> {
        self.map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
    }
}
