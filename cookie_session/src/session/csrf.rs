use chrono::{DateTime, Utc};
use http::{HeaderMap, Method};

use crate::session::config::AuthConfig;
use crate::session::errors::SessionError;
use crate::session::types::{CsrfSubmission, Session};
use crate::utils::get_param;

/// Header carrying the CSRF token for script clients (`X-CSRF-Token`).
pub const CSRF_HEADER_NAME: &str = "x-csrf-token";

/// Methods that must carry a CSRF proof.
pub fn is_state_changing(method: &Method) -> bool {
    matches!(
        *method,
        Method::POST | Method::PUT | Method::DELETE | Method::PATCH
    )
}

impl CsrfSubmission {
    /// Collect the CSRF proof from a request.
    ///
    /// The query parameter wins over the form field, and the form field over
    /// the `X-CSRF-Token` header. `form_body` is the raw urlencoded body, if
    /// the request had one.
    pub fn from_request(
        config: &AuthConfig,
        query: Option<&str>,
        form_body: Option<&str>,
        headers: &HeaderMap,
    ) -> Self {
        let token = get_param(query, &config.csrf_field_name)
            .or_else(|| get_param(form_body, &config.csrf_field_name))
            .or_else(|| {
                headers
                    .get(CSRF_HEADER_NAME)
                    .and_then(|v| v.to_str().ok())
                    .filter(|v| !v.is_empty())
                    .map(str::to_string)
            });
        let resume_ticket = get_param(query, &config.resume_ticket_param);
        Self {
            token,
            resume_ticket,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.token.is_none() && self.resume_ticket.is_none()
    }
}

impl AuthConfig {
    /// Check a CSRF proof against the caller's access sessions.
    ///
    /// Accepts either a CSRF token bound to a live session of the same user,
    /// or an unredeemed resume ticket minted for that user.
    #[tracing::instrument(skip_all, fields(user_id = %session.user_id()))]
    pub async fn verify_csrf(
        &self,
        session: &Session,
        submission: &CsrfSubmission,
        now: DateTime<Utc>,
    ) -> Result<bool, SessionError> {
        if submission.is_empty() {
            tracing::warn!("Mutating request carried no CSRF token or resume ticket");
            return Ok(false);
        }
        let store = &self.access.store;
        if let Some(token) = submission.token.as_deref() {
            if store
                .verify_csrf_token(session.user_id(), token, now)
                .await?
            {
                return Ok(true);
            }
        }

        if let Some(ticket) = submission.resume_ticket.as_deref() {
            if let Some(bound) = self
                .resume_tickets
                .redeem(ticket, session.user_id(), now)
                .await
            {
                let ok = store
                    .verify_csrf_token(session.user_id(), &bound, now)
                    .await?;
                if ok {
                    tracing::debug!("Accepted resume ticket");
                }
                return Ok(ok);
            }
        }

        tracing::warn!("CSRF verification failed");
        Ok(false)
    }
}
