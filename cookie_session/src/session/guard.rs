use chrono::{DateTime, Utc};
use http::HeaderMap;

use crate::session::config::AuthConfig;
use crate::session::csrf::is_state_changing;
use crate::session::errors::SessionError;
use crate::session::types::{CsrfSubmission, GuardOptions, GuardOutcome, RequestInfo, Session};
use crate::utils::{add_param_to_uri, get_param, sanitize_redirect};

impl AuthConfig {
    /// Resolve the caller of `request` against the access tier.
    ///
    /// `existing` is a session already resolved by an earlier guard on the
    /// same request; it is trusted as is. Store failures are returned as
    /// errors and never turn into an anonymous caller.
    #[tracing::instrument(skip_all, fields(method = %request.method, uri = %request.request_uri))]
    pub async fn resolve_request(
        &self,
        request: RequestInfo<'_>,
        existing: Option<&Session>,
        submission: &CsrfSubmission,
        options: GuardOptions,
        now: DateTime<Utc>,
    ) -> Result<GuardOutcome, SessionError> {
        let follow_target = options
            .redirect_authenticated
            .then(|| sanitize_redirect(get_param(request.query, &self.redirect_param).as_deref()))
            .flatten();

        if let Some(session) = existing {
            if let Some(location) = follow_target {
                return Ok(GuardOutcome::RedirectAway {
                    location,
                    headers: HeaderMap::new(),
                });
            }
            return Ok(GuardOutcome::Authenticated {
                session: session.clone(),
                headers: HeaderMap::new(),
            });
        }

        let Some(session) = self.access.verify_token(request.headers, now).await? else {
            if options.allow_unauthenticated {
                tracing::debug!("No valid access session, continuing anonymously");
                return Ok(GuardOutcome::Anonymous);
            }
            let location = add_param_to_uri(
                &self.refresh_path(),
                &self.redirect_param,
                request.request_uri,
            );
            tracing::debug!("No valid access session, redirecting to {}", location);
            return Ok(GuardOutcome::NeedsRefresh { location });
        };

        // CSRF is judged against the session the request arrived with, before
        // anything new is issued.
        if follow_target.is_none()
            && is_state_changing(request.method)
            && !self.verify_csrf(&session, submission, now).await?
        {
            return Ok(GuardOutcome::CsrfRejected);
        }

        let mut headers = HeaderMap::new();
        let session = if self.access.needs_reissue(&session, now) {
            tracing::debug!("Access session near expiry, reissuing");
            self.access
                .issue(session.user_id(), self.access_cookie_path(), now, &mut headers)
                .await
                .inspect_err(|e| tracing::error!("Failed to reissue access session: {}", e))?
        } else {
            session
        };

        if let Some(location) = follow_target {
            return Ok(GuardOutcome::RedirectAway { location, headers });
        }
        Ok(GuardOutcome::Authenticated { session, headers })
    }
}
