use chrono::{DateTime, Utc};
use http::HeaderMap;

use crate::session::config::AuthConfig;
use crate::session::csrf::is_state_changing;
use crate::session::errors::SessionError;
use crate::session::types::{FlowRedirect, RequestInfo};
use crate::utils::{add_param_to_uri, get_param, sanitize_redirect};

impl AuthConfig {
    /// Redirect target named by the request's redirect parameter, if it is local.
    pub(crate) fn redirect_target(&self, query: Option<&str>, fallback: &str) -> String {
        sanitize_redirect(get_param(query, &self.redirect_param).as_deref())
            .unwrap_or_else(|| fallback.to_string())
    }

    /// Trade a valid refresh cookie for a new access session.
    ///
    /// On success the caller is sent back (307, method preserved) to the
    /// redirect target; a mutating request gets a resume ticket appended so
    /// it can pass the CSRF check once. Without a valid refresh cookie both
    /// cookies are cleared and the caller goes to the unauthorized page.
    #[tracing::instrument(skip_all, fields(method = %request.method))]
    pub async fn refresh_session(
        &self,
        request: RequestInfo<'_>,
        now: DateTime<Utc>,
    ) -> Result<FlowRedirect, SessionError> {
        let target = self.redirect_target(request.query, &self.default_login_success_redirect);
        let refresh_path = self.refresh_path();
        let mut headers = HeaderMap::new();

        let Some(refresh) = self.refresh.verify_token(request.headers, now).await? else {
            tracing::debug!("No valid refresh session, sending to unauthorized redirect");
            self.access.delete_cookie(&mut headers, self.access_cookie_path())?;
            self.refresh.delete_cookie(&mut headers, &refresh_path)?;
            return Ok(FlowRedirect {
                location: add_param_to_uri(
                    &self.unauthorized_redirect,
                    &self.redirect_param,
                    &target,
                ),
                preserve_method: false,
                headers,
            });
        };

        let access = self
            .access
            .issue(refresh.user_id(), self.access_cookie_path(), now, &mut headers)
            .await
            .inspect_err(|e| tracing::error!("Failed to issue access session: {}", e))?;

        if self.refresh.needs_reissue(&refresh, now) {
            tracing::debug!("Refresh session near expiry, rotating");
            self.refresh
                .rotate(&refresh, &refresh_path, now, &mut headers)
                .await
                .inspect_err(|e| tracing::error!("Failed to rotate refresh session: {}", e))?;
        }

        let location = if is_state_changing(request.method) {
            let ticket = self
                .resume_tickets
                .mint(access.user_id(), access.csrf_token(), now)
                .await?;
            add_param_to_uri(&target, &self.resume_ticket_param, &ticket)
        } else {
            target
        };

        Ok(FlowRedirect {
            location,
            preserve_method: true,
            headers,
        })
    }
}
