use chrono::{DateTime, Utc};
use http::HeaderMap;

use crate::session::config::AuthConfig;
use crate::session::errors::SessionError;
use crate::session::types::{FlowRedirect, LoginRequest, ProviderError, Session};
use crate::utils::{get_param, sanitize_redirect};

impl AuthConfig {
    /// Log a user in after the provider accepts the submitted credentials.
    ///
    /// Always issues an access session; a refresh session only when the
    /// remember-me field is `on`. A rejected login goes to the
    /// login-failed page without detail.
    #[tracing::instrument(skip_all)]
    pub async fn create_session(
        &self,
        request: &LoginRequest,
        query: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<FlowRedirect, SessionError> {
        let user_id = match self.provider.authenticate_user(request).await {
            Ok(user_id) if !user_id.is_empty() => user_id,
            Ok(_) | Err(ProviderError::InvalidCredentials) => {
                tracing::debug!("Login rejected");
                return Ok(self.login_failed());
            }
            Err(e) => {
                tracing::error!("Authentication provider failed: {}", e);
                return Ok(self.login_failed());
            }
        };

        let remember_me = request.form_value(&self.remember_me_field) == Some("on");
        let query_redirect = get_param(query, &self.redirect_param);
        let target = sanitize_redirect(query_redirect.as_deref().or(self.form_redirect(request)))
            .unwrap_or_else(|| self.default_login_success_redirect.clone());

        let mut headers = HeaderMap::new();
        let refresh_path = self.refresh_path();
        if remember_me {
            self.refresh
                .issue(&user_id, &refresh_path, now, &mut headers)
                .await
                .inspect_err(|e| tracing::error!("Failed to issue refresh session: {}", e))?;
        } else {
            self.refresh.delete_cookie(&mut headers, &refresh_path)?;
        }
        self.access
            .issue(&user_id, self.access_cookie_path(), now, &mut headers)
            .await
            .inspect_err(|e| tracing::error!("Failed to issue access session: {}", e))?;

        tracing::info!("User {} logged in (remember me: {})", user_id, remember_me);
        Ok(FlowRedirect {
            location: target,
            preserve_method: false,
            headers,
        })
    }

    /// Log out: clear both cookies and, for a resolved caller, every session
    /// of that user in both tiers.
    #[tracing::instrument(skip_all)]
    pub async fn delete_sessions(
        &self,
        session: Option<&Session>,
        query: Option<&str>,
    ) -> Result<FlowRedirect, SessionError> {
        let mut headers = HeaderMap::new();
        self.access.delete_cookie(&mut headers, self.access_cookie_path())?;
        self.refresh.delete_cookie(&mut headers, &self.refresh_path())?;

        if let Some(session) = session {
            let user_id = session.user_id();
            self.access.store.delete_sessions(user_id).await?;
            self.refresh.store.delete_sessions(user_id).await?;
            tracing::info!("User {} logged out of all sessions", user_id);
        }

        Ok(FlowRedirect {
            location: self.redirect_target(query, &self.default_logout_redirect),
            preserve_method: false,
            headers,
        })
    }

    fn login_failed(&self) -> FlowRedirect {
        FlowRedirect {
            location: self.login_failed_redirect.clone(),
            preserve_method: false,
            headers: HeaderMap::new(),
        }
    }

    // The login form may carry the redirect as a hidden field instead.
    fn form_redirect<'a>(&self, request: &'a LoginRequest) -> Option<&'a str> {
        request
            .form
            .get(&self.redirect_param)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::test_utils::{
        TEST_PASSWORD, deleted_cookie_names, failing_config, memory_config,
        session_cookie_values,
    };
    use std::collections::HashMap;

    fn login_form(user: &str, password: &str, remember_me: bool) -> LoginRequest {
        let mut form = HashMap::new();
        form.insert("username".to_string(), user.to_string());
        form.insert("password".to_string(), password.to_string());
        if remember_me {
            form.insert("rememberMe".to_string(), "on".to_string());
        }
        LoginRequest::new(HeaderMap::new(), form)
    }

    #[tokio::test]
    async fn test_login_without_remember_me() {
        // Given valid credentials without remember-me
        let config = memory_config();

        // When logging in
        let redirect = config
            .create_session(&login_form("alice", TEST_PASSWORD, false), None, Utc::now())
            .await
            .unwrap();

        // Then only the access cookie is set and the refresh cookie cleared
        assert_eq!(redirect.location, "/");
        let cookies = session_cookie_values(&redirect.headers);
        assert_eq!(cookies.len(), 1);
        assert!(cookies.contains_key("access_session"));
        assert_eq!(deleted_cookie_names(&redirect.headers), vec!["refresh_session"]);
    }

    #[tokio::test]
    async fn test_login_with_remember_me() {
        let config = memory_config();
        let now = Utc::now();

        let redirect = config
            .create_session(
                &login_form("alice", TEST_PASSWORD, true),
                Some("redirect=%2Fchores"),
                now,
            )
            .await
            .unwrap();

        assert_eq!(redirect.location, "/chores");
        let cookies = session_cookie_values(&redirect.headers);
        assert_eq!(cookies.len(), 2);
        let refresh = config
            .refresh
            .store
            .verify_session(&cookies["refresh_session"], now)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(refresh.user_id(), "alice");
    }

    #[tokio::test]
    async fn test_login_redirect_from_form_field() {
        let config = memory_config();
        let mut request = login_form("alice", TEST_PASSWORD, false);
        request
            .form
            .insert("redirect".to_string(), "/chores/1".to_string());

        let redirect = config
            .create_session(&request, None, Utc::now())
            .await
            .unwrap();

        assert_eq!(redirect.location, "/chores/1");
    }

    #[tokio::test]
    async fn test_login_failure_sets_nothing() {
        let config = memory_config();

        let redirect = config
            .create_session(
                &login_form("alice", "wrong", true),
                Some("redirect=%2Fchores"),
                Utc::now(),
            )
            .await
            .unwrap();

        assert_eq!(redirect.location, "/login");
        assert!(redirect.headers.is_empty());
    }

    #[tokio::test]
    async fn test_logout_deletes_all_sessions_of_user() {
        // Given two logins of the same user, one remembered
        let config = memory_config();
        let now = Utc::now();
        let first = config
            .create_session(&login_form("alice", TEST_PASSWORD, true), None, now)
            .await
            .unwrap();
        let second = config
            .create_session(&login_form("alice", TEST_PASSWORD, false), None, now)
            .await
            .unwrap();
        let first = session_cookie_values(&first.headers);
        let second = session_cookie_values(&second.headers);
        let current = config
            .access
            .store
            .verify_session(&second["access_session"], now)
            .await
            .unwrap()
            .unwrap();

        // When logging out from the second device
        let redirect = config
            .delete_sessions(Some(&current), Some("redirect=%2Fbye"))
            .await
            .unwrap();

        // Then both cookies are cleared and no session of the user survives
        assert_eq!(redirect.location, "/bye");
        assert_eq!(deleted_cookie_names(&redirect.headers).len(), 2);
        for (store, token) in [
            (&config.access.store, &first["access_session"]),
            (&config.access.store, &second["access_session"]),
            (&config.refresh.store, &first["refresh_session"]),
        ] {
            assert!(store.verify_session(token, now).await.unwrap().is_none());
        }
    }

    #[tokio::test]
    async fn test_anonymous_logout_only_clears_cookies() {
        let config = memory_config();

        let redirect = config.delete_sessions(None, None).await.unwrap();

        assert_eq!(redirect.location, "/login");
        assert_eq!(deleted_cookie_names(&redirect.headers).len(), 2);
    }

    #[tokio::test]
    async fn test_login_store_failure_is_an_error() {
        // Given valid credentials but an unavailable access store
        let config = failing_config();

        // When logging in
        let result = config
            .create_session(&login_form("alice", TEST_PASSWORD, false), None, Utc::now())
            .await;

        // Then the failure surfaces instead of a login-failed redirect
        assert!(matches!(result, Err(SessionError::Storage(_))));
    }
}
