use std::collections::HashMap;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
};
use async_trait::async_trait;
use ring::rand::{SecureRandom, SystemRandom};

use cookie_session_axum::cookie_session::{AuthProvider, LoginRequest, ProviderError};

/// Checks the login form against an in-memory table of argon2 hashes.
pub(crate) struct PasswordProvider {
    users: HashMap<String, String>,
}

impl PasswordProvider {
    /// One account from `DEMO_USER` / `DEMO_PASSWORD`.
    pub(crate) fn from_env() -> Result<Self, String> {
        let user = std::env::var("DEMO_USER").unwrap_or_else(|_| "demo".to_string());
        let password = std::env::var("DEMO_PASSWORD").unwrap_or_else(|_| {
            tracing::warn!("DEMO_PASSWORD not set, using the built-in demo password");
            "demo-password".to_string()
        });
        let mut provider = Self {
            users: HashMap::new(),
        };
        provider.add_user(&user, &password)?;
        tracing::info!("Demo account '{}' ready", user);
        Ok(provider)
    }

    fn add_user(&mut self, user: &str, password: &str) -> Result<(), String> {
        let mut salt_bytes = [0u8; 16];
        SystemRandom::new()
            .fill(&mut salt_bytes)
            .map_err(|_| "Failed to generate salt".to_string())?;
        let salt = SaltString::encode_b64(&salt_bytes)
            .map_err(|e| format!("Failed to encode salt: {e}"))?;
        let hash = Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| format!("Failed to hash password: {e}"))?
            .to_string();
        self.users.insert(user.to_string(), hash);
        Ok(())
    }
}

fn verify_password(password: &str, hash: &str) -> Result<bool, ProviderError> {
    let parsed = PasswordHash::new(hash)
        .map_err(|e| ProviderError::Backend(format!("Stored hash is invalid: {e}")))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

#[async_trait]
impl AuthProvider for PasswordProvider {
    async fn authenticate_user(&self, request: &LoginRequest) -> Result<String, ProviderError> {
        let (Some(user), Some(password)) = (
            request.form_value("username"),
            request.form_value("password"),
        ) else {
            return Err(ProviderError::InvalidCredentials);
        };
        let Some(hash) = self.users.get(user).cloned() else {
            tracing::debug!("Unknown user '{}'", user);
            return Err(ProviderError::InvalidCredentials);
        };

        let password = password.to_string();
        let verified = tokio::task::spawn_blocking(move || verify_password(&password, &hash))
            .await
            .map_err(|e| ProviderError::Backend(format!("Password check panicked: {e}")))??;

        if verified {
            Ok(user.to_string())
        } else {
            Err(ProviderError::InvalidCredentials)
        }
    }
}
