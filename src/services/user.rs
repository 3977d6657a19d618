//! User service
//!
//! Authentication for the admin dashboard: login/logout, session tokens,
//! and first-run admin bootstrap. The public site has no accounts, so there
//! is no registration flow.

use crate::db::repositories::{SessionRepository, UserRepository};
use crate::models::{Session, User, UserRole};
use crate::services::password::{hash_password, verify_password};
use anyhow::Context;
use chrono::{Duration, Utc};
use std::sync::Arc;
use uuid::Uuid;

/// Default session expiration time in days
const DEFAULT_SESSION_EXPIRATION_DAYS: i64 = 7;

/// Error types for user service operations
#[derive(Debug, thiserror::Error)]
pub enum UserServiceError {
    /// Authentication failed (invalid credentials)
    #[error("Authentication failed: {0}")]
    AuthenticationError(String),

    /// Validation error (invalid input)
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

type Result<T> = std::result::Result<T, UserServiceError>;

/// User service for admin authentication and session management
pub struct UserService {
    user_repo: Arc<dyn UserRepository>,
    session_repo: Arc<dyn SessionRepository>,
    session_expiration_days: i64,
}

impl UserService {
    pub fn new(user_repo: Arc<dyn UserRepository>, session_repo: Arc<dyn SessionRepository>) -> Self {
        Self {
            user_repo,
            session_repo,
            session_expiration_days: DEFAULT_SESSION_EXPIRATION_DAYS,
        }
    }

    /// Create a user service with a custom session expiration
    pub fn with_session_expiration(
        user_repo: Arc<dyn UserRepository>,
        session_repo: Arc<dyn SessionRepository>,
        session_expiration_days: i64,
    ) -> Self {
        Self {
            user_repo,
            session_repo,
            session_expiration_days,
        }
    }

    /// Create the initial admin account if no users exist yet. Returns the
    /// created user, or `None` when the table is already populated.
    pub async fn ensure_admin(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<Option<User>> {
        let count = self
            .user_repo
            .count()
            .await
            .context("Failed to count users")?;
        if count > 0 {
            return Ok(None);
        }

        if username.trim().is_empty() || password.is_empty() {
            return Err(UserServiceError::ValidationError(
                "Admin username and password must not be empty".to_string(),
            ));
        }

        let password_hash = hash_password(password).context("Failed to hash password")?;
        let user = User::new(
            username.trim().to_string(),
            email.trim().to_string(),
            password_hash,
            UserRole::Admin,
        );
        let created = self
            .user_repo
            .create(&user)
            .await
            .context("Failed to create admin user")?;
        Ok(Some(created))
    }

    /// Login with credentials, returning the user and a fresh session.
    /// Invalid username and invalid password produce the same error so the
    /// response does not reveal which part was wrong.
    pub async fn login(&self, input: LoginInput) -> Result<(User, Session)> {
        let user = self
            .user_repo
            .get_by_username(&input.username)
            .await
            .context("Failed to get user")?
            .ok_or_else(|| {
                UserServiceError::AuthenticationError("Invalid username or password".to_string())
            })?;

        let password_valid = verify_password(&input.password, &user.password_hash)
            .context("Failed to verify password")?;
        if !password_valid {
            return Err(UserServiceError::AuthenticationError(
                "Invalid username or password".to_string(),
            ));
        }

        let now = Utc::now();
        let session = Session {
            id: Uuid::new_v4().to_string(),
            user_id: user.id,
            expires_at: now + Duration::days(self.session_expiration_days),
            created_at: now,
        };
        self.session_repo
            .create(&session)
            .await
            .context("Failed to create session")?;

        Ok((user, session))
    }

    /// Logout (invalidate session). Unknown tokens are a no-op.
    pub async fn logout(&self, session_id: &str) -> Result<()> {
        self.session_repo
            .delete(session_id)
            .await
            .context("Failed to delete session")?;
        Ok(())
    }

    /// Validate a session token and return the associated user. Expired
    /// sessions are deleted on sight.
    pub async fn validate_session(&self, token: &str) -> Result<Option<User>> {
        let session = match self
            .session_repo
            .get(token)
            .await
            .context("Failed to get session")?
        {
            Some(s) => s,
            None => return Ok(None),
        };

        if session.is_expired() {
            let _ = self.session_repo.delete(token).await;
            return Ok(None);
        }

        let user = self
            .user_repo
            .get_by_id(session.user_id)
            .await
            .context("Failed to get user")?;
        Ok(user)
    }

    pub async fn get_by_id(&self, id: i64) -> Result<Option<User>> {
        Ok(self
            .user_repo
            .get_by_id(id)
            .await
            .context("Failed to get user by ID")?)
    }

    /// Delete expired sessions, returning how many were removed. Called
    /// periodically from a background task.
    pub async fn cleanup_expired_sessions(&self) -> Result<u64> {
        Ok(self
            .session_repo
            .delete_expired()
            .await
            .context("Failed to delete expired sessions")?)
    }
}

/// Input for login
#[derive(Debug, Clone)]
pub struct LoginInput {
    pub username: String,
    pub password: String,
}

impl LoginInput {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{SqlxSessionRepository, SqlxUserRepository};
    use crate::db::{create_test_pool, migrations};

    async fn setup_service(expiration_days: i64) -> UserService {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        UserService::with_session_expiration(
            SqlxUserRepository::boxed(pool.clone()),
            SqlxSessionRepository::boxed(pool),
            expiration_days,
        )
    }

    #[tokio::test]
    async fn test_ensure_admin_bootstrap_once() {
        let service = setup_service(DEFAULT_SESSION_EXPIRATION_DAYS).await;

        let created = service
            .ensure_admin("admin", "admin@example.com", "changeme123")
            .await
            .expect("bootstrap")
            .expect("user created");
        assert_eq!(created.role, UserRole::Admin);
        assert!(created.password_hash.starts_with("$argon2id$"));

        // Second run is a no-op
        let again = service
            .ensure_admin("other", "other@example.com", "pw")
            .await
            .expect("bootstrap");
        assert!(again.is_none());
    }

    #[tokio::test]
    async fn test_login_and_validate_roundtrip() {
        let service = setup_service(DEFAULT_SESSION_EXPIRATION_DAYS).await;
        service
            .ensure_admin("admin", "admin@example.com", "changeme123")
            .await
            .expect("bootstrap");

        let (user, session) = service
            .login(LoginInput::new("admin", "changeme123"))
            .await
            .expect("login");
        assert!(!session.is_expired());

        let validated = service
            .validate_session(&session.id)
            .await
            .expect("validate")
            .expect("session valid");
        assert_eq!(validated.id, user.id);
    }

    #[tokio::test]
    async fn test_login_wrong_password_fails() {
        let service = setup_service(DEFAULT_SESSION_EXPIRATION_DAYS).await;
        service
            .ensure_admin("admin", "admin@example.com", "changeme123")
            .await
            .expect("bootstrap");

        let result = service.login(LoginInput::new("admin", "wrong")).await;
        assert!(matches!(
            result,
            Err(UserServiceError::AuthenticationError(_))
        ));

        let result = service.login(LoginInput::new("nobody", "changeme123")).await;
        assert!(matches!(
            result,
            Err(UserServiceError::AuthenticationError(_))
        ));
    }

    #[tokio::test]
    async fn test_logout_invalidates_session() {
        let service = setup_service(DEFAULT_SESSION_EXPIRATION_DAYS).await;
        service
            .ensure_admin("admin", "admin@example.com", "changeme123")
            .await
            .expect("bootstrap");
        let (_user, session) = service
            .login(LoginInput::new("admin", "changeme123"))
            .await
            .expect("login");

        service.logout(&session.id).await.expect("logout");
        assert!(service
            .validate_session(&session.id)
            .await
            .expect("validate")
            .is_none());

        // Logging out an unknown token is fine
        service.logout("no-such-token").await.expect("logout");
    }

    #[tokio::test]
    async fn test_expired_session_rejected_and_cleaned() {
        let service = setup_service(-1).await;
        service
            .ensure_admin("admin", "admin@example.com", "changeme123")
            .await
            .expect("bootstrap");
        let (_user, session) = service
            .login(LoginInput::new("admin", "changeme123"))
            .await
            .expect("login");

        assert!(session.is_expired());
        assert!(service
            .validate_session(&session.id)
            .await
            .expect("validate")
            .is_none());
    }

    #[tokio::test]
    async fn test_cleanup_expired_sessions() {
        let service = setup_service(-1).await;
        service
            .ensure_admin("admin", "admin@example.com", "changeme123")
            .await
            .expect("bootstrap");
        service
            .login(LoginInput::new("admin", "changeme123"))
            .await
            .expect("login");

        let removed = service.cleanup_expired_sessions().await.expect("cleanup");
        assert_eq!(removed, 1);
    }
}
