use std::sync::Arc;

use argon2::password_hash::{rand_core::OsRng, SaltString};
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use auth_sessions::{DeviceInfo, Session, SessionService, SessionTokens};
use auth_tokens::{TokenError, TokenService};
use chrono::Utc;
use tracing::debug;
use uuid::Uuid;

use crate::config::IdentityConfig;
use crate::error::{IdentityError, IdentityResult};
use crate::models::{AuthResponse, AuthenticatedUser, LoginRequest, RegisterRequest, User};
use crate::repository::UserRepository;

/// Authentication orchestration: credentials in, sessions and assertions out.
pub struct IdentityService {
    users: Arc<dyn UserRepository>,
    sessions: Arc<SessionService>,
    tokens: Arc<TokenService>,
    config: IdentityConfig,
    argon2: Argon2<'static>,
}

impl IdentityService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        sessions: Arc<SessionService>,
        tokens: Arc<TokenService>,
        config: IdentityConfig,
    ) -> Self {
        Self {
            users,
            sessions,
            tokens,
            config,
            argon2: Argon2::default(),
        }
    }

    /// Register a new identity and open its first session.
    pub async fn register(
        &self,
        request: RegisterRequest,
        device: DeviceInfo,
    ) -> IdentityResult<AuthResponse> {
        let email = request.email.trim().to_lowercase();
        if !is_valid_email(&email) {
            return Err(IdentityError::InvalidEmail);
        }
        self.validate_password(&request.password)?;

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            email,
            password_hash: self.hash_password(&request.password)?,
            full_name: request.full_name,
            is_active: true,
            is_super_admin: false,
            last_login_at: None,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };

        // The storage-level unique index is the authority on duplicates; a
        // pre-check here would still race.
        let user = self.users.create(user).await?;
        let tokens = self.sessions.open(user.id, &user.email, device).await?;
        Ok(AuthResponse {
            user_id: user.id,
            email: user.email,
            tokens,
        })
    }

    /// Authenticate an email/password pair and open a session.
    pub async fn login(
        &self,
        request: LoginRequest,
        device: DeviceInfo,
    ) -> IdentityResult<AuthResponse> {
        let email = request.email.trim().to_lowercase();
        let user = self
            .users
            .find_by_email(&email)
            .await?
            .ok_or(IdentityError::InvalidCredentials)?;

        if !user.is_live() {
            debug!(user_id = %user.id, "login rejected: account not live");
            return Err(IdentityError::InvalidCredentials);
        }
        self.verify_password(&request.password, &user.password_hash)?;

        self.users.set_last_login(user.id).await?;
        let tokens = self.sessions.open(user.id, &user.email, device).await?;
        Ok(AuthResponse {
            user_id: user.id,
            email: user.email,
            tokens,
        })
    }

    /// Exchange a refresh assertion for a new credential pair.
    pub async fn refresh(&self, presented: &str) -> IdentityResult<SessionTokens> {
        let claims = self.tokens.verify_refresh(presented).map_err(|e| {
            debug!(reason = %e, "refresh assertion failed verification");
            e
        })?;

        let user_id = claims.user_id()?;
        let user = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or(IdentityError::InvalidCredentials)?;
        if !user.is_live() {
            debug!(%user_id, "refresh rejected: account not live");
            return Err(IdentityError::InvalidCredentials);
        }

        Ok(self.sessions.rotate(&claims, presented).await?)
    }

    /// Validate an access assertion and load the live identity behind it.
    pub async fn authenticate_access(&self, token: &str) -> IdentityResult<AuthenticatedUser> {
        let claims = self.tokens.verify_access(token).map_err(|e| {
            debug!(reason = %e, "access assertion failed verification");
            e
        })?;

        let user = self
            .users
            .find_by_id(claims.user_id()?)
            .await?
            .ok_or(IdentityError::InvalidCredentials)?;
        if !user.is_live() {
            return Err(IdentityError::InvalidCredentials);
        }
        Ok(AuthenticatedUser {
            id: user.id,
            email: user.email,
            is_super_admin: user.is_super_admin,
        })
    }

    /// Terminate the session behind a refresh assertion.
    pub async fn logout(&self, presented: &str) -> IdentityResult<()> {
        if presented.is_empty() {
            return Err(IdentityError::Token(TokenError::Missing));
        }
        let claims = self.tokens.verify_refresh(presented)?;
        self.sessions
            .close(claims.user_id()?, claims.lineage_id()?, "user logout")
            .await?;
        Ok(())
    }

    /// Terminate every session for an identity.
    pub async fn logout_all(&self, user_id: Uuid) -> IdentityResult<u64> {
        Ok(self.sessions.close_all(user_id, "logout all devices").await?)
    }

    /// Change the password and revoke every open session.
    pub async fn change_password(
        &self,
        user_id: Uuid,
        old_password: &str,
        new_password: &str,
    ) -> IdentityResult<()> {
        let user = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or(IdentityError::UserNotFound)?;

        self.verify_password(old_password, &user.password_hash)?;
        self.validate_password(new_password)?;

        let new_hash = self.hash_password(new_password)?;
        self.users.update_password(user_id, &new_hash).await?;
        self.sessions
            .close_all(user_id, "password changed")
            .await?;
        Ok(())
    }

    /// Disable an account without tombstoning it.
    pub async fn deactivate(&self, user_id: Uuid) -> IdentityResult<()> {
        self.users.deactivate(user_id).await?;
        self.sessions
            .close_all(user_id, "account deactivated")
            .await?;
        Ok(())
    }

    /// Tombstone an account. The row survives for audit trails and
    /// referential stability.
    pub async fn delete_account(&self, user_id: Uuid) -> IdentityResult<()> {
        self.users.soft_delete(user_id).await?;
        self.sessions.close_all(user_id, "account deleted").await?;
        Ok(())
    }

    /// Live sessions for the session-management UI.
    pub async fn sessions_for(&self, user_id: Uuid) -> IdentityResult<Vec<Session>> {
        Ok(self.sessions.sessions_for(user_id).await?)
    }

    fn hash_password(&self, password: &str) -> IdentityResult<String> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .argon2
            .hash_password(password.as_bytes(), &salt)
            .map_err(|_| IdentityError::HashingError)?
            .to_string();
        Ok(hash)
    }

    fn verify_password(&self, password: &str, hash: &str) -> IdentityResult<()> {
        let parsed = PasswordHash::new(hash).map_err(|_| IdentityError::HashingError)?;
        self.argon2
            .verify_password(password.as_bytes(), &parsed)
            .map_err(|_| IdentityError::InvalidCredentials)
    }

    fn validate_password(&self, password: &str) -> IdentityResult<()> {
        if password.len() < self.config.password_min_length {
            return Err(IdentityError::WeakPassword);
        }
        if self.config.password_require_uppercase && !password.chars().any(|c| c.is_uppercase()) {
            return Err(IdentityError::WeakPassword);
        }
        if self.config.password_require_numbers && !password.chars().any(|c| c.is_numeric()) {
            return Err(IdentityError::WeakPassword);
        }
        if self.config.password_require_special_chars
            && !password.chars().any(|c| !c.is_alphanumeric())
        {
            return Err(IdentityError::WeakPassword);
        }
        Ok(())
    }
}

fn is_valid_email(email: &str) -> bool {
    !email.is_empty() && email.contains('@') && email.contains('.')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::InMemoryUserRepository;
    use auth_sessions::{InMemorySessionRepository, NoopRevocationCache};
    use auth_tokens::TokenConfig;

    fn service() -> IdentityService {
        let tokens = Arc::new(TokenService::new(TokenConfig {
            access_secret: "test-access".into(),
            refresh_secret: "test-refresh".into(),
            ..TokenConfig::default()
        }));
        let sessions = Arc::new(SessionService::new(
            Arc::new(InMemorySessionRepository::new()),
            Arc::new(NoopRevocationCache),
            tokens.clone(),
        ));
        IdentityService::new(
            Arc::new(InMemoryUserRepository::new()),
            sessions,
            tokens,
            IdentityConfig::default(),
        )
    }

    fn register_request(email: &str) -> RegisterRequest {
        RegisterRequest {
            email: email.into(),
            password: "Secret123!".into(),
            full_name: None,
        }
    }

    #[tokio::test]
    async fn register_login_refresh_flow() {
        let svc = service();
        svc.register(register_request("a@x.com"), DeviceInfo::default())
            .await
            .unwrap();

        let login = svc
            .login(
                LoginRequest {
                    email: "a@x.com".into(),
                    password: "Secret123!".into(),
                },
                DeviceInfo::default(),
            )
            .await
            .unwrap();

        // Access assertion authenticates.
        let me = svc
            .authenticate_access(&login.tokens.access_token)
            .await
            .unwrap();
        assert_eq!(me.email, "a@x.com");
        assert!(!me.is_super_admin);

        // Refresh yields a new pair; the old refresh value is now rejected.
        let rotated = svc.refresh(&login.tokens.refresh_token).await.unwrap();
        assert_ne!(rotated.refresh_token, login.tokens.refresh_token);
        let err = svc.refresh(&login.tokens.refresh_token).await.unwrap_err();
        assert!(matches!(err, IdentityError::Session(_)));

        // The rotated pair keeps working.
        svc.refresh(&rotated.refresh_token).await.unwrap();
    }

    #[tokio::test]
    async fn email_is_stored_lowercase_and_unique() {
        let svc = service();
        svc.register(register_request("A@X.com"), DeviceInfo::default())
            .await
            .unwrap();
        let err = svc
            .register(register_request("a@x.com"), DeviceInfo::default())
            .await
            .unwrap_err();
        assert!(matches!(err, IdentityError::EmailAlreadyInUse));

        // Login with any casing works against the lowercase record.
        svc.login(
            LoginRequest {
                email: "A@x.COM".into(),
                password: "Secret123!".into(),
            },
            DeviceInfo::default(),
        )
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn login_failures_are_indistinguishable() {
        let svc = service();
        svc.register(register_request("a@x.com"), DeviceInfo::default())
            .await
            .unwrap();

        let unknown = svc
            .login(
                LoginRequest {
                    email: "nobody@x.com".into(),
                    password: "Secret123!".into(),
                },
                DeviceInfo::default(),
            )
            .await
            .unwrap_err();
        let wrong = svc
            .login(
                LoginRequest {
                    email: "a@x.com".into(),
                    password: "WrongPass1!".into(),
                },
                DeviceInfo::default(),
            )
            .await
            .unwrap_err();
        assert!(matches!(unknown, IdentityError::InvalidCredentials));
        assert!(matches!(wrong, IdentityError::InvalidCredentials));
    }

    #[tokio::test]
    async fn deactivated_account_cannot_authenticate() {
        let svc = service();
        let registered = svc
            .register(register_request("a@x.com"), DeviceInfo::default())
            .await
            .unwrap();

        svc.deactivate(registered.user_id).await.unwrap();

        let login = svc
            .login(
                LoginRequest {
                    email: "a@x.com".into(),
                    password: "Secret123!".into(),
                },
                DeviceInfo::default(),
            )
            .await
            .unwrap_err();
        assert!(matches!(login, IdentityError::InvalidCredentials));

        // Existing assertions die with the account.
        let access = svc
            .authenticate_access(&registered.tokens.access_token)
            .await
            .unwrap_err();
        assert!(matches!(access, IdentityError::InvalidCredentials));
        assert!(svc.refresh(&registered.tokens.refresh_token).await.is_err());
    }

    #[tokio::test]
    async fn weak_passwords_are_rejected() {
        let svc = service();
        for password in ["short1!", "nouppercase1!", "NoNumbers!", "NoSpecial123"] {
            let err = svc
                .register(
                    RegisterRequest {
                        email: "a@x.com".into(),
                        password: password.into(),
                        full_name: None,
                    },
                    DeviceInfo::default(),
                )
                .await
                .unwrap_err();
            assert!(matches!(err, IdentityError::WeakPassword), "{password}");
        }
    }

    #[tokio::test]
    async fn change_password_revokes_open_sessions() {
        let svc = service();
        let registered = svc
            .register(register_request("a@x.com"), DeviceInfo::default())
            .await
            .unwrap();

        svc.change_password(registered.user_id, "Secret123!", "NewSecret456!")
            .await
            .unwrap();

        assert!(svc.refresh(&registered.tokens.refresh_token).await.is_err());
        svc.login(
            LoginRequest {
                email: "a@x.com".into(),
                password: "NewSecret456!".into(),
            },
            DeviceInfo::default(),
        )
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn logout_invalidates_the_presented_lineage_only() {
        let svc = service();
        svc.register(register_request("a@x.com"), DeviceInfo::default())
            .await
            .unwrap();
        let phone = svc
            .login(
                LoginRequest {
                    email: "a@x.com".into(),
                    password: "Secret123!".into(),
                },
                DeviceInfo::default(),
            )
            .await
            .unwrap();
        let laptop = svc
            .login(
                LoginRequest {
                    email: "a@x.com".into(),
                    password: "Secret123!".into(),
                },
                DeviceInfo::default(),
            )
            .await
            .unwrap();

        svc.logout(&phone.tokens.refresh_token).await.unwrap();
        assert!(svc.refresh(&phone.tokens.refresh_token).await.is_err());
        assert!(svc.refresh(&laptop.tokens.refresh_token).await.is_ok());
    }

    #[tokio::test]
    async fn deleted_account_is_tombstoned_not_removed() {
        let svc = service();
        let registered = svc
            .register(register_request("a@x.com"), DeviceInfo::default())
            .await
            .unwrap();
        svc.delete_account(registered.user_id).await.unwrap();

        // The email becomes available again; the old account stays dead.
        svc.register(register_request("a@x.com"), DeviceInfo::default())
            .await
            .unwrap();
        assert!(svc
            .authenticate_access(&registered.tokens.access_token)
            .await
            .is_err());
    }
}
