//! Session lifecycle: registration, login, refresh rotation, logout, and the
//! account operations that must revoke sessions along the way.
//!
//! Refresh tokens are single use. Each successful refresh revokes the
//! presented session and creates its successor in one transaction, with the
//! presented session locked for the duration, so two concurrent refreshes of the
//! same token yield exactly one success.

use std::sync::{Arc, OnceLock};
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::{debug, info, warn};

use super::errors::AuthError;
use super::types::{AuthenticatedUser, ClientMeta, IssuedTokens, RegisteredUser, TokenEnvelope};
use crate::config::AuthConfig;
use crate::db::{Database, NewSession, RefreshSession, User, UserRole};
use crate::jwt::{AccessTokenIssuer, AccessTokenResult};
use crate::password::{Argon2Hasher, CredentialHasher};
use crate::refresh_token;
use crate::validation::{is_blank, is_valid_email, is_valid_password, normalize_email};

/// Current time as Unix seconds.
pub fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

#[derive(Clone)]
pub struct AuthService {
    db: Database,
    issuer: Arc<AccessTokenIssuer>,
    hasher: Arc<dyn CredentialHasher>,
    config: Arc<AuthConfig>,
    /// Hash verified against when the login email is unknown, so both
    /// failure paths pay for one verification.
    dummy_hash: Arc<OnceLock<String>>,
}

impl AuthService {
    pub fn new(db: Database, issuer: AccessTokenIssuer, config: AuthConfig) -> Self {
        Self {
            db,
            issuer: Arc::new(issuer),
            hasher: Arc::new(Argon2Hasher),
            config: Arc::new(config),
            dummy_hash: Arc::new(OnceLock::new()),
        }
    }

    /// Replace the credential hasher.
    pub fn with_hasher(mut self, hasher: Arc<dyn CredentialHasher>) -> Self {
        self.hasher = hasher;
        self.dummy_hash = Arc::new(OnceLock::new());
        self
    }

    pub fn config(&self) -> &Arc<AuthConfig> {
        &self.config
    }

    pub fn issuer(&self) -> &AccessTokenIssuer {
        &self.issuer
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    // =========================================================================
    // Credential helpers (blocking pool)
    // =========================================================================

    async fn hash_password(&self, password: &str) -> Result<String, AuthError> {
        let hasher = self.hasher.clone();
        let password = password.to_string();
        Ok(tokio::task::spawn_blocking(move || hasher.hash(&password)).await??)
    }

    async fn verify_password(&self, password: &str, hash: &str) -> Result<bool, AuthError> {
        let hasher = self.hasher.clone();
        let password = password.to_string();
        let hash = hash.to_string();
        Ok(tokio::task::spawn_blocking(move || hasher.verify(&password, &hash)).await??)
    }

    async fn dummy_hash(&self) -> Result<String, AuthError> {
        if let Some(hash) = self.dummy_hash.get() {
            return Ok(hash.clone());
        }
        let hash = self.hash_password(&refresh_token::generate()).await?;
        Ok(self.dummy_hash.get_or_init(|| hash).clone())
    }

    // =========================================================================
    // Session helpers
    // =========================================================================

    /// Insert a new refresh session and return `(raw_token, session_uuid)`.
    async fn start_session(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
        user_id: i64,
        now: i64,
        client: &ClientMeta,
    ) -> Result<(String, String), AuthError> {
        let raw_token = refresh_token::generate();
        let token_hash = refresh_token::hash(&raw_token);

        let session_uuid = self
            .db
            .sessions()
            .create(
                tx,
                &NewSession {
                    user_id,
                    token_hash: &token_hash,
                    created_at: now,
                    expires_at: now + self.config.refresh_token_ttl_secs as i64,
                    ip: client.ip.as_deref(),
                    user_agent: client.user_agent.as_deref(),
                },
            )
            .await?;

        Ok((raw_token, session_uuid))
    }

    fn issued(access: AccessTokenResult, refresh_token: String) -> IssuedTokens {
        IssuedTokens {
            envelope: TokenEnvelope {
                access_token: access.token,
                token_type: "Bearer",
                expires_in: access.duration,
            },
            refresh_token,
        }
    }

    async fn load_user(&self, user_uuid: &str) -> Result<User, AuthError> {
        self.db
            .users()
            .get_by_uuid(user_uuid)
            .await?
            .ok_or_else(|| AuthError::NotFound("User not found.".into()))
    }

    // =========================================================================
    // Auth flows
    // =========================================================================

    /// Create an account with the default role.
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        display_name: &str,
    ) -> Result<RegisteredUser, AuthError> {
        if is_blank(email) || is_blank(password) {
            return Err(AuthError::validation("Must contain email and password."));
        }
        if is_blank(display_name) {
            return Err(AuthError::validation("Must contain display name."));
        }
        if !is_valid_email(email) {
            return Err(AuthError::validation("Email not valid."));
        }
        if !is_valid_password(password) {
            return Err(AuthError::validation(
                "Password does not meet the requirements.",
            ));
        }

        let email = normalize_email(email);
        let display_name = display_name.trim();
        let users = self.db.users();

        if users.get_by_email(&email).await?.is_some() {
            return Err(AuthError::Conflict("Email already registered.".into()));
        }

        let password_hash = self.hash_password(password).await?;
        let uuid = uuid::Uuid::new_v4().to_string();

        match users
            .create(&uuid, &email, &password_hash, display_name)
            .await
        {
            Ok(_) => {}
            // Lost a race with a concurrent registration for the same email
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                return Err(AuthError::Conflict("Email already registered.".into()));
            }
            Err(e) => return Err(e.into()),
        }

        info!(user_id = %uuid, "User registered");

        Ok(RegisteredUser {
            id: uuid,
            email,
            display_name: display_name.to_string(),
            role: UserRole::User,
        })
    }

    /// Verify credentials and open a new refresh session.
    pub async fn login(
        &self,
        email: &str,
        password: &str,
        client: &ClientMeta,
    ) -> Result<IssuedTokens, AuthError> {
        if is_blank(email) || is_blank(password) {
            return Err(AuthError::validation("Must contain email and password."));
        }

        let email = normalize_email(email);
        let Some(user) = self.db.users().get_by_email(&email).await? else {
            let dummy = self.dummy_hash().await?;
            self.verify_password(password, &dummy).await?;
            debug!("Login failed: unknown account");
            return Err(AuthError::InvalidCredentials);
        };

        if !self.verify_password(password, &user.password_hash).await? {
            debug!(user_id = %user.uuid, "Login failed: wrong password");
            return Err(AuthError::InvalidCredentials);
        }

        let now = unix_now();
        let mut tx = self.db.begin().await?;
        let (raw_token, session_uuid) = self.start_session(&mut tx, user.id, now, client).await?;
        tx.commit().await?;

        let access = self.issuer.issue(&user.uuid, &user.email, user.role)?;

        info!(user_id = %user.uuid, session = %session_uuid, "User logged in");
        Ok(Self::issued(access, raw_token))
    }

    /// Exchange a refresh token for a new access token and a rotated refresh token.
    pub async fn refresh(
        &self,
        raw_token: Option<&str>,
        client: &ClientMeta,
    ) -> Result<IssuedTokens, AuthError> {
        let raw_token = match raw_token {
            Some(token) if !is_blank(token) => token,
            _ => return Err(AuthError::InvalidRefreshToken),
        };
        let token_hash = refresh_token::hash(raw_token);
        let sessions = self.db.sessions();

        // Unknown, revoked and expired tokens are turned away before the
        // write lock is taken. The locked read below stays authoritative.
        let Some(candidate) = sessions.find_by_token_hash(&token_hash).await? else {
            return Err(AuthError::InvalidRefreshToken);
        };
        if candidate.is_revoked() {
            warn!(
                session = %candidate.uuid,
                user_db_id = candidate.user_id,
                "Revoked refresh token presented, possible token reuse"
            );
            return Err(AuthError::InvalidRefreshToken);
        }
        if candidate.is_expired(unix_now()) {
            debug!(session = %candidate.uuid, "Expired refresh token presented");
            return Err(AuthError::InvalidRefreshToken);
        }

        // Dropping the transaction on any early return rolls it back.
        let mut tx = self.db.begin().await?;

        let session = sessions
            .lock_by_token_hash(&mut tx, &token_hash)
            .await?
            .ok_or(AuthError::InvalidRefreshToken)?;

        let now = unix_now();
        if !session.is_valid(now) {
            debug!(
                session = %session.uuid,
                "Refresh token invalidated while waiting for lock"
            );
            return Err(AuthError::InvalidRefreshToken);
        }

        sessions.revoke_in(&mut tx, session.id, now).await?;

        let user = self
            .db
            .users()
            .get_by_id_tx(&mut tx, session.user_id)
            .await?
            .ok_or(AuthError::InvalidRefreshToken)?;

        let (new_raw, new_uuid) = self.start_session(&mut tx, user.id, now, client).await?;
        tx.commit().await?;

        // Signed after commit, outside the write lock.
        let access = self.issuer.issue(&user.uuid, &user.email, user.role)?;

        info!(
            user_id = %user.uuid,
            old_session = %session.uuid,
            session = %new_uuid,
            "Refresh token rotated"
        );
        Ok(Self::issued(access, new_raw))
    }

    /// Revoke the session behind a refresh token. Unknown, blank, or already
    /// revoked tokens are not an error.
    pub async fn logout(&self, raw_token: Option<&str>) -> Result<(), AuthError> {
        let Some(raw_token) = raw_token.filter(|t| !is_blank(t)) else {
            return Ok(());
        };

        let sessions = self.db.sessions();
        let token_hash = refresh_token::hash(raw_token);

        if let Some(session) = sessions.find_by_token_hash(&token_hash).await? {
            if !session.is_revoked() && sessions.revoke(session.id, unix_now()).await? {
                info!(session = %session.uuid, "Session logged out");
            }
        }

        Ok(())
    }

    // =========================================================================
    // Account operations
    // =========================================================================

    /// Change the password and revoke every session of the user.
    pub async fn change_password(
        &self,
        user_uuid: &str,
        current_password: &str,
        new_password: &str,
    ) -> Result<(), AuthError> {
        if is_blank(current_password) || is_blank(new_password) {
            return Err(AuthError::validation("Fields must not be blank."));
        }

        let user = self.load_user(user_uuid).await?;

        if !self
            .verify_password(current_password, &user.password_hash)
            .await?
        {
            return Err(AuthError::validation("Current password is incorrect."));
        }
        if self
            .verify_password(new_password, &user.password_hash)
            .await?
        {
            return Err(AuthError::validation("Password should be different."));
        }
        if !is_valid_password(new_password) {
            return Err(AuthError::validation(
                "Password does not meet the requirements.",
            ));
        }

        let password_hash = self.hash_password(new_password).await?;
        let now = unix_now();

        let mut tx = self.db.begin().await?;
        self.db
            .users()
            .update_password_hash(&mut tx, user.id, &password_hash)
            .await?;
        let revoked = self
            .db
            .sessions()
            .revoke_all_by_user(&mut tx, user.id, now)
            .await?;
        tx.commit().await?;

        info!(user_id = %user.uuid, revoked, "Password changed, sessions revoked");
        Ok(())
    }

    /// Current profile of the caller.
    pub async fn profile(&self, user_uuid: &str) -> Result<User, AuthError> {
        self.load_user(user_uuid).await
    }

    /// Set a new display name. Returns the stored (trimmed) name.
    pub async fn update_display_name(
        &self,
        user_uuid: &str,
        display_name: &str,
    ) -> Result<String, AuthError> {
        let user = self.load_user(user_uuid).await?;

        if is_blank(display_name) {
            return Err(AuthError::validation("Name must not be empty."));
        }
        let display_name = display_name.trim();
        if display_name == user.display_name.trim() {
            return Err(AuthError::validation("New name must be different."));
        }

        self.db
            .users()
            .update_display_name(user.id, display_name)
            .await?;

        info!(user_id = %user.uuid, "Display name updated");
        Ok(display_name.to_string())
    }

    /// Delete the account. Sessions are deleted first, in the same transaction.
    pub async fn delete_account(&self, user_uuid: &str) -> Result<(), AuthError> {
        let user = self.load_user(user_uuid).await?;

        let mut tx = self.db.begin().await?;
        let sessions = self.db.sessions().delete_by_user(&mut tx, user.id).await?;
        self.db.users().delete(&mut tx, user.id).await?;
        tx.commit().await?;

        info!(user_id = %user.uuid, sessions, "Account deleted");
        Ok(())
    }

    /// Valid sessions of the caller, newest first.
    pub async fn list_sessions(&self, user_uuid: &str) -> Result<Vec<RefreshSession>, AuthError> {
        let user = self.load_user(user_uuid).await?;
        Ok(self
            .db
            .sessions()
            .list_active_by_user(user.id, unix_now())
            .await?)
    }

    /// Revoke one session by UUID. Admins may revoke any session.
    ///
    /// Returns false when the session does not exist, belongs to someone else
    /// (for non-admins), or was already revoked. The caller cannot tell these
    /// cases apart.
    pub async fn revoke_session(
        &self,
        caller: &AuthenticatedUser,
        session_uuid: &str,
    ) -> Result<bool, AuthError> {
        let sessions = self.db.sessions();
        let Some(session) = sessions.get_by_uuid(session_uuid).await? else {
            return Ok(false);
        };

        let allowed = match caller.role {
            UserRole::Admin => true,
            UserRole::User => {
                let owner = self.load_user(&caller.uuid).await?;
                owner.id == session.user_id
            }
        };
        if !allowed {
            debug!(
                session = %session.uuid,
                caller = %caller.uuid,
                "Revoke of foreign session ignored"
            );
            return Ok(false);
        }

        let revoked = sessions.revoke(session.id, unix_now()).await?;
        if revoked {
            info!(
                session = %session.uuid,
                revoked_by = %caller.uuid,
                "Session revoked"
            );
        }
        Ok(revoked)
    }
}
