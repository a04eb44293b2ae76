//! Authentication service — login, logout, per-request
//! authentication, and password management.
//!
//! Security-relevant events (failed logins, lockouts, revoked-token
//! use, denied site access) are logged to the dedicated
//! `ims::security` tracing target, separate from general application
//! logs.

use ims_core::context::{RequestContext, SiteContext};
use ims_core::error::{FieldError, ImsError, ImsResult};
use ims_core::models::membership::SiteAccess;
use ims_core::models::user::{CreateUser, User};
use ims_core::repository::{
    LockoutStore, MembershipRepository, ResetTokenStore, RevocationStore, UserRepository,
};
use uuid::Uuid;

use crate::config::AuthConfig;
use crate::error::AuthError;
use crate::password;
use crate::token;

/// Input for the login flow.
#[derive(Debug)]
pub struct LoginInput {
    pub username: String,
    pub password: String,
}

/// Successful login result.
#[derive(Debug)]
pub struct LoginOutput {
    /// Signed session token.
    pub token: String,
    /// The authenticated user (with `last_login` already stamped).
    pub user: User,
    /// The user's current site access, as snapshotted into the token.
    pub sites: Vec<SiteAccess>,
    /// Token lifetime in seconds.
    pub expires_in: u64,
}

/// Authentication service.
///
/// Generic over repository implementations so that the auth layer has
/// no dependency on the database crate. `S` is the shared security
/// store (revocation set + lockout counters + reset tokens) — it must
/// be reachable by every server process.
pub struct AuthService<U, M, S>
where
    U: UserRepository,
    M: MembershipRepository,
    S: RevocationStore + LockoutStore + ResetTokenStore,
{
    user_repo: U,
    membership_repo: M,
    security_store: S,
    config: AuthConfig,
}

impl<U, M, S> AuthService<U, M, S>
where
    U: UserRepository,
    M: MembershipRepository,
    S: RevocationStore + LockoutStore + ResetTokenStore,
{
    pub fn new(user_repo: U, membership_repo: M, security_store: S, config: AuthConfig) -> Self {
        Self {
            user_repo,
            membership_repo,
            security_store,
            config,
        }
    }

    /// Authenticate a user with username + password and issue a
    /// session token carrying their site snapshot.
    pub async fn login(&self, input: LoginInput) -> ImsResult<LoginOutput> {
        // 1. Locked accounts are rejected before any password work.
        if self.security_store.is_locked(&input.username).await? {
            tracing::warn!(
                target: "ims::security",
                event = "login_attempt",
                username = %input.username,
                reason = "account_locked",
                "Login rejected: account locked"
            );
            return Err(AuthError::AccountLocked {
                retry_after_secs: self.config.lockout_duration_secs,
            }
            .into());
        }

        // 2. Look up the user. An unknown username still counts as a
        //    failed attempt so enumeration is as expensive as guessing.
        let user = match self.user_repo.get_by_username(&input.username).await {
            Ok(u) => u,
            Err(ImsError::NotFound { .. }) => {
                self.handle_failed_login(&input.username, "user_not_found")
                    .await?;
                return Err(AuthError::InvalidCredentials.into());
            }
            Err(e) => return Err(e),
        };

        // 3. Verify password.
        let valid = password::verify_password(
            &input.password,
            &user.password_hash,
            self.config.pepper.as_deref(),
        )?;

        if !valid {
            self.handle_failed_login(&input.username, "invalid_password")
                .await?;
            return Err(AuthError::InvalidCredentials.into());
        }

        // 4. Check account status.
        if !user.is_active {
            tracing::warn!(
                target: "ims::security",
                event = "login_attempt",
                user_id = %user.id,
                reason = "account_inactive",
                "Login rejected: account inactive"
            );
            return Err(AuthError::AccountInactive.into());
        }

        // 5. Successful verification clears the failure counter.
        self.security_store.clear(&input.username).await?;
        self.user_repo.record_login(user.id).await?;

        // 6. Snapshot site access. A user without any active site has
        //    nothing to act on — no token is issued.
        let sites = self.membership_repo.site_access_for_user(user.id).await?;
        if sites.is_empty() {
            tracing::warn!(
                target: "ims::security",
                event = "login_attempt",
                user_id = %user.id,
                reason = "no_site_access",
                "Login rejected: no site access"
            );
            return Err(AuthError::NoSiteAccess.into());
        }
        let site_ids: Vec<Uuid> = sites.iter().map(|s| s.site_id).collect();

        // 7. Issue the token.
        let token = token::issue_token(user.id, &site_ids, &self.config)?;

        tracing::info!(
            target: "ims::security",
            event = "login_success",
            user_id = %user.id,
            site_count = site_ids.len(),
            "Login succeeded"
        );

        Ok(LoginOutput {
            token,
            user,
            sites,
            expires_in: self.config.token_lifetime_secs,
        })
    }

    /// Invalidate a session token by revoking its `jti` for the rest
    /// of the token's lifetime.
    pub async fn logout(&self, token: &str) -> ImsResult<()> {
        let Some(claims) = token::validate_token(token, &self.config) else {
            return Err(ImsError::AuthenticationRequired);
        };
        let Some(jti) = claims.jti() else {
            return Err(ImsError::AuthenticationRequired);
        };

        self.security_store
            .revoke(jti, claims.expires_at())
            .await?;

        tracing::info!(
            target: "ims::security",
            event = "logout",
            user_id = %claims.sub,
            jti = %jti,
            "Session revoked"
        );

        Ok(())
    }

    /// Register a new account.
    ///
    /// Field problems are collected into one validation error;
    /// username/email uniqueness comes back as a conflict.
    pub async fn create_user(&self, input: CreateUser) -> ImsResult<User> {
        let mut errors = Vec::new();
        if input.username.trim().is_empty() {
            errors.push(FieldError::new("username", "is required"));
        }
        if input.email.trim().is_empty() {
            errors.push(FieldError::new("email", "is required"));
        } else if !input.email.contains('@') {
            errors.push(FieldError::new("email", "must be a valid email address"));
        }
        if let Err(ImsError::Validation {
            errors: mut password_errors,
        }) =
            password::validate_password_strength(&input.password, self.config.min_password_length)
        {
            errors.append(&mut password_errors);
        }
        if !errors.is_empty() {
            return Err(ImsError::Validation { errors });
        }

        let user = self.user_repo.create(input).await?;

        tracing::info!(
            target: "ims::security",
            event = "user_created",
            user_id = %user.id,
            username = %user.username,
            "User created"
        );

        Ok(user)
    }

    /// Full gate entry point for a raw request: token extraction plus
    /// [`Self::authenticate`]. A request with no token at all fails
    /// closed — there is no anonymous fallback.
    pub async fn authenticate_request(
        &self,
        authorization: Option<&str>,
        cookie: Option<&str>,
        requested_site: Option<Uuid>,
    ) -> ImsResult<RequestContext> {
        let Some(token) = crate::gate::extract_token(authorization, cookie) else {
            tracing::warn!(
                target: "ims::security",
                event = "missing_token",
                "Request without credentials"
            );
            return Err(ImsError::AuthenticationRequired);
        };
        self.authenticate(token, requested_site).await
    }

    /// The per-request authentication gate.
    ///
    /// Resolves a raw token (plus an optional requested site id) into
    /// a verified [`RequestContext`], failing closed at every step:
    /// Unauthenticated → TokenValid → UserResolved →
    /// SiteContextResolved, or Rejected.
    pub async fn authenticate(
        &self,
        token: &str,
        requested_site: Option<Uuid>,
    ) -> ImsResult<RequestContext> {
        // Token validation collapses every failure to the same error.
        let Some(claims) = token::validate_token(token, &self.config) else {
            tracing::warn!(
                target: "ims::security",
                event = "invalid_token",
                "Request with invalid or expired token"
            );
            return Err(ImsError::AuthenticationRequired);
        };

        let Some(jti) = claims.jti() else {
            return Err(ImsError::AuthenticationRequired);
        };
        if self.security_store.is_revoked(jti).await? {
            tracing::warn!(
                target: "ims::security",
                event = "revoked_token",
                user_id = %claims.sub,
                jti = %jti,
                "Request with revoked token"
            );
            return Err(ImsError::AuthenticationRequired);
        }

        // Resolve the user. Missing and inactive are deliberately the
        // same client-facing failure.
        let Some(user_id) = claims.user_id() else {
            return Err(ImsError::AuthenticationRequired);
        };
        let user = match self.user_repo.get_by_id(user_id).await {
            Ok(u) => u,
            Err(ImsError::NotFound { .. }) => return Err(ImsError::AuthenticationRequired),
            Err(e) => return Err(e),
        };
        if !user.is_active {
            return Err(ImsError::AuthenticationRequired);
        }

        // Resolve the site context from the token snapshot.
        let site_ids = claims.site_ids();
        let site = match requested_site {
            Some(requested) => {
                if !site_ids.contains(&requested) {
                    tracing::warn!(
                        target: "ims::security",
                        event = "site_access_denied",
                        user_id = %user.id,
                        site_id = %requested,
                        "Requested site outside token scope"
                    );
                    return Err(ImsError::AuthorizationDenied {
                        reason: "no access to the requested site".into(),
                    });
                }
                SiteContext::single(requested)
            }
            None => SiteContext::spanning(site_ids).ok_or(ImsError::AuthorizationDenied {
                reason: "user has no site access".into(),
            })?,
        };

        Ok(RequestContext { user, site })
    }

    /// Change a password after verifying the current one. All other
    /// sessions stay valid until they expire.
    pub async fn change_password(
        &self,
        user: &User,
        current_password: &str,
        new_password: &str,
    ) -> ImsResult<()> {
        let valid = password::verify_password(
            current_password,
            &user.password_hash,
            self.config.pepper.as_deref(),
        )?;
        if !valid {
            tracing::warn!(
                target: "ims::security",
                event = "password_change_failed",
                user_id = %user.id,
                reason = "invalid_current_password",
                "Password change rejected"
            );
            return Err(ImsError::AuthenticationRequired);
        }

        password::validate_password_strength(new_password, self.config.min_password_length)?;

        self.user_repo.set_password(user.id, new_password).await?;

        tracing::info!(
            target: "ims::security",
            event = "password_changed",
            user_id = %user.id,
            "Password changed"
        );

        Ok(())
    }

    /// Begin a password reset. Returns the opaque reset token, or
    /// `None` when no account matches — callers must not reveal which.
    pub async fn request_password_reset(&self, email: &str) -> ImsResult<Option<String>> {
        let user = match self.user_repo.get_by_email(email).await {
            Ok(u) => u,
            Err(ImsError::NotFound { .. }) => return Ok(None),
            Err(e) => return Err(e),
        };

        let reset_token = Uuid::new_v4().to_string();
        self.security_store
            .insert(&reset_token, user.id, self.config.reset_token_lifetime_secs)
            .await?;

        tracing::info!(
            target: "ims::security",
            event = "password_reset_requested",
            user_id = %user.id,
            "Password reset requested"
        );

        Ok(Some(reset_token))
    }

    /// Complete a password reset with a single-use token.
    pub async fn reset_password(&self, reset_token: &str, new_password: &str) -> ImsResult<()> {
        let Some(user_id) = self.security_store.consume(reset_token).await? else {
            return Err(ImsError::AuthenticationRequired);
        };

        password::validate_password_strength(new_password, self.config.min_password_length)?;

        self.user_repo.set_password(user_id, new_password).await?;

        tracing::info!(
            target: "ims::security",
            event = "password_reset_completed",
            user_id = %user_id,
            "Password reset completed"
        );

        Ok(())
    }

    /// Count a failed attempt and lock the account when the limit is
    /// reached.
    async fn handle_failed_login(&self, username: &str, reason: &str) -> ImsResult<()> {
        let attempts = self
            .security_store
            .record_failure(username, self.config.lockout_duration_secs)
            .await?;

        tracing::warn!(
            target: "ims::security",
            event = "login_attempt",
            username = %username,
            reason = %reason,
            attempts,
            "Login failed"
        );

        if attempts >= self.config.max_failed_login_attempts {
            self.security_store
                .lock(username, self.config.lockout_duration_secs)
                .await?;
            tracing::warn!(
                target: "ims::security",
                event = "account_locked",
                username = %username,
                attempts,
                duration_secs = self.config.lockout_duration_secs,
                "Account locked after repeated failures"
            );
        }

        Ok(())
    }
}
